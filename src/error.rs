use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use url::ParseError;

use crate::resource::ResourceParseError;

/// Why a capture failed. Drives the retry decision downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaptureReason {
    /// The page handle was closed or detached when capture began or completed.
    Detached,
    /// The engine did not answer within the enforced bound.
    Timeout,
    /// The accessibility or document read itself errored.
    EngineFailure,
}

impl CaptureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureReason::Detached => "detached",
            CaptureReason::Timeout => "timeout",
            CaptureReason::EngineFailure => "engine-failure",
        }
    }
}

impl fmt::Display for CaptureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A page-level or engine-level capture failure.
///
/// Element-level problems never surface as a `CaptureError`; the scanner drops
/// the element instead.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("capture failed ({reason}): {message}")]
pub struct CaptureError {
    pub reason: CaptureReason,
    pub message: String,
}

impl CaptureError {
    pub fn new(reason: CaptureReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
        }
    }

    pub fn detached(message: impl Into<String>) -> Self {
        Self::new(CaptureReason::Detached, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(CaptureReason::Timeout, message)
    }

    pub fn engine_failure(message: impl Into<String>) -> Self {
        Self::new(CaptureReason::EngineFailure, message)
    }

    /// Only timeouts are worth retrying; detached pages and engine faults are permanent
    /// for the attempt that produced them.
    pub fn is_retryable(&self) -> bool {
        self.reason == CaptureReason::Timeout
    }
}

#[derive(Debug, Error)]
pub enum SnapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] ParseError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Invalid input: {0}")]
    Resource(#[from] ResourceParseError),

    #[error("Config file error: {0}")]
    ConfigFile(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unexpected error: {0}")]
    Unknown(String),
}

impl SnapError {
    pub fn config(message: impl Into<String>) -> Self {
        SnapError::Config(message.into())
    }

    /// The capture reason, when this error came out of a capture.
    pub fn capture_reason(&self) -> Option<CaptureReason> {
        match self {
            SnapError::Capture(err) => Some(err.reason),
            _ => None,
        }
    }

    pub fn to_payload(&self) -> ErrorPayload {
        match self {
            SnapError::Io(e) => ErrorPayload::new(
                ErrorCategory::Config,
                e.to_string(),
                "Check file paths/permissions.",
            ),
            SnapError::InvalidUrl(e) => ErrorPayload::new(
                ErrorCategory::Input,
                e.to_string(),
                "Verify URL/format (e.g., https://example.com).",
            ),
            SnapError::Serialization(e) => ErrorPayload::new(
                ErrorCategory::Config,
                e.to_string(),
                "Check JSON inputs; run with --verbose for details.",
            ),
            SnapError::Capture(err) => {
                let remediation = match err.reason {
                    CaptureReason::Timeout => {
                        "Transient: retry the capture; raise --timeout for slow captures or --nav-timeout for slow page loads."
                    }
                    CaptureReason::Detached => {
                        "Permanent for this attempt: the page was closed or navigated away; reopen it before capturing again."
                    }
                    CaptureReason::EngineFailure => {
                        "Permanent for this attempt: the browser engine rejected the read; re-run with --verbose and inspect the page."
                    }
                };
                ErrorPayload::new(ErrorCategory::Capture, err.to_string(), remediation)
                    .with_reason(err.reason)
            }
            SnapError::Resource(e) => ErrorPayload::new(
                ErrorCategory::Input,
                e.to_string(),
                "Pass an http(s) URL or an existing .html/.htm file; use --input-type to override detection.",
            ),
            SnapError::ConfigFile(e) => ErrorPayload::new(
                ErrorCategory::Config,
                e.to_string(),
                "Fix the TOML config (durations use humantime, e.g. \"30s\"); unknown keys are rejected.",
            ),
            SnapError::Config(msg) => {
                let lower = msg.to_ascii_lowercase();
                if lower.contains("playwright npm package is missing") {
                    ErrorPayload::new(
                        ErrorCategory::Browser,
                        msg.to_string(),
                        "Install Playwright (e.g., `npm install playwright` and `npx playwright install chromium`).",
                    )
                } else if lower.contains("executable doesn't exist")
                    || lower.contains("chromium executable")
                {
                    ErrorPayload::new(
                        ErrorCategory::Browser,
                        msg.to_string(),
                        "Run `npx playwright install chromium` to download the browser.",
                    )
                } else if lower.contains("spawn playwright helper")
                    || lower.contains("node command")
                    || lower.contains("not found on path")
                {
                    ErrorPayload::new(
                        ErrorCategory::Browser,
                        msg.to_string(),
                        "Install Node.js 18+ and ensure `node` is on PATH (or set node_command in the config).",
                    )
                } else if (lower.contains("timeout") || lower.contains("timed out"))
                    && (lower.contains("playwright") || lower.contains("availability"))
                {
                    ErrorPayload::new(
                        ErrorCategory::Browser,
                        msg.to_string(),
                        "Increase --nav-timeout (or timeouts.navigation in the config) and ensure the page finishes loading.",
                    )
                } else {
                    ErrorPayload::new(
                        ErrorCategory::Config,
                        msg.to_string(),
                        "Check flags/paths (e.g., --viewport WIDTHxHEIGHT) and the config file.",
                    )
                }
            }
            SnapError::Unknown(msg) => ErrorPayload::new(
                ErrorCategory::Unknown,
                msg.to_string(),
                "Re-run with --verbose; file an issue if persistent.",
            ),
        }
    }
}

pub type Result<T> = std::result::Result<T, SnapError>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Config,
    Input,
    Browser,
    Capture,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub category: ErrorCategory,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<CaptureReason>,
    pub retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}

impl ErrorPayload {
    pub fn new(category: ErrorCategory, message: String, remediation: impl Into<String>) -> Self {
        Self {
            category,
            message,
            reason: None,
            retryable: false,
            remediation: Some(remediation.into()),
        }
    }

    fn with_reason(mut self, reason: CaptureReason) -> Self {
        self.reason = Some(reason);
        self.retryable = reason == CaptureReason::Timeout;
        self
    }
}
