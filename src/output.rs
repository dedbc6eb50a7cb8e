//! Report envelopes printed by the CLI.
//!
//! A successful `capture` prints the snapshot itself in its persisted form;
//! everything else goes through one of these envelopes.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ErrorPayload;
use crate::types::{Snapshot, SnapshotSummary};

/// Schema version for report envelopes.
pub const A11YSNAP_OUTPUT_VERSION: &str = "0.1.0";

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum SnapOutput {
    Inspect(InspectOutput),
    Error(ErrorOutput),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectOutput {
    pub version: String,
    pub source: String,
    pub title: String,
    pub url: String,
    pub timestamp: DateTime<Utc>,
    pub summary: SnapshotSummary,
}

impl InspectOutput {
    pub fn from_snapshot(source: impl Into<String>, snapshot: &Snapshot) -> Self {
        Self {
            version: A11YSNAP_OUTPUT_VERSION.to_string(),
            source: source.into(),
            title: snapshot.title().to_string(),
            url: snapshot.url().to_string(),
            timestamp: snapshot.timestamp(),
            summary: snapshot.summary(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorOutput {
    pub version: String,
    /// The page URL or file the failed attempt was working on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub error: ErrorPayload,
}

impl ErrorOutput {
    pub fn new(error: ErrorPayload) -> Self {
        Self {
            version: A11YSNAP_OUTPUT_VERSION.to_string(),
            source: None,
            error,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}
