//! TOML configuration.
//!
//! Every key is optional; missing keys fall back to the built-in defaults and
//! unknown keys are rejected. Durations use humantime syntax (`"30s"`,
//! `"1m 30s"`).
//!
//! ```toml
//! viewport = "1280x720"
//! headless = true
//! node_command = "node"
//!
//! [timeouts]
//! navigation = "30s"
//! capture = "45s"
//!
//! [scan]
//! max_text_length = 100
//! visible_only = true
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::browser::{
    BrowserOptions, DEFAULT_NAVIGATION_TIMEOUT, DEFAULT_NETWORK_IDLE_TIMEOUT,
    DEFAULT_REQUEST_TIMEOUT, DEFAULT_STARTUP_TIMEOUT,
};
use crate::capture::{CaptureOptions, ScanOptions, DEFAULT_CAPTURE_TIMEOUT};
use crate::{Result, SnapError, Viewport};

const APP_DIR: &str = "a11ysnap";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub viewport: Viewport,
    pub headless: bool,
    pub node_command: String,
    pub max_concurrent_sessions: usize,
    pub timeouts: Timeouts,
    pub scan: ScanOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Timeouts {
    #[serde(with = "humantime_serde")]
    pub navigation: Duration,
    #[serde(with = "humantime_serde")]
    pub network_idle: Duration,
    #[serde(with = "humantime_serde")]
    pub startup: Duration,
    #[serde(with = "humantime_serde")]
    pub request: Duration,
    #[serde(with = "humantime_serde")]
    pub capture: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            navigation: DEFAULT_NAVIGATION_TIMEOUT,
            network_idle: DEFAULT_NETWORK_IDLE_TIMEOUT,
            startup: DEFAULT_STARTUP_TIMEOUT,
            request: DEFAULT_REQUEST_TIMEOUT,
            capture: DEFAULT_CAPTURE_TIMEOUT,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            headless: true,
            node_command: "node".to_string(),
            max_concurrent_sessions: 1,
            timeouts: Timeouts::default(),
            scan: ScanOptions::default(),
        }
    }
}

impl Config {
    /// Loads the explicit `path`, else the central config file when it exists,
    /// else the defaults. An explicit path that cannot be read is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match Self::central_config_path() {
                Some(central) if central.is_file() => Self::from_file(&central),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// `$XDG_CONFIG_HOME/a11ysnap/config.toml` (or the platform equivalent).
    pub fn central_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE_NAME))
    }

    pub fn validate(&self) -> Result<()> {
        let timeouts = [
            ("navigation", self.timeouts.navigation),
            ("network_idle", self.timeouts.network_idle),
            ("startup", self.timeouts.startup),
            ("request", self.timeouts.request),
            ("capture", self.timeouts.capture),
        ];
        if let Some((name, _)) = timeouts.iter().find(|(_, d)| d.is_zero()) {
            return Err(SnapError::config(format!(
                "timeouts.{name} must be greater than zero"
            )));
        }
        if self.node_command.trim().is_empty() {
            return Err(SnapError::config("node_command must not be empty"));
        }
        if self.max_concurrent_sessions == 0 {
            return Err(SnapError::config(
                "max_concurrent_sessions must be at least 1",
            ));
        }
        if self.scan.max_text_length == Some(0) {
            return Err(SnapError::config(
                "scan.max_text_length must be at least 1 when set",
            ));
        }
        Ok(())
    }

    pub fn browser_options(&self) -> BrowserOptions {
        BrowserOptions {
            node_command: self.node_command.clone(),
            viewport: self.viewport,
            headless: self.headless,
            navigation_timeout: self.timeouts.navigation,
            network_idle_timeout: self.timeouts.network_idle,
            startup_timeout: self.timeouts.startup,
            request_timeout: self.timeouts.request,
            max_concurrent_sessions: self.max_concurrent_sessions,
            progress: None,
        }
    }

    pub fn capture_options(&self) -> CaptureOptions {
        CaptureOptions {
            scan: self.scan.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn default_values_match_expected() {
        let cfg = Config::default();

        assert_eq!(cfg.viewport, Viewport { width: 1280, height: 720 });
        assert!(cfg.headless);
        assert_eq!(cfg.node_command, "node");
        assert_eq!(cfg.timeouts.navigation, Duration::from_secs(30));
        assert_eq!(cfg.timeouts.network_idle, Duration::from_secs(10));
        assert_eq!(cfg.timeouts.capture, DEFAULT_CAPTURE_TIMEOUT);
        assert_eq!(cfg.scan, ScanOptions::default());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn empty_file_yields_defaults() {
        assert_eq!(Config::from_toml_str("").unwrap(), Config::default());
    }

    #[test]
    fn partial_file_overrides_only_given_keys() {
        let cfg = Config::from_toml_str(
            r#"
            viewport = "390x844"
            headless = false

            [timeouts]
            navigation = "1m 30s"
            request = "500ms"

            [scan]
            max_text_length = 100
            "#,
        )
        .unwrap();

        assert_eq!(cfg.viewport, Viewport { width: 390, height: 844 });
        assert!(!cfg.headless);
        assert_eq!(cfg.timeouts.navigation, Duration::from_secs(90));
        assert_eq!(cfg.timeouts.request, Duration::from_millis(500));
        assert_eq!(cfg.timeouts.network_idle, DEFAULT_NETWORK_IDLE_TIMEOUT);
        assert_eq!(cfg.scan.max_text_length, Some(100));
        assert!(!cfg.scan.visible_only);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = Config::from_toml_str("threshold = 0.9").unwrap_err();
        assert!(matches!(err, SnapError::ConfigFile(_)));

        let err = Config::from_toml_str("[scan]\nmax_text = 3").unwrap_err();
        assert!(matches!(err, SnapError::ConfigFile(_)));
    }

    #[test]
    fn validation_rejects_zero_values() {
        let cfg = Config::from_toml_str("[timeouts]\ncapture = \"0s\"").unwrap();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("timeouts.capture"));

        let cfg = Config {
            max_concurrent_sessions: 0,
            ..Config::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = Config::from_toml_str("[scan]\nmax_text_length = 0").unwrap();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn load_reads_explicit_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "node_command = \"/opt/node/bin/node\"").unwrap();

        let cfg = Config::load(Some(file.path())).unwrap();
        assert_eq!(cfg.node_command, "/opt/node/bin/node");
    }

    #[test]
    fn load_fails_for_missing_explicit_path() {
        let err = Config::load(Some(Path::new("/nonexistent/a11ysnap.toml"))).unwrap_err();
        assert!(matches!(err, SnapError::Io(_)));
    }

    #[test]
    fn derived_options_follow_config() {
        let cfg = Config::from_toml_str(
            "viewport = { width = 800, height = 600 }\nmax_concurrent_sessions = 3\n[scan]\nvisible_only = true",
        )
        .unwrap();

        let browser = cfg.browser_options();
        assert_eq!(browser.viewport, Viewport { width: 800, height: 600 });
        assert_eq!(browser.max_concurrent_sessions, 3);
        assert_eq!(browser.navigation_timeout, DEFAULT_NAVIGATION_TIMEOUT);
        assert!(cfg.capture_options().scan.visible_only);
    }
}
