use std::path::Path;
use std::time::Duration;

use a11ysnap_lib::{BrowserOptions, CaptureOptions, Config, SnapError, Viewport};

use crate::cli::CaptureArgs;

/// Tracks which CLI flags were explicitly provided vs. defaulted.
#[derive(Debug, Default)]
pub struct CaptureFlagSources {
    pub viewport: bool,
    pub timeout: bool,
    pub nav_timeout: bool,
}

impl CaptureFlagSources {
    pub fn from_args(args: &[String]) -> Self {
        Self {
            viewport: flag_present(args, "--viewport"),
            timeout: flag_present(args, "--timeout"),
            nav_timeout: flag_present(args, "--nav-timeout"),
        }
    }
}

/// Checks if a flag was present in the command-line arguments.
pub fn flag_present(args: &[String], flag: &str) -> bool {
    args.iter()
        .any(|arg| arg == flag || arg.starts_with(&format!("{flag}=")))
}

/// Resolved settings after merging CLI args and config file.
#[derive(Debug, Clone)]
pub struct ResolvedCaptureSettings {
    pub browser: BrowserOptions,
    pub capture: CaptureOptions,
    pub capture_timeout: Duration,
}

/// Merge CLI arguments with config file, preferring CLI when flags are present.
pub fn resolve_capture_settings(
    args: &CaptureArgs,
    config: &Config,
    flags: &CaptureFlagSources,
) -> ResolvedCaptureSettings {
    let mut browser = config.browser_options();
    if flags.viewport {
        browser.viewport = args.viewport;
    }
    if flags.nav_timeout {
        browser.navigation_timeout = Duration::from_secs(args.nav_timeout);
    }
    if args.headed {
        browser.headless = false;
    }

    let mut capture = config.capture_options();
    if args.max_text_length.is_some() {
        capture.scan.max_text_length = args.max_text_length;
    }
    if args.visible_only {
        capture.scan.visible_only = true;
    }

    let capture_timeout = if flags.timeout {
        // A single page request may take as long as the whole capture is allowed to.
        let bound = Duration::from_secs(args.timeout);
        browser.request_timeout = bound;
        bound
    } else {
        config.timeouts.capture
    };

    ResolvedCaptureSettings {
        browser,
        capture,
        capture_timeout,
    }
}

/// Rejects CLI values the config validator would reject.
pub fn validate_capture_settings(settings: &ResolvedCaptureSettings) -> Result<(), SnapError> {
    if settings.capture_timeout.is_zero() {
        return Err(SnapError::config("--timeout must be greater than zero"));
    }
    if settings.browser.navigation_timeout.is_zero() {
        return Err(SnapError::config("--nav-timeout must be greater than zero"));
    }
    if settings.capture.scan.max_text_length == Some(0) {
        return Err(SnapError::config("--max-text-length must be at least 1"));
    }
    Ok(())
}

/// Load config from a TOML file, central config, or return defaults.
/// Priority: explicit path > ~/.config/a11ysnap/config.toml > defaults
pub fn load_config(path: Option<&Path>) -> Result<Config, SnapError> {
    let cfg = Config::load(path).map_err(|e| {
        let loc = path
            .map(|p| p.display().to_string())
            .or_else(|| Config::central_config_path().map(|p| p.display().to_string()))
            .unwrap_or_else(|| "defaults".to_string());
        SnapError::Config(format!("Failed to read config {}: {}", loc, e))
    })?;

    cfg.validate().map_err(|e| {
        let prefix = path
            .map(|p| format!("Invalid config ({}): {}", p.display(), e))
            .unwrap_or_else(|| format!("Invalid config: {}", e));
        SnapError::Config(prefix)
    })?;
    Ok(cfg)
}

/// Format effective settings as a single-line string.
pub fn format_effective_config(
    settings: &ResolvedCaptureSettings,
    config_source: Option<&Path>,
) -> String {
    let source = config_source
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults".to_string());
    let viewport: &Viewport = &settings.browser.viewport;
    format!(
        "Effective config [{source}]: viewport={}, headless={}, timeouts: nav={}s, network-idle={}s, startup={}s, request={}s, capture={}s, scan: max_text_length={}, visible_only={}",
        viewport,
        settings.browser.headless,
        settings.browser.navigation_timeout.as_secs(),
        settings.browser.network_idle_timeout.as_secs(),
        settings.browser.launch_timeout().as_secs(),
        settings.browser.request_timeout.as_secs(),
        settings.capture_timeout.as_secs(),
        settings
            .capture
            .scan
            .max_text_length
            .map(|n| n.to_string())
            .unwrap_or_else(|| "none".to_string()),
        settings.capture.scan.visible_only,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;

    fn capture_args(argv: &[&str]) -> (CaptureArgs, CaptureFlagSources) {
        let raw: Vec<String> = argv.iter().map(|s| s.to_string()).collect();
        let flags = CaptureFlagSources::from_args(&raw);
        match Cli::parse_from(argv).command {
            Commands::Capture(args) => (args, flags),
            _ => panic!("expected capture command"),
        }
    }

    #[test]
    fn flag_present_matches_bare_and_assigned_forms() {
        let args: Vec<String> = ["a11ysnap", "--viewport=800x600", "--timeout", "5"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert!(flag_present(&args, "--viewport"));
        assert!(flag_present(&args, "--timeout"));
        assert!(!flag_present(&args, "--nav-timeout"));
    }

    #[test]
    fn resolve_prefers_config_when_flags_absent() {
        let cfg = Config::from_toml_str(
            "viewport = \"111x222\"\n[timeouts]\nnavigation = \"5s\"\ncapture = \"7s\"\n[scan]\nmax_text_length = 50",
        )
        .unwrap();
        let (args, flags) = capture_args(&["a11ysnap", "capture", "--input", "https://x.test"]);

        let resolved = resolve_capture_settings(&args, &cfg, &flags);
        assert_eq!(resolved.browser.viewport, Viewport { width: 111, height: 222 });
        assert_eq!(resolved.browser.navigation_timeout, Duration::from_secs(5));
        assert_eq!(resolved.capture_timeout, Duration::from_secs(7));
        assert_eq!(resolved.capture.scan.max_text_length, Some(50));
        assert!(resolved.browser.headless);
    }

    #[test]
    fn resolve_prefers_cli_when_flags_present() {
        let cfg = Config::from_toml_str("viewport = \"111x222\"\n[scan]\nmax_text_length = 50").unwrap();
        let (args, flags) = capture_args(&[
            "a11ysnap",
            "capture",
            "--input",
            "https://x.test",
            "--viewport",
            "10x20",
            "--timeout",
            "3",
            "--nav-timeout",
            "4",
            "--max-text-length",
            "9",
            "--visible-only",
            "--headed",
        ]);

        let resolved = resolve_capture_settings(&args, &cfg, &flags);
        assert_eq!(resolved.browser.viewport, Viewport { width: 10, height: 20 });
        assert_eq!(resolved.browser.navigation_timeout, Duration::from_secs(4));
        assert_eq!(resolved.capture_timeout, Duration::from_secs(3));
        assert_eq!(resolved.browser.request_timeout, Duration::from_secs(3));
        assert_eq!(resolved.capture.scan.max_text_length, Some(9));
        assert!(resolved.capture.scan.visible_only);
        assert!(!resolved.browser.headless);
    }

    #[test]
    fn long_cli_timeouts_reach_every_bound() {
        let (args, flags) = capture_args(&[
            "a11ysnap",
            "capture",
            "--input",
            "https://x.test",
            "--timeout",
            "120",
            "--nav-timeout",
            "60",
        ]);
        let resolved = resolve_capture_settings(&args, &Config::default(), &flags);
        assert_eq!(resolved.capture_timeout, Duration::from_secs(120));
        assert_eq!(resolved.browser.request_timeout, Duration::from_secs(120));
        assert!(resolved.browser.launch_timeout() >= Duration::from_secs(70));
        let summary = format_effective_config(&resolved, None);
        assert!(summary.contains("request=120s"));
        assert!(summary.contains("startup=75s"));
    }

    #[test]
    fn zero_cli_timeout_is_rejected() {
        let (args, flags) = capture_args(&[
            "a11ysnap",
            "capture",
            "--input",
            "https://x.test",
            "--timeout",
            "0",
        ]);
        let resolved = resolve_capture_settings(&args, &Config::default(), &flags);
        assert!(validate_capture_settings(&resolved).is_err());
    }

    #[test]
    fn format_effective_config_includes_all_fields() {
        let (args, flags) = capture_args(&["a11ysnap", "capture", "--input", "https://x.test"]);
        let resolved = resolve_capture_settings(&args, &Config::default(), &flags);
        let summary = format_effective_config(&resolved, Some(Path::new("snap.toml")));
        assert!(summary.contains("1280x720"));
        assert!(summary.contains("nav=30s"));
        assert!(summary.contains("capture=30s"));
        assert!(summary.contains("max_text_length=none"));
        assert!(summary.contains("snap.toml"));
    }

    #[test]
    fn load_config_wraps_missing_file_errors() {
        let err = load_config(Some(Path::new("/nonexistent/a11ysnap.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config"));
    }
}
