use std::sync::Arc;

/// Receives human-readable progress lines from long-running browser work.
pub type ProgressCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// A callback that writes each progress line to stderr.
pub fn stderr_progress() -> ProgressCallback {
    Arc::new(|message: &str| eprintln!("{message}\u{2026}"))
}
