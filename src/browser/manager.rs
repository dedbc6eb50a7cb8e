//! Browser manager for coordinating headless page sessions.
//!
//! This module provides the `BrowserManager` struct for opening live pages
//! with semaphore-based limiting on how many helpers run at once.

use crate::capture::{capture_with_timeout, CaptureOptions, DEFAULT_CAPTURE_TIMEOUT};
use crate::progress::ProgressCallback;
use crate::types::Snapshot;
use crate::{Result, SnapError, Viewport};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info};

use super::page::PlaywrightPage;
use super::playwright::{ensure_node_available, ensure_playwright_available};

/// Default timeout for page navigation.
pub const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for waiting for network idle state.
pub const DEFAULT_NETWORK_IDLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default bound on helper startup (browser launch plus navigation).
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(45);

/// Default bound on a single request to a live page.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Time allowed for launching the browser on top of navigation and the idle wait.
const LAUNCH_ALLOWANCE: Duration = Duration::from_secs(5);

/// Configuration options for browser sessions.
#[derive(Clone)]
pub struct BrowserOptions {
    /// The Node.js command to use (default: "node").
    pub node_command: String,
    /// Viewport dimensions for the browser.
    pub viewport: Viewport,
    /// Whether to run in headless mode.
    pub headless: bool,
    /// Timeout for page navigation.
    pub navigation_timeout: Duration,
    /// Timeout for waiting for network idle state.
    pub network_idle_timeout: Duration,
    /// Timeout for the helper to report the page ready.
    pub startup_timeout: Duration,
    /// Timeout for each request against a live page.
    pub request_timeout: Duration,
    /// Maximum number of concurrent live pages.
    pub max_concurrent_sessions: usize,
    /// Optional progress callback for verbose output.
    pub progress: Option<ProgressCallback>,
}

impl std::fmt::Debug for BrowserOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrowserOptions")
            .field("node_command", &self.node_command)
            .field("viewport", &self.viewport)
            .field("headless", &self.headless)
            .field("navigation_timeout", &self.navigation_timeout)
            .field("network_idle_timeout", &self.network_idle_timeout)
            .field("startup_timeout", &self.startup_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("max_concurrent_sessions", &self.max_concurrent_sessions)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl BrowserOptions {
    /// Bound applied to helper startup.
    ///
    /// Startup covers navigation and the network-idle wait, so the configured
    /// startup timeout is raised when those two would not fit inside it.
    pub fn launch_timeout(&self) -> Duration {
        self.startup_timeout
            .max(self.navigation_timeout + self.network_idle_timeout + LAUNCH_ALLOWANCE)
    }
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            node_command: "node".to_string(),
            viewport: Viewport::default(),
            headless: true,
            navigation_timeout: DEFAULT_NAVIGATION_TIMEOUT,
            network_idle_timeout: DEFAULT_NETWORK_IDLE_TIMEOUT,
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_concurrent_sessions: 1,
            progress: None,
        }
    }
}

/// Manages live browser pages with semaphore-based limiting.
#[derive(Debug, Clone)]
pub struct BrowserManager {
    options: BrowserOptions,
    semaphore: Arc<Semaphore>,
}

impl BrowserManager {
    /// Creates a new BrowserManager with the given options.
    pub fn new(options: BrowserOptions) -> Self {
        let permits = options.max_concurrent_sessions.max(1);
        Self {
            options,
            semaphore: Arc::new(Semaphore::new(permits)),
        }
    }

    pub fn options(&self) -> &BrowserOptions {
        &self.options
    }

    /// Opens `url` in a fresh headless page.
    ///
    /// The page holds one session permit until it is closed or dropped.
    pub async fn open_page(&self, url: &str) -> Result<PlaywrightPage> {
        // Fail fast if Node or Playwright is missing to avoid a slow launch timeout.
        ensure_node_available(&self.options.node_command).await?;
        ensure_playwright_available(&self.options.node_command).await?;

        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| SnapError::Config("Browser manager unavailable".to_string()))?;

        self.report(&format!(
            "Launching browser for {} (viewport {}, nav timeout {:?})",
            url, self.options.viewport, self.options.navigation_timeout
        ));
        let start = Instant::now();
        let page = PlaywrightPage::launch(&self.options, url, Some(permit)).await?;
        debug!(%url, elapsed_ms = start.elapsed().as_millis() as u64, "page opened");
        self.report(&format!("Page ready after {:?}", start.elapsed()));
        Ok(page)
    }

    /// Opens `url`, captures one snapshot under `bound` and closes the page.
    pub async fn capture_url(
        &self,
        url: &str,
        options: &CaptureOptions,
        bound: Option<Duration>,
    ) -> Result<Snapshot> {
        let page = self.open_page(url).await?;
        self.report("Capturing accessibility snapshot");
        let result =
            capture_with_timeout(&page, options, bound.unwrap_or(DEFAULT_CAPTURE_TIMEOUT)).await;
        page.close().await;

        let snapshot = result?;
        info!(
            %url,
            elements = snapshot.element_count(),
            "captured snapshot from live page"
        );
        self.report(&format!(
            "Captured {} interactive elements",
            snapshot.element_count()
        ));
        Ok(snapshot)
    }

    fn report(&self, message: &str) {
        if let Some(cb) = &self.options.progress {
            cb(message);
        }
    }
}
