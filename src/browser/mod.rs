//! Browser automation for capturing live pages.
//!
//! A [`PlaywrightPage`] is a page loaded in headless Chromium by a long-running
//! Node.js Playwright helper. It implements [`PageHandle`](crate::PageHandle),
//! so it can be passed straight to [`capture_snapshot`](crate::capture_snapshot).
//!
//! # Module Structure
//!
//! - [`manager`] - Page session management with concurrency control
//! - [`page`] - The live page handle and its helper protocol
//! - [`playwright`] - Helper script, availability checks and error mapping
//! - [`dom`] - Raw document payload conversion
//!
//! # Example
//!
//! ```no_run
//! use a11ysnap_lib::{capture_snapshot, BrowserManager, BrowserOptions};
//!
//! # async fn example() -> a11ysnap_lib::Result<()> {
//! let manager = BrowserManager::new(BrowserOptions::default());
//! let page = manager.open_page("https://example.com").await?;
//! let snapshot = capture_snapshot(&page).await?;
//! page.close().await;
//! println!("{} interactive elements", snapshot.element_count());
//! # Ok(())
//! # }
//! ```

mod dom;
mod manager;
mod page;
mod playwright;

pub use manager::{
    BrowserManager, BrowserOptions, DEFAULT_NAVIGATION_TIMEOUT, DEFAULT_NETWORK_IDLE_TIMEOUT,
    DEFAULT_REQUEST_TIMEOUT, DEFAULT_STARTUP_TIMEOUT,
};
pub use page::PlaywrightPage;
