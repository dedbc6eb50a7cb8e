//! a11ysnap library
//!
//! Captures an accessibility-first snapshot of a web page: the engine's
//! accessibility tree plus a flat, selector-addressable list of every
//! interactive element, stamped with the page's title, URL and capture time.
//!
//! # Module Overview
//!
//! - [`capture`] - Snapshot assembly, accessibility tree reader, element scanner
//! - [`page`] - The [`PageHandle`] seam and the static [`HtmlPage`]
//! - [`browser`] - Live pages in headless Chromium via Playwright
//! - [`types`] - Document arena and snapshot data types
//! - [`config`] - Configuration file support
//! - [`output`] - JSON report envelopes
//!
//! # Example
//!
//! ```no_run
//! use a11ysnap_lib::{capture_snapshot, HtmlPage};
//!
//! # async fn example() -> a11ysnap_lib::Result<()> {
//! let page = HtmlPage::parse(
//!     "https://example.com/",
//!     "<title>Example</title><a href=\"#\">More information...</a>",
//! );
//! let snapshot = capture_snapshot(&page).await?;
//! println!("{}", snapshot.to_json_pretty()?);
//! # Ok(())
//! # }
//! ```

pub mod browser;
pub mod capture;
pub mod config;
pub mod error;
mod json;
pub mod output;
pub mod page;
pub mod progress;
pub mod resource;
pub mod types;
pub mod viewport;

pub use browser::{
    BrowserManager, BrowserOptions, PlaywrightPage, DEFAULT_NAVIGATION_TIMEOUT,
    DEFAULT_NETWORK_IDLE_TIMEOUT, DEFAULT_REQUEST_TIMEOUT, DEFAULT_STARTUP_TIMEOUT,
};
pub use capture::{
    capture_snapshot, capture_snapshot_with, capture_with_timeout, CaptureOptions, ScanOptions,
    Selector, DEFAULT_CAPTURE_TIMEOUT,
};
pub use config::Config;
pub use error::{
    CaptureError, CaptureReason, ErrorCategory, ErrorPayload, Result, SnapError,
};
pub use output::{ErrorOutput, InspectOutput, SnapOutput, A11YSNAP_OUTPUT_VERSION};
pub use page::{HtmlPage, PageHandle, RawAxNode};
pub use progress::ProgressCallback;
pub use resource::{parse_resource, ParsedResource, ResourceKind, ResourceParseError};
pub use types::{
    AccessibilityNode, ElementBounds, InteractiveElement, Snapshot, SnapshotSummary,
};
pub use viewport::{Viewport, ViewportParseError};
