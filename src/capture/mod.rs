//! Snapshot capture.
//!
//! [`capture_snapshot`] is the single entry point: it reads the page's title
//! and URL, then runs the accessibility tree reader and the interactive
//! element scanner against the same page state and assembles the results
//! into one immutable [`Snapshot`]. Either both halves succeed or the caller
//! gets the [`CaptureError`]; there are no partial snapshots and no retries.
//!
//! # Module Structure
//!
//! - [`accessibility`] - converts the engine's accessibility tree
//! - [`scanner`] - enumerates interactive elements
//! - [`selector`] - builds and resolves element selectors

pub mod accessibility;
pub mod scanner;
pub mod selector;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::error::CaptureError;
use crate::page::PageHandle;
use crate::types::Snapshot;

pub use accessibility::read_accessibility_tree;
pub use scanner::{scan_document, scan_interactive_elements, ScanOptions};
pub use selector::{css_escape, Selector, SelectorBuilder, SelectorParseError};

/// Default bound for a whole capture call.
pub const DEFAULT_CAPTURE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureOptions {
    pub scan: ScanOptions,
}

/// Captures a snapshot with default options.
pub async fn capture_snapshot<P>(page: &P) -> Result<Snapshot, CaptureError>
where
    P: PageHandle + ?Sized,
{
    capture_snapshot_with(page, &CaptureOptions::default()).await
}

pub async fn capture_snapshot_with<P>(
    page: &P,
    options: &CaptureOptions,
) -> Result<Snapshot, CaptureError>
where
    P: PageHandle + ?Sized,
{
    ensure_open(page, "before capture")?;
    let started = Instant::now();

    let title = page.title().await?;
    let url = page.url().await?;
    debug!(%url, "capturing snapshot");

    let (tree, elements) = tokio::try_join!(
        read_accessibility_tree(page),
        scan_interactive_elements(page, &options.scan)
    )?;
    ensure_open(page, "during capture")?;

    if tree.is_none() {
        debug!(%url, "engine reported no accessibility tree");
    }
    let snapshot = Snapshot::assemble(title, url, Utc::now(), tree, elements);
    info!(
        url = snapshot.url(),
        elements = snapshot.element_count(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "snapshot captured"
    );
    Ok(snapshot)
}

/// Runs a capture under a caller-chosen bound.
///
/// On expiry the in-flight capture is dropped and reported as a timeout.
pub async fn capture_with_timeout<P>(
    page: &P,
    options: &CaptureOptions,
    bound: Duration,
) -> Result<Snapshot, CaptureError>
where
    P: PageHandle + ?Sized,
{
    match tokio::time::timeout(bound, capture_snapshot_with(page, options)).await {
        Ok(result) => result,
        Err(_) => {
            warn!(?bound, "capture abandoned after timeout");
            Err(CaptureError::timeout(format!(
                "capture did not complete within {:?}",
                bound
            )))
        }
    }
}

fn ensure_open<P>(page: &P, stage: &str) -> Result<(), CaptureError>
where
    P: PageHandle + ?Sized,
{
    if page.is_closed() {
        Err(CaptureError::detached(format!("page was closed {stage}")))
    } else {
        Ok(())
    }
}
