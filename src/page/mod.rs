//! Page handles: the seam between capture and whoever owns the browser session.
//!
//! Capture never opens, navigates or closes pages. It receives an already
//! loaded page through [`PageHandle`] and only reads from it.
//!
//! - [`HtmlPage`] - a static document parsed from HTML source
//! - [`crate::browser::PlaywrightPage`] - a live page in a headless browser

mod html;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::CaptureError;
use crate::types::DomTree;

pub use html::HtmlPage;

/// Accessibility node as the engine reports it.
///
/// Only `role`, `name` and `children` are consumed; engines attach further
/// properties (value, checked, level, ...) which are kept in `properties`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawAxNode {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub children: Vec<RawAxNode>,
    #[serde(flatten)]
    pub properties: BTreeMap<String, serde_json::Value>,
}

impl RawAxNode {
    pub fn new(role: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            role: Some(role.into()),
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_children(mut self, children: Vec<RawAxNode>) -> Self {
        self.children = children;
        self
    }
}

/// Read-only access to one open, fully loaded page.
///
/// Implementations report page-level failures as [`CaptureError`]s: a closed
/// handle is `detached`, an unanswered call is `timeout`, anything else the
/// engine rejects is `engine-failure`.
#[async_trait]
pub trait PageHandle: Send + Sync {
    /// Document title.
    async fn title(&self) -> Result<String, CaptureError>;

    /// Fully resolved URL of the current document.
    async fn url(&self) -> Result<String, CaptureError>;

    /// The engine's accessibility tree; `Ok(None)` when the engine exposes none.
    async fn accessibility_tree(&self) -> Result<Option<RawAxNode>, CaptureError>;

    /// Current document as a pre-order element arena.
    async fn document(&self) -> Result<DomTree, CaptureError>;

    /// Whether the handle has been closed or detached.
    fn is_closed(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_ax_node_keeps_extra_properties() {
        let json = r#"{
            "role": "checkbox",
            "name": "Remember me",
            "checked": true
        }"#;
        let node: RawAxNode = serde_json::from_str(json).unwrap();
        assert_eq!(node.role.as_deref(), Some("checkbox"));
        assert!(node.children.is_empty());
        assert_eq!(node.properties.get("checked"), Some(&serde_json::json!(true)));
    }

    #[test]
    fn raw_ax_node_tolerates_missing_name() {
        let node: RawAxNode =
            serde_json::from_str(r#"{"role": "WebArea", "children": [{"role": "text"}]}"#)
                .unwrap();
        assert!(node.name.is_none());
        assert_eq!(node.children.len(), 1);
    }
}
