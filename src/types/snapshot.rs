//! Snapshot record produced by one capture.
//!
//! Field names follow the persisted form consumed by report writers:
//! top-level keys are snake_case, interactive-element keys are camelCase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// One node of the engine's accessibility tree.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccessibilityNode {
    /// Semantic role (e.g., "button", "link", "WebArea")
    pub role: String,
    /// Computed accessible name
    pub name: String,
    #[serde(default)]
    pub children: Vec<AccessibilityNode>,
}

impl AccessibilityNode {
    pub fn new(role: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// Nodes in pre-order, starting with `self`.
    pub fn iter(&self) -> AccessibilityIter<'_> {
        AccessibilityIter { stack: vec![self] }
    }

    pub fn node_count(&self) -> usize {
        self.iter().count()
    }

    /// Depth of the deepest node; a leaf has depth 1.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 1)];
        while let Some((node, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            stack.extend(node.children.iter().map(|child| (child, depth + 1)));
        }
        deepest
    }

    /// First node (pre-order) with the given role and name.
    pub fn find(&self, role: &str, name: &str) -> Option<&AccessibilityNode> {
        self.iter().find(|node| node.role == role && node.name == name)
    }
}

pub struct AccessibilityIter<'a> {
    stack: Vec<&'a AccessibilityNode>,
}

impl<'a> Iterator for AccessibilityIter<'a> {
    type Item = &'a AccessibilityNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// Viewport-relative bounding box, rounded to whole CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ElementBounds {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

/// One actionable DOM element, discovered independently of the accessibility tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractiveElement {
    /// Element category ("link", "button", "input", ...)
    #[serde(rename = "type")]
    pub element_type: String,
    pub text: String,
    /// Declared ARIA role, empty when none
    pub role: String,
    pub aria_label: String,
    pub id: String,
    pub class_name: String,
    /// Selector resolving to exactly this element at capture time
    pub selector: String,
    pub bounds: ElementBounds,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("element_count is {declared} but interactive_elements holds {actual} entries")]
pub struct SnapshotShapeError {
    pub declared: usize,
    pub actual: usize,
}

/// One immutable capture of one page at one instant.
///
/// Built only by the capture path; there are no mutators. Producing a
/// different snapshot means capturing again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SnapshotRecord")]
pub struct Snapshot {
    title: String,
    url: String,
    timestamp: DateTime<Utc>,
    accessibility_tree: Option<AccessibilityNode>,
    interactive_elements: Vec<InteractiveElement>,
    element_count: usize,
}

/// Wire shape of a persisted snapshot, validated before it becomes a [`Snapshot`].
#[derive(Deserialize)]
struct SnapshotRecord {
    title: String,
    url: String,
    timestamp: DateTime<Utc>,
    accessibility_tree: Option<AccessibilityNode>,
    #[serde(default)]
    interactive_elements: Vec<InteractiveElement>,
    element_count: usize,
}

impl TryFrom<SnapshotRecord> for Snapshot {
    type Error = SnapshotShapeError;

    fn try_from(record: SnapshotRecord) -> Result<Self, Self::Error> {
        if record.element_count != record.interactive_elements.len() {
            return Err(SnapshotShapeError {
                declared: record.element_count,
                actual: record.interactive_elements.len(),
            });
        }
        Ok(Snapshot {
            title: record.title,
            url: record.url,
            timestamp: record.timestamp,
            accessibility_tree: record.accessibility_tree,
            interactive_elements: record.interactive_elements,
            element_count: record.element_count,
        })
    }
}

impl Snapshot {
    pub(crate) fn assemble(
        title: String,
        url: String,
        timestamp: DateTime<Utc>,
        accessibility_tree: Option<AccessibilityNode>,
        interactive_elements: Vec<InteractiveElement>,
    ) -> Self {
        let element_count = interactive_elements.len();
        Self {
            title,
            url,
            timestamp,
            accessibility_tree,
            interactive_elements,
            element_count,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Root of the accessibility tree; `None` when the engine exposed no tree.
    pub fn accessibility_tree(&self) -> Option<&AccessibilityNode> {
        self.accessibility_tree.as_ref()
    }

    pub fn interactive_elements(&self) -> &[InteractiveElement] {
        &self.interactive_elements
    }

    pub fn element_count(&self) -> usize {
        self.element_count
    }

    pub fn summary(&self) -> SnapshotSummary {
        let mut by_type = BTreeMap::new();
        for element in &self.interactive_elements {
            *by_type.entry(element.element_type.clone()).or_insert(0) += 1;
        }
        SnapshotSummary {
            element_count: self.element_count,
            by_type,
            accessibility_nodes: self
                .accessibility_tree
                .as_ref()
                .map_or(0, AccessibilityNode::node_count),
            accessibility_depth: self
                .accessibility_tree
                .as_ref()
                .map_or(0, AccessibilityNode::depth),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Parses a persisted snapshot. Trees nested deeper than serde_json's
    /// default limit are accepted.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        crate::json::from_str_unbounded(json)
    }

    /// Writes the pretty-printed record, creating parent directories.
    pub fn write_to(&self, path: &Path) -> crate::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.to_json_pretty()?)?;
        Ok(())
    }
}

/// Counts shown after a capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSummary {
    pub element_count: usize,
    pub by_type: BTreeMap<String, usize>,
    pub accessibility_nodes: usize,
    pub accessibility_depth: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn link() -> InteractiveElement {
        InteractiveElement {
            element_type: "link".into(),
            text: "More information...".into(),
            role: String::new(),
            aria_label: String::new(),
            id: String::new(),
            class_name: String::new(),
            selector: "a:nth-of-type(1)".into(),
            bounds: ElementBounds {
                x: 10,
                y: 20,
                width: 120,
                height: 18,
            },
        }
    }

    fn snapshot() -> Snapshot {
        let mut root = AccessibilityNode::new("WebArea", "Example Domain");
        let mut heading = AccessibilityNode::new("heading", "Example Domain");
        heading.children.push(AccessibilityNode::new("text", "Example Domain"));
        root.children.push(heading);
        root.children
            .push(AccessibilityNode::new("link", "More information..."));
        Snapshot::assemble(
            "Example Domain".into(),
            "https://example.com/".into(),
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            Some(root),
            vec![link()],
        )
    }

    #[test]
    fn element_count_tracks_elements() {
        let snap = snapshot();
        assert_eq!(snap.element_count(), snap.interactive_elements().len());
    }

    #[test]
    fn serializes_with_persisted_field_names() {
        let value = serde_json::to_value(snapshot()).unwrap();
        let object = value.as_object().unwrap();
        for key in [
            "title",
            "url",
            "timestamp",
            "accessibility_tree",
            "interactive_elements",
            "element_count",
        ] {
            assert!(object.contains_key(key), "missing {key}");
        }
        assert_eq!(value["timestamp"], "2024-05-01T12:00:00Z");

        let element = &value["interactive_elements"][0];
        for key in [
            "type",
            "text",
            "role",
            "ariaLabel",
            "id",
            "className",
            "selector",
            "bounds",
        ] {
            assert!(element.get(key).is_some(), "missing element key {key}");
        }
        assert_eq!(element["type"], "link");
        assert_eq!(element["bounds"]["width"], 120);
    }

    #[test]
    fn absent_tree_serializes_as_null() {
        let snap = Snapshot::assemble(
            "Blank".into(),
            "about:blank".into(),
            Utc::now(),
            None,
            Vec::new(),
        );
        let value = serde_json::to_value(&snap).unwrap();
        assert!(value["accessibility_tree"].is_null());
        assert_eq!(value["element_count"], 0);
    }

    #[test]
    fn json_round_trip_preserves_snapshot() {
        let snap = snapshot();
        let restored = Snapshot::from_json(&snap.to_json().unwrap()).unwrap();
        assert_eq!(restored, snap);
    }

    #[test]
    fn rejects_record_with_inconsistent_count() {
        let mut value = serde_json::to_value(snapshot()).unwrap();
        value["element_count"] = serde_json::json!(3);
        let err = serde_json::from_value::<Snapshot>(value).unwrap_err();
        assert!(err.to_string().contains("element_count is 3"));
    }

    #[test]
    fn summary_counts_types_and_tree_nodes() {
        let summary = snapshot().summary();
        assert_eq!(summary.element_count, 1);
        assert_eq!(summary.by_type.get("link"), Some(&1));
        assert_eq!(summary.accessibility_nodes, 4);
        assert_eq!(summary.accessibility_depth, 3);
    }

    #[test]
    fn accessibility_iter_is_pre_order() {
        let snap = snapshot();
        let tree = snap.accessibility_tree().unwrap();
        let roles: Vec<&str> = tree.iter().map(|n| n.role.as_str()).collect();
        assert_eq!(roles, vec!["WebArea", "heading", "text", "link"]);
        assert!(tree.find("link", "More information...").is_some());
        assert!(tree.find("button", "Submit").is_none());
    }

    #[test]
    fn write_to_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("snapshot.json");
        let snap = snapshot();
        snap.write_to(&path).unwrap();
        let restored = Snapshot::from_json(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(restored.url(), "https://example.com/");
    }
}
