//! Accessibility tree reader.

use crate::error::CaptureError;
use crate::page::{PageHandle, RawAxNode};
use crate::types::AccessibilityNode;

/// Reads the engine's accessibility tree for the page's top-level document.
///
/// An engine that reports no tree yields `Ok(None)`; that is a valid, empty
/// capture rather than a failure.
pub async fn read_accessibility_tree<P>(page: &P) -> Result<Option<AccessibilityNode>, CaptureError>
where
    P: PageHandle + ?Sized,
{
    Ok(page.accessibility_tree().await?.map(convert_node))
}

/// Keeps role, name and child order; drops engine-specific properties.
///
/// Walks with an explicit stack, so tree depth is bounded by memory only.
pub fn convert_node(raw: RawAxNode) -> AccessibilityNode {
    let mut stack = vec![Frame::open(raw)];
    let mut converted = AccessibilityNode::default();
    while let Some(frame) = stack.last_mut() {
        if let Some(child) = frame.pending.pop() {
            stack.push(Frame::open(child));
            continue;
        }
        let Some(done) = stack.pop() else { break };
        match stack.last_mut() {
            Some(parent) => parent.node.children.push(done.node),
            None => converted = done.node,
        }
    }
    converted
}

/// A node whose children are still being converted.
struct Frame {
    node: AccessibilityNode,
    /// Raw children not yet visited, last child first.
    pending: Vec<RawAxNode>,
}

impl Frame {
    fn open(raw: RawAxNode) -> Self {
        let mut pending = raw.children;
        pending.reverse();
        Self {
            node: AccessibilityNode::new(raw.role.unwrap_or_default(), raw.name.unwrap_or_default()),
            pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_nested_nodes_in_order() {
        let raw: RawAxNode = serde_json::from_str(
            r#"{
                "role": "WebArea",
                "name": "Example Domain",
                "children": [
                    {"role": "heading", "name": "Example Domain", "level": 1},
                    {"role": "link", "name": "More information..."},
                    {"role": "text"}
                ]
            }"#,
        )
        .unwrap();
        let node = convert_node(raw);
        assert_eq!(node.role, "WebArea");
        let children: Vec<(&str, &str)> = node
            .children
            .iter()
            .map(|c| (c.role.as_str(), c.name.as_str()))
            .collect();
        assert_eq!(
            children,
            vec![
                ("heading", "Example Domain"),
                ("link", "More information..."),
                ("text", ""),
            ]
        );
    }

    #[test]
    fn converts_deeply_nested_trees() {
        let mut raw = RawAxNode::new("link", "Deep");
        for level in 0..1_000 {
            raw = RawAxNode::new("group", format!("level {level}")).with_children(vec![raw]);
        }
        let node = convert_node(raw);
        assert_eq!(node.role, "group");
        assert_eq!(node.name, "level 999");
        assert_eq!(node.depth(), 1_001);
        assert!(node.find("link", "Deep").is_some());
    }
}
