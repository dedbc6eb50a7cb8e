//! Document model walked by the interactive-element scanner.
//!
//! A [`DomTree`] is a flat arena of element nodes stored in document
//! pre-order: index 0 is the root element, and iterating the arena front to
//! back visits elements in the same order a depth-first DOM walk would.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Rendered bounding rectangle as reported by the engine, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// One element of a captured document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomElement {
    /// Lowercase tag name (e.g., "a", "button", "div")
    pub tag: String,
    /// Attributes as declared in markup
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// Rendered text content of the element and its descendants
    #[serde(default)]
    pub text: String,
    /// Effective tab index; `None` when the engine did not report one
    pub tab_index: Option<i32>,
    /// Rendered geometry; `None` when it could not be read
    pub bounding_box: Option<BoundingBox>,
    /// Arena index of the parent element
    pub parent: Option<usize>,
    /// Arena indices of child elements, in document order
    #[serde(default)]
    pub children: Vec<usize>,
}

impl DomElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            ..Self::default()
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_tab_index(mut self, tab_index: i32) -> Self {
        self.tab_index = Some(tab_index);
        self
    }

    pub fn with_bounds(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.bounding_box = Some(BoundingBox {
            x,
            y,
            width,
            height,
        });
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// The `id` attribute, if present and non-empty.
    pub fn id(&self) -> Option<&str> {
        self.attr("id").filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomTreeError {
    #[error("element {index} has no parent; only the root element may be parentless")]
    DetachedElement { index: usize },
    #[error("element {index} points at parent {parent}, which does not precede it")]
    ParentOutOfOrder { index: usize, parent: usize },
    #[error("element {index} lists child {child}, which is missing or not in pre-order")]
    InvalidChild { index: usize, child: usize },
    #[error("element {child} is listed under {listed} but its parent is {actual:?}")]
    ParentMismatch {
        child: usize,
        listed: usize,
        actual: Option<usize>,
    },
    #[error("element {child} names parent {parent}, which does not list it as a child")]
    UnlistedChild { child: usize, parent: usize },
}

/// Elements of one document in pre-order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DomTree {
    elements: Vec<DomElement>,
}

impl DomTree {
    /// An empty document (nothing rendered).
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a tree from an arena that is already in pre-order, checking that
    /// parent and child links agree in both directions.
    pub fn from_elements(elements: Vec<DomElement>) -> Result<Self, DomTreeError> {
        let mut listed = vec![false; elements.len()];
        for (index, element) in elements.iter().enumerate() {
            match element.parent {
                None if index != 0 => return Err(DomTreeError::DetachedElement { index }),
                Some(parent) if parent >= index => {
                    return Err(DomTreeError::ParentOutOfOrder { index, parent })
                }
                _ => {}
            }

            let mut previous = index;
            for &child in &element.children {
                if child <= previous || child >= elements.len() {
                    return Err(DomTreeError::InvalidChild { index, child });
                }
                if elements[child].parent != Some(index) {
                    return Err(DomTreeError::ParentMismatch {
                        child,
                        listed: index,
                        actual: elements[child].parent,
                    });
                }
                listed[child] = true;
                previous = child;
            }
        }

        if let Some((child, parent)) = elements
            .iter()
            .enumerate()
            .filter(|(index, _)| !listed[*index])
            .find_map(|(index, element)| element.parent.map(|parent| (index, parent)))
        {
            return Err(DomTreeError::UnlistedChild { child, parent });
        }

        Ok(Self { elements })
    }

    /// Appends an element under `parent` and returns its index.
    ///
    /// Callers must append in pre-order (a parent before its descendants,
    /// earlier siblings' subtrees before later siblings).
    pub fn push(&mut self, mut element: DomElement, parent: Option<usize>) -> usize {
        let index = self.elements.len();
        element.parent = parent;
        element.children.clear();
        if let Some(parent) = parent {
            self.elements[parent].children.push(index);
        }
        self.elements.push(element);
        index
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&DomElement> {
        self.elements.get(index)
    }

    pub fn root(&self) -> Option<&DomElement> {
        self.elements.first()
    }

    /// Elements with their arena index, in document pre-order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &DomElement)> {
        self.elements.iter().enumerate()
    }

    pub fn parent_of(&self, index: usize) -> Option<usize> {
        self.elements.get(index).and_then(|el| el.parent)
    }

    /// 1-based position of every element among same-tag siblings, the value
    /// `:nth-of-type()` matches. The root element is always 1.
    pub fn nth_of_type_positions(&self) -> Vec<usize> {
        let mut positions = vec![1; self.elements.len()];
        for element in &self.elements {
            let mut seen: BTreeMap<&str, usize> = BTreeMap::new();
            for &child in &element.children {
                let count = seen.entry(self.elements[child].tag.as_str()).or_insert(0);
                *count += 1;
                positions[child] = *count;
            }
        }
        positions
    }
}

impl<'de> Deserialize<'de> for DomTree {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let elements = Vec::<DomElement>::deserialize(deserializer)?;
        DomTree::from_elements(elements).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DomTree {
        let mut tree = DomTree::new();
        let html = tree.push(DomElement::new("html"), None);
        let body = tree.push(DomElement::new("body"), Some(html));
        tree.push(DomElement::new("p"), Some(body));
        tree.push(DomElement::new("a").with_attr("id", "first"), Some(body));
        tree.push(DomElement::new("p"), Some(body));
        tree.push(DomElement::new("a").with_attr("id", ""), Some(body));
        tree
    }

    #[test]
    fn push_links_parents_and_children() {
        let tree = sample();
        assert_eq!(tree.len(), 6);
        assert_eq!(tree.get(1).unwrap().children, vec![2, 3, 4, 5]);
        assert_eq!(tree.parent_of(5), Some(1));
        assert_eq!(tree.root().unwrap().tag, "html");
    }

    #[test]
    fn nth_of_type_counts_same_tag_siblings_only() {
        let tree = sample();
        let positions = tree.nth_of_type_positions();
        assert_eq!(positions, vec![1, 1, 1, 1, 2, 2]);
    }

    #[test]
    fn empty_ids_are_ignored() {
        let tree = sample();
        assert_eq!(tree.get(3).unwrap().id(), Some("first"));
        assert_eq!(tree.get(5).unwrap().id(), None);
    }

    #[test]
    fn from_elements_rejects_child_missing_from_parent_list() {
        let elements = vec![
            DomElement {
                children: vec![1],
                ..DomElement::new("html")
            },
            DomElement {
                parent: Some(0),
                children: vec![2],
                ..DomElement::new("body")
            },
            DomElement {
                parent: Some(1),
                ..DomElement::new("a")
            },
            DomElement {
                parent: Some(1),
                ..DomElement::new("a")
            },
        ];
        assert_eq!(
            DomTree::from_elements(elements),
            Err(DomTreeError::UnlistedChild {
                child: 3,
                parent: 1
            })
        );
    }

    #[test]
    fn from_elements_rejects_out_of_order_arena() {
        let elements = vec![
            DomElement {
                children: vec![1],
                ..DomElement::new("html")
            },
            DomElement {
                parent: Some(2),
                ..DomElement::new("body")
            },
            DomElement {
                parent: Some(0),
                ..DomElement::new("div")
            },
        ];
        assert!(DomTree::from_elements(elements).is_err());
    }

    #[test]
    fn from_elements_rejects_second_root() {
        let elements = vec![DomElement::new("html"), DomElement::new("html")];
        assert_eq!(
            DomTree::from_elements(elements),
            Err(DomTreeError::DetachedElement { index: 1 })
        );
    }

    #[test]
    fn deserializes_and_validates_arena() {
        let json = r#"[
            {"tag": "html", "tabIndex": -1, "boundingBox": null, "parent": null, "children": [1]},
            {"tag": "button", "text": "Go", "tabIndex": 0,
             "boundingBox": {"x": 1.5, "y": 2.0, "width": 30.0, "height": 10.0},
             "parent": 0}
        ]"#;
        let tree: DomTree = serde_json::from_str(json).unwrap();
        assert_eq!(tree.len(), 2);
        let button = tree.get(1).unwrap();
        assert_eq!(button.text, "Go");
        assert_eq!(button.tab_index, Some(0));
        assert_eq!(button.bounding_box.unwrap().width, 30.0);
    }
}
