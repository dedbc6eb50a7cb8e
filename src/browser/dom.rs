//! Raw document payload from the page helper and its conversion.

use crate::types::{BoundingBox, DomElement, DomTree, DomTreeError};
use std::collections::BTreeMap;

/// Raw document as returned by the helper's `document` operation.
#[derive(Debug, serde::Deserialize)]
pub(crate) struct RawDocument {
    #[serde(default)]
    pub elements: Vec<RawElement>,
}

/// Raw element from helper output.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawElement {
    pub tag: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub text: Option<String>,
    pub tab_index: Option<i32>,
    pub bounding_box: Option<RawBoundingBox>,
    pub parent: Option<usize>,
    #[serde(default)]
    pub children: Vec<usize>,
}

/// Raw bounding box from helper output.
#[derive(Debug, serde::Deserialize)]
pub(crate) struct RawBoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Converts the helper payload into a validated [`DomTree`].
///
/// Only an authored `tabindex` is kept. Engines report a default tab index of
/// 0 for hidden inputs and anchors without `href`; native focusability is
/// decided from the tag by the scanner instead.
pub(crate) fn convert_raw_document(raw: RawDocument) -> Result<DomTree, DomTreeError> {
    let elements = raw
        .elements
        .into_iter()
        .map(|el| DomElement {
            tag: el.tag.to_ascii_lowercase(),
            tab_index: el
                .tab_index
                .filter(|_| el.attributes.contains_key("tabindex")),
            attributes: el.attributes,
            text: el.text.unwrap_or_default(),
            bounding_box: el.bounding_box.map(|b| BoundingBox {
                x: b.x,
                y: b.y,
                width: b.width,
                height: b.height,
            }),
            parent: el.parent,
            children: el.children,
        })
        .collect();
    DomTree::from_elements(elements)
}
