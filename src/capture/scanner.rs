//! Interactive element scanner.
//!
//! Walks the document arena in pre-order and keeps every element a user can
//! act on: canonical interactive tags, interactive ARIA roles, and anything
//! keyboard-focusable. Each kept element gets a unique selector and rounded
//! bounds. An element whose geometry cannot be read is dropped; it never
//! fails the scan.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::selector::SelectorBuilder;
use crate::error::CaptureError;
use crate::page::PageHandle;
use crate::types::{BoundingBox, DomElement, DomTree, ElementBounds, InteractiveElement};

/// ARIA roles that mark an element as actionable.
pub const INTERACTIVE_ROLES: &[&str] = &[
    "button",
    "checkbox",
    "combobox",
    "gridcell",
    "link",
    "listbox",
    "menuitem",
    "menuitemcheckbox",
    "menuitemradio",
    "option",
    "radio",
    "scrollbar",
    "searchbox",
    "slider",
    "spinbutton",
    "switch",
    "tab",
    "textbox",
    "treeitem",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanOptions {
    /// Truncate element text to this many characters.
    pub max_text_length: Option<usize>,
    /// Drop elements that render with zero width or height.
    pub visible_only: bool,
}

/// Reads the page's document and scans it on the blocking pool, so a caller's
/// timeout still fires while a large document is being scanned.
///
/// Fails only when the document itself cannot be read.
pub async fn scan_interactive_elements<P>(
    page: &P,
    options: &ScanOptions,
) -> Result<Vec<InteractiveElement>, CaptureError>
where
    P: PageHandle + ?Sized,
{
    let document = page.document().await?;
    let options = options.clone();
    tokio::task::spawn_blocking(move || scan_document(&document, &options))
        .await
        .map_err(|err| CaptureError::engine_failure(format!("element scan task failed: {err}")))
}

/// Interactive elements of `tree`, in document pre-order.
pub fn scan_document(tree: &DomTree, options: &ScanOptions) -> Vec<InteractiveElement> {
    let selectors = SelectorBuilder::new(tree);
    let mut found = Vec::new();
    let mut skipped = 0usize;

    for (index, element) in tree.iter() {
        if !is_interactive(element) {
            continue;
        }
        let Some(bounds) = element.bounding_box.and_then(round_bounds) else {
            trace!(index, tag = %element.tag, "skipping element without readable bounds");
            skipped += 1;
            continue;
        };
        if options.visible_only && (bounds.width == 0 || bounds.height == 0) {
            continue;
        }
        let Some(selector) = selectors.build(index) else {
            skipped += 1;
            continue;
        };

        found.push(InteractiveElement {
            element_type: element_type(element),
            text: normalize_text(&element.text, options.max_text_length),
            role: element
                .attr("role")
                .map(|r| r.trim().to_string())
                .unwrap_or_default(),
            aria_label: element.attr("aria-label").unwrap_or_default().to_string(),
            id: element.attr("id").unwrap_or_default().to_string(),
            class_name: element
                .attr("class")
                .map(|c| c.split_whitespace().collect::<Vec<_>>().join(" "))
                .unwrap_or_default(),
            selector: selector.to_string(),
            bounds,
        });
    }

    debug!(
        elements = found.len(),
        skipped,
        scanned = tree.len(),
        "interactive element scan finished"
    );
    found
}

/// Whether the element accepts activation, input or focus.
pub fn is_interactive(element: &DomElement) -> bool {
    has_interactive_tag(element)
        || has_interactive_role(element)
        || element.tab_index.is_some_and(|t| t >= 0)
        || element.attr("onclick").is_some()
        || element
            .attr("contenteditable")
            .is_some_and(|v| !v.trim().eq_ignore_ascii_case("false"))
}

fn has_interactive_tag(element: &DomElement) -> bool {
    match element.tag.as_str() {
        "a" | "area" => element.attr("href").is_some(),
        "button" | "select" | "textarea" | "summary" => true,
        "input" => !element
            .attr("type")
            .is_some_and(|t| t.trim().eq_ignore_ascii_case("hidden")),
        _ => false,
    }
}

fn has_interactive_role(element: &DomElement) -> bool {
    element.attr("role").is_some_and(|roles| {
        roles
            .split_whitespace()
            .any(|role| INTERACTIVE_ROLES.contains(&role.to_ascii_lowercase().as_str()))
    })
}

/// Category reported as the element's `type`.
pub fn element_type(element: &DomElement) -> String {
    match element.tag.as_str() {
        "a" | "area" => "link".to_string(),
        tag => tag.to_string(),
    }
}

/// Collapses runs of whitespace to single spaces and trims the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn normalize_text(text: &str, max_len: Option<usize>) -> String {
    let collapsed = collapse_whitespace(text);
    match max_len {
        Some(max) if collapsed.chars().count() > max => {
            collapsed.chars().take(max).collect::<String>().trim_end().to_string()
        }
        _ => collapsed,
    }
}

/// Rounds every field the same way; non-finite geometry counts as unreadable.
fn round_bounds(raw: BoundingBox) -> Option<ElementBounds> {
    let fields = [raw.x, raw.y, raw.width, raw.height];
    if fields.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let [x, y, width, height] = fields.map(|v| v.round() as i64);
    Some(ElementBounds {
        x,
        y,
        width: width.max(0),
        height: height.max(0),
    })
}
