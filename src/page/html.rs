//! Static page built from HTML source.
//!
//! There is no layout engine behind an [`HtmlPage`]: every element reports a
//! zero-sized box at the origin. Tab indices follow the browser rules for
//! natively focusable elements, and the accessibility tree is derived from
//! explicit `role` attributes and the implicit roles of HTML elements.

use async_trait::async_trait;
use scraper::{ElementRef, Html};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;
use url::Url;

use super::{PageHandle, RawAxNode};
use crate::capture::scanner::collapse_whitespace;
use crate::error::{CaptureError, SnapError};
use crate::types::{BoundingBox, DomElement, DomTree};

/// Elements whose text never renders.
const NON_RENDERED_TAGS: &[&str] = &["script", "style", "template", "noscript", "head"];

/// Elements never exposed to assistive technology.
const AX_HIDDEN_TAGS: &[&str] = &[
    "head", "script", "style", "template", "noscript", "title", "meta", "link", "base",
];

/// Roles whose accessible name comes from their content.
const NAME_FROM_CONTENT_ROLES: &[&str] = &[
    "button",
    "cell",
    "checkbox",
    "columnheader",
    "gridcell",
    "heading",
    "link",
    "menuitem",
    "menuitemcheckbox",
    "menuitemradio",
    "option",
    "radio",
    "row",
    "rowheader",
    "switch",
    "tab",
    "tooltip",
    "treeitem",
];

pub struct HtmlPage {
    url: String,
    title: String,
    document: DomTree,
    accessibility: Option<RawAxNode>,
    closed: AtomicBool,
}

impl HtmlPage {
    /// Parses `source` as the document loaded at `url`.
    pub fn parse(url: impl Into<String>, source: &str) -> Self {
        let html = Html::parse_document(source);
        let mut document = DomTree::new();
        visit(html.root_element(), None, &mut document);

        let title = document
            .iter()
            .find(|(_, el)| el.tag == "title")
            .map(|(_, el)| collapse_whitespace(&el.text))
            .unwrap_or_default();
        let accessibility = derive_accessibility_tree(&document, &title);
        let url = url.into();
        debug!(%url, elements = document.len(), "parsed static page");

        Self {
            url,
            title,
            document,
            accessibility,
            closed: AtomicBool::new(false),
        }
    }

    /// Loads a local HTML file; the page URL is its `file://` URL.
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let source = fs::read_to_string(path)?;
        let absolute = fs::canonicalize(path)?;
        let url = Url::from_file_path(&absolute).map_err(|_| {
            SnapError::config(format!(
                "Cannot build a file URL for {}",
                absolute.display()
            ))
        })?;
        Ok(Self::parse(url.to_string(), &source))
    }

    /// The parsed document, as the scanner will see it.
    pub fn dom(&self) -> &DomTree {
        &self.document
    }

    /// Marks the page closed; later reads fail as detached.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn ensure_open(&self) -> Result<(), CaptureError> {
        if self.is_closed() {
            Err(CaptureError::detached(format!(
                "page {} has been closed",
                self.url
            )))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PageHandle for HtmlPage {
    async fn title(&self) -> Result<String, CaptureError> {
        self.ensure_open()?;
        Ok(self.title.clone())
    }

    async fn url(&self) -> Result<String, CaptureError> {
        self.ensure_open()?;
        Ok(self.url.clone())
    }

    async fn accessibility_tree(&self) -> Result<Option<RawAxNode>, CaptureError> {
        self.ensure_open()?;
        Ok(self.accessibility.clone())
    }

    async fn document(&self) -> Result<DomTree, CaptureError> {
        self.ensure_open()?;
        Ok(self.document.clone())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

fn visit(element: ElementRef<'_>, parent: Option<usize>, document: &mut DomTree) {
    let value = element.value();
    let tag = value.name().to_ascii_lowercase();

    let mut node = DomElement::new(tag.as_str());
    for (name, attr) in value.attrs() {
        node.attributes.insert(name.to_ascii_lowercase(), attr.to_string());
    }
    let mut text = String::new();
    if !NON_RENDERED_TAGS.contains(&tag.as_str()) || tag == "title" {
        rendered_text(element, &mut text);
    }
    node.text = text;
    node.tab_index = Some(effective_tab_index(&node));
    node.bounding_box = Some(BoundingBox::default());

    let index = document.push(node, parent);
    for child in element.children().filter_map(ElementRef::wrap) {
        visit(child, Some(index), document);
    }
}

fn rendered_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child) = ElementRef::wrap(child) {
            if !NON_RENDERED_TAGS.contains(&child.value().name()) {
                rendered_text(child, out);
            }
        }
    }
}

fn input_type(element: &DomElement) -> String {
    element
        .attr("type")
        .map(|t| t.trim().to_ascii_lowercase())
        .unwrap_or_else(|| "text".to_string())
}

fn is_content_editable(element: &DomElement) -> bool {
    element
        .attr("contenteditable")
        .is_some_and(|v| !v.trim().eq_ignore_ascii_case("false"))
}

/// `HTMLElement.tabIndex` as a browser would report it.
fn effective_tab_index(element: &DomElement) -> i32 {
    if let Some(value) = element.attr("tabindex").and_then(|v| v.trim().parse().ok()) {
        return value;
    }
    let focusable = match element.tag.as_str() {
        "a" | "area" => element.attr("href").is_some(),
        "button" | "select" | "textarea" | "iframe" | "summary" => true,
        "input" => input_type(element) != "hidden",
        "audio" | "video" => element.attr("controls").is_some(),
        _ => false,
    };
    if focusable || is_content_editable(element) {
        0
    } else {
        -1
    }
}

fn derive_accessibility_tree(document: &DomTree, title: &str) -> Option<RawAxNode> {
    document.root()?;
    Some(RawAxNode::new("WebArea", title).with_children(ax_children(document, 0)))
}

fn ax_children(document: &DomTree, index: usize) -> Vec<RawAxNode> {
    document
        .get(index)
        .map(|el| {
            el.children
                .iter()
                .flat_map(|&child| ax_node(document, child))
                .collect()
        })
        .unwrap_or_default()
}

fn ax_node(document: &DomTree, index: usize) -> Vec<RawAxNode> {
    let Some(element) = document.get(index) else {
        return Vec::new();
    };
    if is_ax_hidden(element) {
        return Vec::new();
    }
    match ax_role(element) {
        Some(role) => {
            let name = accessible_name(document, index, &role);
            vec![RawAxNode::new(role, name).with_children(ax_children(document, index))]
        }
        None => ax_children(document, index),
    }
}

fn is_ax_hidden(element: &DomElement) -> bool {
    AX_HIDDEN_TAGS.contains(&element.tag.as_str())
        || element.attr("hidden").is_some()
        || element
            .attr("aria-hidden")
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
        || (element.tag == "input" && input_type(element) == "hidden")
}

fn ax_role(element: &DomElement) -> Option<String> {
    if let Some(declared) = element.attr("role") {
        if let Some(role) = declared.split_whitespace().next() {
            let role = role.to_ascii_lowercase();
            return match role.as_str() {
                "none" | "presentation" => None,
                _ => Some(role),
            };
        }
    }
    implicit_role(element).map(str::to_string)
}

fn implicit_role(element: &DomElement) -> Option<&'static str> {
    let role = match element.tag.as_str() {
        "a" | "area" if element.attr("href").is_some() => "link",
        "button" => "button",
        "input" => match input_type(element).as_str() {
            "checkbox" => "checkbox",
            "radio" => "radio",
            "range" => "slider",
            "number" => "spinbutton",
            "search" => "searchbox",
            "button" | "submit" | "reset" | "image" => "button",
            "hidden" => return None,
            _ => "textbox",
        },
        "select" => {
            let multiple = element.attr("multiple").is_some();
            let sized = element
                .attr("size")
                .and_then(|s| s.trim().parse::<u32>().ok())
                .is_some_and(|s| s > 1);
            if multiple || sized {
                "listbox"
            } else {
                "combobox"
            }
        }
        "option" => "option",
        "textarea" => "textbox",
        "summary" => "button",
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => "heading",
        "img" if element.attr("alt").is_some_and(|alt| !alt.is_empty()) => "img",
        "nav" => "navigation",
        "main" => "main",
        "header" => "banner",
        "footer" => "contentinfo",
        "aside" => "complementary",
        "form" => "form",
        "ul" | "ol" => "list",
        "li" => "listitem",
        "table" => "table",
        "tr" => "row",
        "td" => "cell",
        "th" => "columnheader",
        "dialog" => "dialog",
        "progress" => "progressbar",
        _ => return None,
    };
    Some(role)
}

fn accessible_name(document: &DomTree, index: usize, role: &str) -> String {
    let Some(element) = document.get(index) else {
        return String::new();
    };

    if let Some(ids) = element.attr("aria-labelledby") {
        let labelled: Vec<String> = ids
            .split_whitespace()
            .filter_map(|id| document.iter().find(|(_, el)| el.id() == Some(id)))
            .map(|(_, el)| collapse_whitespace(&el.text))
            .filter(|text| !text.is_empty())
            .collect();
        if !labelled.is_empty() {
            return labelled.join(" ");
        }
    }
    if let Some(label) = element.attr("aria-label").map(collapse_whitespace) {
        if !label.is_empty() {
            return label;
        }
    }

    match element.tag.as_str() {
        "img" | "area" => {
            if let Some(alt) = element.attr("alt") {
                return collapse_whitespace(alt);
            }
        }
        "input" => {
            let kind = input_type(element);
            match kind.as_str() {
                "submit" | "reset" | "button" => {
                    return element
                        .attr("value")
                        .map(collapse_whitespace)
                        .unwrap_or_else(|| match kind.as_str() {
                            "submit" => "Submit".to_string(),
                            "reset" => "Reset".to_string(),
                            _ => String::new(),
                        });
                }
                "image" => {
                    if let Some(alt) = element.attr("alt") {
                        return collapse_whitespace(alt);
                    }
                }
                _ => {
                    if let Some(label) = label_text(document, index) {
                        return label;
                    }
                    if let Some(placeholder) = element.attr("placeholder") {
                        return collapse_whitespace(placeholder);
                    }
                }
            }
        }
        "select" | "textarea" => {
            if let Some(label) = label_text(document, index) {
                return label;
            }
        }
        _ => {}
    }

    if NAME_FROM_CONTENT_ROLES.contains(&role) {
        let text = collapse_whitespace(&element.text);
        if !text.is_empty() {
            return text;
        }
    }

    element
        .attr("title")
        .map(collapse_whitespace)
        .unwrap_or_default()
}

/// Text of the `<label for=...>` pointing at the element, or of a wrapping `<label>`.
fn label_text(document: &DomTree, index: usize) -> Option<String> {
    let element = document.get(index)?;
    if let Some(id) = element.id() {
        let explicit = document
            .iter()
            .find(|(_, el)| el.tag == "label" && el.attr("for") == Some(id))
            .map(|(_, el)| collapse_whitespace(&el.text));
        if let Some(text) = explicit.filter(|t| !t.is_empty()) {
            return Some(text);
        }
    }

    let mut current = document.parent_of(index);
    while let Some(ancestor) = current {
        let el = document.get(ancestor)?;
        if el.tag == "label" {
            let text = collapse_whitespace(&el.text);
            return (!text.is_empty()).then_some(text);
        }
        current = el.parent;
    }
    None
}
