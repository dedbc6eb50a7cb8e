//! Selector construction and matching.
//!
//! Selectors built here use a deliberately small CSS subset: compounds of
//! `#id`, `tag`, `tag:nth-of-type(k)` or `:root`, joined by the child
//! combinator `>`. [`Selector`] parses and evaluates exactly that subset
//! against a [`DomTree`], which is how uniqueness is checked during
//! construction and how callers can re-resolve a stored selector.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::types::DomTree;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compound {
    Root,
    Id(String),
    Tag(String),
    NthOfType { tag: String, position: usize },
}

impl fmt::Display for Compound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compound::Root => f.write_str(":root"),
            Compound::Id(id) => write!(f, "#{}", css_escape(id)),
            Compound::Tag(tag) => f.write_str(&css_escape(tag)),
            Compound::NthOfType { tag, position } => {
                write!(f, "{}:nth-of-type({})", css_escape(tag), position)
            }
        }
    }
}

/// A chain of compounds; the last one names the matched element, each earlier
/// one its parent, grandparent, and so on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    compounds: Vec<Compound>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectorParseError {
    #[error("selector is empty")]
    Empty,
    #[error("empty compound in selector '{0}'")]
    EmptyCompound(String),
    #[error("unsupported selector syntax '{0}'")]
    Unsupported(String),
    #[error("invalid :nth-of-type position in '{0}'")]
    InvalidPosition(String),
    #[error("dangling escape in '{0}'")]
    DanglingEscape(String),
}

impl Selector {
    pub fn new(compounds: Vec<Compound>) -> Self {
        Self { compounds }
    }

    pub fn compounds(&self) -> &[Compound] {
        &self.compounds
    }

    /// Every element the selector matches, in document order.
    pub fn query_all(&self, tree: &DomTree) -> Vec<usize> {
        let positions = tree.nth_of_type_positions();
        (0..tree.len())
            .filter(|&index| self.matches_with(tree, &positions, index))
            .collect()
    }

    fn matches_with(&self, tree: &DomTree, positions: &[usize], index: usize) -> bool {
        if self.compounds.is_empty() {
            return false;
        }
        let mut current = Some(index);
        for compound in self.compounds.iter().rev() {
            let Some(at) = current else {
                return false;
            };
            if !compound_matches(compound, tree, positions, at) {
                return false;
            }
            current = tree.parent_of(at);
        }
        true
    }
}

fn compound_matches(compound: &Compound, tree: &DomTree, positions: &[usize], index: usize) -> bool {
    let Some(element) = tree.get(index) else {
        return false;
    };
    match compound {
        Compound::Root => element.parent.is_none(),
        Compound::Id(id) => element.id() == Some(id.as_str()),
        Compound::Tag(tag) => element.tag == *tag,
        Compound::NthOfType { tag, position } => {
            element.tag == *tag && positions.get(index) == Some(position)
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, compound) in self.compounds.iter().enumerate() {
            if i > 0 {
                f.write_str(" > ")?;
            }
            write!(f, "{compound}")?;
        }
        Ok(())
    }
}

impl FromStr for Selector {
    type Err = SelectorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(SelectorParseError::Empty);
        }
        let compounds = split_unescaped(s, '>')
            .into_iter()
            .map(|part| parse_compound(part.trim(), s))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Selector { compounds })
    }
}

/// Splits on `sep` outside of backslash escapes.
fn split_unescaped(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == sep {
            parts.push(&s[start..i]);
            start = i + c.len_utf8();
        }
    }
    parts.push(&s[start..]);
    parts
}

fn parse_compound(part: &str, whole: &str) -> Result<Compound, SelectorParseError> {
    if part.is_empty() {
        return Err(SelectorParseError::EmptyCompound(whole.to_string()));
    }
    if part == ":root" {
        return Ok(Compound::Root);
    }
    if let Some(id) = part.strip_prefix('#') {
        let (id, rest) = read_ident(id, whole)?;
        if id.is_empty() || !rest.is_empty() {
            return Err(SelectorParseError::Unsupported(part.to_string()));
        }
        return Ok(Compound::Id(id));
    }

    let (tag, rest) = read_ident(part, whole)?;
    if tag.is_empty() {
        return Err(SelectorParseError::Unsupported(part.to_string()));
    }
    let tag = tag.to_ascii_lowercase();
    if rest.is_empty() {
        return Ok(Compound::Tag(tag));
    }
    let position = rest
        .strip_prefix(":nth-of-type(")
        .and_then(|r| r.strip_suffix(')'))
        .ok_or_else(|| SelectorParseError::Unsupported(part.to_string()))?;
    let position: usize = position
        .trim()
        .parse()
        .ok()
        .filter(|&p| p > 0)
        .ok_or_else(|| SelectorParseError::InvalidPosition(part.to_string()))?;
    Ok(Compound::NthOfType { tag, position })
}

/// Reads a (possibly escaped) identifier; returns it unescaped plus the unread rest.
fn read_ident<'a>(input: &'a str, whole: &str) -> Result<(String, &'a str), SelectorParseError> {
    let mut ident = String::new();
    let mut chars = input.char_indices().peekable();
    while let Some(&(i, c)) = chars.peek() {
        if c == '\\' {
            chars.next();
            let mut hex = String::new();
            while let Some(&(_, h)) = chars.peek() {
                if hex.len() < 6 && h.is_ascii_hexdigit() {
                    hex.push(h);
                    chars.next();
                } else {
                    break;
                }
            }
            if hex.is_empty() {
                match chars.next() {
                    Some((_, escaped)) => ident.push(escaped),
                    None => return Err(SelectorParseError::DanglingEscape(whole.to_string())),
                }
            } else {
                // A single whitespace terminates a hex escape.
                if matches!(chars.peek(), Some(&(_, ' '))) {
                    chars.next();
                }
                let code = u32::from_str_radix(&hex, 16).unwrap_or(0xFFFD);
                ident.push(char::from_u32(code).filter(|&c| c != '\0').unwrap_or('\u{FFFD}'));
            }
        } else if c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii() {
            ident.push(c);
            chars.next();
        } else {
            return Ok((ident, &input[i..]));
        }
    }
    Ok((ident, ""))
}

/// Escapes an identifier the way `CSS.escape()` does.
pub fn css_escape(ident: &str) -> String {
    let chars: Vec<char> = ident.chars().collect();
    let mut out = String::with_capacity(ident.len());
    for (i, &c) in chars.iter().enumerate() {
        let code = c as u32;
        if c == '\0' {
            out.push('\u{FFFD}');
        } else if (0x01..=0x1F).contains(&code)
            || code == 0x7F
            || (i == 0 && c.is_ascii_digit())
            || (i == 1 && c.is_ascii_digit() && chars[0] == '-')
        {
            out.push_str(&format!("\\{:x} ", code));
        } else if i == 0 && c == '-' && chars.len() == 1 {
            out.push_str("\\-");
        } else if code >= 0x80 || c == '-' || c == '_' || c.is_ascii_alphanumeric() {
            out.push(c);
        } else {
            out.push('\\');
            out.push(c);
        }
    }
    out
}

/// Builds the shortest unique selector for each element of one document.
///
/// Elements are indexed by id and by `(tag, position)` up front, so each
/// build starts from the elements sharing the target's last compound and only
/// re-checks those as ancestor compounds are added.
pub struct SelectorBuilder<'a> {
    tree: &'a DomTree,
    positions: Vec<usize>,
    id_counts: HashMap<&'a str, usize>,
    by_position: HashMap<(&'a str, usize), Vec<usize>>,
}

impl<'a> SelectorBuilder<'a> {
    pub fn new(tree: &'a DomTree) -> Self {
        let positions = tree.nth_of_type_positions();
        let mut id_counts = HashMap::new();
        let mut by_position: HashMap<(&'a str, usize), Vec<usize>> = HashMap::new();
        for (index, element) in tree.iter() {
            if let Some(id) = element.id() {
                *id_counts.entry(id).or_insert(0) += 1;
            }
            by_position
                .entry((element.tag.as_str(), positions[index]))
                .or_default()
                .push(index);
        }
        Self {
            tree,
            positions,
            id_counts,
            by_position,
        }
    }

    /// `#id` when the id is unique, otherwise `tag:nth-of-type(k)`, prefixed
    /// with ancestor compounds until the chain matches only `index`. If the
    /// walk reaches the root while still ambiguous, the chain is anchored
    /// with `:root`.
    pub fn build(&self, index: usize) -> Option<Selector> {
        let element = self.tree.get(index)?;
        let first = self.compound_for(index)?;
        // Each candidate is an element the chain still matches, paired with the
        // ancestor the next compound has to match.
        let mut candidates: Vec<(usize, Option<usize>)> = match first {
            Compound::Id(_) => vec![index],
            _ => self
                .by_position
                .get(&(element.tag.as_str(), self.positions[index]))
                .cloned()
                .unwrap_or_default(),
        }
        .into_iter()
        .map(|matched| (matched, self.tree.parent_of(matched)))
        .collect();
        let mut compounds = vec![first];

        let mut current = self.tree.parent_of(index);
        while candidates.len() > 1 {
            let Some(at) = current else {
                compounds[0] = Compound::Root;
                return Some(Selector::new(compounds));
            };
            let compound = self.compound_for(at)?;
            candidates.retain_mut(|(_, ancestor)| match *ancestor {
                Some(up) if compound_matches(&compound, self.tree, &self.positions, up) => {
                    *ancestor = self.tree.parent_of(up);
                    true
                }
                _ => false,
            });
            compounds.insert(0, compound);
            current = self.tree.parent_of(at);
        }
        Some(Selector::new(compounds))
    }

    fn compound_for(&self, index: usize) -> Option<Compound> {
        let element = self.tree.get(index)?;
        if let Some(id) = element.id() {
            if self.id_counts.get(id) == Some(&1) {
                return Some(Compound::Id(id.to_string()));
            }
        }
        Some(Compound::NthOfType {
            tag: element.tag.clone(),
            position: self.positions[index],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DomElement;

    /// html > body > (div#nav > a, a), div > (a, a), div > a
    fn tree() -> DomTree {
        let mut tree = DomTree::new();
        let html = tree.push(DomElement::new("html"), None);
        let body = tree.push(DomElement::new("body"), Some(html));
        let nav = tree.push(DomElement::new("div").with_attr("id", "nav"), Some(body));
        tree.push(DomElement::new("a"), Some(nav));
        tree.push(DomElement::new("a"), Some(nav));
        let second = tree.push(DomElement::new("div"), Some(body));
        tree.push(DomElement::new("a").with_attr("id", "dup"), Some(second));
        tree.push(DomElement::new("a").with_attr("id", "dup"), Some(second));
        let third = tree.push(DomElement::new("div"), Some(body));
        tree.push(DomElement::new("a").with_attr("id", "solo"), Some(third));
        tree
    }

    fn build(tree: &DomTree, index: usize) -> String {
        SelectorBuilder::new(tree).build(index).unwrap().to_string()
    }

    #[test]
    fn unique_id_wins() {
        let tree = tree();
        assert_eq!(build(&tree, 2), "#nav");
        assert_eq!(build(&tree, 9), "#solo");
    }

    #[test]
    fn ambiguous_nth_of_type_walks_to_identified_parent() {
        let tree = tree();
        assert_eq!(build(&tree, 3), "#nav > a:nth-of-type(1)");
        assert_eq!(build(&tree, 4), "#nav > a:nth-of-type(2)");
    }

    #[test]
    fn duplicate_ids_fall_back_to_position() {
        let tree = tree();
        assert_eq!(build(&tree, 7), "div:nth-of-type(2) > a:nth-of-type(2)");
    }

    #[test]
    fn root_is_anchored_when_walk_exhausts_ancestors() {
        let mut tree = DomTree::new();
        let outer = tree.push(DomElement::new("div"), None);
        let inner = tree.push(DomElement::new("div"), Some(outer));
        tree.push(DomElement::new("div"), Some(inner));
        assert_eq!(build(&tree, 0), ":root");
        assert_eq!(build(&tree, 1), ":root > div:nth-of-type(1)");
        // three levels deep is already unique without anchoring
        assert_eq!(
            build(&tree, 2),
            "div:nth-of-type(1) > div:nth-of-type(1) > div:nth-of-type(1)"
        );
    }

    #[test]
    fn every_built_selector_resolves_to_its_element() {
        let tree = tree();
        let builder = SelectorBuilder::new(&tree);
        for index in 0..tree.len() {
            let selector = builder.build(index).unwrap();
            let reparsed: Selector = selector.to_string().parse().unwrap();
            assert_eq!(reparsed.query_all(&tree), vec![index], "{selector}");
        }
    }

    #[test]
    fn repeated_structure_gets_unique_selectors() {
        let mut tree = DomTree::new();
        let html = tree.push(DomElement::new("html"), None);
        let body = tree.push(DomElement::new("body"), Some(html));
        let mut buttons = Vec::new();
        for _ in 0..300 {
            let section = tree.push(DomElement::new("section"), Some(body));
            for _ in 0..40 {
                buttons.push(tree.push(DomElement::new("button"), Some(section)));
            }
        }

        let builder = SelectorBuilder::new(&tree);
        let started = std::time::Instant::now();
        let built: Vec<String> = buttons
            .iter()
            .map(|&index| builder.build(index).unwrap().to_string())
            .collect();
        assert!(started.elapsed() < std::time::Duration::from_secs(5));

        assert_eq!(built[0], "section:nth-of-type(1) > button:nth-of-type(1)");
        assert_eq!(
            built[buttons.len() - 1],
            "section:nth-of-type(300) > button:nth-of-type(40)"
        );
        for &index in buttons.iter().step_by(97) {
            let parsed: Selector = builder.build(index).unwrap().to_string().parse().unwrap();
            assert_eq!(parsed.query_all(&tree), vec![index]);
        }
    }

    #[test]
    fn parses_supported_subset() {
        let selector: Selector = "#nav > a:nth-of-type(2)".parse().unwrap();
        assert_eq!(
            selector.compounds(),
            &[
                Compound::Id("nav".into()),
                Compound::NthOfType {
                    tag: "a".into(),
                    position: 2
                }
            ]
        );
        let selector: Selector = "A".parse().unwrap();
        assert_eq!(selector.compounds(), &[Compound::Tag("a".into())]);
    }

    #[test]
    fn rejects_unsupported_syntax() {
        assert_eq!("".parse::<Selector>(), Err(SelectorParseError::Empty));
        assert!(".btn".parse::<Selector>().is_err());
        assert!("a:nth-of-type(0)".parse::<Selector>().is_err());
        assert!("a >".parse::<Selector>().is_err());
        assert!("div a".parse::<Selector>().is_err());
    }

    #[test]
    fn css_escape_matches_browser_rules() {
        assert_eq!(css_escape("main"), "main");
        assert_eq!(css_escape("1st"), "\\31 st");
        assert_eq!(css_escape("-2x"), "-\\32 x");
        assert_eq!(css_escape("-"), "\\-");
        assert_eq!(css_escape("a.b:c"), "a\\.b\\:c");
        assert_eq!(css_escape("über"), "über");
    }

    #[test]
    fn escaped_ids_round_trip_through_parser() {
        let mut tree = DomTree::new();
        let html = tree.push(DomElement::new("html"), None);
        tree.push(DomElement::new("button").with_attr("id", "1st.item"), Some(html));
        let selector = build(&tree, 1);
        assert_eq!(selector, "#\\31 st\\.item");
        let parsed: Selector = selector.parse().unwrap();
        assert_eq!(parsed.query_all(&tree), vec![1]);
    }
}
