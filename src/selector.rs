//! Selector generation and the matching dialect it emits.
//!
//! Generated selectors are either `#id` or a bounded child-combinator
//! path like `div.card > ul > li:nth-of-type(2)`. Re-location is
//! probabilistic by design: when two generated selectors collide, the
//! first match in document order wins at locate time.

use std::iter::Peekable;
use std::str::Chars;

use anyhow::{anyhow, bail, Context, Result};

use crate::dom::{NodeId, PageDom};
use crate::settings::SelectorPolicy;

/// Derive a deterministic textual locator for `node`. Pure in the DOM at
/// call time; always returns some string.
pub fn generate(dom: &dyn PageDom, node: NodeId, policy: &SelectorPolicy) -> String {
    // Ids are assumed page-unique, so an id is an unconditional shortcut.
    if let Some(id) = dom.element_id(node).filter(|id| !id.is_empty()) {
        return format!("#{}", escape_ident(&id));
    }

    let mut path: Vec<String> = Vec::new();
    let mut current = Some(node);

    while let Some(n) = current {
        if dom.is_root_container(n) {
            break;
        }

        let mut segment = dom.tag_name(n).to_lowercase();

        let classes: Vec<String> = dom
            .classes(n)
            .into_iter()
            .filter(|class| !class.is_empty() && !class.starts_with(&policy.ui_class_prefix))
            .take(policy.max_classes)
            .map(|class| escape_ident(&class))
            .collect();
        if !classes.is_empty() {
            segment.push('.');
            segment.push_str(&classes.join("."));
        }

        // Positional index only when tag+class leaves sibling ambiguity.
        let (position, same_tag) = dom.same_tag_position(n);
        if same_tag > 1 {
            segment.push_str(&format!(":nth-of-type({position})"));
        }

        path.insert(0, segment);
        if path.len() >= policy.max_depth {
            break;
        }
        current = dom.parent(n);
    }

    path.join(" > ")
}

/// Escape a string for use as a CSS identifier, equivalent to
/// `CSS.escape` for the inputs this tool can encounter.
pub fn escape_ident(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let starts_with_dash = raw.starts_with('-');

    for (index, ch) in raw.chars().enumerate() {
        match ch {
            '\0' => out.push('\u{FFFD}'),
            c if c.is_ascii_digit() && (index == 0 || (index == 1 && starts_with_dash)) => {
                out.push_str(&format!("\\{:x} ", c as u32));
            }
            '-' if raw.chars().count() == 1 => out.push_str("\\-"),
            c if c.is_ascii_alphanumeric() || c == '-' || c == '_' || (c as u32) >= 0x80 => {
                out.push(c);
            }
            c if (c as u32) < 0x20 || (c as u32) == 0x7f => {
                out.push_str(&format!("\\{:x} ", c as u32));
            }
            c => {
                out.push('\\');
                out.push(c);
            }
        }
    }
    out
}

/// One parsed path segment: `tag[.class…][:nth-of-type(n)]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub tag: String,
    pub classes: Vec<String>,
    pub nth: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedSelector {
    Id(String),
    Path(Vec<Segment>),
}

/// Parse the selector dialect [`generate`] emits. Anything outside that
/// dialect is an error, which locate treats as a miss.
pub fn parse(selector: &str) -> Result<ParsedSelector> {
    let raw = selector.trim();
    if raw.is_empty() {
        bail!("empty selector");
    }

    if let Some(id) = raw.strip_prefix('#') {
        if id.is_empty() {
            bail!("id selector missing identifier");
        }
        let mut chars = id.chars().peekable();
        let ident = read_ident(&mut chars, &[])?;
        if chars.peek().is_some() {
            bail!("unexpected trailing input in id selector '{raw}'");
        }
        return Ok(ParsedSelector::Id(ident));
    }

    let mut segments = Vec::new();
    for part in raw.split(" > ") {
        segments.push(parse_segment(part.trim())?);
    }
    Ok(ParsedSelector::Path(segments))
}

fn parse_segment(raw: &str) -> Result<Segment> {
    let mut chars = raw.chars().peekable();

    let mut tag = String::new();
    while let Some(&c) = chars.peek() {
        if c == '.' || c == ':' {
            break;
        }
        if !(c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-') {
            bail!("unexpected '{c}' in tag name of segment '{raw}'");
        }
        tag.push(c);
        chars.next();
    }
    if tag.is_empty() {
        bail!("segment '{raw}' is missing a tag name");
    }

    let mut classes = Vec::new();
    let mut nth = None;
    while let Some(&c) = chars.peek() {
        match c {
            '.' => {
                chars.next();
                let class = read_ident(&mut chars, &['.', ':'])?;
                if class.is_empty() {
                    bail!("empty class name in segment '{raw}'");
                }
                classes.push(class);
            }
            ':' => {
                let rest: String = chars.collect();
                let inner = rest
                    .strip_prefix(":nth-of-type(")
                    .and_then(|r| r.strip_suffix(')'))
                    .ok_or_else(|| anyhow!("unsupported pseudo-class in segment '{raw}'"))?;
                let index: usize = inner
                    .parse()
                    .with_context(|| format!("invalid positional index in segment '{raw}'"))?;
                if index == 0 {
                    bail!("positional index is 1-based in segment '{raw}'");
                }
                nth = Some(index);
                break;
            }
            _ => bail!("unexpected '{c}' in segment '{raw}'"),
        }
    }

    Ok(Segment { tag, classes, nth })
}

/// Read an identifier, resolving backslash escapes, stopping at any of
/// `stops` (unescaped) or end of input.
fn read_ident(chars: &mut Peekable<Chars<'_>>, stops: &[char]) -> Result<String> {
    let mut out = String::new();
    while let Some(&c) = chars.peek() {
        if stops.contains(&c) {
            break;
        }
        chars.next();
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            None => bail!("dangling escape at end of selector"),
            Some(next) if next.is_ascii_hexdigit() => {
                let mut hex = String::new();
                while hex.len() < 6 {
                    match chars.peek() {
                        Some(h) if h.is_ascii_hexdigit() => {
                            hex.push(*h);
                            chars.next();
                        }
                        _ => break,
                    }
                }
                // A single whitespace terminates the hex escape.
                if chars.peek() == Some(&' ') {
                    chars.next();
                }
                let code = u32::from_str_radix(&hex, 16)
                    .with_context(|| format!("invalid hex escape '\\{hex}'"))?;
                out.push(char::from_u32(code).unwrap_or('\u{FFFD}'));
            }
            Some(_) => {
                let literal = chars.next().unwrap_or('\u{FFFD}');
                out.push(literal);
            }
        }
    }
    Ok(out)
}

/// Whether `node` matches `parsed` against the current DOM. Path
/// segments bind right-to-left through the immediate parent chain
/// (child combinator); a truncated path matches anywhere in the tree,
/// mirroring CSS descendant anchoring.
pub fn matches(dom: &dyn PageDom, node: NodeId, parsed: &ParsedSelector) -> bool {
    match parsed {
        ParsedSelector::Id(id) => dom.element_id(node).as_deref() == Some(id.as_str()),
        ParsedSelector::Path(segments) => {
            let mut current = node;
            for (index, segment) in segments.iter().rev().enumerate() {
                if index > 0 {
                    match dom.parent(current) {
                        Some(parent) => current = parent,
                        None => return false,
                    }
                }
                if !segment_matches(dom, current, segment) {
                    return false;
                }
            }
            true
        }
    }
}

fn segment_matches(dom: &dyn PageDom, node: NodeId, segment: &Segment) -> bool {
    if dom.tag_name(node).to_lowercase() != segment.tag {
        return false;
    }
    let have = dom.classes(node);
    if !segment
        .classes
        .iter()
        .all(|want| have.iter().any(|class| class == want))
    {
        return false;
    }
    if let Some(nth) = segment.nth {
        if dom.same_tag_position(node).0 != nth {
            return false;
        }
    }
    true
}
