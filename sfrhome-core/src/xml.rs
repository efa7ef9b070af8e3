//! Tolerant XML tree builder.
//!
//! The portal's device list is not always well-formed. This module reads it
//! with `quick-xml` in a recovering mode and builds a small owned tree:
//!
//! - a mismatched end tag closes the nearest open element with that name
//! - an end tag with no matching open element is ignored
//! - malformed fragments are skipped, including tags whose name is not a
//!   valid XML name
//! - elements still open at end of input are closed
//!
//! Input that yields no element at all is reported as undecodable.

use indexmap::IndexMap;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, trace};

use crate::error::CoreError;

/// Parse errors tolerated before giving up on the rest of the input.
const MAX_RECOVERED_ERRORS: usize = 256;

// ============================================================================
// Tree
// ============================================================================

/// An element of the parsed tree.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlNode {
    /// Local tag name.
    pub name: String,
    /// Attributes in document order.
    pub attrs: IndexMap<String, String>,
    /// Child elements in document order.
    pub children: Vec<XmlNode>,
    /// Concatenated text content (direct text only).
    pub text: String,
}

impl XmlNode {
    /// Creates an empty element.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns an attribute value.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    /// Returns the first direct child with the given tag.
    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Returns the trimmed text of the first direct child with the given
    /// tag, or None when that text is empty.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name)
            .map(|c| c.text.trim())
            .filter(|t| !t.is_empty())
    }

    /// Collects descendants (not including `self`) named `name`, in document
    /// order, including matches nested inside other matches. Elements named
    /// in `stop_at` are not entered.
    pub fn find_all<'a>(&'a self, name: &str, stop_at: &[&str]) -> Vec<&'a XmlNode> {
        let mut out = Vec::new();
        self.collect_into(name, stop_at, &mut out);
        out
    }

    fn collect_into<'a>(&'a self, name: &str, stop_at: &[&str], out: &mut Vec<&'a XmlNode>) {
        for child in &self.children {
            if child.name == name {
                out.push(child);
            }
            if !stop_at.contains(&child.name.as_str()) {
                child.collect_into(name, stop_at, out);
            }
        }
    }

    /// Returns the first element in pre-order (`self` included) matching
    /// `pred`.
    pub fn find_first(&self, pred: &impl Fn(&XmlNode) -> bool) -> Option<&XmlNode> {
        if pred(self) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find_first(pred))
    }
}

/// A parsed document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlDocument {
    /// Top-level elements. Well-formed input has exactly one.
    pub roots: Vec<XmlNode>,
    /// Number of parse errors that were skipped.
    pub recovered_errors: usize,
}

impl XmlDocument {
    /// Returns the document element.
    pub fn root(&self) -> Option<&XmlNode> {
        self.roots.first()
    }
}

// ============================================================================
// Parser
// ============================================================================

/// Parses `bytes` into a tree, recovering from malformed markup.
///
/// # Errors
///
/// Returns [`CoreError::Undecodable`] when no element could be read.
pub fn parse_tolerant(bytes: &[u8]) -> Result<XmlDocument, CoreError> {
    let mut reader = Reader::from_reader(bytes);
    let config = reader.config_mut();
    config.trim_text(true);
    config.check_end_names = false;

    let mut builder = TreeBuilder::default();
    let mut errors = 0usize;
    let mut last_error: Option<String> = None;

    loop {
        let before = reader.buffer_position();
        match reader.read_event() {
            Ok(Event::Start(e) | Event::Empty(e)) if !is_xml_name(e.local_name().as_ref()) => {
                errors += 1;
                trace!(position = before, "Skipping tag with invalid name");
            }
            Ok(Event::Start(e)) => builder.open(element_from(&e)),
            Ok(Event::Empty(e)) => builder.attach(element_from(&e)),
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                builder.close(&name);
            }
            Ok(Event::Text(t)) => {
                let text = match t.unescape() {
                    Ok(s) => s.into_owned(),
                    Err(_) => String::from_utf8_lossy(&t).into_owned(),
                };
                builder.text(&text);
            }
            Ok(Event::CData(c)) => builder.text(&String::from_utf8_lossy(&c)),
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                errors += 1;
                trace!(error = %e, position = before, "Skipping malformed XML fragment");
                last_error = Some(e.to_string());
                if errors >= MAX_RECOVERED_ERRORS || reader.buffer_position() <= before {
                    debug!(errors, "Stopping XML recovery");
                    break;
                }
            }
        }
    }

    let roots = builder.finish();
    if roots.is_empty() {
        return Err(CoreError::Undecodable(
            last_error.unwrap_or_else(|| "no XML element found".to_string()),
        ));
    }

    if errors > 0 {
        debug!(errors, "Recovered from malformed XML");
    }

    Ok(XmlDocument {
        roots,
        recovered_errors: errors,
    })
}

fn is_xml_name(name: &[u8]) -> bool {
    let name = String::from_utf8_lossy(name);
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'))
}

fn element_from(start: &BytesStart<'_>) -> XmlNode {
    let mut node = XmlNode::new(String::from_utf8_lossy(start.local_name().as_ref()));
    for attr in start.attributes().with_checks(false).flatten() {
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = match attr.unescape_value() {
            Ok(v) => v.into_owned(),
            Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
        };
        node.attrs.entry(key).or_insert(value);
    }
    node
}

#[derive(Default)]
struct TreeBuilder {
    stack: Vec<XmlNode>,
    roots: Vec<XmlNode>,
}

impl TreeBuilder {
    fn open(&mut self, node: XmlNode) {
        self.stack.push(node);
    }

    fn attach(&mut self, node: XmlNode) {
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.roots.push(node),
        }
    }

    fn close(&mut self, name: &str) {
        let Some(depth) = self.stack.iter().rposition(|n| n.name == name) else {
            trace!(name, "Ignoring stray end tag");
            return;
        };
        while self.stack.len() > depth {
            if let Some(node) = self.stack.pop() {
                self.attach(node);
            }
        }
    }

    fn text(&mut self, text: &str) {
        if let Some(node) = self.stack.last_mut() {
            node.text.push_str(text);
        }
    }

    fn finish(mut self) -> Vec<XmlNode> {
        while let Some(node) = self.stack.pop() {
            self.attach(node);
        }
        self.roots
    }
}

// ============================================================================
// Tests
// ============================================================================
