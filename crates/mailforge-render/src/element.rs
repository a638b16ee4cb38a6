//! Renderable element tree and its HTML serialization.

use std::fmt::{self, Write};

use crate::block::BlockId;
use crate::style::Declarations;

/// Tags written as self-closing elements.
const VOID_TAGS: &[&str] = &["br", "hr", "img"];

/// A node of the rendered tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// An element with attributes, inline style and children.
    Element(Element),
    /// Character data, escaped on output.
    Text(String),
}

impl Node {
    /// Creates a text node.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Returns the element if this node is one.
    #[must_use]
    pub const fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(element) => Some(element),
            Self::Text(_) => None,
        }
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Self::Element(element)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Element(element) => fmt::Display::fmt(element, f),
            Self::Text(text) => escape_html(f, text),
        }
    }
}

/// One element of the rendered tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    tag: &'static str,
    attributes: Vec<(&'static str, String)>,
    style: Declarations,
    children: Vec<Node>,
    block_id: Option<BlockId>,
}

impl Element {
    /// Creates an element with no attributes.
    #[must_use]
    pub const fn new(tag: &'static str) -> Self {
        Self {
            tag,
            attributes: Vec::new(),
            style: Declarations::new(),
            children: Vec::new(),
            block_id: None,
        }
    }

    /// Adds an attribute.
    #[must_use]
    pub fn attr(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.attributes.push((name, value.into()));
        self
    }

    /// Sets the inline style.
    #[must_use]
    pub fn style(mut self, style: Declarations) -> Self {
        self.style = style;
        self
    }

    /// Appends a child node.
    #[must_use]
    pub fn child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Appends child nodes.
    #[must_use]
    pub fn children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(children);
        self
    }

    pub(crate) fn set_block_id(&mut self, id: BlockId) {
        self.block_id = Some(id);
    }

    /// Tag name.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        self.tag
    }

    /// Value of an attribute.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Inline style declarations.
    #[must_use]
    pub const fn declarations(&self) -> &Declarations {
        &self.style
    }

    /// Child nodes.
    #[must_use]
    pub fn child_nodes(&self) -> &[Node] {
        &self.children
    }

    /// The block this element was rendered from, in interactive mode.
    #[must_use]
    pub const fn block_id(&self) -> Option<&BlockId> {
        self.block_id.as_ref()
    }

    /// Visits this element and every descendant element in document order.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Self)) {
        visit(self);
        for child in &self.children {
            if let Node::Element(element) = child {
                element.walk(visit);
            }
        }
    }

    /// Every descendant element (self included) with the given tag.
    #[must_use]
    pub fn find_all(&self, tag: &str) -> Vec<&Self> {
        let mut found = Vec::new();
        self.walk(&mut |element| {
            if element.tag == tag {
                found.push(element);
            }
        });
        found
    }

    /// Block ids carried by this element and its descendants, in document order.
    #[must_use]
    pub fn block_ids(&self) -> Vec<&BlockId> {
        let mut ids = Vec::new();
        self.walk(&mut |element| {
            if let Some(id) = &element.block_id {
                ids.push(id);
            }
        });
        ids
    }

    /// Concatenated text of all descendant text nodes.
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Node::Text(text) => out.push_str(text),
                Node::Element(element) => element.collect_text(out),
            }
        }
    }

    /// Indented outline of the element tree, one element per line.
    ///
    /// Elements rendered from a block show the block id in brackets.
    #[must_use]
    pub fn outline(&self) -> String {
        let mut out = String::new();
        self.write_outline(&mut out, 0);
        out
    }

    fn write_outline(&self, out: &mut String, depth: usize) {
        for _ in 0..depth {
            out.push_str("  ");
        }
        out.push_str(self.tag);
        if let Some(id) = &self.block_id {
            let _ = write!(out, " [{id}]");
        }
        out.push('\n');
        for child in &self.children {
            if let Node::Element(element) = child {
                element.write_outline(out, depth + 1);
            }
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.tag)?;
        if let Some(id) = &self.block_id {
            f.write_str(" data-block-id=\"")?;
            escape_html(f, id.as_str())?;
            f.write_char('"')?;
        }
        for (name, value) in &self.attributes {
            write!(f, " {name}=\"")?;
            escape_html(f, value)?;
            f.write_char('"')?;
        }
        if !self.style.is_empty() {
            f.write_str(" style=\"")?;
            escape_html(f, &self.style.to_string())?;
            f.write_char('"')?;
        }

        if VOID_TAGS.contains(&self.tag) {
            return f.write_str("/>");
        }

        f.write_char('>')?;
        for child in &self.children {
            fmt::Display::fmt(child, f)?;
        }
        write!(f, "</{}>", self.tag)
    }
}

/// Writes `text` with HTML special characters escaped.
///
/// # Errors
///
/// Returns an error if the writer fails.
pub fn escape_html(out: &mut impl Write, text: &str) -> fmt::Result {
    let mut last = 0;
    for (i, ch) in text.char_indices() {
        let entity = match ch {
            '&' => "&amp;",
            '<' => "&lt;",
            '>' => "&gt;",
            '"' => "&quot;",
            '\'' => "&#x27;",
            _ => continue,
        };
        out.write_str(&text[last..i])?;
        out.write_str(entity)?;
        last = i + ch.len_utf8();
    }
    out.write_str(&text[last..])
}
