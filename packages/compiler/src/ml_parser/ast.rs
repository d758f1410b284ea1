//! ML Parser AST
//!
//! The DOM shared by templates, rendered documents and generated stylesheets.

use crate::parse_util::ParseSourceSpan;

use super::tags::{split_qname, XSL_PREFIX};

/// Node type union
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(Text),
    Comment(Comment),
    ProcessingInstruction(ProcessingInstruction),
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn is_xsl(&self, local_name: &str) -> bool {
        self.as_element().is_some_and(|e| e.is_xsl(local_name))
    }

    /// Whitespace-only text node
    pub fn is_blank_text(&self) -> bool {
        matches!(self, Node::Text(text) if text.value.trim().is_empty())
    }

    pub fn text(value: impl Into<String>) -> Node {
        Node::Text(Text::new(value))
    }
}

/// Attribute node
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
    pub source_span: Option<ParseSourceSpan>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Attribute {
            name: name.into(),
            value: value.into(),
            source_span: None,
        }
    }
}

/// Element node
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<Attribute>,
    pub children: Vec<Node>,
    pub source_span: Option<ParseSourceSpan>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Element {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
            source_span: None,
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.iter().any(|a| a.name == name)
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|a| a.name == name) {
            Some(attr) => attr.value = value,
            None => self.attrs.push(Attribute::new(name, value)),
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<Attribute> {
        let index = self.attrs.iter().position(|a| a.name == name)?;
        Some(self.attrs.remove(index))
    }

    pub fn prefix(&self) -> Option<&str> {
        split_qname(&self.name).0
    }

    pub fn local_name(&self) -> &str {
        split_qname(&self.name).1
    }

    /// Whether this is the XSL instruction `xsl:{local_name}`
    pub fn is_xsl(&self, local_name: &str) -> bool {
        self.prefix() == Some(XSL_PREFIX) && self.local_name() == local_name
    }

    pub fn is_xsl_instruction(&self) -> bool {
        self.prefix() == Some(XSL_PREFIX)
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    /// Start tag as written in a template, used to point at the offending node in errors.
    pub fn start_tag(&self) -> String {
        let mut tag = format!("<{}", self.name);
        for attr in &self.attrs {
            tag.push_str(&format!(" {}=\"{}\"", attr.name, attr.value));
        }
        tag.push('>');
        tag
    }

    /// Concatenated text content of all descendants
    pub fn text_content(&self) -> String {
        let mut text = String::new();
        collect_text(&self.children, &mut text);
        text
    }
}

fn collect_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(t) => out.push_str(&t.value),
            Node::Element(e) => collect_text(&e.children, out),
            _ => {}
        }
    }
}

/// Text node
#[derive(Debug, Clone, PartialEq)]
pub struct Text {
    pub value: String,
    pub source_span: Option<ParseSourceSpan>,
}

impl Text {
    pub fn new(value: impl Into<String>) -> Self {
        Text {
            value: value.into(),
            source_span: None,
        }
    }
}

/// Comment node
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub value: String,
    pub source_span: Option<ParseSourceSpan>,
}

/// Processing instruction node
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingInstruction {
    pub target: String,
    pub content: String,
    pub source_span: Option<ParseSourceSpan>,
}

/// Visit every element of a forest depth-first, in document order.
pub fn walk_elements<'a>(nodes: &'a [Node], visit: &mut dyn FnMut(&'a Element)) {
    for node in nodes {
        if let Node::Element(element) = node {
            visit(element);
            walk_elements(&element.children, visit);
        }
    }
}

/// Mutable depth-first visit where the callback runs after the children were visited.
pub fn walk_elements_mut(nodes: &mut [Node], visit: &mut dyn FnMut(&mut Element)) {
    for node in nodes {
        if let Node::Element(element) = node {
            walk_elements_mut(&mut element.children, visit);
            visit(element);
        }
    }
}

/// Rewrites every child list of a forest (including the top level) bottom-up.
pub fn rewrite_child_lists(nodes: &mut Vec<Node>, rewrite: &mut dyn FnMut(&mut Vec<Node>)) {
    for node in nodes.iter_mut() {
        if let Node::Element(element) = node {
            rewrite_child_lists(&mut element.children, rewrite);
        }
    }
    rewrite(nodes);
}
