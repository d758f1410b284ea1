//! Stylesheet Processor
//!
//! Executes generated stylesheets: templates are matched by element name, instructions build
//! a result tree with XSLT attribute semantics, and the tree is written out with the same
//! HTML rules as the imperative renderer.

use std::collections::HashMap;

use crate::error::{CompileError, RenderError};
use crate::expression_parser::evaluator::{evaluate, NodeRef, Value};
use crate::expression_parser::{
    evaluate_boolean, evaluate_string, parse_expression, split_avt, AvtPart, Context, Expr,
    Parameters,
};
use crate::ml_parser::ast::{Attribute, Comment, Element, Node};
use crate::ml_parser::html_tags::{
    escape_text, format_attribute, is_raw_text_element, is_void_element,
};
use crate::ml_parser::parse_document;

type RenderResult<T> = Result<T, RenderError>;

/// Instructions the processor executes inside templates
const INSTRUCTIONS: &[&str] = &[
    "apply-templates",
    "attribute",
    "choose",
    "comment",
    "copy-of",
    "element",
    "if",
    "otherwise",
    "text",
    "value-of",
    "when",
];

/// A loaded stylesheet, ready to transform documents
#[derive(Debug, Clone)]
pub struct Processor {
    /// Declared parameters and their default values
    params: Parameters,
    /// Template index by matched element name
    rules: HashMap<String, usize>,
    bodies: Vec<Vec<Node>>,
}

impl Processor {
    pub fn parse(xml: &str) -> crate::error::Result<Self> {
        let root = parse_document(xml, "stylesheet.xsl")?;
        Processor::new(&root)
    }

    pub fn new(stylesheet: &Element) -> crate::error::Result<Self> {
        if !stylesheet.is_xsl("stylesheet") && !stylesheet.is_xsl("transform") {
            return Err(CompileError::unsupported(
                stylesheet.start_tag(),
                "expected an xsl:stylesheet root",
            ));
        }

        let mut processor = Processor {
            params: Parameters::new(),
            rules: HashMap::new(),
            bodies: Vec::new(),
        };
        for element in stylesheet.child_elements() {
            match element.local_name() {
                "output" if element.is_xsl_instruction() => {}
                "param" if element.is_xsl_instruction() => {
                    let name = element.attr("name").ok_or_else(|| {
                        CompileError::unsupported(element.start_tag(), "missing name")
                    })?;
                    processor
                        .params
                        .insert(name.to_string(), default_value(element)?);
                }
                "template" if element.is_xsl_instruction() => {
                    let pattern = element.attr("match").ok_or_else(|| {
                        CompileError::unsupported(element.start_tag(), "missing match pattern")
                    })?;
                    let mut body = element.children.clone();
                    strip_space(&mut body);
                    validate(&body)?;
                    let index = processor.bodies.len();
                    processor.bodies.push(body);
                    for name in pattern.split('|').map(str::trim).filter(|n| !n.is_empty()) {
                        processor.rules.insert(name.to_string(), index);
                    }
                }
                _ => {
                    return Err(CompileError::unsupported(
                        element.start_tag(),
                        "not a supported top-level element",
                    ))
                }
            }
        }
        Ok(processor)
    }

    /// Transform a document and serialize the result as HTML. Only declared parameters are
    /// visible to the stylesheet.
    pub fn transform(&self, xml: &str, params: &Parameters) -> RenderResult<String> {
        let root = parse_document(xml, "document.xml")?;
        let nodes = self.transform_element(&root, params)?;
        Ok(serialize_html(&nodes))
    }

    /// Build the result tree for a document root. The root itself is never matched.
    pub fn transform_element(&self, root: &Element, params: &Parameters) -> RenderResult<Vec<Node>> {
        let mut effective = self.params.clone();
        for (name, value) in effective.iter_mut() {
            if let Some(given) = params.get(name) {
                value.clone_from(given);
            }
        }
        let execution = Execution {
            processor: self,
            params: &effective,
        };
        let mut fragment = Fragment::default();
        execution.apply_templates(root, &mut fragment)?;
        Ok(fragment.nodes)
    }
}

fn default_value(param: &Element) -> crate::error::Result<String> {
    let Some(select) = param.attr("select") else {
        return Ok(param.text_content());
    };
    let expr = parse_expression(select)
        .map_err(|error| CompileError::unsupported(param.start_tag(), error.msg))?;
    let empty = Element::new("r");
    let params = Parameters::new();
    evaluate_string(&expr, &Context::new(&empty, &params))
        .map_err(|error| CompileError::unsupported(param.start_tag(), error.to_string()))
}

/// Drop whitespace-only text, except inside `xsl:text`.
fn strip_space(nodes: &mut Vec<Node>) {
    nodes.retain(|node| !matches!(node, Node::Comment(_)) && !node.is_blank_text());
    for node in nodes.iter_mut() {
        if let Node::Element(element) = node {
            if !element.is_xsl("text") {
                strip_space(&mut element.children);
            }
        }
    }
}

fn validate(nodes: &[Node]) -> crate::error::Result<()> {
    for node in nodes {
        let Node::Element(element) = node else {
            continue;
        };
        if element.is_xsl_instruction() {
            if !INSTRUCTIONS.contains(&element.local_name()) {
                return Err(CompileError::unsupported(
                    element.start_tag(),
                    "not supported by the stylesheet processor",
                ));
            }
            if element.attr("disable-output-escaping") == Some("yes") {
                return Err(CompileError::unsupported(
                    element.start_tag(),
                    "disable-output-escaping is not supported by the stylesheet processor",
                ));
            }
        }
        validate(&element.children)?;
    }
    Ok(())
}

/// Result nodes under construction, plus the attributes of the element that will own them
#[derive(Debug, Default)]
struct Fragment {
    attrs: Vec<Attribute>,
    nodes: Vec<Node>,
    /// An instruction writing content ran, even if it wrote nothing
    started: bool,
}

impl Fragment {
    fn start_content(&mut self) {
        self.started = true;
    }

    fn push_text(&mut self, text: String) {
        self.started = true;
        if text.is_empty() {
            return;
        }
        match self.nodes.last_mut() {
            Some(Node::Text(last)) => last.value.push_str(&text),
            _ => self.nodes.push(Node::text(text)),
        }
    }

    /// Attributes added once content has started are ignored, as XSLT processors recover
    /// from it. A later attribute replaces an earlier one of the same name in place.
    fn set_attribute(&mut self, name: &str, value: String) {
        if self.started {
            log::debug!("ignoring attribute '{}' added after element content", name);
            return;
        }
        match self.attrs.iter_mut().find(|attr| attr.name == name) {
            Some(attr) => attr.value = value,
            None => self.attrs.push(Attribute::new(name, value)),
        }
    }

    fn push_node(&mut self, node: Node) {
        self.started = true;
        self.nodes.push(node);
    }

    fn into_element(self, name: String) -> Element {
        let mut element = Element::new(name);
        element.attrs = self.attrs;
        element.children = self.nodes;
        element
    }
}

struct Execution<'p> {
    processor: &'p Processor,
    params: &'p Parameters,
}

impl Execution<'_> {
    fn apply_templates(&self, context: &Element, out: &mut Fragment) -> RenderResult<()> {
        out.start_content();
        for child in &context.children {
            match child {
                Node::Text(text) => out.push_text(text.value.clone()),
                Node::Element(child) => match self.processor.rules.get(&child.name) {
                    Some(index) => self.instantiate(&self.processor.bodies[*index], child, out)?,
                    None => self.apply_templates(child, out)?,
                },
                Node::Comment(_) | Node::ProcessingInstruction(_) => {}
            }
        }
        Ok(())
    }

    fn instantiate(&self, body: &[Node], context: &Element, out: &mut Fragment) -> RenderResult<()> {
        for node in body {
            match node {
                Node::Text(text) => out.push_text(text.value.clone()),
                Node::Element(element) if element.is_xsl_instruction() => {
                    self.instruction(element, context, out)?
                }
                Node::Element(element) => {
                    let mut inner = Fragment::default();
                    for attr in &element.attrs {
                        if attr.name == "xmlns" || attr.name.starts_with("xmlns:") {
                            continue;
                        }
                        let value = self.avt(&attr.value, context)?;
                        inner.set_attribute(&attr.name, value);
                    }
                    self.instantiate(&element.children, context, &mut inner)?;
                    out.push_node(Node::Element(inner.into_element(element.name.clone())));
                }
                Node::Comment(_) | Node::ProcessingInstruction(_) => {}
            }
        }
        Ok(())
    }

    fn instruction(&self, element: &Element, context: &Element, out: &mut Fragment) -> RenderResult<()> {
        match element.local_name() {
            "apply-templates" => self.apply_templates(context, out),
            "text" => {
                let text = element.text_content();
                if !text.is_empty() {
                    out.push_text(text);
                }
                Ok(())
            }
            "value-of" => {
                let expr = self.select(element)?;
                out.push_text(evaluate_string(&expr, &self.ctx(context))?);
                Ok(())
            }
            "if" => {
                if self.test(element, context)? {
                    self.instantiate(&element.children, context, out)?;
                }
                Ok(())
            }
            "choose" => {
                for branch in element.child_elements() {
                    if branch.is_xsl("otherwise") || self.test(branch, context)? {
                        return self.instantiate(&branch.children, context, out);
                    }
                }
                Ok(())
            }
            "attribute" => {
                let name = self.avt(element.attr("name").unwrap_or_default(), context)?;
                let mut value = Fragment::default();
                self.instantiate(&element.children, context, &mut value)?;
                out.set_attribute(&name, text_of(&value.nodes));
                Ok(())
            }
            "element" => {
                let name = self.avt(element.attr("name").unwrap_or_default(), context)?;
                let mut inner = Fragment::default();
                self.instantiate(&element.children, context, &mut inner)?;
                out.push_node(Node::Element(inner.into_element(name)));
                Ok(())
            }
            "comment" => {
                let mut content = Fragment::default();
                self.instantiate(&element.children, context, &mut content)?;
                out.push_node(Node::Comment(Comment {
                    value: text_of(&content.nodes),
                    source_span: None,
                }));
                Ok(())
            }
            "copy-of" => self.copy_of(element, context, out),
            _ => Err(RenderError::Stylesheet(element.name.clone())),
        }
    }

    fn copy_of(&self, element: &Element, context: &Element, out: &mut Fragment) -> RenderResult<()> {
        let expr = self.select(element)?;
        match evaluate(&expr, &self.ctx(context))? {
            Value::NodeSet(mut nodes) => {
                nodes.sort_by_key(|node| attribute_position(context, node));
                for node in nodes {
                    match node {
                        NodeRef::Attribute(attr) => out.set_attribute(&attr.name, attr.value.clone()),
                        NodeRef::Element(copied) => out.push_node(Node::Element(copied.clone())),
                        NodeRef::Text(text) => out.push_text(text.value.clone()),
                    }
                }
            }
            value => out.push_text(value.to_string_value()),
        }
        Ok(())
    }

    fn ctx<'a>(&'a self, context: &'a Element) -> Context<'a> {
        Context::new(context, self.params)
    }

    fn select(&self, element: &Element) -> RenderResult<Expr> {
        expression(element.attr("select").unwrap_or_default())
    }

    fn test(&self, element: &Element, context: &Element) -> RenderResult<bool> {
        let expr = expression(element.attr("test").unwrap_or_default())?;
        evaluate_boolean(&expr, &self.ctx(context))
    }

    fn avt(&self, value: &str, context: &Element) -> RenderResult<String> {
        let parts = split_avt(value).map_err(|reason| RenderError::Evaluation {
            expr: value.to_string(),
            reason,
        })?;
        let mut text = String::new();
        for part in parts {
            match part {
                AvtPart::Literal(literal) => text.push_str(&literal),
                AvtPart::Expression(source) => {
                    text.push_str(&evaluate_string(&expression(&source)?, &self.ctx(context))?)
                }
            }
        }
        Ok(text)
    }
}

fn expression(source: &str) -> RenderResult<Expr> {
    parse_expression(source).map_err(|error| RenderError::Evaluation {
        expr: source.to_string(),
        reason: error.msg,
    })
}

/// Attributes of the context element sort in document order, anything else after them.
fn attribute_position(context: &Element, node: &NodeRef<'_>) -> usize {
    match node {
        NodeRef::Attribute(attr) => context
            .attrs
            .iter()
            .position(|candidate| std::ptr::eq(candidate, *attr))
            .unwrap_or(usize::MAX),
        _ => usize::MAX,
    }
}

fn text_of(nodes: &[Node]) -> String {
    let mut text = String::new();
    for node in nodes {
        match node {
            Node::Text(t) => text.push_str(&t.value),
            Node::Element(element) => text.push_str(&element.text_content()),
            _ => {}
        }
    }
    text
}

/// Serialize a result tree with HTML output rules.
pub fn serialize_html(nodes: &[Node]) -> String {
    let mut out = String::new();
    write_nodes(nodes, false, &mut out);
    out
}

fn write_nodes(nodes: &[Node], raw: bool, out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) if raw => out.push_str(&text.value),
            Node::Text(text) => out.push_str(&escape_text(&text.value)),
            Node::Comment(comment) => {
                out.push_str("<!--");
                out.push_str(&comment.value);
                out.push_str("-->");
            }
            Node::Element(element) => {
                out.push('<');
                out.push_str(&element.name);
                for attr in &element.attrs {
                    out.push_str(&format_attribute(&attr.name, &attr.value));
                }
                out.push('>');
                if is_void_element(&element.name) {
                    continue;
                }
                write_nodes(
                    &element.children,
                    raw || is_raw_text_element(&element.name),
                    out,
                );
                out.push_str("</");
                out.push_str(&element.name);
                out.push('>');
            }
            Node::ProcessingInstruction(_) => {}
        }
    }
}
