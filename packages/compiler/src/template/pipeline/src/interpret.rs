//! IR Interpreter
//!
//! Renders a document directly from template IR. It is the reference the optimizer is
//! checked against: closes only fire while the start tag is still open, void elements drop
//! their content, and escaping is worked out from the tree instead of the IR's annotations.
//! Attributes are collected per start tag and dropped once it has been closed.
//! With implicit closes enabled it also renders IR that has not been normalized.

use indexmap::IndexMap;

use crate::error::RenderError;
use crate::expression_parser::{evaluate_boolean, evaluate_string, Context, Parameters};
use crate::ml_parser::ast as ml;
use crate::ml_parser::html_tags::{
    escape_text, format_attribute, is_raw_text_element, is_void_element,
};
use crate::ml_parser::parse_document;
use crate::template::pipeline::ir::{
    ElementId, ElementNode, Name, Node, OutputValue, Template, VoidKind, XPathExpr,
};

type RenderResult<T> = Result<T, RenderError>;

pub struct Interpreter<'a> {
    templates: &'a IndexMap<String, Template>,
    params: &'a Parameters,
    implicit_closes: bool,
}

/// Where the nodes being rendered write to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Content { raw: bool },
    Attribute,
    Comment,
}

/// An element whose end tag has not been written yet
struct Frame {
    id: ElementId,
    start_open: bool,
    void: bool,
    /// Buffer length right after the start tag was closed
    content_start: Option<usize>,
    /// Unescaped values; a repeated name replaces the value in place
    attributes: IndexMap<String, String>,
}

impl Frame {
    fn add_attribute(&mut self, name: String, value: String) {
        if self.start_open {
            self.attributes.insert(name, value);
        } else {
            log::trace!("attribute {} ignored after the start tag of element {}", name, self.id);
        }
    }
}

impl<'a> Interpreter<'a> {
    pub fn new(templates: &'a IndexMap<String, Template>, params: &'a Parameters) -> Self {
        Interpreter {
            templates,
            params,
            implicit_closes: false,
        }
    }

    /// Close the nearest start tag before any content, for IR without close tags.
    pub fn with_implicit_closes(mut self, implicit_closes: bool) -> Self {
        self.implicit_closes = implicit_closes;
        self
    }

    pub fn render(&self, xml: &str) -> RenderResult<String> {
        let root = parse_document(xml, "document.xml")?;
        let mut out = String::new();
        self.apply_children(&root, false, &mut out)?;
        Ok(out)
    }

    fn apply_children(&self, node: &ml::Element, raw: bool, out: &mut String) -> RenderResult<()> {
        for child in &node.children {
            match child {
                ml::Node::Text(text) if raw => out.push_str(&text.value),
                ml::Node::Text(text) => out.push_str(&escape_text(&text.value)),
                ml::Node::Element(element) => self.render_tag(element, raw, out)?,
                _ => {}
            }
        }
        Ok(())
    }

    fn render_tag(&self, element: &ml::Element, raw: bool, out: &mut String) -> RenderResult<()> {
        match self.templates.get(&element.name) {
            Some(template) => {
                let mut frames = Vec::new();
                self.render_list(
                    &template.nodes,
                    element,
                    Scope::Content { raw },
                    out,
                    &mut frames,
                )
            }
            None => self.apply_children(element, raw, out),
        }
    }

    fn render_list(
        &self,
        nodes: &[Node],
        context: &ml::Element,
        scope: Scope,
        out: &mut String,
        frames: &mut Vec<Frame>,
    ) -> RenderResult<()> {
        for node in nodes {
            self.render_node(node, context, scope, out, frames)?;
        }
        Ok(())
    }

    fn render_node(
        &self,
        node: &Node,
        context: &ml::Element,
        scope: Scope,
        out: &mut String,
        frames: &mut Vec<Frame>,
    ) -> RenderResult<()> {
        let writes_content = matches!(
            node,
            Node::Element(_) | Node::Output(_) | Node::Comment(_) | Node::ApplyChildren
        );
        if self.implicit_closes && writes_content && matches!(scope, Scope::Content { .. }) {
            if let Some(frame) = frames.last_mut() {
                close_frame(frame, out);
            }
        }

        match node {
            Node::Element(element) => self.render_element(element, context, out, frames)?,
            Node::Attribute(attribute) => {
                let name = self.name(&attribute.name, context)?;
                let mut value = String::new();
                self.render_list(&attribute.children, context, Scope::Attribute, &mut value, frames)?;
                if let Some(frame) = frames.last_mut() {
                    frame.add_attribute(name, value);
                }
            }
            Node::Output(output) => {
                let text = self.output_value(&output.value, context)?;
                match scope {
                    Scope::Content { raw: false } if !output.disable_escaping => {
                        out.push_str(&escape_text(&text))
                    }
                    _ => out.push_str(&text),
                }
            }
            Node::Switch(switch) => {
                for case in &switch.cases {
                    let selected = match &case.test {
                        Some(test) => self.test(test, context)?,
                        None => true,
                    };
                    if selected {
                        self.render_list(&case.children, context, scope, out, frames)?;
                        break;
                    }
                }
            }
            Node::CloseTag(close) => {
                if let Some(frame) = frames.iter_mut().rev().find(|frame| frame.id == close.id) {
                    close_frame(frame, out);
                }
            }
            Node::ApplyChildren => {
                let raw = matches!(scope, Scope::Content { raw: true });
                self.apply_children(context, raw, out)?;
            }
            Node::Comment(comment) => {
                let mut text = String::new();
                self.render_list(&comment.children, context, Scope::Comment, &mut text, frames)?;
                out.push_str("<!--");
                out.push_str(&text);
                out.push_str("-->");
            }
            Node::CopyAttributes(copy) => {
                let Some(frame) = frames.last_mut() else {
                    return Ok(());
                };
                for attr in &context.attrs {
                    let selected = match &copy.names {
                        Some(names) => names.contains(&attr.name),
                        None => true,
                    };
                    if selected {
                        frame.add_attribute(attr.name.clone(), attr.value.clone());
                    }
                }
            }
        }
        Ok(())
    }

    fn render_element(
        &self,
        element: &ElementNode,
        context: &ml::Element,
        out: &mut String,
        frames: &mut Vec<Frame>,
    ) -> RenderResult<()> {
        let name = self.name(&element.name, context)?;
        let void = element.void == VoidKind::Yes || is_void_element(&name);
        let raw = matches!(&element.name, Name::Static(name) if is_raw_text_element(name));

        out.push('<');
        out.push_str(&name);
        frames.push(Frame {
            id: element.id,
            start_open: true,
            void,
            content_start: None,
            attributes: IndexMap::new(),
        });
        self.render_list(&element.children, context, Scope::Content { raw }, out, frames)?;
        let Some(mut frame) = frames.pop() else {
            return Ok(());
        };
        close_frame(&mut frame, out);
        if frame.void {
            if let Some(content_start) = frame.content_start {
                out.truncate(content_start);
            }
        } else {
            out.push_str("</");
            out.push_str(&name);
            out.push('>');
        }
        Ok(())
    }

    fn name(&self, name: &Name, context: &ml::Element) -> RenderResult<String> {
        match name {
            Name::Static(name) => Ok(name.clone()),
            Name::Dynamic(parts) => {
                let mut text = String::new();
                for part in parts {
                    text.push_str(&self.output_value(part, context)?);
                }
                Ok(text)
            }
        }
    }

    fn output_value(&self, value: &OutputValue, context: &ml::Element) -> RenderResult<String> {
        match value {
            OutputValue::Literal(text) => Ok(text.clone()),
            OutputValue::XPath(expr) => {
                let ast = parsed(expr)?;
                evaluate_string(&ast, &Context::new(context, self.params))
            }
        }
    }

    fn test(&self, expr: &XPathExpr, context: &ml::Element) -> RenderResult<bool> {
        let ast = parsed(expr)?;
        evaluate_boolean(&ast, &Context::new(context, self.params))
    }
}

fn parsed(expr: &XPathExpr) -> RenderResult<crate::expression_parser::Expr> {
    expr.ast().map_err(|error| RenderError::Evaluation {
        expr: expr.source.clone(),
        reason: error.to_string(),
    })
}

fn close_frame(frame: &mut Frame, out: &mut String) {
    if frame.start_open {
        for (name, value) in frame.attributes.drain(..) {
            out.push_str(&format_attribute(&name, &value));
        }
        out.push('>');
        frame.start_open = false;
        frame.content_start = Some(out.len());
    }
}
