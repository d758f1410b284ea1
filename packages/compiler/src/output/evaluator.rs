//! Statement Evaluator
//!
//! The imperative renderer. A document is parsed once, then every element is rendered by
//! executing the statements compiled for its tag; tags without a template are transparent.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::error::RenderError;
use crate::expression_parser::{evaluate_boolean, evaluate_string, Context, Parameters};
use crate::ml_parser::ast::{Element, Node};
use crate::ml_parser::html_tags::{
    escape_attribute, escape_text, is_boolean_attribute, is_void_element,
};
use crate::ml_parser::parse_document;
use crate::template::pipeline::ir::ElementId;

use super::abstract_emitter::emit_program;
use super::output_ast::{
    ApplyChildrenStmt, AttributeStmt, BoolExpr, CloseTagStmt, CompareOp, CopyAttributesStmt,
    DispatchKey, DispatchStmt, ElementStmt, Escape, IfStmt, Operand, OutputStmt, Program,
    Statement, StatementVisitor, StringExpr, XPathFallback,
};
use super::quick;

type RenderResult<T> = Result<T, RenderError>;

/// Renders documents with a compiled program. Immutable once built; every call works on
/// its own buffers.
#[derive(Debug, Clone)]
pub struct Renderer {
    program: Program,
    params: Parameters,
    quick_path: bool,
}

impl Renderer {
    pub fn new(program: Program, params: Parameters) -> Self {
        Renderer {
            program,
            params,
            quick_path: true,
        }
    }

    pub fn with_quick_path(mut self, quick_path: bool) -> Self {
        self.quick_path = quick_path;
        self
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn parameters(&self) -> &Parameters {
        &self.params
    }

    /// Render a document, through the quick path when it is enabled and applicable.
    pub fn render(&self, xml: &str) -> RenderResult<String> {
        if self.quick_path {
            if let Some(html) = self.try_quick(xml) {
                return Ok(html);
            }
        }
        self.render_tree(xml)
    }

    /// Render a document by walking its tree.
    pub fn render_tree(&self, xml: &str) -> RenderResult<String> {
        let root = parse_document(xml, "document.xml")?;
        let mut out = String::new();
        self.apply_children(&root, false, &mut out)?;
        Ok(out)
    }

    /// Render a document by substitution over its markup, or `None` when the document or
    /// one of the templates it uses needs the tree.
    pub fn try_quick(&self, xml: &str) -> Option<String> {
        quick::try_quick(self, xml)
    }

    /// Source text of the program's `render` function.
    pub fn source(&self) -> String {
        emit_program(&self.program)
    }

    pub(super) fn apply_children(
        &self,
        element: &Element,
        raw: bool,
        out: &mut String,
    ) -> RenderResult<()> {
        for child in &element.children {
            match child {
                Node::Text(text) if raw => out.push_str(&text.value),
                Node::Text(text) => out.push_str(&escape_text(&text.value)),
                Node::Element(child) => self.render_element(child, raw, out)?,
                Node::Comment(_) | Node::ProcessingInstruction(_) => {}
            }
        }
        Ok(())
    }

    fn render_element(&self, element: &Element, raw: bool, out: &mut String) -> RenderResult<()> {
        let Some(body) = self.program.body(&element.name) else {
            return self.apply_children(element, raw, out);
        };
        Invocation::new(self, element, raw, HashSet::new(), out).run(body)
    }
}

/// A dynamic element whose end tag has not been written yet
struct Frame {
    id: ElementId,
    void: bool,
    content_start: Option<usize>,
}

/// State of one template application
pub(super) struct Invocation<'r, 'o> {
    renderer: &'r Renderer,
    context: &'r Element,
    /// Applied inside a `script` or `style` element
    raw: bool,
    /// Elements whose start tag a `set` close has closed
    closed: HashSet<ElementId>,
    frames: Vec<Frame>,
    /// Escaped attribute values waiting for the next write
    pending: Option<IndexMap<String, String>>,
    out: &'o mut String,
}

impl<'r, 'o> Invocation<'r, 'o> {
    pub(super) fn new(
        renderer: &'r Renderer,
        context: &'r Element,
        raw: bool,
        closed: HashSet<ElementId>,
        out: &'o mut String,
    ) -> Self {
        Invocation {
            renderer,
            context,
            raw,
            closed,
            frames: Vec::new(),
            pending: None,
            out,
        }
    }

    /// Start tags closed so far, to resume the application later.
    pub(super) fn into_closed(self) -> HashSet<ElementId> {
        self.closed
    }

    pub(super) fn run(&mut self, statements: &[Statement]) -> RenderResult<()> {
        for statement in statements {
            statement.visit_statement(self)?;
        }
        Ok(())
    }

    /// Run `statements` into a separate buffer.
    fn capture(&mut self, statements: &[Statement]) -> RenderResult<String> {
        let saved = std::mem::take(&mut *self.out);
        let pending = self.pending.take();
        let result = self.run(statements);
        self.pending = pending;
        let captured = std::mem::replace(&mut *self.out, saved);
        result.map(|()| captured)
    }

    fn buffer_attribute(&mut self, name: String, escaped_value: String) {
        self.pending
            .get_or_insert_with(IndexMap::new)
            .insert(name, escaped_value);
    }

    /// Write buffered attributes ahead of anything else.
    fn flush_attributes(&mut self) {
        let Some(attributes) = self.pending.take() else {
            return;
        };
        for (name, value) in attributes {
            self.out.push(' ');
            self.out.push_str(&name);
            if !is_boolean_attribute(&name) {
                self.out.push_str("=\"");
                self.out.push_str(&value);
                self.out.push('"');
            }
        }
    }

    fn ctx(&self) -> Context<'_> {
        Context::new(self.context, &self.renderer.params)
    }

    fn string(&self, expr: &StringExpr) -> RenderResult<String> {
        Ok(match expr {
            StringExpr::Literal(text) => text.clone(),
            StringExpr::Attribute(name) => self.context.attr(name).unwrap_or_default().to_string(),
            StringExpr::Parameter(name) => self.parameter(name).to_string(),
            StringExpr::XPath(XPathFallback { expr, .. }) => evaluate_string(expr, &self.ctx())?,
        })
    }

    fn concat(&self, parts: &[StringExpr]) -> RenderResult<String> {
        let mut text = String::new();
        for part in parts {
            text.push_str(&self.string(part)?);
        }
        Ok(text)
    }

    fn boolean(&self, expr: &BoolExpr) -> RenderResult<bool> {
        Ok(match expr {
            BoolExpr::Constant(value) => *value,
            BoolExpr::HasAttribute(name) => self.context.has_attr(name),
            BoolExpr::Parameter(name) => !self.parameter(name).is_empty(),
            BoolExpr::Not(inner) => !self.boolean(inner)?,
            BoolExpr::And(left, right) => self.boolean(left)? && self.boolean(right)?,
            BoolExpr::Or(left, right) => self.boolean(left)? || self.boolean(right)?,
            BoolExpr::StartTagOpen(id) => !self.closed.contains(id),
            BoolExpr::Compare { op, left, right } => {
                match (self.operand(left), self.operand(right)) {
                    (Some(left), Some(right)) => match op {
                        CompareOp::Equals => left == right,
                        CompareOp::NotEquals => left != right,
                    },
                    // A missing attribute is an empty node-set, which compares false
                    _ => false,
                }
            }
            BoolExpr::XPath(XPathFallback { expr, .. }) => evaluate_boolean(expr, &self.ctx())?,
        })
    }

    fn operand<'a>(&'a self, operand: &'a Operand) -> Option<&'a str> {
        match operand {
            Operand::Attribute(name) => self.context.attr(name),
            Operand::Parameter(name) => Some(self.parameter(name)),
            Operand::Literal(value) => Some(value.as_str()),
        }
    }

    fn parameter(&self, name: &str) -> &str {
        self.renderer
            .params
            .get(name)
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub(super) fn is_raw(&self, escape: Escape) -> bool {
        match escape {
            Escape::Raw => true,
            Escape::Inherited => self.raw,
            Escape::Text | Escape::Attribute => false,
        }
    }
}

impl StatementVisitor for Invocation<'_, '_> {
    type Output = RenderResult<()>;

    fn visit_output_stmt(&mut self, stmt: &OutputStmt) -> Self::Output {
        let value = self.string(&stmt.value)?;
        self.flush_attributes();
        match stmt.escape {
            Escape::Attribute => self.out.push_str(&escape_attribute(&value)),
            escape if self.is_raw(escape) => self.out.push_str(&value),
            _ => self.out.push_str(&escape_text(&value)),
        }
        Ok(())
    }

    fn visit_if_stmt(&mut self, stmt: &IfStmt) -> Self::Output {
        for branch in &stmt.branches {
            if self.boolean(&branch.condition)? {
                return self.run(&branch.body);
            }
        }
        self.run(&stmt.otherwise)
    }

    fn visit_dispatch_stmt(&mut self, stmt: &DispatchStmt) -> Self::Output {
        let value = match &stmt.key {
            DispatchKey::Attribute(name) => self.context.attr(name),
            DispatchKey::Parameter(name) => Some(self.parameter(name)),
        };
        let branch = value
            .and_then(|value| stmt.table.get(value))
            .and_then(|index| stmt.branches.get(*index));
        match branch {
            Some(body) => self.run(body),
            None => self.run(&stmt.default),
        }
    }

    fn visit_close_tag_stmt(&mut self, stmt: &CloseTagStmt) -> Self::Output {
        if stmt.check && self.closed.contains(&stmt.id) {
            return Ok(());
        }
        self.flush_attributes();
        self.out.push('>');
        if stmt.set {
            self.closed.insert(stmt.id);
        }
        let content_start = self.out.len();
        if let Some(frame) = self.frames.iter_mut().rev().find(|frame| frame.id == stmt.id) {
            frame.content_start = Some(content_start);
        }
        Ok(())
    }

    fn visit_apply_children_stmt(&mut self, stmt: &ApplyChildrenStmt) -> Self::Output {
        let raw = self.is_raw(stmt.escape);
        self.flush_attributes();
        self.renderer.apply_children(self.context, raw, &mut *self.out)
    }

    fn visit_copy_attributes_stmt(&mut self, stmt: &CopyAttributesStmt) -> Self::Output {
        let context = self.context;
        for attr in &context.attrs {
            let selected = match &stmt.names {
                Some(names) => names.contains(&attr.name),
                None => true,
            };
            if selected {
                self.buffer_attribute(attr.name.clone(), escape_attribute(&attr.value));
            }
        }
        Ok(())
    }

    fn visit_element_stmt(&mut self, stmt: &ElementStmt) -> Self::Output {
        let name = self.concat(&stmt.name)?;
        self.flush_attributes();
        self.out.push('<');
        self.out.push_str(&name);
        self.frames.push(Frame {
            id: stmt.id,
            void: is_void_element(&name),
            content_start: None,
        });
        let result = self.run(&stmt.body);
        let frame = self.frames.pop();
        result?;
        self.flush_attributes();
        match frame {
            Some(Frame {
                void: true,
                content_start,
                ..
            }) => {
                if let Some(content_start) = content_start {
                    self.out.truncate(content_start);
                }
            }
            _ => {
                self.out.push_str("</");
                self.out.push_str(&name);
                self.out.push('>');
            }
        }
        Ok(())
    }

    fn visit_attribute_stmt(&mut self, stmt: &AttributeStmt) -> Self::Output {
        let name = self.concat(&stmt.name)?;
        let value = self.capture(&stmt.body)?;
        self.buffer_attribute(name, value);
        Ok(())
    }
}
