//! Abstract Emitter Module
//!
//! Line-based source writer and the emitter that prints a compiled program as a JavaScript
//! `render(node, raw)` function. The printed source documents what the statement evaluator
//! executes; expressions the compiler did not specialize appear as `xpath(...)` calls.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::output::output_ast as o;

static LEGAL_IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z_$][0-9a-zA-Z_$]*$").unwrap());

const INDENT_WITH: &str = "  ";

#[derive(Debug, Clone)]
struct EmittedLine {
    parts: Vec<String>,
    indent: usize,
}

impl EmittedLine {
    fn new(indent: usize) -> Self {
        EmittedLine {
            parts: Vec::new(),
            indent,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmitterVisitorContext {
    lines: Vec<EmittedLine>,
    indent: usize,
}

impl Default for EmitterVisitorContext {
    fn default() -> Self {
        Self::create_root()
    }
}

impl EmitterVisitorContext {
    pub fn create_root() -> Self {
        EmitterVisitorContext::new(0)
    }

    pub fn new(indent: usize) -> Self {
        EmitterVisitorContext {
            lines: vec![EmittedLine::new(indent)],
            indent,
        }
    }

    fn current_line_mut(&mut self) -> &mut EmittedLine {
        if self.lines.is_empty() {
            self.lines.push(EmittedLine::new(self.indent));
        }
        let last = self.lines.len() - 1;
        &mut self.lines[last]
    }

    pub fn line_is_empty(&self) -> bool {
        self.lines.last().map_or(true, |line| line.parts.is_empty())
    }

    pub fn print(&mut self, part: &str, new_line: bool) {
        if !part.is_empty() {
            self.current_line_mut().parts.push(part.to_string());
        }
        if new_line {
            self.lines.push(EmittedLine::new(self.indent));
        }
    }

    pub fn println(&mut self, last_part: &str) {
        self.print(last_part, true);
    }

    pub fn inc_indent(&mut self) {
        self.indent += 1;
        if self.line_is_empty() {
            let indent = self.indent;
            self.current_line_mut().indent = indent;
        }
    }

    pub fn dec_indent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
        if self.line_is_empty() {
            let indent = self.indent;
            self.current_line_mut().indent = indent;
        }
    }

    pub fn to_source(&self) -> String {
        let mut lines: &[EmittedLine] = &self.lines;
        if let Some((last, rest)) = lines.split_last() {
            if last.parts.is_empty() {
                lines = rest;
            }
        }
        lines
            .iter()
            .map(|line| {
                if line.parts.is_empty() {
                    String::new()
                } else {
                    format!("{}{}", INDENT_WITH.repeat(line.indent), line.parts.concat())
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Escape identifier for safe use in generated code
pub fn escape_identifier(input: &str, always_quote: bool) -> String {
    if input.is_empty() {
        return "''".to_string();
    }
    if !always_quote && LEGAL_IDENTIFIER.is_match(input) {
        return input.to_string();
    }
    let escaped = input
        .replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace('\n', "\\n")
        .replace('\r', "\\r");
    format!("'{}'", escaped)
}

fn quote(text: &str) -> String {
    escape_identifier(text, true)
}

/// Source of the `render` function for `program`.
pub fn emit_program(program: &o::Program) -> String {
    let mut emitter = JsEmitter {
        ctx: EmitterVisitorContext::create_root(),
    };
    emitter.ctx.println("function render(node, raw) {");
    emitter.ctx.inc_indent();
    emitter.ctx.println("var closed = {};");
    emitter.ctx.println("switch (node.nodeName) {");
    for (tags, body) in program.tags_by_body().iter().zip(&program.bodies) {
        if tags.is_empty() {
            continue;
        }
        for tag in tags {
            emitter.ctx.println(&format!("case {}:", quote(tag)));
        }
        emitter.ctx.inc_indent();
        emitter.visit_all_statements(body);
        emitter.ctx.println("break;");
        emitter.ctx.dec_indent();
    }
    emitter.ctx.println("default:");
    emitter.ctx.inc_indent();
    emitter.ctx.println("applyChildren(node, raw);");
    emitter.ctx.dec_indent();
    emitter.ctx.println("}");
    emitter.ctx.dec_indent();
    emitter.ctx.println("}");
    emitter.ctx.to_source()
}

struct JsEmitter {
    ctx: EmitterVisitorContext,
}

impl JsEmitter {
    fn visit_all_statements(&mut self, statements: &[o::Statement]) {
        for statement in statements {
            statement.visit_statement(self);
        }
    }

    fn block(&mut self, statements: &[o::Statement]) {
        self.ctx.inc_indent();
        self.visit_all_statements(statements);
        self.ctx.dec_indent();
    }
}

fn string_expr(expr: &o::StringExpr) -> String {
    match expr {
        o::StringExpr::Literal(text) => quote(text),
        o::StringExpr::Attribute(name) => format!("attr(node, {})", quote(name)),
        o::StringExpr::Parameter(name) => format!("param({})", quote(name)),
        o::StringExpr::XPath(fallback) => format!("xpath(node, {})", quote(&fallback.source)),
    }
}

fn concat(parts: &[o::StringExpr]) -> String {
    match parts {
        [] => "''".to_string(),
        parts => parts.iter().map(string_expr).collect::<Vec<_>>().join(" + "),
    }
}

fn operand(operand: &o::Operand) -> String {
    match operand {
        o::Operand::Attribute(name) => format!("node.getAttribute({})", quote(name)),
        o::Operand::Parameter(name) => format!("param({})", quote(name)),
        o::Operand::Literal(value) => quote(value),
    }
}

fn bool_expr(expr: &o::BoolExpr) -> String {
    match expr {
        o::BoolExpr::Constant(value) => value.to_string(),
        o::BoolExpr::HasAttribute(name) => format!("node.hasAttribute({})", quote(name)),
        o::BoolExpr::Parameter(name) => format!("param({}) !== ''", quote(name)),
        o::BoolExpr::Not(inner) => format!("!({})", bool_expr(inner)),
        o::BoolExpr::And(left, right) => format!("({} && {})", bool_expr(left), bool_expr(right)),
        o::BoolExpr::Or(left, right) => format!("({} || {})", bool_expr(left), bool_expr(right)),
        o::BoolExpr::StartTagOpen(id) => format!("!closed[{}]", id.0),
        o::BoolExpr::Compare { op, left, right } => {
            let operator = match op {
                o::CompareOp::Equals => "===",
                o::CompareOp::NotEquals => "!==",
            };
            let comparison = format!("{} {} {}", operand(left), operator, operand(right));
            let guards: Vec<String> = [left, right]
                .into_iter()
                .filter_map(|side| match side {
                    o::Operand::Attribute(name) => {
                        Some(format!("node.hasAttribute({})", quote(name)))
                    }
                    _ => None,
                })
                .collect();
            if guards.is_empty() {
                comparison
            } else {
                format!("({} && {})", guards.join(" && "), comparison)
            }
        }
        o::BoolExpr::XPath(fallback) => format!("xpathBoolean(node, {})", quote(&fallback.source)),
    }
}

impl o::StatementVisitor for JsEmitter {
    type Output = ();

    fn visit_output_stmt(&mut self, stmt: &o::OutputStmt) {
        let value = string_expr(&stmt.value);
        let line = match stmt.escape {
            o::Escape::Raw => format!("html += {};", value),
            o::Escape::Text => format!("html += escapeText({});", value),
            o::Escape::Attribute => format!("html += escapeAttribute({});", value),
            o::Escape::Inherited => format!("html += raw ? {0} : escapeText({0});", value),
        };
        self.ctx.println(&line);
    }

    fn visit_if_stmt(&mut self, stmt: &o::IfStmt) {
        for (index, branch) in stmt.branches.iter().enumerate() {
            let keyword = if index == 0 { "if" } else { "} else if" };
            self.ctx
                .println(&format!("{} ({}) {{", keyword, bool_expr(&branch.condition)));
            self.block(&branch.body);
        }
        if !stmt.otherwise.is_empty() {
            self.ctx.println("} else {");
            self.block(&stmt.otherwise);
        }
        self.ctx.println("}");
    }

    fn visit_dispatch_stmt(&mut self, stmt: &o::DispatchStmt) {
        let key = match &stmt.key {
            o::DispatchKey::Attribute(name) => format!("node.getAttribute({})", quote(name)),
            o::DispatchKey::Parameter(name) => format!("param({})", quote(name)),
        };
        self.ctx.println(&format!("switch ({}) {{", key));
        for (index, body) in stmt.branches.iter().enumerate() {
            let values: Vec<&String> = stmt
                .table
                .iter()
                .filter(|(_, branch)| **branch == index)
                .map(|(value, _)| value)
                .collect();
            if values.is_empty() {
                continue;
            }
            for value in values {
                self.ctx.println(&format!("case {}:", quote(value)));
            }
            self.ctx.inc_indent();
            self.visit_all_statements(body);
            self.ctx.println("break;");
            self.ctx.dec_indent();
        }
        self.ctx.println("default:");
        self.block(&stmt.default);
        self.ctx.println("}");
    }

    fn visit_close_tag_stmt(&mut self, stmt: &o::CloseTagStmt) {
        let id = stmt.id.0;
        let close = format!("closeTag({});", id);
        match (stmt.set, stmt.check) {
            (false, false) => self.ctx.println(&close),
            (true, false) => {
                self.ctx.println(&close);
                self.ctx.println(&format!("closed[{}] = true;", id));
            }
            (set, true) => {
                self.ctx.println(&format!("if (!closed[{}]) {{", id));
                self.ctx.inc_indent();
                self.ctx.println(&close);
                if set {
                    self.ctx.println(&format!("closed[{}] = true;", id));
                }
                self.ctx.dec_indent();
                self.ctx.println("}");
            }
        }
    }

    fn visit_apply_children_stmt(&mut self, stmt: &o::ApplyChildrenStmt) {
        let raw = match stmt.escape {
            o::Escape::Raw => "true",
            o::Escape::Inherited => "raw",
            o::Escape::Text | o::Escape::Attribute => "false",
        };
        self.ctx.println(&format!("applyChildren(node, {});", raw));
    }

    fn visit_copy_attributes_stmt(&mut self, stmt: &o::CopyAttributesStmt) {
        match &stmt.names {
            None => self.ctx.println("copyAttributes(node);"),
            Some(names) => {
                let names: Vec<String> = names.iter().map(|name| quote(name)).collect();
                self.ctx
                    .println(&format!("copyAttributes(node, [{}]);", names.join(", ")));
            }
        }
    }

    fn visit_element_stmt(&mut self, stmt: &o::ElementStmt) {
        let id = stmt.id.0;
        self.ctx
            .println(&format!("openElement({}, {});", id, concat(&stmt.name)));
        self.visit_all_statements(&stmt.body);
        self.ctx.println(&format!("endElement({});", id));
    }

    fn visit_attribute_stmt(&mut self, stmt: &o::AttributeStmt) {
        self.ctx
            .println(&format!("beginAttribute({});", concat(&stmt.name)));
        self.block(&stmt.body);
        self.ctx.println("endAttribute();");
    }
}
