//! Emit Module
//!
//! Lowers a normalized template to output statements. Static markup is written as raw
//! literals; expressions of a recognized shape become typed expressions and everything else
//! is deferred to the general evaluator.

use crate::expression_parser::ast::{BinaryOp, Expr};
use crate::expression_parser::evaluator::number_to_string;
use crate::ml_parser::html_tags::{escape_attribute, escape_text, is_raw_text_element};
use crate::output::control_structures::optimize_statements;
use crate::output::output_ast as o;
use crate::template::pipeline::ir::{
    self, BranchKey, Case, ElementId, Name, Node, OutputValue, Template, VoidKind,
};

/// Statements rendering `template`.
pub fn emit_template(template: &Template) -> Vec<o::Statement> {
    let emitter = Emitter { template };
    let statements = emitter.emit_list(&template.nodes, Position::TopLevel);
    optimize_statements(statements)
}

/// Where the nodes being emitted sit relative to the template's own elements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    TopLevel,
    InElement {
        raw: bool,
        id: ElementId,
        /// Attributes go through the start tag buffer
        merge: bool,
    },
}

impl Position {
    fn text_escape(self) -> o::Escape {
        match self {
            Position::TopLevel => o::Escape::Inherited,
            Position::InElement { raw: true, .. } => o::Escape::Raw,
            Position::InElement { raw: false, .. } => o::Escape::Text,
        }
    }

    fn merges_attributes(self) -> bool {
        matches!(self, Position::InElement { merge: true, .. })
    }

    /// Skip `statements` once the start tag of the owning element was closed.
    fn guard(self, guarded: bool, statements: Vec<o::Statement>) -> Vec<o::Statement> {
        match self {
            Position::InElement { id, .. } if guarded => vec![o::Statement::If(o::IfStmt {
                branches: vec![o::Branch {
                    condition: o::BoolExpr::StartTagOpen(id),
                    body: statements,
                }],
                otherwise: Vec::new(),
            })],
            _ => statements,
        }
    }
}

struct Emitter<'t> {
    template: &'t Template,
}

impl Emitter<'_> {
    fn emit_list(&self, nodes: &[Node], position: Position) -> Vec<o::Statement> {
        let mut out = Vec::new();
        for node in nodes {
            self.emit_node(node, position, &mut out);
        }
        out
    }

    fn emit_node(&self, node: &Node, position: Position, out: &mut Vec<o::Statement>) {
        match node {
            Node::Element(element) => {
                let raw = matches!(&element.name, Name::Static(name) if is_raw_text_element(name));
                let body = self.emit_list(
                    &element.children,
                    Position::InElement {
                        raw,
                        id: element.id,
                        merge: element.merge_attributes,
                    },
                );
                match &element.name {
                    Name::Static(name) => {
                        out.push(o::Statement::raw(format!("<{}", name)));
                        out.extend(body);
                        if element.void != VoidKind::Yes {
                            out.push(o::Statement::raw(format!("</{}>", name)));
                        }
                    }
                    Name::Dynamic(parts) => out.push(o::Statement::Element(o::ElementStmt {
                        id: element.id,
                        name: parts.iter().map(string_value).collect(),
                        body,
                    })),
                }
            }
            Node::Attribute(attribute) => {
                let body = self.emit_list(&attribute.children, position);
                let mut statements = Vec::new();
                match &attribute.name {
                    Name::Static(name) if position.merges_attributes() => {
                        statements.push(o::Statement::Attribute(o::AttributeStmt {
                            name: vec![o::StringExpr::Literal(name.clone())],
                            body,
                        }))
                    }
                    Name::Static(name) if attribute.boolean => {
                        statements.push(o::Statement::raw(format!(" {}", name)));
                    }
                    Name::Static(name) => {
                        statements.push(o::Statement::raw(format!(" {}=\"", name)));
                        statements.extend(body);
                        statements.push(o::Statement::raw("\""));
                    }
                    Name::Dynamic(parts) => statements.push(o::Statement::Attribute(o::AttributeStmt {
                        name: parts.iter().map(string_value).collect(),
                        body,
                    })),
                }
                out.extend(position.guard(attribute.guarded, statements));
            }
            Node::Output(output) => {
                let escape = match output.escape {
                    ir::Escape::Attribute => o::Escape::Attribute,
                    ir::Escape::Raw => o::Escape::Raw,
                    ir::Escape::Text => position.text_escape(),
                };
                out.push(output_statement(string_value(&output.value), escape));
            }
            Node::Switch(switch) => out.extend(self.emit_switch(switch, position)),
            Node::CloseTag(close) => {
                let maybe_void = self
                    .template
                    .element(close.id)
                    .is_some_and(|meta| meta.void == VoidKind::Maybe);
                if close.set || close.check || maybe_void {
                    out.push(o::Statement::CloseTag(o::CloseTagStmt {
                        id: close.id,
                        set: close.set,
                        check: close.check,
                    }));
                } else {
                    out.push(o::Statement::raw(">"));
                }
            }
            Node::ApplyChildren => out.push(o::Statement::ApplyChildren(o::ApplyChildrenStmt {
                escape: position.text_escape(),
            })),
            Node::Comment(comment) => {
                out.push(o::Statement::raw("<!--"));
                out.extend(self.emit_list(&comment.children, position));
                out.push(o::Statement::raw("-->"));
            }
            Node::CopyAttributes(copy) => {
                let statement = o::Statement::CopyAttributes(o::CopyAttributesStmt {
                    names: copy.names.clone(),
                });
                out.extend(position.guard(copy.guarded, vec![statement]));
            }
        }
    }

    fn emit_switch(&self, switch: &ir::SwitchNode, position: Position) -> Vec<o::Statement> {
        // Cases after the first default can never be selected
        let end = switch
            .cases
            .iter()
            .position(Case::is_default)
            .unwrap_or(switch.cases.len());
        let (tested, rest) = switch.cases.split_at(end);
        let default = rest
            .first()
            .map(|case| self.emit_list(&case.children, position))
            .unwrap_or_default();

        if let Some(key) = &switch.branch_key {
            let mut table = indexmap::IndexMap::new();
            let mut branches = Vec::with_capacity(tested.len());
            for (index, case) in tested.iter().enumerate() {
                for value in case.values.iter().flatten() {
                    table.entry(value.clone()).or_insert(index);
                }
                branches.push(self.emit_list(&case.children, position));
            }
            return vec![o::Statement::Dispatch(o::DispatchStmt {
                key: match key {
                    BranchKey::Attribute(name) => o::DispatchKey::Attribute(name.clone()),
                    BranchKey::Parameter(name) => o::DispatchKey::Parameter(name.clone()),
                },
                table,
                branches,
                default,
            })];
        }

        let mut chain = default;
        for case in tested.iter().rev() {
            let condition = match case.test.as_ref().map(ir::XPathExpr::ast) {
                Some(Ok(expr)) => bool_expr(&expr),
                // Tests were parsed during ingest
                _ => o::BoolExpr::Constant(false),
            };
            chain = vec![o::Statement::If(o::IfStmt {
                branches: vec![o::Branch {
                    condition,
                    body: self.emit_list(&case.children, position),
                }],
                otherwise: chain,
            })];
        }
        chain
    }
}

/// Output statement; literal values are escaped now instead of at render time.
fn output_statement(value: o::StringExpr, escape: o::Escape) -> o::Statement {
    match (value, escape) {
        (o::StringExpr::Literal(text), o::Escape::Text) => o::Statement::raw(escape_text(&text)),
        (o::StringExpr::Literal(text), o::Escape::Attribute) => {
            o::Statement::raw(escape_attribute(&text))
        }
        (value, escape) => o::Statement::Output(o::OutputStmt { value, escape }),
    }
}

fn string_value(value: &OutputValue) -> o::StringExpr {
    match value {
        OutputValue::Literal(text) => o::StringExpr::Literal(text.clone()),
        OutputValue::XPath(expr) => match expr.ast() {
            Ok(ast) => string_expr(&ast),
            Err(_) => o::StringExpr::Literal(String::new()),
        },
    }
}

/// String value of an expression.
pub fn string_expr(expr: &Expr) -> o::StringExpr {
    if let Some(name) = expr.as_attribute_name() {
        return o::StringExpr::Attribute(name.to_string());
    }
    match expr {
        Expr::Variable { name } => o::StringExpr::Parameter(name.clone()),
        Expr::Literal { value } => o::StringExpr::Literal(value.clone()),
        Expr::Number { value } => o::StringExpr::Literal(number_to_string(*value)),
        _ => o::StringExpr::XPath(o::XPathFallback::new(expr)),
    }
}

/// Boolean value of an expression.
pub fn bool_expr(expr: &Expr) -> o::BoolExpr {
    if let Some(name) = expr.as_attribute_name() {
        return o::BoolExpr::HasAttribute(name.to_string());
    }
    match expr {
        Expr::Variable { name } => o::BoolExpr::Parameter(name.clone()),
        Expr::Literal { value } => o::BoolExpr::Constant(!value.is_empty()),
        Expr::FunctionCall { name, args } => match (name.as_str(), args.as_slice()) {
            ("not", [arg]) => o::BoolExpr::not(bool_expr(arg)),
            ("true", []) => o::BoolExpr::Constant(true),
            ("false", []) => o::BoolExpr::Constant(false),
            _ => o::BoolExpr::XPath(o::XPathFallback::new(expr)),
        },
        Expr::Binary { op, left, right } => match op {
            BinaryOp::And => o::BoolExpr::And(Box::new(bool_expr(left)), Box::new(bool_expr(right))),
            BinaryOp::Or => o::BoolExpr::Or(Box::new(bool_expr(left)), Box::new(bool_expr(right))),
            BinaryOp::Eq | BinaryOp::Ne => match (operand(left), operand(right)) {
                (Some(left), Some(right)) => o::BoolExpr::Compare {
                    op: if *op == BinaryOp::Eq {
                        o::CompareOp::Equals
                    } else {
                        o::CompareOp::NotEquals
                    },
                    left,
                    right,
                },
                _ => o::BoolExpr::XPath(o::XPathFallback::new(expr)),
            },
            _ => o::BoolExpr::XPath(o::XPathFallback::new(expr)),
        },
        _ => o::BoolExpr::XPath(o::XPathFallback::new(expr)),
    }
}

/// Fixed name or string literal usable in a string comparison.
fn operand(expr: &Expr) -> Option<o::Operand> {
    if let Some(name) = expr.as_attribute_name() {
        return Some(o::Operand::Attribute(name.to_string()));
    }
    match expr {
        Expr::Variable { name } => Some(o::Operand::Parameter(name.clone())),
        Expr::Literal { value } => Some(o::Operand::Literal(value.clone())),
        _ => None,
    }
}
