//! Expression Evaluator
//!
//! The general evaluator: XPath 1.0 semantics for the supported subset, evaluated against a
//! document element. Both renderers defer to it for every expression they do not specialize,
//! so type conversions and comparisons here define the observable behaviour of both.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::RenderError;
use crate::ml_parser::ast::{Attribute, Element, Node, Text};

use super::ast::{Axis, BinaryOp, Expr, LocationPath, NodeTest};
use super::serializer::serialize;

/// Rendering parameters by name
pub type Parameters = IndexMap<String, String>;

static XPATH_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)$").unwrap());

/// A node selected by a location path
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Element(&'a Element),
    Attribute(&'a Attribute),
    Text(&'a Text),
}

impl<'a> NodeRef<'a> {
    pub fn string_value(&self) -> String {
        match self {
            NodeRef::Element(element) => element.text_content(),
            NodeRef::Attribute(attr) => attr.value.clone(),
            NodeRef::Text(text) => text.value.clone(),
        }
    }

    pub fn name(&self) -> &'a str {
        match self {
            NodeRef::Element(element) => &element.name,
            NodeRef::Attribute(attr) => &attr.name,
            NodeRef::Text(_) => "",
        }
    }

    fn same_node(&self, other: &NodeRef<'a>) -> bool {
        match (self, other) {
            (NodeRef::Element(a), NodeRef::Element(b)) => std::ptr::eq(*a, *b),
            (NodeRef::Attribute(a), NodeRef::Attribute(b)) => std::ptr::eq(*a, *b),
            (NodeRef::Text(a), NodeRef::Text(b)) => std::ptr::eq(*a, *b),
            _ => false,
        }
    }
}

/// Result of evaluating an expression
#[derive(Debug, Clone)]
pub enum Value<'a> {
    NodeSet(Vec<NodeRef<'a>>),
    String(String),
    Number(f64),
    Boolean(bool),
}

impl<'a> Value<'a> {
    pub fn to_boolean(&self) -> bool {
        match self {
            Value::NodeSet(nodes) => !nodes.is_empty(),
            Value::String(s) => !s.is_empty(),
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Boolean(b) => *b,
        }
    }

    pub fn to_string_value(&self) -> String {
        match self {
            Value::NodeSet(nodes) => nodes.first().map(NodeRef::string_value).unwrap_or_default(),
            Value::String(s) => s.clone(),
            Value::Number(n) => number_to_string(*n),
            Value::Boolean(b) => b.to_string(),
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            Value::Number(n) => *n,
            Value::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            _ => string_to_number(&self.to_string_value()),
        }
    }
}

/// XPath string value of a number
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        (if n > 0.0 { "Infinity" } else { "-Infinity" }).to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// XPath number value of a string: NaN unless it is a plain decimal number
pub fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim_matches(|c: char| crate::chars::is_whitespace(c));
    if XPATH_NUMBER.is_match(trimmed) {
        trimmed.parse().unwrap_or(f64::NAN)
    } else {
        f64::NAN
    }
}

/// Evaluation context: the current document element and the rendering parameters
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    pub node: &'a Element,
    pub params: &'a Parameters,
}

impl<'a> Context<'a> {
    pub fn new(node: &'a Element, params: &'a Parameters) -> Self {
        Context { node, params }
    }
}

pub fn evaluate<'a>(expr: &Expr, ctx: &Context<'a>) -> Result<Value<'a>, RenderError> {
    match expr {
        Expr::Literal { value } => Ok(Value::String(value.clone())),
        Expr::Number { value } => Ok(Value::Number(*value)),
        // Undeclared parameters read as empty strings in every backend.
        Expr::Variable { name } => Ok(Value::String(
            ctx.params.get(name).cloned().unwrap_or_default(),
        )),
        Expr::Path { path } => Ok(Value::NodeSet(select(path, ctx.node))),
        Expr::Negate { operand } => Ok(Value::Number(-evaluate(operand, ctx)?.to_number())),
        Expr::Binary { op, left, right } => evaluate_binary(expr, *op, left, right, ctx),
        Expr::FunctionCall { name, args } => call_function(expr, name, args, ctx),
    }
}

pub fn evaluate_string(expr: &Expr, ctx: &Context<'_>) -> Result<String, RenderError> {
    Ok(evaluate(expr, ctx)?.to_string_value())
}

pub fn evaluate_boolean(expr: &Expr, ctx: &Context<'_>) -> Result<bool, RenderError> {
    Ok(evaluate(expr, ctx)?.to_boolean())
}

/// Evaluate a location path from a context element
pub fn select<'a>(path: &LocationPath, context: &'a Element) -> Vec<NodeRef<'a>> {
    let mut current = vec![NodeRef::Element(context)];
    for step in &path.steps {
        let mut next = Vec::new();
        for node in &current {
            match step.axis {
                Axis::SelfNode => next.push(*node),
                Axis::Attribute => {
                    if let NodeRef::Element(element) = *node {
                        next.extend(
                            element
                                .attrs
                                .iter()
                                .filter(|attr| match &step.test {
                                    NodeTest::Name(name) => &attr.name == name,
                                    NodeTest::Any | NodeTest::Node => true,
                                    NodeTest::Text => false,
                                })
                                .map(NodeRef::Attribute),
                        );
                    }
                }
                Axis::Child => {
                    if let NodeRef::Element(element) = *node {
                        for child in &element.children {
                            match (child, &step.test) {
                                (Node::Element(e), NodeTest::Name(name)) if &e.name == name => {
                                    next.push(NodeRef::Element(e))
                                }
                                (Node::Element(e), NodeTest::Any | NodeTest::Node) => {
                                    next.push(NodeRef::Element(e))
                                }
                                (Node::Text(t), NodeTest::Text | NodeTest::Node) => {
                                    next.push(NodeRef::Text(t))
                                }
                                _ => {}
                            }
                        }
                    }
                }
            }
        }
        current = next;
    }
    current
}

fn evaluate_binary<'a>(
    expr: &Expr,
    op: BinaryOp,
    left: &Expr,
    right: &Expr,
    ctx: &Context<'a>,
) -> Result<Value<'a>, RenderError> {
    match op {
        BinaryOp::Or => Ok(Value::Boolean(
            evaluate_boolean(left, ctx)? || evaluate_boolean(right, ctx)?,
        )),
        BinaryOp::And => Ok(Value::Boolean(
            evaluate_boolean(left, ctx)? && evaluate_boolean(right, ctx)?,
        )),
        BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let l = evaluate(left, ctx)?;
            let r = evaluate(right, ctx)?;
            Ok(Value::Boolean(compare(op, &l, &r)))
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            let l = evaluate(left, ctx)?.to_number();
            let r = evaluate(right, ctx)?.to_number();
            Ok(Value::Number(match op {
                BinaryOp::Add => l + r,
                BinaryOp::Sub => l - r,
                BinaryOp::Mul => l * r,
                BinaryOp::Div => l / r,
                _ => l % r,
            }))
        }
        BinaryOp::Union => match (evaluate(left, ctx)?, evaluate(right, ctx)?) {
            (Value::NodeSet(mut l), Value::NodeSet(r)) => {
                for node in r {
                    if !l.iter().any(|n| n.same_node(&node)) {
                        l.push(node);
                    }
                }
                Ok(Value::NodeSet(l))
            }
            _ => Err(evaluation_error(expr, "union operands must be node-sets")),
        },
    }
}

/// Comparison of two non-node-set values
fn compare_atoms(op: BinaryOp, left: &Value<'_>, right: &Value<'_>) -> bool {
    match op {
        BinaryOp::Eq | BinaryOp::Ne => {
            let equal = match (left, right) {
                (Value::Boolean(_), _) | (_, Value::Boolean(_)) => {
                    left.to_boolean() == right.to_boolean()
                }
                (Value::Number(_), _) | (_, Value::Number(_)) => {
                    left.to_number() == right.to_number()
                }
                _ => left.to_string_value() == right.to_string_value(),
            };
            (op == BinaryOp::Eq) == equal
        }
        _ => {
            let (l, r) = (left.to_number(), right.to_number());
            match op {
                BinaryOp::Lt => l < r,
                BinaryOp::Le => l <= r,
                BinaryOp::Gt => l > r,
                _ => l >= r,
            }
        }
    }
}

fn compare(op: BinaryOp, left: &Value<'_>, right: &Value<'_>) -> bool {
    match (left, right) {
        (Value::NodeSet(l), Value::NodeSet(r)) => l.iter().any(|a| {
            let a = Value::String(a.string_value());
            r.iter()
                .any(|b| compare_atoms(op, &a, &Value::String(b.string_value())))
        }),
        (Value::NodeSet(_), Value::Boolean(_)) | (Value::Boolean(_), Value::NodeSet(_)) => {
            compare_atoms(
                op,
                &Value::Boolean(left.to_boolean()),
                &Value::Boolean(right.to_boolean()),
            )
        }
        (Value::NodeSet(nodes), other) => nodes
            .iter()
            .any(|n| compare_atoms(op, &Value::String(n.string_value()), other)),
        (other, Value::NodeSet(nodes)) => nodes
            .iter()
            .any(|n| compare_atoms(op, other, &Value::String(n.string_value()))),
        _ => compare_atoms(op, left, right),
    }
}

fn evaluation_error(expr: &Expr, reason: impl Into<String>) -> RenderError {
    RenderError::Evaluation {
        expr: serialize(expr),
        reason: reason.into(),
    }
}

fn xpath_round(n: f64) -> f64 {
    if n.is_nan() || n.is_infinite() || n == 0.0 {
        n
    } else {
        (n + 0.5).floor()
    }
}

fn call_function<'a>(
    expr: &Expr,
    name: &str,
    args: &[Expr],
    ctx: &Context<'a>,
) -> Result<Value<'a>, RenderError> {
    let arity = |min: usize, max: usize| -> Result<(), RenderError> {
        if args.len() < min || args.len() > max {
            Err(evaluation_error(
                expr,
                format!("{}() takes {} to {} arguments", name, min, max),
            ))
        } else {
            Ok(())
        }
    };
    let string_arg = |i: usize| -> Result<String, RenderError> {
        match args.get(i) {
            Some(arg) => evaluate_string(arg, ctx),
            None => Ok(ctx.node.text_content()),
        }
    };
    let number_arg = |i: usize| -> Result<f64, RenderError> {
        match args.get(i) {
            Some(arg) => Ok(evaluate(arg, ctx)?.to_number()),
            None => Ok(string_to_number(&ctx.node.text_content())),
        }
    };
    let node_set_arg = |i: usize| -> Result<Vec<NodeRef<'a>>, RenderError> {
        match args.get(i) {
            Some(arg) => match evaluate(arg, ctx)? {
                Value::NodeSet(nodes) => Ok(nodes),
                _ => Err(evaluation_error(expr, format!("{}() expects a node-set", name))),
            },
            None => Ok(vec![NodeRef::Element(ctx.node)]),
        }
    };

    let value = match name {
        "true" => {
            arity(0, 0)?;
            Value::Boolean(true)
        }
        "false" => {
            arity(0, 0)?;
            Value::Boolean(false)
        }
        "not" => {
            arity(1, 1)?;
            Value::Boolean(!evaluate_boolean(&args[0], ctx)?)
        }
        "boolean" => {
            arity(1, 1)?;
            Value::Boolean(evaluate_boolean(&args[0], ctx)?)
        }
        "string" => {
            arity(0, 1)?;
            Value::String(string_arg(0)?)
        }
        "number" => {
            arity(0, 1)?;
            Value::Number(number_arg(0)?)
        }
        "concat" => {
            arity(2, usize::MAX)?;
            let mut result = String::new();
            for arg in args {
                result.push_str(&evaluate_string(arg, ctx)?);
            }
            Value::String(result)
        }
        "contains" => {
            arity(2, 2)?;
            Value::Boolean(string_arg(0)?.contains(string_arg(1)?.as_str()))
        }
        "starts-with" => {
            arity(2, 2)?;
            Value::Boolean(string_arg(0)?.starts_with(string_arg(1)?.as_str()))
        }
        "string-length" => {
            arity(0, 1)?;
            Value::Number(string_arg(0)?.chars().count() as f64)
        }
        "substring" => {
            arity(2, 3)?;
            let s = string_arg(0)?;
            let start = xpath_round(number_arg(1)?);
            let end = if args.len() == 3 {
                start + xpath_round(number_arg(2)?)
            } else {
                f64::INFINITY
            };
            Value::String(
                s.chars()
                    .enumerate()
                    .filter(|(i, _)| {
                        let position = (*i + 1) as f64;
                        position >= start && position < end
                    })
                    .map(|(_, c)| c)
                    .collect(),
            )
        }
        "substring-before" => {
            arity(2, 2)?;
            let s = string_arg(0)?;
            let needle = string_arg(1)?;
            Value::String(s.find(&needle).map(|i| s[..i].to_string()).unwrap_or_default())
        }
        "substring-after" => {
            arity(2, 2)?;
            let s = string_arg(0)?;
            let needle = string_arg(1)?;
            Value::String(
                s.find(&needle)
                    .map(|i| s[i + needle.len()..].to_string())
                    .unwrap_or_default(),
            )
        }
        "translate" => {
            arity(3, 3)?;
            let s = string_arg(0)?;
            let from: Vec<char> = string_arg(1)?.chars().collect();
            let to: Vec<char> = string_arg(2)?.chars().collect();
            Value::String(
                s.chars()
                    .filter_map(|c| match from.iter().position(|f| *f == c) {
                        Some(i) => to.get(i).copied(),
                        None => Some(c),
                    })
                    .collect(),
            )
        }
        "normalize-space" => {
            arity(0, 1)?;
            Value::String(
                string_arg(0)?
                    .split(|c: char| crate::chars::is_whitespace(c))
                    .filter(|part| !part.is_empty())
                    .collect::<Vec<_>>()
                    .join(" "),
            )
        }
        "count" => {
            arity(1, 1)?;
            Value::Number(node_set_arg(0)?.len() as f64)
        }
        "sum" => {
            arity(1, 1)?;
            Value::Number(
                node_set_arg(0)?
                    .iter()
                    .map(|n| string_to_number(&n.string_value()))
                    .sum(),
            )
        }
        "local-name" | "name" => {
            arity(0, 1)?;
            Value::String(
                node_set_arg(0)?
                    .first()
                    .map(|n| n.name().to_string())
                    .unwrap_or_default(),
            )
        }
        "floor" => {
            arity(1, 1)?;
            Value::Number(number_arg(0)?.floor())
        }
        "ceiling" => {
            arity(1, 1)?;
            Value::Number(number_arg(0)?.ceil())
        }
        "round" => {
            arity(1, 1)?;
            Value::Number(xpath_round(number_arg(0)?))
        }
        _ => return Err(evaluation_error(expr, format!("unknown function {}()", name))),
    };
    Ok(value)
}
