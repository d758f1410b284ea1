//! Expression AST
//!
//! The bounded XPath 1.0 subset templates may use: relative location paths over the
//! attribute, child and self axes, variables, literals, the usual operators and a fixed
//! function library.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Expr {
    /// String literal
    Literal { value: String },
    Number { value: f64 },
    /// `$name`
    Variable { name: String },
    Path { path: LocationPath },
    FunctionCall { name: String, args: Vec<Expr> },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Negate { operand: Box<Expr> },
}

impl Expr {
    pub fn literal(value: impl Into<String>) -> Self {
        Expr::Literal {
            value: value.into(),
        }
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Expr::Variable { name: name.into() }
    }

    pub fn attribute(name: impl Into<String>) -> Self {
        Expr::Path {
            path: LocationPath {
                steps: vec![Step::new(Axis::Attribute, NodeTest::Name(name.into()))],
            },
        }
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Name of the attribute if this is exactly `@name`.
    pub fn as_attribute_name(&self) -> Option<&str> {
        match self {
            Expr::Path { path } => match path.steps.as_slice() {
                [Step {
                    axis: Axis::Attribute,
                    test: NodeTest::Name(name),
                }] => Some(name.as_str()),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_variable_name(&self) -> Option<&str> {
        match self {
            Expr::Variable { name } => Some(name.as_str()),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Expr::Literal { value } => Some(value.as_str()),
            _ => None,
        }
    }

    /// Visit this expression and all of its subexpressions.
    pub fn walk(&self, visit: &mut dyn FnMut(&Expr)) {
        visit(self);
        match self {
            Expr::FunctionCall { args, .. } => {
                for arg in args {
                    arg.walk(visit);
                }
            }
            Expr::Binary { left, right, .. } => {
                left.walk(visit);
                right.walk(visit);
            }
            Expr::Negate { operand } => operand.walk(visit),
            _ => {}
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Union,
}

impl BinaryOp {
    /// Binding strength, higher binds tighter
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::Eq | BinaryOp::Ne => 3,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => 4,
            BinaryOp::Add | BinaryOp::Sub => 5,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 6,
            BinaryOp::Union => 8,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Or => "or",
            BinaryOp::And => "and",
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "div",
            BinaryOp::Mod => "mod",
            BinaryOp::Union => "|",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationPath {
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub axis: Axis,
    pub test: NodeTest,
}

impl Step {
    pub fn new(axis: Axis, test: NodeTest) -> Self {
        Step { axis, test }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Axis {
    Child,
    Attribute,
    /// `.`
    SelfNode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeTest {
    Name(String),
    /// `*`
    Any,
    /// `text()`
    Text,
    /// `node()`
    Node,
}

/// How a backend may treat an expression without evaluating it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", content = "name", rename_all = "camelCase")]
pub enum ExprShape {
    /// `@name`
    Attribute(String),
    /// `$name`
    Parameter(String),
    /// A string or number literal, with its string value
    Literal(String),
    General,
}

impl ExprShape {
    pub fn of(expr: &Expr) -> Self {
        if let Some(name) = expr.as_attribute_name() {
            return ExprShape::Attribute(name.to_string());
        }
        match expr {
            Expr::Variable { name } => ExprShape::Parameter(name.clone()),
            Expr::Literal { value } => ExprShape::Literal(value.clone()),
            Expr::Number { value } => ExprShape::Literal(super::evaluator::number_to_string(*value)),
            _ => ExprShape::General,
        }
    }

    pub fn is_fixed_name(&self) -> bool {
        matches!(self, ExprShape::Attribute(_) | ExprShape::Parameter(_))
    }
}
