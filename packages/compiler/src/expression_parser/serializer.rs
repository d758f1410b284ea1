//! Expression Serializer
//!
//! Writes an expression AST back out in canonical, minimal form. Parentheses are only kept
//! where precedence needs them and insignificant whitespace is dropped, which makes the
//! output usable as the minified form of a template expression.

use super::ast::{Axis, BinaryOp, Expr, LocationPath, NodeTest, Step};
use super::evaluator::number_to_string;
use super::parser::parse_expression;

const UNARY_PRECEDENCE: u8 = 7;
const PRIMARY_PRECEDENCE: u8 = 9;

pub fn serialize(expr: &Expr) -> String {
    let mut out = String::new();
    write_expr(expr, &mut out);
    out
}

/// Canonical form of an expression, or the trimmed input when it cannot be parsed.
pub fn minify(input: &str) -> String {
    match parse_expression(input) {
        Ok(expr) => serialize(&expr),
        Err(_) => input.trim().to_string(),
    }
}

/// Quote a string as an XPath literal.
pub fn quote_literal(value: &str) -> String {
    if value.contains('\'') {
        format!("\"{}\"", value)
    } else {
        format!("'{}'", value)
    }
}

fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Binary { op, .. } => op.precedence(),
        Expr::Negate { .. } => UNARY_PRECEDENCE,
        _ => PRIMARY_PRECEDENCE,
    }
}

fn write_operand(expr: &Expr, parenthesize: bool, out: &mut String) {
    if parenthesize {
        out.push('(');
        write_expr(expr, out);
        out.push(')');
    } else {
        write_expr(expr, out);
    }
}

fn write_expr(expr: &Expr, out: &mut String) {
    match expr {
        Expr::Literal { value } => out.push_str(&quote_literal(value)),
        Expr::Number { value } => out.push_str(&number_to_string(*value)),
        Expr::Variable { name } => {
            out.push('$');
            out.push_str(name);
        }
        Expr::Path { path } => write_path(path, out),
        Expr::FunctionCall { name, args } => {
            out.push_str(name);
            out.push('(');
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_expr(arg, out);
            }
            out.push(')');
        }
        Expr::Binary { op, left, right } => {
            let p = op.precedence();
            write_operand(left, precedence(left) < p, out);
            match op {
                BinaryOp::Or | BinaryOp::And | BinaryOp::Div | BinaryOp::Mod | BinaryOp::Sub => {
                    out.push(' ');
                    out.push_str(op.as_str());
                    out.push(' ');
                }
                _ => out.push_str(op.as_str()),
            }
            write_operand(right, precedence(right) <= p, out);
        }
        Expr::Negate { operand } => {
            out.push('-');
            write_operand(operand, precedence(operand) < UNARY_PRECEDENCE, out);
        }
    }
}

fn write_path(path: &LocationPath, out: &mut String) {
    for (i, step) in path.steps.iter().enumerate() {
        if i > 0 {
            out.push('/');
        }
        write_step(step, out);
    }
}

fn write_step(step: &Step, out: &mut String) {
    if step.axis == Axis::SelfNode {
        out.push('.');
        return;
    }
    if step.axis == Axis::Attribute {
        out.push('@');
    }
    match &step.test {
        NodeTest::Name(name) => out.push_str(name),
        NodeTest::Any => out.push('*'),
        NodeTest::Text => out.push_str("text()"),
        NodeTest::Node => out.push_str("node()"),
    }
}
