//! Attribute Value Templates
//!
//! Splits `literal{expression}literal` values into their parts. `{{` and `}}` stand for
//! literal braces; braces inside quoted strings belong to the expression.

use serde::{Deserialize, Serialize};

use crate::chars;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AvtPart {
    Literal(String),
    Expression(String),
}

/// Split an attribute value template. Adjacent literal text is merged and empty literals are
/// dropped, so the parts alternate wherever two expressions are not directly adjacent.
pub fn split_avt(value: &str) -> Result<Vec<AvtPart>, String> {
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut iter = value.char_indices().peekable();

    while let Some((index, ch)) = iter.next() {
        match ch {
            chars::LBRACE => {
                if iter.peek().is_some_and(|(_, next)| *next == chars::LBRACE) {
                    iter.next();
                    literal.push(chars::LBRACE);
                    continue;
                }
                let mut expression = String::new();
                let mut quote: Option<char> = None;
                let mut closed = false;
                for (_, inner) in iter.by_ref() {
                    match quote {
                        Some(q) if inner == q => quote = None,
                        Some(_) => {}
                        None if chars::is_quote(inner) => quote = Some(inner),
                        None if inner == chars::RBRACE => {
                            closed = true;
                            break;
                        }
                        None => {}
                    }
                    expression.push(inner);
                }
                if !closed {
                    return Err(format!("Unterminated expression starting at offset {}", index));
                }
                if expression.trim().is_empty() {
                    return Err(format!("Empty expression at offset {}", index));
                }
                if !literal.is_empty() {
                    parts.push(AvtPart::Literal(std::mem::take(&mut literal)));
                }
                parts.push(AvtPart::Expression(expression));
            }
            chars::RBRACE => {
                if iter.peek().is_some_and(|(_, next)| *next == chars::RBRACE) {
                    iter.next();
                    literal.push(chars::RBRACE);
                } else {
                    return Err(format!("Unescaped '}}' at offset {}", index));
                }
            }
            _ => literal.push(ch),
        }
    }
    if !literal.is_empty() {
        parts.push(AvtPart::Literal(literal));
    }
    Ok(parts)
}

/// Whether the value contains at least one expression
pub fn is_dynamic(value: &str) -> bool {
    split_avt(value).map_or(true, |parts| {
        parts.iter().any(|p| matches!(p, AvtPart::Expression(_)))
    })
}

/// Escape literal text so it can be embedded in an attribute value template.
pub fn escape_avt_literal(text: &str) -> String {
    text.replace('{', "{{").replace('}', "}}")
}
