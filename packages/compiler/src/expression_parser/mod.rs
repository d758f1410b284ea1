//! Expression Parser Module
//!
//! The XPath subset used by templates: lexing, parsing, canonical serialization, attribute
//! value templates and the general evaluator.

pub mod ast;
pub mod avt;
pub mod evaluator;
pub mod lexer;
pub mod parser;
pub mod serializer;

pub use ast::*;
pub use avt::{split_avt, AvtPart};
pub use evaluator::{evaluate, evaluate_boolean, evaluate_string, Context, Parameters, Value};
pub use lexer::Lexer;
pub use parser::{parse_expression, ExpressionError, Parser};
pub use serializer::{minify, serialize};
