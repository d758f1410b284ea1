//! Expression Parser
//!
//! Recursive descent parser for the XPath subset. Constructs outside the subset (absolute
//! paths, `//`, predicates, other axes) are reported as errors rather than approximated.

use std::fmt;

use super::ast::{Axis, BinaryOp, Expr, LocationPath, NodeTest, Step};
use super::lexer::{Lexer, Token, TokenType};

/// Why an expression could not be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpressionError {
    pub input: String,
    pub index: usize,
    pub msg: String,
}

impl fmt::Display for ExpressionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at column {} in [{}]",
            self.msg,
            self.index + 1,
            self.input
        )
    }
}

impl std::error::Error for ExpressionError {}

/// Parser for XPath expressions
#[derive(Debug, Default, Clone, Copy)]
pub struct Parser {
    lexer: Lexer,
}

impl Parser {
    pub fn new() -> Self {
        Parser {
            lexer: Lexer::new(),
        }
    }

    pub fn parse(&self, input: &str) -> Result<Expr, ExpressionError> {
        let tokens = self.lexer.tokenize(input);
        let mut ast_parser = ParseAst {
            input,
            tokens,
            index: 0,
        };
        if let Some(error) = ast_parser.tokens.iter().find(|t| t.is_error()) {
            return Err(ast_parser.error_at(error.index, error.str_value.clone()));
        }
        if ast_parser.tokens.is_empty() {
            return Err(ast_parser.error_at(0, "Empty expression"));
        }
        let expr = ast_parser.parse_or()?;
        if let Some(token) = ast_parser.next() {
            return Err(ast_parser.error_at(
                token.index,
                format!("Unexpected token '{}'", token_text(token)),
            ));
        }
        Ok(expr)
    }
}

/// Parse an expression with the default parser.
pub fn parse_expression(input: &str) -> Result<Expr, ExpressionError> {
    Parser::new().parse(input)
}

fn token_text(token: &Token) -> String {
    match token.token_type {
        TokenType::Number => super::evaluator::number_to_string(token.num_value),
        TokenType::Variable => format!("${}", token.str_value),
        _ => token.str_value.clone(),
    }
}

const NODE_TYPES: &[&str] = &["text", "node"];

struct ParseAst<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    index: usize,
}

impl<'a> ParseAst<'a> {
    fn next(&self) -> Option<&Token> {
        self.tokens.get(self.index)
    }

    fn peek(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.index + offset)
    }

    fn advance(&mut self) {
        self.index += 1;
    }

    fn input_index(&self) -> usize {
        self.next().map_or(self.input.len(), |t| t.index)
    }

    fn error_at(&self, index: usize, msg: impl Into<String>) -> ExpressionError {
        ExpressionError {
            input: self.input.to_string(),
            index,
            msg: msg.into(),
        }
    }

    fn error(&self, msg: impl Into<String>) -> ExpressionError {
        self.error_at(self.input_index(), msg)
    }

    fn consume_optional_operator(&mut self, operator: &str) -> bool {
        if self.next().is_some_and(|t| t.is_operator(operator)) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume_optional_character(&mut self, code: &str) -> bool {
        if self.next().is_some_and(|t| t.is_character(code)) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_character(&mut self, code: &str) -> Result<(), ExpressionError> {
        if self.consume_optional_character(code) {
            Ok(())
        } else {
            Err(self.error(format!("Missing expected {}", code)))
        }
    }

    fn parse_binary_level(
        &mut self,
        operators: &[(&str, BinaryOp)],
        operand: fn(&mut Self) -> Result<Expr, ExpressionError>,
    ) -> Result<Expr, ExpressionError> {
        let mut result = operand(self)?;
        'outer: loop {
            for (text, op) in operators {
                if self.consume_optional_operator(text) {
                    let right = operand(self)?;
                    result = Expr::binary(*op, result, right);
                    continue 'outer;
                }
            }
            return Ok(result);
        }
    }

    fn parse_or(&mut self) -> Result<Expr, ExpressionError> {
        self.parse_binary_level(&[("or", BinaryOp::Or)], Self::parse_and)
    }

    fn parse_and(&mut self) -> Result<Expr, ExpressionError> {
        self.parse_binary_level(&[("and", BinaryOp::And)], Self::parse_equality)
    }

    fn parse_equality(&mut self) -> Result<Expr, ExpressionError> {
        self.parse_binary_level(
            &[("=", BinaryOp::Eq), ("!=", BinaryOp::Ne)],
            Self::parse_relational,
        )
    }

    fn parse_relational(&mut self) -> Result<Expr, ExpressionError> {
        self.parse_binary_level(
            &[
                ("<=", BinaryOp::Le),
                (">=", BinaryOp::Ge),
                ("<", BinaryOp::Lt),
                (">", BinaryOp::Gt),
            ],
            Self::parse_additive,
        )
    }

    fn parse_additive(&mut self) -> Result<Expr, ExpressionError> {
        self.parse_binary_level(
            &[("+", BinaryOp::Add), ("-", BinaryOp::Sub)],
            Self::parse_multiplicative,
        )
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ExpressionError> {
        self.parse_binary_level(
            &[
                ("*", BinaryOp::Mul),
                ("div", BinaryOp::Div),
                ("mod", BinaryOp::Mod),
            ],
            Self::parse_unary,
        )
    }

    fn parse_unary(&mut self) -> Result<Expr, ExpressionError> {
        if self.consume_optional_operator("-") {
            let operand = self.parse_unary()?;
            return Ok(Expr::Negate {
                operand: Box::new(operand),
            });
        }
        self.parse_binary_level(&[("|", BinaryOp::Union)], Self::parse_path_expr)
    }

    fn parse_path_expr(&mut self) -> Result<Expr, ExpressionError> {
        let token = self.next().cloned().ok_or_else(|| self.error("Unexpected end of expression"))?;
        let expr = match token.token_type {
            TokenType::String => {
                self.advance();
                Expr::literal(token.str_value)
            }
            TokenType::Number => {
                self.advance();
                Expr::Number {
                    value: token.num_value,
                }
            }
            TokenType::Variable => {
                self.advance();
                Expr::variable(token.str_value)
            }
            TokenType::Character if token.str_value == "(" => {
                self.advance();
                let inner = self.parse_or()?;
                self.expect_character(")")?;
                inner
            }
            TokenType::Name
                if self.peek(1).is_some_and(|t| t.is_character("("))
                    && !NODE_TYPES.contains(&token.str_value.as_str()) =>
            {
                self.parse_function_call(token.str_value)?
            }
            _ => Expr::Path {
                path: self.parse_location_path()?,
            },
        };
        if self.next().is_some_and(|t| t.is_character("[")) {
            return Err(self.error("Predicates are not supported"));
        }
        if self.next().is_some_and(|t| t.is_character("/") || t.is_character("//")) {
            return Err(self.error("Filter expressions cannot be followed by a path"));
        }
        Ok(expr)
    }

    fn parse_function_call(&mut self, name: String) -> Result<Expr, ExpressionError> {
        self.advance();
        self.expect_character("(")?;
        let mut args = Vec::new();
        if !self.consume_optional_character(")") {
            loop {
                args.push(self.parse_or()?);
                if self.consume_optional_character(")") {
                    break;
                }
                self.expect_character(",")?;
            }
        }
        Ok(Expr::FunctionCall { name, args })
    }

    fn parse_location_path(&mut self) -> Result<LocationPath, ExpressionError> {
        if self.next().is_some_and(|t| t.is_character("/") || t.is_character("//")) {
            return Err(self.error("Absolute location paths are not supported"));
        }
        let mut steps = vec![self.parse_step()?];
        loop {
            if self.next().is_some_and(|t| t.is_character("//")) {
                return Err(self.error("The descendant shorthand // is not supported"));
            }
            if !self.consume_optional_character("/") {
                break;
            }
            steps.push(self.parse_step()?);
        }
        Ok(LocationPath { steps })
    }

    fn parse_step(&mut self) -> Result<Step, ExpressionError> {
        if self.consume_optional_character(".") {
            return Ok(Step::new(Axis::SelfNode, NodeTest::Node));
        }
        if self.next().is_some_and(|t| t.is_character("..")) {
            return Err(self.error("The parent axis is not supported"));
        }
        let axis = if self.consume_optional_character("@") {
            Axis::Attribute
        } else {
            Axis::Child
        };
        let token = self
            .next()
            .cloned()
            .ok_or_else(|| self.error("Unexpected end of expression"))?;
        if !token.is_name() {
            return Err(self.error_at(
                token.index,
                format!("Unexpected token '{}'", token_text(&token)),
            ));
        }
        self.advance();
        if self.next().is_some_and(|t| t.is_character("(")) {
            self.advance();
            self.expect_character(")")?;
            let test = match token.str_value.as_str() {
                "text" => NodeTest::Text,
                _ => NodeTest::Node,
            };
            return Ok(Step::new(axis, test));
        }
        let test = if token.str_value == "*" {
            NodeTest::Any
        } else {
            NodeTest::Name(token.str_value)
        };
        Ok(Step::new(axis, test))
    }
}
