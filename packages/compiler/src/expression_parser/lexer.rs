//! Expression Lexer
//!
//! Tokenizes XPath expressions. Implements the XPath 1.0 disambiguation rule: after a token
//! that can end an operand, `*` is multiplication and `and`, `or`, `div`, `mod` are operators.

use serde::{Deserialize, Serialize};

use crate::chars;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum TokenType {
    /// Punctuation: `( ) [ ] , @ / .` and `..`
    Character = 0,
    Name = 1,
    Variable = 2,
    String = 3,
    Operator = 4,
    Number = 5,
    Error = 6,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub index: usize,
    pub end: usize,
    pub token_type: TokenType,
    pub num_value: f64,
    pub str_value: String,
}

impl Token {
    pub fn new(
        index: usize,
        end: usize,
        token_type: TokenType,
        num_value: f64,
        str_value: String,
    ) -> Self {
        Token {
            index,
            end,
            token_type,
            num_value,
            str_value,
        }
    }

    pub fn is_character(&self, code: &str) -> bool {
        self.token_type == TokenType::Character && self.str_value == code
    }

    pub fn is_operator(&self, operator: &str) -> bool {
        self.token_type == TokenType::Operator && self.str_value == operator
    }

    pub fn is_name(&self) -> bool {
        self.token_type == TokenType::Name
    }

    pub fn is_error(&self) -> bool {
        self.token_type == TokenType::Error
    }

    /// Whether an operand may end with this token
    fn ends_operand(&self) -> bool {
        match self.token_type {
            TokenType::Name | TokenType::Variable | TokenType::String | TokenType::Number => true,
            TokenType::Character => matches!(self.str_value.as_str(), ")" | "]" | "." | ".."),
            TokenType::Operator | TokenType::Error => false,
        }
    }
}

pub fn new_character_token(index: usize, end: usize, text: &str) -> Token {
    Token::new(index, end, TokenType::Character, 0.0, text.to_string())
}

pub fn new_name_token(index: usize, end: usize, text: String) -> Token {
    Token::new(index, end, TokenType::Name, 0.0, text)
}

pub fn new_operator_token(index: usize, end: usize, text: &str) -> Token {
    Token::new(index, end, TokenType::Operator, 0.0, text.to_string())
}

pub fn new_number_token(index: usize, end: usize, n: f64) -> Token {
    Token::new(index, end, TokenType::Number, n, String::new())
}

pub fn new_error_token(index: usize, end: usize, message: String) -> Token {
    Token::new(index, end, TokenType::Error, 0.0, message)
}

const OPERATOR_NAMES: &[&str] = &["and", "or", "div", "mod"];

/// XPath expression lexer
#[derive(Debug, Default, Clone, Copy)]
pub struct Lexer;

impl Lexer {
    pub fn new() -> Self {
        Lexer
    }

    pub fn tokenize(&self, text: &str) -> Vec<Token> {
        Scanner::new(text).scan()
    }
}

struct Scanner<'a> {
    input: &'a str,
    index: usize,
    tokens: Vec<Token>,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Self {
        Scanner {
            input,
            index: 0,
            tokens: Vec::new(),
        }
    }

    fn scan(mut self) -> Vec<Token> {
        while let Some(token) = self.scan_token() {
            let is_error = token.is_error();
            self.tokens.push(token);
            if is_error {
                break;
            }
        }
        self.tokens
    }

    fn peek(&self) -> Option<char> {
        self.input[self.index..].chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input[self.index..].chars().nth(offset)
    }

    /// Whether the previous token lets the next one start an operand
    fn operator_expected(&self) -> bool {
        self.tokens.last().is_some_and(Token::ends_operand)
    }

    fn scan_token(&mut self) -> Option<Token> {
        while self.peek().is_some_and(chars::is_whitespace) {
            self.index += 1;
        }
        let start = self.index;
        let ch = self.peek()?;

        if chars::is_name_start(ch) {
            return Some(self.scan_name(start));
        }
        if chars::is_digit(ch) || (ch == chars::PERIOD && self.peek_at(1).is_some_and(chars::is_digit)) {
            return Some(self.scan_number(start));
        }
        if chars::is_quote(ch) {
            return Some(self.scan_string(start, ch));
        }

        let two: String = self.input[start..].chars().take(2).collect();
        match two.as_str() {
            ".." => return Some(self.punctuation(start, "..")),
            "!=" | "<=" | ">=" => {
                self.index += 2;
                return Some(new_operator_token(start, self.index, &two));
            }
            "//" => return Some(self.punctuation(start, "//")),
            _ => {}
        }

        match ch {
            chars::DOLLAR => {
                self.index += 1;
                if !self.peek().is_some_and(chars::is_name_start) {
                    return Some(new_error_token(start, self.index, "Expected a variable name after '$'".to_string()));
                }
                let name = self.take_name();
                Some(Token::new(start, self.index, TokenType::Variable, 0.0, name))
            }
            chars::STAR => {
                self.index += 1;
                if self.operator_expected() {
                    Some(new_operator_token(start, self.index, "*"))
                } else {
                    Some(new_name_token(start, self.index, "*".to_string()))
                }
            }
            '(' | ')' | '[' | ']' | ',' | '@' | '/' | '.' => {
                Some(self.punctuation(start, &ch.to_string()))
            }
            '=' | '<' | '>' | '+' | '-' | '|' => {
                self.index += 1;
                Some(new_operator_token(start, self.index, &ch.to_string()))
            }
            _ => {
                self.index += ch.len_utf8();
                Some(new_error_token(start, self.index, format!("Unexpected character [{}]", ch)))
            }
        }
    }

    fn punctuation(&mut self, start: usize, text: &str) -> Token {
        self.index += text.len();
        new_character_token(start, self.index, text)
    }

    fn take_name(&mut self) -> String {
        let start = self.index;
        while let Some(ch) = self.peek() {
            if chars::is_name_part(ch) {
                self.index += ch.len_utf8();
            } else if ch == chars::COLON
                && self.peek_at(1).is_some_and(chars::is_name_start)
                && !self.input[start..self.index].contains(':')
            {
                self.index += 1;
            } else {
                break;
            }
        }
        self.input[start..self.index].to_string()
    }

    fn scan_name(&mut self, start: usize) -> Token {
        let operator_expected = self.operator_expected();
        let name = self.take_name();
        if operator_expected && OPERATOR_NAMES.contains(&name.as_str()) {
            return new_operator_token(start, self.index, &name);
        }
        new_name_token(start, self.index, name)
    }

    fn scan_number(&mut self, start: usize) -> Token {
        let mut seen_period = false;
        while let Some(ch) = self.peek() {
            if chars::is_digit(ch) {
                self.index += 1;
            } else if ch == chars::PERIOD && !seen_period {
                seen_period = true;
                self.index += 1;
            } else {
                break;
            }
        }
        let text = &self.input[start..self.index];
        match text.parse::<f64>() {
            Ok(value) => new_number_token(start, self.index, value),
            Err(_) => new_error_token(start, self.index, format!("Invalid number [{}]", text)),
        }
    }

    fn scan_string(&mut self, start: usize, quote: char) -> Token {
        self.index += 1;
        match self.input[self.index..].find(quote) {
            Some(length) => {
                let value = self.input[self.index..self.index + length].to_string();
                self.index += length + 1;
                Token::new(start, self.index, TokenType::String, 0.0, value)
            }
            None => {
                self.index = self.input.len();
                new_error_token(start, self.index, "Unterminated quote".to_string())
            }
        }
    }
}
