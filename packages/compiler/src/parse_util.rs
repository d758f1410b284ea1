//! Parse Utilities
//!
//! Source files, locations and spans shared by every reader in the crate, plus the
//! `ParseError` type reported for malformed templates, documents and stylesheets.

use std::fmt;
use std::sync::Arc;

use crate::chars;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSourceFile {
    pub content: String,
    pub url: String,
}

impl ParseSourceFile {
    pub fn new(content: impl Into<String>, url: impl Into<String>) -> Self {
        ParseSourceFile {
            content: content.into(),
            url: url.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLocation {
    pub file: Arc<ParseSourceFile>,
    pub offset: usize,
    pub line: usize,
    pub col: usize,
}

impl ParseLocation {
    pub fn new(file: Arc<ParseSourceFile>, offset: usize, line: usize, col: usize) -> Self {
        ParseLocation {
            file,
            offset,
            line,
            col,
        }
    }

    /// Builds a location from a byte offset, computing the zero-based line and column.
    pub fn from_offset(file: Arc<ParseSourceFile>, offset: usize) -> Self {
        let offset = offset.min(file.content.len());
        let mut line = 0;
        let mut col = 0;
        for ch in file.content[..floor_char_boundary(&file.content, offset)].chars() {
            if ch == chars::NEWLINE {
                line += 1;
                col = 0;
            } else {
                col += 1;
            }
        }
        ParseLocation::new(file, offset, line, col)
    }

    /// Return the source around the location, up to `max_chars` or `max_lines` on each side.
    pub fn get_context(&self, max_chars: usize, max_lines: usize) -> (String, String) {
        let content = &self.file.content;
        let offset = floor_char_boundary(content, self.offset);

        let before: String = {
            let mut lines = 0;
            let mut taken: Vec<char> = Vec::new();
            for ch in content[..offset].chars().rev() {
                if taken.len() >= max_chars {
                    break;
                }
                if ch == chars::NEWLINE {
                    lines += 1;
                    if lines >= max_lines {
                        break;
                    }
                }
                taken.push(ch);
            }
            taken.into_iter().rev().collect()
        };

        let after: String = {
            let mut lines = 0;
            let mut taken = String::new();
            for ch in content[offset..].chars() {
                if taken.chars().count() >= max_chars {
                    break;
                }
                if ch == chars::NEWLINE {
                    lines += 1;
                    if lines >= max_lines {
                        break;
                    }
                }
                taken.push(ch);
            }
            taken
        };

        (before, after)
    }
}

impl fmt::Display for ParseLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.file.url, self.line, self.col)
    }
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    while !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSourceSpan {
    pub start: ParseLocation,
    pub end: ParseLocation,
}

impl ParseSourceSpan {
    pub fn new(start: ParseLocation, end: ParseLocation) -> Self {
        ParseSourceSpan { start, end }
    }

    /// The source text covered by the span.
    pub fn text(&self) -> &str {
        let content = &self.start.file.content;
        let start = floor_char_boundary(content, self.start.offset);
        let end = floor_char_boundary(content, self.end.offset.max(self.start.offset));
        &content[start..end]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorLevel {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub span: ParseSourceSpan,
    pub msg: String,
    pub level: ParseErrorLevel,
}

impl ParseError {
    pub fn new(span: ParseSourceSpan, msg: impl Into<String>) -> Self {
        ParseError {
            span,
            msg: msg.into(),
            level: ParseErrorLevel::Error,
        }
    }

    /// Convenience constructor for an error at a single byte offset of `file`.
    pub fn at_offset(file: &Arc<ParseSourceFile>, offset: usize, msg: impl Into<String>) -> Self {
        let location = ParseLocation::from_offset(file.clone(), offset);
        ParseError::new(ParseSourceSpan::new(location.clone(), location), msg)
    }

    pub fn contextual_message(&self) -> String {
        let (before, after) = self.span.start.get_context(100, 3);
        let level_str = match self.level {
            ParseErrorLevel::Warning => "WARNING",
            ParseErrorLevel::Error => "ERROR",
        };
        format!("{} (\"{}[{} ->]{}\")", self.msg, before, level_str, after)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.contextual_message(), self.span.start)
    }
}

impl std::error::Error for ParseError {}
