/*
 * Character Codes
 *
 * Character constants and classes used by the expression lexer and the markup helpers.
 */

// Special characters
pub const TAB: char = '\t';
pub const NEWLINE: char = '\n';
pub const RETURN: char = '\r';
pub const SPACE: char = ' ';

// Punctuation
pub const BANG: char = '!';
pub const DQ: char = '"';
pub const DOLLAR: char = '$';
pub const SQ: char = '\'';
pub const LPAREN: char = '(';
pub const RPAREN: char = ')';
pub const STAR: char = '*';
pub const PLUS: char = '+';
pub const COMMA: char = ',';
pub const MINUS: char = '-';
pub const PERIOD: char = '.';
pub const SLASH: char = '/';
pub const COLON: char = ':';
pub const LT: char = '<';
pub const EQ: char = '=';
pub const GT: char = '>';
pub const AT: char = '@';
pub const UNDERSCORE: char = '_';
pub const LBRACE: char = '{';
pub const BAR: char = '|';
pub const RBRACE: char = '}';

// Digits
pub const ZERO: char = '0';
pub const NINE: char = '9';

/// XPath whitespace (`S` production of XML: space, tab, CR, LF)
pub fn is_whitespace(ch: char) -> bool {
    ch == SPACE || ch == TAB || ch == NEWLINE || ch == RETURN
}

/// Check if character is a digit
pub fn is_digit(ch: char) -> bool {
    (ZERO..=NINE).contains(&ch)
}

/// Check if character is a quote usable in XPath string literals
pub fn is_quote(ch: char) -> bool {
    ch == SQ || ch == DQ
}

/// Check if character can start an XML name (without colon)
pub fn is_name_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == UNDERSCORE
}

/// Check if character can be part of an XML name (without colon)
pub fn is_name_part(ch: char) -> bool {
    is_name_start(ch) || is_digit(ch) || ch == MINUS || ch == PERIOD
}
