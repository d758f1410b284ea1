//! HTML Tag Definitions
//!
//! Serialization rules for HTML output shared by every renderer: void elements, boolean
//! attributes, raw-text elements and the escaping of text and attribute values.

use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Elements that never have an end tag
static VOID_ELEMENTS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "area", "base", "basefont", "br", "col", "command", "embed", "frame", "hr", "img",
        "input", "isindex", "keygen", "link", "meta", "param", "source", "track", "wbr",
    ]
    .into_iter()
    .collect()
});

/// Attributes minimized to their bare name when serialized
static BOOLEAN_ATTRIBUTES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "async",
        "autofocus",
        "autoplay",
        "checked",
        "compact",
        "controls",
        "declare",
        "default",
        "defer",
        "disabled",
        "formnovalidate",
        "hidden",
        "ismap",
        "loop",
        "multiple",
        "muted",
        "nohref",
        "noresize",
        "noshade",
        "novalidate",
        "nowrap",
        "open",
        "readonly",
        "required",
        "reversed",
        "selected",
    ]
    .into_iter()
    .collect()
});

/// Elements whose content is written without escaping
static RAW_TEXT_ELEMENTS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["script", "style"].into_iter().collect());

pub fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.contains(name.to_ascii_lowercase().as_str())
}

pub fn is_boolean_attribute(name: &str) -> bool {
    BOOLEAN_ATTRIBUTES.contains(name.to_ascii_lowercase().as_str())
}

pub fn is_raw_text_element(name: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(name.to_ascii_lowercase().as_str())
}

/// Escape text content: `&`, `<` and `>`.
pub fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Escape a double-quoted attribute value: `&`, `<`, `>` and `"`.
pub fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Serialize one attribute, minimizing boolean attributes.
pub fn format_attribute(name: &str, value: &str) -> String {
    if is_boolean_attribute(name) {
        format!(" {}", name)
    } else {
        format!(" {}=\"{}\"", name, escape_attribute(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_void_elements() {
        assert!(is_void_element("br"));
        assert!(is_void_element("IMG"));
        assert!(!is_void_element("div"));
    }

    #[test]
    fn test_boolean_attributes() {
        assert!(is_boolean_attribute("checked"));
        assert!(is_boolean_attribute("Disabled"));
        assert!(!is_boolean_attribute("title"));
        assert_eq!(format_attribute("selected", "selected"), " selected");
        assert_eq!(format_attribute("title", "a\"b"), " title=\"a&quot;b\"");
    }

    #[test]
    fn test_escaping() {
        assert_eq!(escape_text("a < b & c > d \""), "a &lt; b &amp; c &gt; d \"");
        assert_eq!(escape_attribute("'\"<&"), "'&quot;&lt;&amp;");
    }

    #[test]
    fn test_raw_text_elements() {
        assert!(is_raw_text_element("script"));
        assert!(is_raw_text_element("STYLE"));
        assert!(!is_raw_text_element("textarea"));
    }
}
