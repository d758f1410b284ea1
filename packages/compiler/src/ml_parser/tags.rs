//! ML Parser Tags
//!
//! Qualified-name helpers for the `xsl:` instruction vocabulary.

/// Prefix of template instructions
pub const XSL_PREFIX: &str = "xsl";

/// Namespace URI bound to the `xsl` prefix in generated stylesheets
pub const XSL_NAMESPACE: &str = "http://www.w3.org/1999/XSL/Transform";

/// Split a qualified name into its prefix and local name
///
/// Format: `prefix:name`
/// Returns: (Some(prefix), name) or (None, name)
pub fn split_qname(qname: &str) -> (Option<&str>, &str) {
    match qname.split_once(':') {
        Some((prefix, local)) if !prefix.is_empty() && !local.is_empty() => (Some(prefix), local),
        _ => (None, qname),
    }
}

/// Merge namespace prefix and local name
pub fn merge_prefix_and_name(prefix: Option<&str>, local_name: &str) -> String {
    match prefix {
        Some(p) if !p.is_empty() => format!("{}:{}", p, local_name),
        _ => local_name.to_string(),
    }
}
