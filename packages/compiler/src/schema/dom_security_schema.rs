//! DOM Security Schema
//!
//! Maps element and attribute names to the sink context their values are interpreted in.
//!
//! # Security Warning
//!
//! ```text
//! =================================================================================================
//! =========== S T O P   -  S T O P   -  S T O P   -  S T O P   -  S T O P   -  S T O P  ===========
//! =================================================================================================
//!
//!        DO NOT EDIT THIS LIST OF SECURITY SENSITIVE PROPERTIES WITHOUT A SECURITY REVIEW!
//!
//! =================================================================================================
//! ```

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::ml_parser::tags::split_qname;

/// Context in which an attacker-controlled value becomes dangerous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkContext {
    Url,
    Css,
    Js,
}

impl fmt::Display for SinkContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SinkContext::Url => "URL",
            SinkContext::Css => "CSS",
            SinkContext::Js => "JS",
        })
    }
}

/// Map from tagName|attributeName to SinkContext. Attributes applying to all tags use '*'.
static SECURITY_SCHEMA: Lazy<HashMap<String, SinkContext>> = Lazy::new(|| {
    let mut schema = HashMap::new();

    // Case is insignificant below, all element and attribute names are lower-cased for lookup.

    register_context(&mut schema, SinkContext::Css, &["*|style"]);

    // NB: no JS entries here, event handlers (on*) are matched by prefix in `attribute_sink`.

    register_context(
        &mut schema,
        SinkContext::Url,
        &[
            "*|action",
            "*|background",
            "*|cite",
            "*|codebase",
            "*|data",
            "*|dynsrc",
            "*|formaction",
            "*|href",
            "*|icon",
            "*|longdesc",
            "*|lowsrc",
            "*|manifest",
            "*|ping",
            "*|poster",
            "*|src",
            "*|srcset",
        ],
    );

    schema
});

/// Elements whose text content is interpreted in a sink context.
static CONTENT_SCHEMA: Lazy<HashMap<&'static str, SinkContext>> = Lazy::new(|| {
    let mut schema = HashMap::new();
    schema.insert("style", SinkContext::Css);
    schema.insert("script", SinkContext::Js);
    schema
});

/// Elements that load executable or network content, with the attribute holding their URL.
static RESOURCE_ELEMENTS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut elements = HashMap::new();
    elements.insert("embed", "src");
    elements.insert("iframe", "src");
    elements.insert("object", "data");
    elements.insert("script", "src");
    elements
});

fn register_context(schema: &mut HashMap<String, SinkContext>, ctx: SinkContext, specs: &[&str]) {
    for spec in specs {
        schema.insert(spec.to_lowercase(), ctx);
    }
}

/// Get the security schema
pub fn security_schema() -> &'static HashMap<String, SinkContext> {
    &SECURITY_SCHEMA
}

/// Sink context of an attribute on a given element, if any. Prefixed names such as
/// `xlink:href` are looked up by their local name too.
pub fn attribute_sink(element_name: &str, attr_name: &str) -> Option<SinkContext> {
    let element_name = element_name.to_lowercase();
    let (_, element_name) = split_qname(&element_name);
    let attr_name = attr_name.to_lowercase();
    let (_, local_name) = split_qname(&attr_name);
    if local_name.starts_with("on") {
        return Some(SinkContext::Js);
    }
    let sink = [attr_name.as_str(), local_name].into_iter().find_map(|name| {
        SECURITY_SCHEMA
            .get(&format!("{}|{}", element_name, name))
            .or_else(|| SECURITY_SCHEMA.get(&format!("*|{}", name)))
            .copied()
    });
    sink
}

/// Sink context of an element's content, if any.
pub fn element_content_sink(element_name: &str) -> Option<SinkContext> {
    CONTENT_SCHEMA.get(element_name.to_lowercase().as_str()).copied()
}

/// Name of the URL-bearing attribute of elements that load executable or network content.
pub fn resource_url_attribute(element_name: &str) -> Option<&'static str> {
    RESOURCE_ELEMENTS
        .get(element_name.to_lowercase().as_str())
        .copied()
}
