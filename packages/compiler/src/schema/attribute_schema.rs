//! Attribute Schema
//!
//! Declared attributes of a tag: their filter chains and the contexts they are proven safe in.
//! This is the only extension point of the safety verifier.

use bitflags::bitflags;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashMap;

use super::dom_security_schema::SinkContext;

bitflags! {
    /// Set of sink contexts a value is safe in.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SafeContexts: u8 {
        const URL = 1 << 0;
        const CSS = 1 << 1;
        const JS = 1 << 2;
    }
}

impl SafeContexts {
    pub fn for_context(context: SinkContext) -> Self {
        match context {
            SinkContext::Url => SafeContexts::URL,
            SinkContext::Css => SafeContexts::CSS,
            SinkContext::Js => SafeContexts::JS,
        }
    }

    pub fn allows(&self, context: SinkContext) -> bool {
        self.contains(SafeContexts::for_context(context))
    }
}

/// Contexts each built-in filter is inherently safe in.
static FILTER_SAFETY: Lazy<HashMap<&'static str, SafeContexts>> = Lazy::new(|| {
    let all = SafeContexts::URL | SafeContexts::CSS | SafeContexts::JS;
    let mut filters = HashMap::new();
    for numeric in ["#float", "#int", "#number", "#range", "#uint"] {
        filters.insert(numeric, all);
    }
    filters.insert("#url", SafeContexts::URL | SafeContexts::CSS);
    filters.insert("#identifier", SafeContexts::URL | SafeContexts::CSS);
    filters.insert("#alnum", SafeContexts::URL | SafeContexts::CSS);
    filters.insert("#ip", SafeContexts::URL | SafeContexts::CSS);
    filters.insert("#ipv4", SafeContexts::URL | SafeContexts::CSS);
    filters.insert("#ipv6", SafeContexts::URL | SafeContexts::CSS);
    filters.insert("#color", SafeContexts::CSS);
    filters.insert("#simpletext", SafeContexts::CSS);
    filters.insert("#email", SafeContexts::URL);
    filters
});

/// Contexts a single filter is inherently safe in. Unknown filters are safe nowhere.
pub fn filter_safe_contexts(filter: &str) -> SafeContexts {
    FILTER_SAFETY
        .get(filter.to_lowercase().as_str())
        .copied()
        .unwrap_or_default()
}

/// A declared attribute of the tag that owns a template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDeclaration {
    /// Ordered filter chain, e.g. `["#url"]`.
    #[serde(default, rename = "filterChain", alias = "filters")]
    pub filter_chain: SmallVec<[String; 2]>,
    /// Contexts explicitly asserted safe by configuration.
    #[serde(default, rename = "safe")]
    pub asserted_safe: SmallVec<[SinkContext; 3]>,
}

impl AttributeDeclaration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter_chain.push(filter.into());
        self
    }

    pub fn mark_safe(mut self, context: SinkContext) -> Self {
        if !self.asserted_safe.contains(&context) {
            self.asserted_safe.push(context);
        }
        self
    }

    /// Union of the contexts proven by the filter chain and the explicit assertions.
    pub fn safe_contexts(&self) -> SafeContexts {
        let from_filters = self
            .filter_chain
            .iter()
            .fold(SafeContexts::empty(), |acc, filter| {
                acc | filter_safe_contexts(filter)
            });
        self.asserted_safe
            .iter()
            .fold(from_filters, |acc, context| {
                acc | SafeContexts::for_context(*context)
            })
    }

    pub fn is_safe_in(&self, context: SinkContext) -> bool {
        self.safe_contexts().allows(context)
    }
}

/// Declared attributes of one tag, by attribute name.
pub type AttributeDeclarations = IndexMap<String, AttributeDeclaration>;
