//! Error taxonomy
//!
//! Compilation exposes three user-facing categories (parse, unsupported construct, unsafe
//! template) plus `InternalInvariant`, which always denotes a compiler defect.

use thiserror::Error;

use crate::parse_util::ParseError;
use crate::schema::SinkContext;

pub type Result<T> = std::result::Result<T, CompileError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("{0}")]
    Parse(#[from] ParseError),

    #[error("Unsupported construct {node}: {reason}")]
    UnsupportedConstruct { node: String, reason: String },

    #[error(transparent)]
    Unsafe(#[from] UnsafeTemplateError),

    #[error("Internal invariant violated: {0}")]
    InternalInvariant(String),
}

impl CompileError {
    pub fn unsupported(node: impl Into<String>, reason: impl Into<String>) -> Self {
        CompileError::UnsupportedConstruct {
            node: node.into(),
            reason: reason.into(),
        }
    }
}

/// Why the safety verifier rejected a template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnsafeReason {
    #[error("disable-output-escaping is not allowed")]
    DisableOutputEscaping,

    #[error("copying nodes verbatim cannot be assessed")]
    CopyOfSubtree,

    #[error("processing instruction '{0}' is not allowed")]
    ProcessingInstruction(String),

    #[error("dynamic element name '{0}' cannot be assessed")]
    DynamicElementName(String),

    #[error("dynamic attribute name '{0}' cannot be assessed")]
    DynamicAttributeName(String),

    #[error("cannot assess the safety of '{expr}' in {context} context")]
    UnassessableExpression { expr: String, context: SinkContext },

    #[error("attribute '{0}' is not declared")]
    UnknownAttribute(String),

    #[error("attribute '{attribute}' is not proven safe in {context} context")]
    UnsafeInContext {
        attribute: String,
        context: SinkContext,
    },

    #[error("cannot assess {context} context inside a loop")]
    InsideLoop { context: SinkContext },

    #[error("the URL of <{0}> must start with fixed, non-empty literal text")]
    UnsafeResourceUrl(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unsafe template: {reason} in {node}")]
pub struct UnsafeTemplateError {
    pub reason: UnsafeReason,
    /// Start tag (or attribute) of the offending source node.
    pub node: String,
}

impl UnsafeTemplateError {
    pub fn new(reason: UnsafeReason, node: impl Into<String>) -> Self {
        UnsafeTemplateError {
            reason,
            node: node.into(),
        }
    }
}

/// A tag of a ruleset whose template failed to compile. Nothing of the ruleset is installed.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Tag {tag}: {error}")]
pub struct TagError {
    pub tag: String,
    #[source]
    pub error: CompileError,
}

/// Errors raised while rendering a document.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    #[error("{0}")]
    Document(#[from] ParseError),

    #[error("Cannot evaluate '{expr}': {reason}")]
    Evaluation { expr: String, reason: String },

    #[error("Unsupported stylesheet instruction <{0}>")]
    Stylesheet(String),
}
