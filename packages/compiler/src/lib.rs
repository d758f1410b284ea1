#![deny(clippy::all)]

/**
 * Tagform Template Compiler
 *
 * Compiles the XSLT-like templates of forum markup tags into two renderers that produce
 * identical HTML: an imperative statement program and a stylesheet.
 */

pub mod chars;
pub mod compiler;
pub mod config;
pub mod error;
pub mod parse_util;

// Markup, expressions and templates
pub mod expression_parser;
pub mod ml_parser;
pub mod template;
pub mod template_parser;

// Verification tables and backends
pub mod output;
pub mod schema;
pub mod xslt;

// Re-exports
pub use compiler::{CompiledTemplate, Compiler, RendererBundle, Ruleset, TagDefinition};
pub use config::CompilerConfig;
pub use error::{CompileError, RenderError, Result, TagError, UnsafeReason, UnsafeTemplateError};
pub use output::Renderer;
pub use schema::{AttributeDeclaration, AttributeDeclarations, SinkContext};
pub use template::pipeline::ir::Template;
pub use template_parser::{check_unsafe, parse};
pub use xslt::{Processor, Stylesheet};

/// Normalize a parsed template in place with the default options.
pub fn normalize(template: &mut Template) -> Result<()> {
    template::pipeline::src::normalize(
        template,
        &template::pipeline::src::NormalizeOptions::default(),
    )
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
