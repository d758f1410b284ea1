//! Template Parser Module
//!
//! Entry points from template text: parsing into IR, source-level normalizations and the
//! safety verifier.

pub mod normalizations;
pub mod unsafe_checker;

pub use normalizations::normalize_template;
pub use unsafe_checker::{check_unsafe, check_unsafe_nodes};

use crate::error::Result;
use crate::ml_parser::parse_fragment;
use crate::template::pipeline::ir::Template;
use crate::template::pipeline::src::ingest::ingest_template;

/// Parse template text into IR, before normalization.
pub fn parse(template: &str) -> Result<Template> {
    let nodes = parse_fragment(template, "template.xsl")?;
    ingest_template(&nodes)
}
