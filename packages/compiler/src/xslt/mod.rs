//! XSLT Module
//!
//! The declarative backend: one stylesheet for a whole ruleset, and the processor that runs it.

pub mod processor;
pub mod stylesheet;

pub use processor::{serialize_html, Processor};
pub use stylesheet::{Stylesheet, StylesheetBuilder, BUILTIN_TEMPLATES};
