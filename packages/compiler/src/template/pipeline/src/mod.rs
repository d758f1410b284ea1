//! Pipeline Source Module
//!
//! Ingest, normalization, interpretation and lowering of template IR.

pub mod compilation;
pub mod emit;
pub mod ingest;
pub mod interpret;
pub mod phases;

pub use compilation::*;
pub use emit::emit_template;
pub use ingest::ingest_template;
pub use interpret::Interpreter;
