//! Template Module
//!
//! Template compilation: the IR, its ingest from markup, the normalizer passes and the
//! backends' lowering.

pub mod pipeline;
