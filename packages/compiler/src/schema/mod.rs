//! Schema Module
//!
//! Sink tables, filter safety and attribute declarations used by the safety verifier.

pub mod attribute_schema;
pub mod dom_security_schema;

pub use attribute_schema::*;
pub use dom_security_schema::*;
