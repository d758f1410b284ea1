//! Template Pipeline IR
//!
//! Node kinds, the element arena and traversal helpers shared by every pipeline phase.

pub mod src;

pub use src::*;
