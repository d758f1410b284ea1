//! IR Source Module

pub mod dump;
pub mod handle;
pub mod nodes;
pub mod template;

pub use dump::dump_template;
pub use handle::{ElementId, ElementIdAllocator};
pub use nodes::*;
pub use template::*;
