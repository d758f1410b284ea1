//! Output Module
//!
//! The imperative backend: statement AST, control-structure rewrites, source emission, the
//! statement evaluator that renders documents and its quick path.

pub mod abstract_emitter;
pub mod control_structures;
pub mod evaluator;
pub mod output_ast;
pub mod quick;

pub use abstract_emitter::{emit_program, EmitterVisitorContext};
pub use evaluator::Renderer;
pub use output_ast::Program;
