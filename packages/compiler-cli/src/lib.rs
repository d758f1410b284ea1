#![deny(clippy::all)]

/**
 * Tagform CLI
 *
 * Command line front end: ruleset loading, verification, IR inspection, compilation and
 * rendering.
 */
pub use tagform_compiler as compiler;

pub mod app;
pub mod commands;
pub mod ruleset;

/// CLI version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
