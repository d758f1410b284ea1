pub mod check;
pub mod compile;
pub mod ir;
pub mod render;

use std::path::Path;

use anyhow::Context;
use tagform_compiler::{Compiler, RendererBundle};

use crate::ruleset::load_ruleset;

/// Load a ruleset file and compile it.
pub fn compile_ruleset(path: &Path) -> anyhow::Result<RendererBundle> {
    let ruleset = load_ruleset(path)?;
    Compiler::from_ruleset(ruleset)
        .compile()
        .with_context(|| format!("Failed to compile {}", path.display()))
}
