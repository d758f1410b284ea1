//! Compilation Module
//!
//! Drives the normalizer passes over one template.

use crate::config::{CompilerConfig, DEFAULT_MAX_OPTIMIZER_PASSES};
use crate::error::Result;
use crate::template::pipeline::ir::Template;

use super::phases::PHASES;

/// Options of a normalizer run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Run the optimizer pass
    pub optimize: bool,
    pub max_optimizer_passes: usize,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        NormalizeOptions {
            optimize: true,
            max_optimizer_passes: DEFAULT_MAX_OPTIMIZER_PASSES,
        }
    }
}

impl From<&CompilerConfig> for NormalizeOptions {
    fn from(config: &CompilerConfig) -> Self {
        NormalizeOptions {
            optimize: true,
            max_optimizer_passes: config.max_optimizer_passes,
        }
    }
}

/// Run every normalizer pass over `template`, in order.
pub fn normalize(template: &mut Template, options: &NormalizeOptions) -> Result<()> {
    for phase in PHASES {
        (phase.run)(template, options)?;
        log::trace!("phase {} done, {} node(s)", phase.name, template.node_count());
    }
    log::debug!(
        "normalized template: {} element(s), {} node(s)",
        template.elements.len(),
        template.node_count()
    );
    Ok(())
}
