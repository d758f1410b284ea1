use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tagform_compiler::RendererBundle;

use super::compile_ruleset;

pub const RENDERER_FILE: &str = "renderer.js";
pub const STYLESHEET_FILE: &str = "stylesheet.xsl";

/// Write both renderers to `out_dir`, returning the written paths.
pub fn write_outputs(bundle: &RendererBundle, out_dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;
    let outputs = [
        (out_dir.join(RENDERER_FILE), bundle.renderer.source()),
        (out_dir.join(STYLESHEET_FILE), bundle.stylesheet.to_xml()),
    ];
    let mut written = Vec::new();
    for (path, content) in outputs {
        fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        log::info!("wrote {}", path.display());
        written.push(path);
    }
    Ok(written)
}

pub fn run(path: &Path, out_dir: Option<&Path>) -> anyhow::Result<()> {
    let bundle = compile_ruleset(path)?;
    match out_dir {
        Some(out_dir) => {
            write_outputs(&bundle, out_dir)?;
        }
        None => {
            println!("{}", bundle.renderer.source());
            println!("{}", bundle.stylesheet.to_xml());
        }
    }
    Ok(())
}
