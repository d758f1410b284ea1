use std::fs;
use std::path::Path;

use anyhow::{bail, Context};
use tagform_compiler::RendererBundle;

use super::compile_ruleset;
use crate::app::Backend;
use crate::ruleset::expand_arguments;

/// Render one document with the chosen backend.
pub fn render_document(bundle: &RendererBundle, xml: &str, backend: Backend) -> anyhow::Result<String> {
    let html = match backend {
        Backend::Imperative => bundle.render(xml)?,
        Backend::Stylesheet => bundle.transform(xml)?,
        Backend::Both => {
            let imperative = bundle.render(xml)?;
            let stylesheet = bundle.transform(xml)?;
            if imperative != stylesheet {
                bail!(
                    "Renderers disagree:\n  imperative: {}\n  stylesheet: {}",
                    imperative,
                    stylesheet
                );
            }
            imperative
        }
    };
    Ok(html)
}

pub fn run(path: &Path, documents: &[String], backend: Backend) -> anyhow::Result<()> {
    let bundle = compile_ruleset(path)?;
    for document in expand_arguments(documents)? {
        let xml = fs::read_to_string(&document)
            .with_context(|| format!("Failed to read document {}", document.display()))?;
        let html = render_document(&bundle, &xml, backend)
            .with_context(|| format!("Failed to render {}", document.display()))?;
        println!("{}", html);
    }
    Ok(())
}
