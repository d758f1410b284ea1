use std::fs;
use std::path::Path;

use anyhow::Context;
use tagform_compiler::template::pipeline::ir::{dump_template, Template};
use tagform_compiler::{normalize, parse};

use crate::ruleset::expand_arguments;

/// IR of one template file, normalized unless `raw`.
pub fn template_ir(path: &Path, raw: bool) -> anyhow::Result<Template> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("Failed to read template {}", path.display()))?;
    let mut template =
        parse(&source).with_context(|| format!("Failed to parse {}", path.display()))?;
    if !raw {
        normalize(&mut template).with_context(|| format!("Failed to normalize {}", path.display()))?;
    }
    Ok(template)
}

pub fn run(templates: &[String], raw: bool, json: bool) -> anyhow::Result<()> {
    for path in expand_arguments(templates)? {
        let template = template_ir(&path, raw)?;
        println!("== {}", path.display());
        if json {
            println!("{}", serde_json::to_string_pretty(&template)?);
        } else {
            print!("{}", dump_template(&template));
        }
    }
    Ok(())
}
