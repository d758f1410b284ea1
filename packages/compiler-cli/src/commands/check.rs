use std::path::Path;

use anyhow::bail;
use tagform_compiler::Compiler;

use crate::ruleset::load_ruleset;

pub fn run(path: &Path) -> anyhow::Result<()> {
    let ruleset = load_ruleset(path)?;
    let mut compiler = Compiler::new(ruleset.config.clone());

    let mut failures = 0;
    for (tag, definition) in &ruleset.tags {
        match compiler.compile_template(&definition.template, &definition.attributes) {
            Ok(compiled) => println!("ok     {} ({} statements)", tag, compiled.statements.len()),
            Err(error) => {
                failures += 1;
                println!("error  {}: {}", tag, error);
            }
        }
    }

    if failures > 0 {
        bail!("{} of {} tag(s) failed", failures, ruleset.tags.len());
    }
    Ok(())
}
