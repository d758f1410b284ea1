//! Pipeline Phases Module
//!
//! The ordered normalizer passes. Each pass is idempotent, so normalizing an already
//! normalized template leaves it unchanged.

pub mod boolean_attributes;
pub mod branch_tables;
pub mod close_tags;
pub mod conditional_close;
pub mod default_cases;
pub mod element_ids;
pub mod escaping;
pub mod optimizer;
pub mod start_tags;
pub mod void_elements;

use crate::error::Result;
use crate::template::pipeline::ir::Template;

use super::compilation::NormalizeOptions;

/// A named normalizer pass
pub struct Phase {
    pub name: &'static str,
    pub run: fn(&mut Template, &NormalizeOptions) -> Result<()>,
}

pub const PHASES: &[Phase] = &[
    Phase {
        name: "default_cases",
        run: run_default_cases,
    },
    Phase {
        name: "element_ids",
        run: run_element_ids,
    },
    Phase {
        name: "close_tags",
        run: run_close_tags,
    },
    Phase {
        name: "void_elements",
        run: run_void_elements,
    },
    Phase {
        name: "optimizer",
        run: run_optimizer,
    },
    Phase {
        name: "conditional_close",
        run: run_conditional_close,
    },
    Phase {
        name: "start_tags",
        run: run_start_tags,
    },
    Phase {
        name: "escaping",
        run: run_escaping,
    },
    Phase {
        name: "branch_tables",
        run: run_branch_tables,
    },
    Phase {
        name: "boolean_attributes",
        run: run_boolean_attributes,
    },
];

fn run_default_cases(template: &mut Template, _: &NormalizeOptions) -> Result<()> {
    default_cases::add_default_cases(template);
    Ok(())
}

fn run_element_ids(template: &mut Template, _: &NormalizeOptions) -> Result<()> {
    element_ids::assign_element_ids(template);
    Ok(())
}

fn run_close_tags(template: &mut Template, _: &NormalizeOptions) -> Result<()> {
    close_tags::insert_close_tags(template);
    Ok(())
}

fn run_void_elements(template: &mut Template, _: &NormalizeOptions) -> Result<()> {
    void_elements::mark_void_elements(template);
    Ok(())
}

fn run_optimizer(template: &mut Template, options: &NormalizeOptions) -> Result<()> {
    if options.optimize {
        optimizer::optimize(template, options.max_optimizer_passes)?;
    }
    Ok(())
}

fn run_conditional_close(template: &mut Template, _: &NormalizeOptions) -> Result<()> {
    conditional_close::mark_conditional_closes(template);
    Ok(())
}

fn run_start_tags(template: &mut Template, _: &NormalizeOptions) -> Result<()> {
    start_tags::resolve_start_tags(template);
    Ok(())
}

fn run_escaping(template: &mut Template, _: &NormalizeOptions) -> Result<()> {
    escaping::resolve_escaping(template);
    Ok(())
}

fn run_branch_tables(template: &mut Template, _: &NormalizeOptions) -> Result<()> {
    branch_tables::detect_branch_tables(template);
    Ok(())
}

fn run_boolean_attributes(template: &mut Template, _: &NormalizeOptions) -> Result<()> {
    boolean_attributes::mark_boolean_attributes(template);
    Ok(())
}
