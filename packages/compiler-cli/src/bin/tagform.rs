/**
 * Tagform CLI - tagform
 *
 * Main entry point of the template compiler
 */
use clap::Parser;

use tagform_cli::app::{Cli, Command};
use tagform_cli::commands;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Compiler logs go to stderr; --verbose enables debug, RUST_LOG overrides
    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_module("tagform_compiler", level)
        .filter_module("tagform_cli", level)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .format_timestamp(None)
        .init();

    match &cli.command {
        Command::Check { ruleset } => commands::check::run(ruleset),
        Command::Ir {
            templates,
            raw,
            json,
        } => commands::ir::run(templates, *raw, *json),
        Command::Compile { ruleset, out_dir } => commands::compile::run(ruleset, out_dir.as_deref()),
        Command::Render {
            ruleset,
            documents,
            backend,
        } => commands::render::run(ruleset, documents, *backend),
    }
}
