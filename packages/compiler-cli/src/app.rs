use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// tagform - verified compiler for forum markup tag templates
#[derive(Debug, Parser)]
#[command(name = "tagform", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose (debug-level) logging output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Verify and compile every tag of a ruleset, reporting each failure.
    Check {
        /// Path to the ruleset JSON file.
        #[arg(value_name = "RULESET")]
        ruleset: PathBuf,
    },

    /// Print the IR of template files.
    Ir {
        /// Template files or glob patterns.
        #[arg(value_name = "TEMPLATE", required = true)]
        templates: Vec<String>,

        /// Print the IR as parsed, before normalization.
        #[arg(long)]
        raw: bool,

        /// Print the IR as JSON instead of the XML-like dump.
        #[arg(long)]
        json: bool,
    },

    /// Compile a ruleset into the renderer source and the stylesheet.
    Compile {
        /// Path to the ruleset JSON file.
        #[arg(value_name = "RULESET")]
        ruleset: PathBuf,

        /// Directory to write renderer.js and stylesheet.xsl to, instead of stdout.
        #[arg(short, long, value_name = "DIR")]
        out_dir: Option<PathBuf>,
    },

    /// Render documents with a compiled ruleset.
    Render {
        /// Path to the ruleset JSON file.
        #[arg(value_name = "RULESET")]
        ruleset: PathBuf,

        /// Document files or glob patterns.
        #[arg(value_name = "DOCUMENT", required = true)]
        documents: Vec<String>,

        /// Renderer to use; `both` fails when their outputs differ.
        #[arg(short, long, value_enum, default_value = "imperative")]
        backend: Backend,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    Imperative,
    Stylesheet,
    Both,
}
