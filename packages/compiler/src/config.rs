//! Compiler Configuration
//!
//! Options read from a ruleset's `config` section. Every field has a default, so an empty
//! JSON object is a valid configuration.

use serde::{Deserialize, Serialize};

/// Upper bound on optimizer iterations before a template is rejected as non-converging
pub const DEFAULT_MAX_OPTIMIZER_PASSES: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompilerConfig {
    /// Iteration cap of the optimizer's fixed-point loop
    pub max_optimizer_passes: usize,
    /// Let the imperative renderer try the regex-based quick path first
    pub quick_path: bool,
    /// Run the template-level normalizations before building the IR
    pub normalize_templates: bool,
    /// Options written to the stylesheet's `xsl:output`
    pub stylesheet: StylesheetOptions,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            max_optimizer_passes: DEFAULT_MAX_OPTIMIZER_PASSES,
            quick_path: true,
            normalize_templates: true,
            stylesheet: StylesheetOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StylesheetOptions {
    pub encoding: String,
    pub indent: bool,
}

impl Default for StylesheetOptions {
    fn default() -> Self {
        StylesheetOptions {
            encoding: "utf-8".to_string(),
            indent: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let config: CompilerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, CompilerConfig::default());
        assert_eq!(config.max_optimizer_passes, 10);
        assert!(config.quick_path);
    }

    #[test]
    fn fields_are_camel_case() {
        let config: CompilerConfig =
            serde_json::from_str(r#"{"maxOptimizerPasses": 3, "quickPath": false}"#).unwrap();
        assert_eq!(config.max_optimizer_passes, 3);
        assert!(!config.quick_path);
        assert!(config.normalize_templates);
    }
}
