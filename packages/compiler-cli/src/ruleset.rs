//! Ruleset Files
//!
//! A ruleset file is JSON: inline `tags`, `include` glob patterns of template files (the
//! file stem names the tag), per-tag `attributes`, `parameters` and the compiler `config`.
//! Paths are relative to the ruleset file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context};
use indexmap::IndexMap;
use serde::Deserialize;
use tagform_compiler::expression_parser::Parameters;
use tagform_compiler::{AttributeDeclarations, CompilerConfig, Ruleset, TagDefinition};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RulesetFile {
    pub tags: IndexMap<String, TagDefinition>,
    pub include: Vec<String>,
    pub attributes: IndexMap<String, AttributeDeclarations>,
    pub parameters: Parameters,
    pub config: CompilerConfig,
}

impl RulesetFile {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read ruleset {}", path.display()))?;
        let file: RulesetFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse ruleset {}", path.display()))?;
        Ok(file)
    }

    /// Resolve includes and attribute sections into a ruleset. Inline tags win over
    /// included files of the same name.
    pub fn resolve(self, root: &Path) -> anyhow::Result<Ruleset> {
        let mut tags = self.tags;
        for pattern in &self.include {
            for path in expand_pattern(root, pattern)? {
                let tag = tag_name(&path)?;
                if tags.contains_key(&tag) {
                    log::debug!("{} is defined inline, skipping {}", tag, path.display());
                    continue;
                }
                let template = fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read template {}", path.display()))?;
                tags.insert(tag, TagDefinition::new(template));
            }
        }

        for (tag, attributes) in self.attributes {
            let definition = tags
                .get_mut(&tag)
                .ok_or_else(|| anyhow!("Attributes declared for unknown tag {}", tag))?;
            definition.attributes.extend(attributes);
        }

        log::debug!("loaded {} tag(s)", tags.len());
        Ok(Ruleset {
            tags,
            parameters: self.parameters,
            config: self.config,
        })
    }
}

/// Load and resolve the ruleset at `path`.
pub fn load_ruleset(path: &Path) -> anyhow::Result<Ruleset> {
    let root = path.parent().unwrap_or(Path::new("."));
    RulesetFile::load(path)?.resolve(root)
}

/// Files matching a glob pattern relative to `root`, sorted.
pub fn expand_pattern(root: &Path, pattern: &str) -> anyhow::Result<Vec<PathBuf>> {
    let full_pattern = root.join(pattern);
    let pattern_str = full_pattern.to_string_lossy();
    let mut files = Vec::new();
    for entry in glob::glob(&pattern_str)
        .with_context(|| format!("Invalid pattern {}", pattern))?
    {
        let path = entry?;
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Files named by command line arguments, each a path or a glob pattern.
pub fn expand_arguments(arguments: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for argument in arguments {
        let matched = expand_pattern(Path::new(""), argument)?;
        if matched.is_empty() {
            bail!("No file matches {}", argument);
        }
        files.extend(matched);
    }
    Ok(files)
}

fn tag_name(path: &Path) -> anyhow::Result<String> {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow!("Cannot name a tag after {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("tagform-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(dir.join("tags")).unwrap();
        dir
    }

    #[test]
    fn resolves_includes_and_attributes() {
        let dir = scratch("ruleset");
        fs::write(dir.join("tags/B.xsl"), "<b><xsl:apply-templates/></b>").unwrap();
        fs::write(dir.join("tags/URL.xsl"), r#"<a href="{@url}"/>"#).unwrap();
        fs::write(
            dir.join("rules.json"),
            r##"{
                "tags": {"B": {"template": "<strong><xsl:apply-templates/></strong>"}},
                "include": ["tags/*.xsl"],
                "attributes": {"URL": {"url": {"filterChain": ["#url"]}}},
                "parameters": {"L_WROTE": "wrote:"},
                "config": {"quickPath": false}
            }"##,
        )
        .unwrap();

        let ruleset = load_ruleset(&dir.join("rules.json")).unwrap();
        assert_eq!(
            ruleset.tags.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["B", "URL"]
        );
        assert_eq!(ruleset.tags["B"].template, "<strong><xsl:apply-templates/></strong>");
        assert!(ruleset.tags["URL"].attributes.contains_key("url"));
        assert!(!ruleset.config.quick_path);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn rejects_attributes_of_unknown_tags() {
        let file: RulesetFile =
            serde_json::from_str(r#"{"attributes": {"X": {"a": {}}}}"#).unwrap();
        assert!(file.resolve(Path::new(".")).is_err());
    }
}
