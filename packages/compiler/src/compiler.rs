//! Compiler Main Module
//!
//! Compiles a ruleset of tag templates into a renderer bundle. Every template runs through
//! the same pipeline: parse, verify, template-level normalizations, IR ingest, IR
//! normalization and statement emission. Compiled templates are cached by source text.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::CompilerConfig;
use crate::error::{RenderError, Result, TagError};
use crate::expression_parser::Parameters;
use crate::ml_parser::ast::Node;
use crate::ml_parser::parse_fragment;
use crate::output::output_ast::{Program, Statement};
use crate::output::Renderer;
use crate::schema::AttributeDeclarations;
use crate::template::pipeline::ir::Template;
use crate::template::pipeline::src::{emit_template, ingest_template, normalize, NormalizeOptions};
use crate::template_parser::{check_unsafe_nodes, normalize_template};
use crate::xslt::{Processor, Stylesheet, StylesheetBuilder, BUILTIN_TEMPLATES};

/// A tag's template and the attributes it declares
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagDefinition {
    pub template: String,
    #[serde(default)]
    pub attributes: AttributeDeclarations,
}

impl TagDefinition {
    pub fn new(template: impl Into<String>) -> Self {
        TagDefinition {
            template: template.into(),
            attributes: AttributeDeclarations::new(),
        }
    }

    pub fn with_attributes(mut self, attributes: AttributeDeclarations) -> Self {
        self.attributes = attributes;
        self
    }
}

/// Everything a ruleset file holds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ruleset {
    pub tags: IndexMap<String, TagDefinition>,
    pub parameters: Parameters,
    pub config: CompilerConfig,
}

/// One template after the whole pipeline
#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    pub source: String,
    /// The parsed source, as the verifier checks it
    pub nodes: Vec<Node>,
    /// Body of the template in the stylesheet
    pub normalized: Vec<Node>,
    /// Normalized IR
    pub template: Template,
    pub statements: Vec<Statement>,
}

impl CompiledTemplate {
    /// Run the pipeline for one template. Nothing is returned unless every stage succeeds.
    pub fn compile(
        source: &str,
        declarations: &AttributeDeclarations,
        config: &CompilerConfig,
    ) -> Result<Self> {
        let nodes = parse_fragment(source, "template.xsl")?;
        check_unsafe_nodes(&nodes, declarations)?;

        let mut normalized = nodes.clone();
        if config.normalize_templates {
            normalize_template(&mut normalized);
        }

        let mut template = ingest_template(&normalized)?;
        normalize(&mut template, &NormalizeOptions::from(config))?;
        let statements = emit_template(&template);
        log::debug!(
            "compiled template into {} statement(s): {}",
            statements.len(),
            source
        );

        Ok(CompiledTemplate {
            source: source.to_string(),
            nodes,
            normalized,
            template,
            statements,
        })
    }
}

/// The two renderers of a compiled ruleset
#[derive(Debug, Clone)]
pub struct RendererBundle {
    pub renderer: Renderer,
    pub stylesheet: Stylesheet,
    processor: Processor,
    templates: IndexMap<String, Arc<CompiledTemplate>>,
}

impl RendererBundle {
    /// Render with the imperative renderer.
    pub fn render(&self, xml: &str) -> std::result::Result<String, RenderError> {
        self.renderer.render(xml)
    }

    /// Render by running the stylesheet.
    pub fn transform(&self, xml: &str) -> std::result::Result<String, RenderError> {
        self.processor.transform(xml, self.renderer.parameters())
    }

    /// Compiled templates by tag name, built-ins included.
    pub fn templates(&self) -> &IndexMap<String, Arc<CompiledTemplate>> {
        &self.templates
    }
}

/// Holds a ruleset and compiles it
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    config: CompilerConfig,
    tags: IndexMap<String, TagDefinition>,
    params: Parameters,
    cache: HashMap<String, Arc<CompiledTemplate>>,
}

impl Compiler {
    pub fn new(config: CompilerConfig) -> Self {
        Compiler {
            config,
            ..Default::default()
        }
    }

    pub fn from_ruleset(ruleset: Ruleset) -> Self {
        Compiler {
            config: ruleset.config,
            tags: ruleset.tags,
            params: ruleset.parameters,
            cache: HashMap::new(),
        }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn tags(&self) -> &IndexMap<String, TagDefinition> {
        &self.tags
    }

    pub fn add_tag(&mut self, name: impl Into<String>, definition: TagDefinition) -> &mut Self {
        self.tags.insert(name.into(), definition);
        self
    }

    pub fn set_parameter(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Compile one template, reusing the cached result for a source compiled before. A
    /// cached template is still verified against `declarations`.
    pub fn compile_template(
        &mut self,
        source: &str,
        declarations: &AttributeDeclarations,
    ) -> Result<Arc<CompiledTemplate>> {
        let compiled = self.lookup(source, declarations)?;
        self.cache.insert(source.to_string(), compiled.clone());
        Ok(compiled)
    }

    /// Compile every tag, built-ins included, and build both renderers.
    pub fn compile(&mut self) -> std::result::Result<RendererBundle, TagError> {
        let definitions = self.definitions();
        log::debug!("compiling {} tag template(s)", definitions.len());

        let this = &*self;
        let results: Vec<(String, Result<Arc<CompiledTemplate>>)> = definitions
            .par_iter()
            .map(|(tag, definition)| {
                (
                    tag.clone(),
                    this.lookup(&definition.template, &definition.attributes),
                )
            })
            .collect();

        let mut templates = IndexMap::new();
        for (tag, result) in results {
            let compiled = result.map_err(|error| TagError {
                tag: tag.clone(),
                error,
            })?;
            templates.insert(tag, compiled);
        }
        for compiled in templates.values() {
            self.cache
                .entry(compiled.source.clone())
                .or_insert_with(|| compiled.clone());
        }

        let mut program = Program::new();
        let mut builder = StylesheetBuilder::new(self.config.stylesheet.clone());
        for name in self.params.keys() {
            builder.add_parameter(name.as_str());
        }
        for (tag, compiled) in &templates {
            program.add_template(tag.as_str(), compiled.statements.clone());
            builder.add_template(tag.as_str(), compiled.normalized.clone());
        }
        let stylesheet = builder.build();
        let processor = Processor::new(stylesheet.root()).map_err(|error| TagError {
            tag: "xsl:stylesheet".to_string(),
            error,
        })?;
        log::debug!(
            "compiled {} tag(s) into {} distinct bodies",
            templates.len(),
            program.bodies.len()
        );

        Ok(RendererBundle {
            renderer: Renderer::new(program, self.params.clone()).with_quick_path(self.config.quick_path),
            stylesheet,
            processor,
            templates,
        })
    }

    fn lookup(
        &self,
        source: &str,
        declarations: &AttributeDeclarations,
    ) -> Result<Arc<CompiledTemplate>> {
        match self.cache.get(source) {
            Some(cached) => {
                check_unsafe_nodes(&cached.nodes, declarations)?;
                Ok(cached.clone())
            }
            None => CompiledTemplate::compile(source, declarations, &self.config).map(Arc::new),
        }
    }

    /// Ruleset tags followed by the built-ins it does not override
    fn definitions(&self) -> Vec<(String, TagDefinition)> {
        let mut definitions: Vec<(String, TagDefinition)> = self
            .tags
            .iter()
            .map(|(tag, definition)| (tag.clone(), definition.clone()))
            .collect();
        for (tag, source) in BUILTIN_TEMPLATES {
            if !self.tags.contains_key(*tag) {
                definitions.push((tag.to_string(), TagDefinition::new(*source)));
            }
        }
        definitions
    }
}
