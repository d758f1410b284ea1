//! Stylesheet Assembler
//!
//! Builds the declarative backend's single stylesheet from normalized template bodies. Tags
//! whose bodies serialize identically share one `xsl:template match="A|B"`.

use indexmap::IndexMap;

use crate::config::StylesheetOptions;
use crate::ml_parser::ast::{Element, Node};
use crate::ml_parser::serializer::{serialize_element, serialize_nodes};
use crate::ml_parser::tags::XSL_NAMESPACE;

/// Templates every ruleset gets unless it defines the tag itself: line breaks, paragraphs
/// and the `s`/`e`/`i` elements that hold the original markup of a tag.
pub const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    ("br", "<br/>"),
    ("e", ""),
    ("i", ""),
    ("p", "<p><xsl:apply-templates/></p>"),
    ("s", ""),
];

#[derive(Debug, Clone)]
pub struct StylesheetBuilder {
    options: StylesheetOptions,
    parameters: Vec<String>,
    templates: IndexMap<String, Vec<Node>>,
}

impl StylesheetBuilder {
    pub fn new(options: StylesheetOptions) -> Self {
        StylesheetBuilder {
            options,
            parameters: Vec::new(),
            templates: IndexMap::new(),
        }
    }

    pub fn add_parameter(&mut self, name: impl Into<String>) -> &mut Self {
        let name = name.into();
        if !self.parameters.contains(&name) {
            self.parameters.push(name);
        }
        self
    }

    /// Register the normalized body of a tag's template. A later body for the same tag
    /// replaces the earlier one.
    pub fn add_template(&mut self, tag: impl Into<String>, body: Vec<Node>) -> &mut Self {
        self.templates.insert(tag.into(), body);
        self
    }

    pub fn build(&self) -> Stylesheet {
        let mut root = Element::new("xsl:stylesheet")
            .with_attr("version", "1.0")
            .with_attr("xmlns:xsl", XSL_NAMESPACE);

        root.children.push(Node::Element(
            Element::new("xsl:output")
                .with_attr("method", "html")
                .with_attr("encoding", self.options.encoding.as_str())
                .with_attr("indent", if self.options.indent { "yes" } else { "no" }),
        ));
        for name in &self.parameters {
            root.children
                .push(Node::Element(Element::new("xsl:param").with_attr("name", name.as_str())));
        }

        for (tags, body) in self.group_templates() {
            let template = Element::new("xsl:template")
                .with_attr("match", tags.join("|"))
                .with_children(body);
            root.children.push(Node::Element(template));
        }

        log::debug!(
            "assembled stylesheet with {} templates for {} tags",
            root.children.len() - 1 - self.parameters.len(),
            self.templates.len()
        );
        Stylesheet { root }
    }

    /// Tag names grouped by identical bodies, ordered by their first tag name.
    fn group_templates(&self) -> Vec<(Vec<String>, Vec<Node>)> {
        let mut tags: Vec<&String> = self.templates.keys().collect();
        tags.sort();

        let mut groups: IndexMap<String, (Vec<String>, Vec<Node>)> = IndexMap::new();
        for tag in tags {
            let Some(body) = self.templates.get(tag) else {
                continue;
            };
            groups
                .entry(serialize_nodes(body))
                .or_insert_with(|| (Vec::new(), body.clone()))
                .0
                .push(tag.clone());
        }
        groups.into_values().collect()
    }
}

/// A generated stylesheet document
#[derive(Debug, Clone, PartialEq)]
pub struct Stylesheet {
    root: Element,
}

impl Stylesheet {
    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn to_xml(&self) -> String {
        serialize_element(&self.root)
    }

    /// `match` patterns of the stylesheet's templates, in document order.
    pub fn match_patterns(&self) -> Vec<&str> {
        self.root
            .child_elements()
            .filter(|e| e.is_xsl("template"))
            .filter_map(|e| e.attr("match"))
            .collect()
    }
}
