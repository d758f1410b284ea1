//! Unsafe Checker
//!
//! Static safety verification of a template's source markup. Every expression that can reach
//! a URL, CSS or JS sink must be a literal or a reference to a declared attribute whose
//! filters make it safe in that context; anything that cannot be assessed is rejected.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Result, UnsafeReason, UnsafeTemplateError};
use crate::expression_parser::{parse_expression, split_avt, AvtPart, Expr};
use crate::ml_parser::ast as ml;
use crate::ml_parser::parse_fragment;
use crate::schema::{
    attribute_sink, element_content_sink, resource_url_attribute, AttributeDeclarations,
    SinkContext,
};
use crate::template::pipeline::src::ingest::copied_attributes;

type CheckResult = std::result::Result<(), UnsafeTemplateError>;

static URL_SCHEME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([a-zA-Z][a-zA-Z0-9+.\-]*):").unwrap());

/// Parse `template` and verify it.
pub fn check_unsafe(template: &str, declarations: &AttributeDeclarations) -> Result<()> {
    let nodes = parse_fragment(template, "template.xsl")?;
    check_unsafe_nodes(&nodes, declarations)?;
    Ok(())
}

/// Verify already parsed template markup.
pub fn check_unsafe_nodes(nodes: &[ml::Node], declarations: &AttributeDeclarations) -> CheckResult {
    UnsafeChecker { declarations }.check_nodes(nodes, false)
}

/// Whether a URL starting with `prefix` has a scheme the template author chose. A fixed
/// scheme other than `data:` or `*script:`, or a `/` before any `:`, rules out an injected one.
pub fn has_fixed_scheme(prefix: &str) -> bool {
    if let Some(captures) = URL_SCHEME.captures(prefix) {
        let scheme = captures[1].to_ascii_lowercase();
        return scheme != "data" && !scheme.ends_with("script");
    }
    match (prefix.find('/'), prefix.find(':')) {
        (Some(slash), Some(colon)) => slash < colon,
        (Some(_), None) => true,
        _ => false,
    }
}

fn reject(reason: UnsafeReason, element: &ml::Element) -> CheckResult {
    Err(UnsafeTemplateError::new(reason, element.start_tag()))
}

struct UnsafeChecker<'d> {
    declarations: &'d AttributeDeclarations,
}

impl UnsafeChecker<'_> {
    fn check_nodes(&self, nodes: &[ml::Node], in_loop: bool) -> CheckResult {
        for node in nodes {
            match node {
                ml::Node::ProcessingInstruction(pi) => {
                    return Err(UnsafeTemplateError::new(
                        UnsafeReason::ProcessingInstruction(pi.target.clone()),
                        format!("<?{} {}?>", pi.target, pi.content),
                    ));
                }
                ml::Node::Element(element) => self.check_element(element, in_loop)?,
                ml::Node::Text(_) | ml::Node::Comment(_) => {}
            }
        }
        Ok(())
    }

    fn check_element(&self, element: &ml::Element, in_loop: bool) -> CheckResult {
        if element.is_xsl_instruction() {
            self.check_instruction(element)?;
        }
        let in_loop = in_loop || element.is_xsl("for-each");
        if let Some(name) = output_element_name(element) {
            self.check_output_element(element, name, in_loop)?;
        }
        self.check_nodes(&element.children, in_loop)
    }

    /// Constructs disallowed wherever they appear.
    fn check_instruction(&self, element: &ml::Element) -> CheckResult {
        if element.attr("disable-output-escaping") == Some("yes") {
            return reject(UnsafeReason::DisableOutputEscaping, element);
        }
        match element.local_name() {
            "copy" => reject(UnsafeReason::CopyOfSubtree, element),
            "copy-of" => {
                let select = element.attr("select").unwrap_or_default();
                match copied_attributes(select) {
                    Some(_) => Ok(()),
                    None => reject(UnsafeReason::CopyOfSubtree, element),
                }
            }
            "processing-instruction" => reject(
                UnsafeReason::ProcessingInstruction(
                    element.attr("name").unwrap_or_default().to_string(),
                ),
                element,
            ),
            "element" => match element.attr("name") {
                Some(name) if is_fixed_name(name) => Ok(()),
                name => reject(
                    UnsafeReason::DynamicElementName(name.unwrap_or_default().to_string()),
                    element,
                ),
            },
            "attribute" => match element.attr("name") {
                Some(name) if is_fixed_name(name) => Ok(()),
                name => reject(
                    UnsafeReason::DynamicAttributeName(name.unwrap_or_default().to_string()),
                    element,
                ),
            },
            _ => Ok(()),
        }
    }

    /// Sinks of an element the template writes: its attributes, the attributes added by
    /// instructions it owns, and its content.
    fn check_output_element(&self, element: &ml::Element, name: &str, in_loop: bool) -> CheckResult {
        let url_attribute = resource_url_attribute(name);

        if !element.is_xsl_instruction() {
            for attr in &element.attrs {
                if attr.name == "xmlns" || attr.name.starts_with("xmlns:") {
                    continue;
                }
                if url_attribute == Some(attr.name.to_ascii_lowercase().as_str())
                    && !avt_has_fixed_prefix(&attr.value)
                {
                    return reject(UnsafeReason::UnsafeResourceUrl(name.to_string()), element);
                }
                if let Some(context) = attribute_sink(name, &attr.name) {
                    self.check_avt(element, &attr.value, context, in_loop)?;
                }
            }
        }

        let mut owned = Vec::new();
        collect_owned_instructions(&element.children, in_loop, &mut owned);
        for (instruction, in_loop) in owned {
            if instruction.is_xsl("attribute") {
                let attr_name = instruction.attr("name").unwrap_or_default();
                if url_attribute == Some(attr_name.to_ascii_lowercase().as_str())
                    && !content_has_fixed_prefix(&instruction.children)
                {
                    return reject(UnsafeReason::UnsafeResourceUrl(name.to_string()), instruction);
                }
                if let Some(context) = attribute_sink(name, attr_name) {
                    self.check_attribute_content(instruction, context, in_loop)?;
                }
            } else {
                self.check_copied_attributes(instruction, name, url_attribute, in_loop)?;
            }
        }

        if let Some(context) = element_content_sink(name) {
            if in_loop {
                return reject(UnsafeReason::InsideLoop { context }, element);
            }
            self.check_content(&element.children, context)?;
        }
        Ok(())
    }

    fn check_avt(
        &self,
        element: &ml::Element,
        value: &str,
        context: SinkContext,
        in_loop: bool,
    ) -> CheckResult {
        let parts = match split_avt(value) {
            Ok(parts) => parts,
            Err(_) => {
                return reject(
                    UnsafeReason::UnassessableExpression {
                        expr: value.to_string(),
                        context,
                    },
                    element,
                )
            }
        };
        let expressions: Vec<&String> = parts
            .iter()
            .filter_map(|part| match part {
                AvtPart::Expression(source) => Some(source),
                AvtPart::Literal(_) => None,
            })
            .collect();
        if expressions.is_empty() {
            return Ok(());
        }
        if let (SinkContext::Url, Some(AvtPart::Literal(prefix))) = (context, parts.first()) {
            if has_fixed_scheme(prefix) {
                return Ok(());
            }
        }
        if in_loop {
            return reject(UnsafeReason::InsideLoop { context }, element);
        }
        for source in expressions {
            self.assess(source, context, element)?;
        }
        Ok(())
    }

    fn check_attribute_content(
        &self,
        attribute: &ml::Element,
        context: SinkContext,
        in_loop: bool,
    ) -> CheckResult {
        if context == SinkContext::Url && has_fixed_scheme(&leading_text(&attribute.children)) {
            return Ok(());
        }
        if in_loop && has_dynamic_content(&attribute.children) {
            return reject(UnsafeReason::InsideLoop { context }, attribute);
        }
        self.check_content(&attribute.children, context)
    }

    fn check_copied_attributes(
        &self,
        copy: &ml::Element,
        owner: &str,
        url_attribute: Option<&str>,
        in_loop: bool,
    ) -> CheckResult {
        let select = copy.attr("select").unwrap_or_default();
        let Some(selected) = copied_attributes(select) else {
            return reject(UnsafeReason::CopyOfSubtree, copy);
        };
        // With `@*` only declared attributes can be present
        let (names, explicit): (Vec<String>, bool) = match selected {
            Some(names) => (names, true),
            None => (self.declarations.keys().cloned().collect(), false),
        };
        for attr_name in names {
            if url_attribute == Some(attr_name.to_ascii_lowercase().as_str()) {
                return reject(UnsafeReason::UnsafeResourceUrl(owner.to_string()), copy);
            }
            let Some(context) = attribute_sink(owner, &attr_name) else {
                continue;
            };
            if in_loop {
                return reject(UnsafeReason::InsideLoop { context }, copy);
            }
            match self.declarations.get(&attr_name) {
                None if explicit => {
                    return reject(UnsafeReason::UnknownAttribute(attr_name), copy);
                }
                None => {}
                Some(declaration) if !declaration.is_safe_in(context) => {
                    return reject(
                        UnsafeReason::UnsafeInContext {
                            attribute: attr_name,
                            context,
                        },
                        copy,
                    );
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Every value written into a sink's content.
    fn check_content(&self, nodes: &[ml::Node], context: SinkContext) -> CheckResult {
        for node in nodes {
            let ml::Node::Element(element) = node else {
                continue;
            };
            if !element.is_xsl_instruction() {
                self.check_content(&element.children, context)?;
                continue;
            }
            match element.local_name() {
                "value-of" => {
                    self.assess(element.attr("select").unwrap_or_default(), context, element)?
                }
                "apply-templates" => {
                    return reject(
                        UnsafeReason::UnassessableExpression {
                            expr: "xsl:apply-templates".to_string(),
                            context,
                        },
                        element,
                    )
                }
                "for-each" => return reject(UnsafeReason::InsideLoop { context }, element),
                // Attributes of the sink element are checked on their own
                "attribute" | "copy-of" => {}
                _ => self.check_content(&element.children, context)?,
            }
        }
        Ok(())
    }

    fn assess(&self, source: &str, context: SinkContext, element: &ml::Element) -> CheckResult {
        let unassessable = || {
            reject(
                UnsafeReason::UnassessableExpression {
                    expr: source.to_string(),
                    context,
                },
                element,
            )
        };
        let Ok(expr) = parse_expression(source) else {
            return unassessable();
        };
        if matches!(expr, Expr::Literal { .. } | Expr::Number { .. }) {
            return Ok(());
        }
        let Some(name) = expr.as_attribute_name() else {
            return unassessable();
        };
        match self.declarations.get(name) {
            None => reject(UnsafeReason::UnknownAttribute(name.to_string()), element),
            Some(declaration) if !declaration.is_safe_in(context) => reject(
                UnsafeReason::UnsafeInContext {
                    attribute: name.to_string(),
                    context,
                },
                element,
            ),
            Some(_) => Ok(()),
        }
    }
}

/// Name of the element a node writes, when it writes one with a fixed name.
fn output_element_name(element: &ml::Element) -> Option<&str> {
    if element.is_xsl("element") {
        return element.attr("name").filter(|name| is_fixed_name(name));
    }
    (!element.is_xsl_instruction()).then_some(element.name.as_str())
}

fn is_fixed_name(name: &str) -> bool {
    matches!(split_avt(name).as_deref(), Ok([AvtPart::Literal(_)]))
}

/// `xsl:attribute` and `xsl:copy-of` instructions that add attributes to the enclosing
/// element, with whether a loop sits between them and it.
fn collect_owned_instructions<'a>(
    nodes: &'a [ml::Node],
    in_loop: bool,
    owned: &mut Vec<(&'a ml::Element, bool)>,
) {
    for node in nodes {
        let ml::Node::Element(element) = node else {
            continue;
        };
        if output_element_name(element).is_some() || element.is_xsl("element") {
            continue;
        }
        if element.is_xsl("attribute") || element.is_xsl("copy-of") {
            owned.push((element, in_loop));
            continue;
        }
        collect_owned_instructions(
            &element.children,
            in_loop || element.is_xsl("for-each"),
            owned,
        );
    }
}

/// Literal text at the start of an instruction's content.
fn leading_text(nodes: &[ml::Node]) -> String {
    let mut text = String::new();
    for node in nodes {
        match node {
            ml::Node::Text(t) => text.push_str(&t.value),
            ml::Node::Element(element) if element.is_xsl("text") => {
                text.push_str(&element.text_content())
            }
            ml::Node::Comment(_) => {}
            _ => break,
        }
    }
    text
}

fn has_dynamic_content(nodes: &[ml::Node]) -> bool {
    nodes.iter().any(|node| match node {
        ml::Node::Element(element) => !element.is_xsl("text"),
        _ => false,
    })
}

fn avt_has_fixed_prefix(value: &str) -> bool {
    match split_avt(value) {
        Ok(parts) => match parts.first() {
            None | Some(AvtPart::Literal(_)) => true,
            Some(AvtPart::Expression(_)) => false,
        },
        Err(_) => false,
    }
}

fn content_has_fixed_prefix(nodes: &[ml::Node]) -> bool {
    !has_dynamic_content(nodes) || !leading_text(nodes).trim().is_empty()
}
