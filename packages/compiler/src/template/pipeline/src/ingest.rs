//! Ingest Module
//!
//! Converts a parsed template fragment into IR nodes. Element ids are allocated in creation
//! order, which is depth-first document order.

use crate::error::{CompileError, Result};
use crate::expression_parser::ast::{Axis, BinaryOp, Expr, NodeTest, Step};
use crate::expression_parser::{parse_expression, split_avt, AvtPart};
use crate::ml_parser::ast as ml;
use crate::template::pipeline::ir;

/// Build the IR of a template from its top-level nodes.
pub fn ingest_template(nodes: &[ml::Node]) -> Result<ir::Template> {
    let mut ingester = Ingester::default();
    let mut out = Vec::new();
    ingester.ingest_nodes(nodes, Scope::Content, &mut out)?;
    log::trace!("ingested {} element(s)", ingester.element_count);
    Ok(ir::Template::new(out))
}

/// What the nodes being ingested end up in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Content,
    Attribute,
    Comment,
}

impl Scope {
    fn describe(self) -> &'static str {
        match self {
            Scope::Content => "element content",
            Scope::Attribute => "an attribute",
            Scope::Comment => "a comment",
        }
    }
}

#[derive(Default)]
struct Ingester {
    ids: ir::ElementIdAllocator,
    element_count: usize,
}

impl Ingester {
    fn ingest_nodes(
        &mut self,
        nodes: &[ml::Node],
        scope: Scope,
        out: &mut Vec<ir::Node>,
    ) -> Result<()> {
        for node in nodes {
            match node {
                ml::Node::Text(text) => {
                    if !node.is_blank_text() {
                        out.push(ir::Node::literal(text.value.clone()));
                    }
                }
                ml::Node::Comment(_) => {}
                ml::Node::ProcessingInstruction(pi) => {
                    return Err(CompileError::unsupported(
                        format!("<?{} {}?>", pi.target, pi.content),
                        "processing instructions are not supported",
                    ));
                }
                ml::Node::Element(element) if element.is_xsl_instruction() => {
                    self.ingest_instruction(element, scope, out)?;
                }
                ml::Node::Element(element) => {
                    out.push(self.ingest_literal_element(element, scope)?);
                }
            }
        }
        Ok(())
    }

    fn ingest_literal_element(&mut self, element: &ml::Element, scope: Scope) -> Result<ir::Node> {
        reject_in(element, scope, &[Scope::Attribute, Scope::Comment])?;
        let id = self.allocate();
        let mut children = Vec::new();
        for attr in &element.attrs {
            if attr.name == "xmlns" || attr.name.starts_with("xmlns:") {
                continue;
            }
            children.push(ir::Node::Attribute(ir::AttributeNode {
                name: ir::Name::Static(attr.name.clone()),
                boolean: false,
                guarded: false,
                children: avt_outputs(element, &attr.value)?
                    .into_iter()
                    .map(|value| ir::Node::Output(output(value, false)))
                    .collect(),
            }));
        }
        self.ingest_nodes(&element.children, Scope::Content, &mut children)?;
        Ok(ir::Node::Element(ir::ElementNode::new(
            id,
            ir::Name::Static(element.name.clone()),
            children,
        )))
    }

    fn ingest_instruction(
        &mut self,
        element: &ml::Element,
        scope: Scope,
        out: &mut Vec<ir::Node>,
    ) -> Result<()> {
        match element.local_name() {
            "if" => {
                let test = xpath(element, required_attr(element, "test")?)?;
                let mut children = Vec::new();
                self.ingest_nodes(&element.children, scope, &mut children)?;
                out.push(ir::Node::Switch(ir::SwitchNode {
                    branch_key: None,
                    cases: vec![ir::Case {
                        test: Some(test),
                        values: None,
                        children,
                    }],
                }));
            }
            "choose" => out.push(self.ingest_choose(element, scope)?),
            "attribute" => {
                reject_in(element, scope, &[Scope::Attribute, Scope::Comment])?;
                let name = self.name(element)?;
                let mut children = Vec::new();
                self.ingest_nodes(&element.children, Scope::Attribute, &mut children)?;
                out.push(ir::Node::Attribute(ir::AttributeNode {
                    name,
                    boolean: false,
                    guarded: false,
                    children,
                }));
            }
            "element" => {
                reject_in(element, scope, &[Scope::Attribute, Scope::Comment])?;
                let name = self.name(element)?;
                let id = self.allocate();
                let mut children = Vec::new();
                self.ingest_nodes(&element.children, Scope::Content, &mut children)?;
                out.push(ir::Node::Element(ir::ElementNode::new(id, name, children)));
            }
            "text" => {
                if element.children.iter().any(|child| child.as_element().is_some()) {
                    return Err(CompileError::unsupported(
                        element.start_tag(),
                        "xsl:text may only contain text",
                    ));
                }
                let text = element.text_content();
                if !text.is_empty() {
                    let value = ir::OutputValue::Literal(text);
                    out.push(ir::Node::Output(output(value, disables_escaping(element))));
                }
            }
            "value-of" => {
                let expr = xpath(element, required_attr(element, "select")?)?;
                out.push(ir::Node::Output(output(
                    ir::OutputValue::XPath(expr),
                    disables_escaping(element),
                )));
            }
            "comment" => {
                reject_in(element, scope, &[Scope::Attribute, Scope::Comment])?;
                let mut children = Vec::new();
                self.ingest_nodes(&element.children, Scope::Comment, &mut children)?;
                out.push(ir::Node::Comment(ir::CommentNode { children }));
            }
            "copy-of" => {
                reject_in(element, scope, &[Scope::Attribute, Scope::Comment])?;
                let select = required_attr(element, "select")?;
                let names = copied_attributes(select).ok_or_else(|| {
                    CompileError::unsupported(
                        element.start_tag(),
                        "xsl:copy-of may only select attributes of the current node",
                    )
                })?;
                out.push(ir::Node::CopyAttributes(ir::CopyAttributesNode::new(names)));
            }
            "apply-templates" => {
                reject_in(element, scope, &[Scope::Attribute, Scope::Comment])?;
                if element.has_attr("select") {
                    return Err(CompileError::unsupported(
                        element.start_tag(),
                        "apply-templates with a select attribute is not supported",
                    ));
                }
                if element.children.iter().any(|child| !child.is_blank_text()) {
                    return Err(CompileError::unsupported(
                        element.start_tag(),
                        "apply-templates may not have children",
                    ));
                }
                out.push(ir::Node::ApplyChildren);
            }
            _ => {
                return Err(CompileError::unsupported(
                    element.start_tag(),
                    "unsupported XSL instruction",
                ));
            }
        }
        Ok(())
    }

    fn ingest_choose(&mut self, element: &ml::Element, scope: Scope) -> Result<ir::Node> {
        let mut cases = Vec::new();
        let mut has_otherwise = false;
        for child in &element.children {
            let branch = match child {
                ml::Node::Element(branch) => branch,
                ml::Node::Comment(_) => continue,
                _ if child.is_blank_text() => continue,
                _ => {
                    return Err(CompileError::unsupported(
                        element.start_tag(),
                        "xsl:choose may only contain xsl:when and xsl:otherwise",
                    ));
                }
            };
            if has_otherwise {
                return Err(CompileError::unsupported(
                    branch.start_tag(),
                    "xsl:otherwise must be the last child of xsl:choose",
                ));
            }
            let test = if branch.is_xsl("when") {
                Some(xpath(branch, required_attr(branch, "test")?)?)
            } else if branch.is_xsl("otherwise") {
                has_otherwise = true;
                None
            } else {
                return Err(CompileError::unsupported(
                    branch.start_tag(),
                    "xsl:choose may only contain xsl:when and xsl:otherwise",
                ));
            };
            let mut children = Vec::new();
            self.ingest_nodes(&branch.children, scope, &mut children)?;
            cases.push(ir::Case {
                test,
                values: None,
                children,
            });
        }
        if cases.iter().all(ir::Case::is_default) {
            return Err(CompileError::unsupported(
                element.start_tag(),
                "xsl:choose requires at least one xsl:when",
            ));
        }
        Ok(ir::Node::Switch(ir::SwitchNode {
            branch_key: None,
            cases,
        }))
    }

    /// Name of `xsl:element` or `xsl:attribute`, static unless the AVT has expressions.
    fn name(&self, element: &ml::Element) -> Result<ir::Name> {
        let parts = avt_outputs(element, required_attr(element, "name")?)?;
        match parts.as_slice() {
            [ir::OutputValue::Literal(name)] => Ok(ir::Name::Static(name.clone())),
            [] => Err(CompileError::unsupported(element.start_tag(), "empty name")),
            _ => Ok(ir::Name::Dynamic(parts)),
        }
    }

    fn allocate(&mut self) -> ir::ElementId {
        self.element_count += 1;
        self.ids.allocate()
    }
}

fn reject_in(element: &ml::Element, scope: Scope, rejected: &[Scope]) -> Result<()> {
    if rejected.contains(&scope) {
        return Err(CompileError::unsupported(
            element.start_tag(),
            format!("cannot be used inside {}", scope.describe()),
        ));
    }
    Ok(())
}

fn required_attr<'a>(element: &'a ml::Element, name: &str) -> Result<&'a str> {
    element.attr(name).ok_or_else(|| {
        CompileError::unsupported(
            element.start_tag(),
            format!("missing required attribute '{}'", name),
        )
    })
}

fn disables_escaping(element: &ml::Element) -> bool {
    element.attr("disable-output-escaping") == Some("yes")
}

fn output(value: ir::OutputValue, disable_escaping: bool) -> ir::OutputNode {
    ir::OutputNode {
        value,
        escape: ir::Escape::Text,
        disable_escaping,
    }
}

fn xpath(element: &ml::Element, source: &str) -> Result<ir::XPathExpr> {
    ir::XPathExpr::parse(source).map_err(|error| {
        CompileError::unsupported(element.start_tag(), format!("cannot parse XPath: {}", error))
    })
}

fn avt_outputs(element: &ml::Element, value: &str) -> Result<Vec<ir::OutputValue>> {
    let parts = split_avt(value).map_err(|reason| {
        CompileError::unsupported(
            element.start_tag(),
            format!("invalid attribute value template: {}", reason),
        )
    })?;
    parts
        .into_iter()
        .map(|part| match part {
            AvtPart::Literal(text) => Ok(ir::OutputValue::Literal(text)),
            AvtPart::Expression(source) => Ok(ir::OutputValue::XPath(xpath(element, &source)?)),
        })
        .collect()
}

/// Attribute names selected by an `xsl:copy-of`, `Some(None)` for `@*`.
pub fn copied_attributes(select: &str) -> Option<Option<Vec<String>>> {
    let expr = parse_expression(select).ok()?;
    let mut names: Vec<String> = Vec::new();
    if collect_attribute_steps(&expr, &mut names)? {
        return Some(None);
    }
    let mut unique: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        if !unique.contains(&name) {
            unique.push(name);
        }
    }
    Some(Some(unique))
}

/// Returns whether `@*` was selected, `None` if the expression selects anything else.
fn collect_attribute_steps(expr: &Expr, names: &mut Vec<String>) -> Option<bool> {
    match expr {
        Expr::Binary {
            op: BinaryOp::Union,
            left,
            right,
        } => {
            let left = collect_attribute_steps(left, names)?;
            let right = collect_attribute_steps(right, names)?;
            Some(left || right)
        }
        Expr::Path { path } => match path.steps.as_slice() {
            [Step {
                axis: Axis::Attribute,
                test: NodeTest::Any,
            }] => Some(true),
            [Step {
                axis: Axis::Attribute,
                test: NodeTest::Name(name),
            }] => {
                names.push(name.clone());
                Some(false)
            }
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml_parser::parse_fragment;

    fn ingest(source: &str) -> Result<ir::Template> {
        let nodes = parse_fragment(source, "test.xsl").unwrap();
        ingest_template(&nodes)
    }

    fn unsupported_node(source: &str) -> String {
        match ingest(source) {
            Err(CompileError::UnsupportedConstruct { node, .. }) => node,
            other => panic!("expected an unsupported construct, got {:?}", other),
        }
    }

    #[test]
    fn literal_elements_get_attribute_children_first() {
        let template = ingest(r#"<a href="{@url}#top"><b>x</b></a>"#).unwrap();
        let ir::Node::Element(a) = &template.nodes[0] else {
            panic!("expected an element");
        };
        assert_eq!(a.id, ir::ElementId(0));
        let ir::Node::Attribute(href) = &a.children[0] else {
            panic!("expected an attribute");
        };
        assert_eq!(href.children.len(), 2);
        assert!(matches!(&a.children[1], ir::Node::Element(b) if b.id == ir::ElementId(1)));
        assert_eq!(template.elements.len(), 2);
    }

    #[test]
    fn whitespace_only_text_is_stripped() {
        let template = ingest("<b>\n  <xsl:apply-templates/>\n</b>").unwrap();
        let ir::Node::Element(b) = &template.nodes[0] else {
            panic!("expected an element");
        };
        assert_eq!(b.children, vec![ir::Node::ApplyChildren]);
    }

    #[test]
    fn choose_becomes_a_switch_with_a_default() {
        let template = ingest(
            r#"<xsl:choose><xsl:when test="@a">A</xsl:when><xsl:otherwise>B</xsl:otherwise></xsl:choose>"#,
        )
        .unwrap();
        let ir::Node::Switch(switch) = &template.nodes[0] else {
            panic!("expected a switch");
        };
        assert_eq!(switch.cases.len(), 2);
        assert!(!switch.cases[0].is_default());
        assert!(switch.cases[1].is_default());
    }

    #[test]
    fn copy_of_attribute_unions() {
        let template = ingest(r#"<b><xsl:copy-of select="@a|@b"/><xsl:copy-of select="@*"/></b>"#)
            .unwrap();
        let ir::Node::Element(b) = &template.nodes[0] else {
            panic!("expected an element");
        };
        assert_eq!(
            b.children[0],
            ir::Node::CopyAttributes(ir::CopyAttributesNode::new(Some(vec![
                "a".to_string(),
                "b".to_string()
            ])))
        );
        assert_eq!(
            b.children[1],
            ir::Node::CopyAttributes(ir::CopyAttributesNode::new(None))
        );
    }

    #[test]
    fn dynamic_names() {
        let template = ingest(r#"<xsl:element name="h{@level}">x</xsl:element>"#).unwrap();
        assert!(matches!(
            &template.nodes[0],
            ir::Node::Element(element) if matches!(element.name, ir::Name::Dynamic(_))
        ));
    }

    #[test]
    fn rejects_unsupported_constructs() {
        assert_eq!(
            unsupported_node(r#"<xsl:for-each select="x">y</xsl:for-each>"#),
            "<xsl:for-each select=\"x\">"
        );
        assert_eq!(
            unsupported_node(r#"<xsl:apply-templates select="x"/>"#),
            "<xsl:apply-templates select=\"x\">"
        );
        assert_eq!(unsupported_node("<xsl:copy/>"), "<xsl:copy>");
        assert_eq!(unsupported_node("<?php echo 1 ?>"), "<?php echo 1?>");
        unsupported_node(r#"<xsl:choose><xsl:when test="1">x</xsl:when>stray</xsl:choose>"#);
        unsupported_node(
            r#"<xsl:choose><xsl:otherwise/><xsl:when test="@a">x</xsl:when></xsl:choose>"#,
        );
        unsupported_node(r#"<xsl:copy-of select="b"/>"#);
        unsupported_node(r#"<xsl:value-of select="//x"/>"#);
        unsupported_node(r#"<xsl:attribute name="x"><b/></xsl:attribute>"#);
        unsupported_node(r#"<xsl:comment><xsl:apply-templates/></xsl:comment>"#);
    }

    #[test]
    fn disable_output_escaping_is_kept() {
        let template =
            ingest(r#"<xsl:value-of select="@x" disable-output-escaping="yes"/>"#).unwrap();
        assert!(matches!(&template.nodes[0], ir::Node::Output(o) if o.disable_escaping));
    }
}
