//! Quick Path
//!
//! Renders a document without building its tree. Tags are matched with a regex over the
//! markup; each template is split at its one top-level `ApplyChildren` into a head, run at
//! the start tag, and a tail, run at the end tag. Anything the scan cannot handle with
//! certainty returns `None` and the caller renders the tree instead.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use quick_xml::escape::unescape;
use regex::Regex;

use crate::ml_parser::ast::Element;
use crate::ml_parser::html_tags::escape_text;
use crate::template::pipeline::ir::ElementId;

use super::evaluator::{Invocation, Renderer};
use super::output_ast::{BoolExpr, Escape, Statement, StringExpr};

static TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"<(/?)([A-Za-z_][\w.\-]*)((?:\s+[A-Za-z_][\w.\-:]*\s*=\s*(?:"[^"<]*"|'[^'<]*'))*)\s*(/?)>"#,
    )
    .unwrap()
});

static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([A-Za-z_][\w.\-:]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap()
});

/// Statements run at the start tag and at the end tag of one template.
struct Split<'p> {
    head: &'p [Statement],
    tail: &'p [Statement],
    /// Escaping of the children, `None` when the template drops them
    children: Option<Escape>,
}

fn split(body: &[Statement]) -> Result<Split<'_>, &'static str> {
    if body.iter().any(needs_tree) {
        return Err("a template evaluates a general expression");
    }
    let nested_apply = body.iter().any(|statement| {
        !matches!(statement, Statement::ApplyChildren(_))
            && statement.any(&|inner| matches!(inner, Statement::ApplyChildren(_)))
    });
    if nested_apply {
        return Err("a template applies children conditionally");
    }
    let applies: Vec<usize> = body
        .iter()
        .enumerate()
        .filter(|(_, statement)| matches!(statement, Statement::ApplyChildren(_)))
        .map(|(index, _)| index)
        .collect();
    match applies.as_slice() {
        [] => Ok(Split {
            head: body,
            tail: &[],
            children: None,
        }),
        [index] => {
            let Statement::ApplyChildren(apply) = &body[*index] else {
                return Err("a template applies children conditionally");
            };
            Ok(Split {
                head: &body[..*index],
                tail: &body[*index + 1..],
                children: Some(apply.escape),
            })
        }
        _ => Err("a template applies children more than once"),
    }
}

/// Whether a statement needs the document tree, not just the current tag's attributes.
fn needs_tree(statement: &Statement) -> bool {
    statement.any(&|statement| match statement {
        Statement::Output(output) => is_xpath(&output.value),
        Statement::If(stmt) => stmt
            .branches
            .iter()
            .any(|branch| bool_needs_tree(&branch.condition)),
        Statement::Element(stmt) => stmt.name.iter().any(is_xpath),
        Statement::Attribute(stmt) => stmt.name.iter().any(is_xpath),
        _ => false,
    })
}

fn is_xpath(expr: &StringExpr) -> bool {
    matches!(expr, StringExpr::XPath(_))
}

fn bool_needs_tree(expr: &BoolExpr) -> bool {
    match expr {
        BoolExpr::XPath(_) => true,
        BoolExpr::Not(inner) => bool_needs_tree(inner),
        BoolExpr::And(left, right) | BoolExpr::Or(left, right) => {
            bool_needs_tree(left) || bool_needs_tree(right)
        }
        _ => false,
    }
}

/// A start tag whose end tag has not been read yet
struct Open<'p> {
    name: String,
    /// Children are written without escaping
    raw: bool,
    /// Children are dropped
    skip: bool,
    tail: Option<PendingTail<'p>>,
}

struct PendingTail<'p> {
    statements: &'p [Statement],
    element: Element,
    raw: bool,
    closed: HashSet<ElementId>,
}

pub fn try_quick(renderer: &Renderer, xml: &str) -> Option<String> {
    match render(renderer, xml) {
        Ok(html) => Some(html),
        Err(reason) => {
            log::debug!("Quick path unavailable, rendering the tree: {}", reason);
            None
        }
    }
}

fn render(renderer: &Renderer, xml: &str) -> Result<String, &'static str> {
    let mut out = String::with_capacity(xml.len());
    let mut stack: Vec<Open<'_>> = Vec::new();
    let mut seen_root = false;
    let mut position = 0;

    for captures in TAG.captures_iter(xml) {
        let Some(tag) = captures.get(0) else {
            continue;
        };
        text(&xml[position..tag.start()], &stack, &mut out)?;
        position = tag.end();

        let closing = !captures[1].is_empty();
        let name = &captures[2];
        let self_closing = !captures[4].is_empty();

        if closing {
            if self_closing {
                return Err("malformed end tag");
            }
            let open = stack.pop().ok_or("unexpected end tag")?;
            if open.name != name {
                return Err("mismatched end tag");
            }
            finish(renderer, open, &mut out)?;
            continue;
        }

        if stack.is_empty() {
            if seen_root {
                return Err("more than one root element");
            }
            seen_root = true;
            // The root element is transparent
            let open = Open {
                name: name.to_string(),
                raw: false,
                skip: false,
                tail: None,
            };
            if !self_closing {
                stack.push(open);
            }
            continue;
        }

        let open = start(renderer, name, &captures[3], &stack, &mut out)?;
        if self_closing {
            finish(renderer, open, &mut out)?;
        } else {
            stack.push(open);
        }
    }

    text(&xml[position..], &stack, &mut out)?;
    if !stack.is_empty() || !seen_root {
        return Err("unbalanced document");
    }
    Ok(out)
}

fn start<'p>(
    renderer: &'p Renderer,
    name: &str,
    attributes: &str,
    stack: &[Open<'p>],
    out: &mut String,
) -> Result<Open<'p>, &'static str> {
    let parent_raw = stack.last().is_some_and(|open| open.raw);
    let parent_skip = stack.last().is_some_and(|open| open.skip);
    let Some(body) = renderer.program().body(name).filter(|_| !parent_skip) else {
        // Transparent tag, or content of a tag whose template drops it
        return Ok(Open {
            name: name.to_string(),
            raw: parent_raw,
            skip: parent_skip,
            tail: None,
        });
    };

    let split = split(body)?;
    let element = element(name, attributes)?;
    let mut invocation = Invocation::new(renderer, &element, parent_raw, HashSet::new(), out);
    invocation
        .run(split.head)
        .map_err(|_| "a template failed to render")?;
    let raw = match split.children {
        Some(escape) => invocation.is_raw(escape),
        None => parent_raw,
    };
    let closed = invocation.into_closed();
    Ok(Open {
        name: name.to_string(),
        raw,
        skip: split.children.is_none(),
        tail: Some(PendingTail {
            statements: split.tail,
            element,
            raw: parent_raw,
            closed,
        }),
    })
}

fn finish(renderer: &Renderer, open: Open<'_>, out: &mut String) -> Result<(), &'static str> {
    let Some(tail) = open.tail else {
        return Ok(());
    };
    Invocation::new(renderer, &tail.element, tail.raw, tail.closed, out)
        .run(tail.statements)
        .map_err(|_| "a template failed to render")
}

fn text(segment: &str, stack: &[Open<'_>], out: &mut String) -> Result<(), &'static str> {
    if segment.is_empty() {
        return Ok(());
    }
    if segment.contains('<') {
        return Err("markup the scan does not recognize");
    }
    let Some(open) = stack.last() else {
        return match segment.trim().is_empty() {
            true => Ok(()),
            false => Err("text outside the root element"),
        };
    };
    let value = unescape(segment).map_err(|_| "invalid entity")?;
    if open.skip {
        return Ok(());
    }
    if open.raw {
        out.push_str(&value);
    } else {
        out.push_str(&escape_text(&value));
    }
    Ok(())
}

fn element(name: &str, attributes: &str) -> Result<Element, &'static str> {
    let mut element = Element::new(name);
    for captures in ATTRIBUTE.captures_iter(attributes) {
        let value = captures
            .get(2)
            .or_else(|| captures.get(3))
            .map(|value| value.as_str())
            .unwrap_or_default();
        let value = unescape(value).map_err(|_| "invalid entity")?;
        if element.has_attr(&captures[1]) {
            return Err("duplicate attribute");
        }
        element.set_attr(&captures[1], value.into_owned());
    }
    Ok(element)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression_parser::Parameters;
    use crate::ml_parser::parse_fragment;
    use crate::output::output_ast::Program;
    use crate::template::pipeline::src::compilation::{normalize, NormalizeOptions};
    use crate::template::pipeline::src::emit::emit_template;
    use crate::template::pipeline::src::ingest::ingest_template;

    fn renderer(definitions: &[(&str, &str)]) -> Renderer {
        let mut program = Program::new();
        for (tag, source) in definitions {
            let nodes = parse_fragment(source, "test.xsl").unwrap();
            let mut template = ingest_template(&nodes).unwrap();
            normalize(&mut template, &NormalizeOptions::default()).unwrap();
            program.add_template(*tag, emit_template(&template));
        }
        Renderer::new(program, Parameters::new())
    }

    #[test]
    fn matches_tree_renderer() {
        let renderer = renderer(&[
            ("B", "<b><xsl:apply-templates/></b>"),
            (
                "URL",
                r#"<a href="{@url}"><xsl:if test="@title"><xsl:attribute name="title"><xsl:value-of select="@title"/></xsl:attribute></xsl:if><xsl:apply-templates/></a>"#,
            ),
            ("E", ""),
        ]);
        for xml in [
            r#"<r><B>bold &amp; <URL url="http://x?a=1&amp;b=2" title='"t"'>link</URL></B></r>"#,
            r#"<r>a<E>hidden <B>x</B></E>b<X>y</X><B/></r>"#,
            "<t>plain &lt;text&gt;</t>",
        ] {
            assert_eq!(
                renderer.try_quick(xml),
                Some(renderer.render_tree(xml).unwrap()),
                "{}",
                xml
            );
        }
    }

    #[test]
    fn start_tag_attributes_match_tree_renderer() {
        let renderer = renderer(&[
            (
                "MAYBE",
                r#"<div><xsl:if test="@b">B</xsl:if><xsl:if test="@c"><xsl:attribute name="class">c</xsl:attribute></xsl:if><xsl:apply-templates/></div>"#,
            ),
            (
                "TWICE",
                r#"<b title="a"><xsl:copy-of select="@*"/><xsl:apply-templates/></b>"#,
            ),
        ]);
        let xml = r#"<r><MAYBE b="1" c="1">x</MAYBE><MAYBE c="1">y</MAYBE><TWICE id="i" title="t">z</TWICE></r>"#;
        let expected = concat!(
            "<div>Bx</div>",
            r#"<div class="c">y</div>"#,
            r#"<b title="t" id="i">z</b>"#,
        );
        assert_eq!(renderer.render_tree(xml).unwrap(), expected);
        assert_eq!(renderer.try_quick(xml).as_deref(), Some(expected));
    }

    #[test]
    fn falls_back_on_uncertainty() {
        let renderer = renderer(&[
            ("B", "<b><xsl:apply-templates/></b>"),
            ("LEN", "<i><xsl:value-of select=\"string-length(.)\"/></i>"),
            ("TWICE", "<xsl:apply-templates/><xsl:apply-templates/>"),
        ]);
        assert_eq!(renderer.try_quick("<r><!-- c --><B>x</B></r>"), None);
        assert_eq!(renderer.try_quick("<r><LEN>abc</LEN></r>"), None);
        assert_eq!(renderer.try_quick("<r><TWICE>a</TWICE></r>"), None);
        assert_eq!(renderer.try_quick("<r><B>x</r>"), None);
        assert_eq!(
            renderer.render("<r><LEN>abc</LEN></r>").unwrap(),
            "<i>3</i>"
        );
    }

    #[test]
    fn quick_path_follows_raw_text_context() {
        let renderer = renderer(&[("CODE", "<script><xsl:apply-templates/></script>")]);
        assert_eq!(
            renderer.try_quick("<r><CODE>a &lt; b</CODE></r>").as_deref(),
            Some("<script>a < b</script>")
        );
    }
}
