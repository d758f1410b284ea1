//! Template Normalizations
//!
//! Rewrites of a template's source markup that give equivalent templates the same shape.
//! The stylesheet backend groups tags by the normalized markup, so two templates written
//! differently still share one rule. All but `preserve_single_spaces` keep the output
//! unchanged; that one keeps a space between two literal elements that would otherwise be
//! stripped as insignificant whitespace.

use crate::expression_parser::avt::escape_avt_literal;
use crate::expression_parser::evaluator::number_to_string;
use crate::expression_parser::{minify, parse_expression, split_avt, AvtPart, Expr};
use crate::ml_parser::ast::{self as ml, rewrite_child_lists, walk_elements_mut};

/// A named rewrite of template markup
pub struct Normalization {
    pub name: &'static str,
    pub run: fn(&mut Vec<ml::Node>),
}

pub const NORMALIZATIONS: &[Normalization] = &[
    Normalization {
        name: "remove_comments",
        run: remove_comments,
    },
    Normalization {
        name: "preserve_single_spaces",
        run: preserve_single_spaces,
    },
    Normalization {
        name: "strip_whitespace",
        run: strip_whitespace,
    },
    Normalization {
        name: "lowercase_names",
        run: lowercase_names,
    },
    Normalization {
        name: "minify_xpath",
        run: minify_xpath,
    },
    Normalization {
        name: "inline_text",
        run: inline_text,
    },
    Normalization {
        name: "inline_elements",
        run: inline_elements,
    },
    Normalization {
        name: "inline_attributes",
        run: inline_attributes,
    },
    Normalization {
        name: "single_when_choose",
        run: single_when_choose,
    },
    Normalization {
        name: "conditional_attributes",
        run: optimize_conditional_attributes,
    },
    Normalization {
        name: "conditional_value_of",
        run: optimize_conditional_value_of,
    },
];

/// Apply every normalization, in order.
pub fn normalize_template(nodes: &mut Vec<ml::Node>) {
    for normalization in NORMALIZATIONS {
        (normalization.run)(nodes);
        log::trace!("template normalization {} done", normalization.name);
    }
}

fn disables_escaping(element: &ml::Element) -> bool {
    element.attr("disable-output-escaping") == Some("yes")
}

fn is_fixed_name(name: &str) -> bool {
    matches!(split_avt(name).as_deref(), Ok([AvtPart::Literal(_)]))
}

fn fixed_name(name: &str) -> Option<String> {
    match split_avt(name) {
        Ok(mut parts) if parts.len() == 1 => match parts.pop() {
            Some(AvtPart::Literal(text)) => Some(text),
            _ => None,
        },
        _ => None,
    }
}

/// Name of the attribute an expression reads, if it is exactly `@name`.
fn attribute_test(source: &str) -> Option<String> {
    parse_expression(source)
        .ok()
        .and_then(|expr| expr.as_attribute_name().map(str::to_string))
}

/// Remove markup comments. `xsl:comment` is output and stays.
pub fn remove_comments(nodes: &mut Vec<ml::Node>) {
    rewrite_child_lists(nodes, &mut |list| {
        list.retain(|node| !matches!(node, ml::Node::Comment(_)));
    });
}

/// Keep a single space between two literal elements, which would otherwise be stripped.
pub fn preserve_single_spaces(nodes: &mut Vec<ml::Node>) {
    fn is_literal_element(node: Option<&ml::Node>) -> bool {
        node.and_then(ml::Node::as_element)
            .is_some_and(|element| !element.is_xsl_instruction())
    }

    fn preserve(list: &mut [ml::Node]) {
        for index in 1..list.len().saturating_sub(1) {
            let single_space = matches!(&list[index], ml::Node::Text(text) if text.value == " ");
            if single_space
                && is_literal_element(list.get(index - 1))
                && is_literal_element(list.get(index + 1))
            {
                list[index] = ml::Node::Element(
                    ml::Element::new("xsl:text").with_children(vec![ml::Node::text(" ")]),
                );
            }
        }
    }

    preserve(nodes);
    walk_elements_mut(nodes, &mut |element| {
        if !element.is_xsl("text") && !element.is_xsl("choose") {
            preserve(&mut element.children);
        }
    });
}

/// Drop whitespace-only text outside `xsl:text`.
pub fn strip_whitespace(nodes: &mut Vec<ml::Node>) {
    nodes.retain(|node| !node.is_blank_text());
    walk_elements_mut(nodes, &mut |element| {
        if !element.is_xsl("text") {
            element.children.retain(|node| !node.is_blank_text());
        }
    });
}

/// Lowercase the names of literal elements and attributes, and fixed names given to
/// `xsl:element` and `xsl:attribute`.
pub fn lowercase_names(nodes: &mut Vec<ml::Node>) {
    walk_elements_mut(nodes, &mut |element| {
        if element.is_xsl("element") || element.is_xsl("attribute") {
            if let Some(name) = element.attr("name").filter(|name| is_fixed_name(name)) {
                let lowercase = name.to_ascii_lowercase();
                element.set_attr("name", lowercase);
            }
        } else if !element.is_xsl_instruction() {
            element.name = element.name.to_ascii_lowercase();
            for attr in &mut element.attrs {
                attr.name = attr.name.to_ascii_lowercase();
            }
        }
    });
}

fn minify_avt(value: &str) -> Option<String> {
    let parts = split_avt(value).ok()?;
    let mut out = String::with_capacity(value.len());
    for part in parts {
        match part {
            AvtPart::Literal(text) => out.push_str(&escape_avt_literal(&text)),
            AvtPart::Expression(source) => {
                out.push('{');
                out.push_str(&minify(&source));
                out.push('}');
            }
        }
    }
    Some(out)
}

/// Remove insignificant whitespace from expressions.
pub fn minify_xpath(nodes: &mut Vec<ml::Node>) {
    walk_elements_mut(nodes, &mut |element| {
        let instruction = element.is_xsl_instruction();
        for attr in &mut element.attrs {
            let minified = match attr.name.as_str() {
                "select" | "test" if instruction => Some(minify(&attr.value)),
                "name" if instruction => minify_avt(&attr.value),
                _ if !instruction => minify_avt(&attr.value),
                _ => None,
            };
            if let Some(minified) = minified {
                attr.value = minified;
            }
        }
    });
}

/// Replace `xsl:text` and `xsl:value-of` of a literal with the text itself. Whitespace-only
/// values stay in `xsl:text`, where they are not stripped.
pub fn inline_text(nodes: &mut Vec<ml::Node>) {
    fn literal_text(element: &ml::Element) -> Option<String> {
        if disables_escaping(element) {
            return None;
        }
        let text = if element.is_xsl("text") {
            element.text_content()
        } else if element.is_xsl("value-of") {
            match parse_expression(element.attr("select")?).ok()? {
                Expr::Literal { value } => value,
                Expr::Number { value } => number_to_string(value),
                _ => return None,
            }
        } else {
            return None;
        };
        (!text.trim().is_empty()).then_some(text)
    }

    rewrite_child_lists(nodes, &mut |list| {
        let mut merged: Vec<ml::Node> = Vec::with_capacity(list.len());
        for node in list.drain(..) {
            let node = match node.as_element().and_then(literal_text) {
                Some(text) => ml::Node::text(text),
                None => node,
            };
            match (merged.last_mut(), node) {
                (Some(ml::Node::Text(previous)), ml::Node::Text(text)) => {
                    previous.value.push_str(&text.value)
                }
                (_, node) => merged.push(node),
            }
        }
        *list = merged;
    });
}

/// Replace `xsl:element` with a fixed name by a literal element.
pub fn inline_elements(nodes: &mut Vec<ml::Node>) {
    rewrite_child_lists(nodes, &mut |list| {
        for node in list.iter_mut() {
            let ml::Node::Element(element) = node else {
                continue;
            };
            if !element.is_xsl("element") || element.has_attr("namespace") {
                continue;
            }
            let Some(name) = element.attr("name").and_then(fixed_name) else {
                continue;
            };
            let children = std::mem::take(&mut element.children);
            *node = ml::Node::Element(ml::Element::new(name).with_children(children));
        }
    });
}

/// Turn the leading `xsl:attribute`s of a literal element into attribute value templates
/// when their content is only text and `xsl:value-of`s.
pub fn inline_attributes(nodes: &mut Vec<ml::Node>) {
    fn as_avt(attribute: &ml::Element) -> Option<(String, String)> {
        let name = attribute.attr("name").and_then(fixed_name)?;
        let mut value = String::new();
        for child in &attribute.children {
            match child {
                ml::Node::Text(text) => value.push_str(&escape_avt_literal(&text.value)),
                ml::Node::Element(element)
                    if element.is_xsl("value-of") && !disables_escaping(element) =>
                {
                    value.push('{');
                    value.push_str(element.attr("select")?);
                    value.push('}');
                }
                _ => return None,
            }
        }
        Some((name, value))
    }

    walk_elements_mut(nodes, &mut |element| {
        if element.is_xsl_instruction() {
            return;
        }
        let mut inlined = 0;
        for child in &element.children {
            let Some(attribute) = child.as_element().filter(|child| child.is_xsl("attribute"))
            else {
                break;
            };
            let Some((name, value)) = as_avt(attribute) else {
                break;
            };
            if element.has_attr(&name) || name == "xmlns" || name.starts_with("xmlns:") {
                break;
            }
            element.attrs.push(ml::Attribute::new(name, value));
            inlined += 1;
        }
        element.children.drain(..inlined);
    });
}

/// `xsl:choose` with a single `xsl:when` and no `xsl:otherwise` is an `xsl:if`.
pub fn single_when_choose(nodes: &mut Vec<ml::Node>) {
    rewrite_child_lists(nodes, &mut |list| {
        for node in list.iter_mut() {
            let ml::Node::Element(element) = node else {
                continue;
            };
            if !element.is_xsl("choose") {
                continue;
            }
            let whens: Vec<&ml::Element> = element.child_elements().collect();
            let [when] = whens.as_slice() else {
                continue;
            };
            if !when.is_xsl("when") || element.children.len() != 1 {
                continue;
            }
            let Some(test) = when.attr("test").map(str::to_string) else {
                continue;
            };
            let Some(ml::Node::Element(mut when)) = element.children.pop() else {
                continue;
            };
            let children = std::mem::take(&mut when.children);
            *node = ml::Node::Element(
                ml::Element::new("xsl:if")
                    .with_attr("test", test)
                    .with_children(children),
            );
        }
    });
}

/// The only child of an `xsl:if` testing `@name`, when it is an element.
fn guarded_child(element: &ml::Element) -> Option<(String, &ml::Element)> {
    if !element.is_xsl("if") {
        return None;
    }
    let name = attribute_test(element.attr("test")?)?;
    match element.children.as_slice() {
        [ml::Node::Element(child)] => Some((name, child)),
        _ => None,
    }
}

fn is_value_of_attribute(element: &ml::Element, name: &str) -> bool {
    element.is_xsl("value-of")
        && !disables_escaping(element)
        && element
            .attr("select")
            .and_then(attribute_test)
            .is_some_and(|selected| selected == name)
}

/// `<xsl:if test="@x"><xsl:attribute name="x"><xsl:value-of select="@x"/>` copies `@x`.
pub fn optimize_conditional_attributes(nodes: &mut Vec<ml::Node>) {
    rewrite_child_lists(nodes, &mut |list| {
        for node in list.iter_mut() {
            let Some(name) = node.as_element().and_then(|element| {
                let (name, attribute) = guarded_child(element)?;
                let copies = attribute.is_xsl("attribute")
                    && attribute.attr("name") == Some(name.as_str())
                    && matches!(
                        attribute.children.as_slice(),
                        [ml::Node::Element(value)] if is_value_of_attribute(value, &name)
                    );
                copies.then_some(name)
            }) else {
                continue;
            };
            *node = ml::Node::Element(
                ml::Element::new("xsl:copy-of").with_attr("select", format!("@{}", name)),
            );
        }
    });
}

/// `<xsl:if test="@x"><xsl:value-of select="@x"/>` is the `xsl:value-of` alone, since a
/// missing attribute has an empty value.
pub fn optimize_conditional_value_of(nodes: &mut Vec<ml::Node>) {
    rewrite_child_lists(nodes, &mut |list| {
        for node in list.iter_mut() {
            let value_of = node.as_element().and_then(|element| {
                let (name, child) = guarded_child(element)?;
                is_value_of_attribute(child, &name).then(|| child.clone())
            });
            if let Some(value_of) = value_of {
                *node = ml::Node::Element(value_of);
            }
        }
    });
}
