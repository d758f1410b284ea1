//! IR Dump
//!
//! XML-like rendering of a template's IR for debugging and for the CLI's `ir` command.

use crate::ml_parser::serializer::{escape_xml_attribute, escape_xml_text};

use super::nodes::{Escape, Name, Node, OutputValue, VoidKind};
use super::template::Template;

pub fn dump_template(template: &Template) -> String {
    let mut out = String::from("<template>\n");
    for node in &template.nodes {
        dump_node(node, 1, &mut out);
    }
    out.push_str("</template>\n");
    out
}

fn indent(depth: usize, out: &mut String) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

fn name_attr(name: &Name) -> String {
    match name {
        Name::Static(name) => format!(" name=\"{}\"", escape_xml_attribute(name)),
        Name::Dynamic(parts) => {
            let text: String = parts
                .iter()
                .map(|part| match part {
                    OutputValue::Literal(text) => text.clone(),
                    OutputValue::XPath(expr) => format!("{{{}}}", expr.source),
                })
                .collect();
            format!(" name=\"{}\" dynamic=\"1\"", escape_xml_attribute(&text))
        }
    }
}

fn open(tag: &str, attrs: &str, children: &[Node], depth: usize, out: &mut String) {
    indent(depth, out);
    if children.is_empty() {
        out.push_str(&format!("<{}{}/>\n", tag, attrs));
        return;
    }
    out.push_str(&format!("<{}{}>\n", tag, attrs));
    for child in children {
        dump_node(child, depth + 1, out);
    }
    indent(depth, out);
    out.push_str(&format!("</{}>\n", tag));
}

fn dump_node(node: &Node, depth: usize, out: &mut String) {
    match node {
        Node::Element(element) => {
            let void = match element.void {
                VoidKind::No => "",
                VoidKind::Yes => " void=\"yes\"",
                VoidKind::Maybe => " void=\"maybe\"",
            };
            let merge = if element.merge_attributes {
                " merge-attributes=\"1\""
            } else {
                ""
            };
            let attrs = format!(
                " id=\"{}\"{}{}{}",
                element.id,
                name_attr(&element.name),
                void,
                merge
            );
            open("element", &attrs, &element.children, depth, out);
        }
        Node::Attribute(attribute) => {
            let mut attrs = name_attr(&attribute.name);
            if attribute.boolean {
                attrs.push_str(" boolean=\"1\"");
            }
            if attribute.guarded {
                attrs.push_str(" guarded=\"1\"");
            }
            open("attribute", &attrs, &attribute.children, depth, out);
        }
        Node::Output(output) => {
            indent(depth, out);
            let escape = match output.escape {
                Escape::Text => "text",
                Escape::Attribute => "attribute",
                Escape::Raw => "raw",
            };
            let (kind, value) = match &output.value {
                OutputValue::Literal(text) => ("literal", text.as_str()),
                OutputValue::XPath(expr) => ("xpath", expr.source.as_str()),
            };
            let disable = if output.disable_escaping {
                " disable-output-escaping=\"yes\""
            } else {
                ""
            };
            out.push_str(&format!(
                "<output type=\"{}\" escape=\"{}\"{}>{}</output>\n",
                kind,
                escape,
                disable,
                escape_xml_text(value)
            ));
        }
        Node::Switch(switch) => {
            indent(depth, out);
            match &switch.branch_key {
                Some(key) => out.push_str(&format!("<switch branch-key=\"{:?}\">\n", key)),
                None => out.push_str("<switch>\n"),
            }
            for case in &switch.cases {
                let mut attrs = String::new();
                if let Some(test) = &case.test {
                    attrs.push_str(&format!(" test=\"{}\"", escape_xml_attribute(&test.source)));
                }
                if let Some(values) = &case.values {
                    attrs.push_str(&format!(
                        " branch-values=\"{}\"",
                        escape_xml_attribute(&format!("{:?}", values))
                    ));
                }
                open("case", &attrs, &case.children, depth + 1, out);
            }
            indent(depth, out);
            out.push_str("</switch>\n");
        }
        Node::CloseTag(close) => {
            indent(depth, out);
            let mut attrs = format!(" id=\"{}\"", close.id);
            if close.set {
                attrs.push_str(" set=\"1\"");
            }
            if close.check {
                attrs.push_str(" check=\"1\"");
            }
            out.push_str(&format!("<closeTag{}/>\n", attrs));
        }
        Node::ApplyChildren => {
            indent(depth, out);
            out.push_str("<applyTemplates/>\n");
        }
        Node::Comment(comment) => open("comment", "", &comment.children, depth, out),
        Node::CopyAttributes(copy) => {
            indent(depth, out);
            let names = match &copy.names {
                Some(names) => escape_xml_attribute(&names.join(" ")),
                None => "*".to_string(),
            };
            let guarded = if copy.guarded { " guarded=\"1\"" } else { "" };
            out.push_str(&format!(
                "<copyOfAttributes names=\"{}\"{}/>\n",
                names, guarded
            ));
        }
    }
}
