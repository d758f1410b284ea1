//! Escaping Phase
//!
//! Resolves the escaping context of every output node.

use crate::ml_parser::html_tags::is_raw_text_element;
use crate::template::pipeline::ir::{Escape, Name, Node, Template};

#[derive(Debug, Clone, Copy, Default)]
struct Scope {
    in_attribute: bool,
    in_comment: bool,
    in_raw_text: bool,
}

pub fn resolve_escaping(template: &mut Template) {
    resolve_list(&mut template.nodes, Scope::default());
}

fn resolve_list(nodes: &mut [Node], scope: Scope) {
    for node in nodes {
        match node {
            Node::Output(output) => {
                output.escape = if scope.in_attribute {
                    Escape::Attribute
                } else if output.disable_escaping || scope.in_comment || scope.in_raw_text {
                    Escape::Raw
                } else {
                    Escape::Text
                };
            }
            Node::Element(element) => {
                let in_raw_text =
                    matches!(&element.name, Name::Static(name) if is_raw_text_element(name));
                resolve_list(
                    &mut element.children,
                    Scope {
                        in_raw_text,
                        ..scope
                    },
                );
            }
            Node::Attribute(attribute) => resolve_list(
                &mut attribute.children,
                Scope {
                    in_attribute: true,
                    ..scope
                },
            ),
            Node::Comment(comment) => resolve_list(
                &mut comment.children,
                Scope {
                    in_comment: true,
                    ..scope
                },
            ),
            Node::Switch(switch) => {
                for case in &mut switch.cases {
                    resolve_list(&mut case.children, scope);
                }
            }
            Node::CloseTag(_) | Node::ApplyChildren | Node::CopyAttributes(_) => {}
        }
    }
}
