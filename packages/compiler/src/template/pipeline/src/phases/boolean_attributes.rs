//! Boolean Attributes Phase

use crate::ml_parser::html_tags::is_boolean_attribute;
use crate::template::pipeline::ir::{self, Name, Node, Template};

/// Flag attributes that HTML serialization minimizes to their bare name.
pub fn mark_boolean_attributes(template: &mut Template) {
    ir::walk_mut(&mut template.nodes, &mut |node| {
        if let Node::Attribute(attribute) = node {
            attribute.boolean = matches!(&attribute.name, Name::Static(name) if is_boolean_attribute(name));
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::pipeline::ir::AttributeNode;

    #[test]
    fn marks_static_boolean_names() {
        let attribute = |name: &str| {
            Node::Attribute(AttributeNode {
                name: Name::Static(name.to_string()),
                boolean: false,
                guarded: false,
                children: vec![Node::literal("x")],
            })
        };
        let mut template = Template::new(vec![attribute("checked"), attribute("title")]);
        mark_boolean_attributes(&mut template);
        assert!(matches!(&template.nodes[0], Node::Attribute(a) if a.boolean));
        assert!(matches!(&template.nodes[1], Node::Attribute(a) if !a.boolean));
    }
}
