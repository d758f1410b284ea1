//! Void Elements Phase
//!
//! Marks elements that never have content: `yes` for names in the HTML void table, `maybe`
//! when the name is only known at render time.

use crate::ml_parser::html_tags::is_void_element;
use crate::template::pipeline::ir::{self, Name, Node, Template, VoidKind};

pub fn mark_void_elements(template: &mut Template) {
    ir::walk_mut(&mut template.nodes, &mut |node| {
        if let Node::Element(element) = node {
            element.void = match &element.name {
                Name::Static(name) if is_void_element(name) => VoidKind::Yes,
                Name::Static(_) => VoidKind::No,
                Name::Dynamic(_) => VoidKind::Maybe,
            };
        }
    });
    template.rebuild_arena();
}
