//! Element Ids Phase
//!
//! Renumbers elements depth-first in document order and remaps the close tags that refer
//! to them.

use std::collections::HashMap;

use crate::template::pipeline::ir::{self, ElementIdAllocator, Node, Template};

pub fn assign_element_ids(template: &mut Template) {
    let mut ids = ElementIdAllocator::new();
    let mut mapping = HashMap::new();
    ir::walk_mut(&mut template.nodes, &mut |node| {
        if let Node::Element(element) = node {
            let id = ids.allocate();
            mapping.insert(element.id, id);
            element.id = id;
        }
    });
    ir::walk_mut(&mut template.nodes, &mut |node| {
        if let Node::CloseTag(close) = node {
            if let Some(id) = mapping.get(&close.id) {
                close.id = *id;
            }
        }
    });
    template.rebuild_arena();
}
