//! Conditional Close Phase
//!
//! A close inside a switch may or may not run, so a later close for the same element,
//! following that switch as a sibling or inside one, must check whether the start tag was
//! already closed. The earlier close is marked `set` and the later one `check`.

use crate::template::pipeline::ir::{self, Node, NodePath, Template};

pub fn mark_conditional_closes(template: &mut Template) {
    ir::walk_mut(&mut template.nodes, &mut |node| {
        if let Node::CloseTag(close) = node {
            close.set = false;
            close.check = false;
        }
    });

    let paths = ir::find_paths(&template.nodes, &|node| matches!(node, Node::CloseTag(_)));
    let mut set: Vec<&NodePath> = Vec::new();
    let mut check: Vec<&NodePath> = Vec::new();
    for path in &paths {
        let Some(id) = ir::node_at(&template.nodes, path)
            .and_then(Node::as_close_tag)
            .map(|close| close.id)
        else {
            continue;
        };
        for depth in 1..path.len() {
            let switch_path = &path[..depth];
            if !matches!(ir::node_at(&template.nodes, switch_path), Some(Node::Switch(_))) {
                continue;
            }
            let parent = &switch_path[..depth - 1];
            let position = switch_path[depth - 1];
            for other in &paths {
                let follows = other.len() >= depth
                    && other[..depth - 1] == *parent
                    && other[depth - 1] > position;
                let same_element = ir::node_at(&template.nodes, other)
                    .is_some_and(|node| node.is_close_tag_for(id));
                if follows && same_element {
                    set.push(path);
                    check.push(other);
                }
            }
        }
    }

    for path in set {
        if let Some(Node::CloseTag(close)) = ir::node_at_mut(&mut template.nodes, path) {
            close.set = true;
        }
    }
    for path in check {
        if let Some(Node::CloseTag(close)) = ir::node_at_mut(&mut template.nodes, path) {
            close.check = true;
        }
    }
}
