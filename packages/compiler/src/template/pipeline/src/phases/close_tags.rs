//! Close Tags Phase
//!
//! Inserts a `CloseTag` for the nearest element before every node that writes content
//! (text, elements, comments, children), and one at the end of every element. Nodes inside
//! attributes and comments do not write element content and are left alone.
//!
//! Elements that already contain a close for themselves were processed before and are
//! skipped.

use crate::template::pipeline::ir::{self, ElementId, ElementNode, Node, Template};

pub fn insert_close_tags(template: &mut Template) {
    insert_in_list(&mut template.nodes, None);
}

fn insert_in_list(nodes: &mut Vec<Node>, owner: Option<ElementId>) {
    for mut node in std::mem::take(nodes) {
        match &mut node {
            Node::Element(element) => {
                push_close(nodes, owner);
                insert_in_element(element);
            }
            Node::Output(_) | Node::Comment(_) | Node::ApplyChildren => push_close(nodes, owner),
            Node::Switch(switch) => {
                for case in &mut switch.cases {
                    insert_in_list(&mut case.children, owner);
                }
            }
            Node::Attribute(_) | Node::CloseTag(_) | Node::CopyAttributes(_) => {}
        }
        nodes.push(node);
    }
}

fn insert_in_element(element: &mut ElementNode) {
    if contains_close_for(&element.children, element.id) {
        insert_in_list(&mut element.children, None);
        return;
    }
    insert_in_list(&mut element.children, Some(element.id));
    element.children.push(Node::close_tag(element.id));
}

fn push_close(nodes: &mut Vec<Node>, owner: Option<ElementId>) {
    if let Some(id) = owner {
        nodes.push(Node::close_tag(id));
    }
}

fn contains_close_for(nodes: &[Node], id: ElementId) -> bool {
    let mut found = false;
    ir::walk(nodes, &mut |node| found |= node.is_close_tag_for(id));
    found
}
