//! IR Template
//!
//! A compiled template: the node forest plus the element arena indexed by `ElementId`.

use serde::{Deserialize, Serialize};

use super::handle::ElementId;
use super::nodes::{Name, Node, VoidKind};

/// Arena entry describing one element of the template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementMeta {
    pub id: ElementId,
    pub name: Name,
    pub void: VoidKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub nodes: Vec<Node>,
    pub elements: Vec<ElementMeta>,
}

impl Template {
    pub fn new(nodes: Vec<Node>) -> Self {
        let mut template = Template {
            nodes,
            elements: Vec::new(),
        };
        template.rebuild_arena();
        template
    }

    pub fn element(&self, id: ElementId) -> Option<&ElementMeta> {
        self.elements.get(id.0).filter(|meta| meta.id == id)
    }

    /// Recompute the arena from the element nodes, in depth-first order.
    pub fn rebuild_arena(&mut self) {
        let mut elements = Vec::new();
        walk(&self.nodes, &mut |node| {
            if let Node::Element(element) = node {
                elements.push(ElementMeta {
                    id: element.id,
                    name: element.name.clone(),
                    void: element.void,
                });
            }
        });
        elements.sort_by_key(|meta| meta.id);
        self.elements = elements;
    }

    /// Total number of nodes, counting switch cases as part of their switch.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        walk(&self.nodes, &mut |_| count += 1);
        count
    }
}

/// Visit every node depth-first in document order.
pub fn walk<'a>(nodes: &'a [Node], visit: &mut dyn FnMut(&'a Node)) {
    for node in nodes {
        visit(node);
        for list in node.child_lists() {
            walk(list, visit);
        }
    }
}

/// Visit every node mutably; the callback runs before the node's children are visited.
pub fn walk_mut(nodes: &mut [Node], visit: &mut dyn FnMut(&mut Node)) {
    for node in nodes.iter_mut() {
        visit(node);
        for list in node.child_lists_mut() {
            walk_mut(list, visit);
        }
    }
}

/// Rewrite every node list of the forest, innermost lists first.
pub fn rewrite_lists(nodes: &mut Vec<Node>, rewrite: &mut dyn FnMut(&mut Vec<Node>)) {
    for node in nodes.iter_mut() {
        for list in node.child_lists_mut() {
            rewrite_lists(list, rewrite);
        }
    }
    rewrite(nodes);
}

/// Position of a node in the forest. Indexes alternate between a position in a node list and,
/// below a switch, the index of the case whose list comes next.
pub type NodePath = Vec<usize>;

/// Node at `path`, or `None` if the path does not end on a node.
pub fn node_at<'a>(nodes: &'a [Node], path: &[usize]) -> Option<&'a Node> {
    let (first, rest) = path.split_first()?;
    let node = nodes.get(*first)?;
    if rest.is_empty() {
        return Some(node);
    }
    match node {
        Node::Switch(switch) => {
            let (case_index, rest) = rest.split_first()?;
            node_at(&switch.cases.get(*case_index)?.children, rest)
        }
        _ => node_at(node.child_lists().into_iter().next()?, rest),
    }
}

pub fn node_at_mut<'a>(nodes: &'a mut [Node], path: &[usize]) -> Option<&'a mut Node> {
    let (first, rest) = path.split_first()?;
    let node = nodes.get_mut(*first)?;
    if rest.is_empty() {
        return Some(node);
    }
    match node {
        Node::Switch(switch) => {
            let (case_index, rest) = rest.split_first()?;
            node_at_mut(&mut switch.cases.get_mut(*case_index)?.children, rest)
        }
        _ => node_at_mut(node.child_lists_mut().into_iter().next()?, rest),
    }
}

/// Paths of all nodes matching `predicate`, in document order.
pub fn find_paths(nodes: &[Node], predicate: &dyn Fn(&Node) -> bool) -> Vec<NodePath> {
    let mut found = Vec::new();
    let mut prefix = Vec::new();
    collect_paths(nodes, predicate, &mut prefix, &mut found);
    found
}

fn collect_paths(
    nodes: &[Node],
    predicate: &dyn Fn(&Node) -> bool,
    prefix: &mut NodePath,
    found: &mut Vec<NodePath>,
) {
    for (index, node) in nodes.iter().enumerate() {
        prefix.push(index);
        if predicate(node) {
            found.push(prefix.clone());
        }
        match node {
            Node::Switch(switch) => {
                for (case_index, case) in switch.cases.iter().enumerate() {
                    prefix.push(case_index);
                    collect_paths(&case.children, predicate, prefix, found);
                    prefix.pop();
                }
            }
            _ => {
                for list in node.child_lists() {
                    collect_paths(list, predicate, prefix, found);
                }
            }
        }
        prefix.pop();
    }
}
