//! Optimizer Phase
//!
//! Moves and removes close tags until a fixed point is reached, then cleans up:
//!
//! - a close right after a switch is copied to the end of every case,
//! - a close that begins every case is hoisted before the switch,
//! - a close that can never fire because an earlier one already did is removed.
//!
//! The loop is capped; a template that keeps changing is a compiler defect.

use crate::error::{CompileError, Result};
use crate::template::pipeline::ir::{self, Case, ElementId, Node, SwitchNode, Template, VoidKind};

pub fn optimize(template: &mut Template, max_passes: usize) -> Result<()> {
    let mut converged = false;
    for pass in 0..max_passes {
        let changed = optimize_list(&mut template.nodes);
        log::trace!("optimizer pass {}: changed={}", pass + 1, changed);
        if !changed {
            converged = true;
            break;
        }
    }
    if !converged {
        return Err(CompileError::InternalInvariant(format!(
            "optimizer did not converge within {} passes",
            max_passes
        )));
    }

    ir::rewrite_lists(&mut template.nodes, &mut |list| {
        remove_unreachable_closes(list, true);
    });
    truncate_void_content(&mut template.nodes);
    ir::rewrite_lists(&mut template.nodes, &mut merge_literal_outputs);
    remove_empty_default_cases(&mut template.nodes);
    Ok(())
}

/// One pass over a list, outer lists before the lists they contain.
fn optimize_list(nodes: &mut Vec<Node>) -> bool {
    let mut changed = remove_unreachable_closes(nodes, false);
    changed |= sink_closes_into_cases(nodes);
    changed |= hoist_leading_closes(nodes);
    for node in nodes.iter_mut() {
        for list in node.child_lists_mut() {
            changed |= optimize_list(list);
        }
    }
    changed
}

fn has_default(switch: &SwitchNode) -> bool {
    switch.cases.iter().any(Case::is_default)
}

/// Whether running `nodes` always closes `id`.
pub fn guarantees_close(nodes: &[Node], id: ElementId) -> bool {
    nodes.iter().any(|node| match node {
        Node::CloseTag(close) => close.id == id,
        Node::Switch(switch) => {
            has_default(switch)
                && switch
                    .cases
                    .iter()
                    .all(|case| guarantees_close(&case.children, id))
        }
        _ => false,
    })
}

/// Ids a node closes on every path through it.
fn closed_by(node: &Node, through_switches: bool) -> Vec<ElementId> {
    match node {
        Node::CloseTag(close) => vec![close.id],
        Node::Switch(_) if through_switches => {
            let mut ids: Vec<ElementId> = Vec::new();
            ir::walk(std::slice::from_ref(node), &mut |child| {
                if let Node::CloseTag(close) = child {
                    if !ids.contains(&close.id) {
                        ids.push(close.id);
                    }
                }
            });
            ids.retain(|id| guarantees_close(std::slice::from_ref(node), *id));
            ids
        }
        _ => Vec::new(),
    }
}

/// Remove closes that follow, as a later sibling or inside one, a node that already closed
/// the same element.
fn remove_unreachable_closes(nodes: &mut Vec<Node>, through_switches: bool) -> bool {
    let mut closed: Vec<ElementId> = Vec::new();
    let mut changed = false;
    let mut index = 0;
    while index < nodes.len() {
        if let Some(close) = nodes[index].as_close_tag() {
            if closed.contains(&close.id) {
                nodes.remove(index);
                changed = true;
                continue;
            }
        } else if !closed.is_empty() {
            changed |= remove_closes_within(&mut nodes[index], &closed);
        }
        for id in closed_by(&nodes[index], through_switches) {
            if !closed.contains(&id) {
                closed.push(id);
            }
        }
        index += 1;
    }
    changed
}

fn remove_closes_within(node: &mut Node, ids: &[ElementId]) -> bool {
    let mut changed = false;
    for list in node.child_lists_mut() {
        let before = list.len();
        list.retain(|child| !child.as_close_tag().is_some_and(|close| ids.contains(&close.id)));
        changed |= list.len() != before;
        for child in list.iter_mut() {
            changed |= remove_closes_within(child, ids);
        }
    }
    changed
}

/// `switch, close` becomes a switch whose every case ends with the close.
fn sink_closes_into_cases(nodes: &mut Vec<Node>) -> bool {
    let mut changed = false;
    let mut index = 0;
    while index + 1 < nodes.len() {
        let id = match (&nodes[index], &nodes[index + 1]) {
            (Node::Switch(switch), Node::CloseTag(close)) if has_default(switch) => close.id,
            _ => {
                index += 1;
                continue;
            }
        };
        if let Node::Switch(switch) = &mut nodes[index] {
            for case in &mut switch.cases {
                let ends_with_close = case
                    .children
                    .last()
                    .is_some_and(|last| last.is_close_tag_for(id));
                if !ends_with_close {
                    case.children.push(Node::close_tag(id));
                }
            }
        }
        nodes.remove(index + 1);
        changed = true;
        index += 1;
    }
    changed
}

/// A close that begins every case moves in front of the switch.
fn hoist_leading_closes(nodes: &mut Vec<Node>) -> bool {
    let mut changed = false;
    let mut index = 0;
    while index < nodes.len() {
        let hoisted = match &mut nodes[index] {
            Node::Switch(switch) if has_default(switch) => leading_close(switch).map(|id| {
                for case in &mut switch.cases {
                    case.children.remove(0);
                }
                id
            }),
            _ => None,
        };
        if let Some(id) = hoisted {
            nodes.insert(index, Node::close_tag(id));
            changed = true;
            index += 1;
        }
        index += 1;
    }
    changed
}

fn leading_close(switch: &SwitchNode) -> Option<ElementId> {
    let id = switch.cases.first()?.children.first()?.as_close_tag()?.id;
    switch
        .cases
        .iter()
        .all(|case| case.children.first().is_some_and(|first| first.is_close_tag_for(id)))
        .then_some(id)
}

/// Void elements have no content: drop whatever follows their close.
fn truncate_void_content(nodes: &mut [Node]) {
    ir::walk_mut(nodes, &mut |node| {
        if let Node::Element(element) = node {
            if element.void == VoidKind::Yes {
                truncate_after_close(&mut element.children, element.id);
            }
        }
    });
}

fn truncate_after_close(nodes: &mut Vec<Node>, id: ElementId) {
    if let Some(position) = nodes
        .iter()
        .position(|node| guarantees_close(std::slice::from_ref(node), id))
    {
        nodes.truncate(position + 1);
    }
    for node in nodes.iter_mut() {
        if let Node::Switch(switch) = node {
            for case in &mut switch.cases {
                truncate_after_close(&mut case.children, id);
            }
        }
    }
}

fn merge_literal_outputs(nodes: &mut Vec<Node>) {
    let mut merged: Vec<Node> = Vec::with_capacity(nodes.len());
    for node in std::mem::take(nodes) {
        if let (Some(Node::Output(previous)), Node::Output(current)) = (merged.last_mut(), &node) {
            if previous.disable_escaping == current.disable_escaping {
                if let (ir::OutputValue::Literal(text), ir::OutputValue::Literal(more)) =
                    (&mut previous.value, &current.value)
                {
                    text.push_str(more);
                    continue;
                }
            }
        }
        merged.push(node);
    }
    *nodes = merged;
}

fn remove_empty_default_cases(nodes: &mut [Node]) {
    ir::walk_mut(nodes, &mut |node| {
        if let Node::Switch(switch) = node {
            switch
                .cases
                .retain(|case| !(case.is_default() && case.children.is_empty()));
        }
    });
}
