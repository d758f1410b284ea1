//! Start Tags Phase
//!
//! An attribute only reaches its element while the start tag is open. For every element
//! this pass drops the attributes that always come after a close of the element and guards
//! the ones that come after a close only on some paths. Attributes outside any element of
//! the template have no start tag to join and are dropped too.
//!
//! A later attribute replaces an earlier one of the same name in place. Where both are
//! unconditional the replacement is made here; elements that may still repeat a name are
//! flagged so the renderer merges them at run time.

use crate::template::pipeline::ir::{self, Case, ElementId, ElementNode, Name, Node, Template};

/// State of an element's start tag at some point of its content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StartTag {
    Open,
    MaybeClosed,
    Closed,
}

pub fn resolve_start_tags(template: &mut Template) {
    drop_orphan_attributes(&mut template.nodes);
    ir::walk_mut(&mut template.nodes, &mut |node| {
        if let Node::Element(element) = node {
            resolve_element(element);
        }
    });
}

fn is_attribute(node: &Node) -> bool {
    matches!(node, Node::Attribute(_) | Node::CopyAttributes(_))
}

fn drop_orphan_attributes(nodes: &mut Vec<Node>) {
    let before = nodes.len();
    nodes.retain(|node| !is_attribute(node));
    if nodes.len() != before {
        log::debug!("dropped {} attribute(s) outside any element", before - nodes.len());
    }
    for node in nodes.iter_mut() {
        if let Node::Switch(switch) = node {
            for case in &mut switch.cases {
                drop_orphan_attributes(&mut case.children);
            }
        }
    }
}

fn resolve_element(element: &mut ElementNode) {
    let mut guarded = false;
    resolve_list(&mut element.children, element.id, StartTag::Open, &mut guarded);
    if guarded {
        record_conditional_closes(&mut element.children, element.id, false);
    }
    merge_unconditional_duplicates(&mut element.children);
    element.merge_attributes = may_repeat_names(&element.children);
}

/// Drop or guard the attributes of `nodes` and return the state after them.
fn resolve_list(
    nodes: &mut Vec<Node>,
    id: ElementId,
    entry: StartTag,
    guarded: &mut bool,
) -> StartTag {
    let mut state = entry;
    let mut kept = Vec::with_capacity(nodes.len());
    for mut node in std::mem::take(nodes) {
        if state == StartTag::Closed && is_attribute(&node) {
            log::debug!("dropped an attribute added after the start tag of element {}", id);
            continue;
        }
        match &mut node {
            Node::Attribute(attribute) => {
                attribute.guarded = state == StartTag::MaybeClosed;
                *guarded |= attribute.guarded;
            }
            Node::CopyAttributes(copy) => {
                copy.guarded = state == StartTag::MaybeClosed;
                *guarded |= copy.guarded;
            }
            Node::CloseTag(close) if close.id == id => state = StartTag::Closed,
            Node::Switch(switch) => {
                let mut outcomes: Vec<StartTag> = switch
                    .cases
                    .iter_mut()
                    .map(|case| resolve_list(&mut case.children, id, state, guarded))
                    .collect();
                if !switch.cases.iter().any(Case::is_default) {
                    outcomes.push(state);
                }
                state = if outcomes.iter().all(|outcome| *outcome == StartTag::Closed) {
                    StartTag::Closed
                } else if outcomes.iter().all(|outcome| *outcome == StartTag::Open) {
                    StartTag::Open
                } else {
                    StartTag::MaybeClosed
                };
            }
            _ => {}
        }
        kept.push(node);
    }
    *nodes = kept;
    state
}

/// Closes of `id` inside switches record that they ran, for the guards to check.
fn record_conditional_closes(nodes: &mut [Node], id: ElementId, in_switch: bool) {
    for node in nodes.iter_mut() {
        match node {
            Node::CloseTag(close) if close.id == id && in_switch => close.set = true,
            Node::Switch(switch) => {
                for case in &mut switch.cases {
                    record_conditional_closes(&mut case.children, id, true);
                }
            }
            _ => {}
        }
    }
}

/// Name an attribute node sets, `None` when it may set any name.
fn attribute_names(node: &Node) -> Option<Vec<&str>> {
    match node {
        Node::Attribute(attribute) => match &attribute.name {
            Name::Static(name) => Some(vec![name.as_str()]),
            Name::Dynamic(_) => None,
        },
        Node::CopyAttributes(copy) => copy
            .names
            .as_ref()
            .map(|names| names.iter().map(String::as_str).collect()),
        _ => Some(Vec::new()),
    }
}

/// Attribute nodes of the start tag, through switches but not into nested elements.
fn start_tag_attributes<'a>(nodes: &'a [Node], found: &mut Vec<&'a Node>) {
    for node in nodes {
        match node {
            Node::Attribute(_) | Node::CopyAttributes(_) => found.push(node),
            Node::Switch(switch) => {
                for case in &switch.cases {
                    start_tag_attributes(&case.children, found);
                }
            }
            _ => {}
        }
    }
}

fn may_set(node: &Node, name: &str) -> bool {
    let mut attributes = Vec::new();
    start_tag_attributes(std::slice::from_ref(node), &mut attributes);
    attributes
        .into_iter()
        .any(|attribute| attribute_names(attribute).map_or(true, |names| names.contains(&name)))
}

fn static_name(node: &Node) -> Option<&str> {
    match node {
        Node::Attribute(attribute) if !attribute.guarded => attribute.name.as_static(),
        _ => None,
    }
}

/// `a="1" ... a="2"` at the top of an element becomes `a="2" ...` when nothing between
/// them may set `a`.
fn merge_unconditional_duplicates(nodes: &mut Vec<Node>) {
    let mut index = 0;
    while index < nodes.len() {
        let Some(name) = static_name(&nodes[index]).map(str::to_string) else {
            index += 1;
            continue;
        };
        let mut earlier = None;
        for position in (0..index).rev() {
            if static_name(&nodes[position]) == Some(name.as_str()) {
                earlier = Some(position);
                break;
            }
            if may_set(&nodes[position], &name) {
                break;
            }
        }
        match earlier {
            Some(position) => {
                let later = nodes.remove(index);
                if let (Node::Attribute(target), Node::Attribute(source)) =
                    (&mut nodes[position], later)
                {
                    target.children = source.children;
                    target.boolean = source.boolean;
                }
            }
            None => index += 1,
        }
    }
}

fn may_repeat_names(nodes: &[Node]) -> bool {
    let mut attributes = Vec::new();
    start_tag_attributes(nodes, &mut attributes);
    let mut seen: Vec<&str> = Vec::new();
    for attribute in &attributes {
        match attribute_names(attribute) {
            None if attributes.len() > 1 => return true,
            None => {}
            Some(names) => {
                for name in names {
                    if seen.contains(&name) {
                        return true;
                    }
                    seen.push(name);
                }
            }
        }
    }
    false
}
