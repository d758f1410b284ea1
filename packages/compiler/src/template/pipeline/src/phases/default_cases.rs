//! Default Cases Phase
//!
//! Gives every switch a default case so that exactly one case always runs.

use crate::template::pipeline::ir::{self, Case, Node, Template};

pub fn add_default_cases(template: &mut Template) {
    ir::walk_mut(&mut template.nodes, &mut |node| {
        if let Node::Switch(switch) = node {
            if !switch.cases.iter().any(Case::is_default) {
                switch.cases.push(Case::default());
            }
        }
    });
}
