//! Branch Tables Phase
//!
//! Recognizes switches that compare one attribute or parameter against string literals and
//! records, per case, the values that select it. A value claimed by an earlier case is
//! dropped from later ones, so a table lookup picks the same case as evaluating the tests in
//! order. A missing attribute never matches a value and selects the default case.

use crate::expression_parser::ast::{BinaryOp, Expr};
use crate::template::pipeline::ir::{self, BranchKey, Node, SwitchNode, Template};

/// Switches need at least this many non-default cases to become a table
const MIN_TABLE_CASES: usize = 2;

pub fn detect_branch_tables(template: &mut Template) {
    ir::walk_mut(&mut template.nodes, &mut |node| {
        if let Node::Switch(switch) = node {
            match table_for(switch) {
                Some((key, values)) => {
                    switch.branch_key = Some(key);
                    let mut cases_values = values.into_iter();
                    for case in switch.cases.iter_mut().filter(|case| !case.is_default()) {
                        case.values = cases_values.next();
                    }
                }
                None => {
                    switch.branch_key = None;
                    for case in &mut switch.cases {
                        case.values = None;
                    }
                }
            }
        }
    });
}

fn table_for(switch: &SwitchNode) -> Option<(BranchKey, Vec<Vec<String>>)> {
    let tests: Vec<_> = switch
        .cases
        .iter()
        .filter_map(|case| case.test.as_ref())
        .collect();
    if tests.len() < MIN_TABLE_CASES {
        return None;
    }

    let mut key: Option<BranchKey> = None;
    let mut claimed: Vec<String> = Vec::new();
    let mut table = Vec::with_capacity(tests.len());
    for test in tests {
        let expr = test.ast().ok()?;
        let mut values = Vec::new();
        let case_key = collect_values(&expr, &mut values)?;
        match &key {
            Some(existing) if *existing != case_key => return None,
            Some(_) => {}
            None => key = Some(case_key),
        }
        values.sort();
        values.dedup();
        values.retain(|value| !claimed.contains(value));
        claimed.extend(values.iter().cloned());
        table.push(values);
    }
    Some((key?, table))
}

/// Collect the literals of `K = 'v' or K = 'w' ...`, returning `K`.
fn collect_values(expr: &Expr, values: &mut Vec<String>) -> Option<BranchKey> {
    match expr {
        Expr::Binary {
            op: BinaryOp::Or,
            left,
            right,
        } => {
            let left = collect_values(left, values)?;
            let right = collect_values(right, values)?;
            (left == right).then_some(left)
        }
        Expr::Binary {
            op: BinaryOp::Eq,
            left,
            right,
        } => {
            let (key, value) = match (key_of(left), right.as_literal()) {
                (Some(key), Some(value)) => (key, value),
                _ => (key_of(right)?, left.as_literal()?),
            };
            values.push(value.to_string());
            Some(key)
        }
        _ => None,
    }
}

fn key_of(expr: &Expr) -> Option<BranchKey> {
    if let Some(name) = expr.as_attribute_name() {
        return Some(BranchKey::Attribute(name.to_string()));
    }
    expr.as_variable_name()
        .map(|name| BranchKey::Parameter(name.to_string()))
}
