//! Control Structures
//!
//! Peephole rewrites over output statements: `else { if }` chains are flattened, branches
//! that do nothing are dropped, `if (c) {} else {x}` is inverted and adjacent raw literals
//! are merged.

use super::output_ast::{Branch, BoolExpr, IfStmt, Statement};

pub fn optimize_statements(statements: Vec<Statement>) -> Vec<Statement> {
    let mut out: Vec<Statement> = Vec::with_capacity(statements.len());
    for statement in statements {
        let Some(statement) = optimize_statement(statement) else {
            continue;
        };
        if let (Some(previous), Some(text)) = (out.last_mut(), statement.as_raw_literal()) {
            if let Statement::Output(previous_output) = previous {
                if let super::output_ast::StringExpr::Literal(previous_text) =
                    &mut previous_output.value
                {
                    if previous_output.escape == super::output_ast::Escape::Raw {
                        previous_text.push_str(text);
                        continue;
                    }
                }
            }
        }
        out.push(statement);
    }
    out
}

fn optimize_statement(statement: Statement) -> Option<Statement> {
    match statement {
        Statement::If(stmt) => optimize_if(stmt),
        Statement::Dispatch(mut stmt) => {
            stmt.branches = stmt.branches.into_iter().map(optimize_statements).collect();
            stmt.default = optimize_statements(stmt.default);
            let empty = stmt.default.is_empty() && stmt.branches.iter().all(Vec::is_empty);
            (!empty).then_some(Statement::Dispatch(stmt))
        }
        Statement::Element(mut stmt) => {
            stmt.body = optimize_statements(stmt.body);
            Some(Statement::Element(stmt))
        }
        Statement::Attribute(mut stmt) => {
            stmt.body = optimize_statements(stmt.body);
            Some(Statement::Attribute(stmt))
        }
        Statement::Output(stmt) if stmt_is_empty_literal(&stmt) => None,
        other => Some(other),
    }
}

fn stmt_is_empty_literal(stmt: &super::output_ast::OutputStmt) -> bool {
    matches!(&stmt.value, super::output_ast::StringExpr::Literal(text) if text.is_empty())
}

fn optimize_if(stmt: IfStmt) -> Option<Statement> {
    let mut branches: Vec<Branch> = Vec::with_capacity(stmt.branches.len());
    for branch in stmt.branches {
        branches.push(Branch {
            condition: branch.condition,
            body: optimize_statements(branch.body),
        });
    }
    let mut otherwise = optimize_statements(stmt.otherwise);

    // else { if ... } is an else-if
    while let [Statement::If(_)] = otherwise.as_slice() {
        let Some(Statement::If(nested)) = otherwise.pop() else {
            break;
        };
        branches.extend(nested.branches);
        otherwise = nested.otherwise;
    }

    // Trailing branches without a body and no else do nothing
    while otherwise.is_empty() && branches.last().is_some_and(|branch| branch.body.is_empty()) {
        branches.pop();
    }
    if branches.is_empty() {
        return match otherwise.len() {
            0 => None,
            _ => Some(Statement::If(IfStmt {
                branches: vec![Branch {
                    condition: BoolExpr::Constant(true),
                    body: otherwise,
                }],
                otherwise: Vec::new(),
            })),
        };
    }

    if branches.len() == 1 && branches[0].body.is_empty() {
        let Some(branch) = branches.pop() else {
            return None;
        };
        return Some(Statement::If(IfStmt {
            branches: vec![Branch {
                condition: BoolExpr::not(branch.condition),
                body: otherwise,
            }],
            otherwise: Vec::new(),
        }));
    }

    Some(Statement::If(IfStmt {
        branches,
        otherwise,
    }))
}
