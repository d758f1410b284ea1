//! Output AST
//!
//! Statements of the imperative renderer. Expressions the compiler recognizes are typed;
//! everything else is kept as an XPath fallback for the general evaluator.

use indexmap::IndexMap;

use crate::expression_parser::{serialize, Expr};
use crate::template::pipeline::ir::ElementId;

/// An expression handed to the general evaluator at render time
#[derive(Debug, Clone, PartialEq)]
pub struct XPathFallback {
    pub source: String,
    pub expr: Expr,
}

impl XPathFallback {
    pub fn new(expr: &Expr) -> Self {
        XPathFallback {
            source: serialize(expr),
            expr: expr.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StringExpr {
    Literal(String),
    /// Attribute value, empty if the attribute is missing
    Attribute(String),
    /// Parameter value, empty if the parameter is not set
    Parameter(String),
    XPath(XPathFallback),
}

/// Side of a string comparison
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Attribute(String),
    Parameter(String),
    Literal(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equals,
    NotEquals,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoolExpr {
    Constant(bool),
    HasAttribute(String),
    /// Parameter is set to a non-empty value
    Parameter(String),
    Not(Box<BoolExpr>),
    And(Box<BoolExpr>, Box<BoolExpr>),
    Or(Box<BoolExpr>, Box<BoolExpr>),
    /// Start tag of the element has not been closed yet
    StartTagOpen(ElementId),
    /// String comparison; false when an attribute operand is missing
    Compare {
        op: CompareOp,
        left: Operand,
        right: Operand,
    },
    XPath(XPathFallback),
}

impl BoolExpr {
    pub fn not(expr: BoolExpr) -> BoolExpr {
        match expr {
            BoolExpr::Not(inner) => *inner,
            BoolExpr::Constant(value) => BoolExpr::Constant(!value),
            other => BoolExpr::Not(Box::new(other)),
        }
    }
}

/// How an output statement escapes its value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escape {
    Text,
    Attribute,
    Raw,
    /// Outside any element of its template: raw when the template was applied inside a
    /// `script` or `style` element, text otherwise
    Inherited,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputStmt {
    pub value: StringExpr,
    pub escape: Escape,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub condition: BoolExpr,
    pub body: Vec<Statement>,
}

/// `if`/`else if`/`else` chain
#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub branches: Vec<Branch>,
    pub otherwise: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchKey {
    Attribute(String),
    Parameter(String),
}

/// Branch table: the key's value selects a branch, a missing attribute selects the default.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchStmt {
    pub key: DispatchKey,
    pub table: IndexMap<String, usize>,
    pub branches: Vec<Vec<Statement>>,
    pub default: Vec<Statement>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseTagStmt {
    pub id: ElementId,
    pub set: bool,
    pub check: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyChildrenStmt {
    /// Escaping of the children's text
    pub escape: Escape,
}

/// Attributes of the current node, buffered with the start tag's other attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyAttributesStmt {
    pub names: Option<Vec<String>>,
}

/// Element whose name is computed at render time
#[derive(Debug, Clone, PartialEq)]
pub struct ElementStmt {
    pub id: ElementId,
    pub name: Vec<StringExpr>,
    pub body: Vec<Statement>,
}

/// Attribute buffered until the start tag is closed. A later attribute of the same name
/// replaces the value and keeps the position.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeStmt {
    pub name: Vec<StringExpr>,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Output(OutputStmt),
    If(IfStmt),
    Dispatch(DispatchStmt),
    CloseTag(CloseTagStmt),
    ApplyChildren(ApplyChildrenStmt),
    CopyAttributes(CopyAttributesStmt),
    Element(ElementStmt),
    Attribute(AttributeStmt),
}

impl Statement {
    /// Markup written as is
    pub fn raw(text: impl Into<String>) -> Statement {
        Statement::Output(OutputStmt {
            value: StringExpr::Literal(text.into()),
            escape: Escape::Raw,
        })
    }

    pub fn as_raw_literal(&self) -> Option<&str> {
        match self {
            Statement::Output(OutputStmt {
                value: StringExpr::Literal(text),
                escape: Escape::Raw,
            }) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn visit_statement<V: StatementVisitor + ?Sized>(&self, visitor: &mut V) -> V::Output {
        match self {
            Statement::Output(s) => visitor.visit_output_stmt(s),
            Statement::If(s) => visitor.visit_if_stmt(s),
            Statement::Dispatch(s) => visitor.visit_dispatch_stmt(s),
            Statement::CloseTag(s) => visitor.visit_close_tag_stmt(s),
            Statement::ApplyChildren(s) => visitor.visit_apply_children_stmt(s),
            Statement::CopyAttributes(s) => visitor.visit_copy_attributes_stmt(s),
            Statement::Element(s) => visitor.visit_element_stmt(s),
            Statement::Attribute(s) => visitor.visit_attribute_stmt(s),
        }
    }

    /// Whether this statement or one nested in it satisfies `predicate`.
    pub fn any(&self, predicate: &dyn Fn(&Statement) -> bool) -> bool {
        if predicate(self) {
            return true;
        }
        let nested: Vec<&Vec<Statement>> = match self {
            Statement::If(s) => s
                .branches
                .iter()
                .map(|branch| &branch.body)
                .chain(std::iter::once(&s.otherwise))
                .collect(),
            Statement::Dispatch(s) => s.branches.iter().chain(std::iter::once(&s.default)).collect(),
            Statement::Element(s) => vec![&s.body],
            Statement::Attribute(s) => vec![&s.body],
            _ => Vec::new(),
        };
        nested
            .into_iter()
            .any(|body| body.iter().any(|stmt| stmt.any(predicate)))
    }
}

pub trait StatementVisitor {
    type Output;

    fn visit_output_stmt(&mut self, stmt: &OutputStmt) -> Self::Output;
    fn visit_if_stmt(&mut self, stmt: &IfStmt) -> Self::Output;
    fn visit_dispatch_stmt(&mut self, stmt: &DispatchStmt) -> Self::Output;
    fn visit_close_tag_stmt(&mut self, stmt: &CloseTagStmt) -> Self::Output;
    fn visit_apply_children_stmt(&mut self, stmt: &ApplyChildrenStmt) -> Self::Output;
    fn visit_copy_attributes_stmt(&mut self, stmt: &CopyAttributesStmt) -> Self::Output;
    fn visit_element_stmt(&mut self, stmt: &ElementStmt) -> Self::Output;
    fn visit_attribute_stmt(&mut self, stmt: &AttributeStmt) -> Self::Output;
}

/// Tag dispatch table of a compiled ruleset. Tags whose bodies are identical share one body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub tags: IndexMap<String, usize>,
    pub bodies: Vec<Vec<Statement>>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_template(&mut self, tag: impl Into<String>, body: Vec<Statement>) {
        let index = match self.bodies.iter().position(|existing| *existing == body) {
            Some(index) => index,
            None => {
                self.bodies.push(body);
                self.bodies.len() - 1
            }
        };
        self.tags.insert(tag.into(), index);
    }

    pub fn body(&self, tag: &str) -> Option<&[Statement]> {
        self.tags
            .get(tag)
            .and_then(|index| self.bodies.get(*index))
            .map(Vec::as_slice)
    }

    /// Tag names sharing each body, in body order.
    pub fn tags_by_body(&self) -> Vec<Vec<&str>> {
        let mut groups: Vec<Vec<&str>> = vec![Vec::new(); self.bodies.len()];
        for (tag, index) in &self.tags {
            if let Some(group) = groups.get_mut(*index) {
                group.push(tag.as_str());
            }
        }
        groups
    }
}
