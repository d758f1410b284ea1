//! IR Nodes
//!
//! The closed set of node kinds a template compiles to. `Switch` owns its cases directly, so
//! "a switch only contains cases" holds by construction.

use serde::{Deserialize, Serialize};

use crate::expression_parser::{parse_expression, Expr, ExprShape, ExpressionError};

use super::handle::ElementId;

/// An XPath expression as written in the template, with its classified shape. The text has
/// been parsed successfully at least once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XPathExpr {
    pub source: String,
    pub shape: ExprShape,
}

impl XPathExpr {
    pub fn parse(source: &str) -> Result<Self, ExpressionError> {
        let expr = parse_expression(source)?;
        Ok(XPathExpr {
            source: source.to_string(),
            shape: ExprShape::of(&expr),
        })
    }

    /// Parse the expression again into its AST.
    pub fn ast(&self) -> Result<Expr, ExpressionError> {
        parse_expression(&self.source)
    }
}

/// A piece of output: literal text or the string value of an expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum OutputValue {
    Literal(String),
    XPath(XPathExpr),
}

impl OutputValue {
    pub fn as_literal(&self) -> Option<&str> {
        match self {
            OutputValue::Literal(text) => Some(text.as_str()),
            OutputValue::XPath(_) => None,
        }
    }
}

/// Element or attribute name, fixed or computed at render time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Name {
    Static(String),
    Dynamic(Vec<OutputValue>),
}

impl Name {
    pub fn as_static(&self) -> Option<&str> {
        match self {
            Name::Static(name) => Some(name.as_str()),
            Name::Dynamic(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VoidKind {
    #[default]
    No,
    Yes,
    /// The name is computed, check at render time
    Maybe,
}

/// Escaping applied to an output node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Escape {
    #[default]
    Text,
    Attribute,
    Raw,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementNode {
    pub id: ElementId,
    pub name: Name,
    #[serde(default)]
    pub void: VoidKind,
    /// Two attributes may share a name. The start tag keeps the last value at the position
    /// of the first.
    #[serde(default)]
    pub merge_attributes: bool,
    pub children: Vec<Node>,
}

impl ElementNode {
    pub fn new(id: ElementId, name: Name, children: Vec<Node>) -> Self {
        ElementNode {
            id,
            name,
            void: VoidKind::No,
            merge_attributes: false,
            children,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeNode {
    pub name: Name,
    /// Minimized to its bare name when serialized
    #[serde(default)]
    pub boolean: bool,
    /// Skipped when the start tag was already closed
    #[serde(default)]
    pub guarded: bool,
    pub children: Vec<Node>,
}

impl AttributeNode {
    pub fn new(name: Name, children: Vec<Node>) -> Self {
        AttributeNode {
            name,
            boolean: false,
            guarded: false,
            children,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputNode {
    pub value: OutputValue,
    #[serde(default)]
    pub escape: Escape,
    #[serde(default)]
    pub disable_escaping: bool,
}

impl OutputNode {
    pub fn literal(text: impl Into<String>) -> Self {
        OutputNode {
            value: OutputValue::Literal(text.into()),
            escape: Escape::Text,
            disable_escaping: false,
        }
    }

    pub fn xpath(expr: XPathExpr) -> Self {
        OutputNode {
            value: OutputValue::XPath(expr),
            escape: Escape::Text,
            disable_escaping: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BranchKey {
    Attribute(String),
    Parameter(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchNode {
    /// Set when the switch is a branch table
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_key: Option<BranchKey>,
    pub cases: Vec<Case>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Case {
    /// `None` for the default case
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<XPathExpr>,
    /// Matching values when the owning switch is a branch table
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,
    pub children: Vec<Node>,
}

impl Case {
    pub fn is_default(&self) -> bool {
        self.test.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseTagNode {
    pub id: ElementId,
    /// Record that the element was closed
    #[serde(default)]
    pub set: bool,
    /// Skip if the element was already closed
    #[serde(default)]
    pub check: bool,
}

impl CloseTagNode {
    pub fn new(id: ElementId) -> Self {
        CloseTagNode {
            id,
            set: false,
            check: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentNode {
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyAttributesNode {
    /// Copied attribute names, `None` for all of them
    pub names: Option<Vec<String>>,
    #[serde(default)]
    pub guarded: bool,
}

impl CopyAttributesNode {
    pub fn new(names: Option<Vec<String>>) -> Self {
        CopyAttributesNode {
            names,
            guarded: false,
        }
    }
}

/// IR node kinds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Node {
    Element(ElementNode),
    Attribute(AttributeNode),
    Output(OutputNode),
    Switch(SwitchNode),
    CloseTag(CloseTagNode),
    ApplyChildren,
    Comment(CommentNode),
    CopyAttributes(CopyAttributesNode),
}

impl Node {
    pub fn close_tag(id: ElementId) -> Node {
        Node::CloseTag(CloseTagNode::new(id))
    }

    pub fn literal(text: impl Into<String>) -> Node {
        Node::Output(OutputNode::literal(text))
    }

    pub fn as_close_tag(&self) -> Option<&CloseTagNode> {
        match self {
            Node::CloseTag(close) => Some(close),
            _ => None,
        }
    }

    pub fn is_close_tag_for(&self, id: ElementId) -> bool {
        self.as_close_tag().is_some_and(|close| close.id == id)
    }

    /// Child lists owned by this node. A switch exposes one list per case.
    pub fn child_lists(&self) -> Vec<&Vec<Node>> {
        match self {
            Node::Element(element) => vec![&element.children],
            Node::Attribute(attribute) => vec![&attribute.children],
            Node::Comment(comment) => vec![&comment.children],
            Node::Switch(switch) => switch.cases.iter().map(|case| &case.children).collect(),
            _ => Vec::new(),
        }
    }

    pub fn child_lists_mut(&mut self) -> Vec<&mut Vec<Node>> {
        match self {
            Node::Element(element) => vec![&mut element.children],
            Node::Attribute(attribute) => vec![&mut attribute.children],
            Node::Comment(comment) => vec![&mut comment.children],
            Node::Switch(switch) => switch
                .cases
                .iter_mut()
                .map(|case| &mut case.children)
                .collect(),
            _ => Vec::new(),
        }
    }
}
