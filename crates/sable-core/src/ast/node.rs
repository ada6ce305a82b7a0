//! Syntax tree nodes

use crate::ast::Operator;
use crate::define_entity;
use crate::scope::VariableId;
use crate::types::{Number, Type};
use serde::{Deserialize, Serialize};

define_entity!(
    /// Index of a node inside a [`SyntaxTree`](crate::ast::SyntaxTree)
    NodeId
);

/// Node kind
///
/// Child layouts of the control constructs:
/// - `If` / `ElseIf`: `[condition block, body block]`, the condition being the
///   last statement of the condition block
/// - `Else`: `[body block]`
/// - `Loop`: `[initialization block, condition block, action block, body block]`;
///   an empty condition block makes the loop run forever
/// - `Inline`: statements followed by the value of the whole sequence
/// - `Link`: `[object, member variable]`
/// - `Cast`, `TypeTest`, `TypeTagOf`, `Negate`, `Not`, `Increment`, `Decrement`: one operand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    Function,
    Block,
    Number(Number),
    Bool(bool),
    Variable(VariableId),
    Operator(Operator),
    Negate,
    Not,
    Parenthesis,
    Increment { post: bool },
    Decrement { post: bool },
    If,
    ElseIf,
    Else,
    Loop,
    Return,
    Call { name: String, returns: Type },
    Link,
    Cast(Type),
    TypeTest { expected: Type, result: Option<VariableId> },
    TypeTagOf,
    TypeDescriptor(Type),
    Inline,
}

impl NodeKind {
    pub fn is_operator(&self, op: Operator) -> bool {
        matches!(self, NodeKind::Operator(o) if *o == op)
    }

    pub fn operator(&self) -> Option<Operator> {
        match self {
            NodeKind::Operator(op) => Some(*op),
            _ => None,
        }
    }

    pub fn variable(&self) -> Option<VariableId> {
        match self {
            NodeKind::Variable(variable) => Some(*variable),
            _ => None,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, NodeKind::Number(_) | NodeKind::Bool(_))
    }

    /// Nodes whose children are a plain statement list
    pub fn is_statement_list(&self) -> bool {
        matches!(self, NodeKind::Function | NodeKind::Block)
    }

    pub fn is_branch(&self) -> bool {
        matches!(self, NodeKind::If | NodeKind::ElseIf | NodeKind::Else)
    }

    pub fn is_increment_or_decrement(&self) -> bool {
        matches!(self, NodeKind::Increment { .. } | NodeKind::Decrement { .. })
    }

    /// Literal truth value, numbers being true when non-zero
    pub fn truth(&self) -> Option<bool> {
        match self {
            NodeKind::Bool(value) => Some(*value),
            NodeKind::Number(value) => Some(!value.is_zero()),
            _ => None,
        }
    }
}

/// Arena node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl Node {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}
