//! Parent-linked syntax tree stored in an arena
//!
//! Nodes are never freed: removing a node only detaches it, so a `NodeId`
//! stays valid for the lifetime of the tree even after the node has been
//! replaced. Detached nodes are unreachable from the root.

use crate::ast::node::{Node, NodeId, NodeKind};
use crate::ast::Operator;
use crate::entity::PrimaryMap;
use crate::error::{CoreError, Result};
use crate::scope::VariableId;
use crate::types::{Number, Type};
use serde::{Deserialize, Serialize};

/// Syntax tree of one function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntaxTree {
    nodes: PrimaryMap<NodeId, Node>,
    root: NodeId,
}

impl SyntaxTree {
    /// Create a tree holding only an empty function root
    pub fn new() -> Self {
        let mut nodes = PrimaryMap::new();
        let root = nodes.push(Node::new(NodeKind::Function));
        Self { nodes, root }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id].kind
    }

    pub fn set_kind(&mut self, id: NodeId, kind: NodeKind) {
        self.nodes[id].kind = kind;
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    pub fn child(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.nodes[id].children.get(index).copied()
    }

    pub fn first(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].children.first().copied()
    }

    pub fn last(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].children.last().copied()
    }

    /// Index of the node among its siblings
    pub fn position(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.nodes[parent].children.iter().position(|&child| child == id)
    }

    pub fn previous(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.position(id)?;
        index
            .checked_sub(1)
            .and_then(|previous| self.child(parent, previous))
    }

    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.position(id)?;
        self.child(parent, index + 1)
    }

    /// Strict ancestors, nearest first
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&parent| self.parent(parent))
    }

    /// Nearest strict ancestor whose kind matches
    pub fn find_parent(&self, id: NodeId, predicate: impl Fn(&NodeKind) -> bool) -> Option<NodeId> {
        self.ancestors(id).find(|&parent| predicate(self.kind(parent)))
    }

    /// All strict descendants in pre-order
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();

        while let Some(next) = stack.pop() {
            result.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }

        result
    }

    /// All strict descendants whose kind matches, in pre-order
    pub fn find_all(&self, id: NodeId, predicate: impl Fn(&NodeKind) -> bool) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|&node| predicate(self.kind(node)))
            .collect()
    }

    /// The node itself or its first descendant whose kind matches
    pub fn find(&self, id: NodeId, predicate: impl Fn(&NodeKind) -> bool) -> Option<NodeId> {
        if predicate(self.kind(id)) {
            return Some(id);
        }
        self.descendants(id)
            .into_iter()
            .find(|&node| predicate(self.kind(node)))
    }

    /// Returns true if `ancestor` is a strict ancestor of `id`
    pub fn is_under(&self, id: NodeId, ancestor: NodeId) -> bool {
        self.ancestors(id).any(|parent| parent == ancestor)
    }

    /// Returns true if `id` is `ancestor` or lies below it
    pub fn contains(&self, ancestor: NodeId, id: NodeId) -> bool {
        id == ancestor || self.is_under(id, ancestor)
    }

    /// Returns true if the node is reachable from the root
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.contains(self.root, id)
    }

    fn top(&self, id: NodeId) -> NodeId {
        self.ancestors(id).last().unwrap_or(id)
    }

    /// Child indices leading from the topmost ancestor down to the node
    fn path(&self, id: NodeId) -> Vec<usize> {
        let mut path = Vec::new();
        let mut iterator = id;

        while let Some(index) = self.position(iterator) {
            path.push(index);
            iterator = match self.parent(iterator) {
                Some(parent) => parent,
                None => break,
            };
        }

        path.reverse();
        path
    }

    /// Returns true if `a` appears textually before `b`.
    ///
    /// A node is neither before nor after its own ancestors and descendants.
    pub fn is_before(&self, a: NodeId, b: NodeId) -> bool {
        if a == b || self.top(a) != self.top(b) {
            return false;
        }

        let left = self.path(a);
        let right = self.path(b);

        left.iter()
            .zip(right.iter())
            .find(|(l, r)| l != r)
            .map(|(l, r)| l < r)
            .unwrap_or(false)
    }

    pub fn is_after(&self, a: NodeId, b: NodeId) -> bool {
        self.is_before(b, a)
    }

    /// Returns true if `node` lies textually after `start` and before `end`
    pub fn is_between(&self, node: NodeId, start: NodeId, end: NodeId) -> bool {
        self.is_after(node, start) && self.is_before(node, end)
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Add a detached node
    pub fn add(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(Node::new(kind))
    }

    /// Add a detached node owning the given children
    pub fn add_with_children(
        &mut self,
        kind: NodeKind,
        children: impl IntoIterator<Item = NodeId>,
    ) -> NodeId {
        let node = self.add(kind);
        for child in children {
            self.append(node, child);
        }
        node
    }

    /// Move `child` to the end of `parent`'s children
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        self.remove(child);
        self.nodes[parent].children.push(child);
        self.nodes[child].parent = Some(parent);
    }

    /// Detach the node from its parent; detached nodes are left untouched
    pub fn remove(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id].parent.take() {
            self.nodes[parent].children.retain(|&child| child != id);
        }
    }

    /// Detach and return every child of the node
    pub fn take_children(&mut self, id: NodeId) -> Vec<NodeId> {
        let children = std::mem::take(&mut self.nodes[id].children);
        for &child in &children {
            self.nodes[child].parent = None;
        }
        children
    }

    fn slot(&self, id: NodeId) -> Result<(NodeId, usize)> {
        let parent = self.parent(id).ok_or(CoreError::Detached(id))?;
        let index = self
            .position(id)
            .ok_or(CoreError::NotAChild(id, parent))?;
        Ok((parent, index))
    }

    fn insert_at(&mut self, parent: NodeId, index: usize, nodes: Vec<NodeId>) {
        for (offset, node) in nodes.into_iter().enumerate() {
            self.nodes[parent].children.insert(index + offset, node);
            self.nodes[node].parent = Some(parent);
        }
    }

    pub fn insert_before(&mut self, anchor: NodeId, node: NodeId) -> Result<()> {
        self.insert_all_before(anchor, vec![node])
    }

    pub fn insert_after(&mut self, anchor: NodeId, node: NodeId) -> Result<()> {
        self.remove(node);
        let (parent, index) = self.slot(anchor)?;
        self.insert_at(parent, index + 1, vec![node]);
        Ok(())
    }

    /// Insert the nodes, in order, before `anchor`
    pub fn insert_all_before(&mut self, anchor: NodeId, nodes: Vec<NodeId>) -> Result<()> {
        for &node in &nodes {
            self.remove(node);
        }
        let (parent, index) = self.slot(anchor)?;
        self.insert_at(parent, index, nodes);
        Ok(())
    }

    /// Put `new` in place of `old`, detaching `old`.
    ///
    /// `new` may currently be a descendant of `old`.
    pub fn replace(&mut self, old: NodeId, new: NodeId) -> Result<()> {
        if old == new {
            return Ok(());
        }

        self.remove(new);
        let (parent, index) = self.slot(old)?;
        self.nodes[parent].children[index] = new;
        self.nodes[new].parent = Some(parent);
        self.nodes[old].parent = None;
        Ok(())
    }

    /// Splice the children of `source` into the position of `old`, detaching `old`
    pub fn replace_with_children(&mut self, old: NodeId, source: NodeId) -> Result<()> {
        let children = self.take_children(source);
        let (parent, index) = self.slot(old)?;
        self.remove(old);
        self.insert_at(parent, index, children);
        Ok(())
    }

    /// Deep copy of the subtree, returned detached
    pub fn clone_subtree(&mut self, id: NodeId) -> NodeId {
        let kind = self.kind(id).clone();
        let children = self.children(id).to_vec();
        let copy = self.add(kind);

        for child in children {
            let child_copy = self.clone_subtree(child);
            self.nodes[copy].children.push(child_copy);
            self.nodes[child_copy].parent = Some(copy);
        }

        copy
    }

    // ------------------------------------------------------------------
    // Control constructs
    // ------------------------------------------------------------------

    /// Next branch of an if-chain
    pub fn successor(&self, branch: NodeId) -> Option<NodeId> {
        if !matches!(self.kind(branch), NodeKind::If | NodeKind::ElseIf) {
            return None;
        }

        self.next(branch)
            .filter(|&next| matches!(self.kind(next), NodeKind::ElseIf | NodeKind::Else))
    }

    /// Every branch following the given one in its chain
    pub fn successors(&self, branch: NodeId) -> Vec<NodeId> {
        std::iter::successors(self.successor(branch), |&next| self.successor(next)).collect()
    }

    /// The `If` that starts the chain containing the branch
    pub fn chain_root(&self, branch: NodeId) -> NodeId {
        let mut iterator = branch;

        while matches!(self.kind(iterator), NodeKind::ElseIf | NodeKind::Else) {
            match self.previous(iterator) {
                Some(previous) => iterator = previous,
                None => break,
            }
        }

        iterator
    }

    /// Every branch of the chain containing the branch, starting with its `If`
    pub fn branches(&self, branch: NodeId) -> Vec<NodeId> {
        let root = self.chain_root(branch);
        let mut branches = vec![root];
        branches.extend(self.successors(root));
        branches
    }

    pub fn condition_block(&self, node: NodeId) -> Option<NodeId> {
        match self.kind(node) {
            NodeKind::If | NodeKind::ElseIf => self.child(node, 0),
            NodeKind::Loop => self.child(node, 1),
            _ => None,
        }
    }

    /// Condition expression of a branch or loop
    pub fn condition(&self, node: NodeId) -> Option<NodeId> {
        self.condition_block(node).and_then(|block| self.last(block))
    }

    pub fn body(&self, node: NodeId) -> Option<NodeId> {
        match self.kind(node) {
            NodeKind::If | NodeKind::ElseIf => self.child(node, 1),
            NodeKind::Else => self.child(node, 0),
            NodeKind::Loop => self.child(node, 3),
            _ => None,
        }
    }

    pub fn loop_initialization(&self, node: NodeId) -> Option<NodeId> {
        match self.kind(node) {
            NodeKind::Loop => self.child(node, 0),
            _ => None,
        }
    }

    pub fn loop_action(&self, node: NodeId) -> Option<NodeId> {
        match self.kind(node) {
            NodeKind::Loop => self.child(node, 2),
            _ => None,
        }
    }

    pub fn is_forever_loop(&self, node: NodeId) -> bool {
        matches!(self.kind(node), NodeKind::Loop)
            && self
                .condition_block(node)
                .map(|block| self.children(block).is_empty())
                .unwrap_or(true)
    }

    /// Returns true if the block holds the condition of a branch or loop
    pub fn is_condition_block(&self, block: NodeId) -> bool {
        match self.parent(block) {
            Some(parent) => self.condition_block(parent) == Some(block),
            None => false,
        }
    }

    /// Returns true if the node is a variable occurrence that gets assigned:
    /// the operand of an increment or decrement, or the destination of an
    /// assignment-family operator
    pub fn is_write_target(&self, id: NodeId) -> bool {
        if !matches!(self.kind(id), NodeKind::Variable(_)) {
            return false;
        }

        let parent = match self.parent(id) {
            Some(parent) => parent,
            None => return false,
        };

        match self.kind(parent) {
            NodeKind::Increment { .. } | NodeKind::Decrement { .. } => true,
            NodeKind::Operator(op) => op.is_assignment() && self.first(parent) == Some(id),
            _ => false,
        }
    }

    /// Returns true if the node sits directly in a statement list, its value
    /// being discarded.
    ///
    /// The last child of an inline node or of a condition block is a value.
    pub fn is_statement(&self, id: NodeId) -> bool {
        let parent = match self.parent(id) {
            Some(parent) => parent,
            None => return false,
        };

        let is_value = self.last(parent) == Some(id);

        match self.kind(parent) {
            NodeKind::Inline => !is_value,
            NodeKind::Block if is_value && self.is_condition_block(parent) => false,
            kind => kind.is_statement_list(),
        }
    }

    // ------------------------------------------------------------------
    // Builders
    // ------------------------------------------------------------------

    /// Append a statement to the function body
    pub fn push(&mut self, statement: NodeId) -> NodeId {
        self.append(self.root, statement);
        statement
    }

    pub fn number(&mut self, value: i64) -> NodeId {
        self.add(NodeKind::Number(Number::Integer(value)))
    }

    pub fn decimal(&mut self, value: f64) -> NodeId {
        self.add(NodeKind::Number(Number::Decimal(value)))
    }

    pub fn literal(&mut self, value: Number) -> NodeId {
        self.add(NodeKind::Number(value))
    }

    pub fn boolean(&mut self, value: bool) -> NodeId {
        self.add(NodeKind::Bool(value))
    }

    pub fn variable(&mut self, variable: VariableId) -> NodeId {
        self.add(NodeKind::Variable(variable))
    }

    pub fn binary(&mut self, op: Operator, left: NodeId, right: NodeId) -> NodeId {
        self.add_with_children(NodeKind::Operator(op), [left, right])
    }

    /// `variable = value`
    pub fn assign(&mut self, variable: VariableId, value: NodeId) -> NodeId {
        self.action(Operator::Assign, variable, value)
    }

    /// `variable op value` for any assignment-family operator
    pub fn action(&mut self, op: Operator, variable: VariableId, value: NodeId) -> NodeId {
        let destination = self.variable(variable);
        self.binary(op, destination, value)
    }

    pub fn negate(&mut self, operand: NodeId) -> NodeId {
        self.add_with_children(NodeKind::Negate, [operand])
    }

    pub fn not(&mut self, operand: NodeId) -> NodeId {
        self.add_with_children(NodeKind::Not, [operand])
    }

    pub fn parenthesis(&mut self, operand: NodeId) -> NodeId {
        self.add_with_children(NodeKind::Parenthesis, [operand])
    }

    pub fn increment(&mut self, variable: VariableId, post: bool) -> NodeId {
        let operand = self.variable(variable);
        self.add_with_children(NodeKind::Increment { post }, [operand])
    }

    pub fn decrement(&mut self, variable: VariableId, post: bool) -> NodeId {
        let operand = self.variable(variable);
        self.add_with_children(NodeKind::Decrement { post }, [operand])
    }

    pub fn call(&mut self, name: &str, returns: Type, arguments: Vec<NodeId>) -> NodeId {
        self.add_with_children(
            NodeKind::Call {
                name: name.to_string(),
                returns,
            },
            arguments,
        )
    }

    pub fn link(&mut self, object: NodeId, member: VariableId) -> NodeId {
        let member = self.variable(member);
        self.add_with_children(NodeKind::Link, [object, member])
    }

    pub fn cast(&mut self, operand: NodeId, ty: Type) -> NodeId {
        self.add_with_children(NodeKind::Cast(ty), [operand])
    }

    pub fn type_test(
        &mut self,
        object: NodeId,
        expected: Type,
        result: Option<VariableId>,
    ) -> NodeId {
        self.add_with_children(NodeKind::TypeTest { expected, result }, [object])
    }

    pub fn ret(&mut self, value: Option<NodeId>) -> NodeId {
        self.add_with_children(NodeKind::Return, value)
    }

    pub fn block(&mut self, statements: Vec<NodeId>) -> NodeId {
        self.add_with_children(NodeKind::Block, statements)
    }

    pub fn inline(&mut self, children: Vec<NodeId>) -> NodeId {
        self.add_with_children(NodeKind::Inline, children)
    }

    pub fn if_statement(&mut self, condition: NodeId, body: Vec<NodeId>) -> NodeId {
        self.branch(NodeKind::If, condition, body)
    }

    pub fn else_if(&mut self, condition: NodeId, body: Vec<NodeId>) -> NodeId {
        self.branch(NodeKind::ElseIf, condition, body)
    }

    fn branch(&mut self, kind: NodeKind, condition: NodeId, body: Vec<NodeId>) -> NodeId {
        let condition = self.block(vec![condition]);
        let body = self.block(body);
        self.add_with_children(kind, [condition, body])
    }

    pub fn else_branch(&mut self, body: Vec<NodeId>) -> NodeId {
        let body = self.block(body);
        self.add_with_children(NodeKind::Else, [body])
    }

    /// `loop (initialization; condition; action) { body }`, running forever without a condition
    pub fn loop_statement(
        &mut self,
        initialization: Vec<NodeId>,
        condition: Option<NodeId>,
        action: Vec<NodeId>,
        body: Vec<NodeId>,
    ) -> NodeId {
        let initialization = self.block(initialization);
        let condition = self.block(condition.into_iter().collect());
        let action = self.block(action);
        let body = self.block(body);
        self.add_with_children(NodeKind::Loop, [initialization, condition, action, body])
    }

    /// Serialize the tree for debugging dumps
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Default for SyntaxTree {
    fn default() -> Self {
        Self::new()
    }
}
