//! Reference discovery and mutually exclusive branch detection

use sable_core::{Function, NodeId, NodeKind, Operator, SyntaxTree, VariableId};
use std::collections::HashMap;

/// Read and write occurrences of one variable
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceDescriptor {
    pub reads: Vec<NodeId>,
    pub writes: Vec<NodeId>,
}

/// Collect the occurrences of a variable under `subtree`.
///
/// Every occurrence starts as a read. Assignment destinations and increment
/// operands are writes; of those only increment operands stay reads as well,
/// since the old value is still consumed.
pub fn reference_descriptor(
    tree: &SyntaxTree,
    subtree: NodeId,
    variable: VariableId,
) -> ReferenceDescriptor {
    let mut reads = tree.find_all(subtree, |kind| kind.variable() == Some(variable));
    let writes: Vec<NodeId> = reads
        .iter()
        .copied()
        .filter(|&node| tree.is_write_target(node))
        .collect();

    reads.retain(|&node| !writes.contains(&node) || is_step_operand(tree, node));

    ReferenceDescriptor { reads, writes }
}

/// Refresh usage lists and return a descriptor for every local and parameter
pub fn descriptors(function: &mut Function) -> HashMap<VariableId, ReferenceDescriptor> {
    function.rebuild_usages();

    function
        .predictable_variables()
        .into_iter()
        .map(|id| {
            let variable = function.variable(id);
            let descriptor = ReferenceDescriptor {
                reads: variable.reads.clone(),
                writes: variable.writes.clone(),
            };
            (id, descriptor)
        })
        .collect()
}

fn is_step_operand(tree: &SyntaxTree, node: NodeId) -> bool {
    tree.parent(node)
        .map(|parent| tree.kind(parent).is_increment_or_decrement())
        .unwrap_or(false)
}

/// Branches that can never execute together with `node`: for every enclosing
/// if, else-if or else, the other branches of its chain. Loops add nothing.
pub fn blacklist(tree: &SyntaxTree, node: NodeId) -> Vec<NodeId> {
    let mut blacklist = Vec::new();

    for branch in tree.ancestors(node) {
        if tree.kind(branch).is_branch() {
            blacklist.extend(
                tree.branches(branch)
                    .into_iter()
                    .filter(|&other| other != branch),
            );
        }
    }

    blacklist
}

/// Returns true if the node lies in a blacklisted branch outside its
/// condition. The condition of an earlier branch is evaluated on the way to
/// every later one.
pub fn is_blacklisted(tree: &SyntaxTree, node: NodeId, blacklist: &[NodeId]) -> bool {
    blacklist.iter().any(|&branch| {
        let in_condition = tree
            .condition_block(branch)
            .map(|condition| tree.is_under(node, condition))
            .unwrap_or(false);

        tree.is_under(node, branch) && !in_condition
    })
}

/// Nearest construct whose body may be skipped or whose start begins a new
/// execution path: the function, a branch, or a loop that can terminate
pub fn enclosing_scope(tree: &SyntaxTree, node: NodeId) -> Option<NodeId> {
    tree.ancestors(node).find(|&parent| match tree.kind(parent) {
        NodeKind::Function | NodeKind::If | NodeKind::ElseIf | NodeKind::Else => true,
        NodeKind::Loop => !tree.is_forever_loop(parent),
        _ => false,
    })
}

/// Returns true if the edit sits on a path that may be skipped before the read
pub fn is_branched(tree: &SyntaxTree, read: NodeId, edit: NodeId) -> bool {
    match (enclosing_scope(tree, read), enclosing_scope(tree, edit)) {
        (Some(x), Some(y)) => x != y && !tree.is_under(x, y),
        _ => true,
    }
}

/// Literals, operators and reads of predictable variables only
pub fn is_primitive(function: &Function, node: NodeId) -> bool {
    let tree = &function.tree;
    let is_plain = |id: NodeId| match tree.kind(id) {
        NodeKind::Number(_)
        | NodeKind::Bool(_)
        | NodeKind::Operator(_)
        | NodeKind::Negate
        | NodeKind::Parenthesis => true,
        NodeKind::Variable(variable) => function.is_predictable(*variable),
        _ => false,
    };

    is_plain(node) && tree.descendants(node).into_iter().all(is_plain)
}

/// Returns true if evaluating the subtree may do more than produce a value
pub fn has_side_effects(tree: &SyntaxTree, node: NodeId) -> bool {
    tree.find(node, |kind| match kind {
        NodeKind::Call { .. } | NodeKind::Increment { .. } | NodeKind::Decrement { .. } => true,
        NodeKind::Operator(op) => op.is_assignment(),
        _ => false,
    })
    .is_some()
}

/// Returns true if the value of the node is consumed by its parent
pub fn is_value_used(tree: &SyntaxTree, node: NodeId) -> bool {
    tree.parent(node).is_some() && !tree.is_statement(node)
}

/// Returns true if the node is the direct destination of `=`
pub fn is_assignment_destination(tree: &SyntaxTree, node: NodeId) -> bool {
    tree.parent(node)
        .map(|parent| {
            tree.kind(parent).is_operator(Operator::Assign) && tree.first(parent) == Some(node)
        })
        .unwrap_or(false)
}
