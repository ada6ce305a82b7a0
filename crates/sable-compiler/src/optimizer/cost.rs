//! Cost model used to pick the cheapest snapshot of a function

use sable_core::{NodeId, NodeKind, Operator, SyntaxTree};

/// Cost of evaluating a single operator
pub fn operator_cost(op: Operator) -> usize {
    match op {
        Operator::Add | Operator::Sub => 2,
        Operator::Mul => 10,
        Operator::Div => 70,
        op if op.is_comparison() || op.is_assignment() => 1,
        _ => 0,
    }
}

/// Sum of the operator costs of every node below `root`
pub fn cost(tree: &SyntaxTree, root: NodeId) -> usize {
    tree.descendants(root)
        .into_iter()
        .map(|node| match tree.kind(node) {
            NodeKind::Operator(op) => operator_cost(*op),
            _ => 0,
        })
        .sum()
}
