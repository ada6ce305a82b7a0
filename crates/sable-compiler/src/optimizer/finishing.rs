//! Finishing pass
//!
//! Runs once the driver has settled and turns the expanded forms the other
//! passes produce back into their compact equivalents.

use crate::error::Result;
use sable_core::{NodeId, NodeKind, Operator, SyntaxTree};

/// Finishing pass
pub struct FinishingPass;

impl FinishingPass {
    /// Create a new finishing pass
    pub fn new() -> Self {
        Self
    }

    /// Apply every finishing rewrite, returning the number of changed nodes
    pub fn finish(&self, tree: &mut SyntaxTree) -> Result<usize> {
        let actions = self.construct_actions(tree)?;
        let inlines = self.remove_single_inlines(tree)?;
        Ok(actions + inlines)
    }

    /// Turn `x = x op v` (and `x = v op x` for commutative `op`) into `x op= v`
    pub fn construct_actions(&self, tree: &mut SyntaxTree) -> Result<usize> {
        let root = tree.root();
        let assignments = tree.find_all(root, |kind| kind.is_operator(Operator::Assign));
        let mut constructed = 0;

        for assignment in assignments {
            let (action, operand) = match action_shape(tree, assignment) {
                Some(shape) => shape,
                None => continue,
            };

            // Keep the destination, drop the duplicate read and reuse the operand
            let value = match tree.last(assignment) {
                Some(value) => value,
                None => continue,
            };

            tree.replace(value, operand)?;
            tree.set_kind(assignment, NodeKind::Operator(action));
            constructed += 1;
        }

        Ok(constructed)
    }

    /// Replace every inline sequence holding only its value by that value
    pub fn remove_single_inlines(&self, tree: &mut SyntaxTree) -> Result<usize> {
        let root = tree.root();
        let inlines = tree.find_all(root, |kind| matches!(kind, NodeKind::Inline));
        let mut removed = 0;

        for inline in inlines.into_iter().rev() {
            if !tree.is_attached(inline) {
                continue;
            }

            if let [value] = tree.children(inline) {
                let value = *value;
                tree.replace(inline, value)?;
                removed += 1;
            }
        }

        Ok(removed)
    }
}

impl Default for FinishingPass {
    fn default() -> Self {
        Self::new()
    }
}

/// Compound operator and remaining operand of an assignment `x = x op v`
fn action_shape(tree: &SyntaxTree, assignment: NodeId) -> Option<(Operator, NodeId)> {
    let destination = tree.first(assignment)?;
    let value = tree.last(assignment)?;
    let variable = tree.kind(destination).variable()?;
    let op = tree.kind(value).operator()?;
    let action = op.to_action()?;

    let (left, right) = match tree.children(value) {
        [left, right] => (*left, *right),
        _ => return None,
    };

    if tree.kind(left).variable() == Some(variable) {
        Some((action, right))
    } else if op.is_commutative() && tree.kind(right).variable() == Some(variable) {
        Some((action, left))
    } else {
        None
    }
}
