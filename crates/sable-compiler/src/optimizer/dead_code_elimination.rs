//! Dead code elimination optimizer
//!
//! Removes statements that can never execute.

use sable_core::{NodeKind, SyntaxTree};

/// Dead code eliminator
pub struct DeadCodeEliminator;

impl DeadCodeEliminator {
    /// Create a new dead code eliminator
    pub fn new() -> Self {
        Self
    }

    /// Delete every statement following a return in the same statement list.
    ///
    /// Returns the number of removed statements; the returns themselves stay.
    pub fn remove_unreachable_statements(&self, tree: &mut SyntaxTree) -> usize {
        let root = tree.root();
        let returns = tree.find_all(root, |kind| matches!(kind, NodeKind::Return));
        let mut removed = 0;

        for statement in returns {
            if !tree.is_attached(statement) || !tree.is_statement(statement) {
                continue;
            }

            // Everything after return is unreachable
            while let Some(next) = tree.next(statement) {
                tree.remove(next);
                removed += 1;
            }
        }

        if removed > 0 {
            tracing::debug!("Removed {} unreachable statement(s)", removed);
        }

        removed
    }
}

impl Default for DeadCodeEliminator {
    fn default() -> Self {
        Self::new()
    }
}
