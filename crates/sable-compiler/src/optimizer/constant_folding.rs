//! Constant folding optimizer
//!
//! Cancels matching terms across comparisons and evaluates comparisons and
//! logical operators whose outcome is known at compile time.

use crate::error::Result;
use crate::optimizer::collector;
use crate::optimizer::references;
use crate::optimizer::term::Term;
use sable_core::{NodeId, NodeKind, Number, Operator, SyntaxTree};
use std::cmp::Ordering;

/// Constant folder
pub struct ConstantFolder {
    /// Rebuild comparison operands through the term algebra
    algebra: bool,
}

impl ConstantFolder {
    /// Create a new constant folder
    pub fn new() -> Self {
        Self { algebra: true }
    }

    /// Enable or disable term cancellation inside comparisons
    pub fn with_algebra(mut self, enabled: bool) -> Self {
        self.algebra = enabled;
        self
    }

    /// Simplify every comparison and fold the decidable ones.
    ///
    /// Returns the number of comparisons, logical operators and negations
    /// replaced by a literal or by one of their operands.
    pub fn optimize_comparisons(&self, tree: &mut SyntaxTree) -> Result<usize> {
        let root = tree.root();
        let mut candidates = tree.find_all(root, |kind| match kind {
            NodeKind::Operator(op) => op.is_comparison() || op.is_logical(),
            NodeKind::Not => true,
            _ => false,
        });

        // Innermost first, so folded operands are visible to their parents
        candidates.reverse();

        let mut folded = 0;

        for node in candidates {
            if !tree.is_attached(node) {
                continue;
            }

            let changed = match tree.kind(node).clone() {
                NodeKind::Operator(op) if op.is_comparison() => self.fold_comparison(tree, node, op)?,
                NodeKind::Operator(op) => self.fold_logical(tree, node, op)?,
                _ => self.fold_not(tree, node)?,
            };

            if changed {
                folded += 1;
            }
        }

        if folded > 0 {
            tracing::debug!("Folded {} condition(s)", folded);
        }

        Ok(folded)
    }

    fn fold_comparison(&self, tree: &mut SyntaxTree, comparison: NodeId, op: Operator) -> Result<bool> {
        let (left, right) = match (tree.first(comparison), tree.last(comparison)) {
            (Some(left), Some(right)) if left != right => (left, right),
            _ => return Ok(false),
        };

        let (left, right) = if self.algebra {
            self.cancel(tree, left, right)?
        } else {
            (left, right)
        };

        match self.fold_binary_op(tree.kind(left), op, tree.kind(right)) {
            Some(value) => {
                let literal = tree.boolean(value);
                tree.replace(comparison, literal)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Move every pair of matching terms out of both sides and rebuild them
    fn cancel(&self, tree: &mut SyntaxTree, left: NodeId, right: NodeId) -> Result<(NodeId, NodeId)> {
        let mut left_terms = collector::decompose(tree, left);
        let mut right_terms = collector::decompose(tree, right);

        let mut i = 0;
        let mut j = 0;

        while !left_terms.is_empty() && !right_terms.is_empty() && i < left_terms.len() {
            if j >= right_terms.len() || left_terms[i].is_opaque() {
                i += 1;
                j = 0;
                continue;
            }

            if right_terms[j].is_opaque() {
                j += 1;
                continue;
            }

            match left_terms[i].subtract(&right_terms[j]) {
                Some(difference) => {
                    left_terms[i] = difference;
                    right_terms.remove(j);
                    j = 0;
                }
                None => j += 1,
            }
        }

        let left_terms = collector::simplify(non_empty(left_terms));
        let right_terms = collector::simplify(non_empty(right_terms));

        let new_left = collector::reconstruct(tree, &left_terms);
        let new_right = collector::reconstruct(tree, &right_terms);
        tree.replace(left, new_left)?;
        tree.replace(right, new_right)?;

        Ok((new_left, new_right))
    }

    fn fold_logical(&self, tree: &mut SyntaxTree, node: NodeId, op: Operator) -> Result<bool> {
        let (left, right) = match (tree.first(node), tree.last(node)) {
            (Some(left), Some(right)) if left != right => (left, right),
            _ => return Ok(false),
        };

        if let Some(value) = self.fold_binary_op(tree.kind(left), op, tree.kind(right)) {
            let literal = tree.boolean(value);
            tree.replace(node, literal)?;
            return Ok(true);
        }

        // The operator absorbs into this value on a matching literal
        let absorbing = op == Operator::Or;

        let replacement = match (tree.kind(left).truth(), tree.kind(right).truth()) {
            (Some(value), _) if value == absorbing => tree.boolean(absorbing),
            (Some(_), _) => right,
            (_, Some(value)) if value != absorbing => left,
            (_, Some(_)) if !references::has_side_effects(tree, left) => tree.boolean(absorbing),
            _ => return Ok(false),
        };

        tree.replace(node, replacement)?;
        Ok(true)
    }

    fn fold_not(&self, tree: &mut SyntaxTree, node: NodeId) -> Result<bool> {
        let operand = match tree.first(node) {
            Some(operand) => operand,
            None => return Ok(false),
        };

        match self.fold_unary_op(tree.kind(operand)) {
            Some(value) => {
                let literal = tree.boolean(value);
                tree.replace(node, literal)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Fold a binary operation on two literals
    fn fold_binary_op(&self, left: &NodeKind, op: Operator, right: &NodeKind) -> Option<bool> {
        match (left, op, right) {
            // Comparison operations on numbers
            (NodeKind::Number(l), _, NodeKind::Number(r)) if op.is_comparison() => {
                let ordering = l.partial_cmp(r)?;
                Some(compare(ordering, op))
            }

            // Equality operations on booleans
            (NodeKind::Bool(l), Operator::Eq, NodeKind::Bool(r)) => Some(l == r),
            (NodeKind::Bool(l), Operator::Ne, NodeKind::Bool(r)) => Some(l != r),

            // Logical operations on literals
            (l, Operator::And, r) => Some(l.truth()? && r.truth()?),
            (l, Operator::Or, r) => Some(l.truth()? || r.truth()?),

            // Can't fold
            _ => None,
        }
    }

    /// Fold a logical not of a literal
    fn fold_unary_op(&self, operand: &NodeKind) -> Option<bool> {
        match operand {
            NodeKind::Bool(value) => Some(!value),
            NodeKind::Number(value) => Some(value.is_zero()),
            _ => None,
        }
    }
}

impl Default for ConstantFolder {
    fn default() -> Self {
        Self::new()
    }
}

fn non_empty(terms: Vec<Term>) -> Vec<Term> {
    if terms.is_empty() {
        vec![Term::Constant(Number::Integer(0))]
    } else {
        terms
    }
}

fn compare(ordering: Ordering, op: Operator) -> bool {
    match op {
        Operator::Eq => ordering == Ordering::Equal,
        Operator::Ne => ordering != Ordering::Equal,
        Operator::Gt => ordering == Ordering::Greater,
        Operator::Ge => ordering != Ordering::Less,
        Operator::Lt => ordering == Ordering::Less,
        Operator::Le => ordering != Ordering::Greater,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_core::{Function, Type};

    #[test]
    fn test_fold_cancelled_comparison() {
        let mut function = Function::new("f");
        let x = function.local("x", Type::Integer);
        let tree = &mut function.tree;

        let a = tree.variable(x);
        let one = tree.number(1);
        let left = tree.binary(Operator::Add, a, one);
        let b = tree.variable(x);
        let five = tree.number(5);
        let right = tree.binary(Operator::Add, b, five);
        let comparison = tree.binary(Operator::Lt, left, right);
        let ret = tree.ret(Some(comparison));
        tree.push(ret);

        let folded = ConstantFolder::new().optimize_comparisons(tree).unwrap();

        assert_eq!(folded, 1);
        assert_eq!(function.render(), "return true");
    }

    #[test]
    fn test_opaque_terms_are_skipped_by_cancellation() {
        let mut function = Function::new("f");
        let x = function.local("x", Type::Integer);
        let tree = &mut function.tree;

        let call = tree.call("g", Type::Integer, vec![]);
        let a = tree.variable(x);
        let left = tree.binary(Operator::Add, call, a);
        let b = tree.variable(x);
        let two = tree.number(2);
        let right = tree.binary(Operator::Add, b, two);
        let comparison = tree.binary(Operator::Eq, left, right);
        let ret = tree.ret(Some(comparison));
        tree.push(ret);

        let folded = ConstantFolder::new().optimize_comparisons(tree).unwrap();

        assert_eq!(folded, 0);
        assert_eq!(function.render(), "return g() - 2 == 0");
    }

    #[test]
    fn test_without_algebra_only_literals_fold() {
        let mut function = Function::new("f");
        let x = function.local("x", Type::Integer);
        let tree = &mut function.tree;

        let a = tree.variable(x);
        let b = tree.variable(x);
        let symbolic = tree.binary(Operator::Eq, a, b);
        let first = tree.ret(Some(symbolic));
        tree.push(first);
        let one = tree.number(1);
        let two = tree.number(2);
        let literal = tree.binary(Operator::Lt, one, two);
        let second = tree.ret(Some(literal));
        tree.push(second);

        let folder = ConstantFolder::new().with_algebra(false);
        let folded = folder.optimize_comparisons(tree).unwrap();

        assert_eq!(folded, 1);
        assert_eq!(function.render(), "return x == x\nreturn true");
    }

    #[test]
    fn test_logical_identities() {
        let mut function = Function::new("f");
        let c = function.parameter("c", Type::Bool);
        let tree = &mut function.tree;

        let t = tree.boolean(true);
        let a = tree.variable(c);
        let and = tree.binary(Operator::And, t, a);
        let first = tree.ret(Some(and));
        tree.push(first);

        let call = tree.call("g", Type::Bool, vec![]);
        let f = tree.boolean(false);
        let and = tree.binary(Operator::And, call, f);
        let second = tree.ret(Some(and));
        tree.push(second);

        let b = tree.variable(c);
        let t = tree.boolean(true);
        let or = tree.binary(Operator::Or, b, t);
        let third = tree.ret(Some(or));
        tree.push(third);

        let folded = ConstantFolder::new().optimize_comparisons(tree).unwrap();

        assert_eq!(folded, 2);
        assert_eq!(function.render(), "return c\nreturn g() && false\nreturn true");
    }

    #[test]
    fn test_not_of_literal() {
        let mut function = Function::new("f");
        let tree = &mut function.tree;

        let f = tree.boolean(false);
        let not = tree.not(f);
        let ret = tree.ret(Some(not));
        tree.push(ret);

        ConstantFolder::new().optimize_comparisons(tree).unwrap();
        assert_eq!(function.render(), "return true");
    }
}
