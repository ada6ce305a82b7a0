//! Counting loop unroller
//!
//! A loop of the shape `loop (i = start; i < bound; i += step) { body }` with
//! literal start, bound and step is replaced by `count` copies of the body,
//! each followed by the step written as a plain assignment. The copies are
//! then cleaned up by substituting the iterator.

use crate::error::Result;
use crate::optimizer::collector;
use crate::optimizer::references;
use crate::optimizer::substitution::SubstitutionEngine;
use crate::optimizer::term::Term;
use sable_core::{CoreError, Function, NodeId, NodeKind, Number, Operator, SyntaxTree, Type, VariableId};

/// How a counting loop unrolls
#[derive(Debug, Clone, PartialEq)]
pub struct LoopUnwindPlan {
    pub iterator: VariableId,
    pub start: Vec<Term>,
    pub step: Vec<Term>,
    pub count: i64,
}

/// Loop unroller
pub struct LoopUnroller {
    /// Upper bound for the number of emitted iterations
    limit: i64,
    algebra: bool,
}

impl LoopUnroller {
    /// Create a new loop unroller
    pub fn new() -> Self {
        Self {
            limit: 100,
            algebra: true,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self
    }

    /// Simplify the values substituted into the unrolled copies
    pub fn with_algebra(mut self, enabled: bool) -> Self {
        self.algebra = enabled;
        self
    }

    /// Work out whether the loop is a statically bounded counting loop
    pub fn try_get_loop_unwind_plan(
        &self,
        function: &mut Function,
        statement: NodeId,
    ) -> Option<LoopUnwindPlan> {
        if !matches!(function.tree.kind(statement), NodeKind::Loop)
            || function.tree.is_forever_loop(statement)
        {
            return None;
        }

        let (iterator, start) = self.initialization(function, statement)?;
        let condition = single(&function.tree, function.tree.condition_block(statement)?)?;

        let op = function.tree.kind(condition).operator()?;
        if !op.is_comparison() || !references::is_primitive(function, condition) {
            tracing::debug!("Loop condition is not a primitive comparison");
            return None;
        }

        let step = self.step(function, statement, iterator)?;

        let body = function.tree.body(statement)?;
        let writes_iterator = function
            .tree
            .find_all(body, |kind| kind.variable() == Some(iterator))
            .into_iter()
            .any(|node| function.tree.is_write_target(node));

        if writes_iterator {
            tracing::debug!("Loop body writes its iterator");
            return None;
        }

        let count = self.solve(&mut function.tree, condition, op, iterator, start, &step)?;

        Some(LoopUnwindPlan {
            iterator,
            start: vec![Term::Constant(start)],
            step,
            count,
        })
    }

    /// `v = integer literal` with a predictable integer `v`
    fn initialization(&self, function: &Function, statement: NodeId) -> Option<(VariableId, Number)> {
        let tree = &function.tree;
        let block = tree.loop_initialization(statement)?;

        if tree.children(block).is_empty() {
            tracing::debug!("Loop has no initializer");
            return None;
        }

        let assignment = single(tree, block)?;
        if !tree.kind(assignment).is_operator(Operator::Assign) {
            return None;
        }

        let iterator = tree.kind(tree.first(assignment)?).variable()?;
        let variable = function.variable(iterator);
        if !variable.is_predictable() || variable.ty != Type::Integer {
            return None;
        }

        match tree.kind(tree.last(assignment)?) {
            NodeKind::Number(start @ Number::Integer(_)) => Some((iterator, *start)),
            _ => None,
        }
    }

    /// Per-iteration change of the iterator
    fn step(&self, function: &mut Function, statement: NodeId, iterator: VariableId) -> Option<Vec<Term>> {
        let action = single(&function.tree, function.tree.loop_action(statement)?)?;
        let operand = function.tree.first(action)?;

        if function.tree.kind(operand).variable() != Some(iterator) {
            return None;
        }

        match function.tree.kind(action).clone() {
            NodeKind::Increment { .. } => Some(vec![Term::constant(1)]),
            NodeKind::Decrement { .. } => Some(vec![Term::constant(-1)]),
            NodeKind::Operator(op @ (Operator::AssignAdd | Operator::AssignSub)) => {
                let value = function.tree.last(action)?;
                let mentions_iterator = function
                    .tree
                    .find(value, |kind| kind.variable() == Some(iterator))
                    .is_some();

                if mentions_iterator || !references::is_primitive(function, value) {
                    tracing::debug!("Loop step depends on the iterator or is not primitive");
                    return None;
                }

                let terms = collector::decompose(&mut function.tree, value);
                if op == Operator::AssignSub {
                    collector::negate_all(&terms)
                } else {
                    Some(terms)
                }
            }
            _ => {
                tracing::debug!("Ambiguous loop action");
                None
            }
        }
    }

    /// Number of iterations of `iterator op bound`, counted from `start`
    fn solve(
        &self,
        tree: &mut SyntaxTree,
        condition: NodeId,
        op: Operator,
        iterator: VariableId,
        start: Number,
        step: &[Term],
    ) -> Option<i64> {
        let (left, right) = (tree.first(condition)?, tree.last(condition)?);
        let left = collector::decompose(tree, left);
        let right = collector::decompose(tree, right);

        let mut variable_terms = Vec::new();
        let mut bound_terms = Vec::new();

        // Collect the iterator on the left and everything else on the right
        for (terms, on_left) in [(left, true), (right, false)] {
            for term in terms {
                let is_iterator = match &term {
                    Term::Constant(_) => false,
                    Term::Linear { variable, power: 1, .. } if *variable == iterator => true,
                    _ => {
                        tracing::debug!("Loop condition is not linear in its iterator");
                        return None;
                    }
                };

                match (is_iterator, on_left) {
                    (true, true) => variable_terms.push(term),
                    (true, false) => variable_terms.push(term.negate()?),
                    (false, true) => bound_terms.push(term.negate()?),
                    (false, false) => bound_terms.push(term),
                }
            }
        }

        let coefficient = match collector::simplify(variable_terms).as_slice() {
            [Term::Linear { coefficient, .. }] => *coefficient,
            _ => {
                tracing::debug!("Loop condition does not mention its iterator");
                return None;
            }
        };

        let bound = match collector::simplify(bound_terms).as_slice() {
            [] => Number::Integer(0),
            [Term::Constant(bound)] => *bound,
            _ => {
                tracing::debug!("Loop bound is not a constant");
                return None;
            }
        };

        // Isolate the iterator with a coefficient of one
        let (op, bound) = if coefficient.is_one() {
            (op, bound)
        } else if coefficient.negate().map(|c| c.is_one()).unwrap_or(false) {
            (op.mirrored(), bound.negate()?)
        } else {
            tracing::debug!("Loop iterator has a coefficient other than one");
            return None;
        };

        let step = match step {
            [Term::Constant(step @ Number::Integer(_))] if !step.is_zero() => *step,
            _ => {
                tracing::debug!("Loop step is not a non-zero integer constant");
                return None;
            }
        };

        let range = bound.subtract(&start)?;
        let ascending = !step.is_negative();

        let count = match op {
            Operator::Lt if ascending => range.divide(&step)?,
            Operator::Gt if !ascending => range.divide(&step)?,
            Operator::Le if ascending => range.add(&step)?.divide(&step)?,
            Operator::Ge if !ascending => range.add(&step)?.divide(&step)?,
            Operator::Ne => range.divide(&step)?,
            _ => {
                tracing::debug!("Loop comparison {} does not match its step direction", op);
                return None;
            }
        };

        let count = count.as_integer()?;

        if count < 0 || count > self.limit {
            tracing::debug!("Loop iteration count {} is out of range", count);
            return None;
        }

        Some(count)
    }

    /// Replace the loop by its unrolled iterations.
    ///
    /// Returns false if the loop does not qualify.
    pub fn try_unroll_loop(&self, function: &mut Function, statement: NodeId) -> Result<bool> {
        let plan = match self.try_get_loop_unwind_plan(function, statement) {
            Some(plan) => plan,
            None => return Ok(false),
        };

        let tree = &mut function.tree;
        let initialization = tree
            .loop_initialization(statement)
            .ok_or_else(|| layout(statement))?;
        let action = tree
            .loop_action(statement)
            .and_then(|block| tree.first(block))
            .ok_or_else(|| layout(statement))?;
        let body = tree.body(statement).ok_or_else(|| layout(statement))?;

        let mut statements: Vec<NodeId> = tree
            .children(initialization)
            .to_vec()
            .into_iter()
            .map(|node| tree.clone_subtree(node))
            .collect();

        for _ in 0..plan.count {
            for node in tree.children(body).to_vec() {
                statements.push(tree.clone_subtree(node));
            }
            statements.push(plain_action(tree, action, plan.iterator).ok_or_else(|| layout(action))?);
        }

        tree.insert_all_before(statement, statements)?;
        tree.remove(statement);

        tracing::debug!("Unrolled loop into {} iteration(s)", plan.count);

        SubstitutionEngine::new()
            .with_simplification(self.algebra)
            .substitute(function, plan.iterator)?;

        Ok(true)
    }
}

impl Default for LoopUnroller {
    fn default() -> Self {
        Self::new()
    }
}

fn single(tree: &SyntaxTree, block: NodeId) -> Option<NodeId> {
    match tree.children(block) {
        [node] => Some(*node),
        _ => None,
    }
}

fn layout(node: NodeId) -> CoreError {
    CoreError::UnexpectedLayout(format!("loop part {:?} is missing", node))
}

/// The loop action as `i = i + step` or `i = i - step`
fn plain_action(tree: &mut SyntaxTree, action: NodeId, iterator: VariableId) -> Option<NodeId> {
    let (op, step) = match tree.kind(action).clone() {
        NodeKind::Increment { .. } => (Operator::Add, tree.number(1)),
        NodeKind::Decrement { .. } => (Operator::Sub, tree.number(1)),
        NodeKind::Operator(op) => {
            let value = tree.last(action)?;
            (op.action_base()?, tree.clone_subtree(value))
        }
        _ => return None,
    };

    let current = tree.variable(iterator);
    let value = tree.binary(op, current, step);
    Some(tree.assign(iterator, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `loop (i = 0; i < bound; i += step) { sum += i }`
    fn counting_loop(op: Operator, bound: i64, step: i64) -> (Function, NodeId) {
        let mut function = Function::new("f");
        let sum = function.local("sum", Type::Integer);
        let i = function.local("i", Type::Integer);
        let tree = &mut function.tree;

        let zero = tree.number(0);
        let initialization = tree.assign(i, zero);
        let read = tree.variable(i);
        let limit = tree.number(bound);
        let condition = tree.binary(op, read, limit);
        let amount = tree.number(step);
        let action = tree.action(Operator::AssignAdd, i, amount);
        let value = tree.variable(i);
        let accumulate = tree.action(Operator::AssignAdd, sum, value);
        let statement =
            tree.loop_statement(vec![initialization], Some(condition), vec![action], vec![accumulate]);
        tree.push(statement);

        (function, statement)
    }

    #[test]
    fn test_plan_counts_iterations() {
        let unroller = LoopUnroller::new();

        let (mut function, statement) = counting_loop(Operator::Lt, 5, 1);
        let plan = unroller.try_get_loop_unwind_plan(&mut function, statement).unwrap();
        assert_eq!(plan.count, 5);
        assert_eq!(plan.step, vec![Term::constant(1)]);

        let (mut function, statement) = counting_loop(Operator::Le, 10, 2);
        let plan = unroller.try_get_loop_unwind_plan(&mut function, statement).unwrap();
        assert_eq!(plan.count, 6);

        let (mut function, statement) = counting_loop(Operator::Ne, 9, 3);
        let plan = unroller.try_get_loop_unwind_plan(&mut function, statement).unwrap();
        assert_eq!(plan.count, 3);
    }

    #[test]
    fn test_inexact_or_mismatched_loops_are_abandoned() {
        let unroller = LoopUnroller::new();

        let (mut function, statement) = counting_loop(Operator::Lt, 5, 2);
        assert!(unroller.try_get_loop_unwind_plan(&mut function, statement).is_none());

        let (mut function, statement) = counting_loop(Operator::Gt, 5, 1);
        assert!(unroller.try_get_loop_unwind_plan(&mut function, statement).is_none());

        let (mut function, statement) = counting_loop(Operator::Eq, 5, 1);
        assert!(unroller.try_get_loop_unwind_plan(&mut function, statement).is_none());
    }

    #[test]
    fn test_limit_is_respected() {
        let (mut function, statement) = counting_loop(Operator::Lt, 500, 1);

        let unroller = LoopUnroller::new();
        assert!(unroller.try_get_loop_unwind_plan(&mut function, statement).is_none());

        let unroller = LoopUnroller::new().with_limit(1000);
        let plan = unroller.try_get_loop_unwind_plan(&mut function, statement).unwrap();
        assert_eq!(plan.count, 500);
    }

    #[test]
    fn test_unroll_substitutes_iterator() {
        let (mut function, statement) = counting_loop(Operator::Lt, 3, 1);

        let unrolled = LoopUnroller::new().try_unroll_loop(&mut function, statement).unwrap();

        assert!(unrolled);
        assert!(!function.tree.is_attached(statement));
        assert_eq!(function.render(), "sum += 0\nsum += 1\nsum += 2");
    }

    #[test]
    fn test_iterator_isolated_from_the_right_side() {
        let mut function = Function::new("f");
        let i = function.local("i", Type::Integer);
        let tree = &mut function.tree;

        // loop (i = 0; 4 > i - 2; i++) { }
        let zero = tree.number(0);
        let initialization = tree.assign(i, zero);
        let four = tree.number(4);
        let read = tree.variable(i);
        let two = tree.number(2);
        let shifted = tree.binary(Operator::Sub, read, two);
        let condition = tree.binary(Operator::Gt, four, shifted);
        let action = tree.increment(i, true);
        let statement = tree.loop_statement(vec![initialization], Some(condition), vec![action], vec![]);
        tree.push(statement);

        let plan = LoopUnroller::new()
            .try_get_loop_unwind_plan(&mut function, statement)
            .unwrap();

        assert_eq!(plan.count, 6);
    }
}
