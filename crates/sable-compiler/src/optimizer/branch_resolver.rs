//! Branch and loop resolution
//!
//! Collapses conditionals and loops whose condition is a literal and hands
//! the remaining bounded loops to the unroller.

use crate::error::Result;
use crate::optimizer::loop_unrolling::LoopUnroller;
use sable_core::{CoreError, Function, NodeId, NodeKind, SyntaxTree};

/// Counters reported by one resolution pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnwrapSummary {
    pub unwrapped: usize,
    pub unrolled: usize,
}

impl UnwrapSummary {
    pub fn changed(&self) -> bool {
        self.unwrapped > 0 || self.unrolled > 0
    }
}

/// Branch resolver
pub struct BranchResolver {
    unroller: Option<LoopUnroller>,
}

impl BranchResolver {
    /// Create a new branch resolver that unrolls counting loops
    pub fn new() -> Self {
        Self {
            unroller: Some(LoopUnroller::new()),
        }
    }

    /// Replace the loop unroller, `None` disabling unrolling
    pub fn with_unroller(mut self, unroller: Option<LoopUnroller>) -> Self {
        self.unroller = unroller;
        self
    }

    /// Resolve every conditional and loop of the function whose outcome is known
    pub fn unwrap_statements(&self, function: &mut Function) -> Result<UnwrapSummary> {
        let root = function.tree.root();
        let statements = function.tree.find_all(root, |kind| {
            matches!(kind, NodeKind::If | NodeKind::ElseIf | NodeKind::Loop)
        });

        let mut summary = UnwrapSummary::default();

        for statement in statements {
            if !function.tree.is_attached(statement) {
                continue;
            }

            match function.tree.kind(statement).clone() {
                NodeKind::If => {
                    if unwrap_if(&mut function.tree, statement)? {
                        summary.unwrapped += 1;
                    }
                }
                NodeKind::ElseIf => {
                    if unwrap_else_if(&mut function.tree, statement)? {
                        summary.unwrapped += 1;
                    }
                }
                NodeKind::Loop => {
                    if function.tree.is_forever_loop(statement) {
                        continue;
                    }

                    if unwrap_loop(&mut function.tree, statement)? {
                        summary.unwrapped += 1;
                    } else if let Some(unroller) = &self.unroller {
                        if unroller.try_unroll_loop(function, statement)? {
                            summary.unrolled += 1;
                        }
                    }
                }
                _ => {}
            }
        }

        if summary.changed() {
            tracing::debug!(
                "Unwrapped {} statement(s) and unrolled {} loop(s)",
                summary.unwrapped,
                summary.unrolled
            );
        }

        Ok(summary)
    }
}

impl Default for BranchResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Truth value of a condition consisting of a single literal
fn literal_condition(tree: &SyntaxTree, statement: NodeId) -> Option<bool> {
    let block = tree.condition_block(statement)?;

    match tree.children(block) {
        [condition] => tree.kind(*condition).truth(),
        _ => None,
    }
}

fn part(tree: &SyntaxTree, part: Option<NodeId>, statement: NodeId) -> Result<NodeId> {
    part.ok_or_else(|| {
        CoreError::UnexpectedLayout(format!("{:?} is missing a part", tree.kind(statement))).into()
    })
}

fn unwrap_if(tree: &mut SyntaxTree, statement: NodeId) -> Result<bool> {
    let truth = match literal_condition(tree, statement) {
        Some(truth) => truth,
        None => return Ok(false),
    };

    if truth {
        for successor in tree.successors(statement) {
            tree.remove(successor);
        }

        let body = part(tree, tree.body(statement), statement)?;
        tree.replace_with_children(statement, body)?;
        return Ok(true);
    }

    match tree.successor(statement) {
        None => tree.remove(statement),
        Some(successor) if matches!(tree.kind(successor), NodeKind::Else) => {
            let body = part(tree, tree.body(successor), successor)?;
            tree.remove(successor);
            tree.replace_with_children(statement, body)?;
        }
        Some(successor) => {
            // The else-if takes over the place of the discarded if
            tree.remove(statement);
            tree.set_kind(successor, NodeKind::If);
        }
    }

    Ok(true)
}

fn unwrap_else_if(tree: &mut SyntaxTree, statement: NodeId) -> Result<bool> {
    let truth = match literal_condition(tree, statement) {
        Some(truth) => truth,
        None => return Ok(false),
    };

    if !truth {
        tree.remove(statement);
        return Ok(true);
    }

    for successor in tree.successors(statement) {
        tree.remove(successor);
    }

    let condition = part(tree, tree.condition_block(statement), statement)?;
    tree.remove(condition);
    tree.set_kind(statement, NodeKind::Else);

    Ok(true)
}

fn unwrap_loop(tree: &mut SyntaxTree, statement: NodeId) -> Result<bool> {
    let truth = match literal_condition(tree, statement) {
        Some(truth) => truth,
        None => return Ok(false),
    };

    let initialization = part(tree, tree.loop_initialization(statement), statement)?;

    if !truth {
        tree.replace_with_children(statement, initialization)?;
        return Ok(true);
    }

    // Hoist the initializer and keep running the body and the action forever
    let condition = part(tree, tree.condition_block(statement), statement)?;
    let action = part(tree, tree.loop_action(statement), statement)?;
    let body = part(tree, tree.body(statement), statement)?;

    let statements = tree.take_children(initialization);
    tree.insert_all_before(statement, statements)?;
    tree.take_children(condition);

    for node in tree.take_children(action) {
        tree.append(body, node);
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_core::{Operator, Type};

    fn chain(function: &mut Function, first: bool, second: Option<bool>) {
        let x = function.local("x", Type::Integer);
        let tree = &mut function.tree;

        let condition = tree.boolean(first);
        let one = tree.number(1);
        let a = tree.assign(x, one);
        let statement = tree.if_statement(condition, vec![a]);
        tree.push(statement);

        if let Some(second) = second {
            let condition = tree.boolean(second);
            let two = tree.number(2);
            let b = tree.assign(x, two);
            let branch = tree.else_if(condition, vec![b]);
            tree.push(branch);
        }

        let three = tree.number(3);
        let c = tree.assign(x, three);
        let otherwise = tree.else_branch(vec![c]);
        tree.push(otherwise);
    }

    #[test]
    fn test_true_if_keeps_its_body() {
        let mut function = Function::new("f");
        chain(&mut function, true, Some(false));

        let resolver = BranchResolver::new();
        let summary = resolver.unwrap_statements(&mut function).unwrap();

        assert_eq!(summary.unwrapped, 1);
        assert_eq!(function.render(), "x = 1");

        let again = resolver.unwrap_statements(&mut function).unwrap();
        assert!(!again.changed());
    }

    #[test]
    fn test_false_if_falls_through_to_else_if() {
        let mut function = Function::new("f");
        chain(&mut function, false, Some(true));

        BranchResolver::new().unwrap_statements(&mut function).unwrap();

        assert_eq!(function.render(), "x = 2");
    }

    #[test]
    fn test_false_chain_ends_in_else() {
        let mut function = Function::new("f");
        chain(&mut function, false, Some(false));

        BranchResolver::new().unwrap_statements(&mut function).unwrap();

        assert_eq!(function.render(), "x = 3");
    }

    #[test]
    fn test_undecided_if_with_decided_else_if() {
        let mut function = Function::new("f");
        let c = function.parameter("c", Type::Bool);
        chain(&mut function, true, Some(true));
        let first = function.tree.children(function.tree.root())[0];
        let condition = function.tree.condition(first).unwrap();
        let read = function.tree.variable(c);
        function.tree.replace(condition, read).unwrap();

        BranchResolver::new().unwrap_statements(&mut function).unwrap();

        assert_eq!(function.render(), "if (c) { x = 1 } else { x = 2 }");
    }

    #[test]
    fn test_literal_loops() {
        let mut function = Function::new("f");
        let i = function.local("i", Type::Integer);
        let tree = &mut function.tree;

        let zero = tree.number(0);
        let initialization = tree.assign(i, zero);
        let never = tree.boolean(false);
        let call = tree.call("g", Type::Integer, vec![]);
        let skipped = tree.loop_statement(vec![initialization], Some(never), vec![], vec![call]);
        tree.push(skipped);

        let five = tree.number(5);
        let start = tree.assign(i, five);
        let always = tree.boolean(true);
        let one = tree.number(1);
        let action = tree.action(Operator::AssignAdd, i, one);
        let call = tree.call("g", Type::Integer, vec![]);
        let endless = tree.loop_statement(vec![start], Some(always), vec![action], vec![call]);
        tree.push(endless);

        BranchResolver::new().unwrap_statements(&mut function).unwrap();

        assert_eq!(function.render(), "i = 0\ni = 5\nloop { g(); i += 1 }");
    }
}
