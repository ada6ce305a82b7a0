//! Structural normalization
//!
//! Rewrites the constructs the data-flow passes do not reason about into plain
//! assignments and branches: groupings, double negations, type tests, boolean
//! values outside of conditions and increments.

use crate::error::Result;
use crate::optimizer::references;
use sable_core::{CoreError, Function, NodeId, NodeKind, Operator, SyntaxTree, Type};

/// Structural normalizer
pub struct StructuralNormalizer;

impl StructuralNormalizer {
    /// Create a new structural normalizer
    pub fn new() -> Self {
        Self
    }

    /// Run every normalization once, returning the number of rewritten nodes
    pub fn normalize(&self, function: &mut Function) -> Result<usize> {
        let mut rewritten = 0;

        rewritten += self.remove_groupings(&mut function.tree)?;
        rewritten += self.lower_type_tests(function)?;
        rewritten += self.cancel_double_negations(&mut function.tree)?;
        rewritten += self.outline_boolean_values(function)?;
        rewritten += self.rewrite_increments(function)?;

        if rewritten > 0 {
            tracing::debug!(
                "Normalized {} node(s) of '{}'",
                rewritten,
                function.name
            );
        }

        Ok(rewritten)
    }

    /// Replace every single-child grouping by its content
    fn remove_groupings(&self, tree: &mut SyntaxTree) -> Result<usize> {
        let root = tree.root();
        let groupings = tree.find_all(root, |kind| matches!(kind, NodeKind::Parenthesis));
        let mut removed = 0;

        // Innermost first, so nested groupings collapse into the outer slot
        for grouping in groupings.into_iter().rev() {
            if !tree.is_attached(grouping) {
                continue;
            }

            if let [content] = tree.children(grouping) {
                let content = *content;
                tree.replace(grouping, content)?;
                removed += 1;
            }
        }

        Ok(removed)
    }

    fn cancel_double_negations(&self, tree: &mut SyntaxTree) -> Result<usize> {
        let root = tree.root();
        let negations = tree.find_all(root, |kind| matches!(kind, NodeKind::Negate | NodeKind::Not));
        let mut cancelled = 0;

        for negation in negations {
            let mut current = negation;

            while tree.is_attached(current) {
                let inner = match double_negation(tree, current) {
                    Some(inner) => inner,
                    None => break,
                };

                tree.replace(current, inner)?;
                current = inner;
                cancelled += 1;
            }
        }

        Ok(cancelled)
    }

    fn lower_type_tests(&self, function: &mut Function) -> Result<usize> {
        let root = function.tree.root();
        let tests = function
            .tree
            .find_all(root, |kind| matches!(kind, NodeKind::TypeTest { .. }));
        let mut lowered = 0;

        // Innermost first, so a test nested in another's object is lowered in place
        for test in tests.into_iter().rev() {
            if !function.tree.is_attached(test) {
                continue;
            }

            lower_type_test(function, test)?;
            lowered += 1;
        }

        Ok(lowered)
    }

    fn outline_boolean_values(&self, function: &mut Function) -> Result<usize> {
        let root = function.tree.root();
        let candidates = function.tree.find_all(root, |kind| match kind {
            NodeKind::Operator(op) => op.is_comparison() || op.is_logical(),
            _ => false,
        });
        let mut outlined = 0;

        for node in candidates {
            if !function.tree.is_attached(node) || !needs_outlining(&function.tree, node) {
                continue;
            }

            let flag = function.declare_hidden(Type::Bool);
            let tree = &mut function.tree;

            let sequence = tree.inline(vec![]);
            tree.replace(node, sequence)?;

            let no = tree.boolean(false);
            let reset = tree.assign(flag, no);
            let yes = tree.boolean(true);
            let raise = tree.assign(flag, yes);
            let guard = tree.if_statement(node, vec![raise]);
            let value = tree.variable(flag);

            for child in [reset, guard, value] {
                tree.append(sequence, child);
            }

            outlined += 1;
        }

        Ok(outlined)
    }

    fn rewrite_increments(&self, function: &mut Function) -> Result<usize> {
        let root = function.tree.root();
        let steps = function
            .tree
            .find_all(root, |kind| kind.is_increment_or_decrement());
        let mut rewritten = 0;

        // Innermost first
        for step in steps.into_iter().rev() {
            if !function.tree.is_attached(step) {
                continue;
            }

            rewrite_increment(function, step)?;
            rewritten += 1;
        }

        Ok(rewritten)
    }
}

impl Default for StructuralNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

fn single_child(tree: &SyntaxTree, node: NodeId) -> Result<NodeId> {
    match tree.children(node) {
        [child] => Ok(*child),
        _ => Err(CoreError::UnexpectedLayout(format!(
            "{:?} should have exactly one operand",
            tree.kind(node)
        ))
        .into()),
    }
}

/// Operand of `--x` or `!!x` when the node is such a pair
fn double_negation(tree: &SyntaxTree, node: NodeId) -> Option<NodeId> {
    let kind = tree.kind(node);
    let inner = match tree.children(node) {
        [inner] => *inner,
        _ => return None,
    };

    if tree.kind(inner) != kind {
        return None;
    }

    match tree.children(inner) {
        [operand] => Some(*operand),
        _ => None,
    }
}

fn is_inheritable(ty: &Type) -> bool {
    ty.as_object().map(|object| object.inheritable).unwrap_or(false)
}

/// Runtime check `typeof(object) == T`, extended with `inherits(typeof(object), T)`
/// when `T` may have subtypes. The object is read twice in the extended form.
fn type_condition(tree: &mut SyntaxTree, object: NodeId, expected: &Type) -> NodeId {
    let tag = tree.add_with_children(NodeKind::TypeTagOf, [object]);
    let descriptor = tree.add(NodeKind::TypeDescriptor(expected.clone()));
    let equal = tree.binary(Operator::Eq, tag, descriptor);

    if !is_inheritable(expected) {
        return equal;
    }

    let copy = tree.clone_subtree(object);
    let tag = tree.add_with_children(NodeKind::TypeTagOf, [copy]);
    let descriptor = tree.add(NodeKind::TypeDescriptor(expected.clone()));
    let inherits = tree.call("inherits", Type::Bool, vec![tag, descriptor]);

    tree.binary(Operator::Or, equal, inherits)
}

fn lower_type_test(function: &mut Function, test: NodeId) -> Result<()> {
    let (expected, result) = match function.tree.kind(test) {
        NodeKind::TypeTest { expected, result } => (expected.clone(), *result),
        _ => return Ok(()),
    };

    let object = single_child(&function.tree, test)?;
    let actual = function.type_of(object);
    let pure = !references::has_side_effects(&function.tree, object);

    let result = match result {
        Some(result) => result,
        None => {
            let decided = actual
                .as_ref()
                .and_then(|actual| actual.instance_of(&expected))
                .filter(|_| pure);

            let replacement = match decided {
                Some(value) => function.tree.boolean(value),
                None if pure || !is_inheritable(&expected) => {
                    function.tree.remove(object);
                    type_condition(&mut function.tree, object, &expected)
                }
                None => {
                    // The extended check reads the object twice, so evaluate it once
                    let holder = function.declare_hidden(actual.unwrap_or_else(|| expected.clone()));
                    let tree = &mut function.tree;
                    tree.remove(object);
                    let load = tree.assign(holder, object);
                    let read = tree.variable(holder);
                    let condition = type_condition(tree, read, &expected);
                    tree.inline(vec![load, condition])
                }
            };

            function.tree.replace(test, replacement)?;
            return Ok(());
        }
    };

    let holder = function.declare_hidden(actual.unwrap_or_else(|| expected.clone()));
    let flag = function.declare_hidden(Type::Bool);
    let tree = &mut function.tree;

    tree.remove(object);
    let load = tree.assign(holder, object);
    let no = tree.boolean(false);
    let reset = tree.assign(flag, no);

    let read = tree.variable(holder);
    let condition = type_condition(tree, read, &expected);
    let source = tree.variable(holder);
    let cast = tree.cast(source, expected);
    let store = tree.assign(result, cast);
    let yes = tree.boolean(true);
    let raise = tree.assign(flag, yes);
    let guard = tree.if_statement(condition, vec![store, raise]);

    let value = tree.variable(flag);
    let sequence = tree.inline(vec![load, reset, guard, value]);
    tree.replace(test, sequence)?;

    Ok(())
}

/// A boolean expression needs a stored value unless it is a statement, a
/// condition or an operand of an enclosing boolean expression
fn needs_outlining(tree: &SyntaxTree, node: NodeId) -> bool {
    if tree.is_statement(node) {
        return false;
    }

    let context = tree
        .ancestors(node)
        .find(|&ancestor| !matches!(tree.kind(ancestor), NodeKind::Parenthesis | NodeKind::Not));

    match context {
        None => false,
        Some(context) => match tree.kind(context) {
            NodeKind::Operator(op) if op.is_comparison() || op.is_logical() => false,
            NodeKind::Block => !tree.is_condition_block(context),
            _ => true,
        },
    }
}

fn rewrite_increment(function: &mut Function, step: NodeId) -> Result<()> {
    let (post, op) = match function.tree.kind(step) {
        NodeKind::Increment { post } => (*post, Operator::Add),
        NodeKind::Decrement { post } => (*post, Operator::Sub),
        _ => return Ok(()),
    };

    let operand = single_child(&function.tree, step)?;

    if !references::is_value_used(&function.tree, step) {
        let action = match op.to_action() {
            Some(action) => action,
            None => return Ok(()),
        };

        let tree = &mut function.tree;
        tree.remove(operand);
        let one = tree.number(1);
        let replacement = tree.binary(action, operand, one);
        tree.replace(step, replacement)?;
        return Ok(());
    }

    let sequence = if post {
        let ty = function.type_of(operand).unwrap_or(Type::Integer);
        let previous = function.declare_hidden(ty);
        let tree = &mut function.tree;

        tree.remove(operand);
        let copy = tree.clone_subtree(operand);
        let save = tree.assign(previous, copy);
        let store = stepped_store(tree, operand, op);
        let value = tree.variable(previous);
        tree.inline(vec![save, store, value])
    } else {
        let tree = &mut function.tree;

        tree.remove(operand);
        let value = tree.clone_subtree(operand);
        let store = stepped_store(tree, operand, op);
        tree.inline(vec![store, value])
    };

    function.tree.replace(step, sequence)?;
    Ok(())
}

/// `operand = operand ± 1`, taking ownership of the detached `operand`
fn stepped_store(tree: &mut SyntaxTree, operand: NodeId, op: Operator) -> NodeId {
    let current = tree.clone_subtree(operand);
    let one = tree.number(1);
    let value = tree.binary(op, current, one);
    tree.binary(Operator::Assign, operand, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_core::ObjectType;

    fn animal() -> Type {
        Type::Object(ObjectType::new("Animal").inheritable())
    }

    fn dog() -> Type {
        Type::Object(ObjectType::new("Dog").with_supertype("Animal"))
    }

    fn puppy() -> Type {
        Type::Object(ObjectType::new("Puppy").with_supertype("Animal").inheritable())
    }

    #[test]
    fn test_groupings_and_double_negations_disappear() {
        let mut function = Function::new("f");
        let x = function.parameter("x", Type::Integer);
        let tree = &mut function.tree;

        let read = tree.variable(x);
        let inner = tree.negate(read);
        let grouped = tree.parenthesis(inner);
        let outer = tree.negate(grouped);
        let ret = tree.ret(Some(outer));
        tree.push(ret);

        let rewritten = StructuralNormalizer::new().normalize(&mut function).unwrap();

        assert_eq!(rewritten, 2);
        assert_eq!(function.render(), "return x");
    }

    #[test]
    fn test_triple_not_leaves_one() {
        let mut function = Function::new("f");
        let c = function.parameter("c", Type::Bool);
        let tree = &mut function.tree;

        let read = tree.variable(c);
        let first = tree.not(read);
        let second = tree.not(first);
        let third = tree.not(second);
        let ret = tree.ret(Some(third));
        tree.push(ret);

        StructuralNormalizer::new().normalize(&mut function).unwrap();

        assert_eq!(function.render(), "return !c");
    }

    #[test]
    fn test_statement_increments_become_actions() {
        let mut function = Function::new("f");
        let i = function.local("i", Type::Integer);
        let tree = &mut function.tree;

        let up = tree.increment(i, true);
        tree.push(up);
        let down = tree.decrement(i, false);
        tree.push(down);

        StructuralNormalizer::new().normalize(&mut function).unwrap();

        assert_eq!(function.render(), "i += 1\ni -= 1");
    }

    #[test]
    fn test_used_increments_capture_their_value() {
        let mut function = Function::new("f");
        let i = function.local("i", Type::Integer);
        let tree = &mut function.tree;

        let post = tree.increment(i, true);
        let pre = tree.increment(i, false);
        let call = tree.call("g", Type::Integer, vec![post, pre]);
        tree.push(call);

        StructuralNormalizer::new().normalize(&mut function).unwrap();

        assert_eq!(
            function.render(),
            "g(inline { .t1 = i; i = i + 1; .t1 }, inline { i = i + 1; i })"
        );
    }

    #[test]
    fn test_boolean_values_are_outlined_outside_conditions() {
        let mut function = Function::new("f");
        let a = function.parameter("a", Type::Integer);
        let c = function.local("c", Type::Bool);
        let tree = &mut function.tree;

        let left = tree.variable(a);
        let zero = tree.number(0);
        let comparison = tree.binary(Operator::Lt, left, zero);
        let store = tree.assign(c, comparison);
        tree.push(store);

        let read = tree.variable(a);
        let one = tree.number(1);
        let condition = tree.binary(Operator::Eq, read, one);
        let body = tree.ret(None);
        let statement = tree.if_statement(condition, vec![body]);
        tree.push(statement);

        StructuralNormalizer::new().normalize(&mut function).unwrap();

        assert_eq!(
            function.render(),
            "c = inline { .t2 = false; if (a < 0) { .t2 = true }; .t2 }\nif (a == 1) { return }"
        );
    }

    #[test]
    fn test_decidable_type_test_becomes_literal() {
        let mut function = Function::new("f");
        let d = function.parameter("d", dog());
        let tree = &mut function.tree;

        let object = tree.variable(d);
        let test = tree.type_test(object, animal(), None);
        let statement = tree.if_statement(test, vec![]);
        tree.push(statement);

        StructuralNormalizer::new().normalize(&mut function).unwrap();

        assert_eq!(function.render(), "if (true) { }");
    }

    #[test]
    fn test_runtime_type_test_checks_inheritance() {
        let mut function = Function::new("f");
        let q = function.parameter("q", Type::Object(ObjectType::new("Box")));
        let o = function.parameter("o", animal());
        let tree = &mut function.tree;

        let object = tree.variable(q);
        let test = tree.type_test(object, dog(), None);
        let statement = tree.if_statement(test, vec![]);
        tree.push(statement);

        let object = tree.variable(o);
        let test = tree.type_test(object, puppy(), None);
        let statement = tree.if_statement(test, vec![]);
        tree.push(statement);

        StructuralNormalizer::new().normalize(&mut function).unwrap();

        assert_eq!(
            function.render(),
            "if (false) { }\nif (typeof(o) == Puppy || inherits(typeof(o), Puppy)) { }"
        );
    }

    #[test]
    fn test_captured_type_test_is_lowered_to_guarded_cast() {
        let mut function = Function::new("f");
        let o = function.parameter("o", animal());
        let d = function.local("d", dog());
        let tree = &mut function.tree;

        let object = tree.variable(o);
        let test = tree.type_test(object, dog(), Some(d));
        let statement = tree.if_statement(test, vec![]);
        tree.push(statement);

        StructuralNormalizer::new().normalize(&mut function).unwrap();

        assert_eq!(
            function.render(),
            "if (inline { .t2 = o; .t3 = false; if (typeof(.t2) == Dog) { d = (.t2 as Dog); .t3 = true }; .t3 }) { }"
        );
    }
}
