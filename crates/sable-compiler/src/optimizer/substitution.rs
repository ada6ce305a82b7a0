//! Value substitution and dead-store removal
//!
//! Reads whose reaching assignment is known are replaced by the assigned
//! value. Assignments that no read depends on afterwards are deleted, keeping
//! the value when evaluating it has side effects.

use crate::error::Result;
use crate::optimizer::collector;
use crate::optimizer::edits::{self, Edit};
use crate::optimizer::references;
use sable_core::{CoreError, Function, NodeId, NodeKind, Operator, SyntaxTree, VariableId};

/// Counters reported by one substitution pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubstitutionSummary {
    pub substitutions: usize,
    pub removed_stores: usize,
}

/// Substitution engine
pub struct SubstitutionEngine {
    simplify_values: bool,
}

impl SubstitutionEngine {
    /// Create a new substitution engine that simplifies substituted values
    pub fn new() -> Self {
        Self {
            simplify_values: true,
        }
    }

    /// Copy assigned values verbatim instead of simplifying them
    pub fn with_simplification(mut self, enabled: bool) -> Self {
        self.simplify_values = enabled;
        self
    }

    /// Substitute the known values of one variable and remove its dead stores
    pub fn substitute(
        &self,
        function: &mut Function,
        variable: VariableId,
    ) -> Result<SubstitutionSummary> {
        let mut summary = SubstitutionSummary::default();

        if !function.is_predictable(variable) {
            return Ok(summary);
        }

        let descriptors = references::descriptors(function);
        let descriptor = match descriptors.get(&variable) {
            Some(descriptor) => descriptor.clone(),
            None => return Ok(summary),
        };

        let mut edits = edits::collect_edits(&function.tree, variable, &descriptor)?;

        // Register every read before substituting any, so each edit knows all
        // of its consumers when its value is moved
        let nearest: Vec<(NodeId, Option<usize>)> = descriptor
            .reads
            .iter()
            .map(|&read| {
                let edit = edits::register_significant_edits(&function.tree, read, &mut edits);
                (read, edit)
            })
            .collect();

        for (read, edit) in nearest {
            let edit = match edit {
                Some(edit) => edit,
                None => continue,
            };

            if !self.can_substitute(function, read, edit, &edits, &descriptors) {
                continue;
            }

            edits[edit].remove_dependency(read)?;

            let root = edits[edit].root;
            let value = function
                .tree
                .last(root)
                .ok_or_else(|| CoreError::UnexpectedLayout(format!("assignment {:?} has no value", root)))?;

            let replacement = if self.simplify_values {
                collector::simplified_value(&mut function.tree, value)
            } else {
                function.tree.clone_subtree(value)
            };

            function.tree.replace(read, replacement)?;
            summary.substitutions += 1;
        }

        for edit in edits.iter().filter(|edit| !edit.is_required()) {
            if remove_store(&mut function.tree, edit)? {
                summary.removed_stores += 1;
            }
        }

        if summary.substitutions > 0 || summary.removed_stores > 0 {
            tracing::debug!(
                "Substituted {} read(s) and removed {} store(s) of '{}'",
                summary.substitutions,
                summary.removed_stores,
                function.variable(variable).name
            );
        }

        Ok(summary)
    }

    fn can_substitute(
        &self,
        function: &Function,
        read: NodeId,
        edit: usize,
        edits: &[Edit],
        descriptors: &std::collections::HashMap<VariableId, references::ReferenceDescriptor>,
    ) -> bool {
        let tree = &function.tree;

        // The operand of an increment is a write as well and keeps its place
        let stepped = tree
            .parent(read)
            .map(|parent| tree.kind(parent).is_increment_or_decrement())
            .unwrap_or(false);

        !stepped
            && tree.is_attached(read)
            && edits[edit].depends_on(read)
            && edits::is_assignable(function, read, edit, edits, descriptors)
    }
}

impl Default for SubstitutionEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Delete a store nobody reads.
///
/// A statement is dropped entirely unless its value has side effects, in which
/// case the value stays as a statement. A plain assignment used as a value is
/// replaced by its value; any other store used as a value stays.
fn remove_store(tree: &mut SyntaxTree, edit: &Edit) -> Result<bool> {
    let root = edit.root;

    if !tree.is_attached(root) {
        return Ok(false);
    }

    let value = match tree.kind(root) {
        NodeKind::Operator(_) => tree.last(root),
        _ => None,
    };

    if tree.is_statement(root) {
        match value {
            Some(value) if references::has_side_effects(tree, value) => tree.replace(root, value)?,
            _ => tree.remove(root),
        }
        return Ok(true);
    }

    match value {
        Some(value) if tree.kind(root).is_operator(Operator::Assign) => {
            tree.replace(root, value)?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_core::Type;

    #[test]
    fn test_straight_line_substitution() {
        let mut function = Function::new("f");
        let a = function.local("a", Type::Integer);
        let b = function.local("b", Type::Integer);
        let tree = &mut function.tree;

        let one = tree.number(1);
        let first = tree.assign(a, one);
        tree.push(first);
        let read = tree.variable(a);
        let two = tree.number(2);
        let sum = tree.binary(Operator::Add, read, two);
        let second = tree.assign(b, sum);
        tree.push(second);
        let result = tree.variable(b);
        let ret = tree.ret(Some(result));
        tree.push(ret);

        let engine = SubstitutionEngine::new();
        let summary = engine.substitute(&mut function, a).unwrap();
        assert_eq!(
            summary,
            SubstitutionSummary {
                substitutions: 1,
                removed_stores: 1
            }
        );
        engine.substitute(&mut function, b).unwrap();

        assert_eq!(function.render(), "return 3");
    }

    #[test]
    fn test_side_effect_of_dead_store_is_kept() {
        let mut function = Function::new("f");
        let a = function.local("a", Type::Integer);
        let tree = &mut function.tree;

        let call = tree.call("g", Type::Integer, vec![]);
        let store = tree.assign(a, call);
        tree.push(store);

        let summary = SubstitutionEngine::new().substitute(&mut function, a).unwrap();

        assert_eq!(summary.removed_stores, 1);
        assert_eq!(function.render(), "g()");
    }

    #[test]
    fn test_unpredictable_variables_are_ignored() {
        let mut function = Function::new("f");
        let m = function.member("m", Type::Integer);
        let tree = &mut function.tree;

        let one = tree.number(1);
        let store = tree.assign(m, one);
        tree.push(store);

        let summary = SubstitutionEngine::new().substitute(&mut function, m).unwrap();

        assert_eq!(summary, SubstitutionSummary::default());
        assert_eq!(function.render(), "m = 1");
    }

    #[test]
    fn test_self_referencing_store_moves_to_its_only_read() {
        let mut function = Function::new("f");
        let x = function.parameter("x", Type::Integer);
        let tree = &mut function.tree;

        let own = tree.variable(x);
        let one = tree.number(1);
        let sum = tree.binary(Operator::Add, own, one);
        let store = tree.assign(x, sum);
        tree.push(store);
        let read = tree.variable(x);
        let ret = tree.ret(Some(read));
        tree.push(ret);

        SubstitutionEngine::new().substitute(&mut function, x).unwrap();

        assert_eq!(function.render(), "return x + 1");
    }

    #[test]
    fn test_self_referencing_store_with_two_reads_stays() {
        let mut function = Function::new("f");
        let x = function.parameter("x", Type::Integer);
        let tree = &mut function.tree;

        let own = tree.variable(x);
        let one = tree.number(1);
        let sum = tree.binary(Operator::Add, own, one);
        let store = tree.assign(x, sum);
        tree.push(store);
        let first = tree.variable(x);
        let call = tree.call("g", Type::Integer, vec![first]);
        tree.push(call);
        let second = tree.variable(x);
        let ret = tree.ret(Some(second));
        tree.push(ret);

        let summary = SubstitutionEngine::new().substitute(&mut function, x).unwrap();

        assert_eq!(summary, SubstitutionSummary::default());
        assert_eq!(function.render(), "x = x + 1\ng(x)\nreturn x");
    }
}
