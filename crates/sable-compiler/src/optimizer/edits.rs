//! Edit tracking for a single variable
//!
//! An edit is one write occurrence of the variable. Walking backwards from a
//! read, every edit whose value may reach the read is marked as a dependency
//! of that read. An edit without dependencies is a dead store.

use crate::error::{CompileError, Result};
use crate::optimizer::references::{self, ReferenceDescriptor};
use sable_core::{Function, NodeId, NodeKind, Operator, SyntaxTree, VariableId};
use std::collections::HashMap;

/// One write occurrence of a variable
#[derive(Debug, Clone)]
pub struct Edit {
    pub variable: VariableId,
    /// The written variable occurrence
    pub node: NodeId,
    /// The assignment or increment that performs the write
    pub root: NodeId,
    dependencies: Vec<NodeId>,
}

impl Edit {
    pub fn new(tree: &SyntaxTree, variable: VariableId, node: NodeId) -> Result<Self> {
        let root = tree
            .find_parent(node, |kind| match kind {
                NodeKind::Increment { .. } | NodeKind::Decrement { .. } => true,
                NodeKind::Operator(op) => op.is_assignment(),
                _ => false,
            })
            .ok_or(CompileError::EditRootNotFound(node))?;

        Ok(Self {
            variable,
            node,
            root,
            dependencies: Vec::new(),
        })
    }

    pub fn add_dependency(&mut self, read: NodeId) {
        if !self.dependencies.contains(&read) {
            self.dependencies.push(read);
        }
    }

    pub fn remove_dependency(&mut self, read: NodeId) -> Result<()> {
        match self.dependencies.iter().position(|&dependency| dependency == read) {
            Some(index) => {
                self.dependencies.remove(index);
                Ok(())
            }
            None => Err(CompileError::DependencyNotRegistered {
                edit: self.node,
                read,
            }),
        }
    }

    pub fn dependencies(&self) -> &[NodeId] {
        &self.dependencies
    }

    pub fn depends_on(&self, read: NodeId) -> bool {
        self.dependencies.contains(&read)
    }

    /// An edit is required while some read still consumes its value
    pub fn is_required(&self) -> bool {
        !self.dependencies.is_empty()
    }

    /// Returns true if the edit is a plain `=`
    pub fn is_assignment(&self, tree: &SyntaxTree) -> bool {
        tree.kind(self.root).is_operator(Operator::Assign)
    }

    /// Variables the edit's value is computed from, excluding the edited one
    pub fn variable_dependencies(&self, tree: &SyntaxTree) -> Vec<VariableId> {
        if tree.kind(self.root).is_increment_or_decrement() {
            return Vec::new();
        }

        let mut variables: Vec<VariableId> = Vec::new();

        for node in tree.descendants(self.root) {
            if let Some(variable) = tree.kind(node).variable() {
                if variable != self.variable && !variables.contains(&variable) {
                    variables.push(variable);
                }
            }
        }

        variables
    }
}

/// Create an edit for every write occurrence of the descriptor
pub fn collect_edits(
    tree: &SyntaxTree,
    variable: VariableId,
    descriptor: &ReferenceDescriptor,
) -> Result<Vec<Edit>> {
    descriptor
        .writes
        .iter()
        .map(|&node| Edit::new(tree, variable, node))
        .collect()
}

/// Edits executed before the read on some path leading to it, nearest first.
///
/// Edits inside branches that exclude the read are left out.
pub fn past_edits(tree: &SyntaxTree, read: NodeId, edits: &[Edit]) -> Vec<usize> {
    let blacklist = references::blacklist(tree, read);

    (0..edits.len())
        .rev()
        .filter(|&index| tree.is_before(edits[index].root, read))
        .filter(|&index| !references::is_blacklisted(tree, edits[index].node, &blacklist))
        .collect()
}

fn mark_under(tree: &SyntaxTree, edits: &mut [Edit], indices: &[usize], scope: NodeId, read: NodeId) {
    for &index in indices {
        if tree.is_under(edits[index].node, scope) {
            edits[index].add_dependency(read);
        }
    }
}

/// Mark the past edits inside `node` that the read depends on.
///
/// Returns false when the node definitely overwrites the variable, meaning
/// nothing before it can reach the read.
pub fn register(
    tree: &SyntaxTree,
    node: NodeId,
    read: NodeId,
    edits: &mut [Edit],
    past: &[usize],
) -> bool {
    if let Some(&index) = past.iter().find(|&&index| edits[index].root == node) {
        edits[index].add_dependency(read);

        if edits[index].is_assignment(tree) {
            return false;
        }
    }

    let touches_edit = past
        .iter()
        .any(|&index| tree.contains(node, edits[index].node));

    if !touches_edit {
        return true;
    }

    match tree.kind(node) {
        NodeKind::If => {
            for branch in tree.branches(node) {
                mark_under(tree, edits, past, branch, read);
            }
        }
        NodeKind::Loop => {
            if tree.is_forever_loop(node) {
                if let Some(body) = tree.body(node) {
                    if !register(tree, body, read, edits, past) {
                        return false;
                    }
                }
            }

            mark_under(tree, edits, past, node, read);

            if let Some(initialization) = tree.loop_initialization(node) {
                if !register(tree, initialization, read, edits, past) {
                    return false;
                }
            }
        }
        NodeKind::ElseIf | NodeKind::Else => {}
        _ => {
            for &child in tree.children(node).iter().rev() {
                if !register(tree, child, read, edits, past) {
                    return false;
                }
            }
        }
    }

    true
}

/// Continue the backwards walk once `node` has no previous sibling.
///
/// Returns `None` when the walk is finished, either at the function or
/// because a condition on the way out definitely overwrites the variable.
pub fn step_outside(
    tree: &SyntaxTree,
    node: Option<NodeId>,
    edits: &mut [Edit],
    past: &[usize],
    read: NodeId,
) -> Option<NodeId> {
    let node = node?;

    match tree.kind(node) {
        NodeKind::Loop => {
            // Every edit of the loop may run before the read on a later iteration
            let all: Vec<usize> = (0..edits.len()).collect();
            mark_under(tree, edits, &all, node, read);

            tree.previous(node)
                .or_else(|| step_outside(tree, tree.parent(node), edits, past, read))
        }
        NodeKind::If | NodeKind::ElseIf | NodeKind::Else => {
            if !register_conditions(tree, node, read, edits, past) {
                return None;
            }

            let root = tree.chain_root(node);
            tree.previous(root)
                .or_else(|| step_outside(tree, tree.parent(root), edits, past, read))
        }
        NodeKind::Block => step_outside(tree, tree.parent(node), edits, past, read),
        NodeKind::Function => None,
        _ => Some(node),
    }
}

/// Register the conditions evaluated before entering `branch`: its own, then
/// those of the earlier branches of the chain, nearest first
fn register_conditions(
    tree: &SyntaxTree,
    branch: NodeId,
    read: NodeId,
    edits: &mut [Edit],
    past: &[usize],
) -> bool {
    let root = tree.chain_root(branch);
    let mut iterator = Some(branch);

    while let Some(current) = iterator {
        if let Some(condition) = tree.condition_block(current) {
            // A read inside the condition has already walked its own block
            if !tree.contains(condition, read) && !register(tree, condition, read, edits, past) {
                return false;
            }
        }

        if current == root {
            break;
        }

        iterator = tree.previous(current);
    }

    true
}

/// Register every edit the read depends on and return the nearest one
pub fn register_significant_edits(
    tree: &SyntaxTree,
    read: NodeId,
    edits: &mut [Edit],
) -> Option<usize> {
    let past = past_edits(tree, read, edits);
    let mut iterator = Some(read);

    while let Some(node) = iterator {
        if !register(tree, node, read, edits, &past) {
            break;
        }

        iterator = match tree.previous(node) {
            Some(previous) => Some(previous),
            None => step_outside(tree, tree.parent(node), edits, &past, read),
        };
    }

    past.first().copied()
}

/// Returns true if the value of the edit can replace the read
pub fn is_assignable(
    function: &Function,
    read: NodeId,
    edit: usize,
    edits: &[Edit],
    descriptors: &HashMap<VariableId, ReferenceDescriptor>,
) -> bool {
    let tree = &function.tree;
    let current = &edits[edit];

    if !current.is_assignment(tree) {
        return false;
    }

    if !references::is_primitive(function, current.root)
        || references::is_branched(tree, read, current.node)
    {
        return false;
    }

    // A value computed from the old value of the variable is only valid at
    // the read once the edit itself disappears
    let value = tree.last(current.root);
    let self_referencing = value
        .map(|value| {
            tree.find(value, |kind| kind.variable() == Some(current.variable))
                .is_some()
        })
        .unwrap_or(false);

    if self_referencing && current.dependencies() != [read] {
        return false;
    }

    let dependency_writes: Vec<NodeId> = current
        .variable_dependencies(tree)
        .iter()
        .filter_map(|variable| descriptors.get(variable))
        .flat_map(|descriptor| descriptor.writes.iter().copied())
        .collect();

    if dependency_writes
        .iter()
        .any(|&write| tree.is_between(write, current.node, read))
    {
        return false;
    }

    for scope in tree.ancestors(read) {
        if !matches!(tree.kind(scope), NodeKind::Loop) {
            continue;
        }

        if !tree.is_forever_loop(scope) {
            if let Some(condition) = tree.condition_block(scope) {
                if tree.is_under(read, condition) {
                    return false;
                }
            }
        }

        if tree.is_under(current.node, scope) {
            continue;
        }

        // Writes anywhere in the loop run before the read of the next iteration
        let edited_elsewhere = edits
            .iter()
            .enumerate()
            .any(|(index, other)| index != edit && tree.is_under(other.node, scope));

        let dependency_changed = dependency_writes
            .iter()
            .any(|&write| tree.is_under(write, scope));

        if edited_elsewhere || dependency_changed {
            return false;
        }
    }

    true
}
