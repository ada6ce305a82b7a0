//! Variables and the per-function scope

use crate::ast::{NodeId, NodeKind, Printer, SyntaxTree};
use crate::define_entity;
use crate::entity::PrimaryMap;
use crate::types::{Number, Type};
use serde::{Deserialize, Serialize};

define_entity!(
    /// Index of a variable inside its [`Function`]
    VariableId
);

/// Storage class of a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableKind {
    Parameter,
    Local,
    Member,
    Global,
}

/// Named storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub kind: VariableKind,
    pub ty: Type,
    /// Declared by the compiler rather than the source
    #[serde(default)]
    pub hidden: bool,
    /// Occurrences whose value is consumed; rebuilt by [`Function::rebuild_usages`]
    #[serde(skip)]
    pub reads: Vec<NodeId>,
    /// Occurrences that are assigned; rebuilt by [`Function::rebuild_usages`]
    #[serde(skip)]
    pub writes: Vec<NodeId>,
}

impl Variable {
    pub fn new(name: impl Into<String>, kind: VariableKind, ty: Type) -> Self {
        Self {
            name: name.into(),
            kind,
            ty,
            hidden: false,
            reads: Vec::new(),
            writes: Vec::new(),
        }
    }

    /// Parameters and locals cannot be aliased, so their values can be tracked
    pub fn is_predictable(&self) -> bool {
        matches!(self.kind, VariableKind::Parameter | VariableKind::Local)
    }
}

/// A resolved function: its syntax tree plus the variables it can see
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub tree: SyntaxTree,
    variables: PrimaryMap<VariableId, Variable>,
    parameters: Vec<VariableId>,
    locals: Vec<VariableId>,
}

impl Function {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tree: SyntaxTree::new(),
            variables: PrimaryMap::new(),
            parameters: Vec::new(),
            locals: Vec::new(),
        }
    }

    fn declare(&mut self, variable: Variable) -> VariableId {
        let kind = variable.kind;
        let id = self.variables.push(variable);
        match kind {
            VariableKind::Parameter => self.parameters.push(id),
            VariableKind::Local => self.locals.push(id),
            VariableKind::Member | VariableKind::Global => {}
        }
        id
    }

    pub fn parameter(&mut self, name: &str, ty: Type) -> VariableId {
        self.declare(Variable::new(name, VariableKind::Parameter, ty))
    }

    pub fn local(&mut self, name: &str, ty: Type) -> VariableId {
        self.declare(Variable::new(name, VariableKind::Local, ty))
    }

    pub fn member(&mut self, name: &str, ty: Type) -> VariableId {
        self.declare(Variable::new(name, VariableKind::Member, ty))
    }

    pub fn global(&mut self, name: &str, ty: Type) -> VariableId {
        self.declare(Variable::new(name, VariableKind::Global, ty))
    }

    /// Declare a fresh compiler-generated local
    pub fn declare_hidden(&mut self, ty: Type) -> VariableId {
        let name = format!(".t{}", self.variables.len());
        let mut variable = Variable::new(name, VariableKind::Local, ty);
        variable.hidden = true;
        self.declare(variable)
    }

    pub fn variable(&self, id: VariableId) -> &Variable {
        &self.variables[id]
    }

    pub fn variables(&self) -> impl Iterator<Item = (VariableId, &Variable)> {
        self.variables.iter()
    }

    pub fn parameters(&self) -> &[VariableId] {
        &self.parameters
    }

    pub fn locals(&self) -> &[VariableId] {
        &self.locals
    }

    /// Locals followed by parameters
    pub fn predictable_variables(&self) -> Vec<VariableId> {
        self.locals
            .iter()
            .chain(self.parameters.iter())
            .copied()
            .collect()
    }

    pub fn is_predictable(&self, id: VariableId) -> bool {
        self.variables[id].is_predictable()
    }

    pub fn find_variable(&self, name: &str) -> Option<VariableId> {
        self.variables
            .iter()
            .find(|(_, variable)| variable.name == name)
            .map(|(id, _)| id)
    }

    /// Static type of an expression, if it can be determined
    pub fn type_of(&self, node: NodeId) -> Option<Type> {
        let tree = &self.tree;

        match tree.kind(node) {
            NodeKind::Number(Number::Integer(_)) => Some(Type::Integer),
            NodeKind::Number(Number::Decimal(_)) => Some(Type::Decimal),
            NodeKind::Bool(_) | NodeKind::Not | NodeKind::TypeTest { .. } => Some(Type::Bool),
            NodeKind::Variable(variable) => Some(self.variables[*variable].ty.clone()),
            NodeKind::Operator(op) if op.is_comparison() || op.is_logical() => Some(Type::Bool),
            NodeKind::Operator(op) if op.is_arithmetic() => {
                let left = self.type_of(tree.first(node)?)?;
                let right = self.type_of(tree.last(node)?)?;
                if left == Type::Decimal || right == Type::Decimal {
                    Some(Type::Decimal)
                } else {
                    Some(left)
                }
            }
            NodeKind::Operator(_)
            | NodeKind::Negate
            | NodeKind::Parenthesis
            | NodeKind::Increment { .. }
            | NodeKind::Decrement { .. } => self.type_of(tree.first(node)?),
            NodeKind::Call { returns, .. } => Some(returns.clone()),
            NodeKind::Cast(ty) => Some(ty.clone()),
            NodeKind::Link | NodeKind::Inline => self.type_of(tree.last(node)?),
            _ => None,
        }
    }

    /// Rescan the tree and refresh every variable's read and write occurrences
    pub fn rebuild_usages(&mut self) {
        for variable in self.variables.values_mut() {
            variable.reads.clear();
            variable.writes.clear();
        }

        let root = self.tree.root();

        for node in self.tree.descendants(root) {
            let id = match self.tree.kind(node) {
                NodeKind::Variable(id) => *id,
                _ => continue,
            };

            let written = self.tree.is_write_target(node);
            let consumed = !written
                || self
                    .tree
                    .parent(node)
                    .map(|parent| self.tree.kind(parent).is_increment_or_decrement())
                    .unwrap_or(false);

            let variable = &mut self.variables[id];
            if written {
                variable.writes.push(node);
            }
            if consumed {
                variable.reads.push(node);
            }
        }
    }

    /// Render the function body as text
    pub fn render(&self) -> String {
        Printer::new(self).render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Operator;

    #[test]
    fn test_predictable_variables_lists_locals_first() {
        let mut function = Function::new("f");
        let p = function.parameter("p", Type::Integer);
        let l = function.local("l", Type::Integer);
        let m = function.member("m", Type::Integer);

        assert_eq!(function.predictable_variables(), vec![l, p]);
        assert!(!function.is_predictable(m));
    }

    #[test]
    fn test_hidden_variables_are_locals() {
        let mut function = Function::new("f");
        let hidden = function.declare_hidden(Type::Bool);

        assert!(function.variable(hidden).hidden);
        assert!(function.locals().contains(&hidden));
    }

    #[test]
    fn test_rebuild_usages_classifies_reads_and_writes() {
        let mut function = Function::new("f");
        let x = function.local("x", Type::Integer);
        let tree = &mut function.tree;

        let one = tree.number(1);
        let store = tree.assign(x, one);
        tree.push(store);
        let bump = tree.increment(x, true);
        tree.push(bump);
        let read = tree.variable(x);
        let two = tree.number(2);
        let add = tree.action(Operator::AssignAdd, x, two);
        tree.push(add);
        let ret = tree.ret(Some(read));
        tree.push(ret);

        function.rebuild_usages();

        let variable = function.variable(x);
        assert_eq!(variable.writes.len(), 3);
        // The increment operand is consumed as well as written
        assert_eq!(variable.reads.len(), 2);
        assert!(variable.reads.contains(&read));
    }

    #[test]
    fn test_type_of_arithmetic_promotes_decimals() {
        let mut function = Function::new("f");
        let x = function.local("x", Type::Integer);
        let tree = &mut function.tree;
        let read = tree.variable(x);
        let half = tree.decimal(0.5);
        let product = tree.binary(Operator::Mul, read, half);

        assert_eq!(function.type_of(product), Some(Type::Decimal));
        assert_eq!(function.type_of(read), Some(Type::Integer));
    }
}
