//! Renders a function body as compact source text
//!
//! Top-level statements are printed one per line, nested statement lists on a
//! single line separated by `; `. Parentheses are derived from operator
//! precedence, so printing does not depend on `Parenthesis` nodes.

use crate::ast::{NodeId, NodeKind, Operator};
use crate::scope::Function;

pub struct Printer<'a> {
    function: &'a Function,
}

impl<'a> Printer<'a> {
    pub fn new(function: &'a Function) -> Self {
        Self { function }
    }

    /// Render the whole function body
    pub fn render(&self) -> String {
        let root = self.function.tree.root();
        self.statements(root).join("\n")
    }

    /// Render a single node
    pub fn node(&self, node: NodeId) -> String {
        let tree = &self.function.tree;

        match tree.kind(node) {
            NodeKind::Function | NodeKind::Block => self.block(node),
            NodeKind::If => format!(
                "if ({}) {}",
                self.condition(node),
                self.block_of(tree.body(node))
            ),
            NodeKind::ElseIf => format!(
                "else if ({}) {}",
                self.condition(node),
                self.block_of(tree.body(node))
            ),
            NodeKind::Else => format!("else {}", self.block_of(tree.body(node))),
            NodeKind::Loop => {
                if tree.is_forever_loop(node) {
                    return format!("loop {}", self.block_of(tree.body(node)));
                }

                let initialization = self.list_of(tree.loop_initialization(node));
                let action = self.list_of(tree.loop_action(node));
                format!(
                    "loop ({}; {}; {}) {}",
                    initialization,
                    self.condition(node),
                    action,
                    self.block_of(tree.body(node))
                )
            }
            NodeKind::Return => match tree.first(node) {
                Some(value) => format!("return {}", self.node(value)),
                None => "return".to_string(),
            },
            NodeKind::Inline => format!("inline {{ {} }}", self.statements(node).join("; ")),
            NodeKind::Number(value) => value.to_string(),
            NodeKind::Bool(value) => value.to_string(),
            NodeKind::Variable(id) => self.function.variable(*id).name.clone(),
            NodeKind::Operator(op) => self.operator(node, *op),
            NodeKind::Negate => format!("-{}", self.unary_operand(node)),
            NodeKind::Not => format!("!{}", self.unary_operand(node)),
            NodeKind::Parenthesis => format!("({})", self.joined(node, ", ")),
            NodeKind::Increment { post } => self.step(node, "++", *post),
            NodeKind::Decrement { post } => self.step(node, "--", *post),
            NodeKind::Call { name, .. } => format!("{}({})", name, self.joined(node, ", ")),
            NodeKind::Link => self.joined(node, "."),
            NodeKind::Cast(ty) => format!("({} as {})", self.joined(node, ""), ty),
            NodeKind::TypeTest { expected, result } => match result {
                Some(result) => format!(
                    "{} is {} {}",
                    self.joined(node, ""),
                    expected,
                    self.function.variable(*result).name
                ),
                None => format!("{} is {}", self.joined(node, ""), expected),
            },
            NodeKind::TypeTagOf => format!("typeof({})", self.joined(node, "")),
            NodeKind::TypeDescriptor(ty) => ty.to_string(),
        }
    }

    /// Statements of a list, with else-if and else glued to their chain
    fn statements(&self, list: NodeId) -> Vec<String> {
        let tree = &self.function.tree;
        let mut lines: Vec<String> = Vec::new();

        for &statement in tree.children(list) {
            let text = self.node(statement);

            match (tree.kind(statement), lines.last_mut()) {
                (NodeKind::ElseIf | NodeKind::Else, Some(last)) => {
                    last.push(' ');
                    last.push_str(&text);
                }
                _ => lines.push(text),
            }
        }

        lines
    }

    fn block(&self, block: NodeId) -> String {
        let statements = self.statements(block);
        if statements.is_empty() {
            "{ }".to_string()
        } else {
            format!("{{ {} }}", statements.join("; "))
        }
    }

    fn block_of(&self, block: Option<NodeId>) -> String {
        block.map(|block| self.block(block)).unwrap_or_default()
    }

    fn list_of(&self, block: Option<NodeId>) -> String {
        block
            .map(|block| self.statements(block).join(", "))
            .unwrap_or_default()
    }

    fn condition(&self, node: NodeId) -> String {
        let tree = &self.function.tree;
        match tree.condition_block(node) {
            Some(block) => self.statements(block).join("; "),
            None => String::new(),
        }
    }

    fn joined(&self, node: NodeId, separator: &str) -> String {
        self.function
            .tree
            .children(node)
            .iter()
            .map(|&child| self.node(child))
            .collect::<Vec<_>>()
            .join(separator)
    }

    fn step(&self, node: NodeId, symbol: &str, post: bool) -> String {
        let operand = self.joined(node, "");
        if post {
            format!("{}{}", operand, symbol)
        } else {
            format!("{}{}", symbol, operand)
        }
    }

    fn unary_operand(&self, node: NodeId) -> String {
        let tree = &self.function.tree;
        match tree.first(node) {
            Some(operand) if matches!(tree.kind(operand), NodeKind::Operator(_)) => {
                format!("({})", self.node(operand))
            }
            Some(operand) => self.node(operand),
            None => String::new(),
        }
    }

    fn operator(&self, node: NodeId, op: Operator) -> String {
        let tree = &self.function.tree;
        let (left, right) = match (tree.first(node), tree.last(node)) {
            (Some(left), Some(right)) => (left, right),
            _ => return op.symbol().to_string(),
        };

        format!(
            "{} {} {}",
            self.operand(left, op, false),
            op,
            self.operand(right, op, true)
        )
    }

    fn operand(&self, operand: NodeId, parent: Operator, right: bool) -> String {
        let text = self.node(operand);

        let child = match self.function.tree.kind(operand) {
            NodeKind::Operator(child) => *child,
            _ => return text,
        };

        let needs_parenthesis = if parent.is_assignment() {
            child.is_assignment()
        } else {
            child.precedence() < parent.precedence()
                || (right
                    && child.precedence() == parent.precedence()
                    && !(child == parent && parent.is_commutative()))
        };

        if needs_parenthesis {
            format!("({})", text)
        } else {
            text
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Type;

    #[test]
    fn test_precedence_parenthesis() {
        let mut function = Function::new("f");
        let a = function.local("a", Type::Integer);
        let tree = &mut function.tree;

        let x = tree.variable(a);
        let y = tree.variable(a);
        let one = tree.number(1);
        let sum = tree.binary(Operator::Add, y, one);
        let product = tree.binary(Operator::Mul, x, sum);
        let store = tree.assign(a, product);
        tree.push(store);

        assert_eq!(function.render(), "a = a * (a + 1)");
    }

    #[test]
    fn test_if_chain_on_one_line() {
        let mut function = Function::new("f");
        let a = function.local("a", Type::Integer);
        let tree = &mut function.tree;

        let condition = tree.boolean(true);
        let one = tree.number(1);
        let first = tree.assign(a, one);
        let two = tree.number(2);
        let second = tree.assign(a, two);
        let statement = tree.if_statement(condition, vec![first]);
        let otherwise = tree.else_branch(vec![second]);
        tree.push(statement);
        tree.push(otherwise);

        assert_eq!(function.render(), "if (true) { a = 1 } else { a = 2 }");
    }

    #[test]
    fn test_loop_rendering() {
        let mut function = Function::new("f");
        let i = function.local("i", Type::Integer);
        let tree = &mut function.tree;

        let zero = tree.number(0);
        let initialization = tree.assign(i, zero);
        let read = tree.variable(i);
        let five = tree.number(5);
        let condition = tree.binary(Operator::Lt, read, five);
        let one = tree.number(1);
        let action = tree.action(Operator::AssignAdd, i, one);
        let statement =
            tree.loop_statement(vec![initialization], Some(condition), vec![action], vec![]);
        tree.push(statement);

        assert_eq!(function.render(), "loop (i = 0; i < 5; i += 1) { }");
    }
}
