//! Conversion between expression subtrees and term lists

use crate::error::Result;
use crate::optimizer::term::Term;
use sable_core::{NodeId, NodeKind, Number, Operator, SyntaxTree, VariableId};

/// Break an expression into a simplified list of summands.
///
/// Anything the algebra cannot look into becomes an opaque term pointing at
/// the original node; the node is only copied when the list is rebuilt.
pub fn decompose(tree: &mut SyntaxTree, expression: NodeId) -> Vec<Term> {
    match tree.kind(expression).clone() {
        NodeKind::Number(value) => vec![Term::Constant(value)],
        NodeKind::Variable(variable) => vec![Term::variable(variable)],
        NodeKind::Parenthesis if tree.children(expression).len() == 1 => {
            match tree.first(expression) {
                Some(inner) => decompose(tree, inner),
                None => vec![Term::opaque(expression)],
            }
        }
        NodeKind::Negate => {
            let inner = match tree.first(expression) {
                Some(inner) => decompose(tree, inner),
                None => return vec![Term::opaque(expression)],
            };
            negate_all(&inner).unwrap_or_else(|| vec![Term::opaque(expression)])
        }
        NodeKind::Operator(op) => decompose_operator(tree, expression, op),
        _ => vec![Term::opaque(expression)],
    }
}

fn decompose_operator(tree: &mut SyntaxTree, expression: NodeId, op: Operator) -> Vec<Term> {
    let (left, right) = match (tree.first(expression), tree.last(expression)) {
        (Some(left), Some(right)) if left != right => (left, right),
        _ => return vec![Term::opaque(expression)],
    };

    match op {
        Operator::Add => {
            let mut terms = decompose(tree, left);
            terms.extend(decompose(tree, right));
            simplify(terms)
        }
        Operator::Sub => {
            let mut terms = decompose(tree, left);
            let right_terms = decompose(tree, right);
            match negate_all(&right_terms) {
                Some(negated) => {
                    terms.extend(negated);
                    simplify(terms)
                }
                None => vec![Term::opaque(expression)],
            }
        }
        Operator::Mul => {
            let left_terms = decompose(tree, left);
            let right_terms = decompose(tree, right);
            let mut terms = Vec::with_capacity(left_terms.len() * right_terms.len());

            for l in &left_terms {
                for r in &right_terms {
                    match l.multiply(r) {
                        Some(term) => terms.push(term),
                        None => {
                            let l = reconstruct(tree, std::slice::from_ref(l));
                            let r = reconstruct(tree, std::slice::from_ref(r));
                            let node = tree.binary(Operator::Mul, l, r);
                            terms.push(Term::opaque(node));
                        }
                    }
                }
            }

            simplify(terms)
        }
        Operator::Div => {
            let left_terms = decompose(tree, left);
            let right_terms = decompose(tree, right);

            match (left_terms.as_slice(), right_terms.as_slice()) {
                ([l], [r]) => match l.divide(r) {
                    Some(quotient) => vec![quotient],
                    None => vec![Term::opaque(expression)],
                },
                _ => vec![Term::opaque(expression)],
            }
        }
        _ => vec![Term::opaque(expression)],
    }
}

/// Negate every term, failing if any coefficient cannot be negated
pub fn negate_all(terms: &[Term]) -> Option<Vec<Term>> {
    terms.iter().map(Term::negate).collect()
}

/// Merge every pair of combinable summands.
///
/// Each term is added into every later term it combines with; the merged term
/// takes the earlier position and scanning resumes from the same spot.
pub fn simplify(mut terms: Vec<Term>) -> Vec<Term> {
    let mut i = 0;

    while i < terms.len() {
        let mut j = i + 1;

        while j < terms.len() {
            match terms[i].add(&terms[j]) {
                Some(sum) => {
                    terms[i] = sum;
                    terms.remove(j);
                }
                None => j += 1,
            }
        }

        i += 1;
    }

    terms
}

/// Build a detached expression equal to the sum of the terms
pub fn reconstruct(tree: &mut SyntaxTree, terms: &[Term]) -> NodeId {
    let mut result: Option<NodeId> = None;

    for term in terms.iter().filter(|term| !term.is_zero()) {
        let (negative, magnitude) = build_magnitude(tree, term);

        result = Some(match result {
            None if negative => {
                let literal = match tree.kind(magnitude) {
                    NodeKind::Number(value) => value.negate(),
                    _ => None,
                };

                match literal {
                    Some(value) => {
                        tree.set_kind(magnitude, NodeKind::Number(value));
                        magnitude
                    }
                    None => tree.negate(magnitude),
                }
            }
            None => magnitude,
            Some(sum) => {
                let op = if negative { Operator::Sub } else { Operator::Add };
                tree.binary(op, sum, magnitude)
            }
        });
    }

    result.unwrap_or_else(|| tree.number(0))
}

/// Sign and absolute-value node of a term
fn build_magnitude(tree: &mut SyntaxTree, term: &Term) -> (bool, NodeId) {
    match term {
        Term::Constant(value) => match value.abs() {
            Some(magnitude) if value.is_negative() => (true, tree.literal(magnitude)),
            _ => (false, tree.literal(*value)),
        },
        Term::Linear {
            variable,
            coefficient,
            power,
        } => monomial(tree, *coefficient, &[(*variable, *power)]),
        Term::Product {
            coefficient,
            factors,
        } => monomial(tree, *coefficient, factors),
        Term::Opaque { node, negative } => (*negative, tree.clone_subtree(*node)),
    }
}

fn monomial(tree: &mut SyntaxTree, coefficient: Number, factors: &[(VariableId, i32)]) -> (bool, NodeId) {
    let (negative, magnitude) = match coefficient.abs() {
        Some(magnitude) => (coefficient.is_negative(), magnitude),
        None => (false, coefficient),
    };

    let numerator = chain(tree, factors.iter().filter(|(_, power)| *power > 0));
    let denominator = chain(tree, factors.iter().filter(|(_, power)| *power < 0));

    let base = match (numerator, denominator) {
        (Some(numerator), None) => numerator,
        (numerator, Some(denominator)) => {
            let numerator = numerator.unwrap_or_else(|| tree.number(1));
            tree.binary(Operator::Div, numerator, denominator)
        }
        (None, None) => return (negative, tree.literal(magnitude)),
    };

    if magnitude.is_one() {
        return (negative, base);
    }

    let scale = tree.literal(magnitude);
    (negative, tree.binary(Operator::Mul, base, scale))
}

/// `v * v * w ...` for the absolute powers of the factors
fn chain<'a>(
    tree: &mut SyntaxTree,
    factors: impl Iterator<Item = &'a (VariableId, i32)>,
) -> Option<NodeId> {
    let mut result: Option<NodeId> = None;

    for (variable, power) in factors {
        for _ in 0..power.unsigned_abs() {
            let node = tree.variable(*variable);
            result = Some(match result {
                Some(product) => tree.binary(Operator::Mul, product, node),
                None => node,
            });
        }
    }

    result
}

/// Rebuild an expression in its simplified form, returned detached
pub fn simplified_value(tree: &mut SyntaxTree, expression: NodeId) -> NodeId {
    let terms = decompose(tree, expression);
    reconstruct(tree, &terms)
}

/// Replace every outermost arithmetic expression below `root` by its simplified form.
///
/// Returns the number of rewritten expressions.
pub fn simplify_expressions(tree: &mut SyntaxTree, root: NodeId) -> Result<usize> {
    let mut expressions = Vec::new();
    top_level_arithmetic(tree, root, &mut expressions);

    for &expression in &expressions {
        let simplified = simplified_value(tree, expression);
        tree.replace(expression, simplified)?;
    }

    Ok(expressions.len())
}

fn top_level_arithmetic(tree: &SyntaxTree, node: NodeId, found: &mut Vec<NodeId>) {
    match tree.kind(node) {
        NodeKind::Operator(op) if op.is_arithmetic() => found.push(node),
        _ => {
            for &child in tree.children(node) {
                top_level_arithmetic(tree, child, found);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_core::{Function, Type};

    fn render(function: &Function, node: NodeId) -> String {
        sable_core::Printer::new(function).node(node)
    }

    #[test]
    fn test_like_terms_are_collected() {
        let mut function = Function::new("f");
        let a = function.local("a", Type::Integer);
        let tree = &mut function.tree;

        let first = tree.variable(a);
        let two = tree.number(2);
        let partial = tree.binary(Operator::Add, first, two);
        let second = tree.variable(a);
        let expression = tree.binary(Operator::Add, partial, second);

        let simplified = simplified_value(tree, expression);
        assert_eq!(render(&function, simplified), "a * 2 + 2");
    }

    #[test]
    fn test_simplify_is_idempotent() {
        let mut function = Function::new("f");
        let a = function.local("a", Type::Integer);
        let b = function.local("b", Type::Integer);
        let tree = &mut function.tree;

        let terms = vec![
            Term::variable(a),
            Term::constant(3),
            Term::variable(b),
            Term::variable(a),
            Term::constant(-1),
        ];

        let once = simplify(terms);
        let twice = simplify(once.clone());
        assert_eq!(once, twice);
        assert_eq!(once.len(), 3);

        let node = reconstruct(tree, &once);
        assert_eq!(render(&function, node), "a * 2 + 2 + b");
    }

    #[test]
    fn test_cross_product_keeps_opaque_pairs() {
        let mut function = Function::new("f");
        let x = function.local("x", Type::Integer);
        let tree = &mut function.tree;

        let call = tree.call("g", Type::Integer, vec![]);
        let read = tree.variable(x);
        let one = tree.number(1);
        let sum = tree.binary(Operator::Add, read, one);
        let product = tree.binary(Operator::Mul, sum, call);

        let terms = decompose(tree, product);
        assert_eq!(terms.len(), 2);
        assert!(terms.iter().all(Term::is_opaque));

        let rebuilt = reconstruct(tree, &terms);
        assert_eq!(render(&function, rebuilt), "x * g() + g()");
    }

    #[test]
    fn test_negative_first_term_and_powers() {
        let mut function = Function::new("f");
        let x = function.local("x", Type::Integer);
        let tree = &mut function.tree;

        let terms = vec![
            Term::Linear {
                variable: x,
                coefficient: Number::Integer(-3),
                power: 2,
            },
            Term::Linear {
                variable: x,
                coefficient: Number::Integer(1),
                power: -1,
            },
            Term::constant(-4),
        ];

        let node = reconstruct(tree, &terms);
        assert_eq!(render(&function, node), "-(x * x * 3) + 1 / x - 4");
    }

    #[test]
    fn test_all_zero_terms_rebuild_as_zero() {
        let mut function = Function::new("f");
        let tree = &mut function.tree;

        let node = reconstruct(tree, &[Term::constant(0)]);
        assert_eq!(render(&function, node), "0");
    }

    #[test]
    fn test_inexact_division_stays_opaque() {
        let mut function = Function::new("f");
        let x = function.local("x", Type::Integer);
        let tree = &mut function.tree;

        let read = tree.variable(x);
        let three = tree.number(3);
        let product = tree.binary(Operator::Mul, read, three);
        let two = tree.number(2);
        let quotient = tree.binary(Operator::Div, product, two);

        let terms = decompose(tree, quotient);
        assert_eq!(terms, vec![Term::opaque(quotient)]);
    }

    #[test]
    fn test_subtraction_cancels_to_zero() {
        let mut function = Function::new("f");
        let x = function.local("x", Type::Integer);
        let tree = &mut function.tree;

        let left = tree.variable(x);
        let right = tree.variable(x);
        let difference = tree.binary(Operator::Sub, left, right);

        let node = simplified_value(tree, difference);
        assert_eq!(render(&function, node), "0");
    }

    #[test]
    fn test_outermost_expressions_are_simplified_in_place() {
        let mut function = Function::new("f");
        let a = function.local("a", Type::Integer);
        let x = function.local("x", Type::Integer);
        let tree = &mut function.tree;

        let first = tree.variable(a);
        let one = tree.number(1);
        let partial = tree.binary(Operator::Add, first, one);
        let second = tree.variable(a);
        let sum = tree.binary(Operator::Add, partial, second);
        let store = tree.assign(x, sum);
        tree.push(store);
        let read = tree.variable(x);
        let ret = tree.ret(Some(read));
        tree.push(ret);

        let root = tree.root();
        let rewritten = simplify_expressions(tree, root).unwrap();

        assert_eq!(rewritten, 1);
        assert_eq!(function.render(), "x = a * 2 + 1\nreturn x");
    }
}
