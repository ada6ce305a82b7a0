//! Term algebra
//!
//! A term is one normalized summand of an arithmetic expression. Binary
//! operations return `None` when the two terms cannot be merged into a single
//! term; the caller then keeps them apart. The zero and one identities are
//! checked before any shape-specific rule.

use sable_core::{NodeId, Number, VariableId};

/// Normalized summand
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    /// Literal number
    Constant(Number),
    /// `coefficient * variable^power`
    Linear {
        variable: VariableId,
        coefficient: Number,
        power: i32,
    },
    /// `coefficient * v1^p1 * v2^p2 ...` over at least two variables, sorted by variable
    Product {
        coefficient: Number,
        factors: Vec<(VariableId, i32)>,
    },
    /// Subtree the algebra does not look into
    Opaque { node: NodeId, negative: bool },
}

impl Term {
    pub fn constant(value: i64) -> Self {
        Term::Constant(Number::Integer(value))
    }

    pub fn variable(variable: VariableId) -> Self {
        Term::Linear {
            variable,
            coefficient: Number::Integer(1),
            power: 1,
        }
    }

    pub fn opaque(node: NodeId) -> Self {
        Term::Opaque {
            node,
            negative: false,
        }
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, Term::Constant(value) if value.is_zero())
    }

    pub fn is_one(&self) -> bool {
        matches!(self, Term::Constant(value) if value.is_one())
    }

    pub fn is_opaque(&self) -> bool {
        matches!(self, Term::Opaque { .. })
    }

    pub fn is_negative(&self) -> bool {
        match self {
            Term::Constant(value) => value.is_negative(),
            Term::Linear { coefficient, .. } | Term::Product { coefficient, .. } => {
                coefficient.is_negative()
            }
            Term::Opaque { negative, .. } => *negative,
        }
    }

    /// Returns true if the variable occurs in the term at all
    pub fn mentions(&self, target: VariableId) -> bool {
        match self {
            Term::Linear { variable, .. } => *variable == target,
            Term::Product { factors, .. } => factors.iter().any(|(v, _)| *v == target),
            Term::Constant(_) | Term::Opaque { .. } => false,
        }
    }

    pub fn negate(&self) -> Option<Term> {
        Some(match self {
            Term::Constant(value) => Term::Constant(value.negate()?),
            Term::Linear {
                variable,
                coefficient,
                power,
            } => Term::Linear {
                variable: *variable,
                coefficient: coefficient.negate()?,
                power: *power,
            },
            Term::Product {
                coefficient,
                factors,
            } => Term::Product {
                coefficient: coefficient.negate()?,
                factors: factors.clone(),
            },
            Term::Opaque { node, negative } => Term::Opaque {
                node: *node,
                negative: !negative,
            },
        })
    }

    pub fn add(&self, other: &Term) -> Option<Term> {
        if other.is_zero() {
            return Some(self.clone());
        }
        if self.is_zero() {
            return Some(other.clone());
        }

        match (self, other) {
            (Term::Constant(l), Term::Constant(r)) => l.add(r).map(Term::Constant),
            (
                Term::Linear {
                    variable: lv,
                    coefficient: lc,
                    power: lp,
                },
                Term::Linear {
                    variable: rv,
                    coefficient: rc,
                    power: rp,
                },
            ) if lv == rv && lp == rp => Some(linear(*lv, lc.add(rc)?, *lp)),
            (
                Term::Product {
                    coefficient: lc,
                    factors: lf,
                },
                Term::Product {
                    coefficient: rc,
                    factors: rf,
                },
            ) if lf == rf => Some(product(lc.add(rc)?, lf.clone())),
            _ => None,
        }
    }

    pub fn subtract(&self, other: &Term) -> Option<Term> {
        if other.is_zero() {
            return Some(self.clone());
        }
        if self.is_zero() {
            return other.negate();
        }

        match (self, other) {
            (Term::Constant(l), Term::Constant(r)) => l.subtract(r).map(Term::Constant),
            (
                Term::Linear {
                    variable: lv,
                    coefficient: lc,
                    power: lp,
                },
                Term::Linear {
                    variable: rv,
                    coefficient: rc,
                    power: rp,
                },
            ) if lv == rv && lp == rp => Some(linear(*lv, lc.subtract(rc)?, *lp)),
            (
                Term::Product {
                    coefficient: lc,
                    factors: lf,
                },
                Term::Product {
                    coefficient: rc,
                    factors: rf,
                },
            ) if lf == rf => Some(product(lc.subtract(rc)?, lf.clone())),
            _ => None,
        }
    }

    pub fn multiply(&self, other: &Term) -> Option<Term> {
        if self.is_zero() || other.is_zero() {
            return Some(Term::constant(0));
        }
        if self.is_one() {
            return Some(other.clone());
        }
        if other.is_one() {
            return Some(self.clone());
        }

        match (self, other) {
            (Term::Opaque { .. }, _) | (_, Term::Opaque { .. }) => None,
            (Term::Constant(l), Term::Constant(r)) => l.multiply(r).map(Term::Constant),
            (Term::Constant(scale), term) | (term, Term::Constant(scale)) => term.scale(scale),
            (Term::Linear { .. } | Term::Product { .. }, _) => {
                let (lc, mut factors) = self.monomial()?;
                let (rc, other_factors) = other.monomial()?;

                for (variable, power) in other_factors {
                    merge_factor(&mut factors, variable, power);
                }

                Some(product(lc.multiply(&rc)?, factors))
            }
        }
    }

    pub fn divide(&self, other: &Term) -> Option<Term> {
        if other.is_zero() {
            return None;
        }
        if self.is_zero() {
            return Some(Term::constant(0));
        }
        if other.is_one() {
            return Some(self.clone());
        }

        match (self, other) {
            (Term::Constant(l), Term::Constant(r)) => l.divide(r).map(Term::Constant),
            (
                Term::Linear {
                    variable,
                    coefficient,
                    power,
                },
                Term::Constant(divisor),
            ) => Some(linear(*variable, coefficient.divide(divisor)?, *power)),
            (
                Term::Product {
                    coefficient,
                    factors,
                },
                Term::Constant(divisor),
            ) => Some(product(coefficient.divide(divisor)?, factors.clone())),
            (
                Term::Linear {
                    variable: lv,
                    coefficient: lc,
                    power: lp,
                },
                Term::Linear {
                    variable: rv,
                    coefficient: rc,
                    power: rp,
                },
            ) if lv == rv => Some(linear(*lv, lc.divide(rc)?, lp.checked_sub(*rp)?)),
            _ => None,
        }
    }

    /// Multiply the coefficient of a variable term by a number
    fn scale(&self, scale: &Number) -> Option<Term> {
        match self {
            Term::Linear {
                variable,
                coefficient,
                power,
            } => Some(linear(*variable, coefficient.multiply(scale)?, *power)),
            Term::Product {
                coefficient,
                factors,
            } => Some(product(coefficient.multiply(scale)?, factors.clone())),
            Term::Constant(value) => value.multiply(scale).map(Term::Constant),
            Term::Opaque { .. } => None,
        }
    }

    /// Coefficient and factors of a variable term
    fn monomial(&self) -> Option<(Number, Vec<(VariableId, i32)>)> {
        match self {
            Term::Linear {
                variable,
                coefficient,
                power,
            } => Some((*coefficient, vec![(*variable, *power)])),
            Term::Product {
                coefficient,
                factors,
            } => Some((*coefficient, factors.clone())),
            _ => None,
        }
    }
}

fn linear(variable: VariableId, coefficient: Number, power: i32) -> Term {
    if coefficient.is_zero() {
        return Term::constant(0);
    }
    if power == 0 {
        return Term::Constant(coefficient);
    }

    Term::Linear {
        variable,
        coefficient,
        power,
    }
}

/// Build the simplest term for a monomial
fn product(coefficient: Number, mut factors: Vec<(VariableId, i32)>) -> Term {
    if coefficient.is_zero() {
        return Term::constant(0);
    }

    factors.retain(|(_, power)| *power != 0);
    factors.sort_by_key(|(variable, _)| *variable);

    match factors.as_slice() {
        [] => Term::Constant(coefficient),
        [(variable, power)] => linear(*variable, coefficient, *power),
        _ => Term::Product {
            coefficient,
            factors,
        },
    }
}

fn merge_factor(factors: &mut Vec<(VariableId, i32)>, variable: VariableId, power: i32) {
    match factors.iter_mut().find(|(v, _)| *v == variable) {
        Some((_, existing)) => *existing += power,
        None => factors.push((variable, power)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_core::EntityRef;

    fn x() -> VariableId {
        VariableId::new(0)
    }

    fn y() -> VariableId {
        VariableId::new(1)
    }

    fn lin(variable: VariableId, coefficient: i64, power: i32) -> Term {
        Term::Linear {
            variable,
            coefficient: Number::Integer(coefficient),
            power,
        }
    }

    #[test]
    fn test_identities_come_first() {
        let opaque = Term::opaque(sable_core::NodeId::new(7));
        assert_eq!(opaque.add(&Term::constant(0)), Some(opaque.clone()));
        assert_eq!(opaque.multiply(&Term::constant(1)), Some(opaque.clone()));
        assert_eq!(opaque.multiply(&Term::constant(0)), Some(Term::constant(0)));
        assert_eq!(opaque.add(&opaque), None);
    }

    #[test]
    fn test_linear_addition_requires_same_variable_and_power() {
        assert_eq!(lin(x(), 2, 1).add(&lin(x(), 3, 1)), Some(lin(x(), 5, 1)));
        assert_eq!(lin(x(), 2, 1).add(&lin(x(), 3, 2)), None);
        assert_eq!(lin(x(), 2, 1).add(&lin(y(), 3, 1)), None);
        assert_eq!(lin(x(), 2, 2).add(&lin(x(), 1, 2)), Some(lin(x(), 3, 2)));
    }

    #[test]
    fn test_linear_cancellation_yields_zero_constant() {
        assert_eq!(lin(x(), 4, 1).subtract(&lin(x(), 4, 1)), Some(Term::constant(0)));
    }

    #[test]
    fn test_add_then_subtract_round_trip() {
        let terms = [
            Term::constant(7),
            lin(x(), 3, 1),
            product(Number::Integer(2), vec![(x(), 1), (y(), 1)]),
        ];

        for term in &terms {
            let other = match term {
                Term::Constant(_) => Term::constant(5),
                Term::Linear { .. } => lin(x(), 9, 1),
                _ => product(Number::Integer(-4), vec![(y(), 1), (x(), 1)]),
            };
            let sum = term.add(&other).unwrap();
            assert_eq!(sum.subtract(&other).as_ref(), Some(term));
        }
    }

    #[test]
    fn test_multiply_same_variable_sums_powers() {
        assert_eq!(lin(x(), 2, 1).multiply(&lin(x(), 3, 1)), Some(lin(x(), 6, 2)));
        assert_eq!(lin(x(), 2, 1).multiply(&lin(x(), 3, -1)), Some(Term::constant(6)));
    }

    #[test]
    fn test_multiply_different_variables_promotes_to_product() {
        let result = lin(y(), 2, 1).multiply(&lin(x(), 3, 1)).unwrap();
        assert_eq!(
            result,
            Term::Product {
                coefficient: Number::Integer(6),
                factors: vec![(x(), 1), (y(), 1)],
            }
        );

        // Dividing the factor back out normalizes to a linear term
        let back = result.multiply(&lin(y(), 1, -1)).unwrap();
        assert_eq!(back, lin(x(), 6, 1));
    }

    #[test]
    fn test_product_addition_requires_identical_factors() {
        let a = product(Number::Integer(1), vec![(x(), 1), (y(), 1)]);
        let b = product(Number::Integer(2), vec![(y(), 1), (x(), 1)]);
        let c = product(Number::Integer(2), vec![(x(), 2), (y(), 1)]);
        assert_eq!(a.add(&b), Some(product(Number::Integer(3), vec![(x(), 1), (y(), 1)])));
        assert_eq!(a.add(&c), None);
    }

    #[test]
    fn test_division_exactness() {
        assert_eq!(lin(x(), 6, 1).divide(&Term::constant(3)), Some(lin(x(), 2, 1)));
        assert_eq!(lin(x(), 6, 1).divide(&Term::constant(4)), None);
        assert_eq!(lin(x(), 6, 2).divide(&lin(x(), 2, 1)), Some(lin(x(), 3, 1)));
        assert_eq!(lin(x(), 6, 1).divide(&lin(x(), 3, 1)), Some(Term::constant(2)));
        assert_eq!(Term::constant(1).divide(&Term::constant(0)), None);
    }

    #[test]
    fn test_negate_flips_opaque_sign() {
        let opaque = Term::opaque(sable_core::NodeId::new(3));
        assert!(opaque.negate().unwrap().is_negative());
        assert_eq!(lin(x(), 2, 1).negate(), Some(lin(x(), -2, 1)));
    }
}
