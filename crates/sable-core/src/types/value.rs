//! Numeric literal values
//!
//! `Number` is the exact value carried by number literals. Integer arithmetic
//! is checked: an overflowing or inexact integer operation yields `None` so
//! callers keep the operands apart instead of folding them.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Numeric literal value
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Number {
    /// Exact integer
    Integer(i64),
    /// Floating point value
    Decimal(f64),
}

impl Number {
    pub fn is_integer(&self) -> bool {
        matches!(self, Number::Integer(_))
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Number::Integer(value) => *value == 0,
            Number::Decimal(value) => *value == 0.0,
        }
    }

    pub fn is_one(&self) -> bool {
        match self {
            Number::Integer(value) => *value == 1,
            Number::Decimal(value) => *value == 1.0,
        }
    }

    pub fn is_negative(&self) -> bool {
        match self {
            Number::Integer(value) => *value < 0,
            Number::Decimal(value) => *value < 0.0,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Number::Integer(value) => Some(*value),
            Number::Decimal(_) => None,
        }
    }

    pub fn as_decimal(&self) -> f64 {
        match self {
            Number::Integer(value) => *value as f64,
            Number::Decimal(value) => *value,
        }
    }

    pub fn negate(&self) -> Option<Number> {
        match self {
            Number::Integer(value) => value.checked_neg().map(Number::Integer),
            Number::Decimal(value) => Some(Number::Decimal(-value)),
        }
    }

    pub fn abs(&self) -> Option<Number> {
        if self.is_negative() {
            self.negate()
        } else {
            Some(*self)
        }
    }

    pub fn add(&self, other: &Number) -> Option<Number> {
        match (self, other) {
            (Number::Integer(l), Number::Integer(r)) => l.checked_add(*r).map(Number::Integer),
            (l, r) => Some(Number::Decimal(l.as_decimal() + r.as_decimal())),
        }
    }

    pub fn subtract(&self, other: &Number) -> Option<Number> {
        match (self, other) {
            (Number::Integer(l), Number::Integer(r)) => l.checked_sub(*r).map(Number::Integer),
            (l, r) => Some(Number::Decimal(l.as_decimal() - r.as_decimal())),
        }
    }

    pub fn multiply(&self, other: &Number) -> Option<Number> {
        match (self, other) {
            (Number::Integer(l), Number::Integer(r)) => l.checked_mul(*r).map(Number::Integer),
            (l, r) => Some(Number::Decimal(l.as_decimal() * r.as_decimal())),
        }
    }

    /// Divide, refusing division by zero and inexact integer division
    pub fn divide(&self, other: &Number) -> Option<Number> {
        if other.is_zero() {
            return None;
        }

        match (self, other) {
            (Number::Integer(l), Number::Integer(r)) => {
                if l.checked_rem(*r)? != 0 {
                    return None;
                }
                l.checked_div(*r).map(Number::Integer)
            }
            (l, r) => Some(Number::Decimal(l.as_decimal() / r.as_decimal())),
        }
    }

    /// Integer remainder; decimals are never folded
    pub fn remainder(&self, other: &Number) -> Option<Number> {
        match (self, other) {
            (Number::Integer(l), Number::Integer(r)) if *r != 0 => {
                l.checked_rem(*r).map(Number::Integer)
            }
            _ => None,
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Number::Integer(l), Number::Integer(r)) => l == r,
            (l, r) => l.as_decimal() == r.as_decimal(),
        }
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Number::Integer(l), Number::Integer(r)) => l.partial_cmp(r),
            (l, r) => l.as_decimal().partial_cmp(&r.as_decimal()),
        }
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number::Integer(value)
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Number::Decimal(value)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Integer(value) => write!(f, "{}", value),
            Number::Decimal(value) => write!(f, "{:?}", value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_arithmetic() {
        let a = Number::Integer(7);
        let b = Number::Integer(2);
        assert_eq!(a.add(&b), Some(Number::Integer(9)));
        assert_eq!(a.subtract(&b), Some(Number::Integer(5)));
        assert_eq!(a.multiply(&b), Some(Number::Integer(14)));
    }

    #[test]
    fn test_integer_division_must_be_exact() {
        assert_eq!(
            Number::Integer(8).divide(&Number::Integer(2)),
            Some(Number::Integer(4))
        );
        assert_eq!(Number::Integer(7).divide(&Number::Integer(2)), None);
        assert_eq!(Number::Integer(7).divide(&Number::Integer(0)), None);
    }

    #[test]
    fn test_decimal_promotion() {
        let result = Number::Integer(1).add(&Number::Decimal(0.5));
        assert_eq!(result, Some(Number::Decimal(1.5)));
        assert_eq!(
            Number::Integer(1).divide(&Number::Decimal(4.0)),
            Some(Number::Decimal(0.25))
        );
    }

    #[test]
    fn test_overflow_does_not_combine() {
        assert_eq!(Number::Integer(i64::MAX).add(&Number::Integer(1)), None);
        assert_eq!(Number::Integer(i64::MIN).negate(), None);
    }

    #[test]
    fn test_numeric_equality_across_kinds() {
        assert_eq!(Number::Integer(2), Number::Decimal(2.0));
        assert!(Number::Integer(-1) < Number::Decimal(0.5));
    }

    #[test]
    fn test_display() {
        assert_eq!(Number::Integer(-3).to_string(), "-3");
        assert_eq!(Number::Decimal(2.0).to_string(), "2.0");
    }
}
