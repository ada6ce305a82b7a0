//! Operators for Sable expressions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    // Comparison operators
    /// Equal (==)
    Eq,
    /// Not equal (!=)
    Ne,
    /// Greater than (>)
    Gt,
    /// Greater than or equal (>=)
    Ge,
    /// Less than (<)
    Lt,
    /// Less than or equal (<=)
    Le,

    // Arithmetic operators
    /// Addition (+)
    Add,
    /// Subtraction (-)
    Sub,
    /// Multiplication (*)
    Mul,
    /// Division (/)
    Div,
    /// Modulo (%)
    Mod,

    // Logical operators
    /// Logical AND (&&)
    And,
    /// Logical OR (||)
    Or,

    // Assignment operators
    /// Assign (=)
    Assign,
    /// Add-assign (+=)
    AssignAdd,
    /// Subtract-assign (-=)
    AssignSub,
    /// Multiply-assign (*=)
    AssignMul,
    /// Divide-assign (/=)
    AssignDiv,
    /// Modulo-assign (%=)
    AssignMod,
}

impl Operator {
    /// Returns true if this is a comparison operator
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Operator::Eq | Operator::Ne | Operator::Gt | Operator::Ge | Operator::Lt | Operator::Le
        )
    }

    /// Returns true if this is an arithmetic operator
    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            Operator::Add | Operator::Sub | Operator::Mul | Operator::Div | Operator::Mod
        )
    }

    /// Returns true if this is a logical operator
    pub fn is_logical(&self) -> bool {
        matches!(self, Operator::And | Operator::Or)
    }

    /// Returns true for `=` and every compound assignment
    pub fn is_assignment(&self) -> bool {
        matches!(
            self,
            Operator::Assign
                | Operator::AssignAdd
                | Operator::AssignSub
                | Operator::AssignMul
                | Operator::AssignDiv
                | Operator::AssignMod
        )
    }

    /// Returns true for compound assignments such as `+=`
    pub fn is_action(&self) -> bool {
        self.is_assignment() && *self != Operator::Assign
    }

    /// Returns true if swapping the operands preserves the result
    pub fn is_commutative(&self) -> bool {
        matches!(
            self,
            Operator::Add | Operator::Mul | Operator::Eq | Operator::Ne | Operator::And | Operator::Or
        )
    }

    /// Arithmetic operator applied by a compound assignment
    pub fn action_base(&self) -> Option<Operator> {
        match self {
            Operator::AssignAdd => Some(Operator::Add),
            Operator::AssignSub => Some(Operator::Sub),
            Operator::AssignMul => Some(Operator::Mul),
            Operator::AssignDiv => Some(Operator::Div),
            Operator::AssignMod => Some(Operator::Mod),
            _ => None,
        }
    }

    /// Compound assignment applying this arithmetic operator
    pub fn to_action(&self) -> Option<Operator> {
        match self {
            Operator::Add => Some(Operator::AssignAdd),
            Operator::Sub => Some(Operator::AssignSub),
            Operator::Mul => Some(Operator::AssignMul),
            Operator::Div => Some(Operator::AssignDiv),
            Operator::Mod => Some(Operator::AssignMod),
            _ => None,
        }
    }

    /// Comparison that holds after swapping its operands (`a < b` is `b > a`)
    pub fn mirrored(&self) -> Operator {
        match self {
            Operator::Gt => Operator::Lt,
            Operator::Ge => Operator::Le,
            Operator::Lt => Operator::Gt,
            Operator::Le => Operator::Ge,
            other => *other,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Mod => "%",
            Operator::And => "&&",
            Operator::Or => "||",
            Operator::Assign => "=",
            Operator::AssignAdd => "+=",
            Operator::AssignSub => "-=",
            Operator::AssignMul => "*=",
            Operator::AssignDiv => "/=",
            Operator::AssignMod => "%=",
        }
    }

    /// Binding strength used when printing; higher binds tighter
    pub fn precedence(&self) -> u8 {
        match self {
            Operator::Mul | Operator::Div | Operator::Mod => 6,
            Operator::Add | Operator::Sub => 5,
            Operator::Gt | Operator::Ge | Operator::Lt | Operator::Le => 4,
            Operator::Eq | Operator::Ne => 3,
            Operator::And => 2,
            Operator::Or => 1,
            _ => 0,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
