//! Sable Core - Core types for the Sable compiler middle end
//!
//! This crate provides the data the optimizer works on:
//! - An arena-backed, parent-linked syntax tree
//! - Operators, numeric literals and static types
//! - Variables and the per-function scope
//! - Error types

pub mod ast;
pub mod entity;
pub mod error;
pub mod scope;
pub mod types;

// Re-export commonly used types
pub use ast::{Node, NodeId, NodeKind, Operator, Printer, SyntaxTree};
pub use entity::{EntityRef, PrimaryMap};
pub use error::{CoreError, Result};
pub use scope::{Function, Variable, VariableId, VariableKind};
pub use types::{Number, ObjectType, Type};
