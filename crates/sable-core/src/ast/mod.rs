//! Syntax tree definitions for Sable
//!
//! This module contains:
//! - Node kinds and the node arena
//! - Operators
//! - A text printer used by diagnostics and tests

pub mod node;
pub mod operator;
pub mod printer;
pub mod tree;

pub use node::{Node, NodeId, NodeKind};
pub use operator::Operator;
pub use printer::Printer;
pub use tree::SyntaxTree;
