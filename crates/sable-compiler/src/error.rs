//! Optimizer error types
//!
//! Every variant is an internal defect: a type-checked, scope-resolved input
//! never produces one. Shapes the optimizer merely cannot improve are not
//! errors and are only reported through `tracing` diagnostics.

use sable_core::{CoreError, NodeId};
use thiserror::Error;

/// Optimizer error
#[derive(Error, Debug)]
pub enum CompileError {
    /// An edit occurrence has no enclosing assignment or increment
    #[error("Could not find the statement owning edit {0:?}")]
    EditRootNotFound(NodeId),

    /// A dependency was removed from an edit that never registered it
    #[error("Edit {edit:?} does not list {read:?} as a dependency")]
    DependencyNotRegistered { edit: NodeId, read: NodeId },

    /// The optimizer kept restarting without settling
    #[error("Optimization of '{0}' did not converge")]
    DidNotConverge(String),

    /// Structural misuse of the syntax tree
    #[error("Syntax tree error: {0}")]
    Tree(#[from] CoreError),

    /// Invalid optimizer options
    #[error("Invalid options: {0}")]
    InvalidOptions(String),
}

/// Result type for optimizer operations
pub type Result<T> = std::result::Result<T, CompileError>;
