//! Error types for Sable Core

use crate::ast::NodeId;
use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Node {0:?} has no parent")]
    Detached(NodeId),

    #[error("Node {0:?} is not a child of {1:?}")]
    NotAChild(NodeId, NodeId),

    #[error("Unexpected node layout: {0}")]
    UnexpectedLayout(String),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
