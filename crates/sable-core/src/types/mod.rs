//! Type system for Sable
//!
//! This module contains:
//! - Numeric literal values
//! - Static types attached to variables and expressions

pub mod data_type;
pub mod value;

pub use data_type::{ObjectType, Type};
pub use value::Number;
