//! Sable Compiler - middle-end optimizer
//!
//! This crate rewrites the syntax tree of resolved Sable functions before code
//! generation: it propagates values, removes dead stores, resolves decidable
//! branches and unrolls small counting loops.

pub mod driver;
pub mod error;
pub mod optimizer;

// Re-export main types
pub use driver::{optimize_all, OptimizationSummary, Optimizer, OptimizerOptions};
pub use error::{CompileError, Result};

// Re-export optimizer types
pub use optimizer::{
    BranchResolver, ConstantFolder, DeadCodeEliminator, FinishingPass, LoopUnroller,
    StructuralNormalizer, SubstitutionEngine,
};
