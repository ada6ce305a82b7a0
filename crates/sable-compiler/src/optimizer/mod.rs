//! Optimization module
//!
//! This module provides the passes the driver combines: the term algebra and
//! its collector, reference and edit analysis, substitution, folding, branch
//! resolution, unrolling and the structural rewrites around them.

pub mod branch_resolver;
pub mod collector;
pub mod constant_folding;
pub mod cost;
pub mod dead_code_elimination;
pub mod edits;
pub mod finishing;
pub mod loop_unrolling;
pub mod normalizer;
pub mod references;
pub mod substitution;
pub mod term;

// Re-export for convenience
pub use branch_resolver::{BranchResolver, UnwrapSummary};
pub use constant_folding::ConstantFolder;
pub use dead_code_elimination::DeadCodeEliminator;
pub use edits::Edit;
pub use finishing::FinishingPass;
pub use loop_unrolling::{LoopUnroller, LoopUnwindPlan};
pub use normalizer::StructuralNormalizer;
pub use references::ReferenceDescriptor;
pub use substitution::{SubstitutionEngine, SubstitutionSummary};
pub use term::Term;
