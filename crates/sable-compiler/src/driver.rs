//! Optimization driver
//!
//! Runs the passes over a function until none of them restructures the tree
//! any more, keeping the cheapest version seen along the way.

use crate::error::{CompileError, Result};
use crate::optimizer::{
    collector, cost, BranchResolver, ConstantFolder, DeadCodeEliminator, FinishingPass,
    LoopUnroller, StructuralNormalizer, SubstitutionEngine,
};
use sable_core::{Function, VariableId};
use serde::{Deserialize, Serialize};

/// Optimizer options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerOptions {
    /// Enable the term algebra: comparison cancellation and expression simplification
    pub enable_algebraic_simplification: bool,
    /// Enable unrolling of statically bounded counting loops
    pub enable_loop_unrolling: bool,
    /// Largest number of iterations a loop is unrolled into
    pub loop_unroll_limit: usize,
    /// Number of restarts after which optimization is considered stuck
    pub max_restarts: usize,
}

impl Default for OptimizerOptions {
    fn default() -> Self {
        Self {
            enable_algebraic_simplification: true,
            enable_loop_unrolling: true,
            loop_unroll_limit: 100,
            max_restarts: 10_000,
        }
    }
}

impl OptimizerOptions {
    /// Parse options from YAML text
    pub fn from_yaml(source: &str) -> Result<Self> {
        serde_yaml::from_str(source).map_err(|e| CompileError::InvalidOptions(e.to_string()))
    }

    /// Parse options from JSON text
    pub fn from_json(source: &str) -> Result<Self> {
        serde_json::from_str(source).map_err(|e| CompileError::InvalidOptions(e.to_string()))
    }
}

/// What one optimization run did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptimizationSummary {
    pub normalized: usize,
    pub substitutions: usize,
    pub removed_stores: usize,
    pub folded: usize,
    pub unwrapped: usize,
    pub unrolled: usize,
    pub removed_statements: usize,
    pub restarts: usize,
    pub initial_cost: usize,
    pub final_cost: usize,
}

/// The Sable optimizer
pub struct Optimizer {
    /// Optimizer options
    options: OptimizerOptions,
    normalizer: StructuralNormalizer,
    substitution: SubstitutionEngine,
    constant_folder: ConstantFolder,
    branch_resolver: BranchResolver,
    dead_code_eliminator: DeadCodeEliminator,
    finishing: FinishingPass,
}

impl Optimizer {
    /// Create a new optimizer with default options
    pub fn new() -> Self {
        Self::with_options(OptimizerOptions::default())
    }

    /// Create a new optimizer with custom options
    pub fn with_options(options: OptimizerOptions) -> Self {
        let algebra = options.enable_algebraic_simplification;

        let unroller = if options.enable_loop_unrolling {
            Some(
                LoopUnroller::new()
                    .with_limit(options.loop_unroll_limit)
                    .with_algebra(algebra),
            )
        } else {
            None
        };

        Self {
            normalizer: StructuralNormalizer::new(),
            substitution: SubstitutionEngine::new().with_simplification(algebra),
            constant_folder: ConstantFolder::new().with_algebra(algebra),
            branch_resolver: BranchResolver::new().with_unroller(unroller),
            dead_code_eliminator: DeadCodeEliminator::new(),
            finishing: FinishingPass::new(),
            options,
        }
    }

    pub fn options(&self) -> &OptimizerOptions {
        &self.options
    }

    /// Optimize a function in place
    pub fn optimize(&self, function: &mut Function) -> Result<OptimizationSummary> {
        let mut summary = OptimizationSummary {
            normalized: self.normalizer.normalize(function)?,
            ..Default::default()
        };

        let mut best = function.clone();
        let mut minimum_cost = cost::cost(&function.tree, function.tree.root());
        summary.initial_cost = minimum_cost;

        while self.pass(function, &mut best, &mut minimum_cost, &mut summary)? {
            summary.restarts += 1;

            if summary.restarts > self.options.max_restarts {
                return Err(CompileError::DidNotConverge(function.name.clone()));
            }
        }

        *function = best;
        self.finishing.finish(&mut function.tree)?;
        function.rebuild_usages();

        summary.final_cost = cost::cost(&function.tree, function.tree.root());

        tracing::debug!(
            "Optimized '{}' in {} restart(s), cost {} -> {}",
            function.name,
            summary.restarts,
            summary.initial_cost,
            summary.final_cost
        );

        Ok(summary)
    }

    /// One sweep over the predictable variables.
    ///
    /// Returns true when a pass restructured the tree and the sweep must start over.
    fn pass(
        &self,
        function: &mut Function,
        best: &mut Function,
        minimum_cost: &mut usize,
        summary: &mut OptimizationSummary,
    ) -> Result<bool> {
        let algebra = self.options.enable_algebraic_simplification;

        // A function without variables still gets one sweep of the structural passes
        let variables = function.predictable_variables();
        let sweep: Vec<Option<VariableId>> = if variables.is_empty() {
            vec![None]
        } else {
            variables.into_iter().map(Some).collect()
        };

        for variable in sweep {
            if let Some(variable) = variable {
                let substituted = self.substitution.substitute(function, variable)?;
                summary.substitutions += substituted.substitutions;
                summary.removed_stores += substituted.removed_stores;
            }

            let folded = self.constant_folder.optimize_comparisons(&mut function.tree)?;
            if folded > 0 {
                summary.folded += folded;
                return Ok(true);
            }

            let unwrapped = self.branch_resolver.unwrap_statements(function)?;
            if unwrapped.changed() {
                summary.unwrapped += unwrapped.unwrapped;
                summary.unrolled += unwrapped.unrolled;
                return Ok(true);
            }

            let removed = self
                .dead_code_eliminator
                .remove_unreachable_statements(&mut function.tree);
            if removed > 0 {
                summary.removed_statements += removed;
                return Ok(true);
            }

            if algebra {
                let root = function.tree.root();
                collector::simplify_expressions(&mut function.tree, root)?;
            }

            let cost = cost::cost(&function.tree, function.tree.root());

            // Ties go to the later snapshot, which has had more passes applied
            if cost <= *minimum_cost {
                tracing::trace!("New cheapest snapshot of '{}' costs {}", function.name, cost);
                *best = function.clone();
                *minimum_cost = cost;
            }
        }

        Ok(false)
    }
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Optimize every function with the same options
pub fn optimize_all(
    functions: &mut [Function],
    options: &OptimizerOptions,
) -> Result<Vec<OptimizationSummary>> {
    let optimizer = Optimizer::with_options(options.clone());

    functions
        .iter_mut()
        .map(|function| optimizer.optimize(function))
        .collect()
}
