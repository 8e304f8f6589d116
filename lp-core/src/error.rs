//! Error types for the solver core.

use thiserror::Error;

/// Errors that halt a solve and surface to the caller.
///
/// Non-convergence is deliberately absent: a solver that exhausts its
/// iteration budget still returns the iterate history it built, flagged
/// as not converged, so the caller can render partial progress.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    /// No feasible point exists (phase-1 simplex optimum is nonzero, or
    /// the central path cannot find a strictly interior starting point)
    #[error("problem is infeasible: {0}")]
    Infeasible(String),

    /// The objective is unbounded over the feasible region
    #[error("problem is unbounded: ratio test found no leaving variable")]
    Unbounded,

    /// A linear solve hit a numerically singular matrix
    #[error("linear system is numerically singular")]
    SingularSystem,

    /// Malformed constraint or objective shapes
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Option values outside the supported range
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// The constraint list is empty
    #[error("problem has no constraints")]
    EmptyProblem,

    /// Simplex exceeded its hard pivot cap without terminating.
    /// Defensive only; Bland's rule prevents cycling on real input.
    #[error("pivot cap of {0} exceeded without termination")]
    Stalled(usize),
}

/// Result type for solver operations.
pub type SolverResult<T> = Result<T, SolverError>;
