//! Dense LP solver core for interactive polytope exploration.
//!
//! A user sketches a convex polygon and an objective direction; this
//! crate solves the resulting small dense linear program with four
//! classical algorithms and returns the full iterate sequence of each,
//! so a UI can animate how every method converges to the optimal
//! vertex:
//!
//! - **Two-phase primal simplex** ([`simplex`]): tableau form with
//!   Bland's rule, reporting infeasibility and unboundedness.
//! - **Interior point** ([`ipm`]): primal-dual predictor-corrector with
//!   Mehrotra-style centering.
//! - **PDHG** ([`pdhg`]): first-order primal-dual splitting, in
//!   equality and inequality forms.
//! - **Central path** ([`central_path`]): log-barrier continuation via
//!   damped Newton with Armijo backtracking.
//!
//! Problems arrive as ordered half-plane lists (`A x + B y <= C`) plus
//! an objective vector; [`problem::lines_to_ab`] converts them to the
//! dense `(A, b, c)` triple. Every solve is pure and synchronous over
//! its own data; [`dispatch::Dispatcher`] runs solves on a worker
//! thread with last-request-wins semantics so re-solving every
//! animation frame never blocks interaction.
//!
//! # Example
//!
//! ```
//! use lp_core::{solve, SolverOptions, SolverOutput};
//! use lp_core::simplex::SimplexOptions;
//!
//! // Unit square, maximize x + y
//! let lines = [
//!     [1.0, 0.0, 1.0],
//!     [0.0, 1.0, 1.0],
//!     [-1.0, 0.0, 0.0],
//!     [0.0, -1.0, 0.0],
//! ];
//! let output = solve(&lines, &[1.0, 1.0], &SolverOptions::Simplex(SimplexOptions::default()))
//!     .expect("bounded feasible polygon");
//! let SolverOutput::Simplex(result) = output else { unreachable!() };
//! assert!((result.objective - 2.0).abs() < 1e-8);
//! ```

#![warn(clippy::all)]

pub mod central_path;
pub mod dispatch;
pub mod error;
pub mod ipm;
pub mod linalg;
pub mod pdhg;
pub mod problem;
pub mod simplex;

// Re-export main types
pub use dispatch::{solve, Dispatcher, SolveRequest, SolveResponse, SolverOptions, SolverOutput};
pub use error::{SolverError, SolverResult};
pub use problem::{ab_to_lines, lines_to_ab, Line, LinearProgram, SolveLog};
