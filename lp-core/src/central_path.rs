//! Central path / log-barrier continuation.
//!
//! For a decreasing schedule of barrier weights `mu` (log-spaced from
//! 1e3 down to 1e-5), maximizes the barrier objective
//! `phi(x) = c^T x + mu * sum_i log(b_i - a_i^T x)` by damped Newton
//! steps, warm-starting each weight from the previous solution. The
//! iterate must stay strictly interior (`b - A x > 0` elementwise); a
//! domain line search halves the step until it does, and Armijo
//! backtracking then enforces sufficient increase.
//!
//! A barrier weight whose Newton solve fails (singular Hessian, no
//! feasible direction, or an exhausted iteration budget) is logged and
//! skipped; the next weight starts from the last good point.

use std::time::Instant;

use nalgebra::DVector;

use crate::error::{SolverError, SolverResult};
use crate::linalg::{inf_norm, solve_spd, vec_min};
use crate::problem::{fmt_iter_header, fmt_iter_row, Line, LinearProgram, SolveLog};
use crate::simplex::{self, SimplexOptions};

/// Armijo sufficient-increase constant.
const ARMIJO_C: f64 = 0.01;
/// Step shrink factor shared by the domain and Armijo searches.
const SHRINK: f64 = 0.5;
/// Halving budget for the domain-feasibility search.
const DOMAIN_TRIES: usize = 60;
/// Halving budget for Armijo backtracking before the best feasible
/// step is accepted as-is.
const ARMIJO_TRIES: usize = 30;

/// Central path configuration.
#[derive(Debug, Clone)]
pub struct CentralPathOptions {
    /// Number of barrier weights, at most 2^10. `niter = 1` uses the
    /// single weight 1000.
    pub niter: usize,
    /// Newton convergence threshold on the gradient infinity norm.
    pub epsilon: f64,
    /// Newton iteration budget per barrier weight, at most 2^16.
    pub maxit: usize,
    /// Strictly interior warm start (e.g. the polygon centroid). When
    /// absent a Chebyshev center is computed with the simplex solver.
    pub start: Option<Vec<f64>>,
}

impl Default for CentralPathOptions {
    fn default() -> Self {
        Self {
            niter: 10,
            epsilon: 1e-6,
            maxit: 2000,
            start: None,
        }
    }
}

impl CentralPathOptions {
    pub fn validate(&self) -> SolverResult<()> {
        if self.niter == 0 || self.niter > 1 << 10 {
            return Err(SolverError::InvalidOptions(format!(
                "niter must be in 1..={}, got {}",
                1 << 10,
                self.niter
            )));
        }
        if self.maxit == 0 || self.maxit > 1 << 16 {
            return Err(SolverError::InvalidOptions(format!(
                "maxit must be in 1..={}, got {}",
                1 << 16,
                self.maxit
            )));
        }
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(SolverError::InvalidOptions(format!(
                "epsilon must be a positive finite number, got {}",
                self.epsilon
            )));
        }
        Ok(())
    }
}

/// Central path solve result. `path` holds the solution at each barrier
/// weight (parallel to `mus`); `iterates` is the full Newton trace.
#[derive(Debug, Clone)]
pub struct CentralPathResult {
    pub iterates: Vec<Vec<f64>>,
    /// One entry per barrier weight: the point the Newton solve for
    /// that weight ended on.
    pub path: Vec<Vec<f64>>,
    pub mus: Vec<f64>,
    pub objective: f64,
    pub log: SolveLog,
    pub elapsed_ms: f64,
}

impl CentralPathResult {
    pub fn solution(&self) -> &[f64] {
        self.iterates.last().map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Log-spaced barrier schedule from 1e3 down to 1e-5.
fn mu_schedule(niter: usize) -> Vec<f64> {
    if niter == 1 {
        return vec![1e3];
    }
    (0..niter)
        .map(|j| 10f64.powf(3.0 - 8.0 * j as f64 / (niter - 1) as f64))
        .collect()
}

/// Barrier objective `c^T x + mu * sum log(s_i)` for `s = b - A x > 0`.
fn barrier_value(lp: &LinearProgram, x: &DVector<f64>, mu: f64) -> f64 {
    let s = &lp.b - &lp.a * x;
    lp.c.dot(x) + mu * s.iter().map(|si| si.ln()).sum::<f64>()
}

/// Strictly interior starting point: the caller's hint when it is
/// valid, otherwise the Chebyshev center of the polygon.
fn interior_start(lp: &LinearProgram, opts: &CentralPathOptions) -> SolverResult<DVector<f64>> {
    if let Some(hint) = &opts.start {
        if hint.len() != lp.num_vars() {
            return Err(SolverError::DimensionMismatch(format!(
                "start has length {}, expected {}",
                hint.len(),
                lp.num_vars()
            )));
        }
        let x = DVector::from_column_slice(hint);
        if vec_min(&(&lp.b - &lp.a * &x)) > 0.0 {
            return Ok(x);
        }
        log::debug!("warm-start hint is not strictly interior, falling back to Chebyshev center");
    }
    chebyshev_center(lp)
}

/// Chebyshev center of `{x : A x <= b}` via the auxiliary LP
/// `max r  s.t.  a_i^T x + ||a_i|| r <= b_i, r <= 1`, solved with the
/// two-phase simplex. A nonpositive radius means the polygon has no
/// interior.
fn chebyshev_center(lp: &LinearProgram) -> SolverResult<DVector<f64>> {
    let m = lp.num_constraints();
    let n = lp.num_vars();

    let mut lines: Vec<Vec<f64>> = Vec::with_capacity(m + 1);
    for i in 0..m {
        let row_norm = lp.a.row(i).norm();
        let mut row: Vec<f64> = (0..n).map(|j| lp.a[(i, j)]).collect();
        row.push(row_norm);
        row.push(lp.b[i]);
        lines.push(row);
    }
    // Cap the radius so an unbounded region still yields a center.
    let mut cap = vec![0.0; n + 1];
    cap[n] = 1.0;
    cap.push(1.0);
    lines.push(cap);

    let rows = lines.len();
    let mut a = nalgebra::DMatrix::zeros(rows, n + 1);
    let mut b = DVector::zeros(rows);
    for (i, row) in lines.iter().enumerate() {
        for j in 0..=n {
            a[(i, j)] = row[j];
        }
        b[i] = row[n + 1];
    }
    let mut c = DVector::zeros(n + 1);
    c[n] = 1.0;

    let aux = LinearProgram::new(a, b, c)?;
    let result = simplex::solve(&aux, &SimplexOptions::default())?;
    let sol = result.solution();
    let radius = sol[n];
    if radius <= 1e-9 {
        return Err(SolverError::Infeasible(format!(
            "no strictly interior point: Chebyshev radius {radius:.3e}"
        )));
    }
    Ok(DVector::from_column_slice(&sol[..n]))
}

/// Follow the central path to the optimum, recording every accepted
/// Newton step.
pub fn solve(lp: &LinearProgram, opts: &CentralPathOptions) -> SolverResult<CentralPathResult> {
    opts.validate()?;
    let start = Instant::now();

    let mut x = interior_start(lp, opts)?;
    let mus = mu_schedule(opts.niter);
    let at = lp.a.transpose();

    let mut iterates = vec![x.as_slice().to_vec()];
    let mut path = Vec::with_capacity(mus.len());
    let mut log = SolveLog::new();
    log.push(fmt_iter_header("|grad|"));

    for (k, &mu) in mus.iter().enumerate() {
        let mut newton_it = 0usize;
        let mut converged = false;

        while newton_it < opts.maxit {
            let s = &lp.b - &lp.a * &x;
            let inv_s = s.map(|si| 1.0 / si);
            let grad = &lp.c - mu * (&at * &inv_s);
            if inf_norm(&grad) < opts.epsilon {
                converged = true;
                break;
            }

            // Hessian of -phi: mu * A^T diag(1/s^2) A, positive definite
            // while x is interior and A has full column rank.
            let inv_s2 = s.map(|si| 1.0 / (si * si));
            let hess = mu * (&at * crate::linalg::diag(&inv_s2) * &lp.a);

            let dx = match solve_spd(&hess, &grad) {
                Ok(dx) => dx,
                Err(SolverError::SingularSystem) => {
                    log.push(format!(
                        "mu {mu:.3e}: singular Hessian, skipping barrier step"
                    ));
                    break;
                }
                Err(e) => return Err(e),
            };

            // Domain line search: stay strictly inside the polygon.
            let mut alpha = 1.0_f64;
            let mut feasible = false;
            for _ in 0..DOMAIN_TRIES {
                if vec_min(&(&lp.b - &lp.a * (&x + alpha * &dx))) > 0.0 {
                    feasible = true;
                    break;
                }
                alpha *= SHRINK;
            }
            if !feasible {
                log.push(format!(
                    "mu {mu:.3e}: no feasible Newton direction, skipping barrier step"
                ));
                break;
            }

            // Armijo backtracking on the barrier objective; a stall
            // falls back to the best feasible step seen.
            let phi0 = barrier_value(lp, &x, mu);
            let slope = grad.dot(&dx);
            let mut best = (alpha, barrier_value(lp, &(&x + alpha * &dx), mu));
            for _ in 0..ARMIJO_TRIES {
                let phi = barrier_value(lp, &(&x + alpha * &dx), mu);
                if phi > best.1 {
                    best = (alpha, phi);
                }
                if phi >= phi0 + ARMIJO_C * alpha * slope {
                    best = (alpha, phi);
                    break;
                }
                alpha *= SHRINK;
            }
            let (alpha, _) = best;

            x += alpha * &dx;
            newton_it += 1;
            iterates.push(x.as_slice().to_vec());
            log.push(fmt_iter_row(
                iterates.len() - 1,
                &x,
                lp.objective(&x),
                inf_norm(&grad),
            ));
        }

        if !converged && newton_it >= opts.maxit {
            log.push(format!(
                "mu {mu:.3e}: Newton budget {} exhausted, moving to next weight",
                opts.maxit
            ));
        }
        path.push(x.as_slice().to_vec());
        log.push(format!(
            "barrier step {k}: mu {mu:.3e} obj {:.6} ({newton_it} Newton steps)",
            lp.objective(&x)
        ));
    }

    let objective = lp.objective(&x);
    log.push(format!(
        "central path done: obj {objective:.6} over {} barrier steps",
        mus.len()
    ));

    Ok(CentralPathResult {
        iterates,
        path,
        mus,
        objective,
        log,
        elapsed_ms: start.elapsed().as_secs_f64() * 1e3,
    })
}
