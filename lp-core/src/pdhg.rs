//! Primal-Dual Hybrid Gradient (first-order splitting).
//!
//! Alternates a primal and a dual proximal step with over-relaxation
//! (extrapolation) of one iterate. Two variants share the skeleton:
//!
//! - **Equality form**: the LP is lifted to `A^ z = b, z >= 0` with
//!   `A^ = [A, -A, I]` and `z = (x+, x-, w)`; the primal update is a
//!   nonnegative projection and the dual step uses the extrapolated
//!   primal.
//! - **Inequality form**: `x` stays free and the dual update projects
//!   onto `y >= 0`, with the primal step using the extrapolated dual.
//!
//! Step sizes are fixed hyperparameters (no line search): the method
//! trades guaranteed monotone progress for cheap iterations, and its
//! failure mode is silent slow convergence, reported through the
//! `converged` flag and the eps series rather than an error.

use std::time::Instant;

use nalgebra::{DMatrix, DVector};

use crate::error::{SolverError, SolverResult};
use crate::linalg::pos_part;
use crate::problem::{fmt_iter_header, fmt_iter_row, LinearProgram, SolveLog};

/// Which splitting variant to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PdhgForm {
    /// Project the dual onto `y >= 0`; `x` stays free.
    #[default]
    Inequality,
    /// Lift to nonnegative variables plus slack and project the primal.
    Equality,
}

/// PDHG configuration.
#[derive(Debug, Clone)]
pub struct PdhgOptions {
    pub form: PdhgForm,
    /// Primal step size. Fixed, empirically tuned for interactive-scale
    /// polygons; not an operator-norm-based guarantee.
    pub eta: f64,
    /// Dual step size.
    pub tau: f64,
    /// Stopping threshold on the combined residual `eps_k`.
    pub tol: f64,
    /// Iteration budget; exhausting it reports non-convergence.
    pub maxit: usize,
}

impl Default for PdhgOptions {
    fn default() -> Self {
        Self {
            form: PdhgForm::Inequality,
            eta: 0.25,
            tau: 0.25,
            tol: 1e-4,
            maxit: 1000,
        }
    }
}

impl PdhgOptions {
    pub fn validate(&self) -> SolverResult<()> {
        for (name, v) in [("eta", self.eta), ("tau", self.tau), ("tol", self.tol)] {
            if !(v.is_finite() && v > 0.0) {
                return Err(SolverError::InvalidOptions(format!(
                    "{name} must be a positive finite number, got {v}"
                )));
            }
        }
        if self.maxit == 0 || self.maxit > 1 << 16 {
            return Err(SolverError::InvalidOptions(format!(
                "maxit must be in 1..={}, got {}",
                1 << 16,
                self.maxit
            )));
        }
        Ok(())
    }
}

/// PDHG solve result; `eps` holds the stopping metric per iteration,
/// parallel to `iterates[1..]`.
#[derive(Debug, Clone)]
pub struct PdhgResult {
    pub iterates: Vec<Vec<f64>>,
    pub eps: Vec<f64>,
    pub converged: bool,
    pub objective: f64,
    pub log: SolveLog,
    pub elapsed_ms: f64,
}

impl PdhgResult {
    pub fn solution(&self) -> &[f64] {
        self.iterates.last().map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Combined stopping metric: primal infeasibility, dual infeasibility,
/// and duality gap, each normalized by `1 + scale`.
fn eps_metric(
    primal_infeas: f64,
    b_norm: f64,
    dual_infeas: f64,
    c_norm: f64,
    obj_p: f64,
    obj_d: f64,
) -> f64 {
    primal_infeas / (1.0 + b_norm)
        + dual_infeas / (1.0 + c_norm)
        + (obj_p - obj_d).abs() / (1.0 + obj_p.abs() + obj_d.abs())
}

/// Solve the LP by PDHG in the configured form.
pub fn solve(lp: &LinearProgram, opts: &PdhgOptions) -> SolverResult<PdhgResult> {
    opts.validate()?;
    match opts.form {
        PdhgForm::Inequality => solve_inequality(lp, opts),
        PdhgForm::Equality => solve_equality(lp, opts),
    }
}

/// Inequality form: `min c~^T x  s.t.  A x <= b` with free `x` and
/// projected dual `y >= 0`.
fn solve_inequality(lp: &LinearProgram, opts: &PdhgOptions) -> SolverResult<PdhgResult> {
    let start = Instant::now();
    let m = lp.num_constraints();
    let n = lp.num_vars();
    let c_min = -&lp.c;
    let at = lp.a.transpose();
    let b_norm = lp.b.norm();
    let c_norm = c_min.norm();

    let mut x = DVector::zeros(n);
    let mut y = DVector::<f64>::zeros(m);

    let mut iterates = vec![x.as_slice().to_vec()];
    let mut eps_series = Vec::new();
    let mut log = SolveLog::new();
    log.push(fmt_iter_header("eps"));

    let mut converged = false;
    for it in 0..opts.maxit {
        // Dual ascent with projection, then primal descent against the
        // extrapolated dual y~ = 2 y_{k+1} - y_k.
        let y_next = pos_part(&(&y + opts.tau * (&lp.a * &x - &lp.b)));
        let y_tilde = 2.0 * &y_next - &y;
        let x_next = &x - opts.eta * (&c_min + &at * &y_tilde);

        x = x_next;
        y = y_next;

        let primal_infeas = pos_part(&(&lp.a * &x - &lp.b)).norm();
        let dual_infeas = (&c_min + &at * &y).norm();
        let obj_p = c_min.dot(&x);
        let obj_d = -lp.b.dot(&y);
        let eps = eps_metric(primal_infeas, b_norm, dual_infeas, c_norm, obj_p, obj_d);

        iterates.push(x.as_slice().to_vec());
        eps_series.push(eps);
        log.push(fmt_iter_row(it + 1, &x, lp.objective(&x), eps));

        if eps <= opts.tol {
            converged = true;
            break;
        }
    }

    finish(lp, opts, iterates, eps_series, converged, log, start)
}

/// Equality form: lifted `min c^^T z  s.t.  A^ z = b, z >= 0` with
/// `A^ = [A, -A, I]`, projected primal `z >= 0`, and the dual step on
/// the extrapolated primal z~ = 2 z_{k+1} - z_k.
fn solve_equality(lp: &LinearProgram, opts: &PdhgOptions) -> SolverResult<PdhgResult> {
    let start = Instant::now();
    let m = lp.num_constraints();
    let n = lp.num_vars();
    let nz = 2 * n + m;
    let c_min = -&lp.c;

    let mut a_hat = DMatrix::zeros(m, nz);
    a_hat.view_mut((0, 0), (m, n)).copy_from(&lp.a);
    a_hat.view_mut((0, n), (m, n)).copy_from(&(-&lp.a));
    a_hat
        .view_mut((0, 2 * n), (m, m))
        .copy_from(&DMatrix::identity(m, m));
    let a_hat_t = a_hat.transpose();

    let mut c_hat = DVector::zeros(nz);
    c_hat.rows_mut(0, n).copy_from(&c_min);
    c_hat.rows_mut(n, n).copy_from(&(-&c_min));

    let b_norm = lp.b.norm();
    let c_norm = c_hat.norm();

    let mut z = DVector::<f64>::zeros(nz);
    let mut y = DVector::<f64>::zeros(m);

    let mut iterates = vec![vec![0.0; n]];
    let mut eps_series = Vec::new();
    let mut log = SolveLog::new();
    log.push(fmt_iter_header("eps"));

    let mut converged = false;
    for it in 0..opts.maxit {
        let z_next = pos_part(&(&z - opts.eta * (&c_hat + &a_hat_t * &y)));
        let z_tilde = 2.0 * &z_next - &z;
        let y_next = &y + opts.tau * (&a_hat * &z_tilde - &lp.b);

        z = z_next;
        y = y_next;

        let x = z.rows(0, n) - z.rows(n, n);
        let primal_infeas = (&a_hat * &z - &lp.b).norm();
        // Dual feasibility for z >= 0 is c^ + A^^T y >= 0; only the
        // negative part is a violation.
        let dual_infeas = pos_part(&(-(&c_hat + &a_hat_t * &y))).norm();
        let obj_p = c_hat.dot(&z);
        let obj_d = -lp.b.dot(&y);
        let eps = eps_metric(primal_infeas, b_norm, dual_infeas, c_norm, obj_p, obj_d);

        let x_owned = x.into_owned();
        log.push(fmt_iter_row(it + 1, &x_owned, lp.c.dot(&x_owned), eps));
        iterates.push(x_owned.as_slice().to_vec());
        eps_series.push(eps);

        if eps <= opts.tol {
            converged = true;
            break;
        }
    }

    finish(lp, opts, iterates, eps_series, converged, log, start)
}

#[allow(clippy::too_many_arguments)]
fn finish(
    lp: &LinearProgram,
    opts: &PdhgOptions,
    iterates: Vec<Vec<f64>>,
    eps: Vec<f64>,
    converged: bool,
    mut log: SolveLog,
    start: Instant,
) -> SolverResult<PdhgResult> {
    let objective = iterates
        .last()
        .map(|x| {
            x.iter()
                .zip(lp.c.iter())
                .map(|(xi, ci)| xi * ci)
                .sum::<f64>()
        })
        .unwrap_or(0.0);
    if converged {
        log.push(format!(
            "converged: obj {objective:.6} after {} iterations",
            eps.len()
        ));
    } else {
        log.push(format!(
            "did not converge within {} iterations (eps {:.3e})",
            opts.maxit,
            eps.last().copied().unwrap_or(f64::NAN)
        ));
    }
    Ok(PdhgResult {
        iterates,
        eps,
        converged,
        objective,
        log,
        elapsed_ms: start.elapsed().as_secs_f64() * 1e3,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{Line, LinearProgram};

    fn unit_square() -> LinearProgram {
        let lines: Vec<Line> = vec![
            [1.0, 0.0, 1.0],
            [0.0, 1.0, 1.0],
            [-1.0, 0.0, 0.0],
            [0.0, -1.0, 0.0],
        ];
        LinearProgram::from_lines(&lines, &[1.0, 1.0]).unwrap()
    }

    #[test]
    fn test_inequality_form_unit_square() {
        let lp = unit_square();
        let result = solve(&lp, &PdhgOptions::default()).unwrap();
        let x = result.solution();
        assert!((x[0] - 1.0).abs() < 1e-2, "x = {:?}", x);
        assert!((x[1] - 1.0).abs() < 1e-2, "x = {:?}", x);
    }

    #[test]
    fn test_equality_form_unit_square() {
        let lp = unit_square();
        let opts = PdhgOptions {
            form: PdhgForm::Equality,
            maxit: 5000,
            ..Default::default()
        };
        let result = solve(&lp, &opts).unwrap();
        let x = result.solution();
        assert!((x[0] - 1.0).abs() < 5e-2, "x = {:?}", x);
        assert!((x[1] - 1.0).abs() < 5e-2, "x = {:?}", x);
    }

    #[test]
    fn test_eps_series_parallel() {
        let lp = unit_square();
        let result = solve(&lp, &PdhgOptions::default()).unwrap();
        assert_eq!(result.eps.len(), result.iterates.len() - 1);
    }

    #[test]
    fn test_nonconvergence_silent() {
        let lp = unit_square();
        let opts = PdhgOptions {
            maxit: 3,
            ..Default::default()
        };
        let result = solve(&lp, &opts).unwrap();
        assert!(!result.converged);
        assert_eq!(result.iterates.len(), 4);
    }

    #[test]
    fn test_options_validated() {
        let lp = unit_square();
        let opts = PdhgOptions {
            eta: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            solve(&lp, &opts).unwrap_err(),
            SolverError::InvalidOptions(_)
        ));
    }
}
