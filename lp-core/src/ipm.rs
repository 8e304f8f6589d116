//! Primal-dual predictor-corrector interior point method.
//!
//! Works on the inequality-form LP `min c~^T x  s.t.  A x + s = b,
//! s >= 0` where `c~ = -c` (the caller's convention is `max c^T x`,
//! `A x <= b`). The iteration state is `(x, s, y)` with `s, y > 0`
//! maintained strictly by fractional step-length clamping.
//!
//! Each iteration assembles the augmented KKT system once, factors it
//! once, and solves it for two right-hand sides: an affine (predictor)
//! step, then a corrector step with centering parameter
//! `sigma = clamp((mu_aff / mu)^3, 1e-8, 1 - 1e-8)`. The corrector is
//! skipped when both affine step ratios already exceed 0.9.

use std::time::Instant;

use nalgebra::{DMatrix, DVector};

use crate::error::{SolverError, SolverResult};
use crate::linalg::inf_norm;
use crate::problem::{fmt_iter_header, fmt_iter_row, LinearProgram, SolveLog};

/// IPM configuration.
#[derive(Debug, Clone)]
pub struct IpmOptions {
    /// Primal feasibility tolerance on `||b - Ax - s||_inf`.
    pub eps_p: f64,
    /// Dual feasibility tolerance on `||c~ + A^T y||_inf`.
    pub eps_d: f64,
    /// Relative duality gap tolerance.
    pub eps_opt: f64,
    /// Iteration budget; exhausting it reports non-convergence.
    pub maxit: usize,
    /// Fraction-to-the-boundary scaling, strictly inside (0, 1).
    pub alpha_max: f64,
}

impl Default for IpmOptions {
    fn default() -> Self {
        Self {
            eps_p: 1e-6,
            eps_d: 1e-6,
            eps_opt: 1e-6,
            maxit: 30,
            alpha_max: 0.999,
        }
    }
}

impl IpmOptions {
    pub fn validate(&self) -> SolverResult<()> {
        for (name, tol) in [
            ("eps_p", self.eps_p),
            ("eps_d", self.eps_d),
            ("eps_opt", self.eps_opt),
        ] {
            if !(tol.is_finite() && tol > 0.0) {
                return Err(SolverError::InvalidOptions(format!(
                    "{name} must be a positive finite number, got {tol}"
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
        if !(self.alpha_max > 0.0 && self.alpha_max < 1.0) {
            return Err(SolverError::InvalidOptions(format!(
                "alpha_max must be in (0, 1), got {}",
                self.alpha_max
            )));
        }
        Ok(())
    }
}

/// Per-iteration step diagnostics (predictor and corrector step lengths).
#[derive(Debug, Clone, Copy)]
pub struct IpmStep {
    /// Affine (predictor) step ratios, primal and dual.
    pub alpha_aff_p: f64,
    pub alpha_aff_d: f64,
    /// Accepted step lengths, primal and dual.
    pub alpha_p: f64,
    pub alpha_d: f64,
    /// Centering parameter; zero when the corrector was skipped.
    pub sigma: f64,
    /// Whether the corrector solve was performed.
    pub corrected: bool,
}

/// IPM solve result. The `x`, `s`, `y`, and `mu` series are parallel:
/// entry k is the state recorded at iteration k, before the convergence
/// check, so the last entry is either the converged point or the final
/// attempt when `maxit` ran out.
#[derive(Debug, Clone)]
pub struct IpmResult {
    pub iterates: Vec<Vec<f64>>,
    pub s: Vec<Vec<f64>>,
    pub y: Vec<Vec<f64>>,
    pub mu: Vec<f64>,
    pub steps: Vec<IpmStep>,
    pub converged: bool,
    pub objective: f64,
    pub log: SolveLog,
    pub elapsed_ms: f64,
}

impl IpmResult {
    pub fn solution(&self) -> &[f64] {
        self.iterates.last().map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Largest step `alpha <= 1` keeping `v + alpha * dv` nonnegative:
/// `min(1, min_i { -v_i / dv_i : dv_i < 0 })`.
fn alpha_step(v: &DVector<f64>, dv: &DVector<f64>) -> f64 {
    let mut alpha = 1.0_f64;
    for (vi, dvi) in v.iter().zip(dv.iter()) {
        if *dvi < 0.0 {
            let limit = -vi / dvi;
            if limit.is_finite() && limit < alpha {
                alpha = limit;
            }
        }
    }
    alpha
}

/// Solve the LP by predictor-corrector IPM, recording `(x, s, y, mu)`
/// every iteration.
pub fn solve(lp: &LinearProgram, opts: &IpmOptions) -> SolverResult<IpmResult> {
    opts.validate()?;
    let start = Instant::now();

    let m = lp.num_constraints();
    let n = lp.num_vars();
    let c_min = -&lp.c; // internal minimization convention

    // Infeasible start: the origin with unit slacks and duals. The
    // primal residual is absorbed over the first few iterations.
    let mut x = DVector::zeros(n);
    let mut s = DVector::from_element(m, 1.0);
    let mut y = DVector::from_element(m, 1.0);

    let mut iterates = Vec::with_capacity(opts.maxit + 1);
    let mut s_hist = Vec::with_capacity(opts.maxit + 1);
    let mut y_hist = Vec::with_capacity(opts.maxit + 1);
    let mut mu_hist = Vec::with_capacity(opts.maxit + 1);
    let mut steps = Vec::with_capacity(opts.maxit);

    let mut log = SolveLog::new();
    log.push(fmt_iter_header("mu"));

    let dim = n + 2 * m;
    let mut converged = false;

    for it in 0..=opts.maxit {
        let r_p = &lp.b - &lp.a * &x - &s;
        let r_d = -(&c_min + lp.a.transpose() * &y);
        let mu = s.dot(&y) / m as f64;

        // Record before the feasibility/gap check so a non-converged
        // final attempt still shows up in the trace.
        iterates.push(x.as_slice().to_vec());
        s_hist.push(s.as_slice().to_vec());
        y_hist.push(y.as_slice().to_vec());
        mu_hist.push(mu);
        log.push(fmt_iter_row(it, &x, lp.objective(&x), mu));

        let obj_p = c_min.dot(&x);
        let obj_d = -lp.b.dot(&y);
        let rel_gap = (obj_p - obj_d).abs() / (1.0 + obj_p.abs());
        if inf_norm(&r_p) < opts.eps_p && inf_norm(&r_d) < opts.eps_d && rel_gap < opts.eps_opt {
            converged = true;
            break;
        }
        if it == opts.maxit {
            break;
        }

        // Augmented KKT, built once per iteration and factored once:
        //   [ A  I  0  ] [dx]   [ r_p ]
        //   [ 0  0  A^T] [ds] = [ r_d ]
        //   [ 0  Y  S  ] [dy]   [ r_c ]
        // Unknown layout: dx (n) | ds (m) | dy (m).
        let mut kkt = DMatrix::zeros(dim, dim);
        for i in 0..m {
            for j in 0..n {
                kkt[(i, j)] = lp.a[(i, j)];
                kkt[(m + j, n + m + i)] = lp.a[(i, j)];
            }
            kkt[(i, n + i)] = 1.0;
            kkt[(m + n + i, n + i)] = y[i];
            kkt[(m + n + i, n + m + i)] = s[i];
        }
        let lu = kkt.lu();

        let mut rhs = DVector::zeros(dim);
        rhs.rows_mut(0, m).copy_from(&r_p);
        rhs.rows_mut(m, n).copy_from(&r_d);
        for i in 0..m {
            rhs[m + n + i] = -s[i] * y[i];
        }

        // Predictor (affine) step.
        let sol_aff = lu.solve(&rhs).ok_or(SolverError::SingularSystem)?;
        let dx_aff = sol_aff.rows(0, n).into_owned();
        let ds_aff = sol_aff.rows(n, m).into_owned();
        let dy_aff = sol_aff.rows(n + m, m).into_owned();

        let alpha_aff_p = alpha_step(&s, &ds_aff);
        let alpha_aff_d = alpha_step(&y, &dy_aff);

        // Skip the corrector when the affine step is already nearly
        // unit length on both sides.
        let (dx, ds, dy, sigma, corrected) = if alpha_aff_p > 0.9 && alpha_aff_d > 0.9 {
            (dx_aff, ds_aff, dy_aff, 0.0, false)
        } else {
            let mu_aff = (&s + alpha_aff_p * &ds_aff).dot(&(&y + alpha_aff_d * &dy_aff)) / m as f64;
            let sigma = (mu_aff / mu).powi(3).clamp(1e-8, 1.0 - 1e-8);

            for i in 0..m {
                rhs[m + n + i] = sigma * mu - s[i] * y[i] - ds_aff[i] * dy_aff[i];
            }
            let sol = lu.solve(&rhs).ok_or(SolverError::SingularSystem)?;
            (
                sol.rows(0, n).into_owned(),
                sol.rows(n, m).into_owned(),
                sol.rows(n + m, m).into_owned(),
                sigma,
                true,
            )
        };

        let alpha_p = (opts.alpha_max * alpha_step(&s, &ds)).min(1.0);
        let alpha_d = (opts.alpha_max * alpha_step(&y, &dy)).min(1.0);

        x += alpha_p * &dx;
        s += alpha_p * &ds;
        y += alpha_d * &dy;

        steps.push(IpmStep {
            alpha_aff_p,
            alpha_aff_d,
            alpha_p,
            alpha_d,
            sigma,
            corrected,
        });
    }

    let objective = lp.c.dot(&x);
    if converged {
        log.push(format!(
            "converged: obj {objective:.6} after {} iterations",
            iterates.len() - 1
        ));
    } else {
        log.push(format!(
            "did not converge within {} iterations (best obj {objective:.6})",
            opts.maxit
        ));
    }

    Ok(IpmResult {
        iterates,
        s: s_hist,
        y: y_hist,
        mu: mu_hist,
        steps,
        converged,
        objective,
        log,
        elapsed_ms: start.elapsed().as_secs_f64() * 1e3,
    })
}
