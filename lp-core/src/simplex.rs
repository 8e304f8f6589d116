//! Two-phase dense tableau simplex.
//!
//! Solves `max c^T x  s.t.  A x <= b` with free `x`, rewritten internally
//! to standard equality form: rows are sign-normalized by
//! `Gamma = diag(sign(b))` so the right-hand side is nonnegative, the
//! free variables are split `x = x+ - x-`, and a slack is added per row.
//! Phase 1 drives an all-artificial basis to feasibility; phase 2
//! maximizes the true objective from the basis phase 1 leaves behind.
//!
//! Pivot selection uses Bland's rule on both sides (lowest-index entering
//! column with positive reduced cost, lowest-index basic variable among
//! minimum-ratio rows), which prevents cycling on degenerate polygons.

use std::time::Instant;

use nalgebra::{DMatrix, DVector};

use crate::error::{SolverError, SolverResult};
use crate::linalg::{inf_norm, pos_part};
use crate::problem::{fmt_iter_header, fmt_iter_row, LinearProgram, SolveLog};

/// Hard pivot cap; exceeding it is a [`SolverError::Stalled`] defect,
/// not an expected outcome.
pub const PIVOT_CAP: usize = 1 << 16;

/// Simplex configuration.
#[derive(Debug, Clone)]
pub struct SimplexOptions {
    /// Numerical tolerance for reduced costs and ratio-test denominators.
    pub tol: f64,
    /// Pivot budget across both phases, at most [`PIVOT_CAP`].
    pub max_pivots: usize,
}

impl Default for SimplexOptions {
    fn default() -> Self {
        Self {
            tol: 1e-9,
            max_pivots: PIVOT_CAP,
        }
    }
}

impl SimplexOptions {
    pub fn validate(&self) -> SolverResult<()> {
        if !(self.tol.is_finite() && self.tol > 0.0) {
            return Err(SolverError::InvalidOptions(format!(
                "tol must be a positive finite number, got {}",
                self.tol
            )));
        }
        if self.max_pivots == 0 || self.max_pivots > PIVOT_CAP {
            return Err(SolverError::InvalidOptions(format!(
                "max_pivots must be in 1..={}, got {}",
                PIVOT_CAP, self.max_pivots
            )));
        }
        Ok(())
    }
}

/// Simplex solve result: the per-pivot primal trace plus one log per phase.
#[derive(Debug, Clone)]
pub struct SimplexResult {
    /// Primal point `x+ - x-` after every pivot; index 0 is the origin
    /// (the all-artificial phase-1 basis), the last entry is optimal.
    pub iterates: Vec<Vec<f64>>,
    /// Objective value at the final iterate.
    pub objective: f64,
    /// Pivots spent in phase 1; `iterates[phase1_pivots..]` is the
    /// phase-2 trace.
    pub phase1_pivots: usize,
    pub phase1_log: SolveLog,
    pub phase2_log: SolveLog,
    pub elapsed_ms: f64,
}

impl SimplexResult {
    /// Final (optimal) point.
    pub fn solution(&self) -> &[f64] {
        self.iterates.last().map(Vec::as_slice).unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    One,
    Two,
}

enum PhaseExit {
    Optimal,
    Unbounded,
}

/// Dense tableau state. Columns are ordered `x+ (n) | x- (n) | slack (m)
/// | artificial (m)`, with the right-hand side stored as the last column.
struct Tableau {
    t: DMatrix<f64>,
    basis: Vec<usize>,
    n: usize,
    m: usize,
}

impl Tableau {
    fn rhs_col(&self) -> usize {
        2 * self.n + 2 * self.m
    }

    fn art_start(&self) -> usize {
        2 * self.n + self.m
    }

    /// Reconstruct the primal point `x+ - x-` from the basic values.
    fn primal_point(&self) -> DVector<f64> {
        let rhs = self.rhs_col();
        let mut x = DVector::zeros(self.n);
        for (i, &bv) in self.basis.iter().enumerate() {
            if bv < self.n {
                x[bv] += self.t[(i, rhs)];
            } else if bv < 2 * self.n {
                x[bv - self.n] -= self.t[(i, rhs)];
            }
        }
        x
    }

    /// Value of the phase objective at the current basis.
    fn basis_objective(&self, cost: &[f64]) -> f64 {
        let rhs = self.rhs_col();
        self.basis
            .iter()
            .enumerate()
            .map(|(i, &bv)| cost[bv] * self.t[(i, rhs)])
            .sum()
    }

    /// Reduced cost `c_j - c_B^T B^{-1} A_j` of column `col`.
    fn reduced_cost(&self, cost: &[f64], col: usize) -> f64 {
        let mut z = 0.0;
        for (i, &bv) in self.basis.iter().enumerate() {
            z += cost[bv] * self.t[(i, col)];
        }
        cost[col] - z
    }

    /// Gauss-Jordan pivot on (`row`, `col`).
    fn pivot(&mut self, row: usize, col: usize) {
        let rhs = self.rhs_col();
        let piv = self.t[(row, col)];
        for j in 0..=rhs {
            self.t[(row, j)] /= piv;
        }
        for i in 0..self.m {
            if i == row {
                continue;
            }
            let factor = self.t[(i, col)];
            if factor == 0.0 {
                continue;
            }
            for j in 0..=rhs {
                self.t[(i, j)] -= factor * self.t[(row, j)];
            }
        }
        self.basis[row] = col;
    }
}

/// Solve an LP by two-phase simplex, recording the primal point after
/// every pivot.
pub fn solve(lp: &LinearProgram, opts: &SimplexOptions) -> SolverResult<SimplexResult> {
    opts.validate()?;
    let start = Instant::now();

    let m = lp.num_constraints();
    let n = lp.num_vars();
    let ncols = 2 * n + 2 * m;

    // Sign-normalized standard form. sign(0) is taken as +1 so zero
    // rows keep their orientation.
    let mut t = DMatrix::zeros(m, ncols + 1);
    for i in 0..m {
        let gamma = if lp.b[i] < 0.0 { -1.0 } else { 1.0 };
        for j in 0..n {
            t[(i, j)] = gamma * lp.a[(i, j)];
            t[(i, n + j)] = -gamma * lp.a[(i, j)];
        }
        t[(i, 2 * n + i)] = gamma;
        t[(i, 2 * n + m + i)] = 1.0;
        t[(i, ncols)] = gamma * lp.b[i];
    }

    let mut tab = Tableau {
        t,
        basis: (2 * n + m..2 * n + 2 * m).collect(),
        n,
        m,
    };

    let mut iterates = vec![vec![0.0; n]];
    let mut pivots = 0usize;

    // Phase 1: maximize -sum(artificials); optimum 0 iff feasible.
    let mut cost1 = vec![0.0; ncols];
    for j in tab.art_start()..ncols {
        cost1[j] = -1.0;
    }

    let mut phase1_log = SolveLog::new();
    phase1_log.push(fmt_iter_header("infeas"));
    run_phase(
        &mut tab,
        &cost1,
        lp,
        Phase::One,
        opts,
        &mut pivots,
        &mut iterates,
        &mut phase1_log,
    )?;

    let infeas = -tab.basis_objective(&cost1);
    let feas_tol = 1e-7 * (1.0 + inf_norm(&lp.b));
    if infeas > feas_tol {
        phase1_log.push(format!(
            "phase 1 stopped with residual {infeas:.3e}: infeasible"
        ));
        return Err(SolverError::Infeasible(format!(
            "phase-1 optimum {infeas:.3e} is nonzero"
        )));
    }
    phase1_log.push(format!(
        "phase 1 done: residual {infeas:.3e} after {pivots} pivots"
    ));
    let phase1_pivots = pivots;

    // Artificials still basic at value zero are pivoted out onto the
    // lowest-index admissible column; an all-zero row is redundant and
    // keeps its surplus slack as a placeholder basic variable.
    let art_start = tab.art_start();
    for i in 0..m {
        if tab.basis[i] < art_start {
            continue;
        }
        let replacement = (0..art_start).find(|&j| tab.t[(i, j)].abs() > opts.tol);
        match replacement {
            Some(j) => tab.pivot(i, j),
            None => tab.basis[i] = 2 * n + i,
        }
    }

    // Phase 2: maximize the true objective over x+ - x-; artificial
    // columns are no longer eligible to enter.
    let mut cost2 = vec![0.0; ncols];
    for j in 0..n {
        cost2[j] = lp.c[j];
        cost2[n + j] = -lp.c[j];
    }

    let mut phase2_log = SolveLog::new();
    phase2_log.push(fmt_iter_header("infeas"));
    match run_phase(
        &mut tab,
        &cost2,
        lp,
        Phase::Two,
        opts,
        &mut pivots,
        &mut iterates,
        &mut phase2_log,
    )? {
        PhaseExit::Unbounded => {
            phase2_log.push("objective is unbounded over the feasible region".to_string());
            return Err(SolverError::Unbounded);
        }
        PhaseExit::Optimal => {}
    }

    let x = tab.primal_point();
    let objective = lp.objective(&x);
    phase2_log.push(format!(
        "optimal: obj {objective:.6} after {pivots} pivots"
    ));

    Ok(SimplexResult {
        iterates,
        objective,
        phase1_pivots,
        phase1_log,
        phase2_log,
        elapsed_ms: start.elapsed().as_secs_f64() * 1e3,
    })
}

/// Run simplex pivots until the phase objective is optimal.
#[allow(clippy::too_many_arguments)]
fn run_phase(
    tab: &mut Tableau,
    cost: &[f64],
    lp: &LinearProgram,
    phase: Phase,
    opts: &SimplexOptions,
    pivots: &mut usize,
    iterates: &mut Vec<Vec<f64>>,
    log: &mut SolveLog,
) -> SolverResult<PhaseExit> {
    let rhs = tab.rhs_col();
    // Phase 2 never re-enters an artificial column.
    let active_cols = match phase {
        Phase::One => rhs,
        Phase::Two => tab.art_start(),
    };

    loop {
        // Bland entering rule: lowest index with positive reduced cost.
        let entering = (0..active_cols).find(|&j| tab.reduced_cost(cost, j) > opts.tol);
        let Some(col) = entering else {
            return Ok(PhaseExit::Optimal);
        };

        // Minimum ratio test; ties broken by lowest basic variable index.
        let mut leave: Option<(usize, f64)> = None;
        for i in 0..tab.m {
            let denom = tab.t[(i, col)];
            if denom <= opts.tol {
                continue;
            }
            let ratio = tab.t[(i, rhs)] / denom;
            match leave {
                None => leave = Some((i, ratio)),
                Some((best_i, best_ratio)) => {
                    if ratio < best_ratio - opts.tol
                        || ((ratio - best_ratio).abs() <= opts.tol
                            && tab.basis[i] < tab.basis[best_i])
                    {
                        leave = Some((i, ratio));
                    }
                }
            }
        }
        let Some((row, _)) = leave else {
            return Ok(PhaseExit::Unbounded);
        };

        if *pivots >= opts.max_pivots {
            return Err(SolverError::Stalled(opts.max_pivots));
        }
        tab.pivot(row, col);
        *pivots += 1;

        let x = tab.primal_point();
        let infeas = match phase {
            Phase::One => -tab.basis_objective(cost),
            Phase::Two => inf_norm(&pos_part(&(&lp.a * &x - &lp.b))),
        };
        log.push(fmt_iter_row(*pivots, &x, lp.objective(&x), infeas));
        iterates.push(x.as_slice().to_vec());
    }
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
    fn test_unit_square_optimum() {
        let lp = unit_square();
        let result = solve(&lp, &SimplexOptions::default()).unwrap();
        let x = result.solution();
        assert!((x[0] - 1.0).abs() < 1e-8, "x = {:?}", x);
        assert!((x[1] - 1.0).abs() < 1e-8, "x = {:?}", x);
        assert!((result.objective - 2.0).abs() < 1e-8);
        // Two logs, each with a header and a summary
        assert!(result.phase1_log.len() >= 2);
        assert!(result.phase2_log.len() >= 2);
    }

    #[test]
    fn test_unbounded_reported() {
        // Only x, y >= 0: maximizing x + y has no finite optimum.
        let lines: Vec<Line> = vec![[-1.0, 0.0, 0.0], [0.0, -1.0, 0.0]];
        let lp = LinearProgram::from_lines(&lines, &[1.0, 1.0]).unwrap();
        assert_eq!(
            solve(&lp, &SimplexOptions::default()).unwrap_err(),
            SolverError::Unbounded
        );
    }

    #[test]
    fn test_infeasible_reported() {
        // x <= -1 and x >= 0 have no overlap.
        let lines: Vec<Line> = vec![[1.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 1.0], [0.0, -1.0, 1.0]];
        let lp = LinearProgram::from_lines(&lines, &[1.0, 1.0]).unwrap();
        assert!(matches!(
            solve(&lp, &SimplexOptions::default()).unwrap_err(),
            SolverError::Infeasible(_)
        ));
    }

    #[test]
    fn test_degenerate_triangle_edge() {
        // Right triangle (0,0), (2,0), (0,2); objective [1,1] is optimal
        // anywhere on the hypotenuse with value 2.
        let lines: Vec<Line> = vec![[1.0, 1.0, 2.0], [-1.0, 0.0, 0.0], [0.0, -1.0, 0.0]];
        let lp = LinearProgram::from_lines(&lines, &[1.0, 1.0]).unwrap();
        let result = solve(&lp, &SimplexOptions::default()).unwrap();
        assert!((result.objective - 2.0).abs() < 1e-8);
    }

    #[test]
    fn test_negative_rhs_normalization() {
        // x >= 0.5 written as -x <= -0.5 exercises the Gamma sign flip.
        let lines: Vec<Line> = vec![
            [-1.0, 0.0, -0.5],
            [1.0, 0.0, 2.0],
            [0.0, 1.0, 1.0],
            [0.0, -1.0, 0.0],
        ];
        let lp = LinearProgram::from_lines(&lines, &[-1.0, 1.0]).unwrap();
        let result = solve(&lp, &SimplexOptions::default()).unwrap();
        let x = result.solution();
        // max -x + y -> x = 0.5, y = 1
        assert!((x[0] - 0.5).abs() < 1e-8, "x = {:?}", x);
        assert!((x[1] - 1.0).abs() < 1e-8, "x = {:?}", x);
    }

    #[test]
    fn test_iterate_zero_is_origin() {
        let lp = unit_square();
        let result = solve(&lp, &SimplexOptions::default()).unwrap();
        assert_eq!(result.iterates[0], vec![0.0, 0.0]);
    }

    #[test]
    fn test_options_validated() {
        let lp = unit_square();
        let opts = SimplexOptions {
            max_pivots: PIVOT_CAP + 1,
            ..Default::default()
        };
        assert!(matches!(
            solve(&lp, &opts).unwrap_err(),
            SolverError::InvalidOptions(_)
        ));
    }
}
