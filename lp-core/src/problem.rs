//! Problem data structures and the half-plane -> LP conversion.
//!
//! The caller describes the feasible region as an ordered list of
//! half-planes `A·x + B·y <= C` produced from user-drawn polygon
//! vertices. This module turns that list plus an objective vector into
//! the dense `(A, b, c)` triple every solver consumes.

use nalgebra::{DMatrix, DVector};

use crate::error::{SolverError, SolverResult};

/// One half-plane constraint `[A, B, C]` meaning `A*x + B*y <= C`.
///
/// The position of a line in its containing slice is the constraint
/// index, stable for the duration of a solve.
pub type Line = [f64; 3];

/// Dense linear program `max c^T x  s.t.  A x <= b`.
///
/// Invariant: `a.nrows() == b.len() == m`, `a.ncols() == c.len() == n`,
/// with `m, n >= 1`. Constructed once per solve and never mutated.
#[derive(Debug, Clone)]
pub struct LinearProgram {
    /// Constraint matrix (m x n)
    pub a: DMatrix<f64>,
    /// Constraint right-hand side (length m)
    pub b: DVector<f64>,
    /// Objective vector (length n), maximized
    pub c: DVector<f64>,
}

impl LinearProgram {
    /// Build an LP, validating dimensions up front.
    pub fn new(a: DMatrix<f64>, b: DVector<f64>, c: DVector<f64>) -> SolverResult<Self> {
        let (m, n) = (a.nrows(), a.ncols());
        if m == 0 || n == 0 {
            return Err(SolverError::EmptyProblem);
        }
        if b.len() != m {
            return Err(SolverError::DimensionMismatch(format!(
                "b has length {}, expected {}",
                b.len(),
                m
            )));
        }
        if c.len() != n {
            return Err(SolverError::DimensionMismatch(format!(
                "c has length {}, expected {}",
                c.len(),
                n
            )));
        }
        Ok(Self { a, b, c })
    }

    /// Build an LP from half-plane constraints and an objective vector.
    pub fn from_lines(lines: &[Line], objective: &[f64]) -> SolverResult<Self> {
        let (a, b) = lines_to_ab(lines)?;
        if objective.len() != a.ncols() {
            return Err(SolverError::DimensionMismatch(format!(
                "objective has length {}, expected {}",
                objective.len(),
                a.ncols()
            )));
        }
        let c = DVector::from_column_slice(objective);
        Self::new(a, b, c)
    }

    /// Number of variables (n)
    pub fn num_vars(&self) -> usize {
        self.a.ncols()
    }

    /// Number of constraints (m)
    pub fn num_constraints(&self) -> usize {
        self.a.nrows()
    }

    /// Objective value `c^T x` at a point.
    pub fn objective(&self, x: &DVector<f64>) -> f64 {
        self.c.dot(x)
    }
}

/// Convert half-planes to `(A, b)`: row i of A is `(A_i, B_i)`, `b_i = C_i`.
///
/// Order-preserving and lossless; mapping the result back through
/// [`ab_to_lines`] reproduces the input bit for bit.
pub fn lines_to_ab(lines: &[Line]) -> SolverResult<(DMatrix<f64>, DVector<f64>)> {
    if lines.is_empty() {
        return Err(SolverError::EmptyProblem);
    }
    let m = lines.len();
    let mut a = DMatrix::zeros(m, 2);
    let mut b = DVector::zeros(m);
    for (i, line) in lines.iter().enumerate() {
        a[(i, 0)] = line[0];
        a[(i, 1)] = line[1];
        b[i] = line[2];
    }
    Ok((a, b))
}

/// Inverse of [`lines_to_ab`], used for round-trip checks.
pub fn ab_to_lines(a: &DMatrix<f64>, b: &DVector<f64>) -> Vec<Line> {
    (0..a.nrows())
        .map(|i| [a[(i, 0)], a[(i, 1)], b[i]])
        .collect()
}

/// Ordered diagnostic log for one solve: a header line, one line per
/// iteration, and a terminal summary line.
///
/// Lines are fixed-width formatted for direct display; each pushed line
/// is mirrored to `log::debug!` so ambient diagnostics stay available
/// without the caller rendering anything.
#[derive(Debug, Clone, Default)]
pub struct SolveLog {
    lines: Vec<String>,
}

impl SolveLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: impl Into<String>) {
        let line = line.into();
        log::debug!("{line}");
        self.lines.push(line);
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Format a per-iteration log row: iteration index, the first two
/// coordinates, the objective, and a solver-specific residual column.
pub(crate) fn fmt_iter_row(it: usize, x: &DVector<f64>, obj: f64, resid: f64) -> String {
    let x0 = x.get(0).copied().unwrap_or(0.0);
    let x1 = x.get(1).copied().unwrap_or(0.0);
    format!("{it:>5}  {x0:>13.6}  {x1:>13.6}  {obj:>13.6}  {resid:>11.3e}")
}

/// Matching header for [`fmt_iter_row`].
pub(crate) fn fmt_iter_header(resid_name: &str) -> String {
    format!(
        "{:>5}  {:>13}  {:>13}  {:>13}  {:>11}",
        "iter", "x", "y", "obj", resid_name
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_to_ab_roundtrip() {
        let lines: Vec<Line> = vec![[1.0, 0.0, 1.0], [0.0, 1.0, 1.0], [-1.5, 2.25, -0.125]];
        let (a, b) = lines_to_ab(&lines).unwrap();
        assert_eq!(a.nrows(), 3);
        assert_eq!(a.ncols(), 2);
        // Bit-for-bit round trip
        assert_eq!(ab_to_lines(&a, &b), lines);
    }

    #[test]
    fn test_lines_to_ab_idempotent() {
        let lines: Vec<Line> = vec![[0.1, -0.2, 0.3], [2.0, 3.0, 4.0]];
        let (a1, b1) = lines_to_ab(&lines).unwrap();
        let (a2, b2) = lines_to_ab(&lines).unwrap();
        assert_eq!(a1, a2);
        assert_eq!(b1, b2);
    }

    #[test]
    fn test_empty_lines_rejected() {
        assert_eq!(lines_to_ab(&[]).unwrap_err(), SolverError::EmptyProblem);
    }

    #[test]
    fn test_objective_dimension_checked() {
        let lines: Vec<Line> = vec![[1.0, 0.0, 1.0]];
        let err = LinearProgram::from_lines(&lines, &[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, SolverError::DimensionMismatch(_)));
    }

    #[test]
    fn test_lp_validation() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, 1.0]);
        let b = DVector::from_column_slice(&[1.0]);
        let c = DVector::from_column_slice(&[1.0, 1.0]);
        let err = LinearProgram::new(a, b, c).unwrap_err();
        assert!(matches!(err, SolverError::DimensionMismatch(_)));
    }
}
