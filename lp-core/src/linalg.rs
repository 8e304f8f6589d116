//! Dense linear-algebra primitives shared by all four solvers.
//!
//! Everything here is pure and allocates fresh results; no solver step
//! aliases another's storage, so recorded iterate histories stay valid
//! after the solve returns. nalgebra supplies transpose, elementwise
//! arithmetic, `dot`, and scaling natively; this module adds the pieces
//! it lacks plus factorization wrappers with a typed singularity error.

use nalgebra::{Cholesky, DMatrix, DVector};

use crate::error::{SolverError, SolverResult};

/// Solve the square system `M x = v` by LU with partial pivoting.
///
/// Fails with [`SolverError::SingularSystem`] when the factorization
/// cannot produce a finite solution.
pub fn solve(m: &DMatrix<f64>, v: &DVector<f64>) -> SolverResult<DVector<f64>> {
    if m.nrows() != m.ncols() {
        return Err(SolverError::DimensionMismatch(format!(
            "solve expects a square matrix, got {}x{}",
            m.nrows(),
            m.ncols()
        )));
    }
    if v.len() != m.nrows() {
        return Err(SolverError::DimensionMismatch(format!(
            "rhs has length {}, expected {}",
            v.len(),
            m.nrows()
        )));
    }
    let x = m
        .clone()
        .lu()
        .solve(v)
        .ok_or(SolverError::SingularSystem)?;
    if x.iter().any(|xi| !xi.is_finite()) {
        return Err(SolverError::SingularSystem);
    }
    Ok(x)
}

/// Solve `M x = v` for symmetric positive-definite `M` by Cholesky,
/// falling back to LU when the factorization loses definiteness to
/// roundoff (near-degenerate Hessians close to a vertex).
pub fn solve_spd(m: &DMatrix<f64>, v: &DVector<f64>) -> SolverResult<DVector<f64>> {
    match Cholesky::new(m.clone()) {
        Some(chol) => {
            let x = chol.solve(v);
            if x.iter().any(|xi| !xi.is_finite()) {
                return Err(SolverError::SingularSystem);
            }
            Ok(x)
        }
        None => solve(m, v),
    }
}

/// Diagonal matrix from a vector.
pub fn diag(v: &DVector<f64>) -> DMatrix<f64> {
    DMatrix::from_diagonal(v)
}

/// Infinity norm, `max_i |v_i|`. Zero for an empty vector.
pub fn inf_norm(v: &DVector<f64>) -> f64 {
    v.iter().fold(0.0_f64, |acc, &x| acc.max(x.abs()))
}

/// Elementwise positive part `[v]_+`.
pub fn pos_part(v: &DVector<f64>) -> DVector<f64> {
    v.map(|x| x.max(0.0))
}

/// Elementwise reciprocal. Caller guarantees nonzero entries.
pub fn recip(v: &DVector<f64>) -> DVector<f64> {
    v.map(|x| 1.0 / x)
}

/// Smallest entry. Positive infinity for an empty vector.
pub fn vec_min(v: &DVector<f64>) -> f64 {
    v.iter().fold(f64::INFINITY, |acc, &x| acc.min(x))
}

/// Largest entry. Negative infinity for an empty vector.
pub fn vec_max(v: &DVector<f64>) -> f64 {
    v.iter().fold(f64::NEG_INFINITY, |acc, &x| acc.max(x))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solve_2x2() {
        let m = DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 3.0]);
        let v = DVector::from_column_slice(&[3.0, 4.0]);
        let x = solve(&m, &v).unwrap();
        // 2x + y = 3, x + 3y = 4 -> x = 1, y = 1
        assert!((x[0] - 1.0).abs() < 1e-12);
        assert!((x[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_solve_singular() {
        let m = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        let v = DVector::from_column_slice(&[1.0, 1.0]);
        assert_eq!(solve(&m, &v).unwrap_err(), SolverError::SingularSystem);
    }

    #[test]
    fn test_solve_shape_checked() {
        let m = DMatrix::from_row_slice(1, 2, &[1.0, 2.0]);
        let v = DVector::from_column_slice(&[1.0]);
        assert!(matches!(
            solve(&m, &v).unwrap_err(),
            SolverError::DimensionMismatch(_)
        ));
    }

    #[test]
    fn test_solve_spd() {
        // A^T A + I is SPD
        let m = DMatrix::from_row_slice(2, 2, &[3.0, 1.0, 1.0, 2.0]);
        let v = DVector::from_column_slice(&[4.0, 3.0]);
        let x = solve_spd(&m, &v).unwrap();
        let r = &m * &x - &v;
        assert!(inf_norm(&r) < 1e-12);
    }

    #[test]
    fn test_pos_part_and_norms() {
        let v = DVector::from_column_slice(&[-2.0, 0.5, -0.25]);
        assert_eq!(pos_part(&v).as_slice(), &[0.0, 0.5, 0.0]);
        assert_eq!(inf_norm(&v), 2.0);
        assert_eq!(vec_min(&v), -2.0);
        assert_eq!(vec_max(&v), 0.5);
    }

    #[test]
    fn test_diag() {
        let v = DVector::from_column_slice(&[1.0, 2.0]);
        let d = diag(&v);
        assert_eq!(d[(0, 0)], 1.0);
        assert_eq!(d[(1, 1)], 2.0);
        assert_eq!(d[(0, 1)], 0.0);
    }
}
