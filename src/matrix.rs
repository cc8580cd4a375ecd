//! Checked dense matrix primitives.
//!
//! Thin shape-checked wrappers over `ndarray` operations. The point is to
//! surface [`Error::ShapeMismatch`](crate::Error::ShapeMismatch) instead of
//! panicking when operand dimensions are incompatible, so the factorization
//! engine can propagate failures with `?`.
//!
//! Allocation and release map onto the language: `Array2::zeros` produces an
//! explicitly zero-initialized matrix, and ownership + `Drop` release storage
//! on every exit path. Allocation failure aborts the process (the global
//! allocator's policy), so no partially built matrix ever escapes. All
//! operations here are pure; inputs are never aliased by outputs.

use crate::{Error, Result};
use ndarray::Array2;

fn ensure_same_shape(op: &'static str, a: &Array2<f64>, b: &Array2<f64>) -> Result<()> {
    if a.dim() != b.dim() {
        return Err(Error::shape_mismatch(op, a.dim(), b.dim()));
    }
    Ok(())
}

/// Matrix product A · B.
///
/// Requires cols(A) == rows(B); the result is rows(A) × cols(B).
pub fn multiply(a: &Array2<f64>, b: &Array2<f64>) -> Result<Array2<f64>> {
    if a.ncols() != b.nrows() {
        return Err(Error::shape_mismatch("multiply", a.dim(), b.dim()));
    }
    Ok(a.dot(b))
}

/// Transpose: the cols(A) × rows(A) owned copy of Aᵀ.
pub fn transpose(a: &Array2<f64>) -> Array2<f64> {
    a.t().to_owned()
}

/// Elementwise difference A − B for identically shaped operands.
pub fn subtract(a: &Array2<f64>, b: &Array2<f64>) -> Result<Array2<f64>> {
    ensure_same_shape("subtract", a, b)?;
    Ok(a - b)
}

/// Frobenius norm of the difference: sqrt(Σ (A[i,j] − B[i,j])²).
///
/// Computed directly from the entry differences, without materializing an
/// intermediate matrix.
pub fn frobenius_diff(a: &Array2<f64>, b: &Array2<f64>) -> Result<f64> {
    ensure_same_shape("frobenius_diff", a, b)?;
    let sum_sq: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let diff = x - y;
            diff * diff
        })
        .sum();
    Ok(sum_sq.sqrt())
}
