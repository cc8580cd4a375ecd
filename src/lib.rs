//! # symnmf
//!
//! Symmetric Nonnegative Matrix Factorization for graph-based clustering.
//!
//! ## The Core Idea
//!
//! Given n points in d dimensions, build a Gaussian similarity graph, normalize
//! it by degree, and factor the normalized affinity W ≈ H Hᵀ with H ≥ 0. Each
//! row of the n × k factor H is a soft cluster-membership vector: the dominant
//! column of row i is the cluster of point i.
//!
//! ## Key Functions
//!
//! | Function | Purpose |
//! |----------|---------|
//! | [`similarity_matrix`] | Gaussian-kernel affinity A from an n × d point matrix |
//! | [`degree_matrix`] | Diagonal degree matrix D from A |
//! | [`normalized_similarity`] | Symmetric normalization W = D^{-1/2} A D^{-1/2} |
//! | [`normalized_from_points`] | The full points → A → D → W chain |
//! | [`factorization::optimize`] | Multiplicative-update factorization of W |
//! | [`factorization::initial_factor`] | Seeded uniform H₀ scaled to W |
//!
//! ## Quick Start
//!
//! ```rust
//! use ndarray::array;
//! use symnmf::factorization::{initial_factor, optimize, FactorizationConfig};
//! use symnmf::normalized_from_points;
//!
//! // Two tight clusters, well separated.
//! let points = array![[0.0, 0.0], [0.0, 1.0], [5.0, 5.0], [5.0, 6.0]];
//!
//! let w = normalized_from_points(&points).unwrap();
//! let h0 = initial_factor(&w, 2, 1234).unwrap();
//! let result = optimize(&h0, &w, &FactorizationConfig::default()).unwrap();
//!
//! assert_eq!(result.h.dim(), (4, 2));
//! ```
//!
//! ## The Pipeline
//!
//! ```text
//! points (n × d)
//!   │  A[i,j] = exp(-‖p_i - p_j‖² / 2),  A[i,i] = 0
//!   ▼
//! affinity A (n × n, symmetric)
//!   │  D[i,i] = Σ_j A[i,j]
//!   ▼
//! degrees D (n × n, diagonal)
//!   │  W = D^{-1/2} A D^{-1/2}   (zero degree → zero factor)
//!   ▼
//! normalized affinity W (n × n, symmetric)
//!   │  multiplicative updates until ‖H_{t+1} - H_t‖²_F < ε
//!   ▼
//! factor H (n × k, nonnegative)
//! ```
//!
//! ## What Can Go Wrong
//!
//! 1. **Isolated points**: a zero-degree row gets a zero normalization factor,
//!    so its row and column of W vanish entirely. This is the policy of the
//!    reference pipeline, not an error, but it means an isolated point carries
//!    no affinity information into the factorization.
//! 2. **Collapsed factor rows**: once a row of H reaches exactly zero it stays
//!    zero; the update denominator for that row is zero and the entry is left
//!    unchanged (see [`factorization::optimize`] for why this is safe).
//! 3. **Scaling**: dense O(n²) storage and O(n² k) work per iteration. This
//!    crate is deliberately dense; there is no sparse or out-of-core path.
//!
//! ## References
//!
//! - Kuang, Ding, Park (2012). "Symmetric Nonnegative Matrix Factorization
//!   for Graph Clustering"
//! - von Luxburg (2007). "A Tutorial on Spectral Clustering"

use ndarray::Array2;
use thiserror::Error;

pub mod factorization;
pub mod matrix;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{op}: operand shapes {left_rows}x{left_cols} and {right_rows}x{right_cols} are incompatible")]
    ShapeMismatch {
        op: &'static str,
        left_rows: usize,
        left_cols: usize,
        right_rows: usize,
        right_cols: usize,
    },

    #[error("invalid dimension: {name} must be nonzero")]
    InvalidDimension { name: &'static str },

    #[error("factor matrix has negative entries")]
    NegativeEntries,

    #[error("non-finite value in multiplicative update at ({row}, {col})")]
    NumericInstability { row: usize, col: usize },
}

impl Error {
    pub(crate) fn shape_mismatch(
        op: &'static str,
        left: (usize, usize),
        right: (usize, usize),
    ) -> Self {
        Error::ShapeMismatch {
            op,
            left_rows: left.0,
            left_cols: left.1,
            right_rows: right.0,
            right_cols: right.1,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

pub(crate) fn ensure_square(a: &Array2<f64>, op: &'static str) -> Result<usize> {
    let (n, m) = a.dim();
    if n != m {
        return Err(Error::shape_mismatch(op, (n, m), (n, n)));
    }
    Ok(n)
}

/// Gaussian-kernel similarity matrix from an n × d point matrix.
///
/// A[i,j] = exp(-‖p_i - p_j‖² / 2) for i ≠ j, and A[i,i] = 0 (no
/// self-similarity). Off-diagonal entries lie in (0, 1] and the matrix is
/// symmetric by construction.
///
/// Cost is O(n² d) with no approximation or pruning. With the `parallel`
/// feature, rows are computed concurrently; the output is identical either
/// way.
///
/// # Errors
///
/// [`Error::InvalidDimension`] if the point matrix has zero rows or zero
/// columns.
pub fn similarity_matrix(points: &Array2<f64>) -> Result<Array2<f64>> {
    let (n, d) = points.dim();
    if n == 0 {
        return Err(Error::InvalidDimension { name: "n" });
    }
    if d == 0 {
        return Err(Error::InvalidDimension { name: "d" });
    }

    let mut a = Array2::zeros((n, n));

    #[cfg(feature = "parallel")]
    {
        use ndarray::parallel::prelude::*;
        a.axis_iter_mut(ndarray::Axis(0))
            .into_par_iter()
            .enumerate()
            .for_each(|(i, mut row)| {
                for j in 0..n {
                    if i != j {
                        row[j] = (-0.5 * distance_sq(points, i, j)).exp();
                    }
                }
            });
    }

    #[cfg(not(feature = "parallel"))]
    {
        for i in 0..n {
            for j in (i + 1)..n {
                let sim = (-0.5 * distance_sq(points, i, j)).exp();
                a[[i, j]] = sim;
                a[[j, i]] = sim;
            }
        }
    }

    Ok(a)
}

/// Squared Euclidean distance between rows i and j of the point matrix.
fn distance_sq(points: &Array2<f64>, i: usize, j: usize) -> f64 {
    let mut acc = 0.0;
    for k in 0..points.ncols() {
        let diff = points[[i, k]] - points[[j, k]];
        acc += diff * diff;
    }
    acc
}

/// Compute degree matrix D from affinity matrix A.
///
/// D[i,i] = sum of row i (total edge weight of node i, including the zero
/// self-term). Off-diagonal entries are stored zeros, never garbage.
pub fn degree_matrix(a: &Array2<f64>) -> Array2<f64> {
    let n = a.nrows();
    let mut d = Array2::zeros((n, n));

    for i in 0..n {
        let degree: f64 = a.row(i).sum();
        d[[i, i]] = degree;
    }

    d
}

/// Compute degree vector from affinity matrix.
pub fn degree_vector(a: &Array2<f64>) -> ndarray::Array1<f64> {
    a.sum_axis(ndarray::Axis(1))
}

/// Symmetrically normalized affinity: W = D^{-1/2} A D^{-1/2}.
///
/// Entrywise, W[i,j] = invSqrt[i] · A[i,j] · invSqrt[j] where
/// invSqrt[i] = 1/√D[i,i] if D[i,i] ≠ 0 and 0 otherwise.
///
/// # Zero-degree nodes
///
/// An isolated point (zero degree) gets a zero inverse-square-root factor,
/// which zeroes out its entire row and column of W. No error, no NaN.
///
/// All inverse square roots are computed before any entry of W, so no entry
/// ever mixes fresh and stale degree information.
///
/// # Errors
///
/// [`Error::ShapeMismatch`] if A is not square or D's shape differs from A's.
pub fn normalized_similarity(d: &Array2<f64>, a: &Array2<f64>) -> Result<Array2<f64>> {
    let n = ensure_square(a, "normalize")?;
    if d.dim() != a.dim() {
        return Err(Error::shape_mismatch("normalize", d.dim(), a.dim()));
    }

    // First pass: every inverse square root, before any W entry.
    let mut inv_sqrt = vec![0.0f64; n];
    for (i, inv) in inv_sqrt.iter_mut().enumerate() {
        let deg = d[[i, i]];
        if deg != 0.0 {
            *inv = 1.0 / deg.sqrt();
        }
    }

    let mut w = Array2::zeros((n, n));
    for i in 0..n {
        for j in 0..n {
            w[[i, j]] = inv_sqrt[i] * a[[i, j]] * inv_sqrt[j];
        }
    }

    Ok(w)
}

/// The full graph chain: points → affinity → degrees → normalized affinity.
///
/// Convenience wrapper over [`similarity_matrix`], [`degree_matrix`] and
/// [`normalized_similarity`]; the intermediate A and D are dropped on return.
pub fn normalized_from_points(points: &Array2<f64>) -> Result<Array2<f64>> {
    let a = similarity_matrix(points)?;
    let d = degree_matrix(&a);
    normalized_similarity(&d, &a)
}
