//! Multiplicative-update factorization engine.
//!
//! Given the normalized affinity W (n × n, symmetric, nonnegative) and an
//! initial nonnegative factor H₀ (n × k), [`optimize`] iterates
//!
//! ```text
//! H[i,j] ← H[i,j] · (1 - β + β · (W H)[i,j] / (H Hᵀ H)[i,j]),   β = 1/2
//! ```
//!
//! until the squared Frobenius distance between successive iterates falls
//! below `eps` or `max_iter` is reached. The update rescales each entry by a
//! nonnegative factor, so nonnegativity is preserved across iterations.
//!
//! The numerator chain W·H and the denominator chain H·Hᵀ·H share only H;
//! each iteration reads the complete previous H, so iterations cannot
//! overlap. All per-iteration intermediates are dropped when the iteration
//! ends, on every exit path, keeping memory flat across the full budget.

use crate::{matrix, Error, Result};
use ndarray::Array2;
use rand::{Rng, SeedableRng};

/// Stopping parameters for [`optimize`].
///
/// The defaults match the reference pipeline; tests shrink them to keep
/// runtimes small.
#[derive(Debug, Clone)]
pub struct FactorizationConfig {
    /// Iteration cap. Reaching it is a valid termination, not an error.
    pub max_iter: usize,
    /// Convergence threshold on the squared Frobenius distance between
    /// successive factors.
    pub eps: f64,
}

impl Default for FactorizationConfig {
    fn default() -> Self {
        Self {
            max_iter: 300,
            eps: 1e-4,
        }
    }
}

/// Why the engine stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// δ² dropped below `eps`.
    Converged,
    /// The iteration cap was exhausted first.
    MaxIterReached,
}

/// Result of a factorization run.
#[derive(Debug, Clone)]
pub struct Factorization {
    /// The final n × k nonnegative factor.
    pub h: Array2<f64>,
    /// Number of update steps actually performed.
    pub iterations: usize,
    pub termination: Termination,
    /// Squared Frobenius distance between the last two iterates.
    pub delta_sq: f64,
}

/// Seeded uniform initial factor, scaled to W.
///
/// Entries are drawn from `[0, 2·sqrt(mean(W) / k))`, the initialization of
/// the reference pipeline. The same seed always produces the same H₀, so
/// full runs are reproducible. An all-zero W yields an all-zero H₀ (the
/// sampling range would otherwise be empty).
///
/// # Errors
///
/// [`Error::ShapeMismatch`] if W is not square; [`Error::InvalidDimension`]
/// if W is empty or `k` is zero.
pub fn initial_factor(w: &Array2<f64>, k: usize, seed: u64) -> Result<Array2<f64>> {
    let n = crate::ensure_square(w, "initial_factor")?;
    if n == 0 {
        return Err(Error::InvalidDimension { name: "n" });
    }
    if k == 0 {
        return Err(Error::InvalidDimension { name: "k" });
    }

    let mean = w.mean().unwrap_or(0.0);
    let upper = 2.0 * (mean / k as f64).sqrt();

    let mut h = Array2::zeros((n, k));
    if upper > 0.0 {
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        for v in h.iter_mut() {
            *v = rng.random_range(0.0..upper);
        }
    }
    Ok(h)
}

/// Run the multiplicative update from `h0` against a fixed `w`.
///
/// Deterministic given deterministic inputs; there is no randomness inside
/// the engine (seed [`initial_factor`] for a reproducible H₀).
///
/// # Zero denominators
///
/// When (H Hᵀ H)[i,j] is exactly zero the entry is left unchanged. This is
/// safe rather than lossy: for nonnegative H,
/// (H Hᵀ H)[i,j] ≥ ‖H row i‖² · H[i,j], so a zero denominator implies the
/// entry itself is already zero and the update factor is irrelevant. A
/// collapsed row therefore stays zero instead of poisoning later iterations
/// with NaN. Non-finite update results, which only arise from non-finite
/// input, surface [`Error::NumericInstability`].
///
/// # Errors
///
/// [`Error::ShapeMismatch`] if W is not square or `h0` has a different row
/// count; [`Error::InvalidDimension`] if `h0` has no columns;
/// [`Error::NegativeEntries`] if `h0` has a negative entry.
pub fn optimize(
    h0: &Array2<f64>,
    w: &Array2<f64>,
    cfg: &FactorizationConfig,
) -> Result<Factorization> {
    let n = crate::ensure_square(w, "optimize")?;
    if h0.nrows() != n {
        return Err(Error::shape_mismatch("optimize", w.dim(), h0.dim()));
    }
    let k = h0.ncols();
    if n == 0 {
        return Err(Error::InvalidDimension { name: "n" });
    }
    if k == 0 {
        return Err(Error::InvalidDimension { name: "k" });
    }
    if h0.iter().any(|&v| v < 0.0) {
        return Err(Error::NegativeEntries);
    }

    let mut h = h0.to_owned();
    let mut delta_sq = f64::INFINITY;

    for iteration in 0..cfg.max_iter {
        let wh = matrix::multiply(w, &h)?;
        let ht = matrix::transpose(&h);
        let hht = matrix::multiply(&h, &ht)?;
        let hhht = matrix::multiply(&hht, &h)?;

        let mut new_h = Array2::zeros((n, k));
        for i in 0..n {
            for j in 0..k {
                let den = hhht[[i, j]];
                let v = if den == 0.0 {
                    h[[i, j]]
                } else {
                    h[[i, j]] * (0.5 + 0.5 * wh[[i, j]] / den)
                };
                if !v.is_finite() {
                    return Err(Error::NumericInstability { row: i, col: j });
                }
                new_h[[i, j]] = v;
            }
        }

        let delta = matrix::frobenius_diff(&new_h, &h)?;
        delta_sq = delta * delta;
        log::debug!("iteration {}: delta_sq = {:.3e}", iteration + 1, delta_sq);

        h = new_h;

        if delta_sq < cfg.eps {
            log::info!(
                "converged after {} iterations (delta_sq = {:.3e})",
                iteration + 1,
                delta_sq
            );
            return Ok(Factorization {
                h,
                iterations: iteration + 1,
                termination: Termination::Converged,
                delta_sq,
            });
        }
    }

    log::info!(
        "iteration cap {} reached (delta_sq = {:.3e})",
        cfg.max_iter,
        delta_sq
    );
    Ok(Factorization {
        h,
        iterations: cfg.max_iter,
        termination: Termination::MaxIterReached,
        delta_sq,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalized_from_points;
    use ndarray::array;

    fn two_cluster_w() -> Array2<f64> {
        let points = array![[0.0, 0.0], [0.0, 1.0], [5.0, 5.0], [5.0, 6.0]];
        normalized_from_points(&points).unwrap()
    }

    #[test]
    fn test_default_config() {
        let cfg = FactorizationConfig::default();
        assert_eq!(cfg.max_iter, 300);
        assert!((cfg.eps - 1e-4).abs() < 1e-18);
    }

    #[test]
    fn test_optimize_rejects_bad_shapes() {
        let w = two_cluster_w();

        let wrong_rows = Array2::<f64>::zeros((3, 2));
        assert!(matches!(
            optimize(&wrong_rows, &w, &FactorizationConfig::default()),
            Err(Error::ShapeMismatch { .. })
        ));

        let not_square = Array2::<f64>::zeros((4, 3));
        let h0 = Array2::<f64>::zeros((4, 2));
        assert!(matches!(
            optimize(&h0, &not_square, &FactorizationConfig::default()),
            Err(Error::ShapeMismatch { .. })
        ));

        let no_columns = Array2::<f64>::zeros((4, 0));
        assert!(matches!(
            optimize(&no_columns, &w, &FactorizationConfig::default()),
            Err(Error::InvalidDimension { name: "k" })
        ));
    }

    #[test]
    fn test_optimize_rejects_negative_h0() {
        let w = two_cluster_w();
        let mut h0 = Array2::<f64>::zeros((4, 2));
        h0[[1, 1]] = -0.1;
        assert!(matches!(
            optimize(&h0, &w, &FactorizationConfig::default()),
            Err(Error::NegativeEntries)
        ));
    }

    #[test]
    fn test_zero_h0_is_a_fixed_point() {
        // Every denominator is zero; the policy keeps entries unchanged, so
        // the all-zero factor converges immediately with no NaN anywhere.
        let w = two_cluster_w();
        let h0 = Array2::<f64>::zeros((4, 2));

        let result = optimize(&h0, &w, &FactorizationConfig::default()).unwrap();

        assert_eq!(result.termination, Termination::Converged);
        assert_eq!(result.iterations, 1);
        assert!(result.h.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_collapsed_row_stays_zero() {
        let w = two_cluster_w();
        let mut h0 = Array2::<f64>::from_elem((4, 2), 0.4);
        h0[[1, 0]] = 0.0;
        h0[[1, 1]] = 0.0;

        let result = optimize(&h0, &w, &FactorizationConfig::default()).unwrap();

        assert_eq!(result.h[[1, 0]], 0.0);
        assert_eq!(result.h[[1, 1]], 0.0);
        assert!(result.h.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_nonnegativity_preserved_and_termination_consistent() {
        let w = two_cluster_w();
        let h0 = initial_factor(&w, 2, 42).unwrap();
        let cfg = FactorizationConfig::default();

        let result = optimize(&h0, &w, &cfg).unwrap();

        assert!(result.h.iter().all(|&v| v >= 0.0));
        // The only two valid terminations, and the invariant each implies.
        match result.termination {
            Termination::Converged => assert!(result.delta_sq < cfg.eps),
            Termination::MaxIterReached => assert_eq!(result.iterations, cfg.max_iter),
        }
    }

    #[test]
    fn test_optimize_is_deterministic() {
        let w = two_cluster_w();
        let h0 = initial_factor(&w, 2, 7).unwrap();
        let cfg = FactorizationConfig {
            max_iter: 25,
            eps: 1e-12,
        };

        let first = optimize(&h0, &w, &cfg).unwrap();
        let second = optimize(&h0, &w, &cfg).unwrap();

        assert_eq!(first.iterations, second.iterations);
        for (x, y) in first.h.iter().zip(second.h.iter()) {
            assert_eq!(x, y);
        }
    }

    #[test]
    fn test_max_iter_reached_returns_last_factor() {
        let w = two_cluster_w();
        let h0 = initial_factor(&w, 2, 3).unwrap();
        let cfg = FactorizationConfig {
            max_iter: 2,
            eps: 1e-300,
        };

        let result = optimize(&h0, &w, &cfg).unwrap();

        assert_eq!(result.termination, Termination::MaxIterReached);
        assert_eq!(result.iterations, 2);
        assert!(result.h.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_numeric_instability_on_nonfinite_input() {
        let mut w = two_cluster_w();
        w[[0, 1]] = f64::NAN;
        let h0 = Array2::<f64>::from_elem((4, 2), 0.5);

        let err = optimize(&h0, &w, &FactorizationConfig::default()).unwrap_err();
        assert!(matches!(err, Error::NumericInstability { .. }));
    }

    #[test]
    fn test_two_clusters_get_distinct_dominant_columns() {
        // End-to-end: points 0,1 sit near the origin, points 2,3 near (5,5).
        // From a fixed mildly biased H0, the rows of the optimized factor
        // must agree on a dominant column within each cluster and disagree
        // across clusters.
        let w = two_cluster_w();
        let h0 = array![[0.6, 0.4], [0.55, 0.45], [0.4, 0.6], [0.45, 0.55]];

        let result = optimize(&h0, &w, &FactorizationConfig::default()).unwrap();
        let h = &result.h;

        let dominant = |i: usize| if h[[i, 0]] >= h[[i, 1]] { 0 } else { 1 };

        assert_eq!(dominant(0), dominant(1));
        assert_eq!(dominant(2), dominant(3));
        assert_ne!(dominant(0), dominant(2));
    }

    #[test]
    fn test_initial_factor_is_seeded_and_bounded() {
        let w = two_cluster_w();

        let a = initial_factor(&w, 2, 1234).unwrap();
        let b = initial_factor(&w, 2, 1234).unwrap();
        let c = initial_factor(&w, 2, 1235).unwrap();

        assert_eq!(a.dim(), (4, 2));
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x, y);
        }
        assert!(a.iter().zip(c.iter()).any(|(x, y)| x != y));

        let upper = 2.0 * (w.mean().unwrap() / 2.0).sqrt();
        assert!(a.iter().all(|&v| (0.0..upper).contains(&v)));
    }

    #[test]
    fn test_initial_factor_zero_w_gives_zero_h() {
        let w = Array2::<f64>::zeros((3, 3));
        let h = initial_factor(&w, 2, 1).unwrap();
        assert!(h.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_initial_factor_rejects_zero_k() {
        let w = two_cluster_w();
        assert!(matches!(
            initial_factor(&w, 0, 1),
            Err(Error::InvalidDimension { name: "k" })
        ));
    }
}
