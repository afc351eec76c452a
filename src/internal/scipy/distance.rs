//! Distance computation functions ported from scipy.spatial.distance
//!
//! Euclidean only. Missing coordinates are NaN and propagate into every
//! distance they take part in, as they do in scipy.

use nalgebra::{DMatrix, Point2};

/// Pairwise Euclidean distances between two point sets.
///
/// # Arguments
/// * `xa` - First set of points
/// * `xb` - Second set of points
///
/// # Returns
/// Distance matrix of shape (xa.len() x xb.len())
pub fn cdist(xa: &[Point2<f64>], xb: &[Point2<f64>]) -> DMatrix<f64> {
    DMatrix::from_fn(xa.len(), xb.len(), |i, j| nalgebra::distance(&xa[i], &xb[j]))
}

/// Condensed pairwise distances within one point set.
///
/// Entry order follows scipy: (0,1), (0,2), ..., (0,n-1), (1,2), ...
pub fn pdist(points: &[Point2<f64>]) -> Vec<f64> {
    let n = points.len();
    let mut condensed = Vec::with_capacity(n * n.saturating_sub(1) / 2);
    for i in 0..n {
        for j in (i + 1)..n {
            condensed.push(nalgebra::distance(&points[i], &points[j]));
        }
    }
    condensed
}

/// Expand a condensed distance vector into a square symmetric matrix.
///
/// The diagonal is always zero.
pub fn squareform(condensed: &[f64], n: usize) -> DMatrix<f64> {
    assert_eq!(
        condensed.len(),
        n * n.saturating_sub(1) / 2,
        "Condensed length does not match {} points",
        n
    );

    let mut result = DMatrix::zeros(n, n);
    let mut k = 0;
    for i in 0..n {
        for j in (i + 1)..n {
            result[(i, j)] = condensed[k];
            result[(j, i)] = condensed[k];
            k += 1;
        }
    }
    result
}
