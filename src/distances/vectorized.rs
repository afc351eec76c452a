//! Vectorized distance wrapper for batch distance functions.

use super::traits::ObjectDistance;
use crate::StaticObject;
use nalgebra::DMatrix;

/// Vectorized distance function type.
///
/// Takes the x and y coordinate matrices and returns a distance matrix of the
/// same shape.
pub type VectorizedDistanceFn = fn(&DMatrix<f64>, &DMatrix<f64>, &StaticObject) -> DMatrix<f64>;

/// Wrapper for vectorized distance functions.
///
/// Takes a function that computes distances for all frames and entities at
/// once (e.g., circle boundary distance) and handles the empty cases.
#[derive(Clone, Copy)]
pub struct VectorizedDistance {
    distance_fn: VectorizedDistanceFn,
}

impl VectorizedDistance {
    /// Create a new VectorizedDistance wrapper.
    pub fn new(distance_fn: VectorizedDistanceFn) -> Self {
        Self { distance_fn }
    }
}

impl ObjectDistance for VectorizedDistance {
    #[inline]
    fn get_distances(&self, xs: &DMatrix<f64>, ys: &DMatrix<f64>, object: &StaticObject) -> DMatrix<f64> {
        assert_eq!(xs.shape(), ys.shape(), "Coordinate matrices must have the same shape");

        let (n_frames, n_entities) = xs.shape();
        if n_frames == 0 || n_entities == 0 {
            return DMatrix::zeros(n_frames, n_entities);
        }

        (self.distance_fn)(xs, ys, object)
    }
}
