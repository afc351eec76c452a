//! Scalar distance wrapper for per-point distance functions.

use super::traits::ObjectDistance;
use crate::StaticObject;
use nalgebra::{DMatrix, Point2};

/// Scalar distance function type.
pub type ScalarDistanceFn = fn(&Point2<f64>, &StaticObject) -> f64;

/// Wrapper for scalar distance functions.
///
/// Takes a function that computes the distance between a single point and
/// an object, and produces a full frames x entities matrix. Cells without a
/// position are left NaN and never reach the function.
#[derive(Clone, Copy)]
pub struct ScalarDistance {
    distance_fn: ScalarDistanceFn,
}

impl ScalarDistance {
    /// Create a new ScalarDistance wrapper.
    pub fn new(distance_fn: ScalarDistanceFn) -> Self {
        Self { distance_fn }
    }
}

impl ObjectDistance for ScalarDistance {
    #[inline]
    fn get_distances(&self, xs: &DMatrix<f64>, ys: &DMatrix<f64>, object: &StaticObject) -> DMatrix<f64> {
        assert_eq!(xs.shape(), ys.shape(), "Coordinate matrices must have the same shape");

        let (n_frames, n_entities) = xs.shape();
        let mut result = DMatrix::from_element(n_frames, n_entities, f64::NAN);

        for i in 0..n_frames {
            for j in 0..n_entities {
                let (x, y) = (xs[(i, j)], ys[(i, j)]);
                if x.is_nan() || y.is_nan() {
                    continue;
                }
                result[(i, j)] = (self.distance_fn)(&Point2::new(x, y), object);
            }
        }

        result
    }
}
