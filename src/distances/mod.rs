//! Distance engines.
//!
//! This module provides:
//! - `ObjectDistance` trait for entity-to-object distance implementations
//! - `ScalarDistance` - wrapper for per-point distance functions
//! - `VectorizedDistance` - wrapper for whole-matrix distance functions
//! - `compute_pairwise` - per-frame inter-entity distance matrices
//! - `compute_geometry_distances` - distances to static nest objects
//! - Built-in geometry functions (segment distance, containment, centroids)

mod traits;
mod scalar;
mod vectorized;
mod functions;
mod pairwise;
mod geometry;

pub use traits::ObjectDistance;
pub use scalar::{ScalarDistance, ScalarDistanceFn};
pub use vectorized::{VectorizedDistance, VectorizedDistanceFn};
pub use functions::*;
pub use pairwise::{compute_pairwise, PairwiseDistanceTable};
pub use geometry::{compute_geometry_distances, GeometryDistanceTable, GeometryDistances};

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Shape, StaticObject};

/// Which distance a geometry table holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DistanceKind {
    /// Distance to the object's representative point.
    Centroid,
    /// Distance to the object's boundary, 0 inside.
    Minimum,
}

impl DistanceKind {
    /// Column-name prefix used in output tables.
    pub fn prefix(&self) -> &'static str {
        match self {
            DistanceKind::Centroid => "distC",
            DistanceKind::Minimum => "distM",
        }
    }
}

impl fmt::Display for DistanceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Get the distance implementation for an object and distance kind.
///
/// Circles and centroids are computed on whole matrices, polygon and
/// polyline boundaries point by point. Points have no boundary, so
/// `Minimum` returns `None` for them.
pub fn distance_for(kind: DistanceKind, object: &StaticObject) -> Option<Box<dyn ObjectDistance>> {
    match (kind, &object.shape) {
        (DistanceKind::Centroid, _) => Some(Box::new(VectorizedDistance::new(centroid_distances))),
        (DistanceKind::Minimum, Shape::Circle { .. }) => {
            Some(Box::new(VectorizedDistance::new(circle_boundary_distances)))
        }
        (DistanceKind::Minimum, Shape::Polygon(_) | Shape::Polyline(_)) => {
            Some(Box::new(ScalarDistance::new(boundary_distance)))
        }
        (DistanceKind::Minimum, Shape::Point(_)) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{DMatrix, Point2};

    fn square() -> StaticObject {
        StaticObject::new(
            "Wax",
            0,
            Shape::Polygon(vec![
                Point2::new(0.0, 0.0),
                Point2::new(2.0, 0.0),
                Point2::new(2.0, 2.0),
                Point2::new(0.0, 2.0),
            ]),
        )
    }

    // ===== ScalarDistance Wrapper Tests =====

    #[test]
    fn test_scalar_distance_wrapper_skips_missing() {
        let distance = ScalarDistance::new(boundary_distance);
        let xs = DMatrix::from_row_slice(2, 2, &[1.0, 5.0, f64::NAN, -3.0]);
        let ys = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, f64::NAN, 1.0]);

        let m = distance.get_distances(&xs, &ys, &square());

        assert_eq!(m.shape(), (2, 2));
        assert_eq!(m[(0, 0)], 0.0);
        assert_relative_eq!(m[(0, 1)], 3.0, epsilon = 1e-10);
        assert!(m[(1, 0)].is_nan());
        assert_relative_eq!(m[(1, 1)], 3.0, epsilon = 1e-10);
    }

    // ===== VectorizedDistance Wrapper Tests =====

    #[test]
    fn test_vectorized_distance_wrapper() {
        let distance = VectorizedDistance::new(centroid_distances);
        let xs = DMatrix::from_row_slice(1, 2, &[1.0, 4.0]);
        let ys = DMatrix::from_row_slice(1, 2, &[1.0, 5.0]);

        let m = distance.get_distances(&xs, &ys, &square());
        assert_relative_eq!(m[(0, 0)], 0.0, epsilon = 1e-10);
        assert_relative_eq!(m[(0, 1)], 5.0, epsilon = 1e-10);
    }

    #[test]
    fn test_vectorized_distance_wrapper_empty() {
        let distance = VectorizedDistance::new(centroid_distances);
        let empty = DMatrix::<f64>::zeros(0, 3);
        let m = distance.get_distances(&empty, &empty, &square());
        assert_eq!(m.shape(), (0, 3));
    }

    #[test]
    #[should_panic(expected = "Coordinate matrices must have the same shape")]
    fn test_wrapper_panics_on_shape_mismatch() {
        let distance = ScalarDistance::new(boundary_distance);
        distance.get_distances(&DMatrix::zeros(1, 2), &DMatrix::zeros(2, 1), &square());
    }

    // ===== distance_for Tests =====

    #[test]
    fn test_distance_for_point_has_no_boundary() {
        let point = StaticObject::new("pollen", 0, Shape::Point(Point2::new(0.0, 0.0)));
        assert!(distance_for(DistanceKind::Minimum, &point).is_none());
        assert!(distance_for(DistanceKind::Centroid, &point).is_some());
    }

    #[test]
    fn test_kind_prefix() {
        assert_eq!(DistanceKind::Centroid.to_string(), "distC");
        assert_eq!(DistanceKind::Minimum.prefix(), "distM");
    }
}
