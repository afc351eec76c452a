//! Distance trait definition.

use nalgebra::DMatrix;

use crate::StaticObject;

/// Trait for entity-to-object distance functions.
///
/// Implementations map the centroid matrices of a wide table to a matrix of
/// distances against one static object. Missing positions are NaN on input
/// and stay NaN on output.
pub trait ObjectDistance: Send + Sync {
    /// Compute distances from every (frame, entity) cell to `object`.
    ///
    /// # Arguments
    /// * `xs` - Centroid x coordinates, frames x entities
    /// * `ys` - Centroid y coordinates, same shape as `xs`
    /// * `object` - The static object to measure against
    ///
    /// # Returns
    /// Distance matrix with the shape of `xs`.
    fn get_distances(&self, xs: &DMatrix<f64>, ys: &DMatrix<f64>, object: &StaticObject) -> DMatrix<f64>;
}
