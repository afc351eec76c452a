//! Per-frame inter-entity distances.

use log::{debug, warn};
use nalgebra::DMatrix;

use crate::internal::numpy::nanmin;
use crate::internal::scipy::{pdist, squareform};
use crate::{EntityId, FrameIndex, WideFrame};

/// Symmetric entity-by-entity distance matrices, one per frame.
///
/// The diagonal is always 0. Off-diagonal cells are NaN when either entity
/// has no position in that frame.
#[derive(Debug, Clone)]
pub struct PairwiseDistanceTable {
    frames: Vec<FrameIndex>,
    entity_ids: Vec<EntityId>,
    matrices: Vec<DMatrix<f64>>,
}

impl PairwiseDistanceTable {
    pub fn frames(&self) -> &[FrameIndex] {
        &self.frames
    }

    pub fn entity_ids(&self) -> &[EntityId] {
        &self.entity_ids
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Distance matrix of the frame at row `index` of the wide table.
    pub fn matrix(&self, index: usize) -> Option<&DMatrix<f64>> {
        self.matrices.get(index)
    }

    /// Distance between two entities in a frame.
    ///
    /// Returns `None` if the frame or either entity is unknown, and `Some(NaN)`
    /// if either entity is known but undetected in that frame.
    pub fn distance(&self, frame: FrameIndex, a: EntityId, b: EntityId) -> Option<f64> {
        let row = self.frames.binary_search(&frame).ok()?;
        let i = self.entity_ids.binary_search(&a).ok()?;
        let j = self.entity_ids.binary_search(&b).ok()?;
        Some(self.matrices[row][(i, j)])
    }

    /// Distance from each entity to its closest detected neighbour.
    ///
    /// # Returns
    /// Frames x entities matrix, NaN where the entity is missing or alone.
    pub fn nearest_neighbor_distances(&self) -> DMatrix<f64> {
        let n = self.entity_ids.len();
        DMatrix::from_fn(self.frames.len(), n, |row, j| {
            let m = &self.matrices[row];
            nanmin((0..n).filter(|&k| k != j).map(|k| m[(j, k)]))
        })
    }
}

/// Compute the pairwise centroid distances for every frame of a wide table.
///
/// Returns `None` when the table holds fewer than two entities, since no
/// interaction can be measured.
pub fn compute_pairwise(wide: &WideFrame) -> Option<PairwiseDistanceTable> {
    let n = wide.entity_ids().len();
    if n < 2 {
        warn!("pairwise distances skipped: {} entities, no interactions possible", n);
        return None;
    }

    let matrices: Vec<DMatrix<f64>> = (0..wide.frames().len())
        .map(|row| squareform(&pdist(&wide.centroids_at(row)), n))
        .collect();

    debug!("pairwise distances: {} frames x {} entities", matrices.len(), n);

    Some(PairwiseDistanceTable {
        frames: wide.frames().to_vec(),
        entity_ids: wide.entity_ids().to_vec(),
        matrices,
    })
}
