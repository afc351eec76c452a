//! Frame-indexed wide tables.
//!
//! The long detection table (one row per detection) is pivoted into one
//! matrix per field with frames as rows and entities as columns. Column
//! identity is the explicit pair `(Field, entity_id)`.

use std::collections::BTreeSet;
use std::fmt;

use log::debug;
use nalgebra::{DMatrix, Point2};
use serde::{Deserialize, Serialize};

use crate::internal::numpy::fill_linear_bounded;
use crate::{Detection, EntityId, Error, FrameIndex, Result, SourceTag};

/// A per-entity measurement stored in the wide table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    CentroidX,
    CentroidY,
    FrontX,
    FrontY,
}

impl Field {
    pub const ALL: [Field; 4] = [Field::CentroidX, Field::CentroidY, Field::FrontX, Field::FrontY];

    /// Column name used by the tracking tables.
    pub fn name(&self) -> &'static str {
        match self {
            Field::CentroidX => "centroidX",
            Field::CentroidY => "centroidY",
            Field::FrontX => "frontX",
            Field::FrontY => "frontY",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where the value of a cell came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellOrigin {
    Missing,
    Observed,
    Interpolated,
    /// Set by the bounded fill of the restructurer.
    Filled,
}

/// Configuration for building a wide table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestructureConfig {
    /// Fill interior gaps of at most this many rows. Off when `None`.
    pub fill_limit: Option<usize>,

    /// Keep the front point columns.
    pub include_front: bool,
}

impl Default for RestructureConfig {
    fn default() -> Self {
        Self {
            fill_limit: None,
            include_front: true,
        }
    }
}

/// Frames x entities table of positions.
#[derive(Debug, Clone)]
pub struct WideFrame {
    frames: Vec<FrameIndex>,
    entity_ids: Vec<EntityId>,
    sources: Vec<SourceTag>,
    centroid_x: DMatrix<f64>,
    centroid_y: DMatrix<f64>,
    front: Option<(DMatrix<f64>, DMatrix<f64>)>,
    origin: DMatrix<CellOrigin>,
}

impl WideFrame {
    /// Pivot cleaned detections into a wide table.
    ///
    /// Only usable detections (neither jump nor unresolvable) enter. The
    /// frame index is the sorted set of frames present among them and the
    /// entity columns are sorted ascending.
    ///
    /// # Errors
    /// `Error::DuplicateDetection` if an (entity, frame) pair occurs twice.
    pub fn from_detections(detections: Vec<Detection>, config: &RestructureConfig) -> Result<Self> {
        let usable: Vec<Detection> = detections.into_iter().filter(|d| d.is_usable()).collect();

        let frames: Vec<FrameIndex> = usable
            .iter()
            .map(|d| d.frame)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let entity_ids: Vec<EntityId> = usable
            .iter()
            .map(|d| d.entity_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let (n_frames, n_entities) = (frames.len(), entity_ids.len());
        let mut centroid_x = DMatrix::from_element(n_frames, n_entities, f64::NAN);
        let mut centroid_y = DMatrix::from_element(n_frames, n_entities, f64::NAN);
        let mut front_x = DMatrix::from_element(n_frames, n_entities, f64::NAN);
        let mut front_y = DMatrix::from_element(n_frames, n_entities, f64::NAN);
        let mut origin = DMatrix::from_element(n_frames, n_entities, CellOrigin::Missing);
        let mut sources: Vec<Option<SourceTag>> = vec![None; n_entities];

        for det in &usable {
            // Both searches hit: the index was built from these detections.
            let (Ok(row), Ok(col)) = (frames.binary_search(&det.frame), entity_ids.binary_search(&det.entity_id))
            else {
                continue;
            };

            if origin[(row, col)] != CellOrigin::Missing {
                return Err(Error::DuplicateDetection {
                    entity_id: det.entity_id,
                    frame: det.frame,
                });
            }

            centroid_x[(row, col)] = det.centroid.x;
            centroid_y[(row, col)] = det.centroid.y;
            if let Some(front) = det.front {
                front_x[(row, col)] = front.x;
                front_y[(row, col)] = front.y;
            }
            origin[(row, col)] = if det.interpolated {
                CellOrigin::Interpolated
            } else {
                CellOrigin::Observed
            };
            sources[col].get_or_insert_with(|| det.source.clone());
        }

        let mut wide = Self {
            frames,
            entity_ids,
            sources: sources.into_iter().map(Option::unwrap_or_default).collect(),
            centroid_x,
            centroid_y,
            front: config.include_front.then_some((front_x, front_y)),
            origin,
        };

        if let Some(limit) = config.fill_limit {
            wide.fill_bounded(limit);
        }

        debug!(
            "restructured {} detections into {} frames x {} entities",
            usable.len(),
            wide.frames.len(),
            wide.entity_ids.len()
        );

        Ok(wide)
    }

    /// Linearly fill interior gaps of at most `limit` rows, per entity column.
    ///
    /// Front points are filled only inside filled centroid gaps, and only
    /// when both rows bounding the gap carry one. Observed rows are never
    /// touched.
    fn fill_bounded(&mut self, limit: usize) {
        for col in 0..self.entity_ids.len() {
            let mut xs: Vec<f64> = self.centroid_x.column(col).iter().copied().collect();
            let mut ys: Vec<f64> = self.centroid_y.column(col).iter().copied().collect();
            let filled = fill_linear_bounded(&mut xs, limit);
            fill_linear_bounded(&mut ys, limit);

            for &row in &filled {
                self.centroid_x[(row, col)] = xs[row];
                self.centroid_y[(row, col)] = ys[row];
                self.origin[(row, col)] = CellOrigin::Filled;
            }

            if let Some((fx, fy)) = self.front.as_mut() {
                for (lo, hi) in gap_bounds(&filled) {
                    for m in [&mut *fx, &mut *fy] {
                        let (v0, v1) = (m[(lo, col)], m[(hi, col)]);
                        if v0.is_nan() || v1.is_nan() {
                            continue;
                        }
                        let span = (hi - lo) as f64;
                        for row in (lo + 1)..hi {
                            m[(row, col)] = v0 + (v1 - v0) * (row - lo) as f64 / span;
                        }
                    }
                }
            }
        }
    }

    pub fn frames(&self) -> &[FrameIndex] {
        &self.frames
    }

    pub fn entity_ids(&self) -> &[EntityId] {
        &self.entity_ids
    }

    /// Recording metadata of each entity column.
    pub fn sources(&self) -> &[SourceTag] {
        &self.sources
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.frames.len(), self.entity_ids.len())
    }

    pub fn has_front(&self) -> bool {
        self.front.is_some()
    }

    pub fn centroid_x(&self) -> &DMatrix<f64> {
        &self.centroid_x
    }

    pub fn centroid_y(&self) -> &DMatrix<f64> {
        &self.centroid_y
    }

    /// Matrix of one field, `None` for front fields when they are not kept.
    pub fn field(&self, field: Field) -> Option<&DMatrix<f64>> {
        match field {
            Field::CentroidX => Some(&self.centroid_x),
            Field::CentroidY => Some(&self.centroid_y),
            Field::FrontX => self.front.as_ref().map(|(x, _)| x),
            Field::FrontY => self.front.as_ref().map(|(_, y)| y),
        }
    }

    pub fn origin(&self) -> &DMatrix<CellOrigin> {
        &self.origin
    }

    /// Column keys in output order: every field of entity 1, then entity 2, ...
    pub fn column_keys(&self) -> Vec<(Field, EntityId)> {
        let fields: &[Field] = if self.has_front() {
            &Field::ALL
        } else {
            &Field::ALL[..2]
        };
        self.entity_ids
            .iter()
            .flat_map(|&id| fields.iter().map(move |&f| (f, id)))
            .collect()
    }

    pub fn frame_row(&self, frame: FrameIndex) -> Option<usize> {
        self.frames.binary_search(&frame).ok()
    }

    pub fn entity_column(&self, entity_id: EntityId) -> Option<usize> {
        self.entity_ids.binary_search(&entity_id).ok()
    }

    /// Centroid of an entity in a frame, `None` if missing.
    pub fn position(&self, frame: FrameIndex, entity_id: EntityId) -> Option<Point2<f64>> {
        let (row, col) = (self.frame_row(frame)?, self.entity_column(entity_id)?);
        let (x, y) = (self.centroid_x[(row, col)], self.centroid_y[(row, col)]);
        if x.is_nan() || y.is_nan() {
            None
        } else {
            Some(Point2::new(x, y))
        }
    }

    /// Centroids of all entities at row `row`, NaN where missing.
    pub fn centroids_at(&self, row: usize) -> Vec<Point2<f64>> {
        (0..self.entity_ids.len())
            .map(|col| Point2::new(self.centroid_x[(row, col)], self.centroid_y[(row, col)]))
            .collect()
    }

    /// Read the table back as detections, sorted by (entity, frame).
    ///
    /// Interpolated and filled cells come back with `interpolated = true`.
    pub fn to_detections(&self) -> Vec<Detection> {
        let mut detections = Vec::new();

        for (col, &entity_id) in self.entity_ids.iter().enumerate() {
            for (row, &frame) in self.frames.iter().enumerate() {
                let origin = self.origin[(row, col)];
                if origin == CellOrigin::Missing {
                    continue;
                }

                let mut det = Detection {
                    entity_id,
                    frame,
                    centroid: Point2::new(self.centroid_x[(row, col)], self.centroid_y[(row, col)]),
                    front: None,
                    source: self.sources[col].clone(),
                    interpolated: matches!(origin, CellOrigin::Interpolated | CellOrigin::Filled),
                    resolved_duplicate: false,
                    unresolvable_duplicate: false,
                    jump: false,
                };
                if let Some((fx, fy)) = &self.front {
                    det = det.with_front(fx[(row, col)], fy[(row, col)]);
                }
                detections.push(det);
            }
        }

        detections
    }
}

/// Bounding rows `(before, after)` of each run of consecutive filled rows.
///
/// Filled rows are interior, so every run has a row on both sides.
fn gap_bounds(filled: &[usize]) -> Vec<(usize, usize)> {
    let mut bounds = Vec::new();
    let mut rows = filled.iter().copied();
    let Some(mut start) = rows.next() else {
        return bounds;
    };

    let mut prev = start;
    for row in rows {
        if row != prev + 1 {
            bounds.push((start - 1, prev + 1));
            start = row;
        }
        prev = row;
    }
    bounds.push((start - 1, prev + 1));
    bounds
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn det(id: i64, frame: i64, x: f64, y: f64) -> Detection {
        Detection::new(id, frame, x, y).unwrap()
    }

    #[test]
    fn test_index_sorted_and_missing_nan() {
        let dets = vec![det(7, 3, 1.0, 1.0), det(2, 1, 2.0, 2.0), det(7, 1, 3.0, 3.0)];
        let wide = WideFrame::from_detections(dets, &RestructureConfig::default()).unwrap();

        assert_eq!(wide.frames(), &[1, 3]);
        assert_eq!(wide.entity_ids(), &[2, 7]);
        assert_eq!(wide.shape(), (2, 2));
        assert!(wide.position(3, 2).is_none());
        assert_eq!(wide.origin()[(1, 0)], CellOrigin::Missing);
        assert_eq!(wide.position(1, 7), Some(Point2::new(3.0, 3.0)));
    }

    #[test]
    fn test_duplicate_pair_rejected() {
        let dets = vec![det(1, 1, 0.0, 0.0), det(1, 1, 5.0, 5.0)];
        let err = WideFrame::from_detections(dets, &RestructureConfig::default()).unwrap_err();
        assert!(matches!(err, Error::DuplicateDetection { entity_id: 1, frame: 1 }));
    }

    #[test]
    fn test_flagged_rows_excluded() {
        let mut jump = det(1, 2, 900.0, 900.0);
        jump.jump = true;
        let mut unresolvable = det(1, 2, 5.0, 5.0);
        unresolvable.unresolvable_duplicate = true;

        let dets = vec![det(1, 1, 0.0, 0.0), jump, unresolvable];
        let wide = WideFrame::from_detections(dets, &RestructureConfig::default()).unwrap();
        assert_eq!(wide.frames(), &[1]);
    }

    #[test]
    fn test_round_trip_positions() {
        let dets = vec![
            det(1, 1, 0.5, 1.5).with_front(1.0, 2.0),
            det(1, 4, 2.5, 3.5),
            det(3, 2, 10.0, 11.0),
        ];
        let wide = WideFrame::from_detections(dets.clone(), &RestructureConfig::default()).unwrap();
        let back = wide.to_detections();

        assert_eq!(back.len(), dets.len());
        for (a, b) in back.iter().zip(dets.iter()) {
            assert_eq!((a.entity_id, a.frame), (b.entity_id, b.frame));
            assert_eq!(a.centroid, b.centroid);
            assert_eq!(a.front, b.front);
        }
    }

    #[test]
    fn test_column_keys() {
        let dets = vec![det(1, 1, 0.0, 0.0), det(2, 1, 0.0, 0.0)];

        let wide = WideFrame::from_detections(dets.clone(), &RestructureConfig::default()).unwrap();
        assert_eq!(wide.column_keys().len(), 8);
        assert_eq!(wide.column_keys()[4], (Field::CentroidX, 2));

        let config = RestructureConfig {
            include_front: false,
            ..Default::default()
        };
        let wide = WideFrame::from_detections(dets, &config).unwrap();
        assert_eq!(
            wide.column_keys(),
            vec![
                (Field::CentroidX, 1),
                (Field::CentroidY, 1),
                (Field::CentroidX, 2),
                (Field::CentroidY, 2)
            ]
        );
        assert!(wide.field(Field::FrontX).is_none());
    }

    #[test]
    fn test_bounded_fill_by_row_position() {
        // Entity 2 provides the frames 2 and 3 rows that entity 1 is missing.
        let dets = vec![
            det(1, 1, 0.0, 0.0),
            det(1, 4, 30.0, 0.0),
            det(2, 2, 5.0, 5.0),
            det(2, 3, 5.0, 5.0),
        ];
        let config = RestructureConfig {
            fill_limit: Some(2),
            ..Default::default()
        };

        let wide = WideFrame::from_detections(dets, &config).unwrap();

        assert_relative_eq!(wide.position(2, 1).unwrap().x, 10.0, epsilon = 1e-10);
        assert_relative_eq!(wide.position(3, 1).unwrap().x, 20.0, epsilon = 1e-10);
        assert_eq!(wide.origin()[(1, 0)], CellOrigin::Filled);
        // Leading and trailing gaps of entity 2 stay empty.
        assert!(wide.position(1, 2).is_none());
        assert!(wide.position(4, 2).is_none());
    }

    #[test]
    fn test_fill_keeps_observed_rows_without_front() {
        let dets = vec![
            det(1, 1, 0.0, 0.0).with_front(0.0, 0.0),
            det(1, 2, 1.0, 0.0),
            det(1, 3, 2.0, 0.0).with_front(2.0, 0.0),
        ];
        let config = RestructureConfig {
            fill_limit: Some(2),
            ..Default::default()
        };

        let wide = WideFrame::from_detections(dets.clone(), &config).unwrap();
        assert_eq!(wide.origin()[(1, 0)], CellOrigin::Observed);
        assert!(wide.field(Field::FrontX).unwrap()[(1, 0)].is_nan());

        let back = wide.to_detections();
        assert_eq!(back.len(), dets.len());
        for (a, b) in back.iter().zip(dets.iter()) {
            assert_eq!(a.centroid, b.centroid);
            assert_eq!(a.front, b.front);
            assert!(!a.interpolated);
        }
    }

    #[test]
    fn test_fill_front_needs_both_bounds() {
        // Entity 2 provides rows for frames 2 and 3.
        let dets = vec![
            det(1, 1, 0.0, 0.0).with_front(0.0, 10.0),
            det(1, 4, 30.0, 0.0).with_front(30.0, 10.0),
            det(2, 2, 5.0, 5.0),
            det(2, 3, 5.0, 5.0),
            det(3, 1, 0.0, 0.0).with_front(0.0, 0.0),
            det(3, 4, 30.0, 0.0),
        ];
        let config = RestructureConfig {
            fill_limit: Some(2),
            ..Default::default()
        };

        let wide = WideFrame::from_detections(dets, &config).unwrap();
        let (fx, fy) = (wide.field(Field::FrontX).unwrap(), wide.field(Field::FrontY).unwrap());

        assert_eq!(wide.origin()[(1, 0)], CellOrigin::Filled);
        assert_relative_eq!(fx[(1, 0)], 10.0, epsilon = 1e-10);
        assert_relative_eq!(fx[(2, 0)], 20.0, epsilon = 1e-10);
        assert_relative_eq!(fy[(2, 0)], 10.0, epsilon = 1e-10);

        // Entity 3: centroid filled, front left missing.
        assert_eq!(wide.origin()[(1, 2)], CellOrigin::Filled);
        assert!(fx[(1, 2)].is_nan());
        assert!(fx[(2, 2)].is_nan());
    }

    #[test]
    fn test_gap_bounds() {
        assert_eq!(gap_bounds(&[]), Vec::<(usize, usize)>::new());
        assert_eq!(gap_bounds(&[2, 3, 6]), vec![(1, 4), (5, 7)]);
    }

    #[test]
    fn test_no_fill_by_default() {
        let dets = vec![det(1, 1, 0.0, 0.0), det(1, 3, 2.0, 0.0), det(2, 2, 0.0, 0.0)];
        let wide = WideFrame::from_detections(dets, &RestructureConfig::default()).unwrap();
        assert!(wide.position(2, 1).is_none());
    }

    #[test]
    fn test_interpolated_origin() {
        let mut synthetic = det(1, 2, 1.0, 0.0);
        synthetic.interpolated = true;
        let wide = WideFrame::from_detections(vec![det(1, 1, 0.0, 0.0), synthetic], &RestructureConfig::default())
            .unwrap();

        assert_eq!(wide.origin()[(1, 0)], CellOrigin::Interpolated);
        assert!(wide.to_detections()[1].interpolated);
    }

    #[test]
    fn test_empty_input() {
        let wide = WideFrame::from_detections(Vec::new(), &RestructureConfig::default()).unwrap();
        assert!(wide.is_empty());
        assert!(wide.to_detections().is_empty());
    }
}
