//! Tag detections, the rows of the long tracking table.

use std::collections::BTreeMap;

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Stable integer identifier of one tracked individual (tag number).
pub type EntityId = i64;

/// Video frame number.
pub type FrameIndex = i64;

/// Identifies which recording a detection came from.
///
/// Used together with the entity id and frame as the duplicate grouping key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceTag {
    /// Originating video or tracking file name.
    pub filename: String,
    /// Colony number of the recorded nest.
    pub colony: String,
}

impl SourceTag {
    pub fn new(filename: impl Into<String>, colony: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            colony: colony.into(),
        }
    }
}

/// A single tag detection in one frame.
///
/// Positions are in image pixels. The front point is the tag's orientation
/// marker and is optional because some trackers only report centroids.
/// The boolean flags record what the cleaning stages decided about the row.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Tag identifier.
    pub entity_id: EntityId,

    /// Frame in which the tag was seen.
    pub frame: FrameIndex,

    /// Tag centroid.
    pub centroid: Point2<f64>,

    /// Optional front (orientation) point.
    pub front: Option<Point2<f64>>,

    /// Recording metadata.
    pub source: SourceTag,

    /// Synthesized by the gap interpolator.
    pub interpolated: bool,

    /// Kept as the best candidate of a duplicate group.
    pub resolved_duplicate: bool,

    /// Member of a duplicate group that could not be resolved.
    pub unresolvable_duplicate: bool,

    /// Flagged as an implausible single-frame jump.
    pub jump: bool,
}

impl Detection {
    /// Create a detection at the given centroid.
    ///
    /// # Arguments
    /// * `entity_id` - Tag identifier
    /// * `frame` - Frame number
    /// * `x`, `y` - Centroid coordinates, must be finite
    pub fn new(entity_id: EntityId, frame: FrameIndex, x: f64, y: f64) -> Result<Self> {
        if !x.is_finite() || !y.is_finite() {
            return Err(Error::InvalidDetection(format!(
                "entity {} frame {} has non-finite centroid ({}, {})",
                entity_id, frame, x, y
            )));
        }

        Ok(Self {
            entity_id,
            frame,
            centroid: Point2::new(x, y),
            front: None,
            source: SourceTag::default(),
            interpolated: false,
            resolved_duplicate: false,
            unresolvable_duplicate: false,
            jump: false,
        })
    }

    /// Attach a front point. Non-finite coordinates leave the front unset.
    pub fn with_front(mut self, x: f64, y: f64) -> Self {
        self.front = if x.is_finite() && y.is_finite() {
            Some(Point2::new(x, y))
        } else {
            None
        };
        self
    }

    /// Attach recording metadata.
    pub fn with_source(mut self, source: SourceTag) -> Self {
        self.source = source;
        self
    }

    /// Euclidean distance between the centroids of two detections.
    pub fn distance_to(&self, other: &Detection) -> f64 {
        nalgebra::distance(&self.centroid, &other.centroid)
    }

    /// Whether this detection may appear in the wide table.
    pub fn is_usable(&self) -> bool {
        !self.jump && !self.unresolvable_duplicate
    }

    /// Whether this detection may anchor an interpolated gap.
    pub fn is_anchor(&self) -> bool {
        self.is_usable() && !self.interpolated
    }

    /// Key of the trajectory this detection belongs to.
    pub fn trajectory_key(&self) -> TrajectoryKey {
        TrajectoryKey {
            entity_id: self.entity_id,
            source: self.source.clone(),
        }
    }

    /// Rows that are identical in key and position.
    pub(crate) fn same_reading(&self, other: &Detection) -> bool {
        self.entity_id == other.entity_id
            && self.frame == other.frame
            && self.source == other.source
            && self.centroid == other.centroid
            && self.front == other.front
    }
}

/// Identifies one entity's trajectory within a recording.
///
/// Orders by entity id first so iteration follows the (entity, frame) order
/// the cleaning stages rely on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrajectoryKey {
    pub entity_id: EntityId,
    pub source: SourceTag,
}

/// Split detections into per-entity trajectories, each sorted by frame.
///
/// The sort is stable, so rows sharing a frame keep their input order.
pub fn into_trajectories(detections: Vec<Detection>) -> BTreeMap<TrajectoryKey, Vec<Detection>> {
    let mut trajectories: BTreeMap<TrajectoryKey, Vec<Detection>> = BTreeMap::new();
    for det in detections {
        trajectories.entry(det.trajectory_key()).or_default().push(det);
    }
    for trajectory in trajectories.values_mut() {
        trajectory.sort_by_key(|d| d.frame);
    }
    trajectories
}

/// Flatten trajectories back into a single (entity, frame)-ordered list.
pub fn from_trajectories(trajectories: BTreeMap<TrajectoryKey, Vec<Detection>>) -> Vec<Detection> {
    trajectories.into_values().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_detection_new() {
        let det = Detection::new(3, 10, 1.0, 2.0).unwrap();

        assert_eq!(det.entity_id, 3);
        assert_eq!(det.frame, 10);
        assert_relative_eq!(det.centroid.x, 1.0, epsilon = 1e-10);
        assert!(det.front.is_none());
        assert!(det.is_anchor());
    }

    #[test]
    fn test_detection_rejects_nan_centroid() {
        assert!(Detection::new(1, 1, f64::NAN, 0.0).is_err());
        assert!(Detection::new(1, 1, 0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_with_front_ignores_nan() {
        let det = Detection::new(1, 1, 0.0, 0.0).unwrap().with_front(f64::NAN, 1.0);
        assert!(det.front.is_none());

        let det = Detection::new(1, 1, 0.0, 0.0).unwrap().with_front(2.0, 1.0);
        assert_eq!(det.front, Some(Point2::new(2.0, 1.0)));
    }

    #[test]
    fn test_distance_to() {
        let a = Detection::new(1, 1, 0.0, 0.0).unwrap();
        let b = Detection::new(1, 2, 3.0, 4.0).unwrap();
        assert_relative_eq!(a.distance_to(&b), 5.0, epsilon = 1e-10);
    }

    #[test]
    fn test_flags_affect_usability() {
        let mut det = Detection::new(1, 1, 0.0, 0.0).unwrap();
        det.interpolated = true;
        assert!(det.is_usable());
        assert!(!det.is_anchor());

        det.jump = true;
        assert!(!det.is_usable());
    }

    #[test]
    fn test_into_trajectories_sorted() {
        let dets = vec![
            Detection::new(2, 5, 0.0, 0.0).unwrap(),
            Detection::new(1, 3, 0.0, 0.0).unwrap(),
            Detection::new(1, 1, 0.0, 0.0).unwrap(),
        ];

        let trajectories = into_trajectories(dets);
        let keys: Vec<_> = trajectories.keys().map(|k| k.entity_id).collect();
        assert_eq!(keys, vec![1, 2]);

        let flat = from_trajectories(trajectories);
        let order: Vec<_> = flat.iter().map(|d| (d.entity_id, d.frame)).collect();
        assert_eq!(order, vec![(1, 1), (1, 3), (2, 5)]);
    }
}
