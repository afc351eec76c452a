//! Arena partitioning.
//!
//! Recording rigs film two nests side by side. Detections and nest objects
//! are split at a fixed x-coordinate so each half is analysed on its own.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::static_object::StaticObject;
use crate::Detection;

/// Default x-coordinate separating the left and right arenas.
pub const DEFAULT_SPLIT_THRESHOLD: f64 = 2000.0;

/// Spatial half of the recording, or the whole arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ArenaPartition {
    Left,
    Right,
    Whole,
}

impl fmt::Display for ArenaPartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArenaPartition::Left => "Left",
            ArenaPartition::Right => "Right",
            ArenaPartition::Whole => "Whole",
        };
        f.write_str(name)
    }
}

/// How detections are assigned to partitions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PartitionMode {
    /// `x < threshold` is Left, everything else Right.
    Split { threshold: f64 },
    /// Everything is Whole.
    Whole,
}

impl Default for PartitionMode {
    fn default() -> Self {
        PartitionMode::Split {
            threshold: DEFAULT_SPLIT_THRESHOLD,
        }
    }
}

impl PartitionMode {
    /// Partition label of a detection, decided by its centroid x.
    pub fn classify(&self, x: f64) -> ArenaPartition {
        match *self {
            PartitionMode::Whole => ArenaPartition::Whole,
            PartitionMode::Split { threshold } => {
                if x < threshold {
                    ArenaPartition::Left
                } else {
                    ArenaPartition::Right
                }
            }
        }
    }

    /// Split detections into partitions, ordered Left, Right, Whole.
    ///
    /// Partitions without detections are omitted.
    pub fn split_detections(&self, detections: Vec<Detection>) -> Vec<(ArenaPartition, Vec<Detection>)> {
        let mut left = Vec::new();
        let mut right = Vec::new();
        let mut whole = Vec::new();

        for det in detections {
            match self.classify(det.centroid.x) {
                ArenaPartition::Left => left.push(det),
                ArenaPartition::Right => right.push(det),
                ArenaPartition::Whole => whole.push(det),
            }
        }

        [
            (ArenaPartition::Left, left),
            (ArenaPartition::Right, right),
            (ArenaPartition::Whole, whole),
        ]
        .into_iter()
        .filter(|(_, dets)| !dets.is_empty())
        .collect()
    }

    /// Select the static objects belonging to one partition.
    ///
    /// Objects are placed by their representative point. In split mode an
    /// object lying exactly on the threshold belongs to neither half. A half
    /// that keeps fewer than two objects gets only those; there is no
    /// fallback to the full object set.
    pub fn objects_for(&self, partition: ArenaPartition, objects: &[StaticObject]) -> Vec<StaticObject> {
        let threshold = match (*self, partition) {
            (PartitionMode::Whole, _) | (_, ArenaPartition::Whole) => return objects.to_vec(),
            (PartitionMode::Split { threshold }, _) => threshold,
        };

        objects
            .iter()
            .filter(|obj| {
                let x = obj.representative_point().x;
                match partition {
                    ArenaPartition::Left => x < threshold,
                    ArenaPartition::Right => x > threshold,
                    ArenaPartition::Whole => true,
                }
            })
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::static_object::Shape;
    use nalgebra::Point2;

    #[test]
    fn test_classify_split() {
        let mode = PartitionMode::default();
        assert_eq!(mode.classify(1999.9), ArenaPartition::Left);
        assert_eq!(mode.classify(2000.0), ArenaPartition::Right);
        assert_eq!(mode.classify(3500.0), ArenaPartition::Right);
    }

    #[test]
    fn test_classify_whole() {
        assert_eq!(PartitionMode::Whole.classify(10_000.0), ArenaPartition::Whole);
    }

    #[test]
    fn test_split_detections_orders_partitions() {
        let dets = vec![
            Detection::new(1, 1, 2500.0, 0.0).unwrap(),
            Detection::new(2, 1, 100.0, 0.0).unwrap(),
            Detection::new(3, 1, 2100.0, 0.0).unwrap(),
        ];

        let parts = PartitionMode::default().split_detections(dets);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].0, ArenaPartition::Left);
        assert_eq!(parts[0].1.len(), 1);
        assert_eq!(parts[1].0, ArenaPartition::Right);
        assert_eq!(parts[1].1.len(), 2);
    }

    #[test]
    fn test_objects_for_partition() {
        let objects = vec![
            StaticObject::new("Egg", 0, Shape::Point(Point2::new(100.0, 50.0))),
            StaticObject::new(
                "Larvae",
                1,
                Shape::Circle {
                    center: Point2::new(2600.0, 50.0),
                    radius: 20.0,
                },
            ),
            StaticObject::new("Wax", 2, Shape::Point(Point2::new(2000.0, 50.0))),
        ];

        let mode = PartitionMode::default();
        let left = mode.objects_for(ArenaPartition::Left, &objects);
        let right = mode.objects_for(ArenaPartition::Right, &objects);

        assert_eq!(left.len(), 1);
        assert_eq!(left[0].label, "Egg");
        assert_eq!(right.len(), 1);
        assert_eq!(right[0].label, "Larvae");

        let whole = PartitionMode::Whole.objects_for(ArenaPartition::Whole, &objects);
        assert_eq!(whole.len(), 3);
    }

    #[test]
    fn test_sparse_half_keeps_only_its_objects() {
        let objects = vec![
            StaticObject::new("Egg", 0, Shape::Point(Point2::new(100.0, 50.0))),
            StaticObject::new("Egg", 1, Shape::Point(Point2::new(2500.0, 50.0))),
            StaticObject::new("Egg", 2, Shape::Point(Point2::new(2700.0, 50.0))),
        ];

        let left = PartitionMode::default().objects_for(ArenaPartition::Left, &objects);
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].object_index, 0);

        let split = PartitionMode::Split { threshold: 5000.0 };
        assert!(split.objects_for(ArenaPartition::Right, &objects).is_empty());
    }
}
