//! Distances from entities to static nest objects.

use log::debug;
use nalgebra::DMatrix;

use super::{distance_for, DistanceKind};
use crate::internal::numpy::fmin_matrix;
use crate::{EntityId, FrameIndex, ObjectKey, Shape, StaticObject, WideFrame};

/// Frames x entities distance matrices, one per static object.
#[derive(Debug, Clone)]
pub struct GeometryDistanceTable {
    kind: DistanceKind,
    frames: Vec<FrameIndex>,
    entity_ids: Vec<EntityId>,
    columns: Vec<(ObjectKey, DMatrix<f64>)>,
}

impl GeometryDistanceTable {
    /// Create a table without object columns over the given index.
    pub fn new(kind: DistanceKind, frames: Vec<FrameIndex>, entity_ids: Vec<EntityId>) -> Self {
        Self {
            kind,
            frames,
            entity_ids,
            columns: Vec::new(),
        }
    }

    pub fn kind(&self) -> DistanceKind {
        self.kind
    }

    pub fn frames(&self) -> &[FrameIndex] {
        &self.frames
    }

    pub fn entity_ids(&self) -> &[EntityId] {
        &self.entity_ids
    }

    /// Object columns in insertion order.
    pub fn columns(&self) -> &[(ObjectKey, DMatrix<f64>)] {
        &self.columns
    }

    /// Number of object columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    fn push(&mut self, key: ObjectKey, distances: DMatrix<f64>) {
        debug_assert_eq!(distances.shape(), (self.frames.len(), self.entity_ids.len()));
        self.columns.push((key, distances));
    }

    /// External column name of an object, e.g. `distM_Larvae_3`.
    pub fn column_name(&self, key: &ObjectKey) -> String {
        format!("{}_{}", self.kind.prefix(), key)
    }

    pub fn get(&self, key: &ObjectKey) -> Option<&DMatrix<f64>> {
        self.columns.iter().find(|(k, _)| k == key).map(|(_, m)| m)
    }

    /// Distance of one entity to one object in one frame.
    pub fn value(&self, key: &ObjectKey, frame: FrameIndex, entity_id: EntityId) -> Option<f64> {
        let row = self.frames.binary_search(&frame).ok()?;
        let col = self.entity_ids.binary_search(&entity_id).ok()?;
        self.get(key).map(|m| m[(row, col)])
    }

    /// Distinct labels, sorted.
    pub fn labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = self.columns.iter().map(|(k, _)| k.label.as_str()).collect();
        labels.sort_unstable();
        labels.dedup();
        labels
    }

    /// Per-cell minimum over every object carrying `label`.
    ///
    /// Gives "distance to the closest larva" from the per-larva columns.
    /// An absent label yields an all-NaN matrix.
    pub fn closest_by_label(&self, label: &str) -> DMatrix<f64> {
        let init = DMatrix::from_element(self.frames.len(), self.entity_ids.len(), f64::NAN);
        self.columns
            .iter()
            .filter(|(k, _)| k.label == label)
            .fold(init, |acc, (_, m)| fmin_matrix(&acc, m))
    }
}

/// All geometry tables of one partition.
#[derive(Debug, Clone)]
pub struct GeometryDistances {
    /// `distC` to every object's representative point.
    pub centroid: GeometryDistanceTable,
    /// `distM` to circle boundaries.
    pub circle: GeometryDistanceTable,
    /// `distM` to polygon and polyline boundaries.
    pub polygon: GeometryDistanceTable,
}

impl GeometryDistances {
    /// Tables in output column order.
    pub fn tables(&self) -> [&GeometryDistanceTable; 3] {
        [&self.centroid, &self.circle, &self.polygon]
    }
}

/// Compute centroid and boundary distances to every static object.
///
/// # Arguments
/// * `wide` - Wide table of the partition
/// * `objects` - Static objects of the same partition
pub fn compute_geometry_distances(wide: &WideFrame, objects: &[StaticObject]) -> GeometryDistances {
    let frames = wide.frames().to_vec();
    let entity_ids = wide.entity_ids().to_vec();
    let (xs, ys) = (wide.centroid_x(), wide.centroid_y());

    let mut result = GeometryDistances {
        centroid: GeometryDistanceTable::new(DistanceKind::Centroid, frames.clone(), entity_ids.clone()),
        circle: GeometryDistanceTable::new(DistanceKind::Minimum, frames.clone(), entity_ids.clone()),
        polygon: GeometryDistanceTable::new(DistanceKind::Minimum, frames, entity_ids),
    };

    for object in objects {
        if let Some(distance) = distance_for(DistanceKind::Centroid, object) {
            result.centroid.push(object.key(), distance.get_distances(xs, ys, object));
        }

        if let Some(distance) = distance_for(DistanceKind::Minimum, object) {
            let table = match object.shape {
                Shape::Circle { .. } => &mut result.circle,
                _ => &mut result.polygon,
            };
            table.push(object.key(), distance.get_distances(xs, ys, object));
        }
    }

    debug!(
        "geometry distances: {} centroid, {} circle, {} polygon columns",
        result.centroid.len(),
        result.circle.len(),
        result.polygon.len()
    );

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wide_frame::RestructureConfig;
    use crate::Detection;
    use approx::assert_relative_eq;
    use nalgebra::Point2;

    fn larva(index: i64, x: f64, y: f64, r: f64) -> StaticObject {
        StaticObject::new(
            "Larvae",
            index,
            Shape::Circle {
                center: Point2::new(x, y),
                radius: r,
            },
        )
    }

    fn sample_wide() -> WideFrame {
        let dets = vec![
            Detection::new(1, 1, 0.0, 0.0).unwrap(),
            Detection::new(2, 1, 10.0, 0.0).unwrap(),
            Detection::new(1, 2, 20.0, 0.0).unwrap(),
        ];
        WideFrame::from_detections(dets, &RestructureConfig::default()).unwrap()
    }

    #[test]
    fn test_tables_split_by_shape() {
        let objects = vec![
            larva(0, 0.0, 0.0, 5.0),
            StaticObject::new("pollen", 1, Shape::Point(Point2::new(0.0, 0.0))),
            StaticObject::new(
                "Egg",
                2,
                Shape::Polygon(vec![Point2::new(9.0, -1.0), Point2::new(11.0, -1.0), Point2::new(10.0, 1.0)]),
            ),
        ];

        let g = compute_geometry_distances(&sample_wide(), &objects);
        assert_eq!(g.centroid.len(), 3);
        assert_eq!(g.circle.len(), 1);
        assert_eq!(g.polygon.len(), 1);

        let key = objects[0].key();
        assert_eq!(g.circle.column_name(&key), "distM_Larvae_0");
        assert_eq!(g.centroid.column_name(&key), "distC_Larvae_0");

        assert_eq!(g.circle.value(&key, 1, 1), Some(0.0));
        assert_relative_eq!(g.circle.value(&key, 1, 2).unwrap(), 5.0, epsilon = 1e-10);
        assert!(g.circle.value(&key, 2, 2).unwrap().is_nan());

        // Entity 2 sits inside the triangle
        assert_eq!(g.polygon.value(&objects[2].key(), 1, 2), Some(0.0));
    }

    #[test]
    fn test_closest_by_label() {
        let objects = vec![larva(0, 0.0, 0.0, 1.0), larva(1, 20.0, 0.0, 1.0)];
        let g = compute_geometry_distances(&sample_wide(), &objects);

        let closest = g.circle.closest_by_label("Larvae");
        assert_relative_eq!(closest[(0, 0)], 0.0, epsilon = 1e-10);
        assert_relative_eq!(closest[(0, 1)], 9.0, epsilon = 1e-10);
        assert_relative_eq!(closest[(1, 0)], 0.0, epsilon = 1e-10);
        assert!(closest[(1, 1)].is_nan());

        assert_eq!(g.circle.labels(), vec!["Larvae"]);
    }

    #[test]
    fn test_absent_label_is_all_nan() {
        let g = compute_geometry_distances(&sample_wide(), &[]);
        assert!(g.polygon.is_empty());
        assert_eq!(g.polygon.frames(), &[1, 2]);
        assert_eq!(g.polygon.entity_ids(), &[1, 2]);

        let m = g.polygon.closest_by_label("Egg");
        assert_eq!(m.shape(), (2, 2));
        assert!(m.iter().all(|v| v.is_nan()));
    }
}
