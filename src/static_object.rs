//! Annotated nest objects (eggs, larvae, wax pots, ...).

use std::collections::BTreeMap;
use std::fmt;

use nalgebra::Point2;
use serde::Deserialize;

use crate::distances::{polygon_centroid, polyline_mean};
use crate::{Error, Result};

/// Label of the arena outline, which is annotated but is not a nest object.
pub const ARENA_PERIMETER_LABEL: &str = "Arena perimeter (polygon)";

/// Identifies one annotated object: category label plus instance index.
///
/// Several objects can share a label (one per larva), so the index keeps
/// them apart until an aggregation collapses them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub label: String,
    pub object_index: i64,
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.label, self.object_index)
    }
}

/// Geometry of a static object.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Point(Point2<f64>),
    Circle { center: Point2<f64>, radius: f64 },
    /// Closed polygon; the last vertex connects back to the first.
    Polygon(Vec<Point2<f64>>),
    /// Open chain of segments.
    Polyline(Vec<Point2<f64>>),
}

/// An annotated object in the nest.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticObject {
    pub label: String,
    pub object_index: i64,
    pub shape: Shape,
}

impl StaticObject {
    pub fn new(label: impl Into<String>, object_index: i64, shape: Shape) -> Self {
        Self {
            label: label.into(),
            object_index,
            shape,
        }
    }

    pub fn key(&self) -> ObjectKey {
        ObjectKey {
            label: self.label.clone(),
            object_index: self.object_index,
        }
    }

    /// Point used for centroid distances and partition assignment.
    pub fn representative_point(&self) -> Point2<f64> {
        match &self.shape {
            Shape::Point(p) => *p,
            Shape::Circle { center, .. } => *center,
            Shape::Polygon(vertices) => polygon_centroid(vertices),
            Shape::Polyline(vertices) => polyline_mean(vertices),
        }
    }
}

/// One row of the annotation table.
///
/// Polygons and lines span several rows sharing an `object index`; circles
/// and points use one row. An empty radius is read as missing.
#[derive(Debug, Clone, Deserialize)]
pub struct AnnotationRow {
    #[serde(rename = "object index")]
    pub object_index: i64,
    pub label: String,
    #[serde(default)]
    pub shape: String,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub radius: Option<f64>,
}

/// Assemble static objects from annotation rows.
///
/// Rows are grouped by object index (groups are returned in index order).
/// Objects whose label is excluded are dropped silently. Malformed groups
/// are reported in the second element and left out.
pub fn build_static_objects(
    rows: &[AnnotationRow],
    excluded_labels: &[String],
) -> (Vec<StaticObject>, Vec<Error>) {
    let mut groups: BTreeMap<i64, Vec<&AnnotationRow>> = BTreeMap::new();
    for row in rows {
        groups.entry(row.object_index).or_default().push(row);
    }

    let mut objects = Vec::new();
    let mut rejected = Vec::new();

    for (object_index, group) in groups {
        let label = &group[0].label;
        if excluded_labels.iter().any(|l| l == label) {
            continue;
        }
        match build_object(object_index, &group) {
            Ok(obj) => objects.push(obj),
            Err(e) => rejected.push(e),
        }
    }

    (objects, rejected)
}

fn build_object(object_index: i64, group: &[&AnnotationRow]) -> Result<StaticObject> {
    let first = group[0];
    let label = first.label.clone();
    let vertices: Vec<Point2<f64>> = group.iter().map(|r| Point2::new(r.x, r.y)).collect();

    if vertices.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return Err(Error::InvalidGeometry(format!(
            "object {} ({}) has non-finite coordinates",
            object_index, label
        )));
    }

    if let Some(radius) = first.radius.filter(|r| !r.is_nan()) {
        if radius < 0.0 || !radius.is_finite() {
            return Err(Error::InvalidGeometry(format!(
                "object {} ({}) has invalid radius {}",
                object_index, label, radius
            )));
        }
        let shape = Shape::Circle {
            center: vertices[0],
            radius,
        };
        return Ok(StaticObject::new(label, object_index, shape));
    }

    let kind = first.shape.trim().to_ascii_lowercase();
    let shape = match kind.as_str() {
        "point" => Shape::Point(vertices[0]),
        "line" => {
            if vertices.len() < 2 {
                return Err(too_few(object_index, &label, "line", 2, vertices.len()));
            }
            Shape::Polyline(vertices)
        }
        "rectangle" if vertices.len() == 2 => {
            let (a, b) = (vertices[0], vertices[1]);
            Shape::Polygon(vec![
                Point2::new(a.x, a.y),
                Point2::new(b.x, a.y),
                Point2::new(b.x, b.y),
                Point2::new(a.x, b.y),
            ])
        }
        _ if vertices.len() == 1 && kind != "polygon" && kind != "rectangle" => Shape::Point(vertices[0]),
        _ => {
            if vertices.len() < 3 {
                return Err(too_few(object_index, &label, "polygon", 3, vertices.len()));
            }
            Shape::Polygon(vertices)
        }
    };

    Ok(StaticObject::new(label, object_index, shape))
}

fn too_few(object_index: i64, label: &str, kind: &str, needed: usize, got: usize) -> Error {
    Error::InvalidGeometry(format!(
        "object {} ({}) is a {} with {} vertices, needs at least {}",
        object_index, label, kind, got, needed
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn row(index: i64, label: &str, shape: &str, x: f64, y: f64, radius: Option<f64>) -> AnnotationRow {
        AnnotationRow {
            object_index: index,
            label: label.to_string(),
            shape: shape.to_string(),
            x,
            y,
            radius,
        }
    }

    #[test]
    fn test_build_circle_and_polygon() {
        let rows = vec![
            row(0, "Larvae", "circle", 10.0, 10.0, Some(5.0)),
            row(1, "Egg", "polygon", 0.0, 0.0, None),
            row(1, "Egg", "polygon", 2.0, 0.0, None),
            row(1, "Egg", "polygon", 2.0, 2.0, None),
            row(1, "Egg", "polygon", 0.0, 2.0, None),
        ];

        let (objects, rejected) = build_static_objects(&rows, &[]);
        assert!(rejected.is_empty());
        assert_eq!(objects.len(), 2);

        assert!(matches!(objects[0].shape, Shape::Circle { radius, .. } if radius == 5.0));
        match &objects[1].shape {
            Shape::Polygon(v) => assert_eq!(v.len(), 4),
            other => panic!("expected polygon, got {:?}", other),
        }

        let c = objects[1].representative_point();
        assert_relative_eq!(c.x, 1.0, epsilon = 1e-10);
        assert_relative_eq!(c.y, 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_nan_radius_means_polygon() {
        let rows = vec![
            row(4, "Wax", "", 0.0, 0.0, Some(f64::NAN)),
            row(4, "Wax", "", 4.0, 0.0, Some(f64::NAN)),
            row(4, "Wax", "", 0.0, 4.0, Some(f64::NAN)),
        ];
        let (objects, _) = build_static_objects(&rows, &[]);
        assert!(matches!(objects[0].shape, Shape::Polygon(_)));
    }

    #[test]
    fn test_excluded_label_is_dropped() {
        let rows = vec![
            row(0, ARENA_PERIMETER_LABEL, "polygon", 0.0, 0.0, None),
            row(0, ARENA_PERIMETER_LABEL, "polygon", 9.0, 0.0, None),
            row(0, ARENA_PERIMETER_LABEL, "polygon", 9.0, 9.0, None),
            row(1, "pollen", "point", 3.0, 3.0, None),
        ];
        let excluded = vec![ARENA_PERIMETER_LABEL.to_string()];

        let (objects, rejected) = build_static_objects(&rows, &excluded);
        assert!(rejected.is_empty());
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].key().to_string(), "pollen_1");
    }

    #[test]
    fn test_rectangle_from_two_corners() {
        let rows = vec![
            row(2, "Pupae", "rectangle", 0.0, 0.0, None),
            row(2, "Pupae", "rectangle", 4.0, 2.0, None),
        ];
        let (objects, _) = build_static_objects(&rows, &[]);
        match &objects[0].shape {
            Shape::Polygon(v) => {
                assert_eq!(v.len(), 4);
                assert_eq!(v[2], Point2::new(4.0, 2.0));
            }
            other => panic!("expected polygon, got {:?}", other),
        }
    }

    #[test]
    fn test_degenerate_polygon_rejected() {
        let rows = vec![
            row(3, "Egg", "polygon", 0.0, 0.0, None),
            row(3, "Egg", "polygon", 1.0, 0.0, None),
        ];
        let (objects, rejected) = build_static_objects(&rows, &[]);
        assert!(objects.is_empty());
        assert_eq!(rejected.len(), 1);
    }

    #[test]
    fn test_line_is_polyline() {
        let rows = vec![
            row(5, "Edge", "line", 0.0, 0.0, None),
            row(5, "Edge", "line", 10.0, 0.0, None),
        ];
        let (objects, _) = build_static_objects(&rows, &[]);
        assert!(matches!(objects[0].shape, Shape::Polyline(ref v) if v.len() == 2));
        assert_relative_eq!(objects[0].representative_point().x, 5.0, epsilon = 1e-10);
    }
}
