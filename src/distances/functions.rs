//! Built-in geometry functions.

use nalgebra::{DMatrix, Point2};

use crate::{Shape, StaticObject};

/// Shortest distance from `p` to the segment `a`-`b`.
///
/// Projects `p` onto the segment's line, clamps the projection to the
/// segment, and measures to the clamped point. A zero-length segment
/// degenerates to the distance to `a`.
pub fn point_to_segment(p: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>) -> f64 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq == 0.0 {
        return nalgebra::distance(p, a);
    }

    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    nalgebra::distance(p, &(a + ab * t))
}

/// Even-odd containment test.
///
/// Casts a horizontal ray from `p` and counts edge crossings. Points exactly
/// on an edge may land either way; callers that need 0 on the boundary get it
/// from the edge distance anyway.
pub fn point_in_polygon(p: &Point2<f64>, vertices: &[Point2<f64>]) -> bool {
    let n = vertices.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (vi, vj) = (vertices[i], vertices[j]);
        if (vi.y > p.y) != (vj.y > p.y) {
            let x_cross = vj.x + (p.y - vj.y) * (vi.x - vj.x) / (vi.y - vj.y);
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Area centroid of a closed polygon (shoelace formula).
///
/// Falls back to the vertex mean when the polygon has no area.
pub fn polygon_centroid(vertices: &[Point2<f64>]) -> Point2<f64> {
    let n = vertices.len();
    let mut area2 = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;

    for i in 0..n {
        let a = vertices[i];
        let b = vertices[(i + 1) % n];
        let cross = a.x * b.y - b.x * a.y;
        area2 += cross;
        cx += (a.x + b.x) * cross;
        cy += (a.y + b.y) * cross;
    }

    if area2.abs() < 1e-12 {
        return polyline_mean(vertices);
    }

    Point2::new(cx / (3.0 * area2), cy / (3.0 * area2))
}

/// Mean of the vertices. NaN for an empty slice.
pub fn polyline_mean(vertices: &[Point2<f64>]) -> Point2<f64> {
    if vertices.is_empty() {
        return Point2::new(f64::NAN, f64::NAN);
    }
    let n = vertices.len() as f64;
    let sum = vertices.iter().fold(nalgebra::Vector2::<f64>::zeros(), |acc, v| acc + v.coords);
    Point2::from(sum / n)
}

/// Clamp negative distances to zero. NaN stays NaN.
#[inline]
pub fn clamp_non_negative(value: f64) -> f64 {
    if value < 0.0 {
        0.0
    } else {
        value
    }
}

/// Minimum distance from a point to the boundary of an object.
///
/// - Polygon: 0 when the point is inside, otherwise the distance to the
///   nearest edge, the closing edge included
/// - Polyline: distance to the nearest segment
/// - Circle: distance to the centre minus the radius, clamped at 0
/// - Point: plain Euclidean distance
pub fn boundary_distance(p: &Point2<f64>, object: &StaticObject) -> f64 {
    match &object.shape {
        Shape::Point(q) => nalgebra::distance(p, q),
        Shape::Circle { center, radius } => clamp_non_negative(nalgebra::distance(p, center) - radius),
        Shape::Polygon(vertices) => {
            if point_in_polygon(p, vertices) {
                return 0.0;
            }
            let n = vertices.len();
            (0..n)
                .map(|i| point_to_segment(p, &vertices[i], &vertices[(i + 1) % n]))
                .fold(f64::INFINITY, f64::min)
        }
        Shape::Polyline(vertices) => vertices
            .windows(2)
            .map(|w| point_to_segment(p, &w[0], &w[1]))
            .fold(f64::INFINITY, f64::min),
    }
}

/// Distance from every cell to the object's representative point.
pub fn centroid_distances(xs: &DMatrix<f64>, ys: &DMatrix<f64>, object: &StaticObject) -> DMatrix<f64> {
    let c = object.representative_point();
    xs.zip_map(ys, |x, y| ((x - c.x).powi(2) + (y - c.y).powi(2)).sqrt())
}

/// Distance from every cell to a circle's boundary, clamped at 0.
///
/// Objects other than circles are measured as zero-radius circles at their
/// representative point.
pub fn circle_boundary_distances(xs: &DMatrix<f64>, ys: &DMatrix<f64>, object: &StaticObject) -> DMatrix<f64> {
    let (center, radius) = match object.shape {
        Shape::Circle { center, radius } => (center, radius),
        _ => (object.representative_point(), 0.0),
    };

    let mut result = xs.zip_map(ys, |x, y| ((x - center.x).powi(2) + (y - center.y).powi(2)).sqrt());
    result.add_scalar_mut(-radius);
    result.apply(|v| *v = clamp_non_negative(*v));
    result
}
