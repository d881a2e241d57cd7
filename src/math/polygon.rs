use super::{Point3, Vector3, TOLERANCE};

/// Centroid of a set of polygon boundary points.
///
/// Returns the origin for an empty slice.
#[must_use]
pub fn centroid(points: &[Point3]) -> Point3 {
    if points.is_empty() {
        return Point3::origin();
    }
    #[allow(clippy::cast_precision_loss)]
    let n = points.len() as f64;
    let sum: Vector3 = points.iter().map(|p| p.coords).sum();
    Point3::from(sum / n)
}

/// Unit normal of a polygon using Newell's method.
///
/// Returns `None` if the polygon is degenerate (fewer than 3 points or a
/// near-zero accumulated normal).
#[must_use]
pub fn newell_normal(points: &[Point3]) -> Option<Vector3> {
    if points.len() < 3 {
        return None;
    }
    let n = points.len();
    let mut normal = Vector3::zeros();
    for i in 0..n {
        let curr = &points[i];
        let next = &points[(i + 1) % n];
        normal.x += (curr.y - next.y) * (curr.z + next.z);
        normal.y += (curr.z - next.z) * (curr.x + next.x);
        normal.z += (curr.x - next.x) * (curr.y + next.y);
    }
    let len = normal.norm();
    if len < TOLERANCE {
        return None;
    }
    Some(normal / len)
}

/// Unnormalized normal of the fan triangle `(centroid, points[i], points[i+1])`.
///
/// The magnitude is twice the triangle's area; indexing wraps cyclically.
#[must_use]
pub fn fan_triangle_normal(points: &[Point3], centroid: &Point3, i: usize) -> Vector3 {
    let n = points.len();
    let a = points[i % n] - centroid;
    let b = points[(i + 1) % n] - centroid;
    a.cross(&b)
}

/// Area of a polygon, summed over the centroid fan triangulation.
///
/// Valid for mildly non-planar boundaries, which deformable surfaces
/// routinely are.
#[must_use]
pub fn fan_area(points: &[Point3]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let c = centroid(points);
    (0..points.len())
        .map(|i| fan_triangle_normal(points, &c, i).norm())
        .sum::<f64>()
        / 2.0
}

/// Signed volume contribution of a polygon's fan triangulation.
///
/// Sums the signed volumes of the tetrahedra formed by the origin and each
/// fan triangle. Summed over the oriented boundary of a closed body, this
/// yields the enclosed volume.
#[must_use]
pub fn signed_fan_volume(points: &[Point3]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let n = points.len();
    let c = centroid(points).coords;
    let mut volume = 0.0;
    for i in 0..n {
        let a = points[i].coords;
        let b = points[(i + 1) % n].coords;
        volume += c.dot(&a.cross(&b));
    }
    volume / 6.0
}

/// Perpendicular offset from `point` to the line through `a` and `b`.
///
/// The returned vector points from `point` toward its projection on the
/// line. Returns `None` if the line is degenerate (zero length).
#[must_use]
pub fn line_offset(point: &Point3, a: &Point3, b: &Point3) -> Option<Vector3> {
    let dir = b - a;
    let len = dir.norm();
    if len < TOLERANCE {
        return None;
    }
    let dir = dir / len;
    Some(a + (point - a).dot(&dir) * dir - point)
}
