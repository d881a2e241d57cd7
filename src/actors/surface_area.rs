use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::math::{polygon, Vector3, TOLERANCE};
use crate::mesh::{BodyId, Mesh, VertexId};

use super::{ActorOwner, ConstraintActor};

/// Penalizes deviation of a body's total bounding area from a target.
///
/// Energy is `stiffness * (area - target)^2`. The force on a vertex is the
/// exact negative gradient of that energy: per bounding surface containing
/// the vertex, the fan-triangle normals crossed with the boundary edge
/// vectors (averaged over the boundary length, for the centroid's dependence
/// on every vertex) plus the two triangles incident to the vertex itself,
/// summed over surfaces and scaled by `stiffness * (target - area)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfaceAreaConstraint {
    /// Stiffness coefficient.
    pub stiffness: f64,
    /// Target total bounding-surface area.
    pub target: f64,
}

impl SurfaceAreaConstraint {
    #[must_use]
    pub fn new(stiffness: f64, target: f64) -> Self {
        Self { stiffness, target }
    }

    fn area_gradient(&self, mesh: &Mesh, body: BodyId, vertex: VertexId) -> Result<Vector3> {
        let incident = mesh.vertex(vertex)?.surfaces().to_vec();
        let mut total = Vector3::zeros();

        for s in incident {
            let surface = mesh.surface(s)?;
            if !surface.bounds(body) {
                continue;
            }
            let Some(at) = surface.vertex_index(vertex) else {
                continue;
            };
            let n = surface.vertices().len();
            let points = mesh.surface_points(s)?;
            let centroid = polygon::centroid(&points);

            let mut gradient = Vector3::zeros();
            for i in 0..n {
                let normal = unit_or_zero(polygon::fan_triangle_normal(&points, &centroid, i));
                gradient += normal.cross(&(points[(i + 1) % n] - points[i]));
            }
            #[allow(clippy::cast_precision_loss)]
            {
                gradient /= n as f64;
            }

            let before = (at + n - 1) % n;
            let after = (at + 1) % n;
            let at_normal = unit_or_zero(polygon::fan_triangle_normal(&points, &centroid, at));
            let before_normal =
                unit_or_zero(polygon::fan_triangle_normal(&points, &centroid, before));
            gradient += at_normal.cross(&(centroid - points[after]));
            gradient -= before_normal.cross(&(centroid - points[before]));

            total += gradient;
        }
        Ok(total)
    }
}

fn unit_or_zero(v: Vector3) -> Vector3 {
    let len = v.norm();
    if len < TOLERANCE {
        Vector3::zeros()
    } else {
        v / len
    }
}

impl ConstraintActor for SurfaceAreaConstraint {
    fn energy(&self, mesh: &Mesh, owner: ActorOwner, _vertex: VertexId) -> Result<f64> {
        let ActorOwner::Body(body) = owner else {
            return Ok(0.0);
        };
        let deviation = mesh.body_area(body)? - self.target;
        Ok(self.stiffness * deviation * deviation)
    }

    fn force(&self, mesh: &Mesh, owner: ActorOwner, vertex: VertexId) -> Result<Vector3> {
        let ActorOwner::Body(body) = owner else {
            return Ok(Vector3::zeros());
        };
        let area = mesh.body_area(body)?;
        let gradient = self.area_gradient(mesh, body, vertex)?;
        Ok(gradient * (self.stiffness * (self.target - area)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::math::Point3;
    use crate::mesh::SurfaceClass;
    use crate::ops::{ExtrudeBody, MakeSurface};
    use crate::mesh::BodyClass;

    use super::*;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn unit_cube(mesh: &mut Mesh) -> BodyId {
        let base = MakeSurface::new(
            SurfaceClass::new("membrane"),
            vec![
                p(0.0, 0.0, 0.0).into(),
                p(1.0, 0.0, 0.0).into(),
                p(1.0, 1.0, 0.0).into(),
                p(0.0, 1.0, 0.0).into(),
            ],
        )
        .execute(mesh)
        .unwrap();
        ExtrudeBody::new(base, BodyClass::new("cell"), 1.0)
            .execute(mesh)
            .unwrap()
    }

    #[test]
    fn equilibrium_body_feels_no_force() {
        let mut mesh = Mesh::default();
        let body = unit_cube(&mut mesh);
        let area = mesh.body_area(body).unwrap();
        let actor = SurfaceAreaConstraint::new(3.0, area);

        assert!(actor
            .energy(&mesh, ActorOwner::Body(body), mesh.vertex_ids().next().unwrap())
            .unwrap()
            .abs()
            < 1e-18);
        for v in mesh.vertex_ids().collect::<Vec<_>>() {
            let force = actor.force(&mesh, ActorOwner::Body(body), v).unwrap();
            assert!(force.norm() < 1e-12, "expected zero force, got {force:?}");
        }
    }

    #[test]
    fn energy_grows_quadratically_with_deviation() {
        let mut mesh = Mesh::default();
        let body = unit_cube(&mut mesh);
        let v = mesh.vertex_ids().next().unwrap();
        let actor = SurfaceAreaConstraint::new(2.0, 4.0);
        // Cube area 6, target 4: energy = 2 * (6 - 4)^2.
        let energy = actor.energy(&mesh, ActorOwner::Body(body), v).unwrap();
        assert!((energy - 8.0).abs() < 1e-9, "got {energy}");
    }

    #[test]
    fn force_matches_the_numeric_energy_gradient() {
        let mut mesh = Mesh::default();
        let body = unit_cube(&mut mesh);
        let actor = SurfaceAreaConstraint::new(2.0, 4.0);
        let vertex = mesh.vertex_ids().next().unwrap();

        let force = actor.force(&mesh, ActorOwner::Body(body), vertex).unwrap();

        let h = 1e-6;
        let origin = mesh.position(vertex).unwrap();
        let mut numeric = Vector3::zeros();
        for axis in 0..3 {
            let mut step = Vector3::zeros();
            step[axis] = h;
            mesh.set_position(vertex, origin + step).unwrap();
            let up = mesh.body_area(body).unwrap() - actor.target;
            mesh.set_position(vertex, origin - step).unwrap();
            let down = mesh.body_area(body).unwrap() - actor.target;
            mesh.set_position(vertex, origin).unwrap();
            numeric[axis] = -(actor.stiffness * up * up - actor.stiffness * down * down)
                / (2.0 * h);
        }

        assert!(
            (force - numeric).norm() < 1e-4,
            "analytic {force:?} vs numeric {numeric:?}"
        );
    }
}
