use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::math::{polygon, Point3, Vector3};
use crate::mesh::{Mesh, SurfaceId, VertexId};

use super::{ActorOwner, ConstraintActor};

/// Penalizes local non-convexity of a polygon surface at a vertex.
///
/// The vertex is compared against the line through its two cyclic neighbors:
/// when it sits on the same side as the centroid of the remaining vertices
/// (a reflex configuration), the constraint pushes it back across the line.
/// Stiffness is scaled by vertex mass over the integration timestep to match
/// the overdamped dynamics of the particle backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvexPolygonConstraint {
    /// Stiffness coefficient.
    pub stiffness: f64,
}

impl ConvexPolygonConstraint {
    #[must_use]
    pub fn new(stiffness: f64) -> Self {
        Self { stiffness }
    }

    /// The offset from the vertex to its neighbor line, when the constraint
    /// is active.
    ///
    /// Inactive (returns `None`) on boundaries of three or fewer vertices,
    /// on a degenerate neighbor line, when the vertex is not on the surface,
    /// and in convex configurations.
    fn activation(mesh: &Mesh, surface: SurfaceId, vertex: VertexId) -> Result<Option<Vector3>> {
        let s = mesh.surface(surface)?;
        let n = s.vertices().len();
        if n <= 3 {
            return Ok(None);
        }
        let Some(i) = s.vertex_index(vertex) else {
            return Ok(None);
        };
        let before = mesh.position(s.vertex_after(i, n - 1))?;
        let after = mesh.position(s.vertex_after(i, 1))?;
        let at = mesh.position(vertex)?;

        let Some(offset) = polygon::line_offset(&at, &before, &after) else {
            return Ok(None);
        };

        // Centroid of every other boundary vertex.
        #[allow(clippy::cast_precision_loss)]
        let n_f = n as f64;
        let centroid = mesh.surface_centroid(surface)?;
        let rest = Point3::from((centroid.coords * n_f - at.coords) / (n_f - 1.0));
        let Some(rest_offset) = polygon::line_offset(&rest, &before, &after) else {
            return Ok(None);
        };

        // Both offsets aiming the same way means the vertex crossed to the
        // centroid's side of the neighbor line.
        if offset.dot(&rest_offset) > 0.0 {
            Ok(Some(offset))
        } else {
            Ok(None)
        }
    }

    fn overdamped_scale(mesh: &Mesh, vertex: VertexId) -> Result<f64> {
        Ok(mesh.vertex_mass(vertex)? / mesh.timestep())
    }
}

impl ConstraintActor for ConvexPolygonConstraint {
    fn energy(&self, mesh: &Mesh, owner: ActorOwner, vertex: VertexId) -> Result<f64> {
        let ActorOwner::Surface(surface) = owner else {
            return Ok(0.0);
        };
        match Self::activation(mesh, surface, vertex)? {
            Some(offset) => Ok(Self::overdamped_scale(mesh, vertex)?
                * self.stiffness
                / 2.0
                * offset.norm_squared()),
            None => Ok(0.0),
        }
    }

    fn force(&self, mesh: &Mesh, owner: ActorOwner, vertex: VertexId) -> Result<Vector3> {
        let ActorOwner::Surface(surface) = owner else {
            return Ok(Vector3::zeros());
        };
        match Self::activation(mesh, surface, vertex)? {
            Some(offset) => {
                Ok(offset * Self::overdamped_scale(mesh, vertex)? * self.stiffness)
            }
            None => Ok(Vector3::zeros()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::mesh::SurfaceClass;
    use crate::ops::MakeSurface;

    use super::*;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn pentagon(mesh: &mut Mesh, apex: Point3) -> (SurfaceId, VertexId) {
        let surface = MakeSurface::new(
            SurfaceClass::new("membrane"),
            vec![
                p(-1.0, 0.0, 0.0).into(),
                apex.into(),
                p(1.0, 0.0, 0.0).into(),
                p(1.0, 2.0, 0.0).into(),
                p(-1.0, 2.0, 0.0).into(),
            ],
        )
        .execute(mesh)
        .unwrap();
        let apex_vertex = mesh.surface(surface).unwrap().vertices()[1];
        (surface, apex_vertex)
    }

    #[test]
    fn triangles_never_activate() {
        let mut mesh = Mesh::default();
        let surface = MakeSurface::new(
            SurfaceClass::new("membrane"),
            vec![
                p(0.0, 0.0, 0.0).into(),
                p(1.0, 0.0, 0.0).into(),
                p(0.3, 0.1, 0.0).into(),
            ],
        )
        .execute(&mut mesh)
        .unwrap();
        let actor = ConvexPolygonConstraint::new(5.0);
        for v in mesh.surface(surface).unwrap().vertices().to_vec() {
            let owner = ActorOwner::Surface(surface);
            assert_eq!(actor.energy(&mesh, owner, v).unwrap(), 0.0);
            assert_eq!(actor.force(&mesh, owner, v).unwrap(), Vector3::zeros());
        }
    }

    #[test]
    fn convex_pentagon_is_inactive() {
        let mut mesh = Mesh::default();
        let (surface, apex) = pentagon(&mut mesh, p(0.0, -1.0, 0.0));
        let actor = ConvexPolygonConstraint::new(5.0);
        let energy = actor
            .energy(&mesh, ActorOwner::Surface(surface), apex)
            .unwrap();
        assert_eq!(energy, 0.0);
    }

    #[test]
    fn reflex_vertex_activates_with_restoring_force() {
        let mut mesh = Mesh::default();
        // The apex is pulled inward past its neighbor line (the x axis).
        let (surface, apex) = pentagon(&mut mesh, p(0.0, 0.5, 0.0));
        let actor = ConvexPolygonConstraint::new(5.0);

        let energy = actor
            .energy(&mesh, ActorOwner::Surface(surface), apex)
            .unwrap();
        assert!(energy > 0.0, "reflex vertex must be detected");

        let force = actor
            .force(&mesh, ActorOwner::Surface(surface), apex)
            .unwrap();
        assert!(
            force.y < 0.0,
            "force must push the vertex back across the neighbor line"
        );
        assert!(force.x.abs() < 1e-12 && force.z.abs() < 1e-12);
    }

    #[test]
    fn degenerate_neighbor_line_is_inactive() {
        let mut mesh = Mesh::default();
        let surface = MakeSurface::new(
            SurfaceClass::new("membrane"),
            vec![
                p(1.0, 0.0, 0.0).into(),
                p(0.0, 1.0, 0.0).into(),
                p(1.0, 0.0, 0.0).into(),
                p(0.5, 2.0, 0.0).into(),
            ],
        )
        .execute(&mut mesh)
        .unwrap();
        let v = mesh.surface(surface).unwrap().vertices()[1];
        let actor = ConvexPolygonConstraint::new(5.0);
        // Neighbors of `v` coincide, so the reference line has zero length.
        let energy = actor.energy(&mesh, ActorOwner::Surface(surface), v);
        assert_eq!(energy.unwrap(), 0.0);
    }

    #[test]
    fn body_owner_contributes_nothing() {
        let mut mesh = Mesh::default();
        let (surface, apex) = pentagon(&mut mesh, p(0.0, 0.5, 0.0));
        let _ = surface;
        let actor = ConvexPolygonConstraint::new(5.0);
        let energy = actor
            .energy(&mesh, ActorOwner::Body(crate::mesh::BodyId(0)), apex)
            .unwrap();
        assert_eq!(energy, 0.0);
    }
}
