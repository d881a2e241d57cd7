use tracing::error;

use crate::error::{AdjacencyError, ParameterError, Result};
use crate::math::Vector3;
use crate::mesh::{BodyClass, BodyId, Mesh, ObjectHandle, SurfaceId};
use crate::solver::{MeshEvent, MeshEventKind};

use super::creation::MakeVertex;

/// Grows a quadrilateral surface off one boundary edge of a base surface,
/// offset along the base's normal.
pub struct ExtrudeEdge {
    base: SurfaceId,
    edge_index: usize,
    normal_length: f64,
}

impl ExtrudeEdge {
    #[must_use]
    pub fn new(base: SurfaceId, edge_index: usize, normal_length: f64) -> Self {
        Self {
            base,
            edge_index,
            normal_length,
        }
    }

    /// Executes the operation, returning the new surface's id.
    ///
    /// # Errors
    ///
    /// Returns [`ParameterError::EdgeIndexOutOfRange`] if the edge index
    /// exceeds the base boundary, a [`crate::error::GeometryError`] if the
    /// base normal is degenerate, or a [`crate::error::StructuralError`] if
    /// the base is not live.
    pub fn execute(&self, mesh: &mut Mesh) -> Result<SurfaceId> {
        let base = mesh.surface(self.base)?;
        let n = base.vertices().len();
        if self.edge_index >= n {
            error!(index = self.edge_index, len = n, "invalid edge index");
            return Err(ParameterError::EdgeIndexOutOfRange {
                index: self.edge_index,
                len: n,
            }
            .into());
        }
        let v0 = base.vertices()[self.edge_index];
        let v1 = base.vertex_after(self.edge_index, 1);
        let class = base.class().clone();
        let offset = mesh.surface_normal(self.base)? * self.normal_length;

        let above_v1 = MakeVertex::new(mesh.position(v1)? + offset).execute(mesh)?;
        let above_v0 = MakeVertex::new(mesh.position(v0)? + offset).execute(mesh)?;
        let surface = mesh.add_surface(class.instance(vec![v0, v1, above_v1, above_v0]))?;

        mesh.notify_position_changed();
        mesh.notify(MeshEvent::tagged(
            MeshEventKind::Create,
            vec![ObjectHandle::surface(self.base), ObjectHandle::surface(surface)],
            "extrude",
        ));
        Ok(surface)
    }
}

/// Extrudes a base surface into a prismatic body along its free side.
///
/// The outward direction is taken from whichever side of the base is not yet
/// bounded by a body; a base bounded on both sides is rejected. Every
/// boundary vertex is offset along that direction to form a matching ring,
/// one lateral quad is built per boundary edge, a cap surface closes the far
/// end, and base, laterals and cap are assembled into a body.
pub struct ExtrudeBody {
    base: SurfaceId,
    class: BodyClass,
    normal_length: f64,
}

impl ExtrudeBody {
    #[must_use]
    pub fn new(base: SurfaceId, class: BodyClass, normal_length: f64) -> Self {
        Self {
            base,
            class,
            normal_length,
        }
    }

    /// Executes the operation, returning the new body's id.
    ///
    /// # Errors
    ///
    /// Returns [`AdjacencyError::SurfaceFullyBounded`] if both sides of the
    /// base already bound a body, a [`crate::error::GeometryError`] if the
    /// base normal is degenerate, or a [`crate::error::StructuralError`] if
    /// the base is not fully live.
    pub fn execute(&self, mesh: &mut Mesh) -> Result<BodyId> {
        let outward = self.outward_normal(mesh)?;
        let base = mesh.surface(self.base)?;
        let boundary = base.vertices().to_vec();
        let surface_class = base.class().clone();
        let offset = outward * self.normal_length;

        let mut ring = Vec::with_capacity(boundary.len());
        for v in &boundary {
            ring.push(MakeVertex::new(mesh.position(*v)? + offset).execute(mesh)?);
        }

        let n = boundary.len();
        let mut surfaces = Vec::with_capacity(n + 2);
        for i in 0..n {
            let j = (i + 1) % n;
            surfaces.push(mesh.add_surface(surface_class.instance(vec![
                boundary[i],
                boundary[j],
                ring[j],
                ring[i],
            ]))?);
        }
        surfaces.push(self.base);
        surfaces.push(mesh.add_surface(surface_class.instance(ring))?);

        let body = mesh.add_body(self.class.instance(surfaces))?;

        mesh.notify_position_changed();
        mesh.notify(MeshEvent::tagged(
            MeshEventKind::Create,
            vec![ObjectHandle::surface(self.base), ObjectHandle::body(body)],
            "extrude",
        ));
        Ok(body)
    }

    /// Direction pointing away from the side already bounded, if any.
    fn outward_normal(&self, mesh: &Mesh) -> Result<Vector3> {
        let base = mesh.surface(self.base)?;
        if base.fully_bounded() {
            error!(surface = %self.base, "surface is bounded on both sides");
            return Err(AdjacencyError::SurfaceFullyBounded(self.base.index()).into());
        }
        let normal = mesh.surface_normal(self.base)?;
        // The normal points out of `b1` and into `b2`: with `b1` taken (or
        // neither), the free side lies along the normal; with `b2` taken it
        // lies against it.
        if base.b2.is_some() {
            Ok(-normal)
        } else {
            Ok(normal)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::math::Point3;
    use crate::mesh::SurfaceClass;
    use crate::ops::MakeSurface;

    use super::*;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn square(mesh: &mut Mesh) -> SurfaceId {
        MakeSurface::new(
            SurfaceClass::new("membrane"),
            vec![
                p(0.0, 0.0, 0.0).into(),
                p(1.0, 0.0, 0.0).into(),
                p(1.0, 1.0, 0.0).into(),
                p(0.0, 1.0, 0.0).into(),
            ],
        )
        .execute(mesh)
        .unwrap()
    }

    #[test]
    fn extrude_edge_builds_a_quad_above_the_edge() {
        let mut mesh = Mesh::default();
        let base = square(&mut mesh);
        let boundary = mesh.surface(base).unwrap().vertices().to_vec();

        let quad = ExtrudeEdge::new(base, 0, 1.0).execute(&mut mesh).unwrap();

        let quad_boundary = mesh.surface(quad).unwrap().vertices().to_vec();
        assert_eq!(quad_boundary.len(), 4);
        assert_eq!(quad_boundary[0], boundary[0]);
        assert_eq!(quad_boundary[1], boundary[1]);
        // The two new vertices sit one normal-length above the edge.
        assert_eq!(mesh.position(quad_boundary[2]).unwrap(), p(1.0, 0.0, 1.0));
        assert_eq!(mesh.position(quad_boundary[3]).unwrap(), p(0.0, 0.0, 1.0));
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn extrude_body_builds_a_prism() {
        let mut mesh = Mesh::default();
        let base = square(&mut mesh);

        let body = ExtrudeBody::new(base, BodyClass::new("cell"), 1.0)
            .execute(&mut mesh)
            .unwrap();

        assert_eq!(mesh.body(body).unwrap().surfaces().len(), 6);
        assert_eq!(mesh.vertex_count(), 8);
        assert!((mesh.body_volume(body).unwrap() - 1.0).abs() < 1e-9);
        assert!((mesh.body_area(body).unwrap() - 6.0).abs() < 1e-9);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn extrude_body_uses_the_free_side_then_fails_when_bounded_twice() {
        let mut mesh = Mesh::default();
        let base = square(&mut mesh);

        let above = ExtrudeBody::new(base, BodyClass::new("cell"), 1.0)
            .execute(&mut mesh)
            .unwrap();
        let below = ExtrudeBody::new(base, BodyClass::new("cell"), 1.0)
            .execute(&mut mesh)
            .unwrap();

        // The two bodies sit on opposite sides of the base.
        let above_top: f64 = mesh
            .body(above)
            .unwrap()
            .surfaces()
            .iter()
            .map(|s| mesh.surface_centroid(*s).unwrap().z)
            .sum();
        let below_top: f64 = mesh
            .body(below)
            .unwrap()
            .surfaces()
            .iter()
            .map(|s| mesh.surface_centroid(*s).unwrap().z)
            .sum();
        assert!(above_top > 0.0 && below_top < 0.0);
        assert!(mesh.bodies_connected(above, below), "they share the base");

        let third = ExtrudeBody::new(base, BodyClass::new("cell"), 1.0).execute(&mut mesh);
        assert!(third.is_err());
        assert!(mesh.validate().is_ok());
    }
}
