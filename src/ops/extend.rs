use tracing::error;

use crate::error::{ParameterError, Result};
use crate::math::Point3;
use crate::mesh::{BodyClass, BodyId, Mesh, ObjectHandle, SurfaceId};
use crate::solver::{MeshEvent, MeshEventKind};

use super::creation::MakeVertex;

/// Grows a new triangular surface off one boundary edge of a base surface.
///
/// The new surface spans the edge's two vertices and one new vertex placed
/// at the given position.
pub struct ExtendSurface {
    base: SurfaceId,
    edge_index: usize,
    position: Point3,
}

impl ExtendSurface {
    #[must_use]
    pub fn new(base: SurfaceId, edge_index: usize, position: Point3) -> Self {
        Self {
            base,
            edge_index,
            position,
        }
    }

    /// Executes the operation, returning the new surface's id.
    ///
    /// # Errors
    ///
    /// Returns [`ParameterError::EdgeIndexOutOfRange`] if the edge index
    /// exceeds the base boundary, or a [`crate::error::StructuralError`] if
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

        let apex = MakeVertex::new(self.position).execute(mesh)?;
        let surface = mesh.add_surface(class.instance(vec![v0, v1, apex]))?;

        mesh.notify_position_changed();
        mesh.notify(MeshEvent::tagged(
            MeshEventKind::Create,
            vec![ObjectHandle::surface(self.base), ObjectHandle::surface(surface)],
            "extend",
        ));
        Ok(surface)
    }
}

/// Closes a base surface into a body by coning it to an apex.
///
/// One apex vertex is created at the given position, one triangular surface
/// is built per boundary edge of the base, and the base plus the triangles
/// are assembled into a body with the given class's constructor.
pub struct ExtendBody {
    base: SurfaceId,
    class: BodyClass,
    position: Point3,
}

impl ExtendBody {
    #[must_use]
    pub fn new(base: SurfaceId, class: BodyClass, position: Point3) -> Self {
        Self {
            base,
            class,
            position,
        }
    }

    /// Executes the operation, returning the new body's id.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::error::StructuralError`] if the base is not live
    /// or the resulting surfaces cannot close a volume.
    pub fn execute(&self, mesh: &mut Mesh) -> Result<BodyId> {
        let base = mesh.surface(self.base)?;
        let boundary = base.vertices().to_vec();
        let surface_class = base.class().clone();

        let apex = MakeVertex::new(self.position).execute(mesh)?;

        let mut surfaces = vec![self.base];
        let n = boundary.len();
        for i in 0..n {
            let v0 = boundary[i];
            let v1 = boundary[(i + 1) % n];
            surfaces.push(mesh.add_surface(surface_class.instance(vec![v0, v1, apex]))?);
        }
        let body = mesh.add_body(self.class.instance(surfaces))?;

        mesh.notify_position_changed();
        mesh.notify(MeshEvent::tagged(
            MeshEventKind::Create,
            vec![ObjectHandle::surface(self.base), ObjectHandle::body(body)],
            "extend",
        ));
        Ok(body)
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
    fn extend_surface_shares_the_chosen_edge() {
        let mut mesh = Mesh::default();
        let base = square(&mut mesh);
        let boundary = mesh.surface(base).unwrap().vertices().to_vec();

        let grown = ExtendSurface::new(base, 1, p(2.0, 0.5, 0.0))
            .execute(&mut mesh)
            .unwrap();

        let grown_boundary = mesh.surface(grown).unwrap().vertices().to_vec();
        assert_eq!(grown_boundary.len(), 3);
        assert_eq!(grown_boundary[0], boundary[1]);
        assert_eq!(grown_boundary[1], boundary[2]);
        assert!(mesh.surfaces_connected(base, grown));
        assert_eq!(mesh.surface_count(), 2);
        assert_eq!(mesh.vertex_count(), 5);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn extend_surface_rejects_bad_edge_index() {
        let mut mesh = Mesh::default();
        let base = square(&mut mesh);
        assert!(ExtendSurface::new(base, 4, p(0.0, 0.0, 0.0))
            .execute(&mut mesh)
            .is_err());
        assert_eq!(mesh.vertex_count(), 4);
    }

    #[test]
    fn extend_body_builds_a_pyramid() {
        let mut mesh = Mesh::default();
        let base = square(&mut mesh);

        let body = ExtendBody::new(base, BodyClass::new("cell"), p(0.5, 0.5, 1.0))
            .execute(&mut mesh)
            .unwrap();

        assert_eq!(mesh.body(body).unwrap().surfaces().len(), 5);
        assert_eq!(mesh.surface_count(), 5);
        assert_eq!(mesh.vertex_count(), 5);
        let volume = mesh.body_volume(body).unwrap();
        assert!((volume - 1.0 / 3.0).abs() < 1e-9, "expected 1/3, got {volume}");
        assert!(mesh.validate().is_ok());
    }
}
