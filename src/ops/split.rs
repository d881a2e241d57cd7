use tracing::error;

use crate::error::{GeometryError, ParameterError, Result};
use crate::math::Point3;
use crate::mesh::{Mesh, ObjectHandle, SurfaceClass, SurfaceId, VertexId};
use crate::solver::{MeshEvent, MeshEventKind};

use super::insert::InsertVertex;

/// Replaces a vertex with a new surface spanning its neighborhood.
///
/// One new vertex is created per neighbor of the target, placed along the
/// edge to that neighbor at the matching length coefficient and spliced into
/// the incident surfaces. The target is then detached and removed, and the
/// new surface is built over the ring of inserted vertices with the given
/// class's constructor.
///
/// Coefficients are validated before any mutation: a count mismatch or a
/// coefficient outside (0, 1) rejects the operation with the mesh untouched.
pub struct SplitVertex {
    class: SurfaceClass,
    target: VertexId,
    length_cfs: Vec<f64>,
}

impl SplitVertex {
    #[must_use]
    pub fn new(class: SurfaceClass, target: VertexId, length_cfs: Vec<f64>) -> Self {
        Self {
            class,
            target,
            length_cfs,
        }
    }

    /// Executes the operation, returning the new surface's id.
    ///
    /// # Errors
    ///
    /// Returns a [`ParameterError`] on coefficient count or range violations,
    /// [`GeometryError::PolygonTooSmall`] if the target has fewer than three
    /// neighbors, or a [`crate::error::StructuralError`] if the target is not
    /// live.
    pub fn execute(&self, mesh: &mut Mesh) -> Result<SurfaceId> {
        let neighbors = mesh.neighbor_vertices(self.target)?;
        if self.length_cfs.len() != neighbors.len() {
            error!(
                expected = neighbors.len(),
                got = self.length_cfs.len(),
                "length coefficients are inconsistent with connectivity"
            );
            return Err(ParameterError::CoefficientCount {
                expected: neighbors.len(),
                got: self.length_cfs.len(),
            }
            .into());
        }
        for cf in &self.length_cfs {
            if *cf <= 0.0 || *cf >= 1.0 {
                error!(coefficient = *cf, "length coefficients must be in (0, 1)");
                return Err(ParameterError::CoefficientRange(*cf).into());
            }
        }
        if neighbors.len() < 3 {
            error!(
                neighbors = neighbors.len(),
                "splitting needs at least three neighbors to span a surface"
            );
            return Err(GeometryError::PolygonTooSmall(neighbors.len()).into());
        }

        let origin = mesh.position(self.target)?;
        let mut ring = Vec::with_capacity(neighbors.len());
        for (neighbor, cf) in neighbors.iter().zip(&self.length_cfs) {
            let toward = mesh.position(*neighbor)?;
            let position = origin + (toward - origin) * *cf;
            ring.push(InsertVertex::new(position, self.target, *neighbor).execute(mesh)?);
        }

        // Detach the target from every surface it bounded.
        for s in mesh.vertex(self.target)?.surfaces().to_vec() {
            mesh.surface_mut(s)?.remove_boundary_vertex(self.target);
        }
        mesh.vertex_mut(self.target)?.surfaces.clear();

        let target_handle = ObjectHandle::vertex(self.target);
        mesh.remove_vertex(self.target)?;
        let surface = mesh.add_surface(self.class.instance(ring))?;

        mesh.notify_position_changed();
        mesh.notify(MeshEvent::tagged(
            MeshEventKind::Create,
            vec![ObjectHandle::surface(surface), target_handle],
            "split",
        ));
        Ok(surface)
    }
}
