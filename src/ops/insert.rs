use crate::error::Result;
use crate::math::Point3;
use crate::mesh::{Mesh, ObjectHandle, VertexId};
use crate::solver::{MeshEvent, MeshEventKind};

use super::creation::MakeVertex;

/// Splices a new vertex between two vertices on every surface where they
/// are cyclically adjacent.
///
/// The new vertex is fabricated at the given position through the particle
/// factory and registered even when the two vertices share no edge; in that
/// case it simply joins no surface.
pub struct InsertVertex {
    position: Point3,
    v1: VertexId,
    v2: VertexId,
}

impl InsertVertex {
    #[must_use]
    pub fn new(position: Point3, v1: VertexId, v2: VertexId) -> Self {
        Self { position, v1, v2 }
    }

    /// Executes the operation, returning the new vertex's id.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::error::StructuralError`] if either vertex is not
    /// live.
    pub fn execute(&self, mesh: &mut Mesh) -> Result<VertexId> {
        mesh.vertex(self.v2)?;
        let host_surfaces = mesh.vertex(self.v1)?.surfaces().to_vec();

        let inserted = MakeVertex::new(self.position).execute(mesh)?;

        for s in host_surfaces {
            let Ok(surface) = mesh.surface(s) else {
                continue;
            };
            let n = surface.vertices().len();
            let mut splice_at = None;
            for i in 0..n {
                let a = surface.vertices()[i];
                let b = surface.vertex_after(i, 1);
                if (a == self.v1 && b == self.v2) || (a == self.v2 && b == self.v1) {
                    splice_at = Some(i + 1);
                    break;
                }
            }
            if let Some(at) = splice_at {
                // `at` is in 1..=n; index n appends, which is cyclically
                // the same slot as index 0.
                mesh.surface_mut(s)?.vertices.insert(at, inserted);
                mesh.vertex_mut(inserted)?.attach_surface(s);
            }
        }

        mesh.notify_position_changed();
        mesh.notify(MeshEvent::tagged(
            MeshEventKind::Create,
            vec![ObjectHandle::vertex(self.v1), ObjectHandle::vertex(self.v2)],
            "insert",
        ));
        Ok(inserted)
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

    fn square(mesh: &mut Mesh) -> (Vec<VertexId>, crate::mesh::SurfaceId) {
        let surface = MakeSurface::new(
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
        let vertices = mesh.surface(surface).unwrap().vertices().to_vec();
        (vertices, surface)
    }

    #[test]
    fn insert_splices_between_adjacent_vertices() {
        let mut mesh = Mesh::default();
        let (v, s) = square(&mut mesh);

        let mid = InsertVertex::new(p(0.5, 0.0, 0.0), v[0], v[1])
            .execute(&mut mesh)
            .unwrap();

        let boundary = mesh.surface(s).unwrap().vertices().to_vec();
        assert_eq!(boundary, vec![v[0], mid, v[1], v[2], v[3]]);
        assert!(mesh.vertex(mid).unwrap().surfaces().contains(&s));
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn insert_handles_the_wrapping_edge() {
        let mut mesh = Mesh::default();
        let (v, s) = square(&mut mesh);

        let mid = InsertVertex::new(p(0.0, 0.5, 0.0), v[3], v[0])
            .execute(&mut mesh)
            .unwrap();

        let boundary = mesh.surface(s).unwrap().vertices().to_vec();
        assert_eq!(boundary.len(), 5);
        let i3 = boundary.iter().position(|x| *x == v[3]).unwrap();
        assert_eq!(boundary[(i3 + 1) % 5], mid, "spliced after the wrap edge start");
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn insert_between_non_adjacent_vertices_joins_nothing() {
        let mut mesh = Mesh::default();
        let (v, s) = square(&mut mesh);

        let lone = InsertVertex::new(p(0.5, 0.5, 0.0), v[0], v[2])
            .execute(&mut mesh)
            .unwrap();

        assert_eq!(mesh.surface(s).unwrap().vertices().len(), 4);
        assert!(mesh.vertex(lone).unwrap().surfaces().is_empty());
    }
}
