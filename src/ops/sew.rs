use crate::error::Result;
use crate::math::Point3;
use crate::mesh::{Mesh, ObjectHandle, SurfaceId, VertexId};
use crate::solver::{MeshEvent, MeshEventKind};

/// Sews two surfaces by merging near-coincident boundary vertices.
///
/// Vertex pairs closer than `distance_cf` times the surfaces' mean edge
/// length collapse onto the first surface's vertex, relocated to the pair's
/// midpoint; every surface referencing the absorbed vertex is re-pointed.
/// Both surfaces must already belong to the mesh.
pub struct SewSurfaces {
    s1: SurfaceId,
    s2: SurfaceId,
    distance_cf: f64,
}

impl SewSurfaces {
    #[must_use]
    pub fn new(s1: SurfaceId, s2: SurfaceId, distance_cf: f64) -> Self {
        Self {
            s1,
            s2,
            distance_cf,
        }
    }

    /// Executes the operation.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::error::StructuralError`] if either surface does
    /// not belong to this mesh.
    pub fn execute(&self, mesh: &mut Mesh) -> Result<()> {
        if self.s1 == self.s2 {
            return Ok(());
        }
        let threshold =
            self.distance_cf * (mean_edge_length(mesh, self.s1)? + mean_edge_length(mesh, self.s2)?)
                / 2.0;

        let candidates = mesh.surface(self.s2)?.vertices().to_vec();
        for vb in candidates {
            if mesh.vertex(vb).is_err() {
                continue;
            }
            if mesh.surface(self.s1)?.vertex_index(vb).is_some() {
                continue;
            }
            let pb = mesh.position(vb)?;
            let mut nearest: Option<(VertexId, f64)> = None;
            for va in mesh.surface(self.s1)?.vertices() {
                let dist = (mesh.position(*va)? - pb).norm();
                if nearest.is_none_or(|(_, d)| dist < d) {
                    nearest = Some((*va, dist));
                }
            }
            let Some((va, dist)) = nearest else {
                continue;
            };
            if dist > threshold {
                continue;
            }
            absorb_vertex(mesh, va, vb)?;
        }

        mesh.notify_position_changed();
        mesh.notify(MeshEvent::tagged(
            MeshEventKind::Create,
            vec![ObjectHandle::surface(self.s1), ObjectHandle::surface(self.s2)],
            "sew",
        ));
        Ok(())
    }
}

/// Sews every pair among the given surfaces.
///
/// # Errors
///
/// Returns a [`crate::error::StructuralError`] if any surface does not
/// belong to this mesh.
pub fn sew_all(mesh: &mut Mesh, surfaces: &[SurfaceId], distance_cf: f64) -> Result<()> {
    for (i, s1) in surfaces.iter().enumerate() {
        for s2 in &surfaces[i + 1..] {
            SewSurfaces::new(*s1, *s2, distance_cf).execute(mesh)?;
        }
    }
    Ok(())
}

/// Merges `absorbed` into `kept`, relocating `kept` to the pair midpoint.
fn absorb_vertex(mesh: &mut Mesh, kept: VertexId, absorbed: VertexId) -> Result<()> {
    let midpoint = Point3::from(
        (mesh.position(kept)?.coords + mesh.position(absorbed)?.coords) / 2.0,
    );
    for s in mesh.vertex(absorbed)?.surfaces().to_vec() {
        let surface = mesh.surface_mut(s)?;
        if surface.vertex_index(kept).is_some() {
            surface.remove_boundary_vertex(absorbed);
        } else if let Some(i) = surface.vertex_index(absorbed) {
            surface.vertices[i] = kept;
        }
        mesh.vertex_mut(kept)?.attach_surface(s);
    }
    mesh.vertex_mut(absorbed)?.surfaces.clear();
    mesh.remove_vertex(absorbed)?;
    mesh.set_position(kept, midpoint)?;
    Ok(())
}

#[allow(clippy::cast_precision_loss)]
fn mean_edge_length(mesh: &Mesh, surface: SurfaceId) -> Result<f64> {
    let points = mesh.surface_points(surface)?;
    let n = points.len();
    let perimeter: f64 = (0..n)
        .map(|i| (points[(i + 1) % n] - points[i]).norm())
        .sum();
    Ok(perimeter / n as f64)
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

    fn quad(mesh: &mut Mesh, points: [Point3; 4]) -> SurfaceId {
        MakeSurface::new(
            SurfaceClass::new("membrane"),
            points.iter().map(|q| (*q).into()).collect(),
        )
        .execute(mesh)
        .unwrap()
    }

    #[test]
    fn sew_merges_the_near_coincident_edge() {
        let mut mesh = Mesh::default();
        let s1 = quad(
            &mut mesh,
            [
                p(0.0, 0.0, 0.0),
                p(1.0, 0.0, 0.0),
                p(1.0, 1.0, 0.0),
                p(0.0, 1.0, 0.0),
            ],
        );
        let s2 = quad(
            &mut mesh,
            [
                p(1.05, 0.0, 0.0),
                p(2.0, 0.0, 0.0),
                p(2.0, 1.0, 0.0),
                p(1.05, 1.0, 0.0),
            ],
        );

        SewSurfaces::new(s1, s2, 0.2).execute(&mut mesh).unwrap();

        assert_eq!(mesh.vertex_count(), 6, "two pairs merged");
        let b1 = mesh.surface(s1).unwrap().vertices().to_vec();
        let b2 = mesh.surface(s2).unwrap().vertices().to_vec();
        let shared: Vec<VertexId> = b1.iter().copied().filter(|v| b2.contains(v)).collect();
        assert_eq!(shared.len(), 2, "surfaces now share an edge");
        for v in shared {
            let pos = mesh.position(v).unwrap();
            assert!((pos.x - 1.025).abs() < 1e-12, "merged at the midpoint");
        }
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn sew_leaves_distant_surfaces_alone() {
        let mut mesh = Mesh::default();
        let s1 = quad(
            &mut mesh,
            [
                p(0.0, 0.0, 0.0),
                p(1.0, 0.0, 0.0),
                p(1.0, 1.0, 0.0),
                p(0.0, 1.0, 0.0),
            ],
        );
        let s2 = quad(
            &mut mesh,
            [
                p(5.0, 0.0, 0.0),
                p(6.0, 0.0, 0.0),
                p(6.0, 1.0, 0.0),
                p(5.0, 1.0, 0.0),
            ],
        );

        sew_all(&mut mesh, &[s1, s2], 0.2).unwrap();
        assert_eq!(mesh.vertex_count(), 8);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn sew_rejects_surfaces_outside_the_mesh() {
        let mut mesh = Mesh::default();
        let s1 = quad(
            &mut mesh,
            [
                p(0.0, 0.0, 0.0),
                p(1.0, 0.0, 0.0),
                p(1.0, 1.0, 0.0),
                p(0.0, 1.0, 0.0),
            ],
        );
        let foreign = SurfaceId(17);
        assert!(SewSurfaces::new(s1, foreign, 0.2).execute(&mut mesh).is_err());
    }
}
