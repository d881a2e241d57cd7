use tracing::error;

use crate::error::{AdjacencyError, Result, StructuralError};
use crate::math::Point3;
use crate::mesh::{Mesh, ObjectHandle, ObjectKind, SurfaceId, VertexId};
use crate::solver::{MeshEvent, MeshEventKind};

use super::creation::MakeVertex;

/// Collapses a surface to a single new vertex.
///
/// Every surface sharing boundary vertices with the target must share them
/// over one contiguous run; that run is spliced out and replaced by the new
/// vertex. The target surface is then removed together with every one of its
/// vertices left bounding no surface.
///
/// The shared-run scan happens before any mutation, so a contiguity failure
/// leaves the mesh untouched.
pub struct CollapseSurface {
    target: SurfaceId,
    position: Point3,
}

/// One neighbor's contiguous contact with the collapsed surface.
struct Contact {
    surface: SurfaceId,
    run_start: usize,
    run_len: usize,
}

impl CollapseSurface {
    #[must_use]
    pub fn new(target: SurfaceId, position: Point3) -> Self {
        Self { target, position }
    }

    /// Executes the operation, returning the replacement vertex's id.
    ///
    /// # Errors
    ///
    /// Returns [`AdjacencyError::NonContiguousContact`] if a neighboring
    /// surface touches the target over more than one boundary run, or a
    /// [`StructuralError`] if the target is not fully live.
    pub fn execute(&self, mesh: &mut Mesh) -> Result<VertexId> {
        let target_handle = ObjectHandle::surface(self.target);
        let target_vertices = mesh.surface(self.target)?.vertices().to_vec();

        // Every surface touching the target, in first-contact order.
        let mut connected: Vec<SurfaceId> = Vec::new();
        for v in &target_vertices {
            for s in mesh.vertex(*v)?.surfaces() {
                if *s != self.target && !connected.contains(s) {
                    connected.push(*s);
                }
            }
        }

        let mut contacts = Vec::with_capacity(connected.len());
        for s in connected {
            contacts.push(scan_contact(mesh, s, &target_vertices)?);
        }

        let inserted = MakeVertex::new(self.position).execute(mesh)?;

        for contact in &contacts {
            splice_contact(mesh, contact, inserted)?;
        }

        // Detach the target from its owners and its boundary before removal.
        for b in mesh.surface(self.target)?.bodies() {
            if let Ok(body) = mesh.body_mut(b) {
                body.remove_surface(self.target);
            }
        }
        for v in &target_vertices {
            if let Ok(vertex) = mesh.vertex_mut(*v) {
                vertex.detach_surface(self.target);
            }
        }
        mesh.remove_surface(self.target)?;

        for v in &target_vertices {
            let orphaned = mesh.vertex(*v).is_ok_and(|vertex| vertex.surfaces().is_empty());
            if orphaned {
                mesh.remove_vertex(*v)?;
            }
        }

        mesh.notify_position_changed();
        mesh.notify(MeshEvent::tagged(
            MeshEventKind::Create,
            vec![ObjectHandle::vertex(inserted), target_handle],
            "collapse",
        ));
        Ok(inserted)
    }
}

/// Locates the contiguous run of `shared` vertices on one neighbor surface.
fn scan_contact(mesh: &Mesh, surface: SurfaceId, shared: &[VertexId]) -> Result<Contact> {
    let boundary = mesh.surface(surface)?.vertices();
    let n = boundary.len();
    let mask: Vec<bool> = boundary.iter().map(|v| shared.contains(v)).collect();

    let runs = (0..n).filter(|i| !mask[*i] && mask[(*i + 1) % n]).count();
    if runs > 1 {
        error!(%surface, runs, "collapse cannot cross a non-contiguous contact");
        return Err(AdjacencyError::NonContiguousContact(surface.index()).into());
    }
    if runs == 0 {
        // Every boundary vertex is shared; nothing would remain of the
        // neighbor after the splice.
        error!(%surface, "neighbor shares its entire boundary with the collapsed surface");
        return Err(StructuralError::InvalidObject {
            kind: ObjectKind::Surface,
            reason: format!("surface {surface} shares its entire boundary with the collapsed surface"),
        }
        .into());
    }

    let run_start = (0..n)
        .find(|i| mask[*i] && !mask[(*i + n - 1) % n])
        .unwrap_or(0);
    let run_len = mask.iter().filter(|m| **m).count();
    Ok(Contact {
        surface,
        run_start,
        run_len,
    })
}

/// Replaces the shared run on one neighbor with the inserted vertex.
fn splice_contact(mesh: &mut Mesh, contact: &Contact, inserted: VertexId) -> Result<()> {
    let boundary = mesh.surface(contact.surface)?.vertices().to_vec();
    let n = boundary.len();

    let mut rebuilt = Vec::with_capacity(n - contact.run_len + 1);
    rebuilt.push(inserted);
    for step in contact.run_len..n {
        rebuilt.push(boundary[(contact.run_start + step) % n]);
    }

    for step in 0..contact.run_len {
        let removed = boundary[(contact.run_start + step) % n];
        mesh.vertex_mut(removed)?.detach_surface(contact.surface);
    }
    mesh.surface_mut(contact.surface)?.vertices = rebuilt;
    mesh.vertex_mut(inserted)?.attach_surface(contact.surface);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::mesh::SurfaceClass;
    use crate::ops::{MakeSurface, MakeVertex};

    use super::*;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    #[test]
    fn collapse_splices_neighbors_and_prunes_orphans() {
        let mut mesh = Mesh::default();
        let class = SurfaceClass::new("membrane");
        let a = MakeVertex::new(p(0.0, 0.0, 0.0)).execute(&mut mesh).unwrap();
        let b = MakeVertex::new(p(1.0, 0.0, 0.0)).execute(&mut mesh).unwrap();
        let c = MakeVertex::new(p(1.0, 1.0, 0.0)).execute(&mut mesh).unwrap();
        let d = MakeVertex::new(p(0.0, 1.0, 0.0)).execute(&mut mesh).unwrap();
        let left = MakeSurface::new(class.clone(), vec![a.into(), b.into(), c.into(), d.into()])
            .execute(&mut mesh)
            .unwrap();
        let right = MakeSurface::new(
            class,
            vec![
                b.into(),
                p(2.0, 0.0, 0.0).into(),
                p(2.0, 1.0, 0.0).into(),
                c.into(),
            ],
        )
        .execute(&mut mesh)
        .unwrap();

        let merged = CollapseSurface::new(right, p(1.5, 0.5, 0.0))
            .execute(&mut mesh)
            .unwrap();

        assert_eq!(mesh.surface_count(), 1);
        let boundary = mesh.surface(left).unwrap().vertices().to_vec();
        assert_eq!(boundary.len(), 3);
        assert!(boundary.contains(&merged));
        assert!(boundary.contains(&a) && boundary.contains(&d));
        // The run vertices and the right square's far edge are gone.
        assert!(mesh.vertex(b).is_err() && mesh.vertex(c).is_err());
        assert_eq!(mesh.vertex_count(), 3);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn collapse_rejects_non_contiguous_contact() {
        let mut mesh = Mesh::default();
        let class = SurfaceClass::new("membrane");
        let a = MakeVertex::new(p(0.0, 0.0, 0.0)).execute(&mut mesh).unwrap();
        let b = MakeVertex::new(p(1.0, 0.0, 0.0)).execute(&mut mesh).unwrap();
        let c = MakeVertex::new(p(1.0, 1.0, 0.0)).execute(&mut mesh).unwrap();
        let d = MakeVertex::new(p(0.0, 1.0, 0.0)).execute(&mut mesh).unwrap();
        let target = MakeSurface::new(class.clone(), vec![a.into(), b.into(), c.into(), d.into()])
            .execute(&mut mesh)
            .unwrap();
        // Touches the target at `a` and `c`, separated on both sides.
        MakeSurface::new(
            class,
            vec![
                a.into(),
                p(0.5, -1.0, 0.0).into(),
                c.into(),
                p(-1.0, 0.5, 0.0).into(),
            ],
        )
        .execute(&mut mesh)
        .unwrap();

        let vertex_count = mesh.vertex_count();
        let surface_count = mesh.surface_count();
        let result = CollapseSurface::new(target, p(0.5, 0.5, 0.0)).execute(&mut mesh);

        assert!(result.is_err());
        assert_eq!(mesh.vertex_count(), vertex_count);
        assert_eq!(mesh.surface_count(), surface_count);
        assert!(mesh.validate().is_ok());
    }
}
