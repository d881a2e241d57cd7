use tracing::{debug, error};

use crate::error::{AdjacencyError, ParameterError, Result};
use crate::mesh::{Mesh, ObjectHandle, SurfaceId, VertexId};
use crate::solver::{MeshEvent, MeshEventKind};

/// Merges two cyclically-adjacent vertices into the kept one.
///
/// The removed vertex leaves every boundary it sat on; the kept vertex is
/// relocated along the pre-merge separation by the length coefficient
/// (0 stays put, 1 lands on the removed vertex, 0.5 is the midpoint).
pub struct MergeVertices {
    keep: VertexId,
    remove: VertexId,
    length_cf: f64,
}

impl MergeVertices {
    #[must_use]
    pub fn new(keep: VertexId, remove: VertexId, length_cf: f64) -> Self {
        Self {
            keep,
            remove,
            length_cf,
        }
    }

    /// Executes the operation.
    ///
    /// # Errors
    ///
    /// Returns an [`AdjacencyError`] if the vertices share no surface or are
    /// not cyclically adjacent on one, or a [`crate::error::StructuralError`]
    /// if either vertex is not live.
    pub fn execute(&self, mesh: &mut Mesh) -> Result<()> {
        mesh.vertex(self.remove)?;
        if mesh.shared_surfaces(self.keep, self.remove)?.is_empty() {
            error!(keep = %self.keep, remove = %self.remove, "vertices share no surface");
            return Err(
                AdjacencyError::NoSharedSurface(self.keep.index(), self.remove.index()).into(),
            );
        }
        if !mesh.vertices_connected(self.keep, self.remove) {
            error!(keep = %self.keep, remove = %self.remove, "vertices must be adjacent to merge");
            return Err(AdjacencyError::NotAdjacent(self.keep.index(), self.remove.index()).into());
        }

        // Evaluated before the removal destroys the particle.
        let kept = mesh.position(self.keep)?;
        let relocated = kept + (mesh.position(self.remove)? - kept) * self.length_cf;

        for s in mesh.vertex(self.remove)?.surfaces().to_vec() {
            mesh.surface_mut(s)?.remove_boundary_vertex(self.remove);
        }
        mesh.vertex_mut(self.remove)?.surfaces.clear();
        let removed_handle = ObjectHandle::vertex(self.remove);
        mesh.remove_vertex(self.remove)?;

        mesh.set_position(self.keep, relocated)?;

        mesh.notify_position_changed();
        mesh.notify(MeshEvent::tagged(
            MeshEventKind::Create,
            vec![ObjectHandle::vertex(self.keep), removed_handle],
            "merge",
        ));
        Ok(())
    }
}

/// Merges a surface into another with the same vertex count.
///
/// Kept vertices not shared with the removed surface are matched greedily to
/// the nearest unclaimed removed vertices; every other surface referencing a
/// matched vertex is re-pointed at its kept counterpart, body ownership
/// transfers to the kept surface, and each kept vertex moves toward its match
/// by its length coefficient. The emptied surface and the matched vertices
/// are then removed.
pub struct MergeSurfaces {
    keep: SurfaceId,
    remove: SurfaceId,
    length_cfs: Vec<f64>,
}

impl MergeSurfaces {
    #[must_use]
    pub fn new(keep: SurfaceId, remove: SurfaceId, length_cfs: Vec<f64>) -> Self {
        Self {
            keep,
            remove,
            length_cfs,
        }
    }

    /// Executes the operation.
    ///
    /// # Errors
    ///
    /// Returns [`ParameterError::SurfaceSizeMismatch`] on differing vertex
    /// counts, [`AdjacencyError::VertexMatchFailed`] if the greedy match runs
    /// out of candidates, or a [`crate::error::StructuralError`] if either
    /// surface is not fully live.
    pub fn execute(&self, mesh: &mut Mesh) -> Result<()> {
        let kept_boundary = mesh.surface(self.keep)?.vertices().to_vec();
        let removed_boundary = mesh.surface(self.remove)?.vertices().to_vec();
        if kept_boundary.len() != removed_boundary.len() {
            error!(
                kept = kept_boundary.len(),
                removed = removed_boundary.len(),
                "surfaces must have the same number of vertices to merge"
            );
            return Err(ParameterError::SurfaceSizeMismatch {
                kept: kept_boundary.len(),
                removed: removed_boundary.len(),
            }
            .into());
        }

        let exclusive: Vec<VertexId> = kept_boundary
            .iter()
            .copied()
            .filter(|v| !removed_boundary.contains(v))
            .collect();

        let mut cfs = self.length_cfs.clone();
        if cfs.len() < exclusive.len() {
            debug!(
                provided = cfs.len(),
                needed = exclusive.len(),
                "padding missing length coefficients with 0.5"
            );
            cfs.resize(exclusive.len(), 0.5);
        }

        // Greedy nearest-neighbor matching over pre-merge positions.
        let mut matched: Vec<VertexId> = Vec::with_capacity(exclusive.len());
        for kv in &exclusive {
            let kept_pos = mesh.position(*kv)?;
            let mut best: Option<(VertexId, f64)> = None;
            for rv in &removed_boundary {
                if matched.contains(rv) {
                    continue;
                }
                let dist = (mesh.position(*rv)? - kept_pos).norm();
                if best.is_none_or(|(_, d)| dist < d) {
                    best = Some((*rv, dist));
                }
            }
            let Some((rv, _)) = best else {
                error!("could not match surface vertices");
                return Err(AdjacencyError::VertexMatchFailed.into());
            };
            matched.push(rv);
        }

        // Re-point every other surface from the matched vertex to its kept
        // counterpart.
        for (kv, rv) in exclusive.iter().zip(&matched) {
            for s in mesh.vertex(*rv)?.surfaces().to_vec() {
                if s == self.remove {
                    continue;
                }
                let surface = mesh.surface_mut(s)?;
                if surface.vertex_index(*kv).is_some() {
                    surface.remove_boundary_vertex(*rv);
                } else if let Some(i) = surface.vertex_index(*rv) {
                    surface.vertices[i] = *kv;
                }
                mesh.vertex_mut(*kv)?.attach_surface(s);
            }
        }

        // Transfer body ownership to the kept surface.
        for b in mesh.surface(self.remove)?.bodies() {
            mesh.body_mut(b)?.replace_surface(self.remove, self.keep);
            mesh.surface_mut(self.keep)?.attach_body(b)?;
            mesh.surface_mut(self.remove)?.detach_body(b);
        }

        // Relocate kept vertices while the matched particles still exist.
        for ((kv, rv), cf) in exclusive.iter().zip(&matched).zip(&cfs) {
            let kept_pos = mesh.position(*kv)?;
            let relocated = kept_pos + (mesh.position(*rv)? - kept_pos) * *cf;
            mesh.set_position(*kv, relocated)?;
        }

        // Detach the emptied surface from its boundary, then drop it and the
        // matched vertices.
        for v in mesh.surface(self.remove)?.vertices().to_vec() {
            mesh.vertex_mut(v)?.detach_surface(self.remove);
        }
        for rv in &matched {
            mesh.vertex_mut(*rv)?.surfaces.clear();
        }
        let removed_handle = ObjectHandle::surface(self.remove);
        mesh.remove_surface(self.remove)?;
        for rv in &matched {
            mesh.remove_vertex(*rv)?;
        }

        mesh.notify_position_changed();
        mesh.notify(MeshEvent::tagged(
            MeshEventKind::Create,
            vec![ObjectHandle::surface(self.keep), removed_handle],
            "merge",
        ));
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::math::Point3;
    use crate::mesh::SurfaceClass;
    use crate::ops::{MakeSurface, MakeVertex};

    use super::*;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    #[test]
    fn merge_vertices_at_midpoint() {
        let mut mesh = Mesh::default();
        let surface = MakeSurface::new(
            SurfaceClass::new("membrane"),
            vec![
                p(0.0, 0.0, 0.0).into(),
                p(1.0, 0.0, 0.0).into(),
                p(1.0, 1.0, 0.0).into(),
                p(0.0, 1.0, 0.0).into(),
            ],
        )
        .execute(&mut mesh)
        .unwrap();
        let v = mesh.surface(surface).unwrap().vertices().to_vec();

        MergeVertices::new(v[0], v[1], 0.5).execute(&mut mesh).unwrap();

        assert_eq!(mesh.position(v[0]).unwrap(), p(0.5, 0.0, 0.0));
        assert!(mesh.vertex(v[1]).is_err(), "removed vertex left every inventory");
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(
            mesh.surface(surface).unwrap().vertices(),
            &[v[0], v[2], v[3]]
        );
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn merge_notifies_a_tagged_event_and_a_position_change() {
        use std::rc::Rc;

        use crate::solver::testing::RecordingSolver;
        use crate::solver::MeshEventKind;

        let mut mesh = Mesh::default();
        let surface = MakeSurface::new(
            SurfaceClass::new("membrane"),
            vec![
                p(0.0, 0.0, 0.0).into(),
                p(1.0, 0.0, 0.0).into(),
                p(1.0, 1.0, 0.0).into(),
                p(0.0, 1.0, 0.0).into(),
            ],
        )
        .execute(&mut mesh)
        .unwrap();
        let v = mesh.surface(surface).unwrap().vertices().to_vec();

        let solver = Rc::new(RecordingSolver::default());
        mesh.attach_solver(solver.clone());
        MergeVertices::new(v[0], v[1], 0.5).execute(&mut mesh).unwrap();

        assert!(solver.position_calls.get() >= 1);
        let events = solver.events.borrow();
        let tagged = events.last().unwrap();
        assert_eq!(tagged.kind, MeshEventKind::Create);
        assert_eq!(tagged.operation, Some("merge"));
        assert_eq!(
            tagged.objects,
            vec![ObjectHandle::vertex(v[0]), ObjectHandle::vertex(v[1])]
        );
    }

    #[test]
    fn merge_vertices_requires_adjacency() {
        let mut mesh = Mesh::default();
        let surface = MakeSurface::new(
            SurfaceClass::new("membrane"),
            vec![
                p(0.0, 0.0, 0.0).into(),
                p(1.0, 0.0, 0.0).into(),
                p(1.0, 1.0, 0.0).into(),
                p(0.0, 1.0, 0.0).into(),
            ],
        )
        .execute(&mut mesh)
        .unwrap();
        let v = mesh.surface(surface).unwrap().vertices().to_vec();

        assert!(MergeVertices::new(v[0], v[2], 0.5).execute(&mut mesh).is_err());

        let lone = MakeVertex::new(p(5.0, 5.0, 5.0)).execute(&mut mesh).unwrap();
        assert!(MergeVertices::new(v[0], lone, 0.5).execute(&mut mesh).is_err());
        assert_eq!(mesh.vertex_count(), 5);
    }

    #[test]
    fn merge_surfaces_collapses_the_gap() {
        let mut mesh = Mesh::default();
        let class = SurfaceClass::new("membrane");
        let keep = MakeSurface::new(
            class.clone(),
            vec![
                p(0.0, 0.0, 0.0).into(),
                p(1.0, 0.0, 0.0).into(),
                p(0.0, 1.0, 0.0).into(),
            ],
        )
        .execute(&mut mesh)
        .unwrap();
        let remove = MakeSurface::new(
            class.clone(),
            vec![
                p(0.0, 0.0, 1.0).into(),
                p(1.0, 0.0, 1.0).into(),
                p(0.0, 1.0, 1.0).into(),
            ],
        )
        .execute(&mut mesh)
        .unwrap();
        // A bystander surface hanging off the removed boundary.
        let removed_boundary = mesh.surface(remove).unwrap().vertices().to_vec();
        let bystander = MakeSurface::new(
            class,
            vec![
                removed_boundary[0].into(),
                removed_boundary[1].into(),
                p(0.5, -1.0, 1.0).into(),
            ],
        )
        .execute(&mut mesh)
        .unwrap();

        let kept_boundary = mesh.surface(keep).unwrap().vertices().to_vec();
        MergeSurfaces::new(keep, remove, vec![]).execute(&mut mesh).unwrap();

        assert!(mesh.surface(remove).is_err());
        for rv in &removed_boundary {
            assert!(mesh.vertex(*rv).is_err(), "matched vertices are gone");
        }
        // Coefficients were padded with 0.5: kept vertices sit halfway up.
        for kv in &kept_boundary {
            let z = mesh.position(*kv).unwrap().z;
            assert!((z - 0.5).abs() < 1e-12);
        }
        // The bystander was re-pointed at the kept vertices.
        let bystander_boundary = mesh.surface(bystander).unwrap().vertices().to_vec();
        assert!(bystander_boundary.contains(&kept_boundary[0]));
        assert!(bystander_boundary.contains(&kept_boundary[1]));
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn merge_surfaces_requires_equal_vertex_counts() {
        let mut mesh = Mesh::default();
        let class = SurfaceClass::new("membrane");
        let keep = MakeSurface::new(
            class.clone(),
            vec![
                p(0.0, 0.0, 0.0).into(),
                p(1.0, 0.0, 0.0).into(),
                p(0.0, 1.0, 0.0).into(),
            ],
        )
        .execute(&mut mesh)
        .unwrap();
        let remove = MakeSurface::new(
            class,
            vec![
                p(0.0, 0.0, 1.0).into(),
                p(1.0, 0.0, 1.0).into(),
                p(1.0, 1.0, 1.0).into(),
                p(0.0, 1.0, 1.0).into(),
            ],
        )
        .execute(&mut mesh)
        .unwrap();

        assert!(MergeSurfaces::new(keep, remove, vec![]).execute(&mut mesh).is_err());
        assert_eq!(mesh.surface_count(), 2);
        assert!(mesh.validate().is_ok());
    }
}
