//! Serde snapshot types for meshes and actors.
//!
//! A [`MeshSnapshot`] captures the minimal state needed to reconstruct a
//! mesh: inventory slots (including holes, so recycled ids survive a round
//! trip), relations, classes, and per-vertex position and mass. Actors
//! serialize their tunable parameters directly via their own derives. The
//! concrete file format, and everything else about persistence, belongs to
//! the embedding application; these types only bridge to the serde data
//! model.

use serde::{Deserialize, Serialize};

use crate::error::{Result, StructuralError};
use crate::math::Point3;
use crate::mesh::{
    Body, BodyClass, BodyId, Mesh, ObjectKind, Structure, StructureId, StructureParent, Surface,
    SurfaceClass, SurfaceId, Vertex, VertexId,
};
use crate::particle::ParticleBackend;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VertexSnapshot {
    pub id: u32,
    pub position: [f64; 3],
    pub mass: f64,
    pub surfaces: Vec<SurfaceId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfaceSnapshot {
    pub id: u32,
    pub class: SurfaceClass,
    pub vertices: Vec<VertexId>,
    pub b1: Option<BodyId>,
    pub b2: Option<BodyId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodySnapshot {
    pub id: u32,
    pub class: BodyClass,
    pub surfaces: Vec<SurfaceId>,
    pub structures: Vec<StructureId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructureSnapshot {
    pub id: u32,
    pub parents: Vec<StructureParent>,
    pub structures: Vec<StructureId>,
}

/// Complete reconstructible state of one mesh.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeshSnapshot {
    pub vertices: Vec<VertexSnapshot>,
    pub surfaces: Vec<SurfaceSnapshot>,
    pub bodies: Vec<BodySnapshot>,
    pub structures: Vec<StructureSnapshot>,
}

impl Mesh {
    /// Captures the mesh's reconstructible state.
    #[must_use]
    pub fn snapshot(&self) -> MeshSnapshot {
        let mut snapshot = MeshSnapshot::default();
        for (id, vertex) in self.vertices.iter() {
            let position = self.particles.position(vertex.particle());
            snapshot.vertices.push(VertexSnapshot {
                id,
                position: [position.x, position.y, position.z],
                mass: self.particles.mass(vertex.particle()),
                surfaces: vertex.surfaces().to_vec(),
            });
        }
        for (id, surface) in self.surfaces.iter() {
            snapshot.surfaces.push(SurfaceSnapshot {
                id,
                class: surface.class().clone(),
                vertices: surface.vertices().to_vec(),
                b1: surface.b1,
                b2: surface.b2,
            });
        }
        for (id, body) in self.bodies.iter() {
            snapshot.bodies.push(BodySnapshot {
                id,
                class: body.class().clone(),
                surfaces: body.surfaces().to_vec(),
                structures: body.structures().to_vec(),
            });
        }
        for (id, structure) in self.structures.iter() {
            snapshot.structures.push(StructureSnapshot {
                id,
                parents: structure.parent_refs().to_vec(),
                structures: structure.structures().to_vec(),
            });
        }
        snapshot
    }

    /// Reconstructs a mesh from a snapshot over a fresh particle backend.
    ///
    /// Slots are restored at their recorded ids, so handles serialized
    /// alongside the snapshot stay valid. The restored mesh is validated
    /// before being returned.
    ///
    /// # Errors
    ///
    /// Returns a [`StructuralError`] if the snapshot holds duplicate ids or
    /// fails referential validation.
    pub fn from_snapshot(
        snapshot: &MeshSnapshot,
        particles: Box<dyn ParticleBackend>,
    ) -> Result<Self> {
        let mut mesh = Self::new(particles);
        let tag = mesh.tag();

        for vs in &snapshot.vertices {
            let particle = mesh
                .particles
                .create(Point3::new(vs.position[0], vs.position[1], vs.position[2]));
            mesh.particles.set_mass(particle, vs.mass);
            let mut vertex = Vertex::new(particle);
            vertex.surfaces = vs.surfaces.clone();
            occupy(&mut mesh.vertices, vs.id, ObjectKind::Vertex, |reg_id| {
                vertex.reg.register(reg_id, tag);
                vertex
            })?;
        }
        for ss in &snapshot.surfaces {
            let mut surface = Surface::new(ss.class.clone(), ss.vertices.clone());
            surface.b1 = ss.b1;
            surface.b2 = ss.b2;
            occupy(&mut mesh.surfaces, ss.id, ObjectKind::Surface, |reg_id| {
                surface.reg.register(reg_id, tag);
                surface
            })?;
        }
        for bs in &snapshot.bodies {
            let mut body = Body::new(bs.class.clone(), bs.surfaces.clone());
            body.structures = bs.structures.clone();
            occupy(&mut mesh.bodies, bs.id, ObjectKind::Body, |reg_id| {
                body.reg.register(reg_id, tag);
                body
            })?;
        }
        for sts in &snapshot.structures {
            let mut structure = Structure::new(sts.parents.clone());
            structure.structures = sts.structures.clone();
            occupy(&mut mesh.structures, sts.id, ObjectKind::Structure, |reg_id| {
                structure.reg.register(reg_id, tag);
                structure
            })?;
        }

        mesh.validate()?;
        Ok(mesh)
    }
}

fn occupy<T>(
    inventory: &mut crate::mesh::inventory::Inventory<T>,
    id: u32,
    kind: ObjectKind,
    build: impl FnOnce(u32) -> T,
) -> Result<()> {
    if inventory.occupy(id, build) {
        Ok(())
    } else {
        Err(StructuralError::InvalidObject {
            kind,
            reason: format!("snapshot holds id {id} twice"),
        }
        .into())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::actors::{ConvexPolygonConstraint, SurfaceAreaConstraint};
    use crate::mesh::BodyClass;
    use crate::ops::{ExtrudeBody, MakeSurface, MakeVertex};
    use crate::particle::PointMassBackend;

    use super::*;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn cell(mesh: &mut Mesh) -> BodyId {
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
    fn mesh_round_trips_through_a_snapshot() {
        let mut mesh = Mesh::default();
        let body = cell(&mut mesh);
        // Punch a hole into the vertex inventory so id recycling state is
        // exercised too.
        let extra = MakeVertex::new(p(9.0, 9.0, 9.0)).execute(&mut mesh).unwrap();
        mesh.remove_vertex(extra).unwrap();

        let snapshot = mesh.snapshot();
        let json = serde_json::to_string(&snapshot).unwrap();
        let decoded: MeshSnapshot = serde_json::from_str(&json).unwrap();
        let restored =
            Mesh::from_snapshot(&decoded, Box::new(PointMassBackend::new())).unwrap();

        assert_eq!(restored.vertex_count(), mesh.vertex_count());
        assert_eq!(restored.surface_count(), mesh.surface_count());
        assert_eq!(restored.body_count(), 1);
        assert!((restored.body_volume(body).unwrap() - 1.0).abs() < 1e-9);
        assert!((restored.body_area(body).unwrap() - 6.0).abs() < 1e-9);
        for v in mesh.vertex_ids() {
            assert_eq!(
                restored.position(v).unwrap(),
                mesh.position(v).unwrap(),
                "positions survive at the same ids"
            );
        }
    }

    #[test]
    fn duplicate_snapshot_ids_are_rejected() {
        let mut mesh = Mesh::default();
        cell(&mut mesh);
        let mut snapshot = mesh.snapshot();
        let first = snapshot.vertices[0].clone();
        snapshot.vertices.push(first);

        let result = Mesh::from_snapshot(&snapshot, Box::new(PointMassBackend::new()));
        assert!(result.is_err());
    }

    #[test]
    fn actors_round_trip_their_parameters() {
        let convex = ConvexPolygonConstraint::new(2.5);
        let json = serde_json::to_string(&convex).unwrap();
        let decoded: ConvexPolygonConstraint = serde_json::from_str(&json).unwrap();
        assert!((decoded.stiffness - 2.5).abs() < f64::EPSILON);

        let area = SurfaceAreaConstraint::new(1.5, 6.0);
        let json = serde_json::to_string(&area).unwrap();
        let decoded: SurfaceAreaConstraint = serde_json::from_str(&json).unwrap();
        assert!((decoded.stiffness - 1.5).abs() < f64::EPSILON);
        assert!((decoded.target - 6.0).abs() < f64::EPSILON);
    }
}
