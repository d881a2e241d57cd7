use crate::error::Result;
use crate::math::Point3;
use crate::mesh::{
    BodyClass, Mesh, Structure, StructureParent, SurfaceClass, SurfaceId, Vertex, VertexId,
};

/// Input to a composite creation: an existing vertex or a fresh one.
///
/// Fresh seeds are registered before the composite that references them, so
/// solver notifications always describe already-valid references.
#[derive(Debug, Clone)]
pub enum VertexSeed {
    Existing(VertexId),
    At(Point3),
}

impl From<VertexId> for VertexSeed {
    fn from(id: VertexId) -> Self {
        Self::Existing(id)
    }
}

impl From<Point3> for VertexSeed {
    fn from(position: Point3) -> Self {
        Self::At(position)
    }
}

/// Input to a body creation: an existing surface or a fresh one.
#[derive(Debug, Clone)]
pub enum SurfaceSeed {
    Existing(SurfaceId),
    New {
        class: SurfaceClass,
        vertices: Vec<VertexSeed>,
    },
}

/// Creates one vertex backed by a fresh particle at a position.
pub struct MakeVertex {
    position: Point3,
}

impl MakeVertex {
    #[must_use]
    pub fn new(position: Point3) -> Self {
        Self { position }
    }

    /// Executes the operation, registering the vertex.
    ///
    /// # Errors
    ///
    /// Returns an error if registration fails.
    pub fn execute(&self, mesh: &mut Mesh) -> Result<VertexId> {
        let particle = mesh.create_particle(self.position);
        mesh.add_vertex(Vertex::new(particle))
    }
}

/// Creates one surface, registering fresh boundary vertices first.
pub struct MakeSurface {
    class: SurfaceClass,
    vertices: Vec<VertexSeed>,
}

impl MakeSurface {
    #[must_use]
    pub fn new(class: SurfaceClass, vertices: Vec<VertexSeed>) -> Self {
        Self { class, vertices }
    }

    /// Executes the operation, registering dependencies then the surface.
    ///
    /// # Errors
    ///
    /// Returns an error if a seed references a dead vertex or registration
    /// fails. Fresh vertices registered before the failure remain.
    pub fn execute(&self, mesh: &mut Mesh) -> Result<SurfaceId> {
        let boundary = resolve_vertex_seeds(mesh, &self.vertices)?;
        mesh.add_surface(self.class.instance(boundary))
    }
}

/// Creates one body, registering fresh surfaces (and their vertices) first.
pub struct MakeBody {
    class: BodyClass,
    surfaces: Vec<SurfaceSeed>,
}

impl MakeBody {
    #[must_use]
    pub fn new(class: BodyClass, surfaces: Vec<SurfaceSeed>) -> Self {
        Self { class, surfaces }
    }

    /// Executes the operation, registering dependencies then the body.
    ///
    /// # Errors
    ///
    /// Returns an error if a seed references a dead surface or registration
    /// fails. Dependencies registered before the failure remain.
    pub fn execute(&self, mesh: &mut Mesh) -> Result<crate::mesh::BodyId> {
        let mut bounding = Vec::with_capacity(self.surfaces.len());
        for seed in &self.surfaces {
            match seed {
                SurfaceSeed::Existing(id) => {
                    mesh.surface(*id)?;
                    bounding.push(*id);
                }
                SurfaceSeed::New { class, vertices } => {
                    bounding.push(MakeSurface::new(class.clone(), vertices.clone()).execute(mesh)?);
                }
            }
        }
        mesh.add_body(self.class.instance(bounding))
    }
}

/// Creates one structure over already-registered parents.
pub struct MakeStructure {
    parents: Vec<StructureParent>,
}

impl MakeStructure {
    #[must_use]
    pub fn new(parents: Vec<StructureParent>) -> Self {
        Self { parents }
    }

    /// Executes the operation, registering the structure.
    ///
    /// # Errors
    ///
    /// Returns an error if a parent is dead or registration fails.
    pub fn execute(&self, mesh: &mut Mesh) -> Result<crate::mesh::StructureId> {
        mesh.add_structure(Structure::new(self.parents.clone()))
    }
}

fn resolve_vertex_seeds(mesh: &mut Mesh, seeds: &[VertexSeed]) -> Result<Vec<VertexId>> {
    let mut ids = Vec::with_capacity(seeds.len());
    for seed in seeds {
        match seed {
            VertexSeed::Existing(id) => {
                mesh.vertex(*id)?;
                ids.push(*id);
            }
            VertexSeed::At(position) => ids.push(MakeVertex::new(*position).execute(mesh)?),
        }
    }
    Ok(ids)
}
