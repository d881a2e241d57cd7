use crate::error::StructuralError;
use crate::particle::ParticleId;

use super::object::{MeshObject, ObjectHandle, ObjectKind, Registration};
use super::{SurfaceId, VertexId};

/// A mesh vertex.
///
/// Carries no position of its own: position and mass live in the particle the
/// vertex wraps. The surfaces list holds the vertex's children, the surfaces
/// whose boundary it sits on.
#[derive(Debug, Clone)]
pub struct Vertex {
    pub(crate) reg: Registration,
    particle: ParticleId,
    pub(crate) surfaces: Vec<SurfaceId>,
}

impl Vertex {
    /// Creates an unregistered vertex wrapping an existing particle.
    #[must_use]
    pub fn new(particle: ParticleId) -> Self {
        Self {
            reg: Registration::default(),
            particle,
            surfaces: Vec::new(),
        }
    }

    /// The vertex's id while registered.
    #[must_use]
    pub fn id(&self) -> Option<VertexId> {
        self.reg.id().map(VertexId)
    }

    /// The particle supplying this vertex's position and mass.
    #[must_use]
    pub fn particle(&self) -> ParticleId {
        self.particle
    }

    /// The surfaces this vertex bounds.
    #[must_use]
    pub fn surfaces(&self) -> &[SurfaceId] {
        &self.surfaces
    }

    pub(crate) fn attach_surface(&mut self, surface: SurfaceId) {
        if !self.surfaces.contains(&surface) {
            self.surfaces.push(surface);
        }
    }

    pub(crate) fn detach_surface(&mut self, surface: SurfaceId) {
        self.surfaces.retain(|s| *s != surface);
    }
}

impl MeshObject for Vertex {
    fn kind(&self) -> ObjectKind {
        ObjectKind::Vertex
    }

    fn handle(&self) -> Option<ObjectHandle> {
        self.id().map(ObjectHandle::vertex)
    }

    fn is_registered(&self) -> bool {
        self.reg.is_registered()
    }

    fn parents(&self) -> Vec<ObjectHandle> {
        Vec::new()
    }

    fn children(&self) -> Vec<ObjectHandle> {
        self.surfaces.iter().copied().map(ObjectHandle::surface).collect()
    }

    fn validate(&self) -> Result<(), StructuralError> {
        Ok(())
    }
}
