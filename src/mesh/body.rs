use serde::{Deserialize, Serialize};

use crate::error::StructuralError;

use super::object::{MeshObject, ObjectHandle, ObjectKind, Registration};
use super::{BodyId, StructureId, SurfaceId};

/// Type descriptor for bodies, used by body-building editing operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyClass {
    name: String,
}

impl BodyClass {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Constructs an unregistered body of this class over `surfaces`.
    #[must_use]
    pub fn instance(&self, surfaces: Vec<SurfaceId>) -> Body {
        Body::new(self.clone(), surfaces)
    }
}

/// An enclosed volume bounded by surfaces.
///
/// The bounding surfaces are the body's parents; structures aggregating the
/// body are its children.
#[derive(Debug, Clone)]
pub struct Body {
    pub(crate) reg: Registration,
    class: BodyClass,
    pub(crate) surfaces: Vec<SurfaceId>,
    pub(crate) structures: Vec<StructureId>,
}

impl Body {
    /// Creates an unregistered body over the given bounding surfaces.
    #[must_use]
    pub fn new(class: BodyClass, surfaces: Vec<SurfaceId>) -> Self {
        Self {
            reg: Registration::default(),
            class,
            surfaces,
            structures: Vec::new(),
        }
    }

    /// The body's id while registered.
    #[must_use]
    pub fn id(&self) -> Option<BodyId> {
        self.reg.id().map(BodyId)
    }

    #[must_use]
    pub fn class(&self) -> &BodyClass {
        &self.class
    }

    /// The bounding surfaces.
    #[must_use]
    pub fn surfaces(&self) -> &[SurfaceId] {
        &self.surfaces
    }

    /// The structures aggregating this body.
    #[must_use]
    pub fn structures(&self) -> &[StructureId] {
        &self.structures
    }

    pub(crate) fn attach_structure(&mut self, structure: StructureId) {
        if !self.structures.contains(&structure) {
            self.structures.push(structure);
        }
    }

    pub(crate) fn replace_surface(&mut self, old: SurfaceId, new: SurfaceId) {
        self.surfaces.retain(|s| *s != old);
        if !self.surfaces.contains(&new) {
            self.surfaces.push(new);
        }
    }

    pub(crate) fn remove_surface(&mut self, surface: SurfaceId) {
        self.surfaces.retain(|s| *s != surface);
    }
}

impl MeshObject for Body {
    fn kind(&self) -> ObjectKind {
        ObjectKind::Body
    }

    fn handle(&self) -> Option<ObjectHandle> {
        self.id().map(ObjectHandle::body)
    }

    fn is_registered(&self) -> bool {
        self.reg.is_registered()
    }

    fn parents(&self) -> Vec<ObjectHandle> {
        self.surfaces.iter().copied().map(ObjectHandle::surface).collect()
    }

    fn children(&self) -> Vec<ObjectHandle> {
        self.structures.iter().copied().map(ObjectHandle::structure).collect()
    }

    fn validate(&self) -> Result<(), StructuralError> {
        if self.surfaces.len() < 2 {
            return Err(StructuralError::InvalidObject {
                kind: ObjectKind::Body,
                reason: format!(
                    "bounded by {} surfaces; at least 2 required to close a volume",
                    self.surfaces.len()
                ),
            });
        }
        Ok(())
    }
}
