use serde::{Deserialize, Serialize};

use crate::error::StructuralError;

use super::object::{MeshObject, ObjectHandle, ObjectKind, Registration};
use super::{BodyId, StructureId};

/// A parent of a structure: either a body or another structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StructureParent {
    Body(BodyId),
    Structure(StructureId),
}

impl StructureParent {
    #[must_use]
    pub(crate) fn handle(self) -> ObjectHandle {
        match self {
            Self::Body(id) => ObjectHandle::body(id),
            Self::Structure(id) => ObjectHandle::structure(id),
        }
    }
}

/// A recursive aggregate of bodies and structures.
///
/// Structures have no geometry of their own; they group bodies (and other
/// structures) into tissues, organs, or whatever the model calls them.
#[derive(Debug, Clone)]
pub struct Structure {
    pub(crate) reg: Registration,
    pub(crate) parents: Vec<StructureParent>,
    pub(crate) structures: Vec<StructureId>,
}

impl Structure {
    /// Creates an unregistered structure aggregated under the given parents.
    #[must_use]
    pub fn new(parents: Vec<StructureParent>) -> Self {
        Self {
            reg: Registration::default(),
            parents,
            structures: Vec::new(),
        }
    }

    /// The structure's id while registered.
    #[must_use]
    pub fn id(&self) -> Option<StructureId> {
        self.reg.id().map(StructureId)
    }

    /// The bodies and structures this structure aggregates under.
    #[must_use]
    pub fn parent_refs(&self) -> &[StructureParent] {
        &self.parents
    }

    /// Sub-structures aggregated under this structure.
    #[must_use]
    pub fn structures(&self) -> &[StructureId] {
        &self.structures
    }

    pub(crate) fn attach_structure(&mut self, structure: StructureId) {
        if !self.structures.contains(&structure) {
            self.structures.push(structure);
        }
    }
}

impl MeshObject for Structure {
    fn kind(&self) -> ObjectKind {
        ObjectKind::Structure
    }

    fn handle(&self) -> Option<ObjectHandle> {
        self.id().map(ObjectHandle::structure)
    }

    fn is_registered(&self) -> bool {
        self.reg.is_registered()
    }

    fn parents(&self) -> Vec<ObjectHandle> {
        self.parents.iter().map(|p| p.handle()).collect()
    }

    fn children(&self) -> Vec<ObjectHandle> {
        self.structures.iter().copied().map(ObjectHandle::structure).collect()
    }

    fn validate(&self) -> Result<(), StructuralError> {
        if self.parents.is_empty() {
            return Err(StructuralError::InvalidObject {
                kind: ObjectKind::Structure,
                reason: "aggregates nothing; at least one parent required".into(),
            });
        }
        Ok(())
    }
}
