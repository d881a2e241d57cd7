use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::StructuralError;

/// Variant tag shared by all mesh objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Vertex,
    Surface,
    Body,
    Structure,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vertex => write!(f, "vertex"),
            Self::Surface => write!(f, "surface"),
            Self::Body => write!(f, "body"),
            Self::Structure => write!(f, "structure"),
        }
    }
}

macro_rules! object_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $name(pub(crate) u32);

        impl $name {
            /// The inventory slot index this id refers to.
            #[must_use]
            pub fn index(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

object_id! {
    /// Identifier of a vertex within its mesh's vertex inventory.
    VertexId
}
object_id! {
    /// Identifier of a surface within its mesh's surface inventory.
    SurfaceId
}
object_id! {
    /// Identifier of a body within its mesh's body inventory.
    BodyId
}
object_id! {
    /// Identifier of a structure within its mesh's structure inventory.
    StructureId
}

/// Variant-erased object reference, as carried by solver notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectHandle {
    pub kind: ObjectKind,
    pub id: u32,
}

impl ObjectHandle {
    #[must_use]
    pub fn vertex(id: VertexId) -> Self {
        Self {
            kind: ObjectKind::Vertex,
            id: id.0,
        }
    }

    #[must_use]
    pub fn surface(id: SurfaceId) -> Self {
        Self {
            kind: ObjectKind::Surface,
            id: id.0,
        }
    }

    #[must_use]
    pub fn body(id: BodyId) -> Self {
        Self {
            kind: ObjectKind::Body,
            id: id.0,
        }
    }

    #[must_use]
    pub fn structure(id: StructureId) -> Self {
        Self {
            kind: ObjectKind::Structure,
            id: id.0,
        }
    }
}

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}

/// Process-unique token identifying one mesh instance.
///
/// Objects store the tag of the mesh holding them, standing in for the
/// back-pointer of an intrusive design; a recycled id can therefore never be
/// confused with a registration in a different mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshTag(u64);

static NEXT_MESH_TAG: AtomicU64 = AtomicU64::new(1);

impl MeshTag {
    pub(crate) fn next() -> Self {
        Self(NEXT_MESH_TAG.fetch_add(1, Ordering::Relaxed))
    }
}

/// Registration state embedded in every mesh object.
///
/// Both fields are populated while the object occupies an inventory slot and
/// cleared otherwise; an unregistered object has neither an id nor a mesh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Registration {
    id: Option<u32>,
    mesh: Option<MeshTag>,
}

impl Registration {
    pub(crate) fn is_registered(&self) -> bool {
        self.id.is_some()
    }

    pub(crate) fn id(&self) -> Option<u32> {
        self.id
    }

    pub(crate) fn mesh(&self) -> Option<MeshTag> {
        self.mesh
    }

    pub(crate) fn register(&mut self, id: u32, mesh: MeshTag) {
        self.id = Some(id);
        self.mesh = Some(mesh);
    }

    pub(crate) fn clear(&mut self) {
        self.id = None;
        self.mesh = None;
    }
}

/// Capability surface common to all mesh object variants.
pub trait MeshObject {
    /// The variant tag.
    fn kind(&self) -> ObjectKind;

    /// The object's handle, while registered.
    fn handle(&self) -> Option<ObjectHandle>;

    /// Whether the object currently occupies an inventory slot.
    fn is_registered(&self) -> bool;

    /// Handles of the object's current parents, in relation order.
    fn parents(&self) -> Vec<ObjectHandle>;

    /// Handles of the object's current children, in relation order.
    fn children(&self) -> Vec<ObjectHandle>;

    /// Checks variant-local structural soundness.
    ///
    /// # Errors
    ///
    /// Returns [`StructuralError::InvalidObject`] describing the violation.
    fn validate(&self) -> Result<(), StructuralError>;
}
