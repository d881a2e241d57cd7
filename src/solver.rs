//! Seam to the solver that aggregates forces and energies.
//!
//! A mesh notifies its attached solver of every structural change so the
//! solver can rebuild its evaluation schedule lazily. The solver reference is
//! injected (at construction or via [`crate::mesh::Mesh::attach_solver`]),
//! never read from a global, so independent meshes remain independently
//! testable.

use crate::mesh::{MeshTag, ObjectHandle};

/// The kind of structural change reported to the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshEventKind {
    Create,
    Destroy,
}

/// One structural change notification.
///
/// `objects` carries the handles the event describes: for a plain add, the
/// new object followed by its parents; for editing operations, the objects
/// named by the operation. `operation` tags events emitted by a compound
/// editing operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshEvent {
    pub kind: MeshEventKind,
    pub objects: Vec<ObjectHandle>,
    pub operation: Option<&'static str>,
}

impl MeshEvent {
    #[must_use]
    pub fn new(kind: MeshEventKind, objects: Vec<ObjectHandle>) -> Self {
        Self {
            kind,
            objects,
            operation: None,
        }
    }

    #[must_use]
    pub fn tagged(
        kind: MeshEventKind,
        objects: Vec<ObjectHandle>,
        operation: &'static str,
    ) -> Self {
        Self {
            kind,
            objects,
            operation: Some(operation),
        }
    }
}

/// Receiver of mesh change notifications.
///
/// Methods take `&self`; implementations needing mutable state use interior
/// mutability. Every hook is invoked unconditionally while a solver is
/// attached and not at all otherwise.
pub trait MeshSolver {
    /// A structural change happened on the given mesh.
    fn log(&self, mesh: MeshTag, event: MeshEvent);

    /// The mesh's dirty flag changed.
    fn set_dirty(&self, dirty: bool);

    /// Vertex positions changed outside the integrator's own stepping.
    fn position_changed(&self);
}
