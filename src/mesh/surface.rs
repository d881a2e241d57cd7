use serde::{Deserialize, Serialize};

use crate::error::StructuralError;

use super::object::{MeshObject, ObjectHandle, ObjectKind, Registration};
use super::{BodyId, SurfaceId, VertexId};

/// Type descriptor for surfaces.
///
/// Editing operations that fabricate new surfaces (fan splits, extensions,
/// extrusions) use the class of the surface they start from to construct the
/// new instances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceClass {
    name: String,
}

impl SurfaceClass {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Constructs an unregistered surface of this class over `vertices`.
    #[must_use]
    pub fn instance(&self, vertices: Vec<VertexId>) -> Surface {
        Surface::new(self.clone(), vertices)
    }
}

/// A polygon bounding surface.
///
/// The boundary is a cyclically-ordered vertex sequence of length ≥ 3; these
/// vertices are the surface's parents. At most two bodies own the surface,
/// one per side.
#[derive(Debug, Clone)]
pub struct Surface {
    pub(crate) reg: Registration,
    class: SurfaceClass,
    pub(crate) vertices: Vec<VertexId>,
    pub(crate) b1: Option<BodyId>,
    pub(crate) b2: Option<BodyId>,
}

impl Surface {
    /// Creates an unregistered surface over the given boundary.
    #[must_use]
    pub fn new(class: SurfaceClass, vertices: Vec<VertexId>) -> Self {
        Self {
            reg: Registration::default(),
            class,
            vertices,
            b1: None,
            b2: None,
        }
    }

    /// The surface's id while registered.
    #[must_use]
    pub fn id(&self) -> Option<SurfaceId> {
        self.reg.id().map(SurfaceId)
    }

    #[must_use]
    pub fn class(&self) -> &SurfaceClass {
        &self.class
    }

    /// The cyclically-ordered boundary.
    #[must_use]
    pub fn vertices(&self) -> &[VertexId] {
        &self.vertices
    }

    /// The boundary vertex `steps` positions after index `i`, wrapping.
    #[must_use]
    pub fn vertex_after(&self, i: usize, steps: usize) -> VertexId {
        self.vertices[(i + steps) % self.vertices.len()]
    }

    /// The boundary index of `vertex`, if present.
    #[must_use]
    pub fn vertex_index(&self, vertex: VertexId) -> Option<usize> {
        self.vertices.iter().position(|v| *v == vertex)
    }

    /// The bodies owning this surface, in slot order.
    #[must_use]
    pub fn bodies(&self) -> Vec<BodyId> {
        self.b1.into_iter().chain(self.b2).collect()
    }

    /// Whether `body` owns this surface on either side.
    #[must_use]
    pub fn bounds(&self, body: BodyId) -> bool {
        self.b1 == Some(body) || self.b2 == Some(body)
    }

    /// Whether both sides are already owned by bodies.
    #[must_use]
    pub fn fully_bounded(&self) -> bool {
        self.b1.is_some() && self.b2.is_some()
    }

    /// Claims a free side for `body`; fails if both sides are taken.
    ///
    /// By convention the surface normal points out of `b1` and into `b2`.
    pub(crate) fn attach_body(&mut self, body: BodyId) -> Result<(), StructuralError> {
        self.attach_body_on(body, true)
    }

    /// Claims a side for `body`, preferring `b1` or `b2`; falls back to the
    /// other slot when the preferred one is taken.
    pub(crate) fn attach_body_on(
        &mut self,
        body: BodyId,
        prefer_b1: bool,
    ) -> Result<(), StructuralError> {
        if self.bounds(body) {
            return Ok(());
        }
        let (first, second) = if prefer_b1 {
            (&mut self.b1, &mut self.b2)
        } else {
            (&mut self.b2, &mut self.b1)
        };
        if first.is_none() {
            *first = Some(body);
            Ok(())
        } else if second.is_none() {
            *second = Some(body);
            Ok(())
        } else {
            Err(StructuralError::InvalidObject {
                kind: ObjectKind::Surface,
                reason: "both sides already bounded by bodies".into(),
            })
        }
    }

    pub(crate) fn detach_body(&mut self, body: BodyId) {
        if self.b1 == Some(body) {
            self.b1 = None;
        }
        if self.b2 == Some(body) {
            self.b2 = None;
        }
    }

    pub(crate) fn remove_boundary_vertex(&mut self, vertex: VertexId) {
        self.vertices.retain(|v| *v != vertex);
    }
}

impl MeshObject for Surface {
    fn kind(&self) -> ObjectKind {
        ObjectKind::Surface
    }

    fn handle(&self) -> Option<ObjectHandle> {
        self.id().map(ObjectHandle::surface)
    }

    fn is_registered(&self) -> bool {
        self.reg.is_registered()
    }

    fn parents(&self) -> Vec<ObjectHandle> {
        self.vertices.iter().copied().map(ObjectHandle::vertex).collect()
    }

    fn children(&self) -> Vec<ObjectHandle> {
        self.bodies().into_iter().map(ObjectHandle::body).collect()
    }

    fn validate(&self) -> Result<(), StructuralError> {
        if self.vertices.len() < 3 {
            return Err(StructuralError::InvalidObject {
                kind: ObjectKind::Surface,
                reason: format!("boundary has {} vertices; at least 3 required", self.vertices.len()),
            });
        }
        for (i, v) in self.vertices.iter().enumerate() {
            if self.vertices[i + 1..].contains(v) {
                return Err(StructuralError::InvalidObject {
                    kind: ObjectKind::Surface,
                    reason: format!("vertex {v} appears twice on the boundary"),
                });
            }
        }
        Ok(())
    }
}
