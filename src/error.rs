use thiserror::Error;

use crate::mesh::ObjectKind;

/// Top-level error type for the cytomesh engine.
#[derive(Debug, Error)]
pub enum CytomeshError {
    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error(transparent)]
    Adjacency(#[from] AdjacencyError),

    #[error(transparent)]
    Parameter(#[from] ParameterError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

/// Errors in object registration and inventory bookkeeping.
#[derive(Debug, Error)]
pub enum StructuralError {
    #[error("object is already registered with a mesh")]
    AlreadyRegistered,

    #[error("object is not registered with a mesh")]
    NotRegistered,

    #[error("object is registered with a different mesh")]
    MeshMismatch,

    #[error("{kind} id {id} exceeds inventory bounds ({bound})")]
    IdOutOfBounds {
        kind: ObjectKind,
        id: u32,
        bound: usize,
    },

    #[error("{kind} id {id} does not refer to a live object")]
    EntityNotFound { kind: ObjectKind, id: u32 },

    #[error("invalid {kind}: {reason}")]
    InvalidObject { kind: ObjectKind, reason: String },
}

/// Errors in the connectivity required by an editing operation.
#[derive(Debug, Error)]
pub enum AdjacencyError {
    #[error("vertices {0} and {1} share no surface")]
    NoSharedSurface(u32, u32),

    #[error("vertices {0} and {1} are not cyclically adjacent on a shared surface")]
    NotAdjacent(u32, u32),

    #[error("surface {0} contacts the collapsed surface over a non-contiguous run")]
    NonContiguousContact(u32),

    #[error("surface {0} is already bounded by a body on both sides")]
    SurfaceFullyBounded(u32),

    #[error("could not match a kept vertex to an unclaimed removed vertex")]
    VertexMatchFailed,
}

/// Errors in operation parameters (arity and range).
#[derive(Debug, Error)]
pub enum ParameterError {
    #[error("expected {expected} length coefficients, got {got}")]
    CoefficientCount { expected: usize, got: usize },

    #[error("length coefficient {0} is outside (0, 1)")]
    CoefficientRange(f64),

    #[error("edge index {index} is out of range for a boundary of {len} vertices")]
    EdgeIndexOutOfRange { index: usize, len: usize },

    #[error("surfaces have {kept} and {removed} vertices; merge requires equal counts")]
    SurfaceSizeMismatch { kept: usize, removed: usize },
}

/// Errors from degenerate geometry.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("reference edge has zero length")]
    DegenerateEdge,

    #[error("polygon boundary has {0} vertices; at least 3 required")]
    PolygonTooSmall(usize),

    #[error("polygon normal is degenerate")]
    DegenerateNormal,
}

/// Convenience type alias for results using [`CytomeshError`].
pub type Result<T> = std::result::Result<T, CytomeshError>;
