//! Pluggable geometric constraints.
//!
//! An actor is a stateless functor over current geometry: given an owning
//! geometric element and one of its incident vertices it produces an energy
//! contribution and a force contribution. The evaluation pass (the solver,
//! out of scope here) invokes the kernels once per (owner, vertex) pair and
//! accumulates the returned values; the same actor instance may serve any
//! number of owners.

mod convex_polygon;
mod surface_area;

pub use convex_polygon::ConvexPolygonConstraint;
pub use surface_area::SurfaceAreaConstraint;

use crate::error::Result;
use crate::math::Vector3;
use crate::mesh::{BodyId, Mesh, SurfaceId, VertexId};

/// The geometric element an actor is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorOwner {
    Surface(SurfaceId),
    Body(BodyId),
}

/// Capability surface of a constraint actor.
///
/// Both kernels are pure functions of current geometry and the actor's
/// tunable parameters. An owner kind the actor does not apply to contributes
/// zero.
pub trait ConstraintActor {
    /// Energy contribution of the (owner, vertex) pair.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::error::StructuralError`] if the owner or vertex is
    /// not live.
    fn energy(&self, mesh: &Mesh, owner: ActorOwner, vertex: VertexId) -> Result<f64>;

    /// Force contribution of the (owner, vertex) pair on the vertex.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::error::StructuralError`] if the owner or vertex is
    /// not live.
    fn force(&self, mesh: &Mesh, owner: ActorOwner, vertex: VertexId) -> Result<Vector3>;
}
