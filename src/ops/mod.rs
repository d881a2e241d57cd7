//! Editing operations over a [`crate::mesh::Mesh`].
//!
//! Each operation is a command struct constructed with its inputs and run
//! with `execute(&mut Mesh)`. Simple operations validate fully before
//! mutating; multi-step operations validate what they can upfront but are
//! not atomic: after a failure the mesh may be inconsistent and callers
//! should re-run [`crate::mesh::Mesh::validate`] before trusting it.

mod collapse;
mod creation;
mod extend;
mod extrude;
mod insert;
mod merge;
mod sew;
mod split;

pub use collapse::CollapseSurface;
pub use creation::{MakeBody, MakeStructure, MakeSurface, MakeVertex, SurfaceSeed, VertexSeed};
pub use extend::{ExtendBody, ExtendSurface};
pub use extrude::{ExtrudeBody, ExtrudeEdge};
pub use insert::InsertVertex;
pub use merge::{MergeSurfaces, MergeVertices};
pub use sew::{sew_all, SewSurfaces};
pub use split::SplitVertex;
