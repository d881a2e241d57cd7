pub mod body;
pub mod inventory;
pub mod object;
pub mod structure;
pub mod surface;
pub mod vertex;

pub use body::{Body, BodyClass};
pub use object::{BodyId, MeshObject, MeshTag, ObjectHandle, ObjectKind, StructureId, SurfaceId, VertexId};
pub use structure::{Structure, StructureParent};
pub use surface::{Surface, SurfaceClass};
pub use vertex::Vertex;

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::error;

use crate::error::{GeometryError, Result, StructuralError};
use crate::math::{polygon, Point3, Vector3};
use crate::particle::{ParticleBackend, ParticleId, PointMassBackend};
use crate::solver::{MeshEvent, MeshEventKind, MeshSolver};

use inventory::Inventory;

/// Central container owning all mesh objects.
///
/// Holds one recycling inventory per object variant, the injected particle
/// backend, and an optional solver collaborator that receives structured
/// change notifications. All structural edits require `&mut Mesh`; evaluation
/// passes read through `&Mesh`.
pub struct Mesh {
    tag: MeshTag,
    pub(crate) vertices: Inventory<Vertex>,
    pub(crate) surfaces: Inventory<Surface>,
    pub(crate) bodies: Inventory<Body>,
    pub(crate) structures: Inventory<Structure>,
    pub(crate) particles: Box<dyn ParticleBackend>,
    solver: Option<Rc<dyn MeshSolver>>,
    dirty: bool,
}

impl Default for Mesh {
    /// A mesh over a standalone [`PointMassBackend`], with no solver.
    fn default() -> Self {
        Self::new(Box::new(PointMassBackend::new()))
    }
}

impl fmt::Debug for Mesh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mesh")
            .field("tag", &self.tag)
            .field("vertices", &self.vertices.len())
            .field("surfaces", &self.surfaces.len())
            .field("bodies", &self.bodies.len())
            .field("structures", &self.structures.len())
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

impl Mesh {
    /// Creates an empty mesh over the given particle backend.
    #[must_use]
    pub fn new(particles: Box<dyn ParticleBackend>) -> Self {
        Self {
            tag: MeshTag::next(),
            vertices: Inventory::new(),
            surfaces: Inventory::new(),
            bodies: Inventory::new(),
            structures: Inventory::new(),
            particles,
            solver: None,
            dirty: false,
        }
    }

    /// The token identifying this mesh in object back-references.
    #[must_use]
    pub fn tag(&self) -> MeshTag {
        self.tag
    }

    /// Attaches a solver collaborator; notifications start immediately.
    pub fn attach_solver(&mut self, solver: Rc<dyn MeshSolver>) {
        self.solver = Some(solver);
    }

    /// Whether the mesh changed structurally since [`Mesh::mark_clean`].
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clears the dirty flag, typically after the solver rebuilt its state.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub(crate) fn make_dirty(&mut self) {
        self.dirty = true;
        if let Some(solver) = &self.solver {
            solver.set_dirty(true);
        }
    }

    pub(crate) fn notify(&self, event: MeshEvent) {
        if let Some(solver) = &self.solver {
            solver.log(self.tag, event);
        }
    }

    pub(crate) fn notify_position_changed(&self) {
        if let Some(solver) = &self.solver {
            solver.position_changed();
        }
    }

    // --- Lookups ---

    /// Returns the vertex, or an error if the id is stale or out of bounds.
    ///
    /// # Errors
    ///
    /// Returns a [`StructuralError`] if the id does not refer to a live vertex.
    pub fn vertex(&self, id: VertexId) -> Result<&Vertex> {
        self.vertices.get(id.index()).ok_or_else(|| {
            StructuralError::EntityNotFound {
                kind: ObjectKind::Vertex,
                id: id.index(),
            }
            .into()
        })
    }

    /// Returns the surface, or an error if the id is stale or out of bounds.
    ///
    /// # Errors
    ///
    /// Returns a [`StructuralError`] if the id does not refer to a live surface.
    pub fn surface(&self, id: SurfaceId) -> Result<&Surface> {
        self.surfaces.get(id.index()).ok_or_else(|| {
            StructuralError::EntityNotFound {
                kind: ObjectKind::Surface,
                id: id.index(),
            }
            .into()
        })
    }

    /// Returns the body, or an error if the id is stale or out of bounds.
    ///
    /// # Errors
    ///
    /// Returns a [`StructuralError`] if the id does not refer to a live body.
    pub fn body(&self, id: BodyId) -> Result<&Body> {
        self.bodies.get(id.index()).ok_or_else(|| {
            StructuralError::EntityNotFound {
                kind: ObjectKind::Body,
                id: id.index(),
            }
            .into()
        })
    }

    /// Returns the structure, or an error if the id is stale or out of bounds.
    ///
    /// # Errors
    ///
    /// Returns a [`StructuralError`] if the id does not refer to a live structure.
    pub fn structure(&self, id: StructureId) -> Result<&Structure> {
        self.structures.get(id.index()).ok_or_else(|| {
            StructuralError::EntityNotFound {
                kind: ObjectKind::Structure,
                id: id.index(),
            }
            .into()
        })
    }

    pub(crate) fn vertex_mut(&mut self, id: VertexId) -> Result<&mut Vertex> {
        self.vertices.get_mut(id.index()).ok_or_else(|| {
            StructuralError::EntityNotFound {
                kind: ObjectKind::Vertex,
                id: id.index(),
            }
            .into()
        })
    }

    pub(crate) fn surface_mut(&mut self, id: SurfaceId) -> Result<&mut Surface> {
        self.surfaces.get_mut(id.index()).ok_or_else(|| {
            StructuralError::EntityNotFound {
                kind: ObjectKind::Surface,
                id: id.index(),
            }
            .into()
        })
    }

    pub(crate) fn body_mut(&mut self, id: BodyId) -> Result<&mut Body> {
        self.bodies.get_mut(id.index()).ok_or_else(|| {
            StructuralError::EntityNotFound {
                kind: ObjectKind::Body,
                id: id.index(),
            }
            .into()
        })
    }

    /// Number of live vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of live surfaces.
    #[must_use]
    pub fn surface_count(&self) -> usize {
        self.surfaces.len()
    }

    /// Number of live bodies.
    #[must_use]
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Number of live structures.
    #[must_use]
    pub fn structure_count(&self) -> usize {
        self.structures.len()
    }

    /// Ids of all live vertices, in id order.
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.vertices.iter().map(|(id, _)| VertexId(id))
    }

    /// Ids of all live surfaces, in id order.
    pub fn surface_ids(&self) -> impl Iterator<Item = SurfaceId> + '_ {
        self.surfaces.iter().map(|(id, _)| SurfaceId(id))
    }

    /// Ids of all live bodies, in id order.
    pub fn body_ids(&self) -> impl Iterator<Item = BodyId> + '_ {
        self.bodies.iter().map(|(id, _)| BodyId(id))
    }

    /// Ids of all live structures, in id order.
    pub fn structure_ids(&self) -> impl Iterator<Item = StructureId> + '_ {
        self.structures.iter().map(|(id, _)| StructureId(id))
    }

    // --- Particle facade ---

    pub(crate) fn create_particle(&mut self, position: Point3) -> ParticleId {
        self.particles.create(position)
    }

    /// Position of a vertex, read from its particle.
    ///
    /// # Errors
    ///
    /// Returns a [`StructuralError`] if the vertex is not live.
    pub fn position(&self, id: VertexId) -> Result<Point3> {
        Ok(self.particles.position(self.vertex(id)?.particle()))
    }

    /// Moves a vertex's particle to `position`.
    ///
    /// # Errors
    ///
    /// Returns a [`StructuralError`] if the vertex is not live.
    pub fn set_position(&mut self, id: VertexId, position: Point3) -> Result<()> {
        let particle = self.vertex(id)?.particle();
        self.particles.set_position(particle, position);
        Ok(())
    }

    /// Mass of a vertex, read from its particle.
    ///
    /// # Errors
    ///
    /// Returns a [`StructuralError`] if the vertex is not live.
    pub fn vertex_mass(&self, id: VertexId) -> Result<f64> {
        Ok(self.particles.mass(self.vertex(id)?.particle()))
    }

    /// The particle backend's integration timestep.
    #[must_use]
    pub fn timestep(&self) -> f64 {
        self.particles.timestep()
    }

    // --- Registration ---

    /// Registers an unregistered vertex, assigning it an identifier.
    ///
    /// # Errors
    ///
    /// Returns a [`StructuralError`] if the vertex is already registered or
    /// fails validation.
    pub fn add_vertex(&mut self, vertex: Vertex) -> Result<VertexId> {
        Self::check_unregistered(vertex.is_registered())?;
        vertex.validate()?;
        self.make_dirty();
        let tag = self.tag;
        let id = VertexId(self.vertices.allocate(|id| {
            let mut vertex = vertex;
            vertex.reg.register(id, tag);
            vertex
        }));
        self.notify(MeshEvent::new(
            MeshEventKind::Create,
            vec![ObjectHandle::vertex(id)],
        ));
        Ok(id)
    }

    /// Registers an unregistered surface over already-registered vertices.
    ///
    /// The boundary vertices gain the surface as a child; the Create
    /// notification carries the surface followed by its boundary vertices.
    ///
    /// # Errors
    ///
    /// Returns a [`StructuralError`] if the surface is already registered,
    /// fails validation, or references a vertex that is not live.
    pub fn add_surface(&mut self, surface: Surface) -> Result<SurfaceId> {
        Self::check_unregistered(surface.is_registered())?;
        surface.validate()?;
        for v in surface.vertices() {
            self.vertex(*v)?;
        }
        self.make_dirty();
        let tag = self.tag;
        let boundary = surface.vertices().to_vec();
        let id = SurfaceId(self.surfaces.allocate(|id| {
            let mut surface = surface;
            surface.reg.register(id, tag);
            surface
        }));
        for v in &boundary {
            if let Some(vertex) = self.vertices.get_mut(v.index()) {
                vertex.attach_surface(id);
            }
        }
        let mut objects = vec![ObjectHandle::surface(id)];
        objects.extend(boundary.iter().copied().map(ObjectHandle::vertex));
        self.notify(MeshEvent::new(MeshEventKind::Create, objects));
        Ok(id)
    }

    /// Registers an unregistered body over already-registered surfaces.
    ///
    /// Every bounding surface must have a free side, and the surfaces must
    /// close a volume: each undirected boundary edge has to be shared by
    /// exactly two of the body's surfaces.
    ///
    /// # Errors
    ///
    /// Returns a [`StructuralError`] if the body is already registered, fails
    /// validation, references a dead surface, a surface is bounded on both
    /// sides, or the surfaces do not close a volume.
    pub fn add_body(&mut self, body: Body) -> Result<BodyId> {
        Self::check_unregistered(body.is_registered())?;
        body.validate()?;
        let mut edges: HashMap<(u32, u32), usize> = HashMap::new();
        for s in body.surfaces() {
            let surface = self.surface(*s)?;
            if surface.fully_bounded() {
                error!(surface = %s, "surface is already bounded on both sides");
                return Err(StructuralError::InvalidObject {
                    kind: ObjectKind::Body,
                    reason: format!("surface {s} is already bounded on both sides"),
                }
                .into());
            }
            let boundary = surface.vertices();
            for (i, v) in boundary.iter().enumerate() {
                let w = surface.vertex_after(i, 1);
                let key = (v.index().min(w.index()), v.index().max(w.index()));
                *edges.entry(key).or_insert(0) += 1;
            }
        }
        if let Some((edge, count)) = edges.iter().find(|(_, count)| **count != 2) {
            error!(?edge, count, "body surfaces do not close a volume");
            return Err(StructuralError::InvalidObject {
                kind: ObjectKind::Body,
                reason: format!(
                    "edge ({}, {}) is shared by {count} surfaces; a closed volume requires 2",
                    edge.0, edge.1
                ),
            }
            .into());
        }
        // Decide which side of each surface the body sits on, so that by
        // convention the surface normal points out of `b1` and into `b2`.
        let bounding = body.surfaces().to_vec();
        let mut interior = Vector3::zeros();
        for s in &bounding {
            interior += self.surface_centroid(*s)?.coords;
        }
        #[allow(clippy::cast_precision_loss)]
        let interior = interior / bounding.len() as f64;
        let mut prefer_b1 = Vec::with_capacity(bounding.len());
        for s in &bounding {
            let toward_body = interior - self.surface_centroid(*s)?.coords;
            let side = self
                .surface_normal(*s)
                .map_or(0.0, |normal| normal.dot(&toward_body));
            prefer_b1.push(side <= 0.0);
        }

        self.make_dirty();
        let tag = self.tag;
        let id = BodyId(self.bodies.allocate(|id| {
            let mut body = body;
            body.reg.register(id, tag);
            body
        }));
        for (s, prefer) in bounding.iter().zip(prefer_b1) {
            if let Some(surface) = self.surfaces.get_mut(s.index()) {
                surface.attach_body_on(id, prefer)?;
            }
        }
        let mut objects = vec![ObjectHandle::body(id)];
        objects.extend(bounding.iter().copied().map(ObjectHandle::surface));
        self.notify(MeshEvent::new(MeshEventKind::Create, objects));
        Ok(id)
    }

    /// Registers an unregistered structure under already-registered parents.
    ///
    /// # Errors
    ///
    /// Returns a [`StructuralError`] if the structure is already registered,
    /// fails validation, or references a dead parent.
    pub fn add_structure(&mut self, structure: Structure) -> Result<StructureId> {
        Self::check_unregistered(structure.is_registered())?;
        structure.validate()?;
        for parent in structure.parent_refs() {
            match parent {
                StructureParent::Body(b) => {
                    self.body(*b)?;
                }
                StructureParent::Structure(s) => {
                    self.structure(*s)?;
                }
            }
        }
        self.make_dirty();
        let tag = self.tag;
        let parents = structure.parent_refs().to_vec();
        let id = StructureId(self.structures.allocate(|id| {
            let mut structure = structure;
            structure.reg.register(id, tag);
            structure
        }));
        for parent in &parents {
            match parent {
                StructureParent::Body(b) => {
                    if let Some(body) = self.bodies.get_mut(b.index()) {
                        body.attach_structure(id);
                    }
                }
                StructureParent::Structure(s) => {
                    if let Some(structure) = self.structures.get_mut(s.index()) {
                        structure.attach_structure(id);
                    }
                }
            }
        }
        let mut objects = vec![ObjectHandle::structure(id)];
        objects.extend(parents.iter().map(|p| p.handle()));
        self.notify(MeshEvent::new(MeshEventKind::Create, objects));
        Ok(id)
    }

    fn check_unregistered(registered: bool) -> Result<()> {
        if registered {
            error!("object already registered; pass a fresh or fully removed object");
            return Err(StructuralError::AlreadyRegistered.into());
        }
        Ok(())
    }

    // --- Removal ---

    /// Unregisters a vertex, returning it detached.
    ///
    /// The identifier returns to the available set and may be reassigned to
    /// an unrelated future object. Surfaces that keep another live boundary
    /// vertex are spared (their boundary retains the dangling id until the
    /// caller clears it); a surface whose last boundary vertex disappears is
    /// removed recursively.
    ///
    /// # Errors
    ///
    /// Returns a [`StructuralError`] if the id is out of bounds or stale.
    pub fn remove_vertex(&mut self, id: VertexId) -> Result<Vertex> {
        self.check_removable(ObjectKind::Vertex, id.index(), self.vertices.bound())?;
        self.check_owned(
            self.vertices.get(id.index()).map(|v| v.reg.mesh()),
            ObjectKind::Vertex,
            id.index(),
        )?;
        self.make_dirty();
        let Some(mut vertex) = self.vertices.release(id.index()) else {
            return Err(StructuralError::EntityNotFound {
                kind: ObjectKind::Vertex,
                id: id.index(),
            }
            .into());
        };
        self.notify(MeshEvent::new(
            MeshEventKind::Destroy,
            vec![ObjectHandle::vertex(id)],
        ));
        vertex.reg.clear();
        self.particles.destroy(vertex.particle());
        for s in vertex.surfaces.clone() {
            let Some(surface) = self.surfaces.get(s.index()) else {
                continue;
            };
            let shared = surface
                .vertices()
                .iter()
                .any(|v| *v != id && self.vertices.contains(v.index()));
            if !shared {
                self.remove_surface(s)?;
            }
        }
        Ok(vertex)
    }

    /// Unregisters a surface, returning it detached.
    ///
    /// Its boundary vertices keep a dangling child reference until the caller
    /// clears it. A body whose surfaces are all gone is removed recursively;
    /// bodies with another live surface are spared.
    ///
    /// # Errors
    ///
    /// Returns a [`StructuralError`] if the id is out of bounds or stale.
    pub fn remove_surface(&mut self, id: SurfaceId) -> Result<Surface> {
        self.check_removable(ObjectKind::Surface, id.index(), self.surfaces.bound())?;
        self.check_owned(
            self.surfaces.get(id.index()).map(|s| s.reg.mesh()),
            ObjectKind::Surface,
            id.index(),
        )?;
        self.make_dirty();
        let Some(mut surface) = self.surfaces.release(id.index()) else {
            return Err(StructuralError::EntityNotFound {
                kind: ObjectKind::Surface,
                id: id.index(),
            }
            .into());
        };
        self.notify(MeshEvent::new(
            MeshEventKind::Destroy,
            vec![ObjectHandle::surface(id)],
        ));
        surface.reg.clear();
        for b in surface.bodies() {
            let Some(body) = self.bodies.get(b.index()) else {
                continue;
            };
            let shared = body
                .surfaces()
                .iter()
                .any(|s| *s != id && self.surfaces.contains(s.index()));
            if !shared {
                self.remove_body(b)?;
            }
        }
        Ok(surface)
    }

    /// Unregisters a body, returning it detached.
    ///
    /// Its bounding surfaces' ownership slots keep the dangling id until the
    /// caller clears them. Child structures whose only live parent was this
    /// body are removed recursively; structures with another live parent are
    /// spared and keep the dangling parent reference.
    ///
    /// # Errors
    ///
    /// Returns a [`StructuralError`] if the id is out of bounds or stale.
    pub fn remove_body(&mut self, id: BodyId) -> Result<Body> {
        self.check_removable(ObjectKind::Body, id.index(), self.bodies.bound())?;
        self.check_owned(
            self.bodies.get(id.index()).map(|b| b.reg.mesh()),
            ObjectKind::Body,
            id.index(),
        )?;
        self.make_dirty();
        let Some(mut body) = self.bodies.release(id.index()) else {
            return Err(StructuralError::EntityNotFound {
                kind: ObjectKind::Body,
                id: id.index(),
            }
            .into());
        };
        self.notify(MeshEvent::new(
            MeshEventKind::Destroy,
            vec![ObjectHandle::body(id)],
        ));
        body.reg.clear();
        for st in body.structures.clone() {
            let Some(structure) = self.structures.get(st.index()) else {
                continue;
            };
            if !self.structure_has_other_live_parent(structure, StructureParent::Body(id)) {
                self.remove_structure(st)?;
            }
        }
        Ok(body)
    }

    /// Unregisters a structure, returning it detached.
    ///
    /// Sub-structures whose only live parent was this structure are removed
    /// recursively.
    ///
    /// # Errors
    ///
    /// Returns a [`StructuralError`] if the id is out of bounds or stale.
    pub fn remove_structure(&mut self, id: StructureId) -> Result<Structure> {
        self.check_removable(ObjectKind::Structure, id.index(), self.structures.bound())?;
        self.check_owned(
            self.structures.get(id.index()).map(|s| s.reg.mesh()),
            ObjectKind::Structure,
            id.index(),
        )?;
        self.make_dirty();
        let Some(mut structure) = self.structures.release(id.index()) else {
            return Err(StructuralError::EntityNotFound {
                kind: ObjectKind::Structure,
                id: id.index(),
            }
            .into());
        };
        self.notify(MeshEvent::new(
            MeshEventKind::Destroy,
            vec![ObjectHandle::structure(id)],
        ));
        structure.reg.clear();
        for st in structure.structures.clone() {
            let Some(child) = self.structures.get(st.index()) else {
                continue;
            };
            if !self.structure_has_other_live_parent(child, StructureParent::Structure(id)) {
                self.remove_structure(st)?;
            }
        }
        Ok(structure)
    }

    fn structure_has_other_live_parent(
        &self,
        structure: &Structure,
        removed: StructureParent,
    ) -> bool {
        structure.parent_refs().iter().any(|p| {
            *p != removed
                && match p {
                    StructureParent::Body(b) => self.bodies.contains(b.index()),
                    StructureParent::Structure(s) => self.structures.contains(s.index()),
                }
        })
    }

    fn check_removable(&self, kind: ObjectKind, id: u32, bound: usize) -> Result<()> {
        if id as usize >= bound {
            error!(%kind, id, bound, "object id exceeds inventory bounds");
            return Err(StructuralError::IdOutOfBounds { kind, id, bound }.into());
        }
        Ok(())
    }

    fn check_owned(&self, mesh: Option<Option<MeshTag>>, kind: ObjectKind, id: u32) -> Result<()> {
        match mesh {
            None => Err(StructuralError::EntityNotFound { kind, id }.into()),
            Some(tag) if tag != Some(self.tag) => {
                error!(%kind, id, "object is registered with a different mesh");
                Err(StructuralError::MeshMismatch.into())
            }
            Some(_) => Ok(()),
        }
    }

    // --- Derived geometry ---

    /// Boundary positions of a surface, in cyclic order.
    ///
    /// # Errors
    ///
    /// Returns a [`StructuralError`] if the surface or one of its boundary
    /// vertices is not live.
    pub fn surface_points(&self, id: SurfaceId) -> Result<Vec<Point3>> {
        let surface = self.surface(id)?;
        surface
            .vertices()
            .iter()
            .map(|v| self.position(*v))
            .collect()
    }

    /// Centroid of a surface's boundary.
    ///
    /// # Errors
    ///
    /// Returns a [`StructuralError`] if the surface is not fully live.
    pub fn surface_centroid(&self, id: SurfaceId) -> Result<Point3> {
        Ok(polygon::centroid(&self.surface_points(id)?))
    }

    /// Unit normal of a surface's boundary.
    ///
    /// # Errors
    ///
    /// Returns a [`StructuralError`] if the surface is not fully live, or
    /// [`GeometryError::DegenerateNormal`] if the boundary is degenerate.
    pub fn surface_normal(&self, id: SurfaceId) -> Result<Vector3> {
        polygon::newell_normal(&self.surface_points(id)?)
            .ok_or_else(|| GeometryError::DegenerateNormal.into())
    }

    /// Area of a surface, summed over its centroid fan triangulation.
    ///
    /// # Errors
    ///
    /// Returns a [`StructuralError`] if the surface is not fully live.
    pub fn surface_area(&self, id: SurfaceId) -> Result<f64> {
        Ok(polygon::fan_area(&self.surface_points(id)?))
    }

    /// Unnormalized normal of the fan triangle at boundary index `i`.
    ///
    /// # Errors
    ///
    /// Returns a [`StructuralError`] if the surface is not fully live.
    pub fn surface_triangle_normal(&self, id: SurfaceId, i: usize) -> Result<Vector3> {
        let points = self.surface_points(id)?;
        let centroid = polygon::centroid(&points);
        Ok(polygon::fan_triangle_normal(&points, &centroid, i))
    }

    /// Total area of a body's bounding surfaces.
    ///
    /// # Errors
    ///
    /// Returns a [`StructuralError`] if the body or one of its surfaces is
    /// not fully live.
    pub fn body_area(&self, id: BodyId) -> Result<f64> {
        let body = self.body(id)?;
        let mut area = 0.0;
        for s in body.surfaces() {
            area += self.surface_area(*s)?;
        }
        Ok(area)
    }

    /// Volume enclosed by a body's bounding surfaces.
    ///
    /// Each surface contributes with the orientation of the side the body
    /// owns: positive through `b1`, negated through `b2`.
    ///
    /// # Errors
    ///
    /// Returns a [`StructuralError`] if the body or one of its surfaces is
    /// not fully live.
    pub fn body_volume(&self, id: BodyId) -> Result<f64> {
        let body = self.body(id)?;
        let mut volume = 0.0;
        for s in body.surfaces() {
            let surface = self.surface(*s)?;
            let contribution = polygon::signed_fan_volume(&self.surface_points(*s)?);
            if surface.b2 == Some(id) {
                volume -= contribution;
            } else {
                volume += contribution;
            }
        }
        Ok(volume.abs())
    }

    // --- Connectivity queries ---

    /// The live vertex nearest to `position` within `tolerance`, if any.
    #[must_use]
    pub fn find_vertex(&self, position: Point3, tolerance: f64) -> Option<VertexId> {
        self.vertices
            .iter()
            .find(|(_, v)| {
                self.particles
                    .displacement_to(v.particle(), position)
                    .norm()
                    <= tolerance
            })
            .map(|(id, _)| VertexId(id))
    }

    /// Surfaces whose boundary contains both vertices.
    ///
    /// # Errors
    ///
    /// Returns a [`StructuralError`] if `v1` is not live.
    pub fn shared_surfaces(&self, v1: VertexId, v2: VertexId) -> Result<Vec<SurfaceId>> {
        let vertex = self.vertex(v1)?;
        Ok(vertex
            .surfaces()
            .iter()
            .copied()
            .filter(|s| {
                self.surfaces
                    .get(s.index())
                    .is_some_and(|surface| surface.vertex_index(v2).is_some())
            })
            .collect())
    }

    /// Whether two vertices are cyclically adjacent on some shared surface.
    #[must_use]
    pub fn vertices_connected(&self, v1: VertexId, v2: VertexId) -> bool {
        let Ok(vertex) = self.vertex(v1) else {
            return false;
        };
        for s in vertex.surfaces() {
            let Some(surface) = self.surfaces.get(s.index()) else {
                continue;
            };
            let n = surface.vertices().len();
            let (Some(i), Some(j)) = (surface.vertex_index(v1), surface.vertex_index(v2)) else {
                continue;
            };
            if (i + 1) % n == j || (j + 1) % n == i {
                return true;
            }
        }
        false
    }

    /// Whether two surfaces share a boundary vertex.
    #[must_use]
    pub fn surfaces_connected(&self, s1: SurfaceId, s2: SurfaceId) -> bool {
        let (Ok(a), Ok(b)) = (self.surface(s1), self.surface(s2)) else {
            return false;
        };
        a.vertices().iter().any(|v| b.vertex_index(*v).is_some())
    }

    /// Whether two bodies share a bounding surface.
    #[must_use]
    pub fn bodies_connected(&self, b1: BodyId, b2: BodyId) -> bool {
        let (Ok(a), Ok(b)) = (self.body(b1), self.body(b2)) else {
            return false;
        };
        a.surfaces().iter().any(|s| b.surfaces().contains(s))
    }

    /// Cyclic neighbors of a vertex across all its surfaces.
    ///
    /// Collects, per surface in child order, the successor then the
    /// predecessor of the vertex, deduplicated in first-seen order.
    ///
    /// # Errors
    ///
    /// Returns a [`StructuralError`] if the vertex is not live.
    pub fn neighbor_vertices(&self, id: VertexId) -> Result<Vec<VertexId>> {
        let vertex = self.vertex(id)?;
        let mut neighbors: Vec<VertexId> = Vec::new();
        for s in vertex.surfaces() {
            let Some(surface) = self.surfaces.get(s.index()) else {
                continue;
            };
            let Some(i) = surface.vertex_index(id) else {
                continue;
            };
            let n = surface.vertices().len();
            for neighbor in [surface.vertex_after(i, 1), surface.vertex_after(i, n - 1)] {
                if neighbor != id && !neighbors.contains(&neighbor) {
                    neighbors.push(neighbor);
                }
            }
        }
        Ok(neighbors)
    }

    // --- Validation ---

    /// Checks every live object for local and referential soundness.
    ///
    /// Callers run this after a failed multi-step edit before trusting the
    /// mesh again, and after raw removals that may have left dangling
    /// references.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn validate(&self) -> Result<()> {
        for (id, vertex) in self.vertices.iter() {
            vertex.validate()?;
            for s in vertex.surfaces() {
                let surface = self.surface(*s)?;
                if surface.vertex_index(VertexId(id)).is_none() {
                    return Err(StructuralError::InvalidObject {
                        kind: ObjectKind::Vertex,
                        reason: format!("vertex {id} lists surface {s} but is not on its boundary"),
                    }
                    .into());
                }
            }
        }
        for (id, surface) in self.surfaces.iter() {
            surface.validate()?;
            for v in surface.vertices() {
                let vertex = self.vertex(*v)?;
                if !vertex.surfaces().contains(&SurfaceId(id)) {
                    return Err(StructuralError::InvalidObject {
                        kind: ObjectKind::Surface,
                        reason: format!("surface {id} boundary vertex {v} does not list it back"),
                    }
                    .into());
                }
            }
            if surface.b1.is_some() && surface.b1 == surface.b2 {
                return Err(StructuralError::InvalidObject {
                    kind: ObjectKind::Surface,
                    reason: format!("surface {id} is owned twice by the same body"),
                }
                .into());
            }
            for b in surface.bodies() {
                let body = self.body(b)?;
                if !body.surfaces().contains(&SurfaceId(id)) {
                    return Err(StructuralError::InvalidObject {
                        kind: ObjectKind::Surface,
                        reason: format!("surface {id} is owned by body {b} but not among its surfaces"),
                    }
                    .into());
                }
            }
        }
        for (id, body) in self.bodies.iter() {
            body.validate()?;
            for s in body.surfaces() {
                let surface = self.surface(*s)?;
                if !surface.bounds(BodyId(id)) {
                    return Err(StructuralError::InvalidObject {
                        kind: ObjectKind::Body,
                        reason: format!("body {id} lists surface {s} but owns neither side"),
                    }
                    .into());
                }
            }
            for st in body.structures() {
                let structure = self.structure(*st)?;
                if !structure
                    .parent_refs()
                    .contains(&StructureParent::Body(BodyId(id)))
                {
                    return Err(StructuralError::InvalidObject {
                        kind: ObjectKind::Body,
                        reason: format!("body {id} lists structure {st} but is not among its parents"),
                    }
                    .into());
                }
            }
        }
        for (id, structure) in self.structures.iter() {
            structure.validate()?;
            for parent in structure.parent_refs() {
                match parent {
                    StructureParent::Body(b) => {
                        let body = self.body(*b)?;
                        if !body.structures().contains(&StructureId(id)) {
                            return Err(StructuralError::InvalidObject {
                                kind: ObjectKind::Structure,
                                reason: format!("structure {id} parent body {b} does not list it back"),
                            }
                            .into());
                        }
                    }
                    StructureParent::Structure(s) => {
                        let parent = self.structure(*s)?;
                        if !parent.structures().contains(&StructureId(id)) {
                            return Err(StructuralError::InvalidObject {
                                kind: ObjectKind::Structure,
                                reason: format!("structure {id} parent structure {s} does not list it back"),
                            }
                            .into());
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
