//! Seam to the particle/physics backend.
//!
//! Every vertex owns one point-mass particle in an injected backend; the
//! backend supplies positions and masses and fabricates new particles when a
//! vertex-creating edit runs. The integration timestep is exposed because the
//! overdamped constraint kernels scale their stiffness by mass over timestep.

use crate::math::{Point3, Vector3};

/// Handle to a particle owned by a [`ParticleBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParticleId(pub u32);

/// The particle system a mesh reads positions from and writes them to.
///
/// Implementations are injected into [`crate::mesh::Mesh`] at construction.
/// Callers pass only handles obtained from `create` and not yet destroyed;
/// behavior for stale handles is implementation-defined.
pub trait ParticleBackend {
    /// Creates a particle at `position` with the backend's default mass.
    fn create(&mut self, position: Point3) -> ParticleId;

    /// Destroys a particle, making its handle stale.
    fn destroy(&mut self, id: ParticleId);

    /// Current position of the particle.
    fn position(&self, id: ParticleId) -> Point3;

    /// Moves the particle to `position`.
    fn set_position(&mut self, id: ParticleId, position: Point3);

    /// Mass of the particle.
    fn mass(&self, id: ParticleId) -> f64;

    /// Sets the mass of the particle.
    fn set_mass(&mut self, id: ParticleId, mass: f64);

    /// Displacement from the particle to `target`.
    fn displacement_to(&self, id: ParticleId, target: Point3) -> Vector3 {
        target - self.position(id)
    }

    /// The integration timestep of the stepping loop driving the particles.
    fn timestep(&self) -> f64;
}

#[derive(Debug, Clone, Copy)]
struct PointMass {
    position: Point3,
    mass: f64,
}

/// A self-contained point-mass store.
///
/// The standalone backend used when no external physics engine is wired in,
/// and by the test suite.
#[derive(Debug)]
pub struct PointMassBackend {
    slots: Vec<Option<PointMass>>,
    free: Vec<u32>,
    default_mass: f64,
    timestep: f64,
}

impl Default for PointMassBackend {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            default_mass: 1.0,
            timestep: 0.01,
        }
    }
}

impl PointMassBackend {
    /// Creates a backend with unit default mass and a 0.01 timestep.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the integration timestep.
    #[must_use]
    pub fn with_timestep(mut self, timestep: f64) -> Self {
        self.timestep = timestep;
        self
    }

    /// Sets the mass assigned to newly created particles.
    #[must_use]
    pub fn with_default_mass(mut self, mass: f64) -> Self {
        self.default_mass = mass;
        self
    }

    /// Number of live particles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Whether the backend holds no live particles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, id: ParticleId) -> Option<&PointMass> {
        self.slots.get(id.0 as usize).and_then(Option::as_ref)
    }

    fn get_mut(&mut self, id: ParticleId) -> Option<&mut PointMass> {
        self.slots.get_mut(id.0 as usize).and_then(Option::as_mut)
    }
}

impl ParticleBackend for PointMassBackend {
    #[allow(clippy::cast_possible_truncation)]
    fn create(&mut self, position: Point3) -> ParticleId {
        let particle = PointMass {
            position,
            mass: self.default_mass,
        };
        if let Some(idx) = self.free.pop() {
            self.slots[idx as usize] = Some(particle);
            return ParticleId(idx);
        }
        self.slots.push(Some(particle));
        ParticleId(self.slots.len() as u32 - 1)
    }

    fn destroy(&mut self, id: ParticleId) {
        if let Some(slot) = self.slots.get_mut(id.0 as usize) {
            if slot.take().is_some() {
                self.free.push(id.0);
            }
        }
    }

    fn position(&self, id: ParticleId) -> Point3 {
        self.get(id).map_or_else(Point3::origin, |p| p.position)
    }

    fn set_position(&mut self, id: ParticleId, position: Point3) {
        if let Some(p) = self.get_mut(id) {
            p.position = position;
        }
    }

    fn mass(&self, id: ParticleId) -> f64 {
        self.get(id).map_or(0.0, |p| p.mass)
    }

    fn set_mass(&mut self, id: ParticleId, mass: f64) {
        if let Some(p) = self.get_mut(id) {
            p.mass = mass;
        }
    }

    fn timestep(&self) -> f64 {
        self.timestep
    }
}
