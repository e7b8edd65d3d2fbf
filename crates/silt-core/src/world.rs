//! The seam between the particle core and the host rigid-body engine.
//!
//! The core never owns bodies or fixtures. It reads their geometry and mass
//! properties through these traits, and pushes impulses back through them.
//! All callbacks execute synchronously on the caller's stack; the core is
//! single-threaded inside [`crate::ParticleSystem::solve`].

use glam::Vec2;

use crate::group::GroupId;
use crate::math::{Aabb, RayCastHit, RayCastInput, Transform};

/// One simulation tick.
#[derive(Clone, Copy, Debug)]
pub struct TimeStep {
    pub dt: f32,
    pub inv_dt: f32,
}

impl TimeStep {
    pub fn new(dt: f32) -> Self {
        Self {
            dt,
            inv_dt: if dt > 0.0 { 1.0 / dt } else { 0.0 },
        }
    }
}

/// Opaque handle to a host rigid body. The core stores these in body
/// contacts and hands them back to the [`World`] when applying impulses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BodyId(pub u64);

/// Geometric region used to seed particle groups.
pub trait Shape {
    fn child_count(&self) -> usize {
        1
    }
    /// Bounding box of one child in the given frame.
    fn compute_aabb(&self, xf: &Transform, child_index: usize) -> Aabb;
    /// Point containment in the given frame.
    fn test_point(&self, xf: &Transform, point: Vec2) -> bool;
}

/// A host collision fixture together with the body it is attached to.
///
/// `body_inertia` is the rotational inertia about the body origin; the core
/// subtracts the parallel-axis term itself, mirroring how the host engine
/// reports it.
pub trait Fixture {
    fn is_sensor(&self) -> bool {
        false
    }
    fn body(&self) -> BodyId;
    fn body_mass(&self) -> f32;
    fn body_inertia(&self) -> f32;
    fn body_local_center(&self) -> Vec2;
    fn body_world_center(&self) -> Vec2;
    fn child_count(&self) -> usize {
        1
    }
    /// Bounding box of one child shape in world space.
    fn child_aabb(&self, child_index: usize) -> Aabb;
    /// Signed distance from `point` to the child's surface and the outward
    /// surface normal.
    fn compute_distance(&self, point: Vec2, child_index: usize) -> (f32, Vec2);
    /// Cast the segment in `input` against the child shape.
    fn ray_cast(&self, input: &RayCastInput, child_index: usize) -> Option<RayCastHit>;
    /// Apply a linear impulse to the owning body at a world point, waking it.
    fn apply_linear_impulse(&mut self, impulse: Vec2, point: Vec2);
}

/// The host rigid-body world.
pub trait World {
    fn gravity(&self) -> Vec2;

    /// Enumerate fixtures whose broad-phase AABB overlaps `aabb`. Returning
    /// `false` from the callback stops the enumeration.
    fn query_fixtures(&mut self, aabb: &Aabb, callback: &mut dyn FnMut(&mut dyn Fixture) -> bool);

    /// Linear velocity of a body at a world point.
    fn body_velocity_at(&self, body: BodyId, point: Vec2) -> Vec2;

    /// Apply a linear impulse to a body at a world point, waking it.
    fn apply_linear_impulse(&mut self, body: BodyId, impulse: Vec2, point: Vec2);

    /// Destruction listener: a particle flagged for notification was removed.
    fn particle_destroyed(&mut self, _index: usize) {}

    /// Destruction listener: an emptied group was removed during compaction.
    fn group_destroyed(&mut self, _group: GroupId) {}
}
