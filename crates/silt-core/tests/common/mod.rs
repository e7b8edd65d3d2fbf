//! Shared test host: a stub rigid-body world over analytic fixtures.
#![allow(dead_code)]

use glam::Vec2;
use silt_core::math::{Aabb, RayCastHit, RayCastInput, Transform};
use silt_core::world::{BodyId, Fixture, Shape, World};
use silt_core::GroupId;

/// Axis-aligned rectangle shape for seeding groups.
pub struct BoxShape {
    pub lower: Vec2,
    pub upper: Vec2,
}

impl BoxShape {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            lower: Vec2::ZERO,
            upper: Vec2::new(width, height),
        }
    }
}

impl Shape for BoxShape {
    fn compute_aabb(&self, xf: &Transform, _child_index: usize) -> Aabb {
        let corners = [
            xf.apply(self.lower),
            xf.apply(Vec2::new(self.upper.x, self.lower.y)),
            xf.apply(self.upper),
            xf.apply(Vec2::new(self.lower.x, self.upper.y)),
        ];
        let mut aabb = Aabb::EMPTY;
        for corner in corners {
            aabb.encapsulate(corner);
        }
        aabb
    }

    fn test_point(&self, xf: &Transform, point: Vec2) -> bool {
        // Inverse transform: rotate back by the transpose.
        let d = point - xf.p;
        let local = Vec2::new(
            xf.q.c * d.x + xf.q.s * d.y,
            -xf.q.s * d.x + xf.q.c * d.y,
        );
        self.lower.x <= local.x
            && local.x <= self.upper.x
            && self.lower.y <= local.y
            && local.y <= self.upper.y
    }
}

/// Circle shape centered at the origin.
pub struct CircleShape {
    pub radius: f32,
}

impl Shape for CircleShape {
    fn compute_aabb(&self, xf: &Transform, _child_index: usize) -> Aabb {
        let center = xf.apply(Vec2::ZERO);
        Aabb::new(
            center - Vec2::splat(self.radius),
            center + Vec2::splat(self.radius),
        )
    }

    fn test_point(&self, xf: &Transform, point: Vec2) -> bool {
        (point - xf.apply(Vec2::ZERO)).length_squared() <= self.radius * self.radius
    }
}

/// Solid half-plane `y <= level` attached to one body. The surface normal
/// points up.
pub struct HalfPlaneFixture {
    pub body: BodyId,
    pub level: f32,
    pub mass: f32,
    pub inertia: f32,
    pub center: Vec2,
    pub sensor: bool,
    /// Impulses applied through the fixture during `solve_collision`.
    pub impulses: Vec<(Vec2, Vec2)>,
}

impl HalfPlaneFixture {
    pub fn ground(level: f32) -> Self {
        Self {
            body: BodyId(0),
            level,
            mass: 0.0,
            inertia: 0.0,
            center: Vec2::new(0.0, level),
            sensor: false,
            impulses: Vec::new(),
        }
    }

    pub fn dynamic(level: f32, mass: f32, inertia: f32) -> Self {
        Self {
            body: BodyId(1),
            level,
            mass,
            inertia,
            center: Vec2::new(0.0, level),
            sensor: false,
            impulses: Vec::new(),
        }
    }
}

impl Fixture for HalfPlaneFixture {
    fn is_sensor(&self) -> bool {
        self.sensor
    }

    fn body(&self) -> BodyId {
        self.body
    }

    fn body_mass(&self) -> f32 {
        self.mass
    }

    fn body_inertia(&self) -> f32 {
        self.inertia
    }

    fn body_local_center(&self) -> Vec2 {
        Vec2::ZERO
    }

    fn body_world_center(&self) -> Vec2 {
        self.center
    }

    fn child_aabb(&self, _child_index: usize) -> Aabb {
        Aabb::new(Vec2::new(-100.0, self.level - 100.0), Vec2::new(100.0, self.level))
    }

    fn compute_distance(&self, point: Vec2, _child_index: usize) -> (f32, Vec2) {
        (point.y - self.level, Vec2::Y)
    }

    fn ray_cast(&self, input: &RayCastInput, _child_index: usize) -> Option<RayCastHit> {
        let dy = input.p2.y - input.p1.y;
        if input.p1.y >= self.level && input.p2.y < self.level && dy < 0.0 {
            let fraction = (input.p1.y - self.level) / -dy;
            if fraction <= input.max_fraction {
                return Some(RayCastHit {
                    fraction,
                    normal: Vec2::Y,
                });
            }
        }
        None
    }

    fn apply_linear_impulse(&mut self, impulse: Vec2, point: Vec2) {
        self.impulses.push((impulse, point));
    }
}

/// Minimal host world: fixed gravity, a list of half-plane fixtures, and a
/// log of everything the particle core pushed back out.
#[derive(Default)]
pub struct TestWorld {
    pub gravity: Vec2,
    pub fixtures: Vec<HalfPlaneFixture>,
    pub impulses: Vec<(BodyId, Vec2, Vec2)>,
    pub destroyed_particles: Vec<usize>,
    pub destroyed_groups: Vec<GroupId>,
}

impl TestWorld {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_gravity(gravity: Vec2) -> Self {
        Self {
            gravity,
            ..Self::default()
        }
    }

    pub fn with_ground(level: f32) -> Self {
        Self {
            fixtures: vec![HalfPlaneFixture::ground(level)],
            ..Self::default()
        }
    }
}

impl World for TestWorld {
    fn gravity(&self) -> Vec2 {
        self.gravity
    }

    fn query_fixtures(&mut self, aabb: &Aabb, callback: &mut dyn FnMut(&mut dyn Fixture) -> bool) {
        for fixture in &mut self.fixtures {
            let fa = fixture.child_aabb(0);
            let overlaps = fa.lower.x <= aabb.upper.x
                && aabb.lower.x <= fa.upper.x
                && fa.lower.y <= aabb.upper.y
                && aabb.lower.y <= fa.upper.y;
            if overlaps && !callback(fixture) {
                return;
            }
        }
    }

    fn body_velocity_at(&self, _body: BodyId, _point: Vec2) -> Vec2 {
        Vec2::ZERO
    }

    fn apply_linear_impulse(&mut self, body: BodyId, impulse: Vec2, point: Vec2) {
        self.impulses.push((body, impulse, point));
    }

    fn particle_destroyed(&mut self, index: usize) {
        self.destroyed_particles.push(index);
    }

    fn group_destroyed(&mut self, group: GroupId) {
        self.destroyed_groups.push(group);
    }
}

/// One 60 Hz step.
pub fn step() -> silt_core::TimeStep {
    silt_core::TimeStep::new(1.0 / 60.0)
}
