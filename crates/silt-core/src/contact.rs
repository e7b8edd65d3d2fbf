//! Contact detection: particle-particle via the sorted proxy sweep,
//! particle-body via the host's broad phase.

use glam::Vec2;

use crate::config::LINEAR_SLOP;
use crate::grid;
use crate::math::RayCastInput;
use crate::particle::flags;
use crate::system::ParticleSystem;
use crate::world::{BodyId, Fixture, TimeStep, World};

/// Transient collision record between two particles, regenerated each step.
#[derive(Clone, Copy, Debug)]
pub struct ParticleContact {
    pub index_a: usize,
    pub index_b: usize,
    /// OR of both endpoints' particle flags.
    pub flags: u32,
    /// Kernel value `1 - distance / diameter`, in `(0, 1]`.
    pub weight: f32,
    /// Unit vector from particle A to particle B.
    pub normal: Vec2,
}

/// Transient collision record between a particle and a host body fixture.
#[derive(Clone, Copy, Debug)]
pub struct ParticleBodyContact {
    pub index: usize,
    pub body: BodyId,
    /// Kernel value `1 - distance / diameter`.
    pub weight: f32,
    /// Unit vector from the particle into the body surface.
    pub normal: Vec2,
    /// Reduced mass of the particle/body pairing at the contact point.
    pub mass: f32,
}

impl ParticleSystem {
    /// Append a contact for `(a, b)` if they overlap.
    fn add_contact(&mut self, a: usize, b: usize) {
        let pa = self.store.position[a];
        let pb = self.store.position[b];
        let d = pb - pa;
        let distance_squared = d.length_squared();
        // Identically-placed particles have no usable normal; skip them so
        // the inverse square root stays finite.
        if distance_squared < self.squared_diameter && distance_squared > 0.0 {
            let inv_distance = 1.0 / distance_squared.sqrt();
            self.contacts.push(ParticleContact {
                index_a: a,
                index_b: b,
                flags: self.store.flags[a] | self.store.flags[b],
                weight: 1.0 - distance_squared * inv_distance * self.inverse_diameter,
                normal: inv_distance * d,
            });
        }
    }

    /// Refresh proxy tags from positions, sort, and regenerate the contact
    /// buffer. With `except_zombie` set, contacts touching a zombie particle
    /// are partitioned out before the caller consumes the buffer.
    ///
    /// The sweep visits, for each proxy, the run of proxies to its right in
    /// the same row, then a second monotone cursor walks the row below from
    /// bottom-left to bottom-right. Every unordered pair within one cell of
    /// each other is visited exactly once.
    pub(crate) fn update_contacts(&mut self, except_zombie: bool) {
        let inverse_diameter = self.inverse_diameter;
        for proxy in &mut self.proxies {
            let p = self.store.position[proxy.index];
            proxy.tag = grid::compute_tag(inverse_diameter * p.x, inverse_diameter * p.y);
        }
        self.proxies.sort_unstable_by_key(|proxy| proxy.tag);

        self.contacts.clear();
        let length = self.proxies.len();
        let mut c_index = 0;
        for i in 0..length {
            let a = self.proxies[i];
            let right_tag = grid::compute_relative_tag(a.tag, 1, 0);
            for j in i + 1..length {
                let b = self.proxies[j];
                if right_tag < b.tag {
                    break;
                }
                self.add_contact(a.index, b.index);
            }
            let bottom_left_tag = grid::compute_relative_tag(a.tag, -1, 1);
            while c_index < length && self.proxies[c_index].tag < bottom_left_tag {
                c_index += 1;
            }
            let bottom_right_tag = grid::compute_relative_tag(a.tag, 1, 1);
            for b_index in c_index..length {
                let b = self.proxies[b_index];
                if bottom_right_tag < b.tag {
                    break;
                }
                self.add_contact(a.index, b.index);
            }
        }

        if except_zombie {
            self.contacts
                .retain(|contact| contact.flags & flags::ZOMBIE == 0);
        }
    }

    /// Rebuild particle-body contacts by querying the host broad phase with
    /// an AABB around all particles, inflated by one diameter.
    pub(crate) fn update_body_contacts(&mut self, world: &mut dyn World) {
        let mut aabb = crate::math::Aabb::EMPTY;
        for i in 0..self.store.count {
            aabb.encapsulate(self.store.position[i]);
        }
        aabb.inflate(self.particle_diameter);
        self.body_contacts.clear();

        world.query_fixtures(&aabb, &mut |fixture| {
            self.gather_body_contacts(fixture);
            true
        });
    }

    /// Scan one fixture's children against the proxy ranges covering their
    /// inflated AABBs and record a body contact for every particle within a
    /// diameter of the surface.
    fn gather_body_contacts(&mut self, fixture: &mut dyn Fixture) {
        if fixture.is_sensor() {
            return;
        }
        let body_center = fixture.body_world_center();
        let body_mass = fixture.body_mass();
        let body_inertia =
            fixture.body_inertia() - body_mass * fixture.body_local_center().length_squared();
        let inv_body_mass = if body_mass > 0.0 { 1.0 / body_mass } else { 0.0 };
        let inv_body_inertia = if body_inertia > 0.0 {
            1.0 / body_inertia
        } else {
            0.0
        };
        for child in 0..fixture.child_count() {
            let mut aabb = fixture.child_aabb(child);
            aabb.inflate(self.particle_diameter);
            let (first, last) = self.proxy_range(&aabb);
            for k in first..last {
                let a = self.proxies[k].index;
                let ap = self.store.position[a];
                if !aabb.contains(ap) {
                    continue;
                }
                let (d, n) = fixture.compute_distance(ap, child);
                if d < self.particle_diameter {
                    let inv_particle_mass = if self.store.flags[a] & flags::WALL != 0 {
                        0.0
                    } else {
                        self.particle_inv_mass()
                    };
                    let rp = ap - body_center;
                    let rpn = rp.perp_dot(n);
                    self.body_contacts.push(ParticleBodyContact {
                        index: a,
                        body: fixture.body(),
                        weight: 1.0 - d * self.inverse_diameter,
                        normal: -n,
                        mass: 1.0
                            / (inv_particle_mass + inv_body_mass + inv_body_inertia * rpn * rpn),
                    });
                }
            }
        }
    }

    /// Stop particles at fixture surfaces: ray-cast each particle's swept
    /// segment, replace its velocity with the one that lands it just outside
    /// the surface, and push the equal-and-opposite impulse into the body.
    pub(crate) fn solve_collision(&mut self, world: &mut dyn World, step: &TimeStep) {
        let mut aabb = crate::math::Aabb::EMPTY;
        for i in 0..self.store.count {
            let p1 = self.store.position[i];
            let p2 = p1 + step.dt * self.store.velocity[i];
            aabb.encapsulate(p1);
            aabb.encapsulate(p2);
        }
        let particle_mass = self.particle_mass();
        let dt = step.dt;
        let inv_dt = step.inv_dt;

        world.query_fixtures(&aabb, &mut |fixture| {
            if fixture.is_sensor() {
                return true;
            }
            for child in 0..fixture.child_count() {
                let mut child_aabb = fixture.child_aabb(child);
                child_aabb.inflate(self.particle_diameter);
                let (first, last) = self.proxy_range(&child_aabb);
                for k in first..last {
                    let a = self.proxies[k].index;
                    let ap = self.store.position[a];
                    if !child_aabb.contains(ap) {
                        continue;
                    }
                    let av = self.store.velocity[a];
                    let input = RayCastInput {
                        p1: ap,
                        p2: ap + dt * av,
                        max_fraction: 1.0,
                    };
                    if let Some(hit) = fixture.ray_cast(&input, child) {
                        let p = (1.0 - hit.fraction) * input.p1
                            + hit.fraction * input.p2
                            + LINEAR_SLOP * hit.normal;
                        let v = inv_dt * (p - ap);
                        self.store.velocity[a] = v;
                        let f = particle_mass * (av - v);
                        let f = f.dot(hit.normal) * hit.normal;
                        fixture.apply_linear_impulse(f, p);
                    }
                }
            }
            true
        });
    }

    /// Proxy range covering an AABB's tag span.
    pub(crate) fn proxy_range(&self, aabb: &crate::math::Aabb) -> (usize, usize) {
        let first = grid::lower_bound(
            &self.proxies,
            grid::compute_tag(
                self.inverse_diameter * aabb.lower.x,
                self.inverse_diameter * aabb.lower.y,
            ),
        );
        let last = grid::upper_bound(
            &self.proxies,
            grid::compute_tag(
                self.inverse_diameter * aabb.upper.x,
                self.inverse_diameter * aabb.upper.y,
            ),
        );
        (first, last)
    }
}
