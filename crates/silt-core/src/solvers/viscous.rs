use glam::Vec2;

use crate::contact::{ParticleBodyContact, ParticleContact};
use crate::particle::flags;
use crate::world::World;

/// Unconditional velocity smoothing across viscous contacts. Unlike damping
/// this acts on the full relative velocity, not just the closing normal
/// component.
pub(crate) fn solve_viscous(
    contacts: &[ParticleContact],
    body_contacts: &[ParticleBodyContact],
    particle_flags: &[u32],
    position: &[Vec2],
    velocity: &mut [Vec2],
    viscous_strength: f32,
    particle_inv_mass: f32,
    world: &mut dyn World,
) {
    for contact in body_contacts {
        let a = contact.index;
        if particle_flags[a] & flags::VISCOUS != 0 {
            let w = contact.weight;
            let m = contact.mass;
            let p = position[a];
            let v = world.body_velocity_at(contact.body, p) - velocity[a];
            let f = viscous_strength * m * w * v;
            velocity[a] += particle_inv_mass * f;
            world.apply_linear_impulse(contact.body, -f, p);
        }
    }
    for contact in contacts {
        if contact.flags & flags::VISCOUS != 0 {
            let a = contact.index_a;
            let b = contact.index_b;
            let w = contact.weight;
            let v = velocity[b] - velocity[a];
            let f = viscous_strength * w * v;
            velocity[a] += f;
            velocity[b] -= f;
        }
    }
}
