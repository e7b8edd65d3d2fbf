use glam::Vec2;

use crate::config::PARTICLE_STRIDE;
use crate::contact::{ParticleBodyContact, ParticleContact};
use crate::particle::flags;
use crate::world::World;

/// Short-range repulsion for powder particles. Only contacts compressed
/// tighter than the stride spacing push back, which lets loose grains pile
/// instead of diffusing like a fluid.
pub(crate) fn solve_powder(
    contacts: &[ParticleContact],
    body_contacts: &[ParticleBodyContact],
    particle_flags: &[u32],
    position: &[Vec2],
    velocity: &mut [Vec2],
    powder_strength_velocity: f32,
    particle_inv_mass: f32,
    world: &mut dyn World,
) {
    let min_weight = 1.0 - PARTICLE_STRIDE;
    for contact in body_contacts {
        let a = contact.index;
        if particle_flags[a] & flags::POWDER != 0 {
            let w = contact.weight;
            if w > min_weight {
                let m = contact.mass;
                let p = position[a];
                let n = contact.normal;
                let f = powder_strength_velocity * m * (w - min_weight) * n;
                velocity[a] -= particle_inv_mass * f;
                world.apply_linear_impulse(contact.body, f, p);
            }
        }
    }
    for contact in contacts {
        if contact.flags & flags::POWDER != 0 {
            let w = contact.weight;
            if w > min_weight {
                let a = contact.index_a;
                let b = contact.index_b;
                let n = contact.normal;
                let f = powder_strength_velocity * (w - min_weight) * n;
                velocity[a] -= f;
                velocity[b] += f;
            }
        }
    }
}
