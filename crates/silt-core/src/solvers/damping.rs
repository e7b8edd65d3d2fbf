use glam::Vec2;

use crate::contact::{ParticleBodyContact, ParticleContact};
use crate::world::World;

/// Reduce the normal component of approaching contacts. Only contacts that
/// are closing (`v . n < 0`) are damped, so resting contacts keep their
/// separation velocity.
pub(crate) fn solve_damping(
    contacts: &[ParticleContact],
    body_contacts: &[ParticleBodyContact],
    position: &[Vec2],
    velocity: &mut [Vec2],
    damping_strength: f32,
    particle_inv_mass: f32,
    world: &mut dyn World,
) {
    for contact in body_contacts {
        let a = contact.index;
        let w = contact.weight;
        let m = contact.mass;
        let n = contact.normal;
        let p = position[a];
        let v = world.body_velocity_at(contact.body, p) - velocity[a];
        let vn = v.dot(n);
        if vn < 0.0 {
            let f = damping_strength * w * m * vn * n;
            velocity[a] += particle_inv_mass * f;
            world.apply_linear_impulse(contact.body, -f, p);
        }
    }
    for contact in contacts {
        let a = contact.index_a;
        let b = contact.index_b;
        let w = contact.weight;
        let n = contact.normal;
        let v = velocity[b] - velocity[a];
        let vn = v.dot(n);
        if vn < 0.0 {
            let f = damping_strength * w * vn * n;
            velocity[a] += f;
            velocity[b] -= f;
        }
    }
}
