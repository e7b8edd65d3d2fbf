use glam::Vec2;

use crate::config::{MAX_PARTICLE_WEIGHT, MIN_PARTICLE_WEIGHT};
use crate::contact::{ParticleBodyContact, ParticleContact};
use crate::system::NO_PRESSURE_FLAGS;
use crate::world::World;

/// Scalar factors feeding the pressure solve, derived once per step.
pub(crate) struct PressureParams {
    /// `pressure_strength * critical_pressure`.
    pub pressure_per_weight: f32,
    /// `dt / (density * diameter)`: converts pressure to a velocity change.
    pub velocity_per_pressure: f32,
    pub particle_inv_mass: f32,
}

/// Density-derived repulsion.
///
/// Pass one accumulates each particle's contact-weight sum (a dimensionless
/// density) over particle and body contacts, zeroing it for powder-flagged
/// particles. Pass two converts the sum to a pressure, clamped between the
/// minimum weight that feels any pressure and the maximum that saturates it.
/// Pass three applies the pairwise forces.
pub(crate) fn solve_pressure(
    contacts: &[ParticleContact],
    body_contacts: &[ParticleBodyContact],
    particle_flags: &[u32],
    position: &[Vec2],
    velocity: &mut [Vec2],
    all_particle_flags: u32,
    params: &PressureParams,
    world: &mut dyn World,
) {
    let count = particle_flags.len();
    let mut accumulation = vec![0.0f32; count];
    for contact in body_contacts {
        accumulation[contact.index] += contact.weight;
    }
    for contact in contacts {
        accumulation[contact.index_a] += contact.weight;
        accumulation[contact.index_b] += contact.weight;
    }
    if all_particle_flags & NO_PRESSURE_FLAGS != 0 {
        for i in 0..count {
            if particle_flags[i] & NO_PRESSURE_FLAGS != 0 {
                accumulation[i] = 0.0;
            }
        }
    }
    for w in accumulation.iter_mut() {
        *w = params.pressure_per_weight
            * (w.min(MAX_PARTICLE_WEIGHT) - MIN_PARTICLE_WEIGHT).max(0.0);
    }

    for contact in body_contacts {
        let a = contact.index;
        let w = contact.weight;
        let m = contact.mass;
        let n = contact.normal;
        let p = position[a];
        let h = accumulation[a] + params.pressure_per_weight * w;
        let f = params.velocity_per_pressure * w * m * h * n;
        velocity[a] -= params.particle_inv_mass * f;
        world.apply_linear_impulse(contact.body, f, p);
    }
    for contact in contacts {
        let a = contact.index_a;
        let b = contact.index_b;
        let w = contact.weight;
        let n = contact.normal;
        let h = accumulation[a] + accumulation[b];
        let f = params.velocity_per_pressure * w * h * n;
        velocity[a] -= f;
        velocity[b] += f;
    }
}
