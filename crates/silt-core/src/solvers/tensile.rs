use glam::Vec2;

use crate::contact::ParticleContact;
use crate::particle::flags;

/// Surface tension for tensile-flagged particles.
///
/// Two passes: the first accumulates each particle's contact-weight sum and
/// a signed normal accumulator approximating the local surface gradient; the
/// second applies a cohesion force from the weight deficit plus a curvature
/// force from the gradient difference across each contact.
pub(crate) fn solve_tensile(
    contacts: &[ParticleContact],
    velocity: &mut [Vec2],
    count: usize,
    strength_a: f32,
    strength_b: f32,
) {
    let mut weight_sum = vec![0.0f32; count];
    let mut normal_sum = vec![Vec2::ZERO; count];
    for contact in contacts {
        if contact.flags & flags::TENSILE != 0 {
            let a = contact.index_a;
            let b = contact.index_b;
            let w = contact.weight;
            let n = contact.normal;
            weight_sum[a] += w;
            weight_sum[b] += w;
            normal_sum[a] -= (1.0 - w) * w * n;
            normal_sum[b] += (1.0 - w) * w * n;
        }
    }
    for contact in contacts {
        if contact.flags & flags::TENSILE != 0 {
            let a = contact.index_a;
            let b = contact.index_b;
            let w = contact.weight;
            let n = contact.normal;
            let h = weight_sum[a] + weight_sum[b];
            let s = normal_sum[b] - normal_sum[a];
            let fn_ = (strength_a * (h - 2.0) + strength_b * s.dot(n)) * w;
            let f = fn_ * n;
            velocity[a] -= f;
            velocity[b] += f;
        }
    }
}
