use glam::Vec2;

use crate::contact::ParticleContact;
use crate::group::GroupId;

/// Eject intruders from solid groups. A contact that crosses a group
/// boundary is pushed apart with a force scaled by the combined surface
/// depth of its endpoints, so deep penetration pushes harder than grazing.
pub(crate) fn solve_solid(
    contacts: &[ParticleContact],
    group: &[Option<GroupId>],
    depth: &[f32],
    velocity: &mut [Vec2],
    ejection_strength: f32,
) {
    for contact in contacts {
        let a = contact.index_a;
        let b = contact.index_b;
        if group[a] != group[b] {
            let w = contact.weight;
            let n = contact.normal;
            let h = depth[a] + depth[b];
            let f = ejection_strength * h * w * n;
            velocity[a] -= f;
            velocity[b] += f;
        }
    }
}
