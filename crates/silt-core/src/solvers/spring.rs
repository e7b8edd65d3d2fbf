use glam::Vec2;

use crate::particle::flags;

/// Two-particle spring constraint. The rest length is the distance at
/// creation time; pairs persist across steps until compaction drops a dead
/// endpoint.
#[derive(Clone, Copy, Debug)]
pub struct Pair {
    pub index_a: usize,
    pub index_b: usize,
    /// OR of both endpoints' particle flags at creation.
    pub flags: u32,
    pub strength: f32,
    /// Rest length.
    pub distance: f32,
}

/// Restore each spring pair toward its rest length with a velocity impulse
/// proportional to the length error.
pub(crate) fn solve_spring(
    pairs: &[Pair],
    position: &[Vec2],
    velocity: &mut [Vec2],
    spring_strength: f32,
) {
    for pair in pairs {
        if pair.flags & flags::SPRING != 0 {
            let a = pair.index_a;
            let b = pair.index_b;
            let d = position[b] - position[a];
            let r0 = pair.distance;
            let r1 = d.length();
            if r1 < 1e-8 {
                continue;
            }
            let strength = spring_strength * pair.strength;
            let f = strength * (r0 - r1) / r1 * d;
            velocity[a] -= f;
            velocity[b] += f;
        }
    }
}
