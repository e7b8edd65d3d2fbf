use glam::Vec2;

use crate::math::Rot;
use crate::particle::flags;

/// Three-particle elastic constraint built from a Voronoi triangle.
///
/// `pa`/`pb`/`pc` are the member positions relative to the triangle centroid
/// at creation; `ka`/`kb`/`kc` and `s` are the edge dot products and the
/// doubled signed area captured at the same moment.
#[derive(Clone, Copy, Debug)]
pub struct Triad {
    pub index_a: usize,
    pub index_b: usize,
    pub index_c: usize,
    /// OR of the three members' particle flags at creation.
    pub flags: u32,
    pub strength: f32,
    pub pa: Vec2,
    pub pb: Vec2,
    pub pc: Vec2,
    pub ka: f32,
    pub kb: f32,
    pub kc: f32,
    pub s: f32,
}

/// Drive each elastic triad back toward its reference triangle.
///
/// The best-fit rotation of the reference onto the current (centroid
/// relative) positions has sine/cosine proportional to the summed cross and
/// dot products; after normalizing it, each member is nudged toward its
/// rotated reference position.
pub(crate) fn solve_elastic(
    triads: &[Triad],
    position: &[Vec2],
    velocity: &mut [Vec2],
    elastic_strength: f32,
) {
    for triad in triads {
        if triad.flags & flags::ELASTIC != 0 {
            let a = triad.index_a;
            let b = triad.index_b;
            let c = triad.index_c;
            let oa = triad.pa;
            let ob = triad.pb;
            let oc = triad.pc;
            let midpoint = (position[a] + position[b] + position[c]) / 3.0;
            let qa = position[a] - midpoint;
            let qb = position[b] - midpoint;
            let qc = position[c] - midpoint;
            let mut r = Rot {
                s: oa.perp_dot(qa) + ob.perp_dot(qb) + oc.perp_dot(qc),
                c: oa.dot(qa) + ob.dot(qb) + oc.dot(qc),
            };
            let r2 = r.s * r.s + r.c * r.c;
            if r2 < 1e-12 {
                continue;
            }
            let inv_r = 1.0 / r2.sqrt();
            r.s *= inv_r;
            r.c *= inv_r;
            let strength = elastic_strength * triad.strength;
            velocity[a] += strength * (r.apply(oa) - qa);
            velocity[b] += strength * (r.apply(ob) - qb);
            velocity[c] += strength * (r.apply(oc) - qc);
        }
    }
}
