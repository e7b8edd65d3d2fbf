use crate::contact::ParticleContact;
use crate::particle::{flags, ParticleColor};

/// Diffuse color across contacts where both endpoints opt in. The exchange
/// is fixed-point: a fraction of each channel difference, quantized to
/// 1/256, moves from the richer to the poorer side so the channel total is
/// conserved.
pub(crate) fn solve_color_mixing(
    contacts: &[ParticleContact],
    particle_flags: &[u32],
    color: &mut [ParticleColor],
    color_mixing_strength: f32,
) {
    let mixing = (256.0 * color_mixing_strength) as i32;
    for contact in contacts {
        let a = contact.index_a;
        let b = contact.index_b;
        if particle_flags[a] & particle_flags[b] & flags::COLOR_MIXING != 0 {
            let ca = color[a];
            let cb = color[b];
            let dr = (mixing * (cb.r as i32 - ca.r as i32)) >> 8;
            let dg = (mixing * (cb.g as i32 - ca.g as i32)) >> 8;
            let db = (mixing * (cb.b as i32 - ca.b as i32)) >> 8;
            let da = (mixing * (cb.a as i32 - ca.a as i32)) >> 8;
            color[a] = ParticleColor::new(
                (ca.r as i32 + dr) as u8,
                (ca.g as i32 + dg) as u8,
                (ca.b as i32 + db) as u8,
                (ca.a as i32 + da) as u8,
            );
            color[b] = ParticleColor::new(
                (cb.r as i32 - dr) as u8,
                (cb.g as i32 - dg) as u8,
                (cb.b as i32 - db) as u8,
                (cb.a as i32 - da) as u8,
            );
        }
    }
}
