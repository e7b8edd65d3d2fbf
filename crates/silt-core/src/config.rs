use serde::{Deserialize, Serialize};

/// Smallest internal allocation for any per-particle buffer.
pub const MIN_PARTICLE_BUFFER_CAPACITY: usize = 256;

/// Spacing between particles when filling a shape, in diameters.
pub const PARTICLE_STRIDE: f32 = 0.75;

/// Contact-weight sum below which a particle feels no pressure.
pub const MIN_PARTICLE_WEIGHT: f32 = 1.0;

/// Contact-weight sum above which pressure stops growing.
pub const MAX_PARTICLE_WEIGHT: f32 = 5.0;

/// Upper bound on triad edge length, in squared diameters.
pub const MAX_TRIAD_DISTANCE_SQUARED: f32 = 4.0;

/// Surface offset applied when reflecting a particle off a fixture.
pub const LINEAR_SLOP: f32 = 0.005;

/// Sentinel for a removed particle in compaction index maps.
pub const INVALID_PARTICLE_INDEX: i32 = -1;

/// Tunable parameters of a particle system, fixed at construction except
/// where [`crate::ParticleSystem`] exposes a dedicated setter.
///
/// The strength fields scale the individual force solvers; their defaults are
/// dimensionless fractions of the critical velocity/pressure and behave well
/// for time steps near 1/60 s.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SimConfig {
    /// Particle radius. The interaction diameter is twice this.
    pub radius: f32,
    /// Mass density of the particle material.
    pub density: f32,
    /// Multiplier on the host world's gravity.
    pub gravity_scale: f32,
    /// Hard cap on the particle population. `None` means unbounded.
    pub max_count: Option<usize>,
    pub pressure_strength: f32,
    pub damping_strength: f32,
    pub elastic_strength: f32,
    pub spring_strength: f32,
    pub viscous_strength: f32,
    pub surface_tension_strength_a: f32,
    pub surface_tension_strength_b: f32,
    pub powder_strength: f32,
    pub ejection_strength: f32,
    pub color_mixing_strength: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            radius: 0.5,
            density: 1.0,
            gravity_scale: 1.0,
            max_count: None,
            pressure_strength: 0.05,
            damping_strength: 1.0,
            elastic_strength: 0.25,
            spring_strength: 0.25,
            viscous_strength: 0.25,
            surface_tension_strength_a: 0.1,
            surface_tension_strength_b: 0.2,
            powder_strength: 0.5,
            ejection_strength: 0.5,
            color_mixing_strength: 0.5,
        }
    }
}
