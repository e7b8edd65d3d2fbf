use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::config::MIN_PARTICLE_BUFFER_CAPACITY;
use crate::group::GroupId;

/// Per-particle behavior bits.
///
/// Any subset may be combined. Solvers test the OR of both endpoints'
/// flags on each contact, so the constants must stay single bits.
pub mod flags {
    /// Plain fluid particle; no bits set.
    pub const WATER: u32 = 0;
    /// Marked for removal at the next compaction pass.
    pub const ZOMBIE: u32 = 1 << 1;
    /// Infinite-mass particle whose velocity is zeroed every step.
    pub const WALL: u32 = 1 << 2;
    /// Participates in pair (spring) constraints.
    pub const SPRING: u32 = 1 << 3;
    /// Participates in triad (elastic) constraints.
    pub const ELASTIC: u32 = 1 << 4;
    /// Velocity-smoothing viscosity on contacts.
    pub const VISCOUS: u32 = 1 << 5;
    /// Repulsive-only powder response, no pressure.
    pub const POWDER: u32 = 1 << 6;
    /// Surface-tension forces on contacts.
    pub const TENSILE: u32 = 1 << 7;
    /// Exchanges color with touching color-mixing particles.
    pub const COLOR_MIXING: u32 = 1 << 8;
    /// Report this particle to the destruction listener when removed.
    pub const DESTRUCTION_LISTENER: u32 = 1 << 9;
}

/// RGBA particle color with 8-bit channels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticleColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl ParticleColor {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// True when every channel is zero; such colors do not force the color
    /// column into existence.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.r == 0 && self.g == 0 && self.b == 0 && self.a == 0
    }
}

/// Blueprint for one particle.
#[derive(Clone, Copy, Debug, Default)]
pub struct ParticleDef {
    pub flags: u32,
    pub position: Vec2,
    pub velocity: Vec2,
    pub color: ParticleColor,
    pub user_data: Option<u64>,
}

/// Fixed capacities imposed by user-supplied backing buffers.
///
/// `None` means the column is system-owned and grows by doubling; `Some(n)`
/// pins the column at exactly `n` slots and caps the whole system's growth.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct UserCapacities {
    pub flags: Option<usize>,
    pub position: Option<usize>,
    pub velocity: Option<usize>,
    pub color: Option<usize>,
    pub user_data: Option<usize>,
}

/// Structure-of-arrays particle storage.
///
/// All columns are parallel: index `i` refers to the same particle in each.
/// `flags`, `position`, `velocity`, and `group` always exist; `color`,
/// `user_data`, and `depth` are materialized on first need and stay absent
/// otherwise.
pub struct ParticleStore {
    pub(crate) count: usize,
    /// Internal allocation high-water mark; user-supplied columns may be
    /// shorter or longer than this.
    pub(crate) capacity: usize,
    pub(crate) flags: Vec<u32>,
    pub(crate) position: Vec<Vec2>,
    pub(crate) velocity: Vec<Vec2>,
    pub(crate) group: Vec<Option<GroupId>>,
    pub(crate) color: Option<Vec<ParticleColor>>,
    pub(crate) user_data: Option<Vec<u64>>,
    pub(crate) depth: Option<Vec<f32>>,
    pub(crate) user_caps: UserCapacities,
}

fn limit(capacity: usize, cap: Option<usize>) -> usize {
    match cap {
        Some(max) => capacity.min(max),
        None => capacity,
    }
}

impl ParticleStore {
    pub(crate) fn new() -> Self {
        Self {
            count: 0,
            capacity: 0,
            flags: Vec::new(),
            position: Vec::new(),
            velocity: Vec::new(),
            group: Vec::new(),
            color: None,
            user_data: None,
            depth: None,
            user_caps: UserCapacities::default(),
        }
    }

    /// Capacity the store would like for one more particle, honoring the
    /// doubling policy, the system-wide `max_count`, and every user cap.
    pub(crate) fn desired_capacity(&self, max_count: Option<usize>) -> usize {
        let mut capacity = if self.count != 0 {
            2 * self.count
        } else {
            MIN_PARTICLE_BUFFER_CAPACITY
        };
        capacity = limit(capacity, max_count);
        capacity = limit(capacity, self.user_caps.flags);
        capacity = limit(capacity, self.user_caps.position);
        capacity = limit(capacity, self.user_caps.velocity);
        capacity = limit(capacity, self.user_caps.color);
        capacity = limit(capacity, self.user_caps.user_data);
        capacity
    }

    /// Grow every system-owned column to `capacity`, preserving existing
    /// values. User-supplied columns keep their fixed length.
    pub(crate) fn grow(&mut self, capacity: usize) {
        debug_assert!(capacity > self.capacity);
        if self.user_caps.flags.is_none() {
            self.flags.resize(capacity, 0);
        }
        if self.user_caps.position.is_none() {
            self.position.resize(capacity, Vec2::ZERO);
        }
        if self.user_caps.velocity.is_none() {
            self.velocity.resize(capacity, Vec2::ZERO);
        }
        self.group.resize(capacity, None);
        if self.user_caps.color.is_none() {
            if let Some(color) = &mut self.color {
                color.resize(capacity, ParticleColor::default());
            }
        }
        if self.user_caps.user_data.is_none() {
            if let Some(user_data) = &mut self.user_data {
                user_data.resize(capacity, 0);
            }
        }
        if let Some(depth) = &mut self.depth {
            depth.resize(capacity, 0.0);
        }
        self.capacity = capacity;
    }

    /// Materialize the color column (all zero) if it does not exist yet.
    pub(crate) fn request_color(&mut self) -> &mut Vec<ParticleColor> {
        let len = limit(self.capacity, self.user_caps.color);
        self.color
            .get_or_insert_with(|| vec![ParticleColor::default(); len])
    }

    /// Materialize the user-data column if it does not exist yet.
    pub(crate) fn request_user_data(&mut self) -> &mut Vec<u64> {
        let len = limit(self.capacity, self.user_caps.user_data);
        self.user_data.get_or_insert_with(|| vec![0; len])
    }

    /// Materialize the depth column (all zero) if it does not exist yet.
    pub(crate) fn request_depth(&mut self) -> &mut Vec<f32> {
        let capacity = self.capacity;
        self.depth.get_or_insert_with(|| vec![0.0; capacity])
    }
}
