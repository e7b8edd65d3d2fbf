use glam::Vec2;

use crate::math::Transform;
use crate::particle::ParticleColor;
use crate::world::Shape;

/// Group-level behavior bits.
pub mod group_flags {
    /// Resists penetration by outside particles via depth-based ejection.
    pub const SOLID: u32 = 1 << 0;
    /// Moves as a single rigid frame.
    pub const RIGID: u32 = 1 << 1;
}

/// Stable handle to a particle group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GroupId(pub(crate) u32);

/// Blueprint for a particle group. Particles are seeded on a stride lattice
/// over `shape`, then transformed by `position`/`angle`.
pub struct GroupDef<'a> {
    pub shape: Option<&'a dyn Shape>,
    pub position: Vec2,
    pub angle: f32,
    pub linear_velocity: Vec2,
    pub angular_velocity: f32,
    /// Particle flags applied to every seeded particle.
    pub flags: u32,
    pub group_flags: u32,
    /// Strength of pairs and triads built for this group.
    pub strength: f32,
    pub color: ParticleColor,
    pub user_data: Option<u64>,
    /// Destroy the group once compaction leaves it empty.
    pub destroy_automatically: bool,
}

impl Default for GroupDef<'_> {
    fn default() -> Self {
        Self {
            shape: None,
            position: Vec2::ZERO,
            angle: 0.0,
            linear_velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            flags: 0,
            group_flags: 0,
            strength: 1.0,
            color: ParticleColor::default(),
            user_data: None,
            destroy_automatically: true,
        }
    }
}

/// A contiguous run of particles sharing flags and strength.
///
/// The owned range `[first_index, last_index)` is maintained by the system:
/// joins rotate buffers to keep it contiguous and compaction re-derives it
/// from the surviving members.
pub struct ParticleGroup {
    pub(crate) first_index: usize,
    pub(crate) last_index: usize,
    pub(crate) group_flags: u32,
    pub(crate) strength: f32,
    pub(crate) transform: Transform,
    pub(crate) destroy_automatically: bool,
    pub(crate) to_be_destroyed: bool,
    pub(crate) to_be_split: bool,
    pub(crate) user_data: Option<u64>,
    // Statistics cache, refreshed at most once per solve timestamp.
    pub(crate) timestamp: u32,
    pub(crate) mass: f32,
    pub(crate) inertia: f32,
    pub(crate) center: Vec2,
    pub(crate) linear_velocity: Vec2,
    pub(crate) angular_velocity: f32,
}

impl ParticleGroup {
    pub(crate) fn new(def: &GroupDef<'_>, first_index: usize, last_index: usize) -> Self {
        Self {
            first_index,
            last_index,
            group_flags: def.group_flags,
            strength: def.strength,
            transform: Transform::new(def.position, def.angle),
            destroy_automatically: def.destroy_automatically,
            to_be_destroyed: false,
            to_be_split: false,
            user_data: def.user_data,
            timestamp: u32::MAX,
            mass: 0.0,
            inertia: 0.0,
            center: Vec2::ZERO,
            linear_velocity: Vec2::ZERO,
            angular_velocity: 0.0,
        }
    }

    #[inline]
    pub fn first_index(&self) -> usize {
        self.first_index
    }

    #[inline]
    pub fn last_index(&self) -> usize {
        self.last_index
    }

    #[inline]
    pub fn particle_count(&self) -> usize {
        self.last_index - self.first_index
    }

    #[inline]
    pub fn group_flags(&self) -> u32 {
        self.group_flags
    }

    #[inline]
    pub fn strength(&self) -> f32 {
        self.strength
    }

    #[inline]
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    #[inline]
    pub fn user_data(&self) -> Option<u64> {
        self.user_data
    }

    /// A rigid group that lost members during compaction; splitting it into
    /// connected components is not implemented yet.
    #[inline]
    pub fn needs_split(&self) -> bool {
        self.to_be_split
    }

    /// Aggregate mass as of the last statistics refresh.
    #[inline]
    pub fn mass(&self) -> f32 {
        self.mass
    }

    /// Center of mass as of the last statistics refresh.
    #[inline]
    pub fn center(&self) -> Vec2 {
        self.center
    }

    #[inline]
    pub fn inertia(&self) -> f32 {
        self.inertia
    }

    #[inline]
    pub fn linear_velocity(&self) -> Vec2 {
        self.linear_velocity
    }

    #[inline]
    pub fn angular_velocity(&self) -> f32 {
        self.angular_velocity
    }

    /// Refresh mass, center, linear/angular velocity, and inertia from the
    /// member particles. Cached per solve timestamp so repeated callers in
    /// one step pay once.
    pub(crate) fn update_statistics(
        &mut self,
        position: &[Vec2],
        velocity: &[Vec2],
        particle_mass: f32,
        timestamp: u32,
    ) {
        if self.timestamp == timestamp {
            return;
        }
        let m = particle_mass;
        self.mass = m * self.particle_count() as f32;
        let mut center = Vec2::ZERO;
        let mut linear_velocity = Vec2::ZERO;
        for i in self.first_index..self.last_index {
            center += m * position[i];
            linear_velocity += m * velocity[i];
        }
        if self.mass > 0.0 {
            center /= self.mass;
            linear_velocity /= self.mass;
        }
        self.center = center;
        self.linear_velocity = linear_velocity;

        let mut inertia = 0.0;
        let mut angular_velocity = 0.0;
        for i in self.first_index..self.last_index {
            let p = position[i] - center;
            let v = velocity[i] - linear_velocity;
            inertia += m * p.length_squared();
            angular_velocity += m * p.perp_dot(v);
        }
        if inertia > 0.0 {
            angular_velocity /= inertia;
        }
        self.inertia = inertia;
        self.angular_velocity = angular_velocity;
        self.timestamp = timestamp;
    }
}

/// Flat group registry keyed by [`GroupId`] with slot reuse.
///
/// Replaces the intrusive doubly-linked group list of classic particle
/// engines; iteration order is slot order, which nothing observable depends
/// on.
pub(crate) struct GroupRegistry {
    slots: Vec<Option<ParticleGroup>>,
    free: Vec<u32>,
    len: usize,
}

impl GroupRegistry {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn insert(&mut self, group: ParticleGroup) -> GroupId {
        self.len += 1;
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot as usize] = Some(group);
                GroupId(slot)
            }
            None => {
                self.slots.push(Some(group));
                GroupId((self.slots.len() - 1) as u32)
            }
        }
    }

    pub(crate) fn remove(&mut self, id: GroupId) -> ParticleGroup {
        let group = self.slots[id.0 as usize]
            .take()
            .expect("removing a dead group");
        self.free.push(id.0);
        self.len -= 1;
        group
    }

    pub(crate) fn get(&self, id: GroupId) -> &ParticleGroup {
        self.slots[id.0 as usize].as_ref().expect("dead group id")
    }

    pub(crate) fn get_mut(&mut self, id: GroupId) -> &mut ParticleGroup {
        self.slots[id.0 as usize].as_mut().expect("dead group id")
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (GroupId, &ParticleGroup)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, group)| group.as_ref().map(|g| (GroupId(slot as u32), g)))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (GroupId, &mut ParticleGroup)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(slot, group)| group.as_mut().map(|g| (GroupId(slot as u32), g)))
    }
}
