use glam::Vec2;
use tracing::debug;

use crate::config::{
    SimConfig, MAX_TRIAD_DISTANCE_SQUARED, PARTICLE_STRIDE,
};
use crate::contact::{ParticleBodyContact, ParticleContact};
use crate::grid::Proxy;
use crate::group::{group_flags, GroupDef, GroupId, GroupRegistry, ParticleGroup};
use crate::math::Transform;
use crate::particle::{flags, ParticleColor, ParticleDef, ParticleStore};
use crate::solvers::elastic::Triad;
use crate::solvers::spring::Pair;
use crate::voronoi::VoronoiDiagram;
use crate::world::{Shape, TimeStep};

/// Particle flags that cause pair construction on group creation.
pub(crate) const PAIR_FLAGS: u32 = flags::SPRING;
/// Particle flags that cause triad construction on group creation.
pub(crate) const TRIAD_FLAGS: u32 = flags::ELASTIC;
/// Particle flags excluded from the pressure solver's density sum.
pub(crate) const NO_PRESSURE_FLAGS: u32 = flags::POWDER;

/// The particle subsystem: a population of disc particles, their groups,
/// constraints, and the per-step force pipeline.
///
/// The system owns all of its storage. The host rigid-body world is only
/// touched through the [`crate::world::World`] trait during
/// [`ParticleSystem::solve`] and the shape-driven creation/destruction calls.
pub struct ParticleSystem {
    pub(crate) config: SimConfig,
    pub(crate) timestamp: u32,
    pub(crate) all_particle_flags: u32,
    pub(crate) all_group_flags: u32,
    // Derived from config.radius / config.density; kept hot.
    pub(crate) inverse_density: f32,
    pub(crate) particle_diameter: f32,
    pub(crate) inverse_diameter: f32,
    pub(crate) squared_diameter: f32,
    pub(crate) store: ParticleStore,
    pub(crate) proxies: Vec<Proxy>,
    pub(crate) contacts: Vec<ParticleContact>,
    pub(crate) body_contacts: Vec<ParticleBodyContact>,
    pub(crate) pairs: Vec<Pair>,
    pub(crate) triads: Vec<Triad>,
    pub(crate) groups: GroupRegistry,
}

impl ParticleSystem {
    pub fn new(config: SimConfig) -> Self {
        let mut system = Self {
            config,
            timestamp: 0,
            all_particle_flags: 0,
            all_group_flags: 0,
            inverse_density: 1.0,
            particle_diameter: 1.0,
            inverse_diameter: 1.0,
            squared_diameter: 1.0,
            store: ParticleStore::new(),
            proxies: Vec::new(),
            contacts: Vec::new(),
            body_contacts: Vec::new(),
            pairs: Vec::new(),
            triads: Vec::new(),
            groups: GroupRegistry::new(),
        };
        system.set_radius(config.radius);
        system.set_density(config.density);
        system
    }

    // ------------------------------------------------------------------
    // Tunables
    // ------------------------------------------------------------------

    pub fn radius(&self) -> f32 {
        self.particle_diameter / 2.0
    }

    pub fn set_radius(&mut self, radius: f32) {
        self.config.radius = radius;
        self.particle_diameter = 2.0 * radius;
        self.squared_diameter = self.particle_diameter * self.particle_diameter;
        self.inverse_diameter = 1.0 / self.particle_diameter;
    }

    pub fn density(&self) -> f32 {
        self.config.density
    }

    pub fn set_density(&mut self, density: f32) {
        self.config.density = density;
        self.inverse_density = 1.0 / density;
    }

    pub fn gravity_scale(&self) -> f32 {
        self.config.gravity_scale
    }

    pub fn set_gravity_scale(&mut self, gravity_scale: f32) {
        self.config.gravity_scale = gravity_scale;
    }

    pub fn damping(&self) -> f32 {
        self.config.damping_strength
    }

    pub fn set_damping(&mut self, damping: f32) {
        self.config.damping_strength = damping;
    }

    pub fn max_particle_count(&self) -> Option<usize> {
        self.config.max_count
    }

    pub fn set_max_particle_count(&mut self, max_count: Option<usize>) {
        if let Some(max) = max_count {
            assert!(self.store.count <= max);
        }
        self.config.max_count = max_count;
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Largest velocity consistent with one-cell-per-step motion.
    pub fn critical_velocity(&self, step: &TimeStep) -> f32 {
        self.particle_diameter * step.inv_dt
    }

    pub fn critical_velocity_squared(&self, step: &TimeStep) -> f32 {
        let v = self.critical_velocity(step);
        v * v
    }

    pub fn critical_pressure(&self, step: &TimeStep) -> f32 {
        self.config.density * self.critical_velocity_squared(step)
    }

    /// Inter-particle spacing used when filling shapes.
    pub fn particle_stride(&self) -> f32 {
        PARTICLE_STRIDE * self.particle_diameter
    }

    pub fn particle_mass(&self) -> f32 {
        let stride = self.particle_stride();
        self.config.density * stride * stride
    }

    /// Fixed geometric factor for disc packing.
    pub fn particle_inv_mass(&self) -> f32 {
        1.777777 * self.inverse_density * self.inverse_diameter * self.inverse_diameter
    }

    // ------------------------------------------------------------------
    // Buffer access
    // ------------------------------------------------------------------

    pub fn particle_count(&self) -> usize {
        self.store.count
    }

    pub fn positions(&self) -> &[Vec2] {
        &self.store.position[..self.store.count]
    }

    pub fn positions_mut(&mut self) -> &mut [Vec2] {
        &mut self.store.position[..self.store.count]
    }

    pub fn velocities(&self) -> &[Vec2] {
        &self.store.velocity[..self.store.count]
    }

    pub fn velocities_mut(&mut self) -> &mut [Vec2] {
        &mut self.store.velocity[..self.store.count]
    }

    pub fn particle_flags(&self) -> &[u32] {
        &self.store.flags[..self.store.count]
    }

    /// Color column, materialized on first access.
    pub fn colors_mut(&mut self) -> &mut [ParticleColor] {
        let count = self.store.count;
        &mut self.store.request_color()[..count]
    }

    /// User-data column, materialized on first access.
    pub fn user_data_mut(&mut self) -> &mut [u64] {
        let count = self.store.count;
        &mut self.store.request_user_data()[..count]
    }

    /// Surface-depth column for solid groups, if it has been computed.
    pub fn depth_buffer(&self) -> Option<&[f32]> {
        self.store.depth.as_deref().map(|d| &d[..self.store.count])
    }

    pub fn group_of(&self, index: usize) -> Option<GroupId> {
        self.store.group[index]
    }

    pub fn contacts(&self) -> &[ParticleContact] {
        &self.contacts
    }

    pub fn body_contacts(&self) -> &[ParticleBodyContact] {
        &self.body_contacts
    }

    pub fn pairs(&self) -> &[Pair] {
        &self.pairs
    }

    pub fn triads(&self) -> &[Triad] {
        &self.triads
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn group(&self, id: GroupId) -> &ParticleGroup {
        self.groups.get(id)
    }

    pub fn groups(&self) -> impl Iterator<Item = (GroupId, &ParticleGroup)> {
        self.groups.iter()
    }

    // ------------------------------------------------------------------
    // Buffer injection
    // ------------------------------------------------------------------

    /// Supply a fixed-capacity backing buffer for the flags column. The
    /// buffer's length becomes a hard cap on system growth.
    pub fn set_flags_buffer(&mut self, buffer: Vec<u32>) {
        assert!(buffer.len() >= self.store.count);
        self.store.capacity = self.store.capacity.min(buffer.len());
        self.store.user_caps.flags = Some(buffer.len());
        self.store.flags = buffer;
    }

    /// Supply a fixed-capacity backing buffer for the position column.
    pub fn set_position_buffer(&mut self, buffer: Vec<Vec2>) {
        assert!(buffer.len() >= self.store.count);
        self.store.capacity = self.store.capacity.min(buffer.len());
        self.store.user_caps.position = Some(buffer.len());
        self.store.position = buffer;
    }

    /// Supply a fixed-capacity backing buffer for the velocity column.
    pub fn set_velocity_buffer(&mut self, buffer: Vec<Vec2>) {
        assert!(buffer.len() >= self.store.count);
        self.store.capacity = self.store.capacity.min(buffer.len());
        self.store.user_caps.velocity = Some(buffer.len());
        self.store.velocity = buffer;
    }

    /// Supply a fixed-capacity backing buffer for the color column.
    pub fn set_color_buffer(&mut self, buffer: Vec<ParticleColor>) {
        assert!(buffer.len() >= self.store.count);
        self.store.capacity = self.store.capacity.min(buffer.len());
        self.store.user_caps.color = Some(buffer.len());
        self.store.color = Some(buffer);
    }

    /// Supply a fixed-capacity backing buffer for the user-data column.
    pub fn set_user_data_buffer(&mut self, buffer: Vec<u64>) {
        assert!(buffer.len() >= self.store.count);
        self.store.capacity = self.store.capacity.min(buffer.len());
        self.store.user_caps.user_data = Some(buffer.len());
        self.store.user_data = Some(buffer);
    }

    // ------------------------------------------------------------------
    // Particle lifecycle
    // ------------------------------------------------------------------

    /// Create one particle. Returns `None` when growth is pinned by
    /// `max_count` or a user-supplied buffer; the call is then a no-op.
    pub fn create_particle(&mut self, def: &ParticleDef) -> Option<usize> {
        if self.store.count >= self.store.capacity {
            let capacity = self.store.desired_capacity(self.config.max_count);
            if self.store.capacity < capacity {
                self.store.grow(capacity);
            }
        }
        if self.store.count >= self.store.capacity {
            return None;
        }
        let index = self.store.count;
        self.store.count += 1;
        self.store.flags[index] = def.flags;
        self.store.position[index] = def.position;
        self.store.velocity[index] = def.velocity;
        self.store.group[index] = None;
        if let Some(depth) = &mut self.store.depth {
            depth[index] = 0.0;
        }
        if self.store.color.is_some() || !def.color.is_zero() {
            self.store.request_color()[index] = def.color;
        }
        if self.store.user_data.is_some() || def.user_data.is_some() {
            self.store.request_user_data()[index] = def.user_data.unwrap_or(0);
        }
        self.proxies.push(Proxy { index, tag: 0 });
        Some(index)
    }

    /// Flag a particle for removal at the next solve. The slot stays
    /// occupied until the compaction pass runs.
    pub fn destroy_particle(&mut self, index: usize, call_destruction_listener: bool) {
        let mut removal_flags = flags::ZOMBIE;
        if call_destruction_listener {
            removal_flags |= flags::DESTRUCTION_LISTENER;
        }
        self.store.flags[index] |= removal_flags;
    }

    /// Flag every particle whose position lies inside `shape` (placed by
    /// `xf`). Returns how many were flagged.
    pub fn destroy_particles_in_shape(
        &mut self,
        shape: &dyn Shape,
        xf: &Transform,
        call_destruction_listener: bool,
    ) -> usize {
        let mut aabb = shape.compute_aabb(xf, 0);
        for child in 1..shape.child_count() {
            aabb = aabb.union(&shape.compute_aabb(xf, child));
        }
        let mut candidates = Vec::new();
        self.query_aabb(
            |index| {
                candidates.push(index);
                true
            },
            &aabb,
        );
        let mut destroyed = 0;
        for index in candidates {
            if shape.test_point(xf, self.store.position[index]) {
                self.destroy_particle(index, call_destruction_listener);
                destroyed += 1;
            }
        }
        destroyed
    }

    /// Flag every particle in a group for removal.
    pub fn destroy_particles_in_group(&mut self, id: GroupId, call_destruction_listener: bool) {
        let (first, last) = {
            let group = self.groups.get(id);
            (group.first_index, group.last_index)
        };
        for index in first..last {
            self.destroy_particle(index, call_destruction_listener);
        }
    }

    // ------------------------------------------------------------------
    // Group lifecycle
    // ------------------------------------------------------------------

    /// Create a group by seeding particles on a stride lattice over the
    /// definition's shape, then build its pairs, triads, and depth field.
    pub fn create_particle_group(&mut self, def: &GroupDef<'_>) -> GroupId {
        let stride = self.particle_stride();
        let identity = Transform::IDENTITY;
        let transform = Transform::new(def.position, def.angle);
        let first_index = self.store.count;
        if let Some(shape) = def.shape {
            let mut particle_def = ParticleDef {
                flags: def.flags,
                color: def.color,
                user_data: def.user_data,
                ..ParticleDef::default()
            };
            let mut aabb = shape.compute_aabb(&identity, 0);
            for child in 1..shape.child_count() {
                aabb = aabb.union(&shape.compute_aabb(&identity, child));
            }
            let mut y = (aabb.lower.y / stride).floor() * stride;
            while y < aabb.upper.y {
                let mut x = (aabb.lower.x / stride).floor() * stride;
                while x < aabb.upper.x {
                    let p = Vec2::new(x, y);
                    if shape.test_point(&identity, p) {
                        let world_point = transform.apply(p);
                        particle_def.position = world_point;
                        particle_def.velocity = def.linear_velocity
                            + def.angular_velocity * (world_point - def.position).perp();
                        self.create_particle(&particle_def);
                    }
                    x += stride;
                }
                y += stride;
            }
        }
        let last_index = self.store.count;

        let id = self
            .groups
            .insert(ParticleGroup::new(def, first_index, last_index));
        for i in first_index..last_index {
            self.store.group[i] = Some(id);
        }
        debug!(
            group = id.0,
            particles = last_index - first_index,
            "created particle group"
        );

        self.update_contacts(true);
        if def.flags & PAIR_FLAGS != 0 {
            self.create_pairs_in_range(first_index, last_index, def.strength);
        }
        if def.flags & TRIAD_FLAGS != 0 {
            let mut diagram = VoronoiDiagram::new(last_index - first_index);
            for i in first_index..last_index {
                diagram.add_generator(self.store.position[i], i);
            }
            diagram.generate(stride / 2.0);
            diagram.get_nodes(|a, b, c| {
                self.try_add_triad(a, b, c, def.strength);
            });
        }
        if def.group_flags & group_flags::SOLID != 0 {
            self.compute_depth_for_group(id);
        }
        id
    }

    /// Merge `group_b` into `group_a` and destroy `group_b`. Two buffer
    /// rotations make the combined particles contiguous; every index-bearing
    /// structure is remapped through the same rotation.
    pub fn join_particle_groups(&mut self, group_a: GroupId, group_b: GroupId) {
        assert_ne!(group_a, group_b);
        let count = self.store.count;
        let (b_first, b_last) = {
            let b = self.groups.get(group_b);
            (b.first_index, b.last_index)
        };
        self.rotate_buffer(b_first, b_last, count);
        debug_assert_eq!(self.groups.get(group_b).last_index, count);
        let (a_first, a_last) = {
            let a = self.groups.get(group_a);
            (a.first_index, a.last_index)
        };
        let b_first = self.groups.get(group_b).first_index;
        self.rotate_buffer(a_first, a_last, b_first);
        debug_assert_eq!(
            self.groups.get(group_a).last_index,
            self.groups.get(group_b).first_index
        );

        let (a_first, a_last) = {
            let a = self.groups.get(group_a);
            (a.first_index, a.last_index)
        };
        let (b_first, b_last) = {
            let b = self.groups.get(group_b);
            (b.first_index, b.last_index)
        };
        let mut particle_flags = 0;
        for i in a_first..b_last {
            particle_flags |= self.store.flags[i];
        }

        self.update_contacts(true);
        let strength = self
            .groups
            .get(group_a)
            .strength
            .min(self.groups.get(group_b).strength);
        if particle_flags & PAIR_FLAGS != 0 {
            for k in 0..self.contacts.len() {
                let contact = self.contacts[k];
                let (mut a, mut b) = (contact.index_a, contact.index_b);
                if a > b {
                    std::mem::swap(&mut a, &mut b);
                }
                if contact.flags & flags::SPRING != 0
                    && a_first <= a
                    && a < a_last
                    && b_first <= b
                    && b < b_last
                {
                    self.pairs.push(Pair {
                        index_a: a,
                        index_b: b,
                        flags: contact.flags,
                        strength,
                        distance: self.store.position[a].distance(self.store.position[b]),
                    });
                }
            }
        }
        if particle_flags & TRIAD_FLAGS != 0 {
            let mut diagram = VoronoiDiagram::new(b_last - a_first);
            for i in a_first..b_last {
                if self.store.flags[i] & flags::ZOMBIE == 0 {
                    diagram.add_generator(self.store.position[i], i);
                }
            }
            diagram.generate(self.particle_stride() / 2.0);
            diagram.get_nodes(|a, b, c| {
                // Keep only triples that stitch the two groups together and
                // whose members all carry a triad flag.
                let count_a = (a < b_first) as usize + (b < b_first) as usize + (c < b_first) as usize;
                if count_a == 0 || count_a == 3 {
                    return;
                }
                let combined = self.store.flags[a] & self.store.flags[b] & self.store.flags[c];
                if combined & TRIAD_FLAGS != 0 {
                    self.try_add_triad(a, b, c, strength);
                }
            });
        }

        for i in b_first..b_last {
            self.store.group[i] = Some(group_a);
        }
        let merged_flags =
            self.groups.get(group_a).group_flags | self.groups.get(group_b).group_flags;
        {
            let a = self.groups.get_mut(group_a);
            a.group_flags = merged_flags;
            a.last_index = b_last;
        }
        self.groups.get_mut(group_b).first_index = b_last;
        debug!(absorbed = group_b.0, into = group_a.0, "joined particle groups");
        self.destroy_particle_group(group_b);

        if merged_flags & group_flags::SOLID != 0 {
            self.compute_depth_for_group(group_a);
        }
    }

    /// Unlink a group. Its particles survive, ungrouped.
    pub fn destroy_particle_group(&mut self, id: GroupId) {
        assert!(self.groups.len() > 0);
        let (first, last) = {
            let group = self.groups.get(id);
            (group.first_index, group.last_index)
        };
        for i in first..last {
            self.store.group[i] = None;
        }
        self.groups.remove(id);
        debug!(group = id.0, "destroyed particle group");
    }

    // ------------------------------------------------------------------
    // Pair / triad construction
    // ------------------------------------------------------------------

    /// Turn every spring-flagged contact fully inside `[first, last)` into a
    /// pair with the current distance as rest length.
    fn create_pairs_in_range(&mut self, first: usize, last: usize, strength: f32) {
        for k in 0..self.contacts.len() {
            let contact = self.contacts[k];
            let (mut a, mut b) = (contact.index_a, contact.index_b);
            if a > b {
                std::mem::swap(&mut a, &mut b);
            }
            if contact.flags & flags::SPRING != 0 && first <= a && b < last {
                self.pairs.push(Pair {
                    index_a: a,
                    index_b: b,
                    flags: contact.flags,
                    strength,
                    distance: self.store.position[a].distance(self.store.position[b]),
                });
            }
        }
    }

    /// Append a triad for `(a, b, c)` unless one of its edges exceeds the
    /// maximum triad span.
    fn try_add_triad(&mut self, a: usize, b: usize, c: usize, strength: f32) {
        let pa = self.store.position[a];
        let pb = self.store.position[b];
        let pc = self.store.position[c];
        let dab = pa - pb;
        let dbc = pb - pc;
        let dca = pc - pa;
        let max_distance_squared = MAX_TRIAD_DISTANCE_SQUARED * self.squared_diameter;
        if dab.length_squared() >= max_distance_squared
            || dbc.length_squared() >= max_distance_squared
            || dca.length_squared() >= max_distance_squared
        {
            return;
        }
        let midpoint = (pa + pb + pc) / 3.0;
        self.triads.push(Triad {
            index_a: a,
            index_b: b,
            index_c: c,
            flags: self.store.flags[a] | self.store.flags[b] | self.store.flags[c],
            strength,
            pa: pa - midpoint,
            pb: pb - midpoint,
            pc: pc - midpoint,
            ka: -dca.dot(dab),
            kb: -dab.dot(dbc),
            kc: -dbc.dot(dca),
            s: pa.perp_dot(pb) + pb.perp_dot(pc) + pc.perp_dot(pa),
        });
    }

    // ------------------------------------------------------------------
    // Buffer rotation
    // ------------------------------------------------------------------

    /// Rotate `[start, end)` so the block `[mid, end)` lands at `start`, and
    /// remap every proxy, contact, pair, triad, and group boundary through
    /// the same permutation.
    pub(crate) fn rotate_buffer(&mut self, start: usize, mid: usize, end: usize) {
        if start == mid || mid == end {
            return;
        }
        let new_index = move |i: usize| -> usize {
            if i < start {
                i
            } else if i < mid {
                i + end - mid
            } else if i < end {
                i + start - mid
            } else {
                i
            }
        };

        let by = mid - start;
        self.store.flags[start..end].rotate_left(by);
        self.store.position[start..end].rotate_left(by);
        self.store.velocity[start..end].rotate_left(by);
        self.store.group[start..end].rotate_left(by);
        if let Some(depth) = &mut self.store.depth {
            depth[start..end].rotate_left(by);
        }
        if let Some(color) = &mut self.store.color {
            color[start..end].rotate_left(by);
        }
        if let Some(user_data) = &mut self.store.user_data {
            user_data[start..end].rotate_left(by);
        }

        for proxy in &mut self.proxies {
            proxy.index = new_index(proxy.index);
        }
        for contact in &mut self.contacts {
            contact.index_a = new_index(contact.index_a);
            contact.index_b = new_index(contact.index_b);
        }
        for contact in &mut self.body_contacts {
            contact.index = new_index(contact.index);
        }
        for pair in &mut self.pairs {
            pair.index_a = new_index(pair.index_a);
            pair.index_b = new_index(pair.index_b);
        }
        for triad in &mut self.triads {
            triad.index_a = new_index(triad.index_a);
            triad.index_b = new_index(triad.index_b);
            triad.index_c = new_index(triad.index_c);
        }
        for (_, group) in self.groups.iter_mut() {
            if group.first_index < group.last_index {
                group.first_index = new_index(group.first_index);
                group.last_index = new_index(group.last_index - 1) + 1;
            }
        }
    }

    // ------------------------------------------------------------------
    // Depth relaxation for solid groups
    // ------------------------------------------------------------------

    /// Distance-from-surface relaxation over a group's internal contacts.
    /// Surface particles (contact-weight sum under 0.8) seed at zero; depth
    /// propagates inward by `1 - weight` per hop until a sweep changes
    /// nothing. Unreached particles end at zero.
    pub(crate) fn compute_depth_for_group(&mut self, id: GroupId) {
        let (first, last) = {
            let group = self.groups.get(id);
            (group.first_index, group.last_index)
        };
        let in_group = |i: usize| first <= i && i < last;

        let mut accumulation = vec![0.0f32; self.store.count];
        for contact in &self.contacts {
            if in_group(contact.index_a) && in_group(contact.index_b) {
                accumulation[contact.index_a] += contact.weight;
                accumulation[contact.index_b] += contact.weight;
            }
        }
        self.store.request_depth();
        let depth = self.store.depth.as_mut().expect("depth just materialized");
        for i in first..last {
            depth[i] = if accumulation[i] < 0.8 { 0.0 } else { f32::MAX };
        }

        let iteration_count = last - first;
        for _ in 0..iteration_count {
            let mut updated = false;
            for contact in &self.contacts {
                let (a, b) = (contact.index_a, contact.index_b);
                if in_group(a) && in_group(b) {
                    let r = 1.0 - contact.weight;
                    if depth[a] > depth[b] + r {
                        depth[a] = depth[b] + r;
                        updated = true;
                    }
                    if depth[b] > depth[a] + r {
                        depth[b] = depth[a] + r;
                        updated = true;
                    }
                }
            }
            if !updated {
                break;
            }
        }
        for i in first..last {
            if depth[i] < f32::MAX {
                depth[i] *= self.particle_diameter;
            } else {
                depth[i] = 0.0;
            }
        }
    }
}
