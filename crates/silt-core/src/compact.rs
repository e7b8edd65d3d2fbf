//! Zombie compaction: remove flagged particles in place and remap every
//! structure that holds particle indices.

use tracing::debug;

use crate::config::INVALID_PARTICLE_INDEX;
use crate::group::group_flags;
use crate::particle::flags;
use crate::system::ParticleSystem;
use crate::world::World;

impl ParticleSystem {
    /// Copy live particles down over zombie slots (stable), build the
    /// old-to-new index map, push it through proxies, contacts, pairs,
    /// triads, and group ranges, and finally destroy groups that emptied
    /// out. Capacity never shrinks.
    pub(crate) fn solve_zombie(&mut self, world: &mut dyn World) {
        let count = self.store.count;
        let mut new_count = 0;
        let mut new_indices = vec![INVALID_PARTICLE_INDEX; count];
        for i in 0..count {
            let particle_flags = self.store.flags[i];
            if particle_flags & flags::ZOMBIE != 0 {
                if particle_flags & flags::DESTRUCTION_LISTENER != 0 {
                    world.particle_destroyed(i);
                }
                new_indices[i] = INVALID_PARTICLE_INDEX;
            } else {
                new_indices[i] = new_count as i32;
                if i != new_count {
                    self.store.flags[new_count] = self.store.flags[i];
                    self.store.position[new_count] = self.store.position[i];
                    self.store.velocity[new_count] = self.store.velocity[i];
                    self.store.group[new_count] = self.store.group[i];
                    if let Some(depth) = &mut self.store.depth {
                        depth[new_count] = depth[i];
                    }
                    if let Some(color) = &mut self.store.color {
                        color[new_count] = color[i];
                    }
                    if let Some(user_data) = &mut self.store.user_data {
                        user_data[new_count] = user_data[i];
                    }
                }
                new_count += 1;
            }
        }

        self.proxies.retain_mut(|proxy| {
            let mapped = new_indices[proxy.index];
            if mapped < 0 {
                false
            } else {
                proxy.index = mapped as usize;
                true
            }
        });
        self.contacts.retain_mut(|contact| {
            let a = new_indices[contact.index_a];
            let b = new_indices[contact.index_b];
            if a < 0 || b < 0 {
                false
            } else {
                contact.index_a = a as usize;
                contact.index_b = b as usize;
                true
            }
        });
        self.body_contacts.retain_mut(|contact| {
            let mapped = new_indices[contact.index];
            if mapped < 0 {
                false
            } else {
                contact.index = mapped as usize;
                true
            }
        });
        self.pairs.retain_mut(|pair| {
            let a = new_indices[pair.index_a];
            let b = new_indices[pair.index_b];
            if a < 0 || b < 0 {
                false
            } else {
                pair.index_a = a as usize;
                pair.index_b = b as usize;
                true
            }
        });
        self.triads.retain_mut(|triad| {
            let a = new_indices[triad.index_a];
            let b = new_indices[triad.index_b];
            let c = new_indices[triad.index_c];
            if a < 0 || b < 0 || c < 0 {
                false
            } else {
                triad.index_a = a as usize;
                triad.index_b = b as usize;
                triad.index_c = c as usize;
                true
            }
        });

        for (_, group) in self.groups.iter_mut() {
            let mut first_index = new_count;
            let mut last_index = 0;
            let mut modified = false;
            for i in group.first_index..group.last_index {
                let j = new_indices[i];
                if j >= 0 {
                    first_index = first_index.min(j as usize);
                    last_index = last_index.max(j as usize + 1);
                } else {
                    modified = true;
                }
            }
            if first_index < last_index {
                group.first_index = first_index;
                group.last_index = last_index;
                if modified && group.group_flags & group_flags::RIGID != 0 {
                    // Splitting the disconnected remainder is not implemented;
                    // the mark is kept for hosts that want to react.
                    group.to_be_split = true;
                }
            } else {
                group.first_index = 0;
                group.last_index = 0;
                if group.destroy_automatically {
                    group.to_be_destroyed = true;
                }
            }
        }

        debug!(
            removed = count - new_count,
            remaining = new_count,
            "compacted zombie particles"
        );
        self.store.count = new_count;

        let doomed: Vec<_> = self
            .groups
            .iter()
            .filter(|(_, group)| group.to_be_destroyed)
            .map(|(id, _)| id)
            .collect();
        for id in doomed {
            world.group_destroyed(id);
            self.destroy_particle_group(id);
        }
    }
}
