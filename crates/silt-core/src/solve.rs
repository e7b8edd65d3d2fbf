//! The per-step pipeline. Solver order is fixed: integration and collision
//! first, then the flag-gated force solvers, with pressure and damping
//! always last so they see the step's final contact set.

use crate::group::group_flags;
use crate::particle::flags;
use crate::solvers;
use crate::solvers::pressure::PressureParams;
use crate::system::ParticleSystem;
use crate::world::{TimeStep, World};

impl ParticleSystem {
    /// Advance the particle population by one tick.
    ///
    /// The host world is only touched through queries and impulses; no
    /// callback may re-enter the system.
    pub fn solve(&mut self, world: &mut dyn World, step: &TimeStep) {
        self.timestamp = self.timestamp.wrapping_add(1);
        if self.store.count == 0 {
            return;
        }
        self.all_particle_flags = 0;
        for i in 0..self.store.count {
            self.all_particle_flags |= self.store.flags[i];
        }
        if self.all_particle_flags & flags::ZOMBIE != 0 {
            self.solve_zombie(world);
            if self.store.count == 0 {
                return;
            }
        }
        self.all_group_flags = 0;
        for (_, group) in self.groups.iter() {
            self.all_group_flags |= group.group_flags;
        }

        let gravity = step.dt * self.config.gravity_scale * world.gravity();
        let critical_velocity_squared = self.critical_velocity_squared(step);
        for v in &mut self.store.velocity[..self.store.count] {
            *v += gravity;
            let v2 = v.length_squared();
            if v2 > critical_velocity_squared {
                *v *= (critical_velocity_squared / v2).sqrt();
            }
        }

        self.solve_collision(world, step);
        if self.all_group_flags & group_flags::RIGID != 0 {
            let particle_mass = self.particle_mass();
            solvers::rigid::solve_rigid(
                &mut self.groups,
                &self.store.position[..self.store.count],
                &mut self.store.velocity[..self.store.count],
                particle_mass,
                self.timestamp,
                step,
            );
        }
        if self.all_particle_flags & flags::WALL != 0 {
            self.solve_wall();
        }
        for i in 0..self.store.count {
            let v = self.store.velocity[i];
            self.store.position[i] += step.dt * v;
        }

        self.update_body_contacts(world);
        self.update_contacts(false);

        if self.all_particle_flags & flags::VISCOUS != 0 {
            let particle_inv_mass = self.particle_inv_mass();
            solvers::viscous::solve_viscous(
                &self.contacts,
                &self.body_contacts,
                &self.store.flags[..self.store.count],
                &self.store.position[..self.store.count],
                &mut self.store.velocity[..self.store.count],
                self.config.viscous_strength,
                particle_inv_mass,
                world,
            );
        }
        if self.all_particle_flags & flags::POWDER != 0 {
            let powder_strength_velocity = self.config.powder_strength * self.critical_velocity(step);
            let particle_inv_mass = self.particle_inv_mass();
            solvers::powder::solve_powder(
                &self.contacts,
                &self.body_contacts,
                &self.store.flags[..self.store.count],
                &self.store.position[..self.store.count],
                &mut self.store.velocity[..self.store.count],
                powder_strength_velocity,
                particle_inv_mass,
                world,
            );
        }
        if self.all_particle_flags & flags::TENSILE != 0 {
            let critical_velocity = self.critical_velocity(step);
            solvers::tensile::solve_tensile(
                &self.contacts,
                &mut self.store.velocity[..self.store.count],
                self.store.count,
                self.config.surface_tension_strength_a * critical_velocity,
                self.config.surface_tension_strength_b * critical_velocity,
            );
        }
        if self.all_particle_flags & flags::ELASTIC != 0 {
            solvers::elastic::solve_elastic(
                &self.triads,
                &self.store.position[..self.store.count],
                &mut self.store.velocity[..self.store.count],
                step.inv_dt * self.config.elastic_strength,
            );
        }
        if self.all_particle_flags & flags::SPRING != 0 {
            solvers::spring::solve_spring(
                &self.pairs,
                &self.store.position[..self.store.count],
                &mut self.store.velocity[..self.store.count],
                step.inv_dt * self.config.spring_strength,
            );
        }
        if self.all_group_flags & group_flags::SOLID != 0 {
            self.store.request_depth();
            let depth = self.store.depth.as_deref().expect("depth just materialized");
            solvers::solid::solve_solid(
                &self.contacts,
                &self.store.group[..self.store.count],
                &depth[..self.store.count],
                &mut self.store.velocity[..self.store.count],
                step.inv_dt * self.config.ejection_strength,
            );
        }
        if self.all_particle_flags & flags::COLOR_MIXING != 0 {
            let count = self.store.count;
            self.store.request_color();
            let color = self.store.color.as_deref_mut().expect("color just materialized");
            solvers::color_mixing::solve_color_mixing(
                &self.contacts,
                &self.store.flags[..count],
                &mut color[..count],
                self.config.color_mixing_strength,
            );
        }

        let pressure_params = PressureParams {
            pressure_per_weight: self.config.pressure_strength * self.critical_pressure(step),
            velocity_per_pressure: step.dt / (self.config.density * self.particle_diameter),
            particle_inv_mass: self.particle_inv_mass(),
        };
        solvers::pressure::solve_pressure(
            &self.contacts,
            &self.body_contacts,
            &self.store.flags[..self.store.count],
            &self.store.position[..self.store.count],
            &mut self.store.velocity[..self.store.count],
            self.all_particle_flags,
            &pressure_params,
            world,
        );
        let particle_inv_mass = self.particle_inv_mass();
        solvers::damping::solve_damping(
            &self.contacts,
            &self.body_contacts,
            &self.store.position[..self.store.count],
            &mut self.store.velocity[..self.store.count],
            self.config.damping_strength,
            particle_inv_mass,
            world,
        );
    }

    /// Wall particles never move.
    fn solve_wall(&mut self) {
        for i in 0..self.store.count {
            if self.store.flags[i] & flags::WALL != 0 {
                self.store.velocity[i] = glam::Vec2::ZERO;
            }
        }
    }

    /// Kinetic energy stored in approaching contacts: `1/2 m sum (v.n)^2`
    /// over contacts with closing normal velocity.
    pub fn compute_particle_collision_energy(&self) -> f32 {
        let mut sum_v2 = 0.0;
        for contact in &self.contacts {
            let v = self.store.velocity[contact.index_b] - self.store.velocity[contact.index_a];
            let vn = v.dot(contact.normal);
            if vn < 0.0 {
                sum_v2 += vn * vn;
            }
        }
        0.5 * self.particle_mass() * sum_v2
    }
}
