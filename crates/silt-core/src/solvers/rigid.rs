use glam::Vec2;

use crate::group::{group_flags, GroupRegistry};
use crate::math::{Rot, Transform};
use crate::world::TimeStep;

/// Move every rigid group as one frame.
///
/// The group's fresh statistics give a linear and angular velocity for the
/// step; composing that advance into the group transform and applying its
/// per-dt differential to each member's position overwrites the member
/// velocities with the rigid field.
pub(crate) fn solve_rigid(
    groups: &mut GroupRegistry,
    position: &[Vec2],
    velocity: &mut [Vec2],
    particle_mass: f32,
    timestamp: u32,
    step: &TimeStep,
) {
    for (_, group) in groups.iter_mut() {
        if group.group_flags & group_flags::RIGID != 0 {
            group.update_statistics(position, velocity, particle_mass, timestamp);
            let rotation = Rot::new(step.dt * group.angular_velocity);
            let frame = Transform {
                p: step.dt * group.linear_velocity + group.center - rotation.apply(group.center),
                q: rotation,
            };
            group.transform = frame.mul(&group.transform);
            // Differential of the frame advance, scaled by 1/dt: applying it
            // to a position yields the velocity that realizes the advance.
            let velocity_transform = Transform {
                p: step.inv_dt * frame.p,
                q: Rot {
                    s: step.inv_dt * frame.q.s,
                    c: step.inv_dt * (frame.q.c - 1.0),
                },
            };
            for i in group.first_index..group.last_index {
                velocity[i] = velocity_transform.apply(position[i]);
            }
        }
    }
}
