mod common;

use common::{step, BoxShape, CircleShape, TestWorld};
use glam::Vec2;
use silt_core::math::Transform;
use silt_core::{flags, GroupDef, ParticleDef, ParticleSystem, SimConfig};

fn sparse_system(n: usize) -> ParticleSystem {
    let mut system = ParticleSystem::new(SimConfig::default());
    for i in 0..n {
        system
            .create_particle(&ParticleDef {
                position: Vec2::new(i as f32 * 2.0, 0.0),
                ..ParticleDef::default()
            })
            .unwrap();
    }
    system
}

#[test]
fn compaction_removes_every_third_particle_and_keeps_order() {
    let mut system = sparse_system(1000);
    for i in 0..1000 {
        if i % 3 == 2 {
            system.destroy_particle(i, false);
        }
    }

    let mut world = TestWorld::empty();
    system.solve(&mut world, &step());

    assert_eq!(system.particle_count(), 667);
    let mut expected = (0..1000).filter(|i| i % 3 != 2);
    for k in 0..667 {
        let original = expected.next().unwrap();
        assert_eq!(
            system.positions()[k],
            Vec2::new(original as f32 * 2.0, 0.0),
            "slot {k} must hold surviving particle {original}"
        );
    }
}

#[test]
fn destroyed_particle_is_gone_after_one_solve() {
    let mut system = sparse_system(5);
    system.destroy_particle(2, false);
    assert_eq!(system.particle_count(), 5, "removal is deferred to solve");

    let mut world = TestWorld::empty();
    system.solve(&mut world, &step());

    assert_eq!(system.particle_count(), 4);
    for p in system.positions() {
        assert_ne!(p.x, 4.0, "particle 2's position must be gone");
    }
}

#[test]
fn destruction_listener_fires_only_when_requested() {
    let mut system = sparse_system(4);
    system.destroy_particle(1, true);
    system.destroy_particle(3, false);

    let mut world = TestWorld::empty();
    system.solve(&mut world, &step());

    assert_eq!(world.destroyed_particles, vec![1]);
    assert_eq!(system.particle_count(), 2);
}

#[test]
fn compaction_drops_pairs_and_triads_with_dead_members() {
    // Spring pair whose endpoint dies.
    let config = SimConfig {
        radius: 1.0 / 3.0,
        ..SimConfig::default()
    };
    let mut system = ParticleSystem::new(config);
    let shape = BoxShape::new(0.6, 0.3);
    system.create_particle_group(&GroupDef {
        shape: Some(&shape),
        flags: flags::SPRING,
        ..GroupDef::default()
    });
    assert_eq!(system.pairs().len(), 1);
    system.destroy_particle(1, false);
    let mut world = TestWorld::empty();
    system.solve(&mut world, &step());
    assert!(system.pairs().is_empty(), "pair must die with its endpoint");

    // Elastic mesh losing a member keeps only valid triads.
    let mut system = ParticleSystem::new(SimConfig::default());
    let circle = CircleShape { radius: 1.2 };
    system.create_particle_group(&GroupDef {
        shape: Some(&circle),
        flags: flags::ELASTIC,
        ..GroupDef::default()
    });
    let triads_before = system.triads().len();
    assert!(triads_before > 0);
    system.destroy_particle(0, false);
    let mut world = TestWorld::empty();
    system.solve(&mut world, &step());
    assert!(system.triads().len() < triads_before);
    for triad in system.triads() {
        assert!(triad.index_a < system.particle_count());
        assert!(triad.index_b < system.particle_count());
        assert!(triad.index_c < system.particle_count());
    }
}

#[test]
fn emptied_group_destroys_automatically_and_notifies() {
    let mut system = ParticleSystem::new(SimConfig::default());
    let shape = BoxShape::new(2.2, 0.5);
    let group = system.create_particle_group(&GroupDef {
        shape: Some(&shape),
        ..GroupDef::default()
    });
    system.destroy_particles_in_group(group, false);

    let mut world = TestWorld::empty();
    system.solve(&mut world, &step());

    assert_eq!(system.particle_count(), 0);
    assert_eq!(system.group_count(), 0);
    assert_eq!(world.destroyed_groups, vec![group]);
}

#[test]
fn rigid_group_losing_members_is_marked_for_split() {
    let mut system = ParticleSystem::new(SimConfig::default());
    let shape = BoxShape::new(3.0, 0.5);
    let group = system.create_particle_group(&GroupDef {
        shape: Some(&shape),
        group_flags: silt_core::group_flags::RIGID,
        ..GroupDef::default()
    });
    assert_eq!(system.group(group).particle_count(), 4);
    system.destroy_particle(system.group(group).first_index() + 1, false);

    let mut world = TestWorld::empty();
    system.solve(&mut world, &step());

    let g = system.group(group);
    assert_eq!(g.particle_count(), 3);
    assert!(g.needs_split(), "partial loss marks a rigid group for splitting");
}

#[test]
fn max_count_caps_creation_with_soft_failures() {
    let config = SimConfig {
        max_count: Some(10),
        ..SimConfig::default()
    };
    let mut system = ParticleSystem::new(config);
    let mut created = 0;
    for i in 0..20 {
        let def = ParticleDef {
            position: Vec2::new(i as f32, 0.0),
            ..ParticleDef::default()
        };
        if system.create_particle(&def).is_some() {
            created += 1;
        }
    }
    assert_eq!(created, 10);
    assert_eq!(system.particle_count(), 10);
}

#[test]
fn user_supplied_buffer_pins_capacity() {
    let mut system = ParticleSystem::new(SimConfig::default());
    system.set_position_buffer(vec![Vec2::ZERO; 5]);
    let mut indices = Vec::new();
    for i in 0..8 {
        let def = ParticleDef {
            position: Vec2::new(i as f32, 0.0),
            ..ParticleDef::default()
        };
        indices.push(system.create_particle(&def));
    }
    assert!(indices[..5].iter().all(|r| r.is_some()));
    assert!(indices[5..].iter().all(|r| r.is_none()));
    assert_eq!(system.particle_count(), 5);
}

#[test]
fn destroy_particles_in_shape_flags_exactly_the_contained_ones() {
    let mut system = ParticleSystem::new(SimConfig::default());
    for y in 0..3 {
        for x in 0..3 {
            system
                .create_particle(&ParticleDef {
                    position: Vec2::new(x as f32, y as f32),
                    ..ParticleDef::default()
                })
                .unwrap();
        }
    }
    let mut world = TestWorld::empty();
    // One step sorts the proxies so shape queries see current positions.
    system.solve(&mut world, &step());

    let circle = CircleShape { radius: 1.1 };
    let destroyed =
        system.destroy_particles_in_shape(&circle, &Transform::new(Vec2::new(1.0, 1.0), 0.0), false);
    assert_eq!(destroyed, 5, "center plus the four edge-adjacent particles");

    system.solve(&mut world, &step());
    assert_eq!(system.particle_count(), 4, "only the corners survive");
    for p in system.positions() {
        assert!((p.x - 1.0).abs() > 0.5 && (p.y - 1.0).abs() > 0.5);
    }
}

#[test]
fn create_then_destroy_group_roundtrip_leaves_no_dangling_state() {
    let mut system = ParticleSystem::new(SimConfig::default());
    let groups_before = system.group_count();
    let shape = BoxShape::new(2.2, 0.5);
    let group = system.create_particle_group(&GroupDef {
        shape: Some(&shape),
        ..GroupDef::default()
    });
    system.destroy_particle_group(group);
    assert_eq!(system.group_count(), groups_before);
    for i in 0..system.particle_count() {
        assert_eq!(system.group_of(i), None);
    }

    // The survivors still simulate.
    let mut world = TestWorld::empty();
    system.solve(&mut world, &step());
    assert_eq!(system.particle_count(), 3);
}
