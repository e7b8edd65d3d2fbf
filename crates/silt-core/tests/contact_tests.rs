mod common;

use common::{step, HalfPlaneFixture, TestWorld};
use glam::Vec2;
use silt_core::{flags, GroupDef, ParticleDef, ParticleSystem, SimConfig};

#[test]
fn overlapping_pair_produces_one_exact_contact() {
    let mut system = ParticleSystem::new(SimConfig::default());
    system
        .create_particle(&ParticleDef {
            position: Vec2::new(0.0, 0.0),
            ..ParticleDef::default()
        })
        .unwrap();
    system
        .create_particle(&ParticleDef {
            position: Vec2::new(0.5, 0.0),
            ..ParticleDef::default()
        })
        .unwrap();

    let mut world = TestWorld::empty();
    system.solve(&mut world, &step());

    assert_eq!(system.contacts().len(), 1);
    let contact = system.contacts()[0];
    assert!((contact.weight - 0.5).abs() < 1e-5);
    assert!((contact.normal - Vec2::X).length() < 1e-5);
    assert_eq!(contact.flags, 0);
}

#[test]
fn contact_flags_are_the_union_of_both_endpoints() {
    let mut system = ParticleSystem::new(SimConfig::default());
    system
        .create_particle(&ParticleDef {
            flags: flags::VISCOUS,
            position: Vec2::new(0.0, 0.0),
            ..ParticleDef::default()
        })
        .unwrap();
    system
        .create_particle(&ParticleDef {
            flags: flags::TENSILE,
            position: Vec2::new(0.4, 0.0),
            ..ParticleDef::default()
        })
        .unwrap();

    let mut world = TestWorld::empty();
    system.solve(&mut world, &step());

    assert_eq!(system.contacts().len(), 1);
    assert_eq!(system.contacts()[0].flags, flags::VISCOUS | flags::TENSILE);
}

#[test]
fn group_creation_partitions_out_zombie_contacts() {
    let mut system = ParticleSystem::new(SimConfig::default());
    for i in 0..3 {
        system
            .create_particle(&ParticleDef {
                position: Vec2::new(i as f32 * 0.5, 0.0),
                ..ParticleDef::default()
            })
            .unwrap();
    }
    system.destroy_particle(1, false);

    // An empty group creation refreshes contacts with zombies excluded.
    system.create_particle_group(&GroupDef::default());
    for contact in system.contacts() {
        assert_ne!(contact.index_a, 1);
        assert_ne!(contact.index_b, 1);
        assert_eq!(contact.flags & flags::ZOMBIE, 0);
    }
}

#[test]
fn ground_contact_has_expected_weight_normal_and_mass() {
    let mut system = ParticleSystem::new(SimConfig::default());
    system
        .create_particle(&ParticleDef {
            position: Vec2::new(0.0, 0.4),
            ..ParticleDef::default()
        })
        .unwrap();

    let mut world = TestWorld::with_ground(0.0);
    system.solve(&mut world, &step());

    assert_eq!(system.body_contacts().len(), 1);
    let contact = system.body_contacts()[0];
    assert_eq!(contact.index, 0);
    assert!((contact.weight - 0.6).abs() < 1e-5);
    assert!((contact.normal - Vec2::new(0.0, -1.0)).length() < 1e-5, "normal points into the body");
    // Static ground: the reduced mass is the particle mass alone.
    let expected_mass = 1.0 / system.particle_inv_mass();
    assert!((contact.mass - expected_mass).abs() / expected_mass < 1e-4);
}

#[test]
fn wall_particles_contribute_infinite_mass_against_dynamic_bodies() {
    let mut config = SimConfig::default();
    config.damping_strength = 0.0;
    let mut system = ParticleSystem::new(config);
    system
        .create_particle(&ParticleDef {
            flags: flags::WALL,
            position: Vec2::new(0.0, 0.4),
            ..ParticleDef::default()
        })
        .unwrap();
    system
        .create_particle(&ParticleDef {
            position: Vec2::new(3.0, 0.4),
            ..ParticleDef::default()
        })
        .unwrap();

    let mut world = TestWorld::empty();
    world.fixtures.push(HalfPlaneFixture::dynamic(0.0, 10.0, 0.0));
    system.solve(&mut world, &step());

    assert_eq!(system.body_contacts().len(), 2);
    let wall_contact = system
        .body_contacts()
        .iter()
        .find(|c| c.index == 0)
        .expect("wall particle contact");
    let free_contact = system
        .body_contacts()
        .iter()
        .find(|c| c.index == 1)
        .expect("free particle contact");
    // Wall particle: 1/m = 0 + 1/10, so the reduced mass is the body's.
    assert!((wall_contact.mass - 10.0).abs() < 1e-3);
    let expected_free = 1.0 / (system.particle_inv_mass() + 0.1);
    assert!((free_contact.mass - expected_free).abs() / expected_free < 1e-4);
    assert!(free_contact.mass < wall_contact.mass);
}

#[test]
fn sensors_produce_no_body_contacts() {
    let mut system = ParticleSystem::new(SimConfig::default());
    system
        .create_particle(&ParticleDef {
            position: Vec2::new(0.0, 0.4),
            ..ParticleDef::default()
        })
        .unwrap();

    let mut world = TestWorld::with_ground(0.0);
    world.fixtures[0].sensor = true;
    system.solve(&mut world, &step());

    assert!(system.body_contacts().is_empty());
}

#[test]
fn swept_collision_reflects_velocity_and_pushes_the_body() {
    let mut config = SimConfig::default();
    config.damping_strength = 0.0;
    config.pressure_strength = 0.0;
    let mut system = ParticleSystem::new(config);
    // Moving down fast enough to pass through the surface in one step.
    system
        .create_particle(&ParticleDef {
            position: Vec2::new(0.0, 0.2),
            velocity: Vec2::new(0.0, -30.0),
            ..ParticleDef::default()
        })
        .unwrap();

    let mut world = TestWorld::empty();
    world.fixtures.push(HalfPlaneFixture::dynamic(0.0, 10.0, 0.0));
    system.solve(&mut world, &step());

    let p = system.positions()[0];
    assert!(p.y >= 0.0, "particle must stay above the surface, got {p:?}");
    let (impulse, _) = world.fixtures[0]
        .impulses
        .first()
        .expect("collision must push the body");
    assert!(impulse.y < 0.0, "body receives the downward momentum");
}
