//! 2-D particle-based fluid and soft-body simulation core.
//!
//! A population of disc particles approximates fluids, powders, springs,
//! elastic solids, tensile films, and rigid aggregates inside a host
//! rigid-body world. The host supplies bodies, fixtures, gravity, and its
//! broad phase through the traits in [`world`]; everything else — spatial
//! hashing, contacts, groups, the force pipeline, and compaction — lives
//! here.
//!
//! # Modules
//! - [`particle`] -- flags, definitions, and the structure-of-arrays store.
//! - [`grid`] -- packed spatial tags and the sorted proxy index.
//! - [`contact`] -- particle and body contact records.
//! - [`group`] -- contiguous particle groups and their registry.
//! - [`voronoi`] -- triangulation used to build elastic triads.
//! - [`solvers`] -- the per-step force solvers.
//! - [`system`] -- [`ParticleSystem`], the owning type.

pub mod config;
pub mod contact;
pub mod grid;
pub mod group;
pub mod math;
pub mod particle;
pub mod solvers;
pub mod system;
pub mod voronoi;
pub mod world;

mod compact;
mod query;
mod solve;

pub use config::SimConfig;
pub use contact::{ParticleBodyContact, ParticleContact};
pub use group::{group_flags, GroupDef, GroupId, ParticleGroup};
pub use particle::{flags, ParticleColor, ParticleDef};
pub use solvers::elastic::Triad;
pub use solvers::spring::Pair;
pub use system::ParticleSystem;
pub use world::{BodyId, Fixture, Shape, TimeStep, World};
