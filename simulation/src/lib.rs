//! TileWorld Simulation Engine
//!
//! Tile-based survival world: a material grid with a chunked occupant index,
//! per-species entity state machines and a population balancer, all driven
//! from one seeded random stream.

pub mod components;
pub mod config;
pub mod entity;
pub mod error;
pub mod runner;
pub mod spatial;
pub mod systems;
pub mod terrain;
pub mod world;

pub use components::*;
pub use config::GameConfig;
pub use entity::{Action, EntityId, Kind, Object, Species};
pub use error::{ConfigError, WorldError};
pub use runner::{random_policy, Policy, RunSummary, Runner};
pub use spatial::SpatialWorld;
pub use world::{SimulationWorld, TickReport};
