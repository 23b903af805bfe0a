//! Error types for world operations and rule loading

use thiserror::Error;

use crate::components::Position;
use crate::entity::EntityId;

/// A violated world precondition. These indicate caller bugs: every spawn
/// and move site is expected to check the target cell first.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorldError {
    #[error("cell {pos} is already occupied by entity {occupant}")]
    Occupied { pos: Position, occupant: EntityId },

    #[error("position {pos} is outside the world")]
    OutOfBounds { pos: Position },

    #[error("entity {0} does not exist")]
    UnknownEntity(EntityId),

    #[error("no material id left for `{name}`")]
    PaletteFull { name: String },

    #[error("invariant broken for entity {id}: {reason}")]
    Invariant { id: EntityId, reason: &'static str },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("rule file parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{context} refers to unknown item `{item}`")]
    UnknownItem { context: String, item: String },

    #[error("spawn rule refers to species `{0}` which has no parameter entry")]
    UnknownSpecies(String),

    #[error("invalid world settings: {0}")]
    InvalidWorld(&'static str),
}
