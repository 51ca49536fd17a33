//! Game entity ids with simple integer values

use serde::{Deserialize, Serialize};
use std::fmt;

/// Simple integer ID for game entities
///
/// Card instances, pending actions and counter windows all draw from the same
/// monotonically increasing counter kept in the game status, so ids are unique
/// within a game and stay readable in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u32);

impl EntityId {
    pub fn new(id: u32) -> Self {
        EntityId(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Id of a card instance in a hand or graveyard
pub type CardId = EntityId;

/// Id of a pending action, pending counter or counter window
pub type ActionId = EntityId;

/// Base trait for catalog entries
pub trait GameEntity {
    type Key;

    fn key(&self) -> &Self::Key;
    fn name(&self) -> &str;
}
