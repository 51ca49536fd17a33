//! Game phases

use serde::{Deserialize, Serialize};
use std::fmt;

/// Top-level game phase
///
/// `CardTargeting` and `CounterWindow` are sub-phases entered from and
/// returned to `Playing` while a card is being resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    /// Hands dealt, waiting for both mulligan decisions
    Setup,
    Playing,
    /// A pending action or counter is waiting for its target
    CardTargeting,
    /// The responder may answer the pending action
    CounterWindow,
    GameOver,
}

impl GamePhase {
    pub fn name(self) -> &'static str {
        match self {
            GamePhase::Setup => "setup",
            GamePhase::Playing => "playing",
            GamePhase::CardTargeting => "card_targeting",
            GamePhase::CounterWindow => "counter_window",
            GamePhase::GameOver => "game_over",
        }
    }

    /// A card is mid-resolution
    pub fn is_resolving(self) -> bool {
        matches!(self, GamePhase::CardTargeting | GamePhase::CounterWindow)
    }
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
