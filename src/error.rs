//! Error types for the skill gomoku engine

use crate::core::{Pos, Side};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GameError {
    #[error("Invalid catalog format: {0}")]
    InvalidCatalogFormat(String),

    #[error("Card not found: {0}")]
    CardNotFound(String),

    #[error("Character not found: {0}")]
    CharacterNotFound(String),

    #[error("Wrong phase: expected {expected}, game is in {actual}")]
    WrongPhase {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Not {0}'s turn")]
    NotYourTurn(Side),

    #[error("Cell {0} is out of range")]
    OutOfBounds(Pos),

    #[error("Cell {0} is occupied")]
    Occupied(Pos),

    #[error("Cell {0} is sealed for {1}")]
    SealedCell(Pos, Side),

    #[error("{0} is frozen")]
    Frozen(Side),

    #[error("{0} must skip this turn")]
    Skipped(Side),

    #[error("Skills unlock after {required} moves ({moves} played)")]
    SkillLocked { moves: u32, required: u32 },

    #[error("Fusion cards are locked for {0} until turn {1} has passed")]
    FusionLocked(Side, u32),

    #[error("Card requires active character '{0}'")]
    CharacterRequired(String),

    #[error("A card is already being resolved")]
    PendingInProgress,

    #[error("No pending action")]
    NoPendingAction,

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("No card at hand index {0}")]
    HandIndex(usize),

    #[error("Invalid game action: {0}")]
    InvalidAction(String),

    #[error("Game is over")]
    GameOver,

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GameError>;
