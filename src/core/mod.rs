//! Core game types and entities

pub mod board;
pub mod card;
pub mod entity;
pub mod player;
pub mod types;

pub use board::{Board, BoardSnapshot, Move, Pos, BOARD_SIZE, DIRECTIONS};
pub use card::{
    CardCategory, CardDef, CardInstance, CardTiming, CharacterDef, EffectKind, EffectParams,
    FUSION_TAG,
};
pub use entity::{ActionId, CardId, EntityId, GameEntity};
pub use player::{PerSide, PlayerStatus, SealedCell, Side};
pub use types::{CardKey, CardName, CharacterKey};
