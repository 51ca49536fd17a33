//! Skill Gomoku - 15x15 gomoku with a card-based skill layer
//!
//! The game engine is a pure state machine over [`game::GameStatus`];
//! skill cards resolve through an effect registry with counter windows;
//! the [`ai`] layer decides for an AI-controlled side through a remote
//! language-model endpoint or the local heuristic engine in [`analysis`].

pub mod ai;
pub mod analysis;
pub mod config;
pub mod core;
pub mod error;
pub mod game;
pub mod loader;
pub mod timeline;
pub mod tournament;
pub mod zones;

pub use error::{GameError, Result};
