//! Game rules and AI settings
//!
//! Everything here deserializes with defaults, so a config file only needs
//! the keys it wants to change.

use crate::analysis::HeuristicWeights;
use crate::core::{Side, BOARD_SIZE};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable consulted when no API key is configured
pub const API_KEY_ENV: &str = "SGOMOKU_API_KEY";

/// Rule constants for one game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameRules {
    pub board_size: usize,
    /// Cards dealt to each player at start
    pub initial_hand: usize,
    /// Total stones placed before any card may be played
    pub skill_unlock_moves: u32,
    /// A draft is offered every time the total move count hits a multiple of this
    pub draft_interval: u32,
    pub draft_options: usize,
    pub max_hand: usize,
    /// How long the responder has to answer a card
    pub counter_window_ms: u64,
    pub starting_side: Side,
}

impl Default for GameRules {
    fn default() -> Self {
        GameRules {
            board_size: BOARD_SIZE,
            initial_hand: 3,
            skill_unlock_moves: 4,
            draft_interval: 6,
            draft_options: 3,
            max_hand: 7,
            counter_window_ms: 8_000,
            starting_side: Side::A,
        }
    }
}

/// Remote endpoint and pacing for the AI opponent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiSettings {
    /// Chat-completions style endpoint; empty means "not configured"
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub request_timeout_ms: u64,
    /// Short race used by the smart-fallback strategy
    pub smart_timeout_ms: u64,
    /// Attempts per scenario before the deterministic fallback kicks in
    pub max_attempts: u8,
    /// Artificial pause before the AI acts
    pub think_delay_ms: u64,
    pub temperature: f32,
}

impl Default for AiSettings {
    fn default() -> Self {
        AiSettings {
            endpoint: String::new(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            request_timeout_ms: 20_000,
            smart_timeout_ms: 4_000,
            max_attempts: 3,
            think_delay_ms: 400,
            temperature: 0.2,
        }
    }
}

impl AiSettings {
    pub fn is_configured(&self) -> bool {
        !self.endpoint.trim().is_empty()
    }

    /// Configured key, falling back to the environment
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty()))
    }
}

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub rules: GameRules,
    pub ai: AiSettings,
    pub heuristic: HeuristicWeights,
}

impl AppConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }
}
