//! Game engine: owns the catalog, rules and effect registry, and turns
//! commands into new game states
//!
//! The engine holds no game state itself. `apply` clones the status it is
//! given, runs the transition on the copy and returns it, so a rejected
//! command leaves the caller's status untouched.

use crate::config::GameRules;
use crate::core::{CardDef, CardInstance, CardKey, CardTiming, Pos, Side};
use crate::game::effects::EffectRegistry;
use crate::game::state::{GameStatus, LogKind, TargetChoice};
use crate::game::GamePhase;
use crate::loader::Catalog;
use crate::{GameError, Result};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A state transition request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    Mulligan { side: Side, replace: Vec<usize> },
    PlaceStone { side: Side, pos: Pos },
    PlayCard { side: Side, hand_index: usize, now_ms: u64 },
    SelectTarget { side: Side, choice: TargetChoice, now_ms: u64 },
    /// The responder answers the counter window with a counter card, or passes
    ResolveCard { side: Side, counter: Option<usize> },
    CancelPending { side: Side },
    SelectDraft { side: Side, option: usize },
    AdvanceIfBlocked,
    Tick { now_ms: u64 },
}

/// Stateless transition engine shared by every game that uses the same catalog
#[derive(Debug, Clone)]
pub struct GameEngine {
    pub(crate) catalog: Arc<Catalog>,
    pub(crate) registry: Arc<EffectRegistry>,
    pub(crate) rules: GameRules,
}

impl GameEngine {
    pub fn new(catalog: Arc<Catalog>, rules: GameRules) -> Self {
        Self::with_registry(catalog, Arc::new(EffectRegistry::with_builtin()), rules)
    }

    pub fn with_registry(catalog: Arc<Catalog>, registry: Arc<EffectRegistry>, rules: GameRules) -> Self {
        GameEngine {
            catalog,
            registry,
            rules,
        }
    }

    /// Engine over the built-in card set with default rules
    pub fn standard() -> Result<Self> {
        Ok(Self::new(Arc::new(Catalog::standard()?), GameRules::default()))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    pub fn registry(&self) -> &EffectRegistry {
        &self.registry
    }

    /// Deal a new game. The status starts in `Setup`, waiting for mulligans.
    pub fn start(&self, seed: u64) -> GameStatus {
        let mut state = GameStatus::new(self.rules.board_size, self.rules.starting_side, seed);
        state.epoch = 1;
        state.draw_pile = self.catalog.draw_pile();
        state.draw_pile.shuffle(&mut state.rng);

        for side in Side::ALL {
            for _ in 0..self.rules.initial_hand {
                self.draw_card(&mut state, side);
            }
        }
        let opening = state.timeline_entry(None, None);
        state.timeline.push(opening);
        state.log(
            LogKind::Setup,
            None,
            format!(
                "New game (seed {seed}); {} cards dealt to each player",
                self.rules.initial_hand
            ),
        );
        state
    }

    /// Run `command` on a copy of `state`
    pub fn apply(&self, state: &GameStatus, command: Command) -> Result<GameStatus> {
        let mut next = state.clone();
        self.execute(&mut next, command)?;
        Ok(next)
    }

    /// Like [`apply`](Self::apply), but a rejected command still yields a
    /// status: the original one with a `Rejected` log entry appended
    pub fn apply_logged(&self, state: &GameStatus, command: Command) -> (GameStatus, Option<GameError>) {
        let actor = command_actor(&command);
        match self.apply(state, command) {
            Ok(next) => (next, None),
            Err(err) => {
                let mut unchanged = state.clone();
                unchanged.log(LogKind::Rejected, actor, err.to_string());
                (unchanged, Some(err))
            }
        }
    }

    /// Run `command` in place. On error the status may be partially updated;
    /// use [`apply`](Self::apply) when that matters.
    pub fn execute(&self, state: &mut GameStatus, command: Command) -> Result<()> {
        match command {
            Command::Mulligan { side, replace } => self.mulligan(state, side, &replace),
            Command::PlaceStone { side, pos } => self.place_stone(state, side, pos),
            Command::PlayCard {
                side,
                hand_index,
                now_ms,
            } => self.play_card(state, side, hand_index, now_ms),
            Command::SelectTarget {
                side,
                choice,
                now_ms,
            } => self.select_target(state, side, choice, now_ms),
            Command::ResolveCard { side, counter } => self.resolve_card(state, side, counter),
            Command::CancelPending { side } => self.cancel_pending(state, side),
            Command::SelectDraft { side, option } => self.select_draft_option(state, side, option),
            Command::AdvanceIfBlocked => self.advance_if_blocked(state).map(|_| ()),
            Command::Tick { now_ms } => self.tick(state, now_ms).map(|_| ()),
        }
    }

    /// Check every rule for playing the card at `hand_index` on `side`'s turn
    pub fn check_play(&self, state: &GameStatus, side: Side, hand_index: usize) -> Result<&CardDef> {
        match state.phase {
            GamePhase::GameOver => return Err(GameError::GameOver),
            GamePhase::Playing => {}
            other => {
                return Err(GameError::WrongPhase {
                    expected: GamePhase::Playing.name(),
                    actual: other.name(),
                })
            }
        }
        if state.draft.is_some() {
            return Err(GameError::InvalidAction("a draft pick is pending".to_string()));
        }
        if side != state.current {
            return Err(GameError::NotYourTurn(side));
        }
        if !state.is_idle() {
            return Err(GameError::PendingInProgress);
        }
        if state.move_count < self.rules.skill_unlock_moves {
            return Err(GameError::SkillLocked {
                moves: state.move_count,
                required: self.rules.skill_unlock_moves,
            });
        }

        let instance = state.zones[side]
            .hand
            .get(hand_index)
            .ok_or(GameError::HandIndex(hand_index))?;
        let card = self.catalog.require_card(&instance.card)?;

        if card.timing == CardTiming::Reaction {
            return Err(GameError::InvalidAction(format!(
                "{} can only be played to answer a card",
                card.name
            )));
        }
        let status = &state.statuses[side];
        if status.is_blocked() && card.timing != CardTiming::Anytime {
            return Err(if status.is_frozen() {
                GameError::Frozen(side)
            } else {
                GameError::Skipped(side)
            });
        }
        if let Some(required) = &card.requires_character {
            if state.characters[side].as_ref() != Some(required) {
                return Err(GameError::CharacterRequired(required.to_string()));
            }
        }
        if card.is_fusion() && status.fusion_locked(state.turn) {
            let until = status.fusion_lock_until.unwrap_or(state.turn);
            return Err(GameError::FusionLocked(side, until));
        }
        Ok(card)
    }

    /// Hand indices `side` could legally play right now
    pub fn playable_cards(&self, state: &GameStatus, side: Side) -> Vec<usize> {
        (0..state.zones[side].hand.len())
            .filter(|&i| self.check_play(state, side, i).is_ok())
            .collect()
    }

    /// Hand indices of `side`'s cards that may answer the pending action
    pub fn counter_options(&self, state: &GameStatus, side: Side) -> Vec<usize> {
        let Some(action) = &state.pending_action else {
            return Vec::new();
        };
        let Some(original) = self.catalog.card(action.card_key()) else {
            return Vec::new();
        };
        state.zones[side]
            .hand
            .iter()
            .enumerate()
            .filter(|(_, c)| original.is_countered_by(&c.card))
            .filter(|(_, c)| self.catalog.card(&c.card).is_some_and(|d| d.effect.is_counter()))
            .map(|(i, _)| i)
            .collect()
    }

    /// Draw the top card of the pile into `side`'s hand
    pub(crate) fn draw_card(&self, state: &mut GameStatus, side: Side) -> Option<CardInstance> {
        let key = state.draw_pile.pop()?;
        let instance = CardInstance {
            id: state.next_id(),
            card: key,
        };
        state.zones[side].hand.add(instance.clone());
        Some(instance)
    }

    /// Put a specific catalog card into a hand (scenario setup)
    pub fn grant_card(&self, state: &mut GameStatus, side: Side, key: &str) -> Result<usize> {
        let key = CardKey::new(key);
        self.catalog.require_card(&key)?;
        let instance = CardInstance {
            id: state.next_id(),
            card: key,
        };
        state.zones[side].hand.add(instance);
        Ok(state.zones[side].hand.len() - 1)
    }
}

fn command_actor(command: &Command) -> Option<Side> {
    match command {
        Command::Mulligan { side, .. }
        | Command::PlaceStone { side, .. }
        | Command::PlayCard { side, .. }
        | Command::SelectTarget { side, .. }
        | Command::ResolveCard { side, .. }
        | Command::CancelPending { side }
        | Command::SelectDraft { side, .. } => Some(*side),
        Command::AdvanceIfBlocked | Command::Tick { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playing_engine() -> (GameEngine, GameStatus) {
        let engine = GameEngine::standard().unwrap();
        let mut state = engine.start(42);
        engine.mulligan(&mut state, Side::A, &[]).unwrap();
        engine.mulligan(&mut state, Side::B, &[]).unwrap();
        (engine, state)
    }

    #[test]
    fn test_start_deals_hands() {
        let engine = GameEngine::standard().unwrap();
        let state = engine.start(1);
        assert_eq!(state.phase, GamePhase::Setup);
        assert_eq!(state.zones[Side::A].hand.len(), 3);
        assert_eq!(state.zones[Side::B].hand.len(), 3);
        assert_eq!(state.timeline.len(), 1);
        assert_eq!(state.epoch, 1);
    }

    #[test]
    fn test_start_is_deterministic_per_seed() {
        let engine = GameEngine::standard().unwrap();
        let a = engine.start(9);
        let b = engine.start(9);
        assert_eq!(a.zones[Side::A].hand, b.zones[Side::A].hand);
        assert_eq!(a.draw_pile, b.draw_pile);
    }

    #[test]
    fn test_apply_leaves_original_untouched() {
        let (engine, state) = playing_engine();
        let next = engine
            .apply(&state, Command::PlaceStone { side: Side::A, pos: Pos::new(7, 7) })
            .unwrap();
        assert!(state.board.is_board_empty());
        assert_eq!(next.board.get(Pos::new(7, 7)), Some(Side::A));
    }

    #[test]
    fn test_apply_logged_records_rejection() {
        let (engine, state) = playing_engine();
        let (next, err) = engine.apply_logged(&state, Command::PlaceStone { side: Side::B, pos: Pos::new(0, 0) });
        assert!(matches!(err, Some(GameError::NotYourTurn(Side::B))));
        assert!(next.board.is_board_empty());
        assert_eq!(next.log.last().unwrap().kind, LogKind::Rejected);
        assert_eq!(next.log.len(), state.log.len() + 1);
    }

    #[test]
    fn test_skill_lock_blocks_cards() {
        let (engine, mut state) = playing_engine();
        let index = engine.grant_card(&mut state, Side::A, "still-water").unwrap();
        assert!(matches!(
            engine.check_play(&state, Side::A, index),
            Err(GameError::SkillLocked { moves: 0, required: 4 })
        ));
        assert!(engine.playable_cards(&state, Side::A).is_empty());
    }
}
