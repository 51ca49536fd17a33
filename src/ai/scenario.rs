//! Scenario derivation: which decisions the AI side owes right now
//!
//! Derivation is a pure function of the game status. Every scenario carries
//! a key built only from state, so deriving twice from an unchanged status
//! yields the same keys, and acting on a scenario changes the state the next
//! key is built from.

use crate::core::{Pos, Side};
use crate::game::{GameEngine, GamePhase, GameStatus, TargetOptions};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScenarioKind {
    Mulligan,
    Skill,
    Stone,
    CardTargeting,
    CounterWindow,
}

impl ScenarioKind {
    pub const ALL: [ScenarioKind; 5] = [
        ScenarioKind::Mulligan,
        ScenarioKind::Skill,
        ScenarioKind::Stone,
        ScenarioKind::CardTargeting,
        ScenarioKind::CounterWindow,
    ];

    pub fn id(self) -> &'static str {
        match self {
            ScenarioKind::Mulligan => "mulligan",
            ScenarioKind::Skill => "skill",
            ScenarioKind::Stone => "stone",
            ScenarioKind::CardTargeting => "card-targeting",
            ScenarioKind::CounterWindow => "counter-window",
        }
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Dedup key of a decision point
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScenarioKey(String);

impl ScenarioKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScenarioKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One AI-actionable decision point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub kind: ScenarioKind,
    pub side: Side,
    pub key: ScenarioKey,
    /// Skill: hand indices that may legally be played
    pub playable: Vec<usize>,
    /// Card targeting: the offered choices
    pub options: Option<TargetOptions>,
    pub prompt: Option<String>,
    /// Counter window: hand indices that may answer the pending card
    pub counter_options: Vec<usize>,
}

impl Scenario {
    fn new(kind: ScenarioKind, side: Side, key: String) -> Self {
        Scenario {
            kind,
            side,
            key: ScenarioKey(key),
            playable: Vec::new(),
            options: None,
            prompt: None,
            counter_options: Vec::new(),
        }
    }
}

/// Canonical AI decision, independent of where it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Decision {
    PlaceStone { pos: Pos },
    /// `None` declines to play a card this turn
    PlayCard { hand_index: Option<usize> },
    SelectCell { pos: Pos },
    SelectSnapshot { index: usize },
    /// `None` lets the pending card resolve
    CounterOrPass { hand_index: Option<usize> },
    Mulligan { replace: Vec<usize> },
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::PlaceStone { pos } => write!(f, "place a stone at {pos}"),
            Decision::PlayCard { hand_index: Some(i) } => write!(f, "play hand card #{i}"),
            Decision::PlayCard { hand_index: None } => write!(f, "play no card"),
            Decision::SelectCell { pos } => write!(f, "target {pos}"),
            Decision::SelectSnapshot { index } => write!(f, "rewind to snapshot #{index}"),
            Decision::CounterOrPass { hand_index: Some(i) } => write!(f, "counter with hand card #{i}"),
            Decision::CounterOrPass { hand_index: None } => write!(f, "pass"),
            Decision::Mulligan { replace } if replace.is_empty() => write!(f, "keep the opening hand"),
            Decision::Mulligan { replace } => write!(f, "replace hand cards {replace:?}"),
        }
    }
}

fn join(indices: &[usize]) -> String {
    indices
        .iter()
        .map(usize::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Scenarios for the AI-controlled side; empty unless AI control is on and
/// no draft pick is pending
pub fn derive_scenarios(engine: &GameEngine, state: &GameStatus) -> Vec<Scenario> {
    if !state.ai_enabled || state.draft.is_some() {
        return Vec::new();
    }
    derive_for_side(engine, state, state.ai_side)
}

/// Scenarios `side` owes, ignoring whether AI control is on
pub fn derive_for_side(engine: &GameEngine, state: &GameStatus, side: Side) -> Vec<Scenario> {
    let epoch = state.epoch;
    let mut out = Vec::new();
    match state.phase {
        GamePhase::GameOver => {}
        GamePhase::Setup => {
            if !state.mulligan_done[side] {
                out.push(Scenario::new(
                    ScenarioKind::Mulligan,
                    side,
                    format!("mulligan:e{epoch}:{}", side.glyph()),
                ));
            }
        }
        GamePhase::CardTargeting => {
            if let Some(request) = state.target_request.as_ref().filter(|r| r.actor == side) {
                let mut scenario = Scenario::new(
                    ScenarioKind::CardTargeting,
                    side,
                    format!(
                        "target:e{epoch}:a{}:{}",
                        request.action_id,
                        if request.for_counter { "counter" } else { "card" }
                    ),
                );
                scenario.options = Some(request.options.clone());
                scenario.prompt = Some(request.prompt.clone());
                out.push(scenario);
            }
        }
        GamePhase::CounterWindow => {
            if let (Some(window), Some(action)) = (&state.counter_window, &state.pending_action) {
                if window.responder == side {
                    let counters = engine.counter_options(state, side);
                    let mut scenario = Scenario::new(
                        ScenarioKind::CounterWindow,
                        side,
                        format!(
                            "counter:e{epoch}:a{}:w{}:c{}",
                            action.id,
                            window.id,
                            join(&counters)
                        ),
                    );
                    scenario.counter_options = counters;
                    out.push(scenario);
                }
            }
        }
        GamePhase::Playing => {
            if state.current == side && state.is_idle() && state.draft.is_none() {
                let point = format!("e{epoch}:t{}:h{}", state.turn, state.board.history().len());
                let playable = engine.playable_cards(state, side);
                if !playable.is_empty() {
                    let mut skill = Scenario::new(ScenarioKind::Skill, side, format!("skill:{point}"));
                    skill.playable = playable;
                    out.push(skill);
                }
                // a frozen or skipped side only gets its Anytime cards
                if !state.statuses[side].is_blocked() {
                    out.push(Scenario::new(ScenarioKind::Stone, side, format!("stone:{point}")));
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::TargetChoice;

    fn ai_game() -> (GameEngine, GameStatus) {
        let mut engine = GameEngine::standard().unwrap();
        engine.rules.draft_interval = 0;
        let mut state = engine.start(5);
        state.ai_enabled = true;
        state.ai_side = Side::B;
        (engine, state)
    }

    #[test]
    fn test_disabled_ai_has_no_scenarios() {
        let (engine, mut state) = ai_game();
        state.ai_enabled = false;
        assert!(derive_scenarios(&engine, &state).is_empty());
    }

    #[test]
    fn test_mulligan_then_stone() {
        let (engine, mut state) = ai_game();
        let scenarios = derive_scenarios(&engine, &state);
        assert_eq!(scenarios.len(), 1);
        assert_eq!(scenarios[0].kind, ScenarioKind::Mulligan);

        engine.mulligan(&mut state, Side::A, &[]).unwrap();
        engine.mulligan(&mut state, Side::B, &[]).unwrap();
        // A moves first
        assert!(derive_scenarios(&engine, &state).is_empty());
        engine.place_stone(&mut state, Side::A, Pos::new(7, 7)).unwrap();
        let scenarios = derive_scenarios(&engine, &state);
        // skills are still locked
        assert_eq!(scenarios.len(), 1);
        assert_eq!(scenarios[0].kind, ScenarioKind::Stone);
    }

    #[test]
    fn test_blocked_side_gets_no_stone_scenario() {
        let (engine, mut state) = ai_game();
        engine.mulligan(&mut state, Side::A, &[]).unwrap();
        engine.mulligan(&mut state, Side::B, &[]).unwrap();
        engine.place_stone(&mut state, Side::A, Pos::new(7, 7)).unwrap();

        state.statuses[Side::B].freeze_turns = 1;
        assert!(derive_scenarios(&engine, &state).is_empty());
        state.statuses[Side::B].freeze_turns = 0;
        state.statuses[Side::B].skip_turns = 2;
        assert!(derive_scenarios(&engine, &state).iter().all(|s| s.kind != ScenarioKind::Stone));

        state.statuses[Side::B].skip_turns = 0;
        let scenarios = derive_scenarios(&engine, &state);
        assert_eq!(scenarios.last().map(|s| s.kind), Some(ScenarioKind::Stone));
    }

    #[test]
    fn test_keys_are_stable_and_move_with_state() {
        let (engine, mut state) = ai_game();
        engine.mulligan(&mut state, Side::A, &[]).unwrap();
        engine.mulligan(&mut state, Side::B, &[]).unwrap();
        engine.place_stone(&mut state, Side::A, Pos::new(7, 7)).unwrap();

        let first = derive_scenarios(&engine, &state);
        let again = derive_scenarios(&engine, &state);
        assert_eq!(first, again);

        engine.place_stone(&mut state, Side::B, Pos::new(7, 8)).unwrap();
        engine.place_stone(&mut state, Side::A, Pos::new(0, 0)).unwrap();
        let later = derive_scenarios(&engine, &state);
        let stone_key = |s: &[Scenario]| {
            s.iter()
                .find(|s| s.kind == ScenarioKind::Stone)
                .map(|s| s.key.clone())
        };
        assert_ne!(stone_key(&first), stone_key(&later));

        let mut rewound = state.clone();
        rewound.epoch += 1;
        assert_ne!(stone_key(&later), stone_key(&derive_scenarios(&engine, &rewound)));
    }

    #[test]
    fn test_counter_and_targeting_scenarios() {
        let (engine, mut state) = ai_game();
        engine.mulligan(&mut state, Side::A, &[]).unwrap();
        engine.mulligan(&mut state, Side::B, &[]).unwrap();
        for (r, c) in [(0, 0), (14, 14), (0, 14), (14, 0)] {
            let side = state.current;
            engine.place_stone(&mut state, side, Pos::new(r, c)).unwrap();
        }
        let sand = engine.grant_card(&mut state, Side::A, "flying-sand").unwrap();
        engine.play_card(&mut state, Side::A, sand, 0).unwrap();
        // the targeting request belongs to A, not the AI
        assert!(derive_scenarios(&engine, &state).is_empty());

        engine
            .select_target(&mut state, Side::A, TargetChoice::Cell(Pos::new(14, 14)), 0)
            .unwrap();
        let scenarios = derive_scenarios(&engine, &state);
        assert_eq!(scenarios.len(), 1);
        assert_eq!(scenarios[0].kind, ScenarioKind::CounterWindow);
        let before = scenarios[0].key.clone();

        engine.grant_card(&mut state, Side::B, "honest-return").unwrap();
        let after = derive_scenarios(&engine, &state);
        assert_ne!(after[0].key, before);
        assert!(!after[0].counter_options.is_empty());
    }

    #[test]
    fn test_decision_serde_shape() {
        let json = serde_json::to_string(&Decision::CounterOrPass { hand_index: None }).unwrap();
        assert_eq!(json, r#"{"type":"counter-or-pass","hand_index":null}"#);
    }
}
