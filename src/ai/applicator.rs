//! Decision applicator: maps a decision onto engine commands
//!
//! Scenario-specific legality is checked here first so the reason fed back to
//! the remote model is about the decision, not about engine internals.

use crate::ai::scenario::{Decision, Scenario, ScenarioKind};
use crate::game::{Command, GameEngine, GameStatus, TargetChoice, TargetOptions};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct ApplyError {
    pub reason: String,
}

impl ApplyError {
    fn new(reason: impl Into<String>) -> Self {
        ApplyError { reason: reason.into() }
    }
}

/// The command a decision stands for, after validating it against the scenario.
/// `Ok(None)` means the decision is a legal no-op (declining a skill).
pub fn to_command(
    scenario: &Scenario,
    state: &GameStatus,
    decision: &Decision,
    now_ms: u64,
) -> Result<Option<Command>, ApplyError> {
    let side = scenario.side;
    let command = match (scenario.kind, decision) {
        (ScenarioKind::Stone, Decision::PlaceStone { pos }) => {
            if !state.board.in_bounds(*pos) {
                return Err(ApplyError::new(format!(
                    "row {} col {} is off the {}x{} board",
                    pos.row,
                    pos.col,
                    state.board.size(),
                    state.board.size()
                )));
            }
            if state.board.get(*pos).is_some() {
                return Err(ApplyError::new(format!(
                    "row {} col {} is already occupied",
                    pos.row, pos.col
                )));
            }
            if state.statuses[side].active_seal(state.turn) == Some(*pos) {
                return Err(ApplyError::new(format!(
                    "row {} col {} is sealed for you this turn",
                    pos.row, pos.col
                )));
            }
            Command::PlaceStone { side, pos: *pos }
        }
        (ScenarioKind::Skill, Decision::PlayCard { hand_index: None }) => return Ok(None),
        (ScenarioKind::Skill, Decision::PlayCard { hand_index: Some(index) }) => {
            if !scenario.playable.contains(index) {
                return Err(ApplyError::new(format!(
                    "hand card #{index} cannot be played now; playable: {:?}",
                    scenario.playable
                )));
            }
            Command::PlayCard {
                side,
                hand_index: *index,
                now_ms,
            }
        }
        (ScenarioKind::CardTargeting, Decision::SelectCell { pos }) => {
            let choice = TargetChoice::Cell(*pos);
            match &scenario.options {
                Some(options @ TargetOptions::Cells(_)) if options.contains(&choice) => {}
                _ => {
                    return Err(ApplyError::new(format!(
                        "row {} col {} is not one of the offered cells",
                        pos.row, pos.col
                    )))
                }
            }
            Command::SelectTarget { side, choice, now_ms }
        }
        (ScenarioKind::CardTargeting, Decision::SelectSnapshot { index }) => {
            let choice = TargetChoice::Snapshot(*index);
            match &scenario.options {
                Some(options @ TargetOptions::Snapshots(_)) if options.contains(&choice) => {}
                _ => {
                    return Err(ApplyError::new(format!(
                        "snapshot {index} is not one of the offered snapshots"
                    )))
                }
            }
            Command::SelectTarget { side, choice, now_ms }
        }
        (ScenarioKind::CounterWindow, Decision::CounterOrPass { hand_index }) => {
            if let Some(index) = hand_index {
                if !scenario.counter_options.contains(index) {
                    return Err(ApplyError::new(format!(
                        "hand card #{index} cannot answer this card; usable: {:?}",
                        scenario.counter_options
                    )));
                }
            }
            Command::ResolveCard {
                side,
                counter: *hand_index,
            }
        }
        (ScenarioKind::Mulligan, Decision::Mulligan { replace }) => {
            let hand = state.zones[side].hand.len();
            if let Some(bad) = replace.iter().find(|&&i| i >= hand) {
                return Err(ApplyError::new(format!("hand card #{bad} does not exist")));
            }
            Command::Mulligan {
                side,
                replace: replace.clone(),
            }
        }
        (kind, decision) => {
            return Err(ApplyError::new(format!(
                "\"{decision}\" does not answer a {kind} decision"
            )))
        }
    };
    Ok(Some(command))
}

/// Validate and apply a decision, yielding the next status
pub fn apply_decision(
    engine: &GameEngine,
    scenario: &Scenario,
    state: &GameStatus,
    decision: &Decision,
    now_ms: u64,
) -> Result<GameStatus, ApplyError> {
    match to_command(scenario, state, decision, now_ms)? {
        Some(command) => engine
            .apply(state, command)
            .map_err(|e| ApplyError::new(e.to_string())),
        None => Ok(state.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::scenario::derive_for_side;
    use crate::core::{Pos, Side};

    fn targeting() -> (GameEngine, GameStatus, Scenario) {
        let mut engine = GameEngine::standard().unwrap();
        engine.rules.draft_interval = 0;
        let mut state = engine.start(2);
        engine.mulligan(&mut state, Side::A, &[]).unwrap();
        engine.mulligan(&mut state, Side::B, &[]).unwrap();
        for (r, c) in [(0, 0), (14, 14), (0, 14), (14, 0)] {
            let side = state.current;
            engine.place_stone(&mut state, side, Pos::new(r, c)).unwrap();
        }
        let sand = engine.grant_card(&mut state, Side::A, "flying-sand").unwrap();
        engine.play_card(&mut state, Side::A, sand, 0).unwrap();
        let scenario = derive_for_side(&engine, &state, Side::A).pop().unwrap();
        (engine, state, scenario)
    }

    #[test]
    fn test_select_cell_outside_options() {
        let (engine, state, scenario) = targeting();
        assert_eq!(scenario.kind, ScenarioKind::CardTargeting);
        let err = apply_decision(&engine, &scenario, &state, &Decision::SelectCell { pos: Pos::new(0, 0) }, 0)
            .unwrap_err();
        assert!(err.reason.contains("not one of the offered cells"));

        let next = apply_decision(&engine, &scenario, &state, &Decision::SelectCell { pos: Pos::new(14, 0) }, 0)
            .unwrap();
        assert!(next.counter_window.is_some());
    }

    #[test]
    fn test_place_on_occupied_cell() {
        let mut engine = GameEngine::standard().unwrap();
        engine.rules.draft_interval = 0;
        let mut state = engine.start(2);
        engine.mulligan(&mut state, Side::A, &[]).unwrap();
        engine.mulligan(&mut state, Side::B, &[]).unwrap();
        engine.place_stone(&mut state, Side::A, Pos::new(7, 7)).unwrap();
        let scenario = derive_for_side(&engine, &state, Side::B).pop().unwrap();

        let err = apply_decision(&engine, &scenario, &state, &Decision::PlaceStone { pos: Pos::new(7, 7) }, 0)
            .unwrap_err();
        assert!(err.reason.contains("occupied"));
        let err = apply_decision(&engine, &scenario, &state, &Decision::PlaceStone { pos: Pos::new(20, 1) }, 0)
            .unwrap_err();
        assert!(err.reason.contains("off the"));
        let err = apply_decision(&engine, &scenario, &state, &Decision::CounterOrPass { hand_index: None }, 0)
            .unwrap_err();
        assert!(err.reason.contains("does not answer a stone decision"));
    }

    #[test]
    fn test_declining_a_skill_is_a_no_op() {
        let (engine, state, _) = targeting();
        let scenario = Scenario {
            kind: ScenarioKind::Skill,
            ..derive_for_side(&engine, &state, Side::A).pop().unwrap()
        };
        let next = apply_decision(&engine, &scenario, &state, &Decision::PlayCard { hand_index: None }, 0).unwrap();
        assert_eq!(next.log.len(), state.log.len());
    }
}
