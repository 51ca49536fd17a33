//! Deterministic fallback decisions
//!
//! Used when the remote model is unconfigured, unreachable, or keeps
//! answering with illegal decisions. Never fails: every scenario kind has a
//! mechanical answer.

use crate::ai::scenario::{Decision, Scenario, ScenarioKind};
use crate::analysis::HeuristicEngine;
use crate::core::{Board, EffectKind, Pos, Side, DIRECTIONS};
use crate::game::{GameEngine, GameStatus, TargetOptions};

/// Preference among skill effects, highest first. Effects that can hurt the
/// player who casts them (random clear, time rewind) are never chosen.
fn skill_rank(effect: EffectKind, opponent_hand_empty: bool) -> Option<u8> {
    match effect {
        EffectKind::DeclareVictory if opponent_hand_empty => Some(9),
        EffectKind::RemoveToSidePool if opponent_hand_empty => Some(8),
        EffectKind::FreezeOpponent => Some(7),
        EffectKind::SkipOpponent => Some(6),
        EffectKind::SealCell => Some(5),
        EffectKind::SummonCharacter => Some(4),
        EffectKind::BanishCharacter => Some(3),
        _ => None,
    }
}

/// Draft preference: answers to the strongest threats first, then attacks
fn draft_rank(effect: EffectKind) -> u8 {
    match effect {
        EffectKind::CounterRestoreBoard | EffectKind::CounterReverseVictory => 9,
        EffectKind::DeclareVictory => 8,
        EffectKind::FreezeOpponent => 7,
        EffectKind::CounterPreventRemoval | EffectKind::CounterThaw => 6,
        EffectKind::RemoveToSidePool => 5,
        EffectKind::SkipOpponent => 4,
        EffectKind::SealCell => 3,
        EffectKind::CounterPunish | EffectKind::CounterCancelFusion => 2,
        EffectKind::SummonCharacter | EffectKind::BanishCharacter => 1,
        EffectKind::RandomClear | EffectKind::TimeRewind => 0,
    }
}

fn longest_run(board: &Board, pos: Pos) -> usize {
    match board.get(pos) {
        Some(owner) => DIRECTIONS
            .iter()
            .map(|&dir| board.run_length(pos, owner, dir))
            .max()
            .unwrap_or(0),
        None => 0,
    }
}

#[derive(Debug, Clone, Default)]
pub struct Fallback {
    heuristic: HeuristicEngine,
}

impl Fallback {
    pub fn new(heuristic: HeuristicEngine) -> Self {
        Fallback { heuristic }
    }

    pub fn decide(&self, engine: &GameEngine, scenario: &Scenario, state: &GameStatus) -> Decision {
        match scenario.kind {
            ScenarioKind::Mulligan => Decision::Mulligan { replace: Vec::new() },
            ScenarioKind::Stone => Decision::PlaceStone {
                pos: self.stone(state, scenario.side),
            },
            ScenarioKind::Skill => Decision::PlayCard {
                hand_index: self.skill(engine, scenario, state),
            },
            ScenarioKind::CardTargeting => self.target(scenario, state),
            ScenarioKind::CounterWindow => Decision::CounterOrPass {
                hand_index: self.counter(scenario, state),
            },
        }
    }

    /// The better of our own best attack and the opponent's best attack
    /// (blocking it); ties go to our own move
    pub fn stone(&self, state: &GameStatus, side: Side) -> Pos {
        let board = &state.board;
        let sealed = state.statuses[side].active_seal(state.turn);
        let own = self.heuristic.quick_pick(board, side, sealed);
        let block = self.heuristic.quick_pick(board, side.opponent(), sealed);
        let pick = match (own, block) {
            (Some(own), Some(block)) if block.1 > own.1 => Some(block.0),
            (Some(own), _) => Some(own.0),
            (None, block) => block.map(|b| b.0),
        };
        pick.or_else(|| {
            board
                .empty_cells()
                .into_iter()
                .filter(|p| Some(*p) != sealed)
                .min_by_key(|p| p.chebyshev(board.center()))
        })
        .unwrap_or_else(|| board.center())
    }

    fn skill(&self, engine: &GameEngine, scenario: &Scenario, state: &GameStatus) -> Option<usize> {
        let hand = &state.zones[scenario.side].hand;
        let opponent_hand_empty = state.zones[scenario.side.opponent()].hand.is_empty();
        scenario
            .playable
            .iter()
            .filter_map(|&index| {
                let card = engine.catalog().card(&hand.get(index)?.card)?;
                Some((skill_rank(card.effect, opponent_hand_empty)?, index))
            })
            .max_by(|a, b| a.0.cmp(&b.0).then_with(|| b.1.cmp(&a.1)))
            .map(|(_, index)| index)
    }

    fn target(&self, scenario: &Scenario, state: &GameStatus) -> Decision {
        let board = &state.board;
        match &scenario.options {
            Some(TargetOptions::Snapshots(indices)) => Decision::SelectSnapshot {
                index: indices.last().copied().unwrap_or(0),
            },
            Some(TargetOptions::Cells(cells)) => {
                let occupied = cells.iter().all(|&p| board.get(p).is_some());
                let opponent = scenario.side.opponent();
                // first of the best, so earlier options win ties
                let best = cells.iter().copied().fold(None, |best: Option<(Pos, i64)>, pos| {
                    let score = if occupied {
                        longest_run(board, pos) as i64
                    } else {
                        self.heuristic.score_placement(board, pos, opponent).0
                    };
                    match best {
                        Some((_, top)) if top >= score => best,
                        _ => Some((pos, score)),
                    }
                });
                Decision::SelectCell {
                    pos: best.map_or_else(|| board.center(), |(pos, _)| pos),
                }
            }
            None => Decision::SelectCell { pos: board.center() },
        }
    }

    fn counter(&self, scenario: &Scenario, state: &GameStatus) -> Option<usize> {
        let action = state.pending_action.as_ref()?;
        if action.effect != EffectKind::DeclareVictory {
            return None;
        }
        scenario.counter_options.first().copied()
    }

    /// Which of the offered draft cards to take
    pub fn draft_pick(&self, engine: &GameEngine, state: &GameStatus) -> usize {
        let Some(draft) = &state.draft else {
            return 0;
        };
        draft
            .options
            .iter()
            .enumerate()
            .map(|(i, key)| {
                let rank = engine.catalog().card(key).map_or(0, |c| draft_rank(c.effect));
                (rank, i)
            })
            .max_by(|a, b| a.0.cmp(&b.0).then_with(|| b.1.cmp(&a.1)))
            .map_or(0, |(_, i)| i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::scenario::derive_for_side;
    use crate::game::TargetChoice;

    fn ready() -> (GameEngine, GameStatus) {
        let mut engine = GameEngine::standard().unwrap();
        engine.rules.draft_interval = 0;
        let mut state = engine.start(4);
        engine.mulligan(&mut state, Side::A, &[]).unwrap();
        engine.mulligan(&mut state, Side::B, &[]).unwrap();
        (engine, state)
    }

    #[test]
    fn test_blocks_open_four() {
        let (engine, mut state) = ready();
        for col in 3..7 {
            engine.place_stone(&mut state, Side::A, Pos::new(7, col)).unwrap();
            let side = state.current;
            engine.place_stone(&mut state, side, Pos::new(0, col * 2)).unwrap();
        }
        // A threatens five at (7,2) and (7,7); B has nothing better
        let pos = Fallback::default().stone(&state, Side::A.opponent());
        assert!(pos == Pos::new(7, 2) || pos == Pos::new(7, 7), "got {pos}");
    }

    #[test]
    fn test_takes_own_win_over_block() {
        let (engine, mut state) = ready();
        for col in 0..4 {
            engine.place_stone(&mut state, Side::A, Pos::new(3, col)).unwrap();
            engine.place_stone(&mut state, Side::B, Pos::new(9, col + 5)).unwrap();
        }
        assert_eq!(Fallback::default().stone(&state, Side::A), Pos::new(3, 4));
    }

    #[test]
    fn test_empty_board_center() {
        let (_, state) = ready();
        assert_eq!(Fallback::default().stone(&state, Side::A), Pos::new(7, 7));
    }

    #[test]
    fn test_skill_avoids_self_harm_and_guards_removal() {
        let (engine, mut state) = ready();
        for (r, c) in [(0, 0), (14, 14), (0, 14), (14, 0)] {
            let side = state.current;
            engine.place_stone(&mut state, side, Pos::new(r, c)).unwrap();
        }
        state.zones[Side::A].hand.cards.clear();
        let rewind = engine.grant_card(&mut state, Side::A, "time-rewind").unwrap();
        let sand = engine.grant_card(&mut state, Side::A, "flying-sand").unwrap();
        let fallback = Fallback::default();

        let scenario = derive_for_side(&engine, &state, Side::A).remove(0);
        assert_eq!(scenario.kind, ScenarioKind::Skill);
        assert!(scenario.playable.contains(&rewind));
        // B still holds cards, so removal is held back
        assert_eq!(fallback.decide(&engine, &scenario, &state), Decision::PlayCard { hand_index: None });

        state.zones[Side::B].hand.cards.clear();
        let scenario = derive_for_side(&engine, &state, Side::A).remove(0);
        assert_eq!(
            fallback.decide(&engine, &scenario, &state),
            Decision::PlayCard { hand_index: Some(sand) }
        );

        let freeze = engine.grant_card(&mut state, Side::A, "still-water").unwrap();
        let scenario = derive_for_side(&engine, &state, Side::A).remove(0);
        assert_eq!(
            fallback.decide(&engine, &scenario, &state),
            Decision::PlayCard { hand_index: Some(sand) }
        );

        engine.grant_card(&mut state, Side::B, "daydream").unwrap();
        let scenario = derive_for_side(&engine, &state, Side::A).remove(0);
        assert_eq!(
            fallback.decide(&engine, &scenario, &state),
            Decision::PlayCard { hand_index: Some(freeze) }
        );
    }

    #[test]
    fn test_removal_targets_longest_line() {
        let (engine, mut state) = ready();
        for (a, b) in [((0, 0), (10, 10)), ((0, 14), (10, 11)), ((14, 0), (4, 4))] {
            engine.place_stone(&mut state, Side::A, Pos::new(a.0, a.1)).unwrap();
            engine.place_stone(&mut state, Side::B, Pos::new(b.0, b.1)).unwrap();
        }
        let sand = engine.grant_card(&mut state, Side::A, "flying-sand").unwrap();
        engine.play_card(&mut state, Side::A, sand, 0).unwrap();
        let scenario = derive_for_side(&engine, &state, Side::A).remove(0);
        let decision = Fallback::default().decide(&engine, &scenario, &state);
        assert_eq!(decision, Decision::SelectCell { pos: Pos::new(10, 10) });
    }

    #[test]
    fn test_counters_only_declared_victory() {
        let (engine, mut state) = ready();
        for (r, c) in [(0, 0), (14, 14), (0, 14), (14, 0)] {
            let side = state.current;
            engine.place_stone(&mut state, side, Pos::new(r, c)).unwrap();
        }
        let sand = engine.grant_card(&mut state, Side::A, "flying-sand").unwrap();
        engine.grant_card(&mut state, Side::B, "honest-return").unwrap();
        engine.play_card(&mut state, Side::A, sand, 0).unwrap();
        engine
            .select_target(&mut state, Side::A, TargetChoice::Cell(Pos::new(14, 14)), 0)
            .unwrap();
        let scenario = derive_for_side(&engine, &state, Side::B).remove(0);
        assert!(!scenario.counter_options.is_empty());
        let fallback = Fallback::default();
        assert_eq!(
            fallback.decide(&engine, &scenario, &state),
            Decision::CounterOrPass { hand_index: None }
        );

        let (engine, mut state) = ready();
        for (r, c) in [(0, 0), (14, 14), (0, 14), (14, 0)] {
            let side = state.current;
            engine.place_stone(&mut state, side, Pos::new(r, c)).unwrap();
        }
        let lift = engine.grant_card(&mut state, Side::A, "mountain-lift").unwrap();
        let rise = engine.grant_card(&mut state, Side::B, "rise-again").unwrap();
        engine.play_card(&mut state, Side::A, lift, 0).unwrap();
        let scenario = derive_for_side(&engine, &state, Side::B).remove(0);
        let Decision::CounterOrPass { hand_index: Some(index) } = fallback.decide(&engine, &scenario, &state) else {
            panic!("expected a counter");
        };
        assert!(scenario.counter_options.contains(&index));
        assert!(scenario.counter_options.contains(&rise));
    }
}
