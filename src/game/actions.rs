//! State transitions
//!
//! Every transition validates first and mutates second, and appends at
//! least one log entry when it succeeds.

use crate::core::{CardInstance, Move, Pos, Side};
use crate::game::effects::{EffectContext, EffectHelpers, PrepareOutcome};
use crate::game::engine::GameEngine;
use crate::game::state::{
    ActionMetadata, ActionStatus, CounterWindow, DraftState, GameStatus, LogKind, PendingAction,
    TargetChoice, TargetRequest, VisualEvent, VisualRole,
};
use crate::game::GamePhase;
use crate::zones::DiscardReason;
use crate::{GameError, Result};

fn expect_phase(state: &GameStatus, expected: GamePhase) -> Result<()> {
    if state.phase == GamePhase::GameOver {
        return Err(GameError::GameOver);
    }
    if state.phase != expected {
        return Err(GameError::WrongPhase {
            expected: expected.name(),
            actual: state.phase.name(),
        });
    }
    Ok(())
}

impl GameEngine {
    /// Replace zero or more opening cards. Play begins once both sides confirmed.
    pub fn mulligan(&self, state: &mut GameStatus, side: Side, replace: &[usize]) -> Result<()> {
        expect_phase(state, GamePhase::Setup)?;
        if state.mulligan_done[side] {
            return Err(GameError::InvalidAction(format!("{side} already kept their hand")));
        }
        let mut indices = replace.to_vec();
        indices.sort_unstable();
        indices.dedup();
        if indices.len() != replace.len() {
            return Err(GameError::InvalidAction("duplicate mulligan index".to_string()));
        }
        if let Some(&bad) = indices.iter().find(|&&i| i >= state.zones[side].hand.len()) {
            return Err(GameError::HandIndex(bad));
        }

        let turn = state.turn;
        for &index in indices.iter().rev() {
            if let Some(card) = state.zones[side].hand.take(index) {
                state.zones[side]
                    .graveyard
                    .add(card, DiscardReason::Mulligan, turn);
            }
        }
        for _ in 0..indices.len() {
            self.draw_card(state, side);
        }
        state.mulligan_done[side] = true;
        let message = if indices.is_empty() {
            "keeps the opening hand".to_string()
        } else {
            format!("replaces {} card(s)", indices.len())
        };
        state.log(LogKind::Setup, Some(side), message);

        if state.mulligan_done.a && state.mulligan_done.b {
            state.phase = GamePhase::Playing;
            let first = state.current;
            state.log(LogKind::Setup, Some(first), "moves first");
        }
        Ok(())
    }

    pub fn place_stone(&self, state: &mut GameStatus, side: Side, pos: Pos) -> Result<()> {
        expect_phase(state, GamePhase::Playing)?;
        if state.draft.is_some() {
            return Err(GameError::InvalidAction("a draft pick is pending".to_string()));
        }
        if side != state.current {
            return Err(GameError::NotYourTurn(side));
        }
        if !state.is_idle() {
            return Err(GameError::PendingInProgress);
        }
        let status = &state.statuses[side];
        if status.is_frozen() {
            return Err(GameError::Frozen(side));
        }
        if status.is_skipping() {
            return Err(GameError::Skipped(side));
        }
        if !state.board.in_bounds(pos) {
            return Err(GameError::OutOfBounds(pos));
        }
        if state.board.get(pos).is_some() {
            return Err(GameError::Occupied(pos));
        }
        if status.active_seal(state.turn) == Some(pos) {
            return Err(GameError::SealedCell(pos, side));
        }

        state.board.place(pos, side);
        state.move_count += 1;
        state.log(LogKind::Move, Some(side), format!("places a stone at {pos}"));

        if state.board.check_win(side) {
            state.winner = Some(side);
            let entry = state.timeline_entry(Some(side), Some(Move { pos, side }));
            state.timeline.push(entry);
            self.settle(state);
            return Ok(());
        }
        if state.board.is_full() {
            state.phase = GamePhase::GameOver;
            state.log(LogKind::GameOver, None, "The board is full; the game is a draw");
            return Ok(());
        }
        self.hand_off(state, Some(Move { pos, side }));
        Ok(())
    }

    pub fn play_card(&self, state: &mut GameStatus, side: Side, hand_index: usize, now_ms: u64) -> Result<()> {
        let card = self.check_play(state, side, hand_index)?;
        let instance = state.zones[side]
            .hand
            .take(hand_index)
            .ok_or(GameError::HandIndex(hand_index))?;

        let mut action = PendingAction {
            id: state.next_id(),
            owner: side,
            card: instance,
            hand_index,
            effect: card.effect,
            params: card.params.clone(),
            selection: None,
            metadata: ActionMetadata::default(),
            status: ActionStatus::Pending,
            countering: None,
        };
        state.log(LogKind::Card, Some(side), format!("plays {}", card.name));
        state.visual_events.push(VisualEvent {
            effect: card.effect,
            card: card.key.clone(),
            actor: side,
            role: VisualRole::Attacker,
            cell: None,
            owner: None,
        });

        let ctx = EffectContext {
            catalog: &self.catalog,
            rules: &self.rules,
            card,
            countered: None,
        };
        let outcome = self.registry.prepare(state, &action, &ctx);
        for line in &outcome.logs {
            state.log(LogKind::Effect, Some(side), line.clone());
        }

        let PrepareOutcome {
            request,
            metadata,
            cancelled,
            ..
        } = outcome;
        if cancelled {
            let turn = state.turn;
            state.zones[side]
                .graveyard
                .add(action.card, DiscardReason::Fizzled, turn);
            state.log(LogKind::Card, Some(side), format!("{} fizzles", card.name));
            return Ok(());
        }
        if let Some(metadata) = metadata {
            action.metadata = metadata;
        }

        match request {
            Some((options, prompt)) => {
                action.status = ActionStatus::AwaitingTarget;
                state.target_request = Some(TargetRequest {
                    actor: side,
                    action_id: action.id,
                    for_counter: false,
                    options,
                    prompt,
                });
                state.pending_action = Some(action);
                state.phase = GamePhase::CardTargeting;
            }
            None => {
                action.status = ActionStatus::Ready;
                state.pending_action = Some(action);
                self.open_counter_window(state, now_ms);
            }
        }
        Ok(())
    }

    /// Complete the target of the pending action (or pending counter)
    pub fn select_target(&self, state: &mut GameStatus, side: Side, choice: TargetChoice, now_ms: u64) -> Result<()> {
        expect_phase(state, GamePhase::CardTargeting)?;
        let request = state
            .target_request
            .clone()
            .ok_or(GameError::NoPendingAction)?;
        if side != request.actor {
            return Err(GameError::NotYourTurn(side));
        }
        if !request.options.contains(&choice) {
            return Err(GameError::InvalidTarget(format!(
                "{choice} is not one of the offered targets"
            )));
        }

        let slot = if request.for_counter {
            &mut state.pending_counter
        } else {
            &mut state.pending_action
        };
        let action = slot.as_mut().ok_or(GameError::NoPendingAction)?;
        action.selection = Some(choice);
        action.status = ActionStatus::Ready;
        state.target_request = None;
        state.log(LogKind::Card, Some(side), format!("targets {choice}"));

        if request.for_counter {
            self.finish_countered(state)
        } else {
            self.open_counter_window(state, now_ms);
            Ok(())
        }
    }

    /// Answer the counter window: `Some(index)` plays that counter card,
    /// `None` passes and lets the pending action resolve
    pub fn resolve_card(&self, state: &mut GameStatus, side: Side, counter: Option<usize>) -> Result<()> {
        expect_phase(state, GamePhase::CounterWindow)?;
        let window = state.counter_window.ok_or(GameError::NoPendingAction)?;
        if side != window.responder {
            return Err(GameError::NotYourTurn(side));
        }
        let Some(index) = counter else {
            state.log(LogKind::Counter, Some(side), "passes");
            return self.finish_uncontested(state);
        };

        let original = state
            .pending_action
            .clone()
            .ok_or(GameError::NoPendingAction)?;
        let original_card = self.catalog.require_card(original.card_key())?;
        let held = state.zones[side]
            .hand
            .get(index)
            .ok_or(GameError::HandIndex(index))?;
        let counter_card = self.catalog.require_card(&held.card)?;
        if !counter_card.effect.is_counter() {
            return Err(GameError::InvalidAction(format!(
                "{} is not a counter card",
                counter_card.name
            )));
        }
        if !original_card.is_countered_by(&counter_card.key) {
            return Err(GameError::InvalidTarget(format!(
                "{} cannot answer {}",
                counter_card.name, original_card.name
            )));
        }

        let instance: CardInstance = state.zones[side]
            .hand
            .take(index)
            .ok_or(GameError::HandIndex(index))?;
        let mut pending = PendingAction {
            id: state.next_id(),
            owner: side,
            card: instance,
            hand_index: index,
            effect: counter_card.effect,
            params: counter_card.params.clone(),
            selection: None,
            metadata: ActionMetadata::default(),
            status: ActionStatus::Pending,
            countering: Some(original.id),
        };
        state.counter_window = None;
        state.log(
            LogKind::Counter,
            Some(side),
            format!("answers {} with {}", original_card.name, counter_card.name),
        );
        state.visual_events.push(VisualEvent {
            effect: counter_card.effect,
            card: counter_card.key.clone(),
            actor: side,
            role: VisualRole::Counter,
            cell: None,
            owner: None,
        });

        let ctx = EffectContext {
            catalog: &self.catalog,
            rules: &self.rules,
            card: counter_card,
            countered: Some(&original),
        };
        let outcome = self.registry.prepare(state, &pending, &ctx);
        for line in &outcome.logs {
            state.log(LogKind::Effect, Some(side), line.clone());
        }
        if outcome.cancelled {
            let turn = state.turn;
            state.zones[side]
                .graveyard
                .add(pending.card, DiscardReason::Fizzled, turn);
            state.log(LogKind::Counter, Some(side), format!("{} fizzles", counter_card.name));
            return self.finish_uncontested(state);
        }
        if let Some(metadata) = outcome.metadata {
            pending.metadata = metadata;
        }
        match outcome.request {
            Some((options, prompt)) => {
                pending.status = ActionStatus::AwaitingTarget;
                state.target_request = Some(TargetRequest {
                    actor: side,
                    action_id: pending.id,
                    for_counter: true,
                    options,
                    prompt,
                });
                state.pending_counter = Some(pending);
                state.phase = GamePhase::CardTargeting;
                Ok(())
            }
            None => {
                pending.status = ActionStatus::Ready;
                state.pending_counter = Some(pending);
                self.finish_countered(state)
            }
        }
    }

    /// Take back the pending card before any counter has been played
    pub fn cancel_pending(&self, state: &mut GameStatus, side: Side) -> Result<()> {
        if state.is_over() {
            return Err(GameError::GameOver);
        }
        let action = state
            .pending_action
            .clone()
            .ok_or(GameError::NoPendingAction)?;
        if action.owner != side {
            return Err(GameError::NotYourTurn(side));
        }
        if state.pending_counter.is_some() {
            return Err(GameError::InvalidAction(
                "a counter is already being resolved".to_string(),
            ));
        }
        state.clear_resolution();
        let name = self
            .catalog
            .card(action.card_key())
            .map(|c| c.name.to_string())
            .unwrap_or_else(|| action.card_key().to_string());
        state.zones[side].hand.restore(action.hand_index, action.card);
        state.phase = GamePhase::Playing;
        state.log(LogKind::Card, Some(side), format!("takes back {name}"));
        Ok(())
    }

    pub fn select_draft_option(&self, state: &mut GameStatus, side: Side, option: usize) -> Result<()> {
        if state.is_over() {
            return Err(GameError::GameOver);
        }
        let draft = state
            .draft
            .clone()
            .ok_or_else(|| GameError::InvalidAction("no draft in progress".to_string()))?;
        if draft.side != side {
            return Err(GameError::NotYourTurn(side));
        }
        if option >= draft.options.len() {
            return Err(GameError::InvalidTarget(format!(
                "draft option {option} of {}",
                draft.options.len()
            )));
        }

        let mut options = draft.options;
        let picked = options.remove(option);
        for rest in options {
            state.draw_pile.insert(0, rest);
        }
        let name = self
            .catalog
            .card(&picked)
            .map(|c| c.name.to_string())
            .unwrap_or_else(|| picked.to_string());
        let instance = CardInstance {
            id: state.next_id(),
            card: picked,
        };
        state.zones[side].hand.add(instance);
        state.draft = None;
        state.log(LogKind::Draft, Some(side), format!("drafts {name}"));
        self.start_next_draft(state);
        Ok(())
    }

    /// Let a frozen or skipping current player sit out without placing a stone
    pub fn advance_if_blocked(&self, state: &mut GameStatus) -> Result<bool> {
        if state.phase != GamePhase::Playing || !state.is_idle() || state.draft.is_some() {
            return Ok(false);
        }
        let current = state.current;
        let status = &mut state.statuses[current];
        let message = if status.freeze_turns > 0 {
            status.freeze_turns -= 1;
            format!("is frozen and sits out ({} left)", status.freeze_turns)
        } else if status.skip_turns > 0 {
            status.skip_turns -= 1;
            format!("skips the turn ({} left)", status.skip_turns)
        } else {
            return Ok(false);
        };
        state.log(LogKind::Status, Some(current), message);
        self.hand_off(state, None);
        Ok(true)
    }

    /// Resolve an expired counter window uncontested. Returns true if it did.
    pub fn tick(&self, state: &mut GameStatus, now_ms: u64) -> Result<bool> {
        if state.phase != GamePhase::CounterWindow {
            return Ok(false);
        }
        match state.counter_window {
            Some(window) if window.is_expired(now_ms) => {
                state.log(
                    LogKind::Counter,
                    Some(window.responder),
                    "lets the counter window expire",
                );
                self.finish_uncontested(state)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn open_counter_window(&self, state: &mut GameStatus, now_ms: u64) {
        let Some(action) = &state.pending_action else {
            return;
        };
        let action_id = action.id;
        let responder = action.owner.opponent();
        let id = state.next_id();
        state.counter_window = Some(CounterWindow {
            id,
            action_id,
            responder,
            opened_at_ms: now_ms,
            expires_at_ms: now_ms + self.rules.counter_window_ms,
        });
        state.phase = GamePhase::CounterWindow;
        state.log(
            LogKind::Status,
            Some(responder),
            format!(
                "may answer within {:.1}s",
                self.rules.counter_window_ms as f64 / 1000.0
            ),
        );
    }

    /// The pending action resolves with no counter
    fn finish_uncontested(&self, state: &mut GameStatus) -> Result<()> {
        let action = state
            .pending_action
            .clone()
            .ok_or(GameError::NoPendingAction)?;
        let card = self.catalog.require_card(action.card_key())?;
        state.clear_resolution();

        let ctx = EffectContext {
            catalog: &self.catalog,
            rules: &self.rules,
            card,
            countered: None,
        };
        self.registry
            .resolve(&action, &ctx, &mut EffectHelpers::new(state, action.owner));
        let turn = state.turn;
        state.zones[action.owner]
            .graveyard
            .add(action.card, DiscardReason::Played, turn);
        self.settle(state);
        Ok(())
    }

    /// The pending counter resolves and the original card is discarded unresolved
    fn finish_countered(&self, state: &mut GameStatus) -> Result<()> {
        let original = state
            .pending_action
            .clone()
            .ok_or(GameError::NoPendingAction)?;
        let counter = state
            .pending_counter
            .clone()
            .ok_or(GameError::NoPendingAction)?;
        let counter_card = self.catalog.require_card(counter.card_key())?;
        let original_name = self
            .catalog
            .card(original.card_key())
            .map(|c| c.name.to_string())
            .unwrap_or_else(|| original.card_key().to_string());
        state.clear_resolution();

        let ctx = EffectContext {
            catalog: &self.catalog,
            rules: &self.rules,
            card: counter_card,
            countered: Some(&original),
        };
        self.registry
            .resolve(&counter, &ctx, &mut EffectHelpers::new(state, counter.owner));
        let turn = state.turn;
        state.zones[original.owner]
            .graveyard
            .add(original.card, DiscardReason::Countered, turn);
        state.zones[counter.owner]
            .graveyard
            .add(counter.card, DiscardReason::Counter, turn);
        state.log(
            LogKind::Counter,
            Some(counter.owner),
            format!("{original_name} is countered"),
        );
        self.settle(state);
        Ok(())
    }

    /// Back to `Playing`, or to `GameOver` once someone has won
    fn settle(&self, state: &mut GameStatus) {
        match state.winner {
            Some(winner) => {
                state.phase = GamePhase::GameOver;
                state.log(LogKind::GameOver, Some(winner), "wins the game");
            }
            None => state.phase = GamePhase::Playing,
        }
    }

    /// End the current turn: record it, then pass play to the next player
    /// who is not frozen or skipping, and open a draft on interval moves
    pub(crate) fn hand_off(&self, state: &mut GameStatus, placed: Option<Move>) {
        let mover = state.current;
        let entry = state.timeline_entry(Some(mover), placed);
        state.timeline.push(entry);

        loop {
            state.turn += 1;
            state.current = state.current.opponent();
            let turn = state.turn;
            for side in Side::ALL {
                state.statuses[side].expire(turn);
            }

            let current = state.current;
            let status = &mut state.statuses[current];
            let message = if status.freeze_turns > 0 {
                status.freeze_turns -= 1;
                format!("is frozen and sits out ({} left)", status.freeze_turns)
            } else if status.skip_turns > 0 {
                status.skip_turns -= 1;
                format!("skips the turn ({} left)", status.skip_turns)
            } else {
                break;
            };
            state.log(LogKind::Status, Some(current), message);
        }

        let interval = self.rules.draft_interval;
        if placed.is_some() && interval > 0 && state.move_count > 0 && state.move_count % interval == 0 {
            let first = state.current;
            state.draft_queue = vec![first, first.opponent()];
            self.start_next_draft(state);
        }
    }

    fn start_next_draft(&self, state: &mut GameStatus) {
        while !state.draft_queue.is_empty() {
            let side = state.draft_queue.remove(0);
            if state.zones[side].hand.len() >= self.rules.max_hand {
                state.log(LogKind::Draft, Some(side), "hand is full; no draft");
                continue;
            }
            let count = self.rules.draft_options.min(state.draw_pile.len());
            if count == 0 {
                state.log(LogKind::Draft, None, "the draw pile is empty");
                state.draft_queue.clear();
                return;
            }
            let options: Vec<_> = (0..count).filter_map(|_| state.draw_pile.pop()).collect();
            state.log(
                LogKind::Draft,
                Some(side),
                format!("drafts from {} card(s)", options.len()),
            );
            state.draft = Some(DraftState { side, options });
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CardKey;

    fn ready() -> (GameEngine, GameStatus) {
        let mut engine = GameEngine::standard().unwrap();
        engine.rules.draft_interval = 0;
        started(engine)
    }

    fn started(engine: GameEngine) -> (GameEngine, GameStatus) {
        let mut state = engine.start(3);
        engine.mulligan(&mut state, Side::A, &[]).unwrap();
        engine.mulligan(&mut state, Side::B, &[]).unwrap();
        (engine, state)
    }

    /// Play stones alternately without creating lines
    fn play_opening(engine: &GameEngine, state: &mut GameStatus, moves: usize) {
        let cells = [(0, 0), (14, 14), (0, 14), (14, 0), (2, 7), (12, 7), (7, 2), (7, 12)];
        for &(r, c) in cells.iter().take(moves) {
            let side = state.current;
            engine.place_stone(state, side, Pos::new(r, c)).unwrap();
        }
    }

    #[test]
    fn test_mulligan_replaces_cards() {
        let engine = GameEngine::standard().unwrap();
        let mut state = engine.start(11);
        let before: Vec<_> = state.zones[Side::A].hand.iter().map(|c| c.id).collect();
        engine.mulligan(&mut state, Side::A, &[0, 2]).unwrap();
        assert_eq!(state.zones[Side::A].hand.len(), 3);
        assert_eq!(state.zones[Side::A].graveyard.count_reason(DiscardReason::Mulligan), 2);
        assert_eq!(state.zones[Side::A].hand.get(0).unwrap().id, before[1]);
        assert_eq!(state.phase, GamePhase::Setup);
        assert!(engine.mulligan(&mut state, Side::A, &[]).is_err());

        engine.mulligan(&mut state, Side::B, &[]).unwrap();
        assert_eq!(state.phase, GamePhase::Playing);
    }

    #[test]
    fn test_mulligan_rejects_bad_indices() {
        let engine = GameEngine::standard().unwrap();
        let mut state = engine.start(11);
        assert!(matches!(engine.mulligan(&mut state, Side::A, &[7]), Err(GameError::HandIndex(7))));
        assert!(engine.mulligan(&mut state, Side::A, &[1, 1]).is_err());
    }

    #[test]
    fn test_place_stone_validation() {
        let (engine, mut state) = ready();
        assert!(matches!(
            engine.place_stone(&mut state, Side::A, Pos::new(15, 3)),
            Err(GameError::OutOfBounds(_))
        ));
        engine.place_stone(&mut state, Side::A, Pos::new(7, 7)).unwrap();
        assert_eq!(state.current, Side::B);
        assert_eq!(state.turn, 2);
        assert!(matches!(
            engine.place_stone(&mut state, Side::B, Pos::new(7, 7)),
            Err(GameError::Occupied(_))
        ));
        assert!(matches!(
            engine.place_stone(&mut state, Side::A, Pos::new(7, 8)),
            Err(GameError::NotYourTurn(Side::A))
        ));
    }

    #[test]
    fn test_five_in_a_row_ends_game() {
        let (engine, mut state) = ready();
        for col in 0..4 {
            engine.place_stone(&mut state, Side::A, Pos::new(0, col)).unwrap();
            engine.place_stone(&mut state, Side::B, Pos::new(5, col)).unwrap();
        }
        engine.place_stone(&mut state, Side::A, Pos::new(0, 4)).unwrap();
        assert_eq!(state.winner, Some(Side::A));
        assert_eq!(state.phase, GamePhase::GameOver);
        assert!(matches!(
            engine.place_stone(&mut state, Side::B, Pos::new(9, 9)),
            Err(GameError::GameOver)
        ));
    }

    #[test]
    fn test_freeze_skips_opponent_turns() {
        let (engine, mut state) = ready();
        play_opening(&engine, &mut state, 4);
        let index = engine.grant_card(&mut state, Side::A, "still-water").unwrap();
        engine.play_card(&mut state, Side::A, index, 0).unwrap();
        assert_eq!(state.phase, GamePhase::CounterWindow);
        engine.resolve_card(&mut state, Side::B, None).unwrap();
        assert_eq!(state.statuses[Side::B].freeze_turns, 2);

        let turn = state.turn;
        engine.place_stone(&mut state, Side::A, Pos::new(4, 4)).unwrap();
        // B sits out twice, so A is up again two turns later each time
        assert_eq!(state.current, Side::A);
        assert_eq!(state.turn, turn + 2);
        engine.place_stone(&mut state, Side::A, Pos::new(4, 5)).unwrap();
        assert_eq!(state.current, Side::A);
        assert_eq!(state.statuses[Side::B].freeze_turns, 0);
        engine.place_stone(&mut state, Side::A, Pos::new(4, 6)).unwrap();
        assert_eq!(state.current, Side::B);
    }

    #[test]
    fn test_remove_card_targets_and_resolves() {
        let (engine, mut state) = ready();
        play_opening(&engine, &mut state, 4);
        let index = engine.grant_card(&mut state, Side::A, "flying-sand").unwrap();
        engine.play_card(&mut state, Side::A, index, 0).unwrap();
        assert_eq!(state.phase, GamePhase::CardTargeting);

        let bad = engine.select_target(&mut state, Side::A, TargetChoice::Cell(Pos::new(0, 0)), 0);
        assert!(matches!(bad, Err(GameError::InvalidTarget(_))));

        engine
            .select_target(&mut state, Side::A, TargetChoice::Cell(Pos::new(14, 14)), 10)
            .unwrap();
        assert_eq!(state.phase, GamePhase::CounterWindow);
        assert_eq!(state.counter_window.unwrap().expires_at_ms, 10 + 8_000);

        assert!(!engine.tick(&mut state, 8_009).unwrap());
        assert!(engine.tick(&mut state, 8_010).unwrap());
        assert_eq!(state.board.get(Pos::new(14, 14)), None);
        assert_eq!(state.side_pool.len(), 1);
        assert!(state.is_idle());
        assert_eq!(state.phase, GamePhase::Playing);
    }

    #[test]
    fn test_counter_prevents_removal() {
        let (engine, mut state) = ready();
        play_opening(&engine, &mut state, 4);
        let sand = engine.grant_card(&mut state, Side::A, "flying-sand").unwrap();
        let answer = engine.grant_card(&mut state, Side::B, "honest-return").unwrap();
        let wrong = engine.grant_card(&mut state, Side::B, "dripping-water").unwrap();

        engine.play_card(&mut state, Side::A, sand, 0).unwrap();
        engine
            .select_target(&mut state, Side::A, TargetChoice::Cell(Pos::new(14, 14)), 0)
            .unwrap();
        let options = engine.counter_options(&state, Side::B);
        assert!(options.contains(&answer));
        assert!(!options.contains(&wrong));
        assert!(matches!(
            engine.resolve_card(&mut state, Side::B, Some(wrong)),
            Err(GameError::InvalidTarget(_))
        ));

        engine.resolve_card(&mut state, Side::B, Some(answer)).unwrap();
        assert_eq!(state.board.get(Pos::new(14, 14)), Some(Side::B));
        assert_eq!(state.zones[Side::A].graveyard.last().unwrap().reason, DiscardReason::Countered);
        assert_eq!(state.zones[Side::B].graveyard.last().unwrap().reason, DiscardReason::Counter);
        assert!(state.is_idle());
    }

    #[test]
    fn test_reverse_victory_and_restore() {
        let (engine, mut state) = ready();
        play_opening(&engine, &mut state, 4);
        let lift = engine.grant_card(&mut state, Side::A, "mountain-lift").unwrap();
        let flip = engine.grant_card(&mut state, Side::B, "polarity-flip").unwrap();
        engine.play_card(&mut state, Side::A, lift, 0).unwrap();
        engine.resolve_card(&mut state, Side::B, Some(flip)).unwrap();
        assert_eq!(state.winner, Some(Side::B));
        assert_eq!(state.phase, GamePhase::GameOver);

        let (engine, mut state) = ready();
        play_opening(&engine, &mut state, 4);
        let lift = engine.grant_card(&mut state, Side::A, "mountain-lift").unwrap();
        let rise = engine.grant_card(&mut state, Side::B, "rise-again").unwrap();
        let board = state.board.clone();
        engine.play_card(&mut state, Side::A, lift, 0).unwrap();
        engine.resolve_card(&mut state, Side::B, Some(rise)).unwrap();
        assert_eq!(state.winner, None);
        assert_eq!(state.board, board);
        assert_eq!(state.phase, GamePhase::Playing);
    }

    #[test]
    fn test_card_without_targets_fizzles() {
        let (engine, mut state) = ready();
        engine.place_stone(&mut state, Side::A, Pos::new(0, 0)).unwrap();
        state.statuses[Side::B].skip_turns = 1;
        assert!(engine.advance_if_blocked(&mut state).unwrap());
        // skills unlock by move count; B has no stone to target
        state.move_count = 4;
        let sand = engine.grant_card(&mut state, Side::A, "flying-sand").unwrap();
        let hand = state.zones[Side::A].hand.len();
        engine.play_card(&mut state, Side::A, sand, 0).unwrap();
        assert_eq!(state.zones[Side::A].hand.len(), hand - 1);
        assert_eq!(state.zones[Side::A].graveyard.last().unwrap().reason, DiscardReason::Fizzled);
        assert!(state.is_idle());
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.current, Side::A);
    }

    #[test]
    fn test_thaw_answers_freeze() {
        let (engine, mut state) = ready();
        play_opening(&engine, &mut state, 4);
        let freeze = engine.grant_card(&mut state, Side::A, "still-water").unwrap();
        engine.play_card(&mut state, Side::A, freeze, 0).unwrap();
        let thaw = engine.grant_card(&mut state, Side::B, "dripping-water").unwrap();
        engine.resolve_card(&mut state, Side::B, Some(thaw)).unwrap();
        assert_eq!(state.statuses[Side::B].freeze_turns, 0);
        assert_eq!(state.zones[Side::A].graveyard.last().unwrap().reason, DiscardReason::Countered);
    }

    #[test]
    fn test_thaw_cannot_answer_skip() {
        let (engine, mut state) = ready();
        play_opening(&engine, &mut state, 4);
        state.statuses[Side::B].freeze_turns = 1;
        let daydream = engine.grant_card(&mut state, Side::A, "daydream").unwrap();
        engine.play_card(&mut state, Side::A, daydream, 0).unwrap();
        let thaw = engine.grant_card(&mut state, Side::B, "dripping-water").unwrap();

        assert!(engine.counter_options(&state, Side::B).is_empty());
        assert!(matches!(
            engine.resolve_card(&mut state, Side::B, Some(thaw)),
            Err(GameError::InvalidTarget(_))
        ));
        engine.resolve_card(&mut state, Side::B, None).unwrap();
        assert_eq!(state.statuses[Side::B].freeze_turns, 1);
        assert_eq!(state.statuses[Side::B].skip_turns, 1);
    }

    #[test]
    fn test_cancel_pending_returns_card() {
        let (engine, mut state) = ready();
        play_opening(&engine, &mut state, 4);
        let index = engine.grant_card(&mut state, Side::A, "sealing-talisman").unwrap();
        let hand_before = state.zones[Side::A].hand.clone();
        engine.play_card(&mut state, Side::A, index, 0).unwrap();
        assert!(matches!(engine.cancel_pending(&mut state, Side::B), Err(GameError::NotYourTurn(_))));
        engine.cancel_pending(&mut state, Side::A).unwrap();
        assert_eq!(state.zones[Side::A].hand, hand_before);
        assert!(state.is_idle());
        assert_eq!(state.phase, GamePhase::Playing);
    }

    #[test]
    fn test_seal_blocks_cell_until_expiry() {
        let (engine, mut state) = ready();
        play_opening(&engine, &mut state, 4);
        let index = engine.grant_card(&mut state, Side::A, "sealing-talisman").unwrap();
        engine.play_card(&mut state, Side::A, index, 0).unwrap();
        engine
            .select_target(&mut state, Side::A, TargetChoice::Cell(Pos::new(7, 7)), 0)
            .unwrap();
        engine.resolve_card(&mut state, Side::B, None).unwrap();
        engine.place_stone(&mut state, Side::A, Pos::new(3, 3)).unwrap();
        assert!(matches!(
            engine.place_stone(&mut state, Side::B, Pos::new(7, 7)),
            Err(GameError::SealedCell(_, Side::B))
        ));
        engine.place_stone(&mut state, Side::B, Pos::new(3, 4)).unwrap();
        engine.place_stone(&mut state, Side::A, Pos::new(10, 3)).unwrap();
        engine.place_stone(&mut state, Side::B, Pos::new(7, 7)).unwrap();
    }

    #[test]
    fn test_fusion_lock_and_character_requirement() {
        let (engine, mut state) = ready();
        play_opening(&engine, &mut state, 4);
        let lure = engine.grant_card(&mut state, Side::A, "lure-away").unwrap();
        assert!(matches!(
            engine.check_play(&state, Side::A, lure),
            Err(GameError::CharacterRequired(_))
        ));

        let summon = engine.grant_card(&mut state, Side::A, "summon-zhang-cheng").unwrap();
        engine.play_card(&mut state, Side::A, summon, 0).unwrap();
        engine.resolve_card(&mut state, Side::B, None).unwrap();
        let lure = state.zones[Side::A]
            .hand
            .iter()
            .position(|c| c.card == CardKey::new("lure-away"))
            .unwrap();
        assert!(matches!(
            engine.check_play(&state, Side::A, lure),
            Err(GameError::FusionLocked(Side::A, _))
        ));
    }

    #[test]
    fn test_advance_if_blocked() {
        let (engine, mut state) = ready();
        assert!(!engine.advance_if_blocked(&mut state).unwrap());
        state.statuses[Side::A].skip_turns = 1;
        assert!(engine.advance_if_blocked(&mut state).unwrap());
        assert_eq!(state.current, Side::B);
        assert_eq!(state.statuses[Side::A].skip_turns, 0);
    }

    #[test]
    fn test_draft_every_interval() {
        let (engine, mut state) = started(GameEngine::standard().unwrap());
        play_opening(&engine, &mut state, 6);
        let draft = state.draft.clone().expect("draft after six moves");
        assert_eq!(draft.side, state.current);
        assert_eq!(draft.options.len(), 3);
        assert!(matches!(
            engine.place_stone(&mut state, draft.side, Pos::new(9, 9)),
            Err(GameError::InvalidAction(_))
        ));

        let hand = state.zones[draft.side].hand.len();
        engine.select_draft_option(&mut state, draft.side, 1).unwrap();
        assert_eq!(state.zones[draft.side].hand.len(), hand + 1);
        assert_eq!(state.zones[draft.side].hand.iter().last().unwrap().card, draft.options[1]);

        let second = state.draft.clone().expect("other player drafts next");
        assert_eq!(second.side, draft.side.opponent());
        engine.select_draft_option(&mut state, second.side, 0).unwrap();
        assert!(state.draft.is_none());
    }
}
