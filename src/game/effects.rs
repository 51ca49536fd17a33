//! Skill effect registry
//!
//! Each effect kind maps to a handler with two optional steps:
//! `prepare` runs when the card is played (it may ask for a target or
//! cancel the card outright) and `resolve` runs once the counter window
//! has closed. Handlers only mutate the game through [`EffectHelpers`].
//!
//! A kind without a registered handler is a no-op at both steps.

use crate::config::GameRules;
use crate::core::{
    BoardSnapshot, CardDef, CharacterKey, EffectKind, PlayerStatus, Pos, SealedCell, Side,
};
use crate::game::state::{
    ActionMetadata, GameStatus, LogKind, PendingAction, TargetOptions, VisualEvent, VisualRole,
};
use crate::loader::Catalog;
use crate::zones::RemovedStone;
use rand::seq::SliceRandom;
use rustc_hash::FxHashMap;
use std::fmt;

/// Read-only inputs shared by both handler steps
pub struct EffectContext<'a> {
    pub catalog: &'a Catalog,
    pub rules: &'a GameRules,
    /// Definition of the card being resolved
    pub card: &'a CardDef,
    /// For counters: the pending action being answered
    pub countered: Option<&'a PendingAction>,
}

/// Result of a handler's prepare step
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrepareOutcome {
    /// Target the owner must pick before the card can proceed
    pub request: Option<(TargetOptions, String)>,
    pub metadata: Option<ActionMetadata>,
    /// The card cannot do anything; it fizzles straight to the graveyard
    pub cancelled: bool,
    pub logs: Vec<String>,
}

impl PrepareOutcome {
    pub fn proceed() -> Self {
        Self::default()
    }

    pub fn cancel(reason: impl Into<String>) -> Self {
        PrepareOutcome {
            cancelled: true,
            logs: vec![reason.into()],
            ..Default::default()
        }
    }

    pub fn target(options: TargetOptions, prompt: impl Into<String>) -> Self {
        PrepareOutcome {
            request: Some((options, prompt.into())),
            ..Default::default()
        }
    }

    pub fn with_metadata(mut self, metadata: ActionMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// The only mutation surface handed to `resolve`
pub struct EffectHelpers<'a> {
    state: &'a mut GameStatus,
    actor: Side,
}

impl<'a> EffectHelpers<'a> {
    pub fn new(state: &'a mut GameStatus, actor: Side) -> Self {
        EffectHelpers { state, actor }
    }

    pub fn state(&self) -> &GameStatus {
        self.state
    }

    pub fn log(&mut self, message: impl Into<String>) {
        self.state.log(LogKind::Effect, Some(self.actor), message);
    }

    /// Take the stone at `pos` off the board into the side-pool
    pub fn remove_to_side_pool(&mut self, pos: Pos) -> Option<Side> {
        let owner = self.state.board.remove(pos)?;
        self.state.side_pool.add(RemovedStone {
            pos,
            owner,
            removed_by: self.actor,
            turn: self.state.turn,
        });
        Some(owner)
    }

    /// A uniformly random stone of `side`, drawn from the game's RNG
    pub fn random_stone(&mut self, side: Side) -> Option<Pos> {
        let stones = self.state.board.stones(side);
        stones.choose(&mut self.state.rng).copied()
    }

    pub fn restore_board(&mut self, snapshot: &BoardSnapshot) {
        self.state.board.restore(snapshot);
        self.state.move_count = self.state.board.history().len() as u32;
    }

    /// Restore a timeline entry and drop everything recorded after it
    pub fn rewind_to(&mut self, index: usize) -> bool {
        let Some(entry) = self.state.timeline.get(index).cloned() else {
            return false;
        };
        self.state.board.restore(&entry.board);
        self.state.side_pool = entry.side_pool;
        self.state.characters = entry.characters;
        self.state.timeline.truncate_after(index);
        self.state.move_count = self.state.board.history().len() as u32;
        self.state.epoch += 1;
        true
    }

    pub fn set_winner(&mut self, side: Side) {
        self.state.winner = Some(side);
    }

    pub fn update_status(&mut self, side: Side, f: impl FnOnce(&mut PlayerStatus)) {
        f(&mut self.state.statuses[side]);
    }

    pub fn set_character(&mut self, side: Side, character: Option<CharacterKey>) {
        self.state.characters[side] = character;
    }

    pub fn visual(&mut self, action: &PendingAction, role: VisualRole, cell: Option<Pos>, owner: Option<Side>) {
        self.state.visual_events.push(VisualEvent {
            effect: action.effect,
            card: action.card_key().clone(),
            actor: action.owner,
            role,
            cell,
            owner,
        });
    }

    pub fn turn(&self) -> u32 {
        self.state.turn
    }
}

/// Per-effect behaviour. Both steps default to doing nothing.
pub trait EffectHandler: Send + Sync {
    fn prepare(&self, _state: &GameStatus, _action: &PendingAction, _ctx: &EffectContext<'_>) -> PrepareOutcome {
        PrepareOutcome::proceed()
    }

    fn resolve(&self, _action: &PendingAction, _ctx: &EffectContext<'_>, _helpers: &mut EffectHelpers<'_>) {}
}

struct RemoveToSidePool;

impl EffectHandler for RemoveToSidePool {
    fn prepare(&self, state: &GameStatus, action: &PendingAction, _ctx: &EffectContext<'_>) -> PrepareOutcome {
        let targets = state.board.stones(action.owner.opponent());
        if targets.is_empty() {
            return PrepareOutcome::cancel("no opponent stone to remove");
        }
        PrepareOutcome::target(
            TargetOptions::Cells(targets),
            "Choose an opponent stone to send to Shichahai",
        )
    }

    fn resolve(&self, action: &PendingAction, _ctx: &EffectContext<'_>, helpers: &mut EffectHelpers<'_>) {
        let opponent = action.owner.opponent();
        match action.selected_cell() {
            Some(pos) if helpers.state().board.get(pos) == Some(opponent) => {
                helpers.remove_to_side_pool(pos);
                helpers.visual(action, VisualRole::Attacker, Some(pos), Some(opponent));
                helpers.log(format!("sent the stone at {pos} to Shichahai"));
            }
            Some(pos) => helpers.log(format!("no opponent stone left at {pos}")),
            None => helpers.log("no stone was selected"),
        }
    }
}

struct FreezeOpponent;

impl EffectHandler for FreezeOpponent {
    fn resolve(&self, action: &PendingAction, _ctx: &EffectContext<'_>, helpers: &mut EffectHelpers<'_>) {
        let turns = action.params.u32_or("turns", 1);
        let target = action.owner.opponent();
        helpers.update_status(target, |s| s.freeze_turns += turns);
        helpers.visual(action, VisualRole::Attacker, None, Some(target));
        helpers.log(format!("{target} is frozen for {turns} turn(s)"));
    }
}

struct SkipOpponent;

impl EffectHandler for SkipOpponent {
    fn resolve(&self, action: &PendingAction, _ctx: &EffectContext<'_>, helpers: &mut EffectHelpers<'_>) {
        let turns = action.params.u32_or("turns", 1);
        let target = action.owner.opponent();
        helpers.update_status(target, |s| s.skip_turns += turns);
        helpers.visual(action, VisualRole::Attacker, None, Some(target));
        helpers.log(format!("{target} will skip {turns} turn(s)"));
    }
}

struct DeclareVictory;

impl EffectHandler for DeclareVictory {
    fn prepare(&self, state: &GameStatus, _action: &PendingAction, _ctx: &EffectContext<'_>) -> PrepareOutcome {
        PrepareOutcome::proceed().with_metadata(ActionMetadata {
            pre_win_board: Some(state.board.to_snapshot()),
            ..Default::default()
        })
    }

    fn resolve(&self, action: &PendingAction, _ctx: &EffectContext<'_>, helpers: &mut EffectHelpers<'_>) {
        helpers.set_winner(action.owner);
        helpers.visual(action, VisualRole::Attacker, None, None);
        helpers.log(format!("{} declares victory", action.owner));
    }
}

struct RandomClear;

impl EffectHandler for RandomClear {
    fn prepare(&self, state: &GameStatus, _action: &PendingAction, _ctx: &EffectContext<'_>) -> PrepareOutcome {
        if state.board.is_board_empty() {
            return PrepareOutcome::cancel("the board is already empty");
        }
        PrepareOutcome::proceed()
    }

    fn resolve(&self, action: &PendingAction, _ctx: &EffectContext<'_>, helpers: &mut EffectHelpers<'_>) {
        let per_side = action.params.u32_or("per_side", 1);
        let mut cleared = Vec::new();
        for side in Side::ALL {
            for _ in 0..per_side {
                let Some(pos) = helpers.random_stone(side) else {
                    break;
                };
                helpers.remove_to_side_pool(pos);
                helpers.visual(action, VisualRole::Normal, Some(pos), Some(side));
                cleared.push(pos.to_string());
            }
        }
        if cleared.is_empty() {
            helpers.log("nothing to clear");
        } else {
            helpers.log(format!("cleared {}", cleared.join(", ")));
        }
    }
}

struct TimeRewind;

impl EffectHandler for TimeRewind {
    fn prepare(&self, state: &GameStatus, _action: &PendingAction, _ctx: &EffectContext<'_>) -> PrepareOutcome {
        let targets = state.timeline.rewind_targets();
        if targets.is_empty() {
            return PrepareOutcome::cancel("there is no earlier turn to rewind to");
        }
        PrepareOutcome::target(TargetOptions::Snapshots(targets), "Choose a turn to rewind to")
    }

    fn resolve(&self, action: &PendingAction, _ctx: &EffectContext<'_>, helpers: &mut EffectHelpers<'_>) {
        let Some(index) = action.selected_snapshot() else {
            helpers.log("no snapshot was selected");
            return;
        };
        let turn = helpers.state().timeline.get(index).map(|e| e.turn);
        if helpers.rewind_to(index) {
            helpers.visual(action, VisualRole::Attacker, None, None);
            helpers.log(format!(
                "rewound the board to turn {}",
                turn.unwrap_or_default()
            ));
        } else {
            helpers.log(format!("snapshot #{index} no longer exists"));
        }
    }
}

struct SummonCharacter;

impl SummonCharacter {
    fn character(action: &PendingAction) -> Option<CharacterKey> {
        action.params.get("character").map(CharacterKey::new)
    }
}

impl EffectHandler for SummonCharacter {
    fn prepare(&self, state: &GameStatus, action: &PendingAction, ctx: &EffectContext<'_>) -> PrepareOutcome {
        let Some(character) = Self::character(action) else {
            return PrepareOutcome::cancel("the card names no character");
        };
        if ctx.catalog.character(&character).is_none() {
            return PrepareOutcome::cancel(format!("unknown character '{character}'"));
        }
        if state.characters[action.owner].as_ref() == Some(&character) {
            return PrepareOutcome::cancel(format!("{character} is already on your side"));
        }
        PrepareOutcome::proceed()
    }

    fn resolve(&self, action: &PendingAction, ctx: &EffectContext<'_>, helpers: &mut EffectHelpers<'_>) {
        let Some(character) = Self::character(action) else {
            return;
        };
        let name = ctx
            .catalog
            .character(&character)
            .map(|c| c.name.to_string())
            .unwrap_or_else(|| character.to_string());
        let lock_until = helpers.turn() + 1;
        helpers.set_character(action.owner, Some(character));
        helpers.update_status(action.owner, |s| s.fusion_lock_until = Some(lock_until));
        helpers.visual(action, VisualRole::Normal, None, Some(action.owner));
        helpers.log(format!("{name} joins {}", action.owner));
    }
}

struct BanishCharacter;

impl EffectHandler for BanishCharacter {
    fn prepare(&self, state: &GameStatus, action: &PendingAction, _ctx: &EffectContext<'_>) -> PrepareOutcome {
        if state.characters[action.owner.opponent()].is_none() {
            return PrepareOutcome::cancel("the opponent has no character to banish");
        }
        PrepareOutcome::proceed()
    }

    fn resolve(&self, action: &PendingAction, _ctx: &EffectContext<'_>, helpers: &mut EffectHelpers<'_>) {
        let target = action.owner.opponent();
        let banished = helpers.state().characters[target].clone();
        helpers.set_character(target, None);
        helpers.visual(action, VisualRole::Attacker, None, Some(target));
        match banished {
            Some(character) => helpers.log(format!("{character} was lured away from {target}")),
            None => helpers.log(format!("{target} had no character left")),
        }
    }
}

struct SealCell;

impl EffectHandler for SealCell {
    fn prepare(&self, state: &GameStatus, _action: &PendingAction, _ctx: &EffectContext<'_>) -> PrepareOutcome {
        let cells = state.board.empty_cells();
        if cells.is_empty() {
            return PrepareOutcome::cancel("no empty cell to seal");
        }
        PrepareOutcome::target(TargetOptions::Cells(cells), "Choose an empty cell to seal")
    }

    fn resolve(&self, action: &PendingAction, _ctx: &EffectContext<'_>, helpers: &mut EffectHelpers<'_>) {
        let Some(pos) = action.selected_cell() else {
            helpers.log("no cell was selected");
            return;
        };
        let turns = action.params.u32_or("turns", 1);
        let target = action.owner.opponent();
        let expires_at_turn = helpers.turn() + turns;
        helpers.update_status(target, |s| {
            s.sealed_cell = Some(SealedCell { pos, expires_at_turn })
        });
        helpers.visual(action, VisualRole::Attacker, Some(pos), Some(target));
        helpers.log(format!("sealed {pos} for {target} until turn {expires_at_turn}"));
    }
}

/// Counters validate the family of the card they answer
fn expect_countered(ctx: &EffectContext<'_>, kinds: &[EffectKind]) -> PrepareOutcome {
    match ctx.countered {
        Some(original) if kinds.contains(&original.effect) => PrepareOutcome::proceed(),
        Some(original) => PrepareOutcome::cancel(format!("cannot answer a {} card", original.effect)),
        None => PrepareOutcome::cancel("nothing to counter"),
    }
}

struct CounterPreventRemoval;

impl EffectHandler for CounterPreventRemoval {
    fn prepare(&self, _state: &GameStatus, _action: &PendingAction, ctx: &EffectContext<'_>) -> PrepareOutcome {
        expect_countered(ctx, &[EffectKind::RemoveToSidePool])
    }

    fn resolve(&self, action: &PendingAction, ctx: &EffectContext<'_>, helpers: &mut EffectHelpers<'_>) {
        let cell = ctx.countered.and_then(PendingAction::selected_cell);
        helpers.visual(action, VisualRole::Counter, cell, Some(action.owner));
        helpers.log("the stone stays where it is");
    }
}

struct CounterThaw;

impl EffectHandler for CounterThaw {
    fn prepare(&self, _state: &GameStatus, _action: &PendingAction, ctx: &EffectContext<'_>) -> PrepareOutcome {
        expect_countered(ctx, &[EffectKind::FreezeOpponent])
    }

    /// The countered freeze is discarded unresolved; freezes already in
    /// effect are left alone.
    fn resolve(&self, action: &PendingAction, ctx: &EffectContext<'_>, helpers: &mut EffectHelpers<'_>) {
        let turns = ctx.countered.map_or(0, |a| a.params.u32_or("turns", 1));
        helpers.visual(action, VisualRole::Counter, None, Some(action.owner));
        helpers.log(format!("the {turns}-turn freeze melts before it sets in"));
    }
}

struct CounterReverseVictory;

impl EffectHandler for CounterReverseVictory {
    fn prepare(&self, _state: &GameStatus, _action: &PendingAction, ctx: &EffectContext<'_>) -> PrepareOutcome {
        expect_countered(ctx, &[EffectKind::DeclareVictory])
    }

    fn resolve(&self, action: &PendingAction, _ctx: &EffectContext<'_>, helpers: &mut EffectHelpers<'_>) {
        helpers.set_winner(action.owner);
        helpers.visual(action, VisualRole::Counter, None, Some(action.owner));
        helpers.log(format!("the declared victory turns over to {}", action.owner));
    }
}

struct CounterRestoreBoard;

impl EffectHandler for CounterRestoreBoard {
    fn prepare(&self, _state: &GameStatus, _action: &PendingAction, ctx: &EffectContext<'_>) -> PrepareOutcome {
        let outcome = expect_countered(ctx, &[EffectKind::DeclareVictory]);
        if outcome.cancelled {
            return outcome;
        }
        match ctx.countered.and_then(|a| a.metadata.pre_win_board.as_ref()) {
            Some(_) => outcome,
            None => PrepareOutcome::cancel("no board to restore"),
        }
    }

    fn resolve(&self, action: &PendingAction, ctx: &EffectContext<'_>, helpers: &mut EffectHelpers<'_>) {
        if let Some(snapshot) = ctx.countered.and_then(|a| a.metadata.pre_win_board.as_ref()) {
            helpers.restore_board(snapshot);
        }
        helpers.visual(action, VisualRole::Counter, None, None);
        helpers.log("the table is set back up; the declaration is void");
    }
}

struct CounterCancelFusion;

impl EffectHandler for CounterCancelFusion {
    fn prepare(&self, _state: &GameStatus, _action: &PendingAction, ctx: &EffectContext<'_>) -> PrepareOutcome {
        let Some(original) = ctx.countered else {
            return PrepareOutcome::cancel("nothing to counter");
        };
        match ctx.catalog.card(original.card_key()) {
            Some(card) if card.is_fusion() => PrepareOutcome::proceed(),
            _ => PrepareOutcome::cancel(format!("{} is not a fusion card", original.card_key())),
        }
    }

    fn resolve(&self, action: &PendingAction, _ctx: &EffectContext<'_>, helpers: &mut EffectHelpers<'_>) {
        let target = action.owner.opponent();
        let lock_until = helpers.turn() + 1;
        helpers.update_status(target, |s| s.fusion_lock_until = Some(lock_until));
        helpers.visual(action, VisualRole::Counter, None, Some(target));
        helpers.log(format!("the fusion breaks apart; {target} is fusion-locked"));
    }
}

struct CounterPunish;

impl EffectHandler for CounterPunish {
    fn resolve(&self, action: &PendingAction, _ctx: &EffectContext<'_>, helpers: &mut EffectHelpers<'_>) {
        let turns = action.params.u32_or("turns", 1);
        let target = action.owner.opponent();
        helpers.update_status(target, |s| s.skip_turns += turns);
        helpers.visual(action, VisualRole::Counter, None, Some(target));
        helpers.log(format!("{target} is punished and skips {turns} turn(s)"));
    }
}

/// Handler table keyed by effect kind
pub struct EffectRegistry {
    handlers: FxHashMap<EffectKind, Box<dyn EffectHandler>>,
}

impl EffectRegistry {
    pub fn empty() -> Self {
        EffectRegistry {
            handlers: FxHashMap::default(),
        }
    }

    /// Registry with a handler for every built-in effect
    pub fn with_builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(EffectKind::RemoveToSidePool, Box::new(RemoveToSidePool));
        registry.register(EffectKind::FreezeOpponent, Box::new(FreezeOpponent));
        registry.register(EffectKind::SkipOpponent, Box::new(SkipOpponent));
        registry.register(EffectKind::DeclareVictory, Box::new(DeclareVictory));
        registry.register(EffectKind::RandomClear, Box::new(RandomClear));
        registry.register(EffectKind::TimeRewind, Box::new(TimeRewind));
        registry.register(EffectKind::SummonCharacter, Box::new(SummonCharacter));
        registry.register(EffectKind::BanishCharacter, Box::new(BanishCharacter));
        registry.register(EffectKind::SealCell, Box::new(SealCell));
        registry.register(EffectKind::CounterPreventRemoval, Box::new(CounterPreventRemoval));
        registry.register(EffectKind::CounterThaw, Box::new(CounterThaw));
        registry.register(EffectKind::CounterReverseVictory, Box::new(CounterReverseVictory));
        registry.register(EffectKind::CounterRestoreBoard, Box::new(CounterRestoreBoard));
        registry.register(EffectKind::CounterCancelFusion, Box::new(CounterCancelFusion));
        registry.register(EffectKind::CounterPunish, Box::new(CounterPunish));
        registry
    }

    pub fn register(&mut self, kind: EffectKind, handler: Box<dyn EffectHandler>) {
        self.handlers.insert(kind, handler);
    }

    pub fn prepare(&self, state: &GameStatus, action: &PendingAction, ctx: &EffectContext<'_>) -> PrepareOutcome {
        match self.handlers.get(&action.effect) {
            Some(handler) => handler.prepare(state, action, ctx),
            None => PrepareOutcome::proceed(),
        }
    }

    /// Returns false when no handler is registered (nothing happened)
    pub fn resolve(&self, action: &PendingAction, ctx: &EffectContext<'_>, helpers: &mut EffectHelpers<'_>) -> bool {
        match self.handlers.get(&action.effect) {
            Some(handler) => {
                handler.resolve(action, ctx, helpers);
                true
            }
            None => {
                helpers.log(format!("{} has no effect", action.effect));
                false
            }
        }
    }
}

impl Default for EffectRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

impl fmt::Debug for EffectRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&str> = self.handlers.keys().map(|k| k.id()).collect();
        kinds.sort_unstable();
        f.debug_struct("EffectRegistry").field("handlers", &kinds).finish()
    }
}
