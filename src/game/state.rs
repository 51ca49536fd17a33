//! Game status: the aggregate root of a game
//!
//! A `GameStatus` is plain data. The engine never keeps a reference to it
//! between calls; transitions work on a clone and publish the result.

use crate::core::{
    ActionId, Board, BoardSnapshot, CardInstance, CardKey, CharacterKey, EffectKind, EffectParams,
    EntityId, Move, PerSide, PlayerStatus, Pos, Side,
};
use crate::game::GamePhase;
use crate::timeline::{Timeline, TimelineEntry};
use crate::zones::{PlayerZones, SidePool};
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a log line is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    Setup,
    Move,
    Card,
    Counter,
    Effect,
    Status,
    Draft,
    /// A transition was refused; the state is otherwise unchanged
    Rejected,
    GameOver,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub turn: u32,
    pub actor: Option<Side>,
    pub kind: LogKind,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.actor {
            Some(side) => write!(f, "[turn {}] {}: {}", self.turn, side, self.message),
            None => write!(f, "[turn {}] {}", self.turn, self.message),
        }
    }
}

/// Progress of a card mid-resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionStatus {
    Pending,
    AwaitingTarget,
    Ready,
}

/// A player's answer to a target request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetChoice {
    Cell(Pos),
    /// Index into the timeline
    Snapshot(usize),
}

impl fmt::Display for TargetChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetChoice::Cell(pos) => write!(f, "cell {pos}"),
            TargetChoice::Snapshot(index) => write!(f, "snapshot #{index}"),
        }
    }
}

/// Offered choices for a target request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetOptions {
    Cells(Vec<Pos>),
    Snapshots(Vec<usize>),
}

impl TargetOptions {
    pub fn contains(&self, choice: &TargetChoice) -> bool {
        match (self, choice) {
            (TargetOptions::Cells(cells), TargetChoice::Cell(pos)) => cells.contains(pos),
            (TargetOptions::Snapshots(indices), TargetChoice::Snapshot(i)) => indices.contains(i),
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            TargetOptions::Cells(cells) => cells.len(),
            TargetOptions::Snapshots(indices) => indices.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What the acting player must choose to complete a pending action or counter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRequest {
    pub actor: Side,
    pub action_id: ActionId,
    /// The request belongs to the pending counter rather than the pending action
    pub for_counter: bool,
    pub options: TargetOptions,
    pub prompt: String,
}

/// Free-form data a handler stashes between prepare and resolve
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionMetadata {
    /// Board as it was when a victory was declared
    pub pre_win_board: Option<BoardSnapshot>,
    pub notes: EffectParams,
}

/// A card mid-resolution (either the acting card or a counter to it)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAction {
    pub id: ActionId,
    pub owner: Side,
    pub card: CardInstance,
    /// Where the card sat in the hand, so a cancel can put it back
    pub hand_index: usize,
    pub effect: EffectKind,
    pub params: EffectParams,
    pub selection: Option<TargetChoice>,
    pub metadata: ActionMetadata,
    pub status: ActionStatus,
    /// For counters: the pending action being answered
    pub countering: Option<ActionId>,
}

impl PendingAction {
    pub fn card_key(&self) -> &CardKey {
        &self.card.card
    }

    pub fn selected_cell(&self) -> Option<Pos> {
        match self.selection {
            Some(TargetChoice::Cell(pos)) => Some(pos),
            _ => None,
        }
    }

    pub fn selected_snapshot(&self) -> Option<usize> {
        match self.selection {
            Some(TargetChoice::Snapshot(index)) => Some(index),
            _ => None,
        }
    }
}

/// Timed opportunity for the responder to answer a pending action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterWindow {
    pub id: ActionId,
    pub action_id: ActionId,
    pub responder: Side,
    pub opened_at_ms: u64,
    pub expires_at_ms: u64,
}

impl CounterWindow {
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at_ms
    }
}

/// "Pick one of the drawn cards"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftState {
    pub side: Side,
    pub options: Vec<CardKey>,
}

/// How a visual event relates to the card being resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisualRole {
    Attacker,
    Counter,
    Normal,
}

/// Notification for the presentation layer; carries no gameplay meaning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualEvent {
    pub effect: EffectKind,
    pub card: CardKey,
    pub actor: Side,
    pub role: VisualRole,
    pub cell: Option<Pos>,
    pub owner: Option<Side>,
}

/// Complete game status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameStatus {
    pub phase: GamePhase,
    pub board: Board,
    pub current: Side,
    /// Hand-off counter; grows by one per turn step, never rewound
    pub turn: u32,
    /// Stones placed so far (recomputed on rewind)
    pub move_count: u32,
    pub zones: PerSide<PlayerZones>,
    pub side_pool: SidePool,
    pub characters: PerSide<Option<CharacterKey>>,
    pub statuses: PerSide<PlayerStatus>,
    pub pending_action: Option<PendingAction>,
    pub pending_counter: Option<PendingAction>,
    pub target_request: Option<TargetRequest>,
    pub counter_window: Option<CounterWindow>,
    pub log: Vec<LogEntry>,
    pub timeline: Timeline,
    pub winner: Option<Side>,
    pub ai_enabled: bool,
    pub ai_side: Side,
    pub draft: Option<DraftState>,
    /// Players still owed a draft after the current one
    pub draft_queue: Vec<Side>,
    pub mulligan_done: PerSide<bool>,
    pub draw_pile: Vec<CardKey>,
    pub visual_events: Vec<VisualEvent>,
    /// Bumped on every new game and rewind; invalidates derived AI scenarios
    pub epoch: u32,
    next_id: u32,
    pub rng: ChaCha12Rng,
}

impl GameStatus {
    pub fn new(board_size: usize, starting_side: Side, seed: u64) -> Self {
        GameStatus {
            phase: GamePhase::Setup,
            board: Board::new(board_size),
            current: starting_side,
            turn: 1,
            move_count: 0,
            zones: PerSide::default(),
            side_pool: SidePool::default(),
            characters: PerSide::default(),
            statuses: PerSide::default(),
            pending_action: None,
            pending_counter: None,
            target_request: None,
            counter_window: None,
            log: Vec::new(),
            timeline: Timeline::new(),
            winner: None,
            ai_enabled: false,
            ai_side: Side::B,
            draft: None,
            draft_queue: Vec::new(),
            mulligan_done: PerSide::default(),
            draw_pile: Vec::new(),
            visual_events: Vec::new(),
            epoch: 0,
            next_id: 1,
            rng: ChaCha12Rng::seed_from_u64(seed),
        }
    }

    /// Allocate a fresh id for a card instance, action or window
    pub fn next_id(&mut self) -> EntityId {
        let id = EntityId::new(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn log(&mut self, kind: LogKind, actor: Option<Side>, message: impl Into<String>) {
        self.log.push(LogEntry {
            turn: self.turn,
            actor,
            kind,
            message: message.into(),
        });
    }

    pub fn is_over(&self) -> bool {
        self.phase == GamePhase::GameOver
    }

    pub fn is_ai_side(&self, side: Side) -> bool {
        self.ai_enabled && self.ai_side == side
    }

    /// Nothing is mid-resolution
    pub fn is_idle(&self) -> bool {
        self.pending_action.is_none()
            && self.pending_counter.is_none()
            && self.target_request.is_none()
            && self.counter_window.is_none()
    }

    /// Drop every piece of in-flight card resolution at once
    pub fn clear_resolution(&mut self) {
        self.pending_action = None;
        self.pending_counter = None;
        self.target_request = None;
        self.counter_window = None;
    }

    /// Hand the accumulated visual events to the caller
    pub fn take_visual_events(&mut self) -> Vec<VisualEvent> {
        std::mem::take(&mut self.visual_events)
    }

    /// Snapshot of the parts a rewind restores
    pub fn timeline_entry(&self, mover: Option<Side>, placed: Option<Move>) -> TimelineEntry {
        TimelineEntry {
            turn: self.turn,
            mover,
            placed,
            board: self.board.to_snapshot(),
            side_pool: self.side_pool.clone(),
            characters: self.characters.clone(),
        }
    }

    /// Most recent log lines, oldest first
    pub fn recent_log(&self, count: usize) -> &[LogEntry] {
        let start = self.log.len().saturating_sub(count);
        &self.log[start..]
    }
}
