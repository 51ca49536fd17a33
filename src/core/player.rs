//! Player sides and per-player status

use crate::core::Pos;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};

/// One of the two players. Also the owner of a stone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    A,
    B,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::A, Side::B];

    pub fn opponent(self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Side::A => 0,
            Side::B => 1,
        }
    }

    /// Board glyph used in ASCII renders and prompts
    pub fn glyph(self) -> char {
        match self {
            Side::A => 'X',
            Side::B => 'O',
        }
    }

    /// Numeric value used in matrix renders (0 is empty)
    pub fn matrix_value(self) -> u8 {
        match self {
            Side::A => 1,
            Side::B => 2,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::A => write!(f, "Player A"),
            Side::B => write!(f, "Player B"),
        }
    }
}

/// A value kept for each side, indexable by [`Side`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerSide<T> {
    pub a: T,
    pub b: T,
}

impl<T> PerSide<T> {
    pub fn new(a: T, b: T) -> Self {
        PerSide { a, b }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Side, &T)> {
        [(Side::A, &self.a), (Side::B, &self.b)].into_iter()
    }
}

impl<T> Index<Side> for PerSide<T> {
    type Output = T;

    fn index(&self, side: Side) -> &T {
        match side {
            Side::A => &self.a,
            Side::B => &self.b,
        }
    }
}

impl<T> IndexMut<Side> for PerSide<T> {
    fn index_mut(&mut self, side: Side) -> &mut T {
        match side {
            Side::A => &mut self.a,
            Side::B => &mut self.b,
        }
    }
}

/// A board cell banned for one player until a turn has been reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedCell {
    pub pos: Pos,
    /// The seal is lifted once the turn counter reaches this value
    pub expires_at_turn: u32,
}

/// Per-player status effects
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStatus {
    /// Turns this player still sits out because of a freeze
    pub freeze_turns: u32,

    /// Turns this player still sits out because of a skip/punish effect
    pub skip_turns: u32,

    /// Fusion cards are blocked while the turn counter is <= this value
    pub fusion_lock_until: Option<u32>,

    /// Cell this player may not place on
    pub sealed_cell: Option<SealedCell>,
}

impl PlayerStatus {
    pub fn is_frozen(&self) -> bool {
        self.freeze_turns > 0
    }

    pub fn is_skipping(&self) -> bool {
        self.skip_turns > 0
    }

    /// Frozen or skipping: the player cannot place a stone this turn
    pub fn is_blocked(&self) -> bool {
        self.is_frozen() || self.is_skipping()
    }

    pub fn fusion_locked(&self, turn: u32) -> bool {
        self.fusion_lock_until.is_some_and(|until| turn <= until)
    }

    /// The sealed cell, if the seal is still active at `turn`
    pub fn active_seal(&self, turn: u32) -> Option<Pos> {
        self.sealed_cell
            .filter(|seal| turn < seal.expires_at_turn)
            .map(|seal| seal.pos)
    }

    /// Drop expired seals and fusion locks
    pub fn expire(&mut self, turn: u32) {
        if self.fusion_lock_until.is_some_and(|until| turn > until) {
            self.fusion_lock_until = None;
        }
        if self.sealed_cell.is_some_and(|seal| turn >= seal.expires_at_turn) {
            self.sealed_cell = None;
        }
    }
}
