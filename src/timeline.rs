//! Turn timeline for rewind effects
//!
//! One entry is recorded after every completed turn (plus one at game start).
//! Rewinding restores an entry's board, side-pool and characters and drops
//! every later entry.

use crate::core::{BoardSnapshot, CharacterKey, Move, PerSide, Side};
use crate::zones::SidePool;
use serde::{Deserialize, Serialize};

/// Full snapshot taken at a turn boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub turn: u32,
    /// Player who just finished the turn (None for the opening entry)
    pub mover: Option<Side>,
    /// Stone placed during the turn, if any
    pub placed: Option<Move>,
    pub board: BoardSnapshot,
    pub side_pool: SidePool,
    pub characters: PerSide<Option<CharacterKey>>,
}

/// Append-only list of turn snapshots (truncated on rewind)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    entries: Vec<TimelineEntry>,
}

impl Timeline {
    pub fn new() -> Self {
        Timeline {
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, entry: TimelineEntry) {
        self.entries.push(entry);
    }

    pub fn get(&self, index: usize) -> Option<&TimelineEntry> {
        self.entries.get(index)
    }

    /// Keep entries `0..=index`, dropping everything recorded after it
    pub fn truncate_after(&mut self, index: usize) {
        self.entries.truncate(index + 1);
    }

    /// Indices a rewind may target: every entry before the latest one
    pub fn rewind_targets(&self) -> Vec<usize> {
        (0..self.entries.len().saturating_sub(1)).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Board;

    fn entry(turn: u32) -> TimelineEntry {
        TimelineEntry {
            turn,
            mover: None,
            placed: None,
            board: Board::default().to_snapshot(),
            side_pool: SidePool::default(),
            characters: PerSide::default(),
        }
    }

    #[test]
    fn test_timeline_push_and_truncate() {
        let mut timeline = Timeline::new();
        for turn in 0..5 {
            timeline.push(entry(turn));
        }
        assert_eq!(timeline.len(), 5);
        assert_eq!(timeline.rewind_targets(), vec![0, 1, 2, 3]);

        timeline.truncate_after(2);
        assert_eq!(timeline.len(), 3);
        assert_eq!(timeline.entries().last().unwrap().turn, 2);
    }

    #[test]
    fn test_empty_timeline_has_no_targets() {
        let mut timeline = Timeline::new();
        assert!(timeline.rewind_targets().is_empty());
        timeline.push(entry(0));
        assert!(timeline.rewind_targets().is_empty());
    }
}
