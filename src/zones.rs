//! Card and stone zones (Hand, Graveyard, Side-pool)

use crate::core::{CardId, CardInstance, CardKey, Pos, Side};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a card ended up in the graveyard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscardReason {
    /// The card resolved normally
    Played,
    /// The card was used to answer an opponent's card
    Counter,
    /// The card was answered by a counter and did not resolve
    Countered,
    /// The effect had nothing to act on
    Fizzled,
    /// Replaced during the opening mulligan
    Mulligan,
}

impl fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DiscardReason::Played => "played",
            DiscardReason::Counter => "counter",
            DiscardReason::Countered => "countered",
            DiscardReason::Fizzled => "fizzled",
            DiscardReason::Mulligan => "mulligan",
        };
        f.write_str(s)
    }
}

/// A player's hand, in draw order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hand {
    pub cards: Vec<CardInstance>,
}

impl Hand {
    pub fn new() -> Self {
        Hand { cards: Vec::new() }
    }

    pub fn add(&mut self, card: CardInstance) {
        self.cards.push(card);
    }

    pub fn get(&self, index: usize) -> Option<&CardInstance> {
        self.cards.get(index)
    }

    /// Remove by position. Order of the remaining cards is preserved so that
    /// indices seen by the AI stay meaningful for the cards before `index`.
    pub fn take(&mut self, index: usize) -> Option<CardInstance> {
        if index < self.cards.len() {
            Some(self.cards.remove(index))
        } else {
            None
        }
    }

    /// Put a card back at its old position (or the end)
    pub fn restore(&mut self, index: usize, card: CardInstance) {
        let index = index.min(self.cards.len());
        self.cards.insert(index, card);
    }

    pub fn position(&self, id: CardId) -> Option<usize> {
        self.cards.iter().position(|c| c.id == id)
    }

    pub fn contains_key(&self, key: &CardKey) -> bool {
        self.cards.iter().any(|c| &c.card == key)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CardInstance> {
        self.cards.iter()
    }
}

/// A graveyard record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraveyardEntry {
    pub card: CardInstance,
    pub reason: DiscardReason,
    pub turn: u32,
}

/// Append-only list of spent cards
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graveyard {
    pub entries: Vec<GraveyardEntry>,
}

impl Graveyard {
    pub fn add(&mut self, card: CardInstance, reason: DiscardReason, turn: u32) {
        self.entries.push(GraveyardEntry { card, reason, turn });
    }

    pub fn last(&self) -> Option<&GraveyardEntry> {
        self.entries.last()
    }

    pub fn count_reason(&self, reason: DiscardReason) -> usize {
        self.entries.iter().filter(|e| e.reason == reason).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A stone taken off the board by a skill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovedStone {
    pub pos: Pos,
    pub owner: Side,
    pub removed_by: Side,
    pub turn: u32,
}

/// Holding area for removed stones ("Shichahai")
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidePool {
    pub stones: Vec<RemovedStone>,
}

impl SidePool {
    pub fn add(&mut self, stone: RemovedStone) {
        self.stones.push(stone);
    }

    pub fn count_owned_by(&self, side: Side) -> usize {
        self.stones.iter().filter(|s| s.owner == side).count()
    }

    pub fn len(&self) -> usize {
        self.stones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stones.is_empty()
    }
}

/// Card zones for a player
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerZones {
    pub hand: Hand,
    pub graveyard: Graveyard,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::EntityId;

    fn card(id: u32, key: &str) -> CardInstance {
        CardInstance {
            id: EntityId::new(id),
            card: CardKey::new(key),
        }
    }

    #[test]
    fn test_hand() {
        let mut hand = Hand::new();
        assert!(hand.is_empty());

        hand.add(card(1, "flying-sand"));
        hand.add(card(2, "still-water"));
        hand.add(card(3, "time-rewind"));
        assert_eq!(hand.len(), 3);
        assert!(hand.contains_key(&CardKey::new("still-water")));

        let taken = hand.take(1).unwrap();
        assert_eq!(taken.card.as_str(), "still-water");
        assert_eq!(hand.get(1).unwrap().card.as_str(), "time-rewind");

        hand.restore(1, taken);
        assert_eq!(hand.position(EntityId::new(2)), Some(1));
        assert!(hand.take(9).is_none());
    }

    #[test]
    fn test_graveyard_reasons() {
        let mut gy = Graveyard::default();
        gy.add(card(1, "a"), DiscardReason::Played, 3);
        gy.add(card(2, "b"), DiscardReason::Fizzled, 4);
        gy.add(card(3, "c"), DiscardReason::Fizzled, 5);
        assert_eq!(gy.len(), 3);
        assert_eq!(gy.count_reason(DiscardReason::Fizzled), 2);
        assert_eq!(gy.last().unwrap().reason, DiscardReason::Fizzled);
        assert_eq!(DiscardReason::Countered.to_string(), "countered");
    }

    #[test]
    fn test_side_pool() {
        let mut pool = SidePool::default();
        pool.add(RemovedStone {
            pos: Pos::new(1, 1),
            owner: Side::B,
            removed_by: Side::A,
            turn: 6,
        });
        assert_eq!(pool.count_owned_by(Side::B), 1);
        assert_eq!(pool.count_owned_by(Side::A), 0);
    }
}
