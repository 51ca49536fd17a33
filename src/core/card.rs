//! Card and character catalog entries

use crate::core::{CardId, CardKey, CardName, CharacterKey, GameEntity};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;

/// Tag marking cards subject to the fusion lock
pub const FUSION_TAG: &str = "Fusion";

/// Card category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardCategory {
    Attack,
    Control,
    Counter,
    Support,
}

/// When a card may be played
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardTiming {
    /// On the owner's turn, before placing a stone
    PreMove,
    /// Only in answer to an opponent's card (inside a counter window)
    Reaction,
    /// Any time the owner could play a pre-move card, including while frozen
    Anytime,
}

/// Effect identifiers understood by the effect registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EffectKind {
    /// Remove one opponent stone into the side-pool (Shichahai)
    #[serde(rename = "remove-to-shichahai")]
    RemoveToSidePool,
    FreezeOpponent,
    SkipOpponent,
    DeclareVictory,
    RandomClear,
    TimeRewind,
    SummonCharacter,
    BanishCharacter,
    SealCell,
    CounterPreventRemoval,
    CounterThaw,
    CounterReverseVictory,
    CounterRestoreBoard,
    CounterCancelFusion,
    CounterPunish,
}

impl EffectKind {
    pub const ALL: [EffectKind; 15] = [
        EffectKind::RemoveToSidePool,
        EffectKind::FreezeOpponent,
        EffectKind::SkipOpponent,
        EffectKind::DeclareVictory,
        EffectKind::RandomClear,
        EffectKind::TimeRewind,
        EffectKind::SummonCharacter,
        EffectKind::BanishCharacter,
        EffectKind::SealCell,
        EffectKind::CounterPreventRemoval,
        EffectKind::CounterThaw,
        EffectKind::CounterReverseVictory,
        EffectKind::CounterRestoreBoard,
        EffectKind::CounterCancelFusion,
        EffectKind::CounterPunish,
    ];

    pub fn id(self) -> &'static str {
        match self {
            EffectKind::RemoveToSidePool => "remove-to-shichahai",
            EffectKind::FreezeOpponent => "freeze-opponent",
            EffectKind::SkipOpponent => "skip-opponent",
            EffectKind::DeclareVictory => "declare-victory",
            EffectKind::RandomClear => "random-clear",
            EffectKind::TimeRewind => "time-rewind",
            EffectKind::SummonCharacter => "summon-character",
            EffectKind::BanishCharacter => "banish-character",
            EffectKind::SealCell => "seal-cell",
            EffectKind::CounterPreventRemoval => "counter-prevent-removal",
            EffectKind::CounterThaw => "counter-thaw",
            EffectKind::CounterReverseVictory => "counter-reverse-victory",
            EffectKind::CounterRestoreBoard => "counter-restore-board",
            EffectKind::CounterCancelFusion => "counter-cancel-fusion",
            EffectKind::CounterPunish => "counter-punish",
        }
    }

    /// Counter effects only resolve inside a counter window
    pub fn is_counter(self) -> bool {
        matches!(
            self,
            EffectKind::CounterPreventRemoval
                | EffectKind::CounterThaw
                | EffectKind::CounterReverseVictory
                | EffectKind::CounterRestoreBoard
                | EffectKind::CounterCancelFusion
                | EffectKind::CounterPunish
        )
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for EffectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        EffectKind::ALL
            .into_iter()
            .find(|kind| kind.id() == wanted)
            .ok_or_else(|| format!("unknown effect '{s}'"))
    }
}

/// Free-form effect parameters (`key=value` pairs in catalog order)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectParams(SmallVec<[(String, String); 4]>);

impl EffectParams {
    pub fn new() -> Self {
        EffectParams(SmallVec::new())
    }

    pub fn from_pairs<K: Into<String>, V: Into<String>>(pairs: impl IntoIterator<Item = (K, V)>) -> Self {
        EffectParams(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some((_, existing)) = self.0.iter_mut().find(|(k, _)| *k == key) {
            *existing = value;
        } else {
            self.0.push((key, value));
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_u32(&self, key: &str) -> Option<u32> {
        self.get(key).and_then(|v| v.trim().parse().ok())
    }

    /// Numeric parameter with a fallback
    pub fn u32_or(&self, key: &str, default: u32) -> u32 {
        self.get_u32(key).unwrap_or(default)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for EffectParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (k, v) in self.iter() {
            if !first {
                f.write_str(";")?;
            }
            write!(f, "{k}={v}")?;
            first = false;
        }
        Ok(())
    }
}

/// Immutable catalog entry for a card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardDef {
    pub key: CardKey,
    pub name: CardName,
    /// Alternate display names (e.g. the original Chinese title)
    pub alt_names: SmallVec<[String; 2]>,
    pub category: CardCategory,
    pub timing: CardTiming,
    pub effect: EffectKind,
    pub params: EffectParams,
    /// Cards that may be played in answer to this one
    pub counters: SmallVec<[CardKey; 4]>,
    pub requires_character: Option<CharacterKey>,
    pub tags: SmallVec<[String; 2]>,
    /// Copies shuffled into the draw pile
    pub copies: u8,
    pub text: String,
}

impl CardDef {
    pub fn new(key: impl Into<CardKey>, name: impl Into<CardName>, effect: EffectKind) -> Self {
        let category = if effect.is_counter() {
            CardCategory::Counter
        } else {
            CardCategory::Attack
        };
        let timing = if effect.is_counter() {
            CardTiming::Reaction
        } else {
            CardTiming::PreMove
        };
        CardDef {
            key: key.into(),
            name: name.into(),
            alt_names: SmallVec::new(),
            category,
            timing,
            effect,
            params: EffectParams::new(),
            counters: SmallVec::new(),
            requires_character: None,
            tags: SmallVec::new(),
            copies: 1,
            text: String::new(),
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    pub fn is_fusion(&self) -> bool {
        self.has_tag(FUSION_TAG)
    }

    pub fn is_countered_by(&self, key: &CardKey) -> bool {
        self.counters.contains(key)
    }
}

impl GameEntity for CardDef {
    type Key = CardKey;

    fn key(&self) -> &CardKey {
        &self.key
    }

    fn name(&self) -> &str {
        self.name.as_str()
    }
}

/// Immutable catalog entry for a summonable character
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterDef {
    pub key: CharacterKey,
    pub name: CardName,
    pub alt_names: SmallVec<[String; 2]>,
    pub text: String,
}

impl GameEntity for CharacterDef {
    type Key = CharacterKey;

    fn key(&self) -> &CharacterKey {
        &self.key
    }

    fn name(&self) -> &str {
        self.name.as_str()
    }
}

/// A card held in a hand or graveyard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardInstance {
    pub id: CardId,
    pub card: CardKey,
}
