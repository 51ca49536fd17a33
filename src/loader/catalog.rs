//! Immutable card/character catalog assembled once per game

use crate::core::{CardDef, CardKey, CharacterDef, CharacterKey};
use crate::loader::card::{CatalogEntry, CatalogLoader};
use crate::{GameError, Result};
use deunicode::deunicode;
use rustc_hash::FxHashMap;
use std::path::Path;
use std::sync::Arc;

const STANDARD_SET: &str = include_str!("../../data/standard_set.txt");

/// Lowercase ASCII form used for forgiving name lookups ("飞沙走石" -> "feishazoushi")
pub fn normalize_name(name: &str) -> String {
    deunicode(name)
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Card and character definitions keyed by identity
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    cards: FxHashMap<CardKey, Arc<CardDef>>,
    characters: FxHashMap<CharacterKey, Arc<CharacterDef>>,
    /// Card keys in catalog order, for deterministic iteration
    order: Vec<CardKey>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in card set
    pub fn standard() -> Result<Self> {
        Self::from_text(STANDARD_SET)
    }

    pub fn from_text(text: &str) -> Result<Self> {
        let mut catalog = Catalog::new();
        for entry in CatalogLoader::parse(text)? {
            match entry {
                CatalogEntry::Card(card) => catalog.add_card(card),
                CatalogEntry::Character(character) => catalog.add_character(character),
            }
        }
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_text(&content)
    }

    pub fn add_card(&mut self, card: CardDef) {
        if !self.cards.contains_key(&card.key) {
            self.order.push(card.key.clone());
        }
        self.cards.insert(card.key.clone(), Arc::new(card));
    }

    pub fn add_character(&mut self, character: CharacterDef) {
        self.characters
            .insert(character.key.clone(), Arc::new(character));
    }

    pub fn card(&self, key: &CardKey) -> Option<&CardDef> {
        self.cards.get(key).map(Arc::as_ref)
    }

    /// Look up a card, failing with `CardNotFound`
    pub fn require_card(&self, key: &CardKey) -> Result<&CardDef> {
        self.card(key)
            .ok_or_else(|| GameError::CardNotFound(key.to_string()))
    }

    pub fn character(&self, key: &CharacterKey) -> Option<&CharacterDef> {
        self.characters.get(key).map(Arc::as_ref)
    }

    pub fn cards(&self) -> impl Iterator<Item = &CardDef> {
        self.order.iter().filter_map(|k| self.card(k))
    }

    pub fn characters(&self) -> impl Iterator<Item = &CharacterDef> {
        self.characters.values().map(Arc::as_ref)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Find a card by key, display name or alternate name, ignoring case,
    /// punctuation and script (alternate names are transliterated)
    pub fn find_card_by_name(&self, name: &str) -> Option<&CardDef> {
        let wanted = normalize_name(name);
        if wanted.is_empty() {
            return None;
        }
        self.cards().find(|card| {
            normalize_name(card.key.as_str()) == wanted
                || normalize_name(card.name.as_str()) == wanted
                || card.alt_names.iter().any(|alt| normalize_name(alt) == wanted)
        })
    }

    /// Every card key repeated by its copy count, in catalog order
    pub fn draw_pile(&self) -> Vec<CardKey> {
        self.cards()
            .flat_map(|card| std::iter::repeat(card.key.clone()).take(card.copies as usize))
            .collect()
    }

    /// Check that counter lists and character requirements point at real entries
    pub fn validate(&self) -> Result<()> {
        for card in self.cards() {
            for counter in &card.counters {
                let Some(counter_card) = self.card(counter) else {
                    return Err(GameError::InvalidCatalogFormat(format!(
                        "card '{}' lists unknown counter '{counter}'",
                        card.key
                    )));
                };
                if !counter_card.effect.is_counter() {
                    return Err(GameError::InvalidCatalogFormat(format!(
                        "card '{}' lists '{counter}' as a counter, but its effect is {}",
                        card.key, counter_card.effect
                    )));
                }
            }
            if let Some(required) = &card.requires_character {
                if self.character(required).is_none() {
                    return Err(GameError::CharacterNotFound(required.to_string()));
                }
            }
            if let Some(summoned) = card.params.get("character") {
                if self.character(&CharacterKey::new(summoned)).is_none() {
                    return Err(GameError::CharacterNotFound(summoned.to_string()));
                }
            }
        }
        Ok(())
    }
}
