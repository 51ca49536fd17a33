//! Catalog file parser
//!
//! A catalog is a sequence of `[Card]` / `[Character]` blocks made of
//! `Key: value` lines. `#` starts a comment line.
//!
//! ```text
//! [Card]
//! Key: still-water
//! Name: Still Water
//! AltNames: 静如止水
//! Effect: freeze-opponent
//! Params: turns=2
//! Counters: dripping-water
//! ```

use crate::core::{
    CardCategory, CardDef, CardKey, CardName, CardTiming, CharacterDef, CharacterKey, EffectKind,
    EffectParams,
};
use crate::{GameError, Result};
use nom::{
    bytes::complete::{take_while, take_while1},
    character::complete::{char, multispace0},
    combinator::all_consuming,
    multi::separated_list0,
    sequence::{delimited, separated_pair},
    IResult,
};
use smallvec::SmallVec;
use std::fs;
use std::path::Path;

/// One parsed catalog block
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogEntry {
    Card(CardDef),
    Character(CharacterDef),
}

fn param_key(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '-')(input)
}

fn param_value(input: &str) -> IResult<&str, &str> {
    take_while(|c: char| c != ';')(input)
}

fn param_pair(input: &str) -> IResult<&str, (&str, &str)> {
    separated_pair(delimited(multispace0, param_key, multispace0), char('='), param_value)(input)
}

fn param_list(input: &str) -> IResult<&str, Vec<(&str, &str)>> {
    separated_list0(char(';'), param_pair)(input)
}

/// Parse `k=v;k=v` effect parameters. A trailing `;` is allowed.
pub fn parse_params(text: &str) -> Result<EffectParams> {
    let trimmed = text.trim().trim_end_matches(';');
    if trimmed.is_empty() {
        return Ok(EffectParams::new());
    }
    match all_consuming(param_list)(trimmed) {
        Ok((_, pairs)) => Ok(EffectParams::from_pairs(
            pairs.into_iter().map(|(k, v)| (k, v.trim())),
        )),
        Err(e) => Err(GameError::InvalidCatalogFormat(format!(
            "bad effect params '{text}': {e}"
        ))),
    }
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn parse_category(value: &str) -> Result<CardCategory> {
    match value.to_lowercase().as_str() {
        "attack" => Ok(CardCategory::Attack),
        "control" => Ok(CardCategory::Control),
        "counter" => Ok(CardCategory::Counter),
        "support" => Ok(CardCategory::Support),
        other => Err(GameError::InvalidCatalogFormat(format!("unknown category '{other}'"))),
    }
}

fn parse_timing(value: &str) -> Result<CardTiming> {
    match value.to_lowercase().replace(['-', '_'], "").as_str() {
        "premove" => Ok(CardTiming::PreMove),
        "reaction" => Ok(CardTiming::Reaction),
        "anytime" => Ok(CardTiming::Anytime),
        other => Err(GameError::InvalidCatalogFormat(format!("unknown timing '{other}'"))),
    }
}

/// Catalog text loader
pub struct CatalogLoader;

impl CatalogLoader {
    pub fn load_from_file(path: &Path) -> Result<Vec<CatalogEntry>> {
        let content = fs::read_to_string(path).map_err(GameError::IoError)?;
        Self::parse(&content)
    }

    /// Parse every block in a catalog text
    pub fn parse(content: &str) -> Result<Vec<CatalogEntry>> {
        let mut entries = Vec::new();
        let mut header: Option<&str> = None;
        let mut fields: Vec<(&str, &str)> = Vec::new();

        for (line_no, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if line.starts_with('[') && line.ends_with(']') {
                if let Some(kind) = header.take() {
                    entries.push(Self::build(kind, &fields)?);
                }
                fields.clear();
                header = Some(&line[1..line.len() - 1]);
                continue;
            }
            match line.split_once(':') {
                Some((key, value)) if header.is_some() => fields.push((key.trim(), value.trim())),
                Some(_) => {
                    return Err(GameError::InvalidCatalogFormat(format!(
                        "line {}: field outside of a [Card] or [Character] block",
                        line_no + 1
                    )))
                }
                None => {
                    return Err(GameError::InvalidCatalogFormat(format!(
                        "line {}: expected 'Key: value', got '{line}'",
                        line_no + 1
                    )))
                }
            }
        }
        if let Some(kind) = header {
            entries.push(Self::build(kind, &fields)?);
        }
        Ok(entries)
    }

    fn build(kind: &str, fields: &[(&str, &str)]) -> Result<CatalogEntry> {
        match kind.trim().to_lowercase().as_str() {
            "card" => Self::build_card(fields).map(CatalogEntry::Card),
            "character" => Self::build_character(fields).map(CatalogEntry::Character),
            other => Err(GameError::InvalidCatalogFormat(format!("unknown block [{other}]"))),
        }
    }

    fn field<'a>(fields: &[(&str, &'a str)], name: &str) -> Option<&'a str> {
        fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| *v)
    }

    fn build_card(fields: &[(&str, &str)]) -> Result<CardDef> {
        let key = Self::field(fields, "Key")
            .ok_or_else(|| GameError::InvalidCatalogFormat("card without Key".to_string()))?;
        let name = Self::field(fields, "Name").unwrap_or(key);
        let effect: EffectKind = Self::field(fields, "Effect")
            .ok_or_else(|| GameError::InvalidCatalogFormat(format!("card '{key}' has no Effect")))?
            .parse()
            .map_err(GameError::InvalidCatalogFormat)?;

        let mut card = CardDef::new(CardKey::new(key), CardName::new(name), effect);
        for (field, value) in fields {
            match *field {
                "Key" | "Name" | "Effect" => {}
                "AltNames" => card.alt_names = split_list(value).map(String::from).collect(),
                "Category" => card.category = parse_category(value)?,
                "Timing" => card.timing = parse_timing(value)?,
                "Params" => card.params = parse_params(value)?,
                "Counters" => card.counters = split_list(value).map(CardKey::new).collect(),
                "Requires" => card.requires_character = Some(CharacterKey::new(*value)),
                "Tags" => card.tags = split_list(value).map(String::from).collect(),
                "Copies" => {
                    card.copies = value.parse().map_err(|_| {
                        GameError::InvalidCatalogFormat(format!("card '{key}': bad Copies '{value}'"))
                    })?
                }
                "Text" => card.text = value.to_string(),
                _ => {} // Unknown fields are ignored
            }
        }
        Ok(card)
    }

    fn build_character(fields: &[(&str, &str)]) -> Result<CharacterDef> {
        let key = Self::field(fields, "Key")
            .ok_or_else(|| GameError::InvalidCatalogFormat("character without Key".to_string()))?;
        Ok(CharacterDef {
            key: CharacterKey::new(key),
            name: CardName::new(Self::field(fields, "Name").unwrap_or(key)),
            alt_names: Self::field(fields, "AltNames")
                .map(|v| split_list(v).map(String::from).collect())
                .unwrap_or_else(SmallVec::new),
            text: Self::field(fields, "Text").unwrap_or_default().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_params() {
        let params = parse_params("turns=2; target = opponent;").unwrap();
        assert_eq!(params.get_u32("turns"), Some(2));
        assert_eq!(params.get("target"), Some("opponent"));
        assert!(parse_params("").unwrap().is_empty());
        assert!(parse_params("=3").is_err());
    }

    #[test]
    fn test_parse_card_block() {
        let text = "\
# freeze card
[Card]
Key: still-water
Name: Still Water
AltNames: 静如止水
Category: Control
Effect: freeze-opponent
Params: turns=2
Counters: dripping-water
Copies: 2
Text: The opponent sits out two turns.
";
        let entries = CatalogLoader::parse(text).unwrap();
        assert_eq!(entries.len(), 1);
        let CatalogEntry::Card(card) = &entries[0] else {
            panic!("expected a card");
        };
        assert_eq!(card.key.as_str(), "still-water");
        assert_eq!(card.effect, EffectKind::FreezeOpponent);
        assert_eq!(card.category, CardCategory::Control);
        assert_eq!(card.timing, CardTiming::PreMove);
        assert_eq!(card.params.get_u32("turns"), Some(2));
        assert!(card.is_countered_by(&CardKey::new("dripping-water")));
        assert_eq!(card.alt_names.as_slice(), ["静如止水".to_string()]);
        assert_eq!(card.copies, 2);
    }

    #[test]
    fn test_parse_character_and_fusion() {
        let text = "\
[Character]
Key: zhang-cheng
Name: Zhang Cheng

[Card]
Key: lure-away
Effect: banish-character
Requires: zhang-cheng
Tags: Fusion
Timing: anytime
";
        let entries = CatalogLoader::parse(text).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(matches!(&entries[0], CatalogEntry::Character(c) if c.key.as_str() == "zhang-cheng"));
        let CatalogEntry::Card(card) = &entries[1] else {
            panic!("expected a card");
        };
        assert!(card.is_fusion());
        assert_eq!(card.timing, CardTiming::Anytime);
        assert_eq!(card.name.as_str(), "lure-away");
    }

    #[test]
    fn test_rejects_bad_blocks() {
        assert!(CatalogLoader::parse("Key: orphan").is_err());
        assert!(CatalogLoader::parse("[Card]\nName: No Key\nEffect: freeze-opponent").is_err());
        assert!(CatalogLoader::parse("[Card]\nKey: x\nEffect: teleport").is_err());
        assert!(CatalogLoader::parse("[Spell]\nKey: x").is_err());
    }
}
