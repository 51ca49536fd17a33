//! Catalog loading tests
//!
//! Loads the shipped card set from disk and checks that hand-written
//! catalogs are validated before a game can use them.

use similar_asserts::assert_eq;
use skill_gomoku::config::GameRules;
use skill_gomoku::core::{CardKey, EffectKind, Side};
use skill_gomoku::game::{Command, GameEngine, GamePhase};
use skill_gomoku::loader::Catalog;
use skill_gomoku::{GameError, Result};
use std::path::PathBuf;
use std::sync::Arc;

const SMALL_SET: &str = "\
[Card]
Key: gust
Name: Gust
Effect: remove-to-shichahai
Counters: anchor
Copies: 4

[Card]
Key: anchor
Name: Anchor
Effect: counter-prevent-removal
Copies: 2
";

#[test]
fn test_standard_set_file_matches_builtin() -> Result<()> {
    let path = PathBuf::from("data/standard_set.txt");
    let from_file = Catalog::load_from_file(&path)?;
    let builtin = Catalog::standard()?;

    let keys = |c: &Catalog| c.cards().map(|d| d.key.as_str().to_string()).collect::<Vec<_>>();
    assert_eq!(keys(&from_file), keys(&builtin));
    assert_eq!(from_file.len(), 15);
    assert_eq!(from_file.draw_pile(), builtin.draw_pile());
    Ok(())
}

#[test]
fn test_lookup_by_alternate_name() -> Result<()> {
    let catalog = Catalog::standard()?;
    let sand = catalog.find_card_by_name("飞沙走石").expect("alt name resolves");
    assert_eq!(sand.key.as_str(), "flying-sand");
    let flip = catalog.find_card_by_name("polarity FLIP").expect("display name resolves");
    assert_eq!(flip.effect, EffectKind::CounterReverseVictory);
    assert!(catalog.find_card_by_name("no such card").is_none());
    Ok(())
}

#[test]
fn test_small_catalog_drives_a_game() -> Result<()> {
    let catalog = Catalog::from_text(SMALL_SET)?;
    assert_eq!(catalog.draw_pile().len(), 6);
    let gust = catalog.card(&CardKey::new("gust")).expect("gust is defined");
    assert!(gust.is_countered_by(&CardKey::new("anchor")));

    let rules = GameRules {
        draft_interval: 0,
        ..GameRules::default()
    };
    let engine = GameEngine::new(Arc::new(catalog), rules);
    let mut state = engine.start(9);
    let dealt: usize = Side::ALL.iter().map(|&s| state.zones[s].hand.len()).sum();
    assert_eq!(dealt, 6);
    assert!(state.draw_pile.is_empty());

    state = engine.apply(&state, Command::Mulligan { side: Side::A, replace: vec![] })?;
    state = engine.apply(&state, Command::Mulligan { side: Side::B, replace: vec![] })?;
    assert_eq!(state.phase, GamePhase::Playing);
    Ok(())
}

#[test]
fn test_unknown_counter_is_rejected() {
    let text = SMALL_SET.replace("Counters: anchor", "Counters: anchor, umbrella");
    let err = Catalog::from_text(&text).unwrap_err();
    assert!(matches!(err, GameError::InvalidCatalogFormat(ref m) if m.contains("umbrella")), "{err}");
}

#[test]
fn test_counter_must_have_counter_effect() {
    let text = SMALL_SET.replace("Effect: counter-prevent-removal", "Effect: skip-opponent");
    let err = Catalog::from_text(&text).unwrap_err();
    assert!(matches!(err, GameError::InvalidCatalogFormat(_)), "{err}");
}

#[test]
fn test_missing_required_character() {
    let text = "\
[Card]
Key: lure-away
Effect: banish-character
Requires: zhang-cheng
";
    let err = Catalog::from_text(text).unwrap_err();
    assert!(matches!(err, GameError::CharacterNotFound(ref k) if k == "zhang-cheng"), "{err}");
}

#[test]
fn test_malformed_lines_report_position() {
    let err = Catalog::from_text("[Card]\nKey: gust\nthis line has no separator\n").unwrap_err();
    assert!(err.to_string().contains("line 3"), "{err}");

    let err = Catalog::from_text("[Card]\nName: Nameless\nEffect: seal-cell\n").unwrap_err();
    assert!(err.to_string().contains("without Key"), "{err}");

    let err = Catalog::from_text("[Card]\nKey: odd\nEffect: teleport\n").unwrap_err();
    assert!(matches!(err, GameError::InvalidCatalogFormat(_)), "{err}");
}
