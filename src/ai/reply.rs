//! Reply parsing
//!
//! Replies are matched against an ordered list of shapes. Each matcher is a
//! total function that either recognises its shape for the scenario at hand
//! or returns `None`; the first hit wins. Anything no matcher recognises is
//! "no decision", never a guess.

use crate::ai::remote::RemoteError;
use crate::ai::scenario::{Decision, Scenario, ScenarioKind};
use crate::core::{Board, Pos};
use crate::game::TargetOptions;
use crate::loader::Catalog;
use crate::zones::Hand;
use serde_json::Value;

/// What a matcher may consult
pub struct ParseContext<'a> {
    pub scenario: &'a Scenario,
    pub board: &'a Board,
    pub hand: &'a Hand,
    pub catalog: &'a Catalog,
}

type Matcher = fn(&Value, &ParseContext<'_>) -> Option<Decision>;

/// Shape matchers in priority order
const MATCHERS: &[(&str, Matcher)] = &[
    ("pass", match_pass),
    ("replace-list", match_replace),
    ("card", match_card),
    ("snapshot", match_snapshot),
    ("row-col", match_row_col),
    ("board-matrix", match_matrix),
    ("board-ascii", match_ascii),
];

/// Turn the model's message content into a decision
pub fn parse_reply(content: &str, ctx: &ParseContext<'_>) -> Result<Decision, RemoteError> {
    let value = extract_json(content)
        .ok_or_else(|| RemoteError::Parse(format!("no JSON object in reply: {}", preview(content))))?;
    MATCHERS
        .iter()
        .find_map(|(_, matcher)| matcher(&value, ctx))
        .ok_or_else(|| RemoteError::NoDecision(format!("unrecognised reply shape: {value}")))
}

fn preview(content: &str) -> String {
    content.chars().take(80).collect()
}

/// The JSON object in a reply, with or without a fenced code block around it
pub fn extract_json(content: &str) -> Option<Value> {
    let body = fenced_block(content).unwrap_or(content).trim();
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(body) {
        return Some(value);
    }
    let start = body.find('{')?;
    let end = body.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<Value>(&body[start..=end]) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}

fn fenced_block(content: &str) -> Option<&str> {
    let open = content.find("```")?;
    let rest = &content[open + 3..];
    // skip a language tag such as ```json
    let body_start = rest.find('\n').map_or(0, |i| i + 1);
    let rest = &rest[body_start..];
    let close = rest.find("```")?;
    Some(&rest[..close])
}

fn as_index(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn match_pass(value: &Value, ctx: &ParseContext<'_>) -> Option<Decision> {
    let pass = value.get("pass").and_then(Value::as_bool) == Some(true)
        || ["action", "decision"]
            .iter()
            .any(|k| value.get(*k).and_then(Value::as_str).is_some_and(|s| s.eq_ignore_ascii_case("pass")));
    if !pass {
        return None;
    }
    match ctx.scenario.kind {
        ScenarioKind::Skill => Some(Decision::PlayCard { hand_index: None }),
        ScenarioKind::CounterWindow => Some(Decision::CounterOrPass { hand_index: None }),
        ScenarioKind::Mulligan => Some(Decision::Mulligan { replace: Vec::new() }),
        ScenarioKind::Stone | ScenarioKind::CardTargeting => None,
    }
}

fn match_replace(value: &Value, ctx: &ParseContext<'_>) -> Option<Decision> {
    if ctx.scenario.kind != ScenarioKind::Mulligan {
        return None;
    }
    let list = value.get("replace").or_else(|| value.get("mulligan"))?.as_array()?;
    let replace = list.iter().map(as_index).collect::<Option<Vec<_>>>()?;
    Some(Decision::Mulligan { replace })
}

/// Hand index from `card_index`, or from `card` as an index or a card name
fn card_index(value: &Value, ctx: &ParseContext<'_>, allowed: &[usize]) -> Option<usize> {
    if let Some(index) = value.get("card_index").and_then(as_index) {
        return Some(index);
    }
    let card = value.get("card")?;
    if let Some(index) = as_index(card) {
        return Some(index);
    }
    let def = ctx.catalog.find_card_by_name(card.as_str()?)?;
    let mut matching = ctx
        .hand
        .iter()
        .enumerate()
        .filter(|(_, c)| c.card == def.key)
        .map(|(i, _)| i);
    let first = matching.next()?;
    Some(
        std::iter::once(first)
            .chain(matching)
            .find(|i| allowed.contains(i))
            .unwrap_or(first),
    )
}

fn match_card(value: &Value, ctx: &ParseContext<'_>) -> Option<Decision> {
    match ctx.scenario.kind {
        ScenarioKind::Skill => card_index(value, ctx, &ctx.scenario.playable)
            .map(|i| Decision::PlayCard { hand_index: Some(i) }),
        ScenarioKind::CounterWindow => card_index(value, ctx, &ctx.scenario.counter_options)
            .map(|i| Decision::CounterOrPass { hand_index: Some(i) }),
        _ => None,
    }
}

fn match_snapshot(value: &Value, ctx: &ParseContext<'_>) -> Option<Decision> {
    if !matches!(ctx.scenario.options, Some(TargetOptions::Snapshots(_))) {
        return None;
    }
    let index = ["snapshot", "snapshot_index", "index"]
        .iter()
        .find_map(|k| value.get(*k).and_then(as_index))?;
    Some(Decision::SelectSnapshot { index })
}

fn row_col(value: &Value) -> Option<Pos> {
    if let Some([row, col]) = value.as_array().map(Vec::as_slice) {
        return Some(Pos::new(as_index(row)?, as_index(col)?));
    }
    let row = value.get("row").and_then(as_index)?;
    let col = value.get("col").or_else(|| value.get("column")).and_then(as_index)?;
    Some(Pos::new(row, col))
}

fn cell_decision(pos: Pos, ctx: &ParseContext<'_>) -> Option<Decision> {
    match (ctx.scenario.kind, &ctx.scenario.options) {
        (ScenarioKind::Stone, _) => Some(Decision::PlaceStone { pos }),
        (ScenarioKind::CardTargeting, Some(TargetOptions::Cells(_))) => Some(Decision::SelectCell { pos }),
        _ => None,
    }
}

fn match_row_col(value: &Value, ctx: &ParseContext<'_>) -> Option<Decision> {
    let pos = row_col(value).or_else(|| {
        ["move", "position", "cell", "target"]
            .iter()
            .find_map(|k| value.get(*k).and_then(row_col))
    })?;
    cell_decision(pos, ctx)
}

/// The single new stone of `side` in `proposed`, if that is the only change
fn single_new_stone(current: &Board, proposed: &Board, ctx: &ParseContext<'_>) -> Option<Pos> {
    if proposed.size() != current.size() {
        return None;
    }
    let side = ctx.scenario.side;
    let mut added = None;
    for pos in current.positions() {
        match (current.get(pos), proposed.get(pos)) {
            (a, b) if a == b => {}
            (None, Some(s)) if s == side && added.is_none() => added = Some(pos),
            _ => return None,
        }
    }
    added
}

fn match_matrix(value: &Value, ctx: &ParseContext<'_>) -> Option<Decision> {
    if ctx.scenario.kind != ScenarioKind::Stone {
        return None;
    }
    let rows = value.get("board")?.as_array()?;
    let mut text = String::new();
    for row in rows {
        for cell in row.as_array()? {
            let glyph = match cell.as_u64()? {
                0 => '.',
                1 => 'X',
                2 => 'O',
                _ => return None,
            };
            text.push(glyph);
        }
        text.push('\n');
    }
    let proposed = Board::from_ascii(&text)?;
    single_new_stone(ctx.board, &proposed, ctx).map(|pos| Decision::PlaceStone { pos })
}

fn match_ascii(value: &Value, ctx: &ParseContext<'_>) -> Option<Decision> {
    if ctx.scenario.kind != ScenarioKind::Stone {
        return None;
    }
    let proposed = Board::from_ascii(value.get("board")?.as_str()?)?;
    single_new_stone(ctx.board, &proposed, ctx).map(|pos| Decision::PlaceStone { pos })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::scenario::derive_for_side;
    use crate::core::Side;
    use crate::game::{GameEngine, GameStatus};

    fn stone_state() -> (GameEngine, GameStatus, Scenario) {
        let engine = GameEngine::standard().unwrap();
        let mut state = engine.start(4);
        engine.mulligan(&mut state, Side::A, &[]).unwrap();
        engine.mulligan(&mut state, Side::B, &[]).unwrap();
        engine.place_stone(&mut state, Side::A, Pos::new(7, 7)).unwrap();
        let scenario = derive_for_side(&engine, &state, Side::B).pop().unwrap();
        (engine, state, scenario)
    }

    fn parse(content: &str, engine: &GameEngine, state: &GameStatus, scenario: &Scenario) -> Result<Decision, RemoteError> {
        let ctx = ParseContext {
            scenario,
            board: &state.board,
            hand: &state.zones[scenario.side].hand,
            catalog: engine.catalog(),
        };
        parse_reply(content, &ctx)
    }

    #[test]
    fn test_fenced_row_col() {
        let (engine, state, scenario) = stone_state();
        let reply = "Sure!\n```json\n{\"row\": 7, \"col\": 8}\n```";
        assert_eq!(
            parse(reply, &engine, &state, &scenario).unwrap(),
            Decision::PlaceStone { pos: Pos::new(7, 8) }
        );
        let nested = r#"{"move": {"row": "6", "col": 6}}"#;
        assert_eq!(
            parse(nested, &engine, &state, &scenario).unwrap(),
            Decision::PlaceStone { pos: Pos::new(6, 6) }
        );
    }

    #[test]
    fn test_matrix_with_one_new_stone() {
        let (engine, state, scenario) = stone_state();
        let mut matrix = state.board.to_matrix();
        matrix[3][4] = 2;
        let reply = serde_json::json!({ "board": matrix }).to_string();
        assert_eq!(
            parse(&reply, &engine, &state, &scenario).unwrap(),
            Decision::PlaceStone { pos: Pos::new(3, 4) }
        );

        // two new stones is not a decision
        matrix[3][5] = 2;
        let reply = serde_json::json!({ "board": matrix }).to_string();
        assert!(matches!(
            parse(&reply, &engine, &state, &scenario),
            Err(RemoteError::NoDecision(_))
        ));
    }

    #[test]
    fn test_ascii_board_reply() {
        let (engine, state, scenario) = stone_state();
        let mut board = state.board.clone();
        board.place(Pos::new(8, 8), Side::B);
        let reply = serde_json::json!({ "board": board.to_ascii() }).to_string();
        assert_eq!(
            parse(&reply, &engine, &state, &scenario).unwrap(),
            Decision::PlaceStone { pos: Pos::new(8, 8) }
        );
    }

    #[test]
    fn test_pass_is_not_a_stone() {
        let (engine, state, scenario) = stone_state();
        assert!(matches!(
            parse(r#"{"pass": true}"#, &engine, &state, &scenario),
            Err(RemoteError::NoDecision(_))
        ));
        assert!(matches!(
            parse("I would play the center", &engine, &state, &scenario),
            Err(RemoteError::Parse(_))
        ));
    }

    #[test]
    fn test_counter_by_card_name() {
        let (engine, mut state, _) = stone_state();
        let index = engine.grant_card(&mut state, Side::B, "honest-return").unwrap();
        let mut scenario = derive_for_side(&engine, &state, Side::B).pop().unwrap();
        scenario.kind = ScenarioKind::CounterWindow;
        scenario.counter_options = vec![index];
        let decision = parse(r#"{"card": "Honest Return"}"#, &engine, &state, &scenario).unwrap();
        assert_eq!(decision, Decision::CounterOrPass { hand_index: Some(index) });
        let decision = parse(r#"{"action": "PASS"}"#, &engine, &state, &scenario).unwrap();
        assert_eq!(decision, Decision::CounterOrPass { hand_index: None });
    }

    #[test]
    fn test_extract_json_prefers_fence() {
        let value = extract_json("noise {\"a\": 1} ```\n{\"b\": 2}\n```").unwrap();
        assert_eq!(value["b"], 2);
        assert!(extract_json("[1, 2]").is_none());
    }
}
