//! Chat payloads sent to the remote decision endpoint

use crate::ai::scenario::{Scenario, ScenarioKind};
use crate::analysis::scan_threats;
use crate::core::{Side, Pos};
use crate::game::{GameStatus, TargetOptions};
use crate::loader::Catalog;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Moves narrated in the context
const RECENT_MOVES: usize = 8;
const RECENT_LOG: usize = 6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Chat-completions request body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
}

const SYSTEM_PROMPT: &str = "You are playing Skill Gomoku, five-in-a-row on a 15x15 board \
with skill cards. Rows and columns are numbered from 0. X is Player A, O is Player B. \
Answer with exactly one JSON object and nothing else.";

pub struct PromptBuilder<'a> {
    catalog: &'a Catalog,
}

impl<'a> PromptBuilder<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        PromptBuilder { catalog }
    }

    pub fn build(
        &self,
        scenario: &Scenario,
        state: &GameStatus,
        model: &str,
        temperature: f32,
        feedback: Option<&str>,
    ) -> ChatRequest {
        ChatRequest {
            model: model.to_string(),
            messages: vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user(self.context(scenario, state, feedback)),
            ],
            temperature,
        }
    }

    /// The user message: board, recent moves, statuses and the scenario's question
    pub fn context(&self, scenario: &Scenario, state: &GameStatus, feedback: Option<&str>) -> String {
        let side = scenario.side;
        let mut out = String::new();
        let _ = writeln!(out, "You are {} ({}).", side, side.glyph());
        let _ = writeln!(
            out,
            "Turn {}, {} stones placed.\n",
            state.turn,
            state.board.stone_count()
        );
        out.push_str("Board:\n");
        out.push_str(&render_board(state));
        let _ = writeln!(
            out,
            "\nBoard matrix (0 empty, 1 = X, 2 = O): {}",
            serde_json::to_string(&state.board.to_matrix()).unwrap_or_default()
        );

        out.push_str("\nRecent moves:\n");
        let history = state.board.history();
        let start = history.len().saturating_sub(RECENT_MOVES);
        if history.is_empty() {
            out.push_str("- none yet\n");
        }
        for mv in &history[start..] {
            let _ = writeln!(out, "- {} at row {}, col {}", mv.side, mv.pos.row, mv.pos.col);
        }
        if let Some(last) = state.board.last_move().filter(|m| m.side != side) {
            let _ = writeln!(out, "Your opponent just played row {}, col {}.", last.pos.row, last.pos.col);
        }
        if !state.log.is_empty() {
            out.push_str("\nRecent events:\n");
            for entry in state.recent_log(RECENT_LOG) {
                let _ = writeln!(out, "- {entry}");
            }
        }

        out.push_str("\nStatus:\n");
        for player in Side::ALL {
            out.push_str(&self.status_line(state, player));
        }
        let threats = scan_threats(&state.board, side.opponent());
        if !threats.is_quiet() {
            let _ = writeln!(out, "Opponent threats: {}", threats.describe(side.opponent()));
        }

        out.push('\n');
        out.push_str(&self.question(scenario, state));
        if let Some(feedback) = feedback {
            let _ = writeln!(out, "\nYour previous answer was rejected: {feedback}");
        }
        out
    }

    fn status_line(&self, state: &GameStatus, side: Side) -> String {
        let status = &state.statuses[side];
        let mut parts = Vec::new();
        if status.freeze_turns > 0 {
            parts.push(format!("frozen {} turn(s)", status.freeze_turns));
        }
        if status.skip_turns > 0 {
            parts.push(format!("skips {} turn(s)", status.skip_turns));
        }
        if let Some(pos) = status.active_seal(state.turn) {
            parts.push(format!("may not place at row {}, col {}", pos.row, pos.col));
        }
        if let Some(character) = &state.characters[side] {
            parts.push(format!("character {character}"));
        }
        let hand = state.zones[side].hand.len();
        parts.push(format!("{hand} card(s) in hand"));
        format!("- {side}: {}\n", parts.join(", "))
    }

    fn hand_listing(&self, state: &GameStatus, side: Side, indices: &[usize]) -> String {
        let mut out = String::new();
        for &index in indices {
            let Some(instance) = state.zones[side].hand.get(index) else {
                continue;
            };
            match self.catalog.card(&instance.card) {
                Some(card) => {
                    let _ = writeln!(out, "  {index}: {} ({}) - {}", card.name, card.effect, card.text);
                }
                None => {
                    let _ = writeln!(out, "  {index}: {}", instance.card);
                }
            }
        }
        out
    }

    fn question(&self, scenario: &Scenario, state: &GameStatus) -> String {
        let side = scenario.side;
        match scenario.kind {
            ScenarioKind::Stone => "Choose where to place your stone.\n\
                 Reply {\"row\": r, \"col\": c}."
                .to_string(),
            ScenarioKind::Skill => format!(
                "You may play one skill card before placing a stone. Playable cards:\n{}\
                 Reply {{\"card_index\": i}} to play one, or {{\"pass\": true}} to play none.",
                self.hand_listing(state, side, &scenario.playable)
            ),
            ScenarioKind::CardTargeting => {
                let prompt = scenario.prompt.as_deref().unwrap_or("Choose a target");
                match &scenario.options {
                    Some(TargetOptions::Cells(cells)) => format!(
                        "{prompt}. Offered cells: {}.\nReply {{\"row\": r, \"col\": c}}.",
                        cells_list(cells)
                    ),
                    Some(TargetOptions::Snapshots(indices)) => {
                        let turns: Vec<String> = indices
                            .iter()
                            .filter_map(|&i| state.timeline.get(i).map(|e| format!("{i} (turn {})", e.turn)))
                            .collect();
                        format!(
                            "{prompt}. Snapshots: {}.\nReply {{\"snapshot\": index}}.",
                            turns.join(", ")
                        )
                    }
                    None => prompt.to_string(),
                }
            }
            ScenarioKind::CounterWindow => {
                let played = state
                    .pending_action
                    .as_ref()
                    .and_then(|a| self.catalog.card(a.card_key()))
                    .map(|c| format!("{} ({})", c.name, c.effect))
                    .unwrap_or_else(|| "a card".to_string());
                if scenario.counter_options.is_empty() {
                    format!("Your opponent played {played}. You hold no card that answers it.\nReply {{\"pass\": true}}.")
                } else {
                    format!(
                        "Your opponent played {played}. Cards that can answer it:\n{}\
                         Reply {{\"card_index\": i}} to counter, or {{\"pass\": true}} to let it resolve.",
                        self.hand_listing(state, side, &scenario.counter_options)
                    )
                }
            }
            ScenarioKind::Mulligan => {
                let all: Vec<usize> = (0..state.zones[side].hand.len()).collect();
                format!(
                    "Your opening hand:\n{}\
                     Reply {{\"replace\": [indices]}} with the cards to redraw (an empty list keeps the hand).",
                    self.hand_listing(state, side, &all)
                )
            }
        }
    }
}

fn cells_list(cells: &[Pos]) -> String {
    cells
        .iter()
        .map(|p| format!("[{}, {}]", p.row, p.col))
        .collect::<Vec<_>>()
        .join(", ")
}

/// ASCII board with row and column numbers
fn render_board(state: &GameStatus) -> String {
    let size = state.board.size();
    let mut out = String::from("   ");
    for col in 0..size {
        let _ = write!(out, "{:>3}", col);
    }
    out.push('\n');
    for (row, line) in state.board.to_ascii().lines().enumerate() {
        let _ = write!(out, "{row:>3}");
        for glyph in line.chars() {
            let _ = write!(out, "{glyph:>3}");
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::scenario::derive_for_side;
    use crate::game::GameEngine;

    #[test]
    fn test_stone_prompt_mentions_board_and_moves() {
        let engine = GameEngine::standard().unwrap();
        let mut state = engine.start(1);
        engine.mulligan(&mut state, Side::A, &[]).unwrap();
        engine.mulligan(&mut state, Side::B, &[]).unwrap();
        engine.place_stone(&mut state, Side::A, Pos::new(7, 7)).unwrap();

        let scenario = derive_for_side(&engine, &state, Side::B).pop().unwrap();
        let request = PromptBuilder::new(engine.catalog()).build(&scenario, &state, "m", 0.2, Some("cell is occupied"));
        assert_eq!(request.messages.len(), 2);
        let context = &request.messages[1].content;
        assert!(context.contains("Player A at row 7, col 7"));
        assert!(context.contains("Your opponent just played row 7, col 7."));
        assert!(context.contains("\"row\""));
        assert!(context.contains("rejected: cell is occupied"));
    }

    #[test]
    fn test_request_serializes_as_chat_payload() {
        let request = ChatRequest {
            model: "m".to_string(),
            messages: vec![ChatMessage::user("hi")],
            temperature: 0.5,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["model"], "m");
    }
}
