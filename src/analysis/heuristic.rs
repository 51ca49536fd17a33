//! Local heuristic move engine
//!
//! Candidates are the empty cells near existing stones. Each candidate is
//! scored twice, once as our own placement (attack) and once as the
//! opponent's (defense), and the combination is categorized so callers can
//! tell forcing moves from positional ones.

use crate::analysis::patterns::{analyze_cell, CellAnalysis};
use crate::core::{Board, Pos, Side, DIRECTIONS};
use crate::game::GameStatus;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Reference score values
pub struct Score;

impl Score {
    pub const WIN: i64 = 10_000_000;
    pub const OPEN_FOUR: i64 = 50_000;
    pub const MULTI_FOUR_BONUS: i64 = 30_000;
    pub const CLOSED_FOUR: i64 = 12_000;
    pub const DOUBLE_THREE: i64 = 12_000;
    pub const OPEN_THREE: i64 = 5_000;
    pub const CLOSED_THREE: i64 = 800;
    pub const OPEN_TWO: i64 = 300;
}

/// Tunable scoring weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicWeights {
    pub win: i64,
    pub open_four: i64,
    pub multi_four_bonus: i64,
    pub closed_four: i64,
    pub double_three: i64,
    pub open_three: i64,
    pub closed_three: i64,
    pub open_two: i64,
    /// Multiplier on the squared run length of every line
    pub line_strength: i64,
    pub friendly_adjacency: i64,
    pub opponent_adjacency: i64,
    /// Bonus per step closer to the center (within the center radius)
    pub center_bonus: i64,
    pub defense_weight: f64,
    /// Scores within this margin of the best are treated as ties
    pub tie_margin: i64,
    /// Chebyshev radius around existing stones for candidate generation
    pub candidate_radius: usize,
}

impl Default for HeuristicWeights {
    fn default() -> Self {
        HeuristicWeights {
            win: Score::WIN,
            open_four: Score::OPEN_FOUR,
            multi_four_bonus: Score::MULTI_FOUR_BONUS,
            closed_four: Score::CLOSED_FOUR,
            double_three: Score::DOUBLE_THREE,
            open_three: Score::OPEN_THREE,
            closed_three: Score::CLOSED_THREE,
            open_two: Score::OPEN_TWO,
            line_strength: 12,
            friendly_adjacency: 40,
            opponent_adjacency: 25,
            center_bonus: 15,
            defense_weight: 0.92,
            tie_margin: 500,
            candidate_radius: 2,
        }
    }
}

/// Why a move was suggested, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MoveCategory {
    Win,
    BlockWin,
    OpenFour,
    BlockOpenFour,
    DoubleThreat,
    BlockDoubleThree,
    ClosedFour,
    BlockOpenThree,
    BuildOpenThree,
    Pressure,
}

/// Coarse quality bucket consumed by the router
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum QualityBucket {
    Weak,
    Moderate,
    Strong,
    Decisive,
}

impl MoveCategory {
    pub fn confidence(self) -> f64 {
        match self {
            MoveCategory::Win => 1.0,
            MoveCategory::BlockWin => 0.97,
            MoveCategory::OpenFour => 0.93,
            MoveCategory::BlockOpenFour => 0.9,
            MoveCategory::DoubleThreat => 0.88,
            MoveCategory::BlockDoubleThree => 0.85,
            MoveCategory::ClosedFour => 0.8,
            MoveCategory::BlockOpenThree => 0.75,
            MoveCategory::BuildOpenThree => 0.68,
            MoveCategory::Pressure => 0.5,
        }
    }

    /// Categories where the right move is unambiguous
    pub fn is_forcing(self) -> bool {
        matches!(
            self,
            MoveCategory::Win
                | MoveCategory::BlockWin
                | MoveCategory::OpenFour
                | MoveCategory::BlockOpenFour
                | MoveCategory::DoubleThreat
                | MoveCategory::BlockDoubleThree
        )
    }

    pub fn bucket(self) -> QualityBucket {
        match self {
            MoveCategory::Win | MoveCategory::BlockWin => QualityBucket::Decisive,
            MoveCategory::OpenFour
            | MoveCategory::BlockOpenFour
            | MoveCategory::DoubleThreat
            | MoveCategory::BlockDoubleThree => QualityBucket::Strong,
            MoveCategory::ClosedFour
            | MoveCategory::BlockOpenThree
            | MoveCategory::BuildOpenThree => QualityBucket::Moderate,
            MoveCategory::Pressure => QualityBucket::Weak,
        }
    }

    pub fn id(self) -> &'static str {
        match self {
            MoveCategory::Win => "win",
            MoveCategory::BlockWin => "block-win",
            MoveCategory::OpenFour => "open-four",
            MoveCategory::BlockOpenFour => "block-open-four",
            MoveCategory::DoubleThreat => "double-threat",
            MoveCategory::BlockDoubleThree => "block-double-three",
            MoveCategory::ClosedFour => "closed-four",
            MoveCategory::BlockOpenThree => "block-open-three",
            MoveCategory::BuildOpenThree => "build-open-three",
            MoveCategory::Pressure => "pressure",
        }
    }
}

impl fmt::Display for MoveCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// A scored, categorized move
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub pos: Pos,
    pub score: i64,
    pub attack: i64,
    pub defense: i64,
    pub category: MoveCategory,
    pub confidence: f64,
    /// Placing here gives us an open four
    pub attack_open_four: bool,
    /// The opponent would get an open four here
    pub defense_open_four: bool,
    pub reason: String,
}

/// Heuristic move engine
#[derive(Debug, Clone, Default)]
pub struct HeuristicEngine {
    pub weights: HeuristicWeights,
}

impl HeuristicEngine {
    pub fn new(weights: HeuristicWeights) -> Self {
        HeuristicEngine { weights }
    }

    /// Empty cells within the candidate radius of any stone
    ///
    /// An empty board yields only the center. If no stone has an empty
    /// neighbour in range, every empty cell is a candidate.
    pub fn candidates(&self, board: &Board, sealed: Option<Pos>) -> Vec<Pos> {
        if board.is_board_empty() {
            let center = board.center();
            return if sealed == Some(center) {
                board.empty_cells().into_iter().filter(|p| *p != center).collect()
            } else {
                vec![center]
            };
        }

        let radius = self.weights.candidate_radius;
        let stones: Vec<Pos> = board
            .positions()
            .filter(|&p| board.get(p).is_some())
            .collect();
        let mut out: Vec<Pos> = board
            .empty_cells()
            .into_iter()
            .filter(|p| Some(*p) != sealed)
            .filter(|p| stones.iter().any(|s| s.chebyshev(*p) <= radius))
            .collect();

        if out.is_empty() {
            out = board
                .empty_cells()
                .into_iter()
                .filter(|p| Some(*p) != sealed)
                .collect();
        }
        out
    }

    /// Score `side` placing at `pos`
    pub fn score_placement(&self, board: &Board, pos: Pos, side: Side) -> (i64, CellAnalysis) {
        let w = &self.weights;
        let analysis = analyze_cell(board, pos, side);
        if analysis.is_win() {
            return (w.win, analysis);
        }

        let mut score = 0;
        score += w.open_four * analysis.open_fours() as i64;
        if analysis.fours() >= 2 {
            score += w.multi_four_bonus;
        }
        score += w.closed_four * analysis.closed_fours() as i64;
        if analysis.is_double_three() {
            score += w.double_three;
        }
        score += w.open_three * analysis.open_threes() as i64;
        score += w.closed_three * analysis.closed_threes() as i64;
        score += w.open_two * analysis.open_twos() as i64;

        for line in &analysis.lines {
            if line.total >= 2 && line.open_ends() > 0 {
                let len = line.total as i64;
                score += w.line_strength * len * len;
            }
        }

        for (dr, dc) in DIRECTIONS {
            for sign in [1, -1] {
                if let Some(n) = pos.offset(dr * sign, dc * sign, 1, board.size()) {
                    match board.get(n) {
                        Some(owner) if owner == side => score += w.friendly_adjacency,
                        Some(_) => score += w.opponent_adjacency,
                        None => {}
                    }
                }
            }
        }

        let radius = board.size() / 2;
        let dist = pos.chebyshev(board.center());
        score += radius.saturating_sub(dist) as i64 * w.center_bonus;

        (score, analysis)
    }

    /// Score and categorize one candidate for `side`
    pub fn evaluate(&self, board: &Board, pos: Pos, side: Side) -> Suggestion {
        let (attack, own) = self.score_placement(board, pos, side);
        let (defense, opp) = self.score_placement(board, pos, side.opponent());
        let score = attack + (defense as f64 * self.weights.defense_weight).round() as i64;

        let (category, reason) = if own.is_win() {
            (MoveCategory::Win, format!("completes five at {pos}"))
        } else if opp.is_win() {
            (MoveCategory::BlockWin, format!("blocks opponent five at {pos}"))
        } else if own.open_fours() > 0 {
            (MoveCategory::OpenFour, format!("makes an open four at {pos}"))
        } else if opp.open_fours() > 0 {
            (MoveCategory::BlockOpenFour, format!("stops an open four at {pos}"))
        } else if own.is_double_three() || own.fours() >= 2 {
            (MoveCategory::DoubleThreat, format!("creates a double threat at {pos}"))
        } else if opp.is_double_three() {
            (MoveCategory::BlockDoubleThree, format!("breaks a double three at {pos}"))
        } else if own.closed_fours() > 0 {
            (MoveCategory::ClosedFour, format!("makes a closed four at {pos}"))
        } else if opp.open_threes() > 0 {
            (MoveCategory::BlockOpenThree, format!("caps an open three at {pos}"))
        } else if own.open_threes() > 0 {
            (MoveCategory::BuildOpenThree, format!("builds an open three at {pos}"))
        } else {
            (MoveCategory::Pressure, format!("positional pressure at {pos}"))
        };

        Suggestion {
            pos,
            score,
            attack,
            defense,
            category,
            confidence: category.confidence(),
            attack_open_four: own.open_fours() > 0,
            defense_open_four: opp.open_fours() > 0,
            reason,
        }
    }

    /// Best move for `side` on a bare board
    pub fn suggest_on_board(&self, board: &Board, side: Side, sealed: Option<Pos>) -> Option<Suggestion> {
        let evaluated: Vec<Suggestion> = self
            .candidates(board, sealed)
            .into_iter()
            .map(|pos| self.evaluate(board, pos, side))
            .collect();
        self.pick_within_margin(evaluated, board.center())
    }

    /// Among moves scoring within the tie margin of the best: highest
    /// confidence, then closest to the center
    fn pick_within_margin(&self, evaluated: Vec<Suggestion>, center: Pos) -> Option<Suggestion> {
        let best_score = evaluated.iter().map(|s| s.score).max()?;
        evaluated
            .into_iter()
            .filter(|s| s.score >= best_score - self.weights.tie_margin)
            .min_by(|a, b| {
                b.confidence
                    .partial_cmp(&a.confidence)
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| a.pos.chebyshev(center).cmp(&b.pos.chebyshev(center)))
                    .then_with(|| b.score.cmp(&a.score))
                    .then_with(|| a.pos.cmp(&b.pos))
            })
    }

    /// Best move for `side` in a live game (honours that side's sealed cell)
    pub fn suggest_move(&self, state: &GameStatus, side: Side) -> Option<Suggestion> {
        let sealed = state.statuses[side].active_seal(state.turn);
        self.suggest_on_board(&state.board, side, sealed)
    }

    /// Attack-only pick used by the deterministic fallback
    pub fn quick_pick(&self, board: &Board, side: Side, sealed: Option<Pos>) -> Option<(Pos, i64)> {
        let center = board.center();
        self.candidates(board, sealed)
            .into_iter()
            .map(|pos| (pos, self.score_placement(board, pos, side).0))
            .max_by(|a, b| {
                a.1.cmp(&b.1)
                    .then_with(|| b.0.chebyshev(center).cmp(&a.0.chebyshev(center)))
                    .then_with(|| b.0.cmp(&a.0))
            })
    }

    /// Whether the suggestion is clear enough to skip consulting the remote model
    pub fn should_autoplay(&self, suggestion: &Suggestion) -> bool {
        suggestion.category.is_forcing()
            || (suggestion.attack_open_four && suggestion.defense_open_four)
            || (suggestion.confidence >= 0.82 && suggestion.score > 12_000)
    }
}
