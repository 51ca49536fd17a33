//! Line pattern analysis
//!
//! For an empty cell and a player, each of the four axes is evaluated as if
//! the player placed a stone there: how many contiguous same-owner stones
//! extend forward and backward, and whether each end is open (the next cell
//! is empty) or blocked (opponent stone or board edge).

use crate::core::{Board, Pos, Side, DIRECTIONS};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Contiguous run through a hypothetical placement along one axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LineCount {
    pub forward: usize,
    pub backward: usize,
    /// Stones in the run including the placed one
    pub total: usize,
    pub open_forward: bool,
    pub open_backward: bool,
}

impl LineCount {
    pub fn open_ends(&self) -> u8 {
        self.open_forward as u8 + self.open_backward as u8
    }
}

/// Classification of a single line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LineShape {
    /// Nothing worth naming (single stone or a fully blocked run)
    Nothing,
    ClosedTwo,
    OpenTwo,
    ClosedThree,
    OpenThree,
    ClosedFour,
    OpenFour,
    /// Five or more: always reported alone, never together with a lesser shape
    Win,
}

impl LineShape {
    pub fn classify(line: &LineCount) -> LineShape {
        if line.total >= 5 {
            return LineShape::Win;
        }
        match (line.total, line.open_ends()) {
            (4, 2) => LineShape::OpenFour,
            (4, 1) => LineShape::ClosedFour,
            (3, 2) => LineShape::OpenThree,
            (3, 1) => LineShape::ClosedThree,
            (2, 2) => LineShape::OpenTwo,
            (2, 1) => LineShape::ClosedTwo,
            _ => LineShape::Nothing,
        }
    }

    pub fn is_four(self) -> bool {
        matches!(self, LineShape::OpenFour | LineShape::ClosedFour)
    }
}

impl fmt::Display for LineShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LineShape::Nothing => "nothing",
            LineShape::ClosedTwo => "closed two",
            LineShape::OpenTwo => "open two",
            LineShape::ClosedThree => "closed three",
            LineShape::OpenThree => "open three",
            LineShape::ClosedFour => "closed four",
            LineShape::OpenFour => "open four",
            LineShape::Win => "five",
        };
        f.write_str(s)
    }
}

/// Count the run `side` would form by placing at `pos` along `dir`
pub fn count_line(board: &Board, pos: Pos, side: Side, (dr, dc): (isize, isize)) -> LineCount {
    let size = board.size();
    let scan = |sign: isize| -> (usize, bool) {
        let mut count = 0;
        let mut step = 1;
        loop {
            match pos.offset(dr * sign, dc * sign, step, size) {
                Some(next) if board.get(next) == Some(side) => {
                    count += 1;
                    step += 1;
                }
                Some(next) => return (count, board.get(next).is_none()),
                None => return (count, false),
            }
        }
    };
    let (forward, open_forward) = scan(1);
    let (backward, open_backward) = scan(-1);
    LineCount {
        forward,
        backward,
        total: forward + backward + 1,
        open_forward,
        open_backward,
    }
}

/// The four-axis evaluation of one cell for one player
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellAnalysis {
    pub pos: Pos,
    pub side: Side,
    pub lines: [LineCount; 4],
    pub shapes: [LineShape; 4],
}

impl CellAnalysis {
    fn count(&self, shape: LineShape) -> usize {
        self.shapes.iter().filter(|s| **s == shape).count()
    }

    pub fn is_win(&self) -> bool {
        self.shapes.contains(&LineShape::Win)
    }

    pub fn open_fours(&self) -> usize {
        self.count(LineShape::OpenFour)
    }

    pub fn closed_fours(&self) -> usize {
        self.count(LineShape::ClosedFour)
    }

    pub fn fours(&self) -> usize {
        self.shapes.iter().filter(|s| s.is_four()).count()
    }

    pub fn open_threes(&self) -> usize {
        self.count(LineShape::OpenThree)
    }

    pub fn closed_threes(&self) -> usize {
        self.count(LineShape::ClosedThree)
    }

    pub fn open_twos(&self) -> usize {
        self.count(LineShape::OpenTwo)
    }

    /// Two or more axes independently reach an open three
    pub fn is_double_three(&self) -> bool {
        self.open_threes() >= 2
    }

    pub fn strongest(&self) -> LineShape {
        self.shapes.iter().copied().max().unwrap_or(LineShape::Nothing)
    }
}

pub fn analyze_cell(board: &Board, pos: Pos, side: Side) -> CellAnalysis {
    let lines = DIRECTIONS.map(|dir| count_line(board, pos, side, dir));
    let shapes = lines.map(|line| LineShape::classify(&line));
    CellAnalysis {
        pos,
        side,
        lines,
        shapes,
    }
}

/// Urgent cells for one player, for human-readable board summaries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreatSummary {
    pub wins: Vec<Pos>,
    pub open_fours: Vec<Pos>,
    pub double_threes: Vec<Pos>,
    pub open_threes: Vec<Pos>,
}

impl ThreatSummary {
    pub fn is_quiet(&self) -> bool {
        self.wins.is_empty()
            && self.open_fours.is_empty()
            && self.double_threes.is_empty()
            && self.open_threes.is_empty()
    }

    pub fn describe(&self, side: Side) -> String {
        if self.is_quiet() {
            return format!("{side}: no immediate threats");
        }
        let fmt_cells = |cells: &[Pos]| {
            cells
                .iter()
                .take(4)
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join(" ")
        };
        let mut parts = Vec::new();
        if !self.wins.is_empty() {
            parts.push(format!("wins at {}", fmt_cells(&self.wins)));
        }
        if !self.open_fours.is_empty() {
            parts.push(format!("open four at {}", fmt_cells(&self.open_fours)));
        }
        if !self.double_threes.is_empty() {
            parts.push(format!("double three at {}", fmt_cells(&self.double_threes)));
        }
        if !self.open_threes.is_empty() {
            parts.push(format!("open three at {}", fmt_cells(&self.open_threes)));
        }
        format!("{side}: {}", parts.join("; "))
    }
}

/// Scan every empty cell next to a stone for `side`'s threats
pub fn scan_threats(board: &Board, side: Side) -> ThreatSummary {
    let mut summary = ThreatSummary::default();
    for pos in board.empty_cells() {
        let near_stone = DIRECTIONS.iter().any(|&(dr, dc)| {
            [1, -1].iter().any(|&sign| {
                pos.offset(dr * sign, dc * sign, 1, board.size())
                    .is_some_and(|n| board.get(n).is_some())
            })
        });
        if !near_stone {
            continue;
        }
        let analysis = analyze_cell(board, pos, side);
        if analysis.is_win() {
            summary.wins.push(pos);
        } else if analysis.open_fours() > 0 {
            summary.open_fours.push(pos);
        } else if analysis.is_double_three() {
            summary.double_threes.push(pos);
        } else if analysis.open_threes() > 0 {
            summary.open_threes.push(pos);
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_with(stones: &[(usize, usize, Side)]) -> Board {
        let mut board = Board::default();
        for &(r, c, side) in stones {
            board.place(Pos::new(r, c), side);
        }
        board
    }

    #[test]
    fn test_count_line_open_three() {
        let board = board_with(&[(7, 6, Side::A), (7, 8, Side::A)]);
        let line = count_line(&board, Pos::new(7, 7), Side::A, (0, 1));
        assert_eq!(line.total, 3);
        assert_eq!(line.forward, 1);
        assert_eq!(line.backward, 1);
        assert_eq!(line.open_ends(), 2);
        assert_eq!(LineShape::classify(&line), LineShape::OpenThree);
    }

    #[test]
    fn test_blocked_by_opponent_and_edge() {
        let board = board_with(&[(0, 1, Side::A), (0, 2, Side::A), (0, 3, Side::A), (0, 4, Side::B)]);
        let line = count_line(&board, Pos::new(0, 0), Side::A, (0, 1));
        assert_eq!(line.total, 4);
        assert_eq!(line.open_ends(), 0);
        assert_eq!(LineShape::classify(&line), LineShape::Nothing);
    }

    #[test]
    fn test_closed_four() {
        let board = board_with(&[(5, 1, Side::B), (5, 2, Side::A), (5, 3, Side::A), (5, 4, Side::A)]);
        let analysis = analyze_cell(&board, Pos::new(5, 5), Side::A);
        assert_eq!(analysis.closed_fours(), 1);
        assert_eq!(analysis.open_fours(), 0);
    }

    #[test]
    fn test_win_dominates() {
        let board = board_with(&[(3, 3, Side::A), (3, 4, Side::A), (3, 5, Side::A), (3, 6, Side::A)]);
        let analysis = analyze_cell(&board, Pos::new(3, 7), Side::A);
        assert!(analysis.is_win());
        assert_eq!(analysis.shapes[0], LineShape::Win);
        assert_eq!(analysis.open_fours() + analysis.closed_fours(), 0);
        assert_eq!(analysis.strongest(), LineShape::Win);
    }

    #[test]
    fn test_double_three() {
        // Horizontal pair and vertical pair meeting at (7, 7)
        let board = board_with(&[(7, 5, Side::A), (7, 6, Side::A), (5, 7, Side::A), (6, 7, Side::A)]);
        let analysis = analyze_cell(&board, Pos::new(7, 7), Side::A);
        assert_eq!(analysis.open_threes(), 2);
        assert!(analysis.is_double_three());
    }

    #[test]
    fn test_scan_threats() {
        let board = board_with(&[(7, 5, Side::A), (7, 6, Side::A), (7, 7, Side::A), (7, 8, Side::A)]);
        let summary = scan_threats(&board, Side::A);
        assert!(summary.wins.contains(&Pos::new(7, 4)));
        assert!(summary.wins.contains(&Pos::new(7, 9)));
        assert!(summary.describe(Side::A).contains("wins at"));
        assert!(scan_threats(&board, Side::B).is_quiet());
    }
}
