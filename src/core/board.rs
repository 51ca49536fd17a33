//! Gomoku board: stone grid, move history, win detection and snapshots

use crate::core::Side;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Standard board size
pub const BOARD_SIZE: usize = 15;

/// The four line axes: horizontal, vertical, diagonal "\" and diagonal "/"
pub const DIRECTIONS: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

/// A board coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pos {
    pub row: usize,
    pub col: usize,
}

impl Pos {
    pub fn new(row: usize, col: usize) -> Self {
        Pos { row, col }
    }

    /// Step `steps` times along `(dr, dc)`, returning None when leaving the board
    pub fn offset(self, dr: isize, dc: isize, steps: isize, size: usize) -> Option<Pos> {
        let row = self.row as isize + dr * steps;
        let col = self.col as isize + dc * steps;
        if row < 0 || col < 0 || row >= size as isize || col >= size as isize {
            return None;
        }
        Some(Pos::new(row as usize, col as usize))
    }

    /// Chebyshev (king-move) distance
    pub fn chebyshev(self, other: Pos) -> usize {
        self.row.abs_diff(other.row).max(self.col.abs_diff(other.col))
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// A stone placement recorded in the move history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub pos: Pos,
    pub side: Side,
}

/// Deep, independent copy of a board used for time travel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub size: usize,
    pub cells: Vec<Option<Side>>,
    pub history: Vec<Move>,
}

/// Square gomoku board
///
/// A cell only goes from empty to owned through [`Board::place`]; an owned
/// cell must be cleared with [`Board::remove`] before it can change hands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    size: usize,
    cells: Vec<Option<Side>>,
    history: Vec<Move>,
}

impl Board {
    pub fn new(size: usize) -> Self {
        Board {
            size,
            cells: vec![None; size * size],
            history: Vec::new(),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn center(&self) -> Pos {
        Pos::new(self.size / 2, self.size / 2)
    }

    pub fn in_bounds(&self, pos: Pos) -> bool {
        pos.row < self.size && pos.col < self.size
    }

    fn idx(&self, pos: Pos) -> usize {
        pos.row * self.size + pos.col
    }

    /// Owner of a cell (None for empty or out of range)
    pub fn get(&self, pos: Pos) -> Option<Side> {
        if !self.in_bounds(pos) {
            return None;
        }
        self.cells[self.idx(pos)]
    }

    pub fn is_empty_cell(&self, pos: Pos) -> bool {
        self.in_bounds(pos) && self.cells[self.idx(pos)].is_none()
    }

    /// Place a stone. Returns false if the cell is occupied or out of range.
    pub fn place(&mut self, pos: Pos, side: Side) -> bool {
        if !self.is_empty_cell(pos) {
            return false;
        }
        let idx = self.idx(pos);
        self.cells[idx] = Some(side);
        self.history.push(Move { pos, side });
        true
    }

    /// Clear a cell, returning its previous owner. History is left untouched.
    pub fn remove(&mut self, pos: Pos) -> Option<Side> {
        if !self.in_bounds(pos) {
            return None;
        }
        let idx = self.idx(pos);
        self.cells[idx].take()
    }

    /// Visit every cell in row-major order
    pub fn for_each_cell(&self, mut f: impl FnMut(Pos, Option<Side>)) {
        for row in 0..self.size {
            for col in 0..self.size {
                let pos = Pos::new(row, col);
                f(pos, self.cells[self.idx(pos)]);
            }
        }
    }

    /// Iterate every cell position in row-major order
    pub fn positions(&self) -> impl Iterator<Item = Pos> + '_ {
        (0..self.size).flat_map(move |row| (0..self.size).map(move |col| Pos::new(row, col)))
    }

    /// Positions of all stones owned by `side`
    pub fn stones(&self, side: Side) -> Vec<Pos> {
        self.positions().filter(|&p| self.get(p) == Some(side)).collect()
    }

    pub fn empty_cells(&self) -> Vec<Pos> {
        self.positions().filter(|&p| self.is_empty_cell(p)).collect()
    }

    pub fn count(&self, side: Side) -> usize {
        self.cells.iter().filter(|c| **c == Some(side)).count()
    }

    pub fn stone_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    pub fn is_board_empty(&self) -> bool {
        self.cells.iter().all(|c| c.is_none())
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|c| c.is_some())
    }

    pub fn history(&self) -> &[Move] {
        &self.history
    }

    pub fn last_move(&self) -> Option<Move> {
        self.history.last().copied()
    }

    /// Length of the same-owner run through `pos` along one axis
    pub fn run_length(&self, pos: Pos, side: Side, (dr, dc): (isize, isize)) -> usize {
        let mut count = 1;
        for sign in [1, -1] {
            let mut step = 1;
            while let Some(next) = pos.offset(dr * sign, dc * sign, step, self.size) {
                if self.get(next) != Some(side) {
                    break;
                }
                count += 1;
                step += 1;
            }
        }
        count
    }

    /// True when some axis-aligned run of five or more of `side` exists.
    /// Overlines count as wins.
    pub fn check_win(&self, side: Side) -> bool {
        self.positions()
            .filter(|&p| self.get(p) == Some(side))
            .any(|p| DIRECTIONS.iter().any(|&dir| self.run_length(p, side, dir) >= 5))
    }

    pub fn to_snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            size: self.size,
            cells: self.cells.clone(),
            history: self.history.clone(),
        }
    }

    /// Replace this board's grid and history with a snapshot's
    pub fn restore(&mut self, snapshot: &BoardSnapshot) {
        self.size = snapshot.size;
        self.cells = snapshot.cells.clone();
        self.history = snapshot.history.clone();
    }

    pub fn from_snapshot(snapshot: &BoardSnapshot) -> Self {
        let mut board = Board::new(snapshot.size);
        board.restore(snapshot);
        board
    }

    /// Rows of glyphs, `.` for empty
    pub fn to_ascii(&self) -> String {
        let mut out = String::with_capacity(self.size * (self.size + 1));
        for row in 0..self.size {
            for col in 0..self.size {
                out.push(self.get(Pos::new(row, col)).map_or('.', Side::glyph));
            }
            out.push('\n');
        }
        out
    }

    /// Numeric matrix (0 empty, 1 = A, 2 = B)
    pub fn to_matrix(&self) -> Vec<Vec<u8>> {
        (0..self.size)
            .map(|row| {
                (0..self.size)
                    .map(|col| self.get(Pos::new(row, col)).map_or(0, Side::matrix_value))
                    .collect()
            })
            .collect()
    }

    /// Parse an ASCII render (`X`/`O`/`.` rows). History follows row-major order.
    pub fn from_ascii(text: &str) -> Option<Board> {
        let rows: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        let size = rows.len();
        if size == 0 {
            return None;
        }
        let mut board = Board::new(size);
        for (row, line) in rows.iter().enumerate() {
            let glyphs: Vec<char> = line.chars().filter(|c| !c.is_whitespace()).collect();
            if glyphs.len() != size {
                return None;
            }
            for (col, glyph) in glyphs.into_iter().enumerate() {
                let side = match glyph {
                    'X' | 'x' | '1' => Some(Side::A),
                    'O' | 'o' | '2' => Some(Side::B),
                    '.' | '0' | '+' | '_' => None,
                    _ => return None,
                };
                if let Some(side) = side {
                    board.place(Pos::new(row, col), side);
                }
            }
        }
        Some(board)
    }
}

impl Default for Board {
    fn default() -> Self {
        Board::new(BOARD_SIZE)
    }
}
