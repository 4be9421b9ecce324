//! Win-combination evaluator
//!
//! A win is a chain of equal symbols running across every reel, left to
//! right. Between neighbouring reels the chain may stay on its row or shift
//! one row down or up, so a winning line can zig-zag.

use serde::{Deserialize, Serialize};

use crate::config::VISIBLE_ROWS;
use crate::error::ReelResult;
use crate::reel::Reel;
use crate::symbols::SymbolType;

/// Row marker for a reel that is not part of a winning line
pub const NO_WIN_ROW: i8 = -1;

/// Resting symbols of every reel, indexed `[reel][row]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolGrid {
    columns: Vec<[Option<SymbolType>; VISIBLE_ROWS]>,
}

impl SymbolGrid {
    pub fn new(columns: Vec<[Option<SymbolType>; VISIBLE_ROWS]>) -> Self {
        Self { columns }
    }

    /// Grid from fully populated columns
    pub fn from_symbols(columns: &[[SymbolType; VISIBLE_ROWS]]) -> Self {
        Self::new(columns.iter().map(|col| col.map(Some)).collect())
    }

    /// Snapshot the visible rows of reels that are all at rest
    pub fn from_reels<H>(reels: &[Reel<H>]) -> ReelResult<Self> {
        let columns = reels
            .iter()
            .map(|reel| reel.at_rest().map(|view| view.visible_symbols()))
            .collect::<ReelResult<Vec<_>>>()?;
        Ok(Self { columns })
    }

    pub fn reel_count(&self) -> usize {
        self.columns.len()
    }

    /// Symbol at `reel`/`row`; `None` outside the grid
    pub fn symbol_at(&self, reel: usize, row: usize) -> Option<SymbolType> {
        self.columns.get(reel).and_then(|col| col.get(row).copied().flatten())
    }

    /// Does the symbol on `reel`/`row` continue on the next reel?
    ///
    /// Tries the same row, then one row down, then one row up. On a diagonal
    /// match `row` is moved to the matching row. The last reel has no
    /// neighbour and never matches.
    pub fn adjacent_match(&self, reel: usize, row: &mut usize) -> bool {
        let next = reel + 1;
        if next >= self.reel_count() || *row >= VISIBLE_ROWS {
            return false;
        }
        let Some(current) = self.symbol_at(reel, *row) else {
            return false;
        };
        let matches = |candidate: usize| self.symbol_at(next, candidate) == Some(current);

        if matches(*row) {
            return true;
        }
        if *row + 1 < VISIBLE_ROWS && matches(*row + 1) {
            *row += 1;
            return true;
        }
        if *row > 0 && matches(*row - 1) {
            *row -= 1;
            return true;
        }
        false
    }
}

/// Rows making up a winning line, one per reel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinLine {
    pub rows: Vec<usize>,
}

impl WinLine {
    /// Row the line starts on at the first reel
    pub fn start_row(&self) -> usize {
        self.rows.first().copied().unwrap_or(0)
    }

    /// Line never leaves its starting row
    pub fn is_straight(&self) -> bool {
        self.rows.windows(2).all(|pair| pair[0] == pair[1])
    }
}

/// Evaluator with its per-reel working array
#[derive(Debug, Clone)]
pub struct WinEvaluator {
    winning_rows: Vec<i8>,
}

impl WinEvaluator {
    pub fn new(reel_count: usize) -> Self {
        Self {
            winning_rows: vec![NO_WIN_ROW; reel_count],
        }
    }

    /// Row per reel from the last evaluation, `NO_WIN_ROW` where none
    pub fn winning_rows(&self) -> &[i8] {
        &self.winning_rows
    }

    fn clear(&mut self) {
        self.winning_rows.fill(NO_WIN_ROW);
    }

    /// Scan starting rows top to bottom and return the first full line.
    ///
    /// A single-reel grid wins on row 0 (nothing to compare against).
    pub fn evaluate(&mut self, grid: &SymbolGrid) -> Option<WinLine> {
        let reel_count = grid.reel_count();
        self.winning_rows = vec![NO_WIN_ROW; reel_count];
        if reel_count == 0 {
            return None;
        }

        for start in 0..VISIBLE_ROWS {
            let mut row = start;
            let mut rows = Vec::with_capacity(reel_count);
            rows.push(start);

            for reel in 0..reel_count - 1 {
                if !grid.adjacent_match(reel, &mut row) {
                    break;
                }
                rows.push(row);
            }

            if rows.len() == reel_count {
                for (slot, &r) in self.winning_rows.iter_mut().zip(&rows) {
                    *slot = r as i8;
                }
                return Some(WinLine { rows });
            }
            self.clear();
        }
        None
    }

    /// Declare every reel winning on `row` without evaluating (demo builds)
    pub fn force_row(&mut self, reel_count: usize, row: usize) -> WinLine {
        let row = row.min(VISIBLE_ROWS - 1);
        self.winning_rows = vec![row as i8; reel_count];
        WinLine {
            rows: vec![row; reel_count],
        }
    }
}
