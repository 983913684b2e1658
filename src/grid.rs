use serde::Serialize;

use crate::piece::ActivePiece;

pub const COLS: usize = 10;
pub const ROWS: usize = 20;

/// Playfield matrix. `cells[row][col]`, row 0 at the top; 0 is empty and 1-7
/// are piece colors. The dimensions are fixed at construction.
#[derive(Clone, Serialize, Debug, PartialEq, Eq)]
pub struct Grid {
    cols: usize,
    rows: usize,
    cells: Vec<Vec<u8>>,
}

impl Default for Grid {
    fn default() -> Self {
        Self::new(COLS, ROWS)
    }
}

impl Grid {
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            cols,
            rows,
            cells: vec![vec![0; cols]; rows],
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cells(&self) -> &[Vec<u8>] {
        &self.cells
    }

    pub fn get(&self, x: i32, y: i32) -> Option<u8> {
        if x < 0 || y < 0 {
            return None;
        }
        self.cells.get(y as usize)?.get(x as usize).copied()
    }

    pub fn set(&mut self, x: usize, y: usize, value: u8) {
        if let Some(cell) = self.cells.get_mut(y).and_then(|row| row.get_mut(x)) {
            *cell = value;
        }
    }

    /// Anything outside the playfield counts as solid, so walls and floor
    /// collide the same way stacked cells do.
    pub fn is_occupied(&self, x: i32, y: i32) -> bool {
        match self.get(x, y) {
            Some(v) => v != 0,
            None => true,
        }
    }

    pub fn collides(&self, piece: &ActivePiece) -> bool {
        piece.cells().any(|(x, y, _)| self.is_occupied(x, y))
    }

    /// Writes the piece colors into the grid. Cells outside the playfield are
    /// skipped.
    pub fn merge(&mut self, piece: &ActivePiece) {
        for (x, y, c) in piece.cells() {
            if x >= 0 && y >= 0 {
                self.set(x as usize, y as usize, c);
            }
        }
    }

    pub fn is_row_full(&self, y: usize) -> bool {
        self.cells
            .get(y)
            .is_some_and(|row| row.iter().all(|&c| c != 0))
    }

    /// Removes every full row, bottom-up, inserting an empty row at the top for
    /// each. Returns the number of rows removed.
    pub fn sweep(&mut self) -> usize {
        let mut cleared = 0;
        let mut y = self.rows;
        while y > 0 {
            if self.is_row_full(y - 1) {
                self.cells.remove(y - 1);
                self.cells.insert(0, vec![0; self.cols]);
                cleared += 1;
                // same index again: the row above just moved down into it
            } else {
                y -= 1;
            }
        }
        cleared
    }

    pub fn clear(&mut self) {
        for row in self.cells.iter_mut() {
            row.fill(0);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|row| row.iter().all(|&c| c == 0))
    }

    /// Copy of the grid with `piece` painted on top, clipped to the playfield.
    pub fn snapshot_with(&self, piece: Option<&ActivePiece>) -> Vec<Vec<u8>> {
        let mut snapshot = self.cells.clone();
        if let Some(piece) = piece {
            for (x, y, c) in piece.cells() {
                if x >= 0 && y >= 0 {
                    if let Some(cell) = snapshot
                        .get_mut(y as usize)
                        .and_then(|row| row.get_mut(x as usize))
                    {
                        *cell = c;
                    }
                }
            }
        }
        snapshot
    }

    /// Row the piece would rest on if dropped straight down.
    pub fn landing_y(&self, piece: &ActivePiece) -> i32 {
        let mut probe = *piece;
        while !self.collides(&probe.shifted(0, 1)) {
            probe.y += 1;
        }
        probe.y
    }

    #[cfg(test)]
    pub(crate) fn from_rows(rows: Vec<Vec<u8>>) -> Self {
        let cols = rows.first().map(|r| r.len()).unwrap_or(0);
        Self {
            cols,
            rows: rows.len(),
            cells: rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piece::{Shape, Tetromino};

    fn piece(kind: Tetromino, x: i32, y: i32) -> ActivePiece {
        ActivePiece::new(Shape::of(kind), x, y)
    }

    #[test]
    fn new_grid_is_empty() {
        let grid = Grid::new(COLS, ROWS);
        assert_eq!(grid.cols(), 10);
        assert_eq!(grid.rows(), 20);
        assert!(grid.is_empty());
    }

    #[test]
    fn walls_and_floor_collide() {
        let grid = Grid::default();
        // O occupies matrix columns 0..2
        assert!(!grid.collides(&piece(Tetromino::O, 0, 0)));
        assert!(grid.collides(&piece(Tetromino::O, -1, 0)));
        assert!(!grid.collides(&piece(Tetromino::O, 8, 0)));
        assert!(grid.collides(&piece(Tetromino::O, 9, 0)));
        assert!(!grid.collides(&piece(Tetromino::O, 4, 18)));
        assert!(grid.collides(&piece(Tetromino::O, 4, 19)));
    }

    #[test]
    fn empty_matrix_columns_may_hang_off_the_edge() {
        let grid = Grid::default();
        // vertical I lives in matrix column 1 only
        assert!(!grid.collides(&piece(Tetromino::I, -1, 0)));
        assert!(grid.collides(&piece(Tetromino::I, -2, 0)));
        assert!(!grid.collides(&piece(Tetromino::I, 8, 0)));
        assert!(grid.collides(&piece(Tetromino::I, 9, 0)));
    }

    #[test]
    fn stacked_cells_collide() {
        let mut grid = Grid::default();
        grid.set(5, 10, 2);
        assert!(grid.collides(&piece(Tetromino::O, 4, 9)));
        assert!(grid.collides(&piece(Tetromino::O, 5, 10)));
        assert!(!grid.collides(&piece(Tetromino::O, 6, 9)));
    }

    #[test]
    fn merge_writes_colors() {
        let mut grid = Grid::default();
        grid.merge(&piece(Tetromino::T, 3, 5));
        assert_eq!(grid.get(4, 5), Some(7));
        assert_eq!(grid.get(3, 6), Some(7));
        assert_eq!(grid.get(4, 6), Some(7));
        assert_eq!(grid.get(5, 6), Some(7));
        assert_eq!(grid.get(3, 5), Some(0));
    }

    #[test]
    fn sweep_removes_full_rows_and_keeps_order() {
        let full = vec![1; 4];
        let a = vec![2, 0, 0, 0];
        let b = vec![0, 3, 0, 0];
        let mut grid = Grid::from_rows(vec![
            vec![0; 4],
            a.clone(),
            full.clone(),
            b.clone(),
            full.clone(),
            full.clone(),
        ]);
        assert_eq!(grid.sweep(), 3);
        assert_eq!(
            grid.cells(),
            &[vec![0; 4], vec![0; 4], vec![0; 4], vec![0; 4], a, b][..]
        );
    }

    #[test]
    fn sweep_rechecks_row_that_moved_down() {
        let mut grid = Grid::from_rows(vec![vec![0, 1], vec![1, 1], vec![1, 1]]);
        assert_eq!(grid.sweep(), 2);
        assert_eq!(grid.cells(), &[vec![0, 0], vec![0, 0], vec![0, 1]][..]);
    }

    #[test]
    fn sweep_clears_top_row() {
        let mut grid = Grid::from_rows(vec![vec![1, 1], vec![0, 1]]);
        assert_eq!(grid.sweep(), 1);
        assert_eq!(grid.cells(), &[vec![0, 0], vec![0, 1]][..]);
    }

    #[test]
    fn snapshot_overlays_piece_without_touching_grid() {
        let grid = Grid::default();
        let snap = grid.snapshot_with(Some(&piece(Tetromino::O, 0, 0)));
        assert_eq!(snap[0][0], 3);
        assert_eq!(snap[1][1], 3);
        assert!(grid.is_empty());
    }

    #[test]
    fn landing_row_rests_on_stack() {
        let mut grid = Grid::default();
        assert_eq!(grid.landing_y(&piece(Tetromino::O, 4, 0)), 18);
        grid.set(4, 15, 1);
        assert_eq!(grid.landing_y(&piece(Tetromino::O, 4, 0)), 13);
    }
}
