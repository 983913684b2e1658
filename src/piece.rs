use serde::{Deserialize, Serialize};

/// Largest shape matrix side (the I piece).
pub const MAX_SHAPE_SIZE: usize = 4;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
pub enum Tetromino {
    I,
    L,
    J,
    O,
    Z,
    S,
    T,
}

impl Tetromino {
    pub fn all() -> [Tetromino; 7] {
        [
            Tetromino::I,
            Tetromino::L,
            Tetromino::J,
            Tetromino::O,
            Tetromino::Z,
            Tetromino::S,
            Tetromino::T,
        ]
    }

    pub fn color_id(self) -> u8 {
        match self {
            Tetromino::Z => 1,
            Tetromino::L => 2,
            Tetromino::O => 3,
            Tetromino::S => 4,
            Tetromino::I => 5,
            Tetromino::J => 6,
            Tetromino::T => 7,
        }
    }

    pub fn shape(self) -> Shape {
        Shape::of(self)
    }
}

/// Square cell matrix for a piece. Only the top-left `size × size` block is
/// meaningful; the rest stays zero.
///
/// Shapes are plain values: rotating yields a new `Shape`, so the canonical
/// matrices can never be corrupted through a shared reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Shape {
    size: usize,
    cells: [[u8; MAX_SHAPE_SIZE]; MAX_SHAPE_SIZE],
}

impl Shape {
    pub fn of(piece: Tetromino) -> Shape {
        let c = piece.color_id();
        match piece {
            Tetromino::I => Shape::from_rows(&[
                &[0, c, 0, 0],
                &[0, c, 0, 0],
                &[0, c, 0, 0],
                &[0, c, 0, 0],
            ]),
            Tetromino::L => Shape::from_rows(&[&[0, c, 0], &[0, c, 0], &[0, c, c]]),
            Tetromino::J => Shape::from_rows(&[&[0, c, 0], &[0, c, 0], &[c, c, 0]]),
            Tetromino::O => Shape::from_rows(&[&[c, c], &[c, c]]),
            Tetromino::Z => Shape::from_rows(&[&[c, c, 0], &[0, c, c], &[0, 0, 0]]),
            Tetromino::S => Shape::from_rows(&[&[0, c, c], &[c, c, 0], &[0, 0, 0]]),
            Tetromino::T => Shape::from_rows(&[&[0, c, 0], &[c, c, c], &[0, 0, 0]]),
        }
    }

    /// Builds a shape from square rows. Extra columns beyond the row count are
    /// ignored, as are rows past `MAX_SHAPE_SIZE`.
    pub fn from_rows(rows: &[&[u8]]) -> Shape {
        let size = rows.len().min(MAX_SHAPE_SIZE);
        let mut cells = [[0; MAX_SHAPE_SIZE]; MAX_SHAPE_SIZE];
        for (y, row) in rows.iter().take(size).enumerate() {
            for (x, &value) in row.iter().take(size).enumerate() {
                cells[y][x] = value;
            }
        }
        Shape { size, cells }
    }

    pub fn width(&self) -> usize {
        self.size
    }

    /// Occupied cells as `(x, y, color)` relative to the matrix origin.
    pub fn filled(&self) -> impl Iterator<Item = (i32, i32, u8)> + '_ {
        (0..self.size).flat_map(move |y| {
            (0..self.size).filter_map(move |x| {
                let v = self.cells[y][x];
                (v != 0).then_some((x as i32, y as i32, v))
            })
        })
    }

    /// Quarter turn: transpose, then mirror each row for clockwise (`dir > 0`)
    /// or flip the row order for counter-clockwise.
    pub fn rotated(&self, dir: i32) -> Shape {
        let n = self.size;
        let mut out = *self;
        for y in 0..n {
            for x in 0..n {
                out.cells[y][x] = self.cells[x][y];
            }
        }
        if dir > 0 {
            for row in out.cells.iter_mut().take(n) {
                row[..n].reverse();
            }
        } else {
            out.cells[..n].reverse();
        }
        out
    }

    pub fn rows(&self) -> Vec<Vec<u8>> {
        (0..self.size)
            .map(|y| self.cells[y][..self.size].to_vec())
            .collect()
    }
}

impl Serialize for Shape {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.rows().serialize(serializer)
    }
}

/// A shape placed on the playfield. `x`/`y` locate the top-left corner of the
/// shape matrix in grid coordinates (row 0 is the top).
#[derive(Clone, Copy, Serialize, Debug, PartialEq, Eq)]
pub struct ActivePiece {
    pub x: i32,
    pub y: i32,
    pub shape: Shape,
}

impl ActivePiece {
    pub fn new(shape: Shape, x: i32, y: i32) -> Self {
        Self { x, y, shape }
    }

    pub fn shifted(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    /// Absolute `(x, y, color)` of every occupied cell.
    pub fn cells(&self) -> impl Iterator<Item = (i32, i32, u8)> + '_ {
        self.shape
            .filled()
            .map(move |(dx, dy, c)| (self.x + dx, self.y + dy, c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_shapes_match_reference() {
        assert_eq!(
            Shape::of(Tetromino::I).rows(),
            vec![vec![0, 5, 0, 0]; 4]
        );
        assert_eq!(
            Shape::of(Tetromino::L).rows(),
            vec![vec![0, 2, 0], vec![0, 2, 0], vec![0, 2, 2]]
        );
        assert_eq!(
            Shape::of(Tetromino::J).rows(),
            vec![vec![0, 6, 0], vec![0, 6, 0], vec![6, 6, 0]]
        );
        assert_eq!(Shape::of(Tetromino::O).rows(), vec![vec![3, 3], vec![3, 3]]);
        assert_eq!(
            Shape::of(Tetromino::Z).rows(),
            vec![vec![1, 1, 0], vec![0, 1, 1], vec![0, 0, 0]]
        );
        assert_eq!(
            Shape::of(Tetromino::S).rows(),
            vec![vec![0, 4, 4], vec![4, 4, 0], vec![0, 0, 0]]
        );
        assert_eq!(
            Shape::of(Tetromino::T).rows(),
            vec![vec![0, 7, 0], vec![7, 7, 7], vec![0, 0, 0]]
        );
    }

    #[test]
    fn every_shape_has_four_cells() {
        for piece in Tetromino::all() {
            assert_eq!(piece.shape().filled().count(), 4, "{:?}", piece);
        }
    }

    #[test]
    fn four_turns_restore_every_shape() {
        for piece in Tetromino::all() {
            let base = piece.shape();
            for dir in [1, -1] {
                let mut s = base;
                for _ in 0..4 {
                    s = s.rotated(dir);
                }
                assert_eq!(s, base, "{:?} dir {}", piece, dir);
            }
        }
    }

    #[test]
    fn clockwise_then_counter_clockwise_is_identity() {
        for piece in Tetromino::all() {
            let base = piece.shape();
            assert_eq!(base.rotated(1).rotated(-1), base);
        }
    }

    #[test]
    fn t_rotates_clockwise() {
        let t = Shape::of(Tetromino::T).rotated(1);
        assert_eq!(t.rows(), vec![vec![0, 7, 0], vec![0, 7, 7], vec![0, 7, 0]]);
        let t = Shape::of(Tetromino::T).rotated(-1);
        assert_eq!(t.rows(), vec![vec![0, 7, 0], vec![7, 7, 0], vec![0, 7, 0]]);
    }
}
