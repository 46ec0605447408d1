/// The 4×4 merge grid and its pure slide/merge rules.
///
/// Cells hold tile values directly (0 = empty, otherwise a power of two ≥ 2).
/// Nothing here is random or stateful: `Grid::slide` returns a new grid and
/// the score gained, and the engine decides whether to commit it.

use std::fmt;

pub const SIZE: usize = 4;

/// A direction to slide and merge tiles.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    #[cfg(test)]
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];
}

/// Grid coordinates of one cell.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Pos {
    pub row: usize,
    pub col: usize,
}

#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct Grid {
    cells: [[u32; SIZE]; SIZE],
}

impl Grid {
    pub const EMPTY: Grid = Grid { cells: [[0; SIZE]; SIZE] };

    pub fn from_rows(cells: [[u32; SIZE]; SIZE]) -> Self {
        Grid { cells }
    }

    pub fn rows(&self) -> &[[u32; SIZE]; SIZE] {
        &self.cells
    }

    pub fn get(&self, pos: Pos) -> u32 {
        self.cells[pos.row][pos.col]
    }

    pub fn set(&mut self, pos: Pos, value: u32) {
        self.cells[pos.row][pos.col] = value;
    }

    /// Empty cells in row-major order.
    pub fn empty_cells(&self) -> Vec<Pos> {
        let mut out = Vec::with_capacity(SIZE * SIZE);
        for (row, line) in self.cells.iter().enumerate() {
            for (col, &v) in line.iter().enumerate() {
                if v == 0 {
                    out.push(Pos { row, col });
                }
            }
        }
        out
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().flatten().all(|&v| v != 0)
    }

    #[cfg(test)]
    pub fn tile_count(&self) -> usize {
        self.cells.iter().flatten().filter(|&&v| v != 0).count()
    }

    #[cfg(test)]
    pub fn sum(&self) -> u64 {
        self.cells.iter().flatten().map(|&v| v as u64).sum()
    }

    pub fn highest_tile(&self) -> u32 {
        self.cells.iter().flatten().copied().max().unwrap_or(0)
    }

    /// Is any horizontally or vertically adjacent pair equal and non-zero?
    pub fn has_merge(&self) -> bool {
        for r in 0..SIZE {
            for c in 0..SIZE {
                let v = self.cells[r][c];
                if v == 0 { continue; }
                if c + 1 < SIZE && self.cells[r][c + 1] == v { return true; }
                if r + 1 < SIZE && self.cells[r + 1][c] == v { return true; }
            }
        }
        false
    }

    /// No empty cell and no possible merge: the game cannot continue.
    pub fn is_stuck(&self) -> bool {
        self.is_full() && !self.has_merge()
    }

    /// Slide every line toward `dir`, returning the new grid and the sum of
    /// all merged values.
    pub fn slide(&self, dir: Direction) -> (Grid, u32) {
        let mut out = *self;
        let mut gained = 0;
        for i in 0..SIZE {
            let coords = line_coords(dir, i);
            let line = coords.map(|p| self.get(p));
            let (slid, score) = slide_line(line);
            for (p, v) in coords.iter().zip(slid) {
                out.set(*p, v);
            }
            gained += score;
        }
        (out, gained)
    }
}

/// Cell positions of line `i`, ordered from the leading edge of `dir` inward.
fn line_coords(dir: Direction, i: usize) -> [Pos; SIZE] {
    let mut coords = [Pos { row: 0, col: 0 }; SIZE];
    for (k, slot) in coords.iter_mut().enumerate() {
        *slot = match dir {
            Direction::Left  => Pos { row: i, col: k },
            Direction::Right => Pos { row: i, col: SIZE - 1 - k },
            Direction::Up    => Pos { row: k, col: i },
            Direction::Down  => Pos { row: SIZE - 1 - k, col: i },
        };
    }
    coords
}

/// Collapse one line toward index 0.
///
/// Zeros are removed, then equal neighbours merge scanning from index 0.
/// A tile produced by a merge is never merged again in the same slide, so
/// `[2,2,2,2]` becomes `[4,4,0,0]` and `[2,2,2,0]` becomes `[4,2,0,0]`.
pub fn slide_line(line: [u32; SIZE]) -> ([u32; SIZE], u32) {
    let mut out = [0; SIZE];
    let mut gained = 0;
    let mut n = 0;
    let mut pending: Option<u32> = None;

    for v in line.into_iter().filter(|&v| v != 0) {
        match pending {
            Some(p) if p == v => {
                out[n] = p * 2;
                gained += p * 2;
                n += 1;
                pending = None;
            }
            Some(p) => {
                out[n] = p;
                n += 1;
                pending = Some(v);
            }
            None => pending = Some(v),
        }
    }
    if let Some(p) = pending {
        out[n] = p;
    }
    (out, gained)
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Grid{:?}", self.cells)
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, row) in self.cells.iter().enumerate() {
            if i > 0 { writeln!(f)?; }
            let cells: Vec<String> = row.iter()
                .map(|&v| if v == 0 { format!("{:>5}", ".") } else { format!("{v:>5}") })
                .collect();
            write!(f, "{}", cells.join(""))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkerboard() -> Grid {
        Grid::from_rows([
            [2, 4, 2, 4],
            [4, 2, 4, 2],
            [2, 4, 2, 4],
            [4, 2, 4, 2],
        ])
    }

    #[test]
    fn slide_line_basic_cases() {
        assert_eq!(slide_line([0, 0, 0, 0]), ([0, 0, 0, 0], 0));
        assert_eq!(slide_line([0, 0, 0, 2]), ([2, 0, 0, 0], 0));
        assert_eq!(slide_line([2, 0, 2, 0]), ([4, 0, 0, 0], 4));
        assert_eq!(slide_line([2, 4, 2, 4]), ([2, 4, 2, 4], 0));
        assert_eq!(slide_line([4, 4, 8, 8]), ([8, 16, 0, 0], 24));
    }

    #[test]
    fn no_double_merge() {
        assert_eq!(slide_line([2, 2, 2, 2]), ([4, 4, 0, 0], 8));
        assert_eq!(slide_line([4, 4, 8, 0]), ([8, 8, 0, 0], 8));
    }

    #[test]
    fn chain_merges_from_leading_edge() {
        assert_eq!(slide_line([2, 2, 2, 0]), ([4, 2, 0, 0], 4));
        assert_eq!(slide_line([0, 2, 2, 2]), ([4, 2, 0, 0], 4));
    }

    #[test]
    fn slide_right_scans_from_right_edge() {
        let g = Grid::from_rows([
            [2, 2, 2, 0],
            [0, 0, 0, 0],
            [0, 0, 0, 0],
            [0, 0, 0, 0],
        ]);
        let (out, gained) = g.slide(Direction::Right);
        assert_eq!(out.rows()[0], [0, 0, 2, 4]);
        assert_eq!(gained, 4);
    }

    #[test]
    fn slide_columns() {
        let g = Grid::from_rows([
            [2, 0, 0, 8],
            [2, 0, 4, 8],
            [4, 0, 4, 0],
            [0, 2, 0, 8],
        ]);
        let (up, up_gain) = g.slide(Direction::Up);
        assert_eq!(up, Grid::from_rows([
            [4, 2, 8, 16],
            [4, 0, 0, 8],
            [0, 0, 0, 0],
            [0, 0, 0, 0],
        ]));
        assert_eq!(up_gain, 4 + 8 + 16);

        let (down, down_gain) = g.slide(Direction::Down);
        assert_eq!(down, Grid::from_rows([
            [0, 0, 0, 0],
            [0, 0, 0, 0],
            [4, 0, 0, 8],
            [4, 2, 8, 16],
        ]));
        assert_eq!(down_gain, 4 + 8 + 16);
    }

    #[test]
    fn slide_never_adds_tiles_and_conserves_sum() {
        let grids = [
            checkerboard(),
            Grid::from_rows([
                [2, 2, 4, 4],
                [0, 8, 8, 0],
                [16, 0, 16, 2],
                [2, 2, 2, 2],
            ]),
            Grid::from_rows([
                [0, 0, 0, 2],
                [0, 4, 0, 4],
                [8, 8, 8, 0],
                [0, 0, 0, 0],
            ]),
        ];
        for g in grids {
            for dir in Direction::ALL {
                let (out, _) = g.slide(dir);
                assert!(out.tile_count() <= g.tile_count(), "{dir:?} on {g:?}");
                assert_eq!(out.sum(), g.sum(), "{dir:?} on {g:?}");
            }
        }
    }

    #[test]
    fn gained_score_matches_merge_count() {
        let g = Grid::from_rows([
            [2, 2, 4, 4],
            [0, 8, 8, 0],
            [16, 0, 16, 2],
            [2, 2, 2, 2],
        ]);
        let (out, gained) = g.slide(Direction::Left);
        assert_eq!(out.rows()[0], [4, 8, 0, 0]);
        assert_eq!(out.rows()[1], [16, 0, 0, 0]);
        assert_eq!(out.rows()[2], [32, 2, 0, 0]);
        assert_eq!(out.rows()[3], [4, 4, 0, 0]);
        assert_eq!(gained, 4 + 8 + 16 + 32 + 4 + 4);
    }

    #[test]
    fn checkerboard_is_stuck() {
        let g = checkerboard();
        assert!(g.is_full());
        assert!(!g.has_merge());
        assert!(g.is_stuck());
        for dir in Direction::ALL {
            assert_eq!(g.slide(dir).0, g);
        }
    }

    #[test]
    fn any_empty_cell_means_not_stuck() {
        for row in 0..SIZE {
            for col in 0..SIZE {
                let mut g = checkerboard();
                g.set(Pos { row, col }, 0);
                assert!(!g.is_stuck(), "hole at ({row},{col})");
            }
        }
    }

    #[test]
    fn full_grid_with_vertical_pair_is_not_stuck() {
        let mut g = checkerboard();
        g.set(Pos { row: 1, col: 0 }, 2);
        assert!(g.is_full());
        assert!(g.has_merge());
        assert!(!g.is_stuck());
    }

    #[test]
    fn empty_cells_row_major() {
        let g = Grid::from_rows([
            [2, 0, 2, 2],
            [2, 2, 2, 2],
            [2, 2, 2, 2],
            [2, 2, 2, 0],
        ]);
        assert_eq!(g.empty_cells(), vec![Pos { row: 0, col: 1 }, Pos { row: 3, col: 3 }]);
        assert_eq!(g.highest_tile(), 2);
    }
}
