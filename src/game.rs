//! Board core: cells, tetromino shapes, the grid and the falling piece.

use std::collections::VecDeque;

/// Board width in columns.
pub const GRID_WIDTH: usize = 10;

/// Board height in rows. Row 0 is the top.
pub const GRID_HEIGHT: usize = 20;

/// Column of the spawn pivot.
pub const SPAWN_X: i32 = (GRID_WIDTH / 2) as i32 - 1;

/// Row of the spawn pivot.
pub const SPAWN_Y: i32 = 0;

/// A block position relative to the piece pivot.
pub type Offset = (i32, i32);

/// Tetromino shapes (I, O, T, L, J, S, Z).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    I,
    O,
    T,
    L,
    J,
    S,
    Z,
}

impl Shape {
    pub const ALL: [Self; 7] = [Self::I, Self::O, Self::T, Self::L, Self::J, Self::S, Self::Z];

    /// Base offsets around the pivot, before any rotation.
    pub const fn offsets(self) -> [Offset; 4] {
        match self {
            Self::I => [(0, 0), (-1, 0), (1, 0), (2, 0)],
            Self::O => [(0, 0), (1, 0), (0, 1), (1, 1)],
            Self::T => [(0, 0), (-1, 0), (1, 0), (0, 1)],
            Self::L => [(0, 0), (-1, 0), (1, 0), (1, 1)],
            Self::J => [(0, 0), (-1, 0), (1, 0), (-1, 1)],
            Self::S => [(0, 0), (-1, 0), (0, 1), (1, 1)],
            Self::Z => [(0, 0), (1, 0), (0, 1), (-1, 1)],
        }
    }

    /// Index into the theme's piece palette.
    pub const fn color_index(self) -> usize {
        match self {
            Self::I => 0,
            Self::O => 1,
            Self::T => 2,
            Self::L => 3,
            Self::J => 4,
            Self::S => 5,
            Self::Z => 6,
        }
    }
}

/// Single cell: empty, or a settled block tagged with the shape it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Block(Shape),
}

impl Cell {
    #[inline]
    pub fn is_filled(self) -> bool {
        matches!(self, Self::Block(_))
    }
}

type Row = [Cell; GRID_WIDTH];

const EMPTY_ROW: Row = [Cell::Empty; GRID_WIDTH];

/// Settled blocks. Always exactly `GRID_WIDTH` x `GRID_HEIGHT`; rows[0] is the top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    rows: VecDeque<Row>,
}

impl Default for Grid {
    fn default() -> Self {
        Self::new()
    }
}

impl Grid {
    pub fn new() -> Self {
        Self {
            rows: (0..GRID_HEIGHT).map(|_| EMPTY_ROW).collect(),
        }
    }

    /// Empty every cell.
    pub fn reset(&mut self) {
        for row in &mut self.rows {
            *row = EMPTY_ROW;
        }
    }

    #[cfg(test)]
    pub fn get(&self, x: usize, y: usize) -> Option<Cell> {
        self.rows.get(y).and_then(|row| row.get(x)).copied()
    }

    /// Rows top to bottom, for rendering.
    pub fn rows(&self) -> impl Iterator<Item = &[Cell; GRID_WIDTH]> {
        self.rows.iter()
    }

    /// True for walls, the floor and below, and settled blocks.
    /// Anything above row 0 is open sky and never occupied.
    pub fn is_occupied(&self, x: i32, y: i32) -> bool {
        if x < 0 || x >= GRID_WIDTH as i32 || y >= GRID_HEIGHT as i32 {
            return true;
        }
        if y < 0 {
            return false;
        }
        self.rows[y as usize][x as usize].is_filled()
    }

    /// Write a block. Positions outside the board are ignored.
    pub fn set_cell(&mut self, x: usize, y: usize, shape: Shape) {
        if let Some(cell) = self.rows.get_mut(y).and_then(|row| row.get_mut(x)) {
            *cell = Cell::Block(shape);
        }
    }

    /// Remove every full row, dropping the rows above into its place and
    /// inserting an empty row at the top. Returns the number removed.
    pub fn clear_completed_rows(&mut self) -> usize {
        let mut cleared = 0;
        let mut scan = GRID_HEIGHT;
        while scan > 0 {
            let y = scan - 1;
            if self.rows[y].iter().all(|c| c.is_filled()) {
                self.rows.remove(y);
                self.rows.push_front(EMPTY_ROW);
                cleared += 1;
                // the row that was above is now at `y`; look at it again
            } else {
                scan -= 1;
            }
        }
        cleared
    }

    #[cfg(test)]
    pub fn filled_count(&self) -> usize {
        self.rows
            .iter()
            .flat_map(|row| row.iter())
            .filter(|c| c.is_filled())
            .count()
    }
}

/// The falling tetromino: shape, rotated offsets and pivot on the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Piece {
    shape: Shape,
    offsets: [Offset; 4],
    x: i32,
    y: i32,
    #[allow(dead_code)]
    rotation: u8, // 0..4, bookkeeping only
}

impl Piece {
    /// New piece at the spawn pivot.
    pub fn new(shape: Shape) -> Self {
        Self::at(shape, SPAWN_X, SPAWN_Y)
    }

    pub fn at(shape: Shape, x: i32, y: i32) -> Self {
        Self {
            shape,
            offsets: shape.offsets(),
            x,
            y,
            rotation: 0,
        }
    }

    #[inline]
    pub fn shape(&self) -> Shape {
        self.shape
    }

    #[inline]
    pub fn offsets(&self) -> &[Offset; 4] {
        &self.offsets
    }

    #[cfg(test)]
    pub fn position(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    #[cfg(test)]
    pub fn rotation(&self) -> u8 {
        self.rotation
    }

    /// Absolute board cells covered by the piece. Rows may be negative.
    pub fn cells(&self) -> [(i32, i32); 4] {
        self.offsets.map(|(dx, dy)| (self.x + dx, self.y + dy))
    }

    pub fn check_collision(&self, grid: &Grid) -> bool {
        self.cells().iter().any(|&(x, y)| grid.is_occupied(x, y))
    }

    /// Quarter turn about the pivot, `(dx, dy) -> (-dy, dx)`. No wall kicks;
    /// a blocked turn leaves the piece untouched and returns false.
    pub fn rotate(&mut self, grid: &Grid) -> bool {
        let previous = self.offsets;
        self.offsets = previous.map(|(dx, dy)| (-dy, dx));
        if self.check_collision(grid) {
            self.offsets = previous;
            return false;
        }
        self.rotation = (self.rotation + 1) % 4;
        true
    }

    pub fn move_left(&mut self, grid: &Grid) -> bool {
        self.shift(-1, 0, grid)
    }

    pub fn move_right(&mut self, grid: &Grid) -> bool {
        self.shift(1, 0, grid)
    }

    /// One row down. False means the piece is resting and should freeze.
    pub fn step_down(&mut self, grid: &Grid) -> bool {
        self.shift(0, 1, grid)
    }

    fn shift(&mut self, dx: i32, dy: i32, grid: &Grid) -> bool {
        self.x += dx;
        self.y += dy;
        if self.check_collision(grid) {
            self.x -= dx;
            self.y -= dy;
            return false;
        }
        true
    }

    /// Write the piece into the grid. Blocks above row 0 are discarded.
    pub fn freeze(self, grid: &mut Grid) {
        for (x, y) in self.cells() {
            if x >= 0 && y >= 0 {
                grid.set_cell(x as usize, y as usize, self.shape);
            }
        }
    }
}
