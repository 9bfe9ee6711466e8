//! Character display model
//!
//! A [`TextGrid`] is the host-side picture of a fixed rows × cells display.
//! Device drivers (see [`sysex`]) diff it against their cache on flush.

pub mod sysex;

use crate::wire::text::{pad, split_block};

pub use sysex::{DisplayCoord, PropertyDisplay, PropertyEncoder};

/// Fixed display geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub rows: usize,
    pub cells: usize,
    pub chars_per_cell: usize,
}

impl Geometry {
    pub fn cell_count(&self) -> usize {
        self.rows * self.cells
    }

    /// A block spans two adjacent cells
    pub fn blocks_per_row(&self) -> usize {
        self.cells / 2
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            rows: 4,
            cells: 9,
            chars_per_cell: 9,
        }
    }
}

/// Row-major text buffer, every cell exactly `chars_per_cell` wide
#[derive(Debug, Clone)]
pub struct TextGrid {
    geometry: Geometry,
    cells: Vec<String>,
}

impl TextGrid {
    pub fn new(geometry: Geometry) -> Self {
        let blank = pad("", geometry.chars_per_cell);
        Self {
            geometry,
            cells: vec![blank; geometry.cell_count()],
        }
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    fn index(&self, row: usize, cell: usize) -> Option<usize> {
        (row < self.geometry.rows && cell < self.geometry.cells)
            .then(|| row * self.geometry.cells + cell)
    }

    /// Set one cell; out-of-range positions are ignored
    pub fn set_cell(&mut self, row: usize, cell: usize, text: &str) -> &mut Self {
        if let Some(i) = self.index(row, cell) {
            self.cells[i] = pad(text, self.geometry.chars_per_cell);
        }
        self
    }

    pub fn set_cell_value(&mut self, row: usize, cell: usize, value: i64) -> &mut Self {
        self.set_cell(row, cell, &value.to_string())
    }

    /// Set a two-cell block; text overflows from the first cell into the second
    pub fn set_block(&mut self, row: usize, block: usize, text: &str) -> &mut Self {
        let cell = 2 * block;
        let (first, second) = split_block(text, self.geometry.chars_per_cell);
        if let Some(i) = self.index(row, cell) {
            self.cells[i] = first;
        }
        if let Some(i) = self.index(row, cell + 1) {
            self.cells[i] = second;
        }
        self
    }

    pub fn clear_cell(&mut self, row: usize, cell: usize) -> &mut Self {
        self.set_cell(row, cell, "")
    }

    pub fn clear_row(&mut self, row: usize) -> &mut Self {
        for cell in 0..self.geometry.cells {
            self.clear_cell(row, cell);
        }
        self
    }

    pub fn clear(&mut self) -> &mut Self {
        for row in 0..self.geometry.rows {
            self.clear_row(row);
        }
        self
    }

    pub fn cell(&self, row: usize, cell: usize) -> Option<&str> {
        self.index(row, cell).map(|i| self.cells[i].as_str())
    }

    /// Full row text, all cells concatenated
    pub fn row_text(&self, row: usize) -> String {
        (0..self.geometry.cells)
            .filter_map(|cell| self.cell(row, cell))
            .collect()
    }

    /// `((row, cell), text)` for every cell
    pub fn iter(&self) -> impl Iterator<Item = ((usize, usize), &str)> + '_ {
        let cells = self.geometry.cells;
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, text)| ((i / cells, i % cells), text.as_str()))
    }
}
