use serde::{Deserialize, Serialize};

use super::error::{SynthError, SynthResult};
use crate::geom::Point3;

/// One resampled position and the parameter pair that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub position: Point3,
    pub u: f64,
    pub v: f64,
}

impl Sample {
    #[must_use]
    pub const fn new(position: Point3, u: f64, v: f64) -> Self {
        Self { position, u, v }
    }

    /// Position interpolated towards `other`; the parameters are kept from `self`.
    #[must_use]
    pub fn lerp(&self, other: &Self, t: f64) -> Self {
        Self {
            position: self.position.lerp(other.position, t),
            ..*self
        }
    }
}

/// Rectangular row-major table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Grid<T> {
    rows: usize,
    cols: usize,
    cells: Vec<T>,
}

impl<T> Grid<T> {
    /// Builds a grid from nested rows. Every row must have the same, non-zero
    /// length.
    pub fn from_rows(rows: Vec<Vec<T>>) -> SynthResult<Self> {
        let row_count = rows.len();
        let cols = rows.first().map_or(0, Vec::len);
        if row_count == 0 || cols == 0 {
            return Err(SynthError::DegenerateGrid("grid has no cells".to_string()));
        }
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, row)| row.len() != cols) {
            return Err(SynthError::DegenerateGrid(format!(
                "row {i} has {} cells, expected {cols}",
                row.len()
            )));
        }

        Ok(Self {
            rows: row_count,
            cols,
            cells: rows.into_iter().flatten().collect(),
        })
    }

    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Option<&T> {
        if row < self.rows && col < self.cols {
            self.cells.get(row * self.cols + col)
        } else {
            None
        }
    }

    #[must_use]
    pub fn row(&self, row: usize) -> Option<&[T]> {
        (row < self.rows).then(|| &self.cells[row * self.cols..(row + 1) * self.cols])
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[T]> + '_ {
        self.cells.chunks_exact(self.cols)
    }

    /// Cells in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.cells.iter()
    }

    #[must_use]
    pub fn map<U, F: FnMut(&T) -> U>(&self, f: F) -> Grid<U> {
        Grid {
            rows: self.rows,
            cols: self.cols,
            cells: self.cells.iter().map(f).collect(),
        }
    }

    /// Combines two equally sized grids cell by cell; `None` if the sizes differ.
    #[must_use]
    pub fn zip_map<U, V, F>(&self, other: &Grid<U>, mut f: F) -> Option<Grid<V>>
    where
        F: FnMut(&T, &U) -> V,
    {
        if self.rows != other.rows || self.cols != other.cols {
            return None;
        }
        Some(Grid {
            rows: self.rows,
            cols: self.cols,
            cells: self
                .cells
                .iter()
                .zip(&other.cells)
                .map(|(a, b)| f(a, b))
                .collect(),
        })
    }
}

impl Grid<Sample> {
    pub fn positions(&self) -> impl Iterator<Item = Point3> + '_ {
        self.cells.iter().map(|s| s.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rows_rejects_ragged_input() {
        assert!(Grid::from_rows(vec![vec![1, 2], vec![3]]).is_err());
        assert!(Grid::<i32>::from_rows(Vec::new()).is_err());
        assert!(Grid::<i32>::from_rows(vec![Vec::new()]).is_err());
    }

    #[test]
    fn grid_is_row_major() {
        let grid = Grid::from_rows(vec![vec![1, 2, 3], vec![4, 5, 6]]).expect("grid");
        assert_eq!((grid.rows(), grid.cols(), grid.len()), (2, 3, 6));
        assert_eq!(grid.get(1, 0), Some(&4));
        assert_eq!(grid.get(0, 3), None);
        assert_eq!(grid.row(1), Some(&[4, 5, 6][..]));
        assert_eq!(grid.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3, 4, 5, 6]);

        let doubled = grid.map(|v| v * 2);
        let summed = grid.zip_map(&doubled, |a, b| a + b).expect("same size");
        assert_eq!(summed.get(1, 2), Some(&18));

        let other = Grid::from_rows(vec![vec![0; 2]; 3]).expect("grid");
        assert!(grid.zip_map(&other, |a, b| a + b).is_none());
    }
}
