//! Cartesian grid topology.
//!
//! A [`CartGrid`] places ranks on a `rows x columns` grid in row-major order:
//! rank `i` sits at `(i / columns, i % columns)`. The grid is immutable, so
//! lookups are plain arithmetic and need no locking.
//!
//! Shifts wrap around both axes (periodic boundaries), which is what ring
//! rotations such as Cannon's block matrix multiplication need.

use crate::error::{Error, Result};

/// Sentinel returned by [`CartGrid::coords_of`] for ranks not in the grid.
pub const NO_COORDS: (i32, i32) = (-1, -1);

/// Direction of a shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Axis {
    /// Move along a column, changing the row index.
    Row = 0,
    /// Move along a row, changing the column index.
    Column = 1,
}

/// A two-dimensional periodic grid of ranks.
///
/// # Example
///
/// ```
/// use threadmpi::{Axis, CartGrid};
///
/// let grid = CartGrid::new(3, 3, 9).unwrap();
/// assert_eq!(grid.id_at(1, 2).unwrap(), 5);
/// assert_eq!(grid.coords_of(5), (1, 2));
///
/// // Rotate left by one along the row of rank 3
/// let (source, dest) = grid.shift(3, Axis::Column, -1).unwrap();
/// assert_eq!((source, dest), (4, 5));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartGrid {
    rows: i32,
    columns: i32,
}

impl CartGrid {
    /// Create a grid that must hold `workers` ranks.
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`] if either dimension is not positive or the
    /// grid has fewer cells than `workers`.
    pub fn new(rows: i32, columns: i32, workers: i32) -> Result<Self> {
        if rows <= 0 || columns <= 0 {
            return Err(Error::Configuration(format!(
                "grid dimensions must be positive, got {rows}x{columns}"
            )));
        }
        let cells = i64::from(rows) * i64::from(columns);
        if cells > i64::from(i32::MAX) {
            return Err(Error::Configuration(format!(
                "grid {rows}x{columns} has more cells than ranks can address"
            )));
        }
        if cells < i64::from(workers) {
            return Err(Error::Configuration(format!(
                "grid {rows}x{columns} too small for {workers} workers"
            )));
        }
        Ok(CartGrid { rows, columns })
    }

    /// Number of rows.
    pub fn rows(&self) -> i32 {
        self.rows
    }

    /// Number of columns.
    pub fn columns(&self) -> i32 {
        self.columns
    }

    /// Rank at `(row, column)`.
    pub fn id_at(&self, row: i32, column: i32) -> Result<i32> {
        if !(0..self.rows).contains(&row) || !(0..self.columns).contains(&column) {
            return Err(Error::Index {
                row,
                column,
                rows: self.rows,
                columns: self.columns,
            });
        }
        Ok(row * self.columns + column)
    }

    /// Coordinates of `id`, or [`NO_COORDS`] if the grid has no such cell.
    pub fn coords_of(&self, id: i32) -> (i32, i32) {
        if id < 0 || id >= self.rows * self.columns {
            return NO_COORDS;
        }
        (id / self.columns, id % self.columns)
    }

    /// Neighbors of `rank` for a ring rotation by `disp` steps along `axis`.
    ///
    /// Returns `(source, dest)`: the rank to receive from (`disp` steps
    /// behind) and the rank to send to (`disp` steps ahead). Both wrap
    /// around, so any displacement resolves.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownRank`] if `rank` has no cell in the grid.
    pub fn shift(&self, rank: i32, axis: Axis, disp: i32) -> Result<(i32, i32)> {
        let (row, column) = self.coords_of(rank);
        if (row, column) == NO_COORDS {
            return Err(Error::UnknownRank(rank));
        }
        let ((src_row, src_col), (dst_row, dst_col)) = match axis {
            Axis::Row => (
                (wrap(row, -i64::from(disp), self.rows), column),
                (wrap(row, i64::from(disp), self.rows), column),
            ),
            Axis::Column => (
                (row, wrap(column, -i64::from(disp), self.columns)),
                (row, wrap(column, i64::from(disp), self.columns)),
            ),
        };
        Ok((self.id_at(src_row, src_col)?, self.id_at(dst_row, dst_col)?))
    }
}

/// `(index + step) mod size`, never negative.
fn wrap(index: i32, step: i64, size: i32) -> i32 {
    (i64::from(index) + step).rem_euclid(i64::from(size)) as i32
}
