//! Work grid generation and shaft routes
//!
//! The mining job discretizes a rectangular work area ahead of the work
//! frame into a grid of shaft entry cells, then walks the cells in one of
//! two orders: raster (far row first, columns ascending) or spiral
//! (breadth-first out from the center cell). Both routes are lazy, finite
//! and restartable (reconstruct to restart), and visit every cell exactly
//! once.

use std::collections::VecDeque;

use nalgebra::Vector3;

use super::types::Frame;

/// A cell index in the work grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridCell {
    pub row: usize,
    pub col: usize,
}

/// Project the work volume in front of the frame: a `size.x` by `size.y`
/// cross-section centered on the frame, extruded `size.z` along forward.
/// Returns the two extreme corners (min, max).
pub fn project_box_ahead(frame: &Frame, size: Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
    let half = size / 2.0;
    let min = frame.position - frame.right() * half.x - frame.up * half.y;
    let max =
        frame.position + frame.right() * half.x + frame.up * half.y + frame.forward * size.z;
    (min, max)
}

/// Discretize the work area between `min` and `max` into cell-center
/// positions in the plane perpendicular to the work direction.
///
/// `cell_size` is padded by one meter per axis so adjacent shafts do not
/// overlap at their boundaries. Result is indexed `[row][col]`.
pub fn generate_work_grid(
    frame: &Frame,
    min: Vector3<f64>,
    max: Vector3<f64>,
    cell_size: Vector3<f64>,
) -> Vec<Vec<Vector3<f64>>> {
    let cell = cell_size + Vector3::new(1.0, 1.0, 1.0);

    let local_min = frame.world_to_local(min - frame.position);
    let local_max = frame.world_to_local(max - frame.position);

    let cols = (((local_max.x - local_min.x) / cell.x).floor().max(0.0)) as usize;
    let rows = (((local_max.y - local_min.y) / cell.y).floor().max(0.0)) as usize;

    let right = frame.right();
    let up = frame.up;
    let forward = frame.forward;

    (0..rows)
        .map(|row| {
            (0..cols)
                .map(|col| {
                    min + right * (col as f64 * cell.x + cell.x / 2.0)
                        + up * (row as f64 * cell.y + cell.y / 2.0)
                        + forward * (cell.z / 2.0)
                })
                .collect()
        })
        .collect()
}

/// Raster route: rows from `rows - 1` down to 0, columns ascending.
#[derive(Debug, Clone)]
pub struct RasterRoute {
    rows: usize,
    cols: usize,
    row: usize,
    col: usize,
    done: bool,
}

impl RasterRoute {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            row: rows.saturating_sub(1),
            col: 0,
            done: rows == 0 || cols == 0,
        }
    }
}

impl Iterator for RasterRoute {
    type Item = GridCell;

    fn next(&mut self) -> Option<GridCell> {
        if self.done {
            return None;
        }
        let cell = GridCell {
            row: self.row,
            col: self.col,
        };
        self.col += 1;
        if self.col == self.cols {
            self.col = 0;
            if self.row == 0 {
                self.done = true;
            } else {
                self.row -= 1;
            }
        }
        Some(cell)
    }
}

/// Spiral route: breadth-first expansion from the nearest-to-center cell
/// over the four axis-aligned neighbors, each cell exactly once.
#[derive(Debug, Clone)]
pub struct SpiralRoute {
    rows: usize,
    cols: usize,
    visited: Vec<bool>,
    queue: VecDeque<GridCell>,
}

impl SpiralRoute {
    pub fn new(rows: usize, cols: usize) -> Self {
        let mut route = Self {
            rows,
            cols,
            visited: vec![false; rows * cols],
            queue: VecDeque::new(),
        };
        if rows > 0 && cols > 0 {
            let center = GridCell {
                row: if rows % 2 == 1 { rows / 2 } else { rows / 2 - 1 },
                col: if cols % 2 == 1 { cols / 2 } else { cols / 2 - 1 },
            };
            route.visited[center.row * cols + center.col] = true;
            route.queue.push_back(center);
        }
        route
    }
}

impl Iterator for SpiralRoute {
    type Item = GridCell;

    fn next(&mut self) -> Option<GridCell> {
        let cell = self.queue.pop_front()?;
        // Neighbor order: left, right, row below, row above.
        let neighbors = [
            (cell.col.wrapping_sub(1), cell.row),
            (cell.col + 1, cell.row),
            (cell.col, cell.row.wrapping_sub(1)),
            (cell.col, cell.row + 1),
        ];
        for (col, row) in neighbors {
            if col < self.cols && row < self.rows && !self.visited[row * self.cols + col] {
                self.visited[row * self.cols + col] = true;
                self.queue.push_back(GridCell { row, col });
            }
        }
        Some(cell)
    }
}
