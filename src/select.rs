//! Per-cell pixel selection grid.
//!
//! The image is partitioned into fixed-size square cells; each cell holds at
//! most one representative pixel, chosen by a pluggable [`SelectStrategy`].
//! The grid only stores the outcome — the selection heuristic lives behind
//! the trait so the front-end can swap it without touching the core.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::image::ImageF32;

/// A cell's pixel region within the image: `[x0, x1) × [y0, y1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRegion {
    pub x0: usize,
    pub y0: usize,
    pub x1: usize,
    pub y1: usize,
}

/// Pluggable per-cell pixel selection.
///
/// Given a cell's pixel region, return a representative pixel within that
/// region, or `None` to leave the cell unselected.
pub trait SelectStrategy {
    fn select(&self, image: &ImageF32, region: CellRegion) -> Option<Point2<u32>>;
}

/// Grid of per-cell selection outcomes, sized
/// `floor(height/cell) × floor(width/cell)`.
#[derive(Debug, Clone, Default)]
pub struct PixelGrid {
    rows: usize,
    cols: usize,
    cells: Vec<Option<Point2<u32>>>,
}

impl PixelGrid {
    /// Create a grid with every cell unselected.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![None; rows * cols],
        }
    }

    /// Partition `image` into `cell_size`-square cells and run the selection
    /// strategy on each. Partial cells at the right/bottom edges are
    /// dropped by the floor-division grid size.
    pub fn build<S: SelectStrategy>(image: &ImageF32, cell_size: usize, strategy: &S) -> Self {
        let rows = image.h / cell_size;
        let cols = image.w / cell_size;
        let mut grid = Self::new(rows, cols);
        for gr in 0..rows {
            for gc in 0..cols {
                let region = CellRegion {
                    x0: gc * cell_size,
                    y0: gr * cell_size,
                    x1: (gc + 1) * cell_size,
                    y1: (gr + 1) * cell_size,
                };
                let px = strategy.select(image, region);
                debug_assert!(
                    px.is_none_or(|p| (p.x as usize) < image.w && (p.y as usize) < image.h),
                    "selected pixel out of image bounds"
                );
                grid.set(gr, gc, px);
            }
        }
        grid
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Total cell count.
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    pub fn get(&self, r: usize, c: usize) -> Option<Point2<u32>> {
        self.cells[r * self.cols + c]
    }

    #[inline]
    pub fn set(&mut self, r: usize, c: usize, px: Option<Point2<u32>>) {
        self.cells[r * self.cols + c] = px;
    }

    /// Iterate cells in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = &Option<Point2<u32>>> {
        self.cells.iter()
    }

    /// Number of cells with a selected pixel.
    pub fn num_selected(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }
}

/// Configuration for [`GradientSelector`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SelectCfg {
    /// Cell size in pixels.
    pub cell_size: usize,
    /// Minimum absolute gradient magnitude for a pixel to be selectable,
    /// on the `[0, 1]` intensity scale.
    pub min_grad: f32,
}

impl Default for SelectCfg {
    fn default() -> Self {
        Self {
            cell_size: 16,
            min_grad: 8.0 / 255.0,
        }
    }
}

/// Picks the strongest-gradient pixel in each cell.
///
/// Pixels on the one-pixel image border are skipped (no central-difference
/// gradient there); cells whose best magnitude stays below `min_grad` are
/// left unselected.
#[derive(Debug, Clone, Copy, Default)]
pub struct GradientSelector {
    pub cfg: SelectCfg,
}

impl GradientSelector {
    pub fn new(cfg: SelectCfg) -> Self {
        Self { cfg }
    }
}

impl SelectStrategy for GradientSelector {
    fn select(&self, image: &ImageF32, region: CellRegion) -> Option<Point2<u32>> {
        let x0 = region.x0.max(1);
        let y0 = region.y0.max(1);
        let x1 = region.x1.min(image.w.saturating_sub(1));
        let y1 = region.y1.min(image.h.saturating_sub(1));

        let mut best: Option<(f32, Point2<u32>)> = None;
        for y in y0..y1 {
            for x in x0..x1 {
                let (gx, gy) = image.grad_at(x, y);
                let mag = (gx * gx + gy * gy).sqrt();
                if mag >= self.cfg.min_grad && best.is_none_or(|(m, _)| mag > m) {
                    best = Some((mag, Point2::new(x as u32, y as u32)));
                }
            }
        }
        best.map(|(_, px)| px)
    }
}
