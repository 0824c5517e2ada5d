//! Sparse tracked points and their photometric patches.
//!
//! Points and patches live in dense, index-aligned arrays keyed by grid-cell
//! index; an explicit status tag marks unused slots instead of sentinel
//! coordinates.

use nalgebra::Point2;

/// Depth knowledge of a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointStatus {
    /// Slot has no point (cell had no selected pixel).
    #[default]
    Uninitialized,
    /// Inverse depth is the default guess.
    Guessed,
    /// Inverse depth came from a depth measurement.
    Measured,
    /// Rejected by the optimizer.
    Outlier,
}

/// A candidate 3-D point, parameterized by pixel location and inverse depth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    /// Level-0 pixel coordinate.
    pub uv: Point2<f64>,
    /// Inverse depth estimate.
    pub idepth: f64,
    pub status: PointStatus,
}

impl Default for Point {
    fn default() -> Self {
        Self {
            uv: Point2::new(0.0, 0.0),
            idepth: 0.0,
            status: PointStatus::Uninitialized,
        }
    }
}

impl Point {
    /// True once the slot holds an actual point (any status but
    /// `Uninitialized`).
    pub fn is_initialized(&self) -> bool {
        self.status != PointStatus::Uninitialized
    }
}

/// Footprint sample offsets for `gsize == 0`: a 5-pixel cross.
pub const FOOTPRINT_CROSS: [(i32, i32); 5] = [(0, 0), (-1, 0), (1, 0), (0, -1), (0, 1)];

/// Footprint sample offsets for `gsize >= 1`: a 3×3 square.
pub const FOOTPRINT_SQUARE: [(i32, i32); 9] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (0, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Select the footprint for a `gsize` parameter.
pub fn footprint(gsize: usize) -> &'static [(i32, i32)] {
    if gsize == 0 {
        &FOOTPRINT_CROSS
    } else {
        &FOOTPRINT_SQUARE
    }
}

/// Intensity and gradient samples of one footprint at one pyramid level.
#[derive(Debug, Clone, Default)]
pub struct PatchLevel {
    /// Bilinear intensities, one per footprint sample.
    pub vals: Vec<f32>,
    /// Central-difference gradients `(gx, gy)`, one per footprint sample.
    pub grads: Vec<(f32, f32)>,
}

/// Photometric patch of one point: per-level footprint samples.
///
/// Index-aligned with its point; `valid` is false until the patch stage has
/// sampled every level in bounds.
#[derive(Debug, Clone, Default)]
pub struct Patch {
    pub levels: Vec<PatchLevel>,
    pub valid: bool,
}

impl Patch {
    /// Reset to the unsampled state.
    pub fn clear(&mut self) {
        self.levels.clear();
        self.valid = false;
    }
}
