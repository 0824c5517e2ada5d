//! Keyframe - a retained frame with persistent optimization state.
//!
//! A Keyframe owns one [`Frame`] plus everything the window optimizer and
//! the tracker need across iterations:
//! - the pose-state machine handling first-estimate-Jacobian (FEJ)
//!   consistency for gauge-fixed frames,
//! - dense, index-aligned arrays of [`Point`]s and [`Patch`]es keyed by
//!   grid-cell index,
//! - the point/patch initialization pipeline that fills them.
//!
//! # Pending correction is overwritten, never accumulated
//!
//! The optimizer supplies the *total* proposed correction since the last
//! linearization on every [`Keyframe::update_state`] call. The stored
//! correction is therefore replaced each time, not summed. Turning it into
//! an accumulator silently corrupts the fixed-state update — don't.
//!
//! # Concurrency
//!
//! No internal locking. The intended pattern is single-writer /
//! multiple-reader: one thread drives `update_state` /
//! `update_linearization_point` / `set_fixed` / `reset`, other threads only
//! read `twc()`, `first_estimate()` and the point/patch arrays. A read that
//! overlaps an in-progress write is undefined unless the caller serializes
//! them externally.

use nalgebra::SVector;
use tracing::{debug, warn};

use crate::camera::Camera;
use crate::error::{Error, Result};
use crate::frame::{AffineParams, Frame};
use crate::geometry::{Vector6, SE3};
use crate::image::ImageF32;
use crate::point::{footprint, Patch, PatchLevel, Point, PointStatus};
use crate::select::PixelGrid;

/// Full correction vector:
/// `[ω(0..3), v(3..6), affine_l(6..8), affine_r(8..10)]`.
pub type Vector10 = SVector<f64, 10>;

/// Inverse-depth guess for freshly selected points (unit depth).
pub const DEFAULT_IDEPTH: f64 = 1.0;

/// Minimum valid-patch count for a keyframe to be usable by the optimizer.
pub const MIN_VALID_PATCHES: usize = 8;

/// Pixel margin required around each footprint sample so the bilinear
/// lookups of the sample and its gradient neighbors stay in bounds.
const SAMPLE_MARGIN: f64 = 1.0;

/// Keyframe lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyframeStatus {
    /// No frame bound.
    #[default]
    Empty,
    /// Frame bound, points/patches not yet initialized.
    FrameBound,
    /// Patch stage has produced at least one valid patch.
    Precomputed,
}

/// Pose plus photometric parameters, the unit the optimizer corrects.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PoseState {
    pub t_wc: SE3,
    pub affine_l: AffineParams,
    pub affine_r: AffineParams,
}

impl PoseState {
    fn from_frame(frame: &Frame) -> Self {
        Self {
            t_wc: frame.t_wc(),
            affine_l: AffineParams::default(),
            affine_r: AffineParams::default(),
        }
    }

    /// Apply a full correction: pose by right-composed retraction,
    /// photometric parameters additively.
    fn retracted(&self, dx: &Vector10) -> Self {
        let d_pose: Vector6 = dx.fixed_rows::<6>(0).into_owned();
        Self {
            t_wc: self.t_wc.compose(&SE3::retract(&d_pose)),
            affine_l: AffineParams {
                a: self.affine_l.a + dx[6],
                b: self.affine_l.b + dx[7],
            },
            affine_r: AffineParams {
                a: self.affine_r.a + dx[8],
                b: self.affine_r.b + dx[9],
            },
        }
    }
}

/// A keyframe in the optimization window.
pub struct Keyframe {
    /// The bound capture. Empty (identity pose) until `set_frame`.
    frame: Frame,

    status: KeyframeStatus,

    // ─────────────────────────────────────────────────────────────────────
    // FEJ pose-state block
    // ─────────────────────────────────────────────────────────────────────
    /// Working state: what `twc()` and the tracker see.
    state: PoseState,

    /// First estimate: the linearization point used for prior Jacobians.
    /// Frozen while `fixed`.
    fej: PoseState,

    /// Last full correction from the optimizer. Overwritten on every
    /// `update_state` call (see module docs).
    x: Vector10,

    /// Gauge-fixed flag. While set, `update_state` must not move the
    /// first estimate.
    fixed: bool,

    // ─────────────────────────────────────────────────────────────────────
    // Points and patches, index-aligned by grid cell
    // ─────────────────────────────────────────────────────────────────────
    points: Vec<Point>,
    patches: Vec<Patch>,

    /// Pyramid levels to sample per patch, recorded by `allocate`.
    alloc_levels: usize,
}

impl Default for Keyframe {
    fn default() -> Self {
        let frame = Frame::default();
        let state = PoseState::from_frame(&frame);
        Self {
            frame,
            status: KeyframeStatus::Empty,
            state,
            fej: state,
            x: Vector10::zeros(),
            fixed: false,
            points: Vec::new(),
            patches: Vec::new(),
            alloc_levels: 0,
        }
    }
}

impl Keyframe {
    // ─────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────

    /// Bind a frame. Resets the pose-state to the frame's capture pose
    /// (free, no pending correction) and discards prior points/patches.
    pub fn set_frame(&mut self, frame: Frame) {
        self.frame = frame;
        self.status = if self.frame.empty() {
            KeyframeStatus::Empty
        } else {
            KeyframeStatus::FrameBound
        };
        self.reset();
        for p in &mut self.points {
            *p = Point::default();
        }
        for p in &mut self.patches {
            p.clear();
        }
    }

    /// (Re)size point and patch storage to the grid cell count and record
    /// the pyramid level count for the patch stage. Clears existing
    /// contents.
    pub fn allocate(&mut self, num_levels: usize, grid_size: (usize, usize)) {
        let n = grid_size.0 * grid_size.1;
        self.points.clear();
        self.points.resize_with(n, Point::default);
        self.patches.clear();
        self.patches.resize_with(n, Patch::default);
        self.alloc_levels = num_levels;
    }

    /// Restore the pristine unfixed pose-state tied to the bound frame's
    /// capture pose. Does not unbind the frame or clear points/patches.
    pub fn reset(&mut self) {
        self.fixed = false;
        self.state = PoseState::from_frame(&self.frame);
        self.fej = self.state;
        self.x = Vector10::zeros();
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn status(&self) -> KeyframeStatus {
        self.status
    }

    pub fn is_stereo(&self) -> bool {
        self.frame.is_stereo()
    }

    pub fn num_levels(&self) -> usize {
        self.frame.num_levels()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Pose-state machine
    // ─────────────────────────────────────────────────────────────────────

    /// Accept a full correction from the optimizer.
    ///
    /// While free the correction is baked in immediately — the first
    /// estimate always equals the working state, so active variables carry
    /// no FEJ inconsistency. While fixed, only the stored correction
    /// changes; both poses stay put until
    /// [`Keyframe::update_linearization_point`].
    pub fn update_state(&mut self, dx: &Vector10) {
        assert!(
            dx.iter().all(|v| v.is_finite()),
            "non-finite pose correction"
        );
        self.x = *dx;
        if !self.fixed {
            self.state = self.state.retracted(&self.x);
            debug_assert!(self.state.t_wc.is_finite());
            self.fej = self.state;
            self.x = Vector10::zeros();
        }
    }

    /// Move the working state to `first_estimate ∘ retract(pending)`.
    ///
    /// Free: the first estimate follows and the pending correction is
    /// cleared (a no-op in practice, since free corrections are applied
    /// eagerly). Fixed: the working pose absorbs the last correction so
    /// displayed drift can be corrected, but the first estimate — the
    /// frozen linearization point — never moves.
    pub fn update_linearization_point(&mut self) {
        self.state = self.fej.retracted(&self.x);
        debug_assert!(self.state.t_wc.is_finite());
        if !self.fixed {
            self.fej = self.state;
            self.x = Vector10::zeros();
        }
    }

    /// Freeze the first estimate (gauge fixing). Idempotent; changes no
    /// pose.
    pub fn set_fixed(&mut self) {
        self.fixed = true;
    }

    pub fn is_fixed(&self) -> bool {
        self.fixed
    }

    /// Working camera-to-world pose.
    pub fn twc(&self) -> SE3 {
        self.state.t_wc
    }

    /// Working photometric parameters, left camera.
    pub fn affine_l(&self) -> AffineParams {
        self.state.affine_l
    }

    /// Working photometric parameters, right camera.
    pub fn affine_r(&self) -> AffineParams {
        self.state.affine_r
    }

    /// The first estimate: pose and photometric anchor used as the
    /// linearization point for prior Jacobians.
    pub fn first_estimate(&self) -> PoseState {
        self.fej
    }

    // ─────────────────────────────────────────────────────────────────────
    // Point/patch initialization pipeline
    // ─────────────────────────────────────────────────────────────────────

    /// Create a point for every grid cell with a selected pixel, at the
    /// default inverse depth. Returns the number of points created.
    ///
    /// Cells without a selection keep their slot `Uninitialized`. Zero
    /// selected cells is a normal outcome, not an error.
    pub fn init_points(&mut self, grid: &PixelGrid, camera: &Camera) -> Result<usize> {
        if camera.width == 0 || camera.height == 0 {
            return Err(Error::BadCameraSize {
                width: camera.width,
                height: camera.height,
            });
        }
        assert_eq!(
            grid.len(),
            self.points.len(),
            "pixel grid size does not match allocated point storage"
        );

        let mut count = 0usize;
        for (slot, cell) in self.points.iter_mut().zip(grid.iter()) {
            *slot = match cell {
                Some(px) => {
                    let uv = nalgebra::Point2::new(px.x as f64, px.y as f64);
                    let ray = camera.backproject(&uv, DEFAULT_IDEPTH, 0);
                    debug_assert!(ray.iter().all(|v| v.is_finite()));
                    count += 1;
                    Point {
                        uv,
                        idepth: DEFAULT_IDEPTH,
                        status: PointStatus::Guessed,
                    }
                }
                None => Point::default(),
            };
        }
        debug!(count, cells = grid.len(), "initialized points");
        Ok(count)
    }

    /// Sample a photometric footprint for every initialized point at every
    /// pyramid level. Returns the number of valid patches.
    ///
    /// `gsize` selects the footprint: 0 for the 5-sample cross, 1 or more
    /// for the 3×3 square. A point whose footprint leaves the sampling
    /// margin at any level gets an invalid patch and is otherwise left
    /// untouched. Called before `init_points`, this is a zero-count no-op.
    pub fn init_patches(&mut self, gsize: usize) -> usize {
        if self.frame.empty() {
            warn!("init_patches on a keyframe with no bound frame");
            return 0;
        }
        if !self.points.iter().any(Point::is_initialized) {
            warn!("init_patches called before init_points");
            return 0;
        }

        let pyramid = self.frame.pyramid_l();
        let num_levels = self.alloc_levels.min(pyramid.num_levels());
        let offsets = footprint(gsize);

        let mut count = 0usize;
        for (point, patch) in self.points.iter().zip(self.patches.iter_mut()) {
            patch.clear();
            if !point.is_initialized() {
                continue;
            }
            if let Some(levels) = sample_patch(pyramid, num_levels, point, offsets) {
                patch.levels = levels;
                patch.valid = true;
                count += 1;
            }
        }
        debug!(count, gsize, "initialized patches");
        count
    }

    /// Refine inverse depths from a dense depth map sampled at each point's
    /// pixel. Finite, positive samples overwrite the estimate and mark the
    /// point `Measured`; anything else leaves the existing guess untouched.
    /// Returns the number of points updated.
    ///
    /// Once the patch stage has run, only trackable points (those with a
    /// valid patch) are refined — a point the tracker can never use has no
    /// business carrying a measured depth.
    pub fn init_from_depth(&mut self, depth: &ImageF32) -> Result<usize> {
        let expected = self.frame.image_size();
        let got = (depth.w, depth.h);
        if expected != got {
            return Err(Error::DepthSizeMismatch { expected, got });
        }
        if depth.is_empty() {
            return Ok(0);
        }

        let patches_ran = self.patches.iter().any(|p| p.valid);
        let mut count = 0usize;
        for (point, patch) in self
            .points
            .iter_mut()
            .zip(self.patches.iter())
            .filter(|(p, _)| p.is_initialized())
        {
            if patches_ran && !patch.valid {
                continue;
            }
            let x = (point.uv.x.round() as usize).min(depth.w - 1);
            let y = (point.uv.y.round() as usize).min(depth.h - 1);
            let d = depth.get(x, y) as f64;
            if d.is_finite() && d > 0.0 {
                point.idepth = 1.0 / d;
                point.status = PointStatus::Measured;
                count += 1;
            }
        }
        debug!(count, "initialized points from depth");
        Ok(count)
    }

    /// Run `init_points` then `init_patches`; with at least one valid patch
    /// the keyframe becomes `Precomputed`. Returns the valid-patch count.
    pub fn precompute(&mut self, grid: &PixelGrid, camera: &Camera, gsize: usize) -> Result<usize> {
        self.init_points(grid, camera)?;
        let n_patches = self.init_patches(gsize);
        if n_patches > 0 {
            self.status = KeyframeStatus::Precomputed;
        }
        Ok(n_patches)
    }

    /// Number of initialized points.
    pub fn num_points(&self) -> usize {
        self.points.iter().filter(|p| p.is_initialized()).count()
    }

    /// Number of valid patches.
    pub fn num_patches(&self) -> usize {
        self.patches.iter().filter(|p| p.valid).count()
    }

    /// The patch stage has produced at least one valid patch.
    pub fn precomputed(&self) -> bool {
        self.status == KeyframeStatus::Precomputed
    }

    /// Precomputed and holding enough valid patches to be usable.
    pub fn ok(&self) -> bool {
        self.precomputed() && self.num_patches() >= MIN_VALID_PATCHES
    }

    /// Mark a point rejected by the optimizer. No-op for uninitialized
    /// slots.
    pub fn mark_outlier(&mut self, idx: usize) {
        if let Some(p) = self.points.get_mut(idx) {
            if p.is_initialized() {
                p.status = PointStatus::Outlier;
            }
        }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn patches(&self) -> &[Patch] {
        &self.patches
    }
}

/// Sample one point's footprint at every level; `None` if any sample falls
/// outside the margin.
fn sample_patch(
    pyramid: &crate::image::Pyramid,
    num_levels: usize,
    point: &Point,
    offsets: &[(i32, i32)],
) -> Option<Vec<PatchLevel>> {
    let mut levels = Vec::with_capacity(num_levels);
    for l in 0..num_levels {
        let img = pyramid.level(l);
        let scale = 1.0 / (1u64 << l) as f64;
        let cx = point.uv.x * scale;
        let cy = point.uv.y * scale;

        let mut level = PatchLevel {
            vals: Vec::with_capacity(offsets.len()),
            grads: Vec::with_capacity(offsets.len()),
        };
        for &(dx, dy) in offsets {
            let x = cx + dx as f64;
            let y = cy + dy as f64;
            if x < SAMPLE_MARGIN
                || y < SAMPLE_MARGIN
                || x > img.w as f64 - 1.0 - SAMPLE_MARGIN
                || y > img.h as f64 - 1.0 - SAMPLE_MARGIN
            {
                return None;
            }
            level.vals.push(img.bilinear(x, y));
            let gx = 0.5 * (img.bilinear(x + 1.0, y) - img.bilinear(x - 1.0, y));
            let gy = 0.5 * (img.bilinear(x, y + 1.0) - img.bilinear(x, y - 1.0));
            level.grads.push((gx, gy));
        }
        levels.push(level);
    }
    Some(levels)
}

impl std::fmt::Debug for Keyframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keyframe")
            .field("status", &self.status)
            .field("fixed", &self.fixed)
            .field("is_stereo", &self.is_stereo())
            .field("num_levels", &self.num_levels())
            .field("num_points", &self.num_points())
            .field("num_patches", &self.num_patches())
            .finish()
    }
}
