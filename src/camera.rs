//! Pinhole camera model with per-pyramid-level intrinsic scaling.

use nalgebra::{Point2, Vector3};

use crate::error::{Error, Result};

/// Pinhole camera: image size, intrinsics `[fx, fy, cx, cy]`, stereo
/// baseline (0 for monocular) and an identifying index.
///
/// Intrinsics at pyramid level `l` are the level-0 intrinsics multiplied by
/// `2^-l`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub width: u32,
    pub height: u32,
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    /// Stereo baseline in meters; 0 for a monocular camera.
    pub baseline: f64,
    /// Identifying index within a multi-camera rig.
    pub index: u32,
}

impl Camera {
    /// Construct a camera. Panics on a zero dimension; use [`Camera::try_new`]
    /// to validate caller-provided dimensions.
    pub fn new(size: (u32, u32), intrinsics: [f64; 4], index: u32) -> Self {
        Self::try_new(size, intrinsics, index).expect("camera size must be nonzero")
    }

    /// Construct a camera, rejecting zero-sized images.
    pub fn try_new(size: (u32, u32), intrinsics: [f64; 4], index: u32) -> Result<Self> {
        let (width, height) = size;
        if width == 0 || height == 0 {
            return Err(Error::BadCameraSize { width, height });
        }
        let [fx, fy, cx, cy] = intrinsics;
        Ok(Self {
            width,
            height,
            fx,
            fy,
            cx,
            cy,
            baseline: 0.0,
            index,
        })
    }

    /// Set the stereo baseline.
    pub fn with_baseline(mut self, baseline: f64) -> Self {
        self.baseline = baseline;
        self
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Intrinsics scaled for a pyramid level: `[fx, fy, cx, cy] * 2^-level`.
    pub fn scaled(&self, level: usize) -> [f64; 4] {
        let s = 1.0 / (1u64 << level) as f64;
        [self.fx * s, self.fy * s, self.cx * s, self.cy * s]
    }

    /// Project a camera-frame point to pixel coordinates at a pyramid level.
    pub fn project(&self, p: &Vector3<f64>, level: usize) -> Point2<f64> {
        let [fx, fy, cx, cy] = self.scaled(level);
        Point2::new(fx * p.x / p.z + cx, fy * p.y / p.z + cy)
    }

    /// Back-project a pixel with inverse depth to a camera-frame point at a
    /// pyramid level.
    pub fn backproject(&self, px: &Point2<f64>, idepth: f64, level: usize) -> Vector3<f64> {
        let [fx, fy, cx, cy] = self.scaled(level);
        let depth = 1.0 / idepth;
        Vector3::new(
            (px.x - cx) / fx * depth,
            (px.y - cy) / fy * depth,
            depth,
        )
    }
}
