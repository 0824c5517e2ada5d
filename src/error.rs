//! Error types for the VO core.
//!
//! Only malformed configuration is an error: a zero-sized camera, a depth
//! map whose dimensions disagree with the bound image, or a stereo pair
//! whose pyramids don't line up. Ordinary data sparsity (empty grid cells,
//! out-of-bounds patch footprints, missing depth samples) is reported
//! through status tags and return counts, never through `Err`.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// Camera has a zero dimension.
    #[error("camera has invalid size {width}x{height}")]
    BadCameraSize { width: u32, height: u32 },

    /// Depth map dimensions do not match the keyframe's level-0 image.
    #[error("depth map is {got:?} but the bound image is {expected:?}")]
    DepthSizeMismatch {
        expected: (usize, usize),
        got: (usize, usize),
    },

    /// Stereo constructor received pyramids with different level counts or
    /// per-level dimensions.
    #[error("stereo pyramids are not level-compatible (left {left} levels, right {right} levels)")]
    IncompatibleStereoPair { left: usize, right: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
