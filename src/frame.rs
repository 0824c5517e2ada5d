//! Immutable capture: one (monocular) or two (stereo) image pyramids plus
//! the pose at capture time.
//!
//! A `Frame` is a value type — it is never mutated after construction, and
//! copying duplicates the pyramid data.

use crate::error::{Error, Result};
use crate::geometry::SE3;
use crate::image::Pyramid;

/// Photometric affine brightness parameters `(a, b)` for one camera.
///
/// A tracked intensity transforms as `e^a · I + b`. Capture-time parameters
/// are zero; the optimizer adjusts them through the keyframe state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AffineParams {
    pub a: f64,
    pub b: f64,
}

/// One captured frame: left pyramid, optional right pyramid, capture pose.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    left: Pyramid,
    right: Option<Pyramid>,
    t_wc: SE3,
}

impl Frame {
    /// Monocular constructor.
    pub fn mono(left: Pyramid, t_wc: SE3) -> Self {
        Self {
            left,
            right: None,
            t_wc,
        }
    }

    /// Stereo constructor. The right pyramid must have the same level count
    /// and per-level dimensions as the left.
    pub fn stereo(left: Pyramid, right: Pyramid, t_wc: SE3) -> Result<Self> {
        if !left.compatible_with(&right) {
            return Err(Error::IncompatibleStereoPair {
                left: left.num_levels(),
                right: right.num_levels(),
            });
        }
        Ok(Self {
            left,
            right: Some(right),
            t_wc,
        })
    }

    /// True iff no pyramid is bound.
    pub fn empty(&self) -> bool {
        self.left.is_empty()
    }

    /// True iff a second, level-compatible pyramid is present.
    pub fn is_stereo(&self) -> bool {
        self.right.is_some()
    }

    /// Pyramid level count; 0 for an empty frame.
    pub fn num_levels(&self) -> usize {
        self.left.num_levels()
    }

    /// Level-0 image dimensions `(width, height)`.
    pub fn image_size(&self) -> (usize, usize) {
        (self.left.width(), self.left.height())
    }

    pub fn pyramid_l(&self) -> &Pyramid {
        &self.left
    }

    pub fn pyramid_r(&self) -> Option<&Pyramid> {
        self.right.as_ref()
    }

    /// Pose at capture time.
    pub fn t_wc(&self) -> SE3 {
        self.t_wc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageF32;

    fn test_pyramid(levels: usize) -> Pyramid {
        Pyramid::build(ImageF32::new(64, 64), levels)
    }

    #[test]
    fn test_default_frame_is_empty() {
        let frame = Frame::default();
        assert!(frame.empty());
        assert!(!frame.is_stereo());
        assert_eq!(frame.num_levels(), 0);
        assert_eq!(frame.image_size(), (0, 0));
    }

    #[test]
    fn test_mono_ctor() {
        let frame = Frame::mono(test_pyramid(4), SE3::identity());
        assert!(!frame.empty());
        assert!(!frame.is_stereo());
        assert_eq!(frame.num_levels(), 4);
        assert_eq!(frame.image_size(), (64, 64));
    }

    #[test]
    fn test_stereo_ctor_identical_pyramids() {
        let frame = Frame::stereo(test_pyramid(4), test_pyramid(4), SE3::identity()).unwrap();
        assert!(!frame.empty());
        assert!(frame.is_stereo());
    }

    #[test]
    fn test_stereo_ctor_rejects_mismatched_levels() {
        let err = Frame::stereo(test_pyramid(4), test_pyramid(3), SE3::identity()).unwrap_err();
        assert_eq!(err, Error::IncompatibleStereoPair { left: 4, right: 3 });
    }

    #[test]
    fn test_stereo_ctor_rejects_mismatched_sizes() {
        let right = Pyramid::build(ImageF32::new(32, 64), 4);
        assert!(Frame::stereo(test_pyramid(4), right, SE3::identity()).is_err());
    }
}
