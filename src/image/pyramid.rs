//! Multi-resolution image pyramid built by repeated 2× downsampling.
//!
//! Level 0 is the full-resolution input; every subsequent level halves both
//! dimensions with a 2×2 box filter. The level count is fixed at
//! construction.

use ::image::GrayImage;
use tracing::warn;

use super::ImageF32;

/// Ordered sequence of progressively half-resolution intensity images.
#[derive(Clone, Debug, Default)]
pub struct Pyramid {
    levels: Vec<ImageF32>,
}

impl Pyramid {
    /// Build a pyramid with `num_levels` levels from a full-resolution image.
    ///
    /// Returns an empty pyramid when `num_levels == 0` or when the source is
    /// smaller than `2^(num_levels-1)` pixels in either dimension (the
    /// coarsest level would vanish).
    pub fn build(level0: ImageF32, num_levels: usize) -> Self {
        if num_levels == 0 {
            warn!("pyramid requested with zero levels");
            return Self::default();
        }
        let min_size = 1usize << (num_levels - 1);
        if level0.w < min_size || level0.h < min_size {
            warn!(
                w = level0.w,
                h = level0.h,
                num_levels,
                "image too small for requested pyramid levels"
            );
            return Self::default();
        }

        let mut levels = Vec::with_capacity(num_levels);
        levels.push(level0);
        for _ in 1..num_levels {
            let down = downsample_box2(levels.last().expect("previous level available"));
            levels.push(down);
        }
        Self { levels }
    }

    /// Build from an 8-bit grayscale input.
    pub fn from_luma8(gray: &GrayImage, num_levels: usize) -> Self {
        Self::build(ImageF32::from_luma8(gray), num_levels)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    #[inline]
    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    #[inline]
    pub fn level(&self, l: usize) -> &ImageF32 {
        &self.levels[l]
    }

    /// Level-0 width; 0 for an empty pyramid.
    pub fn width(&self) -> usize {
        self.levels.first().map_or(0, |l| l.w)
    }

    /// Level-0 height; 0 for an empty pyramid.
    pub fn height(&self) -> usize {
        self.levels.first().map_or(0, |l| l.h)
    }

    /// Same level count and per-level dimensions as `other`.
    pub fn compatible_with(&self, other: &Pyramid) -> bool {
        self.num_levels() == other.num_levels()
            && self
                .levels
                .iter()
                .zip(other.levels.iter())
                .all(|(a, b)| a.w == b.w && a.h == b.h)
    }
}

/// Halve both dimensions with a 2×2 box mean.
fn downsample_box2(src: &ImageF32) -> ImageF32 {
    let (nw, nh) = (src.w / 2, src.h / 2);
    let mut dst = ImageF32::new(nw, nh);
    for y in 0..nh {
        let top = src.row(2 * y);
        let bot = src.row(2 * y + 1);
        for x in 0..nw {
            let sum = top[2 * x] + top[2 * x + 1] + bot[2 * x] + bot[2 * x + 1];
            dst.set(x, y, 0.25 * sum);
        }
    }
    dst
}
