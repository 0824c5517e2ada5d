//! Geometry utilities: SE3 transforms and tangent-space retraction.

pub mod se3;

pub use se3::{Vector6, SE3};
