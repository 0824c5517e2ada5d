//! SE(3) rigid transform as a plain value type.
//!
//! Poses are stored as a unit quaternion plus a translation vector and are
//! only ever changed by composing with another transform. The optimizer
//! talks to the rest of the system in tangent-space corrections, which enter
//! through [`SE3::retract`].

use nalgebra::{SVector, UnitQuaternion, Vector3};

/// Tangent-space pose correction: `[ω(0..3), v(3..6)]`.
pub type Vector6 = SVector<f64, 6>;

/// A rigid transform `T = (R, t)`.
///
/// Written `T_a_b` it maps points from frame `b` to frame `a`:
/// `p_a = R * p_b + t`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SE3 {
    pub rotation: UnitQuaternion<f64>,
    pub translation: Vector3<f64>,
}

impl SE3 {
    /// The identity transform.
    pub fn identity() -> Self {
        Self {
            rotation: UnitQuaternion::identity(),
            translation: Vector3::zeros(),
        }
    }

    /// Construct from rotation and translation.
    pub fn new(rotation: UnitQuaternion<f64>, translation: Vector3<f64>) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// Compose two transforms: `self ∘ other`.
    ///
    /// `(R1, t1) ∘ (R2, t2) = (R1 R2, R1 t2 + t1)`
    pub fn compose(&self, other: &SE3) -> SE3 {
        SE3 {
            rotation: self.rotation * other.rotation,
            translation: self.rotation * other.translation + self.translation,
        }
    }

    /// Inverse transform: `(R, t)⁻¹ = (Rᵀ, -Rᵀ t)`.
    pub fn inverse(&self) -> SE3 {
        let rot_inv = self.rotation.inverse();
        SE3 {
            rotation: rot_inv,
            translation: -(rot_inv * self.translation),
        }
    }

    /// Apply the transform to a point.
    pub fn transform_point(&self, p: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * p + self.translation
    }

    /// Map a tangent-space correction to a transform.
    ///
    /// The rotation block goes through the SO(3) exponential, the
    /// translation block is taken verbatim:
    ///
    /// ```text
    /// retract([ω, v]) = (exp(ω), v)
    /// ```
    ///
    /// Corrections are applied on the right: `T ∘ retract(d)`. A zero
    /// rotation block therefore yields a pure translation by `v`.
    pub fn retract(tangent: &Vector6) -> SE3 {
        let omega = Vector3::new(tangent[0], tangent[1], tangent[2]);
        let v = Vector3::new(tangent[3], tangent[4], tangent[5]);
        SE3 {
            rotation: UnitQuaternion::from_scaled_axis(omega),
            translation: v,
        }
    }

    /// True when every component is finite.
    pub fn is_finite(&self) -> bool {
        self.translation.iter().all(|x| x.is_finite())
            && self.rotation.coords.iter().all(|x| x.is_finite())
    }
}

impl Default for SE3 {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_compose_with_identity() {
        let t = SE3::new(
            UnitQuaternion::from_scaled_axis(Vector3::new(0.1, -0.2, 0.3)),
            Vector3::new(1.0, 2.0, 3.0),
        );
        let id = SE3::identity();

        let left = id.compose(&t);
        let right = t.compose(&id);

        assert_relative_eq!(left.translation, t.translation, epsilon = 1e-12);
        assert_relative_eq!(right.translation, t.translation, epsilon = 1e-12);
    }

    #[test]
    fn test_inverse_roundtrip() {
        let t = SE3::new(
            UnitQuaternion::from_scaled_axis(Vector3::new(0.5, 0.1, -0.4)),
            Vector3::new(-2.0, 0.5, 7.0),
        );

        let round = t.compose(&t.inverse());
        assert_relative_eq!(round.translation, Vector3::zeros(), epsilon = 1e-12);
        assert_relative_eq!(round.rotation.angle(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_retract_pure_translation() {
        let mut d = Vector6::zeros();
        d[3] = 1.0;
        d[4] = 1.0;
        d[5] = 1.0;

        let t = SE3::retract(&d);
        assert_relative_eq!(t.translation, Vector3::new(1.0, 1.0, 1.0), epsilon = 1e-12);
        assert_relative_eq!(t.rotation.angle(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_retract_rotation_angle() {
        let mut d = Vector6::zeros();
        d[2] = 0.3;

        let t = SE3::retract(&d);
        assert_relative_eq!(t.rotation.angle(), 0.3, epsilon = 1e-12);
        assert_relative_eq!(t.translation, Vector3::zeros(), epsilon = 1e-12);
    }

    #[test]
    fn test_transform_point_inverse() {
        let t = SE3::new(
            UnitQuaternion::from_scaled_axis(Vector3::new(0.0, 0.7, 0.0)),
            Vector3::new(1.0, -1.0, 2.0),
        );
        let p = Vector3::new(3.0, 4.0, 5.0);

        let q = t.transform_point(&p);
        let back = t.inverse().transform_point(&q);
        assert_relative_eq!(back, p, epsilon = 1e-12);
    }
}
