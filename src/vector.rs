//! Vector helpers on top of `glam::Vec2`.
//!
//! `Vec2` is already a `Copy` value type, so the pure API is its operators
//! (`a + b`, `a - b`, `-a`, `a * s`). This trait adds the zero-length policy
//! and explicit in-place variants for hot per-tick loops.

use glam::Vec2;

use crate::error::PhysicsError;

/// The one vector type used across the crate.
pub type Vector = Vec2;

/// Squared length below which a vector counts as zero for normalisation.
pub const ZERO_LENGTH_SQ: f32 = 1e-12;

pub trait VectorExt: Sized {
    fn magnitude(self) -> f32;

    /// Unit vector in the same direction; a zero vector maps to zero.
    fn normalized(self) -> Self;

    /// Unit vector, or `ZeroLengthVector` when there is no direction.
    fn try_normalized(self) -> Result<Self, PhysicsError>;

    fn normalize_in_place(&mut self);
    fn scale_in_place(&mut self, s: f32);

    /// Component-wise sign with `0.0` for zero (`f32::signum` maps 0 to 1).
    fn sign(self) -> Self;
}

impl VectorExt for Vec2 {
    #[inline]
    fn magnitude(self) -> f32 {
        self.length()
    }

    #[inline]
    fn normalized(self) -> Self {
        self.try_normalized().unwrap_or(Vec2::ZERO)
    }

    fn try_normalized(self) -> Result<Self, PhysicsError> {
        let len_sq = self.length_squared();
        if len_sq <= ZERO_LENGTH_SQ || !len_sq.is_finite() {
            return Err(PhysicsError::ZeroLengthVector);
        }
        Ok(self / len_sq.sqrt())
    }

    #[inline]
    fn normalize_in_place(&mut self) {
        *self = self.normalized();
    }

    #[inline]
    fn scale_in_place(&mut self, s: f32) {
        *self *= s;
    }

    #[inline]
    fn sign(self) -> Self {
        Vec2::new(sign(self.x), sign(self.y))
    }
}

/// Scalar sign returning `0.0` for zero.
#[inline]
pub fn sign(x: f32) -> f32 {
    if x < 0.0 {
        -1.0
    } else if x > 0.0 {
        1.0
    } else {
        0.0
    }
}
