//! 2D vector primitive.
//!
//! Vectors are `glam::DVec2`, an immutable `Copy` value type whose operators
//! (`+`, `-`, `* f64`, `/ f64`, `length`, `floor`) cover every arithmetic
//! need of the simulation. [`VectorExt`] adds the few helpers glam lacks.

use std::f64::consts::TAU;

pub use glam::DVec2 as Vector2;

/// Additive guard used whenever a vector is divided by its own length.
pub const NORM_EPSILON: f64 = 1e-9;

/// Simulation-specific helpers on top of `DVec2`.
pub trait VectorExt {
    /// Direction angle in radians, normalized to `[0, 2π)`.
    ///
    /// The y axis points down the image, so positive angles turn from +x
    /// towards increasing row index.
    fn heading(self) -> f64;

    /// Returns the vector unchanged when its length exceeds `min`, otherwise
    /// rescales it to length `min`. Zero stays zero.
    fn with_min_length(self, min: f64) -> Self;
}

impl VectorExt for Vector2 {
    fn heading(self) -> f64 {
        self.y.atan2(self.x).rem_euclid(TAU)
    }

    fn with_min_length(self, min: f64) -> Self {
        let len = self.length();
        if len > min {
            self
        } else {
            self * (min / (len + NORM_EPSILON))
        }
    }
}
