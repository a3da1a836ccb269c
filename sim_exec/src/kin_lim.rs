//! # Kinematic limiter
//!
//! Limits tooltip acceleration demands to the maximum acceleration norm of
//! the arm while keeping the demand's direction.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector3;
use util::maths::clamp;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Scale `accel_mss` so that its norm is at most `max_accel_mss`.
///
/// A zero or non-finite demand returns the zero vector. `max_accel_mss` must
/// be positive.
pub fn limit_accel(accel_mss: &Vector3<f64>, max_accel_mss: f64) -> Vector3<f64> {
    let norm = accel_mss.norm();

    if norm == 0.0 || !norm.is_finite() {
        return Vector3::zeros();
    }

    let limited_norm = clamp(&norm, &0.0, &max_accel_mss);

    accel_mss * (limited_norm / norm)
}

/// True if the demand would be changed by `limit_accel`.
pub fn is_limited(accel_mss: &Vector3<f64>, max_accel_mss: f64) -> bool {
    accel_mss.norm() > max_accel_mss
}
