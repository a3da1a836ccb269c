//! Path correction parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use super::PathCtrlError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for path correction
#[derive(Deserialize, Debug, Clone, Default)]
pub struct Params {
    /// Maximum norm of the tooltip acceleration.
    ///
    /// Units: meters/second^2
    pub max_accel_mss: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// Check the parameters are usable.
    pub fn validate(&self) -> Result<(), PathCtrlError> {
        if !(self.max_accel_mss.is_finite() && self.max_accel_mss > 0.0) {
            return Err(PathCtrlError::InvalidMaxAccel(self.max_accel_mss));
        }

        Ok(())
    }
}
