//! # Simulation Executable Parameters
//!
//! This module provides parameters for the simulation executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExecParams {
    /// Target rate of the real-time loop.
    ///
    /// Units: hertz
    pub fps: f64,

    /// Duration the planned traversal of the gates should take, which sets
    /// the number of planned samples together with `fps`.
    ///
    /// Units: seconds
    pub traversal_time_s: f64,

    /// Virtual time for which the world is held paused before tracking.
    ///
    /// Units: seconds
    pub start_hold_s: f64,

    /// Session-relative file the planned trajectory is saved to
    pub planned_path_file: String,

    /// Session-relative file the corrected trajectory is saved to
    pub corrected_path_file: String,

    /// Archive the path corrector status report every tick
    pub archive_status: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl SimExecParams {
    /// Number of samples in a planned trajectory, one per tick of the
    /// traversal plus the start point.
    pub fn num_planned_samples(&self) -> usize {
        let n = (self.traversal_time_s * self.fps).round();

        if n.is_finite() && n > 0.0 {
            n as usize + 1
        }
        else {
            0
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_load() {
        let params: SimExecParams = util::params::from_str(
            r#"
            fps = 60.0
            traversal_time_s = 20.0
            start_hold_s = 1.0
            planned_path_file = "planned_path.csv"
            corrected_path_file = "corrected_path.csv"
            archive_status = true
            "#,
        )
        .unwrap();

        assert_eq!(params.num_planned_samples(), 1201);

        let zero = SimExecParams {
            traversal_time_s: 0.0,
            ..params
        };
        assert_eq!(zero.num_planned_samples(), 0);
    }
}
