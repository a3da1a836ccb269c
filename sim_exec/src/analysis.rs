//! # Path analysis
//!
//! Metrics comparing planned and corrected paths, computed at the end of a
//! run: how close the tooltip passes to each gate and the largest
//! acceleration the path requires.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector3;
use serde::Serialize;

use crate::traj::{detect_segment_ends, Trajectory};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Metrics of a single path.
#[derive(Debug, Clone, Serialize)]
pub struct PathMetrics {
    /// Number of samples in the path
    pub num_samples: usize,

    /// Distance of closest approach of the tooltip to each gate.
    ///
    /// Units: meters
    pub closest_approach_m: Vec<f64>,

    /// Largest acceleration norm along the path, if the step was valid.
    ///
    /// Units: meters/second^2
    pub peak_accel_mss: Option<f64>,
}

/// Metrics of the planned and corrected paths of a run.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub planned: PathMetrics,
    pub corrected: PathMetrics,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Distance between each gate and the tooltip at that gate's segment end.
///
/// The gate position is the one recorded in the path at that step, so for a
/// corrected path this is the live gate position.
pub fn closest_approaches(traj: &Trajectory) -> Vec<f64> {
    detect_segment_ends(traj)
        .iter()
        .enumerate()
        .filter_map(|(g, &end)| {
            let gate = traj.gate_position(end, g)?;
            let tooltip = traj.tooltip_position(end)?;
            Some((gate - tooltip).norm())
        })
        .collect()
}

/// The largest acceleration norm needed to move the tooltip from sample to
/// sample with a fixed step of `dt_s`, starting from rest.
///
/// Returns `None` if `dt_s` is not positive and finite.
pub fn peak_accel_norm(traj: &Trajectory, dt_s: f64) -> Option<f64> {
    if !(dt_s.is_finite() && dt_s > 0.0) {
        return None;
    }

    let mut v_curr = Vector3::zeros();
    let mut peak = 0f64;

    for w in traj.samples().windows(2) {
        let v_next = (w[1].tooltip_position_m - w[0].tooltip_position_m) / dt_s;
        let a = (v_next - v_curr) / dt_s;

        peak = peak.max(a.norm());
        v_curr = v_next;
    }

    Some(peak)
}

/// Compute all metrics of a path.
pub fn path_metrics(traj: &Trajectory, dt_s: f64) -> PathMetrics {
    PathMetrics {
        num_samples: traj.len(),
        closest_approach_m: closest_approaches(traj),
        peak_accel_mss: peak_accel_norm(traj, dt_s),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::traj::test::line_trajectory;

    #[test]
    fn test_closest_approaches() {
        let gates = [Vector3::new(0.03, 0.04, 0.0), Vector3::new(0.1, 0.0, 0.02)];
        let traj = line_trajectory(6, &gates);

        let d = closest_approaches(&traj);

        assert_eq!(d.len(), 2);
        assert!((d[0] - 0.04).abs() < 1e-12);
        // Last gate is measured at the final step, x = 0.05
        assert!((d[1] - (0.05f64.powi(2) + 0.02f64.powi(2)).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_peak_accel() {
        // Constant 1 m/s along X at dt = 0.01, so the only acceleration is
        // the start from rest
        let traj = line_trajectory(10, &[Vector3::zeros()]);

        let peak = peak_accel_norm(&traj, 0.01).unwrap();
        assert!((peak - 100.0).abs() < 1e-6);

        assert!(peak_accel_norm(&traj, 0.0).is_none());
        assert_eq!(peak_accel_norm(&line_trajectory(1, &[Vector3::zeros()]), 0.01), Some(0.0));
    }

    #[test]
    fn test_path_metrics() {
        let traj = line_trajectory(4, &[Vector3::zeros(), Vector3::zeros()]);
        let m = path_metrics(&traj, 0.1);

        assert_eq!(m.num_samples, 4);
        assert_eq!(m.closest_approach_m.len(), 2);
        assert!(m.peak_accel_mss.is_some());
    }
}
