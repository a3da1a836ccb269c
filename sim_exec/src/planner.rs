//! # Planner interface
//!
//! The path planner (a recurrent network in the full system) generates the
//! tooltip's reference path once, before the real-time loop starts. This
//! module defines the interface the loop expects from it, a simple waypoint
//! planner standing in for the network, and the assembly of the planner's
//! output into a `Trajectory`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::info;
use nalgebra::Vector3;

use crate::traj::{PathSample, TrajError, Trajectory};
use util::maths::linspace;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A generator of tooltip reference paths.
pub trait PathPlanner {
    /// Generate `num_points` tooltip positions following `start_m`. The start
    /// point itself is not included.
    fn plan(&mut self, start_m: &Vector3<f64>, num_points: usize)
        -> Result<Vec<Vector3<f64>>, PlanError>;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Plans a polyline from the start through a list of waypoints, with points
/// evenly spaced along its length.
#[derive(Debug, Clone)]
pub struct WaypointPlanner {
    waypoints_m: Vec<Vector3<f64>>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("A planned trajectory needs at least 2 samples, {0} were requested")]
    TooFewSamples(usize),

    #[error("The planner has no waypoints to follow")]
    NoWaypoints,

    #[error("The planner returned {found} points, expected {expected}")]
    WrongPointCount { expected: usize, found: usize },

    #[error("The planned trajectory is invalid: {0}")]
    InvalidTrajectory(TrajError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl WaypointPlanner {
    pub fn new(waypoints_m: Vec<Vector3<f64>>) -> Self {
        Self { waypoints_m }
    }
}

impl PathPlanner for WaypointPlanner {
    fn plan(&mut self, start_m: &Vector3<f64>, num_points: usize)
        -> Result<Vec<Vector3<f64>>, PlanError>
    {
        if self.waypoints_m.is_empty() {
            return Err(PlanError::NoWaypoints);
        }

        // Polyline vertices and the cumulative length at each
        let mut vertices = vec![*start_m];
        vertices.extend(self.waypoints_m.iter());

        let mut cum_length = vec![0.0];
        for w in vertices.windows(2) {
            let prev = cum_length[cum_length.len() - 1];
            cum_length.push(prev + (w[1] - w[0]).norm());
        }
        let total_length = cum_length[cum_length.len() - 1];

        let mut points = Vec::with_capacity(num_points);
        let mut leg = 0;

        for k in 1..=num_points {
            let s = total_length * k as f64 / num_points as f64;

            // Advance to the leg containing arc length s
            while leg + 2 < vertices.len() && cum_length[leg + 1] < s {
                leg += 1;
            }

            let leg_length = cum_length[leg + 1] - cum_length[leg];
            let frac = if leg_length > 0.0 {
                ((s - cum_length[leg]) / leg_length).max(0.0).min(1.0)
            } else {
                1.0
            };

            points.push(vertices[leg] + (vertices[leg + 1] - vertices[leg]) * frac);
        }

        Ok(points)
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Plan a trajectory of `num_samples` samples starting at `start_m`.
///
/// The time column is normalised to [0, 1], every row carries the given gate
/// reference layout, and the tooltip column is the start point followed by
/// the planner's output.
pub fn plan_trajectory<P: PathPlanner + ?Sized>(
    planner: &mut P,
    start_m: &Vector3<f64>,
    gate_layout_m: &[Vector3<f64>],
    num_samples: usize,
) -> Result<Trajectory, PlanError> {
    if num_samples < 2 {
        return Err(PlanError::TooFewSamples(num_samples));
    }

    let planned = planner.plan(start_m, num_samples - 1)?;
    if planned.len() != num_samples - 1 {
        return Err(PlanError::WrongPointCount {
            expected: num_samples - 1,
            found: planned.len(),
        });
    }

    let samples = linspace(0.0, 1.0, num_samples)
        .into_iter()
        .zip(std::iter::once(*start_m).chain(planned.into_iter()))
        .map(|(time_s, tooltip_position_m)| PathSample {
            time_s,
            gate_positions_m: gate_layout_m.to_vec(),
            tooltip_position_m,
        })
        .collect();

    let traj = Trajectory::new(samples).map_err(PlanError::InvalidTrajectory)?;

    info!(
        "Planned trajectory of {} samples from {:?}",
        traj.len(),
        start_m.as_slice()
    );

    Ok(traj)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_waypoint_planner_spacing() {
        let mut planner = WaypointPlanner::new(vec![
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(1.0, 1.0, 0.0),
        ]);

        let points = planner.plan(&Vector3::zeros(), 4).unwrap();

        let expected = [
            Vector3::new(0.5, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(1.0, 0.5, 0.0),
            Vector3::new(1.0, 1.0, 0.0),
        ];
        for (p, e) in points.iter().zip(expected.iter()) {
            assert!((p - e).norm() < 1e-12, "{:?} != {:?}", p, e);
        }
    }

    #[test]
    fn test_waypoint_planner_degenerate() {
        let mut planner = WaypointPlanner::new(vec![]);
        assert!(matches!(
            planner.plan(&Vector3::zeros(), 3),
            Err(PlanError::NoWaypoints)
        ));

        // Every waypoint at the start gives a stationary path
        let start = Vector3::new(0.1, 0.2, 0.3);
        let mut planner = WaypointPlanner::new(vec![start, start]);
        let points = planner.plan(&start, 3).unwrap();
        assert!(points.iter().all(|p| *p == start));
    }

    #[test]
    fn test_plan_trajectory() {
        let gates = vec![Vector3::new(0.1, 0.0, 0.0), Vector3::new(0.2, 0.0, 0.0)];
        let mut planner = WaypointPlanner::new(gates.clone());
        let start = Vector3::zeros();

        let traj = plan_trajectory(&mut planner, &start, &gates, 5).unwrap();

        assert_eq!(traj.len(), 5);
        assert_eq!(traj.num_gates(), 2);
        assert_eq!(traj.tooltip_position(0), Some(start));
        assert_eq!(traj.sample(0).unwrap().time_s, 0.0);
        assert_eq!(traj.sample(4).unwrap().time_s, 1.0);
        assert!(traj.samples().iter().all(|s| s.gate_positions_m == gates));
        assert!((traj.tooltip_position(4).unwrap() - gates[1]).norm() < 1e-12);

        assert!(matches!(
            plan_trajectory(&mut planner, &start, &gates, 1),
            Err(PlanError::TooFewSamples(1))
        ));
        assert!(matches!(
            plan_trajectory(&mut planner, &start, &[], 5),
            Err(PlanError::InvalidTrajectory(TrajError::NoGates))
        ));
    }
}
