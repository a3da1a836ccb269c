//! # Simulation library.
//!
//! This library allows other crates in the workspace (and the benchmarks) to access items defined
//! inside the simulation crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Path analysis - closest approach and peak acceleration metrics of a path
pub mod analysis;

/// Kinematic limiter - clamps acceleration demands to a maximum norm
pub mod kin_lim;

/// Simulation executable parameters
pub mod params;

/// Path correction module - follows the planned path while correcting for moving gates
pub mod path_ctrl;

/// Planner interface - generates the reference path before the loop starts
pub mod planner;

/// Real-time scheduler - paces the world and path correction at a fixed rate
pub mod rt_sched;

/// Trajectory store and segment detection
pub mod traj;

/// Physics world interface
pub mod world;
