//! # World interface
//!
//! The physics world (rigid body dynamics, collisions, viewer) lives outside
//! this crate. The real-time loop only needs to read and move named bodies,
//! set the step size, step the world and know whether the world (and its
//! viewer) is still running. Any backend providing those calls implements
//! `World`.
//!
//! `KinematicWorld` is an in-process backend without dynamics, used when no
//! physics engine is attached and in tests.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod kinematic;
mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector3;

pub use kinematic::KinematicWorld;
pub use params::{Params, ShakerTableParams};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Name of the tooltip body.
pub const TOOLTIP_BODY: &str = "tooltip";

/// Name of the stick body holding the tooltip.
pub const STICK_BODY: &str = "stick";

/// Name of the group moving the tooltip and stick together.
pub const POINTER_GROUP: &str = "pointer";

/// Name of the table body carrying the test article.
pub const TABLE_BODY: &str = "table";

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Narrow interface to the physics world.
///
/// Calls are blocking and expected to be fast. A slow call eats into the
/// tick's time budget and is absorbed by the scheduler's overshoot handling.
pub trait World {
    /// Get the position of a named body.
    fn body_position(&self, name: &str) -> Result<Vector3<f64>, WorldError>;

    /// Move a named body.
    fn set_body_position(&mut self, name: &str, position_m: Vector3<f64>) -> Result<(), WorldError>;

    /// Move every body in a named group.
    fn set_group_position(&mut self, group: &str, position_m: Vector3<f64>) -> Result<(), WorldError>;

    /// Set the duration of the next step.
    fn set_dt(&mut self, dt_s: f64);

    /// Step the world. When `paused` is true only rendering and messaging are
    /// updated, simulated time does not advance and no forces are applied.
    fn step(&mut self, paused: bool) -> Result<(), WorldError>;

    /// False once the world or its viewer has been closed.
    fn is_alive(&self) -> bool;
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors reported by a world backend.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    #[error("No body named {0:?} exists in the world")]
    UnknownBody(String),

    #[error("No group named {0:?} exists in the world")]
    UnknownGroup(String),

    #[error("The world is no longer running")]
    Disconnected,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Name of the body of gate `index`.
pub fn gate_body_name(index: usize) -> String {
    format!("gate{}", index)
}

/// Read the live position of the first `num_gates` gates.
pub fn gate_positions<W: World + ?Sized>(
    world: &W,
    num_gates: usize,
) -> Result<Vec<Vector3<f64>>, WorldError> {
    (0..num_gates)
        .map(|g| world.body_position(&gate_body_name(g)))
        .collect()
}
