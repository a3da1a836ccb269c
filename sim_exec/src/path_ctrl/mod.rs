//! # Path correction module
//!
//! Path correction drives the tooltip along the planned trajectory while the
//! gates it must pass through move. Each tick the live position of the gate
//! ahead is compared with where the plan expected it to be, and the next
//! reference point is shifted by that drift. The resulting velocity and
//! acceleration demands are limited to the arm's maximum acceleration, so
//! a sudden gate jump is caught up over several ticks rather than at once.
//!
//! The shift applied so far is kept as a path offset, added to every
//! following reference sample, so a drift is only corrected once.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use params::Params;
pub use state::*;

use crate::traj::TrajError;
use util::{archive::ArchiveError, params::LoadError};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during path correction.
#[derive(Debug, thiserror::Error)]
pub enum PathCtrlError {
    #[error("Could not load parameters: {0}")]
    ParamLoadError(LoadError),

    #[error("The maximum acceleration must be positive and finite, found {0}")]
    InvalidMaxAccel(f64),

    #[error("Could not initialise the status archive: {0}")]
    ArchiveInitError(ArchiveError),

    #[error("No trajectory has been loaded")]
    NoTrajectory,

    #[error("Step {index} has no following step, the final index is {last}")]
    EndOfTrajectory { index: usize, last: usize },

    #[error("Expected {expected} live gate positions, found {found}")]
    LiveGateCountMismatch { expected: usize, found: usize },

    #[error("Could not record the corrected path: {0}")]
    RecordError(TrajError),
}
