//! Kinematic world parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the kinematic world.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    /// Resting position of each gate, one entry per gate (`gate0`, `gate1`,
    /// ...).
    ///
    /// Units: meters
    pub gate_positions_m: Vec<[f64; 3]>,

    /// Resting position of the tooltip (and stick).
    ///
    /// Units: meters
    pub tooltip_rest_m: [f64; 3],

    /// Resting position of the table carrying the test article.
    ///
    /// Units: meters
    pub table_pos_m: [f64; 3],

    /// Oscillation of the table and gates.
    #[serde(default)]
    pub shaker_table: ShakerTableParams,

    /// If set, the world reports itself closed after this many steps.
    #[serde(default)]
    pub step_limit: Option<u64>,
}

/// Shaker table oscillation along +Y.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ShakerTableParams {
    /// If false the table and gates stay at rest.
    pub oscillating: bool,

    /// Amplitude of the oscillation.
    ///
    /// Units: meters
    pub amp_m: f64,

    /// Frequency of the oscillation.
    ///
    /// Units: hertz
    pub freq_hz: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ShakerTableParams {
    /// Y displacement of the table at simulated time `t_s`.
    pub fn displacement_m(&self, t_s: f64) -> f64 {
        if !self.oscillating {
            return 0.0;
        }

        self.amp_m * (t_s * self.freq_hz * std::f64::consts::TAU).sin()
    }
}
