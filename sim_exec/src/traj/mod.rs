//! # Trajectory store
//!
//! A trajectory is the ordered sequence of path samples produced by the
//! planner before the real-time loop starts. Each sample holds the time, the
//! reference position of every gate and the reference position of the
//! tooltip. Trajectories are validated on construction and never resized
//! afterwards; the corrected ("dynamic") copy is overwritten in place one row
//! per tick.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod io;
pub mod segments;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

// Internal
pub use segments::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of gates in the standard test article (`gate0` to `gate7`).
pub const NUM_GATES: usize = 8;

/// Number of position dimensions of a gate or the tooltip.
pub const POS_DIMS: usize = 3;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single step of a trajectory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathSample {
    /// Time of the sample.
    ///
    /// Units: seconds (normalised to [0, 1] for planned paths)
    pub time_s: f64,

    /// Position of each gate, indexed by gate number.
    ///
    /// Units: meters
    pub gate_positions_m: Vec<Vector3<f64>>,

    /// Position of the tooltip.
    ///
    /// Units: meters
    pub tooltip_position_m: Vector3<f64>,
}

/// An ordered, non-empty sequence of path samples sharing the same number of
/// gates.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    samples: Vec<PathSample>,
    num_gates: usize,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with building, editing or persisting trajectories.
#[derive(Debug, thiserror::Error)]
pub enum TrajError {
    #[error("A trajectory must contain at least one sample")]
    Empty,

    #[error("A trajectory must reference at least one gate")]
    NoGates,

    #[error("Sample {index} has {found} gate positions, expected {expected}")]
    GateCountMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },

    #[error("Sample {index} has a time earlier than the previous sample")]
    NonMonotonicTime { index: usize },

    #[error("Sample {index} contains a non-finite value")]
    NonFinite { index: usize },

    #[error("Index {index} is outside the trajectory (length {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Row {row} has {found} columns, expected {expected}")]
    ColumnCount {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Row {row} column {column} is not a number: {value:?}")]
    ParseError {
        row: usize,
        column: usize,
        value: String,
    },

    #[error("Could not read or write the trajectory CSV: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Could not access the trajectory file: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PathSample {
    /// Number of columns a sample with `num_gates` gates occupies in the
    /// tabular layout (time, gate positions, tooltip position).
    pub fn num_columns(num_gates: usize) -> usize {
        1 + num_gates * POS_DIMS + POS_DIMS
    }

    /// Flatten the sample into a tabular row.
    pub fn to_row(&self) -> Vec<f64> {
        let mut row = Vec::with_capacity(Self::num_columns(self.gate_positions_m.len()));

        row.push(self.time_s);
        for gate in self.gate_positions_m.iter() {
            row.extend(gate.iter());
        }
        row.extend(self.tooltip_position_m.iter());

        row
    }

    /// Build a sample from a tabular row with `num_gates` gates.
    ///
    /// `row_index` is only used to report errors.
    pub fn from_row(row: &[f64], num_gates: usize, row_index: usize) -> Result<Self, TrajError> {
        let expected = Self::num_columns(num_gates);
        if row.len() != expected {
            return Err(TrajError::ColumnCount {
                row: row_index,
                expected,
                found: row.len(),
            });
        }

        let gate_positions_m = row[1..1 + num_gates * POS_DIMS]
            .chunks(POS_DIMS)
            .map(Vector3::from_column_slice)
            .collect();

        Ok(Self {
            time_s: row[0],
            gate_positions_m,
            tooltip_position_m: Vector3::from_column_slice(&row[expected - POS_DIMS..]),
        })
    }

    fn is_finite(&self) -> bool {
        self.time_s.is_finite()
            && self.tooltip_position_m.iter().all(|v| v.is_finite())
            && self
                .gate_positions_m
                .iter()
                .all(|g| g.iter().all(|v| v.is_finite()))
    }
}

impl Trajectory {
    /// Build a trajectory from a list of samples.
    ///
    /// The samples must be non-empty, reference at least one gate, share the
    /// same gate count, contain only finite values and be non-decreasing in
    /// time.
    pub fn new(samples: Vec<PathSample>) -> Result<Self, TrajError> {
        let num_gates = match samples.first() {
            Some(s) => s.gate_positions_m.len(),
            None => return Err(TrajError::Empty),
        };

        if num_gates == 0 {
            return Err(TrajError::NoGates);
        }

        for (i, sample) in samples.iter().enumerate() {
            if sample.gate_positions_m.len() != num_gates {
                return Err(TrajError::GateCountMismatch {
                    index: i,
                    expected: num_gates,
                    found: sample.gate_positions_m.len(),
                });
            }

            if !sample.is_finite() {
                return Err(TrajError::NonFinite { index: i });
            }

            if i > 0 && sample.time_s < samples[i - 1].time_s {
                return Err(TrajError::NonMonotonicTime { index: i });
            }
        }

        Ok(Self { samples, num_gates })
    }

    /// Number of samples in the trajectory.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false, trajectories cannot be empty.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Index of the final sample.
    pub fn last_index(&self) -> usize {
        self.samples.len() - 1
    }

    pub fn num_gates(&self) -> usize {
        self.num_gates
    }

    pub fn samples(&self) -> &[PathSample] {
        &self.samples
    }

    pub fn sample(&self, index: usize) -> Option<&PathSample> {
        self.samples.get(index)
    }

    /// Reference tooltip position at the given step.
    pub fn tooltip_position(&self, index: usize) -> Option<Vector3<f64>> {
        self.samples.get(index).map(|s| s.tooltip_position_m)
    }

    /// Reference position of gate `gate` at the given step.
    pub fn gate_position(&self, index: usize, gate: usize) -> Option<Vector3<f64>> {
        self.samples
            .get(index)
            .and_then(|s| s.gate_positions_m.get(gate).copied())
    }

    /// Overwrite the row at `index` with new values.
    ///
    /// Time ordering is not checked here since a partially corrected copy
    /// mixes planned and recorded times.
    pub fn set_row(
        &mut self,
        index: usize,
        time_s: f64,
        gate_positions_m: &[Vector3<f64>],
        tooltip_position_m: Vector3<f64>,
    ) -> Result<(), TrajError> {
        let len = self.samples.len();
        let num_gates = self.num_gates;

        let sample = self
            .samples
            .get_mut(index)
            .ok_or(TrajError::IndexOutOfRange { index, len })?;

        if gate_positions_m.len() != num_gates {
            return Err(TrajError::GateCountMismatch {
                index,
                expected: num_gates,
                found: gate_positions_m.len(),
            });
        }

        sample.time_s = time_s;
        sample.gate_positions_m.clear();
        sample.gate_positions_m.extend_from_slice(gate_positions_m);
        sample.tooltip_position_m = tooltip_position_m;

        Ok(())
    }

    /// Return a copy of the first `len` samples.
    ///
    /// `len` is clamped into `[1, self.len()]`.
    pub fn head(&self, len: usize) -> Self {
        let len = len.max(1).min(self.samples.len());

        Self {
            samples: self.samples[..len].to_vec(),
            num_gates: self.num_gates,
        }
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    /// Build a trajectory with a straight tooltip line along +X and fixed
    /// gates.
    pub(crate) fn line_trajectory(len: usize, gates: &[Vector3<f64>]) -> Trajectory {
        let samples = (0..len)
            .map(|i| PathSample {
                time_s: i as f64,
                gate_positions_m: gates.to_vec(),
                tooltip_position_m: Vector3::new(i as f64 * 0.01, 0.0, 0.0),
            })
            .collect();

        Trajectory::new(samples).unwrap()
    }

    #[test]
    fn test_new_validation() {
        assert!(matches!(Trajectory::new(vec![]), Err(TrajError::Empty)));

        let no_gates = PathSample {
            time_s: 0.0,
            gate_positions_m: vec![],
            tooltip_position_m: Vector3::zeros(),
        };
        assert!(matches!(
            Trajectory::new(vec![no_gates]),
            Err(TrajError::NoGates)
        ));

        let mut samples = line_trajectory(3, &[Vector3::zeros(); 2]).samples().to_vec();
        samples[2].gate_positions_m.pop();
        assert!(matches!(
            Trajectory::new(samples),
            Err(TrajError::GateCountMismatch { index: 2, expected: 2, found: 1 })
        ));

        let mut samples = line_trajectory(3, &[Vector3::zeros()]).samples().to_vec();
        samples[1].time_s = 5.0;
        assert!(matches!(
            Trajectory::new(samples),
            Err(TrajError::NonMonotonicTime { index: 2 })
        ));

        let mut samples = line_trajectory(3, &[Vector3::zeros()]).samples().to_vec();
        samples[0].tooltip_position_m.y = std::f64::NAN;
        assert!(matches!(
            Trajectory::new(samples),
            Err(TrajError::NonFinite { index: 0 })
        ));
    }

    #[test]
    fn test_row_layout() {
        let sample = PathSample {
            time_s: 0.5,
            gate_positions_m: vec![Vector3::new(1.0, 2.0, 3.0), Vector3::new(4.0, 5.0, 6.0)],
            tooltip_position_m: Vector3::new(7.0, 8.0, 9.0),
        };

        let row = sample.to_row();
        assert_eq!(row, vec![0.5, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        assert_eq!(PathSample::num_columns(2), row.len());
        assert_eq!(PathSample::from_row(&row, 2, 0).unwrap(), sample);

        assert!(matches!(
            PathSample::from_row(&row, 3, 4),
            Err(TrajError::ColumnCount { row: 4, expected: 13, found: 10 })
        ));
    }

    #[test]
    fn test_set_row_and_head() {
        let mut traj = line_trajectory(4, &[Vector3::zeros()]);

        traj.set_row(1, 10.0, &[Vector3::new(0.1, 0.0, 0.0)], Vector3::new(1.0, 1.0, 1.0))
            .unwrap();
        assert_eq!(traj.gate_position(1, 0), Some(Vector3::new(0.1, 0.0, 0.0)));
        assert_eq!(traj.tooltip_position(1), Some(Vector3::new(1.0, 1.0, 1.0)));
        assert_eq!(traj.sample(1).unwrap().time_s, 10.0);

        assert!(matches!(
            traj.set_row(4, 0.0, &[Vector3::zeros()], Vector3::zeros()),
            Err(TrajError::IndexOutOfRange { index: 4, len: 4 })
        ));
        assert!(matches!(
            traj.set_row(0, 0.0, &[], Vector3::zeros()),
            Err(TrajError::GateCountMismatch { .. })
        ));

        assert_eq!(traj.head(2).len(), 2);
        assert_eq!(traj.head(0).len(), 1);
        assert_eq!(traj.head(100).len(), 4);
    }
}
