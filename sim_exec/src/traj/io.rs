//! # Trajectory persistence
//!
//! Trajectories are stored as CSV with one header row and one row per
//! sample: `time_s`, then `gate{g}_{x,y,z}_m` for every gate, then
//! `tooltip_{x,y,z}_m`. The gate count is recovered from the column count
//! when reading.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::{fs::File, io, path::Path};

use csv::{ReaderBuilder, WriterBuilder};
use log::debug;

use super::{PathSample, TrajError, Trajectory, POS_DIMS};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

const AXES: [&str; POS_DIMS] = ["x", "y", "z"];

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the header row for a trajectory with `num_gates` gates.
pub fn header(num_gates: usize) -> Vec<String> {
    let mut header = Vec::with_capacity(PathSample::num_columns(num_gates));

    header.push(String::from("time_s"));
    for g in 0..num_gates {
        for axis in AXES.iter() {
            header.push(format!("gate{}_{}_m", g, axis));
        }
    }
    for axis in AXES.iter() {
        header.push(format!("tooltip_{}_m", axis));
    }

    header
}

/// Write the trajectory as CSV into the given writer.
pub fn write_csv<W: io::Write>(traj: &Trajectory, writer: W) -> Result<(), TrajError> {
    let mut w = WriterBuilder::new().has_headers(false).from_writer(writer);

    w.write_record(header(traj.num_gates()))?;

    for sample in traj.samples() {
        w.write_record(sample.to_row().iter().map(|v| v.to_string()))?;
    }

    w.flush()?;

    Ok(())
}

/// Read a trajectory from CSV in the persisted layout.
pub fn read_csv<R: io::Read>(reader: R) -> Result<Trajectory, TrajError> {
    let mut r = ReaderBuilder::new().has_headers(true).from_reader(reader);

    let num_cols = r.headers()?.len();

    // Columns are time, N gates, tooltip
    let gate_cols = num_cols.saturating_sub(1 + POS_DIMS);
    if num_cols < 1 + POS_DIMS || gate_cols % POS_DIMS != 0 {
        return Err(TrajError::ColumnCount {
            row: 0,
            expected: PathSample::num_columns(gate_cols / POS_DIMS + 1),
            found: num_cols,
        });
    }
    let num_gates = gate_cols / POS_DIMS;

    let mut samples = Vec::new();
    let mut row = Vec::with_capacity(num_cols);

    for (i, record) in r.records().enumerate() {
        let record = record?;

        row.clear();
        for (column, field) in record.iter().enumerate() {
            let value = field.trim().parse::<f64>().map_err(|_| TrajError::ParseError {
                row: i,
                column,
                value: String::from(field),
            })?;
            row.push(value);
        }

        samples.push(PathSample::from_row(&row, num_gates, i)?);
    }

    Trajectory::new(samples)
}

/// Save the trajectory to a CSV file, replacing any existing file.
pub fn save<P: AsRef<Path>>(traj: &Trajectory, path: P) -> Result<(), TrajError> {
    if let Some(parent) = path.as_ref().parent() {
        std::fs::create_dir_all(parent)?;
    }

    write_csv(traj, File::create(path.as_ref())?)?;

    debug!("Saved {} samples to {:?}", traj.len(), path.as_ref());

    Ok(())
}

/// Load a trajectory from a CSV file.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Trajectory, TrajError> {
    let traj = read_csv(File::open(path.as_ref())?)?;

    debug!(
        "Loaded {} samples with {} gates from {:?}",
        traj.len(),
        traj.num_gates(),
        path.as_ref()
    );

    Ok(traj)
}

#[cfg(test)]
mod test {
    use nalgebra::Vector3;

    use super::*;
    use crate::traj::test::line_trajectory;

    #[test]
    fn test_header() {
        let h = header(2);
        assert_eq!(h.len(), PathSample::num_columns(2));
        assert_eq!(h[0], "time_s");
        assert_eq!(h[1], "gate0_x_m");
        assert_eq!(h[6], "gate1_z_m");
        assert_eq!(h[9], "tooltip_z_m");
    }

    #[test]
    fn test_save_load_file() {
        let traj = line_trajectory(5, &[Vector3::new(0.1, 0.2, 0.3), Vector3::new(-0.1, 0.0, 0.05)]);

        let path = std::env::temp_dir()
            .join(format!("surgsim_traj_{}", std::process::id()))
            .join("path.csv");

        save(&traj, &path).unwrap();
        let loaded = load(&path).unwrap();

        assert_eq!(loaded.len(), 5);
        assert_eq!(loaded.num_gates(), 2);
        assert_eq!(loaded, traj);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_read_bad_input() {
        // Wrong column count for any gate count
        let csv = "time_s,a,b,c,d\n0,0,0,0,0\n";
        assert!(matches!(
            read_csv(csv.as_bytes()),
            Err(TrajError::ColumnCount { .. })
        ));

        // Non-numeric value
        let csv = "time_s,g_x,g_y,g_z,t_x,t_y,t_z\n0,0,0,0,oops,0,0\n";
        assert!(matches!(
            read_csv(csv.as_bytes()),
            Err(TrajError::ParseError { row: 0, column: 4, .. })
        ));

        // Header only
        let csv = "time_s,g_x,g_y,g_z,t_x,t_y,t_z\n";
        assert!(matches!(read_csv(csv.as_bytes()), Err(TrajError::Empty)));
    }
}
