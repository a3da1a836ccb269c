//! Path correction module state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, trace, warn};
use nalgebra::Vector3;
use serde::Serialize;

// Internal
use super::{Params, PathCtrlError};
use crate::{
    kin_lim,
    traj::{self, Segment, Trajectory},
};
use util::{
    archive::{ArchiveError, Archived, Archiver},
    module::State,
    params,
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Path correction module state
#[derive(Default)]
pub struct PathCtrl {
    pub(crate) params: Params,

    /// The planned trajectory being followed
    planned: Option<Trajectory>,

    /// Segments of the planned trajectory, one per gate
    segments: Vec<Segment>,

    /// Copy of the planned trajectory overwritten with the corrected path
    corrected: Option<Trajectory>,

    /// Number of rows of `corrected` which hold recorded data
    num_recorded: usize,

    correction: CorrectionState,

    report: StatusReport,
    arch_report: Archiver,
}

/// Correction carried from one tick to the next.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CorrectionState {
    /// Cumulative shift applied to every following reference sample.
    ///
    /// Units: meters
    pub path_offset_m: Vector3<f64>,

    /// Tooltip velocity.
    ///
    /// Units: meters/second
    pub velocity_ms: Vector3<f64>,
}

/// Input data to path correction.
#[derive(Debug, Clone, Default)]
pub struct InputData {
    /// Current step in the planned trajectory. Must be before the final step.
    pub index: usize,

    /// Duration of this tick.
    ///
    /// Units: seconds
    pub dt_s: f64,

    /// Simulated time at the end of this tick, recorded in the corrected
    /// path.
    ///
    /// Units: seconds
    pub time_s: f64,

    /// Live position of every gate, read from the world this tick.
    ///
    /// Units: meters
    pub live_gates_m: Vec<Vector3<f64>>,
}

/// Output of path correction.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct OutputData {
    /// Position the tooltip shall be moved to this tick.
    ///
    /// Units: meters
    pub tooltip_dem_m: Vector3<f64>,
}

/// Status report for path correction processing.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusReport {
    /// Step which was processed
    pub index: usize,

    /// Gate of the active segment
    pub segment_gate: usize,

    /// Distance between the live gate and where the corrected plan expected it
    pub gate_drift_m: f64,

    /// Norm of the acceleration demand before limiting
    pub accel_dem_mss: f64,

    /// True if the acceleration demand was limited
    pub accel_limited: bool,

    /// Tooltip speed after this tick
    pub speed_ms: f64,

    /// Norm of the path offset after this tick
    pub path_offset_m: f64,

    /// True if the tick duration was zero or not finite, in which case no
    /// correction was made
    pub degenerate_dt: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for PathCtrl {
    type InitData = &'static str;
    type InitError = PathCtrlError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = PathCtrlError;

    /// Initialise the PathCtrl module.
    ///
    /// Expected init data is the path to the parameter file.
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>
    {
        let params: Params = params::load(init_data)
            .map_err(PathCtrlError::ParamLoadError)?;
        params.validate()?;
        self.params = params;

        self.arch_report = Archiver::from_path(session, "path_ctrl/status_report.csv")
            .map_err(PathCtrlError::ArchiveInitError)?;

        Ok(())
    }

    /// Perform one tick of path correction.
    ///
    /// The tooltip demand for the step after `index` is calculated from the
    /// planned path, the accumulated offset and the live position of the
    /// active segment's gate, then recorded into the corrected path.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        self.report = StatusReport::default();

        let planned = self.planned.as_ref().ok_or(PathCtrlError::NoTrajectory)?;

        let index = input_data.index;
        let last = planned.last_index();
        if index >= last {
            return Err(PathCtrlError::EndOfTrajectory { index, last });
        }

        if input_data.live_gates_m.len() != planned.num_gates() {
            return Err(PathCtrlError::LiveGateCountMismatch {
                expected: planned.num_gates(),
                found: input_data.live_gates_m.len(),
            });
        }

        let segment = *traj::active_segment(&self.segments, index)
            .ok_or(PathCtrlError::NoTrajectory)?;

        // ---- TARGET ----

        let samples = planned.samples();
        let offset_m = self.correction.path_offset_m;

        let x_curr = samples[index].tooltip_position_m + offset_m;
        let x_next = samples[index + 1].tooltip_position_m + offset_m;

        // Where the plan put the gate at its closest approach, and where it
        // actually is now
        let x_gate_expected = samples[segment.end].gate_positions_m[segment.gate_index];
        let x_gate_actual = input_data.live_gates_m[segment.gate_index];

        let dx_gate = x_gate_actual - (x_gate_expected + offset_m);
        let x_target = x_next + dx_gate;

        self.report.index = index;
        self.report.segment_gate = segment.gate_index;
        self.report.gate_drift_m = dx_gate.norm();

        // ---- KINEMATICS ----

        let dt_s = input_data.dt_s;

        let x_new = if dt_s.is_finite() && dt_s > 0.0 {
            let v_target = (x_target - x_curr) / dt_s;
            let a_target = (v_target - self.correction.velocity_ms) / dt_s;

            let a_limited = kin_lim::limit_accel(&a_target, self.params.max_accel_mss);

            self.report.accel_dem_mss = a_target.norm();
            self.report.accel_limited = kin_lim::is_limited(&a_target, self.params.max_accel_mss);

            self.correction.velocity_ms += a_limited * dt_s;

            x_curr + self.correction.velocity_ms * dt_s
        }
        else {
            warn!(
                "Degenerate tick duration ({} s) at step {}, following the reference",
                dt_s, index
            );
            self.report.degenerate_dt = true;

            x_next
        };

        self.correction.path_offset_m += x_new - x_next;

        self.report.speed_ms = self.correction.velocity_ms.norm();
        self.report.path_offset_m = self.correction.path_offset_m.norm();

        trace!(
            "PathCtrl step {}: gate {} drift {:.6} m, accel dem {:.4} m/s^2{}, offset {:?}",
            index,
            segment.gate_index,
            self.report.gate_drift_m,
            self.report.accel_dem_mss,
            if self.report.accel_limited { " (limited)" } else { "" },
            self.correction.path_offset_m
        );

        // ---- RECORD ----

        // The commanded position is where the tooltip will be at the next
        // step, so it fills the next row
        if let Some(ref mut corrected) = self.corrected {
            corrected
                .set_row(index + 1, input_data.time_s, &input_data.live_gates_m, x_new)
                .map_err(PathCtrlError::RecordError)?;
            self.num_recorded = self.num_recorded.max(index + 2);
        }

        Ok((OutputData { tooltip_dem_m: x_new }, self.report))
    }
}

impl Archived for PathCtrl {
    /// Write the status report of the last tick, if archiving was set up
    /// by `init`.
    fn write(&mut self) -> Result<(), ArchiveError> {
        if !self.arch_report.is_init() {
            return Ok(());
        }

        self.arch_report.serialise(self.report)
    }
}

impl PathCtrl {
    /// Create a new PathCtrl directly from parameters, without archiving.
    pub fn new(params: Params) -> Result<Self, PathCtrlError> {
        params.validate()?;

        Ok(Self {
            params,
            ..Default::default()
        })
    }

    /// Load a planned trajectory to follow.
    ///
    /// This detects the trajectory's segments, allocates the corrected copy
    /// and resets the correction state. Row 0 of the corrected copy is the
    /// planned start point.
    pub fn begin(&mut self, traj: Trajectory) {
        self.segments = traj::detect_segments(&traj);

        info!(
            "PathCtrl following {} samples past {} gates, segment ends: {:?}",
            traj.len(),
            traj.num_gates(),
            self.segments.iter().map(|s| s.end).collect::<Vec<_>>()
        );

        self.corrected = Some(traj.clone());
        self.planned = Some(traj);
        self.num_recorded = 1;
        self.correction = CorrectionState::default();
        self.report = StatusReport::default();
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn planned(&self) -> Option<&Trajectory> {
        self.planned.as_ref()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn correction_state(&self) -> CorrectionState {
        self.correction
    }

    /// Index of the final step of the loaded trajectory.
    pub fn last_index(&self) -> Option<usize> {
        self.planned.as_ref().map(|t| t.last_index())
    }

    /// Number of gates of the loaded trajectory.
    pub fn num_gates(&self) -> Option<usize> {
        self.planned.as_ref().map(|t| t.num_gates())
    }

    /// The corrected path recorded so far, from the start point up to the
    /// last commanded position.
    pub fn corrected_path(&self) -> Option<Trajectory> {
        self.corrected.as_ref().map(|t| t.head(self.num_recorded))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::traj::{test::line_trajectory, PathSample};

    const DT: f64 = 0.01;

    fn ctrl_with(max_accel_mss: f64, traj: Trajectory) -> PathCtrl {
        let mut ctrl = PathCtrl::new(Params { max_accel_mss }).unwrap();
        ctrl.begin(traj);
        ctrl
    }

    fn input(index: usize, live_gates_m: Vec<Vector3<f64>>) -> InputData {
        InputData {
            index,
            dt_s: DT,
            time_s: (index + 1) as f64 * DT,
            live_gates_m,
        }
    }

    #[test]
    fn test_params_validation() {
        assert!(matches!(
            PathCtrl::new(Params { max_accel_mss: 0.0 }),
            Err(PathCtrlError::InvalidMaxAccel(_))
        ));
        assert!(PathCtrl::new(Params { max_accel_mss: std::f64::NAN }).is_err());
        assert!(PathCtrl::new(Params { max_accel_mss: 2.0 }).is_ok());
    }

    #[test]
    fn test_proc_errors() {
        let mut ctrl = PathCtrl::new(Params { max_accel_mss: 1.0 }).unwrap();
        assert!(matches!(
            ctrl.proc(&input(0, vec![Vector3::zeros()])),
            Err(PathCtrlError::NoTrajectory)
        ));

        ctrl.begin(line_trajectory(3, &[Vector3::zeros()]));
        assert!(matches!(
            ctrl.proc(&input(2, vec![Vector3::zeros()])),
            Err(PathCtrlError::EndOfTrajectory { index: 2, last: 2 })
        ));
        assert!(matches!(
            ctrl.proc(&input(0, vec![])),
            Err(PathCtrlError::LiveGateCountMismatch { expected: 1, found: 0 })
        ));
    }

    #[test]
    fn test_no_drift_keeps_offset() {
        let gates = [Vector3::new(0.05, 0.01, 0.0), Vector3::new(0.15, -0.01, 0.0)];
        let traj = line_trajectory(20, &gates);
        let mut ctrl = ctrl_with(1e6, traj.clone());
        let initial = ctrl.correction_state().path_offset_m;

        for i in 0..traj.last_index() {
            // Live gates sit exactly where the corrected plan expects them
            let seg = *traj::active_segment(ctrl.segments(), i).unwrap();
            let offset = ctrl.correction_state().path_offset_m;
            let mut live = gates.to_vec();
            live[seg.gate_index] = traj.gate_position(seg.end, seg.gate_index).unwrap() + offset;

            let (_, report) = ctrl.proc(&input(i, live)).unwrap();

            assert!(report.gate_drift_m < 1e-12);
            assert!((ctrl.correction_state().path_offset_m - initial).norm() < 1e-12);
        }
    }

    #[test]
    fn test_static_gate_follows_reference() {
        let traj = line_trajectory(3, &[Vector3::zeros()]);
        let mut ctrl = ctrl_with(1e3, traj.clone());

        for i in 0..traj.last_index() {
            let (out, _) = ctrl.proc(&input(i, vec![Vector3::zeros()])).unwrap();
            assert!((out.tooltip_dem_m - traj.tooltip_position(i + 1).unwrap()).norm() < 1e-12);
        }

        let corrected = ctrl.corrected_path().unwrap();
        assert_eq!(corrected.len(), traj.len());
        for i in 0..traj.len() {
            let diff = corrected.tooltip_position(i).unwrap() - traj.tooltip_position(i).unwrap();
            assert!(diff.norm() < 1e-12);
        }
    }

    #[test]
    fn test_moved_gate_shifts_path() {
        let traj = line_trajectory(3, &[Vector3::zeros()]);
        let mut ctrl = ctrl_with(1e6, traj.clone());
        let shift = Vector3::new(0.1, 0.0, 0.0);

        for i in 0..traj.last_index() {
            ctrl.proc(&input(i, vec![shift])).unwrap();
        }

        // Both commanded rows are shifted by the gate movement
        let corrected = ctrl.corrected_path().unwrap();
        for i in 1..traj.len() {
            let diff = corrected.tooltip_position(i).unwrap() - traj.tooltip_position(i).unwrap();
            assert!((diff - shift).norm() < 1e-9);
        }
        assert!((ctrl.correction_state().path_offset_m - shift).norm() < 1e-9);

        // Live gate positions are recorded too
        assert_eq!(corrected.gate_position(2, 0), Some(shift));
    }

    #[test]
    fn test_moved_gate_respects_accel_limit() {
        let max_accel = 50.0;
        let traj = line_trajectory(40, &[Vector3::zeros()]);
        let mut ctrl = ctrl_with(max_accel, traj.clone());
        let shift = Vector3::new(0.1, 0.0, 0.0);

        let mut prev_velocity = ctrl.correction_state().velocity_ms;
        for i in 0..traj.last_index() {
            let (_, report) = ctrl.proc(&input(i, vec![shift])).unwrap();
            let velocity = ctrl.correction_state().velocity_ms;

            // Velocity changes by at most a_max * dt per tick, so is bounded by
            // the accumulated change
            assert!((velocity - prev_velocity).norm() <= max_accel * DT + 1e-9);
            assert!(velocity.norm() <= (i + 1) as f64 * max_accel * DT + 1e-9);

            if i == 0 {
                assert!(report.accel_limited);
            }
            prev_velocity = velocity;
        }

        // The first tick cannot apply the whole shift
        let corrected = ctrl.corrected_path().unwrap();
        let first_shift = corrected.tooltip_position(1).unwrap() - traj.tooltip_position(1).unwrap();
        assert!(first_shift.x < shift.x);
    }

    #[test]
    fn test_zero_accel_tick() {
        let samples = (0..3)
            .map(|i| PathSample {
                time_s: i as f64,
                gate_positions_m: vec![Vector3::new(0.0, 0.1, 0.0)],
                tooltip_position_m: Vector3::new(0.2, 0.2, 0.2),
            })
            .collect();
        let mut ctrl = ctrl_with(1.0, Trajectory::new(samples).unwrap());

        let (out, report) = ctrl.proc(&input(0, vec![Vector3::new(0.0, 0.1, 0.0)])).unwrap();

        assert_eq!(report.accel_dem_mss, 0.0);
        assert!(!report.accel_limited);
        assert_eq!(ctrl.correction_state().velocity_ms, Vector3::zeros());
        assert_eq!(out.tooltip_dem_m, Vector3::new(0.2, 0.2, 0.2));
    }

    #[test]
    fn test_degenerate_dt() {
        let traj = line_trajectory(3, &[Vector3::zeros()]);
        let mut ctrl = ctrl_with(1.0, traj.clone());

        let mut inp = input(0, vec![Vector3::new(0.5, 0.0, 0.0)]);
        inp.dt_s = 0.0;

        let (out, report) = ctrl.proc(&inp).unwrap();

        assert!(report.degenerate_dt);
        assert_eq!(out.tooltip_dem_m, traj.tooltip_position(1).unwrap());
        assert_eq!(ctrl.correction_state(), CorrectionState::default());
    }

    #[test]
    fn test_corrected_path_grows_per_tick() {
        let traj = line_trajectory(5, &[Vector3::zeros()]);
        let mut ctrl = ctrl_with(1e3, traj);

        assert_eq!(ctrl.corrected_path().unwrap().len(), 1);
        ctrl.proc(&input(0, vec![Vector3::zeros()])).unwrap();
        ctrl.proc(&input(1, vec![Vector3::zeros()])).unwrap();

        let corrected = ctrl.corrected_path().unwrap();
        assert_eq!(corrected.len(), 3);
        assert_eq!(corrected.sample(2).unwrap().time_s, 2.0 * DT);
    }

    #[test]
    fn test_write_without_archive() {
        let mut ctrl = ctrl_with(1.0, line_trajectory(2, &[Vector3::zeros()]));
        assert!(ctrl.write().is_ok());
    }
}
