//! # Real-time scheduler
//!
//! Drives the world and the path corrector at a fixed wall-clock rate.
//!
//! Each tick is given a nominal period of `1/fps`. When a tick takes longer
//! than its period the excess is carried into the next tick as overshoot: the
//! world is stepped by `dt + overshoot` so that simulated time catches up with
//! wall time. Virtual time is never rewound, only sped up. A tick completing
//! within its period sleeps for the remaining slack and resets the overshoot.
//!
//! The loop ends when a stop is requested or the world goes away. The
//! corrected path is persisted exactly once, either when the final step of
//! the trajectory is reached or, failing that, when the loop ends.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, error, info, warn};
use serde::Serialize;
use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

// Internal
use crate::{
    path_ctrl::{self, PathCtrl},
    traj::{io, TrajError, Trajectory},
    world::{gate_positions, World, WorldError, POINTER_GROUP},
};
use util::{archive::Archived, module::State};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Destination of the corrected path at the end of a run.
pub trait PathSink {
    fn persist(&mut self, traj: &Trajectory) -> Result<(), TrajError>;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Tick pacing with overshoot carry.
#[derive(Debug, Clone)]
pub struct Pacer {
    period: Duration,
    overshoot: Duration,
    num_consec_overruns: u64,
    max_consec_overruns: u64,
}

/// Flags shared with whoever controls the run, for instance a signal
/// handler.
#[derive(Debug, Clone, Default)]
pub struct RunFlags {
    stop: Arc<AtomicBool>,
    pause: Arc<AtomicBool>,
}

/// Writes the path as CSV to a fixed file.
#[derive(Debug, Clone)]
pub struct CsvPathSink {
    path: PathBuf,
}

/// The real-time loop.
pub struct RtScheduler {
    pacer: Pacer,

    /// Virtual time before which the world is held paused.
    ///
    /// Units: seconds
    start_hold_s: f64,

    /// Write the path corrector status report each tracking tick
    archive_status: bool,
}

/// Summary of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Total number of ticks, paused or not
    pub num_ticks: u64,

    /// Number of ticks in which the path corrector ran
    pub num_tracking_ticks: u64,

    /// Trajectory step reached
    pub final_index: usize,

    /// Virtual time reached.
    ///
    /// Units: seconds
    pub time_s: f64,

    pub stop_reason: StopReason,

    /// True if the corrected path was persisted successfully
    pub persisted: bool,

    /// Longest run of consecutive overrunning ticks
    pub max_consec_overruns: u64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Why the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopReason {
    /// The stop flag was raised
    StopRequested,

    /// The world reported itself closed
    WorldClosed,

    /// A world call failed
    WorldError,

    /// The path corrector failed
    CorrectionError,
}

#[derive(Debug, thiserror::Error)]
pub enum SchedError {
    #[error("The loop rate must be positive and finite, found {0} Hz")]
    InvalidFps(f64),

    #[error("The start hold must be finite and not negative, found {0} s")]
    InvalidStartHold(f64),

    #[error("No trajectory has been loaded into the path corrector")]
    NoTrajectory,

    #[error("The world's gates do not match the trajectory: {0}")]
    GateLayout(WorldError),

    #[error("Could not place the pointer at the start of the trajectory: {0}")]
    Placement(WorldError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pacer {
    pub fn new(fps: f64) -> Result<Self, SchedError> {
        if !(fps.is_finite() && fps > 0.0) {
            return Err(SchedError::InvalidFps(fps));
        }

        let period =
            Duration::try_from_secs_f64(1.0 / fps).map_err(|_| SchedError::InvalidFps(fps))?;

        Ok(Self {
            period,
            overshoot: Duration::from_secs(0),
            num_consec_overruns: 0,
            max_consec_overruns: 0,
        })
    }

    /// Nominal tick period.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Overrun of the previous tick, carried into this one.
    pub fn overshoot(&self) -> Duration {
        self.overshoot
    }

    /// Step duration for this tick, the nominal period plus any overshoot.
    pub fn warped_dt_s(&self) -> f64 {
        (self.period + self.overshoot).as_secs_f64()
    }

    pub fn num_consec_overruns(&self) -> u64 {
        self.num_consec_overruns
    }

    pub fn max_consec_overruns(&self) -> u64 {
        self.max_consec_overruns
    }

    /// End a tick which took `elapsed` of wall time.
    ///
    /// Returns the slack to sleep for if the tick was within its period,
    /// otherwise stores the excess as the next tick's overshoot and returns
    /// `None`.
    pub fn end_tick(&mut self, elapsed: Duration) -> Option<Duration> {
        match self.period.checked_sub(elapsed) {
            Some(slack) => {
                self.overshoot = Duration::from_secs(0);
                self.num_consec_overruns = 0;
                Some(slack)
            }
            None => {
                self.overshoot = elapsed - self.period;
                self.num_consec_overruns += 1;
                self.max_consec_overruns = self.max_consec_overruns.max(self.num_consec_overruns);
                None
            }
        }
    }
}

impl RunFlags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the stop flag, for use in a signal handler.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    pub fn set_paused(&self, paused: bool) {
        self.pause.store(paused, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.pause.load(Ordering::SeqCst)
    }
}

impl CsvPathSink {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

impl PathSink for CsvPathSink {
    fn persist(&mut self, traj: &Trajectory) -> Result<(), TrajError> {
        io::save(traj, &self.path)
    }
}

impl RtScheduler {
    pub fn new(fps: f64, start_hold_s: f64, archive_status: bool) -> Result<Self, SchedError> {
        if !(start_hold_s.is_finite() && start_hold_s >= 0.0) {
            return Err(SchedError::InvalidStartHold(start_hold_s));
        }

        Ok(Self {
            pacer: Pacer::new(fps)?,
            start_hold_s,
            archive_status,
        })
    }

    pub fn pacer(&self) -> &Pacer {
        &self.pacer
    }

    /// Run the loop until a stop is requested or the world goes away.
    ///
    /// The path corrector must already hold the trajectory to follow. Before
    /// the loop starts the world's gates are checked against the trajectory
    /// and the pointer is placed at the trajectory's first tooltip position.
    pub fn run<W, S>(
        &mut self,
        world: &mut W,
        ctrl: &mut PathCtrl,
        sink: &mut S,
        flags: &RunFlags,
    ) -> Result<RunSummary, SchedError>
    where
        W: World + ?Sized,
        S: PathSink + ?Sized,
    {
        // ---- PRE-LOOP CHECKS ----

        let (last_index, num_gates, start_m) = match ctrl.planned() {
            Some(p) => (p.last_index(), p.num_gates(), p.samples()[0].tooltip_position_m),
            None => return Err(SchedError::NoTrajectory),
        };

        gate_positions(world, num_gates).map_err(SchedError::GateLayout)?;

        world
            .set_group_position(POINTER_GROUP, start_m)
            .map_err(SchedError::Placement)?;

        info!(
            "Starting real-time loop at {:.01} Hz over {} steps, holding for {:.03} s",
            1.0 / self.pacer.period().as_secs_f64(),
            last_index,
            self.start_hold_s
        );

        // ---- MAIN LOOP ----

        let mut index = 0usize;
        let mut time_s = 0.0;
        let mut num_ticks = 0u64;
        let mut num_tracking_ticks = 0u64;
        let mut persisted: Option<bool> = None;

        let stop_reason = loop {
            let tick_start = Instant::now();

            if flags.stop_requested() {
                info!("Stop requested");
                break StopReason::StopRequested;
            }

            if !world.is_alive() {
                warn!("World closed at step {}", index);
                break StopReason::WorldClosed;
            }

            let dt_warped_s = self.pacer.warped_dt_s();
            world.set_dt(dt_warped_s);

            let step_result = if index >= last_index {
                if persisted.is_none() {
                    info!("Final step reached at {:.03} s", time_s);
                    persisted = Some(persist(ctrl, sink));
                }
                world.step(true)
            }
            else if flags.is_paused() {
                world.step(true)
            }
            else if time_s < self.start_hold_s {
                let r = world.step(true);
                time_s += dt_warped_s;
                if time_s >= self.start_hold_s {
                    info!("Start hold complete, tracking");
                }
                r
            }
            else {
                let input = path_ctrl::InputData {
                    index,
                    dt_s: dt_warped_s,
                    time_s: time_s + dt_warped_s,
                    live_gates_m: match gate_positions(world, num_gates) {
                        Ok(g) => g,
                        Err(e) => {
                            error!("Could not read the live gate positions: {}", e);
                            break StopReason::WorldError;
                        }
                    },
                };

                let output = match ctrl.proc(&input) {
                    Ok((o, _)) => o,
                    Err(e) => {
                        error!("Path correction failed at step {}: {}", index, e);
                        break StopReason::CorrectionError;
                    }
                };

                if self.archive_status {
                    if let Err(e) = ctrl.write() {
                        warn!("Could not archive the path corrector status: {}", e);
                    }
                }

                match world.set_group_position(POINTER_GROUP, output.tooltip_dem_m) {
                    Ok(()) => {
                        time_s += dt_warped_s;
                        index += 1;
                        num_tracking_ticks += 1;
                        world.step(false)
                    }
                    Err(e) => Err(e),
                }
            };

            if let Err(e) = step_result {
                error!("World step failed at step {}: {}", index, e);
                break StopReason::WorldError;
            }

            // ---- TICK MANAGEMENT ----

            num_ticks += 1;

            let elapsed = tick_start.elapsed();
            match self.pacer.end_tick(elapsed) {
                Some(slack) => thread::sleep(slack),
                None => warn!(
                    "Tick overran by {:.06} s ({} consecutive)",
                    self.pacer.overshoot().as_secs_f64(),
                    self.pacer.num_consec_overruns()
                ),
            }
        };

        // ---- SHUTDOWN ----

        let persisted = match persisted {
            Some(p) => p,
            None => persist(ctrl, sink),
        };

        info!(
            "Real-time loop ended ({:?}) after {} ticks at step {} of {}, {:.03} s",
            stop_reason, num_ticks, index, last_index, time_s
        );

        Ok(RunSummary {
            num_ticks,
            num_tracking_ticks,
            final_index: index,
            time_s,
            stop_reason,
            persisted,
            max_consec_overruns: self.pacer.max_consec_overruns(),
        })
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Persist the corrected path recorded so far, returning true on success.
fn persist<S: PathSink + ?Sized>(ctrl: &PathCtrl, sink: &mut S) -> bool {
    let path = match ctrl.corrected_path() {
        Some(p) => p,
        None => return false,
    };

    match sink.persist(&path) {
        Ok(()) => {
            debug!("Corrected path of {} samples persisted", path.len());
            true
        }
        Err(e) => {
            error!("Could not persist the corrected path: {}", e);
            false
        }
    }
}
