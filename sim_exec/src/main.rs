//! Main simulation executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise the session, logging and parameters
//!     - Build the world and read the gate reference layout from it
//!     - Obtain the planned trajectory, either from the planner or from a file
//!     - Real-time loop (see `rt_sched`):
//!         - Start hold
//!         - Path correction against the live gate positions
//!         - World stepping with overshoot carry
//!     - Persist the corrected path and the end-of-run analysis
//!
//! # Usage
//!
//!     sim_exec [planned_path.csv]
//!
//! With no argument the path is planned through the world's gates. With one
//! argument the planned trajectory is loaded from that file.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, info, warn};
use std::{env, sync::atomic::Ordering};

// Internal
use sim_lib::{
    analysis::{self, AnalysisReport},
    params::SimExecParams,
    path_ctrl::PathCtrl,
    planner::{self, WaypointPlanner},
    rt_sched::{CsvPathSink, RtScheduler, RunFlags, StopReason},
    traj::{self, Trajectory},
    world::{self, KinematicWorld, World, TOOLTIP_BODY},
};
use util::{
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session,
};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("sim_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Info, &session).wrap_err("Failed to initialise logging")?;

    info!("Surgical Sim Path Execution\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let exec_params: SimExecParams =
        util::params::load("sim_exec.toml").wrap_err("Could not load sim_exec params")?;

    let world_params: world::Params =
        util::params::load("world.toml").wrap_err("Could not load world params")?;

    info!("Exec parameters loaded");

    let args: Vec<String> = env::args().collect();
    debug!("CLI arguments: {:?}", args);

    if args.len() > 2 {
        return Err(eyre!(
            "Expected either zero or one argument, found {}",
            args.len() - 1
        ));
    }

    // ---- INITIALISE WORLD ----

    let mut world = KinematicWorld::new(&world_params);

    let num_gates = world_params.gate_positions_m.len();
    let gate_layout_m = world::gate_positions(&world, num_gates)
        .wrap_err("Could not read the gate reference layout from the world")?;
    let start_m = world
        .body_position(TOOLTIP_BODY)
        .wrap_err("Could not read the tooltip position from the world")?;

    // ---- PLANNED TRAJECTORY ----

    let planned: Trajectory = if args.len() == 2 {
        info!("Loading planned trajectory from \"{}\"", &args[1]);

        traj::io::load(&args[1]).wrap_err("Failed to load the planned trajectory")?
    }
    else {
        info!("No trajectory provided, planning through the world's gates");

        let mut waypoint_planner = WaypointPlanner::new(gate_layout_m.clone());
        planner::plan_trajectory(
            &mut waypoint_planner,
            &start_m,
            &gate_layout_m,
            exec_params.num_planned_samples(),
        )
        .wrap_err("Failed to plan a trajectory")?
    };

    if planned.num_gates() != num_gates {
        return Err(eyre!(
            "The planned trajectory has {} gates but the world has {}",
            planned.num_gates(),
            num_gates
        ));
    }

    traj::io::save(
        &planned,
        session.session_root.join(&exec_params.planned_path_file),
    )
    .wrap_err("Failed to save the planned trajectory")?;

    info!("Planned trajectory of {} samples saved", planned.len());

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let mut path_ctrl = PathCtrl::default();
    path_ctrl
        .init("path_ctrl.toml", &session)
        .wrap_err("Failed to initialise PathCtrl")?;
    path_ctrl.begin(planned.clone());
    info!("PathCtrl init complete");

    let mut sched = RtScheduler::new(
        exec_params.fps,
        exec_params.start_hold_s,
        exec_params.archive_status,
    )
    .wrap_err("Failed to initialise the real-time scheduler")?;

    let mut sink = CsvPathSink::new(session.session_root.join(&exec_params.corrected_path_file));

    info!("Module initialisation complete\n");

    // ---- STOP SIGNAL ----

    let flags = RunFlags::new();
    let stop = flags.stop_handle();
    ctrlc::set_handler(move || {
        stop.store(true, Ordering::SeqCst);
    })
    .wrap_err("Failed to set the interrupt handler")?;

    // ---- MAIN LOOP ----

    info!("Beginning main loop\n");

    let summary = sched
        .run(&mut world, &mut path_ctrl, &mut sink, &flags)
        .wrap_err("The real-time loop could not start")?;

    match summary.stop_reason {
        StopReason::StopRequested | StopReason::WorldClosed => (),
        r => warn!("Real-time loop ended abnormally: {:?}", r),
    }

    if !summary.persisted {
        warn!("The corrected trajectory was not saved");
    }

    // ---- ANALYSIS ----

    let nominal_dt_s = sched.pacer().period().as_secs_f64();

    if let Some(corrected) = path_ctrl.corrected_path() {
        let report = AnalysisReport {
            planned: analysis::path_metrics(&planned, nominal_dt_s),
            corrected: analysis::path_metrics(&corrected, nominal_dt_s),
        };

        info!(
            "Closest approach per gate (m): planned {:.04?}, corrected {:.04?}",
            report.planned.closest_approach_m, report.corrected.closest_approach_m
        );
        info!(
            "Peak acceleration (m/s^2): planned {:?}, corrected {:?}",
            report.planned.peak_accel_mss, report.corrected.peak_accel_mss
        );

        session.save("analysis.json", report);
    }

    session.save("run_summary.json", summary);

    // ---- SHUTDOWN ----

    session.exit();

    info!("End of execution");

    Ok(())
}
