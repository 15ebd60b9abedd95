//! Trajectory interpolation executable entry point.
//!
//! # Usage
//!
//! ```text
//! traj_exec <cycles.json>
//! ```
//!
//! The input file contains a JSON array of cycle inputs (raw trajectory, odometry and
//! acceleration). Each cycle is processed in order by the interpolation manager and the output
//! and status report of cycle `n` are saved into the session directory as
//! `outputs/cycle_<n>.json`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::env;
use std::fs::File;
use std::io::BufReader;

// Internal
use comms_if::msg::{CycleInput, Trajectory};
use traj_lib::interp_mgr::{StatusReport, TrajInterpMgr};
use util::{
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Name of the parameter file, relative to the parameters directory
const PARAMS_FILE: &str = "traj_interp.toml";

/// Per-module log levels, overriding the main level
const MODULE_LOG_LEVELS: &[(&str, LevelFilter)] = &[
    ("traj_lib::interp::sanitise", LevelFilter::Info),
    ("traj_lib::interp::spline", LevelFilter::Info),
];

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Everything saved for one cycle.
#[derive(Serialize)]
struct CycleRecord {
    cycle: usize,
    output: Option<Trajectory>,
    report: StatusReport,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("traj_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, MODULE_LOG_LEVELS, &session)
        .wrap_err("Failed to initialise logging")?;

    info!("Trajectory Interpolation Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD INPUTS ----

    let args: Vec<String> = env::args().collect();
    debug!("CLI arguments: {:?}", args);

    if args.len() != 2 {
        return Err(eyre!(
            "Expected one argument (the cycle input file), found {}",
            args.len() - 1
        ));
    }

    let file = File::open(&args[1])
        .wrap_err_with(|| format!("Could not open the cycle input file {:?}", &args[1]))?;
    let cycles: Vec<CycleInput> = serde_json::from_reader(BufReader::new(file))
        .wrap_err("Could not parse the cycle input file")?;

    info!("Loaded {} cycles from {:?}", cycles.len(), &args[1]);

    // ---- INITIALISE MODULES ----

    let mut mgr = TrajInterpMgr::init(PARAMS_FILE, Some(&session))
        .wrap_err("Failed to initialise TrajInterpMgr")?;
    info!("TrajInterpMgr init complete\n");

    // ---- MAIN LOOP ----

    let mut num_outputs = 0;

    for (cycle, input) in cycles.into_iter().enumerate() {
        let (output, report) = match mgr.proc(&input) {
            Ok(r) => r,
            Err(e) => {
                error!("Cycle {}: {}", cycle, e);
                continue;
            }
        };

        match output {
            Some(ref traj) => {
                num_outputs += 1;
                debug!("Cycle {}: output {} points", cycle, traj.len());
            }
            None => warn!("Cycle {}: no valid trajectory", cycle),
        }

        session.save(
            format!("outputs/cycle_{:04}.json", cycle),
            CycleRecord {
                cycle,
                output,
                report,
            },
        );
    }

    info!("Produced {} outputs", num_outputs);

    session.exit();

    Ok(())
}
