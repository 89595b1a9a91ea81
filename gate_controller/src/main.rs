//! # Gate Controller Binary
//!
//! Access controller: grants or denies scanned credentials, enrolls and
//! removes them under a master credential, and wipes the registry on a held
//! wipe control.
//!
//! # Usage
//!
//! ```bash
//! # Run with the simulation driver
//! gate_controller --config config/controller.toml --simulate
//!
//! # Run for ten seconds with verbose logging
//! gate_controller -c config/controller.toml -s -v --duration-ms 10000
//!
//! # Print the stored registry and exit
//! gate_controller -c config/controller.toml --inspect --json
//! ```

use clap::Parser;
use gate_common::config::{ConfigError, ConfigLoader};
use gate_common::consts::DEFAULT_CONFIG_PATH;
use gate_common::hal::config::ControllerConfig;
use gate_controller::{
    ControllerCore, CredentialRegistry, DriverInfo, DriverRegistry, RegistrySnapshot,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Gate Controller - credential registry and access control loop
#[derive(Parser, Debug)]
#[command(name = "gate_controller")]
#[command(version)]
#[command(about = "Access controller with persistent credential registry")]
#[command(long_about = None)]
struct Args {
    /// Path to controller configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Driver to load (overrides `driver` in the config file)
    #[arg(short, long)]
    driver: Option<String>,

    /// Force simulation driver
    #[arg(short = 's', long)]
    simulate: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs (and --inspect) in JSON format
    #[arg(long)]
    json: bool,

    /// Print the stored registry and exit
    #[arg(long)]
    inspect: bool,

    /// Stop the control loop after this many milliseconds
    #[arg(long, value_name = "MS")]
    duration_ms: Option<u64>,
}

fn main() {
    if let Err(e) = run() {
        error!("Controller failed: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let loaded = load_config(&args);
    let default_level = loaded
        .as_ref()
        .map_or(Level::INFO, |c| c.shared.log_level.into());
    setup_tracing(&args, default_level);

    let mut config = loaded?;
    info!("Gate Controller v{} starting...", env!("CARGO_PKG_VERSION"));

    if args.simulate {
        info!("Simulation mode enabled");
        config.driver = "simulation".to_string();
    } else if let Some(driver) = &args.driver {
        config.driver = driver.clone();
    }
    config.validate()?;

    let drivers = DriverRegistry::with_builtin();
    let (mut driver, peripherals) = drivers.open(&config)?;

    if args.inspect {
        let registry = CredentialRegistry::open(peripherals.store)?;
        let report = InspectReport {
            drivers: drivers.describe(&config.driver),
            registry: registry.snapshot()?,
        };
        print_report(&report, args.json)?;
        driver.shutdown()?;
        return Ok(());
    }

    let mut core = ControllerCore::new(config, peripherals)?;

    let running = core.running_flag();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        running.store(false, Ordering::SeqCst);
    })?;

    let result = core.run(args.duration_ms.map(Duration::from_millis));
    core.shutdown();
    driver.shutdown()?;
    result?;

    info!("Gate Controller shutdown complete");
    Ok(())
}

/// Load the config file, falling back to defaults in simulation mode.
fn load_config(args: &Args) -> Result<ControllerConfig, ConfigError> {
    match ControllerConfig::load(&args.config) {
        Err(ConfigError::FileNotFound) if args.simulate => {
            // Tracing is not initialized yet.
            eprintln!(
                "Config {} not found, using simulation defaults",
                args.config.display()
            );
            Ok(ControllerConfig::default())
        }
        other => other,
    }
}

/// Output of `--inspect`.
#[derive(Serialize)]
struct InspectReport {
    drivers: Vec<DriverInfo>,
    registry: RegistrySnapshot,
}

/// Print the available drivers and the registry contents.
fn print_report(report: &InspectReport, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    for info in &report.drivers {
        let marker = if info.active { "*" } else { " " };
        println!("Driver: {marker} {} v{}", info.name, info.version);
    }

    let snapshot = &report.registry;
    match snapshot.master {
        Some(master) if snapshot.provisioned => println!("Master:   {master}"),
        _ => println!("Master:   (not defined)"),
    }
    println!("Slots:    {} / {}", snapshot.slots.len(), snapshot.capacity);
    for (index, id) in snapshot.slots.iter().enumerate() {
        println!("  {:>3}  {id}", index + 1);
    }
    if !snapshot.provisioned && !snapshot.slots.is_empty() {
        warn!("Store holds enrolled credentials but no master");
    }
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments.
fn setup_tracing(args: &Args, default_level: Level) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        default_level
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json && !args.inspect {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
