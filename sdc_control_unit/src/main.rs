//! # SDC Control Unit
//!
//! Demo binary: loads the controller configuration, builds the
//! simulation transport, and runs the polling loop until Ctrl-C,
//! logging operating-state changes and diagnostic messages.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use sdc_control_unit::config::load_config;
use sdc_control_unit::controller::Controller;
use sdc_control_unit::transport::SimTransport;
use sdc_common::event::{ControllerEvent, Severity};
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

/// SDC Control Unit — multi-axis servo-drive control core
#[derive(Parser, Debug)]
#[command(name = "sdc_control_unit")]
#[command(version)]
#[command(about = "Polling-cycle control core for multi-axis servo drives")]
struct Args {
    /// Path to the controller configuration TOML.
    #[arg(default_value = "config/sdc.toml")]
    config: PathBuf,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    setup_tracing(&args);

    info!("SDC Control Unit v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&args) {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("SDC Control Unit shutdown complete");
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&args.config)?;
    info!(
        "Config OK: poll_period={}µs, axes={}",
        config.poll_period_us,
        config.axis_count(),
    );

    let nodes: Vec<u8> = config.axes.iter().map(|ax| ax.node_id).collect();
    let transport = SimTransport::new(&nodes);

    let controller = Controller::start(config, transport)?;
    let events = controller.subscribe();

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })?;

    while running.load(Ordering::SeqCst) {
        while let Ok(event) = events.try_recv() {
            match event {
                ControllerEvent::OperatingStateChanged { previous, current } => {
                    info!(
                        "operating state: {:?} -> {:?} (homed: {})",
                        previous.system_mode, current.system_mode, current.is_homed
                    );
                }
                ControllerEvent::Message { severity, text } => match severity {
                    Severity::Status => info!("{text}"),
                    Severity::Warning => warn!("{text}"),
                    Severity::Error => error!("{text}"),
                },
            }
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    controller.shutdown();
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments.
fn setup_tracing(args: &Args) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
