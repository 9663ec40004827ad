// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use clap::{CommandFactory, Parser};
use common::position::Coordinate;
use gnss::PositionSource;
use gnss::simulated_source::{SimulatedPositionModule, SimulatedSourceConfig};
use module_core::{Event, EventBus, EventKind, Module};
use position_logger::PositionLogger;
use replay::{FixReplay, read_fixes};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod position_logger;
mod replay;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Latitude of a single fix to inject
    #[arg(
        long,
        allow_hyphen_values = true,
        requires = "longitude",
        conflicts_with = "positions_file"
    )]
    latitude: Option<f64>,
    /// Longitude of a single fix to inject
    #[arg(long, allow_hyphen_values = true, requires = "latitude")]
    longitude: Option<f64>,
    /// Altitude in meters of a single fix to inject
    #[arg(long, allow_hyphen_values = true, default_value_t = 0.0)]
    altitude: f64,
    /// CSV file with the columns latitude,longitude,altitude
    #[arg(short = 'f', long)]
    positions_file: Option<String>,
    /// Update interval of the simulated source in milliseconds
    #[arg(short, long, default_value_t = 1000, allow_hyphen_values = true)]
    interval_ms: i32,
    /// Replay the fixes in a loop until Ctrl-C
    #[arg(short, long)]
    repeat: bool,
    /// Re-publish the current fix every update interval
    #[arg(short, long)]
    periodic: bool,
}

fn load_fixes(cli: &Cli) -> Result<Vec<Coordinate>, ()> {
    if let Some(file_path) = &cli.positions_file {
        let file = std::fs::File::open(file_path)
            .map_err(|e| error!("Failed to open {}. Error: {}", file_path, e))?;
        return read_fixes(file).map_err(|e| error!("Failed to read {}. Error: {}", file_path, e));
    }
    if let (Some(latitude), Some(longitude)) = (cli.latitude, cli.longitude) {
        let fix = Coordinate::new(latitude, longitude, cli.altitude);
        if !fix.is_valid() {
            error!("Fix {:?} is out of range", fix);
            return Err(());
        }
        return Ok(vec![fix]);
    }
    error!("No fix specified. Use --positions-file or --latitude/--longitude");
    let _ = Cli::command().print_help();
    Err(())
}

#[tokio::main]
async fn main() -> Result<(), ()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let fixes = load_fixes(&cli)?;
    let eb = EventBus::default();
    let mut simulator = SimulatedPositionModule::new(
        eb.context(),
        SimulatedSourceConfig {
            periodic_updates: cli.periodic,
        },
    );
    let source = simulator.source();
    source.set_update_interval(cli.interval_ms);
    if source.update_interval() != cli.interval_ms {
        info!(
            "Update interval {}ms is below the minimum, using {}ms",
            cli.interval_ms,
            source.update_interval()
        );
    }
    source.start_updates();

    let mut logger = PositionLogger::new(eb.context());
    let mut replay = FixReplay::new(eb.context(), source, fixes, cli.repeat, cli.periodic);

    let quit_sender = eb.context().sender;
    ctrlc::set_handler(move || {
        let _ = quit_sender.send(Event {
            kind: EventKind::QuitEvent,
        });
    })
    .map_err(|e| error!("Failed to install Ctrl-C handler. Error: {}", e))?;

    info!("Starting simulation...");
    let (simulator_result, logger_result, replay_result) =
        tokio::join!(simulator.run(), logger.run(), replay.run());
    simulator_result.and(logger_result).and(replay_result)
}
