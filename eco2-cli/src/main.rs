//! eco2 - pair with Eco2 thermostats and keep their state in a local registry

mod output;

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use eco2_core::{ErrorKind, Registry, SyncError};

#[derive(clap::Parser)]
#[command(name = "eco2")]
#[command(about = "Pair with and read Eco2 Bluetooth thermostats")]
struct Cli {
    /// Directory holding the registry
    #[arg(long, global = true, env = "ECO2_HOME")]
    home: Option<PathBuf>,

    /// Registry file, overrides the one inside the home directory
    #[arg(long, global = true)]
    registry: Option<PathBuf>,

    /// More log output (-v debug, -vv trace). RUST_LOG wins when set.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Scan for nearby thermostats
    Scan {
        /// Scan duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Connect to a thermostat, read its state and save it
    ///
    /// The first read needs the timer button on the thermostat to be pushed
    /// right before running this command.
    Read {
        serial: String,
        /// Seconds to scan before giving up on finding the thermostat
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// List the thermostats in the registry
    List {
        #[arg(long)]
        json: bool,
    },
    /// Show everything stored for one thermostat
    Show {
        serial: String,
        #[arg(long)]
        json: bool,
    },
    /// Remove a thermostat, including its secret key, from the registry
    Forget { serial: String },
    /// Stage a new set-point temperature in degrees Celsius
    SetTemperature { serial: String, degrees: f64 },
    /// Stage a vacation period (RFC 3339 timestamps)
    SetVacation {
        serial: String,
        #[arg(long, value_parser = parse_time)]
        from: DateTime<FixedOffset>,
        #[arg(long, value_parser = parse_time)]
        to: DateTime<FixedOffset>,
    },
    /// Drop a staged vacation period
    CancelVacation { serial: String },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Home(#[from] eco2_core::HomeError),
    #[error(transparent)]
    Registry(#[from] eco2_core::RegistryError),
    #[error(transparent)]
    Bluetooth(#[from] eco2_core::AccessorError),
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Command(#[from] eco2_core::CommandError),
    #[error("failed to serialize json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no thermostat with serial {0}")]
    UnknownThermostat(String),
}

fn parse_time(s: &str) -> Result<DateTime<FixedOffset>, String> {
    DateTime::parse_from_rfc3339(s).map_err(|e| format!("expected RFC 3339 timestamp: {e}"))
}

#[tokio::main]
async fn main() {
    let cli: Cli = clap::Parser::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => {}
        Err(e) => {
            report(&e);
            std::process::exit(1);
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn registry_path(cli: &Cli) -> Result<PathBuf, CliError> {
    if let Some(path) = &cli.registry {
        return Ok(path.clone());
    }
    let home = match &cli.home {
        Some(home) => home.clone(),
        None => eco2_core::eco2_home()?,
    };
    eco2_core::ensure_home(&home)?;
    Ok(eco2_core::registry_path(&home))
}

async fn run(cli: Cli) -> Result<(), CliError> {
    if let Commands::Scan { duration } = &cli.command {
        let adapter = eco2_ble::get_adapter().await?;
        eprintln!("Scanning for thermostats ({duration} seconds)...");
        let found = eco2_ble::scan(&adapter, Duration::from_secs(*duration)).await?;
        output::print_scan(&found);
        return Ok(());
    }

    let mut registry = Registry::load(registry_path(&cli)?)?;

    match cli.command {
        Commands::Scan { .. } => {}
        Commands::Read { serial, duration } => {
            let mut accessor = eco2_ble::BtleAccessor::new()
                .await?
                .scan_duration(Duration::from_secs(duration));
            let report = eco2_core::read_thermostat(&mut accessor, &mut registry, &serial).await?;
            output::print_report(&report);
            eprintln!("Done");
        }
        Commands::List { json } => {
            if json {
                let all: Vec<_> = registry.iter().collect();
                println!("{}", serde_json::to_string_pretty(&all)?);
            } else {
                output::print_list(&registry);
            }
        }
        Commands::Show { serial, json } => {
            let thermostat = registry
                .get(&serial)
                .ok_or(CliError::UnknownThermostat(serial))?;
            if json {
                println!("{}", serde_json::to_string_pretty(thermostat)?);
            } else {
                output::print_thermostat(thermostat);
            }
        }
        Commands::Forget { serial } => {
            if eco2_core::forget(&mut registry, &serial)? {
                eprintln!("Forgot {serial}");
            } else {
                return Err(CliError::UnknownThermostat(serial));
            }
        }
        Commands::SetTemperature { serial, degrees } => {
            eco2_core::set_temperature(&mut registry, &serial, degrees)?;
            eprintln!("Staged set-point {degrees}°C for {serial}");
        }
        Commands::SetVacation { serial, from, to } => {
            eco2_core::set_vacation(&mut registry, &serial, from, to)?;
            eprintln!("Staged vacation {from} - {to} for {serial}");
        }
        Commands::CancelVacation { serial } => {
            eco2_core::cancel_vacation(&mut registry, &serial)?;
            eprintln!("Cancelled vacation for {serial}");
        }
    }

    Ok(())
}

fn report(e: &CliError) {
    let CliError::Sync(sync) = e else {
        eprintln!("error: {e}");
        return;
    };

    match (sync.kind(), sync) {
        (ErrorKind::AuthenticationRequired, _) => {
            eprintln!("You need to push the timer button on the thermostat");
        }
        (_, SyncError::Persistence { thermostat, source }) => {
            eprintln!(
                "error: the thermostat was read but the registry could not be saved: {source}"
            );
            eprintln!("Keep these values, they are not stored anywhere else:");
            eprintln!("  serial:     {}", thermostat.serial);
            eprintln!("  uuid:       {}", thermostat.uuid.as_deref().unwrap_or("-"));
            eprintln!(
                "  secret key: {}",
                thermostat.secret_key.as_deref().unwrap_or("-")
            );
        }
        (ErrorKind::Compatibility, _) => {
            eprintln!("error: {sync}");
            eprintln!("This does not look like an Eco2 thermostat.");
        }
        _ => eprintln!("error: {sync}"),
    }
}
