//! coax-sim - frequency sweeps and packet propagation through coaxial
//! photonic crystals.
//!
//! # Commands
//!
//! - `coax-sim sweep` - transmission, reflection and dispersion as CSV
//! - `coax-sim layout` - print the layer sequence of a configuration
//! - `coax-sim pulse` - time a Gaussian packet through the stack
//!
//! Without `--config` the reference crystal is used: twelve RG59U/RG58U
//! periods of 5 m sections between 50 Ω terminations.

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use coax_core::constants::SPEED_OF_LIGHT;
use coax_core::pulse::{propagate, GaussianPacket};
use coax_core::{io::write_sweep_csv, SimConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "coax-sim")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sweep the stack and write the response as CSV
    Sweep {
        /// TOML model description
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// CSV destination (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the layer sequence and total length
    Layout {
        /// TOML model description
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Propagate a Gaussian packet and report its group velocity
    Pulse {
        /// Carrier frequency in MHz
        #[arg(long)]
        carrier_mhz: f64,

        /// Envelope standard deviation in µs
        #[arg(long, default_value = "4.0")]
        width_us: f64,

        /// TOML model description
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .without_time()
        .init();
}

fn load_config(path: Option<&Path>) -> coax_core::Result<SimConfig> {
    match path {
        Some(path) => SimConfig::load(path),
        None => Ok(SimConfig::default()),
    }
}

fn sweep(config: Option<&Path>, output: Option<&Path>) -> coax_core::Result<()> {
    let config = load_config(config)?;
    let result = coax_core::compute(&config)?;

    let insertion_loss = result.sweep.insertion_loss_db();
    let (min_loss_db, max_loss_db) = insertion_loss
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &l| (lo.min(l), hi.max(l)));
    info!(
        layout = %result.layout,
        total_length = result.total_length,
        points = result.sweep.len(),
        min_loss_db,
        max_loss_db,
        "sweep complete"
    );

    match output {
        Some(path) => {
            let file = BufWriter::new(File::create(path)?);
            write_sweep_csv(file, &result.sweep, Some(&result.dispersion))?;
            info!(path = %path.display(), "wrote sweep");
        }
        None => write_sweep_csv(io::stdout().lock(), &result.sweep, Some(&result.dispersion))?,
    }
    Ok(())
}

fn layout(config: Option<&Path>) -> coax_core::Result<()> {
    let model = load_config(config)?.build_model()?;
    println!("{model}");
    println!("Total length = {} m", model.total_length());
    Ok(())
}

fn pulse(carrier_mhz: f64, width_us: f64, config: Option<&Path>) -> coax_core::Result<()> {
    let model = load_config(config)?.build_model()?;
    let packet = GaussianPacket::new(carrier_mhz * 1e6, width_us * 1e-6);
    let propagation = propagate(&model, &packet)?;

    let delay = propagation.delay()?;
    let velocity = propagation.group_velocity(model.total_length())?;
    println!("Carrier = {carrier_mhz} MHz");
    println!("Delay = {:.6} µs", delay * 1e6);
    println!("Group velocity = {:.6} c", velocity / SPEED_OF_LIGHT);
    println!("Peak ratio = {:.6}", propagation.peak_ratio());
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Sweep { config, output } => sweep(config.as_deref(), output.as_deref()),
        Commands::Layout { config } => layout(config.as_deref()),
        Commands::Pulse {
            carrier_mhz,
            width_us,
            config,
        } => pulse(carrier_mhz, width_us, config.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
