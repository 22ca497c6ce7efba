// Copyright 2025 Owl Platform Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::{anyhow, Context};
use clap::Parser;
use owl_config::{load_config, validate_config, ConfigResult, SolverConfig};
use owl_observability::{debug_flags_help, init_logging, CrateDebugFlags, LoggingGuard};
use owl_solver::{NearbyDeriver, RunSummary, ShutdownSignal, SolverLifecycle, SolverSettings, StopReason};
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};

/// Owl simple solver - marks devices "nearby" from aggregator RSSI samples
#[derive(Parser, Debug)]
#[command(name = "simple-solver", version, long_about = None, after_help = debug_flags_help())]
struct Args {
    /// Aggregator host
    aggregator_host: String,

    /// Aggregator port
    #[arg(value_parser = port_arg)]
    aggregator_port: u16,

    /// World model host
    world_model_host: String,

    /// World model port
    #[arg(value_parser = port_arg)]
    world_model_port: u16,

    /// Path to owl_solver.toml (otherwise OWL_CONFIG_PATH or a search from the cwd)
    #[arg(long)]
    config: Option<PathBuf>,

    /// RSSI threshold in dBm; samples strictly above it are "nearby"
    #[arg(long, allow_negative_numbers = true)]
    threshold: Option<f32>,

    /// Origin name reported to the world model
    #[arg(long)]
    origin: Option<String>,

    /// Log derived attributes instead of publishing them
    #[arg(long, default_value_t = false)]
    log_only: bool,

    /// Also write JSON logs to <LOG_DIR>/run_<timestamp>/owl-solver.log
    #[cfg(feature = "file-logging")]
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

impl Args {
    /// CLI tier of the configuration overrides
    fn overrides(&self) -> HashMap<String, String> {
        let mut overrides = HashMap::new();
        overrides.insert("aggregator_host".to_string(), self.aggregator_host.clone());
        overrides.insert("aggregator_port".to_string(), self.aggregator_port.to_string());
        overrides.insert("world_model_host".to_string(), self.world_model_host.clone());
        overrides.insert("world_model_port".to_string(), self.world_model_port.to_string());
        if let Some(threshold) = self.threshold {
            overrides.insert("rssi_threshold".to_string(), threshold.to_string());
        }
        if let Some(origin) = &self.origin {
            overrides.insert("origin".to_string(), origin.clone());
        }
        if self.log_only {
            overrides.insert("publish".to_string(), "false".to_string());
        }
        overrides
    }
}

fn port_arg(value: &str) -> Result<u16, String> {
    owl_config::parse_port(value).map_err(|e| e.to_string())
}

/// `--debug-*` flags are handled by owl-observability, not clap
fn split_debug_args<I>(args: I) -> (Vec<String>, Vec<String>)
where
    I: IntoIterator<Item = String>,
{
    args.into_iter().partition(|arg| arg.starts_with("--debug-"))
}

fn main() -> ExitCode {
    let (debug_args, cli_args) = split_debug_args(env::args());
    let args = Args::parse_from(cli_args);

    let mut debug_flags = CrateDebugFlags::from_args(debug_args);
    if let Ok(value) = env::var("OWL_DEBUG") {
        debug_flags.merge_env_value(&value);
    }

    let config = load_config(args.config.as_deref(), Some(&args.overrides()));

    let _logging = match start_logging(&args, &debug_flags, &config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(config) {
        Ok(summary) => {
            report(&summary);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn start_logging(
    args: &Args,
    debug_flags: &CrateDebugFlags,
    config: &ConfigResult<SolverConfig>,
) -> anyhow::Result<LoggingGuard> {
    let level = match config {
        Ok(config) => config.logging.level.as_str(),
        Err(_) => "info",
    };
    match install_logging(args, debug_flags, level) {
        Ok(guard) => Ok(guard),
        Err(e) if level != "info" => {
            let guard = install_logging(args, debug_flags, "info")?;
            warn!("Falling back to 'info' logging: {:#}", e);
            Ok(guard)
        }
        Err(e) => Err(e),
    }
}

#[cfg(feature = "file-logging")]
fn install_logging(
    args: &Args,
    debug_flags: &CrateDebugFlags,
    level: &str,
) -> anyhow::Result<LoggingGuard> {
    match &args.log_dir {
        Some(dir) => {
            let guard = owl_observability::init_logging_to_dir(debug_flags, level, dir)?;
            if let Some(run_folder) = guard.log_dir() {
                info!("Writing logs to {}", run_folder.display());
            }
            Ok(guard)
        }
        None => init_logging(debug_flags, level),
    }
}

#[cfg(not(feature = "file-logging"))]
fn install_logging(
    _args: &Args,
    debug_flags: &CrateDebugFlags,
    level: &str,
) -> anyhow::Result<LoggingGuard> {
    init_logging(debug_flags, level)
}

fn run(config: ConfigResult<SolverConfig>) -> anyhow::Result<RunSummary> {
    let config = config.context("Failed to load configuration")?;
    validate_config(&config).context("Invalid configuration")?;

    let settings = SolverSettings::from_config(&config);
    let deriver = NearbyDeriver::new(
        config.solver.attribute_name.clone(),
        config.solver.rssi_threshold,
        config.world_model.origin.clone(),
    );
    info!(
        "Starting solver '{}' ({} > {} dBm, {:?})",
        config.world_model.origin,
        config.solver.attribute_name,
        config.solver.rssi_threshold,
        settings.publish_mode
    );

    let shutdown = ShutdownSignal::new();
    let signal = shutdown.clone();
    ctrlc::set_handler(move || {
        info!("Shutdown signal received...");
        signal.trigger();
    })
    .context("Failed to install Ctrl-C handler")?;

    let mut solver = SolverLifecycle::over_tcp(settings, deriver, shutdown)?;
    solver.connect()?;

    let handle = solver.start()?;
    let summary = handle
        .join()
        .map_err(|_| anyhow!("solver thread panicked"))??;
    Ok(summary)
}

fn report(summary: &RunSummary) {
    info!(
        "Solver finished: {} samples, {} published, {} publish failures",
        summary.samples_processed, summary.attributes_published, summary.publish_failures
    );
    if let StopReason::SourceError(reason) = &summary.stop {
        warn!("Sample stream ended on error: {}", reason);
    }
}
