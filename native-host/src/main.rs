use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use store_engine::{Cycle, FrameReader, FrameWriter, run_once};
use tracing::{Level, debug, info};
use utils::logging::{self, Component, LogConfig};

use host_config::HostConfig;
use manifest::HostManifest;

mod host_config;
mod manifest;

/// Native messaging host that lists and saves bookmark files.
///
/// Reads one length-prefixed JSON request from stdin, answers it on stdout
/// and exits.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// TOML config file
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory to list and save into
    #[arg(short = 'd', long = "dir", value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Set log level
    #[arg(long = "log-level", value_name = "LEVEL",
          value_parser = ["trace", "debug", "info", "warn", "error"])]
    log_level: Option<String>,

    /// Print a native messaging manifest for the given binary path and exit
    #[arg(long = "print-manifest", value_name = "BINARY")]
    print_manifest: Option<PathBuf>,

    /// Arguments passed by the browser (origin, manifest path, extension id)
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, hide = true)]
    host_args: Vec<String>,
}

impl Cli {
    /// Flags win over the config file.
    fn apply(&self, config: &mut HostConfig) {
        if let Some(dir) = &self.dir {
            config.store_dir = dir.clone();
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => HostConfig::load_config(path)?,
        None => HostConfig::default(),
    };
    cli.apply(&mut config);

    if let Some(binary) = &cli.print_manifest {
        let binary = std::path::absolute(binary)
            .with_context(|| format!("failed to resolve {}", binary.display()))?;
        let manifest = HostManifest::new(&config, binary);
        println!("{}", manifest.to_json()?);
        return Ok(());
    }

    init_logging(&config);
    debug!(host_args = ?cli.host_args, store_dir = %config.store_dir.display(), "Host started");

    let mut reader = FrameReader::new(io::stdin().lock());
    let mut writer = FrameWriter::new(io::stdout().lock());
    let mut diagnostics = io::stderr().lock();

    let cycle = run_once(&mut reader, &mut writer, &mut diagnostics, &config.store_dir)
        .context("native messaging channel failed")?;

    match cycle {
        Cycle::EndOfInput => debug!("No request, exiting"),
        Cycle::Replied(outcome) => info!(?outcome, "Reply sent"),
    }

    Ok(())
}

fn init_logging(config: &HostConfig) {
    let max_level = match logging::parse_level(&config.log_level) {
        Some(level) => level,
        None => {
            eprintln!(
                "invalid log level '{}', use one of [\"trace\", \"debug\", \"info\", \"warn\", \"error\"]",
                config.log_level
            );
            Level::WARN
        }
    };

    if let Err(e) = logging::init_logging(LogConfig {
        component: Component::StoreHost,
        log_dir: config.log_dir.clone(),
        max_level,
        ..Default::default()
    }) {
        eprintln!("Failed to initialize logger: {}", e);
    }
}
