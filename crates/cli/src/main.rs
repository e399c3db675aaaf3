mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use semver::Version;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use acd_lib::config::RegistryConfig;

use crate::cmd::UsageError;
use crate::output::{OutputFormat, print_error};

/// build-acd - Resolve and assemble Ansible Community Distribution releases
#[derive(Parser)]
#[command(name = "build-acd")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Output format
  #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
  format: OutputFormat,

  /// Collection registry to query (overrides ACD_GALAXY_SERVER)
  #[arg(long, global = true, value_name = "URL")]
  galaxy_server: Option<String>,

  /// Package index to query for the base version (overrides ACD_PYPI_SERVER)
  #[arg(long, global = true, value_name = "URL")]
  pypi_server: Option<String>,

  /// Per-request deadline, e.g. "30s" or "2m" (overrides ACD_REQUEST_TIMEOUT)
  #[arg(long, global = true, value_name = "DURATION", value_parser = humantime::parse_duration)]
  timeout: Option<Duration>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Pin the newest compatible version of every collection in a build file
  NewAcd {
    /// Release the build file is for; only major.minor is recorded
    acd_version: Version,

    /// Collections to include, one namespace.name per line
    #[arg(long, default_value = "acd.in")]
    pieces_file: PathBuf,

    /// Build file name (default: <pieces-stem>-<major>.<minor>.build)
    #[arg(long)]
    build_file: Option<PathBuf>,

    /// Existing directory to write the build file into
    #[arg(long, default_value = ".")]
    dest_dir: PathBuf,
  },

  /// Install the collections a build file allows and record them in a deps file
  BuildSingle {
    /// Release to build
    acd_version: Version,

    /// Build file to read (default: acd-<major>.<minor>.build)
    #[arg(long)]
    build_file: Option<PathBuf>,

    /// Deps file name (default: <build-stem>-<version>.deps)
    #[arg(long)]
    deps_file: Option<PathBuf>,

    /// Existing directory to install the release and write the deps file into
    #[arg(long, default_value = ".")]
    dest_dir: PathBuf,
  },
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  init_tracing(cli.verbose);
  let format = cli.format;

  match run(cli) {
    Ok(code) => code,
    Err(e) => {
      print_error(&format!("{e:#}"));
      if format.is_json() {
        if let Err(json_err) = cmd::print_json_error(&format!("{e:#}"), &[]) {
          print_error(&format!("{json_err:#}"));
        }
      }
      if e.downcast_ref::<UsageError>().is_some() {
        ExitCode::from(2)
      } else {
        ExitCode::FAILURE
      }
    }
  }
}

fn init_tracing(verbose: bool) {
  let default_level = if verbose { "debug" } else { "warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_target(false)
    .without_time()
    .init();
}

fn run(cli: Cli) -> Result<ExitCode> {
  let config = registry_config(&cli)?;

  let runtime = tokio::runtime::Builder::new_current_thread()
    .enable_all()
    .build()
    .context("Failed to create async runtime")?;

  match cli.command {
    Commands::NewAcd {
      acd_version,
      pieces_file,
      build_file,
      dest_dir,
    } => runtime.block_on(cmd::cmd_new_acd(
      &config,
      &acd_version,
      &pieces_file,
      build_file.as_deref(),
      &dest_dir,
      cli.format,
    )),
    Commands::BuildSingle {
      acd_version,
      build_file,
      deps_file,
      dest_dir,
    } => runtime.block_on(cmd::cmd_build_single(
      &config,
      &acd_version,
      build_file.as_deref(),
      deps_file.as_deref(),
      &dest_dir,
      cli.format,
    )),
  }
}

/// Environment first, then command-line overrides.
fn registry_config(cli: &Cli) -> Result<RegistryConfig> {
  let mut config = RegistryConfig::from_env().map_err(|e| UsageError(e.to_string()))?;

  if let Some(url) = &cli.galaxy_server {
    config.galaxy_url = url.clone();
  }
  if let Some(url) = &cli.pypi_server {
    config.pypi_url = url.clone();
  }
  if let Some(timeout) = cli.timeout {
    config.request_timeout = timeout;
  }

  config.validate().map_err(|e| UsageError(e.to_string()))?;
  debug!(
    galaxy = %config.galaxy_url,
    pypi = %config.pypi_url,
    timeout = ?config.request_timeout,
    "registry configuration"
  );
  Ok(config)
}
