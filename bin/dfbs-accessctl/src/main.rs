//! ---
//! dfbs_section: "05-networking-external-interfaces"
//! dfbs_subsection: "binary"
//! dfbs_type: "source"
//! dfbs_scope: "code"
//! dfbs_description: "Control CLI evaluating DFBS permission guards."
//! dfbs_version: "v0.0.0-prealpha"
//! dfbs_owner: "tbd"
//! ---
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dfbs_common::config::AppConfig;
use dfbs_common::init_tracing;
use tracing::warn;

mod check;

const DEFAULT_CONFIG_CANDIDATES: &[&str] = &["config/dfbs.toml", "/etc/dfbs/dfbs.toml"];

#[derive(Debug, Parser)]
#[command(author, version, about = "DFBS access gate checks", long_about = None)]
struct Cli {
    /// Configuration file (defaults to DFBS_CONFIG or the standard locations).
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Evaluate a guard against the configured backend.
    Check(check::CheckCommand),
    #[command(subcommand, about = "Configuration inspection")]
    Config(ConfigCommand),
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration as TOML.
    Show,
}

/// Resolve the configuration without logging; the caller reports any fallback once
/// tracing is installed.
fn load_config<P: AsRef<Path>>(
    explicit: Option<&PathBuf>,
    candidates: &[P],
) -> Result<(AppConfig, Option<anyhow::Error>)> {
    if let Some(path) = explicit {
        return Ok((AppConfig::load(&[path])?, None));
    }
    match AppConfig::load(candidates) {
        Ok(config) => Ok((config, None)),
        Err(err) => Ok((AppConfig::default(), Some(err))),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config, fallback) = load_config(cli.config.as_ref(), DEFAULT_CONFIG_CANDIDATES)?;
    if matches!(&cli.command, Commands::Check(cmd) if cmd.persist_logs) {
        init_tracing("dfbs-accessctl", &config.logging)?;
    } else {
        dfbs_logging::init();
    }
    if let Some(err) = fallback {
        warn!(error = %err, "no configuration found; using defaults");
    }

    match cli.command {
        Commands::Check(cmd) => cmd.execute(&config).await?,
        Commands::Config(ConfigCommand::Show) => {
            let rendered =
                toml::to_string_pretty(&config).context("unable to render configuration")?;
            print!("{rendered}");
        }
    }
    Ok(())
}
