//! CLI entry point for flowrun.

pub mod run;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::types::WorkflowKind;

/// flowrun CLI
#[derive(Parser, Debug)]
#[command(name = "flowrun", version, about = "Drive a remote AI workflow from the terminal")]
pub struct Cli {
    /// Config file (defaults to ~/.flowrun/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start a workflow run and answer its questions interactively
    Run(RunArgs),
    /// Print the resolved configuration (token redacted)
    Config,
}

/// Arguments for `flowrun run`.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Workflow to run (nutrition-plan, training-program)
    #[arg(short, long)]
    pub kind: WorkflowKind,

    /// Subject the run is performed for
    #[arg(short, long, default_value = "cli")]
    pub subject: String,

    /// Workflow parameter as key=value (repeatable)
    #[arg(short = 'p', long = "param", value_parser = parse_key_val)]
    pub params: Vec<(String, String)>,

    /// Per-call timeout in seconds (overrides config)
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

fn parse_key_val(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    if key.trim().is_empty() {
        return Err(format!("empty parameter name in '{raw}'"));
    }
    Ok((key.trim().to_string(), value.to_string()))
}
