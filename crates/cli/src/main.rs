// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
// SPDX-License-Identifier: AGPL-3.0
//! vartree - Inspect program state as a debugger variable tree
//!
//! Each JSON snapshot given on the command line is treated as one stop of a
//! debuggee. Values changed since the previous stop are marked with `*`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use eyre::Result;

mod backend;
mod inspect;

/// Command-line interface for vartree
#[derive(Debug, Parser)]
#[command(name = "vartree")]
#[command(about = "Variable tree inspector - Browse snapshots of program state like a debugger")]
#[command(version)]
pub struct Cli {
    /// Also write logs to a file in the temporary directory
    #[arg(long, env = "VARTREE_LOG_FILE")]
    pub log_file: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the variable tree of each snapshot, flagging changes between stops
    Inspect(InspectArgs),
}

/// Arguments of the `inspect` command
#[derive(Debug, Args)]
pub struct InspectArgs {
    /// JSON snapshots, one per stop, in order
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Watch expression such as `config.items[0]` (repeatable)
    #[arg(long)]
    pub watch: Vec<String>,

    /// Expand values down to this depth
    #[arg(long, default_value = "1")]
    pub depth: usize,

    /// Configuration file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    vartree_common::logging::init_logging("vartree", cli.log_file)?;

    match &cli.command {
        Commands::Inspect(args) => {
            tracing::debug!("Inspecting {} snapshot(s)", args.files.len());
            inspect::inspect(args).await
        }
    }
}
