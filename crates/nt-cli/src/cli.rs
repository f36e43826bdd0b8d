//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::{replay::ReplayArgs, snapshot::SnapshotArgs, splits::SplitsArgs};

/// Navigation telemetry metadata.
///
/// Computes session time splits and device metadata snapshots from saved
/// session state, lifecycle event logs and device readings.
#[derive(Debug, Parser)]
#[command(name = "nt", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Compute foreground and portrait percentages for a saved session.
    Splits(SplitsArgs),

    /// Fold a lifecycle event log into a session and compute its splits.
    Replay(ReplayArgs),

    /// Assemble an events metadata snapshot from a session and device readings.
    Snapshot(SnapshotArgs),
}
