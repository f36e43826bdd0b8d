//! Snapshot command for assembling an events metadata record.
//!
//! Device readings come from a fixture file. The application state is owned
//! by a UI thread spawned for the command and read through it, the same way
//! a host application would.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use nt_core::{
    ActivityState, ApplicationLifecycle, DeviceReadings, EventsMetadataProvider, SessionState,
    UiThread,
};

use super::util::{read_json, resolve_at};
use crate::Config;

#[derive(Debug, Args)]
pub struct SnapshotArgs {
    /// Session state JSON file.
    #[arg(long)]
    pub session: PathBuf,

    /// Device readings JSON file.
    #[arg(long)]
    pub device: PathBuf,

    /// Application state held by the UI thread. Defaults to the session's.
    #[arg(long)]
    pub activity: Option<ActivityState>,

    /// Instant to take the snapshot at (ISO 8601 or e.g. "5 minutes ago"). Defaults to now.
    #[arg(long)]
    pub at: Option<String>,
}

pub fn run<W: Write>(writer: &mut W, args: &SnapshotArgs, config: &Config) -> Result<()> {
    let session: SessionState = read_json(&args.session)?;
    let readings: DeviceReadings = read_json(&args.device)?;
    let at = resolve_at(args.at.as_deref())?;
    let activity = args.activity.unwrap_or(session.activity);

    let ui = UiThread::spawn(
        "nt-ui",
        ApplicationLifecycle::new(activity),
        config.ui_thread_timeout(),
    )
    .context("failed to start UI thread")?;
    let app_metadata = config.app_metadata().context("invalid app metadata")?;

    let provider =
        EventsMetadataProvider::new(readings.clone(), readings.clone(), readings, Arc::new(ui))
            .with_app_metadata(app_metadata)
            .with_foreground_formula(config.foreground_formula);

    let metadata = provider
        .provide_events_metadata(&session, at)
        .context("failed to assemble events metadata")?;

    serde_json::to_writer_pretty(&mut *writer, &metadata)?;
    writeln!(writer)?;
    Ok(())
}
