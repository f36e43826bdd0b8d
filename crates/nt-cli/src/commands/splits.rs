//! Splits command for computing time percentages from a saved session.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;

use nt_core::{
    ActivityState, DeviceOrientation, ForegroundFormula, SessionState, TimeSplits,
    compute_time_splits,
};

use super::util::{format_duration, read_json, resolve_at};
use crate::Config;

#[derive(Debug, Args)]
pub struct SplitsArgs {
    /// Session state JSON file.
    #[arg(long)]
    pub session: PathBuf,

    /// Current orientation (portrait, landscape, other). Defaults to the session's.
    #[arg(long)]
    pub orientation: Option<DeviceOrientation>,

    /// Current activity state (active, inactive). Defaults to the session's.
    #[arg(long)]
    pub activity: Option<ActivityState>,

    /// Instant to compute splits at (ISO 8601 or e.g. "5 minutes ago"). Defaults to now.
    #[arg(long)]
    pub at: Option<String>,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Time splits as printed by the CLI.
#[derive(Debug, Serialize)]
pub struct SplitsReport {
    pub at: DateTime<Utc>,
    pub total_foreground_ms: i64,
    pub total_background_ms: i64,
    pub total_portrait_ms: i64,
    pub total_landscape_ms: i64,
    pub percent_time_in_foreground: u8,
    pub percent_time_in_portrait: u8,
    pub foreground_formula: ForegroundFormula,
}

impl SplitsReport {
    pub fn new(at: DateTime<Utc>, splits: &TimeSplits, formula: ForegroundFormula) -> Self {
        Self {
            at,
            total_foreground_ms: splits.total_foreground.num_milliseconds(),
            total_background_ms: splits.total_background.num_milliseconds(),
            total_portrait_ms: splits.total_portrait.num_milliseconds(),
            total_landscape_ms: splits.total_landscape.num_milliseconds(),
            percent_time_in_foreground: splits.foreground_percent(formula),
            percent_time_in_portrait: splits.percent_time_in_portrait,
            foreground_formula: formula,
        }
    }
}

pub fn run<W: Write>(writer: &mut W, args: &SplitsArgs, config: &Config) -> Result<()> {
    let session: SessionState = read_json(&args.session)?;
    let at = resolve_at(args.at.as_deref())?;
    let orientation = args.orientation.unwrap_or(session.orientation);
    let activity = args.activity.unwrap_or(session.activity);

    let splits = compute_time_splits(&session, at, orientation, activity);
    let report = SplitsReport::new(at, &splits, config.foreground_formula);
    write_report(writer, &report, args.json)
}

/// Writes a report as pretty JSON or as text.
pub fn write_report<W: Write>(writer: &mut W, report: &SplitsReport, json: bool) -> Result<()> {
    if json {
        serde_json::to_writer_pretty(&mut *writer, report)?;
        writeln!(writer)?;
        return Ok(());
    }

    let ms = chrono::Duration::milliseconds;
    writeln!(writer, "Time splits at {}", report.at)?;
    writeln!(
        writer,
        "Foreground: {} ({}%)",
        format_duration(ms(report.total_foreground_ms)),
        report.percent_time_in_foreground
    )?;
    writeln!(
        writer,
        "Background: {}",
        format_duration(ms(report.total_background_ms))
    )?;
    writeln!(
        writer,
        "Portrait: {} ({}%)",
        format_duration(ms(report.total_portrait_ms)),
        report.percent_time_in_portrait
    )?;
    writeln!(
        writer,
        "Landscape: {}",
        format_duration(ms(report.total_landscape_ms))
    )?;
    if report.foreground_formula == ForegroundFormula::Legacy {
        writeln!(writer, "(foreground percentage uses the legacy formula)")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{Duration, TimeZone};
    use insta::assert_snapshot;

    fn ts(seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap() + Duration::seconds(seconds)
    }

    fn write_session(dir: &tempfile::TempDir) -> PathBuf {
        let mut session =
            SessionState::start(ts(0), ActivityState::Active, DeviceOrientation::Portrait);
        session.time_spent_in_portrait = Duration::seconds(60);
        session.time_spent_in_landscape = Duration::seconds(60);
        session.time_spent_in_background = Duration::seconds(30);
        session.last_time_in_portrait = ts(60);
        session.last_time_in_foreground = ts(60);

        let path = dir.path().join("session.json");
        std::fs::write(&path, serde_json::to_string(&session).unwrap()).unwrap();
        path
    }

    #[test]
    fn splits_text_output() {
        let dir = tempfile::tempdir().unwrap();
        let args = SplitsArgs {
            session: write_session(&dir),
            orientation: None,
            activity: None,
            at: Some("2025-01-15T09:01:30Z".to_string()),
            json: false,
        };

        let mut output = Vec::new();
        run(&mut output, &args, &Config::default()).unwrap();

        assert_snapshot!(String::from_utf8(output).unwrap(), @r"
        Time splits at 2025-01-15 09:01:30 UTC
        Foreground: 30s (50%)
        Background: 30s
        Portrait: 1m 30s (60%)
        Landscape: 1m 0s
        ");
    }

    #[test]
    fn splits_flat_device_freezes_orientation() {
        let dir = tempfile::tempdir().unwrap();
        let args = SplitsArgs {
            session: write_session(&dir),
            orientation: Some(DeviceOrientation::Other),
            activity: Some(ActivityState::Inactive),
            at: Some("2025-01-15T09:10:00Z".to_string()),
            json: true,
        };

        let mut output = Vec::new();
        run(&mut output, &args, &Config::default()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&output).unwrap();

        assert_eq!(value["total_portrait_ms"], 60_000);
        assert_eq!(value["total_landscape_ms"], 60_000);
        assert_eq!(value["percent_time_in_portrait"], 50);
        // Background 30s closed + 600s open since session start.
        assert_eq!(value["total_background_ms"], 630_000);
        assert_eq!(value["percent_time_in_foreground"], 0);
        assert_eq!(value["foreground_formula"], "fixed");
    }

    #[test]
    fn splits_legacy_formula_is_flagged() {
        let dir = tempfile::tempdir().unwrap();
        let args = SplitsArgs {
            session: write_session(&dir),
            orientation: None,
            activity: None,
            at: Some("2025-01-15T09:01:30Z".to_string()),
            json: false,
        };
        let config = Config {
            foreground_formula: ForegroundFormula::Legacy,
            ..Config::default()
        };

        let mut output = Vec::new();
        run(&mut output, &args, &config).unwrap();
        let output = String::from_utf8(output).unwrap();

        assert!(output.contains("Foreground: 30s (60%)"));
        assert!(output.ends_with("(foreground percentage uses the legacy formula)\n"));
    }

    #[test]
    fn splits_missing_session_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let args = SplitsArgs {
            session: dir.path().join("missing.json"),
            orientation: None,
            activity: None,
            at: None,
            json: false,
        };

        let err = run(&mut Vec::new(), &args, &Config::default()).unwrap_err();
        assert!(err.to_string().starts_with("failed to read"));
    }
}
