//! Replay command for folding a lifecycle event log into a session.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;

use nt_core::{TimedLifecycleEvent, replay};

use super::splits::{SplitsReport, write_report};
use super::util::{read_jsonl, resolve_at};
use crate::Config;

#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// JSONL file of lifecycle events.
    #[arg(long)]
    pub events: PathBuf,

    /// Instant to compute splits at (ISO 8601 or e.g. "5 minutes ago"). Defaults to now.
    #[arg(long)]
    pub at: Option<String>,

    /// Also write the resulting session state to this file.
    #[arg(long)]
    pub save_session: Option<PathBuf>,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn run<W: Write>(writer: &mut W, args: &ReplayArgs, config: &Config) -> Result<()> {
    let events: Vec<TimedLifecycleEvent> = read_jsonl(&args.events)?;
    let Some(session) = replay(&events) else {
        bail!("no lifecycle events in {}", args.events.display());
    };
    tracing::info!(
        events = events.len(),
        orientation = %session.orientation,
        activity = %session.activity,
        "session replayed"
    );

    if let Some(path) = &args.save_session {
        let json = serde_json::to_string_pretty(&session).context("failed to serialize session")?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    let at = resolve_at(args.at.as_deref())?;
    let report = SplitsReport::new(at, &session.time_splits(at), config.foreground_formula);
    write_report(writer, &report, args.json)
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;
    use nt_core::{ActivityState, DeviceOrientation, SessionState};

    const EVENTS: &str = r#"{"timestamp":"2025-01-15T09:00:00Z","type":"orientation_changed","orientation":"portrait"}
{"timestamp":"2025-01-15T09:03:00Z","type":"orientation_changed","orientation":"landscape"}
{"timestamp":"2025-01-15T09:04:00Z","type":"activity_changed","activity":"inactive"}
{"timestamp":"2025-01-15T09:05:00Z","type":"orientation_changed","orientation":"other"}
{"timestamp":"2025-01-15T09:06:00Z","type":"activity_changed","activity":"active"}
"#;

    fn args(dir: &tempfile::TempDir, content: &str) -> ReplayArgs {
        let events = dir.path().join("events.jsonl");
        std::fs::write(&events, content).unwrap();
        ReplayArgs {
            events,
            at: Some("2025-01-15T09:10:00Z".to_string()),
            save_session: None,
            json: false,
        }
    }

    #[test]
    fn replay_text_output() {
        let dir = tempfile::tempdir().unwrap();
        let args = args(&dir, EVENTS);

        let mut output = Vec::new();
        run(&mut output, &args, &Config::default()).unwrap();

        assert_snapshot!(String::from_utf8(output).unwrap(), @r"
        Time splits at 2025-01-15 09:10:00 UTC
        Foreground: 8m 0s (80%)
        Background: 2m 0s
        Portrait: 3m 0s (60%)
        Landscape: 2m 0s
        ");
    }

    #[test]
    fn replay_saves_session() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = args(&dir, EVENTS);
        let saved = dir.path().join("session.json");
        args.save_session = Some(saved.clone());

        run(&mut Vec::new(), &args, &Config::default()).unwrap();

        let session: SessionState =
            serde_json::from_str(&std::fs::read_to_string(saved).unwrap()).unwrap();
        assert_eq!(session.orientation, DeviceOrientation::Other);
        assert_eq!(session.activity, ActivityState::Active);
        assert_eq!(session.time_spent_in_background.num_minutes(), 2);
    }

    #[test]
    fn replay_of_empty_log_errors() {
        let dir = tempfile::tempdir().unwrap();
        let args = args(&dir, "\n");

        let err = run(&mut Vec::new(), &args, &Config::default()).unwrap_err();
        assert!(err.to_string().starts_with("no lifecycle events"));
    }
}
