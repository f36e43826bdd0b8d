//! Telemetry metadata snapshots.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::accounting::{ForegroundFormula, compute_time_splits};
use crate::device::{
    AudioSession, AudioType, Device, Screen, audio_route_category, battery_is_plugged_in,
    battery_level_percent, screen_brightness_percent, volume_percent,
};
use crate::session::SessionState;
use crate::types::{ActivityState, SessionId, UserId, ValidationError};
use crate::ui_thread::{ApplicationLifecycle, UiThread, UiThreadError};

/// Errors while assembling a metadata snapshot.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The application state could not be read from the UI thread.
    #[error("failed to read application state")]
    ApplicationState(#[from] UiThreadError),
}

/// Identity of the host application and session, attached to every snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppMetadata {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    pub session_id: SessionId,
}

impl AppMetadata {
    /// Creates metadata for a new session with a generated session ID.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        user_id: Option<UserId>,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ValidationError::Empty { field: "app name" });
        }
        let version = version.into();
        if version.is_empty() {
            return Err(ValidationError::Empty {
                field: "app version",
            });
        }
        Ok(Self {
            name,
            version,
            user_id,
            session_id: SessionId::generate(),
        })
    }

    /// Replaces the generated session ID.
    #[must_use]
    pub fn with_session_id(mut self, session_id: SessionId) -> Self {
        self.session_id = session_id;
        self
    }
}

/// Point-in-time device, environment and app metadata for one analytics event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsMetadata {
    pub volume_level: u8,
    pub audio_type: AudioType,
    pub screen_brightness: u8,
    pub percent_time_in_foreground: u8,
    pub percent_time_in_portrait: u8,
    pub battery_plugged_in: bool,
    /// Percentage, or `-1` when unknown.
    pub battery_level: i8,
    /// Network type; always empty as connectivity is not sampled.
    pub connectivity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_metadata: Option<AppMetadata>,
}

/// Assembles [`EventsMetadata`] from injected device accessors.
///
/// Application state is read through the [`UiThread`] owning it. Calls from
/// other threads block until the UI thread answers; calls on the UI thread
/// read it directly.
pub struct EventsMetadataProvider<S, A, D> {
    screen: S,
    audio: A,
    device: D,
    ui: Arc<UiThread<ApplicationLifecycle>>,
    app_metadata: Option<AppMetadata>,
    foreground_formula: ForegroundFormula,
}

impl<S, A, D> EventsMetadataProvider<S, A, D>
where
    S: Screen,
    A: AudioSession,
    D: Device,
{
    pub fn new(screen: S, audio: A, device: D, ui: Arc<UiThread<ApplicationLifecycle>>) -> Self {
        Self {
            screen,
            audio,
            device,
            ui,
            app_metadata: None,
            foreground_formula: ForegroundFormula::default(),
        }
    }

    #[must_use]
    pub fn with_app_metadata(mut self, app_metadata: AppMetadata) -> Self {
        self.app_metadata = Some(app_metadata);
        self
    }

    #[must_use]
    pub fn with_foreground_formula(mut self, formula: ForegroundFormula) -> Self {
        self.foreground_formula = formula;
        self
    }

    pub const fn app_metadata(&self) -> Option<&AppMetadata> {
        self.app_metadata.as_ref()
    }

    /// Reads the application activity state on the UI thread, blocking until
    /// it answers when called from elsewhere.
    pub fn application_state(&self) -> Result<ActivityState, UiThreadError> {
        self.ui.run_sync(|app| app.state())
    }

    /// Samples the device and computes a snapshot for `session` as of `now`.
    pub fn provide_events_metadata(
        &self,
        session: &SessionState,
        now: DateTime<Utc>,
    ) -> Result<EventsMetadata, ProviderError> {
        let activity = self.application_state().inspect_err(|err| {
            tracing::warn!(%err, "application state unavailable, snapshot skipped");
        })?;
        let orientation = self.device.orientation();
        let splits = compute_time_splits(session, now, orientation, activity);

        tracing::debug!(
            %orientation,
            %activity,
            portrait = splits.percent_time_in_portrait,
            foreground = splits.percent_time_in_foreground,
            "computed time splits"
        );

        Ok(EventsMetadata {
            volume_level: volume_percent(&self.audio),
            audio_type: audio_route_category(&self.audio),
            screen_brightness: screen_brightness_percent(&self.screen),
            percent_time_in_foreground: splits.foreground_percent(self.foreground_formula),
            percent_time_in_portrait: splits.percent_time_in_portrait,
            battery_plugged_in: battery_is_plugged_in(&self.device),
            battery_level: battery_level_percent(&self.device),
            connectivity: String::new(),
            app_metadata: self.app_metadata.clone(),
        })
    }
}
