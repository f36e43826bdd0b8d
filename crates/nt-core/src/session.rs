//! Session state and lifecycle transitions.
//!
//! A [`SessionState`] keeps, for each of the two binary states tracked over a
//! session (foreground/background and portrait/landscape), the time already
//! folded into a closed total plus the instant the current open interval
//! began. Lifecycle events close the open interval of the state being left
//! and open one for the state being entered.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ActivityState, DeviceOrientation};

/// Cumulative time-in-state for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// Closed foreground time, not counting the open interval.
    #[serde(rename = "time_spent_in_foreground_ms", with = "duration_ms")]
    pub time_spent_in_foreground: Duration,

    #[serde(rename = "time_spent_in_background_ms", with = "duration_ms")]
    pub time_spent_in_background: Duration,

    #[serde(rename = "time_spent_in_portrait_ms", with = "duration_ms")]
    pub time_spent_in_portrait: Duration,

    #[serde(rename = "time_spent_in_landscape_ms", with = "duration_ms")]
    pub time_spent_in_landscape: Duration,

    /// Start of the current foreground interval.
    pub last_time_in_foreground: DateTime<Utc>,

    /// Start of the current background interval.
    pub last_time_in_background: DateTime<Utc>,

    /// Start of the current portrait interval.
    pub last_time_in_portrait: DateTime<Utc>,

    /// Start of the current landscape interval.
    pub last_time_in_landscape: DateTime<Utc>,

    /// Activity state whose interval is currently open.
    #[serde(default = "default_activity")]
    pub activity: ActivityState,

    /// Last orientation reported to the session.
    ///
    /// `Other` means neither orientation interval is open.
    #[serde(default = "default_orientation")]
    pub orientation: DeviceOrientation,
}

const fn default_activity() -> ActivityState {
    ActivityState::Active
}

const fn default_orientation() -> DeviceOrientation {
    DeviceOrientation::Other
}

/// A transition reported by the host's lifecycle observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifecycleEvent {
    OrientationChanged { orientation: DeviceOrientation },
    ActivityChanged { activity: ActivityState },
}

/// A lifecycle event with the instant it was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedLifecycleEvent {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: LifecycleEvent,
}

impl SessionState {
    /// Starts a session at `at` with no accumulated time.
    pub fn start(at: DateTime<Utc>, activity: ActivityState, orientation: DeviceOrientation) -> Self {
        Self {
            time_spent_in_foreground: Duration::zero(),
            time_spent_in_background: Duration::zero(),
            time_spent_in_portrait: Duration::zero(),
            time_spent_in_landscape: Duration::zero(),
            last_time_in_foreground: at,
            last_time_in_background: at,
            last_time_in_portrait: at,
            last_time_in_landscape: at,
            activity,
            orientation,
        }
    }

    /// Applies a lifecycle transition observed at `at`.
    ///
    /// Events repeating the current state are ignored so the open interval
    /// keeps its original start.
    pub fn apply(&mut self, event: LifecycleEvent, at: DateTime<Utc>) {
        match event {
            LifecycleEvent::OrientationChanged { orientation } => {
                self.change_orientation(orientation, at);
            }
            LifecycleEvent::ActivityChanged { activity } => self.change_activity(activity, at),
        }
    }

    fn change_orientation(&mut self, next: DeviceOrientation, at: DateTime<Utc>) {
        if next == self.orientation {
            return;
        }

        match self.orientation {
            DeviceOrientation::Portrait => {
                let elapsed = open_interval(self.last_time_in_portrait, at);
                self.time_spent_in_portrait = accumulate(self.time_spent_in_portrait, elapsed);
            }
            DeviceOrientation::Landscape => {
                let elapsed = open_interval(self.last_time_in_landscape, at);
                self.time_spent_in_landscape = accumulate(self.time_spent_in_landscape, elapsed);
            }
            DeviceOrientation::Other => {}
        }

        match next {
            DeviceOrientation::Portrait => self.last_time_in_portrait = at,
            DeviceOrientation::Landscape => self.last_time_in_landscape = at,
            DeviceOrientation::Other => {}
        }

        tracing::trace!(from = %self.orientation, to = %next, %at, "orientation changed");
        self.orientation = next;
    }

    fn change_activity(&mut self, next: ActivityState, at: DateTime<Utc>) {
        if next == self.activity {
            return;
        }

        match self.activity {
            ActivityState::Active => {
                let elapsed = open_interval(self.last_time_in_foreground, at);
                self.time_spent_in_foreground = accumulate(self.time_spent_in_foreground, elapsed);
                self.last_time_in_background = at;
            }
            ActivityState::Inactive => {
                let elapsed = open_interval(self.last_time_in_background, at);
                self.time_spent_in_background = accumulate(self.time_spent_in_background, elapsed);
                self.last_time_in_foreground = at;
            }
        }

        tracing::trace!(from = %self.activity, to = %next, %at, "activity changed");
        self.activity = next;
    }
}

/// Folds a sequence of lifecycle events into a session.
///
/// The session starts at the earliest event, active and with no known
/// orientation; events at that same instant establish the initial state
/// without accumulating time. Events are applied in timestamp order.
/// Returns `None` when there are no events.
pub fn replay(events: &[TimedLifecycleEvent]) -> Option<SessionState> {
    let mut ordered: Vec<&TimedLifecycleEvent> = events.iter().collect();
    ordered.sort_by_key(|e| e.timestamp);

    let first = ordered.first()?;
    let mut session = SessionState::start(
        first.timestamp,
        ActivityState::Active,
        DeviceOrientation::Other,
    );
    for timed in ordered {
        session.apply(timed.event, timed.timestamp);
    }

    tracing::debug!(events = events.len(), "replayed lifecycle events");
    Some(session)
}

/// Elapsed time of an interval still open at `now`, clamped to zero when the
/// clock reads earlier than the interval start.
pub(crate) fn open_interval(since: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - since).max(Duration::zero())
}

/// Adds an elapsed interval to an accumulated total, saturating at
/// [`Duration::MAX`].
pub(crate) fn accumulate(total: Duration, elapsed: Duration) -> Duration {
    total.checked_add(&elapsed).unwrap_or(Duration::MAX)
}

/// Serializes a [`Duration`] as integer milliseconds.
mod duration_ms {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(duration.num_milliseconds())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = i64::deserialize(deserializer)?;
        if ms < 0 {
            return Err(serde::de::Error::custom(format!(
                "duration cannot be negative, got {ms}ms"
            )));
        }
        Duration::try_milliseconds(ms).ok_or_else(|| {
            serde::de::Error::custom(format!("duration out of range, got {ms}ms"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0)
            .single()
            .expect("valid test timestamp")
            + Duration::seconds(seconds)
    }

    fn orientation(orientation: DeviceOrientation) -> LifecycleEvent {
        LifecycleEvent::OrientationChanged { orientation }
    }

    fn activity(activity: ActivityState) -> LifecycleEvent {
        LifecycleEvent::ActivityChanged { activity }
    }

    #[test]
    fn start_has_no_accumulated_time() {
        let session = SessionState::start(ts(0), ActivityState::Active, DeviceOrientation::Portrait);
        assert_eq!(session.time_spent_in_foreground, Duration::zero());
        assert_eq!(session.time_spent_in_portrait, Duration::zero());
        assert_eq!(session.last_time_in_portrait, ts(0));
        assert_eq!(session.last_time_in_background, ts(0));
    }

    #[test]
    fn rotating_closes_portrait_interval() {
        let mut session =
            SessionState::start(ts(0), ActivityState::Active, DeviceOrientation::Portrait);
        session.apply(orientation(DeviceOrientation::Landscape), ts(40));

        assert_eq!(session.time_spent_in_portrait, Duration::seconds(40));
        assert_eq!(session.time_spent_in_landscape, Duration::zero());
        assert_eq!(session.last_time_in_landscape, ts(40));
        assert_eq!(session.orientation, DeviceOrientation::Landscape);
    }

    #[test]
    fn repeated_event_keeps_interval_start() {
        let mut session =
            SessionState::start(ts(0), ActivityState::Active, DeviceOrientation::Portrait);
        session.apply(orientation(DeviceOrientation::Portrait), ts(10));
        session.apply(orientation(DeviceOrientation::Landscape), ts(30));

        assert_eq!(session.time_spent_in_portrait, Duration::seconds(30));
    }

    #[test]
    fn flat_device_closes_interval_without_opening_one() {
        let mut session =
            SessionState::start(ts(0), ActivityState::Active, DeviceOrientation::Landscape);
        session.apply(orientation(DeviceOrientation::Other), ts(20));
        session.apply(orientation(DeviceOrientation::Portrait), ts(50));
        session.apply(orientation(DeviceOrientation::Landscape), ts(60));

        assert_eq!(session.time_spent_in_landscape, Duration::seconds(20));
        // 20s..50s spent flat is not attributed to either bucket.
        assert_eq!(session.time_spent_in_portrait, Duration::seconds(10));
    }

    #[test]
    fn backgrounding_accumulates_foreground_time() {
        let mut session =
            SessionState::start(ts(0), ActivityState::Active, DeviceOrientation::Portrait);
        session.apply(activity(ActivityState::Inactive), ts(90));
        session.apply(activity(ActivityState::Active), ts(120));

        assert_eq!(session.time_spent_in_foreground, Duration::seconds(90));
        assert_eq!(session.time_spent_in_background, Duration::seconds(30));
        assert_eq!(session.last_time_in_foreground, ts(120));
    }

    #[test]
    fn out_of_order_transition_adds_nothing() {
        let mut session =
            SessionState::start(ts(100), ActivityState::Active, DeviceOrientation::Portrait);
        session.apply(activity(ActivityState::Inactive), ts(50));

        assert_eq!(session.time_spent_in_foreground, Duration::zero());
    }

    #[test]
    fn replay_sorts_and_folds_events() {
        let events = vec![
            TimedLifecycleEvent {
                timestamp: ts(60),
                event: orientation(DeviceOrientation::Landscape),
            },
            TimedLifecycleEvent {
                timestamp: ts(0),
                event: orientation(DeviceOrientation::Portrait),
            },
            TimedLifecycleEvent {
                timestamp: ts(90),
                event: activity(ActivityState::Inactive),
            },
        ];

        let session = replay(&events).expect("events present");
        assert_eq!(session.time_spent_in_portrait, Duration::seconds(60));
        assert_eq!(session.time_spent_in_foreground, Duration::seconds(90));
        assert_eq!(session.orientation, DeviceOrientation::Landscape);
        assert_eq!(session.activity, ActivityState::Inactive);
        assert_eq!(session.last_time_in_background, ts(90));
    }

    #[test]
    fn replay_of_nothing_is_none() {
        assert!(replay(&[]).is_none());
    }

    #[test]
    fn lifecycle_event_json_shape() {
        let json = r#"{"timestamp":"2025-01-15T09:00:00Z","type":"orientation_changed","orientation":"landscape"}"#;
        let parsed: TimedLifecycleEvent = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.timestamp, ts(0));
        assert_eq!(parsed.event, orientation(DeviceOrientation::Landscape));
    }

    #[test]
    fn session_state_uses_millisecond_durations() {
        let mut session =
            SessionState::start(ts(0), ActivityState::Active, DeviceOrientation::Portrait);
        session.time_spent_in_landscape = Duration::milliseconds(1500);

        let value = serde_json::to_value(&session).unwrap();
        assert_eq!(value["time_spent_in_landscape_ms"], 1500);
        assert_eq!(value["orientation"], "portrait");

        let parsed: SessionState = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, session);
    }

    #[test]
    fn negative_duration_rejected() {
        let json = r#"{
            "time_spent_in_foreground_ms": -1,
            "time_spent_in_background_ms": 0,
            "time_spent_in_portrait_ms": 0,
            "time_spent_in_landscape_ms": 0,
            "last_time_in_foreground": "2025-01-15T09:00:00Z",
            "last_time_in_background": "2025-01-15T09:00:00Z",
            "last_time_in_portrait": "2025-01-15T09:00:00Z",
            "last_time_in_landscape": "2025-01-15T09:00:00Z"
        }"#;
        let result: Result<SessionState, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn saturated_total_survives_another_interval() {
        let mut session =
            SessionState::start(ts(0), ActivityState::Active, DeviceOrientation::Portrait);
        session.time_spent_in_portrait = Duration::MAX;
        session.time_spent_in_foreground = Duration::MAX;

        session.apply(
            LifecycleEvent::OrientationChanged {
                orientation: DeviceOrientation::Landscape,
            },
            ts(1),
        );
        session.apply(
            LifecycleEvent::ActivityChanged {
                activity: ActivityState::Inactive,
            },
            ts(1),
        );

        assert_eq!(session.time_spent_in_portrait, Duration::MAX);
        assert_eq!(session.time_spent_in_foreground, Duration::MAX);
    }

    #[test]
    fn largest_millisecond_total_parses() {
        let json = r#"{
            "time_spent_in_foreground_ms": 0,
            "time_spent_in_background_ms": 0,
            "time_spent_in_portrait_ms": 9223372036854775807,
            "time_spent_in_landscape_ms": 0,
            "last_time_in_foreground": "2025-01-15T09:00:00Z",
            "last_time_in_background": "2025-01-15T09:00:00Z",
            "last_time_in_portrait": "2025-01-15T09:00:00Z",
            "last_time_in_landscape": "2025-01-15T09:00:00Z"
        }"#;
        let session: SessionState = serde_json::from_str(json).unwrap();
        assert_eq!(session.time_spent_in_portrait, Duration::MAX);
    }
}
