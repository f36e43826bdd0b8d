//! Session time accounting.
//!
//! Derives foreground and portrait percentages from a [`SessionState`]
//! snapshot as of a given instant, counting the still-open interval of
//! whichever state is current.
//!
//! # Algorithm Summary
//!
//! 1. Extend the portrait or landscape total by the open interval, keyed on
//!    the current orientation. `Other` extends neither.
//! 2. Extend the foreground or background total the same way, keyed on the
//!    current activity state.
//! 3. Each percentage is `round(part / (part + other) * 100)`, or 100 when
//!    nothing has been accumulated yet.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::session::{SessionState, accumulate, open_interval};
use crate::types::{ActivityState, DeviceOrientation, ValidationError};

/// Which totals the reported foreground percentage is derived from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForegroundFormula {
    /// Foreground share of foreground plus background time.
    #[default]
    Fixed,
    /// Reports the portrait share as the foreground percentage, matching
    /// values already recorded by older clients.
    Legacy,
}

impl ForegroundFormula {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::Legacy => "legacy",
        }
    }
}

impl fmt::Display for ForegroundFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ForegroundFormula {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fixed" => Ok(Self::Fixed),
            "legacy" => Ok(Self::Legacy),
            _ => Err(ValidationError::InvalidForegroundFormula {
                value: s.to_string(),
            }),
        }
    }
}

/// Totals and percentages as of one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSplits {
    pub total_foreground: Duration,
    pub total_background: Duration,
    pub total_portrait: Duration,
    pub total_landscape: Duration,

    /// Foreground share of foreground plus background time, 0..=100.
    pub percent_time_in_foreground: u8,

    /// Portrait share of portrait plus landscape time, 0..=100.
    pub percent_time_in_portrait: u8,
}

impl TimeSplits {
    /// Foreground percentage under the given formula.
    #[must_use]
    pub const fn foreground_percent(&self, formula: ForegroundFormula) -> u8 {
        match formula {
            ForegroundFormula::Fixed => self.percent_time_in_foreground,
            ForegroundFormula::Legacy => self.percent_time_in_portrait,
        }
    }
}

/// Computes time splits for `session` as of `now`.
///
/// `now` should not precede any `last_time_*` of the session; an open
/// interval that would be negative counts as zero. Totals saturate at
/// [`Duration::MAX`].
pub fn compute_time_splits(
    session: &SessionState,
    now: DateTime<Utc>,
    current_orientation: DeviceOrientation,
    current_activity_state: ActivityState,
) -> TimeSplits {
    let mut total_portrait = session.time_spent_in_portrait;
    let mut total_landscape = session.time_spent_in_landscape;
    match current_orientation {
        DeviceOrientation::Portrait => {
            let elapsed = open_interval(session.last_time_in_portrait, now);
            total_portrait = accumulate(total_portrait, elapsed);
        }
        DeviceOrientation::Landscape => {
            let elapsed = open_interval(session.last_time_in_landscape, now);
            total_landscape = accumulate(total_landscape, elapsed);
        }
        DeviceOrientation::Other => {}
    }

    let mut total_foreground = session.time_spent_in_foreground;
    let mut total_background = session.time_spent_in_background;
    match current_activity_state {
        ActivityState::Active => {
            let elapsed = open_interval(session.last_time_in_foreground, now);
            total_foreground = accumulate(total_foreground, elapsed);
        }
        ActivityState::Inactive => {
            let elapsed = open_interval(session.last_time_in_background, now);
            total_background = accumulate(total_background, elapsed);
        }
    }

    TimeSplits {
        total_foreground,
        total_background,
        total_portrait,
        total_landscape,
        percent_time_in_foreground: percent_share(total_foreground, total_background),
        percent_time_in_portrait: percent_share(total_portrait, total_landscape),
    }
}

impl SessionState {
    /// Time splits as of `now`, using the session's own current states.
    pub fn time_splits(&self, now: DateTime<Utc>) -> TimeSplits {
        compute_time_splits(self, now, self.orientation, self.activity)
    }
}

/// Rounded share of `part` in `part + other`, 100 when both are zero.
fn percent_share(part: Duration, other: Duration) -> u8 {
    let part_ms = i128::from(part.num_milliseconds().max(0));
    let total_ms = part_ms + i128::from(other.num_milliseconds().max(0));
    if total_ms == 0 {
        return 100;
    }

    // Round half up in integer arithmetic.
    let percent = (part_ms * 200 + total_ms) / (total_ms * 2);
    u8::try_from(percent.clamp(0, 100)).unwrap_or(100)
}
