//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// Unrecognized device orientation.
    #[error("invalid orientation: {value}")]
    InvalidOrientation { value: String },

    /// Unrecognized application activity state.
    #[error("invalid activity state: {value}")]
    InvalidActivityState { value: String },

    /// Unrecognized foreground formula.
    #[error("invalid foreground formula: {value}")]
    InvalidForegroundFormula { value: String },
}

/// Physical orientation of the device as reported by the OS.
///
/// Face up, face down and unknown readings all collapse into `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceOrientation {
    Portrait,
    Landscape,
    Other,
}

impl DeviceOrientation {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Portrait => "portrait",
            Self::Landscape => "landscape",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for DeviceOrientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DeviceOrientation {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "portrait" => Ok(Self::Portrait),
            "landscape" => Ok(Self::Landscape),
            "other" | "flat" | "unknown" => Ok(Self::Other),
            _ => Err(ValidationError::InvalidOrientation {
                value: s.to_string(),
            }),
        }
    }
}

/// Whether the application is currently in the foreground.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityState {
    /// Foreground and receiving events.
    Active,
    /// Backgrounded, suspended or transitioning.
    Inactive,
}

impl ActivityState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

impl fmt::Display for ActivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ActivityState {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" | "foreground" => Ok(Self::Active),
            "inactive" | "background" => Ok(Self::Inactive),
            _ => Err(ValidationError::InvalidActivityState {
                value: s.to_string(),
            }),
        }
    }
}

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_string_id!(
    /// Identifies the end user the telemetry belongs to.
    UserId, "user ID"
);

define_string_id!(
    /// Identifies one telemetry session.
    ///
    /// Generated as a v4 UUID unless the host application supplies its own.
    SessionId, "session ID"
);

impl SessionId {
    /// Generates a fresh random session ID.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}
