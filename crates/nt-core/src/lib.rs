//! Core domain logic for navigation telemetry metadata.
//!
//! This crate contains the fundamental types and logic for:
//! - Session state: cumulative foreground/background and portrait/landscape time
//! - Accounting: percentage splits including the still-open interval
//! - Device readings: brightness, volume, audio route and battery derivations
//! - UI thread: blocking reads of state owned by a designated thread
//! - Metadata: the snapshot attached to each analytics event

mod accounting;
pub mod device;
pub mod metadata;
pub mod session;
pub mod types;
pub mod ui_thread;

pub use accounting::{ForegroundFormula, TimeSplits, compute_time_splits};
pub use device::{AudioPort, AudioType, BatteryState, DeviceReadings};
pub use metadata::{AppMetadata, EventsMetadata, EventsMetadataProvider, ProviderError};
pub use session::{LifecycleEvent, SessionState, TimedLifecycleEvent, replay};
pub use types::{ActivityState, DeviceOrientation, SessionId, UserId, ValidationError};
pub use ui_thread::{ApplicationLifecycle, UiThread, UiThreadError};
