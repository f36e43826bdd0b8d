//! Device and OS accessors, and the readings derived from them.
//!
//! Accessors are traits so the host can hand in real platform handles and
//! tests can hand in fixed readings. Nothing here caches: every derivation
//! queries its accessor when called.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::DeviceOrientation;

/// Display brightness.
///
/// Platforms generally only allow this to be read from the UI thread; callers
/// are responsible for invoking it there.
pub trait Screen {
    /// Brightness as a fraction in `0.0..=1.0`.
    fn brightness(&self) -> f64;
}

/// Audio output state.
pub trait AudioSession {
    /// Output volume as a fraction in `0.0..=1.0`.
    fn output_volume(&self) -> f64;

    /// Ports in the current output route.
    fn output_ports(&self) -> Vec<AudioPort>;
}

/// Battery and orientation state of the device.
pub trait Device {
    fn battery_state(&self) -> BatteryState;

    /// Charge as a fraction in `0.0..=1.0`, negative when unknown
    /// (for example while battery monitoring is disabled).
    fn battery_level(&self) -> f64;

    fn orientation(&self) -> DeviceOrientation;
}

/// Charging state reported by the OS.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatteryState {
    #[default]
    Unknown,
    Unplugged,
    Charging,
    Full,
}

/// Kind of an audio output port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioPort {
    BluetoothA2dp,
    BluetoothHfp,
    BluetoothLe,
    Headphones,
    AirPlay,
    Hdmi,
    LineOut,
    CarAudio,
    UsbAudio,
    BuiltInSpeaker,
    BuiltInReceiver,
    #[serde(other)]
    Other,
}

impl AudioPort {
    const fn category(self) -> AudioType {
        match self {
            Self::BluetoothA2dp | Self::BluetoothHfp | Self::BluetoothLe => AudioType::Bluetooth,
            Self::Headphones
            | Self::AirPlay
            | Self::Hdmi
            | Self::LineOut
            | Self::CarAudio
            | Self::UsbAudio => AudioType::Headphones,
            Self::BuiltInSpeaker | Self::BuiltInReceiver => AudioType::Speaker,
            Self::Other => AudioType::Unknown,
        }
    }
}

/// Audio route category reported in telemetry.
///
/// Variants are declared in priority order: when several outputs are active
/// the earliest matching category wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AudioType {
    Bluetooth,
    Headphones,
    Speaker,
    Unknown,
}

impl AudioType {
    /// Integer code used on the wire.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Bluetooth => 0,
            Self::Headphones => 1,
            Self::Speaker => 2,
            Self::Unknown => 3,
        }
    }

    /// Inverse of [`AudioType::code`].
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Bluetooth),
            1 => Some(Self::Headphones),
            2 => Some(Self::Speaker),
            3 => Some(Self::Unknown),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bluetooth => "bluetooth",
            Self::Headphones => "headphones",
            Self::Speaker => "speaker",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for AudioType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for AudioType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u8(self.code())
    }
}

impl<'de> Deserialize<'de> for AudioType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let code = u8::deserialize(deserializer)?;
        Self::from_code(code)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown audio type code: {code}")))
    }
}

/// Screen brightness as a whole percentage.
pub fn screen_brightness_percent<S: Screen + ?Sized>(screen: &S) -> u8 {
    fraction_percent(screen.brightness())
}

/// Output volume as a whole percentage.
pub fn volume_percent<A: AudioSession + ?Sized>(audio: &A) -> u8 {
    fraction_percent(audio.output_volume())
}

/// Classifies the current output route.
pub fn audio_route_category<A: AudioSession + ?Sized>(audio: &A) -> AudioType {
    audio
        .output_ports()
        .into_iter()
        .map(AudioPort::category)
        .min()
        .unwrap_or(AudioType::Unknown)
}

/// True while the device is on external power.
pub fn battery_is_plugged_in<D: Device + ?Sized>(device: &D) -> bool {
    matches!(
        device.battery_state(),
        BatteryState::Charging | BatteryState::Full
    )
}

/// Battery charge as a whole percentage, or `-1` when the level is unknown.
pub fn battery_level_percent<D: Device + ?Sized>(device: &D) -> i8 {
    let level = device.battery_level();
    if level < 0.0 {
        return -1;
    }
    // fraction_percent never exceeds 100, so this always fits.
    i8::try_from(fraction_percent(level)).unwrap_or(100)
}

/// Scales a fraction to 0..=100, clamping out-of-range input; NaN reads as 0.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "value is clamped to 0..=100 before the cast"
)]
fn fraction_percent(fraction: f64) -> u8 {
    if fraction.is_nan() {
        return 0;
    }
    (fraction.clamp(0.0, 1.0) * 100.0).round() as u8
}

/// A fixed set of device readings.
///
/// Implements every accessor trait, for hosts that sample the platform once
/// and for tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceReadings {
    #[serde(default)]
    pub screen_brightness: f64,
    #[serde(default)]
    pub output_volume: f64,
    #[serde(default)]
    pub output_ports: Vec<AudioPort>,
    #[serde(default)]
    pub battery_state: BatteryState,
    #[serde(default = "unknown_battery_level")]
    pub battery_level: f64,
    #[serde(default = "unknown_orientation")]
    pub orientation: DeviceOrientation,
}

const fn unknown_battery_level() -> f64 {
    -1.0
}

const fn unknown_orientation() -> DeviceOrientation {
    DeviceOrientation::Other
}

impl Default for DeviceReadings {
    fn default() -> Self {
        Self {
            screen_brightness: 0.0,
            output_volume: 0.0,
            output_ports: Vec::new(),
            battery_state: BatteryState::Unknown,
            battery_level: unknown_battery_level(),
            orientation: unknown_orientation(),
        }
    }
}

impl Screen for DeviceReadings {
    fn brightness(&self) -> f64 {
        self.screen_brightness
    }
}

impl AudioSession for DeviceReadings {
    fn output_volume(&self) -> f64 {
        self.output_volume
    }

    fn output_ports(&self) -> Vec<AudioPort> {
        self.output_ports.clone()
    }
}

impl Device for DeviceReadings {
    fn battery_state(&self) -> BatteryState {
        self.battery_state
    }

    fn battery_level(&self) -> f64 {
        self.battery_level
    }

    fn orientation(&self) -> DeviceOrientation {
        self.orientation
    }
}
