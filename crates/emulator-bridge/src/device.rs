//! Device Types and State
//!
//! Represents Android devices (physical, wireless and emulated) as reported
//! by `adb devices`.

use serde::{Serialize, Serializer};

/// Device state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceState {
    /// Device is online and ready
    Online,
    /// Device is offline
    Offline,
    /// Device is not authorized (need to accept on device)
    Unauthorized,
    /// Device is in bootloader mode
    Bootloader,
    /// Device is in recovery mode
    Recovery,
    /// Device is in sideload mode
    Sideload,
    /// Anything else adb reports, kept verbatim
    Other(String),
}

impl DeviceState {
    pub fn parse(state: &str) -> Self {
        match state {
            "device" => DeviceState::Online,
            "offline" => DeviceState::Offline,
            "unauthorized" => DeviceState::Unauthorized,
            "bootloader" => DeviceState::Bootloader,
            "recovery" => DeviceState::Recovery,
            "sideload" => DeviceState::Sideload,
            other => DeviceState::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            DeviceState::Online => "device",
            DeviceState::Offline => "offline",
            DeviceState::Unauthorized => "unauthorized",
            DeviceState::Bootloader => "bootloader",
            DeviceState::Recovery => "recovery",
            DeviceState::Sideload => "sideload",
            DeviceState::Other(state) => state,
        }
    }

    pub fn is_usable(&self) -> bool {
        matches!(self, DeviceState::Online)
    }
}

impl Serialize for DeviceState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Device type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    /// Physical device connected via USB
    Physical,
    /// Device connected over the network (`<ip>:<port>`)
    Wireless,
    /// Android emulator
    Emulator,
}

/// Device information
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Device {
    /// Device serial or `emulator-<port>`
    pub udid: String,
    /// Device state
    pub state: DeviceState,
    /// Device type
    #[serde(rename = "type")]
    pub device_type: DeviceType,
}

impl Device {
    pub fn new(udid: &str, state: &str) -> Self {
        let device_type = if udid.starts_with("emulator-") {
            DeviceType::Emulator
        } else if udid.contains(':') {
            DeviceType::Wireless
        } else {
            DeviceType::Physical
        };

        Self {
            udid: udid.to_string(),
            state: DeviceState::parse(state),
            device_type,
        }
    }

    /// Check if device is online and usable
    pub fn is_usable(&self) -> bool {
        self.state.is_usable()
    }

    /// Check if this is an emulator
    pub fn is_emulator(&self) -> bool {
        self.device_type == DeviceType::Emulator
    }

    /// Console port of an emulator (`emulator-5554` → 5554)
    pub fn emulator_port(&self) -> Option<u16> {
        self.udid.strip_prefix("emulator-")?.parse().ok()
    }

    /// Get display name
    pub fn display_name(&self) -> String {
        format!("{} ({})", self.udid, self.state.as_str())
    }
}
