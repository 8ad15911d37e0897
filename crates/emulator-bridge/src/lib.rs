//! Android Emulator Bridge
//!
//! Talks to devices through adb, manages Android Virtual Devices (AVDs)
//! and boots emulator instances.

pub mod adb;
pub mod avd;
pub mod device;
pub mod emulator;
pub mod wireless;

#[cfg(test)]
mod testing;

pub use adb::{AdbClient, AdbError};
pub use avd::{AvdConfig, AvdError, AvdInfo, AvdManager};
pub use device::{Device, DeviceState, DeviceType};
pub use emulator::{BootWait, EmulatorError, EmulatorInstance, EmulatorLauncher, EmulatorOptions};
pub use wireless::{PromptError, WirelessConnect, WirelessField, WirelessOutcome, WirelessPrompter};

/// Default emulator console port
pub const DEFAULT_CONSOLE_PORT: u16 = 5554;

/// Emulator port range
pub const EMULATOR_PORT_RANGE: std::ops::Range<u16> = 5554..5586;

/// Get next available emulator port
pub fn next_emulator_port(used_ports: &[u16]) -> Option<u16> {
    EMULATOR_PORT_RANGE
        .step_by(2)
        .find(|port| !used_ports.contains(port))
}
