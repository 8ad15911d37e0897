//! droidrig - Android device and emulator helper
//!
//! Prepares Android targets for mobile test automation: finds the SDK
//! binaries, connects devices over USB or wireless debugging, creates AVDs
//! and boots emulators.
//!
//! ## Architecture
//!
//! - `droidrig-core`: configuration, errors, host platform, process runner
//! - `droidrig-android-toolchain`: SDK and binary location, `sdkmanager`
//! - `droidrig-emulator-bridge`: adb, wireless connect, AVDs, emulator boot

#![warn(clippy::all)]

pub mod commands;
pub mod prompt;

// Re-export main components for library usage
pub use droidrig_android_toolchain as toolchain;
pub use droidrig_core as core;
pub use droidrig_emulator_bridge as emulator;

pub use droidrig_core::{APP_NAME, VERSION};

/// Prelude module for convenient imports
pub mod prelude {
    pub use droidrig_android_toolchain::{AndroidTool, SdkLocator, SdkManager};
    pub use droidrig_core::{AppConfig, BinaryLocation, CommandRunner, HostPlatform, ProcessRunner};
    pub use droidrig_emulator_bridge::{AdbClient, AvdManager, EmulatorLauncher, WirelessConnect, WirelessOutcome};
}
