//! Android Toolchain
//!
//! Finds the Android SDK and the vendor binaries inside it:
//! - `adb` (platform-tools)
//! - `emulator`
//! - `sdkmanager` and `avdmanager` (cmdline-tools)

pub mod locator;
pub mod sdk_manager;

pub use locator::{detect_sdk_root, AndroidTool, SdkLocator};
pub use sdk_manager::{SdkManager, SdkManagerError, SystemImage};

/// Oldest API level with wireless debugging (`adb pair`)
pub const WIRELESS_PAIRING_MIN_API: u32 = 30;
