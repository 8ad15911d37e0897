//! Host platform identification
//!
//! The platform decides executable suffixes inside the SDK (`adb.exe`,
//! `sdkmanager.bat`) and where SDKs are usually installed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Operating system the SDK binaries are built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HostPlatform {
    Windows,
    MacOs,
    Linux,
}

impl HostPlatform {
    /// Platform this binary was compiled for
    pub fn current() -> Self {
        if cfg!(windows) {
            HostPlatform::Windows
        } else if cfg!(target_os = "macos") {
            HostPlatform::MacOs
        } else {
            HostPlatform::Linux
        }
    }

    /// Suffix of native executables (`adb`, `emulator`)
    pub fn exe_suffix(&self) -> &'static str {
        match self {
            HostPlatform::Windows => ".exe",
            _ => "",
        }
    }

    /// Suffix of the cmdline-tools launcher scripts (`sdkmanager`, `avdmanager`)
    pub fn script_suffix(&self) -> &'static str {
        match self {
            HostPlatform::Windows => ".bat",
            _ => "",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HostPlatform::Windows => "win32",
            HostPlatform::MacOs => "darwin",
            HostPlatform::Linux => "linux",
        }
    }
}

impl Default for HostPlatform {
    fn default() -> Self {
        Self::current()
    }
}

impl fmt::Display for HostPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HostPlatform {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "win32" | "windows" | "win" => Ok(HostPlatform::Windows),
            "darwin" | "macos" | "mac" | "osx" => Ok(HostPlatform::MacOs),
            "linux" => Ok(HostPlatform::Linux),
            _ => Err(CoreError::UnknownPlatform(s.to_string())),
        }
    }
}
