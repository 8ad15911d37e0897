//! ADB (Android Debug Bridge) Client
//!
//! Runs the `adb` binary and turns its replies into typed values.

pub mod output;

use std::sync::Arc;

use droidrig_core::{BinaryLocation, CommandRunner, ProcessError};
use tracing::debug;

use crate::device::Device;

/// ADB errors
#[derive(Debug, thiserror::Error)]
pub enum AdbError {
    #[error("adb not found. Install the Android SDK platform-tools.")]
    NotFound,
    #[error("Device not found: {0}")]
    DeviceNotFound(String),
    #[error("ADB command failed: {0}")]
    CommandFailed(String),
    #[error(transparent)]
    Process(ProcessError),
}

impl From<ProcessError> for AdbError {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::NotFound(_) => AdbError::NotFound,
            ProcessError::Failed { stdout, stderr, .. } => {
                let detail = if stderr.trim().is_empty() { stdout } else { stderr };
                AdbError::CommandFailed(detail.trim().to_string())
            }
            other => AdbError::Process(other),
        }
    }
}

/// ADB Client
#[derive(Clone)]
pub struct AdbClient {
    adb: BinaryLocation,
    runner: Arc<dyn CommandRunner>,
}

impl AdbClient {
    /// Create a new ADB client
    pub fn new(adb: BinaryLocation, runner: Arc<dyn CommandRunner>) -> Self {
        Self { adb, runner }
    }

    /// Check if ADB is available
    pub fn is_available(&self) -> bool {
        self.adb.is_found()
    }

    /// Run an ADB command
    async fn run(&self, args: &[&str]) -> Result<String, AdbError> {
        if !self.adb.is_found() {
            return Err(AdbError::NotFound);
        }
        debug!("adb {:?}", args);
        let output = self.runner.run(&self.adb, args).await?;
        Ok(output.stdout)
    }

    /// Run an ADB command for a specific device
    async fn run_for_device(&self, udid: &str, args: &[&str]) -> Result<String, AdbError> {
        let mut full_args = vec!["-s", udid];
        full_args.extend(args);
        self.run(&full_args).await
    }

    /// List connected devices, dropping offline ones unless `allow_offline`
    pub async fn devices(&self, allow_offline: bool) -> Result<Vec<Device>, AdbError> {
        let stdout = self.run(&["devices"]).await?;
        Ok(output::parse_devices(&stdout)
            .into_iter()
            .filter(|device| allow_offline || device.is_usable())
            .collect())
    }

    /// Get a specific device, whatever its state
    pub async fn get_device(&self, udid: &str) -> Result<Device, AdbError> {
        self.devices(true)
            .await?
            .into_iter()
            .find(|d| d.udid == udid)
            .ok_or_else(|| AdbError::DeviceNotFound(udid.to_string()))
    }

    /// `adb connect <address>`, returning the raw reply
    pub async fn connect(&self, address: &str) -> Result<String, AdbError> {
        self.run(&["connect", address]).await
    }

    /// `adb pair <address> <code>`, returning the raw reply
    pub async fn pair(&self, address: &str, code: &str) -> Result<String, AdbError> {
        self.run(&["pair", address, code]).await
    }

    /// Ask the server to reconnect devices stuck offline
    pub async fn reconnect_offline(&self) -> Result<(), AdbError> {
        self.run(&["reconnect", "offline"]).await?;
        Ok(())
    }

    /// Get device property
    pub async fn get_prop(&self, udid: &str, prop: &str) -> Result<String, AdbError> {
        let output = self.run_for_device(udid, &["shell", "getprop", prop]).await?;
        Ok(output.trim().to_string())
    }

    /// Check whether Android finished booting
    pub async fn is_boot_completed(&self, udid: &str) -> Result<bool, AdbError> {
        let value = self.get_prop(udid, "sys.boot_completed").await?;
        Ok(output::boot_completed(&value))
    }

    /// Name of the AVD running behind an emulator serial
    pub async fn emulator_avd_name(&self, udid: &str) -> Result<Option<String>, AdbError> {
        let reply = self.run_for_device(udid, &["emu", "avd", "name"]).await?;
        Ok(output::first_line(&reply).map(str::to_string))
    }
}
