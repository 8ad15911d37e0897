//! Emulator Launcher
//!
//! Starts emulator instances and waits until Android has booted.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use droidrig_core::{BinaryLocation, CommandRunner, EmulatorSettings, ProcessError, SpawnedProcess};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::adb::AdbClient;
use crate::device::{Device, DeviceState};

/// Emulator errors
#[derive(Debug, thiserror::Error)]
pub enum EmulatorError {
    #[error("emulator binary not found. Install the Android emulator package.")]
    NotFound,
    #[error("adb not found. Install the Android SDK platform-tools.")]
    AdbNotFound,
    #[error("No free emulator port in 5554-5584")]
    NoFreePort,
    #[error("Failed to start emulator: {0}")]
    StartFailed(String),
    #[error("{udid} did not finish booting within {secs}s")]
    BootTimeout { udid: String, secs: u64 },
    #[error("Emulator for {avd} exited before booting (exit code {code:?}): {output} (log: {})", .log.display())]
    Crashed {
        avd: String,
        code: Option<i32>,
        output: String,
        log: PathBuf,
    },
}

/// Emulator launch options
#[derive(Debug, Clone, Default)]
pub struct EmulatorOptions {
    /// Port for console
    pub port: Option<u16>,
    /// Enable/disable window
    pub no_window: bool,
    /// Enable/disable boot animation
    pub no_boot_anim: bool,
    /// Enable cold boot
    pub cold_boot: bool,
    /// GPU mode (auto, host, swiftshader_indirect, etc.)
    pub gpu: Option<String>,
}

impl EmulatorOptions {
    /// Options for headless/CI environments
    pub fn headless() -> Self {
        Self {
            no_window: true,
            no_boot_anim: true,
            gpu: Some("swiftshader_indirect".to_string()),
            ..Default::default()
        }
    }

    /// Convert to command line arguments
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if let Some(ref gpu) = self.gpu {
            args.push("-gpu".to_string());
            args.push(gpu.clone());
        }

        if self.no_window {
            args.push("-no-window".to_string());
        }

        if self.no_boot_anim {
            args.push("-no-boot-anim".to_string());
        }

        if self.cold_boot {
            args.push("-no-snapshot-load".to_string());
        }

        args
    }
}

/// Boot-wait polling settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootWait {
    pub timeout: Duration,
    pub poll_interval: Duration,
    /// Consecutive offline polls before asking adb to reconnect
    pub offline_retries: u32,
}

impl From<&EmulatorSettings> for BootWait {
    fn from(settings: &EmulatorSettings) -> Self {
        Self {
            timeout: Duration::from_secs(settings.boot_timeout_secs),
            poll_interval: Duration::from_millis(settings.poll_interval_ms),
            offline_retries: settings.offline_retries,
        }
    }
}

impl Default for BootWait {
    fn default() -> Self {
        Self::from(&EmulatorSettings::default())
    }
}

/// A launched emulator
#[derive(Debug)]
pub struct EmulatorInstance {
    pub avd_name: String,
    pub port: u16,
    /// Where the emulator's stdout and stderr go
    pub log_file: PathBuf,
    process: SpawnedProcess,
}

impl EmulatorInstance {
    /// Get the serial for ADB
    pub fn udid(&self) -> String {
        format!("emulator-{}", self.port)
    }

    pub fn pid(&self) -> Option<u32> {
        self.process.pid
    }
}

/// Emulator launcher
pub struct EmulatorLauncher {
    emulator: BinaryLocation,
    adb: AdbClient,
    runner: Arc<dyn CommandRunner>,
    boot_wait: BootWait,
    log_dir: PathBuf,
}

impl EmulatorLauncher {
    /// Create a new emulator launcher
    pub fn new(emulator: BinaryLocation, adb: AdbClient, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            emulator,
            adb,
            runner,
            boot_wait: BootWait::default(),
            log_dir: std::env::temp_dir(),
        }
    }

    pub fn with_boot_wait(mut self, boot_wait: BootWait) -> Self {
        self.boot_wait = boot_wait;
        self
    }

    /// Directory for emulator output logs
    pub fn with_log_dir(mut self, log_dir: PathBuf) -> Self {
        self.log_dir = log_dir;
        self
    }

    /// Check if emulator is available
    pub fn is_available(&self) -> bool {
        self.emulator.is_found()
    }

    /// Serial of a running emulator for this AVD, if any
    ///
    /// Offline emulators count: they are usually still booting.
    pub async fn find_running(&self, avd_name: &str) -> Option<String> {
        let devices = self.adb.devices(true).await.ok()?;
        for device in devices.iter().filter(|d| d.is_emulator()) {
            match self.adb.emulator_avd_name(&device.udid).await {
                Ok(Some(name)) if name == avd_name => return Some(device.udid.clone()),
                Ok(_) => {}
                Err(e) => debug!("Could not ask {} for its AVD: {}", device.udid, e),
            }
        }
        None
    }

    /// Launch an emulator without waiting for it to boot
    pub async fn launch(&self, avd_name: &str, options: &EmulatorOptions) -> Result<EmulatorInstance, EmulatorError> {
        if !self.emulator.is_found() {
            return Err(EmulatorError::NotFound);
        }

        let port = match options.port {
            Some(port) => port,
            None => {
                let used: Vec<u16> = match self.adb.devices(true).await {
                    Ok(devices) => devices.iter().filter_map(Device::emulator_port).collect(),
                    Err(e) => {
                        debug!("Could not list devices before launch: {}", e);
                        Vec::new()
                    }
                };
                crate::next_emulator_port(&used).ok_or(EmulatorError::NoFreePort)?
            }
        };

        info!("Launching emulator {} on port {}", avd_name, port);

        let mut args = vec![
            "-avd".to_string(),
            avd_name.to_string(),
            "-port".to_string(),
            port.to_string(),
        ];
        args.extend(options.to_args());
        debug!("Emulator args: {:?}", args);

        let log_file = self.log_dir.join(format!("droidrig-emulator-{}.log", port));
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let process = self
            .runner
            .spawn_detached(&self.emulator, &arg_refs, Some(&log_file))
            .await
            .map_err(|e| match e {
                ProcessError::NotFound(_) => EmulatorError::NotFound,
                other => EmulatorError::StartFailed(other.to_string()),
            })?;
        debug!("Emulator output goes to {:?}", log_file);

        Ok(EmulatorInstance {
            avd_name: avd_name.to_string(),
            port,
            log_file,
            process,
        })
    }

    /// Poll until the device is online and `sys.boot_completed` is 1
    pub async fn wait_for_boot(&self, udid: &str) -> Result<Device, EmulatorError> {
        self.poll_boot(udid, None).await
    }

    /// Like [`EmulatorLauncher::wait_for_boot`], failing as soon as the
    /// launched process exits
    pub async fn wait_for_instance(&self, instance: &mut EmulatorInstance) -> Result<Device, EmulatorError> {
        let udid = instance.udid();
        self.poll_boot(&udid, Some(instance)).await
    }

    async fn poll_boot(&self, udid: &str, mut instance: Option<&mut EmulatorInstance>) -> Result<Device, EmulatorError> {
        if !self.adb.is_available() {
            return Err(EmulatorError::AdbNotFound);
        }

        info!("Waiting for {} to boot...", udid);
        let deadline = Instant::now() + self.boot_wait.timeout;
        // 0 in the config still nudges after every offline poll
        let reconnect_after = self.boot_wait.offline_retries.max(1);
        let mut offline_streak = 0u32;

        loop {
            if let Some(instance) = instance.as_deref_mut() {
                if let Some(exit) = instance.process.try_exit() {
                    warn!("Emulator for {} exited with {:?}", instance.avd_name, exit.code);
                    return Err(EmulatorError::Crashed {
                        avd: instance.avd_name.clone(),
                        code: exit.code,
                        output: log_tail(&instance.log_file).await,
                        log: instance.log_file.clone(),
                    });
                }
            }

            match self.adb.get_device(udid).await {
                Ok(device) => match device.state {
                    DeviceState::Online => {
                        offline_streak = 0;
                        match self.adb.is_boot_completed(udid).await {
                            Ok(true) => {
                                info!("{} booted", udid);
                                return Ok(device);
                            }
                            Ok(false) => debug!("{} online, still booting", udid),
                            Err(e) => debug!("boot check on {} failed: {}", udid, e),
                        }
                    }
                    DeviceState::Offline => {
                        offline_streak += 1;
                        debug!("{} offline ({} polls)", udid, offline_streak);
                        if offline_streak >= reconnect_after {
                            warn!("{} stuck offline, asking adb to reconnect", udid);
                            if let Err(e) = self.adb.reconnect_offline().await {
                                warn!("adb reconnect offline failed: {}", e);
                            }
                            offline_streak = 0;
                        }
                    }
                    ref state => debug!("{} is {}", udid, state.as_str()),
                },
                Err(e) => debug!("{} not listed yet: {}", udid, e),
            }

            if Instant::now() + self.boot_wait.poll_interval > deadline {
                return Err(EmulatorError::BootTimeout {
                    udid: udid.to_string(),
                    secs: self.boot_wait.timeout.as_secs(),
                });
            }
            tokio::time::sleep(self.boot_wait.poll_interval).await;
        }
    }

    /// Launch an AVD, or reuse a running one, and wait for boot
    pub async fn start(&self, avd_name: &str, options: &EmulatorOptions) -> Result<Device, EmulatorError> {
        if let Some(udid) = self.find_running(avd_name).await {
            info!("{} is already running as {}", avd_name, udid);
            return self.wait_for_boot(&udid).await;
        }

        let mut instance = self.launch(avd_name, options).await?;
        self.wait_for_instance(&mut instance).await
    }
}

/// Last lines of an emulator log, empty when unreadable
async fn log_tail(path: &Path) -> String {
    const TAIL_LINES: usize = 20;

    match tokio::fs::read_to_string(path).await {
        Ok(contents) => {
            let lines: Vec<&str> = contents.lines().filter(|l| !l.trim().is_empty()).collect();
            lines[lines.len().saturating_sub(TAIL_LINES)..].join("\n")
        }
        Err(e) => {
            debug!("Could not read {:?}: {}", path, e);
            String::new()
        }
    }
}
