//! AVD (Android Virtual Device) Manager
//!
//! Creates and lists Android Virtual Devices.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use configparser::ini::Ini;
use droidrig_core::{BinaryLocation, CommandRunner, ProcessError};
use serde::Serialize;
use tracing::{debug, info, warn};

/// AVD Manager errors
#[derive(Debug, thiserror::Error)]
pub enum AvdError {
    #[error("avdmanager not found. Install the Android command-line tools.")]
    ManagerNotFound,
    #[error("Invalid AVD name '{0}': use letters, digits, '.', '_' and '-'")]
    InvalidName(String),
    #[error("Failed to create AVD: {0}")]
    CreateFailed(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
}

/// AVD information
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AvdInfo {
    pub name: String,
    pub path: Option<PathBuf>,
    /// `image.sysdir.1`, e.g. `system-images/android-34/google_apis/x86_64/`
    pub target: Option<String>,
    pub abi: Option<String>,
    pub device_name: Option<String>,
}

/// AVD configuration for creation
#[derive(Debug, Clone)]
pub struct AvdConfig {
    pub name: String,
    /// system image package
    pub package: String,
    /// device profile
    pub device: Option<String>,
    pub force: bool,
}

impl AvdConfig {
    pub fn new(name: &str, package: &str) -> Self {
        Self {
            name: name.to_string(),
            package: package.to_string(),
            device: None,
            force: false,
        }
    }

    pub fn device(mut self, device: &str) -> Self {
        self.device = Some(device.to_string());
        self
    }
}

/// Check an AVD name against what avdmanager accepts
pub fn is_valid_avd_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

/// Default AVD directory
///
/// `ANDROID_AVD_HOME`, else `$ANDROID_USER_HOME/avd`, else `~/.android/avd`.
pub fn default_avd_home() -> PathBuf {
    if let Some(home) = env::var_os("ANDROID_AVD_HOME") {
        return PathBuf::from(home);
    }
    if let Some(user_home) = env::var_os("ANDROID_USER_HOME") {
        return PathBuf::from(user_home).join("avd");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".android")
        .join("avd")
}

/// AVD Manager
pub struct AvdManager {
    avdmanager: BinaryLocation,
    emulator: BinaryLocation,
    avd_home: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

impl AvdManager {
    /// Create a new AVD manager
    pub fn new(avdmanager: BinaryLocation, emulator: BinaryLocation, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            avdmanager,
            emulator,
            avd_home: default_avd_home(),
            runner,
        }
    }

    /// Read AVD definitions from another directory
    pub fn with_avd_home(mut self, avd_home: PathBuf) -> Self {
        self.avd_home = avd_home;
        self
    }

    /// List all available AVDs
    ///
    /// Asks `emulator -list-avds` first and falls back to the AVD directory.
    pub async fn list_avds(&self) -> Result<Vec<AvdInfo>, AvdError> {
        let names = match self.names_from_emulator().await {
            Some(names) => names,
            None => self.names_from_disk().await?,
        };

        let mut avds = Vec::with_capacity(names.len());
        for name in names {
            let info = match self.read_avd_info(&name).await {
                Ok(info) => info,
                Err(e) => {
                    debug!("No readable config for AVD {}: {}", name, e);
                    AvdInfo {
                        name,
                        ..Default::default()
                    }
                }
            };
            avds.push(info);
        }
        Ok(avds)
    }

    async fn names_from_emulator(&self) -> Option<Vec<String>> {
        if !self.emulator.is_found() {
            return None;
        }

        match self.runner.run(&self.emulator, &["-list-avds"]).await {
            Ok(output) => Some(parse_avd_names(&output.stdout)),
            Err(e) => {
                warn!("emulator -list-avds failed: {}", e);
                None
            }
        }
    }

    async fn names_from_disk(&self) -> Result<Vec<String>, AvdError> {
        let mut names = Vec::new();
        if !self.avd_home.exists() {
            return Ok(names);
        }

        let mut entries = tokio::fs::read_dir(&self.avd_home).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map(|e| e == "ini").unwrap_or(false) {
                if let Some(name) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Parse AVD info from `<name>.ini` and the AVD's `config.ini`
    async fn read_avd_info(&self, name: &str) -> Result<AvdInfo, AvdError> {
        let ini_path = self.avd_home.join(format!("{}.ini", name));
        let content = tokio::fs::read_to_string(&ini_path).await?;
        let ini = parse_ini(content)?;

        let avd_path = ini
            .get("default", "path")
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| self.avd_home.join(format!("{}.avd", name)));

        let mut info = AvdInfo {
            name: name.to_string(),
            path: Some(avd_path.clone()),
            ..Default::default()
        };

        let config_path = avd_path.join("config.ini");
        if config_path.exists() {
            let config = parse_ini(tokio::fs::read_to_string(&config_path).await?)?;
            info.target = config.get("default", "image.sysdir.1");
            info.abi = config.get("default", "abi.type");
            info.device_name = config.get("default", "hw.device.name");
        }

        Ok(info)
    }

    /// Create a new AVD
    pub async fn create_avd(&self, config: &AvdConfig) -> Result<(), AvdError> {
        if !is_valid_avd_name(&config.name) {
            return Err(AvdError::InvalidName(config.name.clone()));
        }
        if !self.avdmanager.is_found() {
            return Err(AvdError::ManagerNotFound);
        }

        info!("Creating AVD: {}", config.name);

        let mut args = vec!["create", "avd", "-n", config.name.as_str(), "-k", config.package.as_str()];
        if let Some(ref device) = config.device {
            args.push("-d");
            args.push(device.as_str());
        }
        if config.force {
            args.push("--force");
        }

        // Answer "no" to the custom hardware profile question
        self.runner
            .run_with_input(&self.avdmanager, &args, "no\n")
            .await
            .map_err(|e| match e {
                ProcessError::NotFound(_) => AvdError::ManagerNotFound,
                ProcessError::Failed { stderr, stdout, .. } => {
                    let detail = if stderr.trim().is_empty() { stdout } else { stderr };
                    AvdError::CreateFailed(detail.trim().to_string())
                }
                other => AvdError::CreateFailed(other.to_string()),
            })?;

        info!("AVD created successfully: {}", config.name);
        Ok(())
    }
}

/// Parse `emulator -list-avds`, ignoring the emulator's own log lines
pub fn parse_avd_names(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| is_valid_avd_name(line))
        .map(str::to_string)
        .collect()
}

fn parse_ini(content: String) -> Result<Ini, AvdError> {
    let mut ini = Ini::new_cs();
    ini.read(content).map_err(AvdError::Parse)?;
    Ok(ini)
}
