//! SDK Manager
//!
//! Wraps `sdkmanager` to list and install system images.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use droidrig_core::{BinaryLocation, CommandRunner, ProcessError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info};

/// Answers to every license prompt sdkmanager may show
const LICENSE_ANSWERS: &str = "y\ny\ny\ny\ny\ny\ny\ny\ny\ny\ny\ny\ny\ny\ny\ny\ny\ny\ny\ny\n";

static SYSTEM_IMAGE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^system-images;android-(\d+)[^;]*;([^;]+);([^;\s]+)$").expect("system image pattern is valid")
});

/// An emulator system image package
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemImage {
    /// `system-images;android-<api>;<tag>;<abi>`
    pub package: String,
    pub api_level: u32,
    /// google_apis, google_apis_playstore, default, ...
    pub tag: String,
    /// x86_64, arm64-v8a, ...
    pub abi: String,
    pub description: String,
    pub installed: bool,
}

impl SystemImage {
    /// Parse a package path, returning `None` for anything but a system image
    pub fn from_package(package: &str) -> Option<Self> {
        let caps = SYSTEM_IMAGE_REGEX.captures(package.trim())?;

        Some(Self {
            package: package.trim().to_string(),
            api_level: caps[1].parse().ok()?,
            tag: caps[2].to_string(),
            abi: caps[3].to_string(),
            description: String::new(),
            installed: false,
        })
    }

    /// Check if this has Google Play
    pub fn has_play_store(&self) -> bool {
        self.tag.contains("playstore")
    }

    /// One-line label for selection prompts
    pub fn label(&self) -> String {
        let state = if self.installed { "installed" } else { "available" };
        format!("API {} | {} | {} ({})", self.api_level, self.tag, self.abi, state)
    }
}

/// SDK Manager errors
#[derive(Debug, thiserror::Error)]
pub enum SdkManagerError {
    #[error("sdkmanager not found. Install the Android command-line tools.")]
    SdkManagerNotFound,
    #[error("sdkmanager failed: {0}")]
    CommandFailed(String),
    #[error(transparent)]
    Process(ProcessError),
}

impl From<ProcessError> for SdkManagerError {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::NotFound(_) => SdkManagerError::SdkManagerNotFound,
            ProcessError::Failed { stderr, stdout, .. } => {
                let detail = if stderr.trim().is_empty() { stdout } else { stderr };
                SdkManagerError::CommandFailed(detail.trim().to_string())
            }
            other => SdkManagerError::Process(other),
        }
    }
}

/// Android SDK Manager wrapper
pub struct SdkManager {
    sdkmanager: BinaryLocation,
    sdk_root: Option<PathBuf>,
    runner: Arc<dyn CommandRunner>,
}

impl SdkManager {
    /// Create a new SDK manager
    pub fn new(
        sdkmanager: BinaryLocation,
        sdk_root: Option<PathBuf>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            sdkmanager,
            sdk_root,
            runner,
        }
    }

    pub fn is_available(&self) -> bool {
        self.sdkmanager.is_found()
    }

    fn base_args(&self) -> Vec<String> {
        self.sdk_root
            .iter()
            .map(|root| format!("--sdk_root={}", root.display()))
            .collect()
    }

    async fn run(&self, extra: &[&str], input: Option<&str>) -> Result<String, SdkManagerError> {
        if !self.sdkmanager.is_found() {
            return Err(SdkManagerError::SdkManagerNotFound);
        }

        let base = self.base_args();
        let mut args: Vec<&str> = base.iter().map(String::as_str).collect();
        args.extend_from_slice(extra);

        let output = match input {
            Some(input) => self.runner.run_with_input(&self.sdkmanager, &args, input).await?,
            None => self.runner.run(&self.sdkmanager, &args).await?,
        };
        Ok(output.stdout)
    }

    /// List installed and available system images, newest API first
    pub async fn list_system_images(&self) -> Result<Vec<SystemImage>, SdkManagerError> {
        debug!("Listing system images...");
        let stdout = self.run(&["--list"], None).await?;
        Ok(parse_system_images(&stdout))
    }

    /// Install packages, answering yes to license prompts
    pub async fn install(&self, packages: &[&str]) -> Result<(), SdkManagerError> {
        info!("Installing SDK packages: {:?}", packages);
        let output = self.run(packages, Some(LICENSE_ANSWERS)).await?;
        for line in output.lines().filter(|l| !l.trim().is_empty()) {
            debug!("sdkmanager: {}", line.trim());
        }
        info!("SDK packages installed successfully");
        Ok(())
    }

    /// Accept all licenses
    pub async fn accept_licenses(&self) -> Result<(), SdkManagerError> {
        info!("Accepting Android SDK licenses...");
        self.run(&["--licenses"], Some(LICENSE_ANSWERS)).await?;
        Ok(())
    }
}

#[derive(PartialEq)]
enum Section {
    None,
    Installed,
    Available,
}

/// Parse `sdkmanager --list` tables into system images
pub fn parse_system_images(output: &str) -> Vec<SystemImage> {
    let mut images: BTreeMap<String, SystemImage> = BTreeMap::new();
    let mut section = Section::None;

    for line in output.lines() {
        let line = line.trim();

        if line.starts_with("Installed packages:") {
            section = Section::Installed;
            continue;
        }
        if line.starts_with("Available Packages:") {
            section = Section::Available;
            continue;
        }
        if line.starts_with("Available Updates:") {
            section = Section::None;
            continue;
        }
        if section == Section::None || line.is_empty() || line.starts_with("---") || line.starts_with("Path") {
            continue;
        }

        let parts: Vec<&str> = line.split('|').map(str::trim).collect();
        let Some(mut image) = parts.first().and_then(|p| SystemImage::from_package(p)) else {
            continue;
        };
        image.description = parts.get(2).map(|d| d.to_string()).unwrap_or_default();
        image.installed = section == Section::Installed;
        let installed = image.installed;

        // An installed row wins over the same package in the available table
        images
            .entry(image.package.clone())
            .and_modify(|existing| existing.installed |= installed)
            .or_insert(image);
    }

    let mut images: Vec<SystemImage> = images.into_values().collect();
    images.sort_by(|a, b| {
        b.api_level
            .cmp(&a.api_level)
            .then_with(|| a.tag.cmp(&b.tag))
            .then_with(|| a.abi.cmp(&b.abi))
    });
    images
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use droidrig_core::{CommandOutput, SpawnedProcess};
    use std::sync::Mutex;

    const LIST_OUTPUT: &str = "\
Installed packages:
  Path                                        | Version | Description                                | Location
  -------                                     | ------- | -------                                    | -------
  build-tools;34.0.0                          | 34.0.0  | Android SDK Build-Tools 34                 | build-tools/34.0.0/
  system-images;android-33;google_apis;x86_64 | 14      | Google APIs Intel x86_64 Atom System Image | system-images/android-33/google_apis/x86_64/

Available Packages:
  Path                                                  | Version | Description
  -------                                               | ------- | -------
  platforms;android-34                                  | 3       | Android SDK Platform 34
  system-images;android-33;google_apis;x86_64           | 14      | Google APIs Intel x86_64 Atom System Image
  system-images;android-34;google_apis_playstore;arm64-v8a | 12   | Google Play ARM 64 v8a System Image
  system-images;android-34-ext10;google_apis;x86_64     | 1       | Google APIs with extension level 10

Available Updates:
  ID                                          | Installed | Available
  system-images;android-30;default;x86        | 1         | 2
";

    #[test]
    fn test_parse_system_images() {
        let images = parse_system_images(LIST_OUTPUT);
        let packages: Vec<&str> = images.iter().map(|i| i.package.as_str()).collect();
        assert_eq!(
            packages,
            vec![
                "system-images;android-34-ext10;google_apis;x86_64",
                "system-images;android-34;google_apis_playstore;arm64-v8a",
                "system-images;android-33;google_apis;x86_64",
            ]
        );

        let installed = images.iter().find(|i| i.api_level == 33).unwrap();
        assert!(installed.installed);
        assert_eq!(installed.description, "Google APIs Intel x86_64 Atom System Image");

        let play = &images[1];
        assert!(play.has_play_store());
        assert!(!play.installed);
        assert_eq!(play.abi, "arm64-v8a");
    }

    #[test]
    fn test_from_package_rejects_other_packages() {
        assert!(SystemImage::from_package("platforms;android-34").is_none());
        assert!(SystemImage::from_package("system-images;android-Tiramisu;google_apis;x86_64").is_none());
        let image = SystemImage::from_package("system-images;android-30;default;x86").unwrap();
        assert_eq!((image.api_level, image.tag.as_str()), (30, "default"));
    }

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(Vec<String>, Option<String>)>>,
    }

    #[async_trait]
    impl CommandRunner for Recorder {
        async fn run(&self, _binary: &BinaryLocation, args: &[&str]) -> Result<CommandOutput, ProcessError> {
            self.calls
                .lock()
                .unwrap()
                .push((args.iter().map(|a| a.to_string()).collect(), None));
            Ok(CommandOutput::from_stdout(LIST_OUTPUT))
        }

        async fn run_with_input(
            &self,
            _binary: &BinaryLocation,
            args: &[&str],
            input: &str,
        ) -> Result<CommandOutput, ProcessError> {
            self.calls
                .lock()
                .unwrap()
                .push((args.iter().map(|a| a.to_string()).collect(), Some(input.to_string())));
            Ok(CommandOutput::from_stdout("done"))
        }

        async fn spawn_detached(
            &self,
            _binary: &BinaryLocation,
            _args: &[&str],
            _log: Option<&std::path::Path>,
        ) -> Result<SpawnedProcess, ProcessError> {
            Ok(SpawnedProcess::unwatched(None))
        }
    }

    #[tokio::test]
    async fn test_install_passes_sdk_root_and_answers() {
        let runner = Arc::new(Recorder::default());
        let manager = SdkManager::new(
            BinaryLocation::OnPath("sdkmanager".into()),
            Some(PathBuf::from("/sdk")),
            runner.clone(),
        );

        manager
            .install(&["system-images;android-34;google_apis;x86_64"])
            .await
            .unwrap();

        let calls = runner.calls.lock().unwrap();
        assert_eq!(
            calls[0].0,
            vec!["--sdk_root=/sdk", "system-images;android-34;google_apis;x86_64"]
        );
        assert!(calls[0].1.as_deref().unwrap().starts_with("y\n"));
    }

    #[tokio::test]
    async fn test_missing_sdkmanager() {
        let runner = Arc::new(Recorder::default());
        let manager = SdkManager::new(BinaryLocation::NotFound, None, runner.clone());

        let err = manager.list_system_images().await.unwrap_err();
        assert!(matches!(err, SdkManagerError::SdkManagerNotFound));
        assert!(runner.calls.lock().unwrap().is_empty());
    }
}
