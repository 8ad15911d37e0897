//! Binary location
//!
//! Resolves `adb`, `emulator`, `sdkmanager` and `avdmanager` for a given SDK
//! root and host platform.

use std::env;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use droidrig_core::{BinaryLocation, HostPlatform};
use tracing::{debug, info};

/// Vendor binaries droidrig drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AndroidTool {
    Adb,
    AvdManager,
    SdkManager,
    Emulator,
}

impl AndroidTool {
    pub const ALL: [AndroidTool; 4] = [
        AndroidTool::Adb,
        AndroidTool::AvdManager,
        AndroidTool::SdkManager,
        AndroidTool::Emulator,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AndroidTool::Adb => "adb",
            AndroidTool::AvdManager => "avdmanager",
            AndroidTool::SdkManager => "sdkmanager",
            AndroidTool::Emulator => "emulator",
        }
    }

    /// File name on the given platform
    pub fn file_name(&self, platform: HostPlatform) -> String {
        let suffix = match self {
            AndroidTool::Adb | AndroidTool::Emulator => platform.exe_suffix(),
            AndroidTool::AvdManager | AndroidTool::SdkManager => platform.script_suffix(),
        };
        format!("{}{}", self.name(), suffix)
    }
}

impl fmt::Display for AndroidTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Locates SDK binaries
#[derive(Debug, Clone)]
pub struct SdkLocator {
    sdk_root: Option<PathBuf>,
    platform: HostPlatform,
    search_path: Option<OsString>,
}

impl SdkLocator {
    /// Create a locator searching `sdk_root` first, then `PATH`
    pub fn new(sdk_root: Option<PathBuf>, platform: HostPlatform) -> Self {
        Self {
            sdk_root,
            platform,
            search_path: env::var_os("PATH"),
        }
    }

    /// Replace the directories used for the `PATH` fallback
    pub fn with_search_path(mut self, search_path: impl Into<OsString>) -> Self {
        self.search_path = Some(search_path.into());
        self
    }

    /// Only look inside the SDK
    pub fn without_path_search(mut self) -> Self {
        self.search_path = None;
        self
    }

    pub fn sdk_root(&self) -> Option<&Path> {
        self.sdk_root.as_deref()
    }

    pub fn platform(&self) -> HostPlatform {
        self.platform
    }

    /// Resolve a tool to a location
    pub fn locate(&self, tool: AndroidTool) -> BinaryLocation {
        if let Some(root) = &self.sdk_root {
            if let Some(path) = self.find_in_sdk(root, tool) {
                debug!("Found {} at {:?}", tool, path);
                return BinaryLocation::Path(path);
            }
        }

        if self.on_search_path(tool) {
            debug!("Using {} from PATH", tool);
            return BinaryLocation::OnPath(tool.file_name(self.platform));
        }

        info!("{} not found", tool);
        BinaryLocation::NotFound
    }

    fn find_in_sdk(&self, root: &Path, tool: AndroidTool) -> Option<PathBuf> {
        let file_name = tool.file_name(self.platform);

        match tool {
            AndroidTool::Adb => existing(root.join("platform-tools").join(&file_name)),
            AndroidTool::Emulator => existing(root.join("emulator").join(&file_name)),
            AndroidTool::SdkManager | AndroidTool::AvdManager => {
                Self::find_cmdline_tool(root, &file_name)
            }
        }
    }

    /// cmdline-tools/latest, then any versioned cmdline-tools, then legacy tools/
    fn find_cmdline_tool(root: &Path, file_name: &str) -> Option<PathBuf> {
        let cmdline_tools = root.join("cmdline-tools");

        if let Some(path) = existing(cmdline_tools.join("latest").join("bin").join(file_name)) {
            return Some(path);
        }

        if let Ok(entries) = std::fs::read_dir(&cmdline_tools) {
            let newest = entries
                .flatten()
                .filter_map(|entry| {
                    let path = entry.path().join("bin").join(file_name);
                    path.exists()
                        .then(|| (tools_version(&entry.file_name().to_string_lossy()), path))
                })
                .max_by(|a, b| a.0.cmp(&b.0));
            if let Some((_, path)) = newest {
                return Some(path);
            }
        }

        existing(root.join("tools").join("bin").join(file_name))
    }

    fn on_search_path(&self, tool: AndroidTool) -> bool {
        let Some(paths) = &self.search_path else {
            return false;
        };
        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        which::which_in(tool.file_name(self.platform), Some(paths), cwd).is_ok()
    }
}

/// Sort key for a cmdline-tools directory: `12.0` > `9.0` > `latest-2`
///
/// Non-numeric names sort before every numeric version.
fn tools_version(dir_name: &str) -> Option<Vec<u32>> {
    dir_name
        .split('.')
        .map(|part| part.parse::<u32>().ok())
        .collect()
}

fn existing(path: PathBuf) -> Option<PathBuf> {
    path.exists().then_some(path)
}

/// Find an installed SDK from the environment and the usual install locations
pub fn detect_sdk_root() -> Option<PathBuf> {
    let root = sdk_candidates().into_iter().find(|path| path.is_dir());
    if let Some(ref root) = root {
        info!("Found Android SDK at {:?}", root);
    }
    root
}

fn sdk_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(android_home) = env::var("ANDROID_HOME") {
        candidates.push(PathBuf::from(android_home));
    }
    if let Ok(sdk_root) = env::var("ANDROID_SDK_ROOT") {
        candidates.push(PathBuf::from(sdk_root));
    }

    if cfg!(windows) {
        if let Some(local) = dirs::data_local_dir() {
            candidates.push(local.join("Android").join("Sdk"));
        }
        candidates.push(PathBuf::from(r"C:\Android\sdk"));
    }

    if cfg!(target_os = "macos") {
        if let Some(home) = dirs::home_dir() {
            candidates.push(home.join("Library").join("Android").join("sdk"));
        }
    }

    if cfg!(unix) {
        if let Some(home) = dirs::home_dir() {
            candidates.push(home.join("Android").join("Sdk"));
            candidates.push(home.join("android-sdk"));
        }
        candidates.push(PathBuf::from("/opt/android-sdk"));
        candidates.push(PathBuf::from("/usr/local/android-sdk"));
    }

    candidates
}
