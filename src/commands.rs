//! CLI commands for droidrig
//!
//! Each command resolves what it needs from a shared [`Context`] and prints
//! its result on stdout. Diagnostics go through `tracing` to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context as _, Result};
use console::style;
use droidrig_android_toolchain::{
    detect_sdk_root, AndroidTool, SdkLocator, SdkManager, SystemImage, WIRELESS_PAIRING_MIN_API,
};
use droidrig_core::{AppConfig, BinaryLocation, CommandRunner, HostPlatform, ProcessRunner};
use droidrig_emulator_bridge::avd::is_valid_avd_name;
use droidrig_emulator_bridge::{
    AdbClient, AdbError, AvdConfig, AvdManager, BootWait, Device, EmulatorLauncher, EmulatorOptions,
    WirelessConnect, WirelessOutcome,
};
use tracing::{debug, info, warn};

use crate::prompt::{self, TerminalPrompter};

/// Options shared by every command
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub sdk_root: Option<PathBuf>,
    pub platform: Option<String>,
    pub config: Option<PathBuf>,
}

/// Resolved configuration, binary locations and process runner
pub struct Context {
    pub config: AppConfig,
    pub locator: SdkLocator,
    pub runner: Arc<dyn CommandRunner>,
}

impl Context {
    /// Load the config and resolve the SDK root
    ///
    /// SDK root precedence: `--sdk-root`, config file, environment and known
    /// install locations, then a terminal prompt.
    pub async fn resolve(options: &GlobalOptions) -> Result<Self> {
        let config = match &options.config {
            Some(path) => AppConfig::load_from(path).await,
            None => AppConfig::load().await,
        }
        .map_err(|e| anyhow!(e.user_message()))?;

        let platform = match &options.platform {
            Some(id) => id.parse::<HostPlatform>().map_err(|e| anyhow!(e.user_message()))?,
            None => HostPlatform::current(),
        };

        let sdk_root = match options.sdk_root.clone().or_else(|| config.sdk_root.clone()) {
            Some(root) => Some(root),
            None => match detect_sdk_root() {
                Some(root) => Some(root),
                None => prompt::ask_sdk_root()?,
            },
        };

        match &sdk_root {
            Some(root) => info!("Using Android SDK at {:?}", root),
            None => warn!("No Android SDK root; looking for tools on PATH only"),
        }

        Ok(Self {
            config,
            locator: SdkLocator::new(sdk_root, platform),
            runner: Arc::new(ProcessRunner::new()),
        })
    }

    pub fn locate(&self, tool: AndroidTool) -> BinaryLocation {
        self.locator.locate(tool)
    }

    pub fn adb(&self) -> AdbClient {
        AdbClient::new(self.locate(AndroidTool::Adb), self.runner.clone())
    }

    pub fn sdk_manager(&self) -> SdkManager {
        SdkManager::new(
            self.locate(AndroidTool::SdkManager),
            self.locator.sdk_root().map(PathBuf::from),
            self.runner.clone(),
        )
    }

    pub fn avd_manager(&self) -> AvdManager {
        AvdManager::new(
            self.locate(AndroidTool::AvdManager),
            self.locate(AndroidTool::Emulator),
            self.runner.clone(),
        )
    }

    pub fn launcher(&self) -> EmulatorLauncher {
        EmulatorLauncher::new(self.locate(AndroidTool::Emulator), self.adb(), self.runner.clone())
            .with_boot_wait(BootWait::from(&self.config.emulator))
    }
}

/// Device connection command
pub struct ConnectCommand {
    pub wireless: bool,
}

impl ConnectCommand {
    /// Connect a device and print its udid
    pub async fn execute(&self, ctx: &Context) -> Result<String> {
        if self.wireless {
            self.connect_wireless(ctx).await
        } else {
            self.connect_usb(ctx).await
        }
    }

    async fn connect_wireless(&self, ctx: &Context) -> Result<String> {
        println!(
            "Open Developer options > Wireless debugging on the device (Android 11, API {}, or newer).",
            WIRELESS_PAIRING_MIN_API
        );

        let adb = ctx.adb();
        let outcome = WirelessConnect::new(&adb, &TerminalPrompter).run().await;
        debug!("Wireless outcome: {:?}", outcome);

        let message = outcome.message();
        match outcome {
            WirelessOutcome::Connected { address, .. } => {
                println!("{} {}", style("✓").green(), message);
                Ok(address)
            }
            _ => bail!(message),
        }
    }

    async fn connect_usb(&self, ctx: &Context) -> Result<String> {
        let devices = ctx.adb().devices(false).await.map_err(adb_error)?;

        let udid = match devices.len() {
            0 => bail!("No devices connected. Plug in a device with USB debugging enabled, or use --wireless."),
            1 => devices[0].udid.clone(),
            _ => {
                let labels: Vec<String> = devices.iter().map(Device::display_name).collect();
                let index = prompt::select("Select a device", &labels, 0)?;
                devices[index].udid.clone()
            }
        };

        println!("{}", udid);
        Ok(udid)
    }
}

/// Device list command
pub struct DevicesCommand {
    pub allow_offline: bool,
    pub json: bool,
}

impl DevicesCommand {
    /// List all connected devices
    pub async fn execute(&self, ctx: &Context) -> Result<()> {
        let devices = ctx.adb().devices(self.allow_offline).await.map_err(adb_error)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&devices)?);
            return Ok(());
        }

        if devices.is_empty() {
            println!("No devices connected");
        } else {
            println!("Connected devices:");
            for device in devices {
                let state = if device.is_usable() {
                    style(device.state.as_str()).green()
                } else {
                    style(device.state.as_str()).yellow()
                };
                println!("  {:<24} {:<12} {:?}", device.udid, state, device.device_type);
            }
        }

        Ok(())
    }
}

/// AVD management command
pub struct AvdCommand {
    pub action: AvdAction,
}

pub enum AvdAction {
    List,
    Create {
        name: Option<String>,
        image: Option<String>,
        device: Option<String>,
        force: bool,
    },
}

impl AvdCommand {
    /// Execute the AVD command
    pub async fn execute(&self, ctx: &Context) -> Result<()> {
        match &self.action {
            AvdAction::List => {
                let avds = ctx.avd_manager().list_avds().await?;
                if avds.is_empty() {
                    println!("No AVDs configured");
                } else {
                    println!("Available AVDs:");
                    for avd in avds {
                        println!(
                            "  {} - {} ({})",
                            avd.name,
                            avd.device_name.as_deref().unwrap_or("unknown device"),
                            avd.target.as_deref().unwrap_or("unknown image"),
                        );
                    }
                }
            }
            AvdAction::Create { name, image, device, force } => {
                let defaults = &ctx.config.avd;
                let sdk = ctx.sdk_manager();
                let images = sdk.list_system_images().await?;

                let image = match image {
                    Some(package) => images
                        .iter()
                        .find(|i| i.package == *package)
                        .cloned()
                        .or_else(|| SystemImage::from_package(package))
                        .with_context(|| format!("'{}' is not a system image package", package))?,
                    None => {
                        let candidates: Vec<&SystemImage> = images
                            .iter()
                            .filter(|i| i.abi == defaults.default_abi)
                            .collect();
                        if candidates.is_empty() {
                            bail!("No {} system images available from sdkmanager", defaults.default_abi);
                        }
                        let labels: Vec<String> = candidates.iter().map(|i| i.label()).collect();
                        let preferred = candidates
                            .iter()
                            .position(|i| i.tag == defaults.default_tag)
                            .unwrap_or(0);
                        let index = prompt::select("Select a system image", &labels, preferred)?;
                        candidates[index].clone()
                    }
                };

                let device = device.clone().unwrap_or_else(|| defaults.default_device.clone());
                let name = match name {
                    Some(name) => name.clone(),
                    None => prompt::input("AVD name", &format!("{}_API_{}", device, image.api_level))?,
                };
                if !is_valid_avd_name(&name) {
                    bail!("Invalid AVD name '{}': use letters, digits, '.', '_' and '-'", name);
                }

                if !image.installed {
                    println!("Installing {}...", image.package);
                    sdk.accept_licenses().await?;
                    sdk.install(&[image.package.as_str()]).await?;
                }

                let mut config = AvdConfig::new(&name, &image.package).device(&device);
                config.force = *force;
                ctx.avd_manager().create_avd(&config).await?;
                println!("{} Created AVD {} ({})", style("✓").green(), name, image.package);
            }
        }

        Ok(())
    }
}

/// Emulator start command
pub struct EmulatorStartCommand {
    pub name: Option<String>,
    pub port: Option<u16>,
    pub headless: bool,
    pub cold_boot: bool,
}

impl EmulatorStartCommand {
    /// Boot an AVD and print the emulator udid
    pub async fn execute(&self, ctx: &Context) -> Result<String> {
        let avds = ctx.avd_manager().list_avds().await?;
        if avds.is_empty() {
            bail!("No AVDs configured. Create one with `droidrig avd create`.");
        }
        let labels: Vec<String> = avds.iter().map(|a| a.name.clone()).collect();

        let name = match &self.name {
            Some(name) if labels.contains(name) => name.clone(),
            Some(name) => bail!("No AVD named '{}'. Available: {}", name, labels.join(", ")),
            None => {
                let index = prompt::select("Select an AVD to start", &labels, 0)?;
                labels[index].clone()
            }
        };

        let mut options = if self.headless || ctx.config.emulator.headless {
            EmulatorOptions::headless()
        } else {
            EmulatorOptions::default()
        };
        options.port = self.port;
        options.cold_boot = self.cold_boot;

        println!("Starting {} (this can take a few minutes)...", name);
        let device = ctx.launcher().start(&name, &options).await?;

        println!("{} {} is ready", style("✓").green(), device.udid);
        Ok(device.udid)
    }
}

/// System image listing command
pub struct ImagesCommand {
    pub installed_only: bool,
}

impl ImagesCommand {
    /// System images to show, newest API first
    pub async fn collect(&self, ctx: &Context) -> Result<Vec<SystemImage>> {
        Ok(ctx
            .sdk_manager()
            .list_system_images()
            .await?
            .into_iter()
            .filter(|image| image.installed || !self.installed_only)
            .collect())
    }

    pub async fn execute(&self, ctx: &Context) -> Result<()> {
        let images = self.collect(ctx).await?;

        if images.is_empty() {
            println!("No system images found");
            return Ok(());
        }

        for image in images {
            let marker = if image.installed { style("*").green() } else { style(" ") };
            let play = if image.has_play_store() { " (Google Play)" } else { "" };
            println!("{} {}{}", marker, image.package, play);
        }
        Ok(())
    }
}

/// Tool location report
pub struct DoctorCommand;

impl DoctorCommand {
    pub fn execute(&self, ctx: &Context) -> Result<()> {
        println!("droidrig environment ({})", ctx.locator.platform());
        println!("========================================");

        match ctx.locator.sdk_root() {
            Some(root) => println!("  Android SDK: {}", root.display()),
            None => println!("  Android SDK: not configured"),
        }

        for tool in AndroidTool::ALL {
            let location = ctx.locate(tool);
            let mark = if location.is_found() {
                style("✓").green()
            } else {
                style("✗").red()
            };
            println!("{} {:<11} {}", mark, tool.name(), location);
        }

        Ok(())
    }
}

/// adb errors without a located binary get a pointer to `--sdk-root`
fn adb_error(err: AdbError) -> anyhow::Error {
    match err {
        AdbError::NotFound => anyhow!(
            "adb not found. Install the Android SDK platform-tools or pass --sdk-root."
        ),
        other => other.into(),
    }
}
