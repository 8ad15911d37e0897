//! droidrig - Android device and emulator helper
//!
//! Entry point: parses the command line, sets up logging and dispatches to
//! the commands in [`droidrig::commands`].

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use console::style;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use droidrig::commands::{
    AvdAction, AvdCommand, ConnectCommand, Context, DevicesCommand, DoctorCommand,
    EmulatorStartCommand, GlobalOptions, ImagesCommand,
};
use droidrig::{APP_NAME, VERSION};

#[derive(Debug, Parser)]
#[command(name = "droidrig", version, about = "Connect Android devices and boot emulators for test automation")]
struct Cli {
    /// Android SDK root (overrides the config file and ANDROID_HOME)
    #[arg(long, global = true, value_name = "PATH")]
    sdk_root: Option<PathBuf>,

    /// Host platform the SDK binaries are built for (win32, darwin, linux)
    #[arg(long, global = true, value_name = "ID")]
    platform: Option<String>,

    /// Configuration file
    #[arg(long, global = true, value_name = "FILE", env = "DROIDRIG_CONFIG")]
    config: Option<PathBuf>,

    /// More output (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Connect a device over USB or Wi-Fi and print its udid
    Connect {
        /// Pair and connect over wireless debugging
        #[arg(long)]
        wireless: bool,
    },
    /// List connected devices
    Devices {
        /// Include offline and unauthorized devices
        #[arg(long)]
        allow_offline: bool,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Manage Android Virtual Devices
    Avd {
        #[command(subcommand)]
        action: AvdSubcommand,
    },
    /// Control emulator instances
    Emulator {
        #[command(subcommand)]
        action: EmulatorSubcommand,
    },
    /// List emulator system images
    Images {
        /// Only images already installed in the SDK
        #[arg(long)]
        installed: bool,
    },
    /// Show where every SDK tool was found
    Doctor,
}

#[derive(Debug, Subcommand)]
enum AvdSubcommand {
    /// List configured AVDs
    List,
    /// Create an AVD, installing its system image when missing
    Create {
        #[arg(long)]
        name: Option<String>,
        /// System image package, e.g. system-images;android-34;google_apis;x86_64
        #[arg(long)]
        image: Option<String>,
        /// Hardware profile, e.g. pixel_6
        #[arg(long)]
        device: Option<String>,
        /// Replace an existing AVD with the same name
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Subcommand)]
enum EmulatorSubcommand {
    /// Boot an AVD and wait until Android is ready
    Start {
        /// AVD name; asks when omitted
        name: Option<String>,
        /// Console port (even, 5554-5584)
        #[arg(long)]
        port: Option<u16>,
        /// Run without a window
        #[arg(long)]
        headless: bool,
        /// Ignore the quick-boot snapshot
        #[arg(long)]
        cold_boot: bool,
    },
}

impl Cli {
    fn global_options(&self) -> GlobalOptions {
        GlobalOptions {
            sdk_root: self.sdk_root.clone(),
            platform: self.platform.clone(),
            config: self.config.clone(),
        }
    }
}

/// Main entry point
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    debug!("{} v{} starting...", APP_NAME, VERSION);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            eprintln!("{} {:#}", style("error:").red().bold(), err);
            ExitCode::FAILURE
        }
    }
}

/// Logging goes to stderr so stdout stays parseable
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let ctx = Context::resolve(&cli.global_options()).await?;

    match cli.command {
        Command::Connect { wireless } => {
            ConnectCommand { wireless }.execute(&ctx).await?;
        }
        Command::Devices { allow_offline, json } => {
            DevicesCommand { allow_offline, json }.execute(&ctx).await?;
        }
        Command::Avd { action } => {
            let action = match action {
                AvdSubcommand::List => AvdAction::List,
                AvdSubcommand::Create {
                    name,
                    image,
                    device,
                    force,
                } => AvdAction::Create {
                    name,
                    image,
                    device,
                    force,
                },
            };
            AvdCommand { action }.execute(&ctx).await?;
        }
        Command::Emulator {
            action: EmulatorSubcommand::Start { name, port, headless, cold_boot },
        } => {
            EmulatorStartCommand {
                name,
                port,
                headless,
                cold_boot,
            }
            .execute(&ctx)
            .await?;
        }
        Command::Images { installed } => {
            ImagesCommand { installed_only: installed }.execute(&ctx).await?;
        }
        Command::Doctor => DoctorCommand.execute(&ctx)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["droidrig", "devices", "--json", "--sdk-root", "/opt/sdk", "-vv"]).unwrap();
        assert_eq!(cli.sdk_root, Some(PathBuf::from("/opt/sdk")));
        assert_eq!(cli.verbose, 2);
        assert!(matches!(
            cli.command,
            Command::Devices {
                json: true,
                allow_offline: false
            }
        ));
    }

    #[test]
    fn test_parse_emulator_start() {
        let cli = Cli::try_parse_from(["droidrig", "emulator", "start", "Pixel_6", "--headless", "--port", "5560"])
            .unwrap();
        match cli.command {
            Command::Emulator {
                action: EmulatorSubcommand::Start { name, port, headless, cold_boot },
            } => {
                assert_eq!(name.as_deref(), Some("Pixel_6"));
                assert_eq!(port, Some(5560));
                assert!(headless);
                assert!(!cold_boot);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_avd_create_requires_nothing() {
        let cli = Cli::try_parse_from(["droidrig", "avd", "create"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Avd {
                action: AvdSubcommand::Create {
                    name: None,
                    image: None,
                    device: None,
                    force: false
                }
            }
        ));
    }
}
