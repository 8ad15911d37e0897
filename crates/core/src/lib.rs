//! droidrig core - shared types
//!
//! Configuration, error handling, host platform identification and the
//! process runner every other droidrig crate shells out through.

pub mod config;
pub mod error;
pub mod platform;
pub mod process;

pub use config::{AppConfig, AvdDefaults, EmulatorSettings};
pub use error::{CoreError, Result};
pub use platform::HostPlatform;
pub use process::{
    BinaryLocation, CommandOutput, CommandRunner, ProcessError, ProcessExit, ProcessRunner, SpawnedProcess,
};

/// droidrig version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "droidrig";
