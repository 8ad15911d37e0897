//! Interactive prompts
//!
//! Terminal questions asked by the commands, built on `dialoguer`.

use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::{bail, Result};
use dialoguer::{theme::ColorfulTheme, Input, Select};
use droidrig_emulator_bridge::{PromptError, WirelessField, WirelessPrompter};

/// True when both stdin and stdout are attached to a terminal
pub fn is_interactive_terminal() -> bool {
    std::io::stdin().is_terminal() && console::user_attended()
}

/// Asks the wireless debugging questions on the terminal
#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl WirelessPrompter for TerminalPrompter {
    fn ask(&self, field: WirelessField) -> Result<String, PromptError> {
        let prompt = match field {
            WirelessField::IpAddress => "Device IP address",
            WirelessField::Port => "Wireless debugging port",
            WirelessField::PairingCode => "Pairing code",
            WirelessField::PairingPort => "Pairing port",
        };

        Input::<String>::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .interact_text()
            .map_err(|e| PromptError(format!("{}: {}", field, e)))
    }
}

/// Pick one entry from `labels`
///
/// A single entry is returned without asking. Without a terminal the
/// `default` entry is used.
pub fn select(prompt: &str, labels: &[String], default: usize) -> Result<usize> {
    if labels.is_empty() {
        bail!("Nothing to select for: {}", prompt);
    }
    let default = default.min(labels.len() - 1);
    if labels.len() == 1 {
        return Ok(0);
    }
    if !is_interactive_terminal() {
        eprintln!(
            "{} Non-interactive terminal detected; using {}.",
            console::style("note:").yellow(),
            labels[default]
        );
        return Ok(default);
    }

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .items(labels)
        .default(default)
        .interact()?;
    Ok(selection)
}

/// Free-text answer with a default
pub fn input(prompt: &str, default: &str) -> Result<String> {
    if !is_interactive_terminal() {
        return Ok(default.to_string());
    }

    let answer = Input::<String>::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(default.to_string())
        .interact_text()?;
    Ok(answer.trim().to_string())
}

/// Ask for the SDK location when nothing else provided one
///
/// Returns `None` without a terminal or on an empty answer.
pub fn ask_sdk_root() -> Result<Option<PathBuf>> {
    if !is_interactive_terminal() {
        return Ok(None);
    }

    let answer = Input::<String>::with_theme(&ColorfulTheme::default())
        .with_prompt("Android SDK location (leave empty to search PATH)")
        .allow_empty(true)
        .interact_text()?;

    let answer = answer.trim();
    Ok((!answer.is_empty()).then(|| PathBuf::from(answer)))
}
