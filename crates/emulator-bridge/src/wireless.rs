//! Wireless ADB connection
//!
//! Connects to a device on the same network, pairing first when the device
//! has not trusted this host yet:
//!
//! ```text
//! connect ──"connected"──▶ done
//!    │ otherwise
//!    ▼
//!  pair ──empty──▶ PairingFailed
//!    │ any reply
//!    ▼
//! connect ──"connected"──▶ done
//!    │ otherwise
//!    ▼
//! ConnectFailed
//! ```
//!
//! Every step runs exactly once. Process failures become absent output and
//! the flow itself never returns an error.

use std::fmt;

use tracing::{error, info, warn};

use crate::adb::{output, AdbClient, AdbError};

/// The four values an operator reads off the device's Wireless debugging screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WirelessField {
    IpAddress,
    Port,
    PairingCode,
    PairingPort,
}

impl fmt::Display for WirelessField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WirelessField::IpAddress => "IP address",
            WirelessField::Port => "port",
            WirelessField::PairingCode => "pairing code",
            WirelessField::PairingPort => "pairing port",
        })
    }
}

/// Prompt failure (closed stdin, interrupted terminal)
#[derive(Debug, thiserror::Error)]
#[error("prompt failed: {0}")]
pub struct PromptError(pub String);

/// Source of the operator's answers
pub trait WirelessPrompter: Send + Sync {
    /// Ask for one value; any string is accepted
    fn ask(&self, field: WirelessField) -> Result<String, PromptError>;
}

/// How a wireless connection attempt ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WirelessOutcome {
    /// adb reported the device connected
    Connected {
        address: String,
        output: String,
        paired: bool,
    },
    /// adb could not be located; nothing was run
    AdbNotFound,
    /// `adb pair` printed nothing or failed to run
    PairingFailed { output: Option<String> },
    /// The connect after pairing did not report a connection
    ConnectFailed {
        address: String,
        output: Option<String>,
    },
    /// Something unexpected stopped the flow
    Aborted { reason: String },
}

impl WirelessOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, WirelessOutcome::Connected { .. })
    }

    /// Text for the operator
    pub fn message(&self) -> String {
        match self {
            WirelessOutcome::Connected { address, paired, .. } => {
                if *paired {
                    format!("Paired and connected to {}", address)
                } else {
                    format!("Connected to {}", address)
                }
            }
            WirelessOutcome::AdbNotFound => {
                "adb not found. Install the Android SDK platform-tools or pass --sdk-root.".to_string()
            }
            WirelessOutcome::PairingFailed { output } => match output.as_deref().map(str::trim) {
                Some(text) if !text.is_empty() => format!("Pairing failed: {}", text),
                _ => "Pairing failed. Check the pairing code and port, then run the command again."
                    .to_string(),
            },
            WirelessOutcome::ConnectFailed { address, output } => match output.as_deref().map(str::trim) {
                Some(text) if !text.is_empty() => text.to_string(),
                _ => format!(
                    "Could not connect to {}. Make sure wireless debugging is on, then run the command again.",
                    address
                ),
            },
            WirelessOutcome::Aborted { reason } => format!("Wireless connection aborted: {}", reason),
        }
    }
}

/// Connect and, when needed, pair a device over Wi-Fi
pub struct WirelessConnect<'a> {
    adb: &'a AdbClient,
    prompter: &'a dyn WirelessPrompter,
}

impl<'a> WirelessConnect<'a> {
    pub fn new(adb: &'a AdbClient, prompter: &'a dyn WirelessPrompter) -> Self {
        Self { adb, prompter }
    }

    /// Run the flow once
    pub async fn run(&self) -> WirelessOutcome {
        if !self.adb.is_available() {
            error!("adb binary not found");
            return WirelessOutcome::AdbNotFound;
        }

        match self.attempt().await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!("Wireless connection aborted: {}", err);
                WirelessOutcome::Aborted {
                    reason: err.to_string(),
                }
            }
        }
    }

    async fn attempt(&self) -> Result<WirelessOutcome, PromptError> {
        let host = self.prompter.ask(WirelessField::IpAddress)?;
        let port = self.prompter.ask(WirelessField::Port)?;
        let address = format!("{}:{}", host.trim(), port.trim());

        let first = step("connect", self.adb.connect(&address).await);
        if let Some(text) = first.as_deref().filter(|text| output::is_connected(text)) {
            info!("Connected to {}", address);
            return Ok(WirelessOutcome::Connected {
                address,
                output: text.to_string(),
                paired: false,
            });
        }

        info!("{} is not paired yet", address);
        let code = self.prompter.ask(WirelessField::PairingCode)?;
        let pairing_port = self.prompter.ask(WirelessField::PairingPort)?;
        let pairing_address = format!("{}:{}", host.trim(), pairing_port.trim());

        let paired = step("pair", self.adb.pair(&pairing_address, code.trim()).await);
        if !output::pairing_succeeded(paired.as_deref()) {
            warn!("Pairing with {} failed", pairing_address);
            return Ok(WirelessOutcome::PairingFailed { output: paired });
        }
        info!("Paired with {}", pairing_address);

        let second = step("connect", self.adb.connect(&address).await);
        match second {
            Some(text) if output::is_connected(&text) => {
                info!("Connected to {}", address);
                Ok(WirelessOutcome::Connected {
                    address,
                    output: text,
                    paired: true,
                })
            }
            other => {
                warn!("Connecting to {} failed after pairing", address);
                Ok(WirelessOutcome::ConnectFailed {
                    address,
                    output: other,
                })
            }
        }
    }
}

/// Process failures become absent output
fn step(name: &str, result: Result<String, AdbError>) -> Option<String> {
    match result {
        Ok(text) => Some(text),
        Err(err) => {
            warn!("adb {} failed: {}", name, err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Reply, ScriptedRunner};
    use droidrig_core::BinaryLocation;
    use std::sync::{Arc, Mutex};

    struct ScriptedPrompter {
        asked: Mutex<Vec<WirelessField>>,
        fail_on: Option<WirelessField>,
    }

    impl ScriptedPrompter {
        fn new() -> Self {
            Self {
                asked: Mutex::new(Vec::new()),
                fail_on: None,
            }
        }

        fn failing_on(field: WirelessField) -> Self {
            Self {
                fail_on: Some(field),
                ..Self::new()
            }
        }

        fn asked(&self) -> Vec<WirelessField> {
            self.asked.lock().unwrap().clone()
        }
    }

    impl WirelessPrompter for ScriptedPrompter {
        fn ask(&self, field: WirelessField) -> Result<String, PromptError> {
            self.asked.lock().unwrap().push(field);
            if self.fail_on == Some(field) {
                return Err(PromptError("stdin closed".into()));
            }
            Ok(match field {
                WirelessField::IpAddress => " 192.168.1.20 ",
                WirelessField::Port => "37001",
                WirelessField::PairingCode => "482913",
                WirelessField::PairingPort => "41235",
            }
            .to_string())
        }
    }

    async fn run_flow(replies: Vec<Reply>, prompter: &ScriptedPrompter) -> (WirelessOutcome, Arc<ScriptedRunner>) {
        let runner = ScriptedRunner::new(replies);
        let adb = AdbClient::new(BinaryLocation::OnPath("adb".into()), runner.clone());
        let outcome = WirelessConnect::new(&adb, prompter).run().await;
        (outcome, runner)
    }

    #[tokio::test]
    async fn test_already_paired_skips_pairing() {
        let prompter = ScriptedPrompter::new();
        let (outcome, runner) =
            run_flow(vec![Ok("already connected to 192.168.1.20:37001\n")], &prompter).await;

        assert!(outcome.is_success());
        assert_eq!(runner.calls(), vec!["connect 192.168.1.20:37001"]);
        assert_eq!(runner.count("pair"), 0);
        assert_eq!(prompter.asked(), vec![WirelessField::IpAddress, WirelessField::Port]);
    }

    #[tokio::test]
    async fn test_pairs_then_connects() {
        let prompter = ScriptedPrompter::new();
        let (outcome, runner) = run_flow(
            vec![
                Ok("failed to connect to '192.168.1.20:37001': Connection refused\n"),
                Ok("Successfully paired to 192.168.1.20:41235 [guid=adb-R58M-x]\n"),
                Ok("connected to 192.168.1.20:37001\n"),
            ],
            &prompter,
        )
        .await;

        assert_eq!(
            outcome,
            WirelessOutcome::Connected {
                address: "192.168.1.20:37001".into(),
                output: "connected to 192.168.1.20:37001\n".into(),
                paired: true,
            }
        );
        assert_eq!(
            runner.calls(),
            vec![
                "connect 192.168.1.20:37001",
                "pair 192.168.1.20:41235 482913",
                "connect 192.168.1.20:37001",
            ]
        );
    }

    #[tokio::test]
    async fn test_second_connect_without_connected_fails() {
        let prompter = ScriptedPrompter::new();
        let (outcome, runner) = run_flow(
            vec![
                Ok("failed to connect to '192.168.1.20:37001'\n"),
                Ok("Successfully paired to 192.168.1.20:41235\n"),
                Ok("failed to authenticate to 192.168.1.20:37001\n"),
            ],
            &prompter,
        )
        .await;

        assert!(!outcome.is_success());
        assert_eq!(outcome.message(), "failed to authenticate to 192.168.1.20:37001");
        assert_eq!(runner.count("connect"), 2);
        assert_eq!(runner.count("pair"), 1);
    }

    #[tokio::test]
    async fn test_empty_pair_output_stops_flow() {
        let prompter = ScriptedPrompter::new();
        let (outcome, runner) = run_flow(vec![Ok("failed to connect\n"), Ok("")], &prompter).await;

        assert_eq!(outcome, WirelessOutcome::PairingFailed { output: Some(String::new()) });
        assert_eq!(runner.count("connect"), 1);
        assert_eq!(runner.count("pair"), 1);
    }

    #[tokio::test]
    async fn test_pair_process_failure_stops_flow() {
        let prompter = ScriptedPrompter::new();
        let (outcome, runner) = run_flow(
            vec![Ok("failed to connect\n"), Err("error: protocol fault")],
            &prompter,
        )
        .await;

        assert_eq!(outcome, WirelessOutcome::PairingFailed { output: None });
        assert_eq!(runner.count("connect"), 1);
    }

    #[tokio::test]
    async fn test_connect_process_failure_counts_as_not_connected() {
        let prompter = ScriptedPrompter::new();
        let (outcome, runner) = run_flow(
            vec![
                Err("cannot bind"),
                Ok("Successfully paired\n"),
                Err("cannot bind"),
            ],
            &prompter,
        )
        .await;

        assert_eq!(
            outcome,
            WirelessOutcome::ConnectFailed {
                address: "192.168.1.20:37001".into(),
                output: None,
            }
        );
        assert!(outcome.message().contains("run the command again"));
        assert_eq!(runner.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_missing_adb_runs_nothing() {
        let prompter = ScriptedPrompter::new();
        let runner = ScriptedRunner::new(vec![]);
        let adb = AdbClient::new(BinaryLocation::NotFound, runner.clone());

        let outcome = WirelessConnect::new(&adb, &prompter).run().await;

        assert_eq!(outcome, WirelessOutcome::AdbNotFound);
        assert!(runner.calls().is_empty());
        assert!(prompter.asked().is_empty());
    }

    #[tokio::test]
    async fn test_prompt_failure_aborts() {
        let prompter = ScriptedPrompter::failing_on(WirelessField::PairingCode);
        let (outcome, runner) = run_flow(vec![Ok("failed to connect\n")], &prompter).await;

        assert!(matches!(outcome, WirelessOutcome::Aborted { .. }));
        assert_eq!(runner.count("pair"), 0);
    }

    #[tokio::test]
    async fn test_each_step_at_most_once() {
        let scripts: Vec<Vec<Reply>> = vec![
            vec![Ok("connected to x")],
            vec![Ok("nope"), Ok("")],
            vec![Ok("nope"), Ok("paired"), Ok("nope")],
            vec![Ok("nope"), Ok("paired"), Ok("connected to x")],
            vec![Err("boom"), Err("boom")],
        ];

        for script in scripts {
            let prompter = ScriptedPrompter::new();
            let (_, runner) = run_flow(script, &prompter).await;
            assert!(runner.count("connect") <= 2);
            assert!(runner.count("pair") <= 1);
        }
    }
}
