//! Process execution
//!
//! Every vendor binary (adb, sdkmanager, avdmanager, emulator) is run
//! through a [`CommandRunner`]. Output is captured as text; callers decide
//! what it means.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::debug;

/// Where a binary lives, computed once per invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BinaryLocation {
    /// Absolute path inside the SDK
    Path(PathBuf),
    /// Resolve through `PATH` at spawn time
    OnPath(String),
    /// Not installed
    NotFound,
}

impl BinaryLocation {
    pub fn is_found(&self) -> bool {
        !matches!(self, BinaryLocation::NotFound)
    }

    /// Program argument for spawning, `None` when not found
    pub fn program(&self) -> Option<std::ffi::OsString> {
        match self {
            BinaryLocation::Path(path) => Some(path.as_os_str().to_owned()),
            BinaryLocation::OnPath(name) => Some(name.into()),
            BinaryLocation::NotFound => None,
        }
    }
}

impl fmt::Display for BinaryLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryLocation::Path(path) => write!(f, "{}", path.display()),
            BinaryLocation::OnPath(name) => write!(f, "{} (from PATH)", name),
            BinaryLocation::NotFound => f.write_str("not found"),
        }
    }
}

/// Captured output of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: Option<i32>,
}

impl CommandOutput {
    /// Output with only stdout set and a zero exit status
    pub fn from_stdout(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            status: Some(0),
        }
    }
}

/// How a detached process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    pub code: Option<i32>,
}

/// Handle to a process started with [`CommandRunner::spawn_detached`]
///
/// Dropping the handle leaves the process running.
#[derive(Debug)]
pub struct SpawnedProcess {
    pub pid: Option<u32>,
    exit: Option<oneshot::Receiver<ProcessExit>>,
}

impl SpawnedProcess {
    /// A process whose exit is reported through `exit`
    pub fn new(pid: Option<u32>, exit: oneshot::Receiver<ProcessExit>) -> Self {
        Self { pid, exit: Some(exit) }
    }

    /// A process nobody watches; [`SpawnedProcess::try_exit`] always returns `None`
    pub fn unwatched(pid: Option<u32>) -> Self {
        Self { pid, exit: None }
    }

    /// Exit status if the process has already ended, without waiting
    pub fn try_exit(&mut self) -> Option<ProcessExit> {
        let rx = self.exit.as_mut()?;
        match rx.try_recv() {
            Ok(exit) => {
                self.exit = None;
                Some(exit)
            }
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => {
                self.exit = None;
                None
            }
        }
    }
}

/// Process errors
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("binary not found: {0}")]
    NotFound(String),
    #[error("{program} exited with status {status:?}: {stderr}")]
    Failed {
        program: String,
        status: Option<i32>,
        stdout: String,
        stderr: String,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Runs located binaries
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run to completion and capture output; non-zero exit is an error
    async fn run(&self, binary: &BinaryLocation, args: &[&str]) -> Result<CommandOutput, ProcessError>;

    /// Like [`CommandRunner::run`], writing `input` to stdin first
    async fn run_with_input(
        &self,
        binary: &BinaryLocation,
        args: &[&str],
        input: &str,
    ) -> Result<CommandOutput, ProcessError>;

    /// Start a long-running process without waiting for it
    ///
    /// stdout and stderr go to `log` when given, otherwise they are discarded.
    async fn spawn_detached(
        &self,
        binary: &BinaryLocation,
        args: &[&str],
        log: Option<&Path>,
    ) -> Result<SpawnedProcess, ProcessError>;
}

/// [`CommandRunner`] backed by `tokio::process`
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }

    fn command(binary: &BinaryLocation, args: &[&str]) -> Result<Command, ProcessError> {
        let program = binary
            .program()
            .ok_or_else(|| ProcessError::NotFound(binary.to_string()))?;
        debug!("{} {:?}", binary, args);

        let mut cmd = Command::new(program);
        cmd.args(args);
        Ok(cmd)
    }

    fn finish(binary: &BinaryLocation, output: std::process::Output) -> Result<CommandOutput, ProcessError> {
        let captured = CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            status: output.status.code(),
        };

        if !output.status.success() {
            return Err(ProcessError::Failed {
                program: binary.to_string(),
                status: captured.status,
                stdout: captured.stdout,
                stderr: captured.stderr,
            });
        }

        Ok(captured)
    }

    fn spawn_error(binary: &BinaryLocation, err: std::io::Error) -> ProcessError {
        if err.kind() == std::io::ErrorKind::NotFound {
            ProcessError::NotFound(binary.to_string())
        } else {
            ProcessError::Io(err)
        }
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, binary: &BinaryLocation, args: &[&str]) -> Result<CommandOutput, ProcessError> {
        let output = Self::command(binary, args)?
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| Self::spawn_error(binary, e))?;
        Self::finish(binary, output)
    }

    async fn run_with_input(
        &self,
        binary: &BinaryLocation,
        args: &[&str],
        input: &str,
    ) -> Result<CommandOutput, ProcessError> {
        let mut child = Self::command(binary, args)?
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Self::spawn_error(binary, e))?;

        if let Some(mut stdin) = child.stdin.take() {
            // The tool may exit before reading everything; a broken pipe is fine.
            if let Err(e) = stdin.write_all(input.as_bytes()).await {
                debug!("stdin closed early: {}", e);
            }
        }

        let output = child.wait_with_output().await?;
        Self::finish(binary, output)
    }

    async fn spawn_detached(
        &self,
        binary: &BinaryLocation,
        args: &[&str],
        log: Option<&Path>,
    ) -> Result<SpawnedProcess, ProcessError> {
        let (stdout, stderr) = match log {
            Some(path) => {
                let file = std::fs::File::create(path)?;
                (Stdio::from(file.try_clone()?), Stdio::from(file))
            }
            None => (Stdio::null(), Stdio::null()),
        };

        let mut child = Self::command(binary, args)?
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .spawn()
            .map_err(|e| Self::spawn_error(binary, e))?;
        let pid = child.id();

        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let code = child.wait().await.ok().and_then(|status| status.code());
            let _ = tx.send(ProcessExit { code });
        });

        Ok(SpawnedProcess::new(pid, rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_program() {
        assert!(BinaryLocation::NotFound.program().is_none());
        assert_eq!(
            BinaryLocation::OnPath("adb".into()).program(),
            Some(std::ffi::OsString::from("adb"))
        );
        assert!(BinaryLocation::Path(PathBuf::from("/sdk/platform-tools/adb")).is_found());
    }

    #[tokio::test]
    async fn test_not_found_spawns_nothing() {
        let err = ProcessRunner::new()
            .run(&BinaryLocation::NotFound, &["devices"])
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_missing_program_maps_to_not_found() {
        let location = BinaryLocation::Path(PathBuf::from("/nonexistent/droidrig/adb"));
        let err = ProcessRunner::new().run(&location, &[]).await.unwrap_err();
        assert!(matches!(err, ProcessError::NotFound(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_captures_stdout_and_failure() {
        let sh = BinaryLocation::OnPath("sh".into());
        let runner = ProcessRunner::new();

        let ok = runner.run(&sh, &["-c", "echo connected"]).await.unwrap();
        assert_eq!(ok.stdout.trim(), "connected");

        let err = runner.run(&sh, &["-c", "echo boom >&2; exit 3"]).await.unwrap_err();
        match err {
            ProcessError::Failed { status, stderr, .. } => {
                assert_eq!(status, Some(3));
                assert_eq!(stderr.trim(), "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_spawn_detached_reports_exit_and_log() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("child.log");
        let sh = BinaryLocation::OnPath("sh".into());

        let mut process = ProcessRunner::new()
            .spawn_detached(&sh, &["-c", "echo unknown AVD >&2; exit 1"], Some(&log))
            .await
            .unwrap();
        assert!(process.pid.is_some());

        let mut exit = None;
        for _ in 0..200 {
            exit = process.try_exit();
            if exit.is_some() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(exit, Some(ProcessExit { code: Some(1) }));
        assert_eq!(std::fs::read_to_string(&log).unwrap().trim(), "unknown AVD");
        assert_eq!(process.try_exit(), None);
    }

    #[test]
    fn test_unwatched_process_never_exits() {
        let mut process = SpawnedProcess::unwatched(Some(7));
        assert_eq!(process.try_exit(), None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_with_input() {
        let sh = BinaryLocation::OnPath("sh".into());
        let output = ProcessRunner::new()
            .run_with_input(&sh, &["-c", "read answer; echo got $answer"], "no\n")
            .await
            .unwrap();
        assert_eq!(output.stdout.trim(), "got no");
    }
}
