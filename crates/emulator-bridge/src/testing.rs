//! Scripted command runner for unit tests

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use droidrig_core::{BinaryLocation, CommandOutput, CommandRunner, ProcessError, ProcessExit, SpawnedProcess};
use tokio::sync::oneshot;

/// `Ok(stdout)` for a zero exit, `Err(stderr)` for a failed process
pub type Reply = Result<&'static str, &'static str>;

/// Replies to `run` calls in order and records every invocation
#[derive(Default)]
pub struct ScriptedRunner {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<String>>,
    /// Exit code and log output of a spawned process that dies at once
    spawn_crash: Mutex<Option<(i32, &'static str)>>,
}

impl ScriptedRunner {
    pub fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
            spawn_crash: Mutex::new(None),
        })
    }

    /// Spawned processes exit right away with `code`, writing `log` to their log file
    pub fn crash_on_spawn(&self, code: i32, log: &'static str) {
        *self.spawn_crash.lock().unwrap() = Some((code, log));
    }

    /// Arguments of every call so far, space-joined
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of calls whose arguments start with `prefix`
    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|call| call.starts_with(prefix)).count()
    }

    fn reply(&self, args: &[&str]) -> Result<CommandOutput, ProcessError> {
        self.calls.lock().unwrap().push(args.join(" "));
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(stdout)) => Ok(CommandOutput::from_stdout(stdout)),
            Some(Err(stderr)) => Err(ProcessError::Failed {
                program: "scripted".into(),
                status: Some(1),
                stdout: String::new(),
                stderr: stderr.into(),
            }),
            None => Err(ProcessError::Failed {
                program: "scripted".into(),
                status: None,
                stdout: String::new(),
                stderr: "no scripted reply".into(),
            }),
        }
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, _binary: &BinaryLocation, args: &[&str]) -> Result<CommandOutput, ProcessError> {
        self.reply(args)
    }

    async fn run_with_input(
        &self,
        _binary: &BinaryLocation,
        args: &[&str],
        _input: &str,
    ) -> Result<CommandOutput, ProcessError> {
        self.reply(args)
    }

    async fn spawn_detached(
        &self,
        _binary: &BinaryLocation,
        args: &[&str],
        log: Option<&Path>,
    ) -> Result<SpawnedProcess, ProcessError> {
        self.calls.lock().unwrap().push(format!("spawn {}", args.join(" ")));

        let crash = *self.spawn_crash.lock().unwrap();
        match crash {
            Some((code, output)) => {
                if let Some(path) = log {
                    std::fs::write(path, output).unwrap();
                }
                let (tx, rx) = oneshot::channel();
                tx.send(ProcessExit { code: Some(code) }).unwrap();
                Ok(SpawnedProcess::new(Some(4242), rx))
            }
            None => Ok(SpawnedProcess::unwatched(Some(4242))),
        }
    }
}
