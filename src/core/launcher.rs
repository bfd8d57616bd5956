//! Process launching and draining.
//!
//! [`launch`] starts one external command without waiting for it and hands
//! back a [`RunningProcess`] that owns the child and its captured output
//! stream. [`RunningProcess::drain`] waits for the child to exit and folds
//! the stream and exit status into a [`DrainResult`]. Draining consumes
//! the handle, so a process can never be drained twice.

use crate::core::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

/// One configured check, resolved to an executable invocation: an argument
/// vector and the absolute directory to run it in.
#[derive(Debug, Clone)]
pub struct CheckSpec {
    /// Name of the check, used for reporting.
    pub name: String,
    /// Argument vector; first element is the program.
    pub command: Vec<String>,
    /// Working directory for the command.
    pub dir: PathBuf,
}

impl CheckSpec {
    /// Creates a new check spec.
    #[must_use]
    pub fn new(name: impl Into<String>, command: Vec<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            command,
            dir: dir.into(),
        }
    }

    /// Returns the program to be executed, if the command is non-empty.
    #[must_use]
    pub fn program(&self) -> Option<&str> {
        self.command.first().map(String::as_str)
    }

    /// Returns the command as a single display string.
    #[must_use]
    pub fn display_command(&self) -> String {
        self.command.join(" ")
    }
}

/// A launched external process, prior to being drained.
///
/// Owns the child and the background tasks accumulating its combined
/// stdout/stderr stream. The readers start at launch time, so a chatty
/// child can never fill its pipe and stall while siblings are drained.
///
/// Dropping an undrained handle does not kill the child; it keeps running
/// and leaks until it exits on its own. Call [`RunningProcess::drain`].
#[derive(Debug)]
pub struct RunningProcess {
    name: String,
    child: Child,
    readers: Vec<JoinHandle<String>>,
    started: Instant,
}

impl RunningProcess {
    /// Name of the check this process belongs to.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Waits for the process to exit and returns its captured output and
    /// success status. Consumes the handle: every process is drained
    /// exactly once.
    pub async fn drain(mut self) -> Result<DrainResult> {
        let status = self
            .child
            .wait()
            .await
            .map_err(|e| Error::io("wait for process", e))?;

        let mut output = String::new();
        for reader in self.readers {
            let chunk = reader.await.map_err(|e| Error::Internal {
                message: format!("output reader task failed: {e}"),
            })?;
            output.push_str(&chunk);
        }

        Ok(DrainResult {
            output,
            succeeded: status.success(),
            duration: self.started.elapsed(),
        })
    }
}

/// Terminal result of draining one process.
#[derive(Debug, Clone)]
pub struct DrainResult {
    /// Combined stdout/stderr output.
    pub output: String,
    /// True iff the process exited with status zero.
    pub succeeded: bool,
    /// Wall time from launch to exit.
    pub duration: Duration,
}

/// Launches a check in its working directory. Returns as soon as the
/// process is spawned.
///
/// A spawn failure (missing executable, permission denied) surfaces as
/// [`Error::Spawn`], distinct from the process running and exiting
/// non-zero - callers can tell "could not start" apart from "ran and
/// failed".
pub fn launch(spec: &CheckSpec) -> Result<RunningProcess> {
    launch_command(&spec.name, &spec.command, Some(&spec.dir))
}

/// Launches a raw command, optionally overriding the working directory.
/// The recovery install step uses this with `dir = None` so it runs in
/// the invoking environment.
pub fn launch_command(name: &str, command: &[String], dir: Option<&Path>) -> Result<RunningProcess> {
    let (program, args) = command.split_first().ok_or_else(|| Error::ConfigInvalid {
        field: format!("check.{name}.command"),
        message: "command must not be empty".to_string(),
    })?;

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    if let Some(dir) = dir {
        cmd.current_dir(dir);
    }

    let started = Instant::now();
    let mut child = cmd
        .spawn()
        .map_err(|e| Error::spawn(command.join(" "), e))?;

    let readers = vec![
        spawn_reader(child.stdout.take()),
        spawn_reader(child.stderr.take()),
    ];

    tracing::debug!(check = name, command = %command.join(" "), "launched");

    Ok(RunningProcess {
        name: name.to_string(),
        child,
        readers,
        started,
    })
}

/// Accumulates one output stream line by line on a background task.
fn spawn_reader<R>(stream: Option<R>) -> JoinHandle<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut output = String::new();
        if let Some(stream) = stream {
            let mut lines = BufReader::new(stream).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                output.push_str(&line);
                output.push('\n');
            }
        }
        output
    })
}

/// Checks if a command exists in PATH.
#[must_use]
pub fn command_exists(command: &str) -> bool {
    which::which(command).is_ok()
}
