//! Persistent interactive shell backend.
//!
//! A [`ShellProxy`] owns at most one live child process. Commands are
//! written to the child's stdin; a dedicated reader task streams every
//! stdout/stderr line back to the console as an `output_from_client` event.
//!
//! The child's lifecycle is an explicit state machine:
//!
//! ```text
//! NotStarted ──start──▶ Running ──exit/stop──▶ Exited ──start──▶ Running
//! ```
//!
//! An exited child is never reused; the next command starts a fresh one.

use std::path::PathBuf;
use std::process::Stdio;

use futures_util::StreamExt;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tokio::task::JoinHandle;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::shell::codec::ShellLineCodec;
use crate::transport::OutboundTx;
use crate::{AppError, Result};

/// Program and arguments that open an interactive session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    /// Executable path or name resolved on `PATH`.
    pub program: PathBuf,
    /// Arguments, e.g. `["shell"]`.
    pub args: Vec<String>,
}

impl ShellCommand {
    /// Build a shell command from a program and its arguments.
    #[must_use]
    pub fn new(
        program: impl Into<PathBuf>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

/// Live child process plus the handles the proxy owns exclusively.
#[derive(Debug)]
struct RunningShell {
    child: Child,
    stdin: ChildStdin,
    reader: JoinHandle<()>,
    /// Stops this child's reader without touching the session token.
    cancel: CancellationToken,
}

/// Lifecycle state of the interactive child.
#[derive(Debug, Default)]
enum ShellState {
    #[default]
    NotStarted,
    Running(RunningShell),
    Exited,
}

/// Observable lifecycle phase, for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellPhase {
    /// No child has been spawned yet.
    NotStarted,
    /// A child is alive and its reader task is streaming.
    Running,
    /// The last child exited or was stopped.
    Exited,
}

/// Interactive shell backend.
#[derive(Debug)]
pub struct ShellProxy {
    command: ShellCommand,
    outbound: OutboundTx,
    session_cancel: CancellationToken,
    state: ShellState,
}

impl ShellProxy {
    /// Create a proxy; no process is spawned until the first command.
    #[must_use]
    pub fn new(
        command: ShellCommand,
        outbound: OutboundTx,
        session_cancel: CancellationToken,
    ) -> Self {
        Self {
            command,
            outbound,
            session_cancel,
            state: ShellState::NotStarted,
        }
    }

    /// Current lifecycle phase, after observing any child exit.
    pub fn phase(&mut self) -> ShellPhase {
        self.refresh();
        match self.state {
            ShellState::NotStarted => ShellPhase::NotStarted,
            ShellState::Running(_) => ShellPhase::Running,
            ShellState::Exited => ShellPhase::Exited,
        }
    }

    /// Make sure a live child exists, spawning one if needed.
    ///
    /// Returns `false` when the spawn or pipe capture fails; no half-started
    /// process is kept in that case.
    pub fn ensure_started(&mut self) -> bool {
        self.refresh();
        if matches!(self.state, ShellState::Running(_)) {
            return true;
        }

        match self.spawn() {
            Ok(running) => {
                info!(
                    program = %self.command.program.display(),
                    pid = running.child.id(),
                    "interactive shell started"
                );
                self.state = ShellState::Running(running);
                true
            }
            Err(err) => {
                warn!(error = %err, "failed to start interactive shell");
                false
            }
        }
    }

    /// Write `command` plus a newline to the child's stdin.
    ///
    /// Does not wait for any output; the reader task streams it later.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Shell` if no child is running or the write fails.
    /// A failed write moves the proxy to `Exited`.
    pub async fn send(&mut self, command: &str) -> Result<()> {
        let ShellState::Running(running) = &mut self.state else {
            return Err(AppError::Shell("interactive shell is not running".into()));
        };

        let mut line = String::with_capacity(command.len() + 1);
        line.push_str(command);
        line.push('\n');

        let written = async {
            running.stdin.write_all(line.as_bytes()).await?;
            running.stdin.flush().await
        }
        .await;

        if let Err(err) = written {
            warn!(error = %err, "write to interactive shell failed");
            self.stop();
            return Err(AppError::Shell(format!("write failed: {err}")));
        }
        Ok(())
    }

    /// Forcibly terminate the live child, if any.
    ///
    /// Kill failures are ignored; termination is best effort.
    pub fn stop(&mut self) {
        if !matches!(self.state, ShellState::Running(_)) {
            return;
        }
        if let ShellState::Running(mut running) =
            std::mem::replace(&mut self.state, ShellState::Exited)
        {
            running.cancel.cancel();
            if let Err(err) = running.child.start_kill() {
                debug!(error = %err, "interactive shell kill failed");
            }
            info!("interactive shell stopped");
        }
    }

    /// Transition `Running` to `Exited` when the child has exited or its
    /// output reader has finished.
    ///
    /// After a natural exit the reader keeps draining whatever output is
    /// still buffered in the pipes; it ends on end-of-stream.
    fn refresh(&mut self) {
        let ShellState::Running(running) = &mut self.state else {
            return;
        };

        match running.child.try_wait() {
            Ok(Some(status)) => {
                info!(%status, "interactive shell exited");
                self.state = ShellState::Exited;
            }
            Ok(None) if running.reader.is_finished() => {
                info!("interactive shell output closed");
                self.stop();
            }
            Ok(None) => {}
            Err(err) => {
                warn!(error = %err, "failed to poll interactive shell");
                self.stop();
            }
        }
    }

    fn spawn(&self) -> Result<RunningShell> {
        let mut child = Command::new(&self.command.program)
            .args(&self.command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| AppError::Shell(format!("failed to spawn shell: {err}")))?;

        let pipes = (child.stdin.take(), child.stdout.take(), child.stderr.take());
        let (Some(stdin), Some(stdout), Some(stderr)) = pipes else {
            // `child` is dropped here and killed by `kill_on_drop`.
            return Err(AppError::Shell("failed to capture shell stdio".into()));
        };

        let cancel = self.session_cancel.child_token();
        let reader = tokio::spawn(run_output_reader(
            stdout,
            stderr,
            self.outbound.clone(),
            cancel.clone(),
        ));

        Ok(RunningShell {
            child,
            stdin,
            reader,
            cancel,
        })
    }
}

impl Drop for ShellProxy {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Output reader task. Forwards each non-empty line from `stdout` and
/// `stderr` as an output event.
///
/// Lines from one stream keep their order; the two streams interleave in
/// arrival order. Ends when both streams close, the outbound queue closes,
/// or `cancel` fires. End-of-stream is normal; other read errors are logged
/// unless the session is stopping.
pub async fn run_output_reader<O, E>(
    stdout: O,
    stderr: E,
    outbound: OutboundTx,
    cancel: CancellationToken,
) where
    O: AsyncRead + Unpin + Send,
    E: AsyncRead + Unpin + Send,
{
    let mut out = FramedRead::new(stdout, ShellLineCodec::new());
    let mut err = FramedRead::new(stderr, ShellLineCodec::new());
    let mut out_open = true;
    let mut err_open = true;

    while out_open || err_open {
        let item = tokio::select! {
            biased;

            () = cancel.cancelled() => {
                debug!("shell reader: cancellation received, stopping");
                break;
            }

            item = out.next(), if out_open => {
                if item.is_none() {
                    out_open = false;
                }
                item
            }

            item = err.next(), if err_open => {
                if item.is_none() {
                    err_open = false;
                }
                item
            }
        };

        match item {
            None => {}
            Some(Ok(line)) => {
                if line.is_empty() {
                    continue;
                }
                if outbound.send_output(&line).await.is_err() {
                    debug!("shell reader: outbound closed, stopping");
                    break;
                }
            }
            Some(Err(read_err)) => {
                if !cancel.is_cancelled() {
                    warn!(error = %read_err, "error reading interactive shell output");
                }
                break;
            }
        }
    }

    debug!("shell reader: finished");
}
