//! Command dispatcher and session state machine.
//!
//! The dispatcher task is the single owner of [`SessionState`]: it alone
//! switches mode, changes directory and talks to the interactive shell.
//! The connection reader hands it events over a channel, so pings keep
//! being answered while a local command runs.
//!
//! | Input               | Local                    | Interactive              |
//! |---------------------|--------------------------|--------------------------|
//! | `mode local`        | stay, confirm            | switch, confirm          |
//! | `mode interactive`  | switch if available      | stay, confirm            |
//! | `help`              | capability listing       | capability listing       |
//! | `pwd`               | working directory        | forwarded to shell       |
//! | anything else       | local executor           | forwarded to shell       |
//!
//! Local results are answered at once with a trailing prompt. Interactive
//! commands get no direct answer; the shell's output streams back line by
//! line from the proxy's reader task.

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::exec::local;
use crate::mode::ExecMode;
use crate::protocol::codec::Event;
use crate::shell::proxy::ShellProxy;
use crate::transport::OutboundTx;

/// Prompt shown while in interactive mode.
pub const INTERACTIVE_PROMPT: &str = "interactive$ ";

/// Reply when interactive mode is requested but no shell was found.
pub const INTERACTIVE_UNAVAILABLE: &str =
    "Interactive mode not available. Please install the interactive shell first.";

/// Process-wide session record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    /// Backend that receives commands.
    pub mode: ExecMode,
    /// Directory for local commands.
    pub working_dir: PathBuf,
    /// Server the session is connected to.
    pub server_url: String,
}

impl SessionState {
    /// Fresh session in local mode.
    #[must_use]
    pub fn new(working_dir: PathBuf, server_url: impl Into<String>) -> Self {
        Self {
            mode: ExecMode::Local,
            working_dir,
            server_url: server_url.into(),
        }
    }

    /// `local:<dir name>$ ` or `interactive$ `.
    #[must_use]
    pub fn prompt(&self) -> String {
        match self.mode {
            ExecMode::Local => {
                let name = self.working_dir.file_name().map_or_else(
                    || self.working_dir.display().to_string(),
                    |name| name.to_string_lossy().into_owned(),
                );
                format!("local:{name}$ ")
            }
            ExecMode::Interactive => INTERACTIVE_PROMPT.to_owned(),
        }
    }
}

/// Routes console commands to the local executor or the interactive shell.
#[derive(Debug)]
pub struct Dispatcher {
    state: SessionState,
    shell: Option<ShellProxy>,
    outbound: OutboundTx,
    command_timeout: Duration,
}

impl Dispatcher {
    /// Create a dispatcher. `shell` is `None` when no interactive backend
    /// is available.
    #[must_use]
    pub fn new(
        state: SessionState,
        shell: Option<ShellProxy>,
        outbound: OutboundTx,
        command_timeout: Duration,
    ) -> Self {
        Self {
            state,
            shell,
            outbound,
            command_timeout,
        }
    }

    /// Current session state.
    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Whether interactive mode can be entered.
    #[must_use]
    pub fn interactive_available(&self) -> bool {
        self.shell.is_some()
    }

    /// Banner pushed once after connecting, ending in the prompt.
    #[must_use]
    pub fn welcome(&self) -> String {
        let mut commands = String::from("'mode local'");
        if self.interactive_available() {
            commands.push_str(", 'mode interactive'");
        }
        commands.push_str(", 'help'");

        format!(
            "Remote Console\nMode: {}\nCommands: {commands}\n{}",
            self.state.mode,
            self.state.prompt()
        )
    }

    /// Capability listing; interactive lines only when available.
    #[must_use]
    pub fn help_text(&self) -> String {
        let available = self.interactive_available();
        let mut help = String::from(
            "Available commands:\n- mode local: Switch to local terminal mode",
        );
        if available {
            help.push_str("\n- mode interactive: Switch to interactive shell mode");
        }
        help.push_str("\n- help: Show this help\n- Any system command (in local mode)");
        if available {
            help.push_str("\n- Any interactive shell command (in interactive mode)");
        }
        help
    }

    /// Handle one inbound event; only `execute_command` does anything.
    pub async fn handle_event(&mut self, event: &Event) {
        match event.execute_command() {
            Some(command) => self.execute(&command).await,
            None => debug!(event = event.name.as_str(), "ignoring event"),
        }
    }

    /// Execute one console command and emit any synchronous reply.
    pub async fn execute(&mut self, command: &str) {
        let command = command.trim();
        info!(command, mode = %self.state.mode, "executing command");

        let response = match command {
            "mode local" => {
                self.state.mode = ExecMode::Local;
                "Switched to local mode".to_owned()
            }
            "mode interactive" | "mode adb" => {
                if self.interactive_available() {
                    self.state.mode = ExecMode::Interactive;
                    "Switched to interactive mode".to_owned()
                } else {
                    INTERACTIVE_UNAVAILABLE.to_owned()
                }
            }
            "help" => self.help_text(),
            "pwd" if self.state.mode == ExecMode::Local => {
                self.state.working_dir.display().to_string()
            }
            _ => match self.state.mode {
                ExecMode::Local => {
                    local::run_local(command, &mut self.state.working_dir, self.command_timeout)
                        .await
                }
                ExecMode::Interactive => {
                    self.forward_interactive(command).await;
                    return;
                }
            },
        };

        self.reply(&response).await;
    }

    /// Terminate the interactive shell, if one is running.
    pub fn stop(&mut self) {
        if let Some(shell) = self.shell.as_mut() {
            shell.stop();
        }
    }

    async fn forward_interactive(&mut self, command: &str) {
        let Some(shell) = self.shell.as_mut() else {
            self.reply(INTERACTIVE_UNAVAILABLE).await;
            return;
        };

        if !shell.ensure_started() {
            self.reply("Failed to start interactive shell").await;
            return;
        }

        if let Err(err) = shell.send(command).await {
            warn!(error = %err, "failed to forward command");
            self.reply(&format!("Failed to send command to interactive shell: {err}"))
                .await;
        }
    }

    /// Emit `response`, a newline and the current prompt as one output event.
    async fn reply(&self, response: &str) {
        let text = format!("{response}\n{}", self.state.prompt());
        self.emit(&text).await;
    }

    async fn emit(&self, text: &str) {
        if let Err(err) = self.outbound.send_output(text).await {
            debug!(error = %err, "dropping output, connection writer stopped");
        }
    }
}

/// Dispatcher task: waits `settle_delay`, pushes the welcome banner, then
/// handles events until the channel closes or `cancel` fires.
///
/// Cancellation interrupts a running local command (its process is killed)
/// and stops the interactive shell.
pub async fn run_dispatcher(
    mut dispatcher: Dispatcher,
    mut event_rx: mpsc::Receiver<Event>,
    settle_delay: Duration,
    cancel: CancellationToken,
) {
    tokio::select! {
        biased;

        () = cancel.cancelled() => {
            dispatcher.stop();
            return;
        }
        () = tokio::time::sleep(settle_delay) => {}
    }

    let welcome = dispatcher.welcome();
    dispatcher.emit(&welcome).await;

    loop {
        let event = tokio::select! {
            biased;

            () = cancel.cancelled() => break,
            event = event_rx.recv() => event,
        };

        let Some(event) = event else {
            debug!("dispatcher: event channel closed, stopping");
            break;
        };

        tokio::select! {
            biased;

            () = cancel.cancelled() => break,
            () = dispatcher.handle_event(&event) => {}
        }
    }

    dispatcher.stop();
    debug!("dispatcher: stopped");
}
