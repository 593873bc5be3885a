//! Client controller. Wires transport, dispatcher and shell together and
//! owns the shutdown contract.
//!
//! One [`CancellationToken`] covers the whole session. Cancelling it:
//! - stops the reader (later read errors are no longer treated as faults),
//! - kills any live interactive shell,
//! - closes the connection.

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::ClientConfig;
use crate::dispatcher::{run_dispatcher, Dispatcher, SessionState};
use crate::protocol::codec;
use crate::shell::proxy::{ShellCommand, ShellProxy};
use crate::transport::{self, reader, writer, OutboundTx};
use crate::Result;

/// Capacity of the reader → dispatcher event queue.
const EVENT_CAPACITY: usize = 64;

/// How long [`ClientHandle::wait`] lets tasks finish after a stop.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Client configuration resolved at startup.
#[derive(Debug, Clone)]
pub struct Client {
    config: ClientConfig,
    shell: Option<ShellCommand>,
    working_dir: PathBuf,
}

impl Client {
    /// Create a client. `shell` is `None` when no interactive backend is
    /// available; `working_dir` seeds the session's local directory.
    #[must_use]
    pub fn new(config: ClientConfig, shell: Option<ShellCommand>, working_dir: PathBuf) -> Self {
        Self {
            config,
            shell,
            working_dir,
        }
    }

    /// Dial the server and start the session tasks.
    ///
    /// Writes the connect frame right after the handshake; the dispatcher
    /// pushes the welcome banner once the settle delay has passed.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` for an unusable server URL and
    /// `AppError::Transport` if the connection cannot be established.
    pub async fn connect(self, cancel: CancellationToken) -> Result<ClientHandle> {
        let url = transport::socket_url(&self.config.server_url)?;
        let (sink, source) = transport::connect(&url).await?;
        info!(server = self.config.server_url.as_str(), "connected to server");

        let (outbound, frame_rx) = OutboundTx::channel();
        let writer_cancel = cancel.clone();
        let writer = tokio::spawn(async move {
            if let Err(err) = writer::run_writer(sink, frame_rx, writer_cancel).await {
                error!(%err, "connection writer failed");
            }
        });

        outbound.send_frame(codec::CONNECT_FRAME).await?;

        let (event_tx, event_rx) = mpsc::channel(EVENT_CAPACITY);

        let shell = self
            .shell
            .map(|command| ShellProxy::new(command, outbound.clone(), cancel.clone()));
        let state = SessionState::new(self.working_dir, self.config.server_url.clone());
        let dispatcher = Dispatcher::new(
            state,
            shell,
            outbound.clone(),
            self.config.command_timeout(),
        );
        let dispatcher = tokio::spawn(run_dispatcher(
            dispatcher,
            event_rx,
            self.config.settle_delay(),
            cancel.clone(),
        ));

        let reader = tokio::spawn(reader::run_reader(
            source,
            outbound,
            event_tx,
            cancel.clone(),
        ));

        Ok(ClientHandle {
            cancel,
            reader,
            writer,
            dispatcher,
        })
    }
}

/// Running session.
#[derive(Debug)]
pub struct ClientHandle {
    cancel: CancellationToken,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
    dispatcher: JoinHandle<()>,
}

impl ClientHandle {
    /// Session-wide cancellation token.
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Request shutdown. Safe to call more than once.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Block until the session is stopped, then give the tasks a short
    /// grace period to kill the shell and close the connection.
    ///
    /// A closed connection does not stop the session: with no reconnection
    /// logic the client idles until [`stop`](Self::stop) is called.
    pub async fn wait(self) {
        self.cancel.cancelled().await;

        let joined = tokio::time::timeout(SHUTDOWN_GRACE, async move {
            let _ = tokio::join!(self.dispatcher, self.reader, self.writer);
        })
        .await;
        if joined.is_err() {
            debug!("session tasks did not finish within the shutdown grace period");
        }
        info!("client stopped");
    }
}
