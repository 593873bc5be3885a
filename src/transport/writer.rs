//! Single writer task for the connection.
//!
//! Pong replies, command output and interactive shell lines all funnel
//! through one queue, so frames are never interleaved mid-write.

use futures_util::{Sink, SinkExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{AppError, Result};

/// Drain `frame_rx` into `sink` as text messages.
///
/// The task exits cleanly when:
/// - `cancel` is triggered (the sink is closed, ending the connection), or
/// - `frame_rx` is closed (all [`OutboundTx`](super::OutboundTx) handles dropped).
///
/// A failed write cancels `cancel` so the whole session shuts down: there is
/// no reconnection, and a connection that cannot be written to cannot
/// deliver output.
///
/// # Errors
///
/// Returns [`AppError::Transport`]`("write failed: …")` when the sink rejects
/// a frame.
pub async fn run_writer<S>(
    mut sink: S,
    mut frame_rx: mpsc::Receiver<String>,
    cancel: CancellationToken,
) -> Result<()>
where
    S: Sink<Message, Error = WsError> + Unpin,
{
    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                debug!("writer: cancellation received, closing connection");
                if let Err(err) = sink.close().await {
                    debug!(error = %err, "writer: close failed");
                }
                break;
            }

            frame = frame_rx.recv() => {
                let Some(frame) = frame else {
                    debug!("writer: frame channel closed, stopping");
                    break;
                };

                if let Err(err) = sink.send(Message::text(frame)).await {
                    warn!(error = %err, "writer: write to connection failed");
                    cancel.cancel();
                    return Err(AppError::Transport(format!("write failed: {err}")));
                }
            }
        }
    }

    Ok(())
}
