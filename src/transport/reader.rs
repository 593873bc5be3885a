//! Reader task for the connection.
//!
//! Reads one WebSocket message at a time, decodes the transport frame and,
//! for event packets, the JSON event. Pings are answered with a pong through
//! the shared [`OutboundTx`]; events go to the dispatcher over `event_tx`.
//!
//! Malformed frames and payloads are logged and dropped; they never end the
//! loop.

use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::protocol::codec::{self, Event, Frame, Packet};
use crate::transport::OutboundTx;
use crate::Result;

/// What the reader should do after handling one text frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep reading.
    Continue,
    /// The server closed the session.
    Stop,
}

/// Act on one raw text frame.
///
/// # Errors
///
/// Returns `AppError::Transport` when a pong cannot be queued because the
/// writer task has stopped.
pub async fn handle_text(
    raw: &str,
    outbound: &OutboundTx,
    event_tx: &mpsc::Sender<Event>,
) -> Result<Flow> {
    let Some(frame) = codec::decode_frame(raw) else {
        debug!(raw, "reader: ignoring frame");
        return Ok(Flow::Continue);
    };

    match frame {
        Frame::Open(handshake) => {
            info!(handshake = handshake.as_str(), "connection opened");
        }
        Frame::Ping => {
            outbound.send_frame(codec::PONG_FRAME).await?;
        }
        Frame::Pong => {}
        Frame::Close => {
            info!("server closed the session");
            return Ok(Flow::Stop);
        }
        Frame::Message(data) => match codec::decode_packet(&data) {
            Some(Packet::Connect) => info!("socket.io namespace connected"),
            Some(Packet::Disconnect) => {
                info!("socket.io namespace disconnected");
                return Ok(Flow::Stop);
            }
            Some(Packet::ConnectError(reason)) => {
                warn!(reason = reason.as_str(), "socket.io namespace refused");
            }
            Some(Packet::Event(payload)) => match codec::decode_event(&payload) {
                Ok(Some(event)) => {
                    if event_tx.send(event).await.is_err() {
                        debug!("reader: event_tx closed, dropping event");
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(error = %err, payload = payload.as_str(), "failed to parse event");
                }
            },
            None => debug!(data = data.as_str(), "reader: ignoring packet"),
        },
    }

    Ok(Flow::Continue)
}

/// Reader task. Runs until the stream ends, the server closes the session,
/// a read fails, or `cancel` fires.
///
/// A read failure while running is logged at `WARN`; once `cancel` has fired
/// read failures are expected and only logged at `DEBUG`.
pub async fn run_reader<S>(
    mut stream: S,
    outbound: OutboundTx,
    event_tx: mpsc::Sender<Event>,
    cancel: CancellationToken,
) where
    S: Stream<Item = std::result::Result<Message, WsError>> + Unpin,
{
    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                debug!("reader: cancellation received, stopping");
                break;
            }

            item = stream.next() => {
                match item {
                    None => {
                        info!("connection closed");
                        break;
                    }
                    Some(Err(err)) => {
                        if cancel.is_cancelled() {
                            debug!(error = %err, "reader: read failed after stop");
                        } else {
                            warn!(error = %err, "error reading message");
                        }
                        break;
                    }
                    Some(Ok(Message::Text(text))) => {
                        match handle_text(text.as_str(), &outbound, &event_tx).await {
                            Ok(Flow::Continue) => {}
                            Ok(Flow::Stop) => break,
                            Err(err) => {
                                debug!(error = %err, "reader: outbound closed, stopping");
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        info!(?frame, "connection closed by server");
                        break;
                    }
                    Some(Ok(_)) => {
                        // Binary and WebSocket-level ping/pong frames carry
                        // nothing for this protocol.
                    }
                }
            }
        }
    }
}
