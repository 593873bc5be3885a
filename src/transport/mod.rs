//! WebSocket transport to the console server.
//!
//! The connection is split once after dialing:
//! - `writer`: the only task that touches the sink. Every other component
//!   queues frames through an [`OutboundTx`].
//! - `reader`: the only task that reads the stream. It answers pings and
//!   hands decoded events to the dispatcher.

pub mod reader;
pub mod writer;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::info;
use url::Url;

use crate::protocol::codec;
use crate::{AppError, Result};

/// Path of the socket.io endpoint on the server.
pub const SOCKET_PATH: &str = "/socket.io/";

/// engine.io protocol revision requested in the query string.
pub const PROTOCOL_VERSION: &str = "4";

/// Capacity of the outbound frame queue.
const OUTBOUND_CAPACITY: usize = 256;

/// Full WebSocket stream type returned by the dialer.
pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Write half owned by the writer task.
pub type WsSink = SplitSink<WsStream, Message>;

/// Read half owned by the reader task.
pub type WsSource = SplitStream<WsStream>;

/// Rewrite a base server URL into its socket.io WebSocket endpoint.
///
/// `http` becomes `ws`, `https` becomes `wss` (`ws`/`wss` are kept), the
/// path is replaced with [`SOCKET_PATH`], and `EIO=4&transport=websocket`
/// is set on the query, replacing any earlier values for those keys.
///
/// # Errors
///
/// Returns `AppError::Config` if the URL does not parse or uses another
/// scheme.
pub fn socket_url(base: &str) -> Result<Url> {
    let mut url =
        Url::parse(base).map_err(|err| AppError::Config(format!("invalid server URL: {err}")))?;

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(AppError::Config(format!(
                "unsupported server URL scheme `{other}`"
            )))
        }
    };
    url.set_scheme(scheme)
        .map_err(|()| AppError::Config(format!("cannot switch scheme to {scheme}")))?;
    url.set_path(SOCKET_PATH);

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "EIO" && key != "transport")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair("EIO", PROTOCOL_VERSION)
        .append_pair("transport", "websocket");

    Ok(url)
}

/// Dial the server and split the connection into its two halves.
///
/// # Errors
///
/// Returns `AppError::Transport` if the handshake fails.
pub async fn connect(url: &Url) -> Result<(WsSink, WsSource)> {
    info!(url = %url, "connecting");
    let (stream, _response) = tokio_tungstenite::connect_async(url.as_str()).await?;
    info!(url = %url, "connected");
    Ok(stream.split())
}

/// Cloneable handle for queueing frames to the writer task.
#[derive(Debug, Clone)]
pub struct OutboundTx {
    tx: mpsc::Sender<String>,
}

impl OutboundTx {
    /// Create a handle plus the receiver the writer task drains.
    #[must_use]
    pub fn channel() -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(OUTBOUND_CAPACITY);
        (Self { tx }, rx)
    }

    /// Queue one raw frame.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Transport` once the writer task has stopped.
    pub async fn send_frame(&self, frame: impl Into<String>) -> Result<()> {
        self.tx
            .send(frame.into())
            .await
            .map_err(|_| AppError::Transport("outbound queue closed".into()))
    }

    /// Queue an `output_from_client` event.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Transport` once the writer task has stopped.
    pub async fn send_output(&self, output: &str) -> Result<()> {
        self.send_frame(codec::encode_output(output)).await
    }
}
