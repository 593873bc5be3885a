//! Shared helpers for end-to-end client tests.
//!
//! [`FakeServer`] is a minimal socket.io endpoint: it accepts one WebSocket
//! connection, sends the engine.io open frame and then lets the test read
//! and write raw text frames.

use std::path::PathBuf;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tokio_util::sync::CancellationToken;

use remote_console::client::{Client, ClientHandle};
use remote_console::config::ClientConfig;
use remote_console::protocol::codec::{decode_event_frame, OUTPUT_EVENT};
use remote_console::shell::proxy::ShellCommand;

/// How long a test waits for any single frame.
pub const WAIT: Duration = Duration::from_secs(10);

/// Listening socket awaiting the client.
pub struct FakeServer {
    listener: TcpListener,
}

/// Accepted client connection.
pub struct ServerConn {
    ws: WebSocketStream<TcpStream>,
}

impl FakeServer {
    pub async fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        Self { listener }
    }

    /// `http://` base URL the client should be pointed at.
    pub fn base_url(&self) -> String {
        let addr = self.listener.local_addr().expect("local addr");
        format!("http://{addr}")
    }

    /// Accept the client's connection and send the open frame.
    pub async fn accept(self) -> ServerConn {
        let (stream, _) = tokio::time::timeout(WAIT, self.listener.accept())
            .await
            .expect("client connects in time")
            .expect("accept");
        let ws = tokio_tungstenite::accept_async(stream)
            .await
            .expect("websocket handshake");
        let mut conn = ServerConn { ws };
        conn.send(r#"0{"sid":"test","upgrades":[],"pingInterval":25000,"pingTimeout":20000}"#)
            .await;
        conn
    }
}

impl ServerConn {
    pub async fn send(&mut self, frame: &str) {
        self.ws
            .send(Message::text(frame.to_owned()))
            .await
            .expect("server send");
    }

    /// Send an `execute_command` event.
    pub async fn execute(&mut self, command: &str) {
        let body = serde_json::json!(["execute_command", { "command": command }]);
        self.send(&format!("42{body}")).await;
    }

    /// Next text frame, or `None` once the client closed the connection.
    pub async fn recv(&mut self) -> Option<String> {
        loop {
            let item = tokio::time::timeout(WAIT, self.ws.next())
                .await
                .expect("frame within deadline");
            match item {
                Some(Ok(Message::Text(text))) => return Some(text.as_str().to_owned()),
                Some(Ok(Message::Close(_)) | Err(_)) | None => return None,
                Some(Ok(_)) => {}
            }
        }
    }

    /// Next `output_from_client` payload, skipping other frames.
    pub async fn recv_output(&mut self) -> String {
        loop {
            let frame = self.recv().await.expect("connection open");
            if let Some(event) = decode_event_frame(&frame).expect("valid frame") {
                assert_eq!(event.name, OUTPUT_EVENT);
                return event.field_str("output").expect("output field").to_owned();
            }
        }
    }
}

/// Config pointing at `server` with no settle delay.
pub fn test_config(base_url: String) -> ClientConfig {
    ClientConfig {
        server_url: base_url,
        settle_delay_millis: 0,
        command_timeout_seconds: 5,
        ..ClientConfig::default()
    }
}

/// Fake interactive backend that answers each line with `echo:<line>`.
pub fn echo_shell() -> ShellCommand {
    ShellCommand::new(
        "sh",
        [
            "-c",
            r#"while IFS= read -r line; do echo "echo:$line"; done"#,
        ],
    )
}

/// Start a client against a fresh server; returns both ends.
pub async fn start(
    shell: Option<ShellCommand>,
    working_dir: PathBuf,
) -> (ClientHandle, ServerConn) {
    let server = FakeServer::bind().await;
    let config = test_config(server.base_url());
    let client = Client::new(config, shell, working_dir);

    let accept = tokio::spawn(server.accept());
    let handle = client
        .connect(CancellationToken::new())
        .await
        .expect("client connects");
    let conn = accept.await.expect("accept task");
    (handle, conn)
}
