//! Error types shared across the client.

use std::fmt::{Display, Formatter};

/// Shared client result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Client error enumeration covering all domain failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// Connection dial, read, or write failure.
    Transport(String),
    /// Malformed frame or event payload.
    Codec(String),
    /// Interactive shell spawn or pipe failure.
    Shell(String),
    /// File-system or I/O operation failure.
    Io(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Transport(msg) => write!(f, "transport: {msg}"),
            Self::Codec(msg) => write!(f, "codec: {msg}"),
            Self::Shell(msg) => write!(f, "shell: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for AppError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
