#![forbid(unsafe_code)]

//! Remote console client.
//!
//! Connects to a socket.io console server, receives `execute_command`
//! events and runs each command either locally or in a persistent
//! interactive shell, streaming results back as `output_from_client`.

pub mod client;
pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod exec;
pub mod mode;
pub mod protocol;
pub mod shell;
pub mod transport;

pub use config::ClientConfig;
pub use errors::{AppError, Result};
