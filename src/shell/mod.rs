//! Interactive shell backend.
//!
//! - `codec`: lossy, length-bounded line framing for child output.
//! - `proxy`: persistent child process with a streaming output reader.
//! - `discovery`: locating the shell executable at startup.

pub mod codec;
pub mod discovery;
pub mod proxy;
