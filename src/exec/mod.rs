//! Local command execution.

pub mod local;
