//! Execution mode: which backend a command is routed to.

use std::fmt::{Display, Formatter};

/// Backend selected for incoming commands.
///
/// The session always starts in [`ExecMode::Local`]; only the dispatcher
/// changes it, in response to `mode ...` commands.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum ExecMode {
    /// One-shot commands through the host interpreter.
    #[default]
    Local,
    /// Commands piped into a persistent interactive shell.
    Interactive,
}

impl Display for ExecMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Interactive => f.write_str("interactive"),
        }
    }
}
