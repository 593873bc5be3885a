//! Client configuration parsing and validation.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::{AppError, Result};

/// Server endpoint used when none is given on the command line.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:5001";

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.into()
}

fn default_command_timeout_seconds() -> u64 {
    30
}

fn default_settle_delay_millis() -> u64 {
    100
}

fn default_program() -> String {
    "adb".into()
}

fn default_args() -> Vec<String> {
    vec!["shell".into()]
}

fn default_search_dirs() -> Vec<PathBuf> {
    vec![PathBuf::from("adb"), PathBuf::from("platform-tools")]
}

fn default_version_arg() -> String {
    "version".into()
}

fn default_true() -> bool {
    true
}

/// Interactive shell backend settings.
///
/// The defaults describe an Android device shell (`adb shell`), looked up
/// next to the running binary first and on `PATH` second.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct InteractiveConfig {
    /// Whether interactive mode may be offered at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Executable name probed in the search directories and on `PATH`.
    #[serde(default = "default_program")]
    pub program: String,
    /// Arguments that open the persistent session.
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    /// Directories, relative to the binary, searched before `PATH`.
    #[serde(default = "default_search_dirs")]
    pub search_dirs: Vec<PathBuf>,
    /// Argument used to verify a candidate executable actually runs.
    #[serde(default = "default_version_arg")]
    pub version_arg: String,
    /// Explicit executable path; skips discovery when set.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for InteractiveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            program: default_program(),
            args: default_args(),
            search_dirs: default_search_dirs(),
            version_arg: default_version_arg(),
            path: None,
        }
    }
}

/// Top-level client configuration, parsed from an optional TOML file and
/// then overridden from the command line.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ClientConfig {
    /// Base server endpoint (`http`, `https`, `ws` or `wss`).
    #[serde(default = "default_server_url")]
    pub server_url: String,
    /// Deadline for one local command.
    #[serde(default = "default_command_timeout_seconds")]
    pub command_timeout_seconds: u64,
    /// Pause between the connect frame and the welcome banner.
    #[serde(default = "default_settle_delay_millis")]
    pub settle_delay_millis: u64,
    /// Interactive backend settings.
    #[serde(default)]
    pub interactive: InteractiveConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            command_timeout_seconds: default_command_timeout_seconds(),
            settle_delay_millis: default_settle_delay_millis(),
            interactive: InteractiveConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Per-command deadline for the local executor.
    #[must_use]
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_seconds)
    }

    /// Delay before the welcome banner is pushed.
    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_millis)
    }

    /// Check invariants that `serde` defaults cannot express.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` when the timeout is zero or the server URL
    /// is not an `http`/`https`/`ws`/`wss` URL.
    pub fn validate(&self) -> Result<()> {
        if self.command_timeout_seconds == 0 {
            return Err(AppError::Config(
                "command_timeout_seconds must be greater than zero".into(),
            ));
        }

        let url = Url::parse(&self.server_url)
            .map_err(|err| AppError::Config(format!("server_url invalid: {err}")))?;
        match url.scheme() {
            "http" | "https" | "ws" | "wss" => Ok(()),
            other => Err(AppError::Config(format!(
                "server_url scheme `{other}` is not supported"
            ))),
        }
    }
}
