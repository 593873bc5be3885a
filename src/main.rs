#![forbid(unsafe_code)]

//! `remote-console`: remote command-execution client binary.
//!
//! Resolves configuration, looks up the interactive shell, connects to the
//! console server and runs until interrupted.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use remote_console::client::Client;
use remote_console::config::ClientConfig;
use remote_console::shell::discovery;
use remote_console::shell::proxy::ShellCommand;
use remote_console::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "remote-console", about = "Remote console client", version, long_about = None)]
struct Cli {
    /// Console server endpoint [default: http://localhost:5001].
    server_url: Option<String>,

    /// Path to an optional TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Interactive shell executable; skips discovery.
    #[arg(long)]
    shell: Option<PathBuf>,

    /// Run in local-only mode.
    #[arg(long)]
    no_interactive: bool,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("remote-console client bootstrap");

    // `ring` is the only provider compiled in; installing twice is harmless.
    let _ = rustls::crypto::ring::default_provider().install_default();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let mut config = match &args.config {
        Some(path) => ClientConfig::load_from_path(path)?,
        None => ClientConfig::default(),
    };
    if let Some(url) = args.server_url {
        config.server_url = url;
    }
    if let Some(shell) = args.shell {
        config.interactive.path = Some(shell);
    }
    if args.no_interactive {
        config.interactive.enabled = false;
    }
    config.validate()?;
    info!(server = config.server_url.as_str(), "configuration loaded");

    // ── Locate the interactive shell ────────────────────
    let shell = discovery::discover(&config.interactive, &discovery::binary_dir())
        .await
        .map(|program| ShellCommand::new(program, config.interactive.args.clone()));

    let working_dir = std::env::current_dir()
        .map_err(|err| AppError::Config(format!("cannot read current directory: {err}")))?;

    // ── Connect ─────────────────────────────────────────
    let cancel = CancellationToken::new();
    let client = Client::new(config, shell, working_dir);
    let handle = client.connect(cancel.clone()).await.map_err(|err| {
        error!(%err, "failed to connect");
        err
    })?;

    // ── Run until stopped ───────────────────────────────
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("shutting down");
        signal_cancel.cancel();
    });

    handle.wait().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter).with_writer(std::io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
