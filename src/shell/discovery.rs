//! Interactive shell executable lookup.
//!
//! Candidates are checked in order: each configured search directory next to
//! the running binary, then the bare program name on `PATH`. A candidate is
//! accepted only if running it with the version argument succeeds.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::InteractiveConfig;

/// Upper bound for one version probe.
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Executable file names tried inside each search directory.
fn executable_names(program: &str) -> Vec<String> {
    let mut names = vec![program.to_owned()];
    if !Path::new(program)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("exe"))
    {
        names.push(format!("{program}.exe"));
    }
    names
}

/// Paths checked before falling back to `PATH`, in lookup order.
#[must_use]
pub fn candidate_paths(base_dir: &Path, config: &InteractiveConfig) -> Vec<PathBuf> {
    let names = executable_names(&config.program);
    config
        .search_dirs
        .iter()
        .flat_map(|dir| names.iter().map(move |name| base_dir.join(dir).join(name)))
        .collect()
}

/// Directory holding the running binary, or `.` if it cannot be resolved.
#[must_use]
pub fn binary_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Run `program <version_arg>` and report whether it exited successfully.
pub async fn probe(program: &Path, version_arg: &str) -> bool {
    let status = Command::new(program)
        .arg(version_arg)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .status();

    match tokio::time::timeout(PROBE_TIMEOUT, status).await {
        Ok(Ok(status)) => status.success(),
        Ok(Err(err)) => {
            debug!(program = %program.display(), error = %err, "probe failed to run");
            false
        }
        Err(_elapsed) => {
            debug!(program = %program.display(), "probe timed out");
            false
        }
    }
}

/// Find a working interactive shell executable.
///
/// Returns `None` when interactive mode is disabled or no candidate passes
/// the version probe. Absence only disables interactive mode.
pub async fn discover(config: &InteractiveConfig, base_dir: &Path) -> Option<PathBuf> {
    if !config.enabled {
        info!("interactive mode disabled by configuration");
        return None;
    }

    if let Some(explicit) = &config.path {
        if probe(explicit, &config.version_arg).await {
            info!(path = %explicit.display(), "using configured interactive shell");
            return Some(explicit.clone());
        }
        warn!(path = %explicit.display(), "configured interactive shell did not run");
        return None;
    }

    for candidate in candidate_paths(base_dir, config) {
        if candidate.is_file() && probe(&candidate, &config.version_arg).await {
            info!(path = %candidate.display(), "using local interactive shell");
            return Some(candidate);
        }
    }

    let on_path = PathBuf::from(&config.program);
    if probe(&on_path, &config.version_arg).await {
        info!(program = config.program.as_str(), "using interactive shell from PATH");
        return Some(on_path);
    }

    warn!(
        program = config.program.as_str(),
        "interactive shell not found; install it on PATH or next to this binary \
         (searched {:?}); continuing in local-only mode",
        config.search_dirs
    );
    None
}
