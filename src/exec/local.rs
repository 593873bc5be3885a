//! One-shot command execution on the host.
//!
//! Every failure is rendered as text for the console: a command that does
//! not start, exits non-zero, or runs past its deadline still produces an
//! output string, never an error.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tracing::{debug, info};

/// Run one console command in `working_dir`.
///
/// `cd` is handled in-process and may update `working_dir`; anything else
/// goes through the host interpreter with stdout and stderr captured
/// together, bounded by `timeout`.
pub async fn run_local(command: &str, working_dir: &mut PathBuf, timeout: Duration) -> String {
    let command = command.trim();
    if let Some(target) = cd_target(command) {
        return change_directory(target, working_dir);
    }
    run_shell(command, working_dir, timeout).await
}

/// Argument of a `cd` command, or `None` if `command` is not one.
#[must_use]
pub fn cd_target(command: &str) -> Option<&str> {
    if command == "cd" {
        return Some("");
    }
    command.strip_prefix("cd ").map(str::trim)
}

/// Resolve `target` against `working_dir` and switch to it if it is an
/// existing directory.
///
/// An empty target means the home directory; a leading `~` is expanded.
pub fn change_directory(target: &str, working_dir: &mut PathBuf) -> String {
    let path = resolve(target, working_dir);

    if path.is_dir() {
        if let Ok(canonical) = path.canonicalize() {
            info!(from = %working_dir.display(), to = %canonical.display(), "changed directory");
            *working_dir = canonical;
            return format!("Changed directory to: {}", working_dir.display());
        }
    }
    format!("cd: {}: No such file or directory", path.display())
}

fn resolve(target: &str, working_dir: &Path) -> PathBuf {
    let home = dirs::home_dir();

    if target.is_empty() {
        if let Some(home) = home {
            return home;
        }
        return working_dir.to_path_buf();
    }

    if let Some(rest) = target.strip_prefix('~') {
        if let Some(home) = home {
            if rest.is_empty() {
                return home;
            }
            if let Some(rest) = rest.strip_prefix(['/', '\\']) {
                return home.join(rest);
            }
        }
    }

    let path = Path::new(target);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        working_dir.join(path)
    }
}

#[cfg(windows)]
fn interpreter(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

/// `sh -c` in a fresh process group, so a timeout can reach everything the
/// command forked.
#[cfg(not(windows))]
fn interpreter(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    #[cfg(unix)]
    cmd.process_group(0);
    cmd
}

#[cfg(unix)]
fn kill_process_group(child: &Child) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id().and_then(|id| i32::try_from(id).ok()) else {
        return;
    };
    if let Err(err) = killpg(Pid::from_raw(pid), Signal::SIGKILL) {
        debug!(pid, error = %err, "failed to kill command process group");
    }
}

#[cfg(not(unix))]
fn kill_process_group(_child: &Child) {}

async fn run_shell(command: &str, working_dir: &Path, timeout: Duration) -> String {
    let mut child = match interpreter(command)
        .current_dir(working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
    {
        Ok(child) => child,
        Err(err) => return format!("Error executing command: {err}"),
    };

    let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
        return "Error executing command: failed to capture output".to_owned();
    };

    let finished = tokio::time::timeout(timeout, async {
        let output = read_combined(stdout, stderr).await?;
        let status = child.wait().await?;
        Ok::<_, std::io::Error>((status, output))
    })
    .await;

    match finished {
        Err(_elapsed) => {
            debug!(command, "local command timed out");
            kill_process_group(&child);
            // Dropping `child` kills the interpreter if the group kill missed it.
            format!("Command timed out ({}s limit)", timeout.as_secs())
        }
        Ok(Err(err)) => format!("Error executing command: {err}"),
        Ok(Ok((status, output))) => {
            let output = String::from_utf8_lossy(&output);
            if !status.success() {
                return format!("Error executing command: {status}\nOutput: {output}");
            }
            if output.is_empty() {
                let code = status
                    .code()
                    .map_or_else(|| "unknown".to_owned(), |code| code.to_string());
                return format!("Command executed (exit code: {code})");
            }
            output.into_owned()
        }
    }
}

/// Read both pipes to end-of-stream, appending chunks in arrival order.
async fn read_combined<O, E>(mut stdout: O, mut stderr: E) -> std::io::Result<Vec<u8>>
where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    let mut combined = Vec::new();
    let mut out_buf = [0_u8; 4096];
    let mut err_buf = [0_u8; 4096];
    let mut out_open = true;
    let mut err_open = true;

    while out_open || err_open {
        tokio::select! {
            read = stdout.read(&mut out_buf), if out_open => {
                let n = read?;
                if n == 0 {
                    out_open = false;
                } else {
                    combined.extend_from_slice(&out_buf[..n]);
                }
            }
            read = stderr.read(&mut err_buf), if err_open => {
                let n = read?;
                if n == 0 {
                    err_open = false;
                } else {
                    combined.extend_from_slice(&err_buf[..n]);
                }
            }
        }
    }

    Ok(combined)
}
