//! Shared helpers for spawning and tearing down external backend processes.
//!
//! Every supervisor (office, browser) and the markup converter bottoms out
//! in these primitives: wait for a process to become ready, run it to
//! completion under a deadline, and kill an entire process tree when a
//! timeout fires or a worker crashes and leaves orphaned children behind.

use std::path::Path;
use std::time::Duration;

use sysinfo::{Pid, System};
use tokio::io::{AsyncWriteExt, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::time::{Instant, sleep};

/// Poll until both `path_a` and `path_b` exist, or fail once `timeout`
/// elapses. Used by the office-worker supervisor to observe its PID file
/// and profile directory appearing on disk after it launches.
///
/// A one-shot bounded poll is simpler and more auditable than subscribing
/// to a filesystem watcher for something this short-lived and narrow in
/// scope (two specific paths, one deadline).
pub async fn wait_for_paths(path_a: &Path, path_b: &Path, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    let mut interval = tokio::time::interval(Duration::from_millis(100));

    loop {
        if tokio::fs::try_exists(path_a).await.unwrap_or(false)
            && tokio::fs::try_exists(path_b).await.unwrap_or(false)
        {
            return true;
        }

        if Instant::now() >= deadline {
            return false;
        }

        interval.tick().await;
    }
}

/// Send a kill signal to `pid` and to every process whose parent is `pid`,
/// recursively. Office workers sometimes spawn helper children (renderer
/// sub-processes); killing only the direct child via `Child::kill()` can
/// leave those running and jamming the port the worker is bound to.
pub fn kill_process_tree(pid: u32) {
    let mut system = System::new_all();
    system.refresh_all();

    let mut to_kill = vec![pid];
    let mut frontier = vec![pid];

    while let Some(parent) = frontier.pop() {
        for (child_pid, process) in system.processes() {
            if process.parent().map(|p| p.as_u32()) == Some(parent) {
                let child_pid = child_pid.as_u32();
                if !to_kill.contains(&child_pid) {
                    to_kill.push(child_pid);
                    frontier.push(child_pid);
                }
            }
        }
    }

    for target in to_kill {
        if let Some(process) = system.process(Pid::from_u32(target)) {
            let _ = process.kill();
        }
    }
}

/// Result of running a one-shot child process to completion.
pub struct ProcessOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: Option<i32>,
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("process timed out")]
    Timeout,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Spawn `command` with piped stdio, write `input` to stdin, collect
/// stdout/stderr, and enforce `timeout` as a hard deadline. On timeout the
/// child process (and, if given, a long-lived sibling process) are killed
/// before returning `RunError::Timeout`. Cancellation of an external
/// process is only ever a kill signal, never cooperative.
pub async fn run_with_timeout(
    mut command: Command,
    input: Vec<u8>,
    timeout: Duration,
    also_kill_on_timeout: Option<u32>,
) -> Result<ProcessOutput, RunError> {
    command
        .stdin(std::process::Stdio::piped())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        // On timeout we drop this future; `kill_on_drop` makes tokio send
        // the kill signal to the transport process itself as part of that
        // drop, rather than leaving it to exit on its own.
        .kill_on_drop(true);

    let run = async move {
        let mut child = command.spawn()?;
        let mut stdin = child.stdin.take().expect("piped stdin");
        let mut stdout = child.stdout.take().expect("piped stdout");
        let mut stderr = child.stderr.take().expect("piped stderr");

        let write_input = async {
            let _ = stdin.write_all(&input).await;
            drop(stdin);
        };
        let read_stdout = async {
            let mut buf = Vec::new();
            let _ = stdout.read_to_end(&mut buf).await;
            buf
        };
        let read_stderr = async {
            let mut buf = Vec::new();
            let _ = stderr.read_to_end(&mut buf).await;
            buf
        };

        // stdout/stderr must be drained concurrently with each other and
        // with closing stdin. Reading them sequentially can deadlock if
        // the child fills one pipe's buffer while we're blocked draining
        // the other.
        let (_, out, err) = tokio::join!(write_input, read_stdout, read_stderr);
        let status = child.wait().await?;
        Ok::<_, std::io::Error>((out, err, status))
    };

    match tokio::time::timeout(timeout, run).await {
        Ok(Ok((stdout, stderr, status))) => Ok(ProcessOutput {
            stdout,
            stderr,
            exit_code: status.code(),
        }),
        Ok(Err(e)) => Err(RunError::Io(e)),
        Err(_) => {
            if let Some(pid) = also_kill_on_timeout {
                kill_process_tree(pid);
            }
            Err(RunError::Timeout)
        }
    }
}

/// Best-effort kill of a still-running child, logging instead of
/// propagating failures. Callers are always in a cleanup path where
/// there's nothing useful to do with a kill error.
pub fn kill_best_effort(child: &mut Child, context: &str) {
    if let Err(error) = child.start_kill() {
        tracing::warn!(%context, %error, "failed to kill process");
    }
}

pub async fn sleep_for(duration: Duration) {
    sleep(duration).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn wait_for_paths_succeeds_once_both_appear() {
        let dir = tempfile::tempdir().unwrap();
        let path_a = dir.path().join("a");
        let path_b = dir.path().join("b");

        tokio::fs::write(&path_a, b"").await.unwrap();
        let path_b_clone = path_b.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            tokio::fs::write(&path_b_clone, b"").await.unwrap();
        });

        assert!(wait_for_paths(&path_a, &path_b, Duration::from_secs(2)).await);
    }

    #[tokio::test]
    async fn wait_for_paths_times_out_when_one_never_appears() {
        let dir = tempfile::tempdir().unwrap();
        let path_a = dir.path().join("a");
        let path_b = dir.path().join("missing");
        tokio::fs::write(&path_a, b"").await.unwrap();

        assert!(!wait_for_paths(&path_a, &path_b, Duration::from_millis(200)).await);
    }
}
