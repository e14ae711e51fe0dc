//! Exec shim: launch child processes without spawning visible consoles, and
//! carry a job-scoped cancellation token through the wait.
//!
//! Grounded on the teacher's `process_ext.rs` (timeout + captured-stderr
//! child-process wait) and `ffmpeg_args/platform.rs` (`CREATE_NO_WINDOW` on
//! Windows), adapted from a blocking `std::process::Command` wait loop to an
//! async, cancellation-aware one since every remote/process wait in the
//! engine is a suspension point per `spec.md` §5.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;

/// Default drain time after a cancellation signal before a child is killed
/// outright, per `spec.md` §5 ("bounded drain time (default 5 s)").
pub const DEFAULT_DRAIN: Duration = Duration::from_secs(5);

/// Configure a command to avoid flashing console windows on Windows and to
/// detach stdio the caller doesn't read.
pub fn background_command(program: &str) -> Command {
    let mut cmd = Command::new(program);
    cmd.stdin(Stdio::null());
    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        const CREATE_NO_WINDOW: u32 = 0x0800_0000;
        cmd.creation_flags(CREATE_NO_WINDOW);
    }
    cmd
}

#[derive(Debug)]
pub struct ExecOutput {
    pub status: std::process::ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub cancelled: bool,
}

/// Run a command to completion, honouring `cancel`. On cancellation the
/// child is asked to terminate and force-killed if it has not exited within
/// `drain`; stdout/stderr collected so far are still returned.
pub async fn run_cancellable(
    mut cmd: Command,
    cancel: CancellationToken,
    drain: Duration,
) -> anyhow::Result<ExecOutput> {
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    let mut child: Child = cmd.spawn()?;

    let mut stdout_pipe = child.stdout.take();
    let mut stderr_pipe = child.stderr.take();

    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut pipe) = stdout_pipe.take() {
            let _ = pipe.read_to_end(&mut buf).await;
        }
        buf
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut pipe) = stderr_pipe.take() {
            let mut reader = BufReader::new(pipe);
            let _ = reader.read_to_end(&mut buf).await;
        }
        buf
    });

    let cancelled = tokio::select! {
        status = child.wait() => {
            let status = status?;
            let stdout = stdout_task.await.unwrap_or_default();
            let stderr = stderr_task.await.unwrap_or_default();
            return Ok(ExecOutput { status, stdout, stderr, cancelled: false });
        }
        () = cancel.cancelled() => true,
    };

    if cancelled {
        #[cfg(unix)]
        {
            if let Some(pid) = child.id() {
                unsafe {
                    libc_kill(pid as i32, 15); // SIGTERM
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = child.start_kill();
        }

        let status = tokio::select! {
            status = child.wait() => status?,
            () = tokio::time::sleep(drain) => {
                let _ = child.start_kill();
                child.wait().await?
            }
        };
        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = stderr_task.await.unwrap_or_default();
        return Ok(ExecOutput {
            status,
            stdout,
            stderr,
            cancelled: true,
        });
    }

    unreachable!()
}

#[cfg(unix)]
unsafe fn libc_kill(pid: i32, sig: i32) {
    // Minimal inline binding: avoids pulling in the `libc` crate for a
    // single syscall. Matches the teacher's preference for small
    // platform-specific shims (`elevation_shim.rs`, `platform.rs`) over
    // reaching for a dependency when the surface needed is this small.
    extern "C" {
        fn kill(pid: i32, sig: i32) -> i32;
    }
    let _ = kill(pid, sig);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_cancellable_completes_normally() {
        let cmd = background_command("true");
        let cancel = CancellationToken::new();
        let out = run_cancellable(cmd, cancel, DEFAULT_DRAIN).await.unwrap();
        assert!(!out.cancelled);
        assert!(out.status.success());
    }

    #[tokio::test]
    async fn run_cancellable_kills_on_cancel() {
        let mut cmd = background_command("sleep");
        cmd.arg("30");
        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel_clone.cancel();
        });
        let start = std::time::Instant::now();
        let out = run_cancellable(cmd, cancel, Duration::from_millis(200))
            .await
            .unwrap();
        assert!(out.cancelled);
        assert!(start.elapsed() < Duration::from_secs(2));
    }
}
