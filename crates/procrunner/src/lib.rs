//! Spawns a whitelisted command and streams its stdout/stderr, line
//! buffered, into a job's event sink. Exposes a cancel handle that kills
//! the entire process tree rather than a single PID.

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use gd_domain::job::{LogStream, ProgressKind};

/// Context a runner reports progress through. Implemented by the job
/// manager so a single `run_command` call can drive a job's event ring
/// without `procrunner` knowing anything about jobs.
pub trait RunnerContext: Send + Sync + 'static {
    fn log_stdout(&self, line: String);
    fn log_stderr(&self, line: String);
    fn progress(&self, kind: ProgressKind, percent: Option<u8>, detail: Option<String>);
    /// Called once the child is spawned so the owner can cancel it later.
    fn set_cancel(&self, cancel: CancelHandle);
    fn is_cancelled(&self) -> bool;
}

/// A handle that terminates the whole process tree of a spawned command.
#[derive(Clone)]
pub struct CancelHandle {
    #[cfg(unix)]
    pgid: i32,
    #[cfg(not(unix))]
    pid: u32,
}

impl CancelHandle {
    /// Best-effort SIGTERM to the process group (Unix) or the single PID
    /// (other platforms — no portable "kill the tree" primitive there).
    pub fn kill(&self) {
        #[cfg(unix)]
        {
            use nix::sys::signal::{killpg, Signal};
            use nix::unistd::Pid;
            let _ = killpg(Pid::from_raw(self.pgid), Signal::SIGTERM);
        }
        #[cfg(not(unix))]
        {
            // No portable process-group kill; rely on the caller having
            // already issued Child::start_kill() on the direct child.
            let _ = self.pid;
        }
    }
}

/// Parses a single stderr line into an optional `(percent, detail)` pair,
/// e.g. git's `Receiving objects:  42% (...)`.
pub type ProgressParser = fn(&str) -> Option<(Option<u8>, Option<String>)>;

pub struct RunOutcome {
    pub success: bool,
    pub exit_code: Option<i32>,
}

/// Spawn `program args` with cwd `cwd`, forward line-buffered stdout and
/// stderr to `ctx`, and await completion. Returns once the process exits;
/// the caller's job manager enforces the wall-clock timeout by racing this
/// future against a timer and invoking the registered cancel handle.
pub async fn run_command<C: RunnerContext>(
    ctx: Arc<C>,
    program: &str,
    args: &[String],
    cwd: &Path,
    progress_kind: Option<ProgressKind>,
    stderr_progress: Option<ProgressParser>,
) -> std::io::Result<RunOutcome> {
    let mut cmd = Command::new(program);
    cmd.args(args);
    cmd.current_dir(cwd);
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.stdin(Stdio::null());

    #[cfg(unix)]
    {
        // New process group rooted at this child's pid, so the whole tree
        // (e.g. git's ssh-askpass or npm's forked installers) dies together.
        cmd.process_group(0);
    }

    let mut child = cmd.spawn()?;

    let pid = child.id().unwrap_or(0);
    #[cfg(unix)]
    let cancel = CancelHandle { pgid: pid as i32 };
    #[cfg(not(unix))]
    let cancel = CancelHandle { pid };
    ctx.set_cancel(cancel);

    let stdout = child.stdout.take().expect("piped stdout");
    let stderr = child.stderr.take().expect("piped stderr");

    let ctx_out = ctx.clone();
    let stdout_task = tokio::spawn(async move {
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            ctx_out.log_stdout(line);
        }
    });

    let ctx_err = ctx.clone();
    let stderr_task = tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if let (Some(kind), Some(parse)) = (progress_kind, stderr_progress) {
                if let Some((percent, detail)) = parse(&line) {
                    ctx_err.progress(kind, percent, detail);
                }
            }
            ctx_err.log_stderr(line);
        }
    });

    let status = child.wait().await?;
    let _ = stdout_task.await;
    let _ = stderr_task.await;

    tracing::debug!(pid, code = ?status.code(), "child process exited");

    Ok(RunOutcome {
        success: status.success(),
        exit_code: status.code(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Default)]
    struct RecordingContext {
        stdout: Mutex<Vec<String>>,
        stderr: Mutex<Vec<String>>,
        cancelled: std::sync::atomic::AtomicBool,
    }

    impl RunnerContext for RecordingContext {
        fn log_stdout(&self, line: String) {
            self.stdout.lock().push(line);
        }
        fn log_stderr(&self, line: String) {
            self.stderr.lock().push(line);
        }
        fn progress(&self, _kind: ProgressKind, _percent: Option<u8>, _detail: Option<String>) {}
        fn set_cancel(&self, _cancel: CancelHandle) {}
        fn is_cancelled(&self) -> bool {
            self.cancelled.load(std::sync::atomic::Ordering::Relaxed)
        }
    }

    #[tokio::test]
    async fn captures_stdout_lines() {
        let ctx = Arc::new(RecordingContext::default());
        let dir = tempfile::tempdir().unwrap();
        let outcome = run_command(
            ctx.clone(),
            "sh",
            &["-c".into(), "echo one; echo two".into()],
            dir.path(),
            None,
            None,
        )
        .await
        .unwrap();

        assert!(outcome.success);
        assert_eq!(*ctx.stdout.lock(), vec!["one".to_string(), "two".to_string()]);
    }

    #[tokio::test]
    async fn nonzero_exit_is_not_success() {
        let ctx = Arc::new(RecordingContext::default());
        let dir = tempfile::tempdir().unwrap();
        let outcome = run_command(ctx, "sh", &["-c".into(), "exit 3".into()], dir.path(), None, None)
            .await
            .unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.exit_code, Some(3));
    }

    #[tokio::test]
    async fn stderr_progress_is_parsed() {
        let ctx = Arc::new(RecordingContext::default());
        let dir = tempfile::tempdir().unwrap();
        fn parse(line: &str) -> Option<(Option<u8>, Option<String>)> {
            if line.contains("42%") {
                Some((Some(42), Some(line.to_string())))
            } else {
                None
            }
        }
        run_command(
            ctx.clone(),
            "sh",
            &["-c".into(), "echo 'Receiving objects: 42% (1/2)' 1>&2".into()],
            dir.path(),
            Some(ProgressKind::Git),
            Some(parse),
        )
        .await
        .unwrap();
        assert_eq!(ctx.stderr.lock().len(), 1);
    }
}
