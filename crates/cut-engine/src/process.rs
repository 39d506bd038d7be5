//! External process execution under a deadline.

use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use povtrim_common::error::{PovError, PovResult};

/// Lines of stderr kept in error reports.
const STDERR_TAIL_LINES: usize = 20;

/// Overall time budget shared by every process of one cut.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    budget: Duration,
}

impl Deadline {
    pub fn new(budget: Duration) -> Self {
        Self {
            started: Instant::now(),
            budget,
        }
    }

    /// Time left, or `None` once the budget is spent.
    pub fn remaining(&self) -> Option<Duration> {
        self.budget
            .checked_sub(self.started.elapsed())
            .filter(|left| !left.is_zero())
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }
}

/// Captured output of a successful run.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Run `program` to completion within what is left of `deadline`.
///
/// The child is killed when the deadline passes. Non-zero exit and
/// timeout both carry the tail of stderr.
pub async fn run_tool<I, S>(program: &Path, args: I, deadline: &Deadline) -> PovResult<ToolOutput>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let name = program_name(program);
    let Some(remaining) = deadline.remaining() else {
        return Err(PovError::ProcessTimeout {
            program: name,
            timeout_secs: deadline.budget().as_secs_f64(),
            stderr: "deadline expired before the process was started".to_string(),
        });
    };

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            PovError::unsupported(format!("{} not found (is it installed and on PATH?)", program.display()))
        } else {
            PovError::Io(e)
        }
    })?;
    tracing::debug!(program = %name, pid = child.id(), "Process started");

    // Drain both pipes concurrently so the child never blocks on a full pipe.
    let stdout_task = tokio::spawn(read_pipe(child.stdout.take()));
    let stderr_task = tokio::spawn(read_pipe(child.stderr.take()));

    match tokio::time::timeout(remaining, child.wait()).await {
        Ok(status) => {
            let status = status?;
            let stdout = stdout_task
                .await
                .unwrap_or_else(|_| "<failed to join stdout reader>".to_string());
            let stderr = stderr_task
                .await
                .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

            if !status.success() {
                return Err(PovError::ProcessFailed {
                    program: name,
                    status: status.to_string(),
                    stderr: stderr_tail(&stderr),
                });
            }
            Ok(ToolOutput { stdout, stderr })
        }
        Err(_) => {
            tracing::warn!(
                program = %name,
                budget_secs = deadline.budget().as_secs_f64(),
                "Process exceeded deadline; killing"
            );
            if let Err(err) = child.kill().await {
                tracing::warn!(program = %name, error = %err, "Failed to kill timed-out process");
            }
            let stderr = stderr_task
                .await
                .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());
            stdout_task.abort();
            Err(PovError::ProcessTimeout {
                program: name,
                timeout_secs: deadline.budget().as_secs_f64(),
                stderr: stderr_tail(&stderr),
            })
        }
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> String {
    let Some(mut pipe) = pipe else {
        return String::new();
    };
    let mut buf = Vec::new();
    match pipe.read_to_end(&mut buf).await {
        Ok(_) => String::from_utf8_lossy(&buf).into_owned(),
        Err(err) => format!("<failed to read process output: {err}>"),
    }
}

fn program_name(program: &Path) -> String {
    program
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| program.display().to_string())
}

/// Last lines of a process's stderr, trimmed.
pub fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.trim().lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}
