//! # Command Execution Module / 命令执行模块
//!
//! Runs child processes. `stream_to_log` tees a benchmark's output into its
//! log files while watching for the stop marker; `spawn_and_capture` runs a
//! short probe command to completion and returns its output.
//!
//! 运行子进程。`stream_to_log` 将基准输出写入日志文件并监视停止标记；
//! `spawn_and_capture` 运行简短的探测命令直至完成并返回其输出。

use crate::infra::t;
use anyhow::{Context, Result, anyhow};
use colored::*;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::{Child, Command};
use tokio::time::Instant;
use tokio_stream::wrappers::SplitStream;
use tokio_util::sync::CancellationToken;

/// Time a terminated process gets to exit before it is killed outright.
const KILL_GRACE: Duration = Duration::from_secs(10);

/// The pair of log files a worker writes.
/// 工作进程写入的一对日志文件。
#[derive(Debug, Clone)]
pub struct LogTargets {
    pub stdout: PathBuf,
    pub stderr: PathBuf,
}

impl LogTargets {
    /// `worker_0_stdout.log` / `worker_0_stderr.log` inside `dir`.
    pub fn worker_logs(dir: &Path) -> Self {
        Self {
            stdout: dir.join(crate::infra::fs::WORKER_STDOUT_LOG),
            stderr: dir.join(crate::infra::fs::WORKER_STDERR_LOG),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StreamOptions {
    /// Terminate the process once a line contains this substring.
    /// 一旦某行包含此子串即终止进程。
    pub stop_marker: Option<String>,
    pub timeout: Option<Duration>,
    /// Do not echo worker lines to the console.
    /// 不在控制台回显工作进程输出。
    pub quiet: bool,
}

/// Why the harness ended a process early.
/// 工具提前结束进程的原因。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    StopMarker,
    Timeout,
    Cancelled,
}

#[derive(Debug)]
pub struct StreamOutcome {
    pub status: ExitStatus,
    /// Set when the harness terminated the process. / 由工具终止进程时设置。
    pub termination: Option<Termination>,
    /// Non-empty lines written to the stdout log. / 写入 stdout 日志的非空行数。
    pub lines: usize,
    pub duration: Duration,
}

impl StreamOutcome {
    pub fn marker_hit(&self) -> bool {
        self.termination == Some(Termination::StopMarker)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Stdout,
    Stderr,
}

async fn wait_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

/// Asks the process (and its group on unix) to stop.
fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;
        if let Some(pid) = child.id() {
            if killpg(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok() {
                return;
            }
        }
    }
    let _ = child.start_kill();
}

/// Kills the process (and its group on unix) without waiting for it.
fn force_kill(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;
        if let Some(pid) = child.id() {
            let _ = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL);
        }
    }
    let _ = child.start_kill();
}

/// Runs `cmd`, writing its output to the log files line by line.
///
/// The first line of the stdout log is `header` (the command line). Every
/// non-empty line from stdout and stderr is appended to the stdout log;
/// stderr lines also go to the stderr log. When a line contains the stop
/// marker, the timeout elapses or `stop` is cancelled, the process group is
/// sent SIGTERM and, if it lingers, SIGKILL.
///
/// 运行 `cmd`，逐行将输出写入日志文件。
/// stdout 日志的第一行是 `header`（命令行）。stdout 和 stderr 的每个非空行都追加到
/// stdout 日志；stderr 行同时写入 stderr 日志。当某行包含停止标记、超时或 `stop` 被
/// 取消时，进程组会收到 SIGTERM，若仍未退出则收到 SIGKILL。
pub async fn stream_to_log(
    mut cmd: Command,
    header: &str,
    logs: &LogTargets,
    options: &StreamOptions,
    stop: &CancellationToken,
) -> Result<StreamOutcome> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);

    let mut out_log = BufWriter::new(
        File::create(&logs.stdout)
            .await
            .with_context(|| t!("command.log_create_failed", path = logs.stdout.display()).to_string())?,
    );
    let mut err_log = BufWriter::new(
        File::create(&logs.stderr)
            .await
            .with_context(|| t!("command.log_create_failed", path = logs.stderr.display()).to_string())?,
    );
    out_log.write_all(header.as_bytes()).await?;
    out_log.write_all(b"\n").await?;

    let start = Instant::now();
    let mut child = cmd
        .spawn()
        .with_context(|| t!("command.spawn_failed", command = header).to_string())?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!(t!("command.capture_stdout_failed").to_string()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!(t!("command.capture_stderr_failed").to_string()))?;

    let out_lines = SplitStream::new(BufReader::new(stdout).split(b'\n')).map(|l| (Source::Stdout, l));
    let err_lines = SplitStream::new(BufReader::new(stderr).split(b'\n')).map(|l| (Source::Stderr, l));
    let mut lines = stream::select(out_lines, err_lines);

    let deadline = options.timeout.map(|t| start + t);
    let mut termination: Option<Termination> = None;
    let mut kill_deadline: Option<Instant> = None;
    let mut killed = false;
    let mut count = 0usize;

    loop {
        tokio::select! {
            biased;
            _ = stop.cancelled(), if termination.is_none() => {
                println!("{}", t!("command.cancelling").yellow());
                terminate(&mut child);
                termination = Some(Termination::Cancelled);
                kill_deadline = Some(Instant::now() + KILL_GRACE);
            }
            _ = wait_deadline(deadline), if termination.is_none() && deadline.is_some() => {
                terminate(&mut child);
                termination = Some(Termination::Timeout);
                kill_deadline = Some(Instant::now() + KILL_GRACE);
            }
            _ = wait_deadline(kill_deadline), if kill_deadline.is_some() && !killed => {
                force_kill(&mut child);
                killed = true;
            }
            next = lines.next() => match next {
                Some((source, Ok(raw))) => {
                    // Benchmarks occasionally print bytes that are not UTF-8.
                    let decoded = String::from_utf8_lossy(&raw);
                    let line = decoded.trim_end_matches('\r');
                    if !line.trim().is_empty() {
                        count += 1;
                        out_log.write_all(line.as_bytes()).await?;
                        out_log.write_all(b"\n").await?;
                        if source == Source::Stderr {
                            err_log.write_all(line.as_bytes()).await?;
                            err_log.write_all(b"\n").await?;
                        }
                        if !options.quiet {
                            println!("{line}");
                        }
                        let marker_hit = termination.is_none()
                            && options
                                .stop_marker
                                .as_deref()
                                .is_some_and(|marker| line.contains(marker));
                        if marker_hit {
                            println!("{}", t!("command.stop_marker_reached", line = line).cyan());
                            terminate(&mut child);
                            termination = Some(Termination::StopMarker);
                            kill_deadline = Some(Instant::now() + KILL_GRACE);
                        }
                    }
                }
                Some((_, Err(e))) => {
                    eprintln!("{}", t!("command.read_output_failed", error = e).yellow());
                    break;
                }
                None => break,
            }
        }
    }

    out_log.flush().await?;
    err_log.flush().await?;

    let status = child
        .wait()
        .await
        .context(t!("command.wait_failed").to_string())?;

    Ok(StreamOutcome {
        status,
        termination,
        lines: count,
        duration: start.elapsed(),
    })
}

/// Spawns a command, captures its stdout and stderr.
/// The output streams are read concurrently and combined into a single string.
///
/// # Returns
/// A tuple containing:
/// - The `ExitStatus` of the process wrapped in an `io::Result`.
/// - The combined stdout and stderr as a `String`.
///
/// 派生一个命令，捕获其 stdout 和 stderr。
/// 输出流被并发读取并合并到一个字符串中。
pub async fn spawn_and_capture(mut cmd: Command) -> (std::io::Result<ExitStatus>, String) {
    let mut child = match cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
    {
        Ok(child) => child,
        Err(e) => return (Err(e), String::new()),
    };

    let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
        return (
            Err(std::io::Error::other(t!("command.capture_stdout_failed").to_string())),
            String::new(),
        );
    };

    let output = Arc::new(tokio::sync::Mutex::new(String::new()));

    let stdout_output = Arc::clone(&output);
    let stdout_handle = tokio::spawn(async move {
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let mut output = stdout_output.lock().await;
            output.push_str(&line);
            output.push('\n');
        }
    });

    let stderr_output = Arc::clone(&output);
    let stderr_handle = tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let mut output = stderr_output.lock().await;
            output.push_str(&line);
            output.push('\n');
        }
    });

    let status = child.wait().await;

    // Drain both readers so no trailing output is lost.
    if let Err(e) = stdout_handle.await {
        eprintln!("{}", t!("command.join_failed", error = e));
    }
    if let Err(e) = stderr_handle.await {
        eprintln!("{}", t!("command.join_failed", error = e));
    }

    let captured = output.lock().await.clone();
    (status, captured)
}

/// Runs a probe command and returns its trimmed output when it succeeds.
pub async fn probe_output(cmd: Command) -> Option<String> {
    match spawn_and_capture(cmd).await {
        (Ok(status), output) if status.success() => Some(output.trim().to_string()),
        _ => None,
    }
}
