// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process supervisor
//!
//! Runs one external command per call with a hard wall-clock deadline. The
//! command is started as the leader of its own process group; on timeout the
//! whole group receives `SIGKILL`, so workers it forked die with it. The same
//! happens when the `run` future is dropped before the stage finishes. Output is
//! streamed to the log line by line while the last bytes of each stream are
//! kept for the job record.

use crate::capture::{capture, TailBuffer};
use crate::config::{PipelineConfig, StageConfig};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::task::JoinHandle;

/// How long output readers may keep running after the process exits.
///
/// A grandchild that inherited the pipes can hold them open; after this grace
/// the remaining group members are killed.
const CAPTURE_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("failed to launch `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed waiting for `{program}`: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// A fully resolved command line.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineCommand {
    /// Stage name, used in logs
    pub label: String,
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
}

impl PipelineCommand {
    pub fn new(label: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: BTreeMap::new(),
        }
    }

    /// `sh -c <script>`
    pub fn shell(label: impl Into<String>, script: impl Into<String>) -> Self {
        Self::new(label, "sh").args(vec!["-c".to_string(), script.into()])
    }

    /// Command for a configured stage, with `extra_env` layered over the
    /// stage's own environment.
    pub fn for_stage(
        config: &PipelineConfig,
        stage: &StageConfig,
        extra_env: &BTreeMap<String, String>,
    ) -> Self {
        let mut env = stage.env.clone();
        env.extend(extra_env.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self {
            label: stage.name.clone(),
            program: stage.program.clone(),
            args: stage.args.clone(),
            cwd: Some(config.stage_cwd(stage)),
            env,
        }
    }

    pj_core::setters! {
        set {
            args: Vec<String>,
            env: BTreeMap<String, String>,
        }
        option {
            cwd: PathBuf,
        }
    }
}

/// Result of one supervised invocation.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Exit code; `None` when the process was ended by a signal
    pub exit_code: Option<i32>,
    /// Terminating signal, if any
    pub signal: Option<i32>,
    pub timed_out: bool,
    pub elapsed: Duration,
    pub stdout: String,
    pub stderr: String,
    pub stdout_truncated: bool,
    pub stderr_truncated: bool,
}

impl RunOutcome {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }

    /// Human-readable reason the process ended.
    pub fn describe_exit(&self) -> String {
        match (self.exit_code, self.signal) {
            (Some(code), _) => format!("exit code {code}"),
            (None, Some(signal)) => format!("signal {signal}"),
            (None, None) => "unknown exit status".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessSupervisor {
    capture_limit: usize,
}

impl ProcessSupervisor {
    pub fn new(capture_limit: usize) -> Self {
        Self { capture_limit: capture_limit.max(1) }
    }

    /// Run `command` to completion or until `timeout` elapses.
    ///
    /// Only a launch or wait failure is an `Err`; non-zero exits and timeouts
    /// are reported in the [`RunOutcome`].
    pub async fn run(
        &self,
        command: &PipelineCommand,
        timeout: Duration,
    ) -> Result<RunOutcome, SupervisorError> {
        let mut cmd = tokio::process::Command::new(&command.program);
        cmd.args(&command.args)
            .envs(&command.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &command.cwd {
            cmd.current_dir(cwd);
        }
        #[cfg(unix)]
        cmd.process_group(0);

        let started = Instant::now();
        let mut child = cmd.spawn().map_err(|source| SupervisorError::Spawn {
            program: command.program.clone(),
            source,
        })?;
        let pid = child.id();
        let mut group = GroupGuard::new(pid, &command.label);
        tracing::info!(
            stage = %command.label,
            program = %command.program,
            pid = pid.unwrap_or_default(),
            timeout_secs = timeout.as_secs(),
            "stage started"
        );

        let stdout_task = child.stdout.take().map(|out| {
            tokio::spawn(capture(out, self.capture_limit, command.label.clone(), "stdout"))
        });
        let stderr_task = child.stderr.take().map(|err| {
            tokio::spawn(capture(err, self.capture_limit, command.label.clone(), "stderr"))
        });

        let (status, timed_out) = match tokio::time::timeout(timeout, child.wait()).await {
            Ok(Ok(status)) => (Some(status), false),
            Ok(Err(source)) => {
                kill_group(pid, &command.label);
                return Err(SupervisorError::Wait { program: command.program.clone(), source });
            }
            Err(_) => {
                tracing::warn!(
                    stage = %command.label,
                    timeout_secs = timeout.as_secs(),
                    "stage timed out, killing process group"
                );
                kill_group(pid, &command.label);
                if let Err(e) = child.start_kill() {
                    tracing::debug!(stage = %command.label, error = %e, "leader already gone");
                }
                (child.wait().await.ok(), true)
            }
        };
        let elapsed = started.elapsed();

        let (stdout, stdout_truncated) = finish_capture(stdout_task, pid, &command.label).await;
        let (stderr, stderr_truncated) = finish_capture(stderr_task, pid, &command.label).await;

        // Leader reaped and output drained
        group.disarm();

        let (exit_code, signal) = exit_parts(status);
        tracing::info!(
            stage = %command.label,
            exit_code = exit_code.unwrap_or(-1),
            timed_out,
            elapsed_ms = elapsed.as_millis() as u64,
            "stage finished"
        );

        Ok(RunOutcome {
            exit_code,
            signal,
            timed_out,
            elapsed,
            stdout,
            stderr,
            stdout_truncated,
            stderr_truncated,
        })
    }
}

/// Kills the stage's process group on drop unless disarmed.
///
/// `kill_on_drop` only reaches the leader; this covers the rest of the group
/// when a run is abandoned mid-flight.
struct GroupGuard {
    pid: Option<u32>,
    label: String,
    armed: bool,
}

impl GroupGuard {
    fn new(pid: Option<u32>, label: &str) -> Self {
        Self { pid, label: label.to_string(), armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for GroupGuard {
    fn drop(&mut self) {
        if self.armed {
            tracing::warn!(stage = %self.label, "stage abandoned, killing process group");
            kill_group(self.pid, &self.label);
        }
    }
}

async fn finish_capture(
    task: Option<JoinHandle<TailBuffer>>,
    pid: Option<u32>,
    label: &str,
) -> (String, bool) {
    let Some(mut task) = task else {
        return (String::new(), false);
    };
    let joined = match tokio::time::timeout(CAPTURE_GRACE, &mut task).await {
        Ok(joined) => joined,
        Err(_) => {
            tracing::warn!(stage = label, "output still open after exit, killing process group");
            kill_group(pid, label);
            match tokio::time::timeout(CAPTURE_GRACE, &mut task).await {
                Ok(joined) => joined,
                Err(_) => {
                    task.abort();
                    return (String::new(), true);
                }
            }
        }
    };
    match joined {
        Ok(tail) => {
            let truncated = tail.is_truncated();
            (tail.into_string(), truncated)
        }
        Err(e) => {
            tracing::warn!(stage = label, error = %e, "output capture task failed");
            (String::new(), false)
        }
    }
}

#[cfg(unix)]
fn exit_parts(status: Option<ExitStatus>) -> (Option<i32>, Option<i32>) {
    use std::os::unix::process::ExitStatusExt;
    match status {
        Some(status) => (status.code(), status.signal()),
        None => (None, None),
    }
}

#[cfg(not(unix))]
fn exit_parts(status: Option<ExitStatus>) -> (Option<i32>, Option<i32>) {
    (status.and_then(|s| s.code()), None)
}

/// Send `SIGKILL` to every process in the group led by `pid`.
#[cfg(unix)]
fn kill_group(pid: Option<u32>, label: &str) {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pid) = pid.and_then(|p| i32::try_from(p).ok()) else {
        return;
    };
    match killpg(Pid::from_raw(pid), Signal::SIGKILL) {
        Ok(()) => tracing::debug!(stage = label, pgid = pid, "killed process group"),
        // Group already empty
        Err(Errno::ESRCH) => {}
        Err(e) => tracing::warn!(stage = label, pgid = pid, error = %e, "failed to kill process group"),
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: Option<u32>, _label: &str) {}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
