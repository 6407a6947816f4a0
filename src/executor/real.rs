//! Real command executor implementation.
//!
//! This module provides [`RealCommandExecutor`], which runs `mount` and
//! `umount` through `std::process::Command` and streams their output into
//! the log while they run.

use std::process::{Child, Command, Stdio};
use std::thread;
use std::thread::JoinHandle;

use anyhow::{Context, Result, anyhow};
use which::which;

use super::pipe::{StreamType, panic_message, read_pipe_to_log};
use super::{CommandExecutor, CommandSpec, ExecutionResult};

/// Kills a child process and joins its reader threads.
///
/// Called from the error paths of [`RealCommandExecutor::execute()`] so a
/// failed spawn or wait never leaves a process or thread behind.
fn cleanup_child_process<I>(child: &mut Child, handles: I)
where
    I: IntoIterator<Item = JoinHandle<()>>,
{
    let pid = child.id();
    if let Err(e) = child.kill() {
        tracing::debug!(pid = pid, "kill returned error (process may have already exited): {}", e);
    }
    if let Err(e) = child.wait() {
        tracing::warn!(pid = pid, "failed to wait for child process after kill: {}", e);
    }
    for handle in handles {
        if let Err(e) = handle.join() {
            tracing::warn!("reader thread panicked during cleanup: {}", panic_message(&*e));
        }
    }
}

/// Spawns a named thread that forwards one output pipe into the log.
fn spawn_reader<R>(pipe: Option<R>, stream_type: StreamType) -> std::io::Result<JoinHandle<()>>
where
    R: std::io::Read + Send + 'static,
{
    thread::Builder::new()
        .name(format!("{}-reader", stream_type))
        .spawn(move || read_pipe_to_log(pipe, stream_type))
}

/// Command executor that runs actual system commands.
///
/// When `dry_run` is true, commands are logged but not executed,
/// and `execute()` returns `Ok(ExecutionResult { status: None })`.
#[derive(Debug, Default, Clone)]
pub struct RealCommandExecutor {
    pub dry_run: bool,
}

impl CommandExecutor for RealCommandExecutor {
    fn execute(&self, spec: &CommandSpec) -> Result<ExecutionResult> {
        if self.dry_run {
            tracing::info!("dry run: {}", spec);
            return Ok(ExecutionResult { status: None });
        }

        let (program, args) = spec.argv();
        let cmd = which(program).with_context(|| format!("command not found: {}", program))?;
        tracing::trace!("command found: {}: {}", program, cmd.to_string_lossy());

        let mut command = Command::new(cmd);
        command.args(&args);
        command.stdin(Stdio::null());
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());

        let mut child = command
            .spawn()
            .with_context(|| format!("failed to spawn command `{}`", spec))?;

        tracing::trace!("spawned command: {}: pid={}", program, child.id());

        let stdout_handle = match spawn_reader(child.stdout.take(), StreamType::Stdout) {
            Ok(handle) => handle,
            Err(e) => {
                cleanup_child_process(&mut child, []);
                return Err(anyhow!("failed to spawn stdout reader thread for `{}`: {}", spec, e));
            }
        };

        let stderr_handle = match spawn_reader(child.stderr.take(), StreamType::Stderr) {
            Ok(handle) => handle,
            Err(e) => {
                cleanup_child_process(&mut child, [stdout_handle]);
                return Err(anyhow!("failed to spawn stderr reader thread for `{}`: {}", spec, e));
            }
        };

        let status = match child.wait() {
            Ok(s) => s,
            Err(e) => {
                cleanup_child_process(&mut child, [stdout_handle, stderr_handle]);
                return Err(anyhow!("failed to wait for `{}`: {}", spec, e));
            }
        };

        let mut panicked_streams = Vec::new();
        for (name, handle) in [("stdout", stdout_handle), ("stderr", stderr_handle)] {
            if let Err(e) = handle.join() {
                let msg = panic_message(&*e);
                tracing::error!(stream = name, panic = msg, "reader thread panicked");
                panicked_streams.push(format!("{}: {}", name, msg));
            }
        }

        if !panicked_streams.is_empty() {
            return Err(anyhow!(
                "reader thread(s) panicked while running `{}`: {}",
                spec,
                panicked_streams.join(", ")
            ));
        }

        tracing::trace!("executed command: {}: success={}", program, status.success());

        Ok(ExecutionResult {
            status: Some(status),
        })
    }

    fn dry_run(&self) -> bool {
        self.dry_run
    }
}
