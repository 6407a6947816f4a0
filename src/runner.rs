//! Caller-side task execution.
//!
//! Sources hand out tasks but never run them. [`TaskRunner`] is the
//! executor this crate ships for that job:
//!
//! - One serialization lane per mount point. Set-up and tear-down of the
//!   same mount point never overlap; different mount points run in parallel.
//! - Retries with fresh tasks. A task is single-shot, so every attempt asks
//!   the source for a new task list. Configuration errors are not retried.
//! - Cooperative cancellation through a [`CancellationToken`], checked
//!   before each attempt and each task. After cancellation the probe is
//!   still the only source of truth for the mount state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{info, warn};

use crate::error::SourceError;
use crate::source::{HasMountPoint, InstallationSource};
use crate::task::Task;

/// How many times to attempt a set-up or tear-down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub attempts: u32,
    /// Pause between attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Runs everything exactly once.
    pub const fn once() -> Self {
        Self {
            attempts: 1,
            delay: Duration::ZERO,
        }
    }

    /// Runs up to `attempts` times with `delay` in between.
    pub const fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::once()
    }
}

/// Shared flag that stops a runner between tasks.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Which transition a task list performs, for logs and errors.
#[derive(Debug, Clone, Copy)]
enum Transition {
    SetUp,
    TearDown,
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SetUp => f.write_str("set-up"),
            Self::TearDown => f.write_str("tear-down"),
        }
    }
}

/// Runs source tasks with per-mount-point serialization.
#[derive(Debug, Default)]
pub struct TaskRunner {
    lanes: Mutex<HashMap<Utf8PathBuf, Arc<Mutex<()>>>>,
    policy: RetryPolicy,
    cancel: CancellationToken,
}

impl TaskRunner {
    /// Creates a runner with the given retry policy.
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            lanes: Mutex::new(HashMap::new()),
            policy,
            cancel: CancellationToken::default(),
        }
    }

    /// Uses an externally owned cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Returns a handle that cancels this runner.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn lane(&self, mount_point: &Utf8Path) -> Arc<Mutex<()>> {
        let mut lanes = self.lanes.lock().unwrap_or_else(PoisonError::into_inner);
        lanes.entry(mount_point.to_owned()).or_default().clone()
    }

    /// Drops the lane of `mount_point` once nobody else holds it.
    ///
    /// Lanes are only cloned under the map lock, so a count of one seen
    /// under that lock cannot grow before the entry is removed.
    fn release_lane(&self, mount_point: &Utf8Path) {
        let mut lanes = self.lanes.lock().unwrap_or_else(PoisonError::into_inner);
        if lanes
            .get(mount_point)
            .is_some_and(|lane| Arc::strong_count(lane) == 1)
        {
            lanes.remove(mount_point);
        }
    }

    /// Runs `f` while holding the lane of `mount_point`.
    fn with_lane<T>(&self, mount_point: &Utf8Path, f: impl FnOnce() -> T) -> T {
        let lane = self.lane(mount_point);
        let result = {
            let _guard = lane.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };
        drop(lane);
        self.release_lane(mount_point);
        result
    }

    fn check_cancelled(&self, what: impl FnOnce() -> String) -> Result<(), SourceError> {
        if self.cancel.is_cancelled() {
            return Err(SourceError::Cancelled(what()));
        }
        Ok(())
    }

    /// Runs tasks in order, stopping at the first failure. Caller holds the lane.
    fn run_in_lane(
        &self,
        mount_point: &Utf8Path,
        tasks: Vec<Box<dyn Task>>,
    ) -> Result<(), SourceError> {
        for task in tasks {
            self.check_cancelled(|| format!("{} on {}", task.name(), mount_point))?;
            info!("running task: {} ({})", task.name(), mount_point);
            task.run()?;
        }
        Ok(())
    }

    /// Runs a task list once in the lane of `mount_point`.
    pub fn run_tasks(
        &self,
        mount_point: &Utf8Path,
        tasks: Vec<Box<dyn Task>>,
    ) -> Result<(), SourceError> {
        self.with_lane(mount_point, || self.run_in_lane(mount_point, tasks))
    }

    /// Sets up `source`, retrying with fresh tasks per the retry policy.
    pub fn set_up(&self, source: &dyn InstallationSource) -> Result<(), SourceError> {
        self.run_with_retries(source.mount_point(), Transition::SetUp, &source.to_string(), || {
            source.set_up_with_tasks()
        })
    }

    /// Tears down `source`, retrying with fresh tasks per the retry policy.
    pub fn tear_down(&self, source: &dyn InstallationSource) -> Result<(), SourceError> {
        self.run_with_retries(source.mount_point(), Transition::TearDown, &source.to_string(), || {
            source.tear_down_with_tasks()
        })
    }

    fn run_with_retries<F>(
        &self,
        mount_point: &Utf8Path,
        transition: Transition,
        label: &str,
        mut make_tasks: F,
    ) -> Result<(), SourceError>
    where
        F: FnMut() -> Vec<Box<dyn Task>>,
    {
        self.with_lane(mount_point, || {
            let attempts = self.policy.attempts.max(1);
            let mut attempt = 1;
            loop {
                self.check_cancelled(|| format!("{} of {}", transition, mount_point))?;

                let err = match self.run_in_lane(mount_point, make_tasks()) {
                    Ok(()) => return Ok(()),
                    Err(err) => err,
                };

                let retryable = matches!(
                    err,
                    SourceError::MountFailure { .. } | SourceError::UnmountFailure { .. }
                );
                if !retryable || attempt >= attempts {
                    return Err(err);
                }
                warn!(
                    "{} of {} failed (attempt {}/{}): {}",
                    transition, label, attempt, attempts, err
                );
                attempt += 1;
                if !self.policy.delay.is_zero() {
                    thread::sleep(self.policy.delay);
                }
            }
        })
    }
}
