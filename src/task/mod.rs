//! Single-shot tasks that move a source between its states.
//!
//! A source never mounts anything itself. Its `set_up_with_tasks()` and
//! `tear_down_with_tasks()` hand out [`Task`] objects that the caller runs on
//! its own schedule. A task owns an immutable snapshot of everything it
//! needs ([`MountContext`] plus its mount point and address), so it can be
//! moved to another thread and outlive the source that created it.
//!
//! [`Task::run`] consumes the boxed task, so a task cannot be run twice.
//! Tasks never retry; retry policy belongs to the caller (see
//! [`crate::runner::TaskRunner`]).

pub mod mount;

use std::sync::Arc;

use crate::error::SourceError;
use crate::executor::{CommandExecutor, RealCommandExecutor};
use crate::privilege::PrivilegeMethod;
use crate::probe::{MountProbe, SystemMountProbe};

pub use mount::{SetUpHardDriveTask, SetUpNfsTask, TearDownMountTask};

/// A unit of blocking work performing one state transition.
pub trait Task: Send {
    /// Returns a human-readable name for this task.
    fn name(&self) -> &str;

    /// Runs the task to completion.
    ///
    /// Set-up tasks report [`SourceError::MountFailure`], tear-down tasks
    /// [`SourceError::UnmountFailure`].
    fn run(self: Box<Self>) -> Result<(), SourceError>;
}

impl std::fmt::Debug for dyn Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task").field("name", &self.name()).finish()
    }
}

/// Shared handles a task uses to reach the system.
///
/// Cloned into every task at creation time.
#[derive(Clone)]
pub struct MountContext {
    /// Runs `mount`/`umount`.
    pub executor: Arc<dyn CommandExecutor>,
    /// Answers whether a mount point is mounted.
    pub probe: Arc<dyn MountProbe>,
    /// Optional `sudo`/`doas` wrapper for mount commands.
    pub privilege: Option<PrivilegeMethod>,
}

impl MountContext {
    /// Creates a context from an executor and a probe, without privilege escalation.
    pub fn new(executor: Arc<dyn CommandExecutor>, probe: Arc<dyn MountProbe>) -> Self {
        Self {
            executor,
            probe,
            privilege: None,
        }
    }

    /// Creates a context that runs real commands and probes the live system.
    pub fn system(dry_run: bool) -> Self {
        Self::new(Arc::new(RealCommandExecutor { dry_run }), Arc::new(SystemMountProbe))
    }

    /// Sets the privilege escalation method
    #[must_use]
    pub fn with_privilege(mut self, privilege: Option<PrivilegeMethod>) -> Self {
        self.privilege = privilege;
        self
    }

    /// Returns true if the executor only logs commands.
    pub fn dry_run(&self) -> bool {
        self.executor.dry_run()
    }
}

impl std::fmt::Debug for MountContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountContext")
            .field("privilege", &self.privilege)
            .field("dry_run", &self.dry_run())
            .finish_non_exhaustive()
    }
}
