//! Test doubles shared by the unit tests.

use std::collections::BTreeSet;
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use camino::{Utf8Path, Utf8PathBuf};

use crate::executor::{CommandExecutor, CommandSpec, ExecutionResult};
use crate::probe::MountProbe;

/// In-memory mount table that doubles as a probe.
#[derive(Debug, Default)]
pub(crate) struct FakeMountTable {
    mounted: Mutex<BTreeSet<Utf8PathBuf>>,
}

impl FakeMountTable {
    pub(crate) fn insert(&self, path: &Utf8Path) {
        self.mounted.lock().unwrap().insert(path.to_owned());
    }

    pub(crate) fn remove(&self, path: &Utf8Path) {
        self.mounted.lock().unwrap().remove(path);
    }

    pub(crate) fn contains(&self, path: &Utf8Path) -> bool {
        self.mounted.lock().unwrap().contains(path)
    }
}

impl MountProbe for FakeMountTable {
    fn is_mounted(&self, path: &Utf8Path) -> bool {
        self.contains(path)
    }
}

/// Executor that records commands and applies successful mounts to a fake table.
pub(crate) struct RecordingExecutor {
    table: Arc<FakeMountTable>,
    calls: Mutex<Vec<CommandSpec>>,
    mount_exit: i32,
    umount_exit: i32,
    error: bool,
}

impl RecordingExecutor {
    pub(crate) fn mounting(table: Arc<FakeMountTable>) -> Self {
        Self {
            table,
            calls: Mutex::new(Vec::new()),
            mount_exit: 0,
            umount_exit: 0,
            error: false,
        }
    }

    pub(crate) fn failing_mount(table: Arc<FakeMountTable>, code: i32) -> Self {
        Self {
            mount_exit: code,
            ..Self::mounting(table)
        }
    }

    pub(crate) fn failing_umount(table: Arc<FakeMountTable>, code: i32) -> Self {
        Self {
            umount_exit: code,
            ..Self::mounting(table)
        }
    }

    pub(crate) fn erroring(table: Arc<FakeMountTable>) -> Self {
        Self {
            error: true,
            ..Self::mounting(table)
        }
    }

    /// Inner command names (`mount`/`umount`) in call order.
    pub(crate) fn commands(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|spec| spec.command.clone())
            .collect()
    }

    /// Programs actually spawned, including any privilege wrapper.
    pub(crate) fn programs(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|spec| spec.argv().0.to_string())
            .collect()
    }
}

impl CommandExecutor for RecordingExecutor {
    fn execute(&self, spec: &CommandSpec) -> Result<ExecutionResult> {
        self.calls.lock().unwrap().push(spec.clone());
        if self.error {
            anyhow::bail!("command not found: {}", spec.command);
        }

        let code = match spec.command.as_str() {
            "mount" => {
                if self.mount_exit == 0
                    && let Some(target) = spec.args.last()
                {
                    self.table.insert(Utf8Path::new(target));
                }
                self.mount_exit
            }
            "umount" => {
                if self.umount_exit == 0
                    && let Some(target) = spec.args.first()
                {
                    self.table.remove(Utf8Path::new(target));
                }
                self.umount_exit
            }
            _ => 0,
        };
        Ok(ExecutionResult {
            status: Some(ExitStatus::from_raw(code << 8)),
        })
    }
}
