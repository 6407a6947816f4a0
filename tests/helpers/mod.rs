use std::collections::BTreeSet;
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use camino::{Utf8Path, Utf8PathBuf};
use instsource::executor::{CommandExecutor, CommandSpec, ExecutionResult};
use instsource::probe::MountProbe;
use instsource::task::MountContext;
use tempfile::TempDir;

/// In-memory mount table used as the probe in tests.
#[derive(Debug, Default)]
pub struct MountTable {
    mounted: Mutex<BTreeSet<Utf8PathBuf>>,
}

#[allow(dead_code)]
impl MountTable {
    pub fn mount(&self, path: &Utf8Path) {
        self.mounted.lock().unwrap().insert(path.to_owned());
    }

    pub fn unmount(&self, path: &Utf8Path) {
        self.mounted.lock().unwrap().remove(path);
    }

    pub fn contains(&self, path: &Utf8Path) -> bool {
        self.mounted.lock().unwrap().contains(path)
    }
}

impl MountProbe for MountTable {
    fn is_mounted(&self, path: &Utf8Path) -> bool {
        self.contains(path)
    }
}

/// Mock executor that records every command and applies successful
/// `mount`/`umount` calls to a [`MountTable`].
#[derive(Debug)]
pub struct MockExecutor {
    table: Arc<MountTable>,
    calls: Mutex<Vec<CommandSpec>>,
    mount_exit: i32,
    umount_exit: i32,
    dry_run: bool,
}

#[allow(dead_code)]
impl MockExecutor {
    pub fn new(table: Arc<MountTable>) -> Self {
        Self {
            table,
            calls: Mutex::new(Vec::new()),
            mount_exit: 0,
            umount_exit: 0,
            dry_run: false,
        }
    }

    /// Every `mount` exits with `code` and changes nothing.
    pub fn unreachable(table: Arc<MountTable>, code: i32) -> Self {
        Self {
            mount_exit: code,
            ..Self::new(table)
        }
    }

    /// Every `umount` exits with `code` and changes nothing.
    pub fn busy(table: Arc<MountTable>, code: i32) -> Self {
        Self {
            umount_exit: code,
            ..Self::new(table)
        }
    }

    /// Records commands without touching the table, like a dry run.
    pub fn dry_run(table: Arc<MountTable>) -> Self {
        Self {
            dry_run: true,
            ..Self::new(table)
        }
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.calls().into_iter().map(|spec| spec.command).collect()
    }
}

impl CommandExecutor for MockExecutor {
    fn execute(&self, spec: &CommandSpec) -> Result<ExecutionResult> {
        self.calls.lock().unwrap().push(spec.clone());
        if self.dry_run {
            return Ok(ExecutionResult { status: None });
        }

        let code = match spec.command.as_str() {
            "mount" => {
                if self.mount_exit == 0 {
                    let target = spec.args.last().expect("mount needs a target");
                    self.table.mount(Utf8Path::new(target));
                }
                self.mount_exit
            }
            "umount" => {
                if self.umount_exit == 0 {
                    let target = spec.args.first().expect("umount needs a target");
                    self.table.unmount(Utf8Path::new(target));
                }
                self.umount_exit
            }
            other => panic!("unexpected command: {}", other),
        };
        Ok(ExecutionResult {
            status: Some(ExitStatus::from_raw(code << 8)),
        })
    }

    fn dry_run(&self) -> bool {
        self.dry_run
    }
}

/// Builds a mount context over a mock executor and its table.
#[allow(dead_code)]
pub fn context(executor: &Arc<MockExecutor>, table: &Arc<MountTable>) -> MountContext {
    MountContext::new(executor.clone(), table.clone())
}

/// Returns a mount point path inside a fresh temporary directory.
///
/// The directory lives as long as the returned guard.
#[allow(dead_code)]
pub fn temp_mount_point(name: &str) -> (TempDir, Utf8PathBuf) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = Utf8PathBuf::from_path_buf(dir.path().join(name))
        .expect("temp dir path should be UTF-8");
    (dir, path)
}
