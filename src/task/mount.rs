//! Mount and unmount tasks.
//!
//! [`SetUpNfsTask`] and [`SetUpHardDriveTask`] mount a source onto its
//! mount point; [`TearDownMountTask`] unmounts whatever is there. All three
//! go through the [`CommandExecutor`](crate::executor::CommandExecutor) in
//! their [`MountContext`].

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::info;

use super::{MountContext, Task};
use crate::error::SourceError;
use crate::executor::CommandSpec;
use crate::source::harddrive::HardDriveAddress;
use crate::source::nfs::NfsAddress;

/// Mount option that disables NFS file locking; the installer only reads.
const NFS_NOLOCK: &str = "nolock";

/// Fails if something is already mounted on the mount point.
fn ensure_not_in_use(ctx: &MountContext, mount_point: &Utf8Path) -> Result<(), SourceError> {
    if ctx.probe.is_mounted(mount_point) {
        return Err(SourceError::mount(mount_point, "the mount point is already in use"));
    }
    Ok(())
}

/// Creates the mount point directory (skipped in dry-run mode).
fn create_mount_point(ctx: &MountContext, mount_point: &Utf8Path) -> Result<(), SourceError> {
    if ctx.dry_run() {
        return Ok(());
    }
    fs::create_dir_all(mount_point).map_err(|e| {
        SourceError::mount(
            mount_point,
            SourceError::io(format!("failed to create mount point: {}", mount_point), e)
                .to_string(),
        )
    })
}

/// Runs a command and converts anything but a clean exit into a reason string.
///
/// A missing exit status is only acceptable in dry-run mode.
fn run_command(ctx: &MountContext, spec: &CommandSpec) -> Result<(), String> {
    let result = ctx
        .executor
        .execute(spec)
        .map_err(|e| format!("{}: {:#}", spec, e))?;
    match result.status {
        Some(status) if !status.success() => Err(format!("{}: {}", spec, status)),
        None if !ctx.dry_run() => {
            Err(format!("{}: process exited without status (possibly killed by signal)", spec))
        }
        _ => Ok(()),
    }
}

/// Adds `nolock` to an NFS option string unless it is already there.
fn with_nolock(options: &str) -> String {
    if options.is_empty() {
        NFS_NOLOCK.to_string()
    } else if options.split(',').any(|opt| opt == NFS_NOLOCK) {
        options.to_string()
    } else {
        format!("{},{}", options, NFS_NOLOCK)
    }
}

/// Mounts an NFS export onto the mount point.
pub struct SetUpNfsTask {
    mount_point: Utf8PathBuf,
    address: String,
    ctx: MountContext,
}

impl SetUpNfsTask {
    /// Creates a task that mounts `address` on `mount_point`.
    pub fn new(mount_point: &Utf8Path, address: impl Into<String>, ctx: MountContext) -> Self {
        Self {
            mount_point: mount_point.to_owned(),
            address: address.into(),
            ctx,
        }
    }

    /// Builds the `mount` command for a parsed address.
    ///
    /// An address naming an ISO image mounts the directory holding it.
    pub fn mount_spec(&self, address: &NfsAddress) -> CommandSpec {
        let mut remote = Utf8Path::new(address.path());
        if remote.extension() == Some("iso")
            && let Some(parent) = remote.parent()
        {
            remote = parent;
        }
        let args = vec![
            "-t".to_string(),
            "nfs".to_string(),
            "-o".to_string(),
            with_nolock(address.options()),
            format!("{}:{}", address.server(), remote),
            self.mount_point.to_string(),
        ];
        CommandSpec::new("mount", args).with_privilege(self.ctx.privilege)
    }
}

impl Task for SetUpNfsTask {
    fn name(&self) -> &str {
        "Set up NFS installation source"
    }

    fn run(self: Box<Self>) -> Result<(), SourceError> {
        let address = NfsAddress::parse(&self.address)
            .map_err(|e| SourceError::mount(&self.mount_point, e.to_string()))?;

        ensure_not_in_use(&self.ctx, &self.mount_point)?;
        create_mount_point(&self.ctx, &self.mount_point)?;

        info!("mounting NFS {}:{} on {}", address.server(), address.path(), self.mount_point);
        let spec = self.mount_spec(&address);
        run_command(&self.ctx, &spec)
            .map_err(|reason| SourceError::mount(&self.mount_point, reason))
    }
}

/// Mounts a local partition onto the mount point.
pub struct SetUpHardDriveTask {
    mount_point: Utf8PathBuf,
    address: String,
    ctx: MountContext,
}

impl SetUpHardDriveTask {
    /// Creates a task that mounts the partition named by `address` on `mount_point`.
    pub fn new(mount_point: &Utf8Path, address: impl Into<String>, ctx: MountContext) -> Self {
        Self {
            mount_point: mount_point.to_owned(),
            address: address.into(),
            ctx,
        }
    }

    /// Builds the `mount` command for a parsed address.
    pub fn mount_spec(&self, address: &HardDriveAddress) -> CommandSpec {
        let args = vec![address.device_path(), self.mount_point.to_string()];
        CommandSpec::new("mount", args).with_privilege(self.ctx.privilege)
    }
}

impl Task for SetUpHardDriveTask {
    fn name(&self) -> &str {
        "Set up hard drive installation source"
    }

    fn run(self: Box<Self>) -> Result<(), SourceError> {
        let address = HardDriveAddress::parse(&self.address)
            .map_err(|e| SourceError::mount(&self.mount_point, e.to_string()))?;

        ensure_not_in_use(&self.ctx, &self.mount_point)?;
        create_mount_point(&self.ctx, &self.mount_point)?;

        info!("mounting partition {} on {}", address.device_path(), self.mount_point);
        let spec = self.mount_spec(&address);
        run_command(&self.ctx, &spec)
            .map_err(|reason| SourceError::mount(&self.mount_point, reason))
    }
}

/// Unmounts the mount point.
///
/// Succeeds without running anything if nothing is mounted, so tear-down
/// can be requested from any state.
pub struct TearDownMountTask {
    mount_point: Utf8PathBuf,
    ctx: MountContext,
}

impl TearDownMountTask {
    /// Creates a task that unmounts `mount_point`.
    pub fn new(mount_point: &Utf8Path, ctx: MountContext) -> Self {
        Self {
            mount_point: mount_point.to_owned(),
            ctx,
        }
    }
}

impl Task for TearDownMountTask {
    fn name(&self) -> &str {
        "Tear down mount installation source"
    }

    fn run(self: Box<Self>) -> Result<(), SourceError> {
        if !self.ctx.probe.is_mounted(&self.mount_point) {
            info!("{} is not mounted, nothing to tear down", self.mount_point);
            return Ok(());
        }

        info!("unmounting {}", self.mount_point);
        let spec = CommandSpec::new("umount", vec![self.mount_point.to_string()])
            .with_privilege(self.ctx.privilege);
        run_command(&self.ctx, &spec)
            .map_err(|reason| SourceError::unmount(&self.mount_point, reason))
    }
}
