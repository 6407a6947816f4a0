//! Installation sources and their lifecycle.
//!
//! Every source kind shares one state machine, [`SourceLifecycle`]. The kind
//! only contributes what differs between kinds through [`SourceKind`]:
//! its type tag, whether it needs the network, how its address is validated
//! and described, and which task mounts it.
//!
//! A source has two states. It is [`SourceState::Ready`] exactly when its
//! mount point is mounted according to the [`MountProbe`], and
//! [`SourceState::Unavailable`] otherwise. Nothing about a completed set-up
//! is cached, so an unmount performed behind the source's back shows up the
//! next time the state is read.
//!
//! Callers that do not care about the concrete kind work with
//! `Box<dyn InstallationSource>`.

pub mod harddrive;
pub mod nfs;
pub mod signal;

use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};

use camino::{Utf8Path, Utf8PathBuf};
use strum::{Display, EnumString};
use tracing::debug;

use crate::config::Profile;
use crate::error::SourceError;
use crate::probe::MountProbe;
use crate::profile::ProfileAdapter;
use crate::repo::RepoConfiguration;
use crate::task::{MountContext, Task, TearDownMountTask};

pub use harddrive::{HardDrive, HardDriveAddress};
pub use nfs::{Nfs, NfsAddress};
pub use signal::{ConfigurationSignal, ListenerId};

/// Default directory under which mount points are allocated.
pub const DEFAULT_MOUNT_ROOT: &str = "/run/install/sources";

static MOUNT_POINT_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Allocates a fresh mount point path under `root`.
///
/// Names have the form `mount-NNNN-<suffix>`, numbered per process, so two
/// sources created in the same process never share a mount point.
pub fn allocate_mount_point(root: &Utf8Path, suffix: &str) -> Utf8PathBuf {
    let index = MOUNT_POINT_COUNTER.fetch_add(1, Ordering::Relaxed);
    root.join(format!("mount-{:04}-{}", index, suffix))
}

/// Kind of installation source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum SourceType {
    /// A directory exported over NFS.
    #[strum(serialize = "NFS")]
    Nfs,
    /// A directory on a local hard-drive partition.
    #[strum(serialize = "HDD")]
    HardDrive,
}

/// Observable state of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum SourceState {
    /// The mount point is not mounted.
    Unavailable,
    /// The mount point is mounted and the content can be read.
    Ready,
}

impl SourceState {
    /// Maps a probe answer onto a state.
    pub fn from_mounted(mounted: bool) -> Self {
        if mounted { Self::Ready } else { Self::Unavailable }
    }
}

/// Access to the mount point a source is set up on.
pub trait HasMountPoint {
    /// Returns the mount point. It never changes for the lifetime of a source.
    fn mount_point(&self) -> &Utf8Path;

    /// Returns the probe used to check the mount point.
    fn probe(&self) -> &dyn MountProbe;

    /// Returns true if the mount point is currently mounted.
    fn mount_state(&self) -> bool {
        self.probe().is_mounted(self.mount_point())
    }
}

/// Generation of a repository descriptor for a mounted source.
pub trait ProducesRepoDescriptor: HasMountPoint {
    /// Directory the repository lives in. Defaults to the mount point.
    fn repo_root(&self) -> Utf8PathBuf {
        self.mount_point().to_owned()
    }

    /// Builds a repository descriptor rooted at [`repo_root`](Self::repo_root).
    ///
    /// Only meaningful while the source is ready; readiness is not checked.
    fn generate_repo_configuration(&self) -> RepoConfiguration {
        RepoConfiguration::from_directory(&self.repo_root())
    }
}

/// The operations a source publishes to its callers.
pub trait InstallationSource: ProducesRepoDescriptor + fmt::Display + Send + Sync {
    /// Returns the fixed kind of this source.
    fn source_type(&self) -> SourceType;

    /// Returns a human-readable label including the current address.
    fn description(&self) -> String;

    /// Returns true if the source can only be reached over the network.
    fn network_required(&self) -> bool;

    /// Returns the current state, probed live.
    fn state(&self) -> SourceState {
        SourceState::from_mounted(self.mount_state())
    }

    /// Returns the current address (empty if never configured).
    fn configuration(&self) -> &str;

    /// Validates and stores a new address, replacing the old one.
    ///
    /// Notifies listeners exactly once on success; a rejected value leaves
    /// the previous address in place and notifies nobody.
    fn set_configuration(&mut self, value: &str) -> Result<(), SourceError>;

    /// Reads this kind's section of an installer profile and stores the
    /// resulting address.
    fn import_profile(&mut self, profile: &Profile) -> Result<(), SourceError>;

    /// Writes the current address into this kind's section of a profile
    /// and marks the section as seen.
    fn export_profile(&self, profile: &mut Profile) -> Result<(), SourceError>;

    /// Returns the tasks that mount this source with the current address.
    fn set_up_with_tasks(&self) -> Vec<Box<dyn Task>>;

    /// Returns the tasks that unmount this source. Safe from any state.
    fn tear_down_with_tasks(&self) -> Vec<Box<dyn Task>>;
}

/// Kind-specific behaviour plugged into [`SourceLifecycle`].
pub trait SourceKind: ProfileAdapter + Send + Sync + 'static {
    /// Type tag reported by sources of this kind.
    const SOURCE_TYPE: SourceType;
    /// Whether sources of this kind need the network.
    const NETWORK_REQUIRED: bool;
    /// Suffix for allocated mount point names.
    const MOUNT_SUFFIX: &'static str;

    /// Checks that `address` is well formed for this kind.
    fn validate(address: &str) -> Result<(), SourceError>;

    /// Human-readable label for an address (which may be empty).
    fn describe(address: &str) -> String;

    /// Directory holding the repository once the source is mounted.
    fn repo_root(mount_point: &Utf8Path, _address: &str) -> Utf8PathBuf {
        mount_point.to_owned()
    }

    /// Creates the task that mounts `address` on `mount_point`.
    fn set_up_task(mount_point: &Utf8Path, address: &str, ctx: MountContext) -> Box<dyn Task>;
}

/// The state machine shared by all source kinds.
pub struct SourceLifecycle<K: SourceKind> {
    address: String,
    mount_point: Utf8PathBuf,
    ctx: MountContext,
    changed: ConfigurationSignal,
    kind: PhantomData<fn() -> K>,
}

/// An NFS installation source.
pub type NfsSource = SourceLifecycle<Nfs>;

/// A hard-drive installation source.
pub type HardDriveSource = SourceLifecycle<HardDrive>;

impl<K: SourceKind> SourceLifecycle<K> {
    /// Creates an unconfigured source bound to `mount_point`.
    pub fn new(mount_point: impl Into<Utf8PathBuf>, ctx: MountContext) -> Self {
        Self {
            address: String::new(),
            mount_point: mount_point.into(),
            ctx,
            changed: ConfigurationSignal::default(),
            kind: PhantomData,
        }
    }

    /// Creates an unconfigured source on a freshly allocated mount point under `root`.
    pub fn allocate(root: &Utf8Path, ctx: MountContext) -> Self {
        Self::new(allocate_mount_point(root, K::MOUNT_SUFFIX), ctx)
    }

    /// Registers a callback fired after every successful configuration change.
    ///
    /// The callback runs synchronously on the thread that set the
    /// configuration and receives the new address.
    pub fn on_configuration_changed<F>(&mut self, callback: F) -> ListenerId
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.changed.connect(callback)
    }

    /// Removes a callback registered with
    /// [`on_configuration_changed`](Self::on_configuration_changed).
    pub fn disconnect(&mut self, id: ListenerId) -> bool {
        self.changed.disconnect(id)
    }
}

impl<K: SourceKind> HasMountPoint for SourceLifecycle<K> {
    fn mount_point(&self) -> &Utf8Path {
        &self.mount_point
    }

    fn probe(&self) -> &dyn MountProbe {
        self.ctx.probe.as_ref()
    }
}

impl<K: SourceKind> ProducesRepoDescriptor for SourceLifecycle<K> {
    fn repo_root(&self) -> Utf8PathBuf {
        K::repo_root(&self.mount_point, &self.address)
    }
}

impl<K: SourceKind> InstallationSource for SourceLifecycle<K> {
    fn source_type(&self) -> SourceType {
        K::SOURCE_TYPE
    }

    fn description(&self) -> String {
        K::describe(&self.address)
    }

    fn network_required(&self) -> bool {
        K::NETWORK_REQUIRED
    }

    fn configuration(&self) -> &str {
        &self.address
    }

    fn set_configuration(&mut self, value: &str) -> Result<(), SourceError> {
        K::validate(value)?;
        self.address = value.to_string();
        debug!("{} address is set to {}", K::SOURCE_TYPE, self.address);
        self.changed.emit(&self.address);
        Ok(())
    }

    fn import_profile(&mut self, profile: &Profile) -> Result<(), SourceError> {
        let address = K::decompose(profile)?;
        self.set_configuration(&address)
    }

    fn export_profile(&self, profile: &mut Profile) -> Result<(), SourceError> {
        K::compose(&self.address, profile)
    }

    fn set_up_with_tasks(&self) -> Vec<Box<dyn Task>> {
        vec![K::set_up_task(&self.mount_point, &self.address, self.ctx.clone())]
    }

    fn tear_down_with_tasks(&self) -> Vec<Box<dyn Task>> {
        vec![Box::new(TearDownMountTask::new(&self.mount_point, self.ctx.clone()))]
    }
}

impl<K: SourceKind> fmt::Display for SourceLifecycle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Source(type='{}', url='{}')", K::SOURCE_TYPE, self.address)
    }
}

impl<K: SourceKind> fmt::Debug for SourceLifecycle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceLifecycle")
            .field("type", &K::SOURCE_TYPE)
            .field("address", &self.address)
            .field("mount_point", &self.mount_point)
            .field("listeners", &self.changed.len())
            .finish()
    }
}
