//! Hard-drive installation sources.
//!
//! The repository lives in a directory on a local partition. The composite
//! address is `hd:<device>:<path>`, e.g. `hd:sdb1:/repo` or
//! `hd:LABEL=media:/`. The repository root is `<mount point>/<path>`.

use std::fmt;

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};

use super::{SourceKind, SourceType};
use crate::error::SourceError;
use crate::task::{MountContext, SetUpHardDriveTask, Task};

const SCHEME: &str = "hd:";

/// Marker type selecting hard-drive behaviour in [`SourceLifecycle`](super::SourceLifecycle).
#[derive(Debug, Clone, Copy, Default)]
pub struct HardDrive;

/// A parsed hard-drive address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardDriveAddress {
    device: String,
    path: String,
}

impl HardDriveAddress {
    /// Builds an address from a device and an absolute directory.
    pub fn new(device: impl Into<String>, path: impl Into<String>) -> Result<Self, SourceError> {
        let (device, path) = (device.into(), path.into());
        if device.is_empty() {
            return Err(SourceError::InvalidConfiguration(
                "hard drive partition must not be empty".to_string(),
            ));
        }
        if device.contains(':') || device.chars().any(char::is_whitespace) {
            return Err(SourceError::InvalidConfiguration(format!(
                "hard drive partition '{}' must not contain ':' or whitespace",
                device
            )));
        }
        if !path.starts_with('/') {
            return Err(SourceError::InvalidConfiguration(format!(
                "hard drive directory '{}' must be absolute",
                path
            )));
        }
        if path.contains(':') || path.chars().any(char::is_whitespace) {
            return Err(SourceError::InvalidConfiguration(format!(
                "hard drive directory '{}' must not contain ':' or whitespace",
                path
            )));
        }
        if Utf8Path::new(&path)
            .components()
            .any(|c| c == Utf8Component::ParentDir)
        {
            return Err(SourceError::InvalidConfiguration(format!(
                "hard drive directory '{}' must not contain '..'",
                path
            )));
        }
        Ok(Self { device, path })
    }

    /// Parses a composite `hd:` address.
    pub fn parse(address: &str) -> Result<Self, SourceError> {
        let rest = address.strip_prefix(SCHEME).ok_or_else(|| {
            SourceError::InvalidConfiguration(format!(
                "hard drive address '{}' must start with '{}'",
                address, SCHEME
            ))
        })?;
        match rest.split_once(':') {
            Some((device, path)) => Self::new(device, path),
            None => Err(SourceError::InvalidConfiguration(format!(
                "hard drive address '{}' must have the form hd:<partition>:<path>",
                address
            ))),
        }
    }

    /// The partition as written in the profile.
    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The device argument for `mount`.
    ///
    /// Bare partition names are looked up in `/dev`; paths and
    /// `LABEL=`/`UUID=` specs are passed through.
    pub fn device_path(&self) -> String {
        if self.device.contains('/') || self.device.contains('=') {
            self.device.clone()
        } else {
            format!("/dev/{}", self.device)
        }
    }
}

impl fmt::Display for HardDriveAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}:{}", SCHEME, self.device, self.path)
    }
}

impl SourceKind for HardDrive {
    const SOURCE_TYPE: SourceType = SourceType::HardDrive;
    const NETWORK_REQUIRED: bool = false;
    const MOUNT_SUFFIX: &'static str = "hdd-device";

    fn validate(address: &str) -> Result<(), SourceError> {
        HardDriveAddress::parse(address).map(|_| ())
    }

    fn describe(address: &str) -> String {
        format!("Hard drive {}", address)
    }

    fn repo_root(mount_point: &Utf8Path, address: &str) -> Utf8PathBuf {
        let relative = HardDriveAddress::parse(address)
            .map(|parsed| parsed.path().trim_start_matches('/').to_string())
            .unwrap_or_default();
        if relative.is_empty() {
            mount_point.to_owned()
        } else {
            mount_point.join(relative)
        }
    }

    fn set_up_task(mount_point: &Utf8Path, address: &str, ctx: MountContext) -> Box<dyn Task> {
        Box::new(SetUpHardDriveTask::new(mount_point, address, ctx))
    }
}
