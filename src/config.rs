//! Installer profile loading and saving.
//!
//! The installer profile is a YAML document. This crate owns only the
//! source sections (`nfs`, `harddrive`); every other top-level key is kept
//! in [`Profile::extra`] and written back unchanged. Unknown keys inside a
//! source section are kept the same way in the record's own `extra`.
//!
//! ```yaml
//! nfs:
//!   server: nfs.example.com
//!   dir: /export/data
//!   opts: vers=4
//!   seen: true
//! lang: en_US.UTF-8
//! ```

use std::collections::BTreeMap;
use std::fs;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use crate::error::SourceError;
use crate::source::SourceType;

/// The `nfs` section of an installer profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NfsRecord {
    /// Host name or address of the NFS server.
    #[serde(default)]
    pub server: String,
    /// Exported directory on the server.
    #[serde(default)]
    pub dir: String,
    /// Comma-separated mount options; empty for none.
    #[serde(default)]
    pub opts: String,
    /// True once the profile was written with this section as the source.
    #[serde(default)]
    pub seen: bool,
    /// Keys of the section this crate does not own.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// The `harddrive` section of an installer profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HardDriveRecord {
    /// Partition holding the repository (`sdb1`, `/dev/sdb1`, `LABEL=...`).
    #[serde(default)]
    pub partition: String,
    /// Directory of the repository within the partition.
    #[serde(default)]
    pub dir: String,
    /// True once the profile was written with this section as the source.
    #[serde(default)]
    pub seen: bool,
    /// Keys of the section this crate does not own.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// An installer profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// NFS source section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nfs: Option<NfsRecord>,
    /// Hard-drive source section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub harddrive: Option<HardDriveRecord>,
    /// All other keys, preserved verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl Profile {
    /// Parses a profile from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self, SourceError> {
        serde_yaml::from_str(text)
            .map_err(|e| SourceError::Config(format!("failed to parse profile: {}", e)))
    }

    /// Serializes the profile to YAML text.
    pub fn to_yaml(&self) -> Result<String, SourceError> {
        serde_yaml::to_string(self)
            .map_err(|e| SourceError::Config(format!("failed to serialize profile: {}", e)))
    }

    /// Returns the kind of source this profile configures.
    ///
    /// A section marked `seen` wins; otherwise the first present section
    /// (`nfs`, then `harddrive`) is used.
    pub fn source_type(&self) -> Result<SourceType, SourceError> {
        match (&self.nfs, &self.harddrive) {
            (Some(nfs), _) if nfs.seen => Ok(SourceType::Nfs),
            (_, Some(hdd)) if hdd.seen => Ok(SourceType::HardDrive),
            (Some(_), _) => Ok(SourceType::Nfs),
            (None, Some(_)) => Ok(SourceType::HardDrive),
            (None, None) => Err(SourceError::InvalidConfiguration(
                "profile does not define an installation source (expected `nfs` or `harddrive`)"
                    .to_string(),
            )),
        }
    }
}

/// Loads an installer profile from a YAML file.
pub fn load_profile(path: &Utf8Path) -> Result<Profile, SourceError> {
    let text = fs::read_to_string(path)
        .map_err(|e| SourceError::io(format!("failed to read profile: {}", path), e))?;
    Profile::from_yaml(&text).map_err(|e| match e {
        SourceError::Config(msg) => SourceError::Config(format!("{}: {}", path, msg)),
        other => other,
    })
}

/// Writes an installer profile to a YAML file.
pub fn save_profile(path: &Utf8Path, profile: &Profile) -> Result<(), SourceError> {
    let text = profile.to_yaml()?;
    fs::write(path, text)
        .map_err(|e| SourceError::io(format!("failed to write profile: {}", path), e))
}
