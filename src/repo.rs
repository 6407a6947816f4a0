//! Repository descriptors handed to the package layer.

use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use strum::Display;

/// Role of a repository in the installation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum RepoType {
    /// The base repository the installation is built from.
    #[default]
    Base,
    /// An additional repository.
    Additional,
}

/// Where and how to read a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoConfiguration {
    /// Repository name; empty for the base repository.
    #[serde(default)]
    pub name: String,
    /// Location of the repository, e.g. `file:///run/install/sources/mount-0000-nfs-device`.
    pub url: String,
    /// Role of the repository.
    #[serde(rename = "type", default)]
    pub repo_type: RepoType,
    /// Whether the repository is used.
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl RepoConfiguration {
    /// Describes the base repository found in a local directory.
    pub fn from_directory(directory: &Utf8Path) -> Self {
        Self {
            name: String::new(),
            url: format!("file://{}", directory),
            repo_type: RepoType::Base,
            enabled: true,
        }
    }

    /// Returns the local directory for `file://` URLs.
    pub fn directory(&self) -> Option<&Utf8Path> {
        self.url.strip_prefix("file://").map(Utf8Path::new)
    }
}
