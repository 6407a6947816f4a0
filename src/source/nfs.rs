//! NFS installation sources.
//!
//! An NFS source is configured with a single composite address:
//!
//! ```text
//! nfs:<server>:<path>[:<options>]
//! ```
//!
//! for example `nfs:nfs.example.com:/export/data:vers=4`. The options
//! segment is omitted when there are no options. [`NfsAddress`] splits an
//! address into its parts and joins them back into exactly the same string.

use std::fmt;

use camino::Utf8Path;

use super::{SourceKind, SourceType};
use crate::error::SourceError;
use crate::task::{MountContext, SetUpNfsTask, Task};

const SCHEME: &str = "nfs:";

/// Marker type selecting NFS behaviour in [`SourceLifecycle`](super::SourceLifecycle).
#[derive(Debug, Clone, Copy, Default)]
pub struct Nfs;

/// A parsed NFS address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NfsAddress {
    server: String,
    path: String,
    options: String,
}

/// Rejects parts that would make the composite address ambiguous.
fn check_part(name: &str, value: &str, forbidden: &[char]) -> Result<(), SourceError> {
    if let Some(c) = value
        .chars()
        .find(|c| c.is_whitespace() || forbidden.contains(c))
    {
        return Err(SourceError::InvalidConfiguration(format!(
            "NFS {} '{}' must not contain {:?}",
            name, value, c
        )));
    }
    Ok(())
}

impl NfsAddress {
    /// Builds an address from its parts.
    ///
    /// `server` and `path` are required and `path` must be absolute.
    /// `options` may be empty. No part may contain `:` or whitespace, and
    /// the server may not contain `/`.
    pub fn new(
        server: impl Into<String>,
        path: impl Into<String>,
        options: impl Into<String>,
    ) -> Result<Self, SourceError> {
        let (server, path, options) = (server.into(), path.into(), options.into());

        if server.is_empty() {
            return Err(SourceError::InvalidConfiguration(
                "NFS server must not be empty".to_string(),
            ));
        }
        check_part("server", &server, &[':', '/'])?;

        if path.is_empty() {
            return Err(SourceError::InvalidConfiguration(
                "NFS directory must not be empty".to_string(),
            ));
        }
        if !path.starts_with('/') {
            return Err(SourceError::InvalidConfiguration(format!(
                "NFS directory '{}' must be absolute",
                path
            )));
        }
        check_part("directory", &path, &[':'])?;
        check_part("options", &options, &[':'])?;

        Ok(Self {
            server,
            path,
            options,
        })
    }

    /// Parses a composite `nfs:` address.
    pub fn parse(address: &str) -> Result<Self, SourceError> {
        let rest = address.strip_prefix(SCHEME).ok_or_else(|| {
            SourceError::InvalidConfiguration(format!(
                "NFS address '{}' must start with '{}'",
                address, SCHEME
            ))
        })?;

        let parts: Vec<&str> = rest.split(':').collect();
        match parts.as_slice() {
            [server, path] => Self::new(*server, *path, ""),
            [server, path, options] if !options.is_empty() => {
                Self::new(*server, *path, *options)
            }
            [_, _, _] => Err(SourceError::InvalidConfiguration(format!(
                "NFS address '{}' has an empty options segment",
                address
            ))),
            _ => Err(SourceError::InvalidConfiguration(format!(
                "NFS address '{}' must have the form nfs:<server>:<path>[:<options>]",
                address
            ))),
        }
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Mount options; empty when none were given.
    pub fn options(&self) -> &str {
        &self.options
    }
}

impl fmt::Display for NfsAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}:{}", SCHEME, self.server, self.path)?;
        if !self.options.is_empty() {
            write!(f, ":{}", self.options)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for NfsAddress {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl SourceKind for Nfs {
    const SOURCE_TYPE: SourceType = SourceType::Nfs;
    const NETWORK_REQUIRED: bool = true;
    const MOUNT_SUFFIX: &'static str = "nfs-device";

    fn validate(address: &str) -> Result<(), SourceError> {
        NfsAddress::parse(address).map(|_| ())
    }

    fn describe(address: &str) -> String {
        format!("NFS server {}", address)
    }

    fn set_up_task(mount_point: &Utf8Path, address: &str, ctx: MountContext) -> Box<dyn Task> {
        Box::new(SetUpNfsTask::new(mount_point, address, ctx))
    }
}
