//! Mapping between source addresses and installer profile sections.
//!
//! Each source kind reads and writes its own section of a [`Profile`].
//! [`ProfileAdapter::decompose`] turns a section into a composite address
//! and [`ProfileAdapter::compose`] writes an address back. The two are exact
//! inverses on valid values; anything else is rejected with
//! [`SourceError::InvalidConfiguration`] rather than coerced.

use crate::config::{HardDriveRecord, NfsRecord, Profile};
use crate::error::SourceError;
use crate::source::{HardDrive, HardDriveAddress, Nfs, NfsAddress};

/// Bidirectional mapping between a profile section and an address.
pub trait ProfileAdapter {
    /// Reads this kind's section of `profile` into a composite address.
    ///
    /// Fails if the section is missing or a required field is empty.
    fn decompose(profile: &Profile) -> Result<String, SourceError>;

    /// Writes `address` into this kind's section of `profile` and marks it
    /// as seen. Nothing else in the profile is touched, and nothing is
    /// touched at all when `address` is invalid.
    fn compose(address: &str, profile: &mut Profile) -> Result<(), SourceError>;
}

fn require<'a>(value: &'a str, what: &str) -> Result<&'a str, SourceError> {
    if value.is_empty() {
        return Err(SourceError::InvalidConfiguration(format!("{} is missing", what)));
    }
    Ok(value)
}

impl ProfileAdapter for Nfs {
    fn decompose(profile: &Profile) -> Result<String, SourceError> {
        let record = profile.nfs.as_ref().ok_or_else(|| {
            SourceError::InvalidConfiguration("profile has no `nfs` section".to_string())
        })?;
        let server = require(&record.server, "NFS server")?;
        let dir = require(&record.dir, "NFS directory")?;
        Ok(NfsAddress::new(server, dir, record.opts.as_str())?.to_string())
    }

    fn compose(address: &str, profile: &mut Profile) -> Result<(), SourceError> {
        let parsed = NfsAddress::parse(address)?;
        let record = profile.nfs.get_or_insert_with(NfsRecord::default);
        record.server = parsed.server().to_string();
        record.dir = parsed.path().to_string();
        record.opts = parsed.options().to_string();
        record.seen = true;
        Ok(())
    }
}

impl ProfileAdapter for HardDrive {
    fn decompose(profile: &Profile) -> Result<String, SourceError> {
        let record = profile.harddrive.as_ref().ok_or_else(|| {
            SourceError::InvalidConfiguration("profile has no `harddrive` section".to_string())
        })?;
        let partition = require(&record.partition, "hard drive partition")?;
        let dir = require(&record.dir, "hard drive directory")?;
        Ok(HardDriveAddress::new(partition, dir)?.to_string())
    }

    fn compose(address: &str, profile: &mut Profile) -> Result<(), SourceError> {
        let parsed = HardDriveAddress::parse(address)?;
        let record = profile.harddrive.get_or_insert_with(HardDriveRecord::default);
        record.partition = parsed.device().to_string();
        record.dir = parsed.path().to_string();
        record.seen = true;
        Ok(())
    }
}
