//! Mount state probing.
//!
//! A probe answers one question: is this path currently a mount point?
//! It never mutates anything. Source state is always derived from a probe,
//! so an external `umount` is reflected the next time the state is read.

use std::fs;

use camino::Utf8Path;
use rustix::fs::FileType;

/// The kernel's view of the current mount namespace.
const PROC_MOUNTS: &str = "/proc/self/mounts";

/// Answers whether a path is currently mounted.
pub trait MountProbe: Send + Sync {
    /// Returns true if `path` is a mount point right now.
    ///
    /// Missing or unreadable paths are reported as not mounted.
    fn is_mounted(&self, path: &Utf8Path) -> bool;
}

/// Probe backed by the live system.
///
/// Checks the device boundary between the path and its parent first (the
/// classic `ismount` test), then falls back to the kernel mount table for
/// bind mounts that stay on the same device.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemMountProbe;

impl SystemMountProbe {
    /// Device-boundary test: the path is a mount point if it lives on a
    /// different device than its parent, or is its own parent (`/`).
    fn crosses_device_boundary(path: &Utf8Path) -> Option<bool> {
        let own = rustix::fs::lstat(path.as_str()).ok()?;
        if FileType::from_raw_mode(own.st_mode) == FileType::Symlink {
            return Some(false);
        }
        let parent = rustix::fs::lstat(path.join("..").as_str()).ok()?;
        Some(own.st_dev != parent.st_dev || own.st_ino == parent.st_ino)
    }
}

impl MountProbe for SystemMountProbe {
    fn is_mounted(&self, path: &Utf8Path) -> bool {
        match Self::crosses_device_boundary(path) {
            None => false,
            Some(true) => true,
            Some(false) => match fs::read_to_string(PROC_MOUNTS) {
                Ok(table) => mount_table_contains(&table, path),
                Err(e) => {
                    tracing::debug!("failed to read {}: {}", PROC_MOUNTS, e);
                    false
                }
            },
        }
    }
}

/// Returns true if a `/proc/mounts`-format table lists `path` as a target.
///
/// Lines have the form `device mountpoint fstype options dump pass`, with
/// whitespace in the mount point escaped as octal (`\040`).
pub fn mount_table_contains(table: &str, path: &Utf8Path) -> bool {
    let wanted = path.as_str().trim_end_matches('/');
    let wanted = if wanted.is_empty() { "/" } else { wanted };
    table
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .any(|target| unescape_mount_field(target) == wanted)
}

/// Decodes the octal escapes the kernel uses in mount table fields.
fn unescape_mount_field(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\'
            && i + 3 < bytes.len()
            && bytes[i + 1..i + 4].iter().all(|b| (b'0'..=b'7').contains(b))
        {
            let value = bytes[i + 1..i + 4]
                .iter()
                .fold(0u32, |acc, b| acc * 8 + u32::from(b - b'0'));
            if let Ok(byte) = u8::try_from(value) {
                out.push(byte);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
