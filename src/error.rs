//! Domain-specific error types for instsource.
//!
//! This module defines `SourceError`, a `thiserror`-based enum that
//! provides typed error variants for the failure modes of an installation
//! source: malformed configuration, failed mounts, failed unmounts and
//! cancelled task runs. Public API functions return
//! `Result<T, SourceError>` so callers can match on the failure kind, while
//! the command executor trait boundary continues to use `anyhow::Result`.
//!
//! `SourceError` implements `Into<anyhow::Error>`, so the `?` operator
//! converts it automatically in the CLI layer.

use std::io;

use camino::Utf8Path;

/// Formats an IO error kind into a human-readable message.
///
/// Provides consistent messages for common IO error kinds
/// (e.g., "I/O error: not found") instead of the OS-level messages
/// (e.g., "No such file or directory (os error 2)"). For unrecognized
/// error kinds, falls back to including the OS-level error message.
pub(crate) fn io_error_kind_message(err: &io::Error) -> String {
    match err.kind() {
        io::ErrorKind::NotFound => "I/O error: not found".to_string(),
        io::ErrorKind::PermissionDenied => "I/O error: permission denied".to_string(),
        io::ErrorKind::IsADirectory => "I/O error: is a directory".to_string(),
        _ => format!("I/O error: {}", err),
    }
}

/// Domain-specific error type for installation sources.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SourceError {
    /// A source address or profile record is malformed for its source kind.
    ///
    /// Raised synchronously by configuration setters and profile
    /// import/export; never retried.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A set-up task could not mount the source.
    #[error("failed to mount {mount_point}: {reason}")]
    MountFailure {
        /// The mount point the task was mounting onto.
        mount_point: String,
        /// Exit status, executor error or pre-check that failed.
        reason: String,
    },

    /// A tear-down task could not unmount the source.
    #[error("failed to unmount {mount_point}: {reason}")]
    UnmountFailure {
        /// The mount point the task was unmounting.
        mount_point: String,
        /// Exit status or executor error.
        reason: String,
    },

    /// A task run was cancelled before it completed.
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// An installer profile could not be parsed or serialized.
    #[error("configuration error: {0}")]
    Config(String),

    /// An I/O operation failed with contextual information.
    #[error("{context}: {message}")]
    Io {
        /// What was being done when the error occurred, usually with a path.
        context: String,
        /// Human-readable description derived from [`io_error_kind_message`].
        message: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl SourceError {
    /// Creates an `Io` variant with the `message` field derived from `source`.
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            message: io_error_kind_message(&source),
            source,
        }
    }

    /// Creates a `MountFailure` for the given mount point.
    pub(crate) fn mount(mount_point: &Utf8Path, reason: impl Into<String>) -> Self {
        Self::MountFailure {
            mount_point: mount_point.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates an `UnmountFailure` for the given mount point.
    pub(crate) fn unmount(mount_point: &Utf8Path, reason: impl Into<String>) -> Self {
        Self::UnmountFailure {
            mount_point: mount_point.to_string(),
            reason: reason.into(),
        }
    }

    /// Returns true if this error was produced by configuration validation.
    pub fn is_invalid_configuration(&self) -> bool {
        matches!(self, Self::InvalidConfiguration(_))
    }
}
