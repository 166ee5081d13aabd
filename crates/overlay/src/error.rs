//! Overlay Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Every variant is terminal for the
//! merge that raised it; nothing in this crate retries.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// An overlay error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for overlay operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a merge failure.
///
/// ### Input Errors
/// - [`ErrorKind::CorruptArchive`]
/// - [`ErrorKind::MissingOverrideSource`]
/// - [`ErrorKind::DuplicateOverrideName`] - caller bug, never resolved silently.
/// - [`ErrorKind::InvalidEntryName`]
/// - [`ErrorKind::InvalidPattern`]
///
/// ### Output Errors
/// - [`ErrorKind::WriteFailure`] - the destination is left untouched.
///
/// ### Batch Errors
/// - [`ErrorKind::JobAborted`]
/// - [`ErrorKind::BatchFailed`]
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The base archive could not be read or parsed.
    #[display("corrupt base archive: {}", _0.display())]
    CorruptArchive(#[error(not(source))] PathBuf),
    /// A declared override directory is absent, or one of its files is unreadable.
    #[display("override source missing or unreadable: {}", _0.display())]
    MissingOverrideSource(#[error(not(source))] PathBuf),
    /// Two override sources supplied an entry with the same name.
    #[display("duplicate override entry: {_0}")]
    DuplicateOverrideName(#[error(not(source))] String),
    /// The destination (or one of its aliases) could not be written.
    #[display("failed to write archive: {}", _0.display())]
    WriteFailure(#[error(not(source))] PathBuf),
    /// An exclusion pattern is not a valid glob.
    #[display("invalid exclusion pattern: {_0}")]
    InvalidPattern(#[error(not(source))] String),
    /// An override file's relative path cannot be used as an entry name.
    #[display("invalid override entry name: {}", _0.display())]
    InvalidEntryName(#[error(not(source))] PathBuf),
    /// A batch worker died before reporting a result.
    #[display("merge job for {} aborted", _0.display())]
    JobAborted(#[error(not(source))] PathBuf),
    /// Some merges of a batch failed; each failure is reported separately.
    #[display("{_0} merge job(s) failed")]
    BatchFailed(#[error(not(source))] usize),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // None of these are transient from the merger's point of view.
        false
    }
}
