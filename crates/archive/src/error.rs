//! Archive Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use splice_compress::error::{Error as CompressionError, ErrorKind as CompressionErrorKind};

/// An archive error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for archive operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The container structure is malformed; the message names the failed check.
    #[display("corrupt archive: {_0}")]
    Corrupt(#[error(not(source))] String),
    /// Valid zip, but uses a feature this crate does not handle (zip64, multi-disk, encryption).
    #[display("unsupported archive feature: {_0}")]
    Unsupported(#[error(not(source))] String),
    /// Entry name is empty, escapes the archive root, or contains forbidden characters.
    #[display("invalid entry name: {_0:?}")]
    InvalidName(#[error(not(source))] String),
    /// An entry with this name was already written.
    #[display("duplicate entry: {_0}")]
    DuplicateEntry(#[error(not(source))] String),
    /// Decompressed payload does not match the recorded CRC-32 or size.
    #[display("checksum mismatch: {_0}")]
    ChecksumMismatch(#[error(not(source))] String),
    /// Compression/decompression error
    #[display("compression error: {_0}")]
    Compression(CompressionErrorKind),
    /// Reading the archive or writing the output failed.
    #[display("I/O error")]
    Io,
}

impl ErrorKind {
    /// Convert a compression error into an archive error, preserving the
    /// compress crate's `Exn` frame (error tree) as a child in its own
    /// error tree.
    #[track_caller]
    pub fn compression(err: CompressionError) -> Error {
        let inner = (*err).clone();
        err.raise(ErrorKind::Compression(inner))
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(
            ErrorKind::Corrupt("bad signature".to_string()).to_string(),
            "corrupt archive: bad signature"
        );
        assert_eq!(ErrorKind::InvalidName("../x".to_string()).to_string(), r#"invalid entry name: "../x""#);
    }

    #[test]
    fn compression_error_keeps_kind() {
        let err: CompressionError = exn::Exn::from(CompressionErrorKind::InvalidData);
        let err = ErrorKind::compression(err);
        assert_eq!(*err, ErrorKind::Compression(CompressionErrorKind::InvalidData));
        assert!(!err.is_retryable());
    }
}
