//! Errors raised while looking up or running a compression method.
//!
//! Built on `exn` so every layer that re-raises one of these keeps its
//! location in the error tree.

use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// An encoder or decoder could not be set up.
    #[display("failed to initialize codec")]
    Encoder,
    /// Compressed input could not be decoded. Retrying with the same bytes is pointless.
    #[display("compressed data is corrupt")]
    InvalidData,
    /// A configuration string names no known method.
    #[display("unknown compression method `{_0}`")]
    UnknownName(#[error(not(source))] String),
    /// A zip header carries a method identifier that is never decoded here
    /// (implode, deflate64, PPMd, ...).
    #[display("unsupported zip compression method {_0}")]
    UnsupportedMethod(#[error(not(source))] u16),
    /// A known method whose cargo feature is not enabled.
    #[display("compression method {_0} is not enabled in this build")]
    Disabled(#[error(not(source))] &'static str),
    /// Writing compressed output failed.
    #[display("I/O error")]
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Io)
    }
}
