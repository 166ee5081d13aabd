//! Compression methods for zip archive entries.
//!
//! [`Compression`] covers the methods a jar is realistically built with,
//! keyed by the identifiers zip headers use (APPNOTE 4.4.5). It can be looked
//! up from a header ([`Compression::from_method`]) or a configuration string
//! ([`str::parse`]), and encodes or decodes whole entry payloads in memory
//! ([`Compression::compress`], [`Compression::decompress`]).
//!
//! Stored, Deflate and Bzip2 are always available; XZ and Zstd sit behind the
//! `xz` and `zstd` features. Encoding always uses the method's best level.

mod construct;
pub mod error;
mod ops;
#[cfg(feature = "serde")]
mod serialize;
mod util;

/// A supported zip entry compression method.
///
/// Variants gated behind feature flags (`xz`, `zstd`) are only available
/// when the corresponding feature is enabled. Defaults to
/// [`Deflate`](Self::Deflate), the method every zip reader understands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Compression {
    /// No compression (method 0)
    Stored,
    /// Raw deflate (method 8)
    #[default]
    Deflate,
    /// Bzip2 (method 12)
    Bzip2,
    /// XZ (method 95)
    #[cfg(feature = "xz")]
    Xz,
    /// Zstandard (method 93)
    #[cfg(feature = "zstd")]
    Zstd,
}

#[cfg(test)]
mod tests {
    use crate::Compression;

    #[test]
    fn compression_default() {
        assert_eq!(Compression::default(), Compression::Deflate);
    }
}
