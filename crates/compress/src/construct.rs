use crate::Compression;
use crate::error::{Error, ErrorKind, Result};
use std::str::FromStr;

pub(crate) const METHOD_STORED: u16 = 0;
pub(crate) const METHOD_DEFLATE: u16 = 8;
pub(crate) const METHOD_BZIP2: u16 = 12;
pub(crate) const METHOD_ZSTD: u16 = 93;
pub(crate) const METHOD_XZ: u16 = 95;

impl FromStr for Compression {
    type Err = Error;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "store" | "stored" => Ok(Compression::Stored),
            "deflate" | "deflated" => Ok(Compression::Deflate),
            "bz2" | "bzip2" => Ok(Compression::Bzip2),
            #[cfg(feature = "xz")]
            "xz" | "lzma" => Ok(Compression::Xz),
            #[cfg(not(feature = "xz"))]
            "xz" | "lzma" => exn::bail!(ErrorKind::Disabled("xz")),
            #[cfg(feature = "zstd")]
            "zst" | "zstd" => Ok(Compression::Zstd),
            #[cfg(not(feature = "zstd"))]
            "zst" | "zstd" => exn::bail!(ErrorKind::Disabled("zstd")),
            _ => exn::bail!(ErrorKind::UnknownName(s.to_string())),
        }
    }
}

impl TryFrom<u16> for Compression {
    type Error = Error;
    fn try_from(method: u16) -> std::result::Result<Self, Self::Error> {
        Compression::from_method(method)
    }
}

impl Compression {
    /// Look up the compression method from the identifier stored in a zip
    /// local or central directory header.
    ///
    /// Methods that are known but compiled out (XZ, Zstd without their
    /// features) raise [`Disabled`](ErrorKind::Disabled) so that
    /// callers can tell "rebuild with a feature" apart from "never going to
    /// work" (implode, shrink, PPMd, ...).
    pub fn from_method(method: u16) -> Result<Self> {
        match method {
            METHOD_STORED => Ok(Compression::Stored),
            METHOD_DEFLATE => Ok(Compression::Deflate),
            METHOD_BZIP2 => Ok(Compression::Bzip2),
            #[cfg(feature = "xz")]
            METHOD_XZ => Ok(Compression::Xz),
            #[cfg(not(feature = "xz"))]
            METHOD_XZ => exn::bail!(ErrorKind::Disabled("xz")),
            #[cfg(feature = "zstd")]
            METHOD_ZSTD => Ok(Compression::Zstd),
            #[cfg(not(feature = "zstd"))]
            METHOD_ZSTD => exn::bail!(ErrorKind::Disabled("zstd")),
            other => exn::bail!(ErrorKind::UnsupportedMethod(other)),
        }
    }
}
