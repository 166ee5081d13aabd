use crate::Compression;
use crate::construct::{METHOD_BZIP2, METHOD_DEFLATE, METHOD_STORED};
#[cfg(feature = "xz")]
use crate::construct::METHOD_XZ;
#[cfg(feature = "zstd")]
use crate::construct::METHOD_ZSTD;
use std::fmt;

/// Header identifier, configuration name and "version needed to extract"
/// (APPNOTE 4.4.3.2) of a method.
struct Header {
    id: u16,
    name: &'static str,
    version: u16,
}

impl Compression {
    const fn header(&self) -> Header {
        match self {
            Compression::Stored => Header { id: METHOD_STORED, name: "stored", version: 10 },
            Compression::Deflate => Header { id: METHOD_DEFLATE, name: "deflate", version: 20 },
            Compression::Bzip2 => Header { id: METHOD_BZIP2, name: "bzip2", version: 46 },
            #[cfg(feature = "xz")]
            Compression::Xz => Header { id: METHOD_XZ, name: "xz", version: 63 },
            #[cfg(feature = "zstd")]
            Compression::Zstd => Header { id: METHOD_ZSTD, name: "zstd", version: 63 },
        }
    }

    /// Method identifier as written into local and central headers.
    #[must_use]
    pub const fn method(&self) -> u16 {
        self.header().id
    }

    /// Name accepted by [`str::parse`] and used in configuration files.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        self.header().name
    }

    #[must_use]
    pub const fn version_needed(&self) -> u16 {
        self.header().version
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for Compression {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
