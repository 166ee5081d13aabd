use crate::dostime::DOS_EPOCH;
use crate::error::Result;
use crate::name;
use splice_compress::Compression;
use time::PrimitiveDateTime;

/// An entry to be written from scratch: name, uncompressed payload,
/// modification time and the compression method to apply.
///
/// New entries are stamped with [`DOS_EPOCH`] unless told otherwise, so the
/// same payloads always produce the same archive bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    name: String,
    payload: Vec<u8>,
    modified: PrimitiveDateTime,
    compression: Compression,
}

impl ArchiveEntry {
    /// Create an entry; the name is validated and normalized with
    /// [`validate_name`](crate::validate_name).
    pub fn new(name: impl AsRef<str>, payload: impl Into<Vec<u8>>) -> Result<Self> {
        Ok(Self {
            name: name::validate(name.as_ref())?,
            payload: payload.into(),
            modified: DOS_EPOCH,
            compression: Compression::default(),
        })
    }

    pub fn with_modified(mut self, modified: PrimitiveDateTime) -> Self {
        self.modified = modified;
        self
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn modified(&self) -> PrimitiveDateTime {
        self.modified
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    pub fn is_dir(&self) -> bool {
        self.name.ends_with('/')
    }
}
