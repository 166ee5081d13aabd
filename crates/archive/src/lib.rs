//! Zip container reading and writing.
//!
//! Built for repackaging: a [`BaseArchive`] is parsed once, its entries are
//! either copied byte for byte into an [`ArchiveWriter`] (keeping their
//! compressed payload, timestamps, extra fields and data descriptors) or
//! skipped, and new [`ArchiveEntry`]s are compressed with
//! [`splice_compress`] on the way in.
//!
//! Classic zip only: zip64, multi-disk and encrypted archives are reported as
//! [`Unsupported`](error::ErrorKind::Unsupported) rather than half-handled.

mod consts;
pub mod dostime;
mod entry;
pub mod error;
mod name;
mod read;
mod write;

pub use crate::dostime::DOS_EPOCH;
pub use crate::entry::ArchiveEntry;
pub use crate::name::{from_path as name_from_path, validate as validate_name};
pub use crate::read::{BaseArchive, BaseEntry};
pub use crate::write::ArchiveWriter;
pub use splice_compress::Compression;
