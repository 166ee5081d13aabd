//! Archive writing.
//!
//! Entries are appended one at a time; the central directory is buffered and
//! written by [`ArchiveWriter::finish`]. Nothing is ever seeked, so any
//! [`Write`] works as a sink.

use crate::consts::*;
use crate::dostime;
use crate::entry::ArchiveEntry;
use crate::error::{ErrorKind, Result};
use crate::read::BaseEntry;
use exn::{OptionExt, ResultExt};
use splice_compress::Compression;
use std::borrow::Cow;
use std::collections::HashSet;
use std::io::Write;
use tracing::instrument;

trait PutLe {
    fn put_u16(&mut self, value: u16);
    fn put_u32(&mut self, value: u32);
}
impl PutLe for Vec<u8> {
    fn put_u16(&mut self, value: u16) {
        self.extend_from_slice(&value.to_le_bytes());
    }

    fn put_u32(&mut self, value: u32) {
        self.extend_from_slice(&value.to_le_bytes());
    }
}

/// Streaming zip writer.
///
/// Two ways in: [`copy_raw`](Self::copy_raw) copies an entry of a
/// [`BaseArchive`](crate::BaseArchive) byte for byte, [`add`](Self::add)
/// compresses and writes a new [`ArchiveEntry`]. Each name can be written
/// once. Output larger than the classic zip limits (4 GiB, 65534 entries) is
/// rejected rather than silently switched to zip64.
pub struct ArchiveWriter<W: Write> {
    inner: W,
    offset: u64,
    central: Vec<u8>,
    names: HashSet<String>,
    comment: Vec<u8>,
}

impl<W: Write> ArchiveWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            offset: 0,
            central: Vec::new(),
            names: HashSet::new(),
            comment: Vec::new(),
        }
    }

    /// Number of entries written so far.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Archive-level comment, written after the end record.
    pub fn set_comment(&mut self, comment: impl Into<Vec<u8>>) -> Result<()> {
        let comment = comment.into();
        if comment.len() > usize::from(u16::MAX) {
            exn::bail!(ErrorKind::Unsupported("archive comment longer than 65535 bytes".to_string()));
        }
        self.comment = comment;
        Ok(())
    }

    fn claim(&mut self, name: &str) -> Result<()> {
        if !self.names.insert(name.to_string()) {
            exn::bail!(ErrorKind::DuplicateEntry(name.to_string()));
        }
        Ok(())
    }

    fn local_offset(&self) -> Result<u32> {
        u32::try_from(self.offset)
            .ok()
            .filter(|offset| *offset != u32::MAX)
            .ok_or_raise(|| ErrorKind::Unsupported("output exceeds 4 GiB and would need zip64".to_string()))
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes).or_raise(|| ErrorKind::Io)?;
        self.offset += bytes.len() as u64;
        Ok(())
    }

    /// Copy an entry of another archive verbatim: local header, payload,
    /// data descriptor and central directory record are kept as they are,
    /// only the local header offset is rewritten.
    pub fn copy_raw(&mut self, entry: &BaseEntry<'_>) -> Result<()> {
        let offset = self.local_offset()?;
        self.claim(entry.name())?;
        let mut central = entry.central_record().to_vec();
        central[CENTRAL_LOCAL_OFFSET_FIELD..CENTRAL_LOCAL_OFFSET_FIELD + 4].copy_from_slice(&offset.to_le_bytes());
        self.write_all(entry.local_record())?;
        self.central.extend_from_slice(&central);
        Ok(())
    }

    /// Compress and append a new entry.
    ///
    /// Directory entries are always stored, and so is any payload the
    /// requested method fails to shrink.
    #[instrument(skip_all, fields(name = entry.name(), size = entry.payload().len(), method))]
    pub fn add(&mut self, entry: &ArchiveEntry) -> Result<()> {
        let offset = self.local_offset()?;
        let name = entry.name().as_bytes();
        let name_len = u16::try_from(name.len()).or_raise(|| ErrorKind::InvalidName(entry.name().to_string()))?;
        self.claim(entry.name())?;

        let payload = entry.payload();
        let (compression, data) = match entry.compression() {
            _ if entry.is_dir() => (Compression::Stored, Cow::Borrowed(payload)),
            Compression::Stored => (Compression::Stored, Cow::Borrowed(payload)),
            method => {
                let compressed = method.compress(payload).map_err(ErrorKind::compression)?;
                match compressed.len() < payload.len() {
                    true => (method, Cow::Owned(compressed)),
                    false => (Compression::Stored, Cow::Borrowed(payload)),
                }
            },
        };
        tracing::Span::current().record("method", compression.as_str());
        let too_large = || ErrorKind::Unsupported(format!("entry {} exceeds 4 GiB", entry.name()));
        let size = u32::try_from(payload.len()).or_raise(too_large)?;
        let compressed_size = u32::try_from(data.len()).or_raise(too_large)?;
        let crc32 = crc32fast::hash(payload);
        let flags = match entry.name().is_ascii() {
            true => 0,
            false => FLAG_UTF8,
        };
        let (time, date) = dostime::encode(entry.modified());
        let version = compression.version_needed();
        let attributes = match entry.is_dir() {
            true => EXTERNAL_ATTRIBUTES_DIRECTORY,
            false => EXTERNAL_ATTRIBUTES_FILE,
        };

        let mut local = Vec::with_capacity(LOCAL_HEADER_SIZE + name.len());
        local.put_u32(LOCAL_HEADER_SIGNATURE);
        local.put_u16(version);
        local.put_u16(flags);
        local.put_u16(compression.method());
        local.put_u16(time);
        local.put_u16(date);
        local.put_u32(crc32);
        local.put_u32(compressed_size);
        local.put_u32(size);
        local.put_u16(name_len);
        local.put_u16(0);
        local.extend_from_slice(name);
        self.write_all(&local)?;
        self.write_all(&data)?;

        let central = &mut self.central;
        central.put_u32(CENTRAL_HEADER_SIGNATURE);
        central.put_u16(VERSION_MADE_BY);
        central.put_u16(version);
        central.put_u16(flags);
        central.put_u16(compression.method());
        central.put_u16(time);
        central.put_u16(date);
        central.put_u32(crc32);
        central.put_u32(compressed_size);
        central.put_u32(size);
        central.put_u16(name_len);
        // Extra field, comment, disk number start, internal attributes.
        central.put_u16(0);
        central.put_u16(0);
        central.put_u16(0);
        central.put_u16(0);
        central.put_u32(attributes);
        central.put_u32(offset);
        central.extend_from_slice(name);
        Ok(())
    }

    /// Write the central directory and end record, flush, and hand back the sink.
    pub fn finish(mut self) -> Result<W> {
        let zip64 = || ErrorKind::Unsupported("output would need zip64".to_string());
        let directory_offset = self.local_offset()?;
        let directory_size = u32::try_from(self.central.len()).ok().filter(|s| *s != u32::MAX).ok_or_raise(zip64)?;
        let entries = u16::try_from(self.names.len()).ok().filter(|n| *n != u16::MAX).ok_or_raise(zip64)?;
        if u64::from(directory_offset) + u64::from(directory_size) >= u64::from(u32::MAX) {
            exn::bail!(zip64());
        }

        let mut end = std::mem::take(&mut self.central);
        end.reserve(END_OF_CENTRAL_DIRECTORY_SIZE + self.comment.len());
        end.put_u32(END_OF_CENTRAL_DIRECTORY_SIGNATURE);
        // This disk, disk with the central directory.
        end.put_u16(0);
        end.put_u16(0);
        end.put_u16(entries);
        end.put_u16(entries);
        end.put_u32(directory_size);
        end.put_u32(directory_offset);
        // Checked by set_comment.
        end.put_u16(self.comment.len() as u16);
        end.extend_from_slice(&self.comment);
        self.write_all(&end)?;
        self.inner.flush().or_raise(|| ErrorKind::Io)?;
        tracing::debug!(entries, size = self.offset, "Archive written");
        Ok(self.inner)
    }
}
