//! Base archive parsing.
//!
//! The whole archive is held in memory; entries are located through the
//! central directory (never by scanning local headers) and cross-checked
//! against their local headers so that a verbatim copy of each local record
//! is always well-formed.

use crate::consts::*;
use crate::dostime;
use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use splice_compress::Compression;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::ops::Range;
use std::path::Path;
use time::PrimitiveDateTime;
use tracing::instrument;

/// A read-only, fully parsed zip archive.
pub struct BaseArchive {
    data: Vec<u8>,
    records: Vec<Record>,
    comment: Range<usize>,
}

#[derive(Debug, Clone)]
struct Record {
    name: String,
    header: CentralHeader,
    central: Range<usize>,
    local: Range<usize>,
    payload: Range<usize>,
}

#[derive(Debug, Clone, Copy)]
struct CentralHeader {
    flags: u16,
    method: u16,
    time: u16,
    date: u16,
    crc32: u32,
    compressed_size: u32,
    uncompressed_size: u32,
    local_offset: u32,
}

/// One entry of a [`BaseArchive`], borrowed from the archive's buffer.
#[derive(Clone, Copy)]
pub struct BaseEntry<'a> {
    data: &'a [u8],
    record: &'a Record,
}

/// Little-endian field reader over a slice whose length was already checked.
struct Fields<'a> {
    bytes: &'a [u8],
    pos: usize,
}
impl<'a> Fields<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn u16(&mut self) -> u16 {
        let value = u16::from_le_bytes([self.bytes[self.pos], self.bytes[self.pos + 1]]);
        self.pos += 2;
        value
    }

    fn u32(&mut self) -> u32 {
        let mut buf = [0; 4];
        buf.copy_from_slice(&self.bytes[self.pos..self.pos + 4]);
        self.pos += 4;
        u32::from_le_bytes(buf)
    }

    fn skip(&mut self, bytes: usize) -> &mut Self {
        self.pos += bytes;
        self
    }
}

fn corrupt(message: impl Into<String>) -> ErrorKind {
    ErrorKind::Corrupt(message.into())
}

/// `data[start..start + len]`, provided it ends at or before `limit`.
fn span(data: &[u8], start: usize, len: usize, limit: usize) -> Option<&[u8]> {
    let end = start.checked_add(len)?;
    if end > limit {
        return None;
    }
    data.get(start..end)
}

fn signature_at(data: &[u8], pos: usize) -> Option<u32> {
    span(data, pos, 4, data.len()).map(|bytes| Fields::new(bytes).u32())
}

impl BaseArchive {
    /// Read and parse the archive at `path`.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path.as_ref()).or_raise(|| ErrorKind::Io)?;
        Self::from_bytes(data)
    }

    /// Parse an archive held in memory.
    ///
    /// Rejects zip64 and multi-disk archives as [`Unsupported`](ErrorKind::Unsupported);
    /// every other structural problem is [`Corrupt`](ErrorKind::Corrupt)
    /// with a message naming the failed check.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let end = find_end_record(&data).ok_or_raise(|| corrupt("end of central directory record not found"))?;
        let mut fields = Fields::new(&data[end..end + END_OF_CENTRAL_DIRECTORY_SIZE]);
        fields.skip(4);
        let disk = fields.u16();
        let directory_disk = fields.u16();
        let disk_entries = fields.u16();
        let total_entries = fields.u16();
        let directory_size = fields.u32();
        let directory_offset = fields.u32();
        let comment_len = usize::from(fields.u16());

        if disk != 0 || directory_disk != 0 || disk_entries != total_entries {
            exn::bail!(ErrorKind::Unsupported("multi-disk archive".to_string()));
        }
        if total_entries == u16::MAX
            || directory_size == u32::MAX
            || directory_offset == u32::MAX
            || has_zip64_locator(&data, end)
        {
            exn::bail!(ErrorKind::Unsupported("zip64 archive".to_string()));
        }

        let directory_start = directory_offset as usize;
        let directory_end = directory_start
            .checked_add(directory_size as usize)
            .filter(|directory_end| *directory_end <= end)
            .ok_or_raise(|| corrupt("central directory extends past the end record"))?;

        let mut records = Vec::with_capacity(usize::from(total_entries));
        let mut pos = directory_start;
        for _ in 0..total_entries {
            let record = parse_record(&data, pos, directory_start, directory_end)?;
            pos = record.central.end;
            records.push(record);
        }
        if pos != directory_end {
            exn::bail!(corrupt("central directory size does not match its entries"));
        }

        let comment_start = end + END_OF_CENTRAL_DIRECTORY_SIZE;
        tracing::debug!(entries = records.len(), size = data.len(), "Parsed archive");
        Ok(Self { data, records, comment: comment_start..comment_start + comment_len })
    }

    /// Entries in central directory order.
    pub fn entries(&self) -> impl ExactSizeIterator<Item = BaseEntry<'_>> + '_ {
        self.records.iter().map(|record| BaseEntry { data: &self.data, record })
    }

    /// First entry called `name`, if any.
    pub fn get(&self, name: &str) -> Option<BaseEntry<'_>> {
        self.entries().find(|entry| entry.name() == name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The archive-level comment stored after the end record.
    pub fn comment(&self) -> &[u8] {
        &self.data[self.comment.clone()]
    }
}

impl Debug for BaseArchive {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("BaseArchive").field("entries", &self.records.len()).field("size", &self.data.len()).finish()
    }
}

/// Scan backwards for an end record whose comment length reaches exactly to EOF.
fn find_end_record(data: &[u8]) -> Option<usize> {
    let last = data.len().checked_sub(END_OF_CENTRAL_DIRECTORY_SIZE)?;
    let first = data.len().saturating_sub(MAX_END_RECORD_SEARCH);
    (first..=last).rev().find(|&pos| {
        signature_at(data, pos) == Some(END_OF_CENTRAL_DIRECTORY_SIGNATURE) && {
            let comment_len = Fields::new(&data[pos + 20..pos + 22]).u16();
            pos + END_OF_CENTRAL_DIRECTORY_SIZE + usize::from(comment_len) == data.len()
        }
    })
}

fn has_zip64_locator(data: &[u8], end: usize) -> bool {
    end.checked_sub(ZIP64_LOCATOR_SIZE)
        .and_then(|pos| signature_at(data, pos))
        .is_some_and(|signature| signature == ZIP64_LOCATOR_SIGNATURE)
}

/// Upper half of code page 437, the zip default for names without the UTF-8 flag.
#[rustfmt::skip]
const CP437_HIGH: [char; 128] = [
    'Ç', 'ü', 'é', 'â', 'ä', 'à', 'å', 'ç', 'ê', 'ë', 'è', 'ï', 'î', 'ì', 'Ä', 'Å',
    'É', 'æ', 'Æ', 'ô', 'ö', 'ò', 'û', 'ù', 'ÿ', 'Ö', 'Ü', '¢', '£', '¥', '₧', 'ƒ',
    'á', 'í', 'ó', 'ú', 'ñ', 'Ñ', 'ª', 'º', '¿', '⌐', '¬', '½', '¼', '¡', '«', '»',
    '░', '▒', '▓', '│', '┤', '╡', '╢', '╖', '╕', '╣', '║', '╗', '╝', '╜', '╛', '┐',
    '└', '┴', '┬', '├', '─', '┼', '╞', '╟', '╚', '╔', '╩', '╦', '╠', '═', '╬', '╧',
    '╨', '╤', '╥', '╙', '╘', '╒', '╓', '╫', '╪', '┘', '┌', '█', '▄', '▌', '▐', '▀',
    'α', 'ß', 'Γ', 'π', 'Σ', 'σ', 'µ', 'τ', 'Φ', 'Θ', 'Ω', 'δ', '∞', 'φ', 'ε', '∩',
    '≡', '±', '≥', '≤', '⌠', '⌡', '÷', '≈', '°', '∙', '·', '√', 'ⁿ', '²', '■', '\u{A0}',
];

fn decode_name(raw: &[u8], flags: u16) -> Result<String> {
    match String::from_utf8(raw.to_vec()) {
        Ok(name) => Ok(name),
        Err(_) if flags & FLAG_UTF8 != 0 => exn::bail!(corrupt("entry name flagged UTF-8 is not valid UTF-8")),
        // Legacy names are only decoded for matching and display; the raw
        // bytes are what gets copied. The mapping is one-to-one, so distinct
        // raw names stay distinct.
        Err(_) => Ok(raw.iter().map(|&byte| cp437(byte)).collect()),
    }
}

fn cp437(byte: u8) -> char {
    match byte.checked_sub(0x80) {
        Some(high) => CP437_HIGH[usize::from(high)],
        None => char::from(byte),
    }
}

fn parse_record(data: &[u8], start: usize, directory_start: usize, directory_end: usize) -> Result<Record> {
    let fixed = span(data, start, CENTRAL_HEADER_SIZE, directory_end)
        .ok_or_raise(|| corrupt("central directory is truncated"))?;
    let mut fields = Fields::new(fixed);
    if fields.u32() != CENTRAL_HEADER_SIGNATURE {
        exn::bail!(corrupt(format!("bad central directory signature at offset {start}")));
    }
    fields.skip(4);
    let flags = fields.u16();
    let method = fields.u16();
    let time = fields.u16();
    let date = fields.u16();
    let crc32 = fields.u32();
    let compressed_size = fields.u32();
    let uncompressed_size = fields.u32();
    let name_len = usize::from(fields.u16());
    let extra_len = usize::from(fields.u16());
    let comment_len = usize::from(fields.u16());
    let disk_start = fields.u16();
    fields.skip(6);
    let local_offset = fields.u32();

    let name_start = start + CENTRAL_HEADER_SIZE;
    let raw_name = span(data, name_start, name_len, directory_end)
        .ok_or_raise(|| corrupt("central directory entry name is truncated"))?;
    let name = decode_name(raw_name, flags)?;
    let central_end = name_start + name_len + extra_len + comment_len;
    if central_end > directory_end {
        exn::bail!(corrupt(format!("central directory entry for {name} is truncated")));
    }
    if disk_start != 0 {
        exn::bail!(ErrorKind::Unsupported(format!("entry {name} starts on another disk")));
    }
    if compressed_size == u32::MAX || uncompressed_size == u32::MAX || local_offset == u32::MAX {
        exn::bail!(ErrorKind::Unsupported(format!("entry {name} uses zip64 fields")));
    }
    let header = CentralHeader {
        flags,
        method,
        time,
        date,
        crc32,
        compressed_size,
        uncompressed_size,
        local_offset,
    };
    let (local, payload) = locate_local_record(data, &name, raw_name, &header, directory_start)?;
    Ok(Record { name, header, central: start..central_end, local, payload })
}

/// Find the local record (header, payload and optional data descriptor) of a
/// central directory entry. Local records must end before the central directory.
fn locate_local_record(
    data: &[u8],
    name: &str,
    raw_name: &[u8],
    header: &CentralHeader,
    limit: usize,
) -> Result<(Range<usize>, Range<usize>)> {
    let start = header.local_offset as usize;
    let fixed = span(data, start, LOCAL_HEADER_SIZE, limit)
        .ok_or_raise(|| corrupt(format!("local header of {name} is out of bounds")))?;
    let mut fields = Fields::new(fixed);
    if fields.u32() != LOCAL_HEADER_SIGNATURE {
        exn::bail!(corrupt(format!("bad local header signature for {name}")));
    }
    let name_len = usize::from(fields.skip(22).u16());
    let extra_len = usize::from(fields.u16());
    let local_name = span(data, start + LOCAL_HEADER_SIZE, name_len, limit)
        .ok_or_raise(|| corrupt(format!("local header name of {name} is truncated")))?;
    if local_name != raw_name {
        exn::bail!(corrupt(format!("local header name does not match central directory for {name}")));
    }

    let payload_start = start + LOCAL_HEADER_SIZE + name_len + extra_len;
    let payload_end = payload_start
        .checked_add(header.compressed_size as usize)
        .filter(|payload_end| *payload_end <= limit)
        .ok_or_raise(|| corrupt(format!("payload of {name} overruns the central directory")))?;
    let mut end = payload_end;
    if header.flags & FLAG_DATA_DESCRIPTOR != 0 {
        // The descriptor signature is optional; without it the descriptor is
        // crc32 + compressed size + uncompressed size.
        end += match signature_at(data, payload_end) {
            Some(DATA_DESCRIPTOR_SIGNATURE) => 16,
            _ => 12,
        };
        if end > limit {
            exn::bail!(corrupt(format!("data descriptor of {name} overruns the central directory")));
        }
    }
    Ok((start..end, payload_start..payload_end))
}

impl<'a> BaseEntry<'a> {
    pub fn name(&self) -> &'a str {
        &self.record.name
    }

    /// Directory entries are named with a trailing `/`.
    pub fn is_dir(&self) -> bool {
        self.record.name.ends_with('/')
    }

    pub fn is_encrypted(&self) -> bool {
        self.record.header.flags & FLAG_ENCRYPTED != 0
    }

    /// Raw compression method identifier as recorded in the central directory.
    pub fn method(&self) -> u16 {
        self.record.header.method
    }

    pub fn compression(&self) -> Result<Compression> {
        Compression::from_method(self.record.header.method).map_err(ErrorKind::compression)
    }

    /// `None` when the stored DOS date is not a real date.
    pub fn modified(&self) -> Option<PrimitiveDateTime> {
        dostime::decode(self.record.header.time, self.record.header.date)
    }

    pub fn crc32(&self) -> u32 {
        self.record.header.crc32
    }

    pub fn compressed_size(&self) -> u64 {
        u64::from(self.record.header.compressed_size)
    }

    pub fn size(&self) -> u64 {
        u64::from(self.record.header.uncompressed_size)
    }

    /// The compressed payload exactly as stored.
    pub fn raw_payload(&self) -> &'a [u8] {
        &self.data[self.record.payload.clone()]
    }

    /// Local header, payload and data descriptor, byte for byte.
    pub(crate) fn local_record(&self) -> &'a [u8] {
        &self.data[self.record.local.clone()]
    }

    /// The central directory record, byte for byte (its local header offset
    /// refers to the source archive).
    pub(crate) fn central_record(&self) -> &'a [u8] {
        &self.data[self.record.central.clone()]
    }

    /// Decompress the payload and check it against the recorded size and CRC-32.
    #[instrument(skip(self), fields(name = self.name()))]
    pub fn read(&self) -> Result<Vec<u8>> {
        if self.is_encrypted() {
            exn::bail!(ErrorKind::Unsupported(format!("entry {} is encrypted", self.name())));
        }
        let payload = self.compression()?.decompress(self.raw_payload(), self.size()).map_err(ErrorKind::compression)?;
        if payload.len() as u64 != self.size() || crc32fast::hash(&payload) != self.crc32() {
            exn::bail!(ErrorKind::ChecksumMismatch(self.name().to_string()));
        }
        Ok(payload)
    }
}

impl Debug for BaseEntry<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("BaseEntry")
            .field("name", &self.record.name)
            .field("method", &self.record.header.method)
            .field("size", &self.record.header.uncompressed_size)
            .finish()
    }
}
