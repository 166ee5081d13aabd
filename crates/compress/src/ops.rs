//! Entry payload encoding and decoding.

use crate::Compression;
use crate::error::{ErrorKind, Result};
use bzip2::{Compression as BzCompression, read::BzDecoder, write::BzEncoder};
use exn::ResultExt;
use flate2::{Compression as DeflateLevel, read::DeflateDecoder, write::DeflateEncoder};
use std::io::{Read, Write};
use tracing::instrument;
#[cfg(feature = "xz")]
use xz2::{read::XzDecoder, write::XzEncoder};
#[cfg(feature = "zstd")]
use zstd::stream::{read::Decoder as ZstdDecoder, write::Encoder as ZstdEncoder};

// Archives are written once and read many times, so always spend the extra
// time on the best ratio each method offers.
const BZIP2_LEVEL: BzCompression = BzCompression::best();
const DEFLATE_LEVEL: DeflateLevel = DeflateLevel::best();
#[cfg(feature = "xz")]
const XZ_LEVEL: u32 = 9;
#[cfg(feature = "zstd")]
const ZSTD_LEVEL: i32 = 22;

/// Push `input` through `encoder`, then close the stream with `finish`.
fn encode<E: Write>(mut encoder: E, input: &[u8], finish: impl FnOnce(E) -> std::io::Result<()>) -> Result<()> {
    encoder.write_all(input).or_raise(|| ErrorKind::Io)?;
    finish(encoder).or_raise(|| ErrorKind::Io)
}

impl Compression {
    /// Encode an entry payload.
    ///
    /// Deflate output is raw (no zlib or gzip framing), which is what zip
    /// readers expect behind method 8.
    ///
    /// ```
    /// use splice_compress::Compression;
    ///
    /// let class = b"\xCA\xFE\xBA\xBE".repeat(64);
    /// let compressed = Compression::Deflate.compress(&class).unwrap();
    /// assert!(compressed.len() < class.len());
    /// ```
    #[instrument(skip(input), fields(method = %self, input_size = input.len(), output_size))]
    pub fn compress(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(input.len() / 2);
        match self {
            Compression::Stored => output.extend_from_slice(input),
            Compression::Deflate => encode(DeflateEncoder::new(&mut output, DEFLATE_LEVEL), input, |e| e.finish().map(drop))?,
            Compression::Bzip2 => encode(BzEncoder::new(&mut output, BZIP2_LEVEL), input, |e| e.finish().map(drop))?,
            #[cfg(feature = "xz")]
            Compression::Xz => encode(XzEncoder::new(&mut output, XZ_LEVEL), input, |e| e.finish().map(drop))?,
            #[cfg(feature = "zstd")]
            Compression::Zstd => {
                let encoder = ZstdEncoder::new(&mut output, ZSTD_LEVEL).or_raise(|| ErrorKind::Encoder)?;
                encode(encoder, input, |e| e.finish().map(drop))?
            },
        }
        tracing::Span::current().record("output_size", output.len());
        Ok(output)
    }

    /// Decode an entry payload whose header claims `size` uncompressed bytes.
    ///
    /// At most `size + 1` bytes are produced, so a header that understates
    /// the real size cannot make the decoder inflate without bound; comparing
    /// the result against `size` is left to the caller.
    ///
    /// ```
    /// use splice_compress::Compression;
    ///
    /// let original = b"(ns clojure.core)";
    /// let compressed = Compression::Bzip2.compress(original).unwrap();
    /// let decompressed = Compression::Bzip2.decompress(&compressed, original.len() as u64).unwrap();
    /// assert_eq!(decompressed, original);
    /// ```
    #[instrument(skip(input), fields(method = %self, input_size = input.len(), output_size))]
    pub fn decompress(&self, input: &[u8], size: u64) -> Result<Vec<u8>> {
        let limit = size.saturating_add(1);
        // The capacity is only a hint; never trust a header for a huge allocation.
        let mut output = Vec::with_capacity(usize::try_from(size).unwrap_or(0).min(1 << 24));
        let decoder: Box<dyn Read + '_> = match self {
            Compression::Stored => Box::new(input),
            Compression::Deflate => Box::new(DeflateDecoder::new(input)),
            Compression::Bzip2 => Box::new(BzDecoder::new(input)),
            #[cfg(feature = "xz")]
            Compression::Xz => Box::new(XzDecoder::new(input)),
            #[cfg(feature = "zstd")]
            Compression::Zstd => Box::new(ZstdDecoder::new(input).or_raise(|| ErrorKind::Encoder)?),
        };
        decoder.take(limit).read_to_end(&mut output).or_raise(|| ErrorKind::InvalidData)?;
        tracing::Span::current().record("output_size", output.len());
        Ok(output)
    }
}
