use std::io::{self, Read, Write};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

/// Codec for stored revision blobs.
///
/// Opaque to the rest of the domain: documents are compressed once on
/// write and decompressed on read, nothing in between inspects the
/// bytes.
pub trait CompressionCodec: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the underlying encoder fails.
    fn compress(&self, bytes: &[u8]) -> io::Result<Vec<u8>>;

    /// # Errors
    ///
    /// Returns an error if the input is not valid for this codec.
    fn decompress(&self, bytes: &[u8]) -> io::Result<Vec<u8>>;
}

/// Gzip codec used for revision documents.
pub struct GzipCodec;

impl CompressionCodec for GzipCodec {
    fn compress(&self, bytes: &[u8]) -> io::Result<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(bytes)?;
        encoder.finish()
    }

    fn decompress(&self, bytes: &[u8]) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        GzDecoder::new(bytes).read_to_end(&mut out)?;
        Ok(out)
    }
}
