//! Point-in-time image of the ordered key space.
//!
//! Layout, all integers little-endian:
//!
//! ```text
//! magic u32 | version u32 | seq u64 | entry_count u64
//! (key_len u32 | key | value_len u32 | value) * entry_count
//! crc32c u32 over everything before it
//! ```
//!
//! The same image is used for engine checkpoints (`data.snap`) and for
//! backups, so a backup dropped into an empty directory opens as a replica.

use crc::{Crc, Digest, CRC_32_ISCSI};
use std::collections::BTreeMap;
use std::io::{self, Read};
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};

const IMAGE_MAGIC: u32 = 0x54534E50; // "TSNP"
const IMAGE_VERSION: u32 = 1;
const HEADER_LEN: u64 = 4 + 4 + 8 + 8;
const TRAILER_LEN: u64 = 4;
const CHUNK_SIZE: usize = 64 * 1024;
const MAX_FIELD_LEN: u32 = 256 * 1024 * 1024;

static CRC32C: Crc<u32> = Crc::<u32>::new(&CRC_32_ISCSI);

/// Error type for snapshot images
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid image magic: 0x{0:08x}")]
    InvalidMagic(u32),
    #[error("Unsupported image version: {0}")]
    UnsupportedVersion(u32),
    #[error("Image truncated")]
    Truncated,
    #[error("Image field too large: {0} bytes")]
    FieldTooLarge(u32),
    #[error("Image keys out of order at entry {0}")]
    KeysOutOfOrder(u64),
    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: u32, actual: u32 },
}

/// A consistent copy of the key space together with the sequence number of
/// the last transaction it contains
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Image {
    pub seq: u64,
    pub entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl Image {
    pub fn new(seq: u64, entries: BTreeMap<Vec<u8>, Vec<u8>>) -> Self {
        Self { seq, entries }
    }

    /// Exact number of bytes [`Image::write_to`] produces
    pub fn encoded_len(&self) -> u64 {
        let body: u64 = self
            .entries
            .iter()
            .map(|(k, v)| 8 + k.len() as u64 + v.len() as u64)
            .sum();
        HEADER_LEN + body + TRAILER_LEN
    }

    /// Streams the encoded image to `sink`, returning the bytes written
    pub async fn write_to<W>(&self, sink: &mut W) -> Result<u64, SnapshotError>
    where
        W: AsyncWrite + Unpin,
    {
        let mut writer = ChunkWriter::new(sink);

        let mut header = Vec::with_capacity(HEADER_LEN as usize);
        header.extend_from_slice(&IMAGE_MAGIC.to_le_bytes());
        header.extend_from_slice(&IMAGE_VERSION.to_le_bytes());
        header.extend_from_slice(&self.seq.to_le_bytes());
        header.extend_from_slice(&(self.entries.len() as u64).to_le_bytes());
        writer.put(&header).await?;

        for (key, value) in &self.entries {
            writer.put(&(key.len() as u32).to_le_bytes()).await?;
            writer.put(key).await?;
            writer.put(&(value.len() as u32).to_le_bytes()).await?;
            writer.put(value).await?;
        }

        writer.finish().await
    }

    /// Decodes and verifies an image
    pub fn read_from<R: Read>(source: R) -> Result<Self, SnapshotError> {
        let mut reader = ChecksumReader {
            inner: source,
            digest: CRC32C.digest(),
        };

        let magic = reader.read_u32()?;
        if magic != IMAGE_MAGIC {
            return Err(SnapshotError::InvalidMagic(magic));
        }
        let version = reader.read_u32()?;
        if version != IMAGE_VERSION {
            return Err(SnapshotError::UnsupportedVersion(version));
        }
        let seq = reader.read_u64()?;
        let count = reader.read_u64()?;

        let mut entries = BTreeMap::new();
        let mut last_key: Option<Vec<u8>> = None;
        for index in 0..count {
            let key = reader.read_field()?;
            let value = reader.read_field()?;
            if last_key.as_ref().is_some_and(|last| *last >= key) {
                return Err(SnapshotError::KeysOutOfOrder(index));
            }
            last_key = Some(key.clone());
            entries.insert(key, value);
        }

        let actual = reader.digest.finalize();
        let mut trailer = [0u8; 4];
        read_exact(&mut reader.inner, &mut trailer)?;
        let expected = u32::from_le_bytes(trailer);
        if expected != actual {
            return Err(SnapshotError::ChecksumMismatch { expected, actual });
        }

        Ok(Self { seq, entries })
    }
}

/// Buffers output into fixed-size chunks while folding it into the checksum
struct ChunkWriter<'a, W> {
    sink: &'a mut W,
    buffer: Vec<u8>,
    digest: Digest<'static, u32>,
    written: u64,
}

impl<'a, W: AsyncWrite + Unpin> ChunkWriter<'a, W> {
    fn new(sink: &'a mut W) -> Self {
        Self {
            sink,
            buffer: Vec::with_capacity(CHUNK_SIZE),
            digest: CRC32C.digest(),
            written: 0,
        }
    }

    async fn put(&mut self, bytes: &[u8]) -> Result<(), SnapshotError> {
        self.digest.update(bytes);
        self.buffer.extend_from_slice(bytes);
        if self.buffer.len() >= CHUNK_SIZE {
            self.drain().await?;
        }
        Ok(())
    }

    async fn drain(&mut self) -> Result<(), SnapshotError> {
        self.sink.write_all(&self.buffer).await?;
        self.written += self.buffer.len() as u64;
        self.buffer.clear();
        Ok(())
    }

    async fn finish(self) -> Result<u64, SnapshotError> {
        let ChunkWriter {
            sink,
            mut buffer,
            digest,
            written,
        } = self;
        buffer.extend_from_slice(&digest.finalize().to_le_bytes());
        sink.write_all(&buffer).await?;
        sink.flush().await?;
        Ok(written + buffer.len() as u64)
    }
}

struct ChecksumReader<R> {
    inner: R,
    digest: Digest<'static, u32>,
}

impl<R: Read> ChecksumReader<R> {
    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<(), SnapshotError> {
        read_exact(&mut self.inner, buf)?;
        self.digest.update(buf);
        Ok(())
    }

    fn read_u32(&mut self) -> Result<u32, SnapshotError> {
        let mut buf = [0u8; 4];
        self.read_bytes(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn read_u64(&mut self) -> Result<u64, SnapshotError> {
        let mut buf = [0u8; 8];
        self.read_bytes(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    fn read_field(&mut self) -> Result<Vec<u8>, SnapshotError> {
        let len = self.read_u32()?;
        if len > MAX_FIELD_LEN {
            return Err(SnapshotError::FieldTooLarge(len));
        }
        let mut buf = vec![0u8; len as usize];
        self.read_bytes(&mut buf)?;
        Ok(buf)
    }
}

fn read_exact<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<(), SnapshotError> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => SnapshotError::Truncated,
        _ => SnapshotError::Io(e),
    })
}
