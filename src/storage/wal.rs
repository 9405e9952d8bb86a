use crc::{Crc, CRC_32_ISCSI};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const WAL_MAGIC: u32 = 0x57414C00; // "WAL\0"
const WAL_VERSION: u32 = 2;
const DEFAULT_SEGMENT_SIZE: u64 = 64 * 1024 * 1024; // 64MB
const FRAME_HEADER_LEN: usize = 8;
const MAX_FRAME_LEN: u32 = 256 * 1024 * 1024;

static CRC32C: Crc<u32> = Crc::<u32>::new(&CRC_32_ISCSI);

#[derive(Debug, Error)]
pub enum WalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid WAL header: {0}")]
    InvalidHeader(String),
    #[error("Invalid WAL entry: {0}")]
    InvalidEntry(String),
    #[error("Corrupted WAL entry in {0}: CRC mismatch")]
    CorruptedEntry(PathBuf),
    #[error("WAL is unusable after a failed append could not be undone")]
    Poisoned,
}

#[derive(Debug, Serialize, Deserialize)]
struct WalHeader {
    magic: u32,
    version: u32,
    created_at: i64,
}

/// A single mutation inside a committed transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WalOp {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

/// One committed transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalRecord {
    pub seq: u64,
    pub ops: Vec<WalOp>,
}

/// Outcome of a replay pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub segments: usize,
    pub records: usize,
    pub torn_tails: usize,
}

/// The segment currently receiving appends
struct Segment {
    index: u64,
    path: PathBuf,
    size: u64,
    writer: BufWriter<File>,
}

impl Segment {
    fn is_full(&self, max_size: u64) -> bool {
        self.size >= max_size
    }
}

/// Manages the Write-Ahead Log
///
/// Segments are named `segment_<index>_<uuid>.wal`; the zero-padded index
/// orders replay. Each segment starts with a JSON header line followed by
/// frames of `[len u32 LE][crc32c u32 LE][json record]`.
pub struct WriteAheadLog {
    directory: PathBuf,
    current: Option<Segment>,
    next_index: u64,
    max_segment_size: u64,
    poisoned: bool,
}

impl WriteAheadLog {
    /// Opens the WAL in the specified directory, creating it if needed
    pub fn new<P: AsRef<Path>>(directory: P) -> Result<Self, WalError> {
        let directory = directory.as_ref().to_path_buf();
        fs::create_dir_all(&directory)?;

        let next_index = list_segments(&directory)?
            .last()
            .map(|(index, _)| index + 1)
            .unwrap_or(0);

        Ok(Self {
            directory,
            current: None,
            next_index,
            max_segment_size: DEFAULT_SEGMENT_SIZE,
            poisoned: false,
        })
    }

    /// Sets the maximum size for WAL segments
    pub fn with_max_segment_size(mut self, size: u64) -> Self {
        self.max_segment_size = size;
        self
    }

    /// Appends a record, returning the number of bytes written. With `sync`
    /// the frame is fsynced before returning.
    ///
    /// A failed append leaves no trace: the partial frame is truncated away
    /// and the next append starts a fresh segment. If the truncation itself
    /// fails the log is poisoned and rejects every later append.
    pub fn append(&mut self, record: &WalRecord, sync: bool) -> Result<u64, WalError> {
        if self.poisoned {
            return Err(WalError::Poisoned);
        }
        let needs_rotation = match &self.current {
            None => true,
            Some(segment) => segment.is_full(self.max_segment_size),
        };
        if needs_rotation {
            self.rotate()?;
        }

        let payload = serde_json::to_vec(record)?;
        let len = u32::try_from(payload.len())
            .ok()
            .filter(|len| *len <= MAX_FRAME_LEN)
            .ok_or_else(|| {
                WalError::InvalidEntry(format!("record of {} bytes is too large", payload.len()))
            })?;
        let crc = CRC32C.checksum(&payload);

        let segment = self
            .current
            .as_mut()
            .ok_or_else(|| WalError::InvalidEntry("no active segment".to_string()))?;
        let start = segment.size;
        match write_frame(&mut segment.writer, len, crc, &payload, sync) {
            Ok(()) => {
                let written = (FRAME_HEADER_LEN + payload.len()) as u64;
                segment.size += written;
                Ok(written)
            }
            Err(e) => {
                self.abandon_segment(start);
                Err(e.into())
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn poison(&mut self) {
        self.poisoned = true;
    }

    /// Drops the active segment after truncating it to `keep` bytes
    fn abandon_segment(&mut self, keep: u64) {
        let Some(segment) = self.current.take() else {
            return;
        };
        // Buffered bytes belong to the failed frame
        let (file, _) = segment.writer.into_parts();
        match file.set_len(keep).and_then(|_| file.sync_all()) {
            Ok(()) => warn!(
                "Discarded failed WAL append, truncated {} to {} bytes",
                segment.path.display(),
                keep
            ),
            Err(e) => {
                error!(
                    "Could not truncate {} after a failed append: {}",
                    segment.path.display(),
                    e
                );
                self.poisoned = true;
            }
        }
    }

    /// Flushes buffered bytes and fsyncs the active segment. A failed sync
    /// may have left part of a frame on disk with committed frames queued
    /// behind it, so the log is poisoned.
    pub fn sync(&mut self) -> Result<(), WalError> {
        if self.poisoned {
            return Err(WalError::Poisoned);
        }
        if let Some(segment) = self.current.as_mut() {
            let flushed = segment
                .writer
                .flush()
                .and_then(|_| segment.writer.get_ref().sync_data());
            if let Err(e) = flushed {
                error!("WAL sync of {} failed: {}", segment.path.display(), e);
                self.poisoned = true;
                return Err(e.into());
            }
        }
        Ok(())
    }

    /// Seals the active segment and starts a new one. Returns the index of
    /// the new segment; every record appended afterwards lands at or after it.
    pub fn rotate(&mut self) -> Result<u64, WalError> {
        self.sync()?;

        let index = self.next_index;
        let filename = format!("segment_{:020}_{}.wal", index, Uuid::new_v4());
        let path = self.directory.join(filename);

        let file = OpenOptions::new().write(true).create_new(true).open(&path)?;
        let header = WalHeader {
            magic: WAL_MAGIC,
            version: WAL_VERSION,
            created_at: chrono::Utc::now().timestamp(),
        };

        let mut header_line = serde_json::to_vec(&header)?;
        header_line.push(b'\n');
        let mut writer = BufWriter::new(file);
        if let Err(e) = writer.write_all(&header_line).and_then(|_| writer.flush()) {
            drop(writer);
            // A segment without a complete header would fail replay
            let _ = fs::remove_file(&path);
            return Err(e.into());
        }

        debug!("Opened WAL segment {}", path.display());
        self.current = Some(Segment {
            index,
            path,
            size: header_line.len() as u64,
            writer,
        });
        self.next_index = index + 1;
        Ok(index)
    }

    /// Removes every segment with an index below `index`
    pub fn remove_segments_before(&mut self, index: u64) -> Result<usize, WalError> {
        let mut removed = 0;
        for (segment_index, path) in list_segments(&self.directory)? {
            if segment_index >= index {
                continue;
            }
            if self.current.as_ref().map(|s| s.index) == Some(segment_index) {
                continue;
            }
            fs::remove_file(&path)?;
            removed += 1;
        }
        if removed > 0 {
            info!("Removed {} sealed WAL segments", removed);
        }
        Ok(removed)
    }

    /// Replays every record in segment order
    pub fn replay<F>(&self, mut callback: F) -> Result<ReplayStats, WalError>
    where
        F: FnMut(WalRecord) -> Result<(), WalError>,
    {
        let mut stats = ReplayStats::default();
        for (_, path) in list_segments(&self.directory)? {
            stats.segments += 1;
            let (records, torn) = self.replay_segment(&path, &mut callback)?;
            stats.records += records;
            if torn {
                stats.torn_tails += 1;
            }
        }
        Ok(stats)
    }

    /// Replays a single segment. A frame cut short by a crash ends the
    /// segment; a complete frame with a bad checksum is corruption.
    fn replay_segment<F>(&self, path: &Path, callback: &mut F) -> Result<(usize, bool), WalError>
    where
        F: FnMut(WalRecord) -> Result<(), WalError>,
    {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let mut header_line = String::new();
        if reader.read_line(&mut header_line)? == 0 {
            warn!("Empty WAL segment {}", path.display());
            return Ok((0, true));
        }
        let header: WalHeader = serde_json::from_str(header_line.trim())
            .map_err(|e| WalError::InvalidHeader(format!("{}: {}", path.display(), e)))?;

        if header.magic != WAL_MAGIC {
            return Err(WalError::InvalidHeader("Invalid magic number".to_string()));
        }
        if header.version != WAL_VERSION {
            return Err(WalError::InvalidHeader(format!(
                "Unsupported WAL version {}",
                header.version
            )));
        }

        let mut records = 0;
        loop {
            let mut frame_header = [0u8; FRAME_HEADER_LEN];
            match read_full(&mut reader, &mut frame_header)? {
                0 => return Ok((records, false)),
                n if n < FRAME_HEADER_LEN => {
                    warn!("Torn frame header at end of {}", path.display());
                    return Ok((records, true));
                }
                _ => {}
            }

            let len = u32::from_le_bytes([
                frame_header[0],
                frame_header[1],
                frame_header[2],
                frame_header[3],
            ]);
            let expected_crc = u32::from_le_bytes([
                frame_header[4],
                frame_header[5],
                frame_header[6],
                frame_header[7],
            ]);
            if len > MAX_FRAME_LEN {
                return Err(WalError::InvalidEntry(format!(
                    "frame length {} exceeds limit in {}",
                    len,
                    path.display()
                )));
            }

            let mut payload = vec![0u8; len as usize];
            if read_full(&mut reader, &mut payload)? < payload.len() {
                warn!("Torn frame at end of {}", path.display());
                return Ok((records, true));
            }

            if CRC32C.checksum(&payload) != expected_crc {
                return Err(WalError::CorruptedEntry(path.to_path_buf()));
            }

            let record: WalRecord = serde_json::from_slice(&payload)?;
            callback(record)?;
            records += 1;
        }
    }
}

fn write_frame(
    writer: &mut BufWriter<File>,
    len: u32,
    crc: u32,
    payload: &[u8],
    sync: bool,
) -> io::Result<()> {
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&crc.to_le_bytes())?;
    writer.write_all(payload)?;
    writer.flush()?;
    if sync {
        writer.get_ref().sync_data()?;
    }
    Ok(())
}

/// Reads until `buf` is full or EOF, returning the number of bytes read
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Lists `(index, path)` of all segments in ascending index order
fn list_segments(directory: &Path) -> Result<Vec<(u64, PathBuf)>, WalError> {
    let mut segments = Vec::new();
    for entry in fs::read_dir(directory)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(index) = parse_segment_index(&name) else {
            continue;
        };
        segments.push((index, entry.path()));
    }
    segments.sort_by_key(|(index, _)| *index);
    Ok(segments)
}

fn parse_segment_index(name: &str) -> Option<u64> {
    let rest = name.strip_prefix("segment_")?.strip_suffix(".wal")?;
    let (index, _) = rest.split_once('_')?;
    index.parse().ok()
}

impl fmt::Debug for WriteAheadLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let current_segment = self
            .current
            .as_ref()
            .map(|segment| {
                format!(
                    "Segment {{ path: {:?}, size: {} bytes }}",
                    segment.path, segment.size
                )
            })
            .unwrap_or_else(|| "None".to_string());

        f.debug_struct("WriteAheadLog")
            .field("directory", &self.directory)
            .field("current_segment", &current_segment)
            .field(
                "max_segment_size",
                &format!("{} bytes", self.max_segment_size),
            )
            .finish()
    }
}
