use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};

/// Flush/sync strategy for a journal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SyncMode {
    /// `fsync` after every append (safest, highest latency).
    EveryWrite,
    /// Flush to the OS page cache only.
    #[default]
    OsDefault,
}

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

struct JournalWriter {
    writer: BufWriter<File>,
    /// Current write offset in the segment file.
    offset: u64,
}

/// Append-only, crash-recoverable record journal.
///
/// On-disk format, one frame per record:
/// ```text
/// [4 bytes: payload length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (JSON-serialized record)]
/// ```
///
/// Recovery reads front to back and stops at the first frame that is
/// truncated, fails its CRC, or does not decode. Everything before it is
/// returned; everything after it is treated as a torn write.
pub struct Journal<T> {
    path: PathBuf,
    writer: Mutex<JournalWriter>,
    sync_mode: SyncMode,
    _record: PhantomData<fn() -> T>,
}

impl<T: Serialize + DeserializeOwned> Journal<T> {
    /// Open (or create) a journal file at the given path.
    pub fn open(path: &Path, sync_mode: SyncMode) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;
        let offset = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(JournalWriter {
                writer: BufWriter::new(file),
                offset,
            }),
            sync_mode,
            _record: PhantomData,
        })
    }

    /// Append one record. Returns the byte offset of its frame.
    pub fn append(&self, record: &T) -> StoreResult<u64> {
        let payload =
            serde_json::to_vec(record).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let length = u32::try_from(payload.len())
            .map_err(|_| StoreError::Serialization("journal record exceeds 4 GiB".into()))?;
        let crc = crc32fast::hash(&payload);

        let mut w = self.lock()?;
        let frame_offset = w.offset;

        w.writer.write_all(&length.to_le_bytes())?;
        w.writer.write_all(&crc.to_le_bytes())?;
        w.writer.write_all(&payload)?;
        w.writer.flush()?;
        if self.sync_mode == SyncMode::EveryWrite {
            w.writer.get_ref().sync_all()?;
        }

        w.offset += (HEADER_SIZE + payload.len()) as u64;
        debug!(offset = frame_offset, len = payload.len(), "journal append");
        Ok(frame_offset)
    }

    /// Recover all intact records, in append order.
    pub fn recover(&self) -> StoreResult<Vec<T>> {
        let _guard = self.lock()?;
        let mut bytes = Vec::new();
        BufReader::new(File::open(&self.path)?).read_to_end(&mut bytes)?;

        let mut records = Vec::new();
        let mut offset = 0usize;
        while offset < bytes.len() {
            let Some(header) = bytes.get(offset..offset + HEADER_SIZE) else {
                warn!(offset, "truncated journal header; stopping recovery");
                break;
            };
            let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
            let expected_crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

            let start = offset + HEADER_SIZE;
            let Some(payload) = bytes.get(start..start + length) else {
                warn!(offset, length, "truncated journal entry; stopping recovery");
                break;
            };

            let actual_crc = crc32fast::hash(payload);
            if actual_crc != expected_crc {
                warn!(
                    offset,
                    expected = expected_crc,
                    actual = actual_crc,
                    "journal CRC mismatch; stopping recovery"
                );
                break;
            }

            match serde_json::from_slice::<T>(payload) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(offset, error = %e, "undecodable journal entry; stopping recovery");
                    break;
                }
            }
            offset = start + length;
        }

        debug!(recovered = records.len(), "journal recovery complete");
        Ok(records)
    }

    /// Replace the journal contents with `records`.
    ///
    /// The new segment is written beside the old one and renamed over it,
    /// so a crash mid-rewrite leaves the previous journal intact.
    pub fn rewrite<'a>(&self, records: impl IntoIterator<Item = &'a T>) -> StoreResult<()>
    where
        T: 'a,
    {
        let mut w = self.lock()?;
        let tmp_path = self.path.with_extension("rewrite");
        let mut tmp = BufWriter::new(File::create(&tmp_path)?);
        let mut offset = 0u64;
        for record in records {
            let payload = serde_json::to_vec(record)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            let length = u32::try_from(payload.len())
                .map_err(|_| StoreError::Serialization("journal record exceeds 4 GiB".into()))?;
            tmp.write_all(&length.to_le_bytes())?;
            tmp.write_all(&crc32fast::hash(&payload).to_le_bytes())?;
            tmp.write_all(&payload)?;
            offset += (HEADER_SIZE + payload.len()) as u64;
        }
        tmp.flush()?;
        tmp.get_ref().sync_all()?;
        drop(tmp);

        fs::rename(&tmp_path, &self.path)?;
        let file = OpenOptions::new().read(true).append(true).open(&self.path)?;
        w.writer = BufWriter::new(file);
        w.offset = offset;
        debug!(bytes = offset, "journal rewritten");
        Ok(())
    }

    /// Current write offset.
    pub fn offset(&self) -> StoreResult<u64> {
        Ok(self.lock()?.offset)
    }

    /// Path to the journal file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, JournalWriter>> {
        self.writer
            .lock()
            .map_err(|_| StoreError::Unavailable("journal mutex poisoned".into()))
    }
}

impl<T> std::fmt::Debug for Journal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Journal").field("path", &self.path).finish()
    }
}
