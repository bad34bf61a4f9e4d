use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{LogError, Result};

/// Flush/sync strategy for the log.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    /// `fsync` after every write (safest, highest latency).
    EveryWrite,
    /// Rely on OS page-cache buffering (fastest, least durable).
    #[default]
    OsDefault,
}

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

/// Internal mutable state for the log writer.
struct LogWriter {
    file: File,
    /// Current write offset in the log file. Always equal to the file length
    /// between appends.
    offset: u64,
    /// Set when a failed append could not be rolled back; every later append
    /// is refused until the log is reopened.
    broken: bool,
    #[cfg(test)]
    fail_after: Option<usize>,
}

impl LogWriter {
    fn new(file: File, offset: u64) -> Self {
        Self {
            file,
            offset,
            broken: false,
            #[cfg(test)]
            fail_after: None,
        }
    }
}

/// Crash-recoverable append-only log of `R` records.
///
/// On-disk format, repeated:
/// ```text
/// [4 bytes: entry length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (bincode-serialized R)]
/// ```
///
/// Every append returns the byte offset of its entry, which callers keep in
/// their in-memory indexes and later pass to [`RecordLog::read_at`].
pub struct RecordLog<R> {
    path: PathBuf,
    writer: Mutex<LogWriter>,
    sync_mode: SyncMode,
    _record: PhantomData<fn() -> R>,
}

impl<R: Serialize + DeserializeOwned> RecordLog<R> {
    /// Open (or create) a log file at the given path.
    pub fn open(path: &Path, sync_mode: SyncMode) -> Result<Self> {
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
            writer: Mutex::new(LogWriter::new(file, offset)),
            sync_mode,
            _record: PhantomData,
        })
    }

    /// Append a single record. Returns the byte offset of the entry.
    ///
    /// Either the whole frame is on disk when this returns `Ok`, or the file
    /// is cut back to its previous length before the error is returned.
    pub fn append(&self, record: &R) -> Result<u64> {
        let payload = encode(record)?;
        let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
        write_frame(&mut frame, &payload)?;

        let mut w = self.lock()?;
        if w.broken {
            return Err(LogError::Broken);
        }
        let entry_offset = w.offset;
        if let Err(e) = self.write_entry(&mut w, &frame) {
            warn!(offset = entry_offset, error = %e, "log append failed; rolling back");
            if let Err(rollback) = w.file.set_len(entry_offset) {
                warn!(offset = entry_offset, error = %rollback, "log rollback failed");
                w.broken = true;
            }
            return Err(e.into());
        }
        w.offset += frame.len() as u64;

        debug!(offset = entry_offset, len = payload.len(), "log append");
        Ok(entry_offset)
    }

    /// Read the record whose entry starts at `offset`.
    ///
    /// Unlike recovery, a CRC failure here is an error: the caller asked for
    /// a specific record and must not receive a silently skipped one.
    pub fn read_at(&self, offset: u64) -> Result<R> {
        let mut file = File::open(&self.path)?;
        let file_len = file.metadata()?.len();
        if offset + HEADER_SIZE as u64 > file_len {
            return Err(LogError::InvalidEntryLength { offset, length: 0 });
        }
        file.seek(SeekFrom::Start(offset))?;

        let mut header = [0u8; HEADER_SIZE];
        file.read_exact(&mut header)?;
        let (length, expected_crc) = parse_header(&header);
        if length == 0 || offset + (HEADER_SIZE as u64) + u64::from(length) > file_len {
            return Err(LogError::InvalidEntryLength { offset, length });
        }

        let mut payload = vec![0u8; length as usize];
        file.read_exact(&mut payload)?;
        let actual = crc32fast::hash(&payload);
        if actual != expected_crc {
            return Err(LogError::CrcMismatch {
                offset,
                expected: expected_crc,
                actual,
            });
        }
        decode(&payload)
    }

    /// Recover all valid records, paired with their offsets, in log order.
    ///
    /// Entries that fail CRC validation or deserialization are logged and
    /// skipped. A torn entry at the tail (from a crash mid-append) ends
    /// recovery and is cut off so that later appends land on a clean frame
    /// boundary.
    pub fn recover(&self) -> Result<Vec<(u64, R)>> {
        let mut w = self.lock()?;

        let mut file = BufReader::new(File::open(&self.path)?);
        let file_len = file.get_ref().metadata()?.len();
        let mut records = Vec::new();
        let mut offset: u64 = 0;

        while offset + HEADER_SIZE as u64 <= file_len {
            file.seek(SeekFrom::Start(offset))?;

            let mut header = [0u8; HEADER_SIZE];
            match file.read_exact(&mut header) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            }
            let (length, expected_crc) = parse_header(&header);

            if length == 0 || (offset + HEADER_SIZE as u64 + u64::from(length)) > file_len {
                warn!(offset, length, file_len, "invalid log entry length; stopping recovery");
                break;
            }

            let mut payload = vec![0u8; length as usize];
            match file.read_exact(&mut payload) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    warn!(offset, "truncated log entry; stopping recovery");
                    break;
                }
                Err(e) => return Err(e.into()),
            }

            let actual_crc = crc32fast::hash(&payload);
            if actual_crc != expected_crc {
                warn!(
                    offset,
                    expected = expected_crc,
                    actual = actual_crc,
                    "CRC mismatch; skipping entry"
                );
            } else {
                match decode(&payload) {
                    Ok(record) => records.push((offset, record)),
                    Err(e) => warn!(offset, error = %e, "failed to deserialize log entry; skipping"),
                }
            }

            offset += HEADER_SIZE as u64 + u64::from(length);
        }

        if offset < file_len {
            warn!(valid_end = offset, file_len, "discarding torn log tail");
            let file = OpenOptions::new().write(true).open(&self.path)?;
            file.set_len(offset)?;
            file.sync_all()?;
            w.offset = offset;
        }

        debug!(recovered = records.len(), "log recovery complete");
        Ok(records)
    }

    /// Atomically replace the whole log with `records`.
    ///
    /// The new log is written beside the current one, synced, and renamed
    /// over it. Returns the new offset of each record, in input order.
    pub fn rewrite<'a, I>(&self, records: I) -> Result<Vec<u64>>
    where
        I: IntoIterator<Item = &'a R>,
        R: 'a,
    {
        let mut w = self.lock()?;
        let tmp_path = self.path.with_extension("compact");

        let mut offsets = Vec::new();
        let mut offset = 0u64;
        {
            let mut tmp = BufWriter::new(File::create(&tmp_path)?);
            for record in records {
                let payload = encode(record)?;
                write_frame(&mut tmp, &payload)?;
                offsets.push(offset);
                offset += (HEADER_SIZE + payload.len()) as u64;
            }
            tmp.flush()?;
            tmp.get_ref().sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;

        *w = LogWriter::new(OpenOptions::new().append(true).open(&self.path)?, offset);

        debug!(records = offsets.len(), bytes = offset, "log rewritten");
        Ok(offsets)
    }

    /// Current write offset (equal to the log's length in bytes).
    pub fn offset(&self) -> Result<u64> {
        Ok(self.lock()?.offset)
    }

    /// Path to the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<MutexGuard<'_, LogWriter>> {
        self.writer.lock().map_err(|_| LogError::Poisoned)
    }

    fn write_entry(&self, w: &mut LogWriter, frame: &[u8]) -> io::Result<()> {
        #[cfg(test)]
        if let Some(written) = w.fail_after.take() {
            w.file.write_all(&frame[..written.min(frame.len())])?;
            return Err(io::Error::other("injected write failure"));
        }
        w.file.write_all(frame)?;
        if self.sync_mode == SyncMode::EveryWrite {
            w.file.sync_data()?;
        }
        Ok(())
    }

    /// Make the next append fail after `written` bytes of its frame reach
    /// the file.
    #[cfg(test)]
    fn fail_next_append(&self, written: usize) {
        if let Ok(mut w) = self.writer.lock() {
            w.fail_after = Some(written);
        }
    }
}

fn encode<R: Serialize>(record: &R) -> Result<Vec<u8>> {
    let payload = bincode::serialize(record).map_err(|e| LogError::Serialization(e.to_string()))?;
    if payload.len() > u32::MAX as usize {
        return Err(LogError::RecordTooLarge(payload.len()));
    }
    Ok(payload)
}

fn decode<R: DeserializeOwned>(payload: &[u8]) -> Result<R> {
    bincode::deserialize(payload).map_err(|e| LogError::Serialization(e.to_string()))
}

fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> io::Result<()> {
    let length = payload.len() as u32;
    let crc = crc32fast::hash(payload);
    writer.write_all(&length.to_le_bytes())?;
    writer.write_all(&crc.to_le_bytes())?;
    writer.write_all(payload)
}

fn parse_header(header: &[u8; HEADER_SIZE]) -> (u32, u32) {
    let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
    let crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    (length, crc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    struct Entry {
        key: u32,
        body: Vec<u8>,
    }

    fn entry(key: u32) -> Entry {
        Entry {
            key,
            body: format!("body-{key}").into_bytes(),
        }
    }

    fn open(dir: &tempfile::TempDir, name: &str) -> RecordLog<Entry> {
        RecordLog::open(&dir.path().join(name), SyncMode::default()).unwrap()
    }

    fn flip_byte(path: &Path, at: u64) {
        let mut file = OpenOptions::new().write(true).read(true).open(path).unwrap();
        file.seek(SeekFrom::Start(at)).unwrap();
        let mut buf = [0u8; 1];
        file.read_exact(&mut buf).unwrap();
        buf[0] ^= 0xFF;
        file.seek(SeekFrom::Start(at)).unwrap();
        file.write_all(&buf).unwrap();
        file.sync_all().unwrap();
    }

    #[test]
    fn append_and_recover_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let log = open(&dir, "a.log");

        let off1 = log.append(&entry(1)).unwrap();
        let off2 = log.append(&entry(2)).unwrap();

        let recovered = log.recover().unwrap();
        assert_eq!(recovered, vec![(off1, entry(1)), (off2, entry(2))]);
    }

    #[test]
    fn recover_empty_log() {
        let dir = tempfile::tempdir().unwrap();
        let log = open(&dir, "empty.log");
        assert!(log.recover().unwrap().is_empty());
    }

    #[test]
    fn read_at_returns_exact_record() {
        let dir = tempfile::tempdir().unwrap();
        let log = open(&dir, "read.log");
        log.append(&entry(1)).unwrap();
        let off = log.append(&entry(2)).unwrap();
        log.append(&entry(3)).unwrap();

        assert_eq!(log.read_at(off).unwrap(), entry(2));
    }

    #[test]
    fn read_at_past_end_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let log = open(&dir, "end.log");
        log.append(&entry(1)).unwrap();
        let end = log.offset().unwrap();
        assert!(matches!(
            log.read_at(end),
            Err(LogError::InvalidEntryLength { .. })
        ));
    }

    #[test]
    fn read_at_reports_crc_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let log = open(&dir, "crc.log");
        let off = log.append(&entry(1)).unwrap();
        flip_byte(log.path(), off + HEADER_SIZE as u64);

        assert!(matches!(log.read_at(off), Err(LogError::CrcMismatch { .. })));
    }

    #[test]
    fn recovery_skips_corrupt_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.log");
        {
            let log: RecordLog<Entry> = RecordLog::open(&path, SyncMode::default()).unwrap();
            log.append(&entry(1)).unwrap();
            log.append(&entry(2)).unwrap();
        }
        flip_byte(&path, HEADER_SIZE as u64);

        let log: RecordLog<Entry> = RecordLog::open(&path, SyncMode::default()).unwrap();
        let recovered = log.recover().unwrap();
        assert_eq!(recovered.len(), 1);
        assert_eq!(recovered[0].1, entry(2));
    }

    #[test]
    fn torn_tail_is_cut_and_appends_resume_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tail.log");
        let total_len = {
            let log: RecordLog<Entry> = RecordLog::open(&path, SyncMode::default()).unwrap();
            log.append(&entry(1)).unwrap();
            log.append(&entry(2)).unwrap();
            log.offset().unwrap()
        };
        {
            let file = OpenOptions::new().write(true).open(&path).unwrap();
            file.set_len(total_len - 4).unwrap();
        }

        let log: RecordLog<Entry> = RecordLog::open(&path, SyncMode::default()).unwrap();
        let recovered = log.recover().unwrap();
        assert_eq!(recovered.len(), 1);
        assert_eq!(recovered[0].1, entry(1));

        log.append(&entry(3)).unwrap();
        let recovered = log.recover().unwrap();
        let keys: Vec<u32> = recovered.iter().map(|(_, e)| e.key).collect();
        assert_eq!(keys, vec![1, 3]);
    }

    #[test]
    fn rewrite_replaces_contents_and_returns_new_offsets() {
        let dir = tempfile::tempdir().unwrap();
        let log = open(&dir, "compact.log");
        for key in 1..=4 {
            log.append(&entry(key)).unwrap();
        }

        let keep = vec![entry(2), entry(4)];
        let offsets = log.rewrite(&keep).unwrap();
        assert_eq!(offsets.len(), 2);
        assert_eq!(offsets[0], 0);
        assert_eq!(log.read_at(offsets[1]).unwrap(), entry(4));

        let off5 = log.append(&entry(5)).unwrap();
        assert_eq!(log.read_at(off5).unwrap(), entry(5));
        let keys: Vec<u32> = log.recover().unwrap().iter().map(|(_, e)| e.key).collect();
        assert_eq!(keys, vec![2, 4, 5]);
        assert!(!dir.path().join("compact.compact").exists());
    }

    #[test]
    fn failed_append_is_rolled_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rollback.log");
        let log: RecordLog<Entry> = RecordLog::open(&path, SyncMode::default()).unwrap();
        log.append(&entry(1)).unwrap();
        let end = log.offset().unwrap();

        log.fail_next_append(5);
        assert!(matches!(log.append(&entry(2)), Err(LogError::Io(_))));
        assert_eq!(log.offset().unwrap(), end);
        assert_eq!(fs::metadata(&path).unwrap().len(), end);

        let off3 = log.append(&entry(3)).unwrap();
        assert_eq!(off3, end);
        assert_eq!(log.read_at(off3).unwrap(), entry(3));
        drop(log);

        let log: RecordLog<Entry> = RecordLog::open(&path, SyncMode::default()).unwrap();
        let keys: Vec<u32> = log.recover().unwrap().iter().map(|(_, e)| e.key).collect();
        assert_eq!(keys, vec![1, 3]);
    }

    #[test]
    fn append_failing_after_full_frame_is_rolled_back() {
        let dir = tempfile::tempdir().unwrap();
        let log: RecordLog<Entry> =
            RecordLog::open(&dir.path().join("sync-fail.log"), SyncMode::EveryWrite).unwrap();
        log.append(&entry(1)).unwrap();
        let end = log.offset().unwrap();

        log.fail_next_append(usize::MAX);
        assert!(log.append(&entry(2)).is_err());
        assert_eq!(log.offset().unwrap(), end);

        let keys: Vec<u32> = log.recover().unwrap().iter().map(|(_, e)| e.key).collect();
        assert_eq!(keys, vec![1]);
    }

    #[test]
    fn append_returns_increasing_offsets() {
        let dir = tempfile::tempdir().unwrap();
        let log = open(&dir, "offsets.log");
        let off1 = log.append(&entry(1)).unwrap();
        let off2 = log.append(&entry(2)).unwrap();
        assert_eq!(off1, 0);
        assert!(off2 > off1);
    }

    #[test]
    fn sync_every_write_mode() {
        let dir = tempfile::tempdir().unwrap();
        let log: RecordLog<Entry> =
            RecordLog::open(&dir.path().join("sync.log"), SyncMode::EveryWrite).unwrap();
        log.append(&entry(1)).unwrap();
        assert_eq!(log.recover().unwrap().len(), 1);
    }
}
