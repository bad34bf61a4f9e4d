use std::io;

/// Errors produced by the record log.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// I/O error during log or file operations.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// CRC integrity check failed for an entry.
    #[error("CRC integrity check failed at offset {offset}: expected {expected:#010x}, got {actual:#010x}")]
    CrcMismatch {
        offset: u64,
        expected: u32,
        actual: u32,
    },

    /// Entry has an invalid length field, or the offset does not start one.
    #[error("invalid log entry length {length} at offset {offset}")]
    InvalidEntryLength { offset: u64, length: u32 },

    /// Record is too large to frame.
    #[error("record of {0} bytes exceeds the 4 GiB frame limit")]
    RecordTooLarge(usize),

    /// A failed append could not be rolled back; the log must be reopened.
    #[error("log is in an unknown state after a failed append")]
    Broken,

    /// The writer lock was poisoned by a panicking thread.
    #[error("log writer lock poisoned")]
    Poisoned,
}

/// Convenience alias used throughout the log crate.
pub type Result<T> = std::result::Result<T, LogError>;
