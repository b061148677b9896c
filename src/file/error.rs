use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("IO error on {path} at offset {offset}: {source}")]
    IoAt {
        path: PathBuf,
        offset: u64,
        #[source]
        source: io::Error,
    },

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Slot out of range in {path}: slot={slot}, slot_count={slot_count}")]
    SlotOutOfRange {
        path: PathBuf,
        slot: usize,
        slot_count: usize,
    },

    #[error("Short read in {path} at offset {offset}: expected {expected} bytes, got {actual}")]
    ShortRead {
        path: PathBuf,
        offset: u64,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid slot size: expected {expected}, got {actual}")]
    InvalidSlotSize { expected: usize, actual: usize },

    #[error("File {path} has length {len}, not a multiple of slot size {slot_size}")]
    MisalignedFile {
        path: PathBuf,
        len: u64,
        slot_size: usize,
    },
}

pub type FileResult<T> = Result<T, FileError>;
