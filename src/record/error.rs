use crate::file::FileError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("File error: {0}")]
    File(#[from] FileError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Invalid slot: block_id={0}, slot_id={1}")]
    InvalidSlot(usize, usize),

    #[error("Page size {page_size} cannot hold a single {record_size}-byte record")]
    PageTooSmall {
        page_size: usize,
        record_size: usize,
    },

    #[error("Invalid block header in block {block_id}: record_count={record_count}, capacity={capacity}")]
    InvalidBlockHeader {
        block_id: usize,
        record_count: i32,
        capacity: usize,
    },

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Parse error on line {line}: {reason}")]
    Parse { line: u64, reason: String },

    #[error("Input file is empty: {0}")]
    EmptyInput(String),
}

pub type RecordResult<T> = Result<T, RecordError>;
