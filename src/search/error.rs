use thiserror::Error;

use crate::btree::BPlusTreeError;
use crate::record::{RecordError, RecordLocation};

/// Errors that can occur while answering a range query
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Record error: {0}")]
    Record(#[from] RecordError),

    #[error("Index error: {0}")]
    Index(#[from] BPlusTreeError),

    #[error("Invalid range bound: {0} (NaN cannot be ordered)")]
    InvalidBound(f32),

    #[error("Index references missing record at {0}")]
    DanglingLocation(RecordLocation),
}

pub type QueryResult<T> = Result<T, SearchError>;
