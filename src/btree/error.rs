use thiserror::Error;

use super::node::{NodeKind, NodeOffset};
use crate::file::FileError;

/// Errors that can occur during B+ tree operations
#[derive(Debug, Error)]
pub enum BPlusTreeError {
    #[error("File error: {0}")]
    File(#[from] FileError),

    #[error("Invalid order: {0} (must be >= 3)")]
    InvalidOrder(usize),

    #[error("Invalid key: {0} (NaN cannot be ordered)")]
    InvalidKey(f32),

    #[error("Invalid magic number in index file header")]
    InvalidMagic,

    #[error("Unsupported index file version: {0}")]
    UnsupportedVersion(u32),

    #[error("Invalid node type {kind} at offset {offset}")]
    InvalidNodeType { offset: NodeOffset, kind: u8 },

    #[error("Unexpected {found:?} node at offset {offset}")]
    UnexpectedNodeKind { offset: NodeOffset, found: NodeKind },

    #[error("Corrupted node at offset {offset}: {reason}")]
    CorruptedNode { offset: NodeOffset, reason: String },

    #[error("Invalid tree state: {0}")]
    InvalidState(String),
}

pub type BPlusTreeResult<T> = Result<T, BPlusTreeError>;
