//! Fixed-size game records packed into fixed-size blocks

mod block;
mod block_store;
mod error;
mod loader;
mod record;

pub use block::{Block, BlockLayout};
pub use block_store::{BlockStore, StorageStats};
pub use error::{RecordError, RecordResult};
pub use loader::{FIELD_COUNT, LoadedRecords, load_records, parse_record};
pub use record::{BlockId, GameRecord, RecordLocation};

/// Default page size in bytes
pub const DEFAULT_PAGE_SIZE: usize = 400;
