pub mod btree;
pub mod config;
pub mod file;
pub mod record;
pub mod report;
pub mod search;

pub use btree::{BPlusKey, BPlusTree, BPlusTreeError, BPlusTreeResult, DEFAULT_ORDER, RangeScan};
pub use config::{ConfigError, StoreConfig};
pub use file::{FileError, FileResult, SlotFile};
pub use record::{
    Block, BlockLayout, BlockStore, DEFAULT_PAGE_SIZE, GameRecord, RecordError, RecordLocation,
    RecordResult, StorageStats, load_records,
};
pub use search::{BruteForceSearch, IndexSearch, RangeSearch, SearchError, SearchResult};
