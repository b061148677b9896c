use std::path::Path;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::block::{Block, BlockLayout};
use super::error::{RecordError, RecordResult};
use super::record::{BlockId, GameRecord, RecordLocation};
use crate::file::SlotFile;

/// Storage statistics reported after a build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageStats {
    pub record_size: usize,
    pub num_records: usize,
    pub records_per_block: usize,
    pub num_blocks: usize,
}

/// Fixed-size blocks of game records in one file
///
/// Block `i` lives at byte offset `i * page_size`; there is no offset table.
pub struct BlockStore {
    file: SlotFile,
    layout: BlockLayout,
    num_records: usize,
}

impl BlockStore {
    /// Create a new, empty block store (truncating any existing file)
    pub fn create<P: AsRef<Path>>(path: P, page_size: usize) -> RecordResult<Self> {
        let layout = BlockLayout::new(page_size)?;
        let file = SlotFile::create(path, layout.page_size())?;

        Ok(Self {
            file,
            layout,
            num_records: 0,
        })
    }

    /// Open an existing block store
    pub fn open<P: AsRef<Path>>(path: P, page_size: usize) -> RecordResult<Self> {
        let layout = BlockLayout::new(page_size)?;
        let mut file = SlotFile::open(path, layout.page_size())?;

        // Recount live records from the page headers
        let mut page = vec![0u8; layout.page_size()];
        let mut num_records = 0;
        for block_id in 0..file.slot_count() {
            file.read_slot(block_id, &mut page)?;
            let record_count = Block::peek_record_count(&page);
            if record_count < 0 || record_count as usize > layout.capacity() {
                return Err(RecordError::InvalidBlockHeader {
                    block_id,
                    record_count,
                    capacity: layout.capacity(),
                });
            }
            num_records += record_count as usize;
        }

        debug!(
            "opened block store {} ({} blocks, {} records)",
            file.path().display(),
            file.slot_count(),
            num_records
        );

        Ok(Self {
            file,
            layout,
            num_records,
        })
    }

    /// Create a store and write `records` into it in one step
    pub fn build<P: AsRef<Path>>(
        path: P,
        page_size: usize,
        records: &[GameRecord],
    ) -> RecordResult<Self> {
        let mut store = Self::create(path, page_size)?;
        store.append_all(records)?;
        store.sync()?;
        Ok(store)
    }

    /// Partition `records` into blocks and write them after the existing ones
    ///
    /// The last block is zero-padded. Returns the total number of blocks.
    pub fn append_all(&mut self, records: &[GameRecord]) -> RecordResult<usize> {
        let first_block = self.file.slot_count();

        for chunk in records.chunks(self.layout.capacity()) {
            let block = Block::new(chunk.to_vec());
            let page = block.serialize(&self.layout)?;
            self.file.append_slot(&page)?;
        }

        self.num_records += records.len();

        info!(
            "wrote {} records into blocks {}..{} of {}",
            records.len(),
            first_block,
            self.file.slot_count(),
            self.file.path().display()
        );

        Ok(self.num_blocks())
    }

    /// Read one block by index
    pub fn read_block(&mut self, block_id: BlockId) -> RecordResult<Block> {
        let mut page = vec![0u8; self.layout.page_size()];
        self.file.read_slot(block_id, &mut page)?;
        Block::deserialize(&page, &self.layout, block_id)
    }

    /// Read a single record by location
    pub fn get(&mut self, location: RecordLocation) -> RecordResult<GameRecord> {
        let block = self.read_block(location.block_id)?;
        block
            .get(location.slot_id)
            .cloned()
            .ok_or(RecordError::InvalidSlot(location.block_id, location.slot_id))
    }

    /// Scan every live record in block order
    pub fn scan(&mut self) -> RecordResult<Vec<(RecordLocation, GameRecord)>> {
        let mut results = Vec::with_capacity(self.num_records);

        for block_id in 0..self.num_blocks() {
            let block = self.read_block(block_id)?;
            for (slot_id, record) in block.into_records().into_iter().enumerate() {
                results.push((RecordLocation::new(block_id, slot_id), record));
            }
        }

        Ok(results)
    }

    pub fn stats(&self) -> StorageStats {
        StorageStats {
            record_size: GameRecord::SIZE,
            num_records: self.num_records,
            records_per_block: self.layout.capacity(),
            num_blocks: self.num_blocks(),
        }
    }

    pub fn num_blocks(&self) -> usize {
        self.file.slot_count()
    }

    pub fn num_records(&self) -> usize {
        self.num_records
    }

    pub fn layout(&self) -> &BlockLayout {
        &self.layout
    }

    pub fn sync(&mut self) -> RecordResult<()> {
        self.file.sync()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::FileError;
    use tempfile::TempDir;

    fn record(i: usize) -> GameRecord {
        GameRecord {
            game_date_est: format!("{:02}/01/2021", i % 28 + 1),
            team_id_home: 1610612700 + i as i32,
            pts_home: 90 + (i % 40) as i32,
            fg_pct_home: (i % 100) as f32 / 100.0,
            ft_pct_home: 0.75,
            fg3_pct_home: (i % 50) as f32 / 100.0,
            ast_home: 20,
            reb_home: 45,
            home_team_wins: i % 2 == 0,
        }
    }

    fn setup_test_env() -> TempDir {
        tempfile::tempdir().unwrap()
    }

    #[test]
    fn test_append_all_counts_blocks() {
        let temp_dir = setup_test_env();
        let records: Vec<_> = (0..20).map(record).collect();

        let mut store = BlockStore::create(temp_dir.path().join("data.db"), 400).unwrap();
        let num_blocks = store.append_all(&records).unwrap();

        assert_eq!(num_blocks, 3);
        assert_eq!(
            store.stats(),
            StorageStats {
                record_size: 44,
                num_records: 20,
                records_per_block: 9,
                num_blocks: 3,
            }
        );
    }

    #[test]
    fn test_round_trip_preserves_order() {
        let temp_dir = setup_test_env();
        let records: Vec<_> = (0..23).map(record).collect();

        let mut store = BlockStore::build(temp_dir.path().join("data.db"), 100, &records).unwrap();

        let mut concatenated = Vec::new();
        for block_id in 0..store.num_blocks() {
            concatenated.extend(store.read_block(block_id).unwrap().into_records());
        }
        assert_eq!(concatenated, records);

        // Last block is partial
        let last = store.read_block(store.num_blocks() - 1).unwrap();
        assert_eq!(last.record_count(), 1);
    }

    #[test]
    fn test_block_offsets_are_direct_multiples() {
        let temp_dir = setup_test_env();
        let path = temp_dir.path().join("data.db");
        let records: Vec<_> = (0..5).map(record).collect();
        BlockStore::build(&path, 100, &records).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), 3 * 100);
        assert_eq!(Block::peek_record_count(&bytes[0..]), 2);
        assert_eq!(Block::peek_record_count(&bytes[100..]), 2);
        assert_eq!(Block::peek_record_count(&bytes[200..]), 1);
    }

    #[test]
    fn test_rebuild_is_byte_identical() {
        let temp_dir = setup_test_env();
        let path = temp_dir.path().join("data.db");
        let records: Vec<_> = (0..50).map(record).collect();

        BlockStore::build(&path, 400, &records).unwrap();
        let first = std::fs::read(&path).unwrap();

        BlockStore::build(&path, 400, &records).unwrap();
        let second = std::fs::read(&path).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_read_out_of_range_block() {
        let temp_dir = setup_test_env();
        let records: Vec<_> = (0..5).map(record).collect();
        let mut store = BlockStore::build(temp_dir.path().join("data.db"), 400, &records).unwrap();

        let result = store.read_block(1);
        assert!(matches!(
            result,
            Err(RecordError::File(FileError::SlotOutOfRange { slot: 1, .. }))
        ));
    }

    #[test]
    fn test_get_and_scan() {
        let temp_dir = setup_test_env();
        let records: Vec<_> = (0..12).map(record).collect();
        let mut store = BlockStore::build(temp_dir.path().join("data.db"), 100, &records).unwrap();

        assert_eq!(store.get(RecordLocation::new(2, 1)).unwrap(), records[5]);
        assert!(matches!(
            store.get(RecordLocation::new(0, 2)),
            Err(RecordError::InvalidSlot(0, 2))
        ));

        let scanned = store.scan().unwrap();
        assert_eq!(scanned.len(), 12);
        for (i, (location, rec)) in scanned.iter().enumerate() {
            assert_eq!(*location, RecordLocation::new(i / 2, i % 2));
            assert_eq!(rec, &records[i]);
        }
    }

    #[test]
    fn test_reopen_recounts_records() {
        let temp_dir = setup_test_env();
        let path = temp_dir.path().join("data.db");
        let records: Vec<_> = (0..31).map(record).collect();
        BlockStore::build(&path, 400, &records).unwrap();

        let mut store = BlockStore::open(&path, 400).unwrap();
        assert_eq!(store.num_records(), 31);
        assert_eq!(store.num_blocks(), 4);
        assert_eq!(store.read_block(3).unwrap().records(), &records[27..]);
    }

    #[test]
    fn test_empty_store() {
        let temp_dir = setup_test_env();
        let mut store = BlockStore::build(temp_dir.path().join("data.db"), 400, &[]).unwrap();
        assert_eq!(store.num_blocks(), 0);
        assert!(store.scan().unwrap().is_empty());
    }
}
