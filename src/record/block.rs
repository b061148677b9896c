use std::fmt;

use super::error::{RecordError, RecordResult};
use super::record::{BlockId, GameRecord};
use crate::file::SlotId;

/// Geometry shared by every block of a store
///
/// A page is `[record_count: i32][record 0]..[record capacity-1][zero tail]`
/// and is exactly `page_size` bytes wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLayout {
    page_size: usize,
    capacity: usize,
}

impl BlockLayout {
    /// Size of the record count header
    pub const HEADER_SIZE: usize = 4;

    /// Calculate how many records fit in a page of the given size
    pub fn calculate_capacity(page_size: usize) -> usize {
        page_size.saturating_sub(Self::HEADER_SIZE) / GameRecord::SIZE
    }

    pub fn new(page_size: usize) -> RecordResult<Self> {
        let capacity = Self::calculate_capacity(page_size);
        // The count header must stay representable as i32
        if capacity == 0 || capacity > i32::MAX as usize {
            return Err(RecordError::PageTooSmall {
                page_size,
                record_size: GameRecord::SIZE,
            });
        }
        Ok(Self {
            page_size,
            capacity,
        })
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Records per block
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of blocks needed for `num_records` records
    pub fn blocks_for(&self, num_records: usize) -> usize {
        num_records.div_ceil(self.capacity)
    }
}

/// One page worth of records; only the live prefix is kept in memory
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    records: Vec<GameRecord>,
}

impl Block {
    pub fn new(records: Vec<GameRecord>) -> Self {
        Self { records }
    }

    /// Number of live records
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[GameRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<GameRecord> {
        self.records
    }

    /// Get the record in a live slot
    pub fn get(&self, slot_id: SlotId) -> Option<&GameRecord> {
        self.records.get(slot_id)
    }

    /// Serialize into a full page, zero-filling unused slots
    pub fn serialize(&self, layout: &BlockLayout) -> RecordResult<Vec<u8>> {
        if self.records.len() > layout.capacity() {
            return Err(RecordError::InvalidRecord(format!(
                "{} records exceed block capacity {}",
                self.records.len(),
                layout.capacity()
            )));
        }

        let mut buf = vec![0u8; layout.page_size()];
        let count = self.records.len() as i32;
        buf[..BlockLayout::HEADER_SIZE].copy_from_slice(&count.to_le_bytes());

        for (slot_id, record) in self.records.iter().enumerate() {
            let start = BlockLayout::HEADER_SIZE + slot_id * GameRecord::SIZE;
            buf[start..start + GameRecord::SIZE].copy_from_slice(&record.serialize()?);
        }

        Ok(buf)
    }

    /// Deserialize a page, decoding only the first `record_count` slots
    pub fn deserialize(data: &[u8], layout: &BlockLayout, block_id: BlockId) -> RecordResult<Self> {
        if data.len() != layout.page_size() {
            return Err(RecordError::Deserialization(format!(
                "Invalid page size: expected {}, got {} bytes",
                layout.page_size(),
                data.len()
            )));
        }

        let record_count = i32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        if record_count < 0 || record_count as usize > layout.capacity() {
            return Err(RecordError::InvalidBlockHeader {
                block_id,
                record_count,
                capacity: layout.capacity(),
            });
        }

        let records = data[BlockLayout::HEADER_SIZE..]
            .chunks_exact(GameRecord::SIZE)
            .take(record_count as usize)
            .map(GameRecord::deserialize)
            .collect::<RecordResult<Vec<_>>>()?;

        Ok(Self { records })
    }

    /// Read only the record count from a serialized page
    pub fn peek_record_count(data: &[u8]) -> i32 {
        i32::from_le_bytes([data[0], data[1], data[2], data[3]])
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Block contains {} records:", self.records.len())?;
        for (i, record) in self.records.iter().enumerate() {
            writeln!(f, "Record {}:", i + 1)?;
            writeln!(f, "{}", record)?;
            writeln!(f)?;
        }
        Ok(())
    }
}
