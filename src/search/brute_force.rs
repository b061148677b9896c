use std::time::Instant;

use log::debug;

use crate::btree::{BPlusKey, key_in_range};
use crate::record::{BlockStore, RecordLocation};

use super::{QueryResult, RangeSearch, SearchResult, check_bounds, finish};

/// Linear scan: reads every block and tests every live record
pub struct BruteForceSearch<'a> {
    store: &'a mut BlockStore,
}

impl<'a> BruteForceSearch<'a> {
    pub fn new(store: &'a mut BlockStore) -> Self {
        Self { store }
    }
}

impl RangeSearch for BruteForceSearch<'_> {
    fn name(&self) -> &'static str {
        "brute force"
    }

    fn search(&mut self, lower: BPlusKey, upper: BPlusKey) -> QueryResult<SearchResult> {
        check_bounds(lower, upper)?;
        let started = Instant::now();

        let num_blocks = self.store.num_blocks();
        let mut matches = Vec::new();

        for block_id in 0..num_blocks {
            let block = self.store.read_block(block_id)?;
            for (slot_id, record) in block.into_records().into_iter().enumerate() {
                if key_in_range(record.key(), lower, upper) {
                    matches.push((RecordLocation::new(block_id, slot_id), record));
                }
            }
        }

        debug!(
            "brute force [{}, {}]: {} matches in {} blocks",
            lower,
            upper,
            matches.len(),
            num_blocks
        );

        Ok(finish(matches, 0, num_blocks, started))
    }
}
