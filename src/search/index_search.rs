use std::path::Path;
use std::time::Instant;

use ahash::{AHashMap, AHashSet};
use log::{debug, info};

use crate::btree::{BPlusKey, BPlusTree};
use crate::record::{Block, BlockId, BlockStore};

use super::{QueryResult, RangeSearch, SearchError, SearchResult, check_bounds, finish};

/// Index-assisted search: tree lookup, then one read per distinct block
pub struct IndexSearch<'a> {
    tree: &'a mut BPlusTree,
    store: &'a mut BlockStore,
}

impl<'a> IndexSearch<'a> {
    pub fn new(tree: &'a mut BPlusTree, store: &'a mut BlockStore) -> Self {
        Self { tree, store }
    }
}

impl RangeSearch for IndexSearch<'_> {
    fn name(&self) -> &'static str {
        "B+ tree index"
    }

    fn search(&mut self, lower: BPlusKey, upper: BPlusKey) -> QueryResult<SearchResult> {
        check_bounds(lower, upper)?;
        let started = Instant::now();

        let scan = self.tree.search(lower, upper)?;

        // Distinct blocks in first-reference order
        let mut seen = AHashSet::new();
        let block_ids: Vec<BlockId> = scan
            .locations
            .iter()
            .map(|location| location.block_id)
            .filter(|block_id| seen.insert(*block_id))
            .collect();

        let mut blocks: AHashMap<BlockId, Block> = AHashMap::with_capacity(block_ids.len());
        for &block_id in &block_ids {
            blocks.insert(block_id, self.store.read_block(block_id)?);
        }

        let mut matches = Vec::with_capacity(scan.locations.len());
        for location in scan.locations {
            let record = blocks
                .get(&location.block_id)
                .and_then(|block| block.get(location.slot_id))
                .ok_or(SearchError::DanglingLocation(location))?;
            matches.push((location, record.clone()));
        }

        debug!(
            "index search [{}, {}]: {} matches, {} nodes, {} blocks",
            lower,
            upper,
            matches.len(),
            scan.nodes_visited,
            block_ids.len()
        );

        Ok(finish(matches, scan.nodes_visited, block_ids.len(), started))
    }
}

/// Build an index file over `fg_pct_home` for every record in `store`
pub fn build_index<P: AsRef<Path>>(
    store: &mut BlockStore,
    path: P,
    order: usize,
) -> QueryResult<BPlusTree> {
    let entries = store
        .scan()?
        .into_iter()
        .map(|(location, record)| (record.key(), location));

    let tree = BPlusTree::build(path.as_ref(), order, entries)?;
    info!(
        "indexed {} records into {}",
        tree.len(),
        path.as_ref().display()
    );

    Ok(tree)
}
