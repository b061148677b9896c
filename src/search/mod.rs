//! Range queries over the block store
//!
//! Two strategies answer the same inclusive `[lower, upper]` query on
//! `fg_pct_home`: a linear scan of every block, and a descent through the
//! B+ tree followed by one read per distinct referenced block. Both report
//! how much I/O they did so the two can be compared.

mod brute_force;
mod error;
mod index_search;

pub use brute_force::BruteForceSearch;
pub use error::{QueryResult, SearchError};
pub use index_search::{IndexSearch, build_index};

use std::time::{Duration, Instant};

use crate::btree::BPlusKey;
use crate::record::{GameRecord, RecordLocation};

/// Outcome of one range query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResult {
    /// Matching records, in the order the strategy produced them
    pub records: Vec<GameRecord>,
    /// Location of each entry in `records`
    pub locations: Vec<RecordLocation>,
    /// Index nodes read (0 for a scan)
    pub index_nodes_visited: usize,
    /// Data blocks read
    pub blocks_accessed: usize,
    /// Mean FG3_PCT_home of the matches, 0.0 when nothing matched
    pub average_fg3_pct_home: f64,
    pub elapsed: Duration,
}

impl SearchResult {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether both results matched exactly the same record locations
    pub fn same_matches(&self, other: &SearchResult) -> bool {
        let mut ours = self.locations.clone();
        let mut theirs = other.locations.clone();
        ours.sort_unstable();
        theirs.sort_unstable();
        ours == theirs
    }
}

/// A strategy for answering inclusive range queries on `fg_pct_home`
pub trait RangeSearch {
    /// Short label used in reports
    fn name(&self) -> &'static str;

    /// Every record whose key lies in `[lower, upper]`
    ///
    /// `lower > upper` is an empty result, not an error.
    fn search(&mut self, lower: BPlusKey, upper: BPlusKey) -> QueryResult<SearchResult>;
}

/// Mean of `fg3_pct_home`, accumulated in f64
pub fn average_fg3_pct_home(records: &[GameRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    let sum: f64 = records.iter().map(|r| r.fg3_pct_home as f64).sum();
    sum / records.len() as f64
}

fn check_bounds(lower: BPlusKey, upper: BPlusKey) -> QueryResult<()> {
    for bound in [lower, upper] {
        if bound.is_nan() {
            return Err(SearchError::InvalidBound(bound));
        }
    }
    Ok(())
}

/// Assemble a result from collected matches; `started` marks the query start
fn finish(
    matches: Vec<(RecordLocation, GameRecord)>,
    index_nodes_visited: usize,
    blocks_accessed: usize,
    started: Instant,
) -> SearchResult {
    let (locations, records): (Vec<_>, Vec<_>) = matches.into_iter().unzip();
    let average_fg3_pct_home = average_fg3_pct_home(&records);

    SearchResult {
        records,
        locations,
        index_nodes_visited,
        blocks_accessed,
        average_fg3_pct_home,
        elapsed: started.elapsed(),
    }
}
