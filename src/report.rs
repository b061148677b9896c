//! Human-readable and JSON summaries of a build-and-query run

use prettytable::{Table, format, row};
use serde::Serialize;

use crate::record::StorageStats;
use crate::search::SearchResult;

/// Storage statistics as a two-column table
pub fn storage_table(stats: &StorageStats) -> Table {
    let mut table = new_table();
    table.add_row(row!["Size of a record (bytes)", stats.record_size]);
    table.add_row(row!["Number of records", stats.num_records]);
    table.add_row(row!["Records per block", stats.records_per_block]);
    table.add_row(row!["Number of blocks", stats.num_blocks]);
    table
}

/// Index search statistics followed by the brute-force baseline
pub fn search_table(indexed: &SearchResult, brute: &SearchResult) -> Table {
    let mut table = new_table();
    table.add_row(row!["Records found", indexed.len()]);
    table.add_row(row!["Index nodes accessed", indexed.index_nodes_visited]);
    table.add_row(row!["Data blocks accessed", indexed.blocks_accessed]);
    table.add_row(row![
        "Average FG3_PCT_home",
        format!("{:.3}", indexed.average_fg3_pct_home)
    ]);
    table.add_row(row![
        "Retrieval time (s)",
        format!("{:.6}", indexed.elapsed.as_secs_f64())
    ]);
    table.add_row(row!["Brute-force blocks accessed", brute.blocks_accessed]);
    table.add_row(row![
        "Brute-force time (s)",
        format!("{:.6}", brute.elapsed.as_secs_f64())
    ]);
    table
}

fn new_table() -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
    table.set_titles(row!["Statistic", "Value"]);
    table
}

/// Serializable view of one search
#[derive(Debug, Clone, Serialize)]
pub struct SearchSummary {
    pub strategy: String,
    pub records_found: usize,
    pub index_nodes_visited: usize,
    pub blocks_accessed: usize,
    pub average_fg3_pct_home: f64,
    pub elapsed_secs: f64,
}

impl SearchSummary {
    pub fn new(strategy: &str, result: &SearchResult) -> Self {
        Self {
            strategy: strategy.to_string(),
            records_found: result.len(),
            index_nodes_visited: result.index_nodes_visited,
            blocks_accessed: result.blocks_accessed,
            average_fg3_pct_home: result.average_fg3_pct_home,
            elapsed_secs: result.elapsed.as_secs_f64(),
        }
    }
}

/// Everything a run reports, for `--json` output
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub storage: StorageStats,
    pub lower: f32,
    pub upper: f32,
    pub index_height: usize,
    pub index_nodes: usize,
    pub searches: Vec<SearchSummary>,
    pub matches_agree: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn stats() -> StorageStats {
        StorageStats {
            record_size: 44,
            num_records: 26651,
            records_per_block: 9,
            num_blocks: 2962,
        }
    }

    fn result(nodes: usize, blocks: usize, avg: f64, micros: u64) -> SearchResult {
        SearchResult {
            index_nodes_visited: nodes,
            blocks_accessed: blocks,
            average_fg3_pct_home: avg,
            elapsed: Duration::from_micros(micros),
            ..SearchResult::default()
        }
    }

    #[test]
    fn test_storage_table() {
        let table = storage_table(&stats());
        let text = table.to_string();

        assert_eq!(table.len(), 4);
        assert!(text.contains("Records per block"));
        assert!(text.contains("26651"));
        assert!(text.contains("2962"));
    }

    #[test]
    fn test_search_table_formatting() {
        let indexed = result(12, 37, 0.361_249, 1_500);
        let brute = result(0, 2962, 0.361_249, 250_000);

        let text = search_table(&indexed, &brute).to_string();

        assert!(text.contains("0.361"));
        assert!(!text.contains("0.3612"));
        assert!(text.contains("0.001500"));
        assert!(text.contains("0.250000"));
        assert!(text.contains("2962"));
    }

    #[test]
    fn test_run_report_json() {
        let indexed = result(3, 2, 0.25, 10);
        let report = RunReport {
            storage: stats(),
            lower: 0.6,
            upper: 0.9,
            index_height: 2,
            index_nodes: 3,
            searches: vec![SearchSummary::new("B+ tree index", &indexed)],
            matches_agree: true,
        };

        let json: serde_json::Value = serde_json::to_value(&report).unwrap();
        assert_eq!(json["storage"]["records_per_block"], 9);
        assert_eq!(json["searches"][0]["blocks_accessed"], 2);
        assert_eq!(json["searches"][0]["strategy"], "B+ tree index");
        assert_eq!(json["matches_agree"], true);
    }
}
