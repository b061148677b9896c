use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use env_logger::{Builder, Env};
use log::{error, info, warn};
use thiserror::Error;

use gamedb::config::{ConfigError, StoreConfig};
use gamedb::record::{BlockStore, RecordError, load_records};
use gamedb::report::{RunReport, SearchSummary, search_table, storage_table};
use gamedb::search::{BruteForceSearch, IndexSearch, RangeSearch, SearchError, build_index};

#[derive(Parser)]
#[command(name = "gamedb")]
#[command(version)]
#[command(about = "Block store and B+ tree range index over NBA game records", long_about = None)]
struct Args {
    /// Tab-separated games file (first line is a header)
    #[arg(short = 'd', long = "data", default_value = "games.txt")]
    data: PathBuf,

    /// Directory for the block and index files
    #[arg(short = 'o', long = "out-dir", default_value = "output")]
    out_dir: PathBuf,

    /// JSON configuration file
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Block size in bytes (overrides the config file)
    #[arg(long = "page-size")]
    page_size: Option<usize>,

    /// B+ tree order (overrides the config file)
    #[arg(long = "order")]
    order: Option<usize>,

    /// Inclusive lower bound on FG_PCT_home
    #[arg(long = "lower", default_value_t = 0.6)]
    lower: f32,

    /// Inclusive upper bound on FG_PCT_home
    #[arg(long = "upper", default_value_t = 0.9)]
    upper: f32,

    /// Print the run report as JSON instead of tables
    #[arg(long = "json", default_value_t = false)]
    json: bool,
}

#[derive(Debug, Error)]
enum AppError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Record(#[from] RecordError),

    #[error("{0}")]
    Search(#[from] SearchError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn main() -> ExitCode {
    Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn resolve_config(args: &Args) -> Result<StoreConfig, ConfigError> {
    let mut config = match &args.config {
        Some(path) => StoreConfig::load(path)?,
        None => StoreConfig::default(),
    };
    if let Some(page_size) = args.page_size {
        config.page_size = page_size;
    }
    if let Some(order) = args.order {
        config.order = order;
    }
    config.validate()?;
    Ok(config)
}

fn run(args: &Args) -> Result<(), AppError> {
    let config = resolve_config(args)?;
    let data_path = args.out_dir.join(&config.data_file);
    let index_path = args.out_dir.join(&config.index_file);

    let loaded = load_records(&args.data)?;
    if loaded.skipped > 0 {
        warn!("skipped {} malformed lines in {}", loaded.skipped, args.data.display());
    }

    let mut store = BlockStore::build(&data_path, config.page_size, &loaded.records)?;
    let stats = store.stats();
    info!("wrote {} blocks to {}", stats.num_blocks, data_path.display());

    let mut tree = build_index(&mut store, &index_path, config.order)?;

    let brute = BruteForceSearch::new(&mut store).search(args.lower, args.upper)?;

    let mut index_search = IndexSearch::new(&mut tree, &mut store);
    let index_name = index_search.name();
    let indexed = index_search.search(args.lower, args.upper)?;

    let matches_agree = indexed.same_matches(&brute);
    if !matches_agree {
        warn!(
            "index search found {} records, brute force found {}",
            indexed.len(),
            brute.len()
        );
    }

    if args.json {
        let report = RunReport {
            storage: stats,
            lower: args.lower,
            upper: args.upper,
            index_height: tree.height(),
            index_nodes: tree.node_count(),
            searches: vec![
                SearchSummary::new(index_name, &indexed),
                SearchSummary::new("brute force", &brute),
            ],
            matches_agree,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Storage");
        storage_table(&stats).printstd();
        println!();
        println!(
            "Range search on FG_PCT_home in [{}, {}] (order {}, height {})",
            args.lower,
            args.upper,
            tree.order(),
            tree.height()
        );
        search_table(&indexed, &brute).printstd();
    }

    Ok(())
}
