//! Tab-separated games file reader

use std::path::Path;
use std::str::FromStr;

use csv::{ReaderBuilder, StringRecord};
use log::{debug, info};

use super::error::{RecordError, RecordResult};
use super::record::GameRecord;

/// Number of tab-separated fields in a data line
pub const FIELD_COUNT: usize = 9;

/// Records read from an input file plus the number of lines dropped
#[derive(Debug, Default)]
pub struct LoadedRecords {
    pub records: Vec<GameRecord>,
    pub skipped: usize,
}

/// Load every well-formed record from a tab-separated file
///
/// The first line is a header. Lines that fail to parse are skipped and
/// counted; only I/O failures abort the load.
pub fn load_records<P: AsRef<Path>>(path: P) -> RecordResult<LoadedRecords> {
    let path = path.as_ref();

    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true) // Short lines are reported per line, not as a reader error
        .quoting(false)
        .from_path(path)?;

    if reader.headers()?.is_empty() {
        return Err(RecordError::EmptyInput(path.display().to_string()));
    }

    let mut loaded = LoadedRecords::default();

    for result in reader.records() {
        let row = match result {
            Ok(row) => row,
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                debug!("skipping unreadable line: {}", e);
                loaded.skipped += 1;
                continue;
            }
        };

        let line = row.position().map(|p| p.line()).unwrap_or(0);
        match parse_record(line, &row) {
            Ok(record) => loaded.records.push(record),
            Err(e) => {
                debug!("skipping line: {}", e);
                loaded.skipped += 1;
            }
        }
    }

    info!(
        "loaded {} records from {} ({} malformed lines skipped)",
        loaded.records.len(),
        path.display(),
        loaded.skipped
    );

    Ok(loaded)
}

/// Parse one data line
///
/// Field order: GAME_DATE_EST, TEAM_ID_home, PTS_home, FG_PCT_home,
/// FT_PCT_home, FG3_PCT_home, AST_home, REB_home, HOME_TEAM_WINS.
pub fn parse_record(line: u64, row: &StringRecord) -> RecordResult<GameRecord> {
    if row.len() < FIELD_COUNT {
        return Err(RecordError::Parse {
            line,
            reason: format!("expected {} fields, got {}", FIELD_COUNT, row.len()),
        });
    }

    let field = |idx: usize| row.get(idx).unwrap_or("").trim();

    let game_date_est = field(0);
    if game_date_est.is_empty() || game_date_est.len() > GameRecord::DATE_LEN {
        return Err(RecordError::Parse {
            line,
            reason: format!("invalid date '{}'", game_date_est),
        });
    }

    let home_team_wins = match field(8) {
        "0" => false,
        "1" => true,
        other => {
            return Err(RecordError::Parse {
                line,
                reason: format!("HOME_TEAM_WINS must be 0 or 1, got '{}'", other),
            });
        }
    };

    let fg_pct_home: f32 = parse_field(line, "FG_PCT_home", field(3))?;
    if fg_pct_home.is_nan() {
        return Err(RecordError::Parse {
            line,
            reason: "FG_PCT_home is NaN".to_string(),
        });
    }

    Ok(GameRecord {
        game_date_est: game_date_est.to_string(),
        team_id_home: parse_field(line, "TEAM_ID_home", field(1))?,
        pts_home: parse_field(line, "PTS_home", field(2))?,
        fg_pct_home,
        ft_pct_home: parse_field(line, "FT_PCT_home", field(4))?,
        fg3_pct_home: parse_field(line, "FG3_PCT_home", field(5))?,
        ast_home: parse_field(line, "AST_home", field(6))?,
        reb_home: parse_field(line, "REB_home", field(7))?,
        home_team_wins,
    })
}

fn parse_field<T: FromStr>(line: u64, name: &str, value: &str) -> RecordResult<T> {
    value.parse::<T>().map_err(|_| RecordError::Parse {
        line,
        reason: format!("invalid {} '{}'", name, value),
    })
}
