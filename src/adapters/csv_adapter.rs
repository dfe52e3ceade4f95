//! CSV file data adapter.
//!
//! Columns are located by header name. Rows whose timestamp or OHLCV fields
//! cannot be parsed are dropped, then bars are sorted and deduplicated on
//! timestamp (last row wins).
//!
//! Timestamps carrying a UTC offset are all converted to the offset of the
//! first such row, so a file mixing offsets still orders by instant.

use crate::domain::error::EmacrossError;
use crate::domain::ohlcv::{OhlcvBar, Timestamp};
use crate::ports::data_port::DataPort;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

const TIME_COLUMNS: [&str; 4] = ["datetime", "date", "timestamp", "time"];
const PRICE_COLUMNS: [&str; 5] = ["open", "high", "low", "close", "volume"];

/// Reads `<base>/<ticker>.csv`, or one fixed file for every ticker.
pub struct CsvAdapter {
    base_path: PathBuf,
    file: Option<PathBuf>,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self {
            base_path,
            file: None,
        }
    }

    pub fn from_file(path: PathBuf) -> Self {
        let base_path = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self {
            base_path,
            file: Some(path),
        }
    }

    fn csv_path(&self, ticker: &str) -> PathBuf {
        match &self.file {
            Some(path) => path.clone(),
            None => self.base_path.join(format!("{}.csv", ticker)),
        }
    }

    pub fn read_file(path: &Path) -> Result<Vec<OhlcvBar>, EmacrossError> {
        let file = File::open(path).map_err(|e| EmacrossError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;
        parse_bars(file)
    }
}

impl DataPort for CsvAdapter {
    fn fetch_bars(&self, ticker: &str) -> Result<Vec<OhlcvBar>, EmacrossError> {
        Self::read_file(&self.csv_path(ticker))
    }
}

/// Parse a timestamp in any of the accepted layouts. A value with an offset
/// becomes the wall-clock time it annotates.
pub fn parse_timestamp(value: &str) -> Option<Timestamp> {
    parse_zoned(value)
        .map(|dt| dt.naive_local())
        .or_else(|| parse_naive(value))
}

fn parse_zoned(value: &str) -> Option<DateTime<FixedOffset>> {
    let value = value.trim();
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%:z"))
        .ok()
}

fn parse_naive(value: &str) -> Option<Timestamp> {
    let value = value.trim();
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

struct ColumnMap {
    time: usize,
    prices: [usize; 5],
}

impl ColumnMap {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, EmacrossError> {
        let names: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
        let find = |wanted: &str| names.iter().position(|n| n == wanted);

        // Without a named time column, the first column is the written-out index.
        let time = TIME_COLUMNS.iter().find_map(|c| find(*c)).unwrap_or(0);

        let mut prices = [0usize; 5];
        for (slot, column) in prices.iter_mut().zip(PRICE_COLUMNS) {
            *slot = find(column).ok_or_else(|| EmacrossError::Data {
                reason: format!("missing {} column", column),
            })?;
        }

        Ok(ColumnMap { time, prices })
    }

    /// `zone` is fixed by the first row with an offset and applied to the rest.
    fn bar(
        &self,
        record: &csv::StringRecord,
        zone: &mut Option<FixedOffset>,
    ) -> Option<OhlcvBar> {
        let mut values = [0.0_f64; 5];
        for (value, &index) in values.iter_mut().zip(&self.prices) {
            *value = record.get(index)?.trim().parse().ok()?;
        }
        let [open, high, low, close, volume] = values;

        let cell = record.get(self.time)?;
        let timestamp = match parse_zoned(cell) {
            Some(dt) => {
                let offset = *zone.get_or_insert(*dt.offset());
                dt.with_timezone(&offset).naive_local()
            }
            None => parse_naive(cell)?,
        };

        let bar = OhlcvBar {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        };
        bar.is_well_formed().then_some(bar)
    }
}

/// Read bars from any CSV source with a header row.
pub fn parse_bars<R: Read>(reader: R) -> Result<Vec<OhlcvBar>, EmacrossError> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().map_err(|e| EmacrossError::Data {
        reason: format!("CSV header error: {}", e),
    })?;
    let columns = ColumnMap::from_headers(headers)?;

    let mut bars = Vec::new();
    let mut dropped = 0usize;
    let mut zone = None;

    for result in rdr.records() {
        let record = result.map_err(|e| EmacrossError::Data {
            reason: format!("CSV parse error: {}", e),
        })?;
        match columns.bar(&record, &mut zone) {
            Some(bar) => bars.push(bar),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        debug!(dropped, kept = bars.len(), "dropped unparseable rows");
    }

    bars.sort_by_key(|b| b.timestamp);
    let mut deduped: Vec<OhlcvBar> = Vec::with_capacity(bars.len());
    for bar in bars {
        match deduped.last_mut() {
            Some(last) if last.timestamp == bar.timestamp => *last = bar,
            _ => deduped.push(bar),
        }
    }

    Ok(deduped)
}
