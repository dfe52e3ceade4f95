#![allow(dead_code)]

use chrono::NaiveDate;
use emacross::domain::backtest::BacktestConfig;
use emacross::domain::error::EmacrossError;
pub use emacross::domain::ohlcv::{OhlcvBar, Timestamp};
use emacross::ports::data_port::DataPort;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, ticker: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(ticker.to_string(), bars);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(&self, ticker: &str) -> Result<Vec<OhlcvBar>, EmacrossError> {
        if let Some(reason) = self.errors.get(ticker) {
            return Err(EmacrossError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self.data.get(ticker).cloned().unwrap_or_default())
    }
}

pub fn ts(y: i32, m: u32, d: u32, h: u32, min: u32) -> Timestamp {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, 0)
        .unwrap()
}

pub fn make_bar(timestamp: Timestamp, close: f64) -> OhlcvBar {
    OhlcvBar {
        timestamp,
        open: close,
        high: close + 1.0,
        low: (close - 1.0).max(0.0),
        close,
        volume: 1000.0,
    }
}

/// Hourly bars starting 2024-01-02 09:15, one per close.
pub fn bars_from_closes(closes: &[f64]) -> Vec<OhlcvBar> {
    let start = ts(2024, 1, 2, 9, 15);
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| make_bar(start + chrono::Duration::hours(i as i64), close))
        .collect()
}

/// A deterministic zig-zag series long enough to produce several crossovers.
pub fn generate_bars(count: usize, start_price: f64) -> Vec<OhlcvBar> {
    let closes: Vec<f64> = (0..count)
        .map(|i| {
            let wave = ((i % 20) as f64 - 10.0).abs();
            start_price + wave * 2.0 + i as f64 * 0.1
        })
        .collect();
    bars_from_closes(&closes)
}

/// Closes whose EMA(1)/EMA(3) crossovers fire BUY at bar 3 and SELL at bar 6.
pub const FLIP_CLOSES: [f64; 9] = [10.0, 10.0, 10.0, 12.0, 12.0, 12.0, 8.0, 8.0, 8.0];

pub fn fast_config() -> BacktestConfig {
    BacktestConfig {
        ema_fast_span: 1,
        ema_slow_span: 3,
        ..BacktestConfig::default()
    }
}

pub fn bars_to_csv(bars: &[OhlcvBar]) -> String {
    let mut out = String::from("Datetime,Open,High,Low,Close,Volume\n");
    for b in bars {
        out.push_str(&format!(
            "{}+05:30,{},{},{},{},{}\n",
            b.timestamp.format("%Y-%m-%d %H:%M:%S"),
            b.open,
            b.high,
            b.low,
            b.close,
            b.volume
        ));
    }
    out
}

pub fn write_file(path: &Path, content: &str) {
    let mut file = std::fs::File::create(path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
}
