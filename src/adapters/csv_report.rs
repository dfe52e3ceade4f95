//! CSV report adapter: trade log, metrics table, signal table and equity curve.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::EmacrossError;
use crate::domain::ohlcv::Timestamp;
use crate::ports::report_port::ReportPort;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const TRADE_LOG_HEADER: [&str; 7] = [
    "Type",
    "Entry Date",
    "Entry Price",
    "Exit Date",
    "Exit Price",
    "PnL",
    "Cumulative_PnL",
];

pub const METRICS_HEADER: [&str; 10] = [
    "Category",
    "Net_PnL",
    "Net_PnL_%",
    "Trades",
    "Wins",
    "Losses",
    "Win_Rate_%",
    "Profit_Factor",
    "Max_Win",
    "Max_Loss",
];

#[derive(Debug, Default)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

pub fn trade_log_path(output_dir: &Path, ticker: &str) -> PathBuf {
    output_dir.join(format!("Trade Log {}.csv", ticker))
}

pub fn metrics_path(output_dir: &Path, ticker: &str) -> PathBuf {
    output_dir.join(format!("Performance Metrics {}.csv", ticker))
}

pub fn signals_path(output_dir: &Path, ticker: &str) -> PathBuf {
    output_dir.join(format!("Signals {}.csv", ticker))
}

pub fn equity_path(output_dir: &Path, ticker: &str) -> PathBuf {
    output_dir.join(format!("Equity {}.csv", ticker))
}

fn fmt_time(ts: Option<Timestamp>) -> String {
    ts.map(|t| t.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_default()
}

fn fmt_number(value: Option<f64>) -> String {
    value.map_or_else(|| "NaN".to_string(), |v| v.to_string())
}

fn csv_error(path: &Path, e: csv::Error) -> EmacrossError {
    EmacrossError::Io(std::io::Error::other(format!(
        "failed to write {}: {}",
        path.display(),
        e
    )))
}

fn write_rows<I>(path: &Path, header: &[&str], rows: I) -> Result<(), EmacrossError>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut wtr = csv::Writer::from_path(path).map_err(|e| csv_error(path, e))?;
    wtr.write_record(header).map_err(|e| csv_error(path, e))?;
    for row in rows {
        wtr.write_record(&row).map_err(|e| csv_error(path, e))?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_trade_log(result: &BacktestResult, path: &Path) -> Result<(), EmacrossError> {
    let cumulative = result.ledger.cumulative_pnl();
    let rows = result.ledger.iter().zip(cumulative).map(|(trade, cum)| {
        vec![
            trade.side.to_string(),
            fmt_time(Some(trade.entry_time)),
            trade.entry_price.to_string(),
            fmt_time(trade.exit_time),
            fmt_number(trade.exit_price),
            fmt_number(trade.pnl),
            cum.to_string(),
        ]
    });
    write_rows(path, &TRADE_LOG_HEADER, rows)
}

pub fn write_metrics(result: &BacktestResult, path: &Path) -> Result<(), EmacrossError> {
    let rows = result.metrics.iter().map(|m| {
        vec![
            m.category.clone(),
            m.net_pnl.to_string(),
            m.net_pnl_pct.to_string(),
            m.trades.to_string(),
            m.wins.to_string(),
            m.losses.to_string(),
            m.win_rate_pct.to_string(),
            fmt_number(m.profit_factor),
            fmt_number(m.max_win),
            fmt_number(m.max_loss),
        ]
    });
    write_rows(path, &METRICS_HEADER, rows)
}

pub fn write_signals(result: &BacktestResult, path: &Path) -> Result<(), EmacrossError> {
    let header = [
        "Datetime".to_string(),
        "Open".to_string(),
        "High".to_string(),
        "Low".to_string(),
        "Close".to_string(),
        "Volume".to_string(),
        result.ema_fast.indicator_type.to_string(),
        result.ema_slow.indicator_type.to_string(),
        "Signal".to_string(),
    ];
    let header: Vec<&str> = header.iter().map(String::as_str).collect();

    let rows = result
        .bars
        .iter()
        .zip(&result.ema_fast.values)
        .zip(&result.ema_slow.values)
        .zip(&result.signals)
        .map(|(((bar, fast), slow), signal)| {
            vec![
                fmt_time(Some(bar.timestamp)),
                bar.open.to_string(),
                bar.high.to_string(),
                bar.low.to_string(),
                bar.close.to_string(),
                bar.volume.to_string(),
                fast.value.to_string(),
                slow.value.to_string(),
                signal.value().to_string(),
            ]
        });
    write_rows(path, &header, rows)
}

pub fn write_equity(result: &BacktestResult, path: &Path) -> Result<(), EmacrossError> {
    let rows = result
        .equity_curve()
        .into_iter()
        .map(|p| vec![fmt_time(Some(p.timestamp)), p.equity.to_string()]);
    write_rows(path, &["Exit Date", "Equity"], rows)
}

impl ReportPort for CsvReportAdapter {
    fn write(
        &self,
        result: &BacktestResult,
        ticker: &str,
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>, EmacrossError> {
        fs::create_dir_all(output_dir)?;

        let trade_log = trade_log_path(output_dir, ticker);
        write_trade_log(result, &trade_log)?;
        let metrics = metrics_path(output_dir, ticker);
        write_metrics(result, &metrics)?;
        let signals = signals_path(output_dir, ticker);
        write_signals(result, &signals)?;
        let equity = equity_path(output_dir, ticker);
        write_equity(result, &equity)?;

        let written = vec![trade_log, metrics, signals, equity];
        for path in &written {
            info!(path = %path.display(), "wrote");
        }
        Ok(written)
    }
}
