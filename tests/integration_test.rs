//! Integration tests for the backtest pipeline.
//!
//! Tests cover:
//! - Full pipeline through a mock data port and a recording report port
//! - The worked crossover, single-bar and metrics scenarios
//! - Ledger structure on a long generated series
//! - CSV and SVG report adapters writing into a temp directory
//! - CSV data adapter feeding the same pipeline as in-memory bars

mod common;

use approx::assert_abs_diff_eq;
use common::*;
use emacross::adapters::csv_adapter::CsvAdapter;
use emacross::adapters::csv_report::{self, CsvReportAdapter};
use emacross::adapters::svg_chart::{self, SvgChartAdapter};
use emacross::cli::run_backtest_pipeline;
use emacross::domain::backtest::{BacktestConfig, BacktestResult, run_backtest};
use emacross::domain::error::EmacrossError;
use emacross::domain::metrics::compute_metrics;
use emacross::domain::position::{Side, close_trade, open_trade};
use emacross::domain::signal::Signal;
use emacross::domain::ledger::TradeLedger;
use emacross::ports::report_port::ReportPort;
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct MockReportPort {
    calls: RefCell<Vec<(String, PathBuf, usize)>>,
}

impl MockReportPort {
    fn new() -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
        }
    }
}

impl ReportPort for MockReportPort {
    fn write(
        &self,
        result: &BacktestResult,
        ticker: &str,
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>, EmacrossError> {
        self.calls.borrow_mut().push((
            ticker.to_string(),
            output_dir.to_path_buf(),
            result.ledger.len(),
        ));
        Ok(vec![output_dir.join(format!("{}.mock", ticker))])
    }
}

mod full_pipeline {
    use super::*;

    #[test]
    fn pipeline_with_mock_ports() {
        let port = MockDataPort::new().with_bars("TEST", bars_from_closes(&FLIP_CLOSES));
        let report = MockReportPort::new();

        let (result, written) = run_backtest_pipeline(
            &port,
            "TEST",
            &fast_config(),
            Path::new("out"),
            &[&report],
        )
        .unwrap();

        assert_eq!(result.ledger.len(), 2);
        assert_eq!(written, vec![PathBuf::from("out/TEST.mock")]);

        let calls = report.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], ("TEST".to_string(), PathBuf::from("out"), 2));
    }

    #[test]
    fn pipeline_without_reporters() {
        let port = MockDataPort::new().with_bars("TEST", generate_bars(50, 100.0));
        let (result, written) =
            run_backtest_pipeline(&port, "TEST", &BacktestConfig::default(), Path::new("."), &[])
                .unwrap();
        assert_eq!(result.bars.len(), 50);
        assert!(written.is_empty());
    }

    #[test]
    fn fetch_error_propagates() {
        let port = MockDataPort::new().with_error("BAD", "connection refused");
        let err = run_backtest_pipeline(
            &port,
            "BAD",
            &BacktestConfig::default(),
            Path::new("."),
            &[],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            EmacrossError::Data { ref reason } if reason == "connection refused"
        ));
        assert_eq!(err.exit_status(), 3);
    }

    #[test]
    fn missing_ticker_is_empty_series() {
        let port = MockDataPort::new();
        let report = MockReportPort::new();
        let err = run_backtest_pipeline(
            &port,
            "NONE",
            &BacktestConfig::default(),
            Path::new("."),
            &[&report],
        )
        .unwrap_err();

        assert!(matches!(err, EmacrossError::EmptySeries));
        assert!(report.calls.borrow().is_empty());
    }

    #[test]
    fn invalid_config_rejected_before_simulation() {
        let port = MockDataPort::new().with_bars("TEST", bars_from_closes(&FLIP_CLOSES));
        let config = BacktestConfig {
            quantity: -5.0,
            ..BacktestConfig::default()
        };
        let err =
            run_backtest_pipeline(&port, "TEST", &config, Path::new("."), &[]).unwrap_err();
        assert!(matches!(
            err,
            EmacrossError::InvalidParameter { ref name, .. } if name == "quantity"
        ));
    }
}

mod scenarios {
    use super::*;

    #[test]
    fn crossover_flip_and_forced_close() {
        let bars = bars_from_closes(&FLIP_CLOSES);
        let result = run_backtest(&bars, &fast_config()).unwrap();

        assert_eq!(result.signals[3], Signal::Buy);
        assert_eq!(result.signals[6], Signal::Sell);
        assert_eq!(
            result.signals.iter().filter(|s| !s.is_none()).count(),
            2
        );

        let trades = result.ledger.trades();
        assert_eq!(trades.len(), 2);

        assert_eq!(trades[0].side, Side::Buy);
        assert_eq!(trades[0].entry_time, bars[3].timestamp);
        assert_eq!(trades[0].entry_price, 12.0);
        assert_eq!(trades[0].exit_time, Some(bars[6].timestamp));
        assert_eq!(trades[0].exit_price, Some(8.0));
        assert_abs_diff_eq!(trades[0].realized_pnl(), (8.0 - 12.0) * 100.0);

        assert_eq!(trades[1].side, Side::Sell);
        assert_eq!(trades[1].entry_time, bars[6].timestamp);
        assert_eq!(trades[1].exit_time, Some(bars[8].timestamp));
        assert_abs_diff_eq!(trades[1].realized_pnl(), 0.0);
    }

    #[test]
    fn single_bar_input() {
        let bars = bars_from_closes(&[42.0]);
        let result = run_backtest(&bars, &BacktestConfig::default()).unwrap();

        assert_eq!(result.ema_fast.raw(), vec![42.0]);
        assert_eq!(result.ema_slow.raw(), vec![42.0]);
        assert_eq!(result.signals, vec![Signal::None]);
        assert!(result.ledger.is_empty());
        assert!(result.equity_curve().is_empty());
    }

    #[test]
    fn two_trade_metrics() {
        let t0 = ts(2024, 1, 2, 9, 15);
        let t1 = ts(2024, 1, 2, 10, 15);
        let t2 = ts(2024, 1, 2, 11, 15);
        let win = close_trade(&open_trade(Side::Buy, t0, 100.0), t1, 105.0, 100.0);
        let loss = close_trade(&open_trade(Side::Sell, t1, 105.0), t2, 107.0, 100.0);
        let ledger = TradeLedger::from_trades(vec![win, loss]).unwrap();

        let m = compute_metrics(&ledger, 100_000.0, None, "OVERALL").unwrap();
        assert_abs_diff_eq!(m.net_pnl, 300.0, epsilon = 1e-9);
        assert_abs_diff_eq!(m.net_pnl_pct, 0.3, epsilon = 1e-9);
        assert_abs_diff_eq!(m.win_rate_pct, 50.0, epsilon = 1e-9);
        assert_abs_diff_eq!(m.profit_factor.unwrap(), 2.5, epsilon = 1e-9);
    }

    #[test]
    fn zero_trade_metrics_use_sentinels() {
        let bars = bars_from_closes(&[10.0, 10.0, 10.0]);
        let result = run_backtest(&bars, &fast_config()).unwrap();

        for row in &result.metrics {
            assert_eq!(row.trades, 0);
            assert_eq!(row.win_rate_pct, 0.0);
            assert_eq!(row.profit_factor, None);
            assert_eq!(row.max_win, None);
            assert_eq!(row.max_loss, None);
        }
    }
}

mod ledger_structure {
    use super::*;

    fn long_run() -> BacktestResult {
        run_backtest(&generate_bars(300, 100.0), &BacktestConfig::default()).unwrap()
    }

    #[test]
    fn generated_series_trades() {
        let result = long_run();
        assert!(result.ledger.len() >= 2);
        assert!(result.ledger.iter().all(|t| t.is_closed()));
    }

    #[test]
    fn trades_alternate_and_chain() {
        let result = long_run();
        let trades = result.ledger.trades();
        for pair in trades.windows(2) {
            assert_ne!(pair[1].side, pair[0].side);
            assert_eq!(Some(pair[1].entry_time), pair[0].exit_time);
            assert_eq!(Some(pair[1].entry_price), pair[0].exit_price);
        }
    }

    #[test]
    fn metrics_slices_add_up() {
        let result = long_run();
        let [overall, long, short] = [&result.metrics[0], &result.metrics[1], &result.metrics[2]];
        assert_eq!(overall.trades, long.trades + short.trades);
        assert_eq!(overall.wins, long.wins + short.wins);
        assert_eq!(overall.losses, long.losses + short.losses);
        assert_abs_diff_eq!(overall.net_pnl, long.net_pnl + short.net_pnl, epsilon = 1e-6);
        assert_eq!(long.trades, result.ledger.count_side(Side::Buy));
    }

    #[test]
    fn final_equity_matches_curve() {
        let result = long_run();
        let curve = result.equity_curve();
        let last = curve.last().unwrap();
        assert_abs_diff_eq!(last.equity, result.final_equity(), epsilon = 1e-6);
        assert_eq!(Some(last.timestamp), result.bars.last().map(|b| b.timestamp));
    }

    #[test]
    fn rerun_is_identical() {
        assert_eq!(long_run(), long_run());
    }
}

mod reports {
    use super::*;

    fn run_into(dir: &Path) -> Vec<PathBuf> {
        let port = MockDataPort::new().with_bars("RELIANCE.NS", bars_from_closes(&FLIP_CLOSES));
        let csv = CsvReportAdapter::new();
        let svg = SvgChartAdapter::new();
        let (_, written) =
            run_backtest_pipeline(&port, "RELIANCE.NS", &fast_config(), dir, &[&csv, &svg])
                .unwrap();
        written
    }

    #[test]
    fn all_artifacts_written() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("nested").join("reports");
        let written = run_into(&out);

        assert_eq!(written.len(), 6);
        assert!(csv_report::trade_log_path(&out, "RELIANCE.NS").exists());
        assert!(csv_report::metrics_path(&out, "RELIANCE.NS").exists());
        assert!(csv_report::signals_path(&out, "RELIANCE.NS").exists());
        assert!(csv_report::equity_path(&out, "RELIANCE.NS").exists());
        assert!(svg_chart::price_chart_path(&out, "RELIANCE.NS").exists());
        assert!(svg_chart::equity_chart_path(&out, "RELIANCE.NS").exists());
    }

    #[test]
    fn trade_log_cumulative_column_is_running_sum() {
        let dir = TempDir::new().unwrap();
        run_into(dir.path());

        let mut rdr =
            csv::Reader::from_path(csv_report::trade_log_path(dir.path(), "RELIANCE.NS")).unwrap();
        let mut running = 0.0;
        let mut rows = 0;
        for record in rdr.records() {
            let record = record.unwrap();
            let pnl: f64 = record[5].parse().unwrap();
            let cumulative: f64 = record[6].parse().unwrap();
            running += pnl;
            assert_abs_diff_eq!(cumulative, running, epsilon = 1e-9);
            rows += 1;
        }
        assert_eq!(rows, 2);
    }

    #[test]
    fn metrics_file_has_three_categories() {
        let dir = TempDir::new().unwrap();
        run_into(dir.path());

        let mut rdr =
            csv::Reader::from_path(csv_report::metrics_path(dir.path(), "RELIANCE.NS")).unwrap();
        let headers = rdr.headers().unwrap().clone();
        assert_eq!(&headers[0], "Category");
        assert_eq!(&headers[7], "Profit_Factor");

        let categories: Vec<String> = rdr
            .records()
            .map(|r| r.unwrap()[0].to_string())
            .collect();
        assert_eq!(categories, vec!["OVERALL", "LONG", "SHORT"]);
    }
}

mod csv_source {
    use super::*;

    #[test]
    fn csv_file_matches_in_memory_bars() {
        let dir = TempDir::new().unwrap();
        let bars = generate_bars(120, 250.0);
        let path = dir.path().join("SAMPLE.csv");
        write_file(&path, &bars_to_csv(&bars));

        let from_file = run_backtest_pipeline(
            &CsvAdapter::from_file(path),
            "SAMPLE",
            &BacktestConfig::default(),
            dir.path(),
            &[],
        )
        .unwrap()
        .0;
        let in_memory = run_backtest(&bars, &BacktestConfig::default()).unwrap();

        assert_eq!(from_file.bars, in_memory.bars);
        assert_eq!(from_file.ledger, in_memory.ledger);
    }

    #[test]
    fn directory_adapter_reads_ticker_file() {
        let dir = TempDir::new().unwrap();
        write_file(
            &dir.path().join("TEST.csv"),
            &bars_to_csv(&bars_from_closes(&FLIP_CLOSES)),
        );

        let adapter = CsvAdapter::new(dir.path().to_path_buf());
        let (result, _) =
            run_backtest_pipeline(&adapter, "TEST", &fast_config(), dir.path(), &[]).unwrap();
        assert_eq!(result.ledger.len(), 2);
    }
}
