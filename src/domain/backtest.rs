//! Backtest configuration and the end-to-end pipeline.
//!
//! bars → EMA(fast), EMA(slow) → signals → trade ledger → metrics table.

use tracing::info;

use super::error::EmacrossError;
use super::indicator::IndicatorSeries;
use super::indicator::ema::calculate_ema;
use super::ledger::{EquityPoint, TradeLedger};
use super::metrics::{MetricsRow, compute_metrics_table};
use super::ohlcv::OhlcvBar;
use super::signal::{Signal, generate_signals};
use super::simulator::simulate;

pub const DEFAULT_FAST_SPAN: usize = 9;
pub const DEFAULT_SLOW_SPAN: usize = 21;
pub const DEFAULT_QUANTITY: f64 = 100.0;
pub const DEFAULT_INITIAL_CAPITAL: f64 = 100_000.0;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub ema_fast_span: usize,
    pub ema_slow_span: usize,
    pub quantity: f64,
    pub initial_capital: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            ema_fast_span: DEFAULT_FAST_SPAN,
            ema_slow_span: DEFAULT_SLOW_SPAN,
            quantity: DEFAULT_QUANTITY,
            initial_capital: DEFAULT_INITIAL_CAPITAL,
        }
    }
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), EmacrossError> {
        if self.ema_fast_span == 0 {
            return Err(EmacrossError::invalid("ema_fast_span", "must be at least 1"));
        }
        if self.ema_slow_span == 0 {
            return Err(EmacrossError::invalid("ema_slow_span", "must be at least 1"));
        }
        if !(self.quantity.is_finite() && self.quantity > 0.0) {
            return Err(EmacrossError::invalid("quantity", "must be positive"));
        }
        if !(self.initial_capital.is_finite() && self.initial_capital > 0.0) {
            return Err(EmacrossError::invalid("initial_capital", "must be positive"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub bars: Vec<OhlcvBar>,
    pub ema_fast: IndicatorSeries,
    pub ema_slow: IndicatorSeries,
    pub signals: Vec<Signal>,
    pub ledger: TradeLedger,
    pub metrics: Vec<MetricsRow>,
    pub initial_capital: f64,
}

impl BacktestResult {
    /// Close price on bars that fired `Buy`, `None` elsewhere.
    pub fn buy_markers(&self) -> Vec<Option<f64>> {
        self.markers(Signal::Buy)
    }

    /// Close price on bars that fired `Sell`, `None` elsewhere.
    pub fn sell_markers(&self) -> Vec<Option<f64>> {
        self.markers(Signal::Sell)
    }

    fn markers(&self, wanted: Signal) -> Vec<Option<f64>> {
        self.bars
            .iter()
            .zip(&self.signals)
            .map(|(bar, &signal)| (signal == wanted).then_some(bar.close))
            .collect()
    }

    pub fn equity_curve(&self) -> Vec<EquityPoint> {
        self.ledger.equity_curve(self.initial_capital)
    }

    pub fn final_equity(&self) -> f64 {
        self.initial_capital + self.ledger.total_pnl()
    }
}

pub fn run_backtest(
    bars: &[OhlcvBar],
    config: &BacktestConfig,
) -> Result<BacktestResult, EmacrossError> {
    config.validate()?;
    if bars.is_empty() {
        return Err(EmacrossError::EmptySeries);
    }

    let ema_fast = calculate_ema(bars, config.ema_fast_span)?;
    let ema_slow = calculate_ema(bars, config.ema_slow_span)?;
    let signals = generate_signals(&ema_fast.raw(), &ema_slow.raw())?;

    let ledger = simulate(bars, &signals, config.quantity)?;
    let metrics = compute_metrics_table(&ledger, config.initial_capital)?;

    info!(
        bars = bars.len(),
        signals = signals.iter().filter(|s| !s.is_none()).count(),
        trades = ledger.len(),
        net_pnl = ledger.total_pnl(),
        "backtest complete"
    );

    Ok(BacktestResult {
        bars: bars.to_vec(),
        ema_fast,
        ema_slow,
        signals,
        ledger,
        metrics,
        initial_capital: config.initial_capital,
    })
}
