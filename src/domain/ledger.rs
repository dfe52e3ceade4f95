//! Finalized trade ledger and equity tracking.

use crate::domain::error::EmacrossError;
use crate::domain::ohlcv::Timestamp;
use crate::domain::position::{Side, Trade};

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub timestamp: Timestamp,
    pub equity: f64,
}

/// Chronological trades, every one of them closed.
///
/// Only built by the simulator's finalization or by [`TradeLedger::from_trades`],
/// both of which guarantee no open trade remains.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TradeLedger {
    trades: Vec<Trade>,
}

impl TradeLedger {
    pub(crate) fn finalized(trades: Vec<Trade>) -> Self {
        debug_assert!(trades.iter().all(Trade::is_closed));
        TradeLedger { trades }
    }

    /// Wrap already-closed trades, e.g. a ledger loaded from elsewhere.
    pub fn from_trades(trades: Vec<Trade>) -> Result<Self, EmacrossError> {
        if let Some(i) = trades.iter().position(Trade::is_open) {
            return Err(EmacrossError::invalid(
                "trades",
                format!("trade {} is still open", i),
            ));
        }
        Ok(TradeLedger { trades })
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Trade> {
        self.trades.iter()
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    pub fn total_pnl(&self) -> f64 {
        self.trades.iter().map(Trade::realized_pnl).sum()
    }

    /// Running sum of PnL, one entry per trade.
    pub fn cumulative_pnl(&self) -> Vec<f64> {
        self.trades
            .iter()
            .scan(0.0, |acc, trade| {
                *acc += trade.realized_pnl();
                Some(*acc)
            })
            .collect()
    }

    /// Capital after each trade, indexed by exit time.
    pub fn equity_curve(&self, initial_capital: f64) -> Vec<EquityPoint> {
        self.trades
            .iter()
            .zip(self.cumulative_pnl())
            .filter_map(|(trade, cum)| {
                trade.exit_time.map(|timestamp| EquityPoint {
                    timestamp,
                    equity: initial_capital + cum,
                })
            })
            .collect()
    }

    pub fn count_side(&self, side: Side) -> usize {
        self.trades.iter().filter(|t| t.side == side).count()
    }
}

impl<'a> IntoIterator for &'a TradeLedger {
    type Item = &'a Trade;
    type IntoIter = std::slice::Iter<'a, Trade>;

    fn into_iter(self) -> Self::IntoIter {
        self.trades.iter()
    }
}
