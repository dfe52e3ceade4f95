//! Performance metrics over a finalized trade ledger.
//!
//! Undefined statistics (profit factor without losing trades, max win/loss of
//! an empty category) are `None`, never zero.

use super::error::EmacrossError;
use super::ledger::TradeLedger;
use super::position::{Side, Trade};

#[derive(Debug, Clone, PartialEq)]
pub struct MetricsRow {
    pub category: String,
    pub net_pnl: f64,
    pub net_pnl_pct: f64,
    pub trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub win_rate_pct: f64,
    pub profit_factor: Option<f64>,
    pub max_win: Option<f64>,
    pub max_loss: Option<f64>,
}

/// The three standard slices of the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Overall,
    Long,
    Short,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Overall, Category::Long, Category::Short];

    pub fn label(self) -> &'static str {
        match self {
            Category::Overall => "OVERALL",
            Category::Long => "LONG",
            Category::Short => "SHORT",
        }
    }

    pub fn includes(self, trade: &Trade) -> bool {
        match self {
            Category::Overall => true,
            Category::Long => trade.side == Side::Buy,
            Category::Short => trade.side == Side::Sell,
        }
    }
}

/// Aggregate the trades selected by `filter` (all trades when `None`).
pub fn compute_metrics(
    ledger: &TradeLedger,
    initial_capital: f64,
    filter: Option<&dyn Fn(&Trade) -> bool>,
    category: &str,
) -> Result<MetricsRow, EmacrossError> {
    if !(initial_capital.is_finite() && initial_capital > 0.0) {
        return Err(EmacrossError::invalid("initial_capital", "must be positive"));
    }

    let mut trades = 0usize;
    let mut wins = 0usize;
    let mut losses = 0usize;
    let mut net_pnl = 0.0_f64;
    let mut gross_profit = 0.0_f64;
    let mut gross_loss = 0.0_f64;
    let mut max_win: Option<f64> = None;
    let mut max_loss: Option<f64> = None;

    for trade in ledger.iter().filter(|&t| filter.is_none_or(|f| f(t))) {
        let pnl = trade.realized_pnl();
        trades += 1;
        net_pnl += pnl;

        if pnl > 0.0 {
            wins += 1;
            gross_profit += pnl;
            max_win = Some(max_win.map_or(pnl, |m| m.max(pnl)));
        } else if pnl < 0.0 {
            losses += 1;
            gross_loss += pnl.abs();
            max_loss = Some(max_loss.map_or(pnl, |m| m.min(pnl)));
        }
    }

    let win_rate_pct = if trades > 0 {
        wins as f64 / trades as f64 * 100.0
    } else {
        0.0
    };

    let profit_factor = if gross_loss > 0.0 {
        Some(gross_profit / gross_loss)
    } else {
        None
    };

    Ok(MetricsRow {
        category: category.to_string(),
        net_pnl,
        net_pnl_pct: net_pnl / initial_capital * 100.0,
        trades,
        wins,
        losses,
        win_rate_pct,
        profit_factor,
        max_win,
        max_loss,
    })
}

/// OVERALL, LONG and SHORT rows, in that order.
pub fn compute_metrics_table(
    ledger: &TradeLedger,
    initial_capital: f64,
) -> Result<Vec<MetricsRow>, EmacrossError> {
    Category::ALL
        .iter()
        .map(|&category| {
            let predicate = move |t: &Trade| category.includes(t);
            let filter: Option<&dyn Fn(&Trade) -> bool> = match category {
                Category::Overall => None,
                _ => Some(&predicate),
            };
            compute_metrics(ledger, initial_capital, filter, category.label())
        })
        .collect()
}

/// Render a possibly-undefined statistic, using `NaN` for the sentinel.
pub fn format_optional(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", precision, v),
        None => "NaN".to_string(),
    }
}
