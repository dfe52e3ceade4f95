//! Position state and trade records.

use std::fmt;

use crate::domain::ohlcv::Timestamp;
use crate::domain::signal::Signal;

/// Direction a trade was opened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// The side an actionable signal opens, if any.
    pub fn from_signal(signal: Signal) -> Option<Side> {
        match signal {
            Signal::Buy => Some(Side::Buy),
            Signal::Sell => Some(Side::Sell),
            Signal::None => None,
        }
    }

    /// Realised PnL of a round trip opened on this side.
    ///
    /// Long profits when exit > entry; short profits when entry > exit.
    pub fn pnl(self, entry_price: f64, exit_price: f64, quantity: f64) -> f64 {
        match self {
            Side::Buy => (exit_price - entry_price) * quantity,
            Side::Sell => (entry_price - exit_price) * quantity,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Entry {
    pub price: f64,
    pub timestamp: Timestamp,
}

/// The simulator's position. An entry exists exactly when the position is open.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Position {
    #[default]
    Flat,
    Long(Entry),
    Short(Entry),
}

impl Position {
    pub fn open(side: Side, entry: Entry) -> Self {
        match side {
            Side::Buy => Position::Long(entry),
            Side::Sell => Position::Short(entry),
        }
    }

    pub fn side(&self) -> Option<Side> {
        match self {
            Position::Flat => None,
            Position::Long(_) => Some(Side::Buy),
            Position::Short(_) => Some(Side::Sell),
        }
    }

    pub fn entry(&self) -> Option<&Entry> {
        match self {
            Position::Flat => None,
            Position::Long(entry) | Position::Short(entry) => Some(entry),
        }
    }

    pub fn is_flat(&self) -> bool {
        matches!(self, Position::Flat)
    }

    pub fn is_long(&self) -> bool {
        matches!(self, Position::Long(_))
    }

    pub fn is_short(&self) -> bool {
        matches!(self, Position::Short(_))
    }

    /// Mark-to-market PnL at `price`; zero when flat.
    pub fn unrealized_pnl(&self, price: f64, quantity: f64) -> f64 {
        match (self.side(), self.entry()) {
            (Some(side), Some(entry)) => side.pnl(entry.price, price, quantity),
            _ => 0.0,
        }
    }
}

/// One ledger row. Exit fields are `None` until the trade is closed.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub side: Side,
    pub entry_time: Timestamp,
    pub entry_price: f64,
    pub exit_time: Option<Timestamp>,
    pub exit_price: Option<f64>,
    pub pnl: Option<f64>,
}

impl Trade {
    pub fn is_open(&self) -> bool {
        self.exit_time.is_none()
    }

    pub fn is_closed(&self) -> bool {
        !self.is_open()
    }

    /// Realised PnL, zero while open.
    pub fn realized_pnl(&self) -> f64 {
        self.pnl.unwrap_or(0.0)
    }
}

pub fn open_trade(side: Side, timestamp: Timestamp, price: f64) -> Trade {
    Trade {
        side,
        entry_time: timestamp,
        entry_price: price,
        exit_time: None,
        exit_price: None,
        pnl: None,
    }
}

/// A closed copy of `trade`, exited at `price`.
pub fn close_trade(trade: &Trade, timestamp: Timestamp, price: f64, quantity: f64) -> Trade {
    Trade {
        exit_time: Some(timestamp),
        exit_price: Some(price),
        pnl: Some(trade.side.pnl(trade.entry_price, price, quantity)),
        ..trade.clone()
    }
}
