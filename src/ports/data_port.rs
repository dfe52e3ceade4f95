//! Market data access port trait.

use crate::domain::error::EmacrossError;
use crate::domain::ohlcv::{OhlcvBar, Timestamp};

/// Source of cleaned, chronologically ordered bars for one instrument.
pub trait DataPort {
    fn fetch_bars(&self, ticker: &str) -> Result<Vec<OhlcvBar>, EmacrossError>;

    /// (first timestamp, last timestamp, bar count), or `None` when there is no data.
    fn data_range(
        &self,
        ticker: &str,
    ) -> Result<Option<(Timestamp, Timestamp, usize)>, EmacrossError> {
        let bars = self.fetch_bars(ticker)?;
        Ok(match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Some((first.timestamp, last.timestamp, bars.len())),
            _ => None,
        })
    }
}
