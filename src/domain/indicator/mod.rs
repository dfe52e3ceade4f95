//! Technical indicator series.
//!
//! - `IndicatorPoint`: a single timestamped value
//! - `IndicatorType`: indicator identity + parameters
//! - `IndicatorSeries`: an indicator aligned 1:1 with the bar sequence

pub mod ema;

use crate::domain::ohlcv::Timestamp;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub timestamp: Timestamp,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Ema(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    /// Bare values in bar order.
    pub fn raw(&self) -> Vec<f64> {
        self.values.iter().map(|p| p.value).collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Ema(span) => write!(f, "EMA({})", span),
        }
    }
}
