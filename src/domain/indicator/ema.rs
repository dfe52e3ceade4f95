//! Exponential Moving Average.
//!
//! k = 2/(n+1), seeded with the first close, then EMA[i] = C[i]*k + EMA[i-1]*(1-k).
//! Every output is valid: there is no warmup window.

use crate::domain::error::EmacrossError;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::{self, OhlcvBar};

/// Smoothing factor for a given span.
pub fn smoothing_factor(span: usize) -> f64 {
    2.0 / (span as f64 + 1.0)
}

/// Adjust-free recursive EMA over `closes`, one value per input.
pub fn compute_ema(closes: &[f64], span: usize) -> Result<Vec<f64>, EmacrossError> {
    if span == 0 {
        return Err(EmacrossError::invalid("span", "must be at least 1"));
    }
    let Some(&seed) = closes.first() else {
        return Err(EmacrossError::EmptySeries);
    };

    let k = smoothing_factor(span);
    let mut values = Vec::with_capacity(closes.len());
    let mut ema = seed;
    values.push(ema);

    for &close in &closes[1..] {
        ema = close * k + ema * (1.0 - k);
        values.push(ema);
    }

    Ok(values)
}

/// EMA of bar closes, timestamped for charting.
pub fn calculate_ema(bars: &[OhlcvBar], span: usize) -> Result<IndicatorSeries, EmacrossError> {
    let values = compute_ema(&ohlcv::closes(bars), span)?;

    Ok(IndicatorSeries {
        indicator_type: IndicatorType::Ema(span),
        values: bars
            .iter()
            .zip(values)
            .map(|(bar, value)| IndicatorPoint {
                timestamp: bar.timestamp,
                value,
            })
            .collect(),
    })
}
