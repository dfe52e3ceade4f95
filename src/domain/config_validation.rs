//! Configuration validation.
//!
//! Validates every `[backtest]` key before a run. Absent keys fall back to
//! the defaults in [`crate::domain::backtest`].

use tracing::warn;

use crate::domain::backtest::{
    DEFAULT_FAST_SPAN, DEFAULT_INITIAL_CAPITAL, DEFAULT_QUANTITY, DEFAULT_SLOW_SPAN,
};
use crate::domain::error::EmacrossError;
use crate::ports::config_port::ConfigPort;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), EmacrossError> {
    let fast = parse_span(config, "ema_fast_span", DEFAULT_FAST_SPAN)?;
    let slow = parse_span(config, "ema_slow_span", DEFAULT_SLOW_SPAN)?;
    validate_quantity(config)?;
    validate_initial_capital(config)?;

    if fast >= slow {
        warn!(fast, slow, "ema_fast_span is not shorter than ema_slow_span");
    }
    Ok(())
}

/// Read a span key: absent means `default`, present must be an integer ≥ 1.
pub fn parse_span(
    config: &dyn ConfigPort,
    key: &str,
    default: usize,
) -> Result<usize, EmacrossError> {
    let Some(raw) = config.get_string("backtest", key) else {
        return Ok(default);
    };
    match raw.trim().parse::<usize>() {
        Ok(span) if span >= 1 => Ok(span),
        _ => Err(EmacrossError::ConfigInvalid {
            section: "backtest".to_string(),
            key: key.to_string(),
            reason: format!("{} must be a positive integer, got '{}'", key, raw.trim()),
        }),
    }
}

fn validate_quantity(config: &dyn ConfigPort) -> Result<(), EmacrossError> {
    validate_positive(config, "quantity", DEFAULT_QUANTITY)
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), EmacrossError> {
    validate_positive(config, "initial_capital", DEFAULT_INITIAL_CAPITAL)
}

fn validate_positive(
    config: &dyn ConfigPort,
    key: &str,
    default: f64,
) -> Result<(), EmacrossError> {
    let invalid = || EmacrossError::ConfigInvalid {
        section: "backtest".to_string(),
        key: key.to_string(),
        reason: format!("{} must be positive", key),
    };

    let value = match config.get_string("backtest", key) {
        None => default,
        Some(raw) => raw.trim().parse::<f64>().map_err(|_| invalid())?,
    };
    if !(value.is_finite() && value > 0.0) {
        return Err(invalid());
    }
    Ok(())
}
