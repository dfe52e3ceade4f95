//! EMA crossover signal generation.
//!
//! A bar emits `Buy` when the fast average crosses strictly above the slow
//! one, `Sell` when it crosses strictly below, and `None` otherwise. The
//! previous bar's comparison is non-strict, so a tie does not block a cross.

use std::fmt;

use crate::domain::error::EmacrossError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Signal {
    Buy,
    Sell,
    #[default]
    None,
}

impl Signal {
    /// +1 / -1 / 0 encoding used in signal tables.
    pub fn value(self) -> i8 {
        match self {
            Signal::Buy => 1,
            Signal::Sell => -1,
            Signal::None => 0,
        }
    }

    pub fn is_none(self) -> bool {
        self == Signal::None
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Buy => write!(f, "BUY"),
            Signal::Sell => write!(f, "SELL"),
            Signal::None => write!(f, "NONE"),
        }
    }
}

/// Signal at one index given the (fast, slow) pair now and on the prior bar.
pub fn crossover(prev: (f64, f64), curr: (f64, f64)) -> Signal {
    let (prev_fast, prev_slow) = prev;
    let (fast, slow) = curr;

    if fast > slow && prev_fast <= prev_slow {
        Signal::Buy
    } else if fast < slow && prev_fast >= prev_slow {
        Signal::Sell
    } else {
        Signal::None
    }
}

/// One signal per index of the aligned fast/slow EMA series. Index 0 is always `None`.
pub fn generate_signals(fast: &[f64], slow: &[f64]) -> Result<Vec<Signal>, EmacrossError> {
    if fast.len() != slow.len() {
        return Err(EmacrossError::MisalignedInput {
            expected: fast.len(),
            actual: slow.len(),
        });
    }
    if fast.is_empty() {
        return Err(EmacrossError::EmptySeries);
    }

    let mut signals = Vec::with_capacity(fast.len());
    signals.push(Signal::None);
    signals.extend(
        fast.windows(2)
            .zip(slow.windows(2))
            .map(|(f, s)| crossover((f[0], s[0]), (f[1], s[1]))),
    );

    Ok(signals)
}
