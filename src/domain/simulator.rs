//! Signal-driven long/short flip simulator.
//!
//! The simulator is a reducer over the (bar, signal) stream:
//!
//! | position | signal        | action                                   |
//! |----------|---------------|------------------------------------------|
//! | flat     | buy / sell    | open long / short at the close           |
//! | long     | sell          | close long, open short                   |
//! | short    | buy           | close short, open long                   |
//! | any      | same / none   | nothing                                  |
//!
//! When the stream ends with a position open, it is closed at the last close.
//! That mark-to-market exit is a backtest convention, not a signal.

use tracing::{debug, trace};

use crate::domain::error::EmacrossError;
use crate::domain::ledger::TradeLedger;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::position::{Entry, Position, Side, Trade, close_trade, open_trade};
use crate::domain::signal::Signal;

/// Position plus the trades recorded so far. Only the last trade may be open.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SimulationState {
    pub position: Position,
    pub trades: Vec<Trade>,
}

impl SimulationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_trade_count(&self) -> usize {
        self.trades.iter().filter(|t| t.is_open()).count()
    }
}

/// Advance the state by one bar.
pub fn step(
    state: SimulationState,
    bar: &OhlcvBar,
    signal: Signal,
    quantity: f64,
) -> SimulationState {
    let Some(side) = Side::from_signal(signal) else {
        return state;
    };

    match state.position.side() {
        Some(current) if current == side => {
            trace!(%side, timestamp = %bar.timestamp, "already positioned, signal ignored");
            state
        }
        Some(_) => {
            let state = close_position(state, bar, quantity);
            open_position(state, side, bar)
        }
        None => open_position(state, side, bar),
    }
}

fn open_position(mut state: SimulationState, side: Side, bar: &OhlcvBar) -> SimulationState {
    debug!(%side, timestamp = %bar.timestamp, price = bar.close, "open");
    state.position = Position::open(
        side,
        Entry {
            price: bar.close,
            timestamp: bar.timestamp,
        },
    );
    state.trades.push(open_trade(side, bar.timestamp, bar.close));
    state
}

/// Exit the held position at the bar close. The open ledger row is replaced
/// by a closed trade built from the position's entry.
fn close_position(mut state: SimulationState, bar: &OhlcvBar, quantity: f64) -> SimulationState {
    let (Some(side), Some(&entry)) = (state.position.side(), state.position.entry()) else {
        return state;
    };

    let closed = close_trade(
        &open_trade(side, entry.timestamp, entry.price),
        bar.timestamp,
        bar.close,
        quantity,
    );
    debug!(
        %side,
        timestamp = %bar.timestamp,
        price = bar.close,
        pnl = closed.realized_pnl(),
        "close"
    );

    if state.trades.last().is_some_and(Trade::is_open) {
        state.trades.pop();
    }
    state.trades.push(closed);
    state.position = Position::Flat;
    state
}

/// Close any open position at `last_bar` and seal the ledger.
pub fn finalize(state: SimulationState, last_bar: &OhlcvBar, quantity: f64) -> TradeLedger {
    let state = if state.position.is_flat() {
        state
    } else {
        debug!(
            timestamp = %last_bar.timestamp,
            unrealized = state.position.unrealized_pnl(last_bar.close, quantity),
            "closing open position at end of data"
        );
        close_position(state, last_bar, quantity)
    };
    TradeLedger::finalized(state.trades)
}

/// Run the whole stream and return the finalized ledger.
pub fn simulate(
    bars: &[OhlcvBar],
    signals: &[Signal],
    quantity: f64,
) -> Result<TradeLedger, EmacrossError> {
    let Some(last_bar) = bars.last() else {
        return Err(EmacrossError::EmptySeries);
    };
    if signals.len() != bars.len() {
        return Err(EmacrossError::MisalignedInput {
            expected: bars.len(),
            actual: signals.len(),
        });
    }
    if !(quantity.is_finite() && quantity > 0.0) {
        return Err(EmacrossError::invalid("quantity", "must be positive"));
    }

    let state = bars
        .iter()
        .zip(signals)
        .fold(SimulationState::new(), |state, (bar, &signal)| {
            step(state, bar, signal, quantity)
        });

    Ok(finalize(state, last_bar, quantity))
}
