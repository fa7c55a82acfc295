//! Technical indicator routines.
//!
//! Every routine here works on a series ordered most recent first: index 0 is
//! the latest day and the trailing window of day `i` spans `i..i + w`.
//!
//! Results are [`Metric`] values. `None` is the undefined marker: not enough
//! history, or an undefined input somewhere in the window. It is never replaced
//! by zero or a stale value.

pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;
pub mod stddev;

pub use atr::{average_true_range, true_ranges};
pub use bollinger::{bollinger_bands, Bands};
pub use ema::calculate_ema;
pub use macd::{calculate_macd, MacdSeries};
pub use rsi::calculate_rsi;
pub use sma::{moving_average, moving_average_sparse, window_slice};
pub use stddev::volatility;

/// A computed indicator value; `None` means undefined.
pub type Metric = Option<f64>;

/// An all-undefined series of length `len`.
pub fn undefined_series(len: usize) -> Vec<Metric> {
    vec![None; len]
}
