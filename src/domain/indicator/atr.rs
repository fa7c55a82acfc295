//! True range and Average True Range.
//!
//! TR[i] needs the previous (older) close at `i + 1`, so the oldest day has no
//! true range. ATR(w)[i] is the plain mean of TR over `i..i+w` and is therefore
//! defined only when `i + w` stays strictly inside the series.

use crate::domain::indicator::{moving_average_sparse, Metric};
use crate::domain::ohlcv::OhlcvBar;

pub fn true_ranges(bars: &[OhlcvBar]) -> Vec<Metric> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| bars.get(i + 1).map(|prev| bar.true_range(prev.close)))
        .collect()
}

pub fn average_true_range(bars: &[OhlcvBar], window: usize) -> Vec<Metric> {
    moving_average_sparse(&true_ranges(bars), window)
}
