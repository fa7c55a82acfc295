//! Simple moving average over a trailing window.
//!
//! MA(w)[i] = mean(v[i..i+w]); undefined when `i + w` runs past the oldest day.

use crate::domain::indicator::Metric;
use crate::domain::indicator_helpers::mean;

/// The `window` values ending at day `i` (inclusive, looking back in time), or
/// `None` when fewer than `window` observations remain.
pub fn window_slice<T>(values: &[T], i: usize, window: usize) -> Option<&[T]> {
    if window == 0 {
        return None;
    }
    let end = i.checked_add(window)?;
    values.get(i..end)
}

pub fn moving_average(values: &[f64], window: usize) -> Vec<Metric> {
    (0..values.len())
        .map(|i| window_slice(values, i, window).map(mean))
        .collect()
}

/// Moving average over a series that may itself contain undefined entries.
/// A window holding any undefined entry is undefined.
pub fn moving_average_sparse(values: &[Metric], window: usize) -> Vec<Metric> {
    (0..values.len())
        .map(|i| {
            let slice = window_slice(values, i, window)?;
            let defined: Option<Vec<f64>> = slice.iter().copied().collect();
            defined.map(|v| mean(&v))
        })
        .collect()
}
