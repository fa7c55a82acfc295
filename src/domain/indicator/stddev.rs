//! Volatility as population standard deviation of close.
//!
//! VOL(w)[i] = sqrt(sum((C[i+j] - MA(w)[i])^2 for j in 0..w) / w)
//! Undefined wherever MA(w)[i] is.

use crate::domain::indicator::{window_slice, Metric};
use crate::domain::indicator_helpers::population_stddev;

pub fn volatility(closes: &[f64], averages: &[Metric], window: usize) -> Vec<Metric> {
    (0..closes.len())
        .map(|i| {
            let avg = averages.get(i).copied().flatten()?;
            let slice = window_slice(closes, i, window)?;
            Some(population_stddev(slice, avg))
        })
        .collect()
}
