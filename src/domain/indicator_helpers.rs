//! Shared numeric helpers for indicator calculations.

use crate::domain::indicator::Metric;

/// Arithmetic mean. Returns 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation around a precomputed mean (divides by n).
/// Returns 0.0 for an empty slice.
pub fn population_stddev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = values
        .iter()
        .map(|v| {
            let d = v - mean;
            d * d
        })
        .sum();
    (sum_sq / values.len() as f64).sqrt()
}

/// Percentage deviation of `value` from `average`; 0.0 when the average is exactly 0.
pub fn mad_rate(value: f64, average: f64) -> f64 {
    if average == 0.0 {
        return 0.0;
    }
    (value - average) / average * 100.0
}

/// `numerator / denominator`, 0.0 when the denominator is exactly 0.
pub fn ratio_or_zero(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    numerator / denominator
}

/// MAD rate of each value against its average; undefined wherever the average is.
pub fn mad_rates(values: &[f64], averages: &[Metric]) -> Vec<Metric> {
    values
        .iter()
        .zip(averages)
        .map(|(&v, avg)| avg.map(|a| mad_rate(v, a)))
        .collect()
}
