//! RSI (Relative Strength Index).
//!
//! Computed on a chronologically ascending copy of the closes, then mapped back
//! to most-recent-first order:
//! - gain/loss at step k = positive/negative part of C[k] - C[k-1]
//! - avg_gain, avg_loss = mean over the trailing n steps
//! - RSI = 100 - 100 / (1 + avg_gain / avg_loss); 100 if avg_loss == 0
//!
//! The first n entries in time are undefined.

use crate::domain::error::IndicatorError;
use crate::domain::indicator::Metric;

pub fn calculate_rsi(closes: &[f64], period: usize) -> Result<Vec<Metric>, IndicatorError> {
    if period == 0 {
        return Err(IndicatorError::ZeroWindow);
    }
    let len = closes.len();
    if len < period {
        return Err(IndicatorError::InsufficientData {
            required: period,
            available: len,
        });
    }

    let ascending: Vec<f64> = closes.iter().rev().copied().collect();

    let mut gains = vec![0.0; len];
    let mut losses = vec![0.0; len];
    for k in 1..len {
        let change = ascending[k] - ascending[k - 1];
        if change > 0.0 {
            gains[k] = change;
        } else {
            losses[k] = -change;
        }
    }

    let mut rsi: Vec<Metric> = vec![None; len];
    for k in period..len {
        let from = k + 1 - period;
        let avg_gain = gains[from..=k].iter().sum::<f64>() / period as f64;
        let avg_loss = losses[from..=k].iter().sum::<f64>() / period as f64;
        let value = if avg_loss == 0.0 {
            100.0
        } else {
            100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
        };
        rsi[len - 1 - k] = Some(value);
    }

    Ok(rsi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Newest-first closes from a chronological list.
    fn newest_first(chronological: &[f64]) -> Vec<f64> {
        chronological.iter().rev().copied().collect()
    }

    #[test]
    fn rsi_empty_series_fails() {
        assert_eq!(
            calculate_rsi(&[], 14),
            Err(IndicatorError::InsufficientData {
                required: 14,
                available: 0
            })
        );
    }

    #[test]
    fn rsi_zero_period() {
        assert_eq!(calculate_rsi(&[1.0, 2.0], 0), Err(IndicatorError::ZeroWindow));
    }

    #[test]
    fn rsi_length_equal_to_period_is_all_undefined() {
        let rsi = calculate_rsi(&[3.0, 2.0, 1.0], 3).unwrap();
        assert_eq!(rsi, vec![None, None, None]);
    }

    #[test]
    fn rsi_warmup_period() {
        let chronological: Vec<f64> = (1..=15).map(|i| 100.0 + (i as f64 % 5.0) * 2.0).collect();
        let rsi = calculate_rsi(&newest_first(&chronological), 14).unwrap();

        assert_eq!(rsi.len(), 15);
        assert!(rsi[0].is_some(), "latest day should be defined");
        for (i, v) in rsi.iter().enumerate().skip(1) {
            assert!(v.is_none(), "day {} should be undefined", i);
        }
    }

    #[test]
    fn rsi_all_gains_is_100() {
        let chronological: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let rsi = calculate_rsi(&newest_first(&chronological), 14).unwrap();

        let defined: Vec<f64> = rsi.iter().flatten().copied().collect();
        assert_eq!(defined.len(), 6);
        for v in defined {
            assert_eq!(v, 100.0);
        }
    }

    #[test]
    fn rsi_all_losses_is_0() {
        let chronological: Vec<f64> = (0..15).map(|i| 100.0 - i as f64).collect();
        let rsi = calculate_rsi(&newest_first(&chronological), 14).unwrap();
        assert_relative_eq!(rsi[0].unwrap(), 0.0);
    }

    #[test]
    fn rsi_known_window() {
        // steps: +2, -1, +2, -1 over the latest 4 changes
        let chronological = [10.0, 12.0, 11.0, 13.0, 12.0];
        let rsi = calculate_rsi(&newest_first(&chronological), 4).unwrap();
        // avg_gain = 1.0, avg_loss = 0.5, rs = 2 → 66.67
        assert_relative_eq!(rsi[0].unwrap(), 100.0 - 100.0 / 3.0, epsilon = 1e-9);
        assert!(rsi[1..].iter().all(Option::is_none));
    }

    #[test]
    fn rsi_in_range() {
        let chronological: Vec<f64> = (1..=40)
            .map(|i| 100.0 + (i as f64 % 7.0 - 3.0) * 2.0)
            .collect();
        let rsi = calculate_rsi(&newest_first(&chronological), 14).unwrap();

        for v in rsi.iter().flatten() {
            assert!((0.0..=100.0).contains(v), "RSI {} out of range", v);
        }
    }
}
