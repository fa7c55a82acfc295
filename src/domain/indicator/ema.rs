//! Exponential Moving Average over a most-recent-first series.
//!
//! alpha = 2/(n+1). The routine scans back from the end of the series to the
//! oldest defined entry `s`, seeds EMA[s-n] with the mean of entries
//! `s-n ..= s-1`, then walks toward index 0 with
//! EMA[i] = X[i]*alpha + EMA[i+1]*(1-alpha).
//! Every entry older than the seed is undefined.

use crate::domain::error::IndicatorError;
use crate::domain::indicator::Metric;
use crate::domain::indicator_helpers::mean;

pub fn calculate_ema(data: &[Metric], window: usize) -> Result<Vec<Metric>, IndicatorError> {
    if window == 0 {
        return Err(IndicatorError::ZeroWindow);
    }
    if data.len() < window {
        return Err(IndicatorError::InsufficientData {
            required: window,
            available: data.len(),
        });
    }

    let oldest_valid = data
        .iter()
        .rposition(Option::is_some)
        .ok_or(IndicatorError::InsufficientData {
            required: window,
            available: 0,
        })?;
    if oldest_valid < window {
        return Err(IndicatorError::InsufficientData {
            required: window + 1,
            available: oldest_valid + 1,
        });
    }

    let alpha = 2.0 / (window as f64 + 1.0);
    let seed_idx = oldest_valid - window;
    let mut ema: Vec<Metric> = vec![None; data.len()];

    let seed: Option<Vec<f64>> = data[seed_idx..oldest_valid].iter().copied().collect();
    ema[seed_idx] = seed.map(|v| mean(&v));

    for i in (0..seed_idx).rev() {
        ema[i] = match (data[i], ema[i + 1]) {
            (Some(x), Some(prev)) => Some(x * alpha + prev * (1.0 - alpha)),
            _ => None,
        };
    }

    Ok(ema)
}
