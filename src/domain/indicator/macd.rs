//! MACD over two moving-average series.
//!
//! MACD[i] = Short[i] - Long[i]
//! SMA signal[i] = mean(MACD[i..i+n]); undefined if any of those n entries is
//! undefined or out of range.
//! EMA signal = EMA(n) of the MACD series (see [`calculate_ema`]).
//! Histogram = MACD - signal, for either signal flavour.

use crate::domain::error::IndicatorError;
use crate::domain::indicator::{calculate_ema, moving_average_sparse, undefined_series, Metric};

pub const DEFAULT_SIGNAL: usize = 9;

#[derive(Debug, Clone, PartialEq)]
pub struct MacdSeries {
    pub value: Vec<Metric>,
    pub sma_signal: Vec<Metric>,
    pub sma_histogram: Vec<Metric>,
    pub ema_signal: Vec<Metric>,
    pub ema_histogram: Vec<Metric>,
}

impl MacdSeries {
    /// A series of `len` rows with every field undefined.
    pub fn undefined(len: usize) -> Self {
        Self {
            value: undefined_series(len),
            sma_signal: undefined_series(len),
            sma_histogram: undefined_series(len),
            ema_signal: undefined_series(len),
            ema_histogram: undefined_series(len),
        }
    }
}

pub fn calculate_macd(
    short: &[Metric],
    long: &[Metric],
    signal_period: usize,
) -> Result<MacdSeries, IndicatorError> {
    if short.len() != long.len() {
        return Err(IndicatorError::LengthMismatch {
            left: short.len(),
            right: long.len(),
        });
    }
    if signal_period == 0 {
        return Err(IndicatorError::ZeroWindow);
    }

    let value: Vec<Metric> = short
        .iter()
        .zip(long)
        .map(|(s, l)| Some((*s)? - (*l)?))
        .collect();

    let sma_signal = moving_average_sparse(&value, signal_period);
    let sma_histogram = histogram(&value, &sma_signal);

    let ema_signal = match calculate_ema(&value, signal_period) {
        Ok(ema) => ema,
        Err(e) => {
            tracing::debug!(error = %e, "MACD EMA signal undefined");
            undefined_series(value.len())
        }
    };
    let ema_histogram = histogram(&value, &ema_signal);

    Ok(MacdSeries {
        value,
        sma_signal,
        sma_histogram,
        ema_signal,
        ema_histogram,
    })
}

fn histogram(value: &[Metric], signal: &[Metric]) -> Vec<Metric> {
    value
        .iter()
        .zip(signal)
        .map(|(v, s)| Some((*v)? - (*s)?))
        .collect()
}
