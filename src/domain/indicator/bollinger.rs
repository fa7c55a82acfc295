//! Bollinger Bands.
//!
//! Upper = MA(w) + k * VOL(w), Lower = MA(w) - k * VOL(w).
//! Undefined wherever either input is.

use crate::domain::indicator::Metric;

pub const DEFAULT_K: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bands {
    pub upper: Metric,
    pub lower: Metric,
}

pub fn bollinger_bands(averages: &[Metric], volatilities: &[Metric], k: f64) -> Vec<Bands> {
    averages
        .iter()
        .zip(volatilities)
        .map(|(ma, vol)| match (ma, vol) {
            (Some(m), Some(v)) => Bands {
                upper: Some(m + k * v),
                lower: Some(m - k * v),
            },
            _ => Bands::default(),
        })
        .collect()
}
