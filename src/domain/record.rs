//! Enriched series record: one day's bar plus every derived field.

use crate::domain::indicator::Metric;
use crate::domain::ohlcv::OhlcvBar;

/// Close-price metrics for one lookback window.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WindowMetrics {
    pub window: usize,
    pub moving_average: Metric,
    pub ema: Metric,
    pub volatility: Metric,
    pub high_low_volatility: Metric,
    pub atr: Metric,
    pub upper_band: Metric,
    pub lower_band: Metric,
    pub mad_rate: Metric,
    pub rsi: Metric,
}

impl WindowMetrics {
    pub fn undefined(window: usize) -> Self {
        Self {
            window,
            ..Self::default()
        }
    }
}

/// Volume metrics for one lookback window.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VolumeWindowMetrics {
    pub window: usize,
    pub moving_average: Metric,
    pub ratio: Metric,
    pub ema: Metric,
    pub mad_rate: Metric,
}

impl VolumeWindowMetrics {
    pub fn undefined(window: usize) -> Self {
        Self {
            window,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct VolumeMetrics {
    pub change_rate: Metric,
    pub windows: Vec<VolumeWindowMetrics>,
}

/// One MACD block: raw spread plus SMA- and EMA-smoothed signals.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MacdBlock {
    pub value: Metric,
    pub sma_signal: Metric,
    pub sma_histogram: Metric,
    pub ema_signal: Metric,
    pub ema_histogram: Metric,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesRecord {
    pub bar: OhlcvBar,
    /// One entry per configured window, in configured order.
    pub windows: Vec<WindowMetrics>,
    pub short_macd: MacdBlock,
    pub long_macd: MacdBlock,
    /// Present only when volume metrics are enabled.
    pub volume: Option<VolumeMetrics>,
}

impl SeriesRecord {
    /// A record with every derived field undefined.
    pub fn new(bar: OhlcvBar, windows: &[usize]) -> Self {
        Self {
            bar,
            windows: windows.iter().map(|&w| WindowMetrics::undefined(w)).collect(),
            short_macd: MacdBlock::default(),
            long_macd: MacdBlock::default(),
            volume: None,
        }
    }

    pub fn window(&self, window: usize) -> Option<&WindowMetrics> {
        self.windows.iter().find(|m| m.window == window)
    }

    pub fn volume_window(&self, window: usize) -> Option<&VolumeWindowMetrics> {
        self.volume
            .as_ref()?
            .windows
            .iter()
            .find(|m| m.window == window)
    }
}

/// Wrap bars into records with undefined derived fields.
pub fn records_from_bars(bars: Vec<OhlcvBar>, windows: &[usize]) -> Vec<SeriesRecord> {
    bars.into_iter()
        .map(|bar| SeriesRecord::new(bar, windows))
        .collect()
}
