//! Indicator engine: enriches a reconciled, most-recent-first series in place.

use std::collections::HashMap;

use crate::domain::indicator::{
    average_true_range, bollinger_bands, calculate_ema, calculate_macd, calculate_rsi,
    moving_average, moving_average_sparse, undefined_series, volatility, MacdSeries, Metric,
};
use crate::domain::indicator_helpers::{mad_rate, mad_rates, ratio_or_zero};
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::record::{
    records_from_bars, MacdBlock, SeriesRecord, VolumeMetrics, VolumeWindowMetrics,
    WindowMetrics,
};

pub const DEFAULT_WINDOWS: [usize; 3] = [5, 14, 30];
pub const DEFAULT_MACD_SIGNAL: usize = crate::domain::indicator::macd::DEFAULT_SIGNAL;
pub const DEFAULT_BOLLINGER_K: f64 = 2.0;

/// The two moving-average windows a MACD block spreads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacdPair {
    pub fast: usize,
    pub slow: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Lookback windows, iterated in this order for every output group.
    pub windows: Vec<usize>,
    pub macd_signal_period: usize,
    pub include_volume_metrics: bool,
    pub bollinger_k: f64,
    pub short_macd: MacdPair,
    pub long_macd: MacdPair,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            windows: DEFAULT_WINDOWS.to_vec(),
            macd_signal_period: DEFAULT_MACD_SIGNAL,
            include_volume_metrics: true,
            bollinger_k: DEFAULT_BOLLINGER_K,
            short_macd: MacdPair { fast: 5, slow: 30 },
            long_macd: MacdPair { fast: 14, slow: 30 },
        }
    }
}

impl EngineConfig {
    pub fn longest_window(&self) -> usize {
        self.windows.iter().copied().max().unwrap_or(0)
    }

    /// Number of oldest rows that can never carry a fully defined
    /// long-window MACD signal.
    pub fn trim_length(&self) -> usize {
        (self.longest_window() + self.macd_signal_period).saturating_sub(1)
    }
}

pub struct IndicatorEngine {
    config: EngineConfig,
}

impl IndicatorEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Wrap bars (most recent first) into records and enrich them.
    pub fn enrich_bars(&self, bars: Vec<OhlcvBar>) -> Vec<SeriesRecord> {
        let mut records = records_from_bars(bars, &self.config.windows);
        self.enrich(&mut records);
        records
    }

    /// Populate every derived field. Records must be sorted most recent first.
    pub fn enrich(&self, records: &mut [SeriesRecord]) {
        let bars: Vec<OhlcvBar> = records.iter().map(|r| r.bar.clone()).collect();
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let ranges: Vec<f64> = bars.iter().map(OhlcvBar::range).collect();
        let close_metrics: Vec<Metric> = closes.iter().copied().map(Some).collect();

        let mut averages: HashMap<usize, Vec<Metric>> = HashMap::new();

        for record in records.iter_mut() {
            record.windows = self
                .config
                .windows
                .iter()
                .map(|&w| WindowMetrics::undefined(w))
                .collect();
        }

        for (slot, &window) in self.config.windows.iter().enumerate() {
            let ma = moving_average(&closes, window);
            let vol = volatility(&closes, &ma, window);
            let high_low = moving_average(&ranges, window);
            let atr = average_true_range(&bars, window);
            let mad = mad_rates(&closes, &ma);
            let bands = bollinger_bands(&ma, &vol, self.config.bollinger_k);

            let rsi = calculate_rsi(&closes, window).unwrap_or_else(|e| {
                tracing::warn!(window, error = %e, "RSI undefined for window");
                undefined_series(closes.len())
            });
            let ema = calculate_ema(&close_metrics, window).unwrap_or_else(|e| {
                tracing::warn!(window, error = %e, "EMA undefined for window");
                undefined_series(closes.len())
            });

            for (i, record) in records.iter_mut().enumerate() {
                record.windows[slot] = WindowMetrics {
                    window,
                    moving_average: ma[i],
                    ema: ema[i],
                    volatility: vol[i],
                    high_low_volatility: high_low[i],
                    atr: atr[i],
                    upper_band: bands[i].upper,
                    lower_band: bands[i].lower,
                    mad_rate: mad[i],
                    rsi: rsi[i],
                };
            }

            averages.insert(window, ma);
        }

        let short = self.macd_for(&averages, self.config.short_macd, records.len());
        let long = self.macd_for(&averages, self.config.long_macd, records.len());
        for (i, record) in records.iter_mut().enumerate() {
            record.short_macd = macd_block(&short, i);
            record.long_macd = macd_block(&long, i);
        }

        if self.config.include_volume_metrics {
            self.enrich_volume(records);
        } else {
            for record in records.iter_mut() {
                record.volume = None;
            }
        }

        tracing::debug!(rows = records.len(), "enrichment complete");
    }

    fn macd_for(
        &self,
        averages: &HashMap<usize, Vec<Metric>>,
        pair: MacdPair,
        len: usize,
    ) -> MacdSeries {
        let (Some(fast), Some(slow)) = (averages.get(&pair.fast), averages.get(&pair.slow)) else {
            tracing::warn!(
                fast = pair.fast,
                slow = pair.slow,
                "MACD window not configured; leaving MACD undefined"
            );
            return MacdSeries::undefined(len);
        };
        calculate_macd(fast, slow, self.config.macd_signal_period).unwrap_or_else(|e| {
            tracing::warn!(fast = pair.fast, slow = pair.slow, error = %e, "MACD undefined");
            MacdSeries::undefined(len)
        })
    }

    fn enrich_volume(&self, records: &mut [SeriesRecord]) {
        let volumes: Vec<Metric> = records.iter().map(|r| r.bar.volume).collect();
        let len = volumes.len();

        let change_rates: Vec<Metric> = (0..len)
            .map(|i| {
                let current = volumes[i]?;
                let previous = (*volumes.get(i + 1)?)?;
                Some(ratio_or_zero(current - previous, previous))
            })
            .collect();

        let mut per_window: Vec<Vec<VolumeWindowMetrics>> = vec![Vec::new(); len];
        for &window in &self.config.windows {
            let vma = moving_average_sparse(&volumes, window);
            let ema = calculate_ema(&volumes, window).unwrap_or_else(|e| {
                tracing::warn!(window, error = %e, "volume EMA undefined for window");
                undefined_series(len)
            });

            for i in 0..len {
                let pair = volumes[i].zip(vma[i]);
                per_window[i].push(VolumeWindowMetrics {
                    window,
                    moving_average: vma[i],
                    ratio: pair.map(|(v, avg)| ratio_or_zero(v, avg)),
                    ema: ema[i],
                    mad_rate: pair.map(|(v, avg)| mad_rate(v, avg)),
                });
            }
        }

        let rows = records.iter_mut().zip(change_rates).zip(per_window);
        for ((record, change_rate), windows) in rows {
            record.volume = Some(VolumeMetrics {
                change_rate,
                windows,
            });
        }
    }
}

fn macd_block(series: &MacdSeries, i: usize) -> MacdBlock {
    MacdBlock {
        value: series.value[i],
        sma_signal: series.sma_signal[i],
        sma_histogram: series.sma_histogram[i],
        ema_signal: series.ema_signal[i],
        ema_histogram: series.ema_histogram[i],
    }
}

/// Drop the oldest rows that cannot carry a fully defined long-window signal.
/// Returns how many rows were removed.
pub fn trim_unstable_tail(records: &mut Vec<SeriesRecord>, config: &EngineConfig) -> usize {
    let before = records.len();
    records.truncate(before.saturating_sub(config.trim_length()));
    before - records.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDate};

    /// Newest-first bars from chronological closes, one day apart.
    fn bars_from_closes(chronological: &[f64]) -> Vec<OhlcvBar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut bars: Vec<OhlcvBar> = chronological
            .iter()
            .enumerate()
            .map(|(i, &close)| OhlcvBar {
                date: start + Duration::days(i as i64),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: Some(1000.0 + i as f64 * 10.0),
            })
            .collect();
        bars.reverse();
        bars
    }

    #[test]
    fn concrete_five_day_window() {
        let engine = IndicatorEngine::new(EngineConfig {
            windows: vec![5],
            short_macd: MacdPair { fast: 5, slow: 5 },
            long_macd: MacdPair { fast: 5, slow: 5 },
            ..EngineConfig::default()
        });
        let records = engine.enrich_bars(bars_from_closes(&[10.0, 11.0, 12.0, 13.0, 14.0]));

        let latest = records[0].window(5).unwrap();
        assert_relative_eq!(latest.moving_average.unwrap(), 12.0);
        assert_relative_eq!(latest.volatility.unwrap(), 1.414_213_562, epsilon = 1e-9);
        assert_relative_eq!(latest.mad_rate.unwrap(), 16.666_666_7, epsilon = 1e-6);
        assert_relative_eq!(latest.high_low_volatility.unwrap(), 2.0);
        assert_relative_eq!(
            latest.upper_band.unwrap(),
            12.0 + 2.0 * 2.0_f64.sqrt(),
            epsilon = 1e-9
        );
        // ATR needs a sixth (older) day
        assert!(latest.atr.is_none());
        assert!(records[1].window(5).unwrap().moving_average.is_none());
    }

    #[test]
    fn short_series_is_entirely_undefined() {
        let engine = IndicatorEngine::new(EngineConfig::default());
        let records = engine.enrich_bars(bars_from_closes(&[1.0, 2.0, 3.0, 4.0]));

        for record in &records {
            for w in &record.windows {
                assert!(w.moving_average.is_none());
                assert!(w.volatility.is_none());
                assert!(w.atr.is_none());
                assert!(w.rsi.is_none());
                assert!(w.ema.is_none());
            }
            assert_eq!(record.short_macd, MacdBlock::default());
            assert_eq!(record.long_macd, MacdBlock::default());
        }
    }

    #[test]
    fn constant_closes_have_zero_volatility_and_mad() {
        let engine = IndicatorEngine::new(EngineConfig::default());
        let records = engine.enrich_bars(bars_from_closes(&[25.0; 60]));

        for record in &records {
            for w in &record.windows {
                if let Some(v) = w.volatility {
                    assert_eq!(v, 0.0);
                }
                if let Some(m) = w.mad_rate {
                    assert_eq!(m, 0.0);
                }
            }
        }
        assert!(records[0].window(30).unwrap().volatility.is_some());
    }

    #[test]
    fn macd_blocks_use_configured_pairs() {
        let closes: Vec<f64> = (0..80).map(|i| 100.0 + (i as f64 * 0.3).sin() * 5.0).collect();
        let engine = IndicatorEngine::new(EngineConfig::default());
        let records = engine.enrich_bars(bars_from_closes(&closes));

        let latest = &records[0];
        let ma5 = latest.window(5).unwrap().moving_average.unwrap();
        let ma14 = latest.window(14).unwrap().moving_average.unwrap();
        let ma30 = latest.window(30).unwrap().moving_average.unwrap();
        assert_relative_eq!(latest.short_macd.value.unwrap(), ma5 - ma30, epsilon = 1e-12);
        assert_relative_eq!(latest.long_macd.value.unwrap(), ma14 - ma30, epsilon = 1e-12);
        assert!(latest.short_macd.sma_signal.is_some());
        assert!(latest.long_macd.ema_signal.is_some());
    }

    #[test]
    fn trimmed_rows_have_defined_long_signal() {
        let closes: Vec<f64> = (0..70).map(|i| 50.0 + (i % 9) as f64).collect();
        let config = EngineConfig::default();
        let engine = IndicatorEngine::new(config.clone());
        let mut records = engine.enrich_bars(bars_from_closes(&closes));

        let dropped = trim_unstable_tail(&mut records, &config);
        assert_eq!(dropped, 38);
        assert_eq!(records.len(), 32);
        for record in &records {
            assert!(record.long_macd.sma_signal.is_some());
            assert!(record.window(30).unwrap().moving_average.is_some());
        }
    }

    #[test]
    fn trim_empties_short_series() {
        let config = EngineConfig::default();
        let engine = IndicatorEngine::new(config.clone());
        let mut records = engine.enrich_bars(bars_from_closes(&[1.0; 20]));
        assert_eq!(trim_unstable_tail(&mut records, &config), 20);
        assert!(records.is_empty());
    }

    #[test]
    fn volume_metrics_when_enabled() {
        let engine = IndicatorEngine::new(EngineConfig {
            windows: vec![3],
            short_macd: MacdPair { fast: 3, slow: 3 },
            long_macd: MacdPair { fast: 3, slow: 3 },
            ..EngineConfig::default()
        });
        let records = engine.enrich_bars(bars_from_closes(&[1.0, 2.0, 3.0, 4.0]));

        // volumes newest first: 1030, 1020, 1010, 1000
        let volume = records[0].volume.as_ref().unwrap();
        assert_relative_eq!(volume.change_rate.unwrap(), 10.0 / 1020.0);
        let w3 = records[0].volume_window(3).unwrap();
        assert_relative_eq!(w3.moving_average.unwrap(), 1020.0);
        assert_relative_eq!(w3.ratio.unwrap(), 1030.0 / 1020.0);
        assert!(records[3].volume.as_ref().unwrap().change_rate.is_none());
    }

    #[test]
    fn volume_metrics_absent_when_disabled() {
        let engine = IndicatorEngine::new(EngineConfig {
            include_volume_metrics: false,
            ..EngineConfig::default()
        });
        let records = engine.enrich_bars(bars_from_closes(&[1.0; 10]));
        assert!(records.iter().all(|r| r.volume.is_none()));
    }

    #[test]
    fn missing_macd_window_leaves_macd_undefined() {
        let engine = IndicatorEngine::new(EngineConfig {
            windows: vec![5],
            ..EngineConfig::default()
        });
        let records = engine.enrich_bars(bars_from_closes(&[3.0; 50]));
        assert!(records[0].short_macd.value.is_none());
        assert!(records[0].window(5).unwrap().moving_average.is_some());
    }

    #[test]
    fn trim_length_default() {
        assert_eq!(EngineConfig::default().trim_length(), 38);
    }
}
