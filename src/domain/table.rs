//! Rendering of enriched records into the feature table, and the raw series
//! row format.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};

use crate::domain::decode::{decode_date, decode_number, decode_optional_number, format_date};
use crate::domain::engine::EngineConfig;
use crate::domain::forecast::ForecastRecord;
use crate::domain::indicator::Metric;
use crate::domain::macro_series::MacroTable;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::record::{MacdBlock, SeriesRecord, VolumeWindowMetrics, WindowMetrics};

pub const UNDEFINED_TOKEN: &str = "NaN";
pub const RAW_HEADER: [&str; 6] = ["date", "opening", "high", "low", "closing", "volume"];

/// Instrument classes differ in whether volume is meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrumentClass {
    Equity,
    CurrencyPair,
}

impl InstrumentClass {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "equity" | "stock" => Some(Self::Equity),
            "currency_pair" | "currency" | "fx" => Some(Self::CurrencyPair),
            _ => None,
        }
    }

    pub fn has_volume(self) -> bool {
        matches!(self, Self::Equity)
    }
}

/// A header plus string rows, ready for any tabular sink.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl FeatureTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }
}

/// Column set of the feature table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableLayout {
    pub windows: Vec<usize>,
    pub include_volume: bool,
    pub macro_columns: Vec<String>,
}

const PRICE_GROUPS: [&str; 7] = [
    "MovingAve",
    "EMA",
    "Volatility",
    "HighLowVolatility",
    "ATR",
    "MADRate",
    "RSI",
];
const VOLUME_GROUPS: [&str; 4] = ["VMovingAve", "VolumeRatio", "VolumeEMA", "VolumeMADRate"];
const MACD_FIELDS: [&str; 5] = [
    "MACD",
    "MACDSignalSMA",
    "MACDHistoSMA",
    "MACDSignalEMA",
    "MACDHistoEMA",
];

impl TableLayout {
    pub fn new(engine: &EngineConfig, macro_columns: Vec<String>) -> Self {
        Self {
            windows: engine.windows.clone(),
            include_volume: engine.include_volume_metrics,
            macro_columns,
        }
    }

    pub fn header(&self) -> Vec<String> {
        let mut header: Vec<String> = ["date", "DayOfWeek", "opening", "high", "low", "closing"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        if self.include_volume {
            header.push("volume".into());
            header.push("VCR".into());
            header.extend(self.grouped(&VOLUME_GROUPS));
        }
        header.extend(self.macro_columns.iter().cloned());
        header.extend(self.grouped(&PRICE_GROUPS));
        for prefix in ["short", "long"] {
            header.extend(MACD_FIELDS.iter().map(|f| format!("{prefix}{f}")));
        }
        header.extend(self.grouped(&["upperBBand", "underBBand"]));
        header.push("PredictedClose".into());
        header.push("PredictionError".into());
        header
    }

    fn grouped<'a>(&'a self, groups: &'a [&'a str]) -> impl Iterator<Item = String> + 'a {
        groups
            .iter()
            .flat_map(move |g| self.windows.iter().map(move |w| format!("{g}{w}")))
    }

    /// Render records (most recent first) as table rows, oldest first.
    pub fn render(
        &self,
        records: &[SeriesRecord],
        macros: Option<&MacroTable>,
        forecasts: &HashMap<NaiveDate, ForecastRecord>,
    ) -> FeatureTable {
        let rows = records
            .iter()
            .rev()
            .map(|r| self.render_row(r, macros, forecasts.get(&r.bar.date)))
            .collect();
        FeatureTable {
            header: self.header(),
            rows,
        }
    }

    fn render_row(
        &self,
        record: &SeriesRecord,
        macros: Option<&MacroTable>,
        forecast: Option<&ForecastRecord>,
    ) -> Vec<String> {
        let bar = &record.bar;
        let mut row = vec![
            format_date(bar.date),
            bar.date.weekday().num_days_from_sunday().to_string(),
            format_value(bar.open),
            format_value(bar.high),
            format_value(bar.low),
            format_value(bar.close),
        ];

        if self.include_volume {
            let volume = record.volume.as_ref();
            row.push(format_metric(bar.volume));
            row.push(format_metric(volume.and_then(|v| v.change_rate)));
            let per_window = |pick: fn(&VolumeWindowMetrics) -> Metric| {
                self.windows
                    .iter()
                    .map(|&w| format_metric(record.volume_window(w).and_then(pick)))
                    .collect::<Vec<_>>()
            };
            row.extend(per_window(|m| m.moving_average));
            row.extend(per_window(|m| m.ratio));
            row.extend(per_window(|m| m.ema));
            row.extend(per_window(|m| m.mad_rate));
        }

        for column in &self.macro_columns {
            row.push(format_metric(
                macros.and_then(|table| table.value(column, bar.date)),
            ));
        }

        let pickers: [fn(&WindowMetrics) -> Metric; 7] = [
            |m| m.moving_average,
            |m| m.ema,
            |m| m.volatility,
            |m| m.high_low_volatility,
            |m| m.atr,
            |m| m.mad_rate,
            |m| m.rsi,
        ];
        for pick in pickers {
            row.extend(self.window_cells(record, pick));
        }

        row.extend(macd_cells(&record.short_macd));
        row.extend(macd_cells(&record.long_macd));
        row.extend(self.window_cells(record, |m| m.upper_band));
        row.extend(self.window_cells(record, |m| m.lower_band));

        row.push(format_forecast(forecast.and_then(|f| f.predicted_close)));
        row.push(format_forecast(forecast.and_then(|f| f.prediction_error)));
        row
    }

    fn window_cells(&self, record: &SeriesRecord, pick: fn(&WindowMetrics) -> Metric) -> Vec<String> {
        self.windows
            .iter()
            .map(|&w| format_metric(record.window(w).and_then(pick)))
            .collect()
    }
}

fn macd_cells(block: &MacdBlock) -> [String; 5] {
    [
        format_metric(block.value),
        format_metric(block.sma_signal),
        format_metric(block.sma_histogram),
        format_metric(block.ema_signal),
        format_metric(block.ema_histogram),
    ]
}

pub fn format_value(v: f64) -> String {
    format!("{v:.5}")
}

/// Five decimals, or the undefined token.
pub fn format_metric(m: Metric) -> String {
    m.map_or_else(|| UNDEFINED_TOKEN.to_string(), format_value)
}

/// Seven decimals, blank when absent.
pub fn format_forecast(m: Option<f64>) -> String {
    m.map(|v| format!("{v:.7}")).unwrap_or_default()
}

/// One raw series row in [`RAW_HEADER`] order.
pub fn encode_raw_row(bar: &OhlcvBar) -> Vec<String> {
    vec![
        format_date(bar.date),
        format_value(bar.open),
        format_value(bar.high),
        format_value(bar.low),
        format_value(bar.close),
        bar.volume.map(format_value).unwrap_or_default(),
    ]
}

/// Decode one raw series row. Undecodable numbers fall back to zero with a
/// warning. `None` when the date is unusable, so the row is skipped.
pub fn decode_raw_row(fields: &[&str], line: usize) -> Option<OhlcvBar> {
    let date_field = fields.first().copied().unwrap_or_default();
    let Some(date) = decode_date(date_field) else {
        tracing::warn!(line, value = date_field, "undecodable date; row skipped");
        return None;
    };

    let number = |idx: usize, name: &str| {
        let field = fields.get(idx).copied().unwrap_or_default();
        let (value, ok) = decode_number(field);
        if !ok {
            tracing::warn!(line, column = name, value = field, "undecodable number; using 0");
        }
        value
    };
    let open = number(1, "opening");
    let high = number(2, "high");
    let low = number(3, "low");
    let close = number(4, "closing");

    let volume_field = fields.get(5).copied().unwrap_or_default();
    let volume = match decode_optional_number(volume_field) {
        (v, true) => v,
        (v, false) => {
            tracing::warn!(line, column = "volume", value = volume_field, "undecodable number; using 0");
            v
        }
    };

    Some(OhlcvBar {
        date,
        open,
        high,
        low,
        close,
        volume,
    })
}
