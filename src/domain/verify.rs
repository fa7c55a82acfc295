//! Recomputes close-price metrics from a written feature table and reports
//! how far the stored values are from the recalculated ones.
//!
//! The table only carries the rows that survived trimming, so its oldest rows
//! lack history and recalculate as undefined.

use crate::domain::decode::decode_number;
use crate::domain::engine::{EngineConfig, IndicatorEngine, MacdPair};
use crate::domain::error::FeatureError;
use crate::domain::indicator::Metric;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::record::{SeriesRecord, WindowMetrics};
use crate::domain::table::{decode_raw_row, FeatureTable, UNDEFINED_TOKEN};

pub const DEFAULT_TOLERANCE: f64 = 0.01;

/// (output label, table column prefix, field)
const CHECKS: [(&str, &str, fn(&WindowMetrics) -> Metric); 6] = [
    ("MovingAve", "MovingAve", |m| m.moving_average),
    ("Volatility", "Volatility", |m| m.volatility),
    ("HLVolatility", "HighLowVolatility", |m| m.high_low_volatility),
    ("ATR", "ATR", |m| m.atr),
    ("MADRate", "MADRate", |m| m.mad_rate),
    ("RSI", "RSI", |m| m.rsi),
];

#[derive(Debug, Clone, PartialEq)]
pub struct VerifyReport {
    /// Input table with `Recalc_*` and `Diff_*` columns appended.
    pub table: FeatureTable,
    /// Cells where both stored and recalculated values are defined.
    pub compared: usize,
    /// Compared cells whose absolute difference exceeds the tolerance.
    pub mismatches: usize,
}

pub fn verify_table(table: &FeatureTable, tolerance: f64) -> Result<VerifyReport, FeatureError> {
    let price_columns = ["date", "opening", "high", "low", "closing"]
        .iter()
        .map(|name| {
            table.column_index(name).ok_or_else(|| FeatureError::Csv {
                file: "feature table".into(),
                reason: format!("missing column '{name}'"),
            })
        })
        .collect::<Result<Vec<usize>, FeatureError>>()?;

    let windows = detect_windows(&table.header);
    if windows.is_empty() {
        return Err(FeatureError::Csv {
            file: "feature table".into(),
            reason: "no MovingAve columns to verify".into(),
        });
    }

    // (row index, bar), oldest first as stored
    let decoded: Vec<(usize, OhlcvBar)> = table
        .rows
        .iter()
        .enumerate()
        .filter_map(|(idx, row)| {
            let fields: Vec<&str> = price_columns
                .iter()
                .map(|&c| row.get(c).map_or("", String::as_str))
                .collect();
            decode_raw_row(&fields, idx + 2).map(|bar| (idx, bar))
        })
        .collect();

    let bars: Vec<OhlcvBar> = decoded.iter().rev().map(|(_, bar)| bar.clone()).collect();
    let records = recalculate(bars, &windows);

    let mut recalculated: Vec<Option<&SeriesRecord>> = vec![None; table.rows.len()];
    for ((idx, _), record) in decoded.iter().zip(records.iter().rev()) {
        recalculated[*idx] = Some(record);
    }

    let mut header = table.header.clone();
    for kind in ["Recalc", "Diff"] {
        for (label, _, _) in CHECKS {
            header.extend(windows.iter().map(|w| format!("{kind}_{label}{w}")));
        }
    }

    let mut compared = 0;
    let mut mismatches = 0;
    let mut rows = Vec::with_capacity(table.rows.len());
    for (row, record) in table.rows.iter().zip(&recalculated) {
        let mut recalc_cells = Vec::new();
        let mut diff_cells = Vec::new();
        for (_, prefix, pick) in CHECKS {
            for &w in &windows {
                let fresh = record.and_then(|r| r.window(w)).and_then(pick);
                let stored = table
                    .column_index(&format!("{prefix}{w}"))
                    .and_then(|c| row.get(c))
                    .and_then(|cell| stored_value(cell));
                let diff = stored.zip(fresh).map(|(s, f)| s - f);
                if let Some(d) = diff {
                    compared += 1;
                    if d.abs() > tolerance {
                        mismatches += 1;
                    }
                }
                recalc_cells.push(format_two(fresh));
                diff_cells.push(format_two(diff));
            }
        }
        let mut out = row.clone();
        out.extend(recalc_cells);
        out.extend(diff_cells);
        rows.push(out);
    }

    tracing::info!(rows = rows.len(), compared, mismatches, "verification complete");
    Ok(VerifyReport {
        table: FeatureTable { header, rows },
        compared,
        mismatches,
    })
}

/// Windows named by `MovingAve{w}` columns, in header order.
pub fn detect_windows(header: &[String]) -> Vec<usize> {
    header
        .iter()
        .filter_map(|h| h.strip_prefix("MovingAve")?.parse().ok())
        .filter(|&w: &usize| w > 0)
        .collect()
}

fn recalculate(bars: Vec<OhlcvBar>, windows: &[usize]) -> Vec<SeriesRecord> {
    let shortest = windows.iter().copied().min().unwrap_or(1);
    let longest = windows.iter().copied().max().unwrap_or(1);
    let pair = MacdPair {
        fast: shortest,
        slow: longest,
    };
    let engine = IndicatorEngine::new(EngineConfig {
        windows: windows.to_vec(),
        include_volume_metrics: false,
        short_macd: pair,
        long_macd: pair,
        ..EngineConfig::default()
    });
    engine.enrich_bars(bars)
}

fn stored_value(cell: &str) -> Metric {
    if cell.trim() == UNDEFINED_TOKEN {
        return None;
    }
    match decode_number(cell) {
        (v, true) if v.is_finite() => Some(v),
        _ => None,
    }
}

fn format_two(m: Metric) -> String {
    m.map_or_else(|| UNDEFINED_TOKEN.to_string(), |v| format!("{v:.2}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::table::TableLayout;
    use chrono::{Duration, NaiveDate};
    use std::collections::HashMap;

    fn written_table(days: usize) -> FeatureTable {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut bars: Vec<OhlcvBar> = (0..days)
            .map(|i| {
                let close = 100.0 + (i % 7) as f64;
                OhlcvBar {
                    date: start + Duration::days(i as i64),
                    open: close,
                    high: close + 2.0,
                    low: close - 1.0,
                    close,
                    volume: None,
                }
            })
            .collect();
        bars.reverse();
        let config = EngineConfig {
            windows: vec![5],
            include_volume_metrics: false,
            short_macd: MacdPair { fast: 5, slow: 5 },
            long_macd: MacdPair { fast: 5, slow: 5 },
            ..EngineConfig::default()
        };
        let records = IndicatorEngine::new(config.clone()).enrich_bars(bars);
        TableLayout::new(&config, Vec::new()).render(&records, None, &HashMap::new())
    }

    #[test]
    fn detects_windows_from_header() {
        let header: Vec<String> = ["date", "MovingAve5", "MovingAve14", "MovingAveX", "EMA5"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(detect_windows(&header), vec![5, 14]);
    }

    #[test]
    fn untouched_table_has_no_mismatches() {
        let table = written_table(20);
        let report = verify_table(&table, DEFAULT_TOLERANCE).unwrap();

        assert!(report.compared > 0);
        assert_eq!(report.mismatches, 0);
        assert!(report.table.header.contains(&"Recalc_MovingAve5".to_string()));
        assert!(report.table.header.contains(&"Diff_RSI5".to_string()));
        let diff = report.table.column_index("Diff_MovingAve5").unwrap();
        assert_eq!(report.table.rows[19][diff], "0.00");
        // oldest row has no history
        let recalc = report.table.column_index("Recalc_MovingAve5").unwrap();
        assert_eq!(report.table.rows[0][recalc], UNDEFINED_TOKEN);
    }

    #[test]
    fn tampered_cell_is_reported() {
        let mut table = written_table(20);
        let ma = table.column_index("MovingAve5").unwrap();
        table.rows[19][ma] = "999.00000".into();

        let report = verify_table(&table, DEFAULT_TOLERANCE).unwrap();
        assert_eq!(report.mismatches, 1);
    }

    #[test]
    fn missing_price_column_is_an_error() {
        let table = FeatureTable {
            header: vec!["date".into(), "MovingAve5".into()],
            rows: Vec::new(),
        };
        assert!(matches!(
            verify_table(&table, DEFAULT_TOLERANCE),
            Err(FeatureError::Csv { .. })
        ));
    }
}
