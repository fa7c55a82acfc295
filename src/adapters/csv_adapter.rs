//! CSV file storage: raw series, feature tables and macro tables.

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::decode::{decode_date, decode_optional_number, format_date};
use crate::domain::error::FeatureError;
use crate::domain::indicator::Metric;
use crate::domain::macro_series::MacroTable;
use crate::domain::ohlcv::{sort_descending, OhlcvBar};
use crate::domain::pipeline::TABLE_FILE_NAME;
use crate::domain::table::{decode_raw_row, encode_raw_row, format_metric, FeatureTable, RAW_HEADER};
use crate::ports::series_port::{RawSeriesPort, TableSinkPort};

pub const RAW_FILE_NAME: &str = "RawData.csv";
pub const RAW_BACKUP_FILE_NAME: &str = "RawData_bef.csv";

/// Per-instrument files under `<resource_dir>/<code>/`.
pub struct CsvSeriesStore {
    resource_dir: PathBuf,
}

impl CsvSeriesStore {
    pub fn new(resource_dir: PathBuf) -> Self {
        Self { resource_dir }
    }

    fn instrument_dir(&self, code: &str) -> PathBuf {
        self.resource_dir.join(code)
    }

    pub fn raw_file(&self, code: &str) -> PathBuf {
        self.instrument_dir(code).join(RAW_FILE_NAME)
    }

    pub fn backup_file(&self, code: &str) -> PathBuf {
        self.instrument_dir(code).join(RAW_BACKUP_FILE_NAME)
    }

    pub fn table_file(&self, code: &str) -> PathBuf {
        self.instrument_dir(code).join(TABLE_FILE_NAME)
    }
}

impl RawSeriesPort for CsvSeriesStore {
    fn load_raw(&self, code: &str) -> Result<Option<Vec<OhlcvBar>>, FeatureError> {
        let path = self.raw_file(code);
        if !path.exists() {
            tracing::info!(path = %path.display(), "no persisted series");
            return Ok(None);
        }

        let backup = self.backup_file(code);
        fs::copy(&path, &backup).map_err(|e| FeatureError::Storage {
            reason: format!("failed to back up {} to {}: {}", path.display(), backup.display(), e),
        })?;

        let mut bars = read_raw_series(&path)?;
        sort_descending(&mut bars);
        Ok(Some(bars))
    }

    fn save_raw(&self, code: &str, bars: &[OhlcvBar]) -> Result<(), FeatureError> {
        let mut ordered = bars.to_vec();
        sort_descending(&mut ordered);
        let rows: Vec<Vec<String>> = ordered.iter().map(encode_raw_row).collect();
        let header: Vec<String> = RAW_HEADER.iter().map(|s| s.to_string()).collect();
        write_rows(&self.raw_file(code), &header, &rows)
    }

    fn raw_path(&self, code: &str) -> Option<PathBuf> {
        Some(self.raw_file(code))
    }
}

impl TableSinkPort for CsvSeriesStore {
    fn write_table(&self, code: &str, table: &FeatureTable) -> Result<PathBuf, FeatureError> {
        let path = self.table_file(code);
        write_feature_table(&path, table)?;
        Ok(path)
    }
}

/// Read a raw series file in [`RAW_HEADER`] layout, in file order.
pub fn read_raw_series(path: &Path) -> Result<Vec<OhlcvBar>, FeatureError> {
    let table = read_feature_table(path)?;
    Ok(table
        .rows
        .iter()
        .enumerate()
        .filter_map(|(i, row)| {
            let fields: Vec<&str> = row.iter().map(String::as_str).collect();
            decode_raw_row(&fields, i + 2)
        })
        .collect())
}

/// Read any headed CSV into a [`FeatureTable`]. Short rows are allowed.
pub fn read_feature_table(path: &Path) -> Result<FeatureTable, FeatureError> {
    let content = fs::read_to_string(path).map_err(|e| csv_error(path, e))?;
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(content.trim_start_matches('\u{feff}').as_bytes());

    let header = rdr
        .headers()
        .map_err(|e| csv_error(path, e))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| csv_error(path, e))?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(FeatureTable { header, rows })
}

pub fn write_feature_table(path: &Path, table: &FeatureTable) -> Result<(), FeatureError> {
    write_rows(path, &table.header, &table.rows)
}

/// Macro CSV: `date,<metric>...`, one row per month. Empty or undecodable
/// cells are gaps; rows with an undecodable date are skipped.
pub fn read_macro_table(path: &Path) -> Result<MacroTable, FeatureError> {
    let table = read_feature_table(path)?;
    let columns: Vec<String> = table.header.iter().skip(1).cloned().collect();

    let mut rows = Vec::with_capacity(table.rows.len());
    for (i, row) in table.rows.iter().enumerate() {
        let line = i + 2;
        let date_field = row.first().map_or("", String::as_str);
        let Some(date) = decode_date(date_field) else {
            tracing::warn!(line, value = date_field, "undecodable macro date; row skipped");
            continue;
        };
        let values: Vec<Metric> = (1..=columns.len())
            .map(|c| {
                let field = row.get(c).map_or("", String::as_str);
                match decode_optional_number(field) {
                    (Some(v), true) if v.is_finite() => Some(v),
                    (None, true) => None,
                    _ => {
                        tracing::warn!(line, column = c, value = field, "undecodable macro value; gap");
                        None
                    }
                }
            })
            .collect();
        rows.push((date, values));
    }

    tracing::info!(path = %path.display(), months = rows.len(), metrics = columns.len(), "loaded macro table");
    Ok(MacroTable::from_rows(columns, rows))
}

/// Write a macro table with one row per grid month, dated the first of the month.
pub fn write_macro_table(path: &Path, table: &MacroTable) -> Result<(), FeatureError> {
    let mut header = vec!["date".to_string()];
    header.extend(table.columns().iter().cloned());

    let rows: Vec<Vec<String>> = table
        .rows()
        .map(|(month, values)| {
            let mut row = vec![month.first_day().map(format_date).unwrap_or_default()];
            row.extend(values.into_iter().map(format_metric));
            row
        })
        .collect();
    write_rows(path, &header, &rows)
}

fn write_rows(path: &Path, header: &[String], rows: &[Vec<String>]) -> Result<(), FeatureError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| FeatureError::Storage {
            reason: format!("failed to create {}: {}", parent.display(), e),
        })?;
    }

    let mut wtr = csv::Writer::from_path(path).map_err(|e| csv_error(path, e))?;
    wtr.write_record(header).map_err(|e| csv_error(path, e))?;
    for row in rows {
        wtr.write_record(row).map_err(|e| csv_error(path, e))?;
    }
    wtr.flush().map_err(|e| csv_error(path, e))?;
    Ok(())
}

fn csv_error(path: &Path, e: impl std::fmt::Display) -> FeatureError {
    FeatureError::Csv {
        file: path.display().to_string(),
        reason: e.to_string(),
    }
}
