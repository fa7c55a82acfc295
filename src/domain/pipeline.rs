//! One end-to-end run for an instrument:
//! load → fetch and reconcile → persist raw → enrich → trim → forecast merge →
//! render → write → upload.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::domain::engine::{trim_unstable_tail, EngineConfig, IndicatorEngine};
use crate::domain::error::FeatureError;
use crate::domain::forecast::{index_by_date, ForecastRecord};
use crate::domain::macro_series::{MacroTable, YearMonth};
use crate::domain::ohlcv::{sort_descending, OhlcvBar};
use crate::domain::reconcile::{Reconciler, Reconciliation};
use crate::domain::record::SeriesRecord;
use crate::domain::table::{InstrumentClass, TableLayout};
use crate::ports::fetch_port::FetchPort;
use crate::ports::forecast_port::ForecastPort;
use crate::ports::object_store_port::ObjectStorePort;
use crate::ports::series_port::{RawSeriesPort, TableSinkPort};

pub const TABLE_FILE_NAME: &str = "ModelData.csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Csv,
    Sqlite,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchSettings {
    pub source: Option<PathBuf>,
    pub page_size: usize,
    pub max_pages: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastSettings {
    pub command: String,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadSettings {
    pub bucket: String,
    pub mirror_dir: PathBuf,
}

/// Validated settings for a run. Built by
/// [`validate_config`](crate::domain::config_validation::validate_config).
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub code: String,
    pub class: InstrumentClass,
    pub macro_columns: Vec<String>,
    pub resource_dir: PathBuf,
    pub macro_csv: Option<PathBuf>,
    pub fetch: FetchSettings,
    pub engine: EngineConfig,
    pub forecast: Option<ForecastSettings>,
    pub upload: Option<UploadSettings>,
    pub storage: StorageBackend,
}

impl PipelineConfig {
    pub fn table_layout(&self) -> TableLayout {
        TableLayout::new(&self.engine, self.macro_columns.clone())
    }

    pub fn upload_key(&self) -> String {
        format!("{}/{}", self.code, TABLE_FILE_NAME)
    }
}

/// The collaborators a run talks to. Optional ones are skipped when absent.
pub struct Collaborators<'a> {
    pub fetch: Option<&'a dyn FetchPort>,
    pub raw_store: &'a dyn RawSeriesPort,
    pub table_sink: &'a dyn TableSinkPort,
    pub forecast: Option<&'a dyn ForecastPort>,
    pub object_store: Option<&'a dyn ObjectStorePort>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub code: String,
    pub initial_creation: bool,
    pub pages_fetched: usize,
    pub bars_added: usize,
    pub rows_enriched: usize,
    pub rows_trimmed: usize,
    pub rows_written: usize,
    pub forecasts_merged: usize,
    pub table_path: PathBuf,
    pub uploaded: bool,
}

pub struct Pipeline<'a> {
    config: &'a PipelineConfig,
    ports: Collaborators<'a>,
    macros: Option<MacroTable>,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a PipelineConfig, ports: Collaborators<'a>) -> Self {
        Self {
            config,
            ports,
            macros: None,
        }
    }

    pub fn with_macros(mut self, macros: MacroTable) -> Self {
        self.macros = Some(macros);
        self
    }

    pub fn run(&self) -> Result<RunReport, FeatureError> {
        let code = self.config.code.as_str();
        let persisted = self.ports.raw_store.load_raw(code)?;
        tracing::info!(
            code,
            persisted = persisted.as_ref().map_or(0, Vec::len),
            "loaded persisted series"
        );

        let reconciled = self.reconcile(code, persisted);
        if reconciled.bars.is_empty() {
            return Err(FeatureError::NoData {
                code: code.to_string(),
            });
        }
        self.ports.raw_store.save_raw(code, &reconciled.bars)?;

        let engine = IndicatorEngine::new(self.config.engine.clone());
        let mut records = engine.enrich_bars(reconciled.bars.clone());
        let rows_enriched = records.len();
        let rows_trimmed = trim_unstable_tail(&mut records, &self.config.engine);
        tracing::info!(code, rows_enriched, rows_trimmed, "enriched series");
        if records.is_empty() {
            return Err(FeatureError::InsufficientData {
                code: code.to_string(),
                bars: rows_enriched,
                minimum: self.config.engine.trim_length(),
            });
        }

        let forecasts = if reconciled.initial_creation {
            tracing::info!(code, "initial creation; forecast skipped");
            HashMap::new()
        } else {
            self.forecasts(code)
        };
        let forecasts_merged = records
            .iter()
            .filter(|r| forecasts.contains_key(&r.bar.date))
            .count();

        let macros = self.aligned_macros(&records);
        let table = self
            .config
            .table_layout()
            .render(&records, macros.as_ref(), &forecasts);
        let table_path = self.ports.table_sink.write_table(code, &table)?;
        tracing::info!(code, rows = table.rows.len(), path = %table_path.display(), "wrote feature table");

        let uploaded = self.upload(&table_path);

        Ok(RunReport {
            code: code.to_string(),
            initial_creation: reconciled.initial_creation,
            pages_fetched: reconciled.pages_fetched,
            bars_added: reconciled.bars_added,
            rows_enriched,
            rows_trimmed,
            rows_written: table.rows.len(),
            forecasts_merged,
            table_path,
            uploaded,
        })
    }

    fn reconcile(&self, code: &str, persisted: Option<Vec<OhlcvBar>>) -> Reconciliation {
        match self.ports.fetch {
            Some(source) => {
                Reconciler::new(source, self.config.fetch.max_pages).reconcile(code, persisted)
            }
            None => {
                tracing::info!(code, "fetching disabled; using persisted series");
                let initial_creation = persisted.is_none();
                let mut bars = persisted.unwrap_or_default();
                sort_descending(&mut bars);
                Reconciliation {
                    bars,
                    initial_creation,
                    pages_fetched: 0,
                    bars_added: 0,
                }
            }
        }
    }

    /// Forecast failures only cost the forecast columns.
    fn forecasts(&self, code: &str) -> HashMap<NaiveDate, ForecastRecord> {
        let Some(model) = self.ports.forecast else {
            return HashMap::new();
        };
        let Some(path) = self.ports.raw_store.raw_path(code) else {
            tracing::warn!(code, "raw series has no file path; forecast skipped");
            return HashMap::new();
        };
        match model.forecast(&path) {
            Ok(records) => {
                tracing::info!(code, records = records.len(), "forecast received");
                index_by_date(&records)
            }
            Err(e) => {
                tracing::warn!(code, error = %e, "forecast failed; columns left blank");
                HashMap::new()
            }
        }
    }

    fn aligned_macros(&self, records: &[SeriesRecord]) -> Option<MacroTable> {
        let mut table = self.macros.clone()?;
        table.extend_to(records.iter().map(|r| YearMonth::of(r.bar.date)));
        table.impute();
        Some(table)
    }

    fn upload(&self, table_path: &Path) -> bool {
        let (Some(store), Some(settings)) = (self.ports.object_store, &self.config.upload) else {
            return false;
        };
        let key = self.config.upload_key();
        match store.upload(table_path, &settings.bucket, &key) {
            Ok(()) => {
                tracing::info!(bucket = %settings.bucket, key = %key, "uploaded feature table");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "upload failed; local table kept");
                false
            }
        }
    }
}
