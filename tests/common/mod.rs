#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use featurebars::domain::error::FeatureError;
use featurebars::domain::forecast::ForecastRecord;
pub use featurebars::domain::ohlcv::OhlcvBar;
use featurebars::domain::table::FeatureTable;
use featurebars::ports::fetch_port::FetchPort;
use featurebars::ports::forecast_port::ForecastPort;
use featurebars::ports::object_store_port::ObjectStorePort;
use featurebars::ports::series_port::{RawSeriesPort, TableSinkPort};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_bar(date: NaiveDate, close: f64) -> OhlcvBar {
    OhlcvBar {
        date,
        open: close - 0.5,
        high: close + 1.5,
        low: close - 1.0,
        close,
        volume: Some(10_000.0 + close.round() * 10.0),
    }
}

/// `days` consecutive daily bars starting at `start`, most recent first.
/// Closes follow a bounded wave so every indicator has something to do.
pub fn make_series(start: NaiveDate, days: usize) -> Vec<OhlcvBar> {
    let mut bars: Vec<OhlcvBar> = (0..days)
        .map(|i| {
            let close = 100.0 + ((i * 7) % 11) as f64 - ((i * 3) % 5) as f64 * 0.5;
            make_bar(start + Duration::days(i as i64), close)
        })
        .collect();
    bars.reverse();
    bars
}

/// Fetch source that serves a newest-first series in fixed-size pages.
pub struct MockFetchPort {
    pub bars: Vec<OhlcvBar>,
    pub page_size: usize,
    pub fail_on_page: Option<usize>,
    pub calls: RefCell<Vec<usize>>,
}

impl MockFetchPort {
    pub fn new(bars: Vec<OhlcvBar>, page_size: usize) -> Self {
        Self {
            bars,
            page_size,
            fail_on_page: None,
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn failing_on(mut self, page: usize) -> Self {
        self.fail_on_page = Some(page);
        self
    }
}

impl FetchPort for MockFetchPort {
    fn fetch_page(&self, _code: &str, page: usize) -> Result<Vec<OhlcvBar>, FeatureError> {
        self.calls.borrow_mut().push(page);
        if self.fail_on_page == Some(page) {
            return Err(FeatureError::Fetch {
                page,
                reason: "connection reset".into(),
            });
        }
        Ok(self
            .bars
            .iter()
            .skip((page - 1) * self.page_size)
            .take(self.page_size)
            .cloned()
            .collect())
    }
}

/// In-memory raw series and table storage.
#[derive(Default)]
pub struct MemoryStore {
    pub raw: RefCell<HashMap<String, Vec<OhlcvBar>>>,
    pub tables: RefCell<HashMap<String, FeatureTable>>,
    pub raw_file: Option<PathBuf>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_raw(self, code: &str, bars: Vec<OhlcvBar>) -> Self {
        self.raw.borrow_mut().insert(code.to_string(), bars);
        self
    }

    /// Pretend the raw series lives at `path`, so forecasts can run.
    pub fn with_raw_file(mut self, path: &str) -> Self {
        self.raw_file = Some(PathBuf::from(path));
        self
    }

    pub fn table(&self, code: &str) -> Option<FeatureTable> {
        self.tables.borrow().get(code).cloned()
    }
}

impl RawSeriesPort for MemoryStore {
    fn load_raw(&self, code: &str) -> Result<Option<Vec<OhlcvBar>>, FeatureError> {
        Ok(self.raw.borrow().get(code).cloned())
    }

    fn save_raw(&self, code: &str, bars: &[OhlcvBar]) -> Result<(), FeatureError> {
        self.raw.borrow_mut().insert(code.to_string(), bars.to_vec());
        Ok(())
    }

    fn raw_path(&self, _code: &str) -> Option<PathBuf> {
        self.raw_file.clone()
    }
}

impl TableSinkPort for MemoryStore {
    fn write_table(&self, code: &str, table: &FeatureTable) -> Result<PathBuf, FeatureError> {
        self.tables
            .borrow_mut()
            .insert(code.to_string(), table.clone());
        Ok(PathBuf::from(format!("memory/{code}/ModelData.csv")))
    }
}

pub struct MockForecastPort {
    pub result: Result<Vec<ForecastRecord>, String>,
    pub calls: RefCell<usize>,
}

impl MockForecastPort {
    pub fn returning(records: Vec<ForecastRecord>) -> Self {
        Self {
            result: Ok(records),
            calls: RefCell::new(0),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            result: Err(reason.to_string()),
            calls: RefCell::new(0),
        }
    }
}

impl ForecastPort for MockForecastPort {
    fn forecast(&self, _raw_series: &Path) -> Result<Vec<ForecastRecord>, FeatureError> {
        *self.calls.borrow_mut() += 1;
        self.result.clone().map_err(|reason| FeatureError::Forecast { reason })
    }
}

#[derive(Default)]
pub struct MockObjectStore {
    pub uploads: RefCell<Vec<(PathBuf, String, String)>>,
    pub fail: bool,
}

impl ObjectStorePort for MockObjectStore {
    fn upload(&self, local: &Path, bucket: &str, key: &str) -> Result<(), FeatureError> {
        if self.fail {
            return Err(FeatureError::Upload {
                bucket: bucket.to_string(),
                key: key.to_string(),
                reason: "denied".into(),
            });
        }
        self.uploads
            .borrow_mut()
            .push((local.to_path_buf(), bucket.to_string(), key.to_string()));
        Ok(())
    }
}
