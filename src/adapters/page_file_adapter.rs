//! Serves fetch pages from a dumped quote history file.
//!
//! The dump uses the raw series layout, newest row first, and is cut into
//! pages of `page_size` rows the way the quote site pages its history.

use std::path::PathBuf;

use crate::adapters::csv_adapter::read_raw_series;
use crate::domain::error::FeatureError;
use crate::domain::ohlcv::{sort_descending, OhlcvBar};
use crate::ports::fetch_port::FetchPort;

pub struct PageFileAdapter {
    source: PathBuf,
    page_size: usize,
}

impl PageFileAdapter {
    pub fn new(source: PathBuf, page_size: usize) -> Self {
        Self {
            source,
            page_size: page_size.max(1),
        }
    }
}

impl FetchPort for PageFileAdapter {
    fn fetch_page(&self, code: &str, page: usize) -> Result<Vec<OhlcvBar>, FeatureError> {
        if page == 0 {
            return Err(FeatureError::Fetch {
                page,
                reason: "pages are numbered from 1".into(),
            });
        }
        let mut bars = read_raw_series(&self.source).map_err(|e| FeatureError::Fetch {
            page,
            reason: e.to_string(),
        })?;
        sort_descending(&mut bars);

        let start = (page - 1).saturating_mul(self.page_size);
        let rows: Vec<OhlcvBar> = bars.into_iter().skip(start).take(self.page_size).collect();
        tracing::debug!(code, page, rows = rows.len(), source = %self.source.display(), "served page");
        Ok(rows)
    }
}
