//! Page-oriented market data source.

use crate::domain::error::FeatureError;
use crate::domain::ohlcv::OhlcvBar;

pub trait FetchPort {
    /// Rows of page `page` (1-based) for `code`. An empty page means the
    /// source is exhausted.
    fn fetch_page(&self, code: &str, page: usize) -> Result<Vec<OhlcvBar>, FeatureError>;
}
