//! Persistence ports for the raw series and the rendered feature table.

use std::path::PathBuf;

use crate::domain::error::FeatureError;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::table::FeatureTable;

pub trait RawSeriesPort {
    /// The persisted series, most recent first, or `None` when nothing has
    /// been persisted for `code` yet.
    fn load_raw(&self, code: &str) -> Result<Option<Vec<OhlcvBar>>, FeatureError>;

    /// Replace the persisted series. `bars` are most recent first.
    fn save_raw(&self, code: &str, bars: &[OhlcvBar]) -> Result<(), FeatureError>;

    /// A file holding the raw series, for collaborators that read files.
    /// `None` when the backend is not file based.
    fn raw_path(&self, _code: &str) -> Option<PathBuf> {
        None
    }
}

pub trait TableSinkPort {
    /// Store the feature table and return where it went.
    fn write_table(&self, code: &str, table: &FeatureTable) -> Result<PathBuf, FeatureError>;
}
