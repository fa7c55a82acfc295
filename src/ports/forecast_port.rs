//! External forecast model.

use std::path::Path;

use crate::domain::error::FeatureError;
use crate::domain::forecast::ForecastRecord;

pub trait ForecastPort {
    /// Run the model over the raw series stored at `raw_series`.
    fn forecast(&self, raw_series: &Path) -> Result<Vec<ForecastRecord>, FeatureError>;
}
