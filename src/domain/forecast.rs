//! Forecast records produced by the external model and their merge key.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::domain::decode::decode_date;
use crate::domain::error::FeatureError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastRecord {
    pub date: NaiveDate,
    pub predicted_close: Option<f64>,
    pub prediction_error: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawForecast {
    date: String,
    #[serde(default, alias = "arima_actual_prediction")]
    predicted_close: Option<f64>,
    #[serde(default, alias = "prediction_difference")]
    prediction_error: Option<f64>,
}

/// Parse the model's stdout: a JSON array of `{date, predicted_close,
/// prediction_error}` objects. Null or missing values stay absent.
pub fn parse_forecast_json(text: &str) -> Result<Vec<ForecastRecord>, FeatureError> {
    let raw: Vec<RawForecast> =
        serde_json::from_str(text).map_err(|e| FeatureError::Forecast {
            reason: format!("malformed forecast JSON: {e}"),
        })?;

    raw.into_iter()
        .map(|r| {
            let date = decode_date(&r.date).ok_or_else(|| FeatureError::Forecast {
                reason: format!("unrecognised forecast date '{}'", r.date),
            })?;
            Ok(ForecastRecord {
                date,
                predicted_close: r.predicted_close,
                prediction_error: r.prediction_error,
            })
        })
        .collect()
}

/// Forecasts keyed by calendar date. A later record for the same date
/// replaces an earlier one.
pub fn index_by_date(records: &[ForecastRecord]) -> HashMap<NaiveDate, ForecastRecord> {
    records.iter().map(|r| (r.date, *r)).collect()
}
