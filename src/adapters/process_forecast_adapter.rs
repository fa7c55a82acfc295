//! Runs the external forecast model as a subprocess.

use std::path::Path;
use std::process::Command;

use crate::domain::error::FeatureError;
use crate::domain::forecast::{parse_forecast_json, ForecastRecord};
use crate::domain::pipeline::ForecastSettings;
use crate::ports::forecast_port::ForecastPort;

/// `<command> <args...> <raw series path>`; stdout must be a JSON array.
pub struct ProcessForecastAdapter {
    command: String,
    args: Vec<String>,
}

impl ProcessForecastAdapter {
    pub fn new(settings: &ForecastSettings) -> Self {
        Self {
            command: settings.command.clone(),
            args: settings.args.clone(),
        }
    }
}

impl ForecastPort for ProcessForecastAdapter {
    fn forecast(&self, raw_series: &Path) -> Result<Vec<ForecastRecord>, FeatureError> {
        tracing::debug!(command = %self.command, args = ?self.args, input = %raw_series.display(), "running forecast");
        let output = Command::new(&self.command)
            .args(&self.args)
            .arg(raw_series)
            .output()
            .map_err(|e| FeatureError::Forecast {
                reason: format!("failed to start '{}': {}", self.command, e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FeatureError::Forecast {
                reason: format!("'{}' exited with {}: {}", self.command, output.status, stderr.trim()),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_forecast_json(&stdout)
    }
}
