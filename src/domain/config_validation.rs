//! Configuration validation.
//!
//! Validates every config field before any pipeline work and builds the typed
//! settings the run uses.

use std::path::PathBuf;

use crate::domain::engine::{
    EngineConfig, MacdPair, DEFAULT_BOLLINGER_K, DEFAULT_MACD_SIGNAL, DEFAULT_WINDOWS,
};
use crate::domain::error::FeatureError;
use crate::domain::pipeline::{
    FetchSettings, ForecastSettings, PipelineConfig, StorageBackend, UploadSettings,
};
use crate::domain::reconcile::DEFAULT_MAX_PAGES;
use crate::domain::table::InstrumentClass;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_RESOURCE_DIR: &str = "Resource";
pub const DEFAULT_PAGE_SIZE: usize = 30;

pub fn validate_config(config: &dyn ConfigPort) -> Result<PipelineConfig, FeatureError> {
    let code = required(config, "instrument", "code")?;
    let class = validate_class(config)?;

    Ok(PipelineConfig {
        code,
        class,
        macro_columns: list(config, "instrument", "macro_columns"),
        resource_dir: config
            .get_string("paths", "resource_dir")
            .filter(|s| !s.trim().is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_RESOURCE_DIR), PathBuf::from),
        macro_csv: optional_path(config, "paths", "macro_csv"),
        fetch: validate_fetch(config)?,
        engine: validate_engine_config(config, class)?,
        forecast: validate_forecast(config)?,
        upload: validate_upload(config)?,
        storage: validate_storage(config)?,
    })
}

/// The `[engine]` section. Volume metrics default on only for instruments
/// that report volume.
pub fn validate_engine_config(
    config: &dyn ConfigPort,
    class: InstrumentClass,
) -> Result<EngineConfig, FeatureError> {
    let windows = match config.get_string("engine", "windows") {
        Some(raw) => parse_windows(&raw, "windows")?,
        None => DEFAULT_WINDOWS.to_vec(),
    };

    let signal = config.get_int("engine", "macd_signal_period", DEFAULT_MACD_SIGNAL as i64);
    if signal < 1 {
        return Err(invalid(
            "engine",
            "macd_signal_period",
            "macd_signal_period must be at least 1",
        ));
    }

    let bollinger_k = config.get_double("engine", "bollinger_k", DEFAULT_BOLLINGER_K);
    if !bollinger_k.is_finite() || bollinger_k < 0.0 {
        return Err(invalid(
            "engine",
            "bollinger_k",
            "bollinger_k must be non-negative",
        ));
    }

    let include_volume_metrics =
        config.get_bool("engine", "include_volume_metrics", class.has_volume());

    let defaults = EngineConfig::default();
    let short_macd = macd_pair(config, "short_macd", defaults.short_macd, &windows)?;
    let long_macd = macd_pair(config, "long_macd", defaults.long_macd, &windows)?;

    Ok(EngineConfig {
        windows,
        macd_signal_period: signal as usize,
        include_volume_metrics,
        bollinger_k,
        short_macd,
        long_macd,
    })
}

fn validate_class(config: &dyn ConfigPort) -> Result<InstrumentClass, FeatureError> {
    match config.get_string("instrument", "class") {
        None => Ok(InstrumentClass::Equity),
        Some(raw) => InstrumentClass::parse(&raw).ok_or_else(|| {
            invalid(
                "instrument",
                "class",
                &format!("unknown instrument class '{raw}', expected equity or currency_pair"),
            )
        }),
    }
}

fn validate_fetch(config: &dyn ConfigPort) -> Result<FetchSettings, FeatureError> {
    let page_size = config.get_int("fetch", "page_size", DEFAULT_PAGE_SIZE as i64);
    if page_size < 1 {
        return Err(invalid("fetch", "page_size", "page_size must be at least 1"));
    }
    let max_pages = config.get_int("fetch", "max_pages", DEFAULT_MAX_PAGES as i64);
    if max_pages < 1 {
        return Err(invalid("fetch", "max_pages", "max_pages must be at least 1"));
    }
    Ok(FetchSettings {
        source: optional_path(config, "fetch", "source"),
        page_size: page_size as usize,
        max_pages: max_pages as usize,
    })
}

fn validate_forecast(config: &dyn ConfigPort) -> Result<Option<ForecastSettings>, FeatureError> {
    if !config.get_bool("forecast", "enabled", false) {
        return Ok(None);
    }
    let command = required(config, "forecast", "command")?;
    let args = config
        .get_string("forecast", "args")
        .map(|s| s.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default();
    Ok(Some(ForecastSettings { command, args }))
}

fn validate_upload(config: &dyn ConfigPort) -> Result<Option<UploadSettings>, FeatureError> {
    if !config.get_bool("upload", "enabled", false) {
        return Ok(None);
    }
    Ok(Some(UploadSettings {
        bucket: required(config, "upload", "bucket")?,
        mirror_dir: PathBuf::from(required(config, "upload", "mirror_dir")?),
    }))
}

fn validate_storage(config: &dyn ConfigPort) -> Result<StorageBackend, FeatureError> {
    let backend = config
        .get_string("storage", "backend")
        .unwrap_or_else(|| "csv".to_string());
    match backend.trim().to_lowercase().as_str() {
        "csv" => Ok(StorageBackend::Csv),
        "sqlite" => {
            required(config, "sqlite", "path")?;
            Ok(StorageBackend::Sqlite)
        }
        other => Err(invalid(
            "storage",
            "backend",
            &format!("unknown backend '{other}', expected csv or sqlite"),
        )),
    }
}

fn parse_windows(raw: &str, key: &str) -> Result<Vec<usize>, FeatureError> {
    let mut windows = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let w: usize = part
            .parse()
            .map_err(|_| invalid("engine", key, &format!("'{part}' is not a window length")))?;
        if w == 0 {
            return Err(invalid("engine", key, "window lengths must be positive"));
        }
        if windows.contains(&w) {
            return Err(invalid("engine", key, &format!("window {w} listed twice")));
        }
        windows.push(w);
    }
    if windows.is_empty() {
        return Err(invalid("engine", key, "at least one window is required"));
    }
    Ok(windows)
}

fn macd_pair(
    config: &dyn ConfigPort,
    key: &str,
    default: MacdPair,
    windows: &[usize],
) -> Result<MacdPair, FeatureError> {
    let pair = match config.get_string("engine", key) {
        None => default,
        Some(raw) => {
            let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
            let [fast, slow] = parts.as_slice() else {
                return Err(invalid("engine", key, "expected two windows 'fast,slow'"));
            };
            let parse = |s: &str| {
                s.parse::<usize>()
                    .map_err(|_| invalid("engine", key, &format!("'{s}' is not a window length")))
            };
            MacdPair {
                fast: parse(*fast)?,
                slow: parse(*slow)?,
            }
        }
    };
    for w in [pair.fast, pair.slow] {
        if !windows.contains(&w) {
            return Err(invalid(
                "engine",
                key,
                &format!("window {w} is not in [engine] windows"),
            ));
        }
    }
    Ok(pair)
}

fn required(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, FeatureError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(FeatureError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

fn optional_path(config: &dyn ConfigPort, section: &str, key: &str) -> Option<PathBuf> {
    config
        .get_string(section, key)
        .filter(|s| !s.trim().is_empty())
        .map(|s| PathBuf::from(s.trim()))
}

fn list(config: &dyn ConfigPort, section: &str, key: &str) -> Vec<String> {
    config
        .get_string(section, key)
        .map(|s| {
            s.split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn invalid(section: &str, key: &str, reason: &str) -> FeatureError {
    FeatureError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
