//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::{
    read_feature_table, read_macro_table, write_feature_table, write_macro_table, CsvSeriesStore,
};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::mirror_object_store::MirrorObjectStore;
use crate::adapters::page_file_adapter::PageFileAdapter;
use crate::adapters::process_forecast_adapter::ProcessForecastAdapter;
use crate::domain::config_validation::validate_config;
use crate::domain::error::FeatureError;
use crate::domain::pipeline::{Collaborators, Pipeline, PipelineConfig, StorageBackend};
use crate::domain::verify::{verify_table, DEFAULT_TOLERANCE};
use crate::ports::config_port::ConfigPort;
use crate::ports::fetch_port::FetchPort;
use crate::ports::forecast_port::ForecastPort;
use crate::ports::object_store_port::ObjectStorePort;
use crate::ports::series_port::RawSeriesPort;

#[derive(Parser, Debug)]
#[command(name = "featurebars", about = "Daily OHLCV feature table builder")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch, reconcile, enrich and write the feature table for one instrument
    Run {
        #[arg(short, long)]
        config: PathBuf,
        /// Instrument code, overriding [instrument] code
        #[arg(long)]
        code: Option<String>,
        /// Use only the persisted series
        #[arg(long)]
        no_fetch: bool,
        #[arg(long)]
        skip_forecast: bool,
        #[arg(long)]
        skip_upload: bool,
    },
    /// Validate a configuration and print the resolved settings
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Fill the gaps of a monthly macro CSV
    Impute {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Recompute indicators from a written feature table and report differences
    Verify {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, default_value_t = DEFAULT_TOLERANCE)]
        tolerance: f64,
    },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub no_fetch: bool,
    pub skip_forecast: bool,
    pub skip_upload: bool,
}

/// Log to stderr, filtered by `RUST_LOG` (default `info`).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Run {
            config,
            code,
            no_fetch,
            skip_forecast,
            skip_upload,
        } => run_pipeline(
            &config,
            code.as_deref(),
            RunOptions {
                no_fetch,
                skip_forecast,
                skip_upload,
            },
        ),
        Command::Validate { config } => run_validate(&config),
        Command::Impute { input, output } => run_impute(&input, &output),
        Command::Verify {
            input,
            output,
            tolerance,
        } => run_verify(&input, &output, tolerance),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(fail)
}

fn fail(err: FeatureError) -> ExitCode {
    eprintln!("error: {err}");
    ExitCode::from(&err)
}

pub fn run_pipeline(config_path: &Path, code_override: Option<&str>, options: RunOptions) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let mut config = match validate_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    if let Some(code) = code_override {
        config.code = code.to_string();
    }
    if options.skip_forecast {
        config.forecast = None;
    }
    if options.skip_upload {
        config.upload = None;
    }

    let fetch = if options.no_fetch {
        None
    } else {
        let source = config
            .fetch
            .source
            .clone()
            .map(|path| PageFileAdapter::new(path, config.fetch.page_size));
        if source.is_none() {
            tracing::warn!("no [fetch] source configured; using persisted series");
        }
        source
    };
    let forecast = config.forecast.as_ref().map(ProcessForecastAdapter::new);
    let mirror = config
        .upload
        .as_ref()
        .map(|u| MirrorObjectStore::new(u.mirror_dir.clone()));
    let table_store = CsvSeriesStore::new(config.resource_dir.clone());
    let raw_store = match open_raw_store(&config, &adapter) {
        Ok(store) => store,
        Err(e) => return fail(e),
    };

    let mut pipeline = Pipeline::new(
        &config,
        Collaborators {
            fetch: fetch.as_ref().map(|f| f as &dyn FetchPort),
            raw_store: raw_store.as_ref(),
            table_sink: &table_store,
            forecast: forecast.as_ref().map(|f| f as &dyn ForecastPort),
            object_store: mirror.as_ref().map(|m| m as &dyn ObjectStorePort),
        },
    );

    match &config.macro_csv {
        Some(path) => match read_macro_table(path) {
            Ok(table) => pipeline = pipeline.with_macros(table),
            Err(e) => return fail(e),
        },
        None if !config.macro_columns.is_empty() => {
            tracing::warn!("macro_columns set without [paths] macro_csv; columns will be NaN");
        }
        None => {}
    }

    match pipeline.run() {
        Ok(report) => {
            eprintln!("=== {} ===", report.code);
            eprintln!(
                "Series:     {}",
                if report.initial_creation { "created" } else { "updated" }
            );
            eprintln!("Pages:      {}", report.pages_fetched);
            eprintln!("New bars:   {}", report.bars_added);
            eprintln!(
                "Rows:       {} enriched, {} trimmed, {} written",
                report.rows_enriched, report.rows_trimmed, report.rows_written
            );
            eprintln!("Forecasts:  {}", report.forecasts_merged);
            eprintln!("Table:      {}", report.table_path.display());
            if report.uploaded {
                eprintln!("Uploaded:   {}", config.upload_key());
            }
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn open_raw_store(
    config: &PipelineConfig,
    adapter: &dyn ConfigPort,
) -> Result<Box<dyn RawSeriesPort>, FeatureError> {
    match config.storage {
        StorageBackend::Csv => Ok(Box::new(CsvSeriesStore::new(config.resource_dir.clone()))),
        StorageBackend::Sqlite => open_sqlite(adapter),
    }
}

#[cfg(feature = "sqlite")]
fn open_sqlite(adapter: &dyn ConfigPort) -> Result<Box<dyn RawSeriesPort>, FeatureError> {
    let store = crate::adapters::sqlite_adapter::SqliteSeriesStore::from_config(adapter)?;
    store.initialize_schema()?;
    Ok(Box::new(store))
}

#[cfg(not(feature = "sqlite"))]
fn open_sqlite(_adapter: &dyn ConfigPort) -> Result<Box<dyn RawSeriesPort>, FeatureError> {
    Err(FeatureError::ConfigInvalid {
        section: "storage".into(),
        key: "backend".into(),
        reason: "built without the sqlite feature".into(),
    })
}

pub fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let config = match validate_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    eprintln!("Config validated successfully");

    let engine = &config.engine;
    eprintln!("  Code:            {} ({:?})", config.code, config.class);
    eprintln!("  Windows:         {:?}", engine.windows);
    eprintln!("  MACD signal:     {}", engine.macd_signal_period);
    eprintln!(
        "  MACD pairs:      short {}/{}, long {}/{}",
        engine.short_macd.fast, engine.short_macd.slow, engine.long_macd.fast, engine.long_macd.slow
    );
    eprintln!("  Bollinger k:     {}", engine.bollinger_k);
    eprintln!("  Volume metrics:  {}", engine.include_volume_metrics);
    eprintln!("  Trimmed rows:    {}", engine.trim_length());
    eprintln!("  Storage:         {:?}", config.storage);
    eprintln!("  Forecast:        {}", config.forecast.is_some());
    eprintln!("  Upload:          {}", config.upload.is_some());

    println!("{}", config.table_layout().header().join(","));
    ExitCode::SUCCESS
}

pub fn run_impute(input: &Path, output: &Path) -> ExitCode {
    let mut table = match read_macro_table(input) {
        Ok(t) => t,
        Err(e) => return fail(e),
    };
    table.impute();
    if let Err(e) = write_macro_table(output, &table) {
        return fail(e);
    }
    eprintln!(
        "Imputed {} months x {} metrics into {}",
        table.months().len(),
        table.columns().len(),
        output.display()
    );
    ExitCode::SUCCESS
}

pub fn run_verify(input: &Path, output: &Path, tolerance: f64) -> ExitCode {
    let table = match read_feature_table(input) {
        Ok(t) => t,
        Err(e) => return fail(e),
    };
    let report = match verify_table(&table, tolerance) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };
    if let Err(e) = write_feature_table(output, &report.table) {
        return fail(e);
    }
    eprintln!(
        "Compared {} cells, {} beyond tolerance {}; written to {}",
        report.compared,
        report.mismatches,
        tolerance,
        output.display()
    );
    ExitCode::SUCCESS
}
