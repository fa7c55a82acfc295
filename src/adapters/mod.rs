//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod file_config_adapter;
pub mod mirror_object_store;
pub mod page_file_adapter;
pub mod process_forecast_adapter;
#[cfg(feature = "sqlite")]
pub mod sqlite_adapter;
