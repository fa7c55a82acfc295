//! Port traits implemented by adapters.

pub mod config_port;
pub mod fetch_port;
pub mod forecast_port;
pub mod object_store_port;
pub mod series_port;
