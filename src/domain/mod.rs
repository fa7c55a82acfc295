//! Core domain types and logic.

pub mod ohlcv;
pub mod decode;
pub mod indicator;
pub mod indicator_helpers;
pub mod record;
pub mod engine;
pub mod imputer;
pub mod reconcile;
pub mod macro_series;
pub mod forecast;
pub mod table;
pub mod pipeline;
pub mod verify;
pub mod config_validation;
pub mod error;
