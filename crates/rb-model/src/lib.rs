//! rb-model: the generic, engine-agnostic representation exchanged with the
//! forecasting shell.
//!
//! The shell's own XML formats are parsed elsewhere; this crate holds the
//! already-parsed values (time series, model parameters, run window) and a
//! JSON document form of them.

pub mod document;
pub mod params;
pub mod run_info;
pub mod series;

pub use document::{SeriesDocument, load_parameters, load_run_info, load_series, save_series};
pub use params::{ModelParameter, ParameterSet, ParameterValue};
pub use run_info::RunInfo;
pub use series::{Interpretation, Point, TimeSeries};

use std::path::PathBuf;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(thiserror::Error, Debug)]
pub enum ModelError {
    #[error("Timestamps of series {series} are not strictly increasing: {next} follows {previous}")]
    NonIncreasingTimestamp {
        series: String,
        previous: chrono::NaiveDateTime,
        next: chrono::NaiveDateTime,
    },

    #[error("Invalid run window: start {start} is after end {end}")]
    InvalidRunWindow {
        start: chrono::NaiveDateTime,
        end: chrono::NaiveDateTime,
    },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}
