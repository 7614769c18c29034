//! rb-convert: moves values between the generic representation and the
//! engine's native files.
//!
//! - [`ingest`]: input time series → BIN files
//! - [`state`]: state series and boolean parameters → VAR files
//! - [`aggregate`]: engine result series → generic output series
//! - [`window`]: simulation period selection

pub mod aggregate;
pub mod ingest;
pub mod state;
pub mod window;

pub use aggregate::{OutputSource, ResultAggregator, SourceSequence};
pub use ingest::{IngestReport, IngestedSeries, TimeSeriesIngestor};
pub use state::{ParameterConversion, StateVariableMapper};
pub use window::{SimulationWindow, resolve_window};

use chrono::NaiveDateTime;
use rb_dataset::DatasetError;
use rb_mapping::MappingError;
use rb_model::ModelError;

pub type ConvertResult<T> = Result<T, ConvertError>;

#[derive(thiserror::Error, Debug)]
pub enum ConvertError {
    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("Parameter '{identifier}' has unsupported type {type_name}; only bool can be written")]
    UnsupportedParameterType {
        identifier: String,
        type_name: &'static str,
    },

    #[error("Output {output}: sequence {sequence} {reason}")]
    MisalignedSeries {
        output: String,
        sequence: String,
        reason: String,
    },

    #[error("Output {output}: engine result sequence '{sequence}' not found")]
    MissingOutputSequence { output: String, sequence: String },

    #[error("No simulation window: no run info and no non-empty input series")]
    NoSimulationWindow,

    #[error("Invalid simulation window: start {start} is after end {end}")]
    InvalidWindow {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
}
