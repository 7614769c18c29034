//! rb-mapping: tab-separated mapping tables translating the shell's
//! `(locationId, parameterId)` pairs into engine identifiers.
//!
//! Three table roles exist:
//! - ingestion: input series → engine time series id (`zreId`), one-to-one
//! - variable: state series → engine element key, with scale factors
//! - output: engine result series → output series, many-to-one (summed)

pub mod loader;
pub mod table;

pub use table::{MappingRecord, MappingRole, MappingTable, OutputGroup};

use std::path::PathBuf;

pub type MappingResult<T> = Result<T, MappingError>;

#[derive(thiserror::Error, Debug)]
pub enum MappingError {
    #[error("No mapping in {table} for locationId '{location_id}', parameterId '{parameter_id}'")]
    MissingMapping {
        table: String,
        location_id: String,
        parameter_id: String,
    },

    #[error("Malformed mapping table {table}, line {line}, column '{column}': {reason}")]
    MalformedMapping {
        table: String,
        line: u64,
        column: String,
        reason: String,
    },

    #[error("Conflicting mapping in {table}: {subject} is claimed by both {first} and {second}")]
    ConflictingMapping {
        table: String,
        subject: String,
        first: String,
        second: String,
    },

    #[error("Failed to read mapping table {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse mapping table {table}: {source}")]
    Csv { table: String, source: csv::Error },
}
