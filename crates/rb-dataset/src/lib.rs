//! rb-dataset: the engine's native dataset files.
//!
//! A dataset is a directory of files sharing one stem (`<name>.ALL`,
//! `<name>.KAL`, ...) plus arbitrary `*.var` files. This crate reads and writes
//! the handful of formats the adapter needs:
//! - `*.template` files rendered with parameter values
//! - VAR keyed value files (state and boolean parameters)
//! - BIN sequential value files (input time series)
//! - WEL / WBL result files (engine outputs)
//! - ALL simulation options and KAL calibration parameters
//! - fixed-width model tables (soils, sub-catchments, land use)

pub mod binfile;
pub mod dataset;
pub mod format;
pub mod options;
pub mod table;
pub mod template;
pub mod varfile;
pub mod welfile;

pub use binfile::{read_bin, write_bin};
pub use dataset::{Dataset, RESULT_EXTENSIONS};
pub use table::{DatasetTable, SoilAverage, TableRow, read_table};
pub use template::{FormatSpec, TemplateError, TemplateValue, TemplateValues, render_template};
pub use varfile::{VarValue, write_var_file};
pub use welfile::{EngineOutput, OutputColumn, read_result_file, read_wbl, read_wel};

use std::path::PathBuf;

pub type DatasetResult<T> = Result<T, DatasetError>;

#[derive(thiserror::Error, Debug)]
pub enum DatasetError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Template {file}: {source}")]
    Template {
        file: PathBuf,
        source: TemplateError,
    },

    #[error("{path} is truncated: {len} bytes do not form whole records")]
    Truncated { path: PathBuf, len: u64 },

    #[error("{path}: engine time {hours} h cannot be represented as a date")]
    InvalidTimestamp { path: PathBuf, hours: f64 },

    #[error("Required WELINFO file not found: {path}")]
    MissingSidecar { path: PathBuf },

    #[error("{path}: unknown data type {code}")]
    UnknownDataType { path: PathBuf, code: i32 },

    #[error("{path}: no series description found")]
    NoColumns { path: PathBuf },

    #[error("{path}, line {line}: {reason}")]
    Malformed {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Option '{option}' not found in {path}")]
    MissingOption { path: PathBuf, option: String },

    #[error("File not found: {path}")]
    MissingFile { path: PathBuf },

    #[error("{path}: unsupported version {}, expected {supported}", found.as_deref().unwrap_or("(none)"))]
    UnsupportedVersion {
        path: PathBuf,
        found: Option<String>,
        supported: String,
    },
}

pub(crate) fn io_error(path: &std::path::Path) -> impl FnOnce(std::io::Error) -> DatasetError + '_ {
    move |source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Write `contents` and flush it to disk before returning.
pub(crate) fn write_synced(path: &std::path::Path, contents: &[u8]) -> DatasetResult<()> {
    use std::io::Write;
    let mut file = std::fs::File::create(path).map_err(io_error(path))?;
    file.write_all(contents).map_err(io_error(path))?;
    file.sync_all().map_err(io_error(path))
}
