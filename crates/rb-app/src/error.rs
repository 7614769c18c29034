//! Error types for the rb-app service layer.

use std::path::PathBuf;

/// Application error wrapping the errors of the backend crates.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] rb_config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] rb_config::ValidationError),

    #[error(transparent)]
    Mapping(#[from] rb_mapping::MappingError),

    #[error(transparent)]
    Model(#[from] rb_model::ModelError),

    #[error(transparent)]
    Dataset(#[from] rb_dataset::DatasetError),

    #[error(transparent)]
    Convert(#[from] rb_convert::ConvertError),

    #[error("Failed to launch engine {path}: {source}")]
    EngineLaunch {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The engine ran and reported failure. `message` is the engine's own
    /// error text.
    #[error("{message}")]
    EngineExecution { code: Option<i32>, message: String },

    #[error("Cannot read engine version from {path}: {reason}")]
    EngineVersion { path: PathBuf, reason: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for rb-app operations.
pub type AppResult<T> = Result<T, AppError>;
