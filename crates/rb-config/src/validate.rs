//! Configuration validation.

use std::path::PathBuf;

use crate::schema::AdapterConfig;

pub const LATEST_VERSION: u32 = 1;

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },

    #[error("Missing value: {field} ({reason})")]
    MissingValue { field: String, reason: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Path not found: {field} = {}", .path.display())]
    PathNotFound { field: String, path: PathBuf },
}

pub fn validate_config(config: &AdapterConfig) -> Result<(), ValidationError> {
    if config.version == 0 || config.version > LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: config.version,
        });
    }

    if config.input.timeseries_files.is_empty() {
        return Err(ValidationError::MissingValue {
            field: "input.timeseries_files".to_string(),
            reason: "at least one input time series file is required".to_string(),
        });
    }

    if config.simulation.dataset_name.trim().is_empty() {
        return Err(ValidationError::MissingValue {
            field: "simulation.dataset_name".to_string(),
            reason: "dataset name must not be empty".to_string(),
        });
    }

    if !config.input.state_input_files.is_empty() && config.input.var_mapping.is_none() {
        return Err(ValidationError::MissingValue {
            field: "input.var_mapping".to_string(),
            reason: "required when state_input_files are given".to_string(),
        });
    }

    if !config.output.result_variables.is_empty() && config.output.output_mapping.is_none() {
        return Err(ValidationError::MissingValue {
            field: "output.output_mapping".to_string(),
            reason: "required when result_variables are given".to_string(),
        });
    }

    if let Some(var) = config
        .output
        .result_variables
        .iter()
        .find(|v| v.trim().is_empty())
    {
        return Err(ValidationError::InvalidValue {
            field: "output.result_variables".to_string(),
            value: format!("'{var}'"),
            reason: "parameter ids must not be empty".to_string(),
        });
    }

    if config.engine.language.trim().is_empty() {
        return Err(ValidationError::InvalidValue {
            field: "engine.language".to_string(),
            value: "''".to_string(),
            reason: "language code must not be empty".to_string(),
        });
    }

    Ok(())
}

/// Check that every file and directory the run reads exists.
pub fn validate_paths(config: &AdapterConfig) -> Result<(), ValidationError> {
    for (field, path) in config.input_paths() {
        if !path.exists() {
            return Err(ValidationError::PathNotFound {
                field: field.to_string(),
                path: path.to_path_buf(),
            });
        }
    }
    Ok(())
}
