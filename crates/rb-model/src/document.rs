//! JSON documents holding the generic representation.

use std::fs;
use std::path::Path;

use chrono::NaiveDateTime;
use rb_core::SeriesKey;
use serde::{Deserialize, Serialize};

use crate::{ModelError, ModelResult, ParameterSet, RunInfo, TimeSeries};

/// A collection of generic time series, used for inputs and outputs alike.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<RunInfo>,
    #[serde(default)]
    pub series: Vec<TimeSeries>,
}

impl SeriesDocument {
    pub fn new(series: Vec<TimeSeries>) -> Self {
        Self {
            generated_at: None,
            window: None,
            series,
        }
    }

    pub fn find(&self, key: &SeriesKey) -> Option<&TimeSeries> {
        self.series
            .iter()
            .find(|s| s.location_id == key.location_id && s.parameter_id == key.parameter_id)
    }
}

fn read(path: &Path) -> ModelResult<String> {
    fs::read_to_string(path).map_err(|source| ModelError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn parse<T: for<'de> Deserialize<'de>>(path: &Path, content: &str) -> ModelResult<T> {
    serde_json::from_str(content).map_err(|source| ModelError::Json {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_series(path: &Path) -> ModelResult<SeriesDocument> {
    let content = read(path)?;
    parse(path, &content)
}

pub fn save_series(path: &Path, document: &SeriesDocument) -> ModelResult<()> {
    let content = serde_json::to_string_pretty(document).map_err(|source| ModelError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| ModelError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, content).map_err(|source| ModelError::Write {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_parameters(path: &Path) -> ModelResult<ParameterSet> {
    let content = read(path)?;
    parse(path, &content)
}

pub fn load_run_info(path: &Path) -> ModelResult<RunInfo> {
    let content = read(path)?;
    let info: RunInfo = parse(path, &content)?;
    RunInfo::new(info.start, info.end)
}
