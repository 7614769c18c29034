use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::{ModelError, ModelResult};

/// Explicit simulation window supplied by the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunInfo {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl RunInfo {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> ModelResult<Self> {
        if start > end {
            return Err(ModelError::InvalidRunWindow { start, end });
        }
        Ok(Self { start, end })
    }
}
