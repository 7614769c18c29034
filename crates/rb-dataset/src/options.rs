//! `key=value` option files: simulation options (`.ALL`) and calibration
//! parameters (`.KAL`).
//!
//! Keys compare case-insensitively. Lines are edited in place so comments,
//! ordering, line endings and non-UTF-8 bytes elsewhere in the file survive.

use std::fs;
use std::path::Path;

use chrono::NaiveDateTime;

use crate::dataset::Dataset;
use crate::format::ENGINE_DATE_FORMAT;
use crate::{DatasetError, DatasetResult, io_error, write_synced};

/// Comment markers for one file kind.
#[derive(Debug, Clone, Copy)]
struct Dialect {
    comments: &'static [u8],
}

const ALL_FILE: Dialect = Dialect { comments: b"#*" };
const KAL_FILE: Dialect = Dialect { comments: b"#" };

/// Key and value of an option line, or `None` for comments and other lines.
fn option_line(line: &[u8], dialect: Dialect) -> Option<(String, String)> {
    if line.first().is_some_and(|b| dialect.comments.contains(b)) {
        return None;
    }
    let eq = line.iter().position(|b| *b == b'=')?;
    let key = String::from_utf8_lossy(&line[..eq]).trim().to_string();
    let value = String::from_utf8_lossy(&line[eq + 1..]).trim().to_string();
    Some((key, value))
}

fn read_options(path: &Path, dialect: Dialect) -> DatasetResult<Vec<(String, String)>> {
    let bytes = fs::read(path).map_err(io_error(path))?;
    Ok(bytes
        .split(|b| *b == b'\n')
        .filter_map(|line| option_line(line, dialect))
        .collect())
}

/// Replace the values of existing keys; keys not present are logged and
/// skipped. Returns the keys that were set.
fn update_options(
    path: &Path,
    dialect: Dialect,
    updates: &[(String, String)],
) -> DatasetResult<Vec<String>> {
    let bytes = fs::read(path).map_err(io_error(path))?;
    let mut lines: Vec<Vec<u8>> = bytes.split(|b| *b == b'\n').map(<[u8]>::to_vec).collect();
    let mut applied = Vec::new();

    for (key, value) in updates {
        let hit = lines.iter().position(|line| {
            option_line(line, dialect).is_some_and(|(existing, _)| existing.eq_ignore_ascii_case(key))
        });
        let Some(i) = hit else {
            tracing::warn!(
                file = %path.display(),
                option = %key,
                "option not found in file and could not be set"
            );
            continue;
        };

        let line = &lines[i];
        let eq = line.iter().position(|b| *b == b'=').unwrap_or(line.len());
        let crlf = line.last() == Some(&b'\r');
        let mut replaced = line[..eq].to_vec();
        replaced.push(b'=');
        replaced.extend_from_slice(value.as_bytes());
        if crlf {
            replaced.push(b'\r');
        }
        lines[i] = replaced;
        applied.push(key.clone());
    }

    write_synced(path, &lines.join(&b'\n'))?;
    Ok(applied)
}

impl Dataset {
    /// All options of the ALL file, in file order.
    pub fn sim_options(&self) -> DatasetResult<Vec<(String, String)>> {
        read_options(&self.file("ALL"), ALL_FILE)
    }

    /// Case-insensitive lookup of one ALL option.
    pub fn sim_option(&self, option: &str) -> DatasetResult<Option<String>> {
        Ok(self
            .sim_options()?
            .into_iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(option))
            .map(|(_, value)| value))
    }

    /// Set existing ALL options; returns the options that were found.
    pub fn set_sim_options(&self, options: &[(String, String)]) -> DatasetResult<Vec<String>> {
        update_options(&self.file("ALL"), ALL_FILE, options)
    }

    fn sim_date(&self, option: &str) -> DatasetResult<NaiveDateTime> {
        let path = self.file("ALL");
        let value = self
            .sim_option(option)?
            .ok_or_else(|| DatasetError::MissingOption {
                path: path.clone(),
                option: option.to_string(),
            })?;
        NaiveDateTime::parse_from_str(&value, ENGINE_DATE_FORMAT).map_err(|_| {
            DatasetError::Malformed {
                path,
                line: 0,
                reason: format!("{option}={value} is not a dd.mm.YYYY HH:MM date"),
            }
        })
    }

    pub fn sim_start(&self) -> DatasetResult<NaiveDateTime> {
        self.sim_date("SimStart")
    }

    pub fn sim_end(&self) -> DatasetResult<NaiveDateTime> {
        self.sim_date("SimEnd")
    }

    /// Write `SimStart` / `SimEnd` into the ALL file.
    pub fn set_sim_period(&self, start: NaiveDateTime, end: NaiveDateTime) -> DatasetResult<()> {
        let options = [
            ("SimStart".to_string(), start.format(ENGINE_DATE_FORMAT).to_string()),
            ("SimEnd".to_string(), end.format(ENGINE_DATE_FORMAT).to_string()),
        ];
        let applied = self.set_sim_options(&options)?;
        for (key, _) in &options {
            if !applied.contains(key) {
                return Err(DatasetError::MissingOption {
                    path: self.file("ALL"),
                    option: key.clone(),
                });
            }
        }
        Ok(())
    }

    /// Set existing calibration parameters in the KAL file.
    pub fn set_calibration_parameters(
        &self,
        parameters: &[(String, String)],
    ) -> DatasetResult<Vec<String>> {
        let path = self.file("KAL");
        if !path.exists() {
            return Err(DatasetError::MissingFile { path });
        }
        update_options(&path, KAL_FILE, parameters)
    }

    pub fn calibration_parameters(&self) -> DatasetResult<Vec<(String, String)>> {
        let path = self.file("KAL");
        if !path.exists() {
            return Err(DatasetError::MissingFile { path });
        }
        read_options(&path, KAL_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_lines_are_not_options() {
        assert_eq!(option_line(b"# SimStart=x", ALL_FILE), None);
        assert_eq!(option_line(b"* SimStart=x", ALL_FILE), None);
        assert_eq!(option_line(b"[Section]", ALL_FILE), None);
        assert_eq!(
            option_line(b"SimStart = 01.01.2020 00:00\r", ALL_FILE),
            Some(("SimStart".to_string(), "01.01.2020 00:00".to_string()))
        );
        assert_eq!(
            option_line(b"* Factor=2", KAL_FILE),
            Some(("* Factor".to_string(), "2".to_string()))
        );
    }
}
