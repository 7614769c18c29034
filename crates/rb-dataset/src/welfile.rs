//! Engine result files.
//!
//! WEL files are text tables with 16-character columns. WBL files hold the
//! same data in binary form and are described by a `.WELINFO` sidecar.
//! Both are read into an [`EngineOutput`]: one shared time axis and one
//! column per result series.

use std::fs;
use std::io::Cursor;
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use chrono::NaiveDateTime;
use rb_core::is_engine_missing;

use crate::format::{ENGINE_DATE_FORMAT, from_engine_hours};
use crate::{DatasetError, DatasetResult, io_error};

const COLUMN_WIDTH: usize = 16;

#[derive(Debug, Clone, PartialEq)]
pub struct OutputColumn {
    pub name: String,
    pub unit: String,
    pub values: Vec<f64>,
}

/// All series of one result file, sharing `timestamps`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineOutput {
    pub timestamps: Vec<NaiveDateTime>,
    pub columns: Vec<OutputColumn>,
}

impl EngineOutput {
    pub fn column(&self, name: &str) -> Option<&OutputColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

/// Read a WEL or WBL file, chosen by extension.
pub fn read_result_file(path: &Path) -> DatasetResult<EngineOutput> {
    let is_wbl = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("wbl"));
    if is_wbl { read_wbl(path) } else { read_wel(path) }
}

fn field(chars: &[char], idx: usize) -> String {
    let start = (idx * COLUMN_WIDTH).min(chars.len());
    let end = (start + COLUMN_WIDTH).min(chars.len());
    chars[start..end].iter().collect()
}

fn parse_wel_date(text: &str) -> Option<NaiveDateTime> {
    // The engine sometimes leaves the time blank.
    let fixed;
    let text = if let Some(date) = text.strip_suffix("  :  ") {
        fixed = format!("{date}00:00");
        fixed.as_str()
    } else {
        text
    };
    NaiveDateTime::parse_from_str(text.trim(), ENGINE_DATE_FORMAT).ok()
}

/// Read a WEL text result file.
pub fn read_wel(path: &Path) -> DatasetResult<EngineOutput> {
    let bytes = fs::read(path).map_err(io_error(path))?;
    let content = String::from_utf8_lossy(&bytes);

    let mut output = EngineOutput::default();
    for (i, raw) in content.lines().enumerate() {
        let line_no = i + 1;
        // every line starts with one padding character
        let chars: Vec<char> = raw.chars().skip(1).collect();
        let len = chars
            .iter()
            .rposition(|c| !c.is_whitespace())
            .map_or(0, |p| p + 1);
        let chars = &chars[..len];

        match line_no {
            1 => continue,
            2 => {
                let n = chars.len() / COLUMN_WIDTH;
                output.columns = (1..n)
                    .map(|idx| OutputColumn {
                        name: field(chars, idx).trim().to_string(),
                        unit: String::new(),
                        values: Vec::new(),
                    })
                    .collect();
            }
            3 => {
                for (idx, column) in output.columns.iter_mut().enumerate() {
                    column.unit = field(chars, idx + 1).trim().to_string();
                }
            }
            _ => {
                if chars.is_empty() {
                    continue;
                }
                let date_text = field(chars, 0);
                let timestamp =
                    parse_wel_date(&date_text).ok_or_else(|| DatasetError::Malformed {
                        path: path.to_path_buf(),
                        line: line_no,
                        reason: format!("unreadable date '{date_text}'"),
                    })?;
                output.timestamps.push(timestamp);
                for (idx, column) in output.columns.iter_mut().enumerate() {
                    let text = field(chars, idx + 1);
                    let value = text.trim().parse::<f64>().unwrap_or_else(|_| {
                        tracing::warn!(
                            file = %path.display(),
                            %timestamp,
                            series = %column.name,
                            value = %text,
                            "interpreting unreadable value as NaN"
                        );
                        f64::NAN
                    });
                    column.values.push(value);
                }
            }
        }
    }

    if output.columns.is_empty() {
        return Err(DatasetError::NoColumns {
            path: path.to_path_buf(),
        });
    }
    Ok(output)
}

/// Storage type of WBL values, from `Datentyp=` in the sidecar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DataType {
    Int32,
    Float32,
    Float64,
    Bool,
}

impl DataType {
    fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(DataType::Int32),
            2 => Some(DataType::Float32),
            3 => Some(DataType::Float64),
            4 => Some(DataType::Bool),
            _ => None,
        }
    }

    fn width(self) -> usize {
        match self {
            DataType::Int32 | DataType::Float32 => 4,
            DataType::Float64 => 8,
            DataType::Bool => 1,
        }
    }

    fn read(self, cursor: &mut Cursor<Vec<u8>>) -> std::io::Result<f64> {
        Ok(match self {
            DataType::Int32 => cursor.read_i32::<LittleEndian>()? as f64,
            DataType::Float32 => cursor.read_f32::<LittleEndian>()? as f64,
            DataType::Float64 => cursor.read_f64::<LittleEndian>()?,
            DataType::Bool => f64::from(u8::from(cursor.read_u8()? != 0)),
        })
    }
}

struct WelInfo {
    data_type: DataType,
    /// `(name, unit)` in file order.
    columns: Vec<(String, String)>,
}

fn read_welinfo(path: &Path) -> DatasetResult<WelInfo> {
    if !path.exists() {
        return Err(DatasetError::MissingSidecar {
            path: path.to_path_buf(),
        });
    }
    let bytes = fs::read(path).map_err(io_error(path))?;
    let content = String::from_utf8_lossy(&bytes);

    let mut code = None;
    let mut columns = Vec::new();
    let mut in_elements = false;
    for (i, line) in content.lines().enumerate() {
        let line = line.trim();
        if !in_elements {
            if let Some(value) = line.strip_prefix("Datentyp=") {
                code = Some(value.trim().parse::<i32>().map_err(|_| DatasetError::Malformed {
                    path: path.to_path_buf(),
                    line: i + 1,
                    reason: format!("invalid data type '{value}'"),
                })?);
            } else if line.starts_with("[Elemente]") {
                in_elements = true;
            }
            continue;
        }
        if line.is_empty() {
            continue;
        }
        // name;description;location;unit;index
        let parts: Vec<&str> = line.split(';').collect();
        if parts.len() < 4 {
            return Err(DatasetError::Malformed {
                path: path.to_path_buf(),
                line: i + 1,
                reason: "expected name;description;location;unit;index".to_string(),
            });
        }
        columns.push((parts[0].trim().to_string(), parts[3].trim().to_string()));
    }

    if columns.is_empty() {
        return Err(DatasetError::NoColumns {
            path: path.to_path_buf(),
        });
    }
    let code = code.ok_or_else(|| DatasetError::Malformed {
        path: path.to_path_buf(),
        line: 0,
        reason: "no Datentyp= entry".to_string(),
    })?;
    let data_type = DataType::from_code(code).ok_or_else(|| DatasetError::UnknownDataType {
        path: path.to_path_buf(),
        code,
    })?;

    Ok(WelInfo { data_type, columns })
}

/// Read a WBL binary result file together with its `.WELINFO` sidecar.
pub fn read_wbl(path: &Path) -> DatasetResult<EngineOutput> {
    let info = read_welinfo(&path.with_extension("WELINFO"))?;
    let bytes = fs::read(path).map_err(io_error(path))?;

    let record_len = 8 + info.data_type.width() * info.columns.len();
    let len = bytes.len();
    if len < record_len || len % record_len != 0 {
        return Err(DatasetError::Truncated {
            path: path.to_path_buf(),
            len: len as u64,
        });
    }

    let mut output = EngineOutput {
        timestamps: Vec::new(),
        columns: info
            .columns
            .into_iter()
            .map(|(name, unit)| OutputColumn {
                name,
                unit,
                values: Vec::new(),
            })
            .collect(),
    };

    let mut cursor = Cursor::new(bytes);
    // the first record is a header of the same size
    cursor.set_position(record_len as u64);
    let records = len / record_len - 1;
    for _ in 0..records {
        let hours = cursor.read_f64::<LittleEndian>().map_err(io_error(path))?;
        let timestamp = from_engine_hours(hours).ok_or_else(|| DatasetError::InvalidTimestamp {
            path: path.to_path_buf(),
            hours,
        })?;
        output.timestamps.push(timestamp);
        for column in output.columns.iter_mut() {
            let raw = info.data_type.read(&mut cursor).map_err(io_error(path))?;
            column
                .values
                .push(if is_engine_missing(raw) { f64::NAN } else { raw });
        }
    }

    tracing::debug!(
        file = %path.display(),
        records,
        columns = output.columns.len(),
        "read WBL file"
    );
    Ok(output)
}
