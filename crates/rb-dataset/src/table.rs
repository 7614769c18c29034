//! Fixed-width dataset tables (BOA, BOD, EFL, EZG, ...).
//!
//! The first line containing `<` marks the columns: a column runs from a `<`
//! to the matching `>`, and a `+` marks a one-character column. Data rows
//! follow the marker line. The last line of the file is a footer.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::dataset::Dataset;
use crate::{DatasetError, DatasetResult, io_error};

const BOA_COLUMNS: &[&str] = &[
    "ID", "Soil", "BD", "Typ", "WP", "FK", "GPV", "kf", "maxInf", "maxKap", "Bemerkung",
];

const BOD_COLUMNS: &[&str] = &[
    "ID", "anzsch", "d1", "boa1", "d2", "boa2", "d3", "boa3", "d4", "boa4", "d5", "boa5", "d6",
    "boa6", "Bemerkung",
];

const EFL_COLUMNS: &[&str] = &[
    "EZG", "Gef", "Flaeche", "Bod", "Lnz", "CN", "Typ", "mi", "xPos", "yPos", "Symbol",
];

const EZG_COLUMNS: &[&str] = &[
    "Bez", "KNG", "AUnit", "A", "Vg", "Ho", "Hu", "L", "N_Datei", "Evp_Kng", "Evp_Sum",
    "Evp_Datei", "Evp_HYO", "T_Kng", "T_Tem", "T_JGG", "T_TGG", "T_Datei", "QBASIS_qB",
    "QBASIS_JGG", "PSI", "SCS_CN", "SCS_VorRg", "BF0", "Ret_R", "Ret_K(VG)", "Ret_K1", "Ret_K2",
    "Ret_Int", "Ret_Bas", "SCS_con", "SCS_Expo", "Beta1", "Beta2", "Opt_Muld", "Opt_SCS",
    "Opt_SCH", "Opt_Int2_bool", "Opt_Int2", "Abl_QUrb", "Abl_QNat", "Abl_QInt", "Abl_QIn2",
    "Abl_QBas", "Abl_QGWt", "Grun_Bas2_bool", "Grun_Bas2", "Grun_Beta", "Schn_Kng",
    "Schn_Abgabe", "Schn_WaEquiva", "Scale_Precip", "CWR_Demand_bool",
];

/// Most soil layers a BOD row can describe.
const MAX_SOIL_LAYERS: usize = 6;

/// Column names and the supported `VERSION=` of a known table.
fn table_layout(kind: &str) -> (Option<&'static [&'static str]>, Option<&'static str>) {
    match kind.to_ascii_uppercase().as_str() {
        "BOA" => (Some(BOA_COLUMNS), Some("2.0")),
        "BOD" => (Some(BOD_COLUMNS), None),
        "EFL" => (Some(EFL_COLUMNS), Some("1.2")),
        "EZG" => (Some(EZG_COLUMNS), Some("1.7")),
        _ => (None, None),
    }
}

/// One data row; `line` is 1-based.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub line: usize,
    pub cells: Vec<Option<String>>,
}

#[derive(Debug, Clone)]
pub struct DatasetTable {
    path: PathBuf,
    columns: Vec<String>,
    rows: Vec<TableRow>,
}

impl DatasetTable {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Trimmed text of a cell; `None` when the cell is blank.
    pub fn text<'r>(&self, row: &'r TableRow, column: usize) -> Option<&'r str> {
        row.cells.get(column).and_then(|c| c.as_deref())
    }

    /// Numeric value of a cell. Blank and non-numeric cells are errors.
    pub fn number(&self, row: &TableRow, column: usize) -> DatasetResult<f64> {
        let name = self.columns.get(column).map(String::as_str).unwrap_or("?");
        let text = self
            .text(row, column)
            .ok_or_else(|| self.malformed(row, format!("column '{name}' is empty")))?;
        text.parse::<f64>().map_err(|_| {
            self.malformed(row, format!("column '{name}': '{text}' is not a number"))
        })
    }

    /// Numeric value of the named column.
    pub fn number_by_name(&self, row: &TableRow, name: &str) -> DatasetResult<f64> {
        let column = self.column_index(name).ok_or_else(|| DatasetError::Malformed {
            path: self.path.clone(),
            line: 0,
            reason: format!("no column '{name}'"),
        })?;
        self.number(row, column)
    }

    fn malformed(&self, row: &TableRow, reason: String) -> DatasetError {
        DatasetError::Malformed {
            path: self.path.clone(),
            line: row.line,
            reason,
        }
    }
}

/// `(start, end)` character ranges from a marker line.
fn column_ranges(marker: &[char]) -> Vec<(usize, usize)> {
    let mut starts = Vec::new();
    let mut ends = Vec::new();
    for (i, c) in marker.iter().enumerate() {
        match c {
            '<' => starts.push(i),
            '>' => ends.push(i + 1),
            '+' => {
                starts.push(i);
                ends.push(i + 1);
            }
            _ => {}
        }
    }
    starts.into_iter().zip(ends).collect()
}

fn cell(chars: &[char], (start, end): (usize, usize)) -> Option<String> {
    let start = start.min(chars.len());
    let end = end.min(chars.len());
    let text: String = chars[start..end].iter().collect();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn check_version(path: &Path, lines: &[Vec<char>], supported: &str) -> DatasetResult<()> {
    let found = lines.iter().find_map(|chars| {
        let line: String = chars.iter().collect();
        line.starts_with("VERSION=")
            .then(|| line.rsplit('=').next().unwrap_or_default().trim().to_string())
    });
    match found {
        Some(version) if version == supported => Ok(()),
        found => Err(DatasetError::UnsupportedVersion {
            path: path.to_path_buf(),
            found,
            supported: supported.to_string(),
        }),
    }
}

/// Read a fixed-width table file. `kind` is the file extension and selects
/// the column names and version check of the known tables; columns of other
/// tables are numbered from 1.
pub fn read_table(path: &Path, kind: &str) -> DatasetResult<DatasetTable> {
    if !path.is_file() {
        return Err(DatasetError::MissingFile {
            path: path.to_path_buf(),
        });
    }
    let bytes = fs::read(path).map_err(io_error(path))?;
    // Tables are written in a single-byte code page; one byte is one column.
    let lines: Vec<Vec<char>> = bytes
        .split(|&b| b == b'\n')
        .map(|line| {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            line.iter().map(|&b| char::from(b)).collect()
        })
        .collect();

    let (names, version) = table_layout(kind);
    if let Some(supported) = version {
        check_version(path, &lines, supported)?;
    }

    let marker_idx = lines
        .iter()
        .position(|l| l.contains(&'<'))
        .ok_or_else(|| DatasetError::Malformed {
            path: path.to_path_buf(),
            line: 0,
            reason: "no column marker line".to_string(),
        })?;
    let ranges = column_ranges(&lines[marker_idx]);

    let columns: Vec<String> = match names {
        Some(names) if names.len() != ranges.len() => {
            return Err(DatasetError::Malformed {
                path: path.to_path_buf(),
                line: marker_idx + 1,
                reason: format!(
                    "{kind} table needs {} columns, marker line has {}",
                    names.len(),
                    ranges.len()
                ),
            });
        }
        Some(names) => names.iter().map(|n| n.to_string()).collect(),
        None => (1..=ranges.len()).map(|i| i.to_string()).collect(),
    };

    let mut body: Vec<(usize, &Vec<char>)> = lines
        .iter()
        .enumerate()
        .skip(marker_idx + 1)
        .filter(|(_, l)| l.iter().any(|c| !c.is_whitespace()))
        .collect();
    // footer
    body.pop();

    let rows = body
        .into_iter()
        .map(|(i, chars)| TableRow {
            line: i + 1,
            cells: ranges.iter().map(|&r| cell(chars, r)).collect(),
        })
        .collect::<Vec<_>>();

    tracing::debug!(
        file = %path.display(),
        columns = columns.len(),
        rows = rows.len(),
        "read dataset table"
    );
    Ok(DatasetTable {
        path: path.to_path_buf(),
        columns,
        rows,
    })
}

/// Depth-weighted soil properties of one soil profile.
#[derive(Debug, Clone, PartialEq)]
pub struct SoilAverage {
    pub soil_id: String,
    /// Wilting point (WP).
    pub wilting_point: f64,
    /// Field capacity (FK).
    pub field_capacity: f64,
    /// Total pore volume (GPV).
    pub pore_volume: f64,
}

/// Ids compare as integers when they are integers, so `07` matches `7`.
fn soil_key(id: &str) -> String {
    id.parse::<i64>().map(|n| n.to_string()).unwrap_or_else(|_| id.to_string())
}

impl Dataset {
    /// Read `<name>.<kind>` as a fixed-width table.
    pub fn read_table(&self, kind: &str) -> DatasetResult<DatasetTable> {
        read_table(&self.file(kind), kind)
    }

    /// Average WP, FK and GPV of every soil profile in BOD over its layers,
    /// weighted by layer depth. Layer soil types are looked up in BOA.
    pub fn average_soil_properties(&self) -> DatasetResult<Vec<SoilAverage>> {
        let bod = self.read_table("BOD")?;
        let boa = self.read_table("BOA")?;

        let mut soil_types: HashMap<String, [f64; 3]> = HashMap::new();
        for row in boa.rows() {
            let Some(id) = boa.text(row, 0) else { continue };
            soil_types.insert(
                soil_key(id),
                [
                    boa.number_by_name(row, "WP")?,
                    boa.number_by_name(row, "FK")?,
                    boa.number_by_name(row, "GPV")?,
                ],
            );
        }

        let mut averages = Vec::with_capacity(bod.len());
        for row in bod.rows() {
            let soil_id = bod
                .text(row, 0)
                .ok_or_else(|| bod.malformed(row, "soil profile without id".to_string()))?
                .to_string();
            let layers = bod.number(row, 1)?;
            if layers.fract() != 0.0 || layers < 1.0 || layers > MAX_SOIL_LAYERS as f64 {
                return Err(bod.malformed(row, format!("invalid layer count {layers}")));
            }

            let mut depth_sum = 0.0;
            let mut sums = [0.0; 3];
            for layer in 0..layers as usize {
                let depth = bod.number(row, 2 + 2 * layer)?;
                let soil_type = bod.text(row, 3 + 2 * layer).ok_or_else(|| {
                    bod.malformed(row, format!("layer {} has no soil type", layer + 1))
                })?;
                let props = soil_types.get(&soil_key(soil_type)).ok_or_else(|| {
                    bod.malformed(row, format!("soil type {soil_type} is not in BOA"))
                })?;
                depth_sum += depth;
                for (sum, value) in sums.iter_mut().zip(props) {
                    *sum += value * depth;
                }
            }
            if depth_sum == 0.0 {
                return Err(bod.malformed(row, "layers have zero total depth".to_string()));
            }

            averages.push(SoilAverage {
                soil_id,
                wilting_point: sums[0] / depth_sum,
                field_capacity: sums[1] / depth_sum,
                pore_volume: sums[2] / depth_sum,
            });
        }
        Ok(averages)
    }
}
