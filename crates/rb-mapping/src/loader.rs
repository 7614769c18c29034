//! Tab-separated mapping file reader.
//!
//! Header names are matched exactly (after trimming). Rows are parsed into
//! typed [`MappingRecord`]s up front so that every column or factor problem is
//! reported at load time with its line number.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use rb_core::{ScaleFactors, composite_id};

use crate::table::{MappingRecord, MappingRole, MappingTable};
use crate::{MappingError, MappingResult};

impl MappingTable {
    /// Load a mapping table from a tab-separated file with a header row.
    pub fn load(path: &Path, role: MappingRole) -> MappingResult<Self> {
        let file = File::open(path).map_err(|source| MappingError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        let table = Self::from_reader(file, role, &name)?;
        tracing::debug!(
            table = %name,
            role = role.label(),
            records = table.len(),
            "loaded mapping table"
        );
        Ok(table)
    }

    /// Parse a mapping table from any reader; `name` labels error messages.
    pub fn from_reader<R: Read>(reader: R, role: MappingRole, name: &str) -> MappingResult<Self> {
        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        let headers = reader
            .headers()
            .map_err(|source| MappingError::Csv {
                table: name.to_string(),
                source,
            })?
            .clone();
        let columns = Columns::resolve(&headers, role, name)?;

        let mut records = Vec::new();
        for (i, row) in reader.records().enumerate() {
            let row = row.map_err(|source| MappingError::Csv {
                table: name.to_string(),
                source,
            })?;
            if row.iter().all(|field| field.is_empty()) {
                continue;
            }
            // header is line 1
            let line = row
                .position()
                .map(|p| p.line())
                .unwrap_or(i as u64 + 2);
            records.push(columns.parse_row(&row, line, role, name)?);
        }

        MappingTable::from_records(role, name, records)
    }
}

/// Header name → column index for one table.
struct Columns {
    index: HashMap<String, usize>,
}

impl Columns {
    fn resolve(headers: &StringRecord, role: MappingRole, table: &str) -> MappingResult<Self> {
        let index: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.to_string(), i))
            .collect();

        for column in role.required_columns() {
            if !index.contains_key(*column) {
                return Err(MappingError::MalformedMapping {
                    table: table.to_string(),
                    line: 1,
                    column: column.to_string(),
                    reason: format!("required column missing for {} table", role.label()),
                });
            }
        }

        Ok(Self { index })
    }

    fn optional<'r>(&self, row: &'r StringRecord, column: &str) -> Option<&'r str> {
        self.index
            .get(column)
            .and_then(|i| row.get(*i))
            .filter(|v| !v.is_empty())
    }

    fn required<'r>(
        &self,
        row: &'r StringRecord,
        column: &str,
        line: u64,
        table: &str,
    ) -> MappingResult<&'r str> {
        self.optional(row, column)
            .ok_or_else(|| MappingError::MalformedMapping {
                table: table.to_string(),
                line,
                column: column.to_string(),
                reason: "value missing".to_string(),
            })
    }

    fn factor(
        &self,
        row: &StringRecord,
        column: &str,
        default: Option<f64>,
        line: u64,
        table: &str,
    ) -> MappingResult<f64> {
        let raw = match (self.optional(row, column), default) {
            (Some(raw), _) => raw,
            (None, Some(default)) => return Ok(default),
            (None, None) => return self.required(row, column, line, table).map(|_| 0.0),
        };
        raw.parse::<f64>()
            .map_err(|_| MappingError::MalformedMapping {
                table: table.to_string(),
                line,
                column: column.to_string(),
                reason: format!("'{raw}' is not a number"),
            })
    }

    fn parse_row(
        &self,
        row: &StringRecord,
        line: u64,
        role: MappingRole,
        table: &str,
    ) -> MappingResult<MappingRecord> {
        let location_id = self.required(row, "locationId", line, table)?;
        let parameter_id = self.required(row, "parameterId", line, table)?;

        let record = match role {
            MappingRole::Ingestion => {
                let zre_id = self.required(row, "zreId", line, table)?;
                MappingRecord::new(location_id, parameter_id, zre_id)
            }
            MappingRole::Variable => {
                let element_key = self.required(row, "elementKey", line, table)?;
                let scale = self.scale(row, None, line, table)?;
                MappingRecord::new(location_id, parameter_id, element_key).with_scale(scale)
            }
            MappingRole::Output => {
                let element_id = self.required(row, "elementId", line, table)?;
                let result_type = self.required(row, "resultType", line, table)?;
                let scale = self.scale(row, Some(1.0), line, table)?;
                let mut record = MappingRecord::new(
                    location_id,
                    parameter_id,
                    composite_id(element_id, result_type),
                )
                .with_scale(scale);
                if let Some(unit) = self.optional(row, "unit") {
                    record = record.with_unit(unit);
                }
                record
            }
        };

        Ok(record)
    }

    /// `AreaFactor` is always required; `Area` and `UnitFactor` fall back to
    /// `optional_default` when given.
    fn scale(
        &self,
        row: &StringRecord,
        optional_default: Option<f64>,
        line: u64,
        table: &str,
    ) -> MappingResult<ScaleFactors> {
        let area_factor = self.factor(row, "AreaFactor", None, line, table)?;
        let area = self.factor(row, "Area", optional_default, line, table)?;
        let unit_factor = self.factor(row, "UnitFactor", optional_default, line, table)?;

        ScaleFactors::new(area_factor, area, unit_factor).map_err(|err| {
            let column = match err {
                rb_core::CoreError::NonFinite { what, .. }
                | rb_core::CoreError::ZeroDivisor { what } => what,
            };
            MappingError::MalformedMapping {
                table: table.to_string(),
                line,
                column: column.to_string(),
                reason: err.to_string(),
            }
        })
    }
}
