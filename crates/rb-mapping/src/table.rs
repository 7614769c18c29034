//! In-memory mapping tables.

use std::collections::HashMap;

use rb_core::{ScaleFactors, SeriesKey};
use serde::Serialize;

use crate::{MappingError, MappingResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingRole {
    Ingestion,
    Variable,
    Output,
}

impl MappingRole {
    /// Columns that must be present in the header row.
    pub fn required_columns(self) -> &'static [&'static str] {
        match self {
            MappingRole::Ingestion => &["locationId", "parameterId", "zreId"],
            MappingRole::Variable => &[
                "locationId",
                "parameterId",
                "elementKey",
                "AreaFactor",
                "Area",
                "UnitFactor",
            ],
            MappingRole::Output => &[
                "locationId",
                "parameterId",
                "elementId",
                "resultType",
                "AreaFactor",
            ],
        }
    }

    /// Output tables sum repeated keys; the other roles are one-to-one.
    pub fn allows_repeated_keys(self) -> bool {
        matches!(self, MappingRole::Output)
    }

    pub fn label(self) -> &'static str {
        match self {
            MappingRole::Ingestion => "ingestion",
            MappingRole::Variable => "variable",
            MappingRole::Output => "output",
        }
    }
}

/// One row of a mapping table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappingRecord {
    pub location_id: String,
    pub parameter_id: String,
    /// Engine-side identifier: time series id, element key or result series name.
    pub target_key: String,
    pub scale: ScaleFactors,
    /// Unit override for output series.
    pub unit: Option<String>,
}

impl MappingRecord {
    pub fn new(
        location_id: impl Into<String>,
        parameter_id: impl Into<String>,
        target_key: impl Into<String>,
    ) -> Self {
        Self {
            location_id: location_id.into(),
            parameter_id: parameter_id.into(),
            target_key: target_key.into(),
            scale: ScaleFactors::IDENTITY,
            unit: None,
        }
    }

    pub fn with_scale(mut self, scale: ScaleFactors) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn key(&self) -> SeriesKey {
        SeriesKey::new(&self.location_id, &self.parameter_id)
    }
}

/// Records of an output table that share one `(locationId, parameterId)`.
#[derive(Debug, Clone)]
pub struct OutputGroup<'a> {
    pub key: SeriesKey,
    pub members: Vec<&'a MappingRecord>,
}

#[derive(Debug, Clone)]
pub struct MappingTable {
    role: MappingRole,
    name: String,
    records: Vec<MappingRecord>,
    index: HashMap<SeriesKey, Vec<usize>>,
    /// Keys in order of first appearance.
    order: Vec<SeriesKey>,
}

impl MappingTable {
    /// Build a table from already-parsed records.
    ///
    /// Ingestion and variable tables reject repeated keys with
    /// [`MappingError::ConflictingMapping`].
    pub fn from_records(
        role: MappingRole,
        name: impl Into<String>,
        records: Vec<MappingRecord>,
    ) -> MappingResult<Self> {
        let name = name.into();
        let mut index: HashMap<SeriesKey, Vec<usize>> = HashMap::new();
        let mut order = Vec::new();

        for (i, record) in records.iter().enumerate() {
            let key = record.key();
            match index.get_mut(&key) {
                Some(existing) => {
                    if !role.allows_repeated_keys() {
                        let first = &records[existing[0]];
                        return Err(MappingError::ConflictingMapping {
                            table: name,
                            subject: format!("key {key}"),
                            first: first.target_key.clone(),
                            second: record.target_key.clone(),
                        });
                    }
                    existing.push(i);
                }
                None => {
                    order.push(key.clone());
                    index.insert(key, vec![i]);
                }
            }
        }

        Ok(Self {
            role,
            name,
            records,
            index,
            order,
        })
    }

    pub fn role(&self) -> MappingRole {
        self.role
    }

    /// File name or label the table was loaded from; used in error messages.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn records(&self) -> &[MappingRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records for a key; empty when the key is not mapped.
    pub fn lookup(&self, location_id: &str, parameter_id: &str) -> Vec<&MappingRecord> {
        self.index
            .get(&SeriesKey::new(location_id, parameter_id))
            .map(|ids| ids.iter().map(|i| &self.records[*i]).collect())
            .unwrap_or_default()
    }

    /// Exactly one record for a key.
    pub fn lookup_unique(&self, location_id: &str, parameter_id: &str) -> MappingResult<&MappingRecord> {
        match self.lookup(location_id, parameter_id).as_slice() {
            [] => Err(MappingError::MissingMapping {
                table: self.name.clone(),
                location_id: location_id.to_string(),
                parameter_id: parameter_id.to_string(),
            }),
            [record] => Ok(*record),
            [first, second, ..] => Err(MappingError::ConflictingMapping {
                table: self.name.clone(),
                subject: format!("key {location_id}.{parameter_id}"),
                first: first.target_key.clone(),
                second: second.target_key.clone(),
            }),
        }
    }

    /// Distinct parameter ids in order of first appearance.
    pub fn parameter_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for record in &self.records {
            if !ids.contains(&record.parameter_id.as_str()) {
                ids.push(&record.parameter_id);
            }
        }
        ids
    }

    pub fn records_for_parameter<'a>(
        &'a self,
        parameter_id: &'a str,
    ) -> impl Iterator<Item = &'a MappingRecord> + 'a {
        self.records
            .iter()
            .filter(move |r| r.parameter_id == parameter_id)
    }

    /// Records grouped by key, in order of first appearance.
    pub fn groups(&self) -> Vec<OutputGroup<'_>> {
        self.order
            .iter()
            .map(|key| OutputGroup {
                key: key.clone(),
                members: self.index[key].iter().map(|i| &self.records[*i]).collect(),
            })
            .collect()
    }
}
