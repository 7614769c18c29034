//! State series and model parameters → engine VAR files.

use std::collections::HashMap;
use std::path::PathBuf;

use rb_core::{SeriesKey, composite_id};
use rb_dataset::{Dataset, VarValue, write_var_file};
use rb_mapping::{MappingError, MappingTable};
use rb_model::{ParameterSet, TimeSeries};

use crate::{ConvertError, ConvertResult};

/// Outcome of writing the boolean parameter file.
///
/// Parameters that cannot be written are collected in `errors`; the others
/// are still written.
#[derive(Debug)]
pub struct ParameterConversion {
    pub path: PathBuf,
    /// Identifiers written, in input order.
    pub written: Vec<String>,
    pub errors: Vec<ConvertError>,
}

impl ParameterConversion {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

pub struct StateVariableMapper<'a> {
    dataset: &'a Dataset,
}

impl<'a> StateVariableMapper<'a> {
    pub fn new(dataset: &'a Dataset) -> Self {
        Self { dataset }
    }

    /// Write one `<dataset>_<parameterId>.var` per parameter id of `table`.
    ///
    /// Every state series must be mapped, and at most once per key. Table
    /// rows without a state series are skipped with a warning.
    pub fn map_state_series(
        &self,
        table: &MappingTable,
        states: &[TimeSeries],
    ) -> ConvertResult<Vec<PathBuf>> {
        let mut seen: HashMap<SeriesKey, usize> = HashMap::new();
        for (index, ts) in states.iter().enumerate() {
            table.lookup_unique(&ts.location_id, &ts.parameter_id)?;
            if let Some(first) = seen.insert(ts.key(), index) {
                return Err(MappingError::ConflictingMapping {
                    table: table.name().to_string(),
                    subject: format!("state {}", ts.key()),
                    first: format!("series #{}", first + 1),
                    second: format!("series #{}", index + 1),
                }
                .into());
            }
        }

        let mut written = Vec::new();
        for parameter_id in table.parameter_ids() {
            let mut entries = Vec::new();
            for record in table.records_for_parameter(parameter_id) {
                let Some(ts) = states.iter().find(|s| s.key() == record.key()) else {
                    tracing::warn!(
                        key = %record.key(),
                        element = %record.target_key,
                        "no state series for mapped element; skipping"
                    );
                    continue;
                };
                entries.push((
                    composite_id(&record.target_key, parameter_id),
                    VarValue::Series(record.scale.apply_all(&ts.values())),
                ));
            }

            let path = self.dataset.var_file(parameter_id);
            write_var_file(&path, &entries)?;
            tracing::info!(
                parameter = parameter_id,
                entries = entries.len(),
                file = %path.display(),
                "wrote state file"
            );
            written.push(path);
        }
        Ok(written)
    }

    /// Write boolean parameters to `<dataset>_parameters.var`.
    pub fn map_parameters(&self, parameters: &ParameterSet) -> ConvertResult<ParameterConversion> {
        let mut entries = Vec::new();
        let mut errors = Vec::new();

        for p in parameters.iter() {
            let identifier = p.identifier();
            match p.value.as_bool() {
                Some(flag) => entries.push((identifier, VarValue::Flag(flag))),
                None => {
                    tracing::error!(
                        parameter = %identifier,
                        kind = p.value.type_name(),
                        "unsupported parameter type"
                    );
                    errors.push(ConvertError::UnsupportedParameterType {
                        identifier,
                        type_name: p.value.type_name(),
                    });
                }
            }
        }

        let path = self.dataset.var_file("parameters");
        write_var_file(&path, &entries)?;

        Ok(ParameterConversion {
            path,
            written: entries.into_iter().map(|(id, _)| id).collect(),
            errors,
        })
    }
}
