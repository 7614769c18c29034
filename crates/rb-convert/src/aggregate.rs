//! Engine result series → generic output series.
//!
//! Each output group (output table rows sharing a `(locationId, parameterId)`)
//! becomes one series: the scaled member sequences summed point by point.

use chrono::NaiveDateTime;
use rb_dataset::EngineOutput;
use rb_mapping::MappingTable;
use rb_model::{Interpretation, TimeSeries};

use crate::{ConvertError, ConvertResult};

/// A named engine result sequence, borrowed from its source.
#[derive(Debug, Clone, Copy)]
pub struct SourceSequence<'a> {
    pub unit: &'a str,
    pub timestamps: &'a [NaiveDateTime],
    pub values: &'a [f64],
}

/// Anything engine result sequences can be looked up in by name.
pub trait OutputSource {
    fn sequence(&self, name: &str) -> Option<SourceSequence<'_>>;
}

impl OutputSource for EngineOutput {
    fn sequence(&self, name: &str) -> Option<SourceSequence<'_>> {
        self.column(name).map(|c| SourceSequence {
            unit: &c.unit,
            timestamps: &self.timestamps,
            values: &c.values,
        })
    }
}

/// Several result files; the first file containing a name wins.
impl OutputSource for [EngineOutput] {
    fn sequence(&self, name: &str) -> Option<SourceSequence<'_>> {
        self.iter().find_map(|output| output.sequence(name))
    }
}

pub struct ResultAggregator<'a> {
    table: &'a MappingTable,
    wanted: Vec<String>,
}

impl<'a> ResultAggregator<'a> {
    /// `wanted` lists the parameter ids to produce; other groups are ignored.
    pub fn new<I, S>(table: &'a MappingTable, wanted: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            table,
            wanted: wanted.into_iter().map(Into::into).collect(),
        }
    }

    fn is_wanted(&self, parameter_id: &str) -> bool {
        self.wanted.iter().any(|w| w == parameter_id)
    }

    pub fn aggregate<S: OutputSource + ?Sized>(&self, source: &S) -> ConvertResult<Vec<TimeSeries>> {
        for wanted in &self.wanted {
            if self.table.records_for_parameter(wanted).next().is_none() {
                tracing::warn!(parameter = %wanted, "result variable has no output mapping");
            }
        }

        let mut outputs = Vec::new();
        for group in self.table.groups() {
            if !self.is_wanted(&group.key.parameter_id) {
                continue;
            }
            let output = group.key.to_string();

            let mut grid: Option<&[NaiveDateTime]> = None;
            let mut unit = String::new();
            let mut sum: Vec<f64> = Vec::new();

            for record in &group.members {
                let seq = source.sequence(&record.target_key).ok_or_else(|| {
                    ConvertError::MissingOutputSequence {
                        output: output.clone(),
                        sequence: record.target_key.clone(),
                    }
                })?;
                let scaled = record.scale.apply_all(seq.values);

                match grid {
                    None => {
                        grid = Some(seq.timestamps);
                        unit = record.unit.clone().unwrap_or_else(|| seq.unit.to_string());
                        sum = scaled;
                    }
                    Some(first) => {
                        if first != seq.timestamps {
                            return Err(ConvertError::MisalignedSeries {
                                output,
                                sequence: record.target_key.clone(),
                                reason: format!(
                                    "has {} time steps on a grid differing from the first member's {}",
                                    seq.timestamps.len(),
                                    first.len()
                                ),
                            });
                        }
                        for (acc, v) in sum.iter_mut().zip(scaled) {
                            *acc += v;
                        }
                    }
                }
            }

            let timestamps = grid.unwrap_or_default();
            let series = TimeSeries::from_points(
                &group.key.location_id,
                &group.key.parameter_id,
                unit,
                timestamps.iter().copied().zip(sum),
            )?
            .with_interpretation(Interpretation::BlockRight);

            tracing::debug!(
                output = %output,
                members = group.members.len(),
                points = series.len(),
                "aggregated output series"
            );
            outputs.push(series);
        }
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rb_core::ScaleFactors;
    use rb_dataset::OutputColumn;
    use rb_mapping::{MappingRecord, MappingRole};

    fn hours(n: u32) -> Vec<NaiveDateTime> {
        (0..n)
            .map(|h| {
                NaiveDate::from_ymd_opt(2020, 1, 1)
                    .unwrap()
                    .and_hms_opt(h, 0, 0)
                    .unwrap()
            })
            .collect()
    }

    fn output(columns: &[(&str, Vec<f64>)]) -> EngineOutput {
        EngineOutput {
            timestamps: hours(columns[0].1.len() as u32),
            columns: columns
                .iter()
                .map(|(name, values)| OutputColumn {
                    name: name.to_string(),
                    unit: "m3/s".to_string(),
                    values: values.clone(),
                })
                .collect(),
        }
    }

    fn table(records: Vec<MappingRecord>) -> MappingTable {
        MappingTable::from_records(MappingRole::Output, "out.tsv", records).unwrap()
    }

    #[test]
    fn two_sources_are_summed() {
        let table = table(vec![
            MappingRecord::new("L1", "Q", "A"),
            MappingRecord::new("L1", "Q", "B"),
        ]);
        let source = output(&[("A", vec![1.0, 2.0]), ("B", vec![3.0, 4.0])]);

        let series = ResultAggregator::new(&table, ["Q"]).aggregate(&source).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].values(), vec![4.0, 6.0]);
        assert_eq!(series[0].unit, "m3/s");
        assert_eq!(series[0].interpretation, Interpretation::BlockRight);
        assert_eq!(series[0].timestamps(), hours(2));
    }

    #[test]
    fn members_are_scaled_before_summing() {
        let table = table(vec![
            MappingRecord::new("L1", "Q", "A").with_scale(ScaleFactors::new(2.0, 1.0, 1.0).unwrap()),
            MappingRecord::new("L1", "Q", "B")
                .with_scale(ScaleFactors::new(1.0, 4.0, 1.0).unwrap())
                .with_unit("l/s"),
        ]);
        let source = output(&[("A", vec![1.0]), ("B", vec![8.0])]);
        let series = ResultAggregator::new(&table, ["Q"]).aggregate(&source).unwrap();
        assert_eq!(series[0].values(), vec![4.0]);
        assert_eq!(series[0].unit, "m3/s");
    }

    #[test]
    fn unwanted_parameters_are_ignored() {
        let table = table(vec![
            MappingRecord::new("L1", "Q", "A"),
            MappingRecord::new("L1", "P", "MISSING"),
        ]);
        let source = output(&[("A", vec![1.0])]);
        let series = ResultAggregator::new(&table, ["Q"]).aggregate(&source).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].parameter_id, "Q");

        let none = ResultAggregator::new(&table, Vec::<String>::new())
            .aggregate(&source)
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn missing_sequence_is_reported() {
        let table = table(vec![MappingRecord::new("L1", "Q", "GONE")]);
        let source = output(&[("A", vec![1.0])]);
        let err = ResultAggregator::new(&table, ["Q"]).aggregate(&source).unwrap_err();
        match err {
            ConvertError::MissingOutputSequence { output, sequence } => {
                assert_eq!(output, "L1.Q");
                assert_eq!(sequence, "GONE");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn different_grids_are_misaligned() {
        let table = table(vec![
            MappingRecord::new("L1", "Q", "A"),
            MappingRecord::new("L1", "Q", "B"),
        ]);
        let sources = vec![output(&[("A", vec![1.0, 2.0])]), output(&[("B", vec![1.0, 2.0, 3.0])])];
        let err = ResultAggregator::new(&table, ["Q"])
            .aggregate(sources.as_slice())
            .unwrap_err();
        assert!(matches!(err, ConvertError::MisalignedSeries { ref sequence, .. } if sequence == "B"));
    }

    #[test]
    fn sequences_are_found_across_files() {
        let table = table(vec![
            MappingRecord::new("L1", "Q", "A"),
            MappingRecord::new("L1", "Q", "B"),
        ]);
        let sources = vec![output(&[("A", vec![1.0, 2.0])]), output(&[("B", vec![0.5, 0.5])])];
        let series = ResultAggregator::new(&table, ["Q"])
            .aggregate(sources.as_slice())
            .unwrap();
        assert_eq!(series[0].values(), vec![1.5, 2.5]);
    }
}
