//! Input time series → engine BIN files.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rb_core::SeriesKey;
use rb_dataset::write_bin;
use rb_mapping::{MappingError, MappingTable};
use rb_model::TimeSeries;

use crate::ConvertResult;

/// One written BIN file.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestedSeries {
    pub key: SeriesKey,
    /// Engine time series id (`zreId`).
    pub target: String,
    pub path: PathBuf,
    pub points: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    pub files: Vec<IngestedSeries>,
}

impl IngestReport {
    pub fn total_points(&self) -> usize {
        self.files.iter().map(|f| f.points).sum()
    }
}

pub struct TimeSeriesIngestor<'a> {
    table: &'a MappingTable,
}

impl<'a> TimeSeriesIngestor<'a> {
    pub fn new(table: &'a MappingTable) -> Self {
        Self { table }
    }

    /// Resolve the engine id of every series; fails before anything is written.
    fn resolve<'s>(&self, series: &'s [TimeSeries]) -> ConvertResult<Vec<(&'s TimeSeries, String)>> {
        let mut claimed: HashMap<String, SeriesKey> = HashMap::new();
        let mut resolved = Vec::with_capacity(series.len());

        for ts in series {
            let record = self.table.lookup_unique(&ts.location_id, &ts.parameter_id)?;
            let target = record.target_key.clone();
            if let Some(previous) = claimed.get(&target) {
                return Err(MappingError::ConflictingMapping {
                    table: self.table.name().to_string(),
                    subject: format!("engine series {target}"),
                    first: previous.to_string(),
                    second: ts.key().to_string(),
                }
                .into());
            }
            claimed.insert(target.clone(), ts.key());
            resolved.push((ts, target));
        }
        Ok(resolved)
    }

    /// Write one `<out_dir>/<zreId>.bin` per input series.
    pub fn ingest(&self, series: &[TimeSeries], out_dir: &Path) -> ConvertResult<IngestReport> {
        let resolved = self.resolve(series)?;

        let mut report = IngestReport::default();
        for (ts, target) in resolved {
            let path = out_dir.join(format!("{target}.bin"));
            write_bin(&path, ts.points())?;
            tracing::debug!(
                series = %ts.key(),
                target = %target,
                points = ts.len(),
                "wrote input series"
            );
            report.files.push(IngestedSeries {
                key: ts.key(),
                target,
                path,
                points: ts.len(),
            });
        }

        tracing::info!(
            files = report.files.len(),
            points = report.total_points(),
            dir = %out_dir.display(),
            "ingested input series"
        );
        Ok(report)
    }
}
