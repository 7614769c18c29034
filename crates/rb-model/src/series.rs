//! Generic time series.

use chrono::NaiveDateTime;
use rb_core::SeriesKey;
use serde::{Deserialize, Serialize};

use crate::{ModelError, ModelResult};

/// How the values of a series relate to their timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpretation {
    Instantaneous,
    BlockRight,
    BlockLeft,
    Cumulative,
    CumulativePerTimestep,
    #[default]
    Undefined,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub timestamp: NaiveDateTime,
    /// `NaN` marks a missing value.
    pub value: f64,
}

/// A self-describing sequence of timestamped values for one
/// `(locationId, parameterId)` pair.
///
/// Timestamps are strictly increasing; every constructor and the JSON
/// deserializer enforce this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTimeSeries", into = "RawTimeSeries")]
pub struct TimeSeries {
    pub location_id: String,
    pub parameter_id: String,
    pub unit: String,
    pub interpretation: Interpretation,
    points: Vec<Point>,
}

impl TimeSeries {
    pub fn new(
        location_id: impl Into<String>,
        parameter_id: impl Into<String>,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            location_id: location_id.into(),
            parameter_id: parameter_id.into(),
            unit: unit.into(),
            interpretation: Interpretation::Undefined,
            points: Vec::new(),
        }
    }

    pub fn with_interpretation(mut self, interpretation: Interpretation) -> Self {
        self.interpretation = interpretation;
        self
    }

    /// Build a series from `(timestamp, value)` pairs, rejecting unordered or
    /// duplicate timestamps.
    pub fn from_points(
        location_id: impl Into<String>,
        parameter_id: impl Into<String>,
        unit: impl Into<String>,
        points: impl IntoIterator<Item = (NaiveDateTime, f64)>,
    ) -> ModelResult<Self> {
        let mut series = Self::new(location_id, parameter_id, unit);
        for (timestamp, value) in points {
            series.push(timestamp, value)?;
        }
        Ok(series)
    }

    /// Append a point; `timestamp` must be later than the current end.
    pub fn push(&mut self, timestamp: NaiveDateTime, value: f64) -> ModelResult<()> {
        if let Some(last) = self.points.last()
            && timestamp <= last.timestamp
        {
            return Err(ModelError::NonIncreasingTimestamp {
                series: self.key().to_string(),
                previous: last.timestamp,
                next: timestamp,
            });
        }
        self.points.push(Point { timestamp, value });
        Ok(())
    }

    pub fn key(&self) -> SeriesKey {
        SeriesKey::new(&self.location_id, &self.parameter_id)
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn timestamps(&self) -> Vec<NaiveDateTime> {
        self.points.iter().map(|p| p.timestamp).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn start(&self) -> Option<NaiveDateTime> {
        self.points.first().map(|p| p.timestamp)
    }

    pub fn end(&self) -> Option<NaiveDateTime> {
        self.points.last().map(|p| p.timestamp)
    }

    /// Keep only points within `[start, end]` (inclusive).
    pub fn cut(&mut self, start: NaiveDateTime, end: NaiveDateTime) {
        self.points
            .retain(|p| p.timestamp >= start && p.timestamp <= end);
    }
}

#[derive(Serialize, Deserialize)]
struct RawPoint {
    timestamp: NaiveDateTime,
    value: Option<f64>,
}

#[derive(Serialize, Deserialize)]
struct RawTimeSeries {
    location_id: String,
    parameter_id: String,
    #[serde(default)]
    unit: String,
    #[serde(default)]
    interpretation: Interpretation,
    #[serde(default)]
    points: Vec<RawPoint>,
}

impl TryFrom<RawTimeSeries> for TimeSeries {
    type Error = ModelError;

    fn try_from(raw: RawTimeSeries) -> Result<Self, Self::Error> {
        let mut series = TimeSeries::from_points(
            raw.location_id,
            raw.parameter_id,
            raw.unit,
            raw.points
                .into_iter()
                .map(|p| (p.timestamp, p.value.unwrap_or(f64::NAN))),
        )?;
        series.interpretation = raw.interpretation;
        Ok(series)
    }
}

impl From<TimeSeries> for RawTimeSeries {
    fn from(series: TimeSeries) -> Self {
        Self {
            location_id: series.location_id,
            parameter_id: series.parameter_id,
            unit: series.unit,
            interpretation: series.interpretation,
            points: series
                .points
                .into_iter()
                .map(|p| RawPoint {
                    timestamp: p.timestamp,
                    value: if p.value.is_nan() { None } else { Some(p.value) },
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 1, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn push_rejects_duplicate_and_older_timestamps() {
        let mut ts = TimeSeries::new("L1", "P", "mm");
        ts.push(at(1, 0), 1.0).unwrap();
        ts.push(at(1, 1), 2.0).unwrap();

        let err = ts.push(at(1, 1), 3.0).unwrap_err();
        assert!(matches!(err, ModelError::NonIncreasingTimestamp { .. }));
        assert!(ts.push(at(1, 0), 3.0).is_err());
        assert_eq!(ts.len(), 2);
    }

    #[test]
    fn start_end_and_cut() {
        let mut ts = TimeSeries::from_points(
            "L1",
            "P",
            "mm",
            (1..=5).map(|d| (at(d, 0), d as f64)),
        )
        .unwrap();
        assert_eq!(ts.start(), Some(at(1, 0)));
        assert_eq!(ts.end(), Some(at(5, 0)));

        ts.cut(at(2, 0), at(4, 0));
        assert_eq!(ts.values(), vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn json_keeps_missing_values_as_null() {
        let ts = TimeSeries::from_points("L1", "Q", "m3/s", [(at(1, 0), 1.5), (at(1, 1), f64::NAN)])
            .unwrap()
            .with_interpretation(Interpretation::Instantaneous);

        let json = serde_json::to_string(&ts).unwrap();
        assert!(json.contains("null"));
        assert!(json.contains("\"instantaneous\""));

        let back: TimeSeries = serde_json::from_str(&json).unwrap();
        assert_eq!(back.key(), ts.key());
        assert_eq!(back.values()[0], 1.5);
        assert!(back.values()[1].is_nan());
    }

    #[test]
    fn json_with_unordered_points_is_rejected() {
        let json = r#"{
            "location_id": "L1",
            "parameter_id": "P",
            "points": [
                {"timestamp": "2020-01-02T00:00:00", "value": 1.0},
                {"timestamp": "2020-01-01T00:00:00", "value": 2.0}
            ]
        }"#;
        let err = serde_json::from_str::<TimeSeries>(json).unwrap_err();
        assert!(err.to_string().contains("strictly increasing"));
    }
}
