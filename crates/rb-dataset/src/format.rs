//! Number and time conventions shared by the engine file formats.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

/// Date format of ALL options and WEL data lines.
pub const ENGINE_DATE_FORMAT: &str = "%d.%m.%Y %H:%M";

/// Origin of the engine's floating point time axis.
pub fn engine_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1601, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or(NaiveDateTime::MIN)
}

/// Hours since 1601-01-01 00:00.
pub fn to_engine_hours(timestamp: NaiveDateTime) -> f64 {
    let delta = timestamp - engine_epoch();
    delta.num_milliseconds() as f64 / 3_600_000.0
}

/// Inverse of [`to_engine_hours`], rounded to whole seconds.
///
/// `None` when the value is not finite or falls outside chrono's range.
pub fn from_engine_hours(hours: f64) -> Option<NaiveDateTime> {
    if !hours.is_finite() {
        return None;
    }
    let seconds = (hours * 3600.0).round();
    if seconds.abs() > i64::MAX as f64 / 2.0 {
        return None;
    }
    let delta = TimeDelta::try_seconds(seconds as i64)?;
    engine_epoch().checked_add_signed(delta)
}

/// Shortest round-trip rendering of a float, always with a decimal point for
/// whole numbers (`1.0`, `-0.5`, `1234.5678`).
pub fn plain_number(value: f64) -> String {
    if !value.is_finite() {
        return if value.is_nan() {
            "nan".to_string()
        } else if value > 0.0 {
            "inf".to_string()
        } else {
            "-inf".to_string()
        };
    }
    let text = value.to_string();
    if text.contains('.') {
        text
    } else {
        format!("{text}.0")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_hours_of_known_dates() {
        let t = NaiveDate::from_ymd_opt(1601, 1, 2)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap();
        assert_eq!(to_engine_hours(t), 30.0);
        assert_eq!(from_engine_hours(30.0), Some(t));
    }

    #[test]
    fn engine_hours_round_to_seconds() {
        let t = NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let hours = to_engine_hours(t) + 0.4 / 3600.0;
        assert_eq!(from_engine_hours(hours), Some(t));
        assert_eq!(from_engine_hours(f64::NAN), None);
    }

    #[test]
    fn plain_number_keeps_a_decimal_point() {
        assert_eq!(plain_number(1.0), "1.0");
        assert_eq!(plain_number(-0.5), "-0.5");
        assert_eq!(plain_number(1234.5678), "1234.5678");
        assert_eq!(plain_number(1e21), "1000000000000000000000.0");
    }
}
