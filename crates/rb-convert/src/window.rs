//! Simulation period selection.

use chrono::NaiveDateTime;
use rb_model::{RunInfo, TimeSeries};

use crate::{ConvertError, ConvertResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl SimulationWindow {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> ConvertResult<Self> {
        if start > end {
            return Err(ConvertError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }
}

impl From<SimulationWindow> for RunInfo {
    fn from(window: SimulationWindow) -> Self {
        RunInfo {
            start: window.start,
            end: window.end,
        }
    }
}

/// Explicit run info wins; otherwise the period of the last input series.
pub fn resolve_window(
    run_info: Option<&RunInfo>,
    inputs: &[TimeSeries],
) -> ConvertResult<SimulationWindow> {
    if let Some(info) = run_info {
        return SimulationWindow::new(info.start, info.end);
    }

    let last = inputs.last().ok_or(ConvertError::NoSimulationWindow)?;
    match (last.start(), last.end()) {
        (Some(start), Some(end)) => {
            tracing::info!(
                series = %last.key(),
                %start,
                %end,
                "no run info; simulation period taken from last input series"
            );
            SimulationWindow::new(start, end)
        }
        _ => Err(ConvertError::NoSimulationWindow),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 1, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn series(first: u32, last: u32) -> TimeSeries {
        TimeSeries::from_points("L1", "P", "mm", (first..=last).map(|d| (day(d), 0.0))).unwrap()
    }

    #[test]
    fn falls_back_to_last_input_series() {
        let inputs = vec![series(3, 5), series(1, 10)];
        let window = resolve_window(None, &inputs).unwrap();
        assert_eq!(window, SimulationWindow::new(day(1), day(10)).unwrap());
    }

    #[test]
    fn run_info_takes_precedence() {
        let info = RunInfo::new(day(2), day(4)).unwrap();
        let window = resolve_window(Some(&info), &[series(1, 10)]).unwrap();
        assert_eq!(window.start, day(2));
        assert_eq!(window.end, day(4));
    }

    #[test]
    fn nothing_to_derive_from() {
        assert!(matches!(
            resolve_window(None, &[]),
            Err(ConvertError::NoSimulationWindow)
        ));
        let empty = TimeSeries::new("L1", "P", "mm");
        assert!(matches!(
            resolve_window(None, &[empty]),
            Err(ConvertError::NoSimulationWindow)
        ));
    }

    #[test]
    fn reversed_window_is_invalid() {
        let info = RunInfo {
            start: day(9),
            end: day(1),
        };
        assert!(matches!(
            resolve_window(Some(&info), &[]),
            Err(ConvertError::InvalidWindow { .. })
        ));
    }
}
