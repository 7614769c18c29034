use core::fmt;

/// Identifies a generic time series or mapping row by the shell's
/// `(locationId, parameterId)` pair.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SeriesKey {
    pub location_id: String,
    pub parameter_id: String,
}

impl SeriesKey {
    pub fn new(location_id: impl Into<String>, parameter_id: impl Into<String>) -> Self {
        Self {
            location_id: location_id.into(),
            parameter_id: parameter_id.into(),
        }
    }
}

impl fmt::Debug for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SeriesKey({}.{})", self.location_id, self.parameter_id)
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.location_id, self.parameter_id)
    }
}

/// Composite engine identifier `<left>_<right>`.
///
/// Used for state entries (`elementKey_parameterId`), boolean parameters
/// (`parameterId_parameterName`) and engine output series (`elementId_resultType`).
pub fn composite_id(left: &str, right: &str) -> String {
    format!("{left}_{right}")
}
