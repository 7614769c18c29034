use crate::CoreError;

/// Floating point type used throughout the adapter.
pub type Real = f64;

/// Marker the engine uses for missing values in its own files.
pub const ENGINE_MISSING_VALUE: Real = -9999.999;

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, CoreError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CoreError::NonFinite { what, value: v })
    }
}

/// True when `v` is the engine's missing-value marker (within 1e-4).
pub fn is_engine_missing(v: Real) -> bool {
    (v - ENGINE_MISSING_VALUE).abs() < 1e-4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_finite_detects_nan() {
        let err = ensure_finite(Real::NAN, "test").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("Non-finite"));
    }

    #[test]
    fn missing_marker_survives_single_precision() {
        // The marker goes through f32 in the binary series format.
        let stored = ENGINE_MISSING_VALUE as f32;
        assert!(is_engine_missing(stored as f64));
        assert!(!is_engine_missing(-9999.0));
    }
}
