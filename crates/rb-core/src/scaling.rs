//! The scaling chain applied to mapped values.
//!
//! Mapping files carry three factors per row: `AreaFactor`, `Area` and
//! `UnitFactor`. A value is normalized by area first and converted to the
//! target unit second:
//!
//! ```text
//! scaled = value * area_factor / area * unit_factor
//! ```
//!
//! The evaluation order is part of the engine contract. Floating point
//! multiplication and division do not commute exactly, so the operations are
//! applied strictly left to right and never rearranged.

use crate::{CoreError, CoreResult, Real};

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScaleFactors {
    pub area_factor: Real,
    pub area: Real,
    pub unit_factor: Real,
}

impl ScaleFactors {
    /// `(1, 1, 1)`: leaves every value untouched.
    pub const IDENTITY: Self = Self {
        area_factor: 1.0,
        area: 1.0,
        unit_factor: 1.0,
    };

    /// Build a validated factor triple. `area` is a divisor and must be non-zero.
    pub fn new(area_factor: Real, area: Real, unit_factor: Real) -> CoreResult<Self> {
        crate::ensure_finite(area_factor, "AreaFactor")?;
        crate::ensure_finite(area, "Area")?;
        crate::ensure_finite(unit_factor, "UnitFactor")?;
        if area == 0.0 {
            return Err(CoreError::ZeroDivisor { what: "Area" });
        }
        Ok(Self {
            area_factor,
            area,
            unit_factor,
        })
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// `value * area_factor / area * unit_factor`, evaluated left to right.
    ///
    /// NaN inputs stay NaN so missing values pass through unchanged.
    pub fn apply(&self, value: Real) -> Real {
        value * self.area_factor / self.area * self.unit_factor
    }

    pub fn apply_all(&self, values: &[Real]) -> Vec<Real> {
        values.iter().map(|v| self.apply(*v)).collect()
    }
}

impl Default for ScaleFactors {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// One-shot scaling of a single value with an unvalidated factor triple.
pub fn scale(value: Real, area_factor: Real, area: Real, unit_factor: Real) -> CoreResult<Real> {
    Ok(ScaleFactors::new(area_factor, area, unit_factor)?.apply(value))
}
