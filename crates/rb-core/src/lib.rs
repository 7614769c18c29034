//! rb-core: shared foundation for rrbridge.
//!
//! Contains:
//! - numeric (Real, the engine missing-value marker, finiteness checks)
//! - scaling (the area/unit scaling chain applied to mapped values)
//! - ids (location/parameter keys shared by every mapping table)
//! - timing (stage timers for run summaries)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod scaling;
pub mod timing;

// Re-exports: nice ergonomics for downstream crates
pub use error::{CoreError, CoreResult};
pub use ids::*;
pub use numeric::*;
pub use scaling::{ScaleFactors, scale};
