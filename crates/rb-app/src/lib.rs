//! rb-app: application services for the adapter front ends.
//!
//! Orchestrates a complete adapter run on top of the conversion crates and
//! hands progress, timing and engine failures back to the caller.

pub mod config_service;
pub mod engine;
pub mod error;
pub mod progress;
pub mod run_service;

pub use config_service::{check_config, load_mapping, render_dataset, soil_properties};
pub use engine::{
    CHANGELOG_FILE_NAME, EngineOptions, EngineReport, EngineRunner, ProcessEngine,
    render_run_file,
};
pub use error::{AppError, AppResult};
pub use progress::{RunProgressEvent, RunStage};
pub use run_service::{
    RunRequest, RunResponse, RunTimingSummary, run_adapter, run_adapter_with_progress,
    run_with_engine,
};
