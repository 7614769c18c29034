//! Engine invocation.
//!
//! The engine is an external executable driven by a small run file that names
//! the dataset to simulate. It reports problems through its exit status and
//! the `.ERR` / `.WRN` files it leaves in the dataset directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use rb_dataset::Dataset;

use crate::error::{AppError, AppResult};

/// File name of the run file written next to the dataset files.
pub const RUN_FILE_NAME: &str = "talsim.run";

/// Changelog shipped next to the engine executable.
pub const CHANGELOG_FILE_NAME: &str = "TALSIM.CHANGELOG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    pub variation_id: u32,
    pub language: String,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            variation_id: 0,
            language: "de".to_string(),
        }
    }
}

/// What a successful engine run left behind besides its result files.
#[derive(Debug, Clone, Default)]
pub struct EngineReport {
    pub warnings: Option<String>,
}

/// Anything that can simulate a prepared dataset.
pub trait EngineRunner {
    /// Run the engine on `dataset`. A failed simulation is
    /// [`AppError::EngineExecution`] carrying the engine's message.
    fn run(&self, dataset: &Dataset, options: &EngineOptions) -> AppResult<EngineReport>;
}

/// Contents of the run file for `dataset`.
pub fn render_run_file(dataset_dir: &Path, dataset_name: &str, options: &EngineOptions) -> String {
    let mut dir = dataset_dir.display().to_string();
    if !dir.ends_with(std::path::MAIN_SEPARATOR) {
        dir.push(std::path::MAIN_SEPARATOR);
    }
    format!(
        "[TALSIM]\nPath={dir}\nSystem={dataset_name}\nExecMode=0\nVariationId={}\nLanguage={}\n",
        options.variation_id, options.language
    )
}

/// Runs the engine executable as a child process.
#[derive(Debug, Clone)]
pub struct ProcessEngine {
    executable: PathBuf,
}

impl ProcessEngine {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Engine version from the first `Version <x>` line of the changelog
    /// next to the executable.
    pub fn version(&self) -> AppResult<String> {
        let dir = self.executable.parent().unwrap_or(Path::new(""));
        let changelog = dir.join(CHANGELOG_FILE_NAME);
        let version_error = |reason: &str| AppError::EngineVersion {
            path: changelog.clone(),
            reason: reason.to_string(),
        };
        if !changelog.is_file() {
            return Err(version_error("file not found"));
        }
        let bytes = fs::read(&changelog)?;
        String::from_utf8_lossy(&bytes)
            .lines()
            .find_map(|line| line.strip_prefix("Version "))
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .ok_or_else(|| version_error("no 'Version' line"))
    }

    fn write_run_file(&self, dataset: &Dataset, options: &EngineOptions) -> AppResult<PathBuf> {
        let dir = std::path::absolute(dataset.path())?;
        let run_file = dir.join(RUN_FILE_NAME);
        fs::write(&run_file, render_run_file(&dir, dataset.name(), options))?;
        tracing::debug!(file = %run_file.display(), "wrote run file");
        Ok(run_file)
    }
}

impl EngineRunner for ProcessEngine {
    fn run(&self, dataset: &Dataset, options: &EngineOptions) -> AppResult<EngineReport> {
        let run_file = self.write_run_file(dataset, options)?;

        let mut command = Command::new(&self.executable);
        command.arg(&run_file);
        if let Some(dir) = self.executable.parent().filter(|d| !d.as_os_str().is_empty()) {
            command.current_dir(dir);
        }

        let version = self.version().unwrap_or_else(|err| {
            tracing::debug!(%err, "engine version unknown");
            "unknown".to_string()
        });
        tracing::info!(
            engine = %self.executable.display(),
            %version,
            %dataset,
            variation = options.variation_id,
            "starting engine"
        );
        let output = command.output().map_err(|source| AppError::EngineLaunch {
            path: self.executable.clone(),
            source,
        })?;

        let warnings = dataset.warnings()?.filter(|w| !w.trim().is_empty());
        if let Some(text) = &warnings {
            tracing::warn!("engine warnings:\n{}", text.trim_end());
        }

        if output.status.success() {
            tracing::info!(%dataset, "engine finished");
            return Ok(EngineReport { warnings });
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let message = match dataset.errors()?.map(|e| e.trim().to_string()) {
            Some(errors) if !errors.is_empty() => errors,
            _ if !stderr.is_empty() => stderr,
            _ => format!("Engine exited with {} without an error message", output.status),
        };
        tracing::error!("engine failed:\n{message}");
        Err(AppError::EngineExecution {
            code: output.status.code(),
            message,
        })
    }
}
