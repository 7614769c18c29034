//! Adapter configuration schema.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdapterConfig {
    pub version: u32,
    pub input: InputDef,
    pub simulation: SimulationDef,
    pub engine: EngineDef,
    pub output: OutputDef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InputDef {
    pub timeseries_files: Vec<PathBuf>,
    pub timeseries_mapping: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub state_input_files: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub var_mapping: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runinfo_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationDef {
    /// Directory of the pristine dataset; never modified.
    pub dataset_folder: PathBuf,
    pub dataset_name: String,
    /// Per-run copy of the dataset.
    pub work_dir: PathBuf,
    /// Where input BIN files go; defaults to `<work_dir>/zre`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_dir: Option<PathBuf>,
    #[serde(default)]
    pub variation_id: u32,
    #[serde(default = "default_true")]
    pub update_sim_period: bool,
}

impl SimulationDef {
    pub fn series_dir(&self) -> PathBuf {
        self.series_dir
            .clone()
            .unwrap_or_else(|| self.work_dir.join("zre"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineDef {
    pub executable: PathBuf,
    #[serde(default = "default_language")]
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputDef {
    pub output_file: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_mapping: Option<PathBuf>,
    #[serde(default)]
    pub result_variables: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_language() -> String {
    "de".to_string()
}

fn resolve(base: &Path, path: &mut PathBuf) {
    if path.is_relative() {
        *path = base.join(&*path);
    }
}

fn resolve_opt(base: &Path, path: &mut Option<PathBuf>) {
    if let Some(p) = path {
        resolve(base, p);
    }
}

impl AdapterConfig {
    /// Make every relative path absolute with respect to `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        for p in &mut self.input.timeseries_files {
            resolve(base, p);
        }
        resolve(base, &mut self.input.timeseries_mapping);
        resolve_opt(base, &mut self.input.parameters_file);
        for p in &mut self.input.state_input_files {
            resolve(base, p);
        }
        resolve_opt(base, &mut self.input.var_mapping);
        resolve_opt(base, &mut self.input.runinfo_file);

        resolve(base, &mut self.simulation.dataset_folder);
        resolve(base, &mut self.simulation.work_dir);
        resolve_opt(base, &mut self.simulation.series_dir);

        resolve(base, &mut self.engine.executable);

        resolve(base, &mut self.output.output_file);
        resolve_opt(base, &mut self.output.output_mapping);
    }

    /// Every input file and directory the run reads.
    pub fn input_paths(&self) -> Vec<(&'static str, &Path)> {
        let mut paths: Vec<(&'static str, &Path)> = Vec::new();
        for p in &self.input.timeseries_files {
            paths.push(("input.timeseries_files", p.as_path()));
        }
        paths.push(("input.timeseries_mapping", self.input.timeseries_mapping.as_path()));
        if let Some(p) = &self.input.parameters_file {
            paths.push(("input.parameters_file", p.as_path()));
        }
        for p in &self.input.state_input_files {
            paths.push(("input.state_input_files", p.as_path()));
        }
        if let Some(p) = &self.input.var_mapping {
            paths.push(("input.var_mapping", p.as_path()));
        }
        if let Some(p) = &self.input.runinfo_file {
            paths.push(("input.runinfo_file", p.as_path()));
        }
        paths.push(("simulation.dataset_folder", self.simulation.dataset_folder.as_path()));
        paths.push(("engine.executable", self.engine.executable.as_path()));
        if let Some(p) = &self.output.output_mapping {
            paths.push(("output.output_mapping", p.as_path()));
        }
        paths
    }
}
