//! Configuration and dataset helpers used by the front ends.

use std::path::{Path, PathBuf};

use rb_config::AdapterConfig;
use rb_dataset::{Dataset, SoilAverage, TemplateValues};
use rb_mapping::{MappingRole, MappingTable};

use crate::error::AppResult;

/// Load a configuration and check that every input it names exists.
pub fn check_config(path: &Path) -> AppResult<AdapterConfig> {
    let config = rb_config::load_yaml(path)?;
    rb_config::validate_paths(&config)?;
    tracing::info!(config = %path.display(), "configuration is valid");
    Ok(config)
}

/// Render the templates of a dataset in place from a parameter document.
pub fn render_dataset(
    dataset_dir: &Path,
    dataset_name: &str,
    parameters_file: &Path,
) -> AppResult<Vec<PathBuf>> {
    let parameters = rb_model::load_parameters(parameters_file)?;
    let dataset = Dataset::new(dataset_dir, dataset_name);
    let values = TemplateValues::from_parameters(&parameters);
    Ok(dataset.process_templates(&values)?)
}

pub fn load_mapping(path: &Path, role: MappingRole) -> AppResult<MappingTable> {
    Ok(MappingTable::load(path, role)?)
}

/// Depth-weighted soil properties of every soil profile of a dataset.
pub fn soil_properties(dataset_dir: &Path, dataset_name: &str) -> AppResult<Vec<SoilAverage>> {
    Ok(Dataset::new(dataset_dir, dataset_name).average_soil_properties()?)
}
