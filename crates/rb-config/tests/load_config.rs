use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use rb_config::*;

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    dir.push(format!("{}_{}", prefix, nanos));
    dir
}

const FULL: &str = r#"
version: 1
input:
  timeseries_files: [inputs/forcing.json]
  timeseries_mapping: config/timeseries_mapping.tsv
  parameters_file: inputs/parameters.json
  state_input_files: [inputs/states.json]
  var_mapping: config/var_mapping.tsv
  runinfo_file: /abs/run_info.json
simulation:
  dataset_folder: datasets/base
  dataset_name: BASE
  work_dir: work
engine:
  executable: engine/engine.exe
output:
  output_file: outputs/results.json
  output_mapping: config/output_mapping.tsv
  result_variables: [Q]
"#;

fn write_config(content: &str) -> (PathBuf, PathBuf) {
    let dir = unique_temp_dir("rb_config");
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join("adapter.yaml");
    fs::write(&path, content).unwrap();
    (dir, path)
}

#[test]
fn relative_paths_resolve_against_config_dir() {
    let (dir, path) = write_config(FULL);
    let config = load_yaml(&path).expect("load failed");

    assert_eq!(config.input.timeseries_files, vec![dir.join("inputs/forcing.json")]);
    assert_eq!(config.input.timeseries_mapping, dir.join("config/timeseries_mapping.tsv"));
    assert_eq!(config.input.runinfo_file, Some(PathBuf::from("/abs/run_info.json")));
    assert_eq!(config.simulation.work_dir, dir.join("work"));
    assert_eq!(config.simulation.series_dir(), dir.join("work").join("zre"));
    assert_eq!(config.engine.executable, dir.join("engine/engine.exe"));
    assert_eq!(config.output.result_variables, vec!["Q"]);

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn optional_settings_have_defaults() {
    let (dir, path) = write_config(FULL);
    let config = load_yaml(&path).unwrap();
    assert_eq!(config.simulation.variation_id, 0);
    assert!(config.simulation.update_sim_period);
    assert_eq!(config.engine.language, "de");
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn state_files_need_var_mapping() {
    let (dir, path) = write_config(&FULL.replace("  var_mapping: config/var_mapping.tsv\n", ""));
    let err = load_yaml(&path).unwrap_err();
    match err {
        ConfigError::Validation(ValidationError::MissingValue { field, .. }) => {
            assert_eq!(field, "input.var_mapping");
        }
        other => panic!("unexpected error: {other}"),
    }
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn result_variables_need_output_mapping() {
    let (dir, path) =
        write_config(&FULL.replace("  output_mapping: config/output_mapping.tsv\n", ""));
    let err = load_yaml(&path).unwrap_err();
    assert!(err.to_string().contains("output.output_mapping"));
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn unsupported_version_and_empty_inputs_are_rejected() {
    let (dir, path) = write_config(&FULL.replace("version: 1", "version: 7"));
    assert!(matches!(
        load_yaml(&path),
        Err(ConfigError::Validation(ValidationError::UnsupportedVersion { version: 7 }))
    ));
    let _ = fs::remove_dir_all(dir);

    let (dir, path) = write_config(&FULL.replace("[inputs/forcing.json]", "[]"));
    assert!(load_yaml(&path).unwrap_err().to_string().contains("timeseries_files"));
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn malformed_yaml_is_a_yaml_error() {
    let (dir, path) = write_config("version: [1\n");
    assert!(matches!(load_yaml(&path), Err(ConfigError::Yaml(_))));
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn missing_input_files_are_reported_by_field() {
    let (dir, path) = write_config(FULL);
    let config = load_yaml(&path).unwrap();
    let err = validate_paths(&config).unwrap_err();
    match err {
        ValidationError::PathNotFound { field, path } => {
            assert_eq!(field, "input.timeseries_files");
            assert_eq!(path, dir.join("inputs/forcing.json"));
        }
        other => panic!("unexpected error: {other}"),
    }
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn save_then_load_keeps_settings() {
    let (dir, path) = write_config(FULL);
    let config = load_yaml(&path).unwrap();
    let copy = dir.join("copy.yaml");
    save_yaml(&copy, &config).unwrap();
    let loaded = load_yaml(&copy).unwrap();
    assert_eq!(loaded, config);
    let _ = fs::remove_dir_all(dir);
}
