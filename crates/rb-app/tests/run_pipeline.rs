use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::NaiveDate;
use rb_app::*;
use rb_dataset::{Dataset, read_bin};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    dir.push(format!("{}_{}", prefix, nanos));
    dir
}

fn write(dir: &Path, relative: &str, content: &str) {
    let path = dir.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

const CONFIG: &str = "\
version: 1
input:
  timeseries_files: [inputs/forcing.json]
  timeseries_mapping: config/timeseries_mapping.tsv
  parameters_file: inputs/parameters.json
output:
  output_file: outputs/results.json
  output_mapping: config/output_mapping.tsv
  result_variables: [Q]
simulation:
  dataset_folder: datasets/base
  dataset_name: BASE
  work_dir: work
engine:
  executable: engine/engine.exe
";

const FORCING: &str = r#"{"series": [{
  "location_id": "L1", "parameter_id": "P", "unit": "mm",
  "points": [
    {"timestamp": "2020-01-01T00:00:00", "value": 0.5},
    {"timestamp": "2020-01-01T01:00:00", "value": null},
    {"timestamp": "2020-01-01T02:00:00", "value": 1.5}
  ]
}]}"#;

const PARAMETERS: &str = r#"{"parameters": [
  {"parameter_id": "P1", "parameter_name": "depth", "value": 2.5},
  {"parameter_id": "P1", "parameter_name": "snow", "value": true}
]}"#;

/// Lay out a complete run directory and return the config path.
fn setup(prefix: &str) -> (PathBuf, PathBuf) {
    let dir = unique_temp_dir(prefix);
    write(&dir, "config.yaml", CONFIG);
    write(&dir, "inputs/forcing.json", FORCING);
    write(&dir, "inputs/parameters.json", PARAMETERS);
    write(
        &dir,
        "config/timeseries_mapping.tsv",
        "locationId\tparameterId\tzreId\nL1\tP\t101\n",
    );
    write(
        &dir,
        "config/output_mapping.tsv",
        "locationId\tparameterId\telementId\tresultType\tAreaFactor\tunit\n\
         L9\tQ\tA000\t1ZU\t1\tm3/s\n\
         L9\tQ\tA001\t1ZU\t1\t\n",
    );
    write(
        &dir,
        "datasets/base/BASE.ALL",
        "SimStart=01.01.2019 00:00\nSimEnd=31.12.2019 00:00\n",
    );
    write(
        &dir,
        "datasets/base/BASE.EZG.template",
        "depth={P1_depth:5.1f} snow={P1_snow}\n",
    );
    let config = dir.join("config.yaml");
    (dir, config)
}

fn col(text: &str) -> String {
    format!("{text:>16}")
}

fn wel_content() -> String {
    let header = format!(" {}{}{}", col("Datum"), col("A000_1ZU"), col("A001_1ZU"));
    let units = format!(" {}{}{}", col(""), col("m3/s"), col("m3/s"));
    let row1 = format!(" {:<16}{}{}", "01.01.2020 00:00", col("1.0"), col("3.0"));
    let row2 = format!(" {:<16}{}{}", "01.01.2020 01:00", col("2.0"), col("4.0"));
    format!(" results\n{header}\n{units}\n{row1}\n{row2}\n")
}

/// Stands in for the engine: records what it was given and writes a WEL file.
struct FakeEngine {
    failure: Option<String>,
    seen: RefCell<Vec<(PathBuf, EngineOptions)>>,
}

impl FakeEngine {
    fn succeeding() -> Self {
        Self {
            failure: None,
            seen: RefCell::new(Vec::new()),
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            seen: RefCell::new(Vec::new()),
        }
    }
}

impl EngineRunner for FakeEngine {
    fn run(&self, dataset: &Dataset, options: &EngineOptions) -> AppResult<EngineReport> {
        self.seen
            .borrow_mut()
            .push((dataset.path().to_path_buf(), options.clone()));
        if let Some(message) = &self.failure {
            return Err(AppError::EngineExecution {
                code: Some(1),
                message: message.clone(),
            });
        }
        fs::write(dataset.file("WEL"), wel_content())?;
        Ok(EngineReport::default())
    }
}

#[test]
fn full_run_writes_engine_inputs_and_aggregated_outputs() {
    let (dir, config_path) = setup("rb_app_run");
    let config = rb_config::load_yaml(&config_path).unwrap();
    let engine = FakeEngine::succeeding();

    let mut stages = Vec::new();
    let mut on_progress = |event: RunProgressEvent| stages.push(event.stage);
    let response = run_with_engine(&config, &engine, Some(&mut on_progress)).unwrap();

    let work = dir.join("work");
    let seen = engine.seen.borrow();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, work);
    assert_eq!(seen[0].1, EngineOptions::default());

    // pristine dataset untouched, work copy rendered and updated
    assert!(!dir.join("datasets/base/BASE.EZG").exists());
    assert_eq!(
        fs::read_to_string(work.join("BASE.EZG")).unwrap(),
        "depth=  2.5 snow=1\n"
    );
    assert_eq!(
        fs::read_to_string(work.join("BASE.ALL")).unwrap(),
        "SimStart=01.01.2020 00:00\nSimEnd=01.01.2020 02:00\n"
    );
    assert_eq!(response.rendered_templates, vec![work.join("BASE.EZG")]);

    let points = read_bin(&work.join("zre").join("101.bin")).unwrap();
    assert_eq!(points.len(), 3);
    assert!(points[1].value.is_nan());
    assert_eq!(response.input_points, 3);

    let params = fs::read_to_string(work.join("BASE_parameters.var")).unwrap();
    assert!(params.contains("P1_snow"));
    assert!(!params.contains("P1_depth"));
    assert_eq!(response.parameter_errors.len(), 1);
    assert!(response.parameter_errors[0].contains("P1_depth"));

    let day = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    assert_eq!(response.window.start, day.and_hms_opt(0, 0, 0).unwrap());
    assert_eq!(response.window.end, day.and_hms_opt(2, 0, 0).unwrap());

    let document = rb_model::load_series(&dir.join("outputs/results.json")).unwrap();
    assert_eq!(response.output_series, 1);
    assert_eq!(document.series.len(), 1);
    let q = &document.series[0];
    assert_eq!((q.location_id.as_str(), q.parameter_id.as_str()), ("L9", "Q"));
    assert_eq!(q.unit, "m3/s");
    assert_eq!(q.values(), vec![4.0, 6.0]);
    assert_eq!(document.window.map(|w| w.end), Some(response.window.end));
    assert!(document.generated_at.is_some());

    assert_eq!(stages.first(), Some(&RunStage::LoadingMappings));
    assert_eq!(stages.last(), Some(&RunStage::Completed));
    assert!(stages.contains(&RunStage::RunningEngine));
    assert!(!stages.contains(&RunStage::WritingStates));
    assert!(response.timing.stages.iter().any(|(label, _)| *label == "engine"));

    drop(seen);
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn engine_failure_aborts_without_output_document() {
    let (dir, config_path) = setup("rb_app_fail");
    let config = rb_config::load_yaml(&config_path).unwrap();
    // results of an earlier run in the work dir must not survive
    write(&dir, "work/BASE.WEL", &wel_content());

    let engine = FakeEngine::failing("Element A000: unknown soil type");
    let err = run_with_engine(&config, &engine, None).unwrap_err();

    match &err {
        AppError::EngineExecution { code, message } => {
            assert_eq!(*code, Some(1));
            assert_eq!(message, "Element A000: unknown soil type");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.to_string(), "Element A000: unknown soil type");
    assert!(!dir.join("outputs/results.json").exists());
    assert!(!dir.join("work/BASE.WEL").exists());

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn missing_output_sequence_fails_the_run() {
    let (dir, config_path) = setup("rb_app_missing_seq");
    write(
        &dir,
        "config/output_mapping.tsv",
        "locationId\tparameterId\telementId\tresultType\tAreaFactor\n\
         L9\tQ\tA999\t1ZU\t1\n",
    );
    let config = rb_config::load_yaml(&config_path).unwrap();

    let err = run_with_engine(&config, &FakeEngine::succeeding(), None).unwrap_err();
    assert!(matches!(
        err,
        AppError::Convert(rb_convert::ConvertError::MissingOutputSequence { .. })
    ));
    assert!(!dir.join("outputs/results.json").exists());

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn run_adapter_checks_input_paths_first() {
    let (dir, config_path) = setup("rb_app_paths");

    let err = run_adapter(&RunRequest {
        config_path: &config_path,
    })
    .unwrap_err();
    assert!(matches!(
        err,
        AppError::Validation(rb_config::ValidationError::PathNotFound { .. })
    ));
    assert!(!dir.join("work").exists());

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn render_dataset_fills_templates_in_place() {
    let (dir, _) = setup("rb_app_render");
    let dataset_dir = dir.join("datasets/base");

    let written =
        render_dataset(&dataset_dir, "BASE", &dir.join("inputs/parameters.json")).unwrap();
    assert_eq!(written, vec![dataset_dir.join("BASE.EZG")]);
    assert_eq!(
        fs::read_to_string(dataset_dir.join("BASE.EZG")).unwrap(),
        "depth=  2.5 snow=1\n"
    );

    let _ = fs::remove_dir_all(dir);
}
