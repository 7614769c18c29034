//! Adapter run service.

use std::path::{Path, PathBuf};
use std::time::Instant;

use rb_config::AdapterConfig;
use rb_convert::{
    ResultAggregator, SimulationWindow, StateVariableMapper, TimeSeriesIngestor, resolve_window,
};
use rb_core::timing::{StageTimings, Timer};
use rb_dataset::{Dataset, TemplateValues};
use rb_mapping::{MappingRole, MappingTable};
use rb_model::{ParameterSet, RunInfo, SeriesDocument, TimeSeries};

use crate::config_service;
use crate::engine::{EngineOptions, EngineReport, EngineRunner, ProcessEngine};
use crate::error::AppResult;
use crate::progress::{RunProgressEvent, RunStage};

/// Request to execute one adapter run.
pub struct RunRequest<'a> {
    pub config_path: &'a Path,
}

/// Stage durations of a run, in seconds.
#[derive(Debug, Clone, Default)]
pub struct RunTimingSummary {
    pub stages: Vec<(&'static str, f64)>,
    pub total_time_s: f64,
}

impl RunTimingSummary {
    fn from_timings(timings: &StageTimings, total_time_s: f64) -> Self {
        Self {
            stages: timings.entries.clone(),
            total_time_s,
        }
    }
}

/// Response from a completed run.
#[derive(Debug, Clone)]
pub struct RunResponse {
    pub output_file: PathBuf,
    pub window: SimulationWindow,
    pub input_files: Vec<PathBuf>,
    pub input_points: usize,
    pub rendered_templates: Vec<PathBuf>,
    pub state_files: Vec<PathBuf>,
    /// Parameters that could not be written; the run continues without them.
    pub parameter_errors: Vec<String>,
    pub output_series: usize,
    pub engine: EngineReport,
    pub timing: RunTimingSummary,
}

fn emit_progress(
    progress_cb: &mut Option<&mut dyn FnMut(RunProgressEvent)>,
    stage: RunStage,
    started: Instant,
    message: Option<String>,
) {
    if let Some(cb) = progress_cb.as_deref_mut() {
        cb(RunProgressEvent::stage(
            stage,
            started.elapsed().as_secs_f64(),
            message,
        ));
    }
}

/// Inputs loaded from the shell's export.
struct RunInputs {
    series: Vec<TimeSeries>,
    states: Vec<TimeSeries>,
    parameters: ParameterSet,
    run_info: Option<RunInfo>,
}

struct RunTables {
    timeseries: MappingTable,
    variables: Option<MappingTable>,
    outputs: Option<MappingTable>,
}

fn load_tables(config: &AdapterConfig) -> AppResult<RunTables> {
    let timeseries = MappingTable::load(&config.input.timeseries_mapping, MappingRole::Ingestion)?;
    let variables = config
        .input
        .var_mapping
        .as_deref()
        .map(|p| MappingTable::load(p, MappingRole::Variable))
        .transpose()?;
    let outputs = config
        .output
        .output_mapping
        .as_deref()
        .map(|p| MappingTable::load(p, MappingRole::Output))
        .transpose()?;
    Ok(RunTables {
        timeseries,
        variables,
        outputs,
    })
}

fn load_series_files(paths: &[PathBuf]) -> AppResult<Vec<TimeSeries>> {
    let mut series = Vec::new();
    for path in paths {
        let document = rb_model::load_series(path)?;
        tracing::debug!(file = %path.display(), series = document.series.len(), "loaded series");
        series.extend(document.series);
    }
    Ok(series)
}

fn load_inputs(config: &AdapterConfig) -> AppResult<RunInputs> {
    let series = load_series_files(&config.input.timeseries_files)?;
    let states = load_series_files(&config.input.state_input_files)?;
    let parameters = match &config.input.parameters_file {
        Some(path) => rb_model::load_parameters(path)?,
        None => ParameterSet::default(),
    };
    let run_info = config
        .input
        .runinfo_file
        .as_deref()
        .map(rb_model::load_run_info)
        .transpose()?;
    Ok(RunInputs {
        series,
        states,
        parameters,
        run_info,
    })
}

/// Copy the pristine dataset into the work directory and clear results of
/// any earlier run there.
fn prepare_dataset(config: &AdapterConfig) -> AppResult<Dataset> {
    let base = Dataset::new(
        &config.simulation.dataset_folder,
        config.simulation.dataset_name.clone(),
    );
    let work = base.copy_to(&config.simulation.work_dir, false)?;
    let removed = work.clear_results()?;
    if removed > 0 {
        tracing::info!(files = removed, "removed results of previous run");
    }
    Ok(work)
}

/// Load the configuration at `request.config_path` and run it with the
/// configured engine executable.
pub fn run_adapter(request: &RunRequest) -> AppResult<RunResponse> {
    run_adapter_with_progress(request, None)
}

/// As [`run_adapter`], streaming progress events to `progress_cb`.
pub fn run_adapter_with_progress(
    request: &RunRequest,
    mut progress_cb: Option<&mut dyn FnMut(RunProgressEvent)>,
) -> AppResult<RunResponse> {
    let started = Instant::now();
    emit_progress(
        &mut progress_cb,
        RunStage::LoadingConfig,
        started,
        Some(format!("Loading {}", request.config_path.display())),
    );
    let config = config_service::check_config(request.config_path)?;
    let engine = ProcessEngine::new(&config.engine.executable);
    execute(&config, &engine, started, progress_cb)
}

/// Run an already loaded configuration with `engine`.
pub fn run_with_engine(
    config: &AdapterConfig,
    engine: &dyn EngineRunner,
    progress_cb: Option<&mut dyn FnMut(RunProgressEvent)>,
) -> AppResult<RunResponse> {
    execute(config, engine, Instant::now(), progress_cb)
}

fn execute(
    config: &AdapterConfig,
    engine: &dyn EngineRunner,
    started: Instant,
    mut progress_cb: Option<&mut dyn FnMut(RunProgressEvent)>,
) -> AppResult<RunResponse> {
    let mut timings = StageTimings::default();

    emit_progress(&mut progress_cb, RunStage::LoadingMappings, started, None);
    let timer = Timer::start(RunStage::LoadingMappings.label());
    let tables = load_tables(config)?;
    timings.record(timer);

    emit_progress(&mut progress_cb, RunStage::LoadingInputs, started, None);
    let timer = Timer::start(RunStage::LoadingInputs.label());
    let inputs = load_inputs(config)?;
    timings.record(timer);
    tracing::info!(
        series = inputs.series.len(),
        states = inputs.states.len(),
        parameters = inputs.parameters.len(),
        "loaded inputs"
    );

    emit_progress(
        &mut progress_cb,
        RunStage::PreparingDataset,
        started,
        Some(format!("Copying into {}", config.simulation.work_dir.display())),
    );
    let timer = Timer::start(RunStage::PreparingDataset.label());
    let dataset = prepare_dataset(config)?;
    timings.record(timer);

    emit_progress(&mut progress_cb, RunStage::RenderingTemplates, started, None);
    let timer = Timer::start(RunStage::RenderingTemplates.label());
    let values = TemplateValues::from_parameters(&inputs.parameters);
    let rendered_templates = dataset.process_templates(&values)?;
    timings.record(timer);

    emit_progress(&mut progress_cb, RunStage::WritingInputs, started, None);
    let timer = Timer::start(RunStage::WritingInputs.label());
    let report = TimeSeriesIngestor::new(&tables.timeseries)
        .ingest(&inputs.series, &config.simulation.series_dir())?;
    timings.record(timer);

    let mapper = StateVariableMapper::new(&dataset);

    let mut state_files = Vec::new();
    if let Some(table) = &tables.variables
        && !inputs.states.is_empty()
    {
        emit_progress(&mut progress_cb, RunStage::WritingStates, started, None);
        let timer = Timer::start(RunStage::WritingStates.label());
        state_files = mapper.map_state_series(table, &inputs.states)?;
        timings.record(timer);
    }

    let mut parameter_errors = Vec::new();
    if config.input.parameters_file.is_some() {
        emit_progress(&mut progress_cb, RunStage::WritingParameters, started, None);
        let timer = Timer::start(RunStage::WritingParameters.label());
        let conversion = mapper.map_parameters(&inputs.parameters)?;
        timings.record(timer);
        if !conversion.is_complete() {
            tracing::warn!(
                failed = conversion.errors.len(),
                written = conversion.written.len(),
                "some parameters were not written"
            );
        }
        parameter_errors = conversion.errors.iter().map(|e| e.to_string()).collect();
    }

    let window = resolve_window(inputs.run_info.as_ref(), &inputs.series)?;
    if config.simulation.update_sim_period {
        emit_progress(
            &mut progress_cb,
            RunStage::SettingSimPeriod,
            started,
            Some(format!("{} - {}", window.start, window.end)),
        );
        let timer = Timer::start(RunStage::SettingSimPeriod.label());
        dataset.set_sim_period(window.start, window.end)?;
        timings.record(timer);
    }

    emit_progress(&mut progress_cb, RunStage::RunningEngine, started, None);
    let timer = Timer::start(RunStage::RunningEngine.label());
    let options = EngineOptions {
        variation_id: config.simulation.variation_id,
        language: config.engine.language.clone(),
    };
    let engine_report = engine.run(&dataset, &options)?;
    timings.record(timer);

    let mut outputs = Vec::new();
    match &tables.outputs {
        Some(table) if !config.output.result_variables.is_empty() => {
            emit_progress(&mut progress_cb, RunStage::ReadingResults, started, None);
            let timer = Timer::start(RunStage::ReadingResults.label());
            let results = dataset.read_results()?;
            timings.record(timer);

            emit_progress(&mut progress_cb, RunStage::AggregatingResults, started, None);
            let timer = Timer::start(RunStage::AggregatingResults.label());
            outputs = ResultAggregator::new(table, &config.output.result_variables)
                .aggregate(results.as_slice())?;
            timings.record(timer);
        }
        _ => tracing::warn!("no result variables requested; output document will be empty"),
    }

    emit_progress(&mut progress_cb, RunStage::SavingOutputs, started, None);
    let timer = Timer::start(RunStage::SavingOutputs.label());
    let output_series = outputs.len();
    let document = SeriesDocument {
        generated_at: Some(chrono::Local::now().naive_local()),
        window: Some(window.into()),
        series: outputs,
    };
    rb_model::save_series(&config.output.output_file, &document)?;
    timings.record(timer);

    let total_time_s = started.elapsed().as_secs_f64();
    tracing::info!(
        output = %config.output.output_file.display(),
        series = output_series,
        total_s = total_time_s,
        "run completed"
    );
    emit_progress(&mut progress_cb, RunStage::Completed, started, None);

    Ok(RunResponse {
        output_file: config.output.output_file.clone(),
        window,
        input_points: report.total_points(),
        input_files: report.files.into_iter().map(|f| f.path).collect(),
        rendered_templates,
        state_files,
        parameter_errors,
        output_series,
        engine: engine_report,
        timing: RunTimingSummary::from_timings(&timings, total_time_s),
    })
}
