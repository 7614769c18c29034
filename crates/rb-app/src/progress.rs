/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    LoadingConfig,
    LoadingMappings,
    LoadingInputs,
    PreparingDataset,
    RenderingTemplates,
    WritingInputs,
    WritingStates,
    WritingParameters,
    SettingSimPeriod,
    RunningEngine,
    ReadingResults,
    AggregatingResults,
    SavingOutputs,
    Completed,
}

impl RunStage {
    pub fn label(self) -> &'static str {
        match self {
            RunStage::LoadingConfig => "load_config",
            RunStage::LoadingMappings => "load_mappings",
            RunStage::LoadingInputs => "load_inputs",
            RunStage::PreparingDataset => "prepare_dataset",
            RunStage::RenderingTemplates => "render_templates",
            RunStage::WritingInputs => "write_inputs",
            RunStage::WritingStates => "write_states",
            RunStage::WritingParameters => "write_parameters",
            RunStage::SettingSimPeriod => "set_sim_period",
            RunStage::RunningEngine => "engine",
            RunStage::ReadingResults => "read_results",
            RunStage::AggregatingResults => "aggregate",
            RunStage::SavingOutputs => "save_outputs",
            RunStage::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunProgressEvent {
    pub stage: RunStage,
    pub elapsed_wall_s: f64,
    pub message: Option<String>,
}

impl RunProgressEvent {
    pub fn stage(stage: RunStage, elapsed_wall_s: f64, message: Option<String>) -> Self {
        Self {
            stage,
            elapsed_wall_s,
            message,
        }
    }
}
