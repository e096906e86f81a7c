#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    LoadingCase,
    CheckingCache,
    LoadingCachedResult,
    WarmStart,
    Controlling,
    Settling,
    SavingResults,
    Completed,
}

impl RunStage {
    pub fn label(&self) -> &'static str {
        match self {
            RunStage::LoadingCase => "loading case",
            RunStage::CheckingCache => "checking cache",
            RunStage::LoadingCachedResult => "loading cached result",
            RunStage::WarmStart => "warm start",
            RunStage::Controlling => "controlling",
            RunStage::Settling => "settling",
            RunStage::SavingResults => "saving results",
            RunStage::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ControlProgress {
    pub control_iterations: usize,
    pub solver_iteration: u64,
    pub max_steps: u64,
    pub actuation_rad_s: Option<f64>,
    pub output_pa: Option<f64>,
    pub target_pa: f64,
}

#[derive(Debug, Clone)]
pub struct RunProgressEvent {
    pub stage: RunStage,
    pub elapsed_wall_s: f64,
    pub message: Option<String>,
    pub control: Option<ControlProgress>,
}

impl RunProgressEvent {
    pub fn stage(stage: RunStage, elapsed_wall_s: f64, message: Option<String>) -> Self {
        Self {
            stage,
            elapsed_wall_s,
            message,
            control: None,
        }
    }
}
