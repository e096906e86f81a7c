//! Run execution and caching service.
//!
//! Runs are keyed by a hash of the case and the solver version. A cached run
//! is returned as is unless the request disables the cache. Execution uses
//! the in-process surrogate plant; the control loop itself is the same one a
//! real solver binding would drive.

use std::path::Path;
use std::time::Instant;

use rt_oracle::{AffinityPumpOracle, SolverOracle};
use rt_project::schema::Case;
use rt_results::{
    IterationRecord, MonitorValue, RunManifest, RunStore, TerminationKind, compute_run_id,
    timestamp_now,
};
use rt_sim::{ControlOutcome, IterationTrace, LoopPhase, LoopProgress, Termination};
use tracing::info;

use crate::error::AppResult;
use crate::progress::{ControlProgress, RunProgressEvent, RunStage};
use crate::{project_service, runtime};

/// Options for executing runs.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub use_cache: bool,
    pub solver_version: String,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            solver_version: concat!("surrogate-", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Request to execute a run.
pub struct RunRequest<'a> {
    pub case_path: &'a Path,
    pub options: RunOptions,
}

/// Response from a run execution.
#[derive(Debug, Clone)]
pub struct RunResponse {
    pub run_id: String,
    pub manifest: RunManifest,
    pub loaded_from_cache: bool,
    pub elapsed_wall_s: f64,
}

fn emit_progress(
    progress_cb: &mut Option<&mut dyn FnMut(RunProgressEvent)>,
    stage: RunStage,
    started: Instant,
    message: Option<String>,
    control: Option<ControlProgress>,
) {
    if let Some(cb) = progress_cb.as_deref_mut() {
        cb(RunProgressEvent {
            stage,
            elapsed_wall_s: started.elapsed().as_secs_f64(),
            message,
            control,
        });
    }
}

/// Execute or load a run.
pub fn ensure_run(request: &RunRequest) -> AppResult<RunResponse> {
    ensure_run_with_progress(request, None)
}

/// Execute or load a run and stream progress events.
pub fn ensure_run_with_progress(
    request: &RunRequest,
    mut progress_cb: Option<&mut dyn FnMut(RunProgressEvent)>,
) -> AppResult<RunResponse> {
    let started = Instant::now();

    emit_progress(
        &mut progress_cb,
        RunStage::LoadingCase,
        started,
        Some("Loading case".to_string()),
        None,
    );
    let case = project_service::load_case(request.case_path)?;
    project_service::validate_case(&case)?;

    emit_progress(
        &mut progress_cb,
        RunStage::CheckingCache,
        started,
        Some("Checking run cache".to_string()),
        None,
    );
    let run_id = compute_run_id(&case, &request.options.solver_version)?;
    let store = RunStore::for_case(request.case_path)?;

    if request.options.use_cache && store.has_run(&run_id) {
        emit_progress(
            &mut progress_cb,
            RunStage::LoadingCachedResult,
            started,
            Some("Loading cached run".to_string()),
            None,
        );
        let manifest = store.load_manifest(&run_id)?;
        info!(run_id = %run_id, "Loaded cached run");

        emit_progress(
            &mut progress_cb,
            RunStage::Completed,
            started,
            Some("Loaded cached run".to_string()),
            None,
        );
        return Ok(RunResponse {
            run_id,
            manifest,
            loaded_from_cache: true,
            elapsed_wall_s: started.elapsed().as_secs_f64(),
        });
    }

    let manifest = execute_run(
        &case,
        &store,
        &run_id,
        &request.options.solver_version,
        &mut progress_cb,
        started,
    )?;

    emit_progress(
        &mut progress_cb,
        RunStage::Completed,
        started,
        Some("Run completed".to_string()),
        None,
    );

    Ok(RunResponse {
        run_id,
        manifest,
        loaded_from_cache: false,
        elapsed_wall_s: started.elapsed().as_secs_f64(),
    })
}

fn execute_run(
    case: &Case,
    store: &RunStore,
    run_id: &str,
    solver_version: &str,
    progress_cb: &mut Option<&mut dyn FnMut(RunProgressEvent)>,
    started: Instant,
) -> AppResult<RunManifest> {
    let config = runtime::build_loop_config(case)?;
    let mut oracle = AffinityPumpOracle::new(runtime::build_surrogate(case));
    info!(run_id = %run_id, case = %case.name, target = case.target.value_pa, "Starting run");

    let max_steps = config.criteria.max_steps;
    let target_pa = config.target_output;
    let mut forward = |p: LoopProgress| {
        let stage = match p.phase {
            LoopPhase::WarmStart => RunStage::WarmStart,
            LoopPhase::Controlling => RunStage::Controlling,
            LoopPhase::Settling => RunStage::Settling,
            LoopPhase::Done => return,
        };
        let control = ControlProgress {
            control_iterations: p.control_iterations,
            solver_iteration: p.solver_iteration,
            max_steps,
            actuation_rad_s: p.state.map(|s| s.current_actuation),
            output_pa: p.state.map(|s| s.current_output),
            target_pa,
        };
        emit_progress(progress_cb, stage, started, None, Some(control));
    };
    let outcome = rt_sim::run_control_loop_with_progress(&mut oracle, &config, Some(&mut forward))?;

    let settled_monitors = config
        .recorded_monitors
        .iter()
        .map(|name| -> AppResult<MonitorValue> {
            Ok(MonitorValue::new(name.as_str(), oracle.read_monitor(name)?))
        })
        .collect::<AppResult<Vec<_>>>()?;

    emit_progress(
        progress_cb,
        RunStage::SavingResults,
        started,
        Some("Saving results".to_string()),
        None,
    );
    let manifest = build_manifest(case, run_id, solver_version, &outcome, settled_monitors);
    let records: Vec<IterationRecord> = outcome.iterations.iter().map(to_record).collect();
    store.save_run(&manifest, &records)?;

    info!(
        run_id = %run_id,
        termination = outcome.termination.label(),
        iterations = records.len(),
        "Run saved"
    );
    Ok(manifest)
}

fn build_manifest(
    case: &Case,
    run_id: &str,
    solver_version: &str,
    outcome: &ControlOutcome,
    settled_monitors: Vec<MonitorValue>,
) -> RunManifest {
    RunManifest {
        run_id: run_id.to_string(),
        case_name: case.name.clone(),
        timestamp: timestamp_now(),
        solver_version: solver_version.to_string(),
        termination: match outcome.termination {
            Termination::Converged => TerminationKind::Converged,
            Termination::StepCapExhausted => TerminationKind::StepCapExhausted,
        },
        target_pa: outcome.final_state.target_output,
        control_iterations: outcome.iterations.len(),
        controlling_end_iteration: outcome.controlling_end_iteration,
        total_iterations: outcome.total_iterations,
        final_actuation_rad_s: outcome.final_state.current_actuation,
        final_output_pa: outcome.final_state.current_output,
        settled_output_pa: outcome.settled_output,
        settled_monitors,
    }
}

fn to_record(trace: &IterationTrace) -> IterationRecord {
    IterationRecord {
        index: trace.index,
        solver_iteration: trace.solver_iteration,
        actuation_before_rad_s: trace.actuation_before,
        actuation_after_rad_s: trace.actuation_after,
        output_before_pa: trace.output_before,
        output_after_pa: trace.output_after,
        step_count: trace.step_count,
        regime: trace.regime.label().to_string(),
        within_target: trace.evaluation.within_target,
        residuals_ok: trace.evaluation.residuals_ok,
        monitors: trace
            .monitors
            .iter()
            .map(|(name, value)| MonitorValue::new(name.as_str(), *value))
            .collect(),
    }
}

/// List runs of the case at `case_path`, most recent first.
pub fn list_runs(case_path: &Path) -> AppResult<Vec<RunManifest>> {
    let case = project_service::load_case(case_path)?;
    let store = RunStore::for_case(case_path)?;

    let mut runs = store.list_runs(&case.name)?;
    runs.reverse();
    Ok(runs)
}

/// Load a stored run.
pub fn load_run(case_path: &Path, run_id: &str) -> AppResult<(RunManifest, Vec<IterationRecord>)> {
    let store = RunStore::for_case(case_path)?;

    let manifest = store.load_manifest(run_id)?;
    let records = store.load_iterations(run_id)?;

    Ok((manifest, records))
}
