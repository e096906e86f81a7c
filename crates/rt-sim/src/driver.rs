//! Control loop state machine.
//!
//! A run moves through `WarmStart → Controlling → Settling → Done` and never
//! goes back. While controlling, each iteration reads the pressure rise,
//! applies the actuation law, steps the solver and evaluates the stop
//! predicate. Settling then runs a fixed number of iterations with the step
//! cap disabled so the last actuation change can wash through.

use rt_controls::{ActuationLaw, ConvergenceCriteria, Evaluation, FlagReading, Regime, StopDecision};
use rt_core::names::{PRESSURE_RISE_MONITOR, ROTATION_FIELD};
use rt_oracle::{ActuationStore, SolverOracle};
use tracing::{debug, info, warn};

use crate::error::{SimError, SimResult};
use crate::warm_start::{WarmStartPlan, WarmStartReport, run_warm_start};

pub const DEFAULT_SETTLE_STEPS: u32 = 2000;

/// Phase of the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    WarmStart,
    Controlling,
    Settling,
    Done,
}

impl LoopPhase {
    pub fn label(&self) -> &'static str {
        match self {
            LoopPhase::WarmStart => "warm start",
            LoopPhase::Controlling => "controlling",
            LoopPhase::Settling => "settling",
            LoopPhase::Done => "done",
        }
    }
}

/// Working state of the feedback loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessState {
    /// Rotation rate last written to the solver (rad/s).
    pub current_actuation: f64,
    /// Most recent pressure rise reading (Pa).
    pub current_output: f64,
    pub target_output: f64,
    /// Iterations to run before the next decision.
    pub next_step_count: u32,
}

/// Everything the control loop needs besides the solver.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlLoopConfig {
    /// Monitor holding the controlled output.
    pub output_monitor: String,
    pub target_output: f64,
    /// Field function holding the actuation value.
    pub actuation_field: String,
    /// Written to the actuation field before the first decision if set.
    pub initial_actuation: Option<f64>,
    pub law: ActuationLaw,
    pub criteria: ConvergenceCriteria,
    pub warm_start: WarmStartPlan,
    /// Iterations run after the loop stops.
    pub settle_steps: u32,
    /// Extra monitors sampled after every control iteration.
    pub recorded_monitors: Vec<String>,
}

impl ControlLoopConfig {
    /// Pressure-rise control of the rotor speed with standard settings.
    pub fn new(target_output: f64) -> Self {
        Self {
            output_monitor: PRESSURE_RISE_MONITOR.to_string(),
            target_output,
            actuation_field: ROTATION_FIELD.to_string(),
            initial_actuation: None,
            law: ActuationLaw::default(),
            criteria: ConvergenceCriteria::default(),
            warm_start: WarmStartPlan::default(),
            settle_steps: DEFAULT_SETTLE_STEPS,
            recorded_monitors: Vec::new(),
        }
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.output_monitor.trim().is_empty() {
            return Err(SimError::InvalidArg {
                what: "output monitor must not be empty",
            });
        }
        if self.actuation_field.trim().is_empty() {
            return Err(SimError::InvalidArg {
                what: "actuation field must not be empty",
            });
        }
        if !self.target_output.is_finite() {
            return Err(SimError::InvalidArg {
                what: "target output must be finite",
            });
        }
        if self.initial_actuation.is_some_and(|v| !v.is_finite()) {
            return Err(SimError::InvalidArg {
                what: "initial actuation must be finite",
            });
        }
        self.law.validate()?;
        self.criteria.validate()?;
        self.warm_start.validate()?;
        Ok(())
    }
}

/// Why the control loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Output inside the window and every residual flag satisfied.
    Converged,
    /// The iteration ceiling was reached first. The result is provisional.
    StepCapExhausted,
}

impl Termination {
    pub fn label(&self) -> &'static str {
        match self {
            Termination::Converged => "converged",
            Termination::StepCapExhausted => "step cap exhausted",
        }
    }
}

/// Record of one control iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationTrace {
    /// Zero-based index of the control decision.
    pub index: usize,
    /// Solver iteration counter after stepping.
    pub solver_iteration: u64,
    pub actuation_before: f64,
    pub actuation_after: f64,
    pub output_before: f64,
    pub output_after: f64,
    /// Iterations actually requested from the solver.
    pub step_count: u32,
    pub regime: Regime,
    pub evaluation: Evaluation,
    pub decision: StopDecision,
    /// Values of the recorded monitors, in configuration order.
    pub monitors: Vec<(String, f64)>,
}

/// Result of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlOutcome {
    pub termination: Termination,
    pub warm_start: WarmStartReport,
    pub iterations: Vec<IterationTrace>,
    /// State when the loop stopped, before settling.
    pub final_state: ProcessState,
    /// Solver iteration counter when the loop stopped.
    pub controlling_end_iteration: u64,
    /// Solver iteration counter after settling.
    pub total_iterations: u64,
    /// Output read after settling.
    pub settled_output: f64,
}

impl ControlOutcome {
    /// True when the run ended on the step cap rather than on convergence.
    pub fn is_provisional(&self) -> bool {
        self.termination == Termination::StepCapExhausted
    }
}

/// Progress notification emitted while the loop runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopProgress {
    pub phase: LoopPhase,
    pub solver_iteration: u64,
    pub control_iterations: usize,
    /// Present once the loop has a process state.
    pub state: Option<ProcessState>,
}

/// Run warm-start, the feedback loop, and settling on `oracle`.
pub fn run_control_loop<O: SolverOracle + ?Sized>(
    oracle: &mut O,
    config: &ControlLoopConfig,
) -> SimResult<ControlOutcome> {
    run_control_loop_with_progress(oracle, config, None)
}

/// Like [`run_control_loop`], reporting progress through `progress`.
///
/// # Errors
///
/// Any solver failure aborts the run; there is no partial result. Running
/// out of iterations is not an error: the outcome carries
/// [`Termination::StepCapExhausted`].
pub fn run_control_loop_with_progress<O: SolverOracle + ?Sized>(
    oracle: &mut O,
    config: &ControlLoopConfig,
    mut progress: Option<&mut dyn FnMut(LoopProgress)>,
) -> SimResult<ControlOutcome> {
    config.validate()?;

    let max_steps = config.criteria.max_steps;
    oracle.set_max_steps(max_steps)?;
    oracle.set_step_cap_enabled(true)?;

    info!(stages = config.warm_start.stages.len(), "Entering warm start");
    emit(&mut progress, LoopPhase::WarmStart, oracle.iteration(), 0, None);
    let warm_start = run_warm_start(oracle, &config.warm_start)?;

    let store = ActuationStore::new(config.actuation_field.clone());
    if let Some(initial) = config.initial_actuation {
        store.write(oracle, initial)?;
    }
    let mut state = ProcessState {
        current_actuation: store.read(oracle)?,
        current_output: oracle.read_monitor(&config.output_monitor)?,
        target_output: config.target_output,
        next_step_count: config
            .warm_start
            .last_step_count()
            .unwrap_or(config.law.responsive_steps),
    };
    info!(
        actuation = state.current_actuation,
        output = state.current_output,
        target = state.target_output,
        max_steps,
        "Entering control loop"
    );
    emit(
        &mut progress,
        LoopPhase::Controlling,
        oracle.iteration(),
        0,
        Some(state),
    );

    let mut iterations: Vec<IterationTrace> = Vec::new();
    let termination = loop {
        let remaining = max_steps.saturating_sub(oracle.iteration());
        if remaining == 0 {
            break Termination::StepCapExhausted;
        }

        let output_before = oracle.read_monitor(&config.output_monitor)?;
        let actuation_before = state.current_actuation;
        let step = config
            .law
            .next(output_before, actuation_before, state.target_output);
        store.write(oracle, step.actuation)?;

        let step_count = clamp_step_count(step.step_count, remaining);
        state.current_actuation = step.actuation;
        state.next_step_count = step.step_count;
        oracle.step(step_count)?;

        state.current_output = oracle.read_monitor(&config.output_monitor)?;
        let flags = config
            .criteria
            .residual_flags
            .iter()
            .map(|name| -> SimResult<FlagReading> {
                Ok(FlagReading::new(name.as_str(), oracle.read_flag(name)?))
            })
            .collect::<SimResult<Vec<_>>>()?;
        let cap_satisfied = oracle.is_step_cap_satisfied()?;
        let evaluation = config.criteria.evaluate(
            state.current_output,
            state.target_output,
            &flags,
            cap_satisfied,
        );
        let decision = evaluation.decision();

        let monitors = config
            .recorded_monitors
            .iter()
            .map(|name| -> SimResult<(String, f64)> {
                Ok((name.clone(), oracle.read_monitor(name)?))
            })
            .collect::<SimResult<Vec<_>>>()?;

        let index = iterations.len();
        debug!(
            index,
            iteration = oracle.iteration(),
            actuation = step.actuation,
            output = state.current_output,
            regime = step.regime.label(),
            step_count,
            within_target = evaluation.within_target,
            residuals_ok = evaluation.residuals_ok,
            "Control iteration"
        );
        iterations.push(IterationTrace {
            index,
            solver_iteration: oracle.iteration(),
            actuation_before,
            actuation_after: step.actuation,
            output_before,
            output_after: state.current_output,
            step_count,
            regime: step.regime,
            evaluation,
            decision,
            monitors,
        });
        emit(
            &mut progress,
            LoopPhase::Controlling,
            oracle.iteration(),
            iterations.len(),
            Some(state),
        );

        match decision {
            StopDecision::Continue => {}
            StopDecision::Converged => break Termination::Converged,
            StopDecision::StepCapExhausted => break Termination::StepCapExhausted,
        }
    };

    let controlling_end_iteration = oracle.iteration();
    match termination {
        Termination::Converged => info!(
            iterations = iterations.len(),
            solver_iteration = controlling_end_iteration,
            output = state.current_output,
            actuation = state.current_actuation,
            "Control loop converged"
        ),
        Termination::StepCapExhausted => warn!(
            iterations = iterations.len(),
            solver_iteration = controlling_end_iteration,
            output = state.current_output,
            target = state.target_output,
            "Step cap exhausted before convergence; result is provisional"
        ),
    }

    oracle.set_step_cap_enabled(false)?;
    info!(steps = config.settle_steps, "Settling");
    emit(
        &mut progress,
        LoopPhase::Settling,
        controlling_end_iteration,
        iterations.len(),
        Some(state),
    );
    if config.settle_steps > 0 {
        oracle.step(config.settle_steps)?;
    }
    let settled_output = oracle.read_monitor(&config.output_monitor)?;
    let total_iterations = oracle.iteration();

    emit(
        &mut progress,
        LoopPhase::Done,
        total_iterations,
        iterations.len(),
        Some(state),
    );
    info!(
        termination = termination.label(),
        total_iterations,
        settled_output,
        "Run complete"
    );

    Ok(ControlOutcome {
        termination,
        warm_start,
        iterations,
        final_state: state,
        controlling_end_iteration,
        total_iterations,
        settled_output,
    })
}

fn clamp_step_count(hint: u32, remaining: u64) -> u32 {
    u32::try_from(remaining).map_or(hint, |r| hint.min(r))
}

fn emit(
    progress: &mut Option<&mut dyn FnMut(LoopProgress)>,
    phase: LoopPhase,
    solver_iteration: u64,
    control_iterations: usize,
    state: Option<ProcessState>,
) {
    if let Some(cb) = progress.as_deref_mut() {
        cb(LoopProgress {
            phase,
            solver_iteration,
            control_iterations,
            state,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_respects_remaining_budget() {
        assert_eq!(clamp_step_count(100, 1000), 100);
        assert_eq!(clamp_step_count(100, 37), 37);
        assert_eq!(clamp_step_count(100, u64::MAX), 100);
    }

    #[test]
    fn config_validation() {
        let config = ControlLoopConfig::new(13_332.23);
        config.validate().unwrap();

        let mut bad = config.clone();
        bad.target_output = f64::NAN;
        assert!(bad.validate().is_err());

        let mut bad = config.clone();
        bad.initial_actuation = Some(f64::INFINITY);
        assert!(bad.validate().is_err());

        let mut bad = config.clone();
        bad.output_monitor = " ".to_string();
        assert!(bad.validate().is_err());

        let mut bad = config;
        bad.criteria.residual_flags.push("Tke Criterion".to_string());
        assert!(matches!(bad.validate(), Err(SimError::Control(_))));
    }

    #[test]
    fn provisional_only_on_cap() {
        let state = ProcessState {
            current_actuation: 300.0,
            current_output: 13_000.0,
            target_output: 13_332.23,
            next_step_count: 100,
        };
        let mut outcome = ControlOutcome {
            termination: Termination::Converged,
            warm_start: WarmStartReport::default(),
            iterations: Vec::new(),
            final_state: state,
            controlling_end_iteration: 0,
            total_iterations: 0,
            settled_output: 0.0,
        };
        assert!(!outcome.is_provisional());
        outcome.termination = Termination::StepCapExhausted;
        assert!(outcome.is_provisional());
    }
}
