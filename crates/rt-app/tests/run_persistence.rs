use std::path::PathBuf;

use rt_app::{
    AppError, RunOptions, RunProgressEvent, RunRequest, RunStage, ensure_run,
    ensure_run_with_progress, list_runs, load_run, query, save_case,
};
use rt_project::schema::{Case, PlantDef};

fn case_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(name);
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn fast_case(name: &str) -> Case {
    let mut case = Case::new(name, 13_332.23);
    case.actuation.damping = 0.5;
    case.settle_steps = 200;
    case.monitors = vec!["Torque".to_string(), "HIOutlet".to_string()];
    case.fluid.rotor_diameter_m = Some(0.05);
    case.plant = Some(PlantDef::default());
    case
}

fn request(path: &std::path::Path, use_cache: bool) -> RunRequest<'_> {
    RunRequest {
        case_path: path,
        options: RunOptions {
            use_cache,
            ..RunOptions::default()
        },
    }
}

#[test]
fn run_persists_next_to_case_and_is_cached() {
    let dir = case_dir("rt_app_run_persistence");
    let path = dir.join("pump.yaml");
    save_case(&path, &fast_case("Persisted pump")).unwrap();

    let first = ensure_run(&request(&path, true)).expect("run failed");
    assert!(!first.loaded_from_cache);
    assert!(!first.manifest.is_provisional());
    assert!(dir.join(".rotortune/runs").join(&first.run_id).is_dir());

    let second = ensure_run(&request(&path, true)).unwrap();
    assert!(second.loaded_from_cache);
    assert_eq!(second.run_id, first.run_id);
    assert_eq!(second.manifest.timestamp, first.manifest.timestamp);
    assert_eq!(second.manifest.termination, first.manifest.termination);

    let third = ensure_run(&request(&path, false)).unwrap();
    assert!(!third.loaded_from_cache);
    assert_eq!(third.run_id, first.run_id);

    let runs = list_runs(&path).unwrap();
    assert_eq!(runs.len(), 1);

    let (manifest, records) = load_run(&path, &first.run_id).unwrap();
    assert_eq!(records.len(), manifest.control_iterations);
    assert_eq!(records[0].regime, "reversed");
    assert!(records.last().unwrap().within_target);
    assert_eq!(records[0].monitors.len(), 2);

    let series = query::output_series(&records);
    assert_eq!(series.len(), records.len());
    assert!(series.windows(2).all(|w| w[0].0 < w[1].0));
    let omega = query::actuation_series(&records);
    assert_eq!(omega[0].1, 110.0);
    assert_eq!(omega.last().unwrap().1, manifest.final_actuation_rad_s);
}

#[test]
fn summary_reports_pump_metrics() {
    let dir = case_dir("rt_app_summary");
    let path = dir.join("pump.yaml");
    let case = fast_case("Summary pump");
    save_case(&path, &case).unwrap();

    let response = ensure_run(&request(&path, false)).unwrap();
    let summary = query::run_summary(&response.manifest, &case);

    assert_eq!(summary.termination, "converged");
    assert!(summary.target_error_pa.abs() < 10.0);
    assert!(summary.rotation_rpm > 2900.0 && summary.rotation_rpm < 3100.0);
    let efficiency = summary.efficiency.expect("torque was recorded");
    assert!(efficiency > 0.0 && efficiency < 1.0);
    assert!(summary.head_m > 1.0);
    assert!(summary.specific_speed.is_some());
    assert!(summary.specific_diameter.is_some());
}

#[test]
fn progress_stages_are_reported_in_order() {
    let dir = case_dir("rt_app_progress");
    let path = dir.join("pump.json");
    save_case(&path, &fast_case("Progress pump")).unwrap();

    let mut events: Vec<RunProgressEvent> = Vec::new();
    let response = ensure_run_with_progress(
        &request(&path, false),
        Some(&mut |event| events.push(event)),
    )
    .unwrap();

    let stages: Vec<RunStage> = events.iter().map(|e| e.stage).collect();
    assert_eq!(stages.first(), Some(&RunStage::LoadingCase));
    assert_eq!(stages.last(), Some(&RunStage::Completed));
    for expected in [
        RunStage::WarmStart,
        RunStage::Controlling,
        RunStage::Settling,
        RunStage::SavingResults,
    ] {
        assert!(stages.contains(&expected), "missing stage {expected:?}");
    }

    let last_control = events
        .iter()
        .filter(|e| e.stage == RunStage::Controlling)
        .filter_map(|e| e.control.clone())
        .last()
        .unwrap();
    assert_eq!(
        last_control.control_iterations,
        response.manifest.control_iterations
    );
    assert_eq!(last_control.max_steps, 10_000);
}

#[test]
fn cap_exhaustion_is_stored_as_provisional() {
    let dir = case_dir("rt_app_provisional");
    let path = dir.join("pump.yaml");
    let mut case = fast_case("Provisional pump");
    case.actuation.damping = 0.05;
    case.convergence.max_steps = 1500;
    save_case(&path, &case).unwrap();

    let response = ensure_run(&request(&path, false)).unwrap();
    assert!(response.manifest.is_provisional());
    assert_eq!(response.manifest.controlling_end_iteration, 1500);
    assert_eq!(response.manifest.total_iterations, 1700);
}

#[test]
fn unknown_monitor_fails_without_saving() {
    let dir = case_dir("rt_app_unknown_monitor");
    let path = dir.join("pump.yaml");
    let mut case = fast_case("Broken pump");
    case.monitors = vec!["Efficiency".to_string()];
    save_case(&path, &case).unwrap();

    let err = ensure_run(&request(&path, false)).unwrap_err();
    assert!(matches!(err, AppError::Simulation(_)));
    assert!(list_runs(&path).unwrap().is_empty());
}

#[test]
fn missing_case_and_run_are_reported() {
    let dir = case_dir("rt_app_missing");
    let path = dir.join("absent.yaml");
    assert!(matches!(
        ensure_run(&request(&path, true)),
        Err(AppError::CaseFileRead { .. })
    ));

    let present = dir.join("pump.yaml");
    save_case(&present, &fast_case("Present pump")).unwrap();
    assert!(matches!(
        load_run(&present, "deadbeef"),
        Err(AppError::RunNotFound(_))
    ));
}
