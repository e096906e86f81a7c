use rt_results::*;

fn manifest(run_id: &str, case_name: &str, timestamp: &str) -> RunManifest {
    RunManifest {
        run_id: run_id.to_string(),
        case_name: case_name.to_string(),
        timestamp: timestamp.to_string(),
        solver_version: "v1".to_string(),
        termination: TerminationKind::Converged,
        target_pa: 13_332.23,
        control_iterations: 2,
        controlling_end_iteration: 250,
        total_iterations: 2250,
        final_actuation_rad_s: 314.4,
        final_output_pa: 13_330.0,
        settled_output_pa: 13_331.0,
        settled_monitors: vec![MonitorValue::new("Torque", -0.002)],
    }
}

fn record(index: usize, regime: &str) -> IterationRecord {
    IterationRecord {
        index,
        solver_iteration: 150 + 100 * index as u64,
        actuation_before_rad_s: 100.0,
        actuation_after_rad_s: 110.0,
        output_before_pa: 0.0,
        output_after_pa: 313.1,
        step_count: 100,
        regime: regime.to_string(),
        within_target: false,
        residuals_ok: false,
        monitors: vec![],
    }
}

#[test]
fn save_and_load_run() {
    let temp_dir = std::env::temp_dir().join("rt_results_test");
    let _ = std::fs::remove_dir_all(&temp_dir);

    let store = RunStore::new(temp_dir.clone()).unwrap();
    let manifest = manifest("test_run_123", "pump", "2026-02-25T12:00:00Z");
    let records = vec![record(0, "reversed"), record(1, "bounded")];

    assert!(!store.has_run("test_run_123"));
    store.save_run(&manifest, &records).unwrap();
    assert!(store.has_run("test_run_123"));

    let loaded_manifest = store.load_manifest("test_run_123").unwrap();
    assert_eq!(loaded_manifest, manifest);
    assert!(!loaded_manifest.is_provisional());

    let loaded_records = store.load_iterations("test_run_123").unwrap();
    assert_eq!(loaded_records, records);
}

#[test]
fn list_runs_by_case() {
    let temp_dir = std::env::temp_dir().join("rt_results_test_list");
    let _ = std::fs::remove_dir_all(&temp_dir);
    let store = RunStore::new(temp_dir).unwrap();

    store
        .save_run(&manifest("b", "pump", "2026-02-25T13:00:00Z"), &[])
        .unwrap();
    store
        .save_run(&manifest("a", "pump", "2026-02-25T12:00:00Z"), &[])
        .unwrap();
    store
        .save_run(&manifest("c", "other", "2026-02-25T12:30:00Z"), &[])
        .unwrap();

    let runs = store.list_runs("pump").unwrap();
    let ids: Vec<&str> = runs.iter().map(|m| m.run_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
}

#[test]
fn list_runs_skips_corrupt_and_unfinished_runs() {
    let temp_dir = std::env::temp_dir().join("rt_results_test_corrupt");
    let _ = std::fs::remove_dir_all(&temp_dir);
    let store = RunStore::new(temp_dir.clone()).unwrap();

    store
        .save_run(&manifest("good", "pump", "2026-02-25T12:00:00Z"), &[])
        .unwrap();
    std::fs::create_dir_all(temp_dir.join("corrupt")).unwrap();
    std::fs::write(temp_dir.join("corrupt").join("manifest.json"), "{ not json").unwrap();
    std::fs::create_dir_all(temp_dir.join("unfinished")).unwrap();

    let runs = store.list_runs("pump").unwrap();
    let ids: Vec<&str> = runs.iter().map(|m| m.run_id.as_str()).collect();
    assert_eq!(ids, vec!["good"]);
    assert!(matches!(
        store.load_manifest("corrupt"),
        Err(ResultsError::Json(_))
    ));
}

#[test]
fn delete_and_missing_runs() {
    let temp_dir = std::env::temp_dir().join("rt_results_test_delete");
    let _ = std::fs::remove_dir_all(&temp_dir);
    let store = RunStore::new(temp_dir).unwrap();

    store
        .save_run(&manifest("gone", "pump", "2026-02-25T12:00:00Z"), &[])
        .unwrap();
    store.delete_run("gone").unwrap();

    assert!(matches!(
        store.load_manifest("gone"),
        Err(ResultsError::RunNotFound { .. })
    ));
    assert!(matches!(
        store.load_iterations("gone"),
        Err(ResultsError::RunNotFound { .. })
    ));
    store.delete_run("never-existed").unwrap();
}

#[test]
fn store_next_to_case_file() {
    let case_dir = std::env::temp_dir().join("rt_results_case_dir");
    let _ = std::fs::remove_dir_all(&case_dir);
    std::fs::create_dir_all(&case_dir).unwrap();

    let store = RunStore::for_case(&case_dir.join("pump.yaml")).unwrap();
    assert_eq!(store.root_dir(), case_dir.join(".rotortune").join("runs"));
    assert!(store.root_dir().is_dir());
}

#[test]
fn timestamps_are_rfc3339() {
    let ts = timestamp_now();
    assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
}
