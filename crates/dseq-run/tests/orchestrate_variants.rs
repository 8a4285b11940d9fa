#![cfg(unix)]

use std::fs;

use dseq_core::codes;
use dseq_run::{Orchestrator, RunState, RunSummary, Termination};
use tempfile::tempdir;


#[test]
fn two_variants_leave_every_directory_qualified() {
    let root = tempdir().unwrap();
    let sim = fixtures::simulation(root.path());
    let launcher = fixtures::ScriptLauncher {
        single: vec![fixtures::script(root.path(), "single.sh", "echo single pass done")],
        sequence: fixtures::interactive_sequence(root.path(), &sim),
    };
    let config = fixtures::config(&sim, 20);
    let orchestrator = Orchestrator::new(&config, launcher);

    let report = orchestrator.run(&fixtures::variants(&["clay", "sand"])).unwrap();

    assert!(report.succeeded);
    assert_eq!(report.attempts.len(), 2);
    assert_eq!(
        fixtures::output_dirs(&sim),
        vec!["sequence_0_clay", "sequence_0_sand", "sequence_1_clay", "sequence_1_sand"]
    );
    let clay_soil = fs::read_to_string(sim.join("sequence/sequence_0_clay/soil.txt")).unwrap();
    let sand_soil = fs::read_to_string(sim.join("sequence/sequence_0_sand/soil.txt")).unwrap();
    assert_eq!(clay_soil.trim(), "ident=\"clay\"");
    assert_eq!(sand_soil.trim(), "ident=\"sand\"");

    assert_eq!(
        fs::read_to_string(sim.join("input/maket.xml")).unwrap(),
        fixtures::MAKET
    );
    assert!(!sim.join("input/maket.xml.backup").exists());
    assert!(report.restore_error.is_none());
}

#[test]
fn prompt_is_acknowledged_and_completion_marker_stops_engine() {
    let root = tempdir().unwrap();
    let sim = fixtures::simulation(root.path());
    let launcher = fixtures::ScriptLauncher {
        single: Vec::new(),
        sequence: fixtures::interactive_sequence(root.path(), &sim),
    };
    let config = fixtures::config(&sim, 20);
    let report = Orchestrator::new(&config, launcher)
        .run(&fixtures::variants(&["loam"]))
        .unwrap();

    let attempt = &report.attempts[0];
    assert!(attempt.succeeded);
    let sequence = attempt.steps.last().unwrap();
    assert_eq!(sequence.termination, Termination::Completed);
    assert_eq!(sequence.acknowledged, 1);

    let log = fs::read_to_string(config.run_log_path()).unwrap();
    assert!(log.contains("Starting sequence -start"));
    assert!(log.contains("Total processing time"));
}

#[test]
fn sequence_timeout_fails_variant_but_restores_and_relocates() {
    let root = tempdir().unwrap();
    let sim = fixtures::simulation(root.path());
    let out = sim.join("sequence");
    let hanging = fixtures::script(
        root.path(),
        "hang.sh",
        &format!("mkdir -p \"{}/sequence_0\"\necho working\nexec sleep 30", out.display()),
    );
    let launcher = fixtures::ScriptLauncher {
        single: Vec::new(),
        sequence: hanging,
    };
    let config = fixtures::config(&sim, 1);
    let report = Orchestrator::new(&config, launcher)
        .run(&fixtures::variants(&["peat"]))
        .unwrap();

    assert!(!report.succeeded);
    let attempt = &report.attempts[0];
    assert_eq!(attempt.failed_in, Some(RunState::RunSequence));
    assert!(attempt.failure.as_ref().unwrap().is(codes::PROCESS_TIMEOUT));
    assert_eq!(attempt.steps[0].termination, Termination::TimedOut);

    assert_eq!(fixtures::output_dirs(&sim), vec!["sequence_0_peat"]);
    assert_eq!(
        fs::read_to_string(sim.join("input/maket.xml")).unwrap(),
        fixtures::MAKET
    );
    let log = fs::read_to_string(config.run_log_path()).unwrap();
    assert!(log.contains("Process timed out"));
}

#[test]
fn failing_single_pass_skips_sequence_and_continues() {
    let root = tempdir().unwrap();
    let sim = fixtures::simulation(root.path());
    let launcher = fixtures::ScriptLauncher {
        single: vec![
            fixtures::script(root.path(), "fail.sh", "echo broken scene\nexit 3"),
            fixtures::script(root.path(), "never.sh", "echo unreachable"),
        ],
        sequence: fixtures::interactive_sequence(root.path(), &sim),
    };
    let config = fixtures::config(&sim, 20);
    let report = Orchestrator::new(&config, launcher)
        .run(&fixtures::variants(&["a", "b"]))
        .unwrap();

    assert!(!report.succeeded);
    assert_eq!(report.failed_variants(), vec!["a", "b"]);
    for attempt in &report.attempts {
        assert_eq!(attempt.failed_in, Some(RunState::RunSingle));
        assert_eq!(attempt.steps.len(), 1);
        assert_eq!(attempt.exit_code, Some(3));
        assert!(attempt.failure.as_ref().unwrap().is(codes::PROCESS_EXIT));
    }
}

#[test]
fn without_variants_runs_once_unpatched() {
    let root = tempdir().unwrap();
    let sim = fixtures::simulation(root.path());
    fs::remove_file(sim.join("input/maket.xml")).unwrap();
    let launcher = fixtures::ScriptLauncher {
        single: vec![fixtures::script(root.path(), "ok.sh", "exit 0")],
        sequence: fixtures::script(root.path(), "seq.sh", "echo \"$1\"\nexit 0"),
    };
    let config = fixtures::config(&sim, 20);
    let report = Orchestrator::new(&config, launcher).run(&[]).unwrap();

    assert!(report.succeeded);
    assert_eq!(report.attempts.len(), 1);
    assert!(report.attempts[0].variant.is_none());
    assert_eq!(report.attempts[0].steps[1].termination, Termination::Exited);
    assert_eq!(report.attempts[0].exit_code, Some(0));
}

#[test]
fn missing_soil_reference_aborts_before_running() {
    let root = tempdir().unwrap();
    let sim = fixtures::simulation(root.path());
    fs::remove_file(sim.join("input/maket.xml")).unwrap();
    let launcher = fixtures::ScriptLauncher {
        single: Vec::new(),
        sequence: fixtures::script(root.path(), "seq.sh", "exit 0"),
    };
    let config = fixtures::config(&sim, 20);
    let err = Orchestrator::new(&config, launcher)
        .run(&fixtures::variants(&["clay"]))
        .unwrap_err();
    assert!(err.info().is(codes::SOURCE_NOT_FOUND));
}

#[test]
fn summary_and_ledger_describe_relocations() {
    let root = tempdir().unwrap();
    let sim = fixtures::simulation(root.path());
    let launcher = fixtures::ScriptLauncher {
        single: Vec::new(),
        sequence: fixtures::interactive_sequence(root.path(), &sim),
    };
    let config = fixtures::config(&sim, 20);
    let report = Orchestrator::new(&config, launcher)
        .run(&fixtures::variants(&["clay", "sand"]))
        .unwrap();

    let summary = RunSummary::from_report(&report, &sim).unwrap();
    assert_eq!(summary.id.len(), 64);
    assert_eq!(summary.relocations.len(), 4);
    let (summary_path, ledger_path) = summary.write_to(&sim.join("sequence")).unwrap();

    let restored: RunSummary =
        serde_json::from_slice(&fs::read(&summary_path).unwrap()).unwrap();
    assert_eq!(restored, summary);
    let ledger = fs::read_to_string(ledger_path).unwrap();
    assert_eq!(ledger.lines().count(), 5);
    assert!(ledger.starts_with("variant,from,to,method,attempts,swept"));
    assert_eq!(fixtures::output_dirs(&sim).len(), 4);
}

#[test]
fn numeric_soil_names_keep_every_variant_apart() {
    let root = tempdir().unwrap();
    let sim = fixtures::simulation(root.path());
    let launcher = fixtures::ScriptLauncher {
        single: Vec::new(),
        sequence: fixtures::interactive_sequence(root.path(), &sim),
    };
    let config = fixtures::config(&sim, 20);
    let report = Orchestrator::new(&config, launcher)
        .run(&fixtures::variants(&["1", "2"]))
        .unwrap();

    assert!(report.succeeded);
    assert_eq!(
        fixtures::output_dirs(&sim),
        vec!["sequence_0_1", "sequence_0_2", "sequence_1_1", "sequence_1_2"]
    );
    let first = fs::read_to_string(sim.join("sequence/sequence_0_1/soil.txt")).unwrap();
    assert_eq!(first.trim(), "ident=\"1\"");
}

#[test]
fn output_from_an_earlier_run_is_not_renamed() {
    let root = tempdir().unwrap();
    let sim = fixtures::simulation(root.path());
    fs::create_dir_all(sim.join("sequence/sequence_0_clay")).unwrap();
    let launcher = fixtures::ScriptLauncher {
        single: Vec::new(),
        sequence: fixtures::interactive_sequence(root.path(), &sim),
    };
    let config = fixtures::config(&sim, 20);
    let report = Orchestrator::new(&config, launcher)
        .run(&fixtures::variants(&["sand"]))
        .unwrap();

    assert!(report.succeeded);
    assert_eq!(
        fixtures::output_dirs(&sim),
        vec!["sequence_0_clay", "sequence_0_sand", "sequence_1_sand"]
    );
}

#[test]
fn single_pass_timeout_fails_each_variant_and_skips_sequence() {
    let root = tempdir().unwrap();
    let sim = fixtures::simulation(root.path());
    let launcher = fixtures::ScriptLauncher {
        single: vec![fixtures::script(
            root.path(),
            "slow.sh",
            "echo computing directions\nexec sleep 30",
        )],
        sequence: fixtures::interactive_sequence(root.path(), &sim),
    };
    let config = fixtures::config_with_timeouts(&sim, 1, 20);
    let report = Orchestrator::new(&config, launcher)
        .run(&fixtures::variants(&["clay", "sand"]))
        .unwrap();

    assert!(!report.succeeded);
    assert_eq!(report.failed_variants(), vec!["clay", "sand"]);
    for attempt in &report.attempts {
        assert_eq!(attempt.failed_in, Some(RunState::RunSingle));
        assert_eq!(attempt.steps.len(), 1);
        assert_eq!(attempt.steps[0].termination, Termination::TimedOut);
        assert!(attempt.failure.as_ref().unwrap().is(codes::PROCESS_TIMEOUT));
    }
    assert!(!sim.join("sequence").exists());
    assert_eq!(
        fs::read_to_string(sim.join("input/maket.xml")).unwrap(),
        fixtures::MAKET
    );
}
