use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::{json, Value};
use tempfile::tempdir;

const MAKET: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<DartFile version="5.10.0">
    <Maket>
        <Soil>
            <OpticalPropertyLink ident="base_soil" indexFctPhase="0" type="0"/>
        </Soil>
    </Maket>
</DartFile>
"#;

const PHASE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<DartFile version="5.10.0">
    <Phase>
        <SpectralIntervals>
            <SpectralIntervalsProperties bandNumber="0" spectralDartMode="0"/>
            <SpectralIntervalsProperties bandNumber="1" spectralDartMode="2"/>
        </SpectralIntervals>
    </Phase>
</DartFile>
"#;

struct Workspace {
    _root: tempfile::TempDir,
    home: PathBuf,
    simulation: PathBuf,
    config: PathBuf,
}

fn workspace(multi_sol: bool, run_sequencer: bool) -> Workspace {
    let root = tempdir().unwrap();
    let home = root.path().join("DART");
    let simulation = home.join("user_data/simulations/forest");
    fs::create_dir_all(simulation.join("input")).unwrap();
    fs::write(simulation.join("input/maket.xml"), MAKET).unwrap();
    fs::write(simulation.join("input/phase.xml"), PHASE).unwrap();
    fs::write(
        simulation.join("positions.txt"),
        "complete trees\n0 1 1 0 1 1 1 0 0 0\n0 5 5 0 1.2 1.2 1.2 0 0 90\n",
    )
    .unwrap();

    let soils = root.path().join("soils");
    for name in ["peat", "clay"] {
        fs::create_dir_all(soils.join(name)).unwrap();
        for band in 0..2 {
            fs::write(soils.join(name).join(format!("{band}.txt")), "0.2\n").unwrap();
        }
    }

    let config = root.path().join("config.json");
    let document = json!({
        "nbr_of_sequence": 3,
        "paths": {
            "simulation_path": simulation,
            "position_txt_path": simulation.join("positions.txt"),
            "soil_factor_path": soils,
        },
        "parameters_to_vary": { "chlorophyl": true, "tree_temperature": true },
        "simulation_settings": { "multi_sol": multi_sol, "run_sequencer": run_sequencer },
        "engine": { "single_run_timeout_secs": 10, "sequence_timeout_secs": 10 },
        "relocation": { "attempts": 1, "settle_ms": 0 },
    });
    fs::write(&config, document.to_string()).unwrap();
    Workspace {
        _root: root,
        home,
        simulation,
        config,
    }
}

fn dseq(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_dseq"))
        .args(args)
        .output()
        .expect("run dseq")
}

fn stdout_json(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "dseq failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("json on stdout")
}

fn path_arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn generate_then_inspect() {
    let ws = workspace(true, false);
    let generated = stdout_json(&dseq(&["generate", "--config", path_arg(&ws.config)]));
    assert_eq!(generated["entity_count"], 2);
    assert_eq!(generated["offset"], 2);
    assert_eq!(generated["soils"], json!(["clay", "peat"]));

    let descriptor = ws.simulation.join("sequence.xml");
    let inspected = stdout_json(&dseq(&["inspect", "--descriptor", path_arg(&descriptor)]));
    assert_eq!(inspected["series"], 2 + 4 + 2);
    assert_eq!(inspected["groups"][0]["series_lengths"], json!([3, 3, 3, 3, 3, 3]));
    assert_eq!(inspected["groups"][1]["series_lengths"], json!([2, 2]));
}

#[test]
fn check_reports_missing_engine_tools() {
    let ws = workspace(false, true);
    let report = stdout_json(&dseq(&["check", "--config", path_arg(&ws.config)]));
    let codes: Vec<&str> = report["warnings"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|warning| warning["code"].as_str())
        .collect();
    assert!(codes.contains(&"engine-paths"));
}

#[cfg(unix)]
#[test]
fn run_qualifies_output_for_every_soil() {
    let ws = workspace(true, true);
    let tools = ws.home.join("tools/linux");
    fs::create_dir_all(&tools).unwrap();
    fs::write(tools.join("dart-full.sh"), "echo \"full $1\"\n").unwrap();
    fs::write(
        tools.join("dart-sequence.sh"),
        "out=\"$DART_LOCAL/simulations/$(dirname \"$1\")/sequence\"\n\
         mkdir -p \"$out/sequence_0\"\n\
         echo \"Total processing time: 1 s\"\n\
         exec sleep 30\n",
    )
    .unwrap();

    let summary = stdout_json(&dseq(&["run", "--config", path_arg(&ws.config)]));
    assert_eq!(summary["succeeded"], true);

    let output_root = ws.simulation.join("sequence");
    assert!(output_root.join("sequence_0_clay").is_dir());
    assert!(output_root.join("sequence_0_peat").is_dir());
    assert!(output_root.join("dseq_run_summary.json").is_file());
    assert!(output_root.join("relocations.csv").is_file());
    assert_eq!(
        fs::read_to_string(ws.simulation.join("input/maket.xml")).unwrap(),
        MAKET
    );
}
