use std::fs;

use flight_mission::config::{DynamicsConfig, load_mission, load_missions};
use flight_mission::report::{summarize, write_phase_table};
use flight_mission::scenario::{Scenario, ScenarioError, TriggerOverride, load_scenarios};
use flight_mission::trajectory::ConfigurationError;
use flight_mission::trajectory::aircraft::AircraftError;
use flight_mission::trajectory::manifest::{ManifestError, build_trajectory};
use flight_mission::{Unit, names};

const CRUISE: &str = "configs/missions/cruise.yaml";
const TAKEOFF: &str = "configs/missions/takeoff.toml";
const GATE_TO_GATE: &str = "configs/missions/gate_to_gate.yaml";

#[test]
fn cruise_manifest_parses() {
    let mission = load_mission(CRUISE).expect("cruise manifest");
    assert_eq!(mission.name, "cruise");
    assert_eq!(mission.phases.len(), 1);
    assert_eq!(mission.phases[0].dynamics, DynamicsConfig::HeightEnergy);
    assert_eq!(mission.initial_state["mass"].value, 171_000.0);
    assert_eq!(mission.initial_state["mass"].unit, Unit::PoundMass);
    assert_eq!(mission.integrator.max_duration_s, Some(36_000.0));
}

#[test]
fn cruise_manifest_runs_to_its_trigger() {
    let scenario = Scenario::load(CRUISE).expect("scenario");
    let outcome = scenario.trajectory.run().expect("cruise run");
    let mass = outcome
        .final_states
        .get(names::MASS, Unit::PoundMass)
        .expect("mass");
    assert!((mass - 160_000.0).abs() < 1e-5);
}

#[test]
fn takeoff_manifest_reaches_rotation_speed() {
    let scenario = Scenario::load(TAKEOFF).expect("toml scenario");
    let outcome = scenario.trajectory.run().expect("takeoff run");
    let velocity = outcome
        .final_states
        .get(names::VELOCITY, Unit::Knot)
        .expect("velocity");
    assert!((velocity - 167.85).abs() < 1e-5);
}

#[test]
fn gate_to_gate_keeps_one_mission_clock() {
    let scenario = Scenario::load(GATE_TO_GATE).expect("scenario");
    let outcome = scenario.trajectory.run().expect("gate to gate");
    let order: Vec<_> = outcome.phases.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(order, ["takeoff", "cruise", "landing"]);

    for pair in outcome.phases.windows(2) {
        assert_eq!(pair[1].start_time, pair[0].end_time);
        assert_eq!(
            pair[1].initial_state.get(names::MASS),
            pair[0].terminal_state.get(names::MASS)
        );
    }

    let cruise = &outcome.phases[1];
    let altitude = cruise.initial_state.get(names::ALTITUDE).expect("altitude");
    assert!((Unit::Foot.from_si(altitude) - 35_000.0).abs() < 1e-9);

    let velocity = outcome
        .final_states
        .get(names::VELOCITY, Unit::Knot)
        .expect("velocity");
    assert!(velocity.abs() < 1e-5);
    assert!(outcome.final_states.get(names::DISTANCE, Unit::NauticalMile).expect("distance") > 100.0);
}

#[test]
fn directory_loading_finds_every_manifest() {
    let scenarios = load_scenarios("configs/missions").expect("directory");
    let mut found: Vec<_> = scenarios.iter().map(|s| s.name.clone()).collect();
    found.sort();
    assert_eq!(found, ["cruise", "gate_to_gate", "takeoff"]);
}

#[test]
fn yaml_lists_hold_several_missions() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("pair.yaml");
    let cruise = fs::read_to_string(CRUISE).expect("read cruise");
    let second = cruise.replace("name: cruise\n", "name: cruise_again\n");
    let list = format!("- {}\n- {}", indent(&cruise), indent(&second));
    fs::write(&path, list).expect("write list");

    let missions = load_missions(&path).expect("list");
    assert_eq!(missions.len(), 2);
    assert_eq!(missions[1].name, "cruise_again");

    match Scenario::load(&path) {
        Err(ScenarioError::Ambiguous(_)) => {}
        other => panic!("expected an ambiguity error, got {other:?}"),
    }
}

fn indent(document: &str) -> String {
    document
        .lines()
        .filter(|line| !line.starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n  ")
}

#[test]
fn trigger_overrides_parse() {
    let plain: TriggerOverride = "cruise=165000".parse().expect("plain");
    assert_eq!(
        plain,
        TriggerOverride {
            phase: "cruise".to_string(),
            index: 0,
            value: 165_000.0,
        }
    );

    let indexed: TriggerOverride = "landing:2=0.5".parse().expect("indexed");
    assert_eq!(indexed.phase, "landing");
    assert_eq!(indexed.index, 2);

    for bad in ["cruise", "cruise=fast", ":1=3", "cruise:x=3", "cruise=inf"] {
        assert!(bad.parse::<TriggerOverride>().is_err(), "{bad} should not parse");
    }
}

#[test]
fn overrides_build_a_fresh_trajectory() {
    let scenario = Scenario::load(CRUISE).expect("scenario");
    let heavier = scenario
        .with_overrides(&["cruise=165000".parse().expect("override")])
        .expect("apply");

    assert_eq!(
        scenario.trajectory.phase("cruise").expect("phase").triggers()[0].threshold,
        160_000.0
    );
    let outcome = heavier.trajectory.run().expect("run");
    let mass = outcome
        .final_states
        .get(names::MASS, Unit::PoundMass)
        .expect("mass");
    assert!((mass - 165_000.0).abs() < 1e-5);

    match scenario.with_overrides(&["climb=1".parse().expect("override")]) {
        Err(ScenarioError::Override(ConfigurationError::UnknownPhase(name))) => {
            assert_eq!(name, "climb")
        }
        other => panic!("expected an unknown phase, got {other:?}"),
    }
}

#[test]
fn unsupported_blocks_are_reported() {
    let mut mission = load_mission(CRUISE).expect("cruise manifest");
    mission.phases[0].dynamics = DynamicsConfig::Unsupported;
    assert!(matches!(
        build_trajectory(&mission),
        Err(ManifestError::UnsupportedDynamics(name)) if name == "cruise"
    ));

    let yaml = fs::read_to_string(CRUISE)
        .expect("read cruise")
        .replace(
            "  type: single_aisle\n",
            "  type: drag_polar\n  name: heavy\n  wing_area_m2: 120.0\n  cd0: 0.02\n  induced_drag_factor: 0.045\n  ground_roll_lift_coefficient: 0.4\n  thrust_per_engine: { val: 12000.0, units: kg }\n  engine_count: 2\n  tsfc_lbm_per_lbf_hr: 0.55\n",
        );
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("heavy.yaml");
    fs::write(&path, yaml).expect("write");
    let mission = load_mission(&path).expect("parse drag polar");
    assert!(matches!(
        build_trajectory(&mission),
        Err(ManifestError::Aircraft(AircraftError::ThrustUnits(Unit::Kilogram)))
    ));
}

#[test]
fn summary_and_phase_table_describe_the_run() {
    let scenario = Scenario::load(GATE_TO_GATE).expect("scenario");
    let outcome = scenario.trajectory.run().expect("run");

    let summary = summarize(&scenario.name, &outcome);
    assert_eq!(summary.mission, "gate_to_gate");
    assert_eq!(summary.phases.len(), 3);
    let landing = &summary.phases[2];
    let initial_velocity = landing
        .initial_state
        .iter()
        .find(|v| v.name == names::VELOCITY)
        .expect("velocity");
    assert_eq!(initial_velocity.units, "kn");
    assert!((initial_velocity.value - 140.0).abs() < 1e-9);

    let json = serde_json::to_value(&summary).expect("json");
    assert_eq!(json["phases"][0]["name"], "takeoff");
    assert_eq!(json["final_outputs"].as_array().map(Vec::len), Some(4));

    let mut buffer = Vec::new();
    write_phase_table(&mut buffer, &outcome).expect("csv");
    let mut reader = csv::Reader::from_reader(buffer.as_slice());
    let headers = reader.headers().expect("headers").clone();
    assert_eq!(&headers[0], "index");
    assert_eq!(&headers[1], "name");
    let rows: Vec<csv::StringRecord> = reader.records().collect::<Result<_, _>>().expect("rows");
    assert_eq!(rows.len(), 3);
    assert_eq!(&rows[1][1], "cruise");
    let start: f64 = rows[1][4].parse().expect("start time");
    let previous_end: f64 = rows[0][5].parse().expect("end time");
    assert!((start - previous_end).abs() < 1e-6);
}

#[test]
fn phase_table_escapes_awkward_names() {
    let mut mission = load_mission(CRUISE).expect("cruise manifest");
    mission.phases[0].name = "cruise, leg \"A\"".to_string();
    let outcome = build_trajectory(&mission)
        .expect("trajectory")
        .run()
        .expect("run");

    let mut buffer = Vec::new();
    write_phase_table(&mut buffer, &outcome).expect("csv");
    let mut reader = csv::Reader::from_reader(buffer.as_slice());
    assert_eq!(reader.headers().expect("headers").len(), 10);
    let rows: Vec<csv::StringRecord> = reader.records().collect::<Result<_, _>>().expect("rows");
    assert_eq!(rows.len(), 1);
    assert_eq!(&rows[0][1], "cruise, leg \"A\"");
    let duration: f64 = rows[0][6].parse().expect("duration");
    assert!((duration - outcome.phases[0].duration()).abs() < 1e-9);
}
