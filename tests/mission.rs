use std::sync::Arc;

use flight_mission::dynamics::{
    CustomDynamics, DragPolarAircraft, ParameterError, VehiclePerformance, height_energy, keys,
};
use flight_mission::integrator::Settings;
use flight_mission::trajectory::{
    Budget, ConfigurationError, Continuity, DEFAULT_ROLL_DISTANCE, FailureKind, Link, OutputError,
    Phase, PhaseFailure, Trajectory, Trigger,
};
use flight_mission::{Quantity, StateSchema, StateVariable, Unit, names};

fn aircraft() -> Arc<dyn VehiclePerformance> {
    Arc::new(DragPolarAircraft::single_aisle())
}

fn cruise(name: &str) -> Phase {
    Phase::height_energy(name, aircraft()).with_parameter(keys::MACH, Quantity::scalar(0.8))
}

fn cruise_start(trajectory: Trajectory) -> Trajectory {
    trajectory
        .with_initial_value(names::MASS, Quantity::new(171_000.0, Unit::PoundMass))
        .with_initial_value(names::DISTANCE, Quantity::new(0.0, Unit::NauticalMile))
        .with_initial_value(names::ALTITUDE, Quantity::new(35_000.0, Unit::Foot))
}

/// Linear burn: 6000 lbm and 50 NM per 1000 s at constant altitude.
fn scripted_leg(name: &str) -> Phase {
    let burn_kg_s = Quantity::new(6_000.0, Unit::PoundMass).si() / 1_000.0;
    let speed_m_s = Quantity::new(50.0, Unit::NauticalMile).si() / 1_000.0;
    let dynamics = CustomDynamics::new(name, height_energy::schema(), move |_, _, _, dydt| {
        dydt[0] = -burn_kg_s;
        dydt[1] = speed_m_s;
        dydt[2] = 0.0;
    });
    Phase::custom(name, dynamics)
        .with_trigger(Trigger::new(names::MASS, 165_000.0, Unit::PoundMass).decreasing())
}

#[test]
fn cruise_terminates_on_mass_trigger() {
    let trajectory = cruise_start(Trajectory::new(vec![cruise("cruise")]))
        .with_trigger_threshold("cruise", 0, 160_000.0)
        .expect("threshold override");

    let outcome = trajectory.run().expect("cruise should terminate");

    let mass = outcome
        .final_states
        .get(names::MASS, Unit::PoundMass)
        .expect("mass output");
    assert!((mass - 160_000.0).abs() < 1e-5, "final mass {mass}");

    let distance = outcome
        .final_states
        .get(names::DISTANCE, Unit::NauticalMile)
        .expect("distance output");
    assert!(distance >= 0.0);
    assert!(distance > 100.0, "an 11 000 lbm burn covers real ground, got {distance} NM");

    let altitude = outcome
        .final_states
        .get(names::ALTITUDE, Unit::Foot)
        .expect("altitude output");
    assert!((altitude - 35_000.0).abs() < 1e-6);

    let phase = &outcome.phases[0];
    assert_eq!(phase.trigger_index, 0);
    assert_eq!(phase.start_time, 0.0);
    assert_eq!(outcome.final_states.time, phase.end_time);
    assert!(phase.accepted_steps > 0);
}

#[test]
fn continuity_hands_terminal_state_to_next_phase() {
    let trajectory = cruise_start(Trajectory::new(vec![
        scripted_leg("leg"),
        cruise("cruise").with_trigger_threshold(0, 160_000.0).expect("trigger 0"),
    ]));

    let outcome = trajectory.run().expect("two-phase run");
    assert_eq!(outcome.phases.len(), 2);

    let first = &outcome.phases[0];
    let second = &outcome.phases[1];

    let mass = first.terminal_state.get(names::MASS).expect("mass");
    let distance = first.terminal_state.get(names::DISTANCE).expect("distance");
    let altitude = first.terminal_state.get(names::ALTITUDE).expect("altitude");
    assert!((Unit::PoundMass.from_si(mass) - 165_000.0).abs() < 1e-5);
    assert!((Unit::NauticalMile.from_si(distance) - 50.0).abs() < 1e-6);
    assert_eq!(Unit::Foot.from_si(altitude).round(), 35_000.0);

    for name in [names::MASS, names::DISTANCE, names::ALTITUDE] {
        assert_eq!(
            second.initial_state.get(name),
            first.terminal_state.get(name),
            "{name} must be carried bit for bit"
        );
    }
    assert_eq!(second.start_time, first.end_time);
    assert!(second.end_time > second.start_time);
    let final_mass = outcome
        .final_states
        .get(names::MASS, Unit::PoundMass)
        .expect("mass output");
    assert!((final_mass - 160_000.0).abs() < 1e-5);
}

fn runway_start(trajectory: Trajectory) -> Trajectory {
    trajectory
        .with_initial_value(names::MASS, Quantity::new(171_000.0, Unit::PoundMass))
        .with_initial_value(names::DISTANCE, Quantity::new(0.0, Unit::Foot))
        .with_initial_value(names::ALTITUDE, Quantity::new(0.0, Unit::Foot))
        .with_initial_value(names::VELOCITY, Quantity::new(0.1, Unit::MeterPerSecond))
}

fn unreachable_takeoff() -> Phase {
    Phase::detailed_takeoff("takeoff", aircraft())
        .with_parameter(keys::ROLLING_FRICTION_COEFFICIENT, Quantity::scalar(0.0175))
        .with_trigger_threshold(0, 1_000.0)
        .expect("trigger 0")
}

#[test]
fn unreachable_velocity_trigger_never_fires() {
    let trajectory = runway_start(Trajectory::new(vec![unreachable_takeoff()]));

    let err = trajectory.run().expect_err("trigger is out of reach");
    assert_eq!(err.kind(), FailureKind::TriggerNeverFired);
    assert_eq!(err.phase_name(), Some("takeoff"));
    match &err.failure {
        PhaseFailure::TriggerNeverFired { budget, diagnostics } => {
            assert_eq!(
                *budget,
                Budget::Distance {
                    max_distance: DEFAULT_ROLL_DISTANCE,
                }
            );
            let rolled = diagnostics.state.get(names::DISTANCE).expect("distance");
            assert!(rolled >= DEFAULT_ROLL_DISTANCE);
            let mass = diagnostics.state.get(names::MASS).expect("mass");
            assert!(Unit::PoundMass.from_si(mass) > 170_000.0, "fuel is nowhere near gone");
            assert!(diagnostics.time < 300.0);
            let closest = diagnostics.closest_trigger.as_ref().expect("closest trigger");
            assert_eq!(closest.index, 0);
            assert!(closest.residual < 0.0, "velocity stays below 1000 kn");
        }
        other => panic!("unexpected failure {other:?}"),
    }
}

#[test]
fn duration_budget_applies_without_a_distance_limit() {
    let takeoff = unreachable_takeoff()
        .without_max_distance()
        .with_settings(Settings {
            max_duration: 30.0,
            ..Settings::default()
        });
    let err = runway_start(Trajectory::new(vec![takeoff]))
        .run()
        .expect_err("trigger is out of reach");
    match &err.failure {
        PhaseFailure::TriggerNeverFired { budget, diagnostics } => {
            assert_eq!(*budget, Budget::Duration { max_duration: 30.0 });
            assert!((diagnostics.time - 30.0).abs() < 1e-9);
        }
        other => panic!("unexpected failure {other:?}"),
    }
}

#[test]
fn missing_friction_coefficient_fails_before_integrating() {
    let trajectory = cruise_start(Trajectory::new(vec![
        cruise("cruise"),
        Phase::detailed_landing("landing", aircraft())
            .with_initial_value(names::VELOCITY, Quantity::new(140.0, Unit::Knot)),
    ]));

    let err = trajectory.plan().expect_err("landing lacks braking friction");
    assert_eq!(err.kind(), FailureKind::Configuration);
    assert_eq!(err.phase_index(), Some(1));
    assert!(err.diagnostics().is_none());
    assert_eq!(
        err.failure,
        PhaseFailure::Configuration(ConfigurationError::Parameter(ParameterError::Missing {
            variant: "detailed_landing",
            key: keys::BRAKING_FRICTION_COEFFICIENT.to_string(),
        }))
    );

    let run_err = trajectory.run().expect_err("run plans first");
    assert_eq!(run_err, err);
}

#[test]
fn runs_are_idempotent_and_copy_isolated() {
    let base = cruise_start(Trajectory::new(vec![cruise("cruise")]))
        .with_trigger_threshold("cruise", 0, 168_000.0)
        .expect("override");
    let lighter = base
        .with_trigger_threshold("cruise", 0, 166_000.0)
        .expect("second override");

    assert_eq!(base.phase("cruise").expect("phase").triggers()[0].threshold, 168_000.0);
    assert_eq!(lighter.phase("cruise").expect("phase").triggers()[0].threshold, 166_000.0);

    let first = base.run().expect("first run");
    let second = base.run().expect("second run");
    assert_eq!(first, second);

    let other = lighter.run().expect("lighter run");
    let mass = other
        .final_states
        .get(names::MASS, Unit::PoundMass)
        .expect("mass");
    assert!((mass - 166_000.0).abs() < 1e-5);
    assert!(other.final_states.time > first.final_states.time);
}

#[test]
fn independent_runs_proceed_on_separate_threads() {
    let trajectory = cruise_start(Trajectory::new(vec![cruise("cruise")]))
        .with_trigger_threshold("cruise", 0, 169_000.0)
        .expect("override");
    let expected = trajectory.run().expect("reference run");

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..2).map(|_| scope.spawn(|| trajectory.run())).collect();
        for handle in handles {
            let outcome = handle.join().expect("thread").expect("run");
            assert_eq!(outcome, expected);
        }
    });
}

#[test]
fn mission_clock_starts_at_requested_time() {
    let trajectory = cruise_start(Trajectory::new(vec![scripted_leg("leg")])).with_start_time(600.0);
    let outcome = trajectory.run().expect("run");
    let phase = &outcome.phases[0];
    assert_eq!(phase.start_time, 600.0);
    assert!((phase.duration() - 1_000.0).abs() < 1e-6);
    assert!((outcome.final_states.time - 1_600.0).abs() < 1e-6);
}

#[test]
fn phase_overrides_apply_after_continuity() {
    let trajectory = cruise_start(Trajectory::new(vec![
        scripted_leg("leg"),
        cruise("cruise")
            .with_trigger_threshold(0, 164_000.0)
            .expect("trigger 0")
            .with_initial_value(names::ALTITUDE, Quantity::new(31_000.0, Unit::Foot)),
    ]));
    let outcome = trajectory.run().expect("run");
    let second = &outcome.phases[1];
    let altitude = second.initial_state.get(names::ALTITUDE).expect("altitude");
    assert!((Unit::Foot.from_si(altitude) - 31_000.0).abs() < 1e-9);
    assert_eq!(
        second.initial_state.get(names::MASS),
        outcome.phases[0].terminal_state.get(names::MASS)
    );
}

#[test]
fn hop_links_rename_variables() {
    let schema = StateSchema::new(vec![
        StateVariable::new("fuel_mass", Unit::PoundMass),
        StateVariable::new("range", Unit::NauticalMile),
        StateVariable::new(names::ALTITUDE, Unit::Foot),
    ]);
    let burn = CustomDynamics::new("burn", schema, |_, _, _, dydt| {
        dydt[0] = -1.0;
        dydt[1] = 200.0;
        dydt[2] = 0.0;
    });
    let first = Phase::custom("burn", burn)
        .with_trigger(Trigger::new("fuel_mass", 170_000.0, Unit::PoundMass));
    let continuity = Continuity::default().with_hop(
        1,
        vec![
            Link::renamed("fuel_mass", names::MASS),
            Link::renamed("range", names::DISTANCE),
            Link::same(names::ALTITUDE),
        ],
    );
    let trajectory = Trajectory::new(vec![
        first,
        cruise("cruise").with_trigger_threshold(0, 169_000.0).expect("trigger 0"),
    ])
    .with_continuity(continuity)
    .with_initial_value("fuel_mass", Quantity::new(171_000.0, Unit::PoundMass))
    .with_initial_value("range", Quantity::new(0.0, Unit::NauticalMile))
    .with_initial_value(names::ALTITUDE, Quantity::new(35_000.0, Unit::Foot));

    let outcome = trajectory.run().expect("renamed hand-off");
    assert_eq!(
        outcome.phases[1].initial_state.get(names::MASS),
        outcome.phases[0].terminal_state.get("fuel_mass")
    );
    assert_eq!(
        outcome.phases[1].initial_state.get(names::DISTANCE),
        outcome.phases[0].terminal_state.get("range")
    );
}

#[test]
fn continuity_must_match_both_schemas() {
    let landing = || {
        Phase::detailed_landing("landing", aircraft())
            .with_parameter(keys::BRAKING_FRICTION_COEFFICIENT, Quantity::scalar(0.35))
    };

    let missing_velocity = cruise_start(Trajectory::new(vec![cruise("cruise"), landing()]));
    let err = missing_velocity.plan().expect_err("landing needs a velocity");
    assert_eq!(err.phase_index(), Some(1));
    assert_eq!(
        err.failure,
        PhaseFailure::Configuration(ConfigurationError::MissingInitialValue {
            variable: names::VELOCITY.to_string(),
        })
    );

    let carries_velocity = cruise_start(Trajectory::new(vec![cruise("cruise"), landing()]))
        .with_continuity(Continuity::carrying([names::MASS, names::VELOCITY]));
    let err = carries_velocity.plan().expect_err("cruise has no velocity");
    assert_eq!(
        err.failure,
        PhaseFailure::Configuration(ConfigurationError::ContinuityUpstream {
            variable: names::VELOCITY.to_string(),
        })
    );

    let clashing = cruise_start(Trajectory::new(vec![cruise("outbound"), cruise("inbound")]))
        .with_continuity(Continuity::default().with_hop(
            1,
            vec![
                Link::same(names::MASS),
                Link::same(names::ALTITUDE),
                Link::renamed(names::DISTANCE, names::MASS),
            ],
        ));
    let err = clashing.plan().expect_err("mass written twice");
    assert_eq!(err.phase_index(), Some(1));
    assert_eq!(
        err.failure,
        PhaseFailure::Configuration(ConfigurationError::DuplicateLinkTarget {
            index: 1,
            variable: names::MASS.to_string(),
        })
    );

    let bad_hop = cruise_start(Trajectory::new(vec![cruise("cruise")]))
        .with_continuity(Continuity::default().with_hop(3, Vec::new()));
    let err = bad_hop.plan().expect_err("no phase #3");
    assert_eq!(err.phase, None);
    assert_eq!(
        err.failure,
        PhaseFailure::Configuration(ConfigurationError::UnknownHop { index: 3 })
    );
}

#[test]
fn trajectory_level_configuration_errors() {
    let err = Trajectory::new(Vec::new()).run().expect_err("empty");
    assert_eq!(
        err.failure,
        PhaseFailure::Configuration(ConfigurationError::EmptyTrajectory)
    );

    let duplicate = cruise_start(Trajectory::new(vec![cruise("cruise"), cruise("cruise")]));
    let err = duplicate.plan().expect_err("duplicate names");
    assert_eq!(err.phase_index(), Some(1));
    assert_eq!(
        err.failure,
        PhaseFailure::Configuration(ConfigurationError::DuplicatePhase("cruise".to_string()))
    );

    let trajectory = cruise_start(Trajectory::new(vec![cruise("cruise")]));
    assert_eq!(
        trajectory.with_trigger_threshold("climb", 0, 1.0).expect_err("no climb"),
        ConfigurationError::UnknownPhase("climb".to_string())
    );
    assert_eq!(
        trajectory.with_trigger_threshold("cruise", 4, 1.0).expect_err("one trigger"),
        ConfigurationError::UnknownTrigger {
            phase: "cruise".to_string(),
            index: 4,
        }
    );

    let missing = Trajectory::new(vec![cruise("cruise")])
        .with_initial_value(names::MASS, Quantity::new(171_000.0, Unit::PoundMass));
    let err = missing.plan().expect_err("distance and altitude missing");
    assert_eq!(
        err.failure,
        PhaseFailure::Configuration(ConfigurationError::MissingInitialValue {
            variable: names::DISTANCE.to_string(),
        })
    );

    let wrong_unit = cruise_start(Trajectory::new(vec![cruise("cruise")]))
        .with_initial_value(names::ALTITUDE, Quantity::new(35_000.0, Unit::PoundMass));
    assert!(matches!(
        wrong_unit.plan().expect_err("altitude in lbm").failure,
        PhaseFailure::Configuration(ConfigurationError::UnitMismatch { .. })
    ));

    let bad_output = cruise_start(Trajectory::new(vec![cruise("cruise")]))
        .with_final_outputs([names::VELOCITY]);
    assert_eq!(
        bad_output.plan().expect_err("no velocity in cruise").failure,
        PhaseFailure::Configuration(ConfigurationError::UnknownVariable {
            variable: names::VELOCITY.to_string(),
        })
    );
}

#[test]
fn final_outputs_are_restricted_and_converted() {
    let trajectory = cruise_start(Trajectory::new(vec![scripted_leg("leg")]))
        .with_final_outputs([names::MASS, names::DISTANCE]);
    let outcome = trajectory.run().expect("run");
    let finals = &outcome.final_states;

    assert_eq!(finals.len(), 2);
    let kg = finals.get(names::MASS, Unit::Kilogram).expect("kg");
    let lbm = finals.get(names::MASS, Unit::PoundMass).expect("lbm");
    assert!((Quantity::new(lbm, Unit::PoundMass).si() - kg).abs() < 1e-9);

    assert_eq!(
        finals.get(names::ALTITUDE, Unit::Foot),
        Err(OutputError::Missing(names::ALTITUDE.to_string()))
    );
    assert!(matches!(
        finals.get(names::MASS, Unit::Knot),
        Err(OutputError::Unit(_))
    ));

    let shown: Vec<_> = finals.quantities().map(|(name, q)| (name.to_string(), q.unit)).collect();
    assert_eq!(
        shown,
        vec![
            (names::MASS.to_string(), Unit::PoundMass),
            (names::DISTANCE.to_string(), Unit::NauticalMile),
        ]
    );
}
