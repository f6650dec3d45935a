use std::sync::Arc;

use flight_mission::dynamics::{
    CustomDynamics, DragPolarAircraft, ParameterError, PhaseDynamics, VehiclePerformance, keys,
};
use flight_mission::integrator::{CrossingDirection, Settings};
use flight_mission::trajectory::{
    Budget, ConfigurationError, DEFAULT_ROLL_DISTANCE, FailureKind, Phase, PhaseFailure, Trigger,
};
use flight_mission::{Quantity, State, StateSchema, StateVariable, Unit, names};

fn aircraft() -> Arc<dyn VehiclePerformance> {
    Arc::new(DragPolarAircraft::single_aisle())
}

fn runway_start(mass_lbm: f64, velocity: Quantity) -> State {
    let mut state = State::new();
    state.insert_quantity(names::MASS, Quantity::new(mass_lbm, Unit::PoundMass));
    state.insert_quantity(names::DISTANCE, Quantity::new(0.0, Unit::Foot));
    state.insert_quantity(names::ALTITUDE, Quantity::new(0.0, Unit::Foot));
    state.insert_quantity(names::VELOCITY, velocity);
    state
}

/// One variable `x` moving at 1 m/s.
fn ramp(name: &str) -> Phase {
    let schema = StateSchema::new(vec![StateVariable::new("x", Unit::Meter)]);
    Phase::custom(name, CustomDynamics::new(name, schema, |_, _, _, dydt| dydt[0] = 1.0))
}

fn ramp_start() -> State {
    let mut state = State::new();
    state.insert("x", 0.0);
    state
}

#[test]
fn takeoff_roll_reaches_rotation_speed() {
    let phase = Phase::detailed_takeoff("takeoff", aircraft())
        .with_parameter(keys::ROLLING_FRICTION_COEFFICIENT, Quantity::scalar(0.0175))
        .with_trigger_threshold(0, 167.85)
        .expect("default trigger");

    let outcome = phase
        .run(0.0, &runway_start(174_000.0, Quantity::new(0.1, Unit::MeterPerSecond)))
        .expect("takeoff roll");

    let velocity = outcome.terminal_state.get(names::VELOCITY).expect("velocity");
    assert!((Unit::Knot.from_si(velocity) - 167.85).abs() < 1e-5);
    let distance = outcome.terminal_state.get(names::DISTANCE).expect("distance");
    assert!(distance > 500.0 && distance < 3_000.0, "ground roll {distance} m");
    assert!(outcome.terminal_state.get(names::MASS) < outcome.initial_state.get(names::MASS));
    assert!(outcome.duration() > 10.0 && outcome.duration() < 120.0);
}

#[test]
fn landing_rollout_stops_the_aircraft() {
    let phase = Phase::detailed_landing("landing", aircraft())
        .with_parameter(keys::BRAKING_FRICTION_COEFFICIENT, Quantity::scalar(0.35));

    let outcome = phase
        .run(0.0, &runway_start(150_000.0, Quantity::new(140.0, Unit::Knot)))
        .expect("landing rollout");

    let velocity = outcome.terminal_state.get(names::VELOCITY).expect("velocity");
    assert!(Unit::Knot.from_si(velocity).abs() < 1e-5);
    assert!(outcome.terminal_state.get(names::DISTANCE).expect("distance") > 0.0);
    assert_eq!(outcome.terminal_state.get(names::ALTITUDE), Some(0.0));
}

#[test]
fn variant_constructors_install_default_triggers() {
    let cruise = Phase::height_energy("cruise", aircraft());
    assert_eq!(cruise.triggers().len(), 1);
    assert_eq!(cruise.triggers()[0].target, names::MASS);
    assert_eq!(cruise.triggers()[0].threshold, 150_000.0);
    assert_eq!(cruise.triggers()[0].direction, CrossingDirection::Decreasing);

    let takeoff = Phase::detailed_takeoff("takeoff", aircraft());
    assert_eq!(takeoff.triggers()[0].unit, Unit::Knot);
    assert_eq!(takeoff.triggers()[0].direction, CrossingDirection::Increasing);

    let landing = Phase::detailed_landing("landing", aircraft()).clear_triggers();
    assert!(landing.triggers().is_empty());
    assert_eq!(landing.dynamics().variant(), "detailed_landing");
}

#[test]
fn earliest_crossing_wins() {
    // Both thresholds fall inside the same accepted step once the step size has grown.
    let phase = ramp("ramp")
        .with_trigger(Trigger::new("x", 20.0, Unit::Meter))
        .with_trigger(Trigger::new("x", 10.0, Unit::Meter))
        .with_settings(Settings {
            initial_step: 30.0,
            ..Settings::default()
        });

    let outcome = phase.run(0.0, &ramp_start()).expect("ramp");
    assert_eq!(outcome.trigger_index, 1);
    assert!((outcome.end_time - 10.0).abs() < 1e-6);
}

#[test]
fn simultaneous_crossings_keep_declaration_order() {
    let phase = ramp("ramp")
        .with_trigger(Trigger::new("x", 10.0, Unit::Meter).increasing())
        .with_trigger(Trigger::new("x", 10.0, Unit::Meter));

    let outcome = phase.run(0.0, &ramp_start()).expect("ramp");
    assert_eq!(outcome.trigger_index, 0);
    assert_eq!(outcome.trigger.threshold, 10.0);
}

#[test]
fn direction_filters_crossings() {
    let phase = ramp("ramp")
        .with_trigger(Trigger::new("x", 5.0, Unit::Meter).decreasing())
        .with_trigger(Trigger::new("x", 8.0, Unit::Meter).increasing());

    let outcome = phase.run(0.0, &ramp_start()).expect("ramp");
    assert_eq!(outcome.trigger_index, 1);
    assert!((outcome.end_time - 8.0).abs() < 1e-6);
}

#[test]
fn wrong_direction_never_fires() {
    let phase = ramp("ramp")
        .with_trigger(Trigger::new("x", 5.0, Unit::Meter).decreasing())
        .with_settings(Settings {
            max_duration: 20.0,
            ..Settings::default()
        });

    let err = phase.run(0.0, &ramp_start()).expect_err("x only rises");
    assert_eq!(err.kind(), FailureKind::TriggerNeverFired);
    let diagnostics = err.diagnostics().expect("diagnostics");
    let x = diagnostics.state.get("x").expect("x");
    assert!((x - 20.0).abs() < 1e-9);
    let closest = diagnostics.closest_trigger.as_ref().expect("closest");
    assert!((closest.residual - 15.0).abs() < 1e-9);
}

#[test]
fn trigger_starting_on_threshold_does_not_fire_immediately() {
    let phase = ramp("ramp")
        .with_trigger(Trigger::new("x", 0.0, Unit::Meter))
        .with_trigger(Trigger::new("x", 3.0, Unit::Meter));

    let outcome = phase.run(0.0, &ramp_start()).expect("ramp");
    assert_eq!(outcome.trigger_index, 1);
}

#[test]
fn runway_parameters_are_range_checked() {
    let too_slippery = Phase::detailed_takeoff("takeoff", aircraft())
        .with_parameter(keys::ROLLING_FRICTION_COEFFICIENT, Quantity::scalar(1.5));
    let err = too_slippery
        .run(0.0, &runway_start(174_000.0, Quantity::new(0.1, Unit::MeterPerSecond)))
        .expect_err("mu above 1");
    assert!(matches!(
        err,
        PhaseFailure::Configuration(ConfigurationError::Parameter(
            ParameterError::OutOfRange { .. }
        ))
    ));

    let throttle_in_knots = Phase::detailed_takeoff("takeoff", aircraft())
        .with_parameter(keys::ROLLING_FRICTION_COEFFICIENT, Quantity::scalar(0.02))
        .with_parameter(keys::THROTTLE, Quantity::new(1.0, Unit::Knot));
    let start = runway_start(174_000.0, Quantity::new(0.1, Unit::MeterPerSecond));
    assert!(matches!(
        throttle_in_knots.run(0.0, &start),
        Err(PhaseFailure::Configuration(ConfigurationError::Parameter(
            ParameterError::Dimension { .. }
        )))
    ));

    let supersonic = Phase::height_energy("cruise", aircraft())
        .with_parameter(keys::MACH, Quantity::scalar(1.2));
    let mut start = State::new();
    start.insert_quantity(names::MASS, Quantity::new(171_000.0, Unit::PoundMass));
    start.insert(names::DISTANCE, 0.0);
    start.insert_quantity(names::ALTITUDE, Quantity::new(35_000.0, Unit::Foot));
    assert!(matches!(
        supersonic.run(0.0, &start),
        Err(PhaseFailure::Configuration(ConfigurationError::Parameter(
            ParameterError::OutOfRange { .. }
        )))
    ));
}

#[test]
fn custom_friction_key_is_honoured() {
    let phase = Phase::new(
        "landing",
        PhaseDynamics::detailed_landing(aircraft()).with_friction_key("runway:wet_braking"),
    )
    .with_trigger(Trigger::new(names::VELOCITY, 0.0, Unit::Knot).decreasing());

    let err = phase
        .run(0.0, &runway_start(150_000.0, Quantity::new(140.0, Unit::Knot)))
        .expect_err("wet braking coefficient missing");
    assert_eq!(
        err,
        PhaseFailure::Configuration(ConfigurationError::Parameter(ParameterError::Missing {
            variant: "detailed_landing",
            key: "runway:wet_braking".to_string(),
        }))
    );

    let wet = phase.with_parameter("runway:wet_braking", Quantity::scalar(0.2));
    let dry = Phase::detailed_landing("landing", aircraft())
        .with_parameter(keys::BRAKING_FRICTION_COEFFICIENT, Quantity::scalar(0.35));
    let start = runway_start(150_000.0, Quantity::new(140.0, Unit::Knot));
    let wet_distance = wet.run(0.0, &start).expect("wet").terminal_state.get(names::DISTANCE);
    let dry_distance = dry.run(0.0, &start).expect("dry").terminal_state.get(names::DISTANCE);
    assert!(wet_distance > dry_distance);
}

#[test]
fn required_custom_parameters_are_checked() {
    let schema = StateSchema::new(vec![StateVariable::new("x", Unit::Meter)]);
    let dynamics = CustomDynamics::new("drift", schema, |_, _, params, dydt| {
        dydt[0] = params.get("drift:speed").map(|q| q.si()).unwrap_or(0.0);
    })
    .requires("drift:speed", flight_mission::Dimension::Speed);
    let phase = Phase::custom("drift", dynamics)
        .with_trigger(Trigger::new("x", 100.0, Unit::Meter).increasing());

    assert!(matches!(
        phase.run(0.0, &ramp_start()),
        Err(PhaseFailure::Configuration(ConfigurationError::Parameter(
            ParameterError::Missing { .. }
        )))
    ));

    let outcome = phase
        .with_parameter("drift:speed", Quantity::new(10.0, Unit::MeterPerSecond))
        .run(0.0, &ramp_start())
        .expect("drift");
    assert!((outcome.end_time - 10.0).abs() < 1e-6);
}

#[test]
fn distance_budgets_are_validated() {
    let takeoff = Phase::detailed_takeoff("takeoff", aircraft())
        .with_parameter(keys::ROLLING_FRICTION_COEFFICIENT, Quantity::scalar(0.0175));
    assert_eq!(
        takeoff.max_distance(),
        Some(Quantity::new(DEFAULT_ROLL_DISTANCE, Unit::Meter))
    );
    let start = runway_start(174_000.0, Quantity::new(0.1, Unit::MeterPerSecond));

    let negative = takeoff
        .clone()
        .with_max_distance(Quantity::new(-1.0, Unit::Meter));
    assert!(matches!(
        negative.run(0.0, &start),
        Err(PhaseFailure::Configuration(ConfigurationError::InvalidDistanceBudget { .. }))
    ));

    let in_knots = takeoff
        .clone()
        .with_max_distance(Quantity::new(3_000.0, Unit::Knot));
    assert!(matches!(
        in_knots.run(0.0, &start),
        Err(PhaseFailure::Configuration(ConfigurationError::UnitMismatch { .. }))
    ));

    let no_distance = ramp("ramp")
        .with_trigger(Trigger::new("x", 5.0, Unit::Meter))
        .with_max_distance(Quantity::new(1.0, Unit::NauticalMile));
    assert_eq!(
        no_distance.run(0.0, &ramp_start()).expect_err("ramp has no distance"),
        PhaseFailure::Configuration(ConfigurationError::UnknownVariable {
            variable: names::DISTANCE.to_string(),
        })
    );

    let short_runway = takeoff.with_max_distance(Quantity::new(1_000.0, Unit::Foot));
    match short_runway.run(0.0, &start).expect_err("rotation needs more than 1000 ft") {
        PhaseFailure::TriggerNeverFired { budget, diagnostics } => {
            let limit = Quantity::new(1_000.0, Unit::Foot).si();
            assert_eq!(budget, Budget::Distance { max_distance: limit });
            assert!(diagnostics.state.get(names::DISTANCE).expect("distance") >= limit);
        }
        other => panic!("unexpected failure {other:?}"),
    }
}
