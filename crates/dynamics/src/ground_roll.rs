//! Detailed ground roll shared by the takeoff and landing segments.

use std::sync::Arc;

use flight_core::{Dimension, StateSchema, StateVariable, Unit, names};

use crate::params::{ParameterError, Parameters, ensure_range, keys};
use crate::performance::{FlightCondition, VehiclePerformance, weight_n};
use crate::EquationsOfMotion;

const MASS: usize = 0;
const DISTANCE: usize = 1;
const ALTITUDE: usize = 2;
const VELOCITY: usize = 3;

/// `[mass, distance, altitude, velocity]`.
pub fn schema() -> StateSchema {
    StateSchema::new(vec![
        StateVariable::new(names::MASS, Unit::PoundMass),
        StateVariable::new(names::DISTANCE, Unit::NauticalMile),
        StateVariable::new(names::ALTITUDE, Unit::Foot),
        StateVariable::new(names::VELOCITY, Unit::Knot),
    ])
}

/// Which end of the flight the roll belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollKind {
    Takeoff,
    Landing,
}

impl RollKind {
    pub fn variant(self) -> &'static str {
        match self {
            RollKind::Takeoff => "detailed_takeoff",
            RollKind::Landing => "detailed_landing",
        }
    }

    /// Throttle used when the phase does not set one: full power for takeoff, idle for landing.
    fn default_throttle(self) -> f64 {
        match self {
            RollKind::Takeoff => 1.0,
            RollKind::Landing => 0.0,
        }
    }

    /// Friction parameter read when the phase does not name one.
    pub fn default_friction_key(self) -> &'static str {
        match self {
            RollKind::Takeoff => keys::ROLLING_FRICTION_COEFFICIENT,
            RollKind::Landing => keys::BRAKING_FRICTION_COEFFICIENT,
        }
    }
}

/// Runway equations with friction and throttle bound.
#[derive(Debug)]
pub struct GroundRollEom {
    kind: RollKind,
    vehicle: Arc<dyn VehiclePerformance>,
    schema: StateSchema,
    friction_coefficient: f64,
    throttle: f64,
}

impl GroundRollEom {
    pub(crate) fn resolve(
        kind: RollKind,
        vehicle: Arc<dyn VehiclePerformance>,
        friction_key: &str,
        parameters: &Parameters,
    ) -> Result<Self, ParameterError> {
        let friction = parameters.require(kind.variant(), friction_key, Dimension::Dimensionless)?;
        let friction_coefficient = ensure_range(
            friction_key,
            friction,
            0.0,
            1.0,
            "friction coefficient must lie in [0, 1]",
        )?;
        let throttle = match parameters.optional(keys::THROTTLE, Dimension::Dimensionless)? {
            Some(value) => {
                ensure_range(keys::THROTTLE, value, 0.0, 1.0, "throttle must lie in [0, 1]")?
            }
            None => kind.default_throttle(),
        };
        Ok(Self {
            kind,
            vehicle,
            schema: schema(),
            friction_coefficient,
            throttle,
        })
    }

    pub fn kind(&self) -> RollKind {
        self.kind
    }

    pub fn friction_coefficient(&self) -> f64 {
        self.friction_coefficient
    }

    pub fn throttle(&self) -> f64 {
        self.throttle
    }
}

impl EquationsOfMotion for GroundRollEom {
    fn schema(&self) -> &StateSchema {
        &self.schema
    }

    fn derivatives(&self, _t: f64, y: &[f64], dydt: &mut [f64]) {
        let mass = y[MASS];
        let velocity = y[VELOCITY];
        // Aerodynamic forces vanish once the aircraft has stopped.
        let airspeed = velocity.max(0.0);
        let condition = FlightCondition::at_airspeed(y[ALTITUDE], airspeed);

        let qs = condition.dynamic_pressure_pa * self.vehicle.wing_area_m2();
        let lift_coefficient = self.vehicle.ground_roll_lift_coefficient();
        let lift = qs * lift_coefficient;
        let drag = qs * self.vehicle.drag_coefficient(lift_coefficient, true);

        let idle = self.vehicle.idle_thrust_n(&condition);
        let max = self.vehicle.max_thrust_n(&condition).max(idle);
        let thrust = idle + self.throttle * (max - idle);

        let normal_force = (weight_n(mass) - lift).max(0.0);
        let friction = self.friction_coefficient * normal_force;

        dydt[MASS] = -self.vehicle.fuel_flow_kg_s(thrust, &condition);
        dydt[DISTANCE] = velocity;
        dydt[ALTITUDE] = 0.0;
        dydt[VELOCITY] = (thrust - drag - friction) / mass;
    }
}
