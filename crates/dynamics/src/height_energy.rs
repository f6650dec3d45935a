//! Height-energy point-mass model for climb, cruise, and descent segments.
//!
//! Speed is scheduled by a constant Mach number, so the only continuous states are mass,
//! ground distance, and altitude. Thrust is chosen to hold the commanded altitude rate and is
//! clamped to the engine's idle/maximum envelope; when the clamp is active the achieved rate
//! follows from the excess power instead.

use std::sync::Arc;

use flight_core::{Dimension, StateSchema, StateVariable, Unit, names};

use crate::params::{ParameterError, Parameters, ensure_range, keys};
use crate::performance::{FlightCondition, VehiclePerformance, weight_n};
use crate::EquationsOfMotion;

pub(crate) const VARIANT: &str = "height_energy";

const MASS: usize = 0;
const DISTANCE: usize = 1;
const ALTITUDE: usize = 2;

/// `[mass, distance, altitude]`.
pub fn schema() -> StateSchema {
    StateSchema::new(vec![
        StateVariable::new(names::MASS, Unit::PoundMass),
        StateVariable::new(names::DISTANCE, Unit::NauticalMile),
        StateVariable::new(names::ALTITUDE, Unit::Foot),
    ])
}

/// Height-energy equations with their parameters bound.
#[derive(Debug)]
pub struct HeightEnergyEom {
    vehicle: Arc<dyn VehiclePerformance>,
    schema: StateSchema,
    mach: f64,
    /// Commanded altitude rate (m/s).
    altitude_rate: f64,
}

impl HeightEnergyEom {
    pub(crate) fn resolve(
        vehicle: Arc<dyn VehiclePerformance>,
        parameters: &Parameters,
    ) -> Result<Self, ParameterError> {
        let mach = parameters.require(VARIANT, keys::MACH, Dimension::Dimensionless)?;
        if !(mach > 0.0 && mach < 1.0) {
            return Err(ParameterError::OutOfRange {
                key: keys::MACH.to_string(),
                value: mach,
                reason: "Mach number must lie in (0, 1)",
            });
        }
        let altitude_rate = parameters
            .optional(keys::ALTITUDE_RATE, Dimension::Speed)?
            .unwrap_or(0.0);
        // A throttle setting has no meaning when thrust is solved for.
        if let Some(throttle) = parameters.optional(keys::THROTTLE, Dimension::Dimensionless)? {
            ensure_range(keys::THROTTLE, throttle, 0.0, 1.0, "throttle must lie in [0, 1]")?;
        }
        Ok(Self {
            vehicle,
            schema: schema(),
            mach,
            altitude_rate,
        })
    }

    pub fn mach(&self) -> f64 {
        self.mach
    }

    pub fn commanded_altitude_rate(&self) -> f64 {
        self.altitude_rate
    }
}

impl EquationsOfMotion for HeightEnergyEom {
    fn schema(&self) -> &StateSchema {
        &self.schema
    }

    fn derivatives(&self, _t: f64, y: &[f64], dydt: &mut [f64]) {
        let mass = y[MASS];
        let altitude = y[ALTITUDE];
        let condition = FlightCondition::at_mach(altitude, self.mach);
        let speed = condition.true_airspeed_m_s;
        let weight = weight_n(mass);

        let qs = condition.dynamic_pressure_pa * self.vehicle.wing_area_m2();
        let lift_coefficient = weight / qs;
        let drag = qs * self.vehicle.drag_coefficient(lift_coefficient, false);

        let required = drag + weight * self.altitude_rate / speed;
        let idle = self.vehicle.idle_thrust_n(&condition);
        let max = self.vehicle.max_thrust_n(&condition).max(idle);
        let thrust = required.clamp(idle, max);
        let achieved_rate = if thrust == required {
            self.altitude_rate
        } else {
            (thrust - drag) * speed / weight
        };

        let sin_gamma = (achieved_rate / speed).clamp(-1.0, 1.0);
        let cos_gamma = (1.0 - sin_gamma * sin_gamma).sqrt();

        dydt[MASS] = -self.vehicle.fuel_flow_kg_s(thrust, &condition);
        dydt[DISTANCE] = speed * cos_gamma;
        dydt[ALTITUDE] = achieved_rate;
    }
}
