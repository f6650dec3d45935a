//! Vehicle performance providers consumed by the equations of motion.
//!
//! The equations of motion only see aerodynamic and propulsive terms through
//! [`VehiclePerformance`], so richer aerodynamics or engine decks can be swapped in without
//! touching the phase dynamics.

use std::fmt;

use flight_core::constants::{G0, KG_PER_LBM, N_PER_LBF, SECONDS_PER_HOUR};

use crate::atmosphere::{AtmosphereSample, standard_atmosphere};

/// Flight condition shared by every force evaluation at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlightCondition {
    pub altitude_m: f64,
    pub true_airspeed_m_s: f64,
    pub mach: f64,
    pub dynamic_pressure_pa: f64,
    pub atmosphere: AtmosphereSample,
}

impl FlightCondition {
    /// Condition at a given true airspeed.
    pub fn at_airspeed(altitude_m: f64, true_airspeed_m_s: f64) -> Self {
        let atmosphere = standard_atmosphere(altitude_m);
        Self {
            altitude_m,
            true_airspeed_m_s,
            mach: true_airspeed_m_s / atmosphere.speed_of_sound_m_s,
            dynamic_pressure_pa: 0.5
                * atmosphere.density_kg_m3
                * true_airspeed_m_s
                * true_airspeed_m_s,
            atmosphere,
        }
    }

    /// Condition at a given Mach number.
    pub fn at_mach(altitude_m: f64, mach: f64) -> Self {
        let atmosphere = standard_atmosphere(altitude_m);
        Self::at_airspeed(altitude_m, mach * atmosphere.speed_of_sound_m_s)
    }
}

/// Aerodynamic and propulsive characteristics of the vehicle.
pub trait VehiclePerformance: Send + Sync + fmt::Debug {
    /// Reference wing area (m²).
    fn wing_area_m2(&self) -> f64;

    /// Total drag coefficient for the given lift coefficient.
    fn drag_coefficient(&self, lift_coefficient: f64, in_ground_effect: bool) -> f64;

    /// Lift coefficient held during a ground roll (flaps set, nose on the runway).
    fn ground_roll_lift_coefficient(&self) -> f64;

    /// Maximum available thrust (N).
    fn max_thrust_n(&self, condition: &FlightCondition) -> f64;

    /// Flight-idle thrust (N).
    fn idle_thrust_n(&self, condition: &FlightCondition) -> f64;

    /// Fuel mass flow (kg/s) while producing `thrust_n`.
    fn fuel_flow_kg_s(&self, thrust_n: f64, condition: &FlightCondition) -> f64;
}

/// Parabolic drag polar with density-lapse thrust and constant TSFC.
#[derive(Debug, Clone, PartialEq)]
pub struct DragPolarAircraft {
    pub name: String,
    pub wing_area_m2: f64,
    /// Zero-lift drag coefficient.
    pub cd0: f64,
    /// Induced drag factor `k` in `CD = CD0 + k·CL²`.
    pub induced_drag_factor: f64,
    /// Multiplier on induced drag while in ground effect.
    pub ground_effect_factor: f64,
    pub ground_roll_lift_coefficient: f64,
    /// Sea-level static thrust per engine (N).
    pub sls_thrust_per_engine_n: f64,
    pub engine_count: u32,
    /// Thrust scales as `σ^n` with density ratio `σ`.
    pub thrust_lapse_exponent: f64,
    /// Thrust-specific fuel consumption (kg/(N·s)).
    pub tsfc_kg_per_n_s: f64,
    /// Idle thrust as a fraction of maximum thrust.
    pub idle_thrust_fraction: f64,
}

impl DragPolarAircraft {
    /// Twin-engine single-aisle transport (28 690 lbf per engine).
    pub fn single_aisle() -> Self {
        Self {
            name: "single-aisle transport".to_string(),
            wing_area_m2: 124.6,
            cd0: 0.0205,
            induced_drag_factor: 0.045,
            ground_effect_factor: 0.6,
            ground_roll_lift_coefficient: 0.45,
            sls_thrust_per_engine_n: 28_690.0 * N_PER_LBF,
            engine_count: 2,
            thrust_lapse_exponent: 0.8,
            tsfc_kg_per_n_s: tsfc_from_imperial(0.55),
            idle_thrust_fraction: 0.05,
        }
    }
}

/// Convert a TSFC in lbm/(lbf·h) into kg/(N·s).
pub fn tsfc_from_imperial(lbm_per_lbf_hr: f64) -> f64 {
    lbm_per_lbf_hr * KG_PER_LBM / (N_PER_LBF * SECONDS_PER_HOUR)
}

impl VehiclePerformance for DragPolarAircraft {
    fn wing_area_m2(&self) -> f64 {
        self.wing_area_m2
    }

    fn drag_coefficient(&self, lift_coefficient: f64, in_ground_effect: bool) -> f64 {
        let induced = self.induced_drag_factor * lift_coefficient * lift_coefficient;
        if in_ground_effect {
            self.cd0 + self.ground_effect_factor * induced
        } else {
            self.cd0 + induced
        }
    }

    fn ground_roll_lift_coefficient(&self) -> f64 {
        self.ground_roll_lift_coefficient
    }

    fn max_thrust_n(&self, condition: &FlightCondition) -> f64 {
        let sigma = condition.atmosphere.density_ratio().max(0.0);
        f64::from(self.engine_count)
            * self.sls_thrust_per_engine_n
            * sigma.powf(self.thrust_lapse_exponent)
    }

    fn idle_thrust_n(&self, condition: &FlightCondition) -> f64 {
        self.idle_thrust_fraction * self.max_thrust_n(condition)
    }

    fn fuel_flow_kg_s(&self, thrust_n: f64, _condition: &FlightCondition) -> f64 {
        self.tsfc_kg_per_n_s * thrust_n.max(0.0)
    }
}

/// Weight (N) of a vehicle of `mass_kg`.
#[inline]
pub fn weight_n(mass_kg: f64) -> f64 {
    mass_kg * G0
}
