//! Phase dynamics models: the equations of motion integrated within each flight segment.

pub mod atmosphere;
pub mod custom;
pub mod ground_roll;
pub mod height_energy;
pub mod params;
pub mod performance;

use std::fmt;
use std::sync::Arc;

use flight_core::{StateSchema, names};
use thiserror::Error;

pub use custom::{CustomDynamics, DerivativeFn};
pub use ground_roll::{GroundRollEom, RollKind};
pub use height_energy::HeightEnergyEom;
pub use params::{ParameterError, Parameters, keys};
pub use performance::{DragPolarAircraft, FlightCondition, VehiclePerformance};

/// State left the physically meaningful region during integration.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{variable} = {value} is invalid: {reason}")]
pub struct DomainViolation {
    pub variable: String,
    pub value: f64,
    pub reason: &'static str,
}

/// Right-hand side of a phase's ODE with all parameters already bound.
///
/// Implementations must be deterministic and free of side effects for a given `(t, y)`.
pub trait EquationsOfMotion: Send + Sync + fmt::Debug {
    /// Layout of `y` and `dydt`.
    fn schema(&self) -> &StateSchema;

    /// Fill `dydt` with the state derivative at `(t, y)`. All values are SI.
    fn derivatives(&self, t: f64, y: &[f64], dydt: &mut [f64]);

    /// Reject states outside the model's valid region. By default every component must be finite
    /// and mass, when present, strictly positive.
    fn check_domain(&self, _t: f64, y: &[f64]) -> Result<(), DomainViolation> {
        check_finite_positive_mass(self.schema(), y)
    }
}

/// Finite components and positive mass.
pub fn check_finite_positive_mass(schema: &StateSchema, y: &[f64]) -> Result<(), DomainViolation> {
    for (variable, value) in schema.iter().zip(y) {
        if !value.is_finite() {
            return Err(DomainViolation {
                variable: variable.name.clone(),
                value: *value,
                reason: "value is not finite",
            });
        }
        if variable.name == names::MASS && *value <= 0.0 {
            return Err(DomainViolation {
                variable: variable.name.clone(),
                value: *value,
                reason: "mass must stay positive",
            });
        }
    }
    Ok(())
}

/// Flight-segment physics selected when a phase is built.
#[derive(Debug, Clone)]
pub enum PhaseDynamics {
    /// Constant-Mach climb, cruise, or descent.
    HeightEnergy {
        vehicle: Arc<dyn VehiclePerformance>,
    },
    /// Takeoff ground roll with rolling friction.
    DetailedTakeoff {
        vehicle: Arc<dyn VehiclePerformance>,
        friction_key: String,
    },
    /// Landing rollout with braking friction.
    DetailedLanding {
        vehicle: Arc<dyn VehiclePerformance>,
        friction_key: String,
    },
    Custom(CustomDynamics),
}

impl PhaseDynamics {
    pub fn height_energy(vehicle: Arc<dyn VehiclePerformance>) -> Self {
        PhaseDynamics::HeightEnergy { vehicle }
    }

    /// Takeoff roll reading the rolling friction coefficient.
    pub fn detailed_takeoff(vehicle: Arc<dyn VehiclePerformance>) -> Self {
        PhaseDynamics::DetailedTakeoff {
            vehicle,
            friction_key: RollKind::Takeoff.default_friction_key().to_string(),
        }
    }

    /// Landing rollout reading the braking friction coefficient.
    pub fn detailed_landing(vehicle: Arc<dyn VehiclePerformance>) -> Self {
        PhaseDynamics::DetailedLanding {
            vehicle,
            friction_key: RollKind::Landing.default_friction_key().to_string(),
        }
    }

    /// Replace the parameter key the friction coefficient is read from. No-op for variants
    /// without runway friction.
    pub fn with_friction_key(mut self, key: impl Into<String>) -> Self {
        match &mut self {
            PhaseDynamics::DetailedTakeoff { friction_key, .. }
            | PhaseDynamics::DetailedLanding { friction_key, .. } => *friction_key = key.into(),
            PhaseDynamics::HeightEnergy { .. } | PhaseDynamics::Custom(_) => {}
        }
        self
    }

    /// Short tag naming the variant.
    pub fn variant(&self) -> &str {
        match self {
            PhaseDynamics::HeightEnergy { .. } => height_energy::VARIANT,
            PhaseDynamics::DetailedTakeoff { .. } => RollKind::Takeoff.variant(),
            PhaseDynamics::DetailedLanding { .. } => RollKind::Landing.variant(),
            PhaseDynamics::Custom(custom) => custom.name(),
        }
    }

    /// State layout, available without resolving parameters.
    pub fn schema(&self) -> StateSchema {
        match self {
            PhaseDynamics::HeightEnergy { .. } => height_energy::schema(),
            PhaseDynamics::DetailedTakeoff { .. } | PhaseDynamics::DetailedLanding { .. } => {
                ground_roll::schema()
            }
            PhaseDynamics::Custom(custom) => custom.schema().clone(),
        }
    }

    /// Validate `parameters` and bind them into an evaluable model.
    pub fn resolve(
        &self,
        parameters: &Parameters,
    ) -> Result<Arc<dyn EquationsOfMotion>, ParameterError> {
        let eom: Arc<dyn EquationsOfMotion> = match self {
            PhaseDynamics::HeightEnergy { vehicle } => Arc::new(HeightEnergyEom::resolve(
                Arc::clone(vehicle),
                parameters,
            )?),
            PhaseDynamics::DetailedTakeoff {
                vehicle,
                friction_key,
            } => Arc::new(GroundRollEom::resolve(
                RollKind::Takeoff,
                Arc::clone(vehicle),
                friction_key,
                parameters,
            )?),
            PhaseDynamics::DetailedLanding {
                vehicle,
                friction_key,
            } => Arc::new(GroundRollEom::resolve(
                RollKind::Landing,
                Arc::clone(vehicle),
                friction_key,
                parameters,
            )?),
            PhaseDynamics::Custom(custom) => Arc::new(custom.resolve(parameters)?),
        };
        Ok(eom)
    }
}
