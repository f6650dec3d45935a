//! Phase definitions: dynamics, parameters, triggers, and initial-value overrides.

use std::sync::Arc;

use flight_core::{Quantity, State, StateSchema, Unit, Verbosity, names};
use flight_dynamics::{
    CustomDynamics, EquationsOfMotion, Parameters, PhaseDynamics, VehiclePerformance,
};
use flight_integrator::Settings;
use indexmap::IndexMap;

use super::error::ConfigurationError;
use super::trigger::{ArmedTrigger, Trigger};

/// Ground distance after which a takeoff or landing roll gives up, in metres.
pub const DEFAULT_ROLL_DISTANCE: f64 = 6_000.0;

/// One flight segment, ready to be placed in a [`super::Trajectory`].
#[derive(Debug, Clone)]
pub struct Phase {
    name: String,
    dynamics: PhaseDynamics,
    parameters: Parameters,
    triggers: Vec<Trigger>,
    initial_values: IndexMap<String, Quantity>,
    settings: Settings,
    verbosity: Verbosity,
    max_distance: Option<Quantity>,
}

impl Phase {
    /// Phase without triggers.
    pub fn new(name: impl Into<String>, dynamics: PhaseDynamics) -> Self {
        Self {
            name: name.into(),
            dynamics,
            parameters: Parameters::new(),
            triggers: Vec::new(),
            initial_values: IndexMap::new(),
            settings: Settings::default(),
            verbosity: Verbosity::default(),
            max_distance: None,
        }
    }

    /// Height-energy segment ending when mass falls to 150 000 lbm.
    pub fn height_energy(name: impl Into<String>, vehicle: Arc<dyn VehiclePerformance>) -> Self {
        Self::new(name, PhaseDynamics::height_energy(vehicle))
            .with_trigger(Trigger::new(names::MASS, 150_000.0, Unit::PoundMass).decreasing())
    }

    /// Takeoff roll ending when velocity rises to 150 kn, abandoned after
    /// [`DEFAULT_ROLL_DISTANCE`] of runway.
    pub fn detailed_takeoff(name: impl Into<String>, vehicle: Arc<dyn VehiclePerformance>) -> Self {
        Self::new(name, PhaseDynamics::detailed_takeoff(vehicle))
            .with_trigger(Trigger::new(names::VELOCITY, 150.0, Unit::Knot).increasing())
            .with_max_distance(Quantity::new(DEFAULT_ROLL_DISTANCE, Unit::Meter))
    }

    /// Landing rollout ending when the aircraft stops, abandoned after
    /// [`DEFAULT_ROLL_DISTANCE`] of runway.
    pub fn detailed_landing(name: impl Into<String>, vehicle: Arc<dyn VehiclePerformance>) -> Self {
        Self::new(name, PhaseDynamics::detailed_landing(vehicle))
            .with_trigger(Trigger::new(names::VELOCITY, 0.0, Unit::Knot).decreasing())
            .with_max_distance(Quantity::new(DEFAULT_ROLL_DISTANCE, Unit::Meter))
    }

    pub fn custom(name: impl Into<String>, dynamics: CustomDynamics) -> Self {
        Self::new(name, PhaseDynamics::Custom(dynamics))
    }

    /// Read the runway friction coefficient from `key` instead of the variant default.
    pub fn with_friction_key(mut self, key: impl Into<String>) -> Self {
        self.dynamics = self.dynamics.with_friction_key(key);
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: Quantity) -> Self {
        self.parameters.insert(key, value);
        self
    }

    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_trigger(mut self, trigger: Trigger) -> Self {
        self.triggers.push(trigger);
        self
    }

    /// Drop every trigger, including the variant defaults.
    pub fn clear_triggers(mut self) -> Self {
        self.triggers.clear();
        self
    }

    /// Replace the threshold of trigger `index`.
    pub fn with_trigger_threshold(
        mut self,
        index: usize,
        threshold: f64,
    ) -> Result<Self, ConfigurationError> {
        let slot = self
            .triggers
            .get_mut(index)
            .ok_or_else(|| ConfigurationError::UnknownTrigger {
                phase: self.name.clone(),
                index,
            })?;
        *slot = slot.with_threshold(threshold);
        Ok(self)
    }

    /// Override one initial value, applied after continuity.
    pub fn with_initial_value(mut self, name: impl Into<String>, value: Quantity) -> Self {
        self.initial_values.insert(name.into(), value);
        self
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// End the phase with `TriggerNeverFired` once `distance` has grown by `max_distance`.
    pub fn with_max_distance(mut self, max_distance: Quantity) -> Self {
        self.max_distance = Some(max_distance);
        self
    }

    /// Remove the distance budget; only the integrator budgets remain.
    pub fn without_max_distance(mut self) -> Self {
        self.max_distance = None;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dynamics(&self) -> &PhaseDynamics {
        &self.dynamics
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn triggers(&self) -> &[Trigger] {
        &self.triggers
    }

    pub fn initial_values(&self) -> &IndexMap<String, Quantity> {
        &self.initial_values
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    pub fn max_distance(&self) -> Option<Quantity> {
        self.max_distance
    }

    /// State layout of this phase.
    pub fn schema(&self) -> StateSchema {
        self.dynamics.schema()
    }

    /// Validate everything that can be checked without integrating.
    pub(crate) fn resolve(&self) -> Result<ResolvedPhase, ConfigurationError> {
        let schema = self.dynamics.schema();
        let eom = self
            .dynamics
            .resolve(&self.parameters)
            .map_err(ConfigurationError::from)?;

        let triggers = self
            .triggers
            .iter()
            .enumerate()
            .map(|(index, trigger)| trigger.arm(index, &schema))
            .collect::<Result<Vec<_>, _>>()?;

        let mut overrides = State::new();
        for (name, value) in &self.initial_values {
            let variable =
                schema
                    .variable(name)
                    .ok_or_else(|| ConfigurationError::UnknownVariable {
                        variable: name.clone(),
                    })?;
            if variable.dimension != value.dimension() {
                return Err(ConfigurationError::UnitMismatch {
                    variable: name.clone(),
                    unit: value.unit,
                    expected: variable.dimension,
                });
            }
            overrides.insert_quantity(name.clone(), *value);
        }

        self.settings
            .validate()
            .map_err(|err| ConfigurationError::Settings(err.to_string()))?;

        let distance_budget = match self.max_distance {
            Some(max_distance) => Some(distance_budget(&schema, max_distance)?),
            None => None,
        };

        Ok(ResolvedPhase {
            name: self.name.clone(),
            eom,
            schema,
            triggers,
            overrides,
            settings: self.settings,
            verbosity: self.verbosity,
            distance_budget,
        })
    }
}

fn distance_budget(
    schema: &StateSchema,
    max_distance: Quantity,
) -> Result<DistanceBudget, ConfigurationError> {
    let (slot, variable) =
        schema
            .lookup(names::DISTANCE)
            .ok_or_else(|| ConfigurationError::UnknownVariable {
                variable: names::DISTANCE.to_string(),
            })?;
    if variable.dimension != max_distance.dimension() {
        return Err(ConfigurationError::UnitMismatch {
            variable: names::DISTANCE.to_string(),
            unit: max_distance.unit,
            expected: variable.dimension,
        });
    }
    let max_si = max_distance.si();
    if !(max_si.is_finite() && max_si > 0.0) {
        return Err(ConfigurationError::InvalidDistanceBudget {
            max_distance: max_distance.value,
            unit: max_distance.unit,
        });
    }
    Ok(DistanceBudget { slot, max_si })
}

/// Ground covered since the phase started, checked after every accepted sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct DistanceBudget {
    pub slot: usize,
    pub max_si: f64,
}

impl DistanceBudget {
    pub fn exhausted(&self, y0: &[f64], y: &[f64]) -> bool {
        y[self.slot] - y0[self.slot] >= self.max_si
    }
}

/// Phase with parameters bound and triggers armed; immutable for the duration of a run.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedPhase {
    pub name: String,
    pub eom: Arc<dyn EquationsOfMotion>,
    pub schema: StateSchema,
    pub triggers: Vec<ArmedTrigger>,
    /// SI values overlaid after continuity.
    pub overrides: State,
    pub settings: Settings,
    pub verbosity: Verbosity,
    pub distance_budget: Option<DistanceBudget>,
}
