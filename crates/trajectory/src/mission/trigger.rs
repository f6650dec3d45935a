//! Phase-terminating conditions on a single state variable.

use std::fmt;

use flight_core::{StateSchema, Unit};
use flight_integrator::{CrossingDirection, sign_change_detected};

use super::error::ConfigurationError;

/// Tolerance used when a trigger does not set one, in the trigger's unit.
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// `state[target]` crossing `threshold` in the given direction ends the phase.
///
/// Triggers are plain values. Changing a threshold between runs builds a new trigger with
/// [`Trigger::with_threshold`]; the phase and trajectory builders do the same one level up.
#[derive(Debug, Clone, PartialEq)]
pub struct Trigger {
    pub target: String,
    pub threshold: f64,
    pub unit: Unit,
    pub direction: CrossingDirection,
    /// Accepted `|state[target] - threshold|` at the refined crossing, in `unit`.
    pub tolerance: f64,
}

impl Trigger {
    pub fn new(target: impl Into<String>, threshold: f64, unit: Unit) -> Self {
        Self {
            target: target.into(),
            threshold,
            unit,
            direction: CrossingDirection::Either,
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    /// Fire only while the target rises through the threshold.
    pub fn increasing(mut self) -> Self {
        self.direction = CrossingDirection::Increasing;
        self
    }

    /// Fire only while the target falls through the threshold.
    pub fn decreasing(mut self) -> Self {
        self.direction = CrossingDirection::Decreasing;
        self
    }

    pub fn with_direction(mut self, direction: CrossingDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Copy of this trigger with a different threshold.
    pub fn with_threshold(&self, threshold: f64) -> Self {
        Self {
            threshold,
            ..self.clone()
        }
    }

    /// Whether `value` (in `unit`) satisfies the trigger to within its tolerance.
    pub fn is_satisfied_by(&self, value: f64) -> bool {
        (value - self.threshold).abs() < self.tolerance
    }

    /// Bind the trigger to a slot of `schema`, converting threshold and tolerance to SI.
    pub(crate) fn arm(
        &self,
        index: usize,
        schema: &StateSchema,
    ) -> Result<ArmedTrigger, ConfigurationError> {
        let (slot, variable) =
            schema
                .lookup(&self.target)
                .ok_or_else(|| ConfigurationError::UnknownVariable {
                    variable: self.target.clone(),
                })?;
        if variable.dimension != self.unit.dimension() {
            return Err(ConfigurationError::UnitMismatch {
                variable: self.target.clone(),
                unit: self.unit,
                expected: variable.dimension,
            });
        }
        if !self.threshold.is_finite() {
            return Err(ConfigurationError::InvalidThreshold {
                variable: self.target.clone(),
            });
        }
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(ConfigurationError::InvalidTolerance {
                variable: self.target.clone(),
                tolerance: self.tolerance,
            });
        }
        Ok(ArmedTrigger {
            index,
            slot,
            threshold_si: self.unit.to_si(self.threshold),
            tolerance_si: self.unit.to_si(self.tolerance),
            trigger: self.clone(),
        })
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.direction {
            CrossingDirection::Increasing => "rising through",
            CrossingDirection::Decreasing => "falling through",
            CrossingDirection::Either => "crossing",
        };
        write!(f, "{} {verb} {} {}", self.target, self.threshold, self.unit)
    }
}

/// Trigger resolved against a phase's state vector.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ArmedTrigger {
    /// Declaration order within the phase.
    pub index: usize,
    slot: usize,
    threshold_si: f64,
    tolerance_si: f64,
    pub trigger: Trigger,
}

impl ArmedTrigger {
    /// `y[target] - threshold`, SI.
    pub fn residual(&self, y: &[f64]) -> f64 {
        y[self.slot] - self.threshold_si
    }

    pub fn crossed(&self, previous: f64, current: f64) -> bool {
        sign_change_detected(previous, current, self.trigger.direction)
    }

    pub fn tolerance_si(&self) -> f64 {
        self.tolerance_si
    }

    /// Residual converted into the trigger's unit.
    pub fn residual_in_units(&self, residual_si: f64) -> f64 {
        self.trigger.unit.from_si(residual_si)
    }
}
