//! Static per-phase parameters (friction coefficients, controls held constant, ...).

use flight_core::{Dimension, Quantity, Unit};
use indexmap::IndexMap;
use thiserror::Error;

/// Parameter keys understood by the built-in flight segments.
pub mod keys {
    pub const MACH: &str = "mission:mach";
    pub const ALTITUDE_RATE: &str = "mission:altitude_rate";
    pub const THROTTLE: &str = "mission:throttle";
    pub const ROLLING_FRICTION_COEFFICIENT: &str = "mission:takeoff:rolling_friction_coefficient";
    pub const BRAKING_FRICTION_COEFFICIENT: &str = "mission:takeoff:braking_friction_coefficient";
}

/// Why a phase could not be configured from its parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParameterError {
    #[error("{variant} dynamics require parameter `{key}`")]
    Missing { variant: &'static str, key: String },
    #[error("parameter `{key}` is given in {unit}, expected a {expected:?} quantity")]
    Dimension {
        key: String,
        expected: Dimension,
        unit: Unit,
    },
    #[error("parameter `{key}` = {value} is out of range: {reason}")]
    OutOfRange {
        key: String,
        value: f64,
        reason: &'static str,
    },
}

/// Named parameters of one phase, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters {
    values: IndexMap<String, Quantity>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: Quantity) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Quantity) {
        self.values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Quantity> {
        self.values.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Quantity)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// SI value of a required parameter of the given dimension.
    pub fn require(
        &self,
        variant: &'static str,
        key: &str,
        dimension: Dimension,
    ) -> Result<f64, ParameterError> {
        match self.optional(key, dimension)? {
            Some(value) => Ok(value),
            None => Err(ParameterError::Missing {
                variant,
                key: key.to_string(),
            }),
        }
    }

    /// SI value of an optional parameter of the given dimension.
    pub fn optional(&self, key: &str, dimension: Dimension) -> Result<Option<f64>, ParameterError> {
        let Some(quantity) = self.values.get(key) else {
            return Ok(None);
        };
        if quantity.dimension() != dimension {
            return Err(ParameterError::Dimension {
                key: key.to_string(),
                expected: dimension,
                unit: quantity.unit,
            });
        }
        let value = quantity.si();
        if !value.is_finite() {
            return Err(ParameterError::OutOfRange {
                key: key.to_string(),
                value,
                reason: "must be finite",
            });
        }
        Ok(Some(value))
    }
}

impl<K: Into<String>> FromIterator<(K, Quantity)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (K, Quantity)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Reject `value` unless it lies in `[min, max]`.
pub(crate) fn ensure_range(
    key: &str,
    value: f64,
    min: f64,
    max: f64,
    reason: &'static str,
) -> Result<f64, ParameterError> {
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(ParameterError::OutOfRange {
            key: key.to_string(),
            value,
            reason,
        })
    }
}
