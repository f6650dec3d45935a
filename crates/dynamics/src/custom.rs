//! Caller-supplied equations of motion.
//!
//! Physics providers outside this workspace plug in a plain closure together with the state
//! schema it works on and the parameters it needs. Parameter presence and dimension are checked
//! at resolution time, the same way the built-in variants check theirs.

use std::fmt;
use std::sync::Arc;

use flight_core::{Dimension, StateSchema};

use crate::params::{ParameterError, Parameters};
use crate::EquationsOfMotion;

const VARIANT: &str = "custom";

/// Signature of a custom right-hand side: `(t, y, parameters, dydt)`, all values SI.
pub type DerivativeFn = dyn Fn(f64, &[f64], &Parameters, &mut [f64]) + Send + Sync;

/// Descriptor of a custom dynamics model.
#[derive(Clone)]
pub struct CustomDynamics {
    name: String,
    schema: StateSchema,
    required: Vec<(String, Dimension)>,
    rhs: Arc<DerivativeFn>,
}

impl CustomDynamics {
    pub fn new<F>(name: impl Into<String>, schema: StateSchema, rhs: F) -> Self
    where
        F: Fn(f64, &[f64], &Parameters, &mut [f64]) + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            schema,
            required: Vec::new(),
            rhs: Arc::new(rhs),
        }
    }

    /// Declare a parameter that must be present with the given dimension.
    pub fn requires(mut self, key: impl Into<String>, dimension: Dimension) -> Self {
        self.required.push((key.into(), dimension));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &StateSchema {
        &self.schema
    }

    pub(crate) fn resolve(&self, parameters: &Parameters) -> Result<CustomEom, ParameterError> {
        for (key, dimension) in &self.required {
            parameters.require(VARIANT, key, *dimension)?;
        }
        Ok(CustomEom {
            name: self.name.clone(),
            schema: self.schema.clone(),
            parameters: parameters.clone(),
            rhs: Arc::clone(&self.rhs),
        })
    }
}

impl fmt::Debug for CustomDynamics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomDynamics")
            .field("name", &self.name)
            .field("schema", &self.schema)
            .field("required", &self.required)
            .finish_non_exhaustive()
    }
}

/// Custom dynamics with their parameters bound.
pub struct CustomEom {
    name: String,
    schema: StateSchema,
    parameters: Parameters,
    rhs: Arc<DerivativeFn>,
}

impl fmt::Debug for CustomEom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomEom")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

impl EquationsOfMotion for CustomEom {
    fn schema(&self) -> &StateSchema {
        &self.schema
    }

    fn derivatives(&self, t: f64, y: &[f64], dydt: &mut [f64]) {
        (self.rhs)(t, y, &self.parameters, dydt);
    }
}
