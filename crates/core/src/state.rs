//! Named continuous state and the schemas that give it a dense vector layout.

use indexmap::IndexMap;
use serde::Serialize;

use crate::units::{Dimension, Quantity, Unit, UnitError};

/// Ordered mapping of state variable names to SI values.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct State {
    values: IndexMap<String, f64>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value already expressed in SI units.
    pub fn insert(&mut self, name: impl Into<String>, si_value: f64) {
        self.values.insert(name.into(), si_value);
    }

    /// Insert or replace a value given in any unit.
    pub fn insert_quantity(&mut self, name: impl Into<String>, quantity: Quantity) {
        self.insert(name, quantity.si());
    }

    /// SI value of `name`.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// Value of `name` converted into `unit`. `None` when the variable is absent.
    pub fn get_in(&self, name: &str, unit: Unit) -> Option<Result<f64, UnitError>> {
        let si = self.get(name)?;
        Some(unit.si().convert(si, unit))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Overlay every entry of `other` on top of this state.
    pub fn overlay(&mut self, other: &State) {
        for (name, value) in other.iter() {
            self.insert(name, value);
        }
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for State {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Declaration of one continuous state variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateVariable {
    pub name: String,
    pub dimension: Dimension,
    /// Unit used when reporting the variable back to callers.
    pub display_unit: Unit,
}

impl StateVariable {
    pub fn new(name: impl Into<String>, display_unit: Unit) -> Self {
        Self {
            name: name.into(),
            dimension: display_unit.dimension(),
            display_unit,
        }
    }
}

/// Ordered list of state variables; position in the list is the index in the integrator vector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateSchema {
    variables: Vec<StateVariable>,
}

impl StateSchema {
    pub fn new(variables: Vec<StateVariable>) -> Self {
        Self { variables }
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StateVariable> {
        self.variables.iter()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.variables.iter().position(|v| v.name == name)
    }

    pub fn variable(&self, name: &str) -> Option<&StateVariable> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Position and declaration of `name`.
    pub fn lookup(&self, name: &str) -> Option<(usize, &StateVariable)> {
        self.variables.iter().enumerate().find(|(_, v)| v.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    /// Dense SI vector in schema order. Returns the first missing variable name on failure.
    pub fn to_vector(&self, state: &State) -> Result<Vec<f64>, String> {
        self.variables
            .iter()
            .map(|v| state.get(&v.name).ok_or_else(|| v.name.clone()))
            .collect()
    }

    /// Named state from a dense SI vector laid out in schema order.
    pub fn to_state(&self, values: &[f64]) -> State {
        self.variables
            .iter()
            .zip(values)
            .map(|(v, value)| (v.name.clone(), *value))
            .collect()
    }
}
