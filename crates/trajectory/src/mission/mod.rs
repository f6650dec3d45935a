//! Trajectory orchestrator that chains phases through continuity hand-offs.

pub mod continuity;
pub mod error;
pub mod locator;
pub mod phase;
pub mod runner;
pub mod trigger;

use std::collections::HashSet;

use flight_core::{Quantity, State, StateSchema, Unit, UnitError};
use indexmap::IndexMap;
use thiserror::Error;
use tracing::info;

use self::continuity::Continuity;
use self::error::{ConfigurationError, TrajectoryError};
use self::phase::{Phase, ResolvedPhase};
use self::runner::{PhaseOutcome, PhaseRunner};

/// Ordered phases plus the rules that connect them.
///
/// A trajectory is a template: [`Trajectory::run`] resolves a private copy of every phase, so
/// the same value can be run repeatedly, or from several threads, without interference.
#[derive(Debug, Clone)]
pub struct Trajectory {
    phases: Vec<Phase>,
    continuity: Continuity,
    initial_state: IndexMap<String, Quantity>,
    final_outputs: Vec<String>,
    start_time: f64,
}

impl Trajectory {
    pub fn new(phases: Vec<Phase>) -> Self {
        Self {
            phases,
            continuity: Continuity::default(),
            initial_state: IndexMap::new(),
            final_outputs: Vec::new(),
            start_time: 0.0,
        }
    }

    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.phases.push(phase);
        self
    }

    pub fn with_continuity(mut self, continuity: Continuity) -> Self {
        self.continuity = continuity;
        self
    }

    /// Initial value of the first phase.
    pub fn with_initial_value(mut self, name: impl Into<String>, value: Quantity) -> Self {
        self.initial_state.insert(name.into(), value);
        self
    }

    /// Variables reported in [`FinalStates`]; by default every variable of the last phase.
    pub fn with_final_outputs<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.final_outputs = names.into_iter().map(Into::into).collect();
        self
    }

    /// Mission clock at the start of the first phase (s).
    pub fn with_start_time(mut self, start_time: f64) -> Self {
        self.start_time = start_time;
        self
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    pub fn phase(&self, name: &str) -> Option<&Phase> {
        self.phases.iter().find(|phase| phase.name() == name)
    }

    pub fn continuity(&self) -> &Continuity {
        &self.continuity
    }

    pub fn initial_state(&self) -> &IndexMap<String, Quantity> {
        &self.initial_state
    }

    /// Copy of this trajectory with trigger `index` of phase `phase` moved to `threshold`.
    /// `self` is left untouched.
    pub fn with_trigger_threshold(
        &self,
        phase: &str,
        index: usize,
        threshold: f64,
    ) -> Result<Trajectory, ConfigurationError> {
        let position = self
            .phases
            .iter()
            .position(|p| p.name() == phase)
            .ok_or_else(|| ConfigurationError::UnknownPhase(phase.to_string()))?;
        let mut copy = self.clone();
        let updated = copy.phases[position]
            .clone()
            .with_trigger_threshold(index, threshold)?;
        copy.phases[position] = updated;
        Ok(copy)
    }

    /// Resolve and validate every phase without integrating anything.
    pub fn plan(&self) -> Result<Plan, TrajectoryError> {
        if self.phases.is_empty() {
            return Err(TrajectoryError::global(ConfigurationError::EmptyTrajectory));
        }

        let mut seen = HashSet::new();
        for (index, phase) in self.phases.iter().enumerate() {
            if !seen.insert(phase.name()) {
                return Err(TrajectoryError::at(
                    index,
                    phase.name(),
                    ConfigurationError::DuplicatePhase(phase.name().to_string()),
                ));
            }
        }

        for target in self.continuity.hop_targets() {
            if target == 0 || target >= self.phases.len() {
                return Err(TrajectoryError::global(ConfigurationError::UnknownHop {
                    index: target,
                }));
            }
        }

        let resolved = self
            .phases
            .iter()
            .enumerate()
            .map(|(index, phase)| {
                phase
                    .resolve()
                    .map_err(|err| TrajectoryError::at(index, phase.name(), err))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let first = &resolved[0];
        let mut initial_state = State::new();
        for (name, value) in &self.initial_state {
            check_variable(&first.schema, name, value.unit)
                .map_err(|err| TrajectoryError::at(0, &first.name, err))?;
            initial_state.insert_quantity(name.clone(), *value);
        }
        let mut provided = initial_state.clone();
        provided.overlay(&first.overrides);
        check_coverage(&first.schema, |name| provided.contains(name))
            .map_err(|err| TrajectoryError::at(0, &first.name, err))?;

        for index in 1..resolved.len() {
            let upstream = &resolved[index - 1];
            let downstream = &resolved[index];
            self.continuity
                .validate_hop(index, &upstream.schema, &downstream.schema)
                .map_err(|err| TrajectoryError::at(index, &downstream.name, err))?;
            let links = self.continuity.links_into(index);
            check_coverage(&downstream.schema, |name| {
                downstream.overrides.contains(name) || links.iter().any(|link| link.to == name)
            })
            .map_err(|err| TrajectoryError::at(index, &downstream.name, err))?;
        }

        let last_index = resolved.len() - 1;
        let last = &resolved[last_index];
        let final_outputs = if self.final_outputs.is_empty() {
            last.schema.iter().map(|v| v.name.clone()).collect()
        } else {
            for name in &self.final_outputs {
                if !last.schema.contains(name) {
                    return Err(TrajectoryError::at(
                        last_index,
                        &last.name,
                        ConfigurationError::UnknownVariable {
                            variable: name.clone(),
                        },
                    ));
                }
            }
            self.final_outputs.clone()
        };

        Ok(Plan {
            phases: resolved,
            continuity: self.continuity.clone(),
            initial_state,
            final_outputs,
            start_time: self.start_time,
        })
    }

    /// Plan, then fly every phase in order. The first failure aborts the run.
    pub fn run(&self) -> Result<TrajectoryOutcome, TrajectoryError> {
        self.plan()?.run()
    }
}

fn check_variable(schema: &StateSchema, name: &str, unit: Unit) -> Result<(), ConfigurationError> {
    let variable = schema
        .variable(name)
        .ok_or_else(|| ConfigurationError::UnknownVariable {
            variable: name.to_string(),
        })?;
    if variable.dimension != unit.dimension() {
        return Err(ConfigurationError::UnitMismatch {
            variable: name.to_string(),
            unit,
            expected: variable.dimension,
        });
    }
    Ok(())
}

fn check_coverage(
    schema: &StateSchema,
    provided: impl Fn(&str) -> bool,
) -> Result<(), ConfigurationError> {
    match schema.iter().find(|v| !provided(&v.name)) {
        Some(missing) => Err(ConfigurationError::MissingInitialValue {
            variable: missing.name.clone(),
        }),
        None => Ok(()),
    }
}

/// Fully validated run plan. Running it cannot produce a configuration error.
#[derive(Debug, Clone)]
pub struct Plan {
    phases: Vec<ResolvedPhase>,
    continuity: Continuity,
    initial_state: State,
    final_outputs: Vec<String>,
    start_time: f64,
}

impl Plan {
    pub fn phase_names(&self) -> impl Iterator<Item = &str> {
        self.phases.iter().map(|phase| phase.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    pub fn run(&self) -> Result<TrajectoryOutcome, TrajectoryError> {
        info!(phases = self.phases.len(), "trajectory started");

        let mut outcomes: Vec<PhaseOutcome> = Vec::with_capacity(self.phases.len());
        let mut clock = self.start_time;
        for (index, phase) in self.phases.iter().enumerate() {
            let mut initial = match outcomes.last() {
                None => self.initial_state.clone(),
                Some(previous) => self.continuity.apply(index, &previous.terminal_state),
            };
            initial.overlay(&phase.overrides);

            let outcome = PhaseRunner::new(phase, index)
                .run(clock, &initial)
                .map_err(|failure| TrajectoryError::at(index, &phase.name, failure))?;
            clock = outcome.end_time;
            outcomes.push(outcome);
        }

        let (initial_state, last) = match (outcomes.first(), outcomes.last()) {
            (Some(first), Some(last)) => (first.initial_state.clone(), last),
            _ => return Err(TrajectoryError::global(ConfigurationError::EmptyTrajectory)),
        };
        let final_states = FinalStates::from_outcome(last, &self.final_outputs);
        info!(
            phases = outcomes.len(),
            end_time = final_states.time,
            "trajectory finished"
        );

        Ok(TrajectoryOutcome {
            initial_state,
            final_states,
            phases: outcomes,
        })
    }
}

/// Everything a successful run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryOutcome {
    /// Effective initial state of the first phase (SI).
    pub initial_state: State,
    pub phases: Vec<PhaseOutcome>,
    pub final_states: FinalStates,
}

impl TrajectoryOutcome {
    pub fn phase(&self, name: &str) -> Option<&PhaseOutcome> {
        self.phases.iter().find(|phase| phase.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OutputError {
    #[error("`{0}` is not a final output of this trajectory")]
    Missing(String),
    #[error(transparent)]
    Unit(#[from] UnitError),
}

/// Terminal state of the last phase, restricted to the requested outputs.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalStates {
    /// Mission clock at the final crossing (s).
    pub time: f64,
    state: State,
    units: IndexMap<String, Unit>,
}

impl FinalStates {
    fn from_outcome(outcome: &PhaseOutcome, outputs: &[String]) -> Self {
        let mut state = State::new();
        let mut units = IndexMap::new();
        for name in outputs {
            if let (Some(value), Some(variable)) = (
                outcome.terminal_state.get(name),
                outcome.schema.variable(name),
            ) {
                state.insert(name.clone(), value);
                units.insert(name.clone(), variable.display_unit);
            }
        }
        Self {
            time: outcome.end_time,
            state,
            units,
        }
    }

    /// Value of `name` converted into `unit`.
    pub fn get(&self, name: &str, unit: Unit) -> Result<f64, OutputError> {
        match (self.state.get(name), self.units.get(name)) {
            (Some(si), Some(display)) => Ok(display.si().convert(si, unit)?),
            _ => Err(OutputError::Missing(name.to_string())),
        }
    }

    /// SI values.
    pub fn state(&self) -> &State {
        &self.state
    }

    /// Every output in its display unit.
    pub fn quantities(&self) -> impl Iterator<Item = (&str, Quantity)> {
        self.units.iter().filter_map(|(name, unit)| {
            self.state
                .get(name)
                .map(|si| (name.as_str(), Quantity::new(unit.from_si(si), *unit)))
        })
    }

    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }
}
