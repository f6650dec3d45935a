//! Failure taxonomy of a trajectory run.

use std::fmt;

use flight_core::{Dimension, State, Unit};
use flight_dynamics::ParameterError;
use flight_integrator::{IntegrationError, RootError};
use thiserror::Error;

use super::trigger::Trigger;

/// Invalid phase or trajectory definition, always detected before any phase integrates.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("trajectory has no phases")]
    EmptyTrajectory,
    #[error("phase name `{0}` is used more than once")]
    DuplicatePhase(String),
    #[error("no phase named `{0}`")]
    UnknownPhase(String),
    #[error("phase `{phase}` has no trigger #{index}")]
    UnknownTrigger { phase: String, index: usize },
    #[error("`{variable}` is not a state variable of this phase")]
    UnknownVariable { variable: String },
    #[error("`{variable}` is a {expected:?} quantity and cannot be given in {unit}")]
    UnitMismatch {
        variable: String,
        unit: Unit,
        expected: Dimension,
    },
    #[error("trigger on `{variable}` needs a finite, positive tolerance (got {tolerance})")]
    InvalidTolerance { variable: String, tolerance: f64 },
    #[error("trigger on `{variable}` has a non-finite threshold")]
    InvalidThreshold { variable: String },
    #[error("initial state of this phase is missing `{variable}`")]
    MissingInitialValue { variable: String },
    #[error("invalid initial state: {message}")]
    InvalidInitialState { message: String },
    #[error("continuity carries `{variable}`, which the upstream phase does not produce")]
    ContinuityUpstream { variable: String },
    #[error("continuity writes `{variable}`, which this phase does not integrate")]
    ContinuityDownstream { variable: String },
    #[error("continuity links `{from}` to `{to}` across different dimensions")]
    ContinuityDimension { from: String, to: String },
    #[error("continuity hop into phase #{index} does not exist")]
    UnknownHop { index: usize },
    #[error(transparent)]
    Parameter(#[from] ParameterError),
    #[error("{0}")]
    Settings(String),
    #[error("distance budget must be finite and positive (got {max_distance} {unit})")]
    InvalidDistanceBudget { max_distance: f64, unit: Unit },
    #[error("continuity hop into phase #{index} writes `{variable}` more than once")]
    DuplicateLinkTarget { index: usize, variable: String },
}

/// Trigger nearest to firing when a phase failed.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosestTrigger {
    /// Declaration index within the phase.
    pub index: usize,
    pub trigger: Trigger,
    /// `state[target] - threshold` in the trigger's unit.
    pub residual: f64,
}

/// Last valid point of a failed phase.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostics {
    pub time: f64,
    pub state: State,
    pub closest_trigger: Option<ClosestTrigger>,
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "last valid state at t = {:.6} s", self.time)?;
        if let Some(closest) = &self.closest_trigger {
            write!(
                f,
                "; closest trigger #{} ({}) was {} {} away",
                closest.index,
                closest.trigger,
                closest.residual.abs(),
                closest.trigger.unit
            )?;
        }
        Ok(())
    }
}

/// Budget that ran out before any trigger fired.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Budget {
    Duration { max_duration: f64 },
    Steps { max_steps: u64 },
    /// Metres of `distance` gained since the phase started.
    Distance { max_distance: f64 },
}

impl fmt::Display for Budget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Budget::Duration { max_duration } => write!(f, "duration budget of {max_duration} s"),
            Budget::Steps { max_steps } => write!(f, "step budget of {max_steps} attempts"),
            Budget::Distance { max_distance } => {
                write!(f, "distance budget of {max_distance} m")
            }
        }
    }
}

/// Plain failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Configuration,
    IntegrationDivergence,
    TriggerResolution,
    TriggerNeverFired,
}

/// Why a single phase failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PhaseFailure {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("integration diverged: {source}; {diagnostics}")]
    IntegrationDivergence {
        source: IntegrationError,
        diagnostics: Diagnostics,
    },
    #[error("trigger #{index} ({trigger}) could not be resolved: {source}; {diagnostics}")]
    TriggerResolution {
        index: usize,
        trigger: Trigger,
        source: RootError,
        diagnostics: Diagnostics,
    },
    #[error("no trigger fired within the {budget}; {diagnostics}")]
    TriggerNeverFired {
        budget: Budget,
        diagnostics: Diagnostics,
    },
}

impl PhaseFailure {
    pub fn kind(&self) -> FailureKind {
        match self {
            PhaseFailure::Configuration(_) => FailureKind::Configuration,
            PhaseFailure::IntegrationDivergence { .. } => FailureKind::IntegrationDivergence,
            PhaseFailure::TriggerResolution { .. } => FailureKind::TriggerResolution,
            PhaseFailure::TriggerNeverFired { .. } => FailureKind::TriggerNeverFired,
        }
    }

    /// Time and state at failure; `None` for configuration errors.
    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        match self {
            PhaseFailure::Configuration(_) => None,
            PhaseFailure::IntegrationDivergence { diagnostics, .. }
            | PhaseFailure::TriggerResolution { diagnostics, .. }
            | PhaseFailure::TriggerNeverFired { diagnostics, .. } => Some(diagnostics),
        }
    }
}

/// Position of a phase in the trajectory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseId {
    pub index: usize,
    pub name: String,
}

impl fmt::Display for PhaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "phase #{} `{}`", self.index, self.name)
    }
}

/// First failure of a run, tagged with the phase that caused it.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{}{failure}", phase_prefix(.phase))]
pub struct TrajectoryError {
    /// `None` for trajectory-wide configuration errors.
    pub phase: Option<PhaseId>,
    #[source]
    pub failure: PhaseFailure,
}

fn phase_prefix(phase: &Option<PhaseId>) -> String {
    match phase {
        Some(id) => format!("{id}: "),
        None => String::new(),
    }
}

impl TrajectoryError {
    pub(crate) fn at(index: usize, name: &str, failure: impl Into<PhaseFailure>) -> Self {
        Self {
            phase: Some(PhaseId {
                index,
                name: name.to_string(),
            }),
            failure: failure.into(),
        }
    }

    pub(crate) fn global(failure: impl Into<PhaseFailure>) -> Self {
        Self {
            phase: None,
            failure: failure.into(),
        }
    }

    pub fn kind(&self) -> FailureKind {
        self.failure.kind()
    }

    pub fn phase_name(&self) -> Option<&str> {
        self.phase.as_ref().map(|id| id.name.as_str())
    }

    pub fn phase_index(&self) -> Option<usize> {
        self.phase.as_ref().map(|id| id.index)
    }

    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        self.failure.diagnostics()
    }
}
