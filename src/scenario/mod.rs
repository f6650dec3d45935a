//! Mission scenarios loaded from manifests, with command-line style trigger overrides.

use std::path::Path;
use std::str::FromStr;

use flight_config::{ConfigError, MissionConfig, load_missions};
use flight_trajectory::manifest::{ManifestError, build_trajectory};
use flight_trajectory::{ConfigurationError, Trajectory};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error(transparent)]
    Override(#[from] ConfigurationError),
    #[error("manifest {0} holds more than one mission")]
    Ambiguous(String),
}

/// Named trajectory ready to run.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: String,
    pub trajectory: Trajectory,
}

impl Scenario {
    /// Load the single mission described by `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        let mut scenarios = load_scenarios(path)?;
        if scenarios.len() > 1 {
            return Err(ScenarioError::Ambiguous(path.display().to_string()));
        }
        scenarios
            .pop()
            .ok_or_else(|| ConfigError::Empty(path.to_path_buf()).into())
    }

    pub fn from_config(config: &MissionConfig) -> Result<Self, ScenarioError> {
        let trajectory = build_trajectory(config)?;
        debug!(
            mission = %config.name,
            phases = trajectory.phases().len(),
            "scenario built"
        );
        Ok(Self {
            name: config.name.clone(),
            trajectory,
        })
    }

    /// Fresh scenario with every override applied; `self` is untouched.
    pub fn with_overrides(&self, overrides: &[TriggerOverride]) -> Result<Self, ScenarioError> {
        let trajectory = overrides
            .iter()
            .try_fold(self.trajectory.clone(), |trajectory, o| {
                trajectory.with_trigger_threshold(&o.phase, o.index, o.value)
            })?;
        Ok(Self {
            name: self.name.clone(),
            trajectory,
        })
    }
}

/// Every mission found at `path` (file or directory).
pub fn load_scenarios<P: AsRef<Path>>(path: P) -> Result<Vec<Scenario>, ScenarioError> {
    load_missions(path)?
        .iter()
        .map(Scenario::from_config)
        .collect()
}

/// Replacement threshold for one trigger, written `PHASE[:INDEX]=VALUE`.
///
/// The value is in the trigger's own unit; the index defaults to the first trigger.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerOverride {
    pub phase: String,
    pub index: usize,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid trigger override `{input}`: {reason}")]
pub struct OverrideParseError {
    pub input: String,
    pub reason: &'static str,
}

impl FromStr for TriggerOverride {
    type Err = OverrideParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let fail = |reason| OverrideParseError {
            input: input.to_string(),
            reason,
        };
        let (target, value) = input
            .split_once('=')
            .ok_or_else(|| fail("expected PHASE[:INDEX]=VALUE"))?;
        let value: f64 = value
            .trim()
            .parse()
            .map_err(|_| fail("value is not a number"))?;
        if !value.is_finite() {
            return Err(fail("value must be finite"));
        }
        let (phase, index) = match target.rsplit_once(':') {
            Some((phase, index)) => {
                let index = index
                    .trim()
                    .parse()
                    .map_err(|_| fail("trigger index is not an unsigned integer"))?;
                (phase, index)
            }
            None => (target, 0),
        };
        let phase = phase.trim();
        if phase.is_empty() {
            return Err(fail("phase name is empty"));
        }
        Ok(Self {
            phase: phase.to_string(),
            index,
            value,
        })
    }
}
