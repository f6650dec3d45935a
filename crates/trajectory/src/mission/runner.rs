//! Phase Runner: integrate, watch triggers, refine the first crossing, stop.

use std::fmt;

use flight_core::{State, StateSchema, Verbosity};
use flight_dynamics::EquationsOfMotion;
use flight_integrator::{IntegrationError, IntegrationRecord, OdeSystem, Sample};
use tracing::{debug, warn};

use super::error::{Budget, ClosestTrigger, ConfigurationError, Diagnostics, PhaseFailure};
use super::locator::{Crossing, EventLocator};
use super::phase::{Phase, ResolvedPhase};
use super::trigger::{ArmedTrigger, Trigger};

/// Relative window inside which two refined crossings count as simultaneous.
const TIE_WINDOW: f64 = 1e-9;

/// Lifecycle of one phase run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunnerState {
    Pending,
    Integrating,
    Locating,
    Terminated,
    Failed,
}

impl RunnerState {
    /// Lowest phase verbosity at which entering this state is logged.
    /// Crossing refinement is Verbose detail; start and end of a phase are Brief.
    pub fn log_threshold(self) -> Verbosity {
        match self {
            RunnerState::Locating => Verbosity::Verbose,
            _ => Verbosity::Brief,
        }
    }
}

impl fmt::Display for RunnerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RunnerState::Pending => "pending",
            RunnerState::Integrating => "integrating",
            RunnerState::Locating => "locating",
            RunnerState::Terminated => "terminated",
            RunnerState::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Result of a terminated phase. Only the end points survive; the samples are discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseOutcome {
    pub name: String,
    /// Declaration index of the trigger that ended the phase.
    pub trigger_index: usize,
    pub trigger: Trigger,
    pub start_time: f64,
    pub end_time: f64,
    pub schema: StateSchema,
    /// Effective initial state after continuity and overrides (SI).
    pub initial_state: State,
    /// State at the refined crossing (SI).
    pub terminal_state: State,
    pub accepted_steps: u64,
    pub rejected_steps: u64,
    /// Root-finding iterations spent on every crossing detected in the final step.
    pub locator_iterations: usize,
}

impl PhaseOutcome {
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// Adapter from bound equations of motion to the integrator's system trait.
#[derive(Debug)]
pub(crate) struct PhaseSystem<'a> {
    eom: &'a dyn EquationsOfMotion,
}

impl OdeSystem for PhaseSystem<'_> {
    fn dimension(&self) -> usize {
        self.eom.schema().len()
    }

    fn rhs(&self, t: f64, y: &[f64], dydt: &mut [f64]) {
        self.eom.derivatives(t, y, dydt);
    }

    fn check_domain(&self, t: f64, y: &[f64]) -> Result<(), String> {
        self.eom.check_domain(t, y).map_err(|err| err.to_string())
    }
}

pub(crate) struct PhaseRunner<'a> {
    phase: &'a ResolvedPhase,
    index: usize,
    state: RunnerState,
}

impl<'a> PhaseRunner<'a> {
    pub fn new(phase: &'a ResolvedPhase, index: usize) -> Self {
        Self {
            phase,
            index,
            state: RunnerState::Pending,
        }
    }

    fn transition(&mut self, next: RunnerState, t: f64) {
        if self.phase.verbosity >= next.log_threshold() {
            debug!(
                phase = %self.phase.name,
                index = self.index,
                from = %self.state,
                to = %next,
                t,
                "phase state change"
            );
        }
        self.state = next;
    }

    fn failed(&mut self, t: f64, failure: PhaseFailure) -> PhaseFailure {
        warn!(phase = %self.phase.name, index = self.index, t, %failure, "phase failed");
        self.transition(RunnerState::Failed, t);
        failure
    }

    fn diagnostics(&self, t: f64, y: &[f64]) -> Diagnostics {
        let closest_trigger = self
            .phase
            .triggers
            .iter()
            .map(|trigger| (trigger, trigger.residual_in_units(trigger.residual(y))))
            .min_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
            .map(|(trigger, residual)| ClosestTrigger {
                index: trigger.index,
                trigger: trigger.trigger.clone(),
                residual,
            });
        Diagnostics {
            time: t,
            state: self.phase.schema.to_state(y),
            closest_trigger,
        }
    }

    /// Run the phase from `initial` (continuity and overrides already applied) at `t0`.
    pub fn run(&mut self, t0: f64, initial: &State) -> Result<PhaseOutcome, PhaseFailure> {
        let phase = self.phase;
        let verbose = phase.verbosity >= Verbosity::Verbose;

        let y0 = match phase.schema.to_vector(initial) {
            Ok(y0) => y0,
            Err(variable) => {
                let failure = ConfigurationError::MissingInitialValue { variable }.into();
                return Err(self.failed(t0, failure));
            }
        };
        let initial_state = phase.schema.to_state(&y0);

        let system = PhaseSystem {
            eom: phase.eom.as_ref(),
        };
        let mut record = match IntegrationRecord::new(&system, t0, y0.clone(), phase.settings) {
            Ok(record) => record,
            Err(err) => {
                let failure = ConfigurationError::InvalidInitialState {
                    message: err.to_string(),
                }
                .into();
                return Err(self.failed(t0, failure));
            }
        };
        let mut locator = EventLocator::new(
            &system,
            phase.settings.tolerances,
            phase.settings.event_max_iterations,
        );

        self.transition(RunnerState::Integrating, t0);

        let mut previous: Option<(Sample, Vec<f64>)> = None;
        while let Some(item) = record.next() {
            let sample = match item {
                Ok(sample) => sample,
                Err(err) => {
                    let (t, y) = previous
                        .as_ref()
                        .map(|(s, _)| (s.t, s.y.as_slice()))
                        .unwrap_or((t0, y0.as_slice()));
                    let diagnostics = self.diagnostics(t, y);
                    let failure = match err {
                        IntegrationError::MaxStepsExceeded { max_steps, .. } => {
                            PhaseFailure::TriggerNeverFired {
                                budget: Budget::Steps { max_steps },
                                diagnostics,
                            }
                        }
                        source => PhaseFailure::IntegrationDivergence {
                            source,
                            diagnostics,
                        },
                    };
                    return Err(self.failed(t, failure));
                }
            };

            let residuals: Vec<f64> = phase
                .triggers
                .iter()
                .map(|trigger| trigger.residual(&sample.y))
                .collect();

            if let Some((before, before_residuals)) = &previous {
                if phase.verbosity >= Verbosity::Debug {
                    debug!(phase = %phase.name, t = sample.t, y = ?sample.y, "sample accepted");
                }

                let crossed: Vec<&ArmedTrigger> = phase
                    .triggers
                    .iter()
                    .zip(before_residuals.iter().zip(&residuals))
                    .filter(|(trigger, (g0, g1))| trigger.crossed(**g0, **g1))
                    .map(|(trigger, _)| trigger)
                    .collect();

                if !crossed.is_empty() {
                    self.transition(RunnerState::Locating, sample.t);
                    let mut winner: Option<Crossing> = None;
                    let mut locator_iterations = 0;
                    for trigger in crossed {
                        if verbose {
                            debug!(
                                phase = %phase.name,
                                trigger = %trigger.trigger,
                                t_before = before.t,
                                t_after = sample.t,
                                "crossing detected"
                            );
                        }
                        let crossing = match locator.locate(trigger, before, &sample) {
                            Ok(crossing) => crossing,
                            Err(source) => {
                                let diagnostics = self.diagnostics(before.t, &before.y);
                                let failure = PhaseFailure::TriggerResolution {
                                    index: trigger.index,
                                    trigger: trigger.trigger.clone(),
                                    source,
                                    diagnostics,
                                };
                                return Err(self.failed(before.t, failure));
                            }
                        };
                        locator_iterations += crossing.iterations;
                        if verbose {
                            debug!(
                                phase = %phase.name,
                                trigger = %trigger.trigger,
                                t = crossing.t,
                                iterations = crossing.iterations,
                                "crossing refined"
                            );
                        }
                        winner = Some(match winner.take() {
                            Some(current) if !precedes(&crossing, &current) => current,
                            _ => crossing,
                        });
                    }

                    if let Some(crossing) = winner {
                        let stats = record.stats();
                        let trigger = phase.triggers[crossing.index].trigger.clone();
                        self.transition(RunnerState::Terminated, crossing.t);
                        return Ok(PhaseOutcome {
                            name: phase.name.clone(),
                            trigger_index: crossing.index,
                            trigger,
                            start_time: t0,
                            end_time: crossing.t,
                            schema: phase.schema.clone(),
                            initial_state,
                            terminal_state: phase.schema.to_state(&crossing.y),
                            accepted_steps: stats.accepted_steps,
                            rejected_steps: stats.rejected_steps,
                            locator_iterations,
                        });
                    }
                }
            }

            if let Some(budget) = &phase.distance_budget {
                if budget.exhausted(&y0, &sample.y) {
                    let failure = PhaseFailure::TriggerNeverFired {
                        budget: Budget::Distance {
                            max_distance: budget.max_si,
                        },
                        diagnostics: self.diagnostics(sample.t, &sample.y),
                    };
                    return Err(self.failed(sample.t, failure));
                }
            }

            previous = Some((sample, residuals));
        }

        let (t, y) = previous
            .as_ref()
            .map(|(s, _)| (s.t, s.y.as_slice()))
            .unwrap_or((t0, y0.as_slice()));
        let failure = PhaseFailure::TriggerNeverFired {
            budget: Budget::Duration {
                max_duration: phase.settings.max_duration,
            },
            diagnostics: self.diagnostics(t, y),
        };
        Err(self.failed(t, failure))
    }
}

/// `a` happened strictly before `b`, outside the tie window. Ties keep declaration order.
fn precedes(a: &Crossing, b: &Crossing) -> bool {
    a.t < b.t - TIE_WINDOW * b.t.abs().max(1.0)
}

impl Phase {
    /// Integrate this phase on its own, starting from `initial` at `t0`.
    ///
    /// The phase's initial-value overrides are applied on top of `initial`.
    pub fn run(&self, t0: f64, initial: &State) -> Result<PhaseOutcome, PhaseFailure> {
        let resolved = self.resolve()?;
        let mut state = initial.clone();
        state.overlay(&resolved.overrides);
        PhaseRunner::new(&resolved, 0).run(t0, &state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locating_is_logged_only_when_verbose() {
        assert_eq!(RunnerState::Locating.log_threshold(), Verbosity::Verbose);
        assert!(Verbosity::Brief < RunnerState::Locating.log_threshold());
        for state in [
            RunnerState::Integrating,
            RunnerState::Terminated,
            RunnerState::Failed,
        ] {
            assert_eq!(state.log_threshold(), Verbosity::Brief);
        }
    }
}
