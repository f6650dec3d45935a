//! Re-exported APIs for consumers of the trajectory crate.

pub use crate::mission::continuity::{Continuity, Link};
pub use crate::mission::error::{
    Budget, ClosestTrigger, ConfigurationError, Diagnostics, FailureKind, PhaseFailure, PhaseId,
    TrajectoryError,
};
pub use crate::mission::phase::{DEFAULT_ROLL_DISTANCE, Phase};
pub use crate::mission::runner::{PhaseOutcome, RunnerState};
pub use crate::mission::trigger::{DEFAULT_TOLERANCE, Trigger};
pub use crate::mission::{FinalStates, OutputError, Plan, Trajectory, TrajectoryOutcome};
pub use flight_dynamics::{PhaseDynamics, VehiclePerformance};

pub mod aircraft {
    use std::sync::Arc;

    use flight_config::AircraftConfig;
    use flight_core::Dimension;
    use flight_dynamics::performance::tsfc_from_imperial;
    use flight_dynamics::{DragPolarAircraft, VehiclePerformance};
    use thiserror::Error;

    /// Errors surfaced when converting aircraft descriptions.
    #[derive(Debug, Error)]
    pub enum AircraftError {
        #[error("aircraft type is not supported")]
        Unsupported,
        #[error("thrust must be given as a force (got {0})")]
        ThrustUnits(flight_core::Unit),
        #[error("aircraft `{name}`: {field} must be positive and finite")]
        NonPositive { name: String, field: &'static str },
    }

    /// Convert an [`AircraftConfig`] into a runtime performance model.
    pub fn from_config(
        config: &AircraftConfig,
    ) -> Result<Arc<dyn VehiclePerformance>, AircraftError> {
        let aircraft = match config {
            AircraftConfig::SingleAisle => DragPolarAircraft::single_aisle(),
            AircraftConfig::DragPolar {
                name,
                wing_area_m2,
                cd0,
                induced_drag_factor,
                ground_effect_factor,
                ground_roll_lift_coefficient,
                thrust_per_engine,
                engine_count,
                thrust_lapse_exponent,
                tsfc_lbm_per_lbf_hr,
                idle_thrust_fraction,
            } => {
                if thrust_per_engine.dimension() != Dimension::Force {
                    return Err(AircraftError::ThrustUnits(thrust_per_engine.unit));
                }
                let positive = [
                    ("wing_area_m2", *wing_area_m2),
                    ("thrust_per_engine", thrust_per_engine.value),
                    ("tsfc_lbm_per_lbf_hr", *tsfc_lbm_per_lbf_hr),
                    ("engine_count", f64::from(*engine_count)),
                ];
                if let Some((field, _)) = positive
                    .iter()
                    .find(|(_, value)| !(value.is_finite() && *value > 0.0))
                {
                    return Err(AircraftError::NonPositive {
                        name: name.clone(),
                        field: *field,
                    });
                }
                DragPolarAircraft {
                    name: name.clone(),
                    wing_area_m2: *wing_area_m2,
                    cd0: *cd0,
                    induced_drag_factor: *induced_drag_factor,
                    ground_effect_factor: *ground_effect_factor,
                    ground_roll_lift_coefficient: *ground_roll_lift_coefficient,
                    sls_thrust_per_engine_n: thrust_per_engine.si(),
                    engine_count: *engine_count,
                    thrust_lapse_exponent: *thrust_lapse_exponent,
                    tsfc_kg_per_n_s: tsfc_from_imperial(*tsfc_lbm_per_lbf_hr),
                    idle_thrust_fraction: *idle_thrust_fraction,
                }
            }
            AircraftConfig::Unsupported => return Err(AircraftError::Unsupported),
        };
        Ok(Arc::new(aircraft))
    }
}

pub mod manifest {
    use std::sync::Arc;

    use flight_config::{
        ContinuityConfig, DirectionConfig, DynamicsConfig, IntegratorConfig, MissionConfig,
        PhaseConfig, TriggerConfig,
    };
    use flight_dynamics::{Parameters, VehiclePerformance};
    use flight_integrator::{CrossingDirection, Settings, Tolerances};
    use thiserror::Error;

    use super::aircraft::{self, AircraftError};
    use crate::mission::continuity::{Continuity, Link};
    use crate::mission::phase::Phase;
    use crate::mission::trigger::Trigger;
    use crate::mission::Trajectory;

    /// Errors surfaced while turning a manifest into a runnable trajectory.
    #[derive(Debug, Error)]
    pub enum ManifestError {
        #[error(transparent)]
        Aircraft(#[from] AircraftError),
        #[error("phase `{0}` uses an unsupported dynamics type")]
        UnsupportedDynamics(String),
        #[error("continuity hop targets unknown phase `{0}`")]
        UnknownHopPhase(String),
        #[error("continuity hop into `{0}` is not a phase boundary")]
        FirstPhaseHop(String),
    }

    /// Build a [`Trajectory`] from a parsed manifest. Semantic checks are left to
    /// [`Trajectory::plan`].
    pub fn build_trajectory(config: &MissionConfig) -> Result<Trajectory, ManifestError> {
        let vehicle = aircraft::from_config(&config.aircraft)?;
        let phases = config
            .phases
            .iter()
            .map(|phase| build_phase(phase, config, &vehicle))
            .collect::<Result<Vec<_>, _>>()?;

        let mut trajectory = Trajectory::new(phases)
            .with_final_outputs(config.final_outputs.iter().cloned());
        for (name, value) in &config.initial_state {
            trajectory = trajectory.with_initial_value(name.clone(), *value);
        }
        if let Some(continuity) = &config.continuity {
            trajectory = trajectory.with_continuity(build_continuity(continuity, config)?);
        }
        Ok(trajectory)
    }

    fn build_phase(
        config: &PhaseConfig,
        mission: &MissionConfig,
        vehicle: &Arc<dyn VehiclePerformance>,
    ) -> Result<Phase, ManifestError> {
        let base = match &config.dynamics {
            DynamicsConfig::HeightEnergy => Phase::height_energy(&config.name, vehicle.clone()),
            DynamicsConfig::DetailedTakeoff { friction_key } => {
                let phase = Phase::detailed_takeoff(&config.name, vehicle.clone());
                match friction_key {
                    Some(key) => phase.with_friction_key(key.clone()),
                    None => phase,
                }
            }
            DynamicsConfig::DetailedLanding { friction_key } => {
                let phase = Phase::detailed_landing(&config.name, vehicle.clone());
                match friction_key {
                    Some(key) => phase.with_friction_key(key.clone()),
                    None => phase,
                }
            }
            DynamicsConfig::Unsupported => {
                return Err(ManifestError::UnsupportedDynamics(config.name.clone()));
            }
        };

        let integrator = match &config.integrator {
            Some(over) => mission.integrator.overlaid(over),
            None => mission.integrator,
        };

        let parameters: Parameters = config
            .parameters
            .iter()
            .map(|(key, value)| (key.clone(), *value))
            .collect();
        let mut phase = base
            .with_parameters(parameters)
            .with_settings(settings_from(&integrator));
        if let Some(verbosity) = config.verbosity.or(mission.verbosity) {
            phase = phase.with_verbosity(verbosity);
        }
        if let Some(triggers) = &config.triggers {
            phase = triggers
                .iter()
                .map(trigger_from)
                .fold(phase.clear_triggers(), Phase::with_trigger);
        }
        for (name, value) in &config.initial_values {
            phase = phase.with_initial_value(name.clone(), *value);
        }
        if let Some(max_distance) = config.max_distance {
            phase = phase.with_max_distance(max_distance);
        }
        Ok(phase)
    }

    /// Integrator settings with unset fields taken from [`Settings::default`].
    pub fn settings_from(config: &IntegratorConfig) -> Settings {
        let defaults = Settings::default();
        Settings {
            tolerances: Tolerances::new(
                config.atol.unwrap_or(defaults.tolerances.atol),
                config.rtol.unwrap_or(defaults.tolerances.rtol),
            ),
            initial_step: config.initial_step_s.unwrap_or(defaults.initial_step),
            min_step: config.min_step_s.unwrap_or(defaults.min_step),
            max_step: config.max_step_s.unwrap_or(defaults.max_step),
            max_steps: config.max_steps.unwrap_or(defaults.max_steps),
            max_rejections: config.max_rejections.unwrap_or(defaults.max_rejections),
            max_duration: config.max_duration_s.unwrap_or(defaults.max_duration),
            event_max_iterations: config
                .event_max_iterations
                .unwrap_or(defaults.event_max_iterations),
        }
    }

    fn trigger_from(config: &TriggerConfig) -> Trigger {
        let direction = match config.direction {
            DirectionConfig::Increasing => CrossingDirection::Increasing,
            DirectionConfig::Decreasing => CrossingDirection::Decreasing,
            DirectionConfig::Either => CrossingDirection::Either,
        };
        let trigger = Trigger::new(&config.variable, config.value, config.units)
            .with_direction(direction);
        match config.tolerance {
            Some(tolerance) => trigger.with_tolerance(tolerance),
            None => trigger,
        }
    }

    fn build_continuity(
        config: &ContinuityConfig,
        mission: &MissionConfig,
    ) -> Result<Continuity, ManifestError> {
        let mut continuity = match &config.variables {
            Some(variables) => Continuity::carrying(variables.iter().cloned()),
            None => Continuity::default(),
        };
        for (from, to) in &config.rename {
            continuity = continuity.with_rename(from.clone(), to.clone());
        }
        for hop in &config.hops {
            let index = mission
                .phases
                .iter()
                .position(|phase| phase.name == hop.into_phase)
                .ok_or_else(|| ManifestError::UnknownHopPhase(hop.into_phase.clone()))?;
            if index == 0 {
                return Err(ManifestError::FirstPhaseHop(hop.into_phase.clone()));
            }
            let links = hop
                .links
                .iter()
                .map(|link| Link::renamed(link.from.clone(), link.to.clone()))
                .collect();
            continuity = continuity.with_hop(index, links);
        }
        Ok(continuity)
    }
}
