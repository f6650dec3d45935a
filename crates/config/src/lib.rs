//! Configuration models and loaders for mission manifests.

use std::fs::File;
use std::path::{Path, PathBuf};

use flight_core::{Quantity, Unit, Verbosity};
use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;

/// One mission: aircraft, global initial state, and the ordered phases to fly.
#[derive(Debug, Deserialize, Clone)]
pub struct MissionConfig {
    pub name: String,
    #[serde(default)]
    pub aircraft: AircraftConfig,
    /// Integrator settings applied to every phase unless the phase overrides them.
    #[serde(default)]
    pub integrator: IntegratorConfig,
    #[serde(default)]
    pub verbosity: Option<Verbosity>,
    /// Initial state of the first phase.
    pub initial_state: IndexMap<String, Quantity>,
    pub phases: Vec<PhaseConfig>,
    #[serde(default)]
    pub continuity: Option<ContinuityConfig>,
    /// Variables reported from the last phase; empty reports all of them.
    #[serde(default)]
    pub final_outputs: Vec<String>,
}

/// Vehicle performance model used by the built-in dynamics.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(tag = "type")]
pub enum AircraftConfig {
    /// Twin-engine single-aisle transport preset.
    #[default]
    #[serde(rename = "single_aisle")]
    SingleAisle,
    #[serde(rename = "drag_polar")]
    DragPolar {
        name: String,
        wing_area_m2: f64,
        cd0: f64,
        induced_drag_factor: f64,
        #[serde(default = "default_ground_effect_factor")]
        ground_effect_factor: f64,
        ground_roll_lift_coefficient: f64,
        thrust_per_engine: Quantity,
        engine_count: u32,
        #[serde(default = "default_thrust_lapse_exponent")]
        thrust_lapse_exponent: f64,
        tsfc_lbm_per_lbf_hr: f64,
        #[serde(default = "default_idle_thrust_fraction")]
        idle_thrust_fraction: f64,
    },
    #[serde(other)]
    Unsupported,
}

fn default_ground_effect_factor() -> f64 {
    1.0
}

fn default_thrust_lapse_exponent() -> f64 {
    0.8
}

fn default_idle_thrust_fraction() -> f64 {
    0.05
}

/// Optional integrator overrides; unset fields keep the library defaults.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq)]
pub struct IntegratorConfig {
    #[serde(default)]
    pub rtol: Option<f64>,
    #[serde(default)]
    pub atol: Option<f64>,
    #[serde(default)]
    pub initial_step_s: Option<f64>,
    #[serde(default)]
    pub min_step_s: Option<f64>,
    #[serde(default)]
    pub max_step_s: Option<f64>,
    #[serde(default)]
    pub max_steps: Option<u64>,
    #[serde(default)]
    pub max_rejections: Option<u32>,
    #[serde(default)]
    pub max_duration_s: Option<f64>,
    #[serde(default)]
    pub event_max_iterations: Option<usize>,
}

impl IntegratorConfig {
    /// Fields set in `over` win; the rest fall back to `self`.
    pub fn overlaid(&self, over: &IntegratorConfig) -> IntegratorConfig {
        IntegratorConfig {
            rtol: over.rtol.or(self.rtol),
            atol: over.atol.or(self.atol),
            initial_step_s: over.initial_step_s.or(self.initial_step_s),
            min_step_s: over.min_step_s.or(self.min_step_s),
            max_step_s: over.max_step_s.or(self.max_step_s),
            max_steps: over.max_steps.or(self.max_steps),
            max_rejections: over.max_rejections.or(self.max_rejections),
            max_duration_s: over.max_duration_s.or(self.max_duration_s),
            event_max_iterations: over.event_max_iterations.or(self.event_max_iterations),
        }
    }
}

/// One flight segment in a manifest.
#[derive(Debug, Deserialize, Clone)]
pub struct PhaseConfig {
    pub name: String,
    pub dynamics: DynamicsConfig,
    #[serde(default)]
    pub parameters: IndexMap<String, Quantity>,
    /// Absent keeps the dynamics variant's default triggers; an empty list removes them.
    #[serde(default)]
    pub triggers: Option<Vec<TriggerConfig>>,
    #[serde(default)]
    pub initial_values: IndexMap<String, Quantity>,
    #[serde(default)]
    pub integrator: Option<IntegratorConfig>,
    #[serde(default)]
    pub verbosity: Option<Verbosity>,
    /// Ground distance budget; ground-roll variants default to 6 km.
    #[serde(default)]
    pub max_distance: Option<Quantity>,
}

/// Dynamics variant selector.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum DynamicsConfig {
    #[serde(rename = "height_energy")]
    HeightEnergy,
    #[serde(rename = "detailed_takeoff")]
    DetailedTakeoff {
        #[serde(default)]
        friction_key: Option<String>,
    },
    #[serde(rename = "detailed_landing")]
    DetailedLanding {
        #[serde(default)]
        friction_key: Option<String>,
    },
    #[serde(other)]
    Unsupported,
}

/// Phase-terminating condition in a manifest.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TriggerConfig {
    pub variable: String,
    pub value: f64,
    pub units: Unit,
    #[serde(default)]
    pub direction: DirectionConfig,
    /// In `units`; the library default applies when absent.
    #[serde(default)]
    pub tolerance: Option<f64>,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DirectionConfig {
    Increasing,
    Decreasing,
    #[default]
    Either,
}

/// Variables carried across phase boundaries.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct ContinuityConfig {
    /// Carried by every hop; absent keeps mass, distance, and altitude.
    #[serde(default)]
    pub variables: Option<Vec<String>>,
    /// Upstream name to downstream name for the default links.
    #[serde(default)]
    pub rename: IndexMap<String, String>,
    /// Replacement link lists for individual hops.
    #[serde(default)]
    pub hops: Vec<HopConfig>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct HopConfig {
    /// Name of the downstream phase.
    pub into_phase: String,
    pub links: Vec<LinkConfig>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LinkConfig {
    pub from: String,
    pub to: String,
}

/// Errors that can occur while loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read manifest: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("no mission manifests found in {0}")]
    Empty(PathBuf),
}

/// Load a single mission manifest (YAML or TOML, chosen by extension).
pub fn load_mission<P: AsRef<Path>>(path: P) -> Result<MissionConfig, ConfigError> {
    let path = path.as_ref();
    if is_toml(path) {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    } else {
        let reader = File::open(path)?;
        Ok(serde_yaml::from_reader(reader)?)
    }
}

/// Load every mission from a YAML list, a single manifest, or a directory of manifests.
pub fn load_missions<P: AsRef<Path>>(path: P) -> Result<Vec<MissionConfig>, ConfigError> {
    let path = path.as_ref();
    let missions = load_records(path)?;
    if missions.is_empty() {
        return Err(ConfigError::Empty(path.to_path_buf()));
    }
    Ok(missions)
}

/// A YAML document holding either one record or a list of them.
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

fn load_records<T, P>(path: P) -> Result<Vec<T>, ConfigError>
where
    T: for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if path.is_dir() {
        read_dir_records(path)
    } else if is_toml(path) {
        let contents = std::fs::read_to_string(path)?;
        let record: T = toml::from_str(&contents)?;
        Ok(vec![record])
    } else {
        let reader = File::open(path)?;
        Ok(match serde_yaml::from_reader(reader)? {
            OneOrMany::Many(records) => records,
            OneOrMany::One(record) => vec![record],
        })
    }
}

fn read_dir_records<T>(dir: &Path) -> Result<Vec<T>, ConfigError>
where
    T: for<'de> Deserialize<'de>,
{
    let mut records = Vec::new();
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| is_toml(path) || is_yaml(path))
        .collect();
    entries.sort();
    for path in entries {
        let contents = std::fs::read_to_string(&path)?;
        let record: T = if is_toml(&path) {
            toml::from_str(&contents)?
        } else {
            serde_yaml::from_str(&contents)?
        };
        records.push(record);
    }
    Ok(records)
}

fn is_toml(path: &Path) -> bool {
    path.extension().map(|ext| ext == "toml").unwrap_or(false)
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext == "yaml" || ext == "yml")
        .unwrap_or(false)
}
