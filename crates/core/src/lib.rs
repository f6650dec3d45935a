//! Core units, constants, and shared primitives for the flight mission workspace.

pub mod state;
pub mod units;

pub use state::{State, StateSchema, StateVariable};
pub use units::{Dimension, Quantity, Unit, UnitError};

/// Physical constants expressed in SI units (unless stated otherwise).
pub mod constants {
    /// Standard gravity at Earth's surface (m/s²).
    pub const G0: f64 = 9.80665;
    /// Kilograms per pound-mass.
    pub const KG_PER_LBM: f64 = 0.453_592_37;
    /// Metres per international foot.
    pub const M_PER_FT: f64 = 0.3048;
    /// Metres per nautical mile.
    pub const M_PER_NM: f64 = 1_852.0;
    /// Newtons per pound-force.
    pub const N_PER_LBF: f64 = 4.448_221_615_260_5;
    /// Seconds per hour.
    pub const SECONDS_PER_HOUR: f64 = 3_600.0;
}

/// Canonical names of the continuous state variables shared by the built-in flight segments.
pub mod names {
    pub const MASS: &str = "mass";
    pub const DISTANCE: &str = "distance";
    pub const ALTITUDE: &str = "altitude";
    pub const VELOCITY: &str = "velocity";
}

/// How much a phase reports about its own progress.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, serde::Deserialize, serde::Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    /// Failures only.
    Quiet,
    /// Phase start and termination.
    #[default]
    Brief,
    /// Adds trigger crossings and locator results.
    Verbose,
    /// Adds every accepted integration sample.
    Debug,
}
