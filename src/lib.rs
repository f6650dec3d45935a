//! Event-triggered multi-phase aircraft mission simulation.
//!
//! A mission is an ordered list of flight phases. Each phase integrates its own equations of
//! motion until one of its triggers fires, then hands its terminal state to the next phase.
//! The member crates do the work; this crate ties them together for front-ends and tests.

pub mod report;
pub mod scenario;

pub use flight_config as config;
pub use flight_core::{
    Dimension, Quantity, State, StateSchema, StateVariable, Unit, Verbosity, names,
};
pub use flight_dynamics as dynamics;
pub use flight_export as export;
pub use flight_integrator as integrator;
pub use flight_trajectory as trajectory;

/// Returns the version of the library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
