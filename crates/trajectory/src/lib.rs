//! Trajectory façade crate: phases, triggers, and the orchestrator that chains them.

pub mod mission;

pub use facade::*;
pub use flight_dynamics as dynamics;
pub use flight_integrator as integrator;

mod facade;
