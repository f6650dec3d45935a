//! Adaptive Runge–Kutta integration and bracketed root finding for phase propagation.

pub mod coefficients;
pub mod root;
pub mod solver;

pub use root::{BrentSolver, CrossingDirection, Root, RootError, sign_change_detected};
pub use solver::{
    DormandPrince, IntegrationError, IntegrationRecord, OdeSystem, Sample, Settings, Stats,
    StepController, StepResult, Tolerances,
};
