//! Dormand–Prince 5(4) integrator
//!
//! A 7-stage embedded RK5(4) pair with I-controller step adaptation, plus the lazy
//! [`IntegrationRecord`] that turns it into a stream of accepted samples.

use thiserror::Error;
use tracing::trace;

use crate::coefficients::{A, B, B_ERR, C, EMBEDDED_ORDER, STAGES};

/// System of ordinary differential equations `dy/dt = f(t, y)` of runtime dimension.
pub trait OdeSystem {
    /// Length of the state vector.
    fn dimension(&self) -> usize;

    /// Evaluate the right-hand side into `dydt`.
    fn rhs(&self, t: f64, y: &[f64], dydt: &mut [f64]);

    /// Reject an accepted state that left the system's valid region.
    fn check_domain(&self, _t: f64, _y: &[f64]) -> Result<(), String> {
        Ok(())
    }
}

/// Outcome of a single attempted step.
#[derive(Debug, Clone)]
pub struct StepResult {
    /// State at `t` (fifth-order solution).
    pub y: Vec<f64>,
    pub t: f64,
    /// Normalized error estimate; the step is accepted when it is ≤ 1.
    pub error: f64,
    /// Suggested magnitude of the next step.
    pub h_next: f64,
    pub accepted: bool,
}

/// Integration statistics for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub fn_evals: u64,
    pub accepted_steps: u64,
    pub rejected_steps: u64,
}

/// Step-size I-controller: `h_new = safety · h · error^(-1/(q+1))`, `q` the embedded order.
#[derive(Debug, Clone, Copy)]
pub struct StepController {
    pub safety: f64,
    pub max_factor: f64,
    pub min_factor: f64,
    exponent: f64,
}

impl Default for StepController {
    fn default() -> Self {
        Self {
            safety: 0.9,
            max_factor: 5.0,
            min_factor: 0.2,
            exponent: 1.0 / f64::from(EMBEDDED_ORDER + 1),
        }
    }
}

impl StepController {
    pub fn compute_factor(&self, error: f64) -> f64 {
        if !error.is_finite() {
            return self.min_factor;
        }
        if error == 0.0 {
            return self.max_factor;
        }
        (self.safety * error.powf(-self.exponent)).clamp(self.min_factor, self.max_factor)
    }
}

/// Mixed absolute/relative error tolerance, uniform across components.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    pub atol: f64,
    pub rtol: f64,
}

impl Tolerances {
    pub fn new(atol: f64, rtol: f64) -> Self {
        Self { atol, rtol }
    }
}

/// Limits and budgets for one phase's integration. All times in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settings {
    pub tolerances: Tolerances,
    pub initial_step: f64,
    pub min_step: f64,
    pub max_step: f64,
    /// Step attempts (accepted plus rejected) before the integration is abandoned.
    pub max_steps: u64,
    /// Consecutive rejections tolerated for a single step.
    pub max_rejections: u32,
    /// Simulated time after which the record ends.
    pub max_duration: f64,
    /// Root-finding iterations allowed when refining a crossing.
    pub event_max_iterations: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tolerances: Tolerances::new(1e-9, 1e-9),
            initial_step: 1.0,
            min_step: 1e-9,
            max_step: 60.0,
            max_steps: 200_000,
            max_rejections: 24,
            max_duration: 36_000.0,
            event_max_iterations: 100,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), IntegrationError> {
        let invalid = |message: &str| {
            Err(IntegrationError::InvalidSettings {
                message: message.to_string(),
            })
        };
        let Tolerances { atol, rtol } = self.tolerances;
        if !atol.is_finite() || atol <= 0.0 {
            return invalid("atol must be positive and finite");
        }
        if !rtol.is_finite() || rtol < 0.0 {
            return invalid("rtol must be non-negative and finite");
        }
        if !self.min_step.is_finite() || self.min_step <= 0.0 {
            return invalid("min_step must be positive and finite");
        }
        if !self.max_step.is_finite() || self.max_step < self.min_step {
            return invalid("max_step must be finite and at least min_step");
        }
        if !self.initial_step.is_finite() || self.initial_step <= 0.0 {
            return invalid("initial_step must be positive and finite");
        }
        if !self.max_duration.is_finite() || self.max_duration <= 0.0 {
            return invalid("max_duration must be positive and finite");
        }
        if self.max_steps == 0 {
            return invalid("max_steps must be at least 1");
        }
        if self.event_max_iterations == 0 {
            return invalid("event_max_iterations must be at least 1");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum IntegrationError {
    #[error("invalid integrator settings: {message}")]
    InvalidSettings { message: String },
    #[error("invalid initial state: {message}")]
    InvalidInitialState { message: String },
    #[error("step size {h} fell below the minimum at t = {t}")]
    StepSizeTooSmall { t: f64, h: f64 },
    #[error("{rejections} consecutive step rejections at t = {t}")]
    TooManyRejections { t: f64, rejections: u32 },
    #[error("state became non-finite at t = {t}")]
    NonFiniteState { t: f64 },
    #[error("state left the valid domain at t = {t}: {message}")]
    DomainViolation { t: f64, message: String },
    #[error("step budget of {max_steps} attempts exhausted at t = {t}")]
    MaxStepsExceeded { t: f64, max_steps: u64 },
}

/// Dormand–Prince 5(4) stepper with preallocated stage storage.
#[derive(Debug, Clone)]
pub struct DormandPrince {
    tol: Tolerances,
    controller: StepController,
    pub h_min: f64,
    pub h_max: f64,
    k: [Vec<f64>; STAGES],
    scratch: Vec<f64>,
    pub stats: Stats,
}

impl DormandPrince {
    pub fn new(tol: Tolerances, dimension: usize) -> Self {
        Self {
            tol,
            controller: StepController::default(),
            h_min: 1e-12,
            h_max: f64::INFINITY,
            k: std::array::from_fn(|_| vec![0.0; dimension]),
            scratch: vec![0.0; dimension],
            stats: Stats::default(),
        }
    }

    pub fn set_step_limits(&mut self, h_min: f64, h_max: f64) {
        self.h_min = h_min;
        self.h_max = h_max;
    }

    /// Attempt one step of size `h` from `(t, y)`.
    pub fn step<S: OdeSystem + ?Sized>(&mut self, sys: &S, t: f64, y: &[f64], h: f64) -> StepResult {
        self.compute_stages(sys, t, y, h);
        let y_new = self.compute_solution(y, h);
        let error = self.compute_error(y, &y_new, h);
        let accepted = error <= 1.0;

        let factor = self.controller.compute_factor(error);
        let h_next = (h.abs() * factor).clamp(self.h_min, self.h_max);

        self.stats.fn_evals += STAGES as u64;
        if accepted {
            self.stats.accepted_steps += 1;
        } else {
            self.stats.rejected_steps += 1;
        }

        StepResult {
            y: y_new,
            t: t + h,
            error,
            h_next,
            accepted,
        }
    }

    /// Advance `(t, y)` by exactly `h` without error control.
    pub fn propagate<S: OdeSystem + ?Sized>(&mut self, sys: &S, t: f64, y: &[f64], h: f64) -> Vec<f64> {
        if h == 0.0 {
            return y.to_vec();
        }
        self.compute_stages(sys, t, y, h);
        self.stats.fn_evals += STAGES as u64;
        self.compute_solution(y, h)
    }

    fn compute_stages<S: OdeSystem + ?Sized>(&mut self, sys: &S, t: f64, y: &[f64], h: f64) {
        let Self { k, scratch, .. } = self;
        sys.rhs(t, y, &mut k[0]);
        for i in 1..STAGES {
            for (n, slot) in scratch.iter_mut().enumerate() {
                let sum: f64 = (0..i).map(|j| A[i][j] * k[j][n]).sum();
                *slot = y[n] + h * sum;
            }
            sys.rhs(t + C[i] * h, scratch, &mut k[i]);
        }
    }

    fn compute_solution(&self, y: &[f64], h: f64) -> Vec<f64> {
        y.iter()
            .enumerate()
            .map(|(n, y_n)| {
                let sum: f64 = (0..STAGES).map(|i| B[i] * self.k[i][n]).sum();
                y_n + h * sum
            })
            .collect()
    }

    /// Max norm of the embedded error scaled by `atol + rtol · max(|y|, |y_new|)`.
    fn compute_error(&self, y: &[f64], y_new: &[f64], h: f64) -> f64 {
        let mut max_err: f64 = 0.0;
        for (n, (y_old, y_next)) in y.iter().zip(y_new).enumerate() {
            let err_n: f64 = h * (0..STAGES).map(|i| B_ERR[i] * self.k[i][n]).sum::<f64>();
            let scale = self.tol.atol + self.tol.rtol * y_old.abs().max(y_next.abs());
            let scaled = err_n.abs() / scale;
            if !scaled.is_finite() {
                return f64::INFINITY;
            }
            max_err = max_err.max(scaled);
        }
        max_err
    }
}

/// One accepted point of an integration.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub t: f64,
    pub y: Vec<f64>,
}

/// Lazy, finite sequence of accepted samples starting at the initial condition.
///
/// The record yields the initial sample first, then one sample per accepted step, and ends
/// after the sample that lands exactly on `t0 + max_duration`. The first error ends the
/// sequence: every later call returns `None`.
pub struct IntegrationRecord<'a, S: OdeSystem + ?Sized> {
    system: &'a S,
    stepper: DormandPrince,
    settings: Settings,
    t: f64,
    y: Vec<f64>,
    h: f64,
    t_end: f64,
    attempts: u64,
    started: bool,
    finished: bool,
}

impl<'a, S: OdeSystem + ?Sized> IntegrationRecord<'a, S> {
    pub fn new(system: &'a S, t0: f64, y0: Vec<f64>, settings: Settings) -> Result<Self, IntegrationError> {
        settings.validate()?;
        if !t0.is_finite() {
            return Err(IntegrationError::InvalidInitialState {
                message: format!("t0 = {t0} is not finite"),
            });
        }
        if y0.len() != system.dimension() {
            return Err(IntegrationError::InvalidInitialState {
                message: format!(
                    "state has {} components, system expects {}",
                    y0.len(),
                    system.dimension()
                ),
            });
        }
        if let Some(i) = y0.iter().position(|v| !v.is_finite()) {
            return Err(IntegrationError::InvalidInitialState {
                message: format!("y0[{i}] is not finite"),
            });
        }
        system
            .check_domain(t0, &y0)
            .map_err(|message| IntegrationError::InvalidInitialState { message })?;

        let mut stepper = DormandPrince::new(settings.tolerances, y0.len());
        stepper.set_step_limits(settings.min_step, settings.max_step);
        Ok(Self {
            system,
            stepper,
            settings,
            t: t0,
            y: y0,
            h: settings.initial_step.clamp(settings.min_step, settings.max_step),
            t_end: t0 + settings.max_duration,
            attempts: 0,
            started: false,
            finished: false,
        })
    }

    pub fn stats(&self) -> Stats {
        self.stepper.stats
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Time at which the record ends.
    pub fn end_time(&self) -> f64 {
        self.t_end
    }

    /// Last accepted sample time.
    pub fn current_time(&self) -> f64 {
        self.t
    }

    fn fail(&mut self, error: IntegrationError) -> Option<Result<Sample, IntegrationError>> {
        self.finished = true;
        Some(Err(error))
    }

    fn advance(&mut self) -> Option<Result<Sample, IntegrationError>> {
        let mut rejections = 0u32;
        loop {
            if self.attempts >= self.settings.max_steps {
                return self.fail(IntegrationError::MaxStepsExceeded {
                    t: self.t,
                    max_steps: self.settings.max_steps,
                });
            }

            let remaining = self.t_end - self.t;
            // Stretch the last step rather than leave a sliver below the minimum.
            let lands_on_end = self.h >= remaining || remaining - self.h < self.settings.min_step;
            let h = if lands_on_end { remaining } else { self.h };

            let result = self.stepper.step(self.system, self.t, &self.y, h);
            self.attempts += 1;

            if !result.accepted {
                rejections += 1;
                trace!(t = self.t, h, error = result.error, "step rejected");
                if rejections > self.settings.max_rejections {
                    return self.fail(IntegrationError::TooManyRejections {
                        t: self.t,
                        rejections,
                    });
                }
                if h <= self.settings.min_step {
                    return self.fail(IntegrationError::StepSizeTooSmall { t: self.t, h });
                }
                self.h = result.h_next.min(h);
                continue;
            }

            let t_new = if lands_on_end { self.t_end } else { result.t };
            if result.y.iter().any(|v| !v.is_finite()) {
                return self.fail(IntegrationError::NonFiniteState { t: t_new });
            }
            if let Err(message) = self.system.check_domain(t_new, &result.y) {
                return self.fail(IntegrationError::DomainViolation { t: t_new, message });
            }

            self.t = t_new;
            self.y = result.y;
            self.h = result.h_next;
            return Some(Ok(Sample {
                t: self.t,
                y: self.y.clone(),
            }));
        }
    }
}

impl<S: OdeSystem + ?Sized> Iterator for IntegrationRecord<'_, S> {
    type Item = Result<Sample, IntegrationError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        if !self.started {
            self.started = true;
            return Some(Ok(Sample {
                t: self.t,
                y: self.y.clone(),
            }));
        }
        if self.t >= self.t_end {
            self.finished = true;
            return None;
        }
        self.advance()
    }
}

impl<S: OdeSystem + ?Sized> std::iter::FusedIterator for IntegrationRecord<'_, S> {}
