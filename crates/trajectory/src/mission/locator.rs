//! Refinement of a detected crossing to the trigger's tolerance.

use flight_integrator::{BrentSolver, DormandPrince, OdeSystem, RootError, Sample, Tolerances};

use super::runner::PhaseSystem;
use super::trigger::ArmedTrigger;

/// Refined crossing of one trigger.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Crossing {
    /// Declaration index of the trigger.
    pub index: usize,
    pub t: f64,
    pub y: Vec<f64>,
    pub iterations: usize,
}

/// Root-finds `f(s(t))` inside an accepted step, where `s(t)` is a fresh Dormand–Prince step of
/// length `t - t_i` from the sample that opens the bracket.
pub(crate) struct EventLocator<'a> {
    system: &'a PhaseSystem<'a>,
    stepper: DormandPrince,
    max_iterations: usize,
}

impl<'a> EventLocator<'a> {
    pub fn new(system: &'a PhaseSystem<'a>, tolerances: Tolerances, max_iterations: usize) -> Self {
        Self {
            system,
            stepper: DormandPrince::new(tolerances, system.dimension()),
            max_iterations,
        }
    }

    pub fn locate(
        &mut self,
        trigger: &ArmedTrigger,
        before: &Sample,
        after: &Sample,
    ) -> Result<Crossing, RootError> {
        let solver = BrentSolver::new(trigger.tolerance_si(), self.max_iterations);
        let system = self.system;
        let stepper = &mut self.stepper;

        let root = solver.find_root(
            |t| trigger.residual(&stepper.propagate(system, before.t, &before.y, t - before.t)),
            before.t,
            after.t,
            trigger.residual(&before.y),
            trigger.residual(&after.y),
        )?;

        let y = if root.x == after.t {
            after.y.clone()
        } else if root.x == before.t {
            before.y.clone()
        } else {
            self.stepper
                .propagate(self.system, before.t, &before.y, root.x - before.t)
        };

        Ok(Crossing {
            index: trigger.index,
            t: root.x,
            y,
            iterations: root.iterations,
        })
    }
}
