//! Bracketed scalar root finding.

use thiserror::Error;

/// Converged root.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Root {
    pub x: f64,
    /// Function value at `x`; `|fx| < value_tol`.
    pub fx: f64,
    /// Function evaluations spent inside the solver.
    pub iterations: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum RootError {
    #[error("root not bracketed: f({a}) = {fa}, f({b}) = {fb}")]
    NotBracketed { a: f64, b: f64, fa: f64, fb: f64 },
    #[error("bracket collapsed at x = {x} with f = {fx} after {iterations} iterations")]
    Stalled { x: f64, fx: f64, iterations: usize },
    #[error("function is not finite at x = {x}")]
    NonFinite { x: f64, iterations: usize },
    #[error("no convergence after {iterations} iterations (best x = {x}, f = {fx})")]
    MaxIterations { x: f64, fx: f64, iterations: usize },
}

impl RootError {
    /// Best abscissa known when the solver gave up.
    pub fn best_estimate(&self) -> f64 {
        match self {
            RootError::NotBracketed { b, .. } => *b,
            RootError::Stalled { x, .. }
            | RootError::NonFinite { x, .. }
            | RootError::MaxIterations { x, .. } => *x,
        }
    }
}

/// Brent's method (inverse quadratic interpolation, secant, bisection).
///
/// Convergence is declared on the function value, `|f(x)| < value_tol`, not on the width of the
/// bracket: callers ask for a state that satisfies a predicate to a tolerance.
///
/// Reference: Brent, R.P. (1973). "Algorithms for Minimization without Derivatives".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrentSolver {
    pub value_tol: f64,
    pub max_iter: usize,
}

impl Default for BrentSolver {
    fn default() -> Self {
        Self {
            value_tol: 1e-12,
            max_iter: 100,
        }
    }
}

impl BrentSolver {
    pub fn new(value_tol: f64, max_iter: usize) -> Self {
        Self {
            value_tol,
            max_iter,
        }
    }

    /// Find `x` in `[a, b]` with `|f(x)| < value_tol`, given `fa = f(a)` and `fb = f(b)` of
    /// opposite sign (either may be zero).
    pub fn find_root<F>(
        &self,
        mut f: F,
        a: f64,
        b: f64,
        fa: f64,
        fb: f64,
    ) -> Result<Root, RootError>
    where
        F: FnMut(f64) -> f64,
    {
        if !fa.is_finite() || !fb.is_finite() || fa * fb > 0.0 {
            return Err(RootError::NotBracketed { a, b, fa, fb });
        }
        if fb.abs() < self.value_tol {
            return Ok(Root {
                x: b,
                fx: fb,
                iterations: 0,
            });
        }
        if fa.abs() < self.value_tol {
            return Ok(Root {
                x: a,
                fx: fa,
                iterations: 0,
            });
        }

        let (mut a, mut b, mut fa, mut fb) = (a, b, fa, fb);
        let (mut c, mut fc) = (b, fb);
        let mut d = b - a;
        let mut e = d;

        for iter in 1..=self.max_iter {
            // Keep the root between b and c.
            if (fb > 0.0) == (fc > 0.0) {
                c = a;
                fc = fa;
                d = b - a;
                e = d;
            }
            // b is the best estimate.
            if fc.abs() < fb.abs() {
                a = b;
                b = c;
                c = a;
                fa = fb;
                fb = fc;
                fc = fa;
            }

            let tol1 = 2.0 * f64::EPSILON * b.abs().max(1.0);
            let xm = 0.5 * (c - b);
            if xm.abs() <= tol1 {
                return Err(RootError::Stalled {
                    x: b,
                    fx: fb,
                    iterations: iter - 1,
                });
            }

            if e.abs() >= tol1 && fa.abs() > fb.abs() {
                let s = fb / fa;
                let (mut p, mut q) = if a == c {
                    (2.0 * xm * s, 1.0 - s)
                } else {
                    let qa = fa / fc;
                    let r = fb / fc;
                    (
                        s * (2.0 * xm * qa * (qa - r) - (b - a) * (r - 1.0)),
                        (qa - 1.0) * (r - 1.0) * (s - 1.0),
                    )
                };
                if p > 0.0 {
                    q = -q;
                }
                p = p.abs();
                let min1 = 3.0 * xm * q - (tol1 * q).abs();
                let min2 = (e * q).abs();
                if 2.0 * p < min1.min(min2) {
                    e = d;
                    d = p / q;
                } else {
                    d = xm;
                    e = d;
                }
            } else {
                d = xm;
                e = d;
            }

            a = b;
            fa = fb;
            b += if d.abs() > tol1 { d } else { tol1.copysign(xm) };
            fb = f(b);

            if !fb.is_finite() {
                return Err(RootError::NonFinite { x: b, iterations: iter });
            }
            if fb.abs() < self.value_tol {
                return Ok(Root {
                    x: b,
                    fx: fb,
                    iterations: iter,
                });
            }
        }

        Err(RootError::MaxIterations {
            x: b,
            fx: fb,
            iterations: self.max_iter,
        })
    }
}

/// Direction of a zero crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CrossingDirection {
    /// Negative to positive.
    Increasing,
    /// Positive to negative.
    Decreasing,
    #[default]
    Either,
}

/// Whether the step from `g_old` to `g_new` crosses zero in the requested direction.
///
/// A previous value of exactly zero never starts a crossing: the state sat on the threshold and
/// the event, if any, was already reported. A new value of exactly zero counts when the previous
/// value lay on the side the direction requires.
pub fn sign_change_detected(g_old: f64, g_new: f64, direction: CrossingDirection) -> bool {
    if g_old == 0.0 || g_old * g_new > 0.0 {
        return false;
    }
    match direction {
        CrossingDirection::Increasing => g_old < 0.0,
        CrossingDirection::Decreasing => g_old > 0.0,
        CrossingDirection::Either => true,
    }
}
