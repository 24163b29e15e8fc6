use fast_ode::{self, Coord, DifferentialEquation, IvpResult};
use nalgebra::SVector;

use crate::error::{QuadError, Result};

type StateVector = SVector<f64, 12>;

/// Integrates a 12-state system and reports it at the requested time points.
///
/// Implementations may sub-step freely between points. The returned series has
/// exactly one row per entry of `times`, and the first row is `initial`.
pub trait Integrator {
    fn integrate<E: DifferentialEquation<12>>(
        &self,
        ode: &E,
        initial: [f64; 12],
        times: &[f64],
    ) -> Result<Vec<[f64; 12]>>;
}

/// Adaptive integration through `fast_ode::solve_ivp`, restarted on each
/// sample interval.
#[derive(Clone, Copy, Debug)]
pub struct FastOdeIntegrator {
    pub tolerance: f64,
}

impl Default for FastOdeIntegrator {
    fn default() -> Self {
        Self { tolerance: 1e-9 }
    }
}

impl Integrator for FastOdeIntegrator {
    fn integrate<E: DifferentialEquation<12>>(
        &self,
        ode: &E,
        initial: [f64; 12],
        times: &[f64],
    ) -> Result<Vec<[f64; 12]>> {
        sample(initial, times, |t0, t1, y| {
            let result = fast_ode::solve_ivp(
                ode,
                (t0, t1),
                Coord(y),
                |_, _| true,
                self.tolerance,
                self.tolerance * 10.0,
            );

            match result {
                IvpResult::FinalTimeReached(final_coord) => Ok(final_coord.0),
                _ => Err(QuadError::IntegrationFailed { t0, t1 }),
            }
        })
    }
}

/// Classic fourth-order Runge-Kutta with a fixed number of sub-steps per
/// sample interval.
#[derive(Clone, Copy, Debug)]
pub struct Rk4Integrator {
    pub substeps: usize,
}

impl Default for Rk4Integrator {
    fn default() -> Self {
        Self { substeps: 4 }
    }
}

impl Rk4Integrator {
    fn derivative<E: DifferentialEquation<12>>(
        ode: &E,
        t: f64,
        y: &StateVector,
        interval: (f64, f64),
    ) -> Result<StateVector> {
        let (dot_y, valid) = ode.ode_dot_y(t, &Coord((*y).into()));
        if !valid {
            return Err(QuadError::IntegrationFailed {
                t0: interval.0,
                t1: interval.1,
            });
        }
        Ok(StateVector::from(dot_y.0))
    }
}

impl Integrator for Rk4Integrator {
    fn integrate<E: DifferentialEquation<12>>(
        &self,
        ode: &E,
        initial: [f64; 12],
        times: &[f64],
    ) -> Result<Vec<[f64; 12]>> {
        let substeps = self.substeps.max(1);
        sample(initial, times, |t0, t1, y| {
            let h = (t1 - t0) / substeps as f64;
            let mut s = StateVector::from(y);
            let mut t = t0;
            for _ in 0..substeps {
                let k1 = Self::derivative(ode, t, &s, (t0, t1))?;
                let k2 = Self::derivative(ode, t + 0.5 * h, &(s + k1 * (0.5 * h)), (t0, t1))?;
                let k3 = Self::derivative(ode, t + 0.5 * h, &(s + k2 * (0.5 * h)), (t0, t1))?;
                let k4 = Self::derivative(ode, t + h, &(s + k3 * h), (t0, t1))?;
                s += (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (h / 6.0);
                t += h;
            }
            Ok(s.into())
        })
    }
}

/// Walks consecutive sample intervals, advancing the state with `step`.
fn sample<F>(initial: [f64; 12], times: &[f64], mut step: F) -> Result<Vec<[f64; 12]>>
where
    F: FnMut(f64, f64, [f64; 12]) -> Result<[f64; 12]>,
{
    let mut rows = Vec::with_capacity(times.len());
    let Some((&first, rest)) = times.split_first() else {
        return Ok(rows);
    };

    let mut y = initial;
    let mut t0 = first;
    rows.push(y);
    for &t1 in rest {
        y = step(t0, t1, y)?;
        if y.iter().any(|v| !v.is_finite()) {
            return Err(QuadError::NonFiniteState { t: t1 });
        }
        rows.push(y);
        t0 = t1;
    }
    Ok(rows)
}
