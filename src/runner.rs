use log::{debug, trace, warn};
use nalgebra::Vector3;

use crate::dynamics::{Quadcopter, QuadcopterOde, VehicleState};
use crate::error::Result;
use crate::integrator::{FastOdeIntegrator, Integrator};

/// Extra rows reserved on top of the pre-computed trajectory length.
const TRAJECTORY_SLACK: usize = 100;

/// One flight phase with a constant command.
///
/// # Fields
///
/// * `coll_thrust` - Collective thrust of all motors (N)
/// * `desired_angular_acc` - Commanded angular acceleration `[dp/dt, dq/dt, dr/dt]`
/// * `duration` - Length of the phase (s); must be at least twice the step size
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlightSegment {
    pub coll_thrust: f64,
    pub desired_angular_acc: Vector3<f64>,
    pub duration: f64,
}

impl FlightSegment {
    pub fn new(coll_thrust: f64, desired_angular_acc: Vector3<f64>, duration: f64) -> Self {
        Self {
            coll_thrust,
            desired_angular_acc,
            duration,
        }
    }
}

/// What happened to each input segment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SegmentOutcome {
    /// Integrated and reported at `rows` sample times.
    Integrated { rows: usize },
    /// Shorter than `minimum` seconds, or not a finite duration; the state was
    /// left untouched.
    Dropped { duration: f64, minimum: f64 },
}

/// Stitched output of [`Quadcopter::update_state`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Trajectory {
    /// `[x, y, z, vx, vy, vz, phi, theta, psi, p, q, r]` per sample. Empty when
    /// the model does not save state.
    pub rows: Vec<[f64; 12]>,
    pub outcomes: Vec<SegmentOutcome>,
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn last_state(&self) -> Option<VehicleState> {
        self.rows.last().map(VehicleState::from_array)
    }

    pub fn dropped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome, SegmentOutcome::Dropped { .. }))
            .count()
    }
}

/// Sample times `0, dt, 2dt, ...` strictly below `duration`. Empty for a
/// non-finite duration.
pub fn sample_times(duration: f64, dt: f64) -> Vec<f64> {
    if !duration.is_finite() {
        return Vec::new();
    }
    let n = (duration / dt).ceil().max(0.0) as usize;
    (0..n).map(|i| i as f64 * dt).collect()
}

impl Quadcopter {
    /// Runs the segments in order with the default adaptive integrator.
    ///
    /// See [`Quadcopter::update_state_with`].
    pub fn update_state(&mut self, segments: &[FlightSegment]) -> Result<Trajectory> {
        let integrator = FastOdeIntegrator {
            tolerance: self.tolerance,
        };
        self.update_state_with(&integrator, segments)
    }

    /// Advances the vehicle through each segment and returns the trajectory.
    ///
    /// Segments shorter than twice the step size are skipped and reported as
    /// [`SegmentOutcome::Dropped`]. The state is updated to the last sample of
    /// each integrated segment. The first sample of a segment equals the last
    /// sample of the previous one and is stored once.
    ///
    /// # Errors
    ///
    /// Singular Euler-rate evaluations and solver failures abort the run. The
    /// state keeps the value reached at the end of the last completed segment.
    pub fn update_state_with<I: Integrator>(
        &mut self,
        integrator: &I,
        segments: &[FlightSegment],
    ) -> Result<Trajectory> {
        let mut trajectory = Trajectory {
            rows: Vec::new(),
            outcomes: Vec::with_capacity(segments.len()),
        };
        if self.save_state {
            let overall_time: f64 = segments.iter().map(|segment| segment.duration).sum();
            let overall_length = sample_times(overall_time, self.dt)
                .len()
                .saturating_sub(segments.len().saturating_sub(1));
            trajectory.rows.reserve_exact(overall_length + TRAJECTORY_SLACK);
        }

        self.euler_dot.set(Vector3::zeros());
        let minimum = 2.0 * self.dt;

        for (i, segment) in segments.iter().enumerate() {
            // NaN fails every comparison, so test for the accepted range
            if !(segment.duration >= minimum && segment.duration.is_finite()) {
                warn!(
                    "dropping segment {}: duration {} s is not a finite value of at least {} s",
                    i, segment.duration, minimum
                );
                trajectory.outcomes.push(SegmentOutcome::Dropped {
                    duration: segment.duration,
                    minimum,
                });
                continue;
            }

            let times = sample_times(segment.duration, self.dt);
            let output = {
                let ode = QuadcopterOde::new(self, segment.coll_thrust, segment.desired_angular_acc);
                let output = integrator.integrate(&ode, self.state.to_array(), &times);
                if let Some(fault) = ode.take_fault() {
                    return Err(fault);
                }
                output?
            };

            let Some(last) = output.last() else {
                continue;
            };
            self.state = VehicleState::from_array(last);
            debug!(
                "segment {}: {} rows, z = {:.4} m, vz = {:.4} m/s",
                i,
                output.len(),
                self.state.position[2],
                self.state.velocity[2]
            );
            trajectory
                .outcomes
                .push(SegmentOutcome::Integrated { rows: output.len() });

            if self.save_state {
                // the first row repeats the previous segment's last row
                let index = trajectory.rows.len().saturating_sub(1);
                trajectory.rows.truncate(index);
                trajectory.rows.extend_from_slice(&output);
            }
        }

        trajectory.rows.shrink_to_fit();
        trace!(
            "run finished: {} segments, {} dropped, {} rows",
            segments.len(),
            trajectory.dropped(),
            trajectory.len()
        );
        Ok(trajectory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigOverrides;
    use crate::integrator::Rk4Integrator;
    use approx::assert_relative_eq;

    #[test]
    fn test_sample_times_excludes_end() {
        let ts = sample_times(0.01, 0.001);
        assert_eq!(ts.len(), 10);
        assert_eq!(ts[0], 0.0);
        assert_relative_eq!(ts[9], 0.009, epsilon = 1e-15);
        assert!(sample_times(0.0, 0.001).is_empty());
    }

    #[test]
    fn test_first_segment_rows_are_kept_whole() {
        let mut quad = Quadcopter::new(true, &ConfigOverrides::default()).unwrap();
        let segment = FlightSegment::new(0.0, Vector3::zeros(), 0.02);

        let trajectory = quad.update_state_with(&Rk4Integrator::default(), &[segment]).unwrap();

        assert_eq!(trajectory.len(), sample_times(0.02, 0.001).len());
        assert_eq!(trajectory.rows[0], [0.0; 12]);
        assert_eq!(
            trajectory.outcomes,
            vec![SegmentOutcome::Integrated {
                rows: trajectory.len()
            }]
        );
    }

    #[test]
    fn test_no_rows_without_save_state() {
        let mut quad = Quadcopter::new(false, &ConfigOverrides::default()).unwrap();
        let segment = FlightSegment::new(0.0, Vector3::zeros(), 0.01);

        let trajectory = quad.update_state_with(&Rk4Integrator::default(), &[segment]).unwrap();

        assert!(trajectory.is_empty());
        assert!(quad.state().velocity[2] < 0.0);
    }

    #[test]
    fn test_carried_rate_reset_per_run() {
        let mut quad = Quadcopter::new(false, &ConfigOverrides::default()).unwrap();
        quad.euler_dot.set(Vector3::new(1.0, 2.0, 3.0));

        // only a dropped segment, so nothing is evaluated after the reset
        let trajectory = quad
            .update_state_with(
                &Rk4Integrator::default(),
                &[FlightSegment::new(1.0, Vector3::zeros(), 0.0015)],
            )
            .unwrap();

        assert_eq!(trajectory.dropped(), 1);
        assert_eq!(quad.last_euler_rate(), Vector3::zeros());
    }

    #[test]
    fn test_spin_up_tracks_carried_rate() {
        let mut quad = Quadcopter::new(false, &ConfigOverrides::default()).unwrap();
        let segment = FlightSegment::new(4.59, Vector3::new(0.0, 0.0, 1.0), 0.05);

        quad.update_state_with(&Rk4Integrator::default(), &[segment]).unwrap();

        // yaw rate ramps at the commanded acceleration up to the last sample
        let t_last = 49.0 * 0.001;
        let r = quad.state().angular_velocity[2];
        assert_relative_eq!(r, t_last, epsilon = 1e-12);
        // level flight: the yaw rate is the body rate seen at the last evaluation
        assert_relative_eq!(quad.last_euler_rate()[2], r, epsilon = 1e-3);
    }

    #[test]
    fn test_rates_ramp_linearly_on_two_axes() {
        let mut quad = Quadcopter::new(false, &ConfigOverrides::default()).unwrap();
        quad.state.angular_velocity = Vector3::new(0.3, 0.0, 0.5);
        let desired = Vector3::new(0.0, 0.0, 1.0);
        let segment = FlightSegment::new(4.59, desired, 0.05);

        quad.update_state_with(&Rk4Integrator::default(), &[segment]).unwrap();

        let t_last = 49.0 * 0.001;
        assert_relative_eq!(
            quad.state().angular_velocity,
            Vector3::new(0.3, 0.0, 0.5) + desired * t_last,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_non_finite_durations_dropped() {
        let mut quad = Quadcopter::new(true, &ConfigOverrides::default()).unwrap();
        let segments = [
            FlightSegment::new(0.0, Vector3::zeros(), f64::NAN),
            FlightSegment::new(0.0, Vector3::zeros(), 0.01),
            FlightSegment::new(0.0, Vector3::zeros(), f64::INFINITY),
        ];

        let trajectory = quad.update_state_with(&Rk4Integrator::default(), &segments).unwrap();

        assert_eq!(trajectory.outcomes.len(), segments.len());
        assert_eq!(trajectory.dropped(), 2);
        assert_eq!(trajectory.outcomes[1], SegmentOutcome::Integrated { rows: 10 });
        assert_eq!(trajectory.len(), 10);
        assert!(sample_times(f64::INFINITY, 0.001).is_empty());
    }
}
