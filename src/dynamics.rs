use std::cell::Cell;

use fast_ode;
use nalgebra::{Matrix3, Vector3, Vector4};

use crate::config::{ConfigOverrides, PhysicalConfig};
use crate::error::{QuadError, Result};
use crate::mixer::ActuatorMixer;
use crate::rotation::euler_rate_from_angular_velocity;

/// Fixed sampling step of the segment runner (seconds).
pub const DEFAULT_STEP_SIZE: f64 = 0.001;

/// Represents the complete state of the quadcopter in 3D space.
///
/// # Fields
///
/// * `position` - Position in the inertial frame (meters)
/// * `velocity` - Linear velocity in the inertial frame (m/s)
/// * `orientation` - Euler angles `[phi, theta, psi]` (roll, pitch, yaw) in radians
/// * `angular_velocity` - Body rates `[p, q, r]` (rad/s)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VehicleState {
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
    pub orientation: Vector3<f64>,
    pub angular_velocity: Vector3<f64>,
}

impl Default for VehicleState {
    fn default() -> Self {
        Self {
            position: Vector3::zeros(),
            velocity: Vector3::zeros(),
            orientation: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
        }
    }
}

impl VehicleState {
    /// Converts the state to the flat layout used by the integrator.
    ///
    /// # Returns
    ///
    /// A 12-element array in the following order:
    /// [x, y, z, vx, vy, vz, phi, theta, psi, p, q, r]
    pub fn to_array(&self) -> [f64; 12] {
        let mut arr = [0.0; 12];
        arr[0..3].copy_from_slice(self.position.as_slice());
        arr[3..6].copy_from_slice(self.velocity.as_slice());
        arr[6..9].copy_from_slice(self.orientation.as_slice());
        arr[9..12].copy_from_slice(self.angular_velocity.as_slice());
        arr
    }

    /// Splits a flat 12-element array (same order as `to_array()`) back into a state.
    pub fn from_array(arr: &[f64; 12]) -> Self {
        VehicleState {
            position: Vector3::from_column_slice(&arr[0..3]),
            velocity: Vector3::from_column_slice(&arr[3..6]),
            orientation: Vector3::from_column_slice(&arr[6..9]),
            angular_velocity: Vector3::from_column_slice(&arr[9..12]),
        }
    }
}

/// Rigid-body quadcopter model.
///
/// Owns the physical configuration and the one live [`VehicleState`]. The
/// state only moves at segment boundaries inside
/// [`Quadcopter::update_state`]; intermediate samples live in the returned
/// trajectory.
#[derive(Debug)]
pub struct Quadcopter {
    pub(crate) config: PhysicalConfig,
    pub(crate) mixer: ActuatorMixer,
    pub(crate) state: VehicleState,
    pub(crate) save_state: bool,
    pub(crate) dt: f64,
    pub(crate) tolerance: f64,
    /// Euler rate from the most recent derivative evaluation. Nothing in the
    /// physics reads it back.
    pub(crate) euler_dot: Cell<Vector3<f64>>,
    inertia: Matrix3<f64>,
    inertia_inv: Matrix3<f64>,
}

impl Quadcopter {
    /// Creates a model at rest at the origin.
    ///
    /// # Arguments
    ///
    /// * `save_state` - Whether `update_state` should return the sampled trajectory
    /// * `overrides` - Partial overlay on the default [`PhysicalConfig`]
    ///
    /// # Errors
    ///
    /// Returns [`QuadError::InvalidConfig`] if the merged configuration has a
    /// non-positive mass, arm length, inertia or thrust to drag constant.
    pub fn new(save_state: bool, overrides: &ConfigOverrides) -> Result<Self> {
        let config = PhysicalConfig::default().merged(overrides);
        config.validate()?;

        let inertia = Matrix3::from_diagonal(&Vector3::from(config.inertia));
        let inertia_inv = Matrix3::from_diagonal(&Vector3::from(config.inertia).map(|i| 1.0 / i));

        Ok(Self {
            config,
            mixer: ActuatorMixer::new(&config),
            state: VehicleState::default(),
            save_state,
            dt: DEFAULT_STEP_SIZE,
            tolerance: 1e-9,
            euler_dot: Cell::new(Vector3::zeros()),
            inertia,
            inertia_inv,
        })
    }

    /// Overrides the fixed sampling step.
    pub fn with_step_size(mut self, dt: f64) -> Result<Self> {
        if !(dt > 0.0 && dt.is_finite()) {
            return Err(QuadError::InvalidConfig { field: "dt", value: dt });
        }
        self.dt = dt;
        Ok(self)
    }

    /// Overrides the solver tolerance used by the default integrator.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Resets the vehicle to rest at the origin with level attitude.
    pub fn initialize_state(&mut self) {
        self.state = VehicleState::default();
    }

    pub fn config(&self) -> &PhysicalConfig {
        &self.config
    }

    pub fn state(&self) -> &VehicleState {
        &self.state
    }

    pub fn step_size(&self) -> f64 {
        self.dt
    }

    /// The Euler rate carried from the last derivative evaluation.
    pub fn last_euler_rate(&self) -> Vector3<f64> {
        self.euler_dot.get()
    }

    pub fn inertia_matrix(&self) -> Matrix3<f64> {
        self.inertia
    }

    /// Moments needed to reach `desired_acc` from body rates `omega`:
    /// `I * (desired_acc + (I⁻¹ω) × (Iω))`.
    pub fn moments(&self, desired_acc: &Vector3<f64>, omega: &Vector3<f64>) -> Vector3<f64> {
        let cross = (self.inertia_inv * omega).cross(&(self.inertia * omega));
        self.inertia * (desired_acc + cross)
    }

    /// Linear acceleration in the inertial frame for the given motor thrusts.
    pub fn acceleration(&self, thrusts: &Vector4<f64>, euler: &Vector3<f64>) -> Vector3<f64> {
        self.mixer.body_force_to_inertial(thrusts, euler)
    }

    /// Body angular acceleration: `I⁻¹M - (I⁻¹ω) × (Iω)`.
    ///
    /// The subtracted term is the one [`Self::moments`] adds, so thrusts mixed
    /// from `moments(desired_acc, omega)` give back exactly `desired_acc`.
    pub fn angular_acceleration(&self, omega: &Vector3<f64>, thrusts: &Vector4<f64>) -> Vector3<f64> {
        let cross = (self.inertia_inv * omega).cross(&(self.inertia * omega));
        self.inertia_inv * self.mixer.net_moments(thrusts) - cross
    }

    /// Time derivative of the flat state under a fixed command.
    ///
    /// # Arguments
    ///
    /// * `state` - `[x, y, z, vx, vy, vz, phi, theta, psi, p, q, r]`
    /// * `coll_thrust` - Commanded collective thrust (N)
    /// * `desired_acc` - Commanded angular acceleration `[dp/dt, dq/dt, dr/dt]`
    ///
    /// # Returns
    ///
    /// `[vx, vy, vz, ax, ay, az, dphi, dtheta, dpsi, dp, dq, dr]`. The Euler
    /// rate is also stored as the carried value, see [`Self::last_euler_rate`].
    pub fn state_derivative(
        &self,
        state: &[f64; 12],
        coll_thrust: f64,
        desired_acc: &Vector3<f64>,
    ) -> Result<[f64; 12]> {
        let VehicleState {
            velocity,
            orientation: euler,
            angular_velocity: omega,
            ..
        } = VehicleState::from_array(state);

        let moments = self.moments(desired_acc, &omega);
        let thrusts = self.mixer.motor_thrusts(&moments, coll_thrust);
        let acc = self.acceleration(&thrusts, &euler);
        let omega_dot = self.angular_acceleration(&omega, &thrusts);

        let euler_dot = euler_rate_from_angular_velocity(&omega, &euler)?;
        self.euler_dot.set(euler_dot);

        let mut dot_y = [0.0; 12];
        dot_y[0..3].copy_from_slice(velocity.as_slice());
        dot_y[3..6].copy_from_slice(acc.as_slice());
        dot_y[6..9].copy_from_slice(euler_dot.as_slice());
        dot_y[9..12].copy_from_slice(omega_dot.as_slice());
        Ok(dot_y)
    }
}

/// The model bound to one segment's command, in the form the solver consumes.
pub struct QuadcopterOde<'a> {
    model: &'a Quadcopter,
    coll_thrust: f64,
    desired_acc: Vector3<f64>,
    fault: Cell<Option<QuadError>>,
}

impl<'a> QuadcopterOde<'a> {
    pub fn new(model: &'a Quadcopter, coll_thrust: f64, desired_acc: Vector3<f64>) -> Self {
        Self {
            model,
            coll_thrust,
            desired_acc,
            fault: Cell::new(None),
        }
    }

    pub fn derivative(&self, state: &[f64; 12]) -> Result<[f64; 12]> {
        self.model
            .state_derivative(state, self.coll_thrust, &self.desired_acc)
    }

    /// Takes the first error raised by an evaluation, if any.
    pub fn take_fault(&self) -> Option<QuadError> {
        self.fault.take()
    }
}

impl fast_ode::DifferentialEquation<12> for QuadcopterOde<'_> {
    fn ode_dot_y(&self, _t: f64, y: &fast_ode::Coord<12>) -> (fast_ode::Coord<12>, bool) {
        match self.derivative(&y.0) {
            Ok(dot_y) => (fast_ode::Coord(dot_y), true),
            Err(err) => {
                let first = self.fault.take().unwrap_or(err);
                self.fault.set(Some(first));
                (fast_ode::Coord([f64::NAN; 12]), false)
            }
        }
    }
}
