use nalgebra::{Vector3, Vector4};

use crate::config::PhysicalConfig;
use crate::rotation::rotation_matrix;

/// Allocation between body moments plus collective thrust and the four rotors.
///
/// Rotors 1 and 3 sit on the pitch axis, rotors 2 and 4 on the roll axis. The
/// yaw moment comes from the drag imbalance between the 1/3 and 2/4 pairs,
/// scaled by the thrust to drag constant.
#[derive(Clone, Copy, Debug)]
pub struct ActuatorMixer {
    length: f64,
    thrust_to_drag: f64,
    mass: f64,
    gravity: f64,
}

impl ActuatorMixer {
    pub fn new(config: &PhysicalConfig) -> Self {
        Self {
            length: config.length,
            thrust_to_drag: config.thrust_to_drag,
            mass: config.mass,
            gravity: config.gravity,
        }
    }

    /// Distributes moments and collective thrust to individual motor thrusts.
    ///
    /// # Arguments
    ///
    /// * `moments` - Desired moments `[Mp, Mq, Mr]` in N⋅m about body axes
    /// * `coll_thrust` - Total thrust in N (sum of all motors)
    ///
    /// # Returns
    ///
    /// Motor thrusts `[T1, T2, T3, T4]` in N. Values are not clamped and may
    /// be negative for aggressive commands.
    pub fn motor_thrusts(&self, moments: &Vector3<f64>, coll_thrust: f64) -> Vector4<f64> {
        let add = coll_thrust + moments[2] / self.thrust_to_drag;
        let sub = coll_thrust - moments[2] / self.thrust_to_drag;

        let p = 2.0 * moments[0] / self.length;
        let q = 2.0 * moments[1] / self.length;

        Vector4::new(
            (add - q) / 4.0, // T1
            (sub + p) / 4.0, // T2
            (add + q) / 4.0, // T3
            (sub - p) / 4.0, // T4
        )
    }

    /// Net body moments `[Mp, Mq, Mr]` produced by motor thrusts `[T1, T2, T3, T4]`.
    pub fn net_moments(&self, thrusts: &Vector4<f64>) -> Vector3<f64> {
        Vector3::new(
            self.length * (thrusts[1] - thrusts[3]),
            self.length * (thrusts[2] - thrusts[0]),
            self.thrust_to_drag * (thrusts[0] - thrusts[1] + thrusts[2] - thrusts[3]),
        )
    }

    pub fn collective_thrust(&self, thrusts: &Vector4<f64>) -> f64 {
        thrusts.sum()
    }

    /// Linear acceleration in the inertial frame (m/s²).
    ///
    /// The summed thrust acts along body Z, is rotated into the inertial frame
    /// and gravity is subtracted along inertial Z.
    pub fn body_force_to_inertial(&self, thrusts: &Vector4<f64>, euler: &Vector3<f64>) -> Vector3<f64> {
        let force_body = Vector3::new(0.0, 0.0, self.collective_thrust(thrusts) / self.mass);
        rotation_matrix(euler) * force_body - Vector3::new(0.0, 0.0, self.gravity)
    }
}
