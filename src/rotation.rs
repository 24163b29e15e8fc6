use nalgebra::{Matrix3, Vector3};

use crate::error::{QuadError, Result};

/// Body to inertial rotation matrix for Euler angles `[phi, theta, psi]`.
///
/// R = Rz(ψ) * Ry(θ) * Rx(φ)
pub fn rotation_matrix(euler: &Vector3<f64>) -> Matrix3<f64> {
    let (sin_phi, cos_phi) = euler[0].sin_cos();
    let (sin_theta, cos_theta) = euler[1].sin_cos();
    let (sin_psi, cos_psi) = euler[2].sin_cos();

    Matrix3::new(
        cos_theta * cos_psi,
        sin_phi * sin_theta * cos_psi - cos_phi * sin_psi,
        cos_phi * sin_theta * cos_psi + sin_phi * sin_psi,
        cos_theta * sin_psi,
        sin_phi * sin_theta * sin_psi + cos_phi * cos_psi,
        cos_phi * sin_theta * sin_psi - sin_phi * cos_psi,
        -sin_theta,
        cos_theta * sin_phi,
        cos_theta * cos_phi,
    )
}

/// Matrix `M` relating body rates to Euler angle rates: `omega = M * euler_dot`.
///
/// The third row uses `sin(psi)` where the kinematic relation calls for
/// `sin(phi)`. This matches the reference trajectories and is a suspected
/// defect; the regression test below pins it.
#[rustfmt::skip]
pub fn angular_rotation_matrix(euler: &Vector3<f64>) -> Matrix3<f64> {
    let (sin_phi, cos_phi) = euler[0].sin_cos();
    let (sin_theta, cos_theta) = euler[1].sin_cos();
    let sin_psi = euler[2].sin();

    Matrix3::new(
        1.0, 0.0, -sin_theta,
        0.0, cos_phi, cos_theta * sin_phi,
        0.0, -sin_psi, cos_theta * cos_phi,
    )
}

/// Converts Euler angle rates `[dphi/dt, dtheta/dt, dpsi/dt]` to body rates `[p, q, r]`.
pub fn angular_velocity_from_euler_rate(
    euler_dot: &Vector3<f64>,
    euler: &Vector3<f64>,
) -> Vector3<f64> {
    angular_rotation_matrix(euler) * euler_dot
}

/// Converts body rates `[p, q, r]` to Euler angle rates.
///
/// # Errors
///
/// Returns [`QuadError::SingularEulerRateMatrix`] when the matrix cannot be
/// inverted. Close to gimbal lock (`cos(theta) ≈ 0`) the inverse exists
/// numerically but its entries blow up; those values are returned as-is.
pub fn euler_rate_from_angular_velocity(
    omega: &Vector3<f64>,
    euler: &Vector3<f64>,
) -> Result<Vector3<f64>> {
    let inverse = angular_rotation_matrix(euler).try_inverse().ok_or(
        QuadError::SingularEulerRateMatrix {
            phi: euler[0],
            theta: euler[1],
            psi: euler[2],
        },
    )?;
    Ok(inverse * omega)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_rotation_matrix_is_orthogonal() {
        let samples = [
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(0.3, -0.2, 1.1),
            Vector3::new(-1.2, 0.9, -2.5),
            Vector3::new(2.0, 1.4, 3.0),
        ];
        for euler in samples {
            let r = rotation_matrix(&euler);
            assert_relative_eq!(r.transpose() * r, Matrix3::identity(), epsilon = 1e-12);
            assert_relative_eq!(r.determinant(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_rotation_matrix_yaw() {
        let r = rotation_matrix(&Vector3::new(0.0, 0.0, FRAC_PI_2));
        let x_body = r * Vector3::x();
        assert_relative_eq!(x_body, Vector3::y(), epsilon = 1e-12);
    }

    #[test]
    fn test_angular_rotation_matrix_third_row_uses_psi() {
        // Regression: row 3, column 2 is -sin(psi), not -sin(phi).
        let euler = Vector3::new(0.4, 0.25, -0.7);
        let m = angular_rotation_matrix(&euler);

        assert_relative_eq!(m[(2, 1)], 0.7_f64.sin(), epsilon = 1e-15);
        assert_relative_eq!(m[(2, 2)], 0.25_f64.cos() * 0.4_f64.cos(), epsilon = 1e-15);
        assert_relative_eq!(m[(1, 1)], 0.4_f64.cos(), epsilon = 1e-15);
        assert_relative_eq!(m[(0, 2)], -0.25_f64.sin(), epsilon = 1e-15);

        let omega = Vector3::new(0.1, -0.2, 0.3);
        let euler_dot = euler_rate_from_angular_velocity(&omega, &euler).unwrap();
        let det = 0.25_f64.cos() * (0.4_f64.cos().powi(2) + (-0.7_f64).sin() * 0.4_f64.sin());
        // Cramer's rule on the pinned matrix, second component
        let expected_theta_dot = (omega[1] * m[(2, 2)] - m[(1, 2)] * omega[2]) / det;
        assert_relative_eq!(euler_dot[1], expected_theta_dot, epsilon = 1e-12);
    }

    #[test]
    fn test_euler_rate_round_trip() {
        let euler = Vector3::new(0.1, -0.3, 0.2);
        let omega = Vector3::new(0.5, 0.25, -1.0);

        let euler_dot = euler_rate_from_angular_velocity(&omega, &euler).unwrap();
        let back = angular_velocity_from_euler_rate(&euler_dot, &euler);

        assert_relative_eq!(back, omega, epsilon = 1e-12);
    }

    #[test]
    fn test_level_attitude_rates_are_identity() {
        let omega = Vector3::new(0.2, -0.4, 0.6);
        let euler_dot = euler_rate_from_angular_velocity(&omega, &Vector3::zeros()).unwrap();
        assert_relative_eq!(euler_dot, omega, epsilon = 1e-15);
    }

    #[test]
    fn test_gimbal_lock_blows_up() {
        let euler = Vector3::new(0.0, FRAC_PI_2, 0.0);
        match euler_rate_from_angular_velocity(&Vector3::new(0.0, 0.0, 1.0), &euler) {
            Err(QuadError::SingularEulerRateMatrix { .. }) => {}
            Ok(euler_dot) => {
                assert!(euler_dot.norm() > 1e12 || !euler_dot.iter().all(|v| v.is_finite()))
            }
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
}
