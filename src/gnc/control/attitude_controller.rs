use crate::config::AttitudeConfig;
use nalgebra as na;

/// Normalised actuator demands, each in [-1, 1], about body x (pitch), y (yaw), z (roll).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlOutputs {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}

impl ControlOutputs {
    pub fn as_vector(&self) -> na::Vector3<f64> {
        na::Vector3::new(self.pitch, self.yaw, self.roll)
    }
}

/// Points the engine axis (body +Z) along a commanded direction.
///
/// PD law on the body-frame rotation vector taking +Z onto the target; roll is only
/// damped since the thrust direction does not depend on it.
pub struct DirectionController {
    kp: f64,
    kd: f64,
    roll_damping: f64,
}

impl DirectionController {
    pub fn new(kp: f64, kd: f64, roll_damping: f64) -> Self {
        Self {
            kp,
            kd,
            roll_damping,
        }
    }

    pub fn from_config(config: &AttitudeConfig) -> Self {
        Self::new(config.kp, config.kd, config.roll_damping)
    }

    /// Rotation vector (axis · angle) in the body frame from +Z to `desired_body`.
    pub fn pointing_error(desired_body: &na::Vector3<f64>) -> na::Vector3<f64> {
        let forward = na::Vector3::z();
        let desired = desired_body.normalize();
        let axis = forward.cross(&desired);
        let sin_angle = axis.magnitude();
        let cos_angle = forward.dot(&desired);
        let angle = sin_angle.atan2(cos_angle);

        if sin_angle > 1e-12 {
            axis * (angle / sin_angle)
        } else if cos_angle < 0.0 {
            // Pointing exactly away: any perpendicular axis will do
            na::Vector3::x() * angle
        } else {
            na::Vector3::zeros()
        }
    }

    pub fn compute_control(
        &self,
        desired_direction: &na::Vector3<f64>,
        attitude: &na::UnitQuaternion<f64>,
        angular_velocity_body: &na::Vector3<f64>,
    ) -> ControlOutputs {
        let desired_body = attitude.inverse_transform_vector(desired_direction);
        let error = Self::pointing_error(&desired_body);

        let mut command = na::Vector2::new(
            self.kp * error.x - self.kd * angular_velocity_body.x,
            self.kp * error.y - self.kd * angular_velocity_body.y,
        );

        // Smooth saturation
        let magnitude = command.magnitude();
        if magnitude > 1.0 {
            command *= (1.0 - (-magnitude).exp()) / magnitude;
        }

        ControlOutputs {
            pitch: command.x,
            yaw: command.y,
            roll: (-self.roll_damping * angular_velocity_body.z).clamp(-1.0, 1.0),
        }
    }
}
