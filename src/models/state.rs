use crate::models::body::CelestialBody;
use crate::models::spacecraft::VehicleProperties;
use nalgebra as na;

/// Translational state integrated by RK4: inertial position and velocity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateVector {
    pub position: na::Vector3<f64>,
    pub velocity: na::Vector3<f64>,
}

impl StateVector {
    pub fn new(position: na::Vector3<f64>, velocity: na::Vector3<f64>) -> Self {
        Self { position, velocity }
    }

    pub fn zero() -> Self {
        Self {
            position: na::Vector3::zeros(),
            velocity: na::Vector3::zeros(),
        }
    }
}

impl std::ops::Add for StateVector {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        StateVector {
            position: self.position + other.position,
            velocity: self.velocity + other.velocity,
        }
    }
}

impl std::ops::Mul<f64> for StateVector {
    type Output = Self;

    fn mul(self, scalar: f64) -> Self {
        StateVector {
            position: self.position * scalar,
            velocity: self.velocity * scalar,
        }
    }
}

/// Snapshot of everything the guidance core reads from the vehicle each tick.
#[derive(Debug, Clone)]
pub struct VesselState {
    pub mass: f64,
    pub max_thrust_accel: f64,
    pub min_thrust_accel: f64,
    pub drag_coefficient_over_mass: f64,

    // Orbital state (center of mass, inertial frame)
    pub position: na::Vector3<f64>,
    pub velocity: na::Vector3<f64>,

    // Attitude state; the engine thrusts along body +Z
    pub attitude: na::UnitQuaternion<f64>,
    pub angular_velocity: na::Vector3<f64>,

    // Time properties
    pub universal_time: f64,
    pub dt: f64,

    /// Touch-down contact reported by the physics collaborator.
    pub landed: bool,
}

impl VesselState {
    pub fn new<T: VehicleProperties>(
        vehicle: &T,
        position: na::Vector3<f64>,
        velocity: na::Vector3<f64>,
        universal_time: f64,
        dt: f64,
    ) -> Self {
        VesselState {
            mass: vehicle.mass(),
            max_thrust_accel: vehicle.max_thrust_acceleration(),
            min_thrust_accel: vehicle.min_thrust_acceleration(),
            drag_coefficient_over_mass: vehicle.drag_coefficient_over_mass(),
            position,
            velocity,
            attitude: na::UnitQuaternion::identity(),
            angular_velocity: na::Vector3::zeros(),
            universal_time,
            dt,
            landed: false,
        }
    }

    pub fn state_vector(&self) -> StateVector {
        StateVector::new(self.position, self.velocity)
    }

    pub fn altitude(&self, body: &CelestialBody) -> f64 {
        body.altitude(&self.position)
    }

    pub fn up(&self) -> na::Vector3<f64> {
        self.position.normalize()
    }

    pub fn surface_velocity(&self, body: &CelestialBody) -> na::Vector3<f64> {
        self.velocity - body.surface_velocity_at(&self.position)
    }

    pub fn vertical_speed(&self, body: &CelestialBody) -> f64 {
        self.surface_velocity(body).dot(&self.up())
    }

    /// Surface velocity with the vertical component removed.
    pub fn horizontal_surface_velocity(&self, body: &CelestialBody) -> na::Vector3<f64> {
        let surface_velocity = self.surface_velocity(body);
        let up = self.up();
        surface_velocity - up * surface_velocity.dot(&up)
    }

    pub fn thrust_direction(&self) -> na::Vector3<f64> {
        self.attitude * na::Vector3::z()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::bodies;
    use crate::config::lander::SimpleLander;
    use approx::assert_abs_diff_eq;

    #[test]
    fn surface_velocity_removes_rotation() {
        let kerbin = bodies::kerbin();
        let position = na::Vector3::new(kerbin.radius + 1000.0, 0.0, 0.0);
        let co_rotating = kerbin.surface_velocity_at(&position);
        let vessel = VesselState::new(&SimpleLander, position, co_rotating, 0.0, 0.02);
        assert_abs_diff_eq!(vessel.surface_velocity(&kerbin).magnitude(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn horizontal_and_vertical_components_split_surface_velocity() {
        let mun = bodies::mun();
        let position = na::Vector3::new(0.0, mun.radius + 2000.0, 0.0);
        let velocity = na::Vector3::new(30.0, -4.0, 0.0) + mun.surface_velocity_at(&position);
        let vessel = VesselState::new(&SimpleLander, position, velocity, 0.0, 0.02);
        assert_abs_diff_eq!(vessel.vertical_speed(&mun), -4.0, epsilon = 1e-9);
        assert_abs_diff_eq!(
            vessel.horizontal_surface_velocity(&mun),
            na::Vector3::new(30.0, 0.0, 0.0),
            epsilon = 1e-9
        );
    }

    #[test]
    fn default_attitude_thrusts_along_z() {
        let vessel = VesselState::new(
            &SimpleLander,
            na::Vector3::new(1.0, 0.0, 0.0),
            na::Vector3::zeros(),
            0.0,
            0.02,
        );
        assert_abs_diff_eq!(vessel.thrust_direction(), na::Vector3::z(), epsilon = 1e-12);
    }
}
