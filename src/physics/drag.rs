use super::environment::Environment;
use crate::models::body::CelestialBody;
use nalgebra as na;

/// Drag acceleration for a vehicle with ballistic ratio `drag_coefficient_over_mass`
/// (Cd·A/m). The atmosphere co-rotates with the body.
pub fn drag_acceleration(
    body: &CelestialBody,
    drag_coefficient_over_mass: f64,
    position: &na::Vector3<f64>,
    velocity: &na::Vector3<f64>,
) -> na::Vector3<f64> {
    let rho: f64 = Environment::new(body, position).density;
    if rho == 0.0 {
        return na::Vector3::zeros();
    }

    let air_velocity = velocity - body.surface_velocity_at(position);
    let v_air: f64 = air_velocity.magnitude();
    air_velocity * (-0.5 * rho * drag_coefficient_over_mass * v_air)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::bodies;
    use approx::assert_abs_diff_eq;

    #[test]
    fn no_drag_in_vacuum() {
        let mun = bodies::mun();
        let position = na::Vector3::new(mun.radius + 10.0, 0.0, 0.0);
        let drag = drag_acceleration(&mun, 0.01, &position, &na::Vector3::new(0.0, 500.0, 0.0));
        assert_eq!(drag, na::Vector3::zeros());
    }

    #[test]
    fn sea_level_drag_opposes_air_velocity() {
        let kerbin = bodies::kerbin();
        let position = na::Vector3::new(kerbin.radius, 0.0, 0.0);
        let air_velocity = na::Vector3::new(-100.0, 0.0, 0.0);
        let velocity = air_velocity + kerbin.surface_velocity_at(&position);
        let drag = drag_acceleration(&kerbin, 0.002, &position, &velocity);
        // ½ · 1.225 · 0.002 · 100²
        assert_abs_diff_eq!(drag, na::Vector3::new(12.25, 0.0, 0.0), epsilon = 1e-9);
    }

    #[test]
    fn co_rotating_vessel_feels_no_drag() {
        let kerbin = bodies::kerbin();
        let position = na::Vector3::new(kerbin.radius + 1000.0, 0.0, 0.0);
        let velocity = kerbin.surface_velocity_at(&position);
        let drag = drag_acceleration(&kerbin, 0.002, &position, &velocity);
        assert_abs_diff_eq!(drag.magnitude(), 0.0, epsilon = 1e-12);
    }
}
