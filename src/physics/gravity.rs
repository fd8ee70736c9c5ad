use nalgebra as na;

/// Point-mass gravitational acceleration at `position` around a body with parameter `gm`.
pub fn gravity_acceleration(gm: f64, position: &na::Vector3<f64>) -> na::Vector3<f64> {
    let r: f64 = position.magnitude();
    if r == 0.0 {
        return na::Vector3::zeros();
    }
    position * (-gm / (r * r * r))
}

pub fn gravity_magnitude(gm: f64, r: f64) -> f64 {
    gm / (r * r)
}
