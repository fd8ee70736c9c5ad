use crate::models::body::CelestialBody;
use nalgebra as na;

/// Rotate an inertial position into the body-fixed frame at time `t`.
///
/// Components are along the prime meridian, `axis × meridian` and the rotation axis.
pub fn inertial_to_body_fixed(
    body: &CelestialBody,
    position: &na::Vector3<f64>,
    t: f64,
) -> na::Vector3<f64> {
    let rotation = na::Rotation3::from_axis_angle(&body.rotation_axis, -body.rotation_angle(t));
    let rotated = rotation * position;
    let (x_axis, y_axis, z_axis) = body_axes(body);
    na::Vector3::new(rotated.dot(&x_axis), rotated.dot(&y_axis), rotated.dot(&z_axis))
}

pub fn body_fixed_to_inertial(
    body: &CelestialBody,
    fixed: &na::Vector3<f64>,
    t: f64,
) -> na::Vector3<f64> {
    let (x_axis, y_axis, z_axis) = body_axes(body);
    let unrotated = x_axis * fixed.x + y_axis * fixed.y + z_axis * fixed.z;
    na::Rotation3::from_axis_angle(&body.rotation_axis, body.rotation_angle(t)) * unrotated
}

fn body_axes(body: &CelestialBody) -> (na::Vector3<f64>, na::Vector3<f64>, na::Vector3<f64>) {
    let z_axis = body.rotation_axis.into_inner();
    let x_axis = body.prime_meridian.into_inner();
    let y_axis = z_axis.cross(&x_axis);
    (x_axis, y_axis, z_axis)
}

/// Convert body-fixed Cartesian to spherical geographic coordinates.
/// Returns (latitude deg, longitude deg, altitude m).
pub fn body_fixed_to_geographic(pos: &na::Vector3<f64>, radius: f64) -> (f64, f64, f64) {
    let r = pos.magnitude();
    if r < 1e-10 {
        return (0.0, 0.0, -radius);
    }

    let latitude = (pos.z / r).clamp(-1.0, 1.0).asin();
    let longitude = pos.y.atan2(pos.x);

    (latitude.to_degrees(), longitude.to_degrees(), r - radius)
}

pub fn geographic_to_body_fixed(
    latitude: f64,
    longitude: f64,
    altitude: f64,
    radius: f64,
) -> na::Vector3<f64> {
    unit_vector_from_lat_lon(latitude, longitude) * (radius + altitude)
}

pub fn unit_vector_from_lat_lon(latitude: f64, longitude: f64) -> na::Vector3<f64> {
    let (sin_lat, cos_lat) = latitude.to_radians().sin_cos();
    let (sin_lon, cos_lon) = longitude.to_radians().sin_cos();
    na::Vector3::new(cos_lat * cos_lon, cos_lat * sin_lon, sin_lat)
}

/// Locally flat (north, east) offset in metres from `from` to `to`, both given as
/// (latitude, longitude) in degrees on a sphere of `radius`.
///
/// The sphere is rotated so that `from` sits on the pole with local north along -x and
/// local east along +y, then `to` is projected onto the equatorial plane. Both rotations
/// stay well-defined at the geographic poles.
pub fn local_separation(from: (f64, f64), to: (f64, f64), radius: f64) -> na::Vector2<f64> {
    let q = unit_vector_from_lat_lon(to.0, to.1);

    let to_prime_meridian =
        na::Rotation3::from_axis_angle(&na::Vector3::z_axis(), -from.1.to_radians());
    let to_pole =
        na::Rotation3::from_axis_angle(&na::Vector3::y_axis(), (from.0 - 90.0).to_radians());
    let projected = to_pole * to_prime_meridian * q;

    na::Vector2::new(-projected.x, projected.y) * radius
}

pub fn great_circle_distance(from: (f64, f64), to: (f64, f64), radius: f64) -> f64 {
    let p = unit_vector_from_lat_lon(from.0, from.1);
    let q = unit_vector_from_lat_lon(to.0, to.1);
    p.cross(&q).magnitude().atan2(p.dot(&q)) * radius
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use test_case::test_case;

    const RADIUS: f64 = 200_000.0;

    #[test_case((0.0, 0.0), (0.01, 0.0), 1.0, 0.0; "due north on the equator")]
    #[test_case((0.0, 0.0), (0.0, 0.01), 0.0, 1.0; "due east on the equator")]
    #[test_case((45.0, 30.0), (44.99, 30.0), -1.0, 0.0; "due south at mid latitude")]
    fn separation_directions(from: (f64, f64), to: (f64, f64), north: f64, east: f64) {
        let separation = local_separation(from, to, RADIUS);
        let distance = great_circle_distance(from, to, RADIUS);
        assert_abs_diff_eq!(separation.x, north * distance, epsilon = 0.5);
        assert_abs_diff_eq!(separation.y.abs(), east.abs() * distance, epsilon = 0.5);
        assert!(separation.y * east >= 0.0);
    }

    #[test]
    fn separation_is_finite_at_both_poles() {
        for pole in [90.0, -90.0] {
            let separation = local_separation((pole, 0.0), (pole - pole.signum(), 45.0), RADIUS);
            assert!(separation.x.is_finite() && separation.y.is_finite());
            let expected = great_circle_distance((pole, 0.0), (pole - pole.signum(), 45.0), RADIUS);
            assert_abs_diff_eq!(separation.magnitude(), expected, epsilon = expected * 1e-3);
        }
    }

    #[test]
    fn separation_to_self_is_zero() {
        let separation = local_separation((-33.0, 151.0), (-33.0, 151.0), RADIUS);
        assert_abs_diff_eq!(separation.magnitude(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn geographic_round_trip() {
        let fixed = geographic_to_body_fixed(12.0, -77.0, 350.0, RADIUS);
        let (lat, lon, alt) = body_fixed_to_geographic(&fixed, RADIUS);
        assert_abs_diff_eq!(lat, 12.0, epsilon = 1e-10);
        assert_abs_diff_eq!(lon, -77.0, epsilon = 1e-10);
        assert_abs_diff_eq!(alt, 350.0, epsilon = 1e-6);
    }
}
