use crate::constants::TAU;
use crate::coordinates::coordinate_transformation::{
    body_fixed_to_geographic, body_fixed_to_inertial, geographic_to_body_fixed,
    inertial_to_body_fixed,
};
use crate::physics::environment::Atmosphere;
use nalgebra as na;

/// A spherical, uniformly rotating central body.
#[derive(Debug, Clone)]
pub struct CelestialBody {
    pub name: String,
    pub gravitational_parameter: f64,
    pub radius: f64,
    pub atmosphere: Option<Atmosphere>,
    /// Sidereal rotation period in seconds. Zero means the body does not rotate.
    pub rotation_period: f64,
    pub rotation_axis: na::Unit<na::Vector3<f64>>,
    /// Direction of 0° longitude at `t = 0`, perpendicular to the axis.
    pub prime_meridian: na::Unit<na::Vector3<f64>>,
    /// Rotation angle at `t = 0` in radians.
    pub initial_rotation: f64,
}

impl CelestialBody {
    pub fn new(name: &str, gravitational_parameter: f64, radius: f64, rotation_period: f64) -> Self {
        Self {
            name: name.to_string(),
            gravitational_parameter,
            radius,
            atmosphere: None,
            rotation_period,
            rotation_axis: na::Vector3::z_axis(),
            prime_meridian: na::Vector3::x_axis(),
            initial_rotation: 0.0,
        }
    }

    /// Builds a body from its surface gravity, deriving GM = g·R².
    pub fn from_surface_gravity(
        name: &str,
        surface_gravity: f64,
        radius: f64,
        rotation_period: f64,
    ) -> Self {
        Self::new(name, surface_gravity * radius * radius, radius, rotation_period)
    }

    pub fn with_atmosphere(mut self, atmosphere: Atmosphere) -> Self {
        self.atmosphere = Some(atmosphere);
        self
    }

    pub fn surface_gravity(&self) -> f64 {
        self.gravitational_parameter / (self.radius * self.radius)
    }

    pub fn altitude(&self, position: &na::Vector3<f64>) -> f64 {
        position.magnitude() - self.radius
    }

    pub fn has_atmosphere(&self) -> bool {
        self.atmosphere.is_some()
    }

    /// Altitude of the atmosphere ceiling; zero for airless bodies.
    pub fn atmosphere_height(&self) -> f64 {
        self.atmosphere.map_or(0.0, |atmosphere| atmosphere.height)
    }

    pub fn angular_velocity(&self) -> na::Vector3<f64> {
        if self.rotation_period == 0.0 {
            return na::Vector3::zeros();
        }
        self.rotation_axis.into_inner() * (TAU / self.rotation_period)
    }

    pub fn rotation_angle(&self, t: f64) -> f64 {
        if self.rotation_period == 0.0 {
            return self.initial_rotation;
        }
        self.initial_rotation + TAU * t / self.rotation_period
    }

    /// Inertial velocity of the co-rotating surface (and atmosphere) at `position`.
    pub fn surface_velocity_at(&self, position: &na::Vector3<f64>) -> na::Vector3<f64> {
        self.angular_velocity().cross(position)
    }

    /// Geographic latitude and longitude in degrees of an inertial position at time `t`.
    pub fn lat_lon(&self, position: &na::Vector3<f64>, t: f64) -> (f64, f64) {
        let fixed = inertial_to_body_fixed(self, position, t);
        let (latitude, longitude, _) = body_fixed_to_geographic(&fixed, self.radius);
        (latitude, longitude)
    }

    /// Inertial position of a point above the surface at time `t`.
    pub fn surface_position(
        &self,
        latitude: f64,
        longitude: f64,
        altitude: f64,
        t: f64,
    ) -> na::Vector3<f64> {
        let fixed = geographic_to_body_fixed(latitude, longitude, altitude, self.radius);
        body_fixed_to_inertial(self, &fixed, t)
    }
}
