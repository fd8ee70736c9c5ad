use crate::models::body::CelestialBody;
use crate::physics::gravity::gravity_magnitude;
use nalgebra as na;
use serde::{Deserialize, Serialize};

/// Isothermal exponential atmosphere with a hard ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Atmosphere {
    pub height: f64,
    pub surface_density: f64,
    pub scale_height: f64,
}

impl Atmosphere {
    pub fn new(height: f64, surface_density: f64, scale_height: f64) -> Self {
        Self {
            height,
            surface_density,
            scale_height,
        }
    }

    pub fn density(&self, altitude: f64) -> f64 {
        if altitude >= self.height {
            return 0.0;
        }
        self.surface_density * (-altitude.max(0.0) / self.scale_height).exp()
    }
}

/// Local conditions at a point above a body.
pub struct Environment {
    pub altitude: f64,
    pub density: f64,
    pub gravity: f64,
}

impl Environment {
    pub fn new(body: &CelestialBody, position: &na::Vector3<f64>) -> Self {
        let altitude = body.altitude(position);
        let density = body
            .atmosphere
            .map_or(0.0, |atmosphere| atmosphere.density(altitude));

        Environment {
            altitude,
            density,
            gravity: gravity_magnitude(body.gravitational_parameter, position.magnitude()),
        }
    }
}
