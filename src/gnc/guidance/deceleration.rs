use crate::config::DescentConfig;
use crate::errors::{GuidanceError, GuidanceResult};
use crate::models::body::CelestialBody;
use crate::models::state::VesselState;

/// How fast the vehicle may be moving relative to the surface at a given altitude.
pub trait DescentSpeedPolicy {
    fn max_allowed_speed(&self, altitude: f64) -> f64;
}

/// Braking-limited speed: `0.8·sqrt(2·(a − g)·(h − h_end))`.
///
/// Only constructible when thrust acceleration exceeds surface gravity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoweredDescentSpeedPolicy {
    thrust_acceleration: f64,
    surface_gravity: f64,
    termination_altitude: f64,
}

impl PoweredDescentSpeedPolicy {
    pub const SAFETY_FACTOR: f64 = 0.8;

    pub fn new(
        thrust_acceleration: f64,
        surface_gravity: f64,
        termination_altitude: f64,
    ) -> GuidanceResult<Self> {
        if !(thrust_acceleration > surface_gravity) {
            return Err(GuidanceError::TooLittleThrustToLand {
                thrust_acceleration,
                surface_gravity,
            });
        }
        Ok(Self {
            thrust_acceleration,
            surface_gravity,
            termination_altitude,
        })
    }

    pub fn for_vessel(
        vessel: &VesselState,
        body: &CelestialBody,
        termination_altitude: f64,
    ) -> GuidanceResult<Self> {
        Self::new(vessel.max_thrust_accel, body.surface_gravity(), termination_altitude)
    }

    /// Net deceleration available against gravity.
    pub fn net_deceleration(&self) -> f64 {
        self.thrust_acceleration - self.surface_gravity
    }

    pub fn termination_altitude(&self) -> f64 {
        self.termination_altitude
    }
}

impl DescentSpeedPolicy for PoweredDescentSpeedPolicy {
    fn max_allowed_speed(&self, altitude: f64) -> f64 {
        let height = (altitude - self.termination_altitude).max(0.0);
        Self::SAFETY_FACTOR * (2.0 * self.net_deceleration() * height).sqrt()
    }
}

/// Which policy the reentry simulator should assume for a given body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpeedPolicy {
    /// Drag does the braking; the simulator never clamps.
    Unlimited,
    Powered(PoweredDescentSpeedPolicy),
}

impl SpeedPolicy {
    pub fn for_body(
        body: &CelestialBody,
        powered: PoweredDescentSpeedPolicy,
        config: &DescentConfig,
    ) -> Self {
        if body.has_atmosphere() && !config.powered_atmospheric_descent {
            SpeedPolicy::Unlimited
        } else {
            SpeedPolicy::Powered(powered)
        }
    }
}

impl DescentSpeedPolicy for SpeedPolicy {
    fn max_allowed_speed(&self, altitude: f64) -> f64 {
        match self {
            SpeedPolicy::Unlimited => f64::INFINITY,
            SpeedPolicy::Powered(policy) => policy.max_allowed_speed(altitude),
        }
    }
}
