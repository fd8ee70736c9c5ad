use crate::config::{DescentConfig, SimulationConfig};
use crate::constants::TAU;
use crate::errors::GuidanceResult;
use crate::gnc::guidance::targeting::TargetSite;
use crate::models::body::CelestialBody;
use crate::numerics::bisection::bisect;
use crate::physics::Orbit;
use nalgebra as na;

/// Retrograde horizontal Δv that lowers periapsis to `target_radius`.
///
/// Zero when the periapsis already lies at or below the target. Found by bisection on
/// the burn magnitude, so the result lands within `tolerance` (m/s) of the smallest
/// sufficient burn.
pub fn delta_v_to_change_periapsis(
    position: &na::Vector3<f64>,
    velocity: &na::Vector3<f64>,
    time: f64,
    gm: f64,
    target_radius: f64,
    tolerance: f64,
    max_iterations: usize,
) -> GuidanceResult<na::Vector3<f64>> {
    let orbit = Orbit::from_state(position, velocity, time, gm)?;
    if orbit.periapsis_radius() <= target_radius {
        return Ok(na::Vector3::zeros());
    }

    let up = position.normalize();
    let horizontal = velocity - up * velocity.dot(&up);
    let horizontal_speed = horizontal.magnitude();
    let retrograde = -horizontal / horizontal_speed;

    let low_enough = |burn: f64| match Orbit::from_state(position, &(velocity + retrograde * burn), time, gm) {
        Ok(orbit) => orbit.periapsis_radius() <= target_radius,
        // With all horizontal speed gone the fall is radial
        Err(_) => true,
    };

    let bracket = bisect(0.0, horizontal_speed, tolerance, max_iterations, low_enough);
    Ok(retrograde * bracket.hi)
}

/// Angle in degrees, measured in the direction of motion, by which the target leads
/// the vessel around the orbit. In `[0, 360)`.
pub fn target_lead_angle(
    position: &na::Vector3<f64>,
    velocity: &na::Vector3<f64>,
    body: &CelestialBody,
    target: &TargetSite,
    time: f64,
) -> f64 {
    let normal = position.cross(velocity).normalize();
    let site = body.surface_position(target.latitude, target.longitude, 0.0, time);
    let in_plane = site - normal * site.dot(&normal);

    let from = position.normalize();
    let to = in_plane.normalize();
    let angle = normal.dot(&from.cross(&to)).atan2(from.dot(&to));
    angle.rem_euclid(TAU).to_degrees()
}

/// Decides when and how hard to burn out of orbit.
pub struct DeorbitPlanner {
    target_radius: f64,
    lead_angle_deg: f64,
    phase_tolerance_deg: f64,
    tolerance: f64,
    max_iterations: usize,
}

impl DeorbitPlanner {
    pub fn new(body: &CelestialBody, descent: &DescentConfig, simulation: &SimulationConfig) -> Self {
        Self {
            target_radius: body.radius * (1.0 + descent.deorbit_periapsis_fraction),
            lead_angle_deg: descent.deorbit_lead_angle_deg,
            phase_tolerance_deg: descent.deorbit_phase_tolerance_deg,
            tolerance: simulation.bisection_tolerance,
            max_iterations: simulation.bisection_max_iterations,
        }
    }

    pub fn target_radius(&self) -> f64 {
        self.target_radius
    }

    pub fn delta_v(
        &self,
        position: &na::Vector3<f64>,
        velocity: &na::Vector3<f64>,
        time: f64,
        body: &CelestialBody,
    ) -> GuidanceResult<na::Vector3<f64>> {
        delta_v_to_change_periapsis(
            position,
            velocity,
            time,
            body.gravitational_parameter,
            self.target_radius,
            self.tolerance,
            self.max_iterations,
        )
    }

    /// Whether the target sits at the configured lead angle ahead of the vessel.
    pub fn in_ignition_window(
        &self,
        position: &na::Vector3<f64>,
        velocity: &na::Vector3<f64>,
        body: &CelestialBody,
        target: &TargetSite,
        time: f64,
    ) -> bool {
        let lead = target_lead_angle(position, velocity, body, target, time);
        let offset = (lead - self.lead_angle_deg + 180.0).rem_euclid(360.0) - 180.0;
        offset.abs() <= self.phase_tolerance_deg
    }
}
