use crate::config::DescentConfig;
use crate::gnc::guidance::deceleration::DescentSpeedPolicy;
use crate::models::body::CelestialBody;
use crate::models::state::VesselState;
use crate::physics::gravity::gravity_magnitude;
use nalgebra as na;

/// Time constant for cancelling horizontal velocity (s).
const LATERAL_KILL_TIME: f64 = 1.0;
/// Burns taper off once the remaining Δv drops below this many seconds of full thrust.
const BURN_TAPER_TIME: f64 = 1.0;
/// Vertical speed target grows by this much per metre of altitude in the final descent.
const FINAL_DESCENT_SPEED_GRADIENT: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeWarp {
    Allowed,
    Disabled,
}

/// Per-tick output of the guidance core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlCommand {
    /// Fraction of maximum thrust in [0, 1].
    pub throttle: f64,
    /// Unit vector the engine should point along, inertial frame.
    pub direction: na::Vector3<f64>,
    pub time_warp: TimeWarp,
}

impl ControlCommand {
    /// Engine off, pointing surface-retrograde, no time warp.
    pub fn safe_hold(vessel: &VesselState, body: &CelestialBody) -> Self {
        Self {
            throttle: 0.0,
            direction: surface_retrograde(vessel, body),
            time_warp: TimeWarp::Disabled,
        }
    }

    pub fn coast(direction: na::Vector3<f64>, time_warp: TimeWarp) -> Self {
        Self {
            throttle: 0.0,
            direction,
            time_warp,
        }
    }
}

/// Opposite the surface-relative velocity, or straight up when hovering.
pub fn surface_retrograde(vessel: &VesselState, body: &CelestialBody) -> na::Vector3<f64> {
    let surface_velocity = vessel.surface_velocity(body);
    if surface_velocity.norm() > 1e-6 {
        -surface_velocity.normalize()
    } else {
        vessel.up()
    }
}

pub fn local_gravity(vessel: &VesselState, body: &CelestialBody) -> f64 {
    gravity_magnitude(body.gravitational_parameter, vessel.position.magnitude())
}

/// Angle in degrees between the engine axis and `direction`.
pub fn heading_error_deg(vessel: &VesselState, direction: &na::Vector3<f64>) -> f64 {
    vessel.thrust_direction().angle(direction).to_degrees()
}

/// Throttle realising `acceleration` given the current engine axis; the component
/// along the axis is what the engine can deliver.
fn throttle_for(vessel: &VesselState, acceleration: &na::Vector3<f64>) -> f64 {
    if !(vessel.max_thrust_accel > 0.0) {
        return 0.0;
    }
    (acceleration.dot(&vessel.thrust_direction()) / vessel.max_thrust_accel).clamp(0.0, 1.0)
}

fn direction_or_up(vessel: &VesselState, acceleration: &na::Vector3<f64>) -> na::Vector3<f64> {
    if acceleration.norm() > 1e-9 {
        acceleration.normalize()
    } else {
        vessel.up()
    }
}

/// Impulsive burn of `delta_v`; the engine stays off until the heading is within tolerance.
pub fn burn_command(
    vessel: &VesselState,
    delta_v: &na::Vector3<f64>,
    config: &DescentConfig,
) -> ControlCommand {
    let magnitude = delta_v.magnitude();
    if magnitude == 0.0 || !(vessel.max_thrust_accel > 0.0) {
        return ControlCommand::coast(direction_or_up(vessel, delta_v), TimeWarp::Disabled);
    }
    let direction = delta_v / magnitude;
    let throttle = if heading_error_deg(vessel, &direction) > config.heading_tolerance_deg {
        0.0
    } else {
        (magnitude / (vessel.max_thrust_accel * BURN_TAPER_TIME)).clamp(0.0, 1.0)
    };
    ControlCommand {
        throttle,
        direction,
        time_warp: TimeWarp::Disabled,
    }
}

/// Brake along surface-retrograde to hold surface speed at the policy limit.
///
/// Thrust = gravity's share along the motion plus `(speed − limit) / τ`.
pub fn deceleration_command(
    vessel: &VesselState,
    body: &CelestialBody,
    policy: &dyn DescentSpeedPolicy,
    config: &DescentConfig,
) -> ControlCommand {
    let direction = surface_retrograde(vessel, body);
    let speed = vessel.surface_velocity(body).magnitude();
    let desired_speed = policy.max_allowed_speed(vessel.altitude(body));

    let descent_share = vessel.up().dot(&direction);
    let required = local_gravity(vessel, body) * descent_share
        + (speed - desired_speed) / config.speed_correction_time_constant;

    ControlCommand {
        throttle: throttle_for(vessel, &(direction * required.max(0.0))),
        direction,
        time_warp: TimeWarp::Disabled,
    }
}

/// Cancel horizontal surface velocity while holding against gravity.
pub fn kill_lateral_command(vessel: &VesselState, body: &CelestialBody) -> ControlCommand {
    let horizontal = vessel.horizontal_surface_velocity(body);
    let acceleration =
        vessel.up() * local_gravity(vessel, body) - horizontal / LATERAL_KILL_TIME;
    ControlCommand {
        throttle: throttle_for(vessel, &acceleration),
        direction: direction_or_up(vessel, &acceleration),
        time_warp: TimeWarp::Disabled,
    }
}

/// Vertical speed target for the last metres: `−(touchdown + 0.1·h)`.
pub fn final_descent_target_speed(altitude: f64, config: &DescentConfig) -> f64 {
    -(config.touchdown_speed + FINAL_DESCENT_SPEED_GRADIENT * altitude.max(0.0))
}

/// Track the final-descent vertical speed target and bleed off any drift.
pub fn final_descent_command(
    vessel: &VesselState,
    body: &CelestialBody,
    config: &DescentConfig,
) -> ControlCommand {
    let target = final_descent_target_speed(vessel.altitude(body), config);
    let vertical_speed = vessel.vertical_speed(body);
    let vertical = local_gravity(vessel, body)
        + (target - vertical_speed) / config.speed_correction_time_constant;

    let horizontal = vessel.horizontal_surface_velocity(body);
    let acceleration = vessel.up() * vertical.max(0.0) - horizontal / LATERAL_KILL_TIME;
    ControlCommand {
        throttle: throttle_for(vessel, &acceleration),
        direction: direction_or_up(vessel, &acceleration),
        time_warp: TimeWarp::Disabled,
    }
}
