use csv::Writer;
use hifitime::{Duration, Epoch};
use nalgebra as na;
use serde::Serialize;
use std::error::Error;
use std::fs::{self, File};
use std::path::Path;
use touchdown::config::{bodies, lander::SimpleLander, GuidanceConfig};
use touchdown::coordinates::coordinate_transformation::great_circle_distance;
use touchdown::fsm::{DescentState, DescentStateMachine};
use touchdown::gnc::control::DirectionController;
use touchdown::gnc::guidance::{ControlCommand, TargetSite, TimeWarp};
use touchdown::integrators::rk4::RK4;
use touchdown::models::{CelestialBody, VesselState};
use touchdown::physics::dynamics::DescentDynamics;

/// Largest angular acceleration the reaction wheels can produce (rad/s²).
const MAX_ANGULAR_ACCELERATION: f64 = 2.0;
const CONTROL_DT: f64 = 0.1;
const WARP_DT: f64 = 1.0;
const MAX_MISSION_TIME: f64 = 20_000.0;

#[derive(Serialize)]
struct TelemetryRow {
    #[serde(rename = "UTC Time")]
    utc: String,
    #[serde(rename = "Time (s)")]
    time: f64,
    #[serde(rename = "Phase")]
    phase: String,
    #[serde(rename = "Altitude (m)")]
    altitude: f64,
    #[serde(rename = "Latitude (deg)")]
    latitude: f64,
    #[serde(rename = "Longitude (deg)")]
    longitude: f64,
    #[serde(rename = "Surface Speed (m/s)")]
    surface_speed: f64,
    #[serde(rename = "Vertical Speed (m/s)")]
    vertical_speed: f64,
    #[serde(rename = "Throttle")]
    throttle: f64,
    #[serde(rename = "Predicted Latitude (deg)")]
    predicted_latitude: Option<f64>,
    #[serde(rename = "Predicted Longitude (deg)")]
    predicted_longitude: Option<f64>,
    #[serde(rename = "Landing Error (m)")]
    landing_error: Option<f64>,
}

/// Advance the vehicle by `dt` under `command`: RK4 for translation, a rate-limited
/// rigid-body model for attitude. Attitude is frozen while time-warping.
fn step_vessel(
    vessel: &mut VesselState,
    body: &CelestialBody,
    command: &ControlCommand,
    controller: &DirectionController,
    dt: f64,
) {
    if command.time_warp == TimeWarp::Disabled {
        let outputs =
            controller.compute_control(&command.direction, &vessel.attitude, &vessel.angular_velocity);
        vessel.angular_velocity += outputs.as_vector() * (MAX_ANGULAR_ACCELERATION * dt);
        vessel.attitude *= na::UnitQuaternion::from_scaled_axis(vessel.angular_velocity * dt);
    }

    let thrust = vessel.thrust_direction() * (command.throttle * vessel.max_thrust_accel);
    let integrator = RK4::new(DescentDynamics::new(
        body,
        vessel.drag_coefficient_over_mass,
        Some(thrust),
    ));
    let next = integrator.integrate(&vessel.state_vector(), dt);
    vessel.position = next.position;
    vessel.velocity = next.velocity;
    vessel.universal_time += dt;
    vessel.dt = dt;

    if vessel.altitude(body) <= 0.0 {
        vessel.position = vessel.up() * body.radius;
        vessel.velocity = body.surface_velocity_at(&vessel.position);
        vessel.angular_velocity = na::Vector3::zeros();
        vessel.landed = true;
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    touchdown::logger::init()?;

    let body = bodies::kerbin();
    let target = TargetSite::new(-0.0972, -74.5575);

    // 100 km circular equatorial parking orbit
    let r = body.radius + 100_000.0;
    let v = (body.gravitational_parameter / r).sqrt();
    let mut vessel = VesselState::new(
        &SimpleLander,
        na::Vector3::new(r, 0.0, 0.0),
        na::Vector3::new(0.0, v, 0.0),
        0.0,
        CONTROL_DT,
    );

    let config = GuidanceConfig::default();
    let controller = DirectionController::from_config(&config.attitude);
    let mut guidance = DescentStateMachine::new(config)?.with_target(target);

    let start_time = Epoch::from_gregorian_utc(2024, 3, 15, 0, 0, 0, 0);

    let output_dir = Path::new("output");
    fs::create_dir_all(output_dir)?;
    let file = File::create(output_dir.join("descent_telemetry.csv"))?;
    let mut writer = Writer::from_writer(file);

    log::info!(
        "Descending to {} target ({:.4}°, {:.4}°) from a {:.0} km orbit",
        body.name,
        target.latitude,
        target.longitude,
        (r - body.radius) / 1000.0
    );

    let mut tick: u64 = 0;
    let mut last_phase = None;
    while !vessel.landed && vessel.universal_time < MAX_MISSION_TIME {
        let command = guidance.tick(&vessel, &body);
        let phase = guidance.current_phase();

        if tick % 50 == 0 || last_phase != Some(phase) {
            let (latitude, longitude) = body.lat_lon(&vessel.position, vessel.universal_time);
            let predicted = guidance
                .latest_prediction()
                .and_then(|result| result.landing_site().copied());
            let epoch = start_time + Duration::from_seconds(vessel.universal_time);
            writer.serialize(TelemetryRow {
                utc: epoch.to_string(),
                time: vessel.universal_time,
                phase: phase.to_string(),
                altitude: vessel.altitude(&body),
                latitude,
                longitude,
                surface_speed: vessel.surface_velocity(&body).magnitude(),
                vertical_speed: vessel.vertical_speed(&body),
                throttle: command.throttle,
                predicted_latitude: predicted.map(|site| site.latitude),
                predicted_longitude: predicted.map(|site| site.longitude),
                landing_error: guidance.last_landing_error(),
            })?;
        }
        last_phase = Some(phase);

        let dt = match command.time_warp {
            TimeWarp::Allowed => WARP_DT,
            TimeWarp::Disabled => CONTROL_DT,
        };
        step_vessel(&mut vessel, &body, &command, &controller, dt);
        tick += 1;
    }
    // One last tick so the state machine registers touchdown
    guidance.tick(&vessel, &body);
    writer.flush()?;

    if guidance.current_phase() == DescentState::Landed {
        let site = body.lat_lon(&vessel.position, vessel.universal_time);
        let miss = great_circle_distance(site, target.lat_lon(), body.radius);
        log::info!(
            "Touchdown at ({:.4}°, {:.4}°) after {:.0} s, {:.0} m from target",
            site.0,
            site.1,
            vessel.universal_time,
            miss
        );
    } else if vessel.landed {
        log::warn!("Surface contact during {}", guidance.current_phase());
    } else {
        log::warn!(
            "Mission time exhausted in phase {} at {:.0} m altitude",
            guidance.current_phase(),
            vessel.altitude(&body)
        );
    }
    Ok(())
}
