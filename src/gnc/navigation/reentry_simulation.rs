use super::prediction::{LandingPrediction, LandingSite, SimulationResult, TrajectoryPoint};
use crate::config::SimulationConfig;
use crate::gnc::guidance::deceleration::DescentSpeedPolicy;
use crate::integrators::rk4::RK4;
use crate::models::body::CelestialBody;
use crate::models::state::StateVector;
use crate::numerics::bisection::bisect;
use crate::physics::dynamics::DescentDynamics;
use crate::physics::Orbit;
use nalgebra as na;

/// Integration starts once the surface speed exceeds this share of the policy limit.
const POLICY_ENGAGE_FRACTION: f64 = 0.9;

/// Predicts where a ballistic (or policy-braked) descent from a given state ends.
///
/// A run first skips the vacuum part of the trajectory analytically, then integrates
/// gravity and drag with RK4 while clamping the surface speed to the policy limit.
pub struct ReentrySimulation<'a> {
    body: &'a CelestialBody,
    policy: &'a dyn DescentSpeedPolicy,
    drag_coefficient_over_mass: f64,
    termination_altitude: f64,
    config: &'a SimulationConfig,
}

enum FreeFall {
    Reaches { state: StateVector, time: f64 },
    NeverReenters,
}

enum LegOutcome {
    Landed(LandingSite),
    LeftAtmosphere,
    TimedOut,
}

#[derive(Default)]
struct RunLog {
    steps: usize,
    skips: usize,
    integrated_time: f64,
    max_drag_gees: f64,
    integration_start_time: Option<f64>,
    trajectory: Vec<TrajectoryPoint>,
}

impl<'a> ReentrySimulation<'a> {
    pub fn new(
        body: &'a CelestialBody,
        policy: &'a dyn DescentSpeedPolicy,
        drag_coefficient_over_mass: f64,
        termination_altitude: f64,
        config: &'a SimulationConfig,
    ) -> Self {
        Self {
            body,
            policy,
            drag_coefficient_over_mass,
            termination_altitude,
            config,
        }
    }

    pub fn body(&self) -> &CelestialBody {
        self.body
    }

    /// Simulate from `start` at `start_time` with `velocity_offset` added to the velocity.
    pub fn run(
        &self,
        start: &StateVector,
        start_time: f64,
        velocity_offset: &na::Vector3<f64>,
    ) -> SimulationResult {
        let mut state = StateVector::new(start.position, start.velocity + velocity_offset);
        let mut time = start_time;
        let mut log = RunLog::default();

        let prediction = loop {
            match self.project_free_fall(&state, time) {
                FreeFall::NeverReenters => break LandingPrediction::NoReentry,
                FreeFall::Reaches {
                    state: entry,
                    time: entry_time,
                } => {
                    state = entry;
                    time = entry_time;
                }
            }
            log.integration_start_time.get_or_insert(time);

            match self.integrate(&mut state, &mut time, &mut log) {
                LegOutcome::Landed(site) => break LandingPrediction::Landed(site),
                LegOutcome::TimedOut => break LandingPrediction::TimedOut,
                LegOutcome::LeftAtmosphere => {
                    let orbit = Orbit::from_state(
                        &state.position,
                        &state.velocity,
                        time,
                        self.body.gravitational_parameter,
                    );
                    let ceiling = self.body.radius + self.body.atmosphere_height();
                    let may_skip = log.skips < self.config.max_skips;
                    match orbit {
                        Ok(orbit) if may_skip && orbit.periapsis_radius() < ceiling => {
                            log.skips += 1;
                            log::debug!("atmospheric skip {} at t={:.1}s", log.skips, time);
                        }
                        Ok(orbit) => {
                            break LandingPrediction::Aerobraked {
                                apoapsis_altitude: orbit.apoapsis_radius() - self.body.radius,
                                periapsis_altitude: orbit.periapsis_radius() - self.body.radius,
                            }
                        }
                        Err(_) => break LandingPrediction::NoReentry,
                    }
                }
            }
        };

        log::debug!(
            "reentry simulation: {} after {} steps ({} skips)",
            prediction,
            log.steps,
            log.skips
        );

        SimulationResult {
            prediction,
            start_time,
            integration_start_time: log.integration_start_time,
            end_time: time,
            steps: log.steps,
            skips: log.skips,
            max_drag_gees: log.max_drag_gees,
            trajectory: log.trajectory,
        }
    }

    /// Whether the state is low or fast enough that the analytic orbit no longer applies.
    fn needs_integration(&self, position: &na::Vector3<f64>, velocity: &na::Vector3<f64>) -> bool {
        let altitude = self.body.altitude(position);
        if altitude < self.body.atmosphere_height() || altitude < self.termination_altitude {
            return true;
        }
        let surface_speed = (velocity - self.body.surface_velocity_at(position)).magnitude();
        surface_speed > POLICY_ENGAGE_FRACTION * self.policy.max_allowed_speed(altitude)
    }

    fn project_free_fall(&self, state: &StateVector, time: f64) -> FreeFall {
        let reached_now = FreeFall::Reaches {
            state: *state,
            time,
        };
        if self.needs_integration(&state.position, &state.velocity) {
            return reached_now;
        }
        let orbit = match Orbit::from_state(
            &state.position,
            &state.velocity,
            time,
            self.body.gravitational_parameter,
        ) {
            Ok(orbit) => orbit,
            // Radial and parabolic motion: let the integrator carry it.
            Err(_) => return reached_now,
        };

        let horizon = orbit.time_to_periapsis(time);
        if !(horizon > 0.0) {
            return FreeFall::NeverReenters;
        }
        let periapsis_time = time + horizon;
        let (position, velocity) = orbit.state_at_time(periapsis_time);
        if !self.needs_integration(&position, &velocity) {
            return FreeFall::NeverReenters;
        }

        let bracket = bisect(
            time,
            periapsis_time,
            self.config.bisection_tolerance,
            self.config.bisection_max_iterations,
            |t| {
                let (p, v) = orbit.state_at_time(t);
                self.needs_integration(&p, &v)
            },
        );
        let (position, velocity) = orbit.state_at_time(bracket.lo);
        FreeFall::Reaches {
            state: StateVector::new(position, velocity),
            time: bracket.lo,
        }
    }

    fn integrate(&self, state: &mut StateVector, time: &mut f64, log: &mut RunLog) -> LegOutcome {
        let rk4 = RK4::new(DescentDynamics::new(
            self.body,
            self.drag_coefficient_over_mass,
            None,
        ));
        let dt = self.config.dt;
        let surface_gravity = self.body.surface_gravity();
        let ceiling = self.body.atmosphere_height();
        let mut inside_atmosphere = self.body.altitude(&state.position) < ceiling;

        loop {
            if log.integrated_time >= self.config.max_simulated_time {
                return LegOutcome::TimedOut;
            }

            let previous = *state;
            let previous_time = *time;
            *state = rk4.integrate(state, dt);
            *time += dt;
            log.integrated_time += dt;
            log.steps += 1;

            self.limit_surface_speed(state);

            let drag_gees = rk4.dynamics().drag(state).magnitude() / surface_gravity;
            log.max_drag_gees = log.max_drag_gees.max(drag_gees);

            let altitude = self.body.altitude(&state.position);
            if self.config.record_trajectory && log.steps % self.config.trajectory_stride.max(1) == 0 {
                log.trajectory.push(self.trajectory_point(state, *time, altitude));
            }

            if altitude < self.termination_altitude {
                return LegOutcome::Landed(self.interpolate_landing(
                    &previous,
                    previous_time,
                    state,
                    log.max_drag_gees,
                ));
            }

            if self.body.has_atmosphere() {
                let climbing = state.position.dot(&state.velocity) > 0.0;
                if altitude < ceiling {
                    inside_atmosphere = true;
                } else if inside_atmosphere && climbing {
                    return LegOutcome::LeftAtmosphere;
                }
            }
        }
    }

    /// Scale the surface-relative velocity down to the policy limit, keeping its direction.
    fn limit_surface_speed(&self, state: &mut StateVector) {
        let altitude = self.body.altitude(&state.position);
        let max_speed = self.policy.max_allowed_speed(altitude);
        let co_rotation = self.body.surface_velocity_at(&state.position);
        let surface_velocity = state.velocity - co_rotation;
        let speed = surface_velocity.magnitude();
        if speed > max_speed {
            state.velocity = co_rotation + surface_velocity * (max_speed / speed);
        }
    }

    fn interpolate_landing(
        &self,
        previous: &StateVector,
        previous_time: f64,
        current: &StateVector,
        max_drag_gees: f64,
    ) -> LandingSite {
        let previous_altitude = self.body.altitude(&previous.position);
        let current_altitude = self.body.altitude(&current.position);
        let drop = previous_altitude - current_altitude;
        let fraction = if drop > 0.0 {
            ((previous_altitude - self.termination_altitude) / drop).clamp(0.0, 1.0)
        } else {
            1.0
        };

        let position = previous.position.lerp(&current.position, fraction);
        let time = previous_time + fraction * self.config.dt;
        let (latitude, longitude) = self.body.lat_lon(&position, time);
        LandingSite {
            latitude,
            longitude,
            time,
            max_drag_gees,
        }
    }

    fn trajectory_point(&self, state: &StateVector, time: f64, altitude: f64) -> TrajectoryPoint {
        let (latitude, longitude) = self.body.lat_lon(&state.position, time);
        TrajectoryPoint {
            time,
            latitude,
            longitude,
            altitude,
            surface_speed: (state.velocity - self.body.surface_velocity_at(&state.position))
                .magnitude(),
        }
    }
}
