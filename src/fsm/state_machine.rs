use super::descent_states::DescentState;
use crate::config::GuidanceConfig;
use crate::coordinates::coordinate_transformation::great_circle_distance;
use crate::errors::GuidanceResult;
use crate::gnc::guidance::deceleration::{DescentSpeedPolicy, PoweredDescentSpeedPolicy, SpeedPolicy};
use crate::gnc::guidance::deorbit::DeorbitPlanner;
use crate::gnc::guidance::descent_laws::{self, ControlCommand, TimeWarp};
use crate::gnc::guidance::targeting::{
    TargetSite, TargetingCorrector, TargetingOutcome, VelocityCorrection,
};
use crate::gnc::navigation::{LandingPredictor, ReentrySimulation, SimulationResult};
use crate::models::body::CelestialBody;
use crate::models::state::VesselState;
use crate::physics::Orbit;
use nalgebra as na;
use std::rc::Rc;
use std::time::Instant;

const SAFE_SPEED_FRACTION: f64 = 0.8;
const OFF_COURSE_FACTOR: f64 = 2.0;
/// Outstanding corrections smaller than this are not flown (m/s).
const MIN_CORRECTION_DV: f64 = 0.01;

fn build_simulation<'a>(
    body: &'a CelestialBody,
    policy: &'a SpeedPolicy,
    vessel: &VesselState,
    config: &'a GuidanceConfig,
) -> ReentrySimulation<'a> {
    ReentrySimulation::new(
        body,
        policy,
        vessel.drag_coefficient_over_mass,
        config.descent.termination_altitude,
        &config.simulation,
    )
}

/// Run the baseline prediction plus the corrector's perturbed runs, then publish the
/// baseline with the cost of the whole solve charged to the throttle.
fn solve_correction(
    corrector: &mut TargetingCorrector,
    predictor: &mut LandingPredictor,
    simulation: &ReentrySimulation,
    vessel: &VesselState,
    target: &TargetSite,
    choose_direction: bool,
) -> TargetingOutcome {
    let started = Instant::now();
    let state = vessel.state_vector();
    let time = vessel.universal_time;
    let baseline = simulation.run(&state, time, &na::Vector3::zeros());
    let outcome = corrector.compute(simulation, &baseline, &state, time, target, choose_direction);
    predictor.publish(baseline, started.elapsed());
    outcome
}

/// Runs the landing sequence and emits one [`ControlCommand`] per control tick.
pub struct DescentStateMachine {
    config: GuidanceConfig,
    current_state: DescentState,
    target: Option<TargetSite>,
    targeting_enabled: bool,
    predictor: LandingPredictor,
    corrector: TargetingCorrector,
    correction: Option<VelocityCorrection>,
    last_command: Option<ControlCommand>,
    last_landing_error: Option<f64>,
    lateral_reference: Option<na::Vector3<f64>>,
    deorbit_ignited: bool,
    engaged_body: Option<String>,
    ticks: u64,
    too_little_thrust_to_land: bool,
    last_state_change: f64,
}

impl DescentStateMachine {
    pub fn new(config: GuidanceConfig) -> GuidanceResult<Self> {
        config.validate()?;
        Ok(Self {
            predictor: LandingPredictor::new(config.simulation.throttle_factor),
            corrector: TargetingCorrector::new(config.targeting.clone()),
            config,
            current_state: DescentState::DeorbitBurn,
            target: None,
            targeting_enabled: false,
            correction: None,
            last_command: None,
            last_landing_error: None,
            lateral_reference: None,
            deorbit_ignited: false,
            engaged_body: None,
            ticks: 0,
            too_little_thrust_to_land: false,
            last_state_change: 0.0,
        })
    }

    pub fn with_target(mut self, target: TargetSite) -> Self {
        self.set_target(Some(target));
        self
    }

    /// Replace the landing target. Setting a target re-enables automatic targeting.
    pub fn set_target(&mut self, target: Option<TargetSite>) {
        self.target = target;
        self.targeting_enabled = target.is_some();
        self.correction = None;
        self.last_landing_error = None;
        self.corrector.reset();
    }

    pub fn target(&self) -> Option<TargetSite> {
        self.target
    }

    pub fn targeting_enabled(&self) -> bool {
        self.targeting_enabled
    }

    pub fn config(&self) -> &GuidanceConfig {
        &self.config
    }

    pub fn current_phase(&self) -> DescentState {
        self.current_state
    }

    pub fn last_state_change(&self) -> f64 {
        self.last_state_change
    }

    pub fn too_little_thrust_to_land(&self) -> bool {
        self.too_little_thrust_to_land
    }

    pub fn latest_prediction(&self) -> Option<Rc<SimulationResult>> {
        self.predictor.latest()
    }

    pub fn active_correction(&self) -> Option<&VelocityCorrection> {
        self.correction.as_ref()
    }

    /// Great-circle distance between the last predicted landing site and the target (m).
    pub fn last_landing_error(&self) -> Option<f64> {
        self.last_landing_error
    }

    /// Run a fresh reentry prediction from the vessel's current state.
    pub fn predict(
        &mut self,
        vessel: &VesselState,
        body: &CelestialBody,
    ) -> GuidanceResult<Rc<SimulationResult>> {
        let (_, policy) = self.speed_policies(vessel, body)?;
        let simulation = build_simulation(body, &policy, vessel, &self.config);
        Ok(self.predictor.predict_now(&simulation, vessel))
    }

    /// Solve for the velocity change that puts the landing site on `target`.
    pub fn correction(
        &mut self,
        vessel: &VesselState,
        body: &CelestialBody,
        target: &TargetSite,
    ) -> GuidanceResult<TargetingOutcome> {
        let (_, policy) = self.speed_policies(vessel, body)?;
        let simulation = build_simulation(body, &policy, vessel, &self.config);
        Ok(solve_correction(
            &mut self.corrector,
            &mut self.predictor,
            &simulation,
            vessel,
            target,
            true,
        ))
    }

    pub fn tick(&mut self, vessel: &VesselState, body: &CelestialBody) -> ControlCommand {
        self.ticks += 1;
        self.engage(vessel, body);
        self.account_for_thrust(vessel);

        let mut command = self.evaluate(vessel, body);
        if command.throttle > 0.0 || !self.current_state.permits_time_warp() {
            command.time_warp = TimeWarp::Disabled;
        }
        self.last_command = Some(command);
        command
    }

    fn transition_to(&mut self, new_state: DescentState, time: f64) {
        if self.current_state != new_state {
            log::info!(
                "State transition at t={:.2}s: {} -> {}",
                time,
                self.current_state,
                new_state
            );
            self.current_state = new_state;
            self.last_state_change = time;
        }
    }

    fn active_target(&self) -> Option<TargetSite> {
        self.target.filter(|_| self.targeting_enabled)
    }

    fn speed_policies(
        &self,
        vessel: &VesselState,
        body: &CelestialBody,
    ) -> GuidanceResult<(PoweredDescentSpeedPolicy, SpeedPolicy)> {
        let powered =
            PoweredDescentSpeedPolicy::for_vessel(vessel, body, self.config.descent.termination_altitude)?;
        Ok((powered, SpeedPolicy::for_body(body, powered, &self.config.descent)))
    }

    /// Pick the starting phase on first contact with a reference body.
    fn engage(&mut self, vessel: &VesselState, body: &CelestialBody) {
        if self.engaged_body.as_deref() == Some(body.name.as_str()) {
            return;
        }
        if let Some(previous) = self.engaged_body.replace(body.name.clone()) {
            log::info!("Reference body changed from {} to {}", previous, body.name);
        }
        self.predictor.invalidate();
        self.corrector.reset();
        self.correction = None;
        self.lateral_reference = None;
        self.deorbit_ignited = false;

        let initial = self.initial_phase(vessel, body);
        log::info!("Descent guidance engaged over {} in {}", body.name, initial);
        self.current_state = initial;
        self.last_state_change = vessel.universal_time;
    }

    fn initial_phase(&self, vessel: &VesselState, body: &CelestialBody) -> DescentState {
        if vessel.landed {
            return DescentState::Landed;
        }
        match Orbit::from_state(
            &vessel.position,
            &vessel.velocity,
            vessel.universal_time,
            body.gravitational_parameter,
        ) {
            Ok(orbit) if orbit.periapsis_radius() - body.radius > body.atmosphere_height() => {
                DescentState::DeorbitBurn
            }
            _ => DescentState::CourseCorrecting,
        }
    }

    /// Book the velocity change flown since the last tick against the open correction.
    fn account_for_thrust(&mut self, vessel: &VesselState) {
        let throttle = match self.last_command {
            Some(command) => command.throttle,
            None => return,
        };
        if throttle <= 0.0 {
            return;
        }
        if let Some(correction) = self.correction.as_mut() {
            let applied =
                vessel.thrust_direction() * (throttle * vessel.max_thrust_accel * vessel.dt);
            correction.apply_impulse(&applied);
        }
    }

    fn evaluate(&mut self, vessel: &VesselState, body: &CelestialBody) -> ControlCommand {
        if self.current_state == DescentState::Landed {
            return Self::landed_command(vessel);
        }

        let (powered, policy) = match self.speed_policies(vessel, body) {
            Ok(policies) => {
                if self.too_little_thrust_to_land {
                    log::info!("Thrust is sufficient to land again");
                }
                self.too_little_thrust_to_land = false;
                policies
            }
            Err(err) => {
                if !self.too_little_thrust_to_land {
                    log::error!("{err}; holding with the engine off");
                }
                self.too_little_thrust_to_land = true;
                return ControlCommand::safe_hold(vessel, body);
            }
        };

        match self.current_state {
            DescentState::DeorbitBurn => self.deorbit_burn(vessel, body),
            DescentState::CourseCorrecting => self.course_correcting(vessel, body, &powered, &policy),
            DescentState::OnCourse => self.on_course(vessel, body, &powered, &policy),
            DescentState::Decelerating => self.decelerating(vessel, body, &powered, &policy),
            DescentState::KillingLateralVelocity => self.killing_lateral_velocity(vessel, body),
            DescentState::FinalDescent => self.final_descent(vessel, body),
            DescentState::Landed => Self::landed_command(vessel),
        }
    }

    /// Surface speed comfortably under the braking limit, and high enough up.
    fn safe_to_correct(&self, vessel: &VesselState, body: &CelestialBody, policy: &SpeedPolicy) -> bool {
        let altitude = vessel.altitude(body);
        let floor = self
            .config
            .descent
            .course_correction_floor
            .max(body.atmosphere_height());
        let speed = vessel.surface_velocity(body).magnitude();
        speed < SAFE_SPEED_FRACTION * policy.max_allowed_speed(altitude) && altitude > floor
    }

    fn deorbit_burn(&mut self, vessel: &VesselState, body: &CelestialBody) -> ControlCommand {
        let time = vessel.universal_time;
        let planner = DeorbitPlanner::new(body, &self.config.descent, &self.config.simulation);
        let delta_v = match planner.delta_v(&vessel.position, &vessel.velocity, time, body) {
            Ok(delta_v) => delta_v,
            Err(err) => {
                log::warn!("Cannot plan deorbit burn: {err}");
                na::Vector3::zeros()
            }
        };

        if delta_v.magnitude() < self.config.descent.deorbit_completion_dv {
            self.transition_to(DescentState::CourseCorrecting, time);
            return ControlCommand::safe_hold(vessel, body);
        }

        if !self.deorbit_ignited {
            if let Some(target) = self.active_target() {
                if !planner.in_ignition_window(&vessel.position, &vessel.velocity, body, &target, time) {
                    return ControlCommand::coast(delta_v.normalize(), TimeWarp::Allowed);
                }
            }
        }

        let command = descent_laws::burn_command(vessel, &delta_v, &self.config.descent);
        if command.throttle > 0.0 && !self.deorbit_ignited {
            log::info!(
                "Deorbit burn ignition at t={:.2}s, Δv {:.1} m/s",
                time,
                delta_v.magnitude()
            );
            self.deorbit_ignited = true;
        }
        command
    }

    fn course_correcting(
        &mut self,
        vessel: &VesselState,
        body: &CelestialBody,
        powered: &PoweredDescentSpeedPolicy,
        policy: &SpeedPolicy,
    ) -> ControlCommand {
        let time = vessel.universal_time;
        if !self.safe_to_correct(vessel, body, policy) {
            self.correction = None;
            self.transition_to(DescentState::Decelerating, time);
            return self.decelerating(vessel, body, powered, policy);
        }

        let target = match self.active_target() {
            Some(target) => target,
            None => {
                self.transition_to(DescentState::OnCourse, time);
                return self.on_course(vessel, body, powered, policy);
            }
        };

        let due =
            self.correction.is_none() || self.ticks % self.config.targeting.correction_interval_ticks == 0;
        if due && self.predictor.ready() {
            let choose_direction = self.ticks % self.config.targeting.direction_choice_interval_ticks == 0;
            let simulation = build_simulation(body, policy, vessel, &self.config);
            let outcome = solve_correction(
                &mut self.corrector,
                &mut self.predictor,
                &simulation,
                vessel,
                &target,
                choose_direction,
            );
            match outcome {
                TargetingOutcome::Correction {
                    correction, error, ..
                } => {
                    self.last_landing_error = Some(error);
                    if error < self.config.targeting.landing_accuracy {
                        self.correction = None;
                        self.transition_to(DescentState::OnCourse, time);
                        return self.on_course(vessel, body, powered, policy);
                    }
                    self.correction = Some(correction);
                }
                TargetingOutcome::GiveUp(reason) => {
                    log::warn!("Targeting abandoned: {reason}; continuing without a target");
                    self.targeting_enabled = false;
                    self.correction = None;
                    self.last_landing_error = None;
                    self.transition_to(DescentState::OnCourse, time);
                    return ControlCommand::safe_hold(vessel, body);
                }
            }
        }

        match self.correction {
            Some(correction) if correction.magnitude() > MIN_CORRECTION_DV => {
                descent_laws::burn_command(vessel, &correction.vector(), &self.config.descent)
            }
            _ => ControlCommand::safe_hold(vessel, body),
        }
    }

    fn on_course(
        &mut self,
        vessel: &VesselState,
        body: &CelestialBody,
        powered: &PoweredDescentSpeedPolicy,
        policy: &SpeedPolicy,
    ) -> ControlCommand {
        let time = vessel.universal_time;
        if !self.safe_to_correct(vessel, body, policy) {
            self.transition_to(DescentState::Decelerating, time);
            return self.decelerating(vessel, body, powered, policy);
        }

        let simulation = build_simulation(body, policy, vessel, &self.config);
        self.predictor.update(&simulation, vessel);
        let site = self
            .predictor
            .latest()
            .and_then(|result| result.landing_site().copied());

        if let (Some(target), Some(site)) = (self.active_target(), site) {
            let error = great_circle_distance(site.lat_lon(), target.lat_lon(), body.radius);
            self.last_landing_error = Some(error);
            if error > OFF_COURSE_FACTOR * self.config.targeting.landing_accuracy {
                self.transition_to(DescentState::CourseCorrecting, time);
                return ControlCommand::safe_hold(vessel, body);
            }
        }

        // Without a landing prediction the outcome is unknown: no warp
        let warp = if site.is_some() {
            TimeWarp::Allowed
        } else {
            TimeWarp::Disabled
        };
        ControlCommand::coast(descent_laws::surface_retrograde(vessel, body), warp)
    }

    fn decelerating(
        &mut self,
        vessel: &VesselState,
        body: &CelestialBody,
        powered: &PoweredDescentSpeedPolicy,
        policy: &SpeedPolicy,
    ) -> ControlCommand {
        let time = vessel.universal_time;
        let altitude = vessel.altitude(body);

        if body.has_atmosphere() {
            if altitude < self.config.descent.atmospheric_final_descent_altitude {
                self.transition_to(DescentState::FinalDescent, time);
                return self.final_descent(vessel, body);
            }
        } else if altitude < self.config.descent.termination_altitude {
            self.transition_to(DescentState::KillingLateralVelocity, time);
            return self.killing_lateral_velocity(vessel, body);
        }

        if self.climbing_back_to_safety(vessel, body, policy) {
            let resumed = if self.active_target().is_some() {
                DescentState::CourseCorrecting
            } else {
                DescentState::OnCourse
            };
            self.transition_to(resumed, time);
            return ControlCommand::safe_hold(vessel, body);
        }

        match policy {
            // Drag does the braking
            SpeedPolicy::Unlimited => ControlCommand::safe_hold(vessel, body),
            SpeedPolicy::Powered(_) => {
                descent_laws::deceleration_command(vessel, body, powered, &self.config.descent)
            }
        }
    }

    /// Moving up on an orbit whose apoapsis clears the correction floor.
    fn climbing_back_to_safety(
        &self,
        vessel: &VesselState,
        body: &CelestialBody,
        policy: &SpeedPolicy,
    ) -> bool {
        if vessel.vertical_speed(body) <= 0.0 || !self.safe_to_correct(vessel, body, policy) {
            return false;
        }
        match Orbit::from_state(
            &vessel.position,
            &vessel.velocity,
            vessel.universal_time,
            body.gravitational_parameter,
        ) {
            Ok(orbit) => {
                orbit.apoapsis_radius() - body.radius > self.config.descent.course_correction_floor
            }
            Err(_) => false,
        }
    }

    fn killing_lateral_velocity(&mut self, vessel: &VesselState, body: &CelestialBody) -> ControlCommand {
        let horizontal = vessel.horizontal_surface_velocity(body);
        let reference = *self.lateral_reference.get_or_insert(horizontal);

        let reversed = horizontal.dot(&reference) < 0.0;
        if reversed || horizontal.magnitude() < self.config.descent.lateral_velocity_tolerance {
            self.lateral_reference = None;
            self.transition_to(DescentState::FinalDescent, vessel.universal_time);
            return self.final_descent(vessel, body);
        }
        descent_laws::kill_lateral_command(vessel, body)
    }

    fn final_descent(&mut self, vessel: &VesselState, body: &CelestialBody) -> ControlCommand {
        if vessel.landed {
            self.transition_to(DescentState::Landed, vessel.universal_time);
            return Self::landed_command(vessel);
        }
        descent_laws::final_descent_command(vessel, body, &self.config.descent)
    }

    fn landed_command(vessel: &VesselState) -> ControlCommand {
        ControlCommand::coast(vessel.up(), TimeWarp::Disabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{bodies, lander::SimpleLander};
    use crate::errors::GuidanceError;
    use crate::gnc::navigation::LandingPrediction;
    use crate::integrators::rk4::RK4;
    use crate::physics::dynamics::DescentDynamics;
    use approx::assert_abs_diff_eq;

    fn vessel(position: na::Vector3<f64>, velocity: na::Vector3<f64>) -> VesselState {
        VesselState::new(&SimpleLander, position, velocity, 0.0, 0.1)
    }

    fn circular(body: &CelestialBody, altitude: f64) -> VesselState {
        let r = body.radius + altitude;
        let v = (body.gravitational_parameter / r).sqrt();
        vessel(na::Vector3::new(r, 0.0, 0.0), na::Vector3::new(0.0, v, 0.0))
    }

    /// At apoapsis of an equatorial orbit with the given apsis altitudes.
    fn at_apoapsis(body: &CelestialBody, apoapsis: f64, periapsis: f64) -> VesselState {
        let ra = body.radius + apoapsis;
        let rp = body.radius + periapsis;
        let v = (body.gravitational_parameter * (2.0 / ra - 2.0 / (ra + rp))).sqrt();
        vessel(na::Vector3::new(ra, 0.0, 0.0), na::Vector3::new(0.0, v, 0.0))
    }

    /// Low over the Mun's surface with a given surface-relative velocity.
    fn hovering(altitude: f64, surface_velocity: na::Vector3<f64>) -> (CelestialBody, VesselState) {
        let mun = bodies::mun();
        let position = na::Vector3::new(mun.radius + altitude, 0.0, 0.0);
        let state = vessel(position, surface_velocity + mun.surface_velocity_at(&position));
        (mun, state)
    }

    fn machine() -> DescentStateMachine {
        DescentStateMachine::new(GuidanceConfig::default()).unwrap()
    }

    #[test]
    fn rejects_invalid_config() {
        let mut config = GuidanceConfig::default();
        config.simulation.dt = -1.0;
        assert!(matches!(
            DescentStateMachine::new(config),
            Err(GuidanceError::InvalidConfig(_))
        ));
    }

    #[test]
    fn orbit_above_atmosphere_starts_with_deorbit() {
        let kerbin = bodies::kerbin();
        let mut fsm = machine();
        let command = fsm.tick(&circular(&kerbin, 100_000.0), &kerbin);
        assert_eq!(fsm.current_phase(), DescentState::DeorbitBurn);
        // Engine axis starts along +Z, far from the retrograde burn direction
        assert_eq!(command.throttle, 0.0);
        assert!(command.direction.y < -0.99);
    }

    #[test]
    fn untargeted_descent_coasts_on_course() {
        let mun = bodies::mun();
        let mut fsm = machine();
        let command = fsm.tick(&at_apoapsis(&mun, 50_000.0, -20_000.0), &mun);

        assert_eq!(fsm.current_phase(), DescentState::OnCourse);
        assert_eq!(command.throttle, 0.0);
        assert_eq!(command.time_warp, TimeWarp::Allowed);
        assert!(fsm.latest_prediction().unwrap().prediction.is_landed());
    }

    #[test]
    fn too_little_thrust_is_flagged_and_held() {
        let mun = bodies::mun();
        let mut fsm = machine();
        let mut state = at_apoapsis(&mun, 50_000.0, -20_000.0);
        state.max_thrust_accel = 1.0;

        let command = fsm.tick(&state, &mun);
        assert!(fsm.too_little_thrust_to_land());
        assert_eq!(command.throttle, 0.0);
        assert_eq!(command.time_warp, TimeWarp::Disabled);
        assert!(matches!(
            fsm.predict(&state, &mun),
            Err(GuidanceError::TooLittleThrustToLand { .. })
        ));

        state.max_thrust_accel = 15.0;
        fsm.tick(&state, &mun);
        assert!(!fsm.too_little_thrust_to_land());
    }

    #[test]
    fn targeting_gives_up_on_a_grazing_orbit() {
        let kerbin = bodies::kerbin();
        let mut fsm = machine().with_target(TargetSite::new(0.0, 45.0));
        let command = fsm.tick(&at_apoapsis(&kerbin, 100_000.0, 66_000.0), &kerbin);

        assert!(!fsm.targeting_enabled());
        assert_eq!(fsm.current_phase(), DescentState::OnCourse);
        assert_eq!(command.throttle, 0.0);
        assert_eq!(fsm.target(), Some(TargetSite::new(0.0, 45.0)));
    }

    #[test]
    fn fast_and_low_goes_straight_to_braking() {
        let (mun, mut state) = hovering(3_000.0, na::Vector3::new(0.0, 300.0, 0.0));
        state.attitude = na::UnitQuaternion::rotation_between(&na::Vector3::z(), &-na::Vector3::y()).unwrap();
        let mut fsm = machine();

        let command = fsm.tick(&state, &mun);
        assert_eq!(fsm.current_phase(), DescentState::Decelerating);
        assert_eq!(command.throttle, 1.0);
        assert_eq!(command.time_warp, TimeWarp::Disabled);
    }

    #[test]
    fn airless_touchdown_sequence() {
        let (mun, mut state) = hovering(400.0, na::Vector3::new(-5.0, 3.0, 0.0));
        let mut fsm = machine();

        fsm.tick(&state, &mun);
        assert_eq!(fsm.current_phase(), DescentState::KillingLateralVelocity);

        // Drift reversed by the braking
        let position = state.position;
        state.velocity = na::Vector3::new(-5.0, -0.2, 0.0) + mun.surface_velocity_at(&position);
        fsm.tick(&state, &mun);
        assert_eq!(fsm.current_phase(), DescentState::FinalDescent);

        state.landed = true;
        let command = fsm.tick(&state, &mun);
        assert_eq!(fsm.current_phase(), DescentState::Landed);
        assert_eq!(command.throttle, 0.0);
    }

    #[test]
    fn atmospheric_descent_leaves_braking_to_drag() {
        let kerbin = bodies::kerbin();
        let position = na::Vector3::new(kerbin.radius + 20_000.0, 0.0, 0.0);
        let state = vessel(
            position,
            na::Vector3::new(-200.0, 400.0, 0.0) + kerbin.surface_velocity_at(&position),
        );
        let mut fsm = machine();

        let command = fsm.tick(&state, &kerbin);
        assert_eq!(fsm.current_phase(), DescentState::Decelerating);
        assert_eq!(command.throttle, 0.0);
    }

    #[test]
    fn changing_body_re_engages() {
        let kerbin = bodies::kerbin();
        let mun = bodies::mun();
        let mut fsm = machine();

        fsm.tick(&circular(&kerbin, 100_000.0), &kerbin);
        assert_eq!(fsm.current_phase(), DescentState::DeorbitBurn);

        fsm.tick(&at_apoapsis(&mun, 50_000.0, -20_000.0), &mun);
        assert_eq!(fsm.current_phase(), DescentState::OnCourse);
    }

    #[test]
    fn explicit_prediction_matches_the_published_snapshot() {
        let mun = bodies::mun();
        let mut fsm = machine();
        let state = at_apoapsis(&mun, 50_000.0, -20_000.0);

        let result = fsm.predict(&state, &mun).unwrap();
        assert!(matches!(result.prediction, LandingPrediction::Landed(_)));
        assert!(Rc::ptr_eq(&result, &fsm.latest_prediction().unwrap()));
    }

    /// Point the engine instantly and fly `command` for one `vessel.dt` step.
    fn fly(vessel: &mut VesselState, body: &CelestialBody, command: &ControlCommand) {
        vessel.attitude = na::UnitQuaternion::rotation_between(&na::Vector3::z(), &command.direction)
            .unwrap_or_else(|| {
                na::UnitQuaternion::from_axis_angle(&na::Vector3::x_axis(), std::f64::consts::PI)
            });
        let thrust = vessel.thrust_direction() * (command.throttle * vessel.max_thrust_accel);
        let rk4 = RK4::new(DescentDynamics::new(body, vessel.drag_coefficient_over_mass, Some(thrust)));
        let next = rk4.integrate(&vessel.state_vector(), vessel.dt);
        vessel.position = next.position;
        vessel.velocity = next.velocity;
        vessel.universal_time += vessel.dt;
    }

    fn offset_target(fsm: &mut DescentStateMachine, vessel: &VesselState, body: &CelestialBody) -> TargetSite {
        let site = *fsm.predict(vessel, body).unwrap().landing_site().unwrap();
        TargetSite::new(site.latitude + 1.0, site.longitude + 2.0)
    }

    #[test]
    fn course_correction_publishes_its_baseline() {
        let mun = bodies::mun();
        let mut config = GuidanceConfig::default();
        config.simulation.throttle_factor = 0.0;
        let interval = config.targeting.correction_interval_ticks as f64;
        let mut fsm = DescentStateMachine::new(config).unwrap();
        let mut state = at_apoapsis(&mun, 50_000.0, -20_000.0);
        let target = offset_target(&mut fsm, &state, &mun);
        fsm.set_target(Some(target));

        let mut correcting_ticks = 0;
        for _ in 0..20 {
            let command = fsm.tick(&state, &mun);
            if fsm.current_phase() == DescentState::CourseCorrecting {
                correcting_ticks += 1;
                let snapshot = fsm.latest_prediction().unwrap();
                assert!(state.universal_time - snapshot.start_time <= interval * state.dt + 1e-9);
                let site = snapshot.landing_site().unwrap();
                let error = great_circle_distance(site.lat_lon(), target.lat_lon(), mun.radius);
                assert_abs_diff_eq!(fsm.last_landing_error().unwrap(), error, epsilon = 1e-6);
            }
            fly(&mut state, &mun, &command);
        }
        assert!(correcting_ticks > 0);
        assert!(state.universal_time > 1.0);
    }

    #[test]
    fn course_correction_waits_for_the_throttle() {
        let mun = bodies::mun();
        let mut config = GuidanceConfig::default();
        config.simulation.throttle_factor = 1e9;
        let mut fsm = DescentStateMachine::new(config).unwrap();
        let state = at_apoapsis(&mun, 50_000.0, -20_000.0);
        let target = offset_target(&mut fsm, &state, &mun);
        fsm.set_target(Some(target));

        fsm.tick(&state, &mun);
        assert_eq!(fsm.current_phase(), DescentState::CourseCorrecting);
        let first = fsm.latest_prediction().unwrap();
        assert_eq!(first.start_time, state.universal_time);

        if fsm.predictor.last_run_cost() > std::time::Duration::ZERO {
            for _ in 0..10 {
                fsm.tick(&state, &mun);
            }
            assert!(Rc::ptr_eq(&first, &fsm.latest_prediction().unwrap()));
        }
    }
}
