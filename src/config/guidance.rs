use crate::errors::{GuidanceError, GuidanceResult};
use serde::{Deserialize, Serialize};

/// Numerical settings for the reentry simulator and the prediction throttle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Fixed RK4 step in seconds.
    pub dt: f64,
    /// Ceiling on integrated time after the free-fall projection ends.
    pub max_simulated_time: f64,
    /// How many atmospheric skips may be continued before reporting an aerobrake.
    pub max_skips: usize,
    pub bisection_tolerance: f64,
    pub bisection_max_iterations: usize,
    pub record_trajectory: bool,
    /// Record every n-th integration step when recording is on.
    pub trajectory_stride: usize,
    /// Minimum delay before the next prediction, as a multiple of the last run's cost.
    /// Zero disables throttling.
    pub throttle_factor: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            dt: 0.2,
            max_simulated_time: 2000.0,
            max_skips: 2,
            bisection_tolerance: 0.01,
            bisection_max_iterations: 100,
            record_trajectory: false,
            trajectory_stride: 10,
            throttle_factor: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetingConfig {
    /// Magnitude of the velocity offsets used to probe landing-site sensitivity (m/s).
    pub perturbation_dv: f64,
    pub correction_interval_ticks: u64,
    pub direction_choice_interval_ticks: u64,
    /// Landing error considered on target (m).
    pub landing_accuracy: f64,
}

impl Default for TargetingConfig {
    fn default() -> Self {
        Self {
            perturbation_dv: 1.0,
            correction_interval_ticks: 5,
            direction_choice_interval_ticks: 25,
            landing_accuracy: 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DescentConfig {
    /// Altitude where the braking burn ends and the simulator stops (m).
    pub termination_altitude: f64,
    /// Course corrections are only flown above this altitude (m).
    pub course_correction_floor: f64,
    /// On bodies with an atmosphere, drag brakes until this altitude (m).
    pub atmospheric_final_descent_altitude: f64,
    /// Deorbit target periapsis altitude as a fraction of body radius.
    pub deorbit_periapsis_fraction: f64,
    /// In-plane angle the target should lead the vessel by at deorbit ignition.
    pub deorbit_lead_angle_deg: f64,
    pub deorbit_phase_tolerance_deg: f64,
    pub heading_tolerance_deg: f64,
    pub deorbit_completion_dv: f64,
    pub touchdown_speed: f64,
    pub lateral_velocity_tolerance: f64,
    pub speed_correction_time_constant: f64,
    /// Brake under power inside an atmosphere instead of relying on drag.
    pub powered_atmospheric_descent: bool,
}

impl Default for DescentConfig {
    fn default() -> Self {
        Self {
            termination_altitude: 500.0,
            course_correction_floor: 5_000.0,
            atmospheric_final_descent_altitude: 2_000.0,
            deorbit_periapsis_fraction: -0.1,
            deorbit_lead_angle_deg: 100.0,
            deorbit_phase_tolerance_deg: 2.0,
            heading_tolerance_deg: 5.0,
            deorbit_completion_dv: 2.0,
            touchdown_speed: 2.0,
            lateral_velocity_tolerance: 0.5,
            speed_correction_time_constant: 0.3,
            powered_atmospheric_descent: false,
        }
    }
}

/// PD gains for the attitude loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttitudeConfig {
    pub kp: f64,
    pub kd: f64,
    pub roll_damping: f64,
}

impl Default for AttitudeConfig {
    fn default() -> Self {
        Self {
            kp: 2.0,
            kd: 1.0,
            roll_damping: 0.5,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuidanceConfig {
    pub simulation: SimulationConfig,
    pub targeting: TargetingConfig,
    pub descent: DescentConfig,
    pub attitude: AttitudeConfig,
}

impl GuidanceConfig {
    pub fn validate(&self) -> GuidanceResult<()> {
        let sim = &self.simulation;
        if !(sim.dt > 0.0) {
            return Err(invalid("simulation.dt must be positive"));
        }
        if !(sim.max_simulated_time.is_finite() && sim.max_simulated_time > 0.0) {
            return Err(invalid("simulation.max_simulated_time must be positive and finite"));
        }
        if !(sim.bisection_tolerance > 0.0) || sim.bisection_max_iterations == 0 {
            return Err(invalid("bisection tolerance and iteration cap must be positive"));
        }
        if sim.trajectory_stride == 0 {
            return Err(invalid("simulation.trajectory_stride must be at least 1"));
        }
        if !(sim.throttle_factor.is_finite() && sim.throttle_factor >= 0.0) {
            return Err(invalid("simulation.throttle_factor must be finite and not negative"));
        }

        let targeting = &self.targeting;
        if !(targeting.perturbation_dv > 0.0) {
            return Err(invalid("targeting.perturbation_dv must be positive"));
        }
        if targeting.correction_interval_ticks == 0 || targeting.direction_choice_interval_ticks == 0 {
            return Err(invalid("targeting intervals must be at least one tick"));
        }
        if targeting.correction_interval_ticks > targeting.direction_choice_interval_ticks {
            return Err(invalid(
                "targeting.correction_interval_ticks must not exceed direction_choice_interval_ticks",
            ));
        }
        if !(targeting.landing_accuracy > 0.0) {
            return Err(invalid("targeting.landing_accuracy must be positive"));
        }

        let descent = &self.descent;
        if descent.course_correction_floor <= descent.termination_altitude {
            return Err(invalid(
                "descent.course_correction_floor must lie above termination_altitude",
            ));
        }
        if descent.atmospheric_final_descent_altitude < descent.termination_altitude {
            return Err(invalid(
                "descent.atmospheric_final_descent_altitude must not lie below termination_altitude",
            ));
        }
        if !(descent.speed_correction_time_constant > 0.0) {
            return Err(invalid("descent.speed_correction_time_constant must be positive"));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> GuidanceError {
    GuidanceError::InvalidConfig(message.to_string())
}
