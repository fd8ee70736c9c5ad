use super::prediction::SimulationResult;
use super::reentry_simulation::ReentrySimulation;
use crate::models::state::VesselState;
use nalgebra as na;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Keeps the most recent reentry prediction and rate-limits new runs.
///
/// After a run that took `c` of wall-clock time, the next scheduled run is held back
/// for `throttle_factor · c`. Readers get a shared snapshot that stays valid while
/// newer results are published.
pub struct LandingPredictor {
    throttle_factor: f64,
    latest: Option<Rc<SimulationResult>>,
    next_run_allowed: Option<Instant>,
    last_run_cost: Duration,
}

impl LandingPredictor {
    pub fn new(throttle_factor: f64) -> Self {
        Self {
            throttle_factor,
            latest: None,
            next_run_allowed: None,
            last_run_cost: Duration::ZERO,
        }
    }

    pub fn latest(&self) -> Option<Rc<SimulationResult>> {
        self.latest.clone()
    }

    pub fn last_run_cost(&self) -> Duration {
        self.last_run_cost
    }

    pub fn ready(&self) -> bool {
        match self.next_run_allowed {
            Some(instant) => Instant::now() >= instant,
            None => true,
        }
    }

    /// Run a new prediction if the throttle allows it. Returns the new snapshot when one
    /// was published.
    pub fn update(
        &mut self,
        simulation: &ReentrySimulation,
        vessel: &VesselState,
    ) -> Option<Rc<SimulationResult>> {
        if !self.ready() {
            return None;
        }
        Some(self.predict_now(simulation, vessel))
    }

    /// Run a prediction immediately, ignoring the throttle.
    pub fn predict_now(
        &mut self,
        simulation: &ReentrySimulation,
        vessel: &VesselState,
    ) -> Rc<SimulationResult> {
        let started = Instant::now();
        let result = simulation.run(
            &vessel.state_vector(),
            vessel.universal_time,
            &na::Vector3::zeros(),
        );
        self.publish(result, started.elapsed())
    }

    /// Publish a result produced elsewhere and charge `cost` against the throttle.
    pub fn publish(&mut self, result: SimulationResult, cost: Duration) -> Rc<SimulationResult> {
        self.last_run_cost = cost;
        // Non-finite or negative factors disable throttling
        let hold_back = Duration::try_from_secs_f64(cost.as_secs_f64() * self.throttle_factor)
            .unwrap_or(Duration::ZERO);
        let now = Instant::now();
        self.next_run_allowed = Some(now.checked_add(hold_back).unwrap_or(now));
        if hold_back > Duration::ZERO {
            log::debug!("next landing prediction held back {:?}", hold_back);
        }

        let snapshot = Rc::new(result);
        self.latest = Some(Rc::clone(&snapshot));
        snapshot
    }

    /// Drop the published prediction, e.g. after a change of reference body.
    pub fn invalidate(&mut self) {
        self.latest = None;
        self.next_run_allowed = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{bodies, lander::SimpleLander, SimulationConfig};
    use crate::gnc::guidance::deceleration::SpeedPolicy;
    use crate::gnc::navigation::prediction::LandingPrediction;

    fn orbiting_vessel() -> VesselState {
        let kerbin = bodies::kerbin();
        let r = kerbin.radius + 100_000.0;
        let v = (kerbin.gravitational_parameter / r).sqrt();
        VesselState::new(
            &SimpleLander,
            na::Vector3::new(r, 0.0, 0.0),
            na::Vector3::new(0.0, v, 0.0),
            0.0,
            0.1,
        )
    }

    #[test]
    fn unthrottled_predictor_always_runs() {
        let kerbin = bodies::kerbin();
        let config = SimulationConfig::default();
        let sim = ReentrySimulation::new(&kerbin, &SpeedPolicy::Unlimited, 0.0, 500.0, &config);
        let vessel = orbiting_vessel();

        let mut predictor = LandingPredictor::new(0.0);
        assert!(predictor.latest().is_none());
        assert!(predictor.update(&sim, &vessel).is_some());
        assert!(predictor.ready());
        assert!(predictor.update(&sim, &vessel).is_some());
        assert_eq!(
            predictor.latest().unwrap().prediction,
            LandingPrediction::NoReentry
        );
    }

    #[test]
    fn old_snapshots_survive_new_results() {
        let kerbin = bodies::kerbin();
        let config = SimulationConfig::default();
        let sim = ReentrySimulation::new(&kerbin, &SpeedPolicy::Unlimited, 0.0, 500.0, &config);
        let vessel = orbiting_vessel();

        let mut predictor = LandingPredictor::new(0.0);
        let first = predictor.predict_now(&sim, &vessel);
        let second = predictor.predict_now(&sim, &vessel);

        assert!(!Rc::ptr_eq(&first, &second));
        assert_eq!(first.prediction, second.prediction);
        assert!(Rc::ptr_eq(&predictor.latest().unwrap(), &second));
    }

    #[test]
    fn huge_throttle_factor_holds_back_the_next_run() {
        let kerbin = bodies::kerbin();
        let config = SimulationConfig::default();
        let sim = ReentrySimulation::new(&kerbin, &SpeedPolicy::Unlimited, 0.0, 500.0, &config);
        let vessel = orbiting_vessel();

        let mut predictor = LandingPredictor::new(1e9);
        predictor.predict_now(&sim, &vessel);
        if predictor.last_run_cost() > Duration::ZERO {
            assert!(!predictor.ready());
            assert!(predictor.update(&sim, &vessel).is_none());
        }

        predictor.invalidate();
        assert!(predictor.ready());
        assert!(predictor.latest().is_none());
    }

    #[test]
    fn published_results_are_charged_to_the_throttle() {
        let kerbin = bodies::kerbin();
        let config = SimulationConfig::default();
        let sim = ReentrySimulation::new(&kerbin, &SpeedPolicy::Unlimited, 0.0, 500.0, &config);
        let vessel = orbiting_vessel();
        let result = sim.run(&vessel.state_vector(), 0.0, &na::Vector3::zeros());

        let mut predictor = LandingPredictor::new(10.0);
        let snapshot = predictor.publish(result, Duration::from_secs(3_600));
        assert!(Rc::ptr_eq(&snapshot, &predictor.latest().unwrap()));
        assert_eq!(predictor.last_run_cost(), Duration::from_secs(3_600));
        assert!(!predictor.ready());
        assert!(predictor.update(&sim, &vessel).is_none());
    }

    #[test]
    fn non_finite_throttle_factor_disables_the_hold_back() {
        let kerbin = bodies::kerbin();
        let config = SimulationConfig::default();
        let sim = ReentrySimulation::new(&kerbin, &SpeedPolicy::Unlimited, 0.0, 500.0, &config);
        let vessel = orbiting_vessel();

        for factor in [f64::NAN, f64::INFINITY, -1.0] {
            let mut predictor = LandingPredictor::new(factor);
            predictor.predict_now(&sim, &vessel);
            assert!(predictor.ready());
        }
    }
}
