use crate::constants::TAU;
use crate::errors::{GuidanceError, GuidanceResult};
use crate::numerics::kepler::{
    eccentric_to_true_anomaly, hyperbolic_to_true_anomaly, solve_kepler, true_to_eccentric_anomaly,
    true_to_hyperbolic_anomaly,
};
use nalgebra as na;

/// Below this eccentricity the periapsis direction is taken from the epoch position.
const CIRCULAR_ECCENTRICITY: f64 = 1e-11;
/// Orbits this close to e = 1 have no usable semi-major axis.
const PARABOLIC_BAND: f64 = 1e-10;

/// Immutable two-body conic built from a single state vector.
///
/// Every query is analytic; nothing is integrated.
#[derive(Debug, Clone, PartialEq)]
pub struct Orbit {
    gm: f64,
    angular_momentum: na::Vector3<f64>,
    eccentricity: f64,
    specific_energy: f64,
    /// Unit vector toward periapsis.
    periapsis_direction: na::Vector3<f64>,
    /// In-plane unit vector 90° ahead of periapsis.
    normal_direction: na::Vector3<f64>,
    /// Negative for hyperbolic orbits.
    semi_major_axis: f64,
    mean_motion: f64,
    epoch: f64,
    mean_anomaly_at_epoch: f64,
    hyperbolic: bool,
}

impl Orbit {
    pub fn from_state(
        position: &na::Vector3<f64>,
        velocity: &na::Vector3<f64>,
        epoch: f64,
        gm: f64,
    ) -> GuidanceResult<Self> {
        let r = position.magnitude();
        if !(r > 0.0) || !(gm > 0.0) {
            return Err(GuidanceError::DegenerateOrbit(format!(
                "radius {r} and gravitational parameter {gm} must be positive"
            )));
        }

        // Calculate angular momentum vector
        let h = position.cross(velocity);
        let h_mag = h.magnitude();
        if !(h_mag > 1e-12 * r * velocity.magnitude()) {
            return Err(GuidanceError::DegenerateOrbit(
                "radial trajectory has no orbital plane".to_string(),
            ));
        }

        // Calculate eccentricity (Laplace–Runge–Lenz) vector
        let v2 = velocity.norm_squared();
        let e_vec = ((v2 - gm / r) * position - position.dot(velocity) * velocity) / gm;
        let eccentricity = e_vec.magnitude();
        if (eccentricity - 1.0).abs() < PARABOLIC_BAND {
            return Err(GuidanceError::DegenerateOrbit(format!(
                "eccentricity {eccentricity} is parabolic"
            )));
        }
        let hyperbolic = eccentricity > 1.0;

        let periapsis_direction = if eccentricity < CIRCULAR_ECCENTRICITY {
            position / r
        } else {
            e_vec / eccentricity
        };
        let normal_direction = (h / h_mag).cross(&periapsis_direction);

        // Semi-major axis from the semi-latus rectum keeps its sign tied to e
        let semi_latus_rectum = h_mag * h_mag / gm;
        let semi_major_axis = semi_latus_rectum / (1.0 - eccentricity * eccentricity);
        let mean_motion = (gm / semi_major_axis.abs().powi(3)).sqrt();

        let true_anomaly = position
            .dot(&normal_direction)
            .atan2(position.dot(&periapsis_direction));
        let mean_anomaly_at_epoch = if hyperbolic {
            let h_anom = true_to_hyperbolic_anomaly(true_anomaly, eccentricity);
            eccentricity * h_anom.sinh() - h_anom
        } else {
            let e_anom = true_to_eccentric_anomaly(true_anomaly, eccentricity);
            e_anom - eccentricity * e_anom.sin()
        };

        Ok(Orbit {
            gm,
            angular_momentum: h,
            eccentricity,
            specific_energy: v2 / 2.0 - gm / r,
            periapsis_direction,
            normal_direction,
            semi_major_axis,
            mean_motion,
            epoch,
            mean_anomaly_at_epoch,
            hyperbolic,
        })
    }

    pub fn gravitational_parameter(&self) -> f64 {
        self.gm
    }

    pub fn angular_momentum(&self) -> na::Vector3<f64> {
        self.angular_momentum
    }

    pub fn eccentricity(&self) -> f64 {
        self.eccentricity
    }

    pub fn specific_energy(&self) -> f64 {
        self.specific_energy
    }

    pub fn periapsis_direction(&self) -> na::Vector3<f64> {
        self.periapsis_direction
    }

    pub fn normal_direction(&self) -> na::Vector3<f64> {
        self.normal_direction
    }

    pub fn semi_major_axis(&self) -> f64 {
        self.semi_major_axis
    }

    pub fn mean_motion(&self) -> f64 {
        self.mean_motion
    }

    pub fn epoch(&self) -> f64 {
        self.epoch
    }

    pub fn mean_anomaly_at_epoch(&self) -> f64 {
        self.mean_anomaly_at_epoch
    }

    pub fn is_hyperbolic(&self) -> bool {
        self.hyperbolic
    }

    pub fn semi_latus_rectum(&self) -> f64 {
        self.angular_momentum.norm_squared() / self.gm
    }

    pub fn periapsis_radius(&self) -> f64 {
        self.semi_latus_rectum() / (1.0 + self.eccentricity)
    }

    pub fn apoapsis_radius(&self) -> f64 {
        if self.hyperbolic {
            f64::INFINITY
        } else {
            self.semi_latus_rectum() / (1.0 - self.eccentricity)
        }
    }

    pub fn period(&self) -> Option<f64> {
        (!self.hyperbolic).then(|| TAU / self.mean_motion)
    }

    pub fn mean_anomaly_at(&self, t: f64) -> f64 {
        self.mean_anomaly_at_epoch + self.mean_motion * (t - self.epoch)
    }

    pub fn true_anomaly_at(&self, t: f64) -> f64 {
        let solution = solve_kepler(self.mean_anomaly_at(t), self.eccentricity);
        if self.hyperbolic {
            hyperbolic_to_true_anomaly(solution.anomaly, self.eccentricity)
        } else {
            eccentric_to_true_anomaly(solution.anomaly, self.eccentricity)
        }
    }

    pub fn radius_at_true_anomaly(&self, true_anomaly: f64) -> f64 {
        self.semi_latus_rectum() / (1.0 + self.eccentricity * true_anomaly.cos())
    }

    pub fn position_at_time(&self, t: f64) -> na::Vector3<f64> {
        self.position_at_true_anomaly(self.true_anomaly_at(t))
    }

    pub fn velocity_at_time(&self, t: f64) -> na::Vector3<f64> {
        self.velocity_at_true_anomaly(self.true_anomaly_at(t))
    }

    /// Position and velocity from a single Kepler solve.
    pub fn state_at_time(&self, t: f64) -> (na::Vector3<f64>, na::Vector3<f64>) {
        let true_anomaly = self.true_anomaly_at(t);
        (
            self.position_at_true_anomaly(true_anomaly),
            self.velocity_at_true_anomaly(true_anomaly),
        )
    }

    fn radial_direction(&self, true_anomaly: f64) -> na::Vector3<f64> {
        let (sin_nu, cos_nu) = true_anomaly.sin_cos();
        self.periapsis_direction * cos_nu + self.normal_direction * sin_nu
    }

    fn position_at_true_anomaly(&self, true_anomaly: f64) -> na::Vector3<f64> {
        self.radial_direction(true_anomaly) * self.radius_at_true_anomaly(true_anomaly)
    }

    /// Speed from vis-viva, direction from the flight-path angle.
    fn velocity_at_true_anomaly(&self, true_anomaly: f64) -> na::Vector3<f64> {
        let r = self.radius_at_true_anomaly(true_anomaly);
        let speed = (self.gm * (2.0 / r - 1.0 / self.semi_major_axis)).max(0.0).sqrt();

        let (sin_nu, cos_nu) = true_anomaly.sin_cos();
        let flight_path_angle = (self.eccentricity * sin_nu).atan2(1.0 + self.eccentricity * cos_nu);
        let (sin_gamma, cos_gamma) = flight_path_angle.sin_cos();

        let radial = self.radial_direction(true_anomaly);
        let transverse = self.normal_direction * cos_nu - self.periapsis_direction * sin_nu;
        (radial * sin_gamma + transverse * cos_gamma) * speed
    }

    /// Time from `t` until the next periapsis passage.
    ///
    /// Elliptic orbits wrap into `[0, period)`. Hyperbolic orbits have a single passage,
    /// so the result is negative once it lies in the past.
    pub fn time_to_periapsis(&self, t: f64) -> f64 {
        let mean_anomaly = self.mean_anomaly_at(t);
        match self.period() {
            Some(period) => {
                let m = mean_anomaly.rem_euclid(TAU);
                ((TAU - m) / self.mean_motion) % period
            }
            None => -mean_anomaly / self.mean_motion,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::bodies;
    use crate::constants::KERBIN_GM;
    use crate::integrators::rk4::RK4;
    use crate::models::state::StateVector;
    use crate::physics::dynamics::DescentDynamics;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use nalgebra as na;
    use test_case::test_case;

    const MU: f64 = KERBIN_GM;

    #[test_case(
        na::Vector3::new(700_000.0, 0.0, 0.0),
        na::Vector3::new(0.0, 2_246.0, 0.0);
        "near circular equatorial"
    )]
    #[test_case(
        na::Vector3::new(650_000.0, 120_000.0, -40_000.0),
        na::Vector3::new(-300.0, 2_300.0, 900.0);
        "eccentric inclined"
    )]
    #[test_case(
        na::Vector3::new(-1.2e6, 3.0e5, 2.0e5),
        na::Vector3::new(-600.0, -1_500.0, 300.0);
        "descending past apoapsis"
    )]
    fn state_round_trips_at_epoch(position: na::Vector3<f64>, velocity: na::Vector3<f64>) {
        let orbit = Orbit::from_state(&position, &velocity, 100.0, MU).unwrap();
        assert!(!orbit.is_hyperbolic());
        let (p, v) = orbit.state_at_time(100.0);
        assert_abs_diff_eq!(p, position, epsilon = 1e-6 * position.magnitude());
        assert_abs_diff_eq!(v, velocity, epsilon = 1e-6 * velocity.magnitude());
    }

    #[test]
    fn hyperbolic_flag_matches_eccentricity() {
        let r = 700_000.0;
        for e in [0.0, 0.3, 0.9, 1.2, 3.0] {
            let speed = (MU * (1.0 + e) / r).sqrt();
            let orbit = Orbit::from_state(
                &na::Vector3::new(r, 0.0, 0.0),
                &na::Vector3::new(0.0, speed, 0.0),
                0.0,
                MU,
            )
            .unwrap();
            assert_abs_diff_eq!(orbit.eccentricity(), e, epsilon = 1e-9);
            assert_eq!(orbit.is_hyperbolic(), orbit.eccentricity() > 1.0);
            assert_eq!(orbit.semi_major_axis() < 0.0, orbit.is_hyperbolic());
            assert_relative_eq!(orbit.periapsis_radius(), r, max_relative = 1e-9);
        }
    }

    #[test]
    fn apsides_of_known_ellipse() {
        let (ra, rp) = (800_000.0, 640_000.0);
        let a = (ra + rp) / 2.0;
        let speed_at_apoapsis = (MU * (2.0 / ra - 1.0 / a)).sqrt();
        let orbit = Orbit::from_state(
            &na::Vector3::new(0.0, ra, 0.0),
            &na::Vector3::new(-speed_at_apoapsis, 0.0, 0.0),
            0.0,
            MU,
        )
        .unwrap();
        assert_relative_eq!(orbit.apoapsis_radius(), ra, max_relative = 1e-9);
        assert_relative_eq!(orbit.periapsis_radius(), rp, max_relative = 1e-9);
        assert_relative_eq!(orbit.semi_major_axis(), a, max_relative = 1e-9);
        assert_relative_eq!(orbit.specific_energy(), -MU / (2.0 * a), max_relative = 1e-9);
        let period = orbit.period().unwrap();
        assert_relative_eq!(period, TAU * (a.powi(3) / MU).sqrt(), max_relative = 1e-9);
        assert_relative_eq!(orbit.time_to_periapsis(0.0), period / 2.0, max_relative = 1e-9);
    }

    #[test]
    fn analytic_propagation_agrees_with_rk4() {
        let body = bodies::mun();
        let position = na::Vector3::new(body.radius + 30_000.0, 0.0, 5_000.0);
        let velocity = na::Vector3::new(40.0, 520.0, 60.0);
        let orbit = Orbit::from_state(&position, &velocity, 0.0, body.gravitational_parameter).unwrap();

        let integrator = RK4::new(DescentDynamics::new(&body, 0.0, None));
        let mut state = StateVector::new(position, velocity);
        for _ in 0..2_000 {
            state = integrator.integrate(&state, 0.5);
        }
        let (p, v) = orbit.state_at_time(1_000.0);
        assert_abs_diff_eq!(p, state.position, epsilon = 1.0);
        assert_abs_diff_eq!(v, state.velocity, epsilon = 1e-3);
    }

    #[test]
    fn velocity_matches_position_derivative() {
        let orbit = Orbit::from_state(
            &na::Vector3::new(650_000.0, 50_000.0, 0.0),
            &na::Vector3::new(-200.0, 2_500.0, 100.0),
            0.0,
            MU,
        )
        .unwrap();
        let t = 437.0;
        let h = 0.5;
        let numeric = (orbit.position_at_time(t + h) - orbit.position_at_time(t - h)) / (2.0 * h);
        assert_abs_diff_eq!(orbit.velocity_at_time(t), numeric, epsilon = 1e-2);
    }

    #[test]
    fn time_to_periapsis_decreases_and_wraps() {
        let r = 700_000.0;
        let speed = (MU * 1.3 / r).sqrt();
        let orbit = Orbit::from_state(
            &na::Vector3::new(r, 0.0, 0.0),
            &na::Vector3::new(0.0, speed, 0.0),
            0.0,
            MU,
        )
        .unwrap();
        let period = orbit.period().unwrap();
        let samples = 500;
        let step = period / samples as f64;
        let mut previous = orbit.time_to_periapsis(step * 0.5);
        let mut wraps = 0;
        for i in 1..=2 * samples {
            let t = step * (i as f64 + 0.5);
            let current = orbit.time_to_periapsis(t);
            assert!((0.0..period).contains(&current));
            if current > previous {
                wraps += 1;
                assert_relative_eq!(current - previous, period - step, max_relative = 1e-6);
            } else {
                assert_relative_eq!(previous - current, step, max_relative = 1e-6);
            }
            previous = current;
        }
        assert_eq!(wraps, 2);
    }

    #[test]
    fn hyperbolic_flyby_stays_finite() {
        let r = 700_000.0;
        let speed = (MU * 2.2 / r).sqrt(); // e = 1.2 at periapsis
        let orbit = Orbit::from_state(
            &na::Vector3::new(r, 0.0, 0.0),
            &na::Vector3::new(0.0, speed, 0.0),
            0.0,
            MU,
        )
        .unwrap();
        assert!(orbit.is_hyperbolic());
        assert!(orbit.period().is_none());

        let far_future = 5.0e6;
        assert!(orbit.mean_anomaly_at(far_future) > 1_000.0);
        let time = orbit.time_to_periapsis(far_future);
        assert!(time.is_finite());
        assert_relative_eq!(time, -far_future, max_relative = 1e-9);

        let (p, v) = orbit.state_at_time(far_future);
        assert!(p.iter().chain(v.iter()).all(|c| c.is_finite()));
        assert!(orbit.time_to_periapsis(-1_000.0) > 0.0);
    }

    #[test]
    fn rejects_degenerate_states() {
        let radial = Orbit::from_state(
            &na::Vector3::new(700_000.0, 0.0, 0.0),
            &na::Vector3::new(-100.0, 0.0, 0.0),
            0.0,
            MU,
        );
        assert!(matches!(radial, Err(GuidanceError::DegenerateOrbit(_))));

        let origin = Orbit::from_state(&na::Vector3::zeros(), &na::Vector3::new(0.0, 1.0, 0.0), 0.0, MU);
        assert!(origin.is_err());
    }
}
