use crate::physics::dynamics::EquationsOfMotion;

pub struct RK4<T: EquationsOfMotion> {
    eom: T,
}

impl<T: EquationsOfMotion> RK4<T>
where
    T::State: Copy + std::ops::Add<Output = T::State> + std::ops::Mul<f64, Output = T::State>,
{
    pub fn new(eom: T) -> Self {
        RK4 { eom }
    }

    pub fn dynamics(&self) -> &T {
        &self.eom
    }

    pub fn integrate(&self, state: &T::State, dt: f64) -> T::State {
        let k1 = self.eom.compute_derivative(state);

        let state2 = *state + k1 * (dt / 2.0);
        let k2 = self.eom.compute_derivative(&state2);

        let state3 = *state + k2 * (dt / 2.0);
        let k3 = self.eom.compute_derivative(&state3);

        let state4 = *state + k3 * dt;
        let k4 = self.eom.compute_derivative(&state4);

        *state + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (dt / 6.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::bodies;
    use crate::models::state::StateVector;
    use crate::physics::dynamics::DescentDynamics;
    use approx::assert_relative_eq;
    use nalgebra as na;

    #[test]
    fn circular_orbit_keeps_radius_over_one_period() {
        let mun = bodies::mun();
        let r = mun.radius + 50_000.0;
        let speed = (mun.gravitational_parameter / r).sqrt();
        let period = std::f64::consts::TAU * r / speed;

        let integrator = RK4::new(DescentDynamics::new(&mun, 0.0, None));
        let mut state = StateVector::new(na::Vector3::new(r, 0.0, 0.0), na::Vector3::new(0.0, speed, 0.0));
        let dt = 1.0;
        let steps = (period / dt) as usize;
        for _ in 0..steps {
            state = integrator.integrate(&state, dt);
        }
        assert_relative_eq!(state.position.magnitude(), r, max_relative = 1e-6);
    }

    #[test]
    fn constant_thrust_matches_closed_form_in_free_space() {
        let mut body = bodies::mun();
        body.gravitational_parameter = 0.0;
        let thrust = na::Vector3::new(2.0, 0.0, 0.0);
        let integrator = RK4::new(DescentDynamics::new(&body, 0.0, Some(thrust)));
        let mut state = StateVector::new(na::Vector3::new(1.0e6, 0.0, 0.0), na::Vector3::zeros());
        for _ in 0..100 {
            state = integrator.integrate(&state, 0.1);
        }
        // x = x0 + ½·a·t² with t = 10 s
        assert_relative_eq!(state.position.x, 1.0e6 + 100.0, max_relative = 1e-12);
        assert_relative_eq!(state.velocity.x, 20.0, max_relative = 1e-12);
    }
}
