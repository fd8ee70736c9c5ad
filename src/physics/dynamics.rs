use super::drag::drag_acceleration;
use super::gravity::gravity_acceleration;
use crate::models::body::CelestialBody;
use crate::models::state::StateVector;
use nalgebra as na;

pub trait EquationsOfMotion {
    type State;

    fn compute_derivative(&self, state: &Self::State) -> Self::State;
}

/// Gravity + drag, plus an optional constant thrust acceleration.
pub struct DescentDynamics<'a> {
    body: &'a CelestialBody,
    drag_coefficient_over_mass: f64,
    thrust: Option<na::Vector3<f64>>,
}

impl<'a> DescentDynamics<'a> {
    pub fn new(
        body: &'a CelestialBody,
        drag_coefficient_over_mass: f64,
        thrust: Option<na::Vector3<f64>>,
    ) -> Self {
        Self {
            body,
            drag_coefficient_over_mass,
            thrust,
        }
    }

    pub fn drag(&self, state: &StateVector) -> na::Vector3<f64> {
        drag_acceleration(
            self.body,
            self.drag_coefficient_over_mass,
            &state.position,
            &state.velocity,
        )
    }
}

impl EquationsOfMotion for DescentDynamics<'_> {
    type State = StateVector;

    fn compute_derivative(&self, state: &StateVector) -> StateVector {
        let mut derivative = StateVector::zero();

        // Position derivative is velocity
        derivative.position = state.velocity;

        // Velocity derivative (gravity + drag + thrust)
        derivative.velocity =
            gravity_acceleration(self.body.gravitational_parameter, &state.position) + self.drag(state);
        if let Some(thrust) = &self.thrust {
            derivative.velocity += thrust;
        }

        derivative
    }
}
