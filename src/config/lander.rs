use crate::models::spacecraft::VehicleProperties;

/// Reference single-engine lander used by the demo and the scenario tests.
pub struct SimpleLander;

impl SimpleLander {
    pub const MASS: f64 = 2_000.0; // kg
    pub const MAX_THRUST: f64 = 30_000.0; // N
    pub const C_D: f64 = 2.2;
    pub const R_LANDER: f64 = 1.0; // meters
}

impl VehicleProperties for SimpleLander {
    fn mass(&self) -> f64 {
        Self::MASS
    }

    fn max_thrust(&self) -> f64 {
        Self::MAX_THRUST
    }

    fn drag_coefficient(&self) -> f64 {
        Self::C_D
    }

    fn reference_area(&self) -> f64 {
        std::f64::consts::PI * Self::R_LANDER.powi(2)
    }
}
