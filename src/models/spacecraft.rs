/// Aggregate physical properties the guidance core needs from a vehicle.
///
/// Part-tree traversal lives outside the core; whatever walks the parts only
/// has to answer these queries.
pub trait VehicleProperties {
    fn mass(&self) -> f64;
    /// Maximum available thrust in newtons.
    fn max_thrust(&self) -> f64;
    /// Minimum thrust at zero throttle (non-zero for engines that cannot idle).
    fn min_thrust(&self) -> f64 {
        0.0
    }
    fn drag_coefficient(&self) -> f64;
    fn reference_area(&self) -> f64;

    fn max_thrust_acceleration(&self) -> f64 {
        self.max_thrust() / self.mass()
    }

    fn min_thrust_acceleration(&self) -> f64 {
        self.min_thrust() / self.mass()
    }

    fn drag_coefficient_over_mass(&self) -> f64 {
        self.drag_coefficient() * self.reference_area() / self.mass()
    }
}
