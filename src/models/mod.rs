pub mod body;
pub mod spacecraft;
pub mod state;

pub use body::CelestialBody;
pub use state::{StateVector, VesselState};
