pub mod bodies;
pub mod guidance;
pub mod lander;

pub use guidance::{AttitudeConfig, DescentConfig, GuidanceConfig, SimulationConfig, TargetingConfig};
