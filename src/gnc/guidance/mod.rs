pub mod deceleration;
pub mod deorbit;
pub mod descent_laws;
pub mod targeting;

pub use descent_laws::{ControlCommand, TimeWarp};
pub use targeting::{TargetSite, TargetingCorrector, TargetingOutcome, VelocityCorrection};
