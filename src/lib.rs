pub mod config;
pub mod constants;
pub mod coordinates;
pub mod errors;
pub mod fsm;
pub mod gnc;
pub mod integrators;
pub mod logger;
pub mod models;
pub mod numerics;
pub mod physics;

pub use errors::{GuidanceError, GuidanceResult};
