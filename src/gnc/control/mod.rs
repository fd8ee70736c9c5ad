pub mod attitude_controller;

pub use attitude_controller::{ControlOutputs, DirectionController};
