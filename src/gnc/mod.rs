pub mod control;
pub mod guidance;
pub mod navigation;
