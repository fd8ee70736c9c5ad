pub mod landing_predictor;
pub mod prediction;
pub mod reentry_simulation;

pub use landing_predictor::LandingPredictor;
pub use prediction::{LandingPrediction, LandingSite, SimulationResult};
pub use reentry_simulation::ReentrySimulation;
