pub mod bisection;
pub mod kepler;
