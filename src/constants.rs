pub const G: f64 = 6.67430e-11; // Gravitational constant (m³/kg/s²)

// Kerbin-class reference body
pub const KERBIN_GM: f64 = 3.5316e12; // m³/s²
pub const KERBIN_RADIUS: f64 = 600_000.0; // m
pub const KERBIN_ROTATION_PERIOD: f64 = 21_549.425; // s
pub const KERBIN_ATMOSPHERE_HEIGHT: f64 = 70_000.0; // m
pub const KERBIN_SCALE_HEIGHT: f64 = 5_600.0; // m

// Airless moon of Kerbin
pub const MUN_GM: f64 = 6.5138398e10; // m³/s²
pub const MUN_RADIUS: f64 = 200_000.0; // m
pub const MUN_ROTATION_PERIOD: f64 = 138_984.38; // s

// Earth, for sanity checks against real-world numbers
pub const M_EARTH: f64 = 5.972e24; // Mass of Earth (kg)

pub const SEA_LEVEL_DENSITY: f64 = 1.225; // kg/m³

// Math
pub const PI: f64 = std::f64::consts::PI;
pub const TAU: f64 = std::f64::consts::TAU;
