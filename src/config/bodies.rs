use crate::constants::*;
use crate::models::body::CelestialBody;
use crate::physics::environment::Atmosphere;

/// Kerbin-class home world: μ = 3.5316e12 m³/s², 600 km radius, 70 km atmosphere.
pub fn kerbin() -> CelestialBody {
    CelestialBody::new("Kerbin", KERBIN_GM, KERBIN_RADIUS, KERBIN_ROTATION_PERIOD).with_atmosphere(
        Atmosphere::new(KERBIN_ATMOSPHERE_HEIGHT, SEA_LEVEL_DENSITY, KERBIN_SCALE_HEIGHT),
    )
}

/// Airless moon, 200 km radius.
pub fn mun() -> CelestialBody {
    CelestialBody::new("Mun", MUN_GM, MUN_RADIUS, MUN_ROTATION_PERIOD)
}
