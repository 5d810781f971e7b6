use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::constants::{EARTH_RADIUS_KM, RHO_EARTH};
use crate::error::{SimError, SimResult};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Planet {
    pub id: Uuid,
    pub sim_id: Uuid,
    pub name: String,
    pub radius_km: f64,
    pub mantle_density_gcm3: f64,
}

pub struct PlanetParams {
    pub sim_id: Uuid,
    pub name: String,
    pub radius_km: f64,
    pub mantle_density_gcm3: Option<f64>,
}

impl Planet {
    pub fn new(params: PlanetParams) -> SimResult<Self> {
        if !(params.radius_km > 0.0) {
            return Err(SimError::DegenerateInput(format!(
                "planet must have a positive radius, got {}",
                params.radius_km
            )));
        }

        Ok(Planet {
            id: Uuid::new_v4(),
            sim_id: params.sim_id,
            name: params.name,
            radius_km: params.radius_km,
            mantle_density_gcm3: params
                .mantle_density_gcm3
                .unwrap_or_else(|| estimate_mantle_density(params.radius_km, None)),
        })
    }

    /// Returns the surface area of the planet in square kilometers.
    pub fn surface_area_km2(&self) -> f64 {
        4.0 * std::f64::consts::PI * self.radius_km.powi(2)
    }
}

/// Mantle density scaled from Earth's by a power of the radius ratio.
pub fn estimate_mantle_density(planet_radius_km: f64, exp: Option<f64>) -> f64 {
    let scale_factor = (planet_radius_km / EARTH_RADIUS_KM).powf(exp.unwrap_or(0.25));
    RHO_EARTH * scale_factor
}
