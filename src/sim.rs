use crate::error::{SimError, SimResult};
use crate::planet::{Planet, PlanetParams};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Simulation {
    pub id: Uuid,
    pub name: String,
    pub planet_id: Option<Uuid>,
}

pub struct SimPlanetParams {
    pub name: String,
    pub radius_km: f64,
    pub mantle_density_gcm3: Option<f64>,
}

impl SimPlanetParams {
    pub fn into_planet_params(self, sim_id: Uuid) -> PlanetParams {
        PlanetParams {
            sim_id,
            name: self.name,
            radius_km: self.radius_km,
            mantle_density_gcm3: self.mantle_density_gcm3,
        }
    }
}

impl Simulation {
    pub fn new(name: impl Into<String>) -> Self {
        Simulation {
            id: Uuid::new_v4(),
            name: name.into(),
            planet_id: None,
        }
    }

    pub fn generate_planet(&mut self, params: SimPlanetParams) -> SimResult<Planet> {
        if let Some(existing) = self.planet_id {
            return Err(SimError::DegenerateInput(format!(
                "simulation {} already has planet {}",
                self.id, existing
            )));
        }

        let planet = Planet::new(params.into_planet_params(self.id))?;
        self.planet_id = Some(planet.id);
        Ok(planet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::EARTH_RADIUS_KM;

    #[test]
    fn test_sim_new() {
        let sim = Simulation::new("test");
        assert_ne!(sim.id, Uuid::nil());
        assert!(sim.planet_id.is_none());
    }

    #[test]
    fn test_generate_planet_success() {
        let mut sim = Simulation::new("test");
        let planet = sim
            .generate_planet(SimPlanetParams {
                name: "earth".to_string(),
                radius_km: EARTH_RADIUS_KM,
                mantle_density_gcm3: None,
            })
            .unwrap();

        assert_eq!(planet.sim_id, sim.id);
        assert_eq!(planet.radius_km, EARTH_RADIUS_KM);
        assert_eq!(sim.planet_id, Some(planet.id));
    }

    #[test]
    fn test_generate_planet_already_has_planet() {
        let mut sim = Simulation::new("test");
        sim.generate_planet(SimPlanetParams {
            name: "first".to_string(),
            radius_km: EARTH_RADIUS_KM / 2.0,
            mantle_density_gcm3: None,
        })
        .unwrap();
        let second = sim.generate_planet(SimPlanetParams {
            name: "second".to_string(),
            radius_km: EARTH_RADIUS_KM * 2.0,
            mantle_density_gcm3: None,
        });
        assert!(second.is_err());
    }
}
