use crate::config::SimConfig;
use crate::edge_erosion::{EdgeErosion, ErosionReport};
use crate::error::{SimError, SimResult};
use crate::force_layout::{ForceLayoutEngine, LayoutReport};
use crate::neighbor_graph::NeighborGraph;
use crate::planet::Planet;
use crate::plate::Plate;
use crate::plate_generator::{PartialPlateGenConfig, PlateGenerator};
use crate::platelet_manager::PlateletManager;
use crate::sim::{SimPlanetParams, Simulation};
use crate::store::SimStore;
use tracing::{info, warn};
use uuid::Uuid;

pub enum SimManagerParams {
    Create {
        store: SimStore,
        name: String,
        planet_config: SimPlanetParams,
    },
    Load {
        store: SimStore,
        sim_id: Uuid,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    pub plates: usize,
    pub platelets_generated: usize,
    pub platelets_gap_filled: usize,
    pub layout: LayoutReport,
    pub erosion: ErosionReport,
    pub platelets_remaining: usize,
}

/// Owns one simulation and runs the plate pipeline against its store.
pub struct SimManager {
    sim_id: Uuid,
    store: SimStore,
    config: SimConfig,
}

impl SimManager {
    pub fn new(params: SimManagerParams, config: SimConfig) -> SimResult<Self> {
        match params {
            SimManagerParams::Load { store, sim_id } => {
                let sim = store.sim(sim_id)?;
                Ok(SimManager {
                    sim_id: sim.id,
                    store,
                    config,
                })
            }
            SimManagerParams::Create {
                store,
                name,
                planet_config,
            } => {
                let mut sim = Simulation::new(name);
                let planet = sim.generate_planet(planet_config)?;
                store.planets.set(&planet)?;
                store.sims.set(&sim)?;

                info!(sim = %sim.id, planet = %planet.id, "created simulation");
                Ok(SimManager {
                    sim_id: sim.id,
                    store,
                    config,
                })
            }
        }
    }

    pub fn sim_id(&self) -> Uuid {
        self.sim_id
    }

    pub fn store(&self) -> &SimStore {
        &self.store
    }

    pub fn sim(&self) -> SimResult<Simulation> {
        self.store.sim(self.sim_id)
    }

    pub fn planet(&self) -> SimResult<Planet> {
        let planet_id = self
            .sim()?
            .planet_id
            .ok_or_else(|| SimError::not_found("planet of simulation", self.sim_id))?;
        self.store.planet(planet_id)
    }

    pub fn plates(&self) -> SimResult<Vec<Plate>> {
        self.store.plates_for_planet(self.planet()?.id)
    }

    /// Generates plates from the power-law spectrum and persists them.
    pub fn generate_plates(&self, partial: PartialPlateGenConfig) -> SimResult<Vec<Uuid>> {
        let planet = self.planet()?;
        let mut generator = PlateGenerator::new(partial, &planet, self.config.seed);
        let plates = generator.generate_plates()?;
        self.store.plates.set_many(&plates)?;
        info!(count = plates.len(), "generated plates");
        Ok(plates.into_iter().map(|plate| plate.id).collect())
    }

    /// Generates platelets for every plate in parallel, then closes and
    /// links each plate's patch one plate at a time.
    pub fn populate_platelets(&self) -> SimResult<(usize, usize)> {
        let plate_ids: Vec<Uuid> = self.plates()?.into_iter().map(|p| p.id).collect();

        let manager = PlateletManager::new(self.store.clone(), self.config.clone());
        let generated: usize = manager
            .generate_for_plates(&plate_ids)
            .into_iter()
            .map(|(_, count)| count)
            .sum();

        let graph = NeighborGraph::new(self.store.clone(), self.config.clone());
        let mut gap_filled = 0;
        for plate_id in plate_ids {
            match graph.populate(plate_id) {
                Ok(stats) => gap_filled += stats.created,
                Err(e) => warn!(plate = %plate_id, error = %e, "neighbor population failed"),
            }
        }
        Ok((generated, gap_filled))
    }

    pub fn relax(&self, max_steps: u32) -> SimResult<LayoutReport> {
        let planet = self.planet()?;
        ForceLayoutEngine::new(self.store.clone(), planet.id, self.config.clone())
            .run_force_directed_layout(max_steps)
    }

    pub fn erode(&self) -> SimResult<ErosionReport> {
        EdgeErosion::new(self.store.clone(), self.sim_id, self.config.clone())
            .create_irregular_plate_edges()
    }

    /// Layout first so platelets are cut at the plates' final positions,
    /// then discretize, link and erode.
    pub fn run_pipeline(&self) -> SimResult<PipelineReport> {
        let layout = self.relax(self.config.max_layout_steps)?;
        let (platelets_generated, platelets_gap_filled) = self.populate_platelets()?;
        let erosion = self.erode()?;

        let plates = self.plates()?;
        let mut platelets_remaining = 0;
        for plate in &plates {
            platelets_remaining += self.store.live_platelets_for_plate(plate.id)?.len();
        }

        Ok(PipelineReport {
            plates: plates.len(),
            platelets_generated,
            platelets_gap_filled,
            layout,
            erosion,
            platelets_remaining,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rock_store::RockStore;
    use tempfile::tempdir;

    fn planet_config() -> SimPlanetParams {
        SimPlanetParams {
            name: "tiny".to_string(),
            radius_km: 3000.0,
            mantle_density_gcm3: Some(3.3),
        }
    }

    #[test]
    fn sim_and_planet_are_persisted_in_store() {
        let store = SimStore::in_memory();
        let manager = SimManager::new(
            SimManagerParams::Create {
                store: store.clone(),
                name: "persisted".to_string(),
                planet_config: planet_config(),
            },
            SimConfig::default(),
        )
        .unwrap();

        let sim = manager.sim().unwrap();
        let planet = manager.planet().unwrap();
        assert_eq!(sim.planet_id, Some(planet.id));
        assert_eq!(planet.sim_id, sim.id);
        assert_eq!(store.sims.count().unwrap(), 1);
    }

    #[test]
    fn load_existing_sim_from_rocksdb() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db");

        let (sim_id, planet_id) = {
            let store = RockStore::open(&path).unwrap();
            let manager = SimManager::new(
                SimManagerParams::Create {
                    store,
                    name: "reloaded".to_string(),
                    planet_config: planet_config(),
                },
                SimConfig::default(),
            )
            .unwrap();
            (manager.sim_id(), manager.planet().unwrap().id)
        };

        let store = RockStore::open(&path).unwrap();
        let manager = SimManager::new(SimManagerParams::Load { store, sim_id }, SimConfig::default()).unwrap();
        assert_eq!(manager.planet().unwrap().id, planet_id);
    }

    #[test]
    fn loading_unknown_sim_fails() {
        let result = SimManager::new(
            SimManagerParams::Load {
                store: SimStore::in_memory(),
                sim_id: Uuid::new_v4(),
            },
            SimConfig::default(),
        );
        assert!(matches!(result, Err(SimError::NotFound { .. })));
    }

    #[test]
    fn pipeline_runs_end_to_end() {
        crate::logging::init_tracing();
        let config = SimConfig::default().with_seed(21);
        let manager = SimManager::new(
            SimManagerParams::Create {
                store: SimStore::in_memory(),
                name: "pipeline".to_string(),
                planet_config: planet_config(),
            },
            config,
        )
        .unwrap();

        let plate_ids = manager
            .generate_plates(PartialPlateGenConfig {
                target_coverage: Some(0.4),
                min_plate_radius_km: Some(300.0),
                ..Default::default()
            })
            .unwrap();
        assert!(!plate_ids.is_empty());

        let report = manager.run_pipeline().unwrap();
        let planet = manager.planet().unwrap();
        assert_eq!(report.plates, plate_ids.len());
        assert!(report.platelets_generated >= report.plates);
        assert_eq!(
            report.platelets_remaining,
            report.platelets_generated + report.platelets_gap_filled - report.erosion.removed
        );

        let graph = NeighborGraph::new(manager.store().clone(), SimConfig::default());
        for plate in manager.plates().unwrap() {
            assert!((plate.position.length() as f64 - planet.radius_km).abs() < 1.0);
            assert_eq!(graph.dangling_references(plate.id).unwrap(), 0);
            graph.check_consistency(plate.id).unwrap();
            for p in manager.store().live_platelets_for_plate(plate.id).unwrap() {
                assert!(p.position.distance(plate.position) as f64 <= plate.radius_km + 1e-3);
            }
        }
    }
}
