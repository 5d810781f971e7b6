//! Erodes plate boundaries into irregular coastlines.
//!
//! Edge platelets (fewer than six live neighbors) are removed either
//! directly or by cascading walks into the plate, depending on how many
//! platelets the plate has. The walk is random by intent; seed the RNG
//! for reproducible outlines.

use crate::config::{ErosionTable, SimConfig};
use crate::error::{SimError, SimResult};
use crate::neighbor_graph::NeighborGraph;
use crate::plate::{Platelet, PlateletState};
use crate::store::SimStore;
use h3o::CellIndex;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErosionStrategy {
    /// Too small to erode.
    None,
    /// Random edge platelets are removed outright.
    Direct,
    /// Random edge seeds start walks that carve scars into the plate.
    Cascade,
}

impl ErosionStrategy {
    pub fn for_count(live: usize, table: &ErosionTable) -> Self {
        if live <= table.min_platelets {
            ErosionStrategy::None
        } else if live < table.cascade_platelets {
            ErosionStrategy::Direct
        } else {
            ErosionStrategy::Cascade
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlateErosion {
    pub plate_id: Uuid,
    pub strategy: ErosionStrategy,
    pub live_before: usize,
    pub edge_count: usize,
    pub max_allowed: usize,
    pub flagged: usize,
    pub removed: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErosionReport {
    pub plates_processed: usize,
    pub plates_failed: usize,
    pub flagged: usize,
    pub removed: usize,
    pub plates: Vec<PlateErosion>,
}

pub struct EdgeErosion {
    store: SimStore,
    sim_id: Uuid,
    graph: NeighborGraph,
    table: ErosionTable,
    rng: StdRng,
}

impl EdgeErosion {
    pub fn new(store: SimStore, sim_id: Uuid, config: SimConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        EdgeErosion {
            graph: NeighborGraph::new(store.clone(), config.clone()),
            table: config.erosion,
            store,
            sim_id,
            rng,
        }
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Erodes every plate of the simulation's planet. A missing simulation
    /// or planet aborts; a failing plate is logged and skipped.
    pub fn create_irregular_plate_edges(&mut self) -> SimResult<ErosionReport> {
        let sim = self.store.sim(self.sim_id)?;
        let planet_id = sim
            .planet_id
            .ok_or_else(|| SimError::not_found("planet of simulation", self.sim_id))?;
        let plates = self.store.plates_for_planet(planet_id)?;

        let mut report = ErosionReport::default();
        for plate in plates {
            match self.erode_plate(plate.id) {
                Ok(outcome) => {
                    report.plates_processed += 1;
                    report.flagged += outcome.flagged;
                    report.removed += outcome.removed;
                    report.plates.push(outcome);
                }
                Err(e) => {
                    report.plates_failed += 1;
                    warn!(plate = %plate.id, error = %e, "erosion failed");
                }
            }
        }

        info!(
            plates = report.plates_processed,
            flagged = report.flagged,
            removed = report.removed,
            "eroded plate edges"
        );
        Ok(report)
    }

    pub fn erode_plate(&mut self, plate_id: Uuid) -> SimResult<PlateErosion> {
        // neighbor counts are only trustworthy right after a refresh
        self.graph.refresh_neighbors(plate_id)?;
        let live: HashMap<CellIndex, Platelet> = self
            .store
            .live_platelets_for_plate(plate_id)?
            .into_iter()
            .map(|p| (p.cell, p))
            .collect();

        let mut edges: Vec<CellIndex> = live
            .values()
            .filter(|p| p.is_edge())
            .map(|p| p.cell)
            .collect();
        edges.sort();

        let strategy = ErosionStrategy::for_count(live.len(), &self.table);
        let max_allowed = self.table.max_allowed_deletions(edges.len());

        let marked = match strategy {
            ErosionStrategy::None => Vec::new(),
            ErosionStrategy::Direct => self.select_direct(&edges),
            ErosionStrategy::Cascade => self.select_cascading(&edges, &live, max_allowed),
        };

        let removed = if marked.is_empty() {
            0
        } else {
            self.remove_marked(plate_id, &marked, &live)?
        };

        debug!(
            plate = %plate_id,
            ?strategy,
            live = live.len(),
            edges = edges.len(),
            max_allowed,
            flagged = marked.len(),
            removed,
            "eroded plate"
        );

        Ok(PlateErosion {
            plate_id,
            strategy,
            live_before: live.len(),
            edge_count: edges.len(),
            max_allowed,
            flagged: marked.len(),
            removed,
        })
    }

    fn select_direct(&mut self, edges: &[CellIndex]) -> Vec<CellIndex> {
        let count = self.table.direct_count(edges.len());
        edges.choose_multiple(&mut self.rng, count).copied().collect()
    }

    fn select_cascading(
        &mut self,
        edges: &[CellIndex],
        live: &HashMap<CellIndex, Platelet>,
        max_allowed: usize,
    ) -> Vec<CellIndex> {
        let seed_count = self.table.seed_count(edges.len());
        let seeds: Vec<CellIndex> = edges.choose_multiple(&mut self.rng, seed_count).copied().collect();

        let mut marked: Vec<CellIndex> = Vec::new();
        let mut visited: HashSet<CellIndex> = HashSet::new();

        for seed in seeds {
            if marked.len() >= max_allowed {
                break;
            }
            if !visited.insert(seed) {
                continue;
            }
            marked.push(seed);

            let budget = self
                .rng
                .random_range(self.table.cascade_min_steps..=self.table.cascade_max_steps);
            let mut current = seed;
            for _ in 0..budget {
                if marked.len() >= max_allowed {
                    break;
                }
                // a missing record ends this branch
                let Some(platelet) = live.get(&current) else {
                    break;
                };
                let candidates: Vec<CellIndex> = platelet
                    .neighbor_cells
                    .iter()
                    .filter(|cell| live.contains_key(cell) && !visited.contains(cell))
                    .copied()
                    .collect();
                let Some(&next) = candidates.choose(&mut self.rng) else {
                    break;
                };
                visited.insert(next);
                marked.push(next);
                current = next;
            }
        }

        marked
    }

    /// Records the marked cells on the plate, flags the platelets as
    /// removed, strips them from their surviving neighbors, then deletes
    /// them in one batch. The plate's record keeps gap-fill and
    /// regeneration from bringing an eroded cell back.
    fn remove_marked(
        &self,
        plate_id: Uuid,
        marked: &[CellIndex],
        live: &HashMap<CellIndex, Platelet>,
    ) -> SimResult<usize> {
        let marked_set: HashSet<CellIndex> = marked
            .iter()
            .copied()
            .filter(|cell| live.contains_key(cell))
            .collect();

        let recorded = self.store.plates.mutate(&plate_id.to_string(), &mut |plate| {
            plate.eroded_cells.extend(marked_set.iter().copied());
        })?;
        if recorded.is_none() {
            return Err(SimError::not_found("plate", plate_id));
        }

        let mut ids: Vec<String> = Vec::with_capacity(marked_set.len());
        for cell in marked {
            let Some(platelet) = live.get(cell) else {
                continue;
            };
            self.store
                .platelets
                .mutate(&platelet.id, &mut |p| p.state = PlateletState::Removed)?;
            ids.push(platelet.id.clone());

            for neighbor_cell in &platelet.neighbor_cells {
                if marked_set.contains(neighbor_cell) {
                    continue;
                }
                let Some(neighbor) = live.get(neighbor_cell) else {
                    continue;
                };
                let stripped = self.store.platelets.mutate(&neighbor.id, &mut |p| {
                    p.neighbor_cells.remove(cell);
                })?;
                if stripped.is_none() {
                    debug!(platelet = %platelet.id, neighbor = %neighbor.id, "neighbor vanished during erosion");
                }
            }
        }

        self.store.platelets.delete_many(&ids)
    }
}
