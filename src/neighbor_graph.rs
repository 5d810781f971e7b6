//! Keeps each plate's platelet patch closed and its neighbor sets honest.
//!
//! Gap-fill and refresh rewrite a plate's neighbor graph in place, so a
//! single plate must not be processed by two callers at once. Distinct
//! plates are independent.

use crate::config::SimConfig;
use crate::error::{SimError, SimResult};
use crate::geoconverter::GeoCellConverter;
use crate::plate::{Plate, Platelet, PlateletState};
use crate::store::SimStore;
use h3o::CellIndex;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphStats {
    pub created: usize,
    pub updated: usize,
    pub live: usize,
}

pub struct NeighborGraph {
    store: SimStore,
    config: SimConfig,
}

impl NeighborGraph {
    pub fn new(store: SimStore, config: SimConfig) -> Self {
        NeighborGraph { store, config }
    }

    fn load(&self, plate_id: Uuid) -> SimResult<(Plate, GeoCellConverter)> {
        let plate = self.store.plate(plate_id)?;
        let planet = self.store.planet(plate.planet_id)?;
        Ok((plate, GeoCellConverter::new(planet.radius_km, self.config.resolution)))
    }

    fn live_cells(&self, plate_id: Uuid) -> SimResult<HashMap<CellIndex, Platelet>> {
        Ok(self
            .store
            .live_platelets_for_plate(plate_id)?
            .into_iter()
            .map(|p| (p.cell, p))
            .collect())
    }

    /// Creates the platelets a closed patch should have but doesn't: any
    /// cell adjacent to a live platelet whose center lies within the plate.
    /// Returns how many were created.
    pub fn gap_fill(&self, plate_id: Uuid) -> SimResult<usize> {
        let (plate, converter) = self.load(plate_id)?;
        let records = self.store.platelets_for_plate(plate_id)?;

        // eroded cells and removed records still occupy their cell
        let mut known: HashSet<CellIndex> = records
            .iter()
            .map(|p| p.cell)
            .chain(plate.eroded_cells.iter().copied())
            .collect();
        let mut worklist: VecDeque<CellIndex> = records
            .iter()
            .filter(|p| p.is_active())
            .map(|p| p.cell)
            .collect();
        let mut visited: HashSet<CellIndex> = worklist.iter().copied().collect();

        let cell_radius = converter.cell_radius_km();
        let mut created: Vec<Platelet> = Vec::new();

        while let Some(cell) = worklist.pop_front() {
            for neighbor in converter.neighbors_of(cell) {
                if !visited.insert(neighbor) || known.contains(&neighbor) {
                    continue;
                }
                if !converter.is_valid(neighbor) {
                    continue;
                }
                let position = converter.cell_to_vec3(neighbor);
                if !plate.contains(position) {
                    continue;
                }
                if created.len() >= self.config.max_gap_fill {
                    warn!(plate = %plate_id, cap = self.config.max_gap_fill, "gap fill cap reached");
                    worklist.clear();
                    break;
                }
                known.insert(neighbor);
                created.push(Platelet::for_cell(&plate, neighbor, position, cell_radius));
                worklist.push_back(neighbor);
            }
        }

        if !created.is_empty() {
            self.store.platelets.set_many(&created)?;
        }
        debug!(plate = %plate_id, created = created.len(), "gap fill complete");
        Ok(created.len())
    }

    /// Recomputes every live platelet's neighbor set from the platelets that
    /// currently exist, persisting only the sets that changed.
    pub fn refresh_neighbors(&self, plate_id: Uuid) -> SimResult<usize> {
        let converter = GeoCellConverter::new(1.0, self.config.resolution);
        let live = self.live_cells(plate_id)?;

        let mut updated = 0;
        for (cell, platelet) in &live {
            let neighbors: BTreeSet<CellIndex> = converter
                .neighbors_of(*cell)
                .into_iter()
                .filter(|n| live.contains_key(n))
                .collect();
            if neighbors == platelet.neighbor_cells {
                continue;
            }
            let mut next = Some(neighbors);
            let result = self.store.platelets.mutate(&platelet.id, &mut |p| {
                if let Some(neighbors) = next.take() {
                    p.neighbor_cells = neighbors;
                }
            })?;
            if result.is_some() {
                updated += 1;
            }
        }

        debug!(plate = %plate_id, live = live.len(), updated, "refreshed neighbors");
        Ok(updated)
    }

    /// Gap-fill followed by a refresh: the full population pass for a plate.
    pub fn populate(&self, plate_id: Uuid) -> SimResult<GraphStats> {
        let created = self.gap_fill(plate_id)?;
        let updated = self.refresh_neighbors(plate_id)?;
        let live = self.store.live_platelets_for_plate(plate_id)?.len();
        Ok(GraphStats { created, updated, live })
    }

    /// Refreshes many plates one after another; a failing plate is logged and skipped.
    pub fn refresh_plates(&self, plate_ids: &[Uuid]) -> usize {
        plate_ids
            .iter()
            .filter_map(|&plate_id| match self.refresh_neighbors(plate_id) {
                Ok(updated) => Some(updated),
                Err(e) => {
                    warn!(plate = %plate_id, error = %e, "neighbor refresh failed");
                    None
                }
            })
            .sum()
    }

    /// Live platelets with fewer than six live neighbors, ordered by cell.
    /// Only meaningful right after a refresh.
    pub fn edge_platelets(&self, plate_id: Uuid) -> SimResult<Vec<Platelet>> {
        Ok(self
            .store
            .live_platelets_for_plate(plate_id)?
            .into_iter()
            .filter(Platelet::is_edge)
            .collect())
    }

    /// Neighbor references pointing at cells with no live platelet.
    pub fn dangling_references(&self, plate_id: Uuid) -> SimResult<usize> {
        let live = self.live_cells(plate_id)?;
        Ok(live
            .values()
            .flat_map(|p| p.neighbor_cells.iter())
            .filter(|cell| !live.contains_key(cell))
            .count())
    }

    /// Fails on a neighbor reference with no live platelet behind it.
    pub fn check_consistency(&self, plate_id: Uuid) -> SimResult<()> {
        let live = self.live_cells(plate_id)?;
        for platelet in live.values() {
            if let Some(cell) = platelet.neighbor_cells.iter().find(|cell| !live.contains_key(*cell)) {
                return Err(SimError::GraphInconsistency(format!(
                    "platelet {} references cell {} with no live platelet",
                    platelet.id, cell
                )));
            }
        }
        Ok(())
    }

    /// In-bounds adjacent cells of live platelets that have no platelet record at all.
    pub fn missing_in_bounds_neighbors(&self, plate_id: Uuid) -> SimResult<usize> {
        let (plate, converter) = self.load(plate_id)?;
        let records = self.store.platelets_for_plate(plate_id)?;
        let known: HashSet<CellIndex> = records
            .iter()
            .map(|p| p.cell)
            .chain(plate.eroded_cells.iter().copied())
            .collect();

        let missing: HashSet<CellIndex> = records
            .iter()
            .filter(|p| p.state == PlateletState::Active)
            .flat_map(|p| converter.neighbors_of(p.cell))
            .filter(|cell| !known.contains(cell))
            .filter(|cell| plate.contains(converter.cell_to_vec3(*cell)))
            .collect();
        Ok(missing.len())
    }
}
