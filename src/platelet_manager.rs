use crate::config::SimConfig;
use crate::error::{SimError, SimResult};
use crate::geoconverter::GeoCellConverter;
use crate::plate::{Plate, Platelet};
use crate::store::SimStore;
use h3o::Resolution;
use rayon::prelude::*;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Self-contained request for generating one plate's platelets; carries
/// everything needed so it can run without reading plates or planets.
#[derive(Debug, Clone)]
pub struct PlateletJob {
    pub plate_id: Uuid,
    pub plate: Plate,
    pub planet_radius_km: f64,
    pub resolution: Resolution,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlateletJobResult {
    pub plate_id: Uuid,
    pub platelet_count: usize,
}

/// Number of hex rings around the center cell needed to cover the plate
/// with `margin`, never more than `max_rings`.
pub fn ring_count(radius_km: f64, converter: &GeoCellConverter, margin: f64, max_rings: u32) -> u32 {
    let spacing = converter.cell_spacing_km();
    let rings = (radius_km * margin / spacing).ceil();
    if !rings.is_finite() || rings < 0.0 {
        return 0;
    }
    (rings as u32).min(max_rings)
}

/// Discretizes a plate's disc footprint into platelets without persisting them.
///
/// Candidates come from a disk of rings around the center cell; membership
/// is decided by the exact distance test against the plate radius. A plate
/// too small to contain any cell center still gets one platelet at its center.
/// Cells in `plate.eroded_cells` are skipped.
pub fn platelets_for_plate(
    plate: &Plate,
    converter: &GeoCellConverter,
    margin: f64,
    max_rings: u32,
) -> SimResult<Vec<Platelet>> {
    let center = converter.vec3_to_cell(plate.position).ok_or_else(|| {
        SimError::DegenerateInput(format!("plate {} has no grid cell at its center", plate.id))
    })?;

    let rings = ring_count(plate.radius_km, converter, margin, max_rings);
    let cell_radius = converter.cell_radius_km();

    let platelets: Vec<Platelet> = converter
        .disk(center, rings)
        .into_iter()
        .filter(|cell| converter.is_valid(*cell) && !plate.eroded_cells.contains(cell))
        .filter_map(|cell| {
            let position = converter.cell_to_vec3(cell);
            plate
                .contains(position)
                .then(|| Platelet::for_cell(plate, cell, position, cell_radius))
        })
        .collect();

    if platelets.is_empty() && !plate.eroded_cells.contains(&center) {
        debug!(plate = %plate.id, radius_km = plate.radius_km, "no cell inside plate; emitting center platelet");
        return Ok(vec![Platelet::for_cell(plate, center, plate.position, cell_radius)]);
    }

    Ok(platelets)
}

pub struct PlateletManager {
    store: SimStore,
    config: SimConfig,
}

impl PlateletManager {
    pub fn new(store: SimStore, config: SimConfig) -> Self {
        PlateletManager { store, config }
    }

    fn converter(&self, planet_radius_km: f64, resolution: Resolution) -> GeoCellConverter {
        GeoCellConverter::new(planet_radius_km, resolution)
    }

    /// Generates and persists the platelets of one plate, returning how many
    /// were written. Failures are logged and count as zero so batches go on.
    pub fn generate_platelets(&self, plate_id: Uuid) -> usize {
        match self.try_generate_platelets(plate_id) {
            Ok(count) => count,
            Err(e) => {
                warn!(plate = %plate_id, error = %e, "platelet generation failed");
                0
            }
        }
    }

    pub fn try_generate_platelets(&self, plate_id: Uuid) -> SimResult<usize> {
        let plate = self.store.plate(plate_id)?;
        let planet = self.store.planet(plate.planet_id)?;
        self.persist_for(&plate, planet.radius_km, self.config.resolution)
    }

    fn persist_for(&self, plate: &Plate, planet_radius_km: f64, resolution: Resolution) -> SimResult<usize> {
        let converter = self.converter(planet_radius_km, resolution);
        let platelets = platelets_for_plate(
            plate,
            &converter,
            self.config.coverage_margin,
            self.config.max_rings,
        )?;
        self.store.platelets.set_many(&platelets)?;
        debug!(plate = %plate.id, count = platelets.len(), "persisted platelets");
        Ok(platelets.len())
    }

    /// Generates platelets for many plates in parallel; one failing plate
    /// does not affect the others.
    pub fn generate_for_plates(&self, plate_ids: &[Uuid]) -> Vec<(Uuid, usize)> {
        let results: Vec<(Uuid, usize)> = plate_ids
            .par_iter()
            .map(|&plate_id| (plate_id, self.generate_platelets(plate_id)))
            .collect();
        let total: usize = results.iter().map(|(_, count)| count).sum();
        info!(plates = plate_ids.len(), platelets = total, "generated platelets");
        results
    }

    pub fn run_job(&self, job: PlateletJob) -> Result<PlateletJobResult, String> {
        if job.plate.id != job.plate_id {
            return Err(format!(
                "job plate id {} does not match plate data {}",
                job.plate_id, job.plate.id
            ));
        }
        self.persist_for(&job.plate, job.planet_radius_km, job.resolution)
            .map(|platelet_count| PlateletJobResult {
                plate_id: job.plate_id,
                platelet_count,
            })
            .map_err(|e| e.to_string())
    }

    pub fn run_jobs(&self, jobs: Vec<PlateletJob>) -> Vec<Result<PlateletJobResult, String>> {
        jobs.into_par_iter().map(|job| self.run_job(job)).collect()
    }
}
