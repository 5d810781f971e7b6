use glam::Vec3;
use h3o::{CellIndex, Resolution};
use rand::Rng;
use rand::seq::SliceRandom;
use crate::geoconverter::GeoCellConverter;

/// Hands out plate centers that are spread across the planet: each call
/// picks a random child of the next base cell in a shuffled rotation.
pub struct PointSampler {
    primary_cells: Vec<CellIndex>,
    current_index: usize,
    planet_radius_km: f64,
    resolution: Resolution,
}

impl PointSampler {
    pub fn new(planet_radius_km: f64, resolution: Resolution) -> Self {
        PointSampler {
            primary_cells: CellIndex::base_cells().collect(),
            current_index: 0,
            planet_radius_km,
            resolution,
        }
    }

    fn random_child<R: Rng>(&self, parent: &CellIndex, rng: &mut R) -> CellIndex {
        let children: Vec<CellIndex> = parent.children(self.resolution).collect();
        if children.is_empty() {
            return *parent;
        }
        children[rng.random_range(0..children.len())]
    }

    /*
    Consecutive points land in different base cells, so they are at least
    a fine cell apart and usually about a base cell apart. That is not
    true randomness, but it keeps plates from stacking on top of each other.
     */
    pub fn random_point_on_planet<R: Rng>(&mut self, rng: &mut R) -> Vec3 {
        if self.current_index == 0 {
            self.primary_cells.shuffle(rng);
        }

        let primary_cell = self.primary_cells[self.current_index];
        let cell = self.random_child(&primary_cell, rng);
        let point = GeoCellConverter::cell_to_unit_vec3(&cell) * self.planet_radius_km as f32;

        self.current_index = (self.current_index + 1) % self.primary_cells.len();

        point
    }
}
