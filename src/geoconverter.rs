use glam::Vec3;
use h3o::{CellIndex, LatLng, Resolution};

/// Sphere radius h3 measures its edge lengths on.
const H3_EARTH_RADIUS_KM: f64 = 6371.007180918475;

/// Utility to convert between Vec3 and CellIndex for a spherical planet,
/// and to walk the hex grid around a cell.
#[derive(Debug, Clone, Copy)]
pub struct GeoCellConverter {
    pub radius_km: f64,
    pub resolution: Resolution,
}

impl GeoCellConverter {
    pub fn new(radius_km: f64, resolution: Resolution) -> GeoCellConverter {
        GeoCellConverter {
            radius_km,
            resolution,
        }
    }

    /// Circumradius of an average hexagon at this resolution, scaled to this planet.
    pub fn cell_radius_km(&self) -> f64 {
        self.resolution.edge_length_km() * self.radius_km / H3_EARTH_RADIUS_KM
    }

    /// Center-to-center distance between adjacent cells.
    pub fn cell_spacing_km(&self) -> f64 {
        self.cell_radius_km() * 3f64.sqrt()
    }

    fn cell_to_radians(cell: &CellIndex) -> (f64, f64) {
        let ll = LatLng::from(*cell);
        (ll.lat_radians(), ll.lng_radians())
    }

    fn vec3_to_lat_lng(v: Vec3) -> Option<LatLng> {
        let unit = v.as_dvec3().normalize_or_zero();
        if unit.length_squared() == 0.0 {
            return None;
        }
        let lat = unit.z.clamp(-1.0, 1.0).asin();
        let lng = unit.y.atan2(unit.x);
        LatLng::from_radians(lat, lng).ok()
    }

    pub fn cell_to_unit_vec3(cell: &CellIndex) -> Vec3 {
        let (lat, lng) = GeoCellConverter::cell_to_radians(cell);
        let (cos_lat, sin_lat) = (lat.cos(), lat.sin());
        let (cos_lng, sin_lng) = (lng.cos(), lng.sin());
        Vec3::new(
            (cos_lat * cos_lng) as f32,
            (cos_lat * sin_lng) as f32,
            sin_lat as f32,
        )
    }

    pub fn vec3_to_cell(&self, point: Vec3) -> Option<CellIndex> {
        let lat_lng = GeoCellConverter::vec3_to_lat_lng(point)?;
        Some(lat_lng.to_cell(self.resolution))
    }

    pub fn lat_lng_to_cell(&self, lat_deg: f64, lng_deg: f64) -> Option<CellIndex> {
        LatLng::new(lat_deg, lng_deg)
            .ok()
            .map(|ll| ll.to_cell(self.resolution))
    }

    pub fn cell_to_vec3(&self, cell: CellIndex) -> Vec3 {
        let unit = GeoCellConverter::cell_to_unit_vec3(&cell);
        unit * self.radius_km as f32
    }

    /// Adjacent cells (6, or 5 around a pentagon).
    pub fn neighbors_of(&self, cell: CellIndex) -> Vec<CellIndex> {
        cell.grid_disk::<Vec<_>>(1)
            .into_iter()
            .filter(|&neighbor| neighbor != cell)
            .collect()
    }

    /// Every cell within `rings` steps of `cell`, including `cell`.
    pub fn disk(&self, cell: CellIndex, rings: u32) -> Vec<CellIndex> {
        cell.grid_disk::<Vec<_>>(rings)
    }

    pub fn children_of(&self, cell: CellIndex, resolution: Resolution) -> Vec<CellIndex> {
        cell.children(resolution).collect()
    }

    /// Cells of another resolution are not part of this grid.
    pub fn is_valid(&self, cell: CellIndex) -> bool {
        cell.resolution() == self.resolution
    }

    pub fn parse_cell(&self, raw: u64) -> Option<CellIndex> {
        CellIndex::try_from(raw).ok().filter(|cell| self.is_valid(*cell))
    }
}
