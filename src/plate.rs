use std::collections::BTreeSet;
use glam::Vec3;
use h3o::CellIndex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::constants::{CONTINENTAL_MAX_DENSITY, OCEANIC_MIN_DENSITY};
use crate::error::{SimError, SimResult};

/// Coarse behaviour class derived from density banding.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlateBehavior {
    Continental,
    Transitional,
    Oceanic,
}

impl PlateBehavior {
    pub fn from_density(density: f64) -> Self {
        if density < CONTINENTAL_MAX_DENSITY {
            PlateBehavior::Continental
        } else if density > OCEANIC_MIN_DENSITY {
            PlateBehavior::Oceanic
        } else {
            PlateBehavior::Transitional
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Plate {
    pub id: Uuid,
    pub name: String,
    pub position: Vec3,
    pub radius_km: f64,
    pub thickness_km: f64,
    pub density: f64,
    pub mass: f64,
    pub behavior: PlateBehavior,
    pub planet_id: Uuid,
    /// cells erosion took from this plate; never repopulated
    pub eroded_cells: BTreeSet<CellIndex>,
}

#[derive(Clone)]
pub struct PlateParams {
    pub name: String,
    pub position: Vec3,
    pub radius_km: f64,
    pub thickness_km: f64,
    pub density: f64,
    pub planet_id: Uuid,
    pub planet_radius_km: f64,
}

impl Plate {
    /// Creates a new Plate, projecting `position` onto the planet's sphere.
    pub fn new(params: PlateParams) -> SimResult<Self> {
        let PlateParams {
            name,
            position,
            radius_km,
            thickness_km,
            density,
            planet_id,
            planet_radius_km,
        } = params;

        if position.length_squared() == 0.0 {
            return Err(SimError::DegenerateInput("plate cannot be at origin".to_string()));
        }
        if !(radius_km > 0.0) {
            return Err(SimError::DegenerateInput(format!("plate radius must be positive, got {}", radius_km)));
        }
        if !(density > 0.0) {
            return Err(SimError::DegenerateInput(format!("plate density must be positive, got {}", density)));
        }
        if !(thickness_km > 0.0) {
            return Err(SimError::DegenerateInput(format!("plate thickness must be positive, got {}", thickness_km)));
        }
        if !(planet_radius_km > 0.0) {
            return Err(SimError::DegenerateInput(format!("planet radius must be positive, got {}", planet_radius_km)));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            name,
            position: position.normalize() * planet_radius_km as f32,
            radius_km,
            thickness_km,
            density,
            mass: plate_mass(radius_km, thickness_km, density),
            behavior: PlateBehavior::from_density(density),
            planet_id,
            eroded_cells: BTreeSet::new(),
        })
    }

    /// Height the plate floats above the mantle surface (Airy isostasy).
    pub fn isostatic_elevation(&self, mantle_density: f64) -> f64 {
        isostatic_elevation(self.thickness_km, self.density, mantle_density)
    }

    pub fn contains(&self, point: Vec3) -> bool {
        (point.distance(self.position) as f64) <= self.radius_km
    }
}

/// Mass in km³·g/cm³; only ratios of masses are used.
pub fn plate_mass(radius_km: f64, thickness_km: f64, density: f64) -> f64 {
    std::f64::consts::PI * radius_km.powi(2) * thickness_km * density
}

pub fn isostatic_elevation(thickness_km: f64, density: f64, mantle_density: f64) -> f64 {
    thickness_km * (1.0 - density / mantle_density)
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlateletState {
    #[default]
    Active,
    Removed,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Platelet {
    pub id: String,
    pub plate_id: Uuid,
    pub planet_id: Uuid,
    pub position: Vec3,
    pub cell: CellIndex,
    pub radius_km: f64,
    pub thickness_km: f64,
    pub density: f64,
    pub neighbor_cells: BTreeSet<CellIndex>, // live adjacent cells, at most 6
    pub state: PlateletState,
}

impl Platelet {
    pub fn for_cell(plate: &Plate, cell: CellIndex, position: Vec3, radius_km: f64) -> Self {
        Platelet {
            id: Platelet::id_for(plate.id, cell),
            plate_id: plate.id,
            planet_id: plate.planet_id,
            position,
            cell,
            radius_km,
            thickness_km: plate.thickness_km,
            density: plate.density,
            neighbor_cells: BTreeSet::new(),
            state: PlateletState::Active,
        }
    }

    pub fn id_for(plate_id: Uuid, cell: CellIndex) -> String {
        format!("{}-{}", plate_id, cell)
    }

    pub fn is_active(&self) -> bool {
        self.state == PlateletState::Active
    }

    pub fn is_edge(&self) -> bool {
        self.neighbor_cells.len() < crate::constants::FULL_NEIGHBOR_COUNT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::EARTH_RADIUS_KM;

    fn params() -> PlateParams {
        PlateParams {
            name: "alpha".to_string(),
            position: Vec3::new(1.0, 2.0, 3.0),
            radius_km: 800.0,
            thickness_km: 30.0,
            density: 2.7,
            planet_id: Uuid::new_v4(),
            planet_radius_km: EARTH_RADIUS_KM,
        }
    }

    #[test]
    fn position_is_projected_onto_sphere() {
        let plate = Plate::new(params()).unwrap();
        assert!((plate.position.length() as f64 - EARTH_RADIUS_KM).abs() < 1.0);
    }

    #[test]
    fn derived_fields() {
        let plate = Plate::new(params()).unwrap();
        assert_eq!(plate.behavior, PlateBehavior::Continental);
        assert!((plate.mass - plate_mass(800.0, 30.0, 2.7)).abs() < 1e-3);
    }

    #[test]
    fn behavior_bands() {
        assert_eq!(PlateBehavior::from_density(2.7), PlateBehavior::Continental);
        assert_eq!(PlateBehavior::from_density(2.9), PlateBehavior::Transitional);
        assert_eq!(PlateBehavior::from_density(3.2), PlateBehavior::Oceanic);
    }

    #[test]
    fn degenerate_plates_are_rejected() {
        let mut origin = params();
        origin.position = Vec3::ZERO;
        assert!(matches!(Plate::new(origin), Err(SimError::DegenerateInput(_))));

        let mut flat = params();
        flat.thickness_km = 0.0;
        assert!(Plate::new(flat).is_err());

        let mut empty = params();
        empty.radius_km = -5.0;
        assert!(Plate::new(empty).is_err());
    }

    #[test]
    fn lighter_plates_float_higher() {
        let light = isostatic_elevation(35.0, 2.7, 3.3);
        let heavy = isostatic_elevation(35.0, 3.1, 3.3);
        assert!(light > heavy);
        assert!(heavy > 0.0);
    }

    #[test]
    fn platelet_ids_are_deterministic() {
        let plate = Plate::new(params()).unwrap();
        let cell = CellIndex::try_from(0x8a1fb46622dffff_u64).unwrap();
        let a = Platelet::for_cell(&plate, cell, plate.position, 10.0);
        let b = Platelet::for_cell(&plate, cell, plate.position, 10.0);
        assert_eq!(a.id, b.id);
        assert_eq!(a.id, format!("{}-{}", plate.id, cell));
        assert!(a.is_active());
        assert!(a.is_edge());
    }
}
