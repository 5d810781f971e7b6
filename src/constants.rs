use h3o::Resolution;
use once_cell::sync::Lazy;
use uuid::Uuid;
use crate::planet::Planet;

pub const EARTH_ID: Uuid = Uuid::from_u128(0x1234567890abcdef1234567890abcdef);
pub const EARTH_SIM_ID: Uuid = Uuid::from_u128(0xfedcba9876543210fedcba9876543210);

pub const EARTH_RADIUS_KM: f64 = 6372.0;
pub const RHO_EARTH: f64 = 4.5; // g/cm³

// ===== Platelets =====
pub const PLATELET_RESOLUTION: Resolution = Resolution::Three;
/// hex footprints under-cover a disc; candidates are generated out to 133% of the radius
pub const COVERAGE_MARGIN: f64 = 1.33;
/// ring k contributes 6k candidates
pub const MAX_RINGS: u32 = 20;
pub const MAX_GAP_FILL: usize = 200_000;
pub const FULL_NEIGHBOR_COUNT: usize = 6;

// ===== Force layout =====
pub const LAYOUT_DAMPING: f64 = 0.33;
pub const LAYOUT_TIME_STEP: f64 = 1.0;
pub const INTERACTION_FACTOR: f64 = 1.2;
pub const LAYOUT_EPSILON_KM: f64 = 0.5;
pub const MAX_LAYOUT_STEPS: u32 = 200;

// ===== Erosion =====
pub const EROSION_MIN_PLATELETS: usize = 30; // at or below: untouched
pub const EROSION_CASCADE_PLATELETS: usize = 40; // at or above: cascading
pub const EROSION_CEILING_RATIO: f64 = 0.25;
pub const EROSION_MIN_CEILING: usize = 2;
pub const EROSION_DIRECT_RATIO: f64 = 0.2;
pub const EROSION_SEED_RATIO: f64 = 0.2;
pub const EROSION_MIN_SEEDS: usize = 2;
pub const CASCADE_MIN_STEPS: usize = 2;
pub const CASCADE_MAX_STEPS: usize = 8;

// ===== Plate behaviour bands (g/cm³) =====
pub const CONTINENTAL_MAX_DENSITY: f64 = 2.85;
pub const OCEANIC_MIN_DENSITY: f64 = 3.0;

pub static EARTH: Lazy<Planet> = Lazy::new(|| Planet {
    id: EARTH_ID,
    sim_id: EARTH_SIM_ID,
    name: "Earth".to_string(),
    radius_km: EARTH_RADIUS_KM,
    mantle_density_gcm3: RHO_EARTH,
});
