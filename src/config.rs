use crate::constants::{
    CASCADE_MAX_STEPS, CASCADE_MIN_STEPS, COVERAGE_MARGIN, EROSION_CASCADE_PLATELETS,
    EROSION_CEILING_RATIO, EROSION_DIRECT_RATIO, EROSION_MIN_CEILING, EROSION_MIN_PLATELETS,
    EROSION_MIN_SEEDS, EROSION_SEED_RATIO, INTERACTION_FACTOR, LAYOUT_DAMPING, LAYOUT_EPSILON_KM,
    LAYOUT_TIME_STEP, MAX_GAP_FILL, MAX_LAYOUT_STEPS, MAX_RINGS, PLATELET_RESOLUTION,
};
use crate::error::SimResult;
use h3o::Resolution;
use serde::{Deserialize, Serialize};

/// Thresholds and ratios for boundary erosion, keyed by live platelet count.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ErosionTable {
    /// plates at or below this count are never eroded
    pub min_platelets: usize,
    /// plates at or above this count erode by cascading walks
    pub cascade_platelets: usize,
    pub ceiling_ratio: f64,
    pub min_ceiling: usize,
    /// share of edge platelets removed by direct erosion; kept below the
    /// ceiling so cascading plates always lose the larger share of their coast
    pub direct_ratio: f64,
    pub seed_ratio: f64,
    pub min_seeds: usize,
    pub cascade_min_steps: usize,
    pub cascade_max_steps: usize,
}

impl Default for ErosionTable {
    fn default() -> Self {
        Self {
            min_platelets: EROSION_MIN_PLATELETS,
            cascade_platelets: EROSION_CASCADE_PLATELETS,
            ceiling_ratio: EROSION_CEILING_RATIO,
            min_ceiling: EROSION_MIN_CEILING,
            direct_ratio: EROSION_DIRECT_RATIO,
            seed_ratio: EROSION_SEED_RATIO,
            min_seeds: EROSION_MIN_SEEDS,
            cascade_min_steps: CASCADE_MIN_STEPS,
            cascade_max_steps: CASCADE_MAX_STEPS,
        }
    }
}

impl ErosionTable {
    pub fn max_allowed_deletions(&self, edge_count: usize) -> usize {
        self.min_ceiling
            .max((edge_count as f64 * self.ceiling_ratio).floor() as usize)
    }

    pub fn direct_count(&self, edge_count: usize) -> usize {
        let wanted = 1.max((edge_count as f64 * self.direct_ratio).floor() as usize);
        wanted.min(self.max_allowed_deletions(edge_count))
    }

    pub fn seed_count(&self, edge_count: usize) -> usize {
        let wanted = self
            .min_seeds
            .max((edge_count as f64 * self.seed_ratio).floor() as usize);
        wanted.min(self.max_allowed_deletions(edge_count))
    }
}

/// Runtime configuration for the platelet, layout and erosion engines.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SimConfig {
    pub resolution: Resolution,
    pub coverage_margin: f64,
    pub max_rings: u32,
    pub max_gap_fill: usize,
    pub damping: f64,
    pub time_step: f64,
    pub interaction_factor: f64,
    pub epsilon_km: f64,
    pub max_layout_steps: u32,
    pub erosion: ErosionTable,
    pub seed: Option<u64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct PartialSimConfig {
    pub resolution: Option<Resolution>,
    pub coverage_margin: Option<f64>,
    pub max_rings: Option<u32>,
    pub max_gap_fill: Option<usize>,
    pub damping: Option<f64>,
    pub time_step: Option<f64>,
    pub interaction_factor: Option<f64>,
    pub epsilon_km: Option<f64>,
    pub max_layout_steps: Option<u32>,
    pub erosion: Option<ErosionTable>,
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig::from_partial(PartialSimConfig::default())
    }
}

impl SimConfig {
    pub fn from_partial(partial: PartialSimConfig) -> SimConfig {
        Self {
            resolution: partial.resolution.unwrap_or(PLATELET_RESOLUTION),
            coverage_margin: partial.coverage_margin.unwrap_or(COVERAGE_MARGIN),
            max_rings: partial.max_rings.unwrap_or(MAX_RINGS),
            max_gap_fill: partial.max_gap_fill.unwrap_or(MAX_GAP_FILL),
            damping: partial.damping.unwrap_or(LAYOUT_DAMPING),
            time_step: partial.time_step.unwrap_or(LAYOUT_TIME_STEP),
            interaction_factor: partial.interaction_factor.unwrap_or(INTERACTION_FACTOR),
            epsilon_km: partial.epsilon_km.unwrap_or(LAYOUT_EPSILON_KM),
            max_layout_steps: partial.max_layout_steps.unwrap_or(MAX_LAYOUT_STEPS),
            erosion: partial.erosion.unwrap_or_default(),
            seed: partial.seed,
        }
    }

    /// Parses a (possibly partial) JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> SimResult<SimConfig> {
        let partial: PartialSimConfig = serde_json::from_str(json)?;
        Ok(SimConfig::from_partial(partial))
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_damping(mut self, damping: f64) -> Self {
        self.damping = damping;
        self
    }

    pub fn with_max_rings(mut self, max_rings: u32) -> Self {
        self.max_rings = max_rings;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_constants() {
        let config = SimConfig::default();
        assert_eq!(config.resolution, Resolution::Three);
        assert_eq!(config.max_rings, 20);
        assert!((config.damping - 0.33).abs() < 1e-12);
        assert!(config.seed.is_none());
        assert_eq!(config.erosion, ErosionTable::default());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = SimConfig::from_json(r#"{ "damping": 0.5, "seed": 9 }"#).unwrap();
        assert!((config.damping - 0.5).abs() < 1e-12);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.max_rings, MAX_RINGS);
    }

    #[test]
    fn builders_override_fields() {
        let config = SimConfig::default()
            .with_resolution(Resolution::Two)
            .with_damping(0.1)
            .with_max_rings(4)
            .with_seed(3);
        assert_eq!(config.resolution, Resolution::Two);
        assert!((config.damping - 0.1).abs() < 1e-12);
        assert_eq!(config.max_rings, 4);
        assert_eq!(config.seed, Some(3));
    }

    #[test]
    fn bad_json_is_a_config_error() {
        let err = SimConfig::from_json("{ damping: ").unwrap_err();
        assert!(matches!(err, crate::error::SimError::Config(_)));
    }

    #[test]
    fn erosion_ceiling_has_a_floor_of_two() {
        let table = ErosionTable::default();
        assert_eq!(table.max_allowed_deletions(0), 2);
        assert_eq!(table.max_allowed_deletions(4), 2);
        assert_eq!(table.max_allowed_deletions(40), 10);
    }

    #[test]
    fn strategy_counts_never_exceed_ceiling() {
        let table = ErosionTable::default();
        for edges in 0..200 {
            let ceiling = table.max_allowed_deletions(edges);
            assert!(table.direct_count(edges) >= 1);
            assert!(table.direct_count(edges) <= ceiling);
            assert!(table.seed_count(edges) <= ceiling);
        }
    }
}
