use crate::error::SimResult;
use crate::h3_utils::PointSampler;
use crate::helpers::{rad_to_area, sample_power_law};
use crate::planet::Planet;
use crate::plate::{Plate, PlateParams};
use crate::vary::vary_within_range;
use h3o::Resolution;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::FRAC_PI_6;
use tracing::debug;

pub struct PlateGeneratorConfig {
    pub target_coverage: f64,
    pub power_law_exponent: f64,
    pub min_density: f64,
    pub max_density: f64,
    pub min_thickness_km: f64,
    pub max_thickness_km: f64,
    pub variation_factor: f64,
    pub min_plate_radius_km: f64,
    /// radians of arc
    pub max_plate_radius: f64,
}

#[derive(Default)]
pub struct PartialPlateGenConfig {
    pub target_coverage: Option<f64>,
    pub power_law_exponent: Option<f64>,
    pub min_density: Option<f64>,
    pub max_density: Option<f64>,
    pub min_thickness_km: Option<f64>,
    pub max_thickness_km: Option<f64>,
    pub variation_factor: Option<f64>,
    pub min_plate_radius_km: Option<f64>,
    pub max_plate_radius_radians: Option<f64>,
}

impl PlateGeneratorConfig {
    pub fn from_partial(partial: PartialPlateGenConfig) -> PlateGeneratorConfig {
        Self {
            target_coverage: partial.target_coverage.unwrap_or(0.7),
            power_law_exponent: partial.power_law_exponent.unwrap_or(3.0),
            min_density: partial.min_density.unwrap_or(2.6),
            max_density: partial.max_density.unwrap_or(3.3),
            min_thickness_km: partial.min_thickness_km.unwrap_or(7.0),
            max_thickness_km: partial.max_thickness_km.unwrap_or(35.0),
            variation_factor: partial.variation_factor.unwrap_or(0.1).clamp(0.0, 0.2),
            min_plate_radius_km: partial.min_plate_radius_km.unwrap_or(200.0),
            max_plate_radius: partial.max_plate_radius_radians.unwrap_or(FRAC_PI_6),
        }
    }
}

pub struct GenerateRadiiParams {
    pub target_coverage: f64,
    pub min_radius: f64,
    pub max_radius: f64,
    pub exponent: f64,
}

pub struct PlateGenerator<'a> {
    config: PlateGeneratorConfig,
    planet: &'a Planet,
    point_sampler: PointSampler,
    rng: StdRng,
}

impl<'a> PlateGenerator<'a> {
    pub fn new(partial: PartialPlateGenConfig, planet: &'a Planet, seed: Option<u64>) -> Self {
        let config = PlateGeneratorConfig::from_partial(partial);
        let point_sampler = PointSampler::new(planet.radius_km, Resolution::Three);
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            config,
            planet,
            point_sampler,
            rng,
        }
    }

    pub fn generate_one(&mut self, radius_km: f64, name: String) -> SimResult<Plate> {
        let position = self.point_sampler.random_point_on_planet(&mut self.rng);
        let variation = self.config.variation_factor;

        // smaller plates are thicker and lighter
        let base_thickness = self.scaled_thickness(radius_km);
        let thickness_km = vary_within_range(
            base_thickness * (1.0 - variation),
            base_thickness * (1.0 + variation),
            variation,
            &mut self.rng,
        )
        .clamp(self.config.min_thickness_km, self.config.max_thickness_km)
        .floor()
        .max(1.0);

        let base_density = self.scaled_density(radius_km);
        let density = vary_within_range(
            base_density * (1.0 - variation),
            base_density * (1.0 + variation),
            variation,
            &mut self.rng,
        )
        .clamp(self.config.min_density, self.config.max_density);

        Plate::new(PlateParams {
            name,
            position,
            radius_km,
            thickness_km,
            density,
            planet_id: self.planet.id,
            planet_radius_km: self.planet.radius_km,
        })
    }

    /// Generates plates from a power-law radius spectrum until the target coverage is met.
    pub fn generate_plates(&mut self) -> SimResult<Vec<Plate>> {
        let radii = self.generate_radii(GenerateRadiiParams {
            target_coverage: self.config.target_coverage,
            min_radius: self.config.min_plate_radius_km,
            max_radius: self.max_plate_radius_km(),
            exponent: self.config.power_law_exponent,
        });

        radii
            .into_iter()
            .rev()
            .enumerate()
            .map(|(index, radius)| self.generate_one(radius, format!("plate-{}", index)))
            .collect()
    }

    fn max_plate_radius_km(&self) -> f64 {
        (self.config.max_plate_radius * self.planet.radius_km)
            .min(self.planet.radius_km * 0.99)
    }

    fn scaled_thickness(&self, radius_km: f64) -> f64 {
        let t_min = self.config.min_thickness_km;
        let t_max = self.config.max_thickness_km;
        let ratio = 1.0 - (radius_km / self.max_plate_radius_km()).clamp(0.0, 1.0);
        (t_min + (t_max - t_min) * ratio).round()
    }

    fn scaled_density(&self, radius_km: f64) -> f64 {
        let d_min = self.config.min_density;
        let d_max = self.config.max_density;
        let ratio = (radius_km / self.max_plate_radius_km()).clamp(0.0, 1.0);
        d_min + (d_max - d_min) * ratio
    }

    /// Radii sorted ascending whose total area reaches the target coverage,
    /// trimmed of small plates while the overage allows.
    pub fn generate_radii(&mut self, params: GenerateRadiiParams) -> Vec<f64> {
        let GenerateRadiiParams {
            target_coverage,
            min_radius,
            max_radius,
            exponent,
        } = params;
        let (min_radius, max_radius) = if min_radius < max_radius {
            (min_radius, max_radius)
        } else {
            (max_radius, min_radius)
        };
        let target_area = self.planet.surface_area_km2() * target_coverage;

        let mut radii: Vec<f64> = Vec::new();
        let mut area = 0.0;
        while area < target_area {
            let r = sample_power_law(min_radius, max_radius, exponent, &mut self.rng).round();
            area += rad_to_area(r);
            radii.push(r);
        }

        radii.sort_by(|a, b| a.total_cmp(b));

        loop {
            let overage = total_area(&radii) - target_area;
            let Some(&smallest) = radii.first() else {
                break;
            };
            if overage <= 0.0 || rad_to_area(smallest) > overage {
                break;
            }
            // drop one random plate among those small enough to fit the overage
            let removable = radii.iter().take_while(|&&r| rad_to_area(r) <= overage).count();
            let index = self.rng.random_range(0..removable);
            radii.remove(index);
        }

        debug!(
            count = radii.len(),
            coverage = total_area(&radii) / self.planet.surface_area_km2(),
            "generated plate radii"
        );
        radii
    }
}

fn total_area(radii: &[f64]) -> f64 {
    radii.iter().map(|&r| rad_to_area(r)).sum()
}
