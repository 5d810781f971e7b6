//! Relaxes plate positions on the sphere with a pairwise repulsion model.
//!
//! Each step is Jacobi-style: every plate is read once into a snapshot,
//! all pairwise forces are computed from that snapshot, and only then are
//! positions written back.

use crate::config::SimConfig;
use crate::error::SimResult;
use crate::plate::Plate;
use crate::store::{Record, SimStore};
use glam::{DVec3, Vec3};
use std::collections::HashMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutReport {
    pub steps: u32,
    pub max_force: f64,
    pub converged: bool,
}

/// Plates whose isostatic elevations differ by more than their mean
/// thickness ride past each other without colliding.
pub fn plates_interact(a: &Plate, b: &Plate, mantle_density: f64) -> bool {
    let elevation_gap = (a.isostatic_elevation(mantle_density) - b.isostatic_elevation(mantle_density)).abs();
    elevation_gap <= (a.thickness_km + b.thickness_km) / 2.0
}

/// Unit vector pointing from `b` to `a`; coincident plates get a fixed
/// tangent so they still separate.
fn separation_direction(a: DVec3, b: DVec3) -> DVec3 {
    let delta = a - b;
    if delta.length_squared() > 1e-12 {
        return delta.normalize();
    }
    let axis = if a.normalize_or_zero().z.abs() < 0.9 { DVec3::Z } else { DVec3::X };
    a.cross(axis).normalize_or_zero()
}

/// Accumulated repulsion per plate, in the order of `plates`.
pub fn compute_forces(plates: &[Plate], mantle_density: f64, interaction_factor: f64) -> Vec<DVec3> {
    let mut forces = vec![DVec3::ZERO; plates.len()];

    for i in 0..plates.len() {
        for j in (i + 1)..plates.len() {
            let (a, b) = (&plates[i], &plates[j]);
            if !plates_interact(a, b, mantle_density) {
                continue;
            }

            let pa = a.position.as_dvec3();
            let pb = b.position.as_dvec3();
            let distance = pa.distance(pb);
            let reach = interaction_factor * (a.radius_km + b.radius_km);
            if distance >= reach {
                continue;
            }

            let magnitude = reach - distance;
            let direction = separation_direction(pa, pb);
            let total_mass = a.mass + b.mass;
            // the heavier plate moves less
            let (share_a, share_b) = if total_mass > 0.0 {
                (b.mass / total_mass, a.mass / total_mass)
            } else {
                (0.5, 0.5)
            };

            forces[i] += direction * magnitude * share_a;
            forces[j] -= direction * magnitude * share_b;
        }
    }

    forces
}

pub struct ForceLayoutEngine {
    store: SimStore,
    planet_id: Uuid,
    config: SimConfig,
}

impl ForceLayoutEngine {
    pub fn new(store: SimStore, planet_id: Uuid, config: SimConfig) -> Self {
        ForceLayoutEngine {
            store,
            planet_id,
            config,
        }
    }

    /// One relaxation step over every plate of the planet. Returns the force
    /// applied to each plate; positions stay on the planet's sphere.
    pub fn apply_force_layout(&self) -> SimResult<HashMap<Uuid, Vec3>> {
        let planet = self.store.planet(self.planet_id)?;
        let snapshot = self.store.plates_for_planet(self.planet_id)?;
        let forces = compute_forces(&snapshot, planet.mantle_density_gcm3, self.config.interaction_factor);

        let scale = self.config.damping * self.config.time_step;
        let radius = planet.radius_km;
        let mut applied = HashMap::with_capacity(snapshot.len());

        for (plate, force) in snapshot.iter().zip(forces.iter()) {
            applied.insert(plate.id, force.as_vec3());
            if *force == DVec3::ZERO {
                continue;
            }

            let moved = plate.position.as_dvec3() + *force * scale;
            let Some(direction) = moved.try_normalize() else {
                warn!(plate = %plate.id, "layout step collapsed plate onto the origin; keeping position");
                continue;
            };
            let position = (direction * radius).as_vec3();

            if let Err(e) = self.store.plates.mutate(&plate.key(), &mut |p| p.position = position) {
                warn!(plate = %plate.id, error = %e, "failed to persist plate position");
            }
        }

        Ok(applied)
    }

    /// Steps until the largest force drops below epsilon or `max_steps` is reached.
    pub fn run_force_directed_layout(&self, max_steps: u32) -> SimResult<LayoutReport> {
        let mut report = LayoutReport {
            steps: 0,
            max_force: 0.0,
            converged: false,
        };

        while report.steps < max_steps {
            let forces = self.apply_force_layout()?;
            report.steps += 1;
            report.max_force = forces
                .values()
                .map(|f| f.length() as f64)
                .fold(0.0, f64::max);
            debug!(step = report.steps, max_force = report.max_force, "layout step");

            if report.max_force < self.config.epsilon_km {
                report.converged = true;
                break;
            }
        }

        info!(
            steps = report.steps,
            max_force = report.max_force,
            converged = report.converged,
            "force layout finished"
        );
        Ok(report)
    }
}
