use rand::Rng;

pub fn sample_power_law<R: Rng>(min: f64, max: f64, exp: f64, rng: &mut R) -> f64 {
    let u: f64 = rng.random();
    let inv = 1.0 / (1.0 - exp);
    let a = min.powf(1.0 - exp);
    let b = max.powf(1.0 - exp);
    (u * (b - a) + a).powf(inv)
}

/// Area of a disc; also the exact area of a spherical cap whose chord radius is `radius_km`.
pub fn rad_to_area(radius_km: f64) -> f64 {
    std::f64::consts::PI * radius_km.powi(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn power_law_samples_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..500 {
            let r = sample_power_law(200.0, 2000.0, 3.0, &mut rng);
            assert!(r >= 199.999 && r <= 2000.001, "sample {} out of range", r);
        }
    }

    #[test]
    fn power_law_favours_small_values() {
        let mut rng = StdRng::seed_from_u64(11);
        let samples: Vec<f64> = (0..1000)
            .map(|_| sample_power_law(100.0, 1000.0, 3.0, &mut rng))
            .collect();
        let small = samples.iter().filter(|&&r| r < 550.0).count();
        assert!(small > 800, "expected most samples to be small, got {}", small);
    }
}
