use rand::Rng;
use num_traits::{Float, FromPrimitive};

pub fn vary_within_range<T, R>(min: T, max: T, variation: T, rng: &mut R) -> T
where
    T: Float + FromPrimitive,
    R: Rng,
{
    let two = T::from_f64(2.0).unwrap_or_else(T::one);
    let base: T = (min + max) / two;
    let range = (max - min) * variation;
    let offset = T::from_f64(rng.random_range(-1.0..=1.0)).unwrap_or_else(T::zero) * range;
    num_traits::clamp(base + offset, min, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn stays_within_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let v = vary_within_range(2.6, 3.3, 1.0, &mut rng);
            assert!((2.6..=3.3).contains(&v));
        }
    }

    #[test]
    fn zero_variation_is_midpoint() {
        let mut rng = StdRng::seed_from_u64(7);
        let v = vary_within_range(10.0_f64, 20.0, 0.0, &mut rng);
        assert!((v - 15.0).abs() < 1e-9);
    }
}
