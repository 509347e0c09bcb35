//! Seeded synthetic point sets.

use crate::{Error, PointStore, Result};
use rand::prelude::*;

/// Coordinates are drawn from `[-element_max, element_max)`. The range is only accepted if every
/// squared distance between two such points, and every cluster sum of up to **n** of them, fits
/// into an `i64`.
fn check_range(n: usize, dims: usize, element_max: i64) -> Result<()> {
    if element_max <= 0 {
        return Err(Error::InvalidInput(format!("element maximum must be positive, got {}", element_max)));
    }
    let dims = i64::try_from(dims).ok();
    let n = i64::try_from(n).ok();
    let max_distance = element_max.checked_mul(2)
        .and_then(|span| span.checked_mul(span))
        .zip(dims)
        .and_then(|(square, dims)| square.checked_mul(dims));
    let max_sum = n.and_then(|n| n.checked_mul(element_max));
    if max_distance.is_none() || max_sum.is_none() {
        return Err(Error::InvalidInput(format!(
            "element maximum {} overflows i64 arithmetic for {} points of {} dimensions",
            element_max, n.unwrap_or(i64::MAX), dims.unwrap_or(i64::MAX))));
    }
    Ok(())
}

/// **n** points of **dims** coordinates, each uniform in `[-element_max, element_max)`.
pub fn uniform_points(n: usize, dims: usize, element_max: i64, seed: u64) -> Result<PointStore<i64>> {
    check_range(n, dims, element_max)?;
    let mut rnd = StdRng::seed_from_u64(seed);
    let mut samples = vec![0i64; n * dims];
    samples.iter_mut().for_each(|v| *v = rnd.gen_range(-element_max..element_max));
    PointStore::new(samples, n, dims)
}

/// **n** points scattered around **clusters** random centers. Every coordinate is its center's
/// coordinate plus a uniform jitter in `[-spread, spread]`, clamped into `[-element_max, element_max)`.
pub fn clustered_points(n: usize, dims: usize, clusters: usize, spread: i64, element_max: i64, seed: u64)
        -> Result<PointStore<i64>> {
    check_range(n, dims, element_max)?;
    if clusters == 0 || spread < 0 {
        return Err(Error::InvalidInput(format!("cannot scatter around {} clusters with spread {}", clusters, spread)));
    }
    let mut rnd = StdRng::seed_from_u64(seed);
    let centers: Vec<i64> = (0..clusters * dims).map(|_| rnd.gen_range(-element_max..element_max)).collect();

    let mut samples = Vec::with_capacity(n * dims);
    for _ in 0..n {
        let center = &centers[rnd.gen_range(0..clusters) * dims..][..dims];
        samples.extend(center.iter().map(|&c| {
            let jitter = rnd.gen_range(-spread..=spread);
            c.saturating_add(jitter).clamp(-element_max, element_max - 1)
        }));
    }
    PointStore::new(samples, n, dims)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_points_stay_in_range() {
        let points = uniform_points(500, 3, 99, 42).unwrap();
        assert_eq!(points.len(), 500);
        assert_eq!(points.dims(), 3);
        assert!(points.as_slice().iter().all(|&v| (-99..99).contains(&v)));
        assert!(points.as_slice().iter().any(|&v| v < 0));
    }

    #[test]
    fn generation_is_deterministic() {
        assert_eq!(uniform_points(64, 2, 1000, 7).unwrap(), uniform_points(64, 2, 1000, 7).unwrap());
        assert_ne!(uniform_points(64, 2, 1000, 7).unwrap(), uniform_points(64, 2, 1000, 8).unwrap());
        assert_eq!(clustered_points(64, 2, 4, 3, 1000, 7).unwrap(), clustered_points(64, 2, 4, 3, 1000, 7).unwrap());
    }

    #[test]
    fn clustered_points_stay_in_range() {
        let points = clustered_points(300, 2, 3, 50, 60, 1).unwrap();
        assert!(points.as_slice().iter().all(|&v| (-60..60).contains(&v)));
    }

    #[test]
    fn degenerate_parameters_are_rejected() {
        assert!(uniform_points(10, 2, 0, 1).is_err());
        assert!(clustered_points(10, 2, 0, 1, 10, 1).is_err());
        assert!(clustered_points(10, 2, 1, -1, 10, 1).is_err());
    }

    #[test]
    fn ranges_that_overflow_distances_are_rejected() {
        // (2 * 4e9)^2 * 2 does not fit an i64
        assert!(matches!(uniform_points(64, 2, 4_000_000_000, 42), Err(Error::InvalidInput(_))));
        assert!(matches!(clustered_points(64, 2, 2, 5, 4_000_000_000, 42), Err(Error::InvalidInput(_))));
        // 2^29 fits for two dimensions, but not for 16
        assert!(uniform_points(64, 2, 1 << 29, 42).is_ok());
        assert!(uniform_points(64, 16, 1 << 29, 42).is_err());
        // the cluster sum of all points has to fit as well
        assert!(check_range(1 << 40, 1, 1 << 24).is_err());
        assert!(check_range(1 << 20, 1, 1 << 24).is_ok());
    }
}
