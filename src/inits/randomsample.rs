use super::check_k;
use crate::{memory::*, CentroidState, PointStore, Result};
use rand::prelude::*;

/// Pick **k** distinct points uniformly at random as initial centroids.
pub fn random_sample<T: Primitive, R: Rng + ?Sized>(points: &PointStore<T>, k: usize, rnd: &mut R) -> Result<CentroidState<T>> {
    check_k(points, k)?;
    let mut state = CentroidState::zeroed(k, points.dims());
    points.iter()
        .choose_multiple(rnd, k).iter().cloned()
        .enumerate()
        .for_each(|(ci, c)| { // Copy randomly chosen centroids into state.centroids
            state.set_centroid_from_iter(ci, c.iter().cloned());
        });
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::testing;

    #[test]
    fn picks_distinct_input_points() {
        let points = testing::two_blobs();
        let mut rnd = StdRng::seed_from_u64(1337);
        let state = random_sample(&points, 5, &mut rnd).unwrap();
        assert_eq!(state.k, 5);
        let picked: Vec<_> = state.iter().collect();
        for c in &picked {
            assert!(points.iter().any(|p| p == *c));
        }
    }

    #[test]
    fn same_seed_same_centroids() {
        let points = testing::two_blobs();
        let a = random_sample(&points, 3, &mut StdRng::seed_from_u64(42)).unwrap();
        let b = random_sample(&points, 3, &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn more_centroids_than_points_fails() {
        let points = testing::points(&[&[1, 2]]);
        assert!(random_sample(&points, 2, &mut StdRng::seed_from_u64(1)).is_err());
    }
}
