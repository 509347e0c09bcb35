use super::check_k;
use crate::{memory::*, CentroidState, PointStore, Result};

/// Use the first **k** points as initial centroids.
pub fn first_k<T: Primitive>(points: &PointStore<T>, k: usize) -> Result<CentroidState<T>> {
    check_k(points, k)?;
    CentroidState::new(points.as_slice()[..k * points.dims()].to_vec(), k, points.dims())
}
