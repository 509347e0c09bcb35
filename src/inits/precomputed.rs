use crate::{memory::*, CentroidState, Result};

/// Caller-supplied centroids, **k** rows of **dims** coordinates in row-major order.
pub fn precomputed<T: Primitive>(computed: Vec<T>, k: usize, dims: usize) -> Result<CentroidState<T>> {
    CentroidState::new(computed, k, dims)
}
