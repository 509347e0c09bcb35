use crate::memory::Primitive;

/// Squared euclidean distance `Σ_d (a[d] - b[d])^2`, the only metric the backends use.
///
/// Returns `None` if the difference, its square or the sum does not fit into `T`.
#[inline(always)]
pub fn squared_euclidean<T: Primitive>(a: &[T], b: &[T]) -> Option<T> {
    a.iter().zip(b.iter())
        .map(|(sp, cp)| sp.checked_sub(cp))                       // <sample> - <centroid>
        .map(|v| v.and_then(|v| v.checked_mul(&v)))               // <vec_components> ^2
        .try_fold(T::zero(), |acc, v| acc.checked_add(&v?))      // sum(<vec_components>^2)
}
