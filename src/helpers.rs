use crate::memory::{count_as, Primitive};

/// Integer mean of an accumulated coordinate sum, rounded toward zero.
///
/// Non-negative sums are truncate-divided. Negative sums have their magnitude divided and
/// the sign reapplied, so `-7 / 2` yields `-3`, never the floored `-4`.
#[inline(always)]
pub(crate) fn div_toward_zero<T: Primitive>(sum: T, count: usize) -> T {
    let count = count_as::<T>(count);
    if sum >= T::zero() {
        sum / count
    } else {
        match sum.checked_neg() {
            Some(magnitude) => -(magnitude / count),
            // |T::min_value()| is not representable, signed `/` truncates the same way
            None => sum / count,
        }
    }
}

/// Index of the closest centroid. Centroids are scanned in index order and the current best
/// is only replaced on a strictly smaller distance, so the lowest index wins ties.
#[inline(always)]
pub(crate) fn closest<T: Primitive>(distances: impl Iterator<Item = T>) -> Option<(usize, T)> {
    let mut best: Option<(usize, T)> = None;
    for (idx, dist) in distances.enumerate() {
        match best {
            Some((_, best_dist)) if dist >= best_dist => {}
            _ => best = Some((idx, dist)),
        }
    }
    best
}
