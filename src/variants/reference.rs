use crate::engine::LloydStep;
use crate::{distance::squared_euclidean, helpers, memory::*, CentroidState, Error, PointStore, Result};

/// Straightforward nested-loop evaluation of Lloyd's algorithm.
///
/// This variant defines the ground-truth numeric behavior, every other backend has to reproduce
/// its centroids exactly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Reference;

impl<T: Primitive> LloydStep<T> for Reference {
    fn name(&self) -> &'static str { "reference" }

    fn step(&self, iteration: usize, points: &PointStore<T>, current: &CentroidState<T>, next: &mut CentroidState<T>)
            -> Result<()> {
        let (k, dims) = (current.k, current.dims);
        let mut accumulators = vec![T::zero(); k * dims];
        let mut counters = vec![0usize; k];

        for point in points.iter() {
            // Determine closest centroid for point
            let mut closest = 0;
            let mut min_distance = T::max_value();
            for (c, centroid) in current.iter().enumerate() {
                let distance = squared_euclidean(point, centroid).ok_or(Error::Overflow { iteration })?;
                if distance < min_distance {
                    closest = c;
                    min_distance = distance;
                }
            }
            // Update counters of closest centroid
            counters[closest] += 1;
            for d in 0..dims {
                let acc = &mut accumulators[closest * dims + d];
                *acc = acc.checked_add(&point[d]).ok_or(Error::Overflow { iteration })?;
            }
        }

        // Calculate new centroids
        for c in 0..k {
            if counters[c] == 0 {
                return Err(Error::EmptyCluster { iteration, centroid: c });
            }
            for d in 0..dims {
                next.centroids[c * dims + d] = helpers::div_toward_zero(accumulators[c * dims + d], counters[c]);
            }
        }
        Ok(())
    }
}
