use crate::engine::LloydStep;
use crate::{distance::squared_euclidean, helpers, memory::*, CentroidState, Error, PointStore, Result};
use rayon::prelude::*;

/// Points per work unit.
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Compiled, multi-threaded Lloyd iteration on flat row-major buffers.
///
/// The assignment step is split into chunks of **chunk_size** points that are processed in
/// parallel with rayon. Every chunk produces partial sums and counters, which are then added up.
/// Integer addition is associative, and each point's closest-centroid decision only depends on
/// that point, so the result does not depend on scheduling. Sums are checked, and since every
/// partial sum is a sum over a subset of the same points, an overflow is reported whatever the
/// chunking.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Native {
    pub chunk_size: usize,
}
impl Default for Native {
    fn default() -> Self { Self { chunk_size: DEFAULT_CHUNK_SIZE } }
}
impl Native {
    pub fn with_chunk_size(chunk_size: usize) -> Self { Self { chunk_size: chunk_size.max(1) } }
}

/// Per-work-unit accumulator: **K** coordinate sums plus **K** point counts.
struct Partial<T> {
    sums: Vec<T>,
    counts: Vec<usize>,
}
impl<T: Primitive> Partial<T> {
    fn new(k: usize, dims: usize) -> Self {
        Self { sums: vec![T::zero(); k * dims], counts: vec![0; k] }
    }

    /// Add one point to the sums of centroid **closest**. `None` if a sum overflows.
    fn add(&mut self, closest: usize, point: &[T]) -> Option<()> {
        let dims = point.len();
        self.counts[closest] += 1;
        for (acc, v) in self.sums[closest * dims..(closest + 1) * dims].iter_mut().zip(point.iter()) {
            *acc = acc.checked_add(v)?;
        }
        Some(())
    }

    fn merge(mut self, other: Self, iteration: usize) -> Result<Self> {
        for (a, b) in self.sums.iter_mut().zip(other.sums.iter()) {
            *a = a.checked_add(b).ok_or(Error::Overflow { iteration })?;
        }
        self.counts.iter_mut().zip(other.counts.iter()).for_each(|(a, &b)| *a += b);
        Ok(self)
    }
}

impl<T: Primitive> LloydStep<T> for Native {
    fn name(&self) -> &'static str { "native" }

    fn step(&self, iteration: usize, points: &PointStore<T>, current: &CentroidState<T>, next: &mut CentroidState<T>)
            -> Result<()> {
        let (k, dims) = (current.k, current.dims);
        let work_packet = self.chunk_size.max(1) * dims;

        let total = points.as_slice().par_chunks(work_packet)
            .map(|chunk| -> Result<Partial<T>> {
                let mut partial = Partial::new(k, dims);
                let mut distances = Vec::with_capacity(k);
                for point in chunk.chunks_exact(dims) {
                    distances.clear();
                    for centroid in current.iter() {
                        distances.push(squared_euclidean(point, centroid).ok_or(Error::Overflow { iteration })?);
                    }
                    let closest = helpers::closest(distances.iter().cloned()).map_or(0, |(idx, _)| idx);
                    partial.add(closest, point).ok_or(Error::Overflow { iteration })?;
                }
                Ok(partial)
            })
            .try_reduce(|| Partial::new(k, dims), |a, b| a.merge(b, iteration))?;

        for (c, (sums, &count)) in total.sums.chunks_exact(dims).zip(total.counts.iter()).enumerate() {
            if count == 0 {
                return Err(Error::EmptyCluster { iteration, centroid: c });
            }
            next.set_centroid_from_iter(c, sums.iter().map(|&s| helpers::div_toward_zero(s, count)));
        }
        Ok(())
    }
}
