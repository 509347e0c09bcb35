use crate::engine::LloydStep;
use crate::{helpers, memory::*, CentroidState, Error, PointStore, Result};
use ndarray::{Array2, ArrayView2, Axis, Zip};

/// Lloyd's algorithm expressed as bulk array operations on [`ndarray`] views.
///
/// The full `points x centroids` distance matrix is computed column by column with broadcasting,
/// then every cluster's sum is taken over the selected rows. Every operation is checked, an
/// overflowing distance or sum ends the step with [`Error::Overflow`]. All arithmetic stays in the integer
/// domain, so the result is bit-identical to [`super::Reference`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Vectorized;

impl<T: Primitive> LloydStep<T> for Vectorized {
    fn name(&self) -> &'static str { "vectorized" }

    fn step(&self, iteration: usize, points: &PointStore<T>, current: &CentroidState<T>, next: &mut CentroidState<T>)
            -> Result<()> {
        let samples = ArrayView2::from_shape((points.len(), points.dims()), points.as_slice())
            .map_err(|e| Error::InvalidInput(e.to_string()))?;
        let centroids = ArrayView2::from_shape((current.k, current.dims), &current.centroids)
            .map_err(|e| Error::InvalidInput(e.to_string()))?;

        let mut distances = Array2::<T>::zeros((points.len(), current.k));
        for (c, centroid) in centroids.outer_iter().enumerate() {
            // broadcast <centroid> over all rows, (<sample> - <centroid>)^2
            let squares = Zip::from(samples).and_broadcast(centroid)
                .map_collect(|sp, cp| sp.checked_sub(cp).and_then(|v| v.checked_mul(&v)));
            let column = squares.map_axis(Axis(1), |row| row.iter().try_fold(T::zero(), |acc, v| acc.checked_add(&(*v)?)));
            for (dst, src) in distances.column_mut(c).iter_mut().zip(column.iter()) {
                *dst = src.ok_or(Error::Overflow { iteration })?;
            }
        }

        let assignments: Vec<usize> = distances.outer_iter()
            .map(|row| helpers::closest(row.iter().cloned()).map_or(0, |(idx, _)| idx))
            .collect();

        // all sums first, an overflow is reported before an empty cluster like in the other backends
        let mut means = Vec::with_capacity(current.k);
        for c in 0..current.k {
            let members: Vec<usize> = assignments.iter().enumerate()
                .filter(|(_, &a)| a == c)
                .map(|(idx, _)| idx)
                .collect();
            let sums = samples.select(Axis(0), &members)
                .fold_axis(Axis(0), Some(T::zero()), |acc, v| acc.and_then(|a| a.checked_add(v)));
            let mean = sums.iter()
                .map(|s| s.map(|s| if members.is_empty() { s } else { helpers::div_toward_zero(s, members.len()) }))
                .collect::<Option<Vec<T>>>()
                .ok_or(Error::Overflow { iteration })?;
            means.push((members.len(), mean));
        }
        for (c, (count, mean)) in means.into_iter().enumerate() {
            if count == 0 {
                return Err(Error::EmptyCluster { iteration, centroid: c });
            }
            next.set_centroid_from_iter(c, mean.into_iter());
        }
        Ok(())
    }
}
