use crate::{memory::*, Error, Result};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};

pub type InitDoneCallbackFn<'a, T> = &'a dyn Fn(&CentroidState<T>);
pub type IterationDoneCallbackFn<'a, T> = &'a dyn Fn(&CentroidState<T>, usize);

/// This is a structure holding configuration options for a clustering run, currently a couple of
/// callbacks that can be set to get status information from a running calculation.
///
/// For a more detailed information about all possible options, have a look at [`KMeansConfigBuilder`].
pub struct KMeansConfig<'a, T: Primitive> {
    /// Callback that is called once, before the first iteration
    /// ## Arguments
    /// - **state**: The initial [`CentroidState`]
    pub(crate) init_done: InitDoneCallbackFn<'a, T>,
    /// Callback that is called after each iteration
    /// ## Arguments
    /// - **state**: Centroids computed by the iteration
    /// - **iteration_id**: Number of the finished iteration (starting at 1)
    pub(crate) iteration_done: IterationDoneCallbackFn<'a, T>,
    /// Flag that is checked before each iteration. Once it is set, the run ends with
    /// [`Error::Cancelled`].
    pub(crate) cancel: Option<&'a AtomicBool>,
}
impl<'a, T: Primitive> Default for KMeansConfig<'a, T> {
    fn default() -> Self {
        Self {
            init_done: &|_| {},
            iteration_done: &|_, _| {},
            cancel: None,
        }
    }
}
impl<'a, T: Primitive> KMeansConfig<'a, T> {
    /// Use the [`KMeansConfigBuilder`] to build a [`KMeansConfig`] instance.
    pub fn build() -> KMeansConfigBuilder<'a, T> {
        KMeansConfigBuilder { config: KMeansConfig::default() }
    }

    pub(crate) fn cancelled(&self) -> bool {
        self.cancel.map_or(false, |flag| flag.load(Ordering::Acquire))
    }
}
impl<'a, T: Primitive> std::fmt::Debug for KMeansConfig<'a, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str("KMeansConfig") }
}

pub struct KMeansConfigBuilder<'a, T: Primitive> {
    config: KMeansConfig<'a, T>,
}
impl<'a, T: Primitive> KMeansConfigBuilder<'a, T> {
    /// Set the callback that should be called before the first iteration starts.
    pub fn init_done(mut self, init_done: InitDoneCallbackFn<'a, T>) -> Self {
        self.config.init_done = init_done; self
    }
    /// Set the callback that should be called after each iteration of a running calculation.
    pub fn iteration_done(mut self, iteration_done: IterationDoneCallbackFn<'a, T>) -> Self {
        self.config.iteration_done = iteration_done; self
    }
    /// Set a flag that aborts the calculation before its next iteration, once it becomes `true`.
    pub fn cancel(mut self, cancel: &'a AtomicBool) -> Self {
        self.config.cancel = Some(cancel); self
    }
    /// Return the internally built configuration structure.
    pub fn build(self) -> KMeansConfig<'a, T> { self.config }
}


/// Immutable set of **N** points with **D** integer coordinates each, stored row-major in one
/// flat buffer. Backends only ever borrow it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PointStore<T: Primitive> {
    pub(crate) sample_cnt: usize,
    pub(crate) sample_dims: usize,
    pub(crate) samples: Vec<T>,
}
impl<T: Primitive> PointStore<T> {
    /// Create a new point store.
    ///
    /// ## Arguments
    /// - **samples**: Vector of points [row-major] = [<point0>,<point1>,<point2>,...]
    /// - **sample_cnt**: Amount of points contained in **samples**
    /// - **sample_dims**: Amount of dimensions each point has
    pub fn new(samples: Vec<T>, sample_cnt: usize, sample_dims: usize) -> Result<Self> {
        if sample_dims == 0 {
            return Err(Error::InvalidInput("points need at least one dimension".into()));
        }
        if samples.len() != sample_cnt * sample_dims {
            return Err(Error::InvalidInput(format!(
                "{} values do not form {} points of {} dimensions", samples.len(), sample_cnt, sample_dims)));
        }
        Ok(Self { sample_cnt, sample_dims, samples })
    }

    /// Build a store from one vector per point. All rows must have the same length.
    pub fn from_rows(rows: Vec<Vec<T>>) -> Result<Self> {
        let sample_cnt = rows.len();
        let sample_dims = rows.first().map(Vec::len).unwrap_or(0);
        if let Some((idx, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != sample_dims) {
            return Err(Error::InvalidInput(format!(
                "point {} has {} dimensions, expected {}", idx, row.len(), sample_dims)));
        }
        Self::new(rows.into_iter().flatten().collect(), sample_cnt, sample_dims)
    }

    pub fn len(&self) -> usize { self.sample_cnt }
    pub fn is_empty(&self) -> bool { self.sample_cnt == 0 }
    pub fn dims(&self) -> usize { self.sample_dims }
    pub fn as_slice(&self) -> &[T] { &self.samples }

    pub fn point(&self, idx: usize) -> &[T] {
        &self.samples[idx * self.sample_dims..(idx + 1) * self.sample_dims]
    }

    pub fn iter(&self) -> std::slice::ChunksExact<'_, T> {
        self.samples.chunks_exact(self.sample_dims)
    }
}


/// **K** cluster centers of dimensionality **D**, row-major in one flat buffer.
///
/// ## Fields
/// - **k**: The amount of centroids
/// - **dims**: Dimensionality of every centroid
/// - **centroids**: Cluster centers [row-major] = [<centroid0>,<centroid1>,<centroid2>,...]
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct CentroidState<T: Primitive> {
    pub k: usize,
    pub dims: usize,
    pub centroids: Vec<T>,
}
impl<T: Primitive> CentroidState<T> {
    pub fn new(centroids: Vec<T>, k: usize, dims: usize) -> Result<Self> {
        if k == 0 || dims == 0 {
            return Err(Error::InvalidInput("need at least one centroid of at least one dimension".into()));
        }
        if centroids.len() != k * dims {
            return Err(Error::InvalidInput(format!(
                "{} values do not form {} centroids of {} dimensions", centroids.len(), k, dims)));
        }
        Ok(Self { k, dims, centroids })
    }

    pub fn from_rows(rows: Vec<Vec<T>>) -> Result<Self> {
        let k = rows.len();
        let dims = rows.first().map(Vec::len).unwrap_or(0);
        if rows.iter().any(|r| r.len() != dims) {
            return Err(Error::InvalidInput("centroids differ in dimensionality".into()));
        }
        Self::new(rows.into_iter().flatten().collect(), k, dims)
    }

    /// All-zero state of the given shape, used as write buffer by the backends.
    pub(crate) fn zeroed(k: usize, dims: usize) -> Self {
        Self { k, dims, centroids: vec![T::zero(); k * dims] }
    }

    pub fn centroid(&self, idx: usize) -> &[T] {
        &self.centroids[idx * self.dims..(idx + 1) * self.dims]
    }

    pub fn iter(&self) -> std::slice::ChunksExact<'_, T> {
        self.centroids.chunks_exact(self.dims)
    }

    pub fn to_rows(&self) -> Vec<Vec<T>> {
        self.iter().map(|c| c.to_vec()).collect()
    }

    pub(crate) fn set_centroid_from_iter(&mut self, idx: usize, src: impl Iterator<Item = T>) {
        self.centroids.iter_mut().skip(self.dims * idx).take(self.dims)
            .zip(src)
            .for_each(|(c, s)| *c = s);
    }

    /// Checks that these centroids can be run against **points**. The fields are public, so the
    /// shape is checked again here.
    pub(crate) fn check_compatible(&self, points: &PointStore<T>) -> Result<()> {
        if self.k == 0 || self.dims == 0 || self.k.checked_mul(self.dims) != Some(self.centroids.len()) {
            return Err(Error::InvalidInput(format!(
                "{} values do not form {} centroids of {} dimensions", self.centroids.len(), self.k, self.dims)));
        }
        if self.dims != points.dims() {
            return Err(Error::InvalidInput(format!(
                "centroids have {} dimensions, points have {}", self.dims, points.dims())));
        }
        Ok(())
    }
}


/// Terminal state of the convergence loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Termination {
    /// The last iteration reproduced the centroids it started from.
    Converged,
    /// The iteration limit was reached first.
    LimitReached,
}

/// Result of one complete clustering run.
///
/// ## Fields
/// - **centroids**: Final centroids
/// - **iterations**: Number of iterations executed (`<= iteration_limit`)
/// - **termination**: Why the loop stopped
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RunOutcome<T: Primitive> {
    pub centroids: CentroidState<T>,
    pub iterations: usize,
    pub termination: Termination,
}
