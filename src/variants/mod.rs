mod native;
mod reference;
mod vectorized;

pub use native::{Native, DEFAULT_CHUNK_SIZE};
pub use reference::Reference;
pub use vectorized::Vectorized;

use crate::accel::Accelerated;
use crate::engine::ClusteringEngine;
use crate::{memory::*, CentroidState, Error, KMeansConfig, PointStore, Result, RunOutcome};

/// A complete clustering run, computed by one particular execution strategy.
///
/// Backends never expose their internal representation: they take the points and initial
/// centroids and hand back a [`RunOutcome`]. For identical inputs every backend must return
/// exactly the centroids [`Reference`] returns, and must surface [`crate::Error::EmptyCluster`]
/// the same way.
pub trait ClusteringBackend<T: Primitive> {
    fn name(&self) -> &'static str;

    /// ## Arguments
    /// - **points**: The points to cluster
    /// - **centroids**: Initial centroids, consumed by the run
    /// - **iteration_limit**: Maximum amount of iterations
    fn run(&self, points: &PointStore<T>, centroids: CentroidState<T>, iteration_limit: usize) -> Result<RunOutcome<T>>;
}

macro_rules! engine_backend {
    ($($variant:ty),*) => {$(
        impl<T: Primitive> ClusteringBackend<T> for $variant {
            fn name(&self) -> &'static str { <$variant as crate::engine::LloydStep<T>>::name(self) }

            fn run(&self, points: &PointStore<T>, centroids: CentroidState<T>, iteration_limit: usize) -> Result<RunOutcome<T>> {
                ClusteringEngine::run(self, points, centroids, iteration_limit, &KMeansConfig::default())
            }
        }
    )*};
}
engine_backend!(Reference, Vectorized, Native);


/// Closed set of backends the benchmark harness can drive.
#[derive(Clone, Debug, PartialEq)]
pub enum Backend {
    /// Nested loops, the ground truth
    Reference,
    /// Bulk array operations
    Vectorized,
    /// Parallel native code over flat buffers
    Native(Native),
    /// Offloaded to an accelerator through its register interface
    Accelerated(Accelerated),
}
impl Backend {
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Reference => "reference",
            Backend::Vectorized => "vectorized",
            Backend::Native(_) => "native",
            Backend::Accelerated(_) => "accelerated",
        }
    }

    /// Run this backend once.
    pub fn run(&self, points: &PointStore<i64>, centroids: CentroidState<i64>, iteration_limit: usize) -> Result<RunOutcome<i64>> {
        match self {
            Backend::Reference => ClusteringBackend::run(&Reference, points, centroids, iteration_limit),
            Backend::Vectorized => ClusteringBackend::run(&Vectorized, points, centroids, iteration_limit),
            Backend::Native(native) => ClusteringBackend::run(native, points, centroids, iteration_limit),
            Backend::Accelerated(accel) => accel.run(points, centroids, iteration_limit),
        }
    }

    /// Run this backend, reporting progress through **config** where the backend computes in-process.
    /// The accelerated backend runs its loop on the device. It reports `init_done` and honors a cancel
    /// flag that is set before the launch, but does not report single iterations.
    pub fn run_with_config<'a>(&self, points: &PointStore<i64>, centroids: CentroidState<i64>, iteration_limit: usize,
                config: &KMeansConfig<'a, i64>) -> Result<RunOutcome<i64>> {
        match self {
            Backend::Reference => ClusteringEngine::run(&Reference, points, centroids, iteration_limit, config),
            Backend::Vectorized => ClusteringEngine::run(&Vectorized, points, centroids, iteration_limit, config),
            Backend::Native(native) => ClusteringEngine::run(native, points, centroids, iteration_limit, config),
            Backend::Accelerated(accel) => {
                centroids.check_compatible(points)?;
                (config.init_done)(&centroids);
                if config.cancelled() {
                    return Err(Error::Cancelled { iterations: 0 });
                }
                accel.run(points, centroids, iteration_limit)
            }
        }
    }
}
impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.name()) }
}
