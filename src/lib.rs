//! # lloyd-bench - API documentation
//!
//! lloyd-bench is a small rust library for exact, integer k-means clustering (Lloyd's algorithm),
//! computed by several interchangeable backends whose results are bit-identical.
//!
//! ## Design target
//! Its main target is the comparison of execution strategies. Every backend takes the same points and
//! initial centroids and has to produce exactly the same final centroids, so the only thing
//! left to compare is the time they take.
//! Coordinates are signed integers, distances are squared euclidean distances, and the new centroid
//! of a cluster is the mean of its points, rounded toward zero. Ties between equally distant centroids
//! are resolved in favor of the lowest centroid index.
//!
//! ## Supported backends
//! - [`Reference`]: plain nested loops, the ground truth
//! - [`Vectorized`]: bulk array operations on top of `ndarray`
//! - [`Native`]: flat buffers, the assignment step parallelized with `rayon`
//! - [`Accelerated`]: offloaded to an accelerator behind a 32-bit register interface (`i64` only)
//!
//! For the harness, these are combined in the closed [`Backend`] enum.
//!
//! ## Supported primitive types
//! - [`i64`]
//! - [`i128`]
//!
//! ## Example
//! ```rust
//! use lloyd_bench::*;
//!
//! fn main() {
//!     let points = datagen::uniform_points(2000, 4, 99, 42).unwrap();
//!     let initial = inits::first_k(&points, 3).unwrap();
//!
//!     match Backend::Reference.run(&points, initial, 30) {
//!         Ok(result) => {
//!             println!("Centroids: {:?}", result.centroids.to_rows());
//!             println!("Iterations: {} ({:?})", result.iterations, result.termination);
//!         }
//!         Err(err) => println!("Clustering failed: {}", err),
//!     }
//! }
//! ```
//!
//! ## Example (using the status event callbacks)
//! ```rust
//! use lloyd_bench::*;
//!
//! fn main() {
//!     let points = datagen::clustered_points(2000, 2, 4, 5, 1000, 7).unwrap();
//!     let initial = inits::first_k(&points, 4).unwrap();
//!
//!     let conf = KMeansConfig::build()
//!         .init_done(&|_| println!("Initialization completed."))
//!         .iteration_done(&|s, nr| println!("Iteration {} - Centroids: {:?}", nr, s.to_rows()))
//!         .build();
//!
//!     match ClusteringEngine::run(&Native::default(), &points, initial, 100, &conf) {
//!         Ok(result) => println!("Finished after {} iterations", result.iterations),
//!         Err(Error::EmptyCluster { iteration, centroid }) =>
//!             println!("Centroid {} went empty in iteration {}", centroid, iteration),
//!         Err(err) => println!("Failed: {}", err),
//!     }
//! }
//! ```
//!
//! ## Short API-Overview / Description
//! Points live in a [`PointStore`], centroids in a [`CentroidState`]. Both are flat, row-major buffers.
//! The in-process backends implement one [`LloydStep`] each, and share the convergence loop in
//! [`ClusteringEngine`]. Every backend is also usable through [`ClusteringBackend::run`].
//!
//! A run ends when an iteration reproduces the centroids it started from, or when the iteration limit
//! is reached. A cluster that loses all of its points ends the run with [`Error::EmptyCluster`],
//! coordinates too large for the checked integer arithmetic end it with [`Error::Overflow`].
//!
//! [`BenchmarkHarness`] runs a list of backends on the same input and times every run.

mod helpers;
mod memory;
mod api;
mod engine;
mod error;
mod variants;
pub mod accel;
pub mod columnar;
pub mod datagen;
pub mod distance;
pub mod harness;
pub mod inits;

pub use accel::{Accelerated, Fault, PlatformKind};
pub use api::{CentroidState, KMeansConfig, KMeansConfigBuilder, PointStore, RunOutcome, Termination};
pub use engine::{ClusteringEngine, LloydStep, LoopState};
pub use error::{Error, Result};
pub use harness::{BenchmarkHarness, BenchmarkRecord, Measurement, Timer};
pub use memory::Primitive;
pub use variants::{Backend, ClusteringBackend, Native, Reference, Vectorized, DEFAULT_CHUNK_SIZE};
