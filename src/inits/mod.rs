//! Selection of the initial centroids of a run.
//!
//! Every backend is started from the same explicitly chosen centroids, so the selection happens
//! once, outside of the backends.

mod firstk;
mod precomputed;
mod randomsample;

pub use firstk::first_k;
pub use precomputed::precomputed;
pub use randomsample::random_sample;

use crate::{memory::*, Error, PointStore, Result};

fn check_k<T: Primitive>(points: &PointStore<T>, k: usize) -> Result<()> {
    if k == 0 || k > points.len() {
        return Err(Error::InvalidInput(format!("cannot pick {} centroids from {} points", k, points.len())));
    }
    Ok(())
}
