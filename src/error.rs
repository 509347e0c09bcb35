use arrow_schema::ArrowError;
use thiserror::Error;

/// Result alias used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by a clustering run or by one of its backends.
///
/// No variant is ever swallowed to produce a plausible-looking centroid result: a run either
/// returns complete centroids or one of these.
#[derive(Debug, Error)]
pub enum Error {
    /// A centroid had no points assigned to it, so its mean is undefined.
    /// Fatal to the run, the caller may restart with different initial centroids.
    #[error("centroid {centroid} lost all assigned points in iteration {iteration}")]
    EmptyCluster { iteration: usize, centroid: usize },

    /// A squared distance or a coordinate sum does not fit the coordinate type. Coordinates are
    /// never truncated, so the run stops instead of producing wrapped centroids.
    #[error("coordinate arithmetic overflows in iteration {iteration}")]
    Overflow { iteration: usize },

    /// The run was stopped from outside before it terminated.
    #[error("run cancelled after {iterations} iterations")]
    Cancelled { iterations: usize },

    /// The execution environment a backend requires could not be brought up
    /// (device init failure, completion timeout, ...). Fatal to that backend's run only.
    #[error("backend `{backend}` unavailable: {reason}")]
    BackendUnavailable { backend: &'static str, reason: String },

    /// A columnar or register encoding did not reproduce the original integer values.
    #[error("encoding mismatch in {context}: {detail}")]
    EncodingMismatch { context: &'static str, detail: String },

    /// Shapes of points and centroids do not fit together.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Arrow(#[from] ArrowError),
}

impl Error {
    pub(crate) fn encoding(context: &'static str, detail: impl Into<String>) -> Self {
        Error::EncodingMismatch { context, detail: detail.into() }
    }

    pub(crate) fn unavailable(backend: &'static str, reason: impl Into<String>) -> Self {
        Error::BackendUnavailable { backend, reason: reason.into() }
    }
}
